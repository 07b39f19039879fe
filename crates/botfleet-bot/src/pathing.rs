use std::collections::{HashMap, VecDeque};

use botfleet_core::types::{Vec3, MAX_PATH_SPAN};
use botfleet_transport::Transport;

/// Max height delta between two sampled points for an edge to be walkable.
const MAX_STEP_HEIGHT: f32 = 1.08;
/// Spacing of the disc sampling grid.
const GRID_SPACING: f32 = 1.0;
/// Ray start/end heights for the ground-projection raycast — comfortably
/// above and below anything the sampled disc could contain.
const RAYCAST_CEILING: f32 = 1000.0;
const RAYCAST_FLOOR: f32 = -1000.0;

/// Builds a walkable point-to-point path between `from` and `to`: samples a
/// disc of ground points around the segment's midpoint, connects points
/// within a step height of each other, and BFS's from `from` to `to` over
/// that graph. Returns `None` ("Pathfinder failed!") if no connected route
/// exists or the span exceeds [`MAX_PATH_SPAN`].
pub fn find_path(transport: &dyn Transport, from: Vec3, to: Vec3) -> Option<Vec<Vec3>> {
    if from.distance(&to) > MAX_PATH_SPAN {
        return None;
    }

    let mut nodes = sample_disc(transport, from, to);
    let from_idx = nodes.len();
    nodes.push(from);
    let to_idx = nodes.len();
    nodes.push(to);

    let adjacency = build_adjacency(&nodes);
    let route = bfs(&adjacency, from_idx, to_idx)?;

    Some(route.into_iter().map(|idx| nodes[idx]).collect())
}

/// Samples a disc of 2D points centered on the midpoint of `from`/`to`,
/// radius `|from−to|`, 1-unit spacing. Each point is projected onto the
/// ground via a straight-down raycast; points with no hit (no ground
/// underneath, e.g. over a gap) are dropped.
fn sample_disc(transport: &dyn Transport, from: Vec3, to: Vec3) -> Vec<Vec3> {
    let center_x = (from.x + to.x) / 2.0;
    let center_y = (from.y + to.y) / 2.0;
    let radius = ((from.x - to.x).powi(2) + (from.y - to.y).powi(2)).sqrt();

    let mut points = Vec::new();
    let mut x = -radius;
    while x <= radius {
        let mut y = -radius;
        while y <= radius {
            if (x * x + y * y).sqrt() <= radius {
                let px = center_x + x;
                let py = center_y + y;
                let ray_start = Vec3::new(px, py, RAYCAST_CEILING);
                let ray_end = Vec3::new(px, py, RAYCAST_FLOOR);
                if let Some(ground) = transport.raycast(ray_start, ray_end) {
                    points.push(ground);
                }
            }
            y += GRID_SPACING;
        }
        x += GRID_SPACING;
    }
    points
}

/// Edges connect any two sampled points (including `from`/`to` themselves)
/// within [`MAX_STEP_HEIGHT`] of each other — no 2D distance gate, no
/// per-edge obstruction raycast. The ground-projection pass already did the
/// obstacle filtering; the only thing left to check is climbability.
fn build_adjacency(nodes: &[Vec3]) -> HashMap<usize, Vec<usize>> {
    let mut adjacency: HashMap<usize, Vec<usize>> = HashMap::new();
    for i in 0..nodes.len() {
        for j in (i + 1)..nodes.len() {
            if (nodes[i].z - nodes[j].z).abs() < MAX_STEP_HEIGHT {
                adjacency.entry(i).or_default().push(j);
                adjacency.entry(j).or_default().push(i);
            }
        }
    }
    adjacency
}

fn bfs(adjacency: &HashMap<usize, Vec<usize>>, start: usize, goal: usize) -> Option<Vec<usize>> {
    if start == goal {
        return Some(vec![start]);
    }

    let mut visited = vec![false; adjacency.len().max(start + 1).max(goal + 1)];
    let mut prev: HashMap<usize, usize> = HashMap::new();
    let mut queue = VecDeque::new();
    queue.push_back(start);
    if let Some(slot) = visited.get_mut(start) {
        *slot = true;
    }

    while let Some(node) = queue.pop_front() {
        if node == goal {
            let mut route = vec![goal];
            let mut cur = goal;
            while let Some(&p) = prev.get(&cur) {
                route.push(p);
                cur = p;
            }
            route.reverse();
            return Some(route);
        }
        for &next in adjacency.get(&node).into_iter().flatten() {
            if !visited.get(next).copied().unwrap_or(false) {
                if next >= visited.len() {
                    visited.resize(next + 1, false);
                }
                visited[next] = true;
                prev.insert(next, node);
                queue.push_back(next);
            }
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use botfleet_transport::MockTransport;

    #[test]
    fn finds_direct_path_between_flat_nearby_points() {
        let transport = MockTransport::new();
        let from = Vec3::new(0.0, 0.0, 0.0);
        let to = Vec3::new(20.0, 0.0, 0.0);
        let path = find_path(&transport, from, to).expect("path should be found");
        assert_eq!(*path.first().unwrap(), from);
        assert_eq!(*path.last().unwrap(), to);
    }

    #[test]
    fn rejects_spans_beyond_max_path_span() {
        let transport = MockTransport::new();
        let from = Vec3::new(0.0, 0.0, 0.0);
        let to = Vec3::new(MAX_PATH_SPAN + 1.0, 0.0, 0.0);
        assert!(find_path(&transport, from, to).is_none());
    }

    #[test]
    fn routes_through_sampled_ground_when_endpoints_differ_in_height() {
        // `from` and `to` are 2 units apart in z — too much for a direct
        // edge — but every disc sample reports ground at z=1.0, which is a
        // valid step from both ends, so a route exists via those nodes.
        let mut transport = MockTransport::new();
        let from = Vec3::new(0.0, 0.0, 0.0);
        let to = Vec3::new(5.0, 0.0, 2.0);
        transport.block_raycast_at(Vec3::new(2.5, 0.0, 1.0));

        let path = find_path(&transport, from, to).expect("path should be found via sampled ground");
        assert_eq!(*path.first().unwrap(), from);
        assert_eq!(*path.last().unwrap(), to);
        assert!(path.len() > 2, "expected at least one intermediate ground sample");
    }
}
