use std::collections::HashMap;

use botfleet_core::types::{
    Vec3, LABEL_GRID_CELL_SIZE, MAX_LABELS, MAX_OBJECTS, MAX_PICKUPS,
};

#[derive(Debug, Clone)]
pub struct PickupEntry {
    pub id: i32,
    pub model: i32,
    pub position: Vec3,
}

#[derive(Debug, Clone)]
pub struct ObjectEntry {
    pub id: i32,
    pub model: i32,
    pub position: Vec3,
    pub rotation: Vec3,
    pub draw_distance: f32,
    pub material_text: Option<String>,
}

#[derive(Debug, Clone)]
pub struct LabelEntry {
    pub id: i32,
    pub position: Vec3,
    pub attached_player: Option<u16>,
    pub attached_vehicle: Option<u16>,
    pub text: String,
    pub draw_distance: f32,
    pub test_los: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
struct GridCoord {
    x: i32,
    y: i32,
    z: i32,
}

fn grid_coord(pos: Vec3) -> GridCoord {
    GridCoord {
        x: (pos.x / LABEL_GRID_CELL_SIZE).floor() as i32,
        y: (pos.y / LABEL_GRID_CELL_SIZE).floor() as i32,
        z: (pos.z / LABEL_GRID_CELL_SIZE).floor() as i32,
    }
}

/// Per-bot dense resource pool for pickups/objects/labels. Grounded on the
/// original `CStreamableResourcePool`: dense `Vec` storage with an
/// id→index map for O(1) remove, a 3D spatial hash over labels for range
/// queries, and two attachment indices (player/vehicle) for O(1) lookup of
/// labels tied to a moving entity.
#[derive(Default)]
pub struct StreamableResourcePool {
    pickups: Vec<PickupEntry>,
    pickup_index: HashMap<i32, usize>,

    objects: Vec<ObjectEntry>,
    object_index: HashMap<i32, usize>,

    labels: Vec<LabelEntry>,
    label_index: HashMap<i32, usize>,
    label_spatial_hash: HashMap<GridCoord, Vec<usize>>,
    labels_by_attached_player: HashMap<u16, Vec<usize>>,
    labels_by_attached_vehicle: HashMap<u16, Vec<usize>>,
}

impl StreamableResourcePool {
    pub fn new() -> Self {
        Self::default()
    }

    // ---- pickups ----

    pub fn add_pickup(&mut self, entry: PickupEntry) {
        if self.pickups.len() >= MAX_PICKUPS || self.pickup_index.contains_key(&entry.id) {
            return;
        }
        let idx = self.pickups.len();
        self.pickup_index.insert(entry.id, idx);
        self.pickups.push(entry);
    }

    pub fn remove_pickup(&mut self, id: i32) {
        let Some(&idx) = self.pickup_index.get(&id) else { return };
        self.pickup_index.remove(&id);
        let last_idx = self.pickups.len() - 1;
        if idx != last_idx {
            self.pickups.swap(idx, last_idx);
            let moved_id = self.pickups[idx].id;
            self.pickup_index.insert(moved_id, idx);
        }
        self.pickups.pop();
    }

    pub fn pickup_position(&self, id: i32) -> Option<Vec3> {
        self.pickup_index.get(&id).map(|&idx| self.pickups[idx].position)
    }

    pub fn pickups_in_range(&self, center: Vec3, radius: f32) -> Vec<&PickupEntry> {
        let r2 = radius * radius;
        self.pickups.iter().filter(|p| p.position.distance_squared(&center) <= r2).collect()
    }

    // ---- objects ----

    pub fn add_object(&mut self, entry: ObjectEntry) {
        if self.objects.len() >= MAX_OBJECTS || self.object_index.contains_key(&entry.id) {
            return;
        }
        let idx = self.objects.len();
        self.object_index.insert(entry.id, idx);
        self.objects.push(entry);
    }

    pub fn remove_object(&mut self, id: i32) {
        let Some(&idx) = self.object_index.get(&id) else { return };
        self.object_index.remove(&id);
        let last_idx = self.objects.len() - 1;
        if idx != last_idx {
            self.objects.swap(idx, last_idx);
            let moved_id = self.objects[idx].id;
            self.object_index.insert(moved_id, idx);
        }
        self.objects.pop();
    }

    pub fn objects_in_range(&self, center: Vec3, radius: f32) -> Vec<&ObjectEntry> {
        let r2 = radius * radius;
        self.objects.iter().filter(|o| o.position.distance_squared(&center) <= r2).collect()
    }

    // ---- labels ----

    pub fn add_label(&mut self, entry: LabelEntry) {
        if self.labels.len() >= MAX_LABELS || self.label_index.contains_key(&entry.id) {
            return;
        }
        let idx = self.labels.len();
        let cell = grid_coord(entry.position);
        let attached_player = entry.attached_player;
        let attached_vehicle = entry.attached_vehicle;

        self.label_index.insert(entry.id, idx);
        self.labels.push(entry);
        self.label_spatial_hash.entry(cell).or_default().push(idx);
        if let Some(pid) = attached_player {
            self.labels_by_attached_player.entry(pid).or_default().push(idx);
        }
        if let Some(vid) = attached_vehicle {
            self.labels_by_attached_vehicle.entry(vid).or_default().push(idx);
        }
    }

    fn remove_label_from_spatial_hash(&mut self, idx: usize, position: Vec3) {
        let cell = grid_coord(position);
        if let Some(bucket) = self.label_spatial_hash.get_mut(&cell) {
            bucket.retain(|&i| i != idx);
            if bucket.is_empty() {
                self.label_spatial_hash.remove(&cell);
            }
        }
    }

    fn remove_label_from_attachment_maps(&mut self, idx: usize, player: Option<u16>, vehicle: Option<u16>) {
        if let Some(pid) = player {
            if let Some(bucket) = self.labels_by_attached_player.get_mut(&pid) {
                bucket.retain(|&i| i != idx);
                if bucket.is_empty() {
                    self.labels_by_attached_player.remove(&pid);
                }
            }
        }
        if let Some(vid) = vehicle {
            if let Some(bucket) = self.labels_by_attached_vehicle.get_mut(&vid) {
                bucket.retain(|&i| i != idx);
                if bucket.is_empty() {
                    self.labels_by_attached_vehicle.remove(&vid);
                }
            }
        }
    }

    fn add_label_to_indices(&mut self, idx: usize) {
        let (position, player, vehicle) = {
            let l = &self.labels[idx];
            (l.position, l.attached_player, l.attached_vehicle)
        };
        let cell = grid_coord(position);
        self.label_spatial_hash.entry(cell).or_default().push(idx);
        if let Some(pid) = player {
            self.labels_by_attached_player.entry(pid).or_default().push(idx);
        }
        if let Some(vid) = vehicle {
            self.labels_by_attached_vehicle.entry(vid).or_default().push(idx);
        }
    }

    /// Swap-with-last remove. The removed label's own spatial/attachment
    /// entries are dropped first; if a different label is swapped into its
    /// slot, that label's *old* index entries are removed before it is
    /// re-inserted once under the new index — never re-added twice.
    pub fn remove_label(&mut self, id: i32) {
        let Some(&idx) = self.label_index.get(&id) else { return };
        self.label_index.remove(&id);

        let removed = self.labels[idx].clone();
        self.remove_label_from_spatial_hash(idx, removed.position);
        self.remove_label_from_attachment_maps(idx, removed.attached_player, removed.attached_vehicle);

        let last_idx = self.labels.len() - 1;
        if idx != last_idx {
            let moved = self.labels[last_idx].clone();
            self.remove_label_from_spatial_hash(last_idx, moved.position);
            self.remove_label_from_attachment_maps(last_idx, moved.attached_player, moved.attached_vehicle);

            self.labels.swap(idx, last_idx);
            self.label_index.insert(moved.id, idx);
            self.add_label_to_indices(idx);
        }

        self.labels.pop();
    }

    pub fn label_count(&self) -> usize {
        self.labels.len()
    }

    pub fn find_label(&self, id: i32) -> Option<&LabelEntry> {
        self.label_index.get(&id).map(|&idx| &self.labels[idx])
    }

    /// Spatial-hash lookup over the `ceil(r/cell)` cell neighborhood,
    /// followed by a final squared-distance filter.
    pub fn labels_in_range(&self, center: Vec3, radius: f32) -> Vec<&LabelEntry> {
        let cell_radius = (radius / LABEL_GRID_CELL_SIZE).ceil() as i32;
        let center_cell = grid_coord(center);
        let r2 = radius * radius;

        let mut seen = std::collections::HashSet::new();
        let mut results = Vec::new();

        for dx in -cell_radius..=cell_radius {
            for dy in -cell_radius..=cell_radius {
                for dz in -cell_radius..=cell_radius {
                    let cell = GridCoord {
                        x: center_cell.x + dx,
                        y: center_cell.y + dy,
                        z: center_cell.z + dz,
                    };
                    let Some(bucket) = self.label_spatial_hash.get(&cell) else { continue };
                    for &idx in bucket {
                        if !seen.insert(idx) {
                            continue;
                        }
                        let label = &self.labels[idx];
                        if label.position.distance_squared(&center) <= r2 {
                            results.push(label);
                        }
                    }
                }
            }
        }

        results
    }

    /// Brute-force fallback used by tests to cross-check the spatial-hash path.
    pub fn labels_in_range_linear(&self, center: Vec3, radius: f32) -> Vec<&LabelEntry> {
        let r2 = radius * radius;
        self.labels.iter().filter(|l| l.position.distance_squared(&center) <= r2).collect()
    }

    pub fn labels_attached_to_player(&self, player_id: u16) -> Vec<&LabelEntry> {
        self.labels_by_attached_player
            .get(&player_id)
            .map(|idxs| idxs.iter().map(|&i| &self.labels[i]).collect())
            .unwrap_or_default()
    }

    pub fn labels_attached_to_vehicle(&self, vehicle_id: u16) -> Vec<&LabelEntry> {
        self.labels_by_attached_vehicle
            .get(&vehicle_id)
            .map(|idxs| idxs.iter().map(|&i| &self.labels[i]).collect())
            .unwrap_or_default()
    }

    pub fn clear(&mut self) {
        self.pickups.clear();
        self.pickup_index.clear();
        self.objects.clear();
        self.object_index.clear();
        self.labels.clear();
        self.label_index.clear();
        self.label_spatial_hash.clear();
        self.labels_by_attached_player.clear();
        self.labels_by_attached_vehicle.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn label(id: i32, pos: Vec3) -> LabelEntry {
        LabelEntry {
            id,
            position: pos,
            attached_player: None,
            attached_vehicle: None,
            text: format!("label-{id}"),
            draw_distance: 50.0,
            test_los: false,
        }
    }

    #[test]
    fn swap_delete_preserves_remaining_labels() {
        let mut pool = StreamableResourcePool::new();
        pool.add_label(label(10, Vec3::new(0.0, 0.0, 0.0)));
        pool.add_label(label(20, Vec3::new(1.0, 0.0, 0.0)));
        pool.add_label(label(30, Vec3::new(2.0, 0.0, 0.0)));

        pool.remove_label(20);

        assert_eq!(pool.label_count(), 2);
        assert!(pool.find_label(20).is_none());
        let remaining = pool.find_label(30).unwrap();
        assert_eq!(remaining.text, "label-30");
    }

    #[test]
    fn spatial_hash_matches_linear_scan_after_swap_delete() {
        let mut pool = StreamableResourcePool::new();
        for i in 0..20 {
            pool.add_label(label(i, Vec3::new(i as f32 * 0.5, 0.0, 0.0)));
        }
        pool.remove_label(5);
        pool.remove_label(0);

        let center = Vec3::new(3.0, 0.0, 0.0);
        let mut hashed: Vec<i32> = pool.labels_in_range(center, 5.0).iter().map(|l| l.id).collect();
        let mut linear: Vec<i32> = pool.labels_in_range_linear(center, 5.0).iter().map(|l| l.id).collect();
        hashed.sort();
        linear.sort();
        assert_eq!(hashed, linear);
    }

    #[test]
    fn attachment_index_is_consistent_after_remove() {
        let mut pool = StreamableResourcePool::new();
        let mut l = label(1, Vec3::ZERO);
        l.attached_player = Some(7);
        pool.add_label(l);
        assert_eq!(pool.labels_attached_to_player(7).len(), 1);
        pool.remove_label(1);
        assert_eq!(pool.labels_attached_to_player(7).len(), 0);
    }

    #[test]
    fn add_then_remove_restores_pre_add_state() {
        let mut pool = StreamableResourcePool::new();
        pool.add_label(label(99, Vec3::new(5.0, 5.0, 5.0)));
        pool.remove_label(99);
        assert_eq!(pool.label_count(), 0);
        assert!(pool.label_spatial_hash.is_empty());
        assert!(pool.labels_by_attached_player.is_empty());
    }
}
