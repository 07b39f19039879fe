use std::collections::HashSet;

use botfleet_core::types::{ServerAddress, Vec3, MAX_PLAYERS, MAX_VEHICLES};
use dashmap::DashMap;

/// A player entity as seen by a bot's shared-world view. Mirrors the
/// fields the original `stPlayer` struct tracked, minus the bot-internal
/// bookkeeping (current animation / special action) that only the owning
/// bot's own state machine needs.
#[derive(Debug, Clone)]
pub struct PlayerEntry {
    pub id: u16,
    pub name: String,
    pub health: f32,
    pub armor: f32,
    pub position: Vec3,
    pub velocity: Vec3,
    pub is_driving: bool,
    pub weapon: u8,
    pub vehicle_id: Option<u16>,
    pub skin: u32,
    pub is_npc: bool,
    pub stream_count: u32,
}

#[derive(Debug, Clone)]
pub struct VehicleEntry {
    pub id: u16,
    pub health: f32,
    pub position: Vec3,
    pub velocity: Vec3,
    pub model: u32,
    pub stream_count: u32,
}

/// Dense player/vehicle resources tracked for a single `(host, port)`.
///
/// Entries are deduplicated by an id+name hash; `stream_count` is
/// reference-counted across however many bots are currently streaming the
/// entity in, and a decrement to zero removes it via swap-with-last.
#[derive(Debug, Default)]
pub struct SharedServerResources {
    players: Vec<PlayerEntry>,
    vehicles: Vec<VehicleEntry>,
    player_hashes: HashSet<u64>,
    vehicle_hashes: HashSet<u64>,
}

fn hash_player(id: u16, name: &str) -> u64 {
    use std::hash::{Hash, Hasher};
    let mut hasher = std::collections::hash_map::DefaultHasher::new();
    id.hash(&mut hasher);
    name.hash(&mut hasher);
    hasher.finish()
}

fn hash_vehicle(id: u16, model: u32) -> u64 {
    use std::hash::{Hash, Hasher};
    let mut hasher = std::collections::hash_map::DefaultHasher::new();
    id.hash(&mut hasher);
    model.hash(&mut hasher);
    hasher.finish()
}

impl SharedServerResources {
    fn find_player_index(&self, id: u16) -> Option<usize> {
        self.players.iter().position(|p| p.id == id)
    }

    fn find_vehicle_index(&self, id: u16) -> Option<usize> {
        self.vehicles.iter().position(|v| v.id == id)
    }

    pub fn add_player(&mut self, entry: PlayerEntry) {
        if self.players.len() >= MAX_PLAYERS {
            return;
        }
        let hash = hash_player(entry.id, &entry.name);
        if !self.player_hashes.insert(hash) {
            return;
        }
        self.players.push(entry);
    }

    pub fn add_vehicle(&mut self, entry: VehicleEntry) {
        if self.vehicles.len() >= MAX_VEHICLES {
            return;
        }
        let hash = hash_vehicle(entry.id, entry.model);
        if !self.vehicle_hashes.insert(hash) {
            return;
        }
        self.vehicles.push(entry);
    }

    pub fn update_player(&mut self, id: u16, position: Vec3, velocity: Vec3, health: f32, armor: f32) {
        if let Some(idx) = self.find_player_index(id) {
            let p = &mut self.players[idx];
            p.position = position;
            p.velocity = velocity;
            p.health = health;
            p.armor = armor;
        }
    }

    pub fn update_vehicle(&mut self, id: u16, position: Vec3, velocity: Vec3, health: f32) {
        if let Some(idx) = self.find_vehicle_index(id) {
            let v = &mut self.vehicles[idx];
            v.position = position;
            v.velocity = velocity;
            v.health = health;
        }
    }

    pub fn increment_player_stream_count(&mut self, id: u16) {
        if let Some(idx) = self.find_player_index(id) {
            self.players[idx].stream_count += 1;
        }
    }

    /// Decrementing to zero swap-removes the entry and frees its dedup hash.
    pub fn decrement_player_stream_count(&mut self, id: u16) {
        let Some(idx) = self.find_player_index(id) else { return };
        if self.players[idx].stream_count > 0 {
            self.players[idx].stream_count -= 1;
        }
        if self.players[idx].stream_count == 0 {
            self.remove_player_by_index(idx);
        }
    }

    pub fn increment_vehicle_stream_count(&mut self, id: u16) {
        if let Some(idx) = self.find_vehicle_index(id) {
            self.vehicles[idx].stream_count += 1;
        }
    }

    pub fn decrement_vehicle_stream_count(&mut self, id: u16) {
        let Some(idx) = self.find_vehicle_index(id) else { return };
        if self.vehicles[idx].stream_count > 0 {
            self.vehicles[idx].stream_count -= 1;
        }
        if self.vehicles[idx].stream_count == 0 {
            self.remove_vehicle_by_index(idx);
        }
    }

    fn remove_player_by_index(&mut self, idx: usize) {
        let entry = &self.players[idx];
        self.player_hashes.remove(&hash_player(entry.id, &entry.name));
        self.players.swap_remove(idx);
    }

    fn remove_vehicle_by_index(&mut self, idx: usize) {
        let entry = &self.vehicles[idx];
        self.vehicle_hashes.remove(&hash_vehicle(entry.id, entry.model));
        self.vehicles.swap_remove(idx);
    }

    /// No-op if `id` isn't present (invariant violations are silently ignored).
    pub fn remove_player_by_id(&mut self, id: u16) {
        if let Some(idx) = self.find_player_index(id) {
            self.remove_player_by_index(idx);
        }
    }

    pub fn remove_player_by_name(&mut self, name: &str) {
        if let Some(idx) = self.players.iter().position(|p| p.name == name) {
            self.remove_player_by_index(idx);
        }
    }

    pub fn remove_vehicle(&mut self, id: u16) {
        if let Some(idx) = self.find_vehicle_index(id) {
            self.remove_vehicle_by_index(idx);
        }
    }

    pub fn player_name(&self, id: u16) -> Option<&str> {
        self.find_player_index(id).map(|idx| self.players[idx].name.as_str())
    }

    pub fn players_in_range(&self, center: Vec3, radius: f32, include_npcs: bool) -> Vec<&PlayerEntry> {
        let r2 = radius * radius;
        self.players
            .iter()
            .filter(|p| include_npcs || !p.is_npc)
            .filter(|p| p.position.distance_squared(&center) <= r2)
            .collect()
    }

    pub fn vehicles_in_range(&self, center: Vec3, radius: f32) -> Vec<&VehicleEntry> {
        let r2 = radius * radius;
        self.vehicles
            .iter()
            .filter(|v| v.position.distance_squared(&center) <= r2)
            .collect()
    }

    pub fn all_players(&self, include_npcs: bool) -> Vec<PlayerEntry> {
        self.players
            .iter()
            .filter(|p| include_npcs || !p.is_npc)
            .cloned()
            .collect()
    }

    pub fn player_count(&self) -> usize {
        self.players.len()
    }

    pub fn vehicle_count(&self) -> usize {
        self.vehicles.len()
    }

    pub fn clear(&mut self) {
        self.players.clear();
        self.vehicles.clear();
        self.player_hashes.clear();
        self.vehicle_hashes.clear();
    }
}

/// Map `(host, port) → SharedServerResources`, shared across every bot
/// connected to the same destination. Accessed from both the transport
/// inbound pump (per-bot) and the tool-execution path (session worker).
#[derive(Default)]
pub struct SharedWorldPool {
    servers: DashMap<ServerAddress, SharedServerResources>,
}

impl SharedWorldPool {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_server(&self, addr: ServerAddress) {
        self.servers.entry(addr).or_default();
    }

    pub fn remove_server(&self, addr: &ServerAddress) {
        self.servers.remove(addr);
    }

    pub fn clear_server_resources(&self, addr: &ServerAddress) {
        if let Some(mut entry) = self.servers.get_mut(addr) {
            entry.clear();
        }
    }

    /// Runs `f` against the resources for `addr`, creating an empty entry
    /// first if needed — matches the "invalid addresses are a no-op"
    /// failure model by simply being a no-op when `f` finds nothing to do.
    pub fn with_resources<R>(&self, addr: &ServerAddress, f: impl FnOnce(&mut SharedServerResources) -> R) -> Option<R> {
        let mut entry = self.servers.get_mut(addr)?;
        Some(f(&mut entry))
    }

    pub fn with_resources_ref<R>(&self, addr: &ServerAddress, f: impl FnOnce(&SharedServerResources) -> R) -> Option<R> {
        let entry = self.servers.get(addr)?;
        Some(f(&entry))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn player(id: u16, name: &str) -> PlayerEntry {
        PlayerEntry {
            id,
            name: name.to_string(),
            health: 100.0,
            armor: 0.0,
            position: Vec3::ZERO,
            velocity: Vec3::ZERO,
            is_driving: false,
            weapon: 0,
            vehicle_id: None,
            skin: 0,
            is_npc: false,
            stream_count: 1,
        }
    }

    #[test]
    fn duplicate_add_is_idempotent() {
        let mut res = SharedServerResources::default();
        res.add_player(player(5, "A"));
        res.add_player(player(5, "A"));
        assert_eq!(res.player_count(), 1);
    }

    #[test]
    fn decrement_to_zero_removes_entry() {
        let mut res = SharedServerResources::default();
        res.add_player(player(5, "A"));
        res.decrement_player_stream_count(5);
        assert_eq!(res.player_count(), 0);
        assert!(res.player_name(5).is_none());
    }

    #[test]
    fn remove_by_missing_id_is_noop() {
        let mut res = SharedServerResources::default();
        res.remove_player_by_id(999);
        assert_eq!(res.player_count(), 0);
    }

    #[test]
    fn range_query_uses_squared_distance() {
        let mut res = SharedServerResources::default();
        let mut p = player(1, "near");
        p.position = Vec3::new(10.0, 0.0, 0.0);
        res.add_player(p);
        let mut far = player(2, "far");
        far.position = Vec3::new(1000.0, 0.0, 0.0);
        res.add_player(far);

        let found = res.players_in_range(Vec3::ZERO, 50.0, true);
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].id, 1);
    }
}
