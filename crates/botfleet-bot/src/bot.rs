use std::collections::{HashMap, VecDeque};
use std::time::{Duration, Instant};

use serde_json::json;
use uuid::Uuid;

use botfleet_core::types::{
    BotStatus, ServerAddress, Vec3, MAX_CHATBOX_SIZE, MAX_PATH_SPAN, RECONNECT_DELAY_MS,
    RESPAWN_DELAY_MS, STREAM_RANGE, SYNC_INTERVAL_MS,
};
use botfleet_queue::AdmissionCandidate;
use botfleet_transport::{SendReliability, SyncKind, Transport, TransportEvent};
use botfleet_world::{
    LabelEntry, ObjectEntry, PickupEntry, PlayerEntry, SharedWorldPool, StreamableResourcePool,
    VehicleEntry,
};

use crate::flags::{BotFlag, BotFlags, Dialog, DialogStyle, MoveType, MovepathStatus};
use crate::pathing::find_path;
use crate::rpc;

/// Degrees-per-radian, used when converting `atan2` output to the bot's
/// facing angle convention (0 = north, clockwise).
const RAD_TO_DEG: f32 = 180.0 / std::f32::consts::PI;
/// Direct-shortcut threshold for `go_with_path` — below this height delta
/// an unobstructed straight line is good enough, no pathfinding needed.
const DIRECT_STEP_MAX: f32 = 3.0;

fn move_speed(move_type: MoveType) -> f32 {
    match move_type {
        MoveType::Walk => 100.0,
        MoveType::Run => 200.0,
        MoveType::Sprint => 300.0,
        MoveType::Drive => 500.0,
        MoveType::Auto => 200.0,
    }
}

/// Normalizes an angle in degrees into `[0, 360)`.
fn normalize_angle(deg: f32) -> f32 {
    let mut a = deg % 360.0;
    if a < 0.0 {
        a += 360.0;
    }
    a
}

/// Maps a wire dialog-style byte onto [`DialogStyle`]. Unknown values fall
/// back to `MsgBox`, the simplest style.
fn dialog_style_from_wire(byte: u8) -> DialogStyle {
    match byte {
        1 => DialogStyle::Input,
        2 => DialogStyle::Password,
        3 => DialogStyle::List,
        4 => DialogStyle::TabList,
        5 => DialogStyle::TabListHeaders,
        _ => DialogStyle::MsgBox,
    }
}

/// A single fleet bot's full mutable state: connection lifecycle, pose,
/// movement/pathing, and the chatbox/event buffers the LLM tools read from.
/// Field layout is grounded on the original `CBot` — RPC ids and wire
/// encoding live in [`crate::rpc`]; this struct only holds the bot's own
/// view of the world plus the shared pools it mutates as RPCs arrive.
pub struct Bot {
    pub id: Uuid,
    pub server: ServerAddress,
    pub nickname: String,
    pub password: String,
    pub system_prompt: String,

    pub status: BotStatus,
    pub game_inited: bool,
    pub player_id: Option<u16>,
    reconnect_tick: Option<Instant>,

    pub position: Vec3,
    pub velocity: Vec3,
    pub angle: f32,
    pub health: f32,
    pub armor: f32,
    pub invulnerable: bool,
    pub skin: u32,
    pub weapons: HashMap<u32, u32>,

    pub flags: BotFlags,
    died_at: Option<Instant>,

    move_destination: Option<Vec3>,
    move_started_at: Option<Instant>,
    move_duration_secs: f32,

    pub movepath: Vec<Vec3>,
    movepath_index: usize,
    movepath_status: MovepathStatus,
    pub movepath_looping: bool,

    pub chatbox: VecDeque<String>,
    pub unread_chat: Vec<String>,
    pub important_events: Vec<String>,
    pub dialog: Option<Dialog>,

    last_sync_tick: Instant,

    /// Outbound wire sends queued by tool handlers (which run synchronously
    /// off the session worker) for the tick loop to flush through the
    /// transport on the bot's own async task.
    outbound: VecDeque<OutboundMessage>,
}

/// A single queued outbound transport send. `rpc_id` is prefixed onto the
/// wire bytes the same way `TransportEvent::Rpc`'s `id` arrives on the
/// inbound side — the transport adapter is free to reframe it however its
/// dialect expects, but this crate never loses track of which RPC it meant.
pub struct OutboundMessage {
    pub channel: u8,
    pub bytes: Vec<u8>,
    pub reliability: SendReliability,
    pub priority: u8,
}

impl Bot {
    pub fn new(
        server: ServerAddress,
        nickname: impl Into<String>,
        password: impl Into<String>,
        system_prompt: impl Into<String>,
    ) -> Self {
        let now = Instant::now();
        Self {
            id: Uuid::new_v4(),
            server,
            nickname: nickname.into(),
            password: password.into(),
            system_prompt: system_prompt.into(),
            status: BotStatus::Disconnected,
            game_inited: false,
            player_id: None,
            reconnect_tick: None,
            position: Vec3::ZERO,
            velocity: Vec3::ZERO,
            angle: 0.0,
            health: 100.0,
            armor: 0.0,
            invulnerable: false,
            skin: 0,
            weapons: HashMap::new(),
            flags: BotFlags::default(),
            died_at: None,
            move_destination: None,
            move_started_at: None,
            move_duration_secs: 0.0,
            movepath: Vec::new(),
            movepath_index: 0,
            movepath_status: MovepathStatus::Inactive,
            movepath_looping: false,
            chatbox: VecDeque::with_capacity(MAX_CHATBOX_SIZE),
            unread_chat: Vec::new(),
            important_events: Vec::new(),
            dialog: None,
            last_sync_tick: now,
            outbound: VecDeque::new(),
        }
    }

    /// Queues a wire send tagged with `rpc_id`; the tick loop drains these
    /// via [`Bot::drain_outbound`] and flushes them through the transport.
    pub fn queue_send(
        &mut self,
        channel: u8,
        rpc_id: u8,
        payload: Vec<u8>,
        reliability: SendReliability,
        priority: u8,
    ) {
        let mut bytes = Vec::with_capacity(payload.len() + 1);
        bytes.push(rpc_id);
        bytes.extend_from_slice(&payload);
        self.outbound.push_back(OutboundMessage {
            channel,
            bytes,
            reliability,
            priority,
        });
    }

    pub fn drain_outbound(&mut self) -> Vec<OutboundMessage> {
        self.outbound.drain(..).collect()
    }

    /// Resets connection-lifecycle state back to `Disconnected`. Any
    /// protocol fault or transport disconnect routes here regardless of
    /// which state the bot was in beforehand.
    fn reset_connection(&mut self) {
        self.status = BotStatus::Disconnected;
        self.game_inited = false;
        self.player_id = None;
        self.reconnect_tick = Some(Instant::now());
    }

    /// Forces the bot back to `Disconnected` with its reconnect delay
    /// already elapsed, so the next admission cycle is free to re-admit it
    /// immediately. Used by the `POST /api/bot/reconnect` control-plane
    /// endpoint — an operator override of the normal 4s backoff.
    pub fn force_reconnect(&mut self) {
        self.status = BotStatus::Disconnected;
        self.game_inited = false;
        self.player_id = None;
        self.reconnect_tick = None;
    }

    pub async fn connect(&mut self, transport: &mut dyn Transport) {
        if transport.connect(&self.server.host, self.server.port).await.is_err() {
            self.reset_connection();
            return;
        }
        self.status = BotStatus::Connecting;
        self.reconnect_tick = Some(Instant::now());
    }

    fn push_chat(&mut self, line: String) {
        if self.chatbox.len() >= MAX_CHATBOX_SIZE {
            self.chatbox.pop_front();
        }
        self.chatbox.push_back(line.clone());
        self.unread_chat.push(line);
    }

    fn note_event(&mut self, event: impl Into<String>) {
        self.important_events.push(event.into());
    }

    /// Clears death state and resets life stats after a successful spawn.
    fn on_spawned(&mut self) {
        self.flags.clear(BotFlag::Dead);
        self.health = 100.0;
        self.armor = 0.0;
        self.died_at = None;
    }

    fn handle_event(
        &mut self,
        world: &SharedWorldPool,
        streamables: &mut StreamableResourcePool,
        event: TransportEvent,
    ) {
        match event {
            TransportEvent::AuthChallenge { salt } => {
                // The real 512-entry response table is transport-adapter
                // territory (wire layout is an oracle); echo the salt back
                // as the response payload placeholder.
                self.queue_send(0, rpc::RPC_AUTH_RESPONSE, salt, SendReliability::ReliableOrdered, 0);
                self.status = BotStatus::WaitForJoin;
            }
            TransportEvent::Accepted { player_id, challenge } => {
                self.player_id = Some(player_id);
                let mut payload = Vec::with_capacity(self.nickname.len() + challenge.len() + 1);
                payload.push(self.nickname.len() as u8);
                payload.extend_from_slice(self.nickname.as_bytes());
                payload.extend_from_slice(&challenge);
                self.queue_send(0, rpc::RPC_CLIENT_JOIN, payload, SendReliability::ReliableOrdered, 0);
                self.status = BotStatus::Connected;
            }
            TransportEvent::Rpc { id, payload } => self.handle_rpc(world, streamables, id, payload),
            TransportEvent::Sync { kind, payload } => self.handle_sync(world, kind, &payload),
            TransportEvent::Disconnected { reason } => {
                self.note_event(format!("disconnected: {reason:?}"));
                self.reset_connection();
            }
        }
    }

    /// Switch over the RPC ids this crate understands (see [`crate::rpc`]).
    /// Forced position/health/armor mutations each append an important
    /// event; world/streamable-pool RPCs mutate the shared pools directly.
    fn handle_rpc(
        &mut self,
        world: &SharedWorldPool,
        streamables: &mut StreamableResourcePool,
        id: u8,
        payload: Vec<u8>,
    ) {
        let mut cursor = rpc::Cursor::new(&payload);
        match id {
            rpc::RPC_INIT_GAME => {
                if self.status == BotStatus::Connected {
                    self.game_inited = true;
                    self.queue_send(0, rpc::RPC_OUT_REQUEST_CLASS, vec![0], SendReliability::ReliableOrdered, 0);
                }
            }
            rpc::RPC_REQUEST_CLASS | rpc::RPC_SET_SPAWN_INFO => {
                if id == rpc::RPC_SET_SPAWN_INFO {
                    if let Some(pos) = cursor.vec3() {
                        self.position = pos;
                    }
                }
                self.queue_send(0, rpc::RPC_OUT_REQUEST_SPAWN, Vec::new(), SendReliability::ReliableOrdered, 0);
            }
            rpc::RPC_REQUEST_SPAWN => {
                if cursor.u8().unwrap_or(0) != 0 {
                    self.queue_send(0, rpc::RPC_SPAWN, Vec::new(), SendReliability::ReliableOrdered, 0);
                    self.status = BotStatus::Spawned;
                    self.on_spawned();
                }
            }
            rpc::RPC_PLAYER_JOIN => {
                let (Some(player_id), Some(name)) = (cursor.u16_le(), cursor.string_u8_len()) else {
                    return;
                };
                let skin = cursor.u32_le().unwrap_or(0);
                world.with_resources(&self.server, |res| {
                    res.add_player(PlayerEntry {
                        id: player_id,
                        name,
                        health: 100.0,
                        armor: 0.0,
                        position: Vec3::ZERO,
                        velocity: Vec3::ZERO,
                        is_driving: false,
                        weapon: 0,
                        vehicle_id: None,
                        skin,
                        is_npc: false,
                        stream_count: 0,
                    });
                });
            }
            rpc::RPC_PLAYER_QUIT => {
                if let Some(player_id) = cursor.u16_le() {
                    world.with_resources(&self.server, |res| res.remove_player_by_id(player_id));
                }
            }
            rpc::RPC_VEHICLE_SPAWN => {
                let (Some(vehicle_id), Some(model)) = (cursor.u16_le(), cursor.u32_le()) else {
                    return;
                };
                world.with_resources(&self.server, |res| {
                    res.add_vehicle(VehicleEntry {
                        id: vehicle_id,
                        health: 1000.0,
                        position: Vec3::ZERO,
                        velocity: Vec3::ZERO,
                        model,
                        stream_count: 0,
                    });
                });
            }
            rpc::RPC_VEHICLE_DESTROY => {
                if let Some(vehicle_id) = cursor.u16_le() {
                    world.with_resources(&self.server, |res| res.remove_vehicle(vehicle_id));
                }
            }
            rpc::RPC_STREAM_IN_PLAYER => {
                if let Some(player_id) = cursor.u16_le() {
                    world.with_resources(&self.server, |res| res.increment_player_stream_count(player_id));
                }
            }
            rpc::RPC_STREAM_OUT_PLAYER => {
                if let Some(player_id) = cursor.u16_le() {
                    world.with_resources(&self.server, |res| res.decrement_player_stream_count(player_id));
                }
            }
            rpc::RPC_STREAM_IN_VEHICLE => {
                if let Some(vehicle_id) = cursor.u16_le() {
                    world.with_resources(&self.server, |res| res.increment_vehicle_stream_count(vehicle_id));
                }
            }
            rpc::RPC_STREAM_OUT_VEHICLE => {
                if let Some(vehicle_id) = cursor.u16_le() {
                    world.with_resources(&self.server, |res| res.decrement_vehicle_stream_count(vehicle_id));
                }
            }
            rpc::RPC_SET_PLAYER_POS => {
                if let Some(pos) = cursor.vec3() {
                    self.position = pos;
                    self.note_event("position forced by server");
                }
            }
            rpc::RPC_SET_PLAYER_HEALTH => {
                if let Some(health) = cursor.f32_le() {
                    self.health = health;
                    self.note_event("health forced by server");
                }
            }
            rpc::RPC_SET_PLAYER_ARMOR => {
                if let Some(armor) = cursor.f32_le() {
                    self.armor = armor;
                    self.note_event("armor forced by server");
                }
            }
            rpc::RPC_CREATE_PICKUP => {
                let (Some(pickup_id), Some(model), Some(position)) =
                    (cursor.i32_le(), cursor.i32_le(), cursor.vec3())
                else {
                    return;
                };
                streamables.add_pickup(PickupEntry { id: pickup_id, model, position });
            }
            rpc::RPC_DESTROY_PICKUP => {
                if let Some(pickup_id) = cursor.i32_le() {
                    streamables.remove_pickup(pickup_id);
                }
            }
            rpc::RPC_CREATE_OBJECT => {
                let (Some(object_id), Some(model), Some(position), Some(rotation), Some(draw_distance)) =
                    (cursor.i32_le(), cursor.i32_le(), cursor.vec3(), cursor.vec3(), cursor.f32_le())
                else {
                    return;
                };
                streamables.add_object(ObjectEntry {
                    id: object_id,
                    model,
                    position,
                    rotation,
                    draw_distance,
                    material_text: None,
                });
            }
            rpc::RPC_DESTROY_OBJECT => {
                if let Some(object_id) = cursor.i32_le() {
                    streamables.remove_object(object_id);
                }
            }
            rpc::RPC_CREATE_LABEL => {
                let (
                    Some(label_id),
                    Some(position),
                    Some(text),
                    Some(draw_distance),
                    Some(test_los_byte),
                    Some(attached_player_raw),
                    Some(attached_vehicle_raw),
                ) = (
                    cursor.i32_le(),
                    cursor.vec3(),
                    cursor.string_u8_len(),
                    cursor.f32_le(),
                    cursor.u8(),
                    cursor.i16_le(),
                    cursor.i16_le(),
                )
                else {
                    return;
                };
                streamables.add_label(LabelEntry {
                    id: label_id,
                    position,
                    attached_player: (attached_player_raw >= 0).then_some(attached_player_raw as u16),
                    attached_vehicle: (attached_vehicle_raw >= 0).then_some(attached_vehicle_raw as u16),
                    text,
                    draw_distance,
                    test_los: test_los_byte != 0,
                });
            }
            rpc::RPC_DESTROY_LABEL => {
                if let Some(label_id) = cursor.i32_le() {
                    streamables.remove_label(label_id);
                }
            }
            rpc::RPC_SHOW_DIALOG => {
                let (Some(dialog_id), Some(style_byte), Some(title), Some(body), Some(left_label), Some(right_label)) = (
                    cursor.i32_le(),
                    cursor.u8(),
                    cursor.string_u8_len(),
                    cursor.string_u16_len(),
                    cursor.string_u8_len(),
                    cursor.string_u8_len(),
                ) else {
                    return;
                };
                self.dialog = Some(Dialog {
                    id: dialog_id,
                    style: dialog_style_from_wire(style_byte),
                    title,
                    body,
                    left_label,
                    right_label,
                });
            }
            rpc::RPC_CHAT_MESSAGE => {
                let Some(sender) = cursor.string_u8_len() else { return };
                let text = cursor.remaining_string();
                self.receive_chat(&sender, &text);
            }
            _ => {}
        }
    }

    /// Updates the shared world pool from a `Sync` packet describing some
    /// other entity's kinematic state. Bullet/aim syncs carry no entity
    /// this pool models, so they're dropped.
    fn handle_sync(&mut self, world: &SharedWorldPool, kind: SyncKind, payload: &[u8]) {
        let mut cursor = rpc::Cursor::new(payload);
        match kind {
            SyncKind::Player => {
                let (Some(id), Some(position), Some(velocity), Some(health), Some(armor)) =
                    (cursor.u16_le(), cursor.vec3(), cursor.vec3(), cursor.f32_le(), cursor.f32_le())
                else {
                    return;
                };
                world.with_resources(&self.server, |res| res.update_player(id, position, velocity, health, armor));
            }
            SyncKind::Vehicle | SyncKind::Passenger | SyncKind::Trailer | SyncKind::Unoccupied => {
                let (Some(id), Some(position), Some(velocity), Some(health)) =
                    (cursor.u16_le(), cursor.vec3(), cursor.vec3(), cursor.f32_le())
                else {
                    return;
                };
                world.with_resources(&self.server, |res| res.update_vehicle(id, position, velocity, health));
            }
            SyncKind::Bullet | SyncKind::Aim => {}
        }
    }

    /// Drains queued transport events, advances death/respawn and movement
    /// timers, and emits a synthetic on-foot sync at [`SYNC_INTERVAL_MS`].
    /// Returns `true` if a sync was emitted this tick.
    pub fn process(
        &mut self,
        now: Instant,
        transport: &mut dyn Transport,
        world: &SharedWorldPool,
        streamables: &mut StreamableResourcePool,
    ) -> bool {
        while let Some(event) = transport.poll_event() {
            self.handle_event(world, streamables, event);
        }

        if self.flags.get(BotFlag::Dead) {
            if let Some(died_at) = self.died_at {
                if now.duration_since(died_at) >= Duration::from_millis(RESPAWN_DELAY_MS) {
                    self.respawn();
                }
            }
            return false;
        }

        self.advance_movement(now);

        if now.duration_since(self.last_sync_tick) >= Duration::from_millis(SYNC_INTERVAL_MS) {
            self.last_sync_tick = now;
            return true;
        }
        false
    }

    fn respawn(&mut self) {
        self.flags.clear(BotFlag::Dead);
        self.died_at = None;
        self.health = 100.0;
        self.armor = 0.0;
    }

    pub fn kill(&mut self) {
        self.flags.set(BotFlag::Dead);
        self.health = 0.0;
        self.velocity = Vec3::ZERO;
        self.move_destination = None;
        self.movepath_status = MovepathStatus::Inactive;
        self.died_at = Some(Instant::now());
    }

    /// Turns the bot to face `destination` and sets a velocity/duration pair
    /// so straight-line movement completes exactly when the destination is
    /// reached. Facing convention: `atan2(dy, dx)` rotated 270 degrees,
    /// normalized into `[0, 360)`.
    pub fn go(&mut self, destination: Vec3, move_type: MoveType) {
        let delta = destination.sub(&self.position);
        let distance = delta.length();
        if distance < f32::EPSILON {
            return;
        }

        let facing = delta.y.atan2(delta.x) * RAD_TO_DEG + 270.0;
        self.angle = normalize_angle(facing);

        let speed = move_speed(move_type);
        self.velocity = delta.normalize().scale(speed / 100.0);
        self.move_destination = Some(destination);
        self.move_started_at = Some(Instant::now());
        self.move_duration_secs = distance / self.velocity.length();
        self.flags.set(BotFlag::Moving);
        self.flags.set_to(BotFlag::Driving, move_type == MoveType::Drive);
    }

    /// Moves to `destination`, taking a direct straight line when the
    /// transport's raycast oracle reports it clear and the height delta is
    /// small; otherwise pathfinds via the transport's raycast oracle and
    /// loads the resulting waypoints as a movepath. Fails (and records an
    /// important event) only when the pathfinding fallback itself fails.
    pub fn go_with_path(
        &mut self,
        destination: Vec3,
        transport: &dyn Transport,
        move_type: MoveType,
    ) -> bool {
        let unobstructed = transport.raycast(self.position, destination).is_none();
        if unobstructed && (self.position.z - destination.z).abs() < DIRECT_STEP_MAX {
            self.go(destination, move_type);
            return true;
        }

        match find_path(transport, self.position, destination) {
            Some(path) => {
                self.movepath = path;
                self.movepath_index = 0;
                self.movepath_status = MovepathStatus::Active;
                if let Some(&first) = self.movepath.get(1) {
                    self.go(first, move_type);
                }
                true
            }
            None => {
                self.note_event("Pathfinder failed!");
                false
            }
        }
    }

    fn advance_movement(&mut self, now: Instant) {
        let (Some(destination), Some(started_at)) = (self.move_destination, self.move_started_at)
        else {
            return;
        };

        let elapsed = now.duration_since(started_at).as_secs_f32();
        if elapsed >= self.move_duration_secs {
            self.position = destination;
            self.velocity = Vec3::ZERO;
            self.move_destination = None;
            self.move_started_at = None;
            self.flags.clear(BotFlag::Moving);
            self.advance_movepath(now);
        } else {
            self.position = self.position.add(&self.velocity.scale(elapsed));
        }
    }

    fn advance_movepath(&mut self, now: Instant) {
        if self.movepath_status != MovepathStatus::Active {
            return;
        }
        self.movepath_index += 1;
        if self.movepath_index + 1 >= self.movepath.len() {
            if self.movepath_looping {
                self.movepath_index = 0;
            } else {
                self.movepath_status = MovepathStatus::Completed;
                return;
            }
        }
        if let Some(&next) = self.movepath.get(self.movepath_index + 1) {
            self.go(next, MoveType::Run);
            // `go` stamps a fresh `move_started_at`; keep it anchored to the
            // tick that actually triggered the hop.
            self.move_started_at = Some(now);
        }
    }

    pub fn receive_chat(&mut self, from: &str, text: &str) {
        self.push_chat(format!("{from}: {text}"));
    }

    /// Snapshots the bot's situational state for the LLM prompt, then clears
    /// the unread-chat and important-event buffers — each snapshot is a
    /// one-shot read.
    pub fn generate_state_json(
        &mut self,
        world: &SharedWorldPool,
        streamables: &StreamableResourcePool,
    ) -> serde_json::Value {
        let streamed_players = world
            .with_resources_ref(&self.server, |res| res.players_in_range(self.position, STREAM_RANGE, true).len())
            .unwrap_or(0);
        let streamed_vehicles = world
            .with_resources_ref(&self.server, |res| res.vehicles_in_range(self.position, STREAM_RANGE).len())
            .unwrap_or(0);
        let streamed_pickups = streamables.pickups_in_range(self.position, STREAM_RANGE).len();
        let streamed_labels = streamables.labels_in_range(self.position, STREAM_RANGE).len();

        let dialog = self.dialog.as_ref().map(|d| {
            json!({
                "id": d.id,
                "style": d.style.as_str(),
                "title": d.title,
                "body": d.body,
                "left_label": d.left_label,
                "right_label": d.right_label,
            })
        });

        let snapshot = json!({
            "nickname": self.nickname,
            "status": self.status,
            "position": self.position.rounded(),
            "angle": self.angle,
            "health": self.health,
            "armor": self.armor,
            "dead": self.flags.get(BotFlag::Dead),
            "driving": self.flags.get(BotFlag::Driving),
            "moving": self.flags.get(BotFlag::Moving),
            "streamed_players": streamed_players,
            "streamed_vehicles": streamed_vehicles,
            "streamed_pickups": streamed_pickups,
            "streamed_labels": streamed_labels,
            "unread_chat": self.unread_chat,
            "important_events": self.important_events,
            "dialog": dialog,
        });
        self.unread_chat.clear();
        self.important_events.clear();
        snapshot
    }
}

impl AdmissionCandidate for Bot {
    fn server_address(&self) -> ServerAddress {
        self.server.clone()
    }

    fn status(&self) -> BotStatus {
        self.status
    }

    fn game_inited(&self) -> bool {
        self.game_inited
    }

    fn past_reconnect_delay(&self) -> bool {
        match self.reconnect_tick {
            None => true,
            Some(tick) => Instant::now().duration_since(tick) >= Duration::from_millis(RECONNECT_DELAY_MS),
        }
    }

    fn begin_connect(&mut self) {
        self.status = BotStatus::Connecting;
        self.reconnect_tick = Some(Instant::now());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use botfleet_transport::MockTransport;

    fn bot() -> Bot {
        Bot::new(ServerAddress::new("gta.example", 7777), "Bot1", "pw", "prompt")
    }

    fn pools() -> (SharedWorldPool, StreamableResourcePool) {
        (SharedWorldPool::new(), StreamableResourcePool::new())
    }

    #[test]
    fn go_faces_destination_and_sets_velocity() {
        let mut b = bot();
        b.position = Vec3::ZERO;
        b.go(Vec3::new(10.0, 0.0, 0.0), MoveType::Run);
        assert!(b.flags.get(BotFlag::Moving));
        assert!(b.velocity.length() > 0.0);
        assert!(b.move_duration_secs > 0.0);
    }

    #[test]
    fn kill_clears_movement_and_sets_dead_flag() {
        let mut b = bot();
        b.go(Vec3::new(10.0, 0.0, 0.0), MoveType::Run);
        b.kill();
        assert!(b.flags.get(BotFlag::Dead));
        assert_eq!(b.health, 0.0);
        assert_eq!(b.velocity, Vec3::ZERO);
    }

    #[test]
    fn process_respawns_after_delay_elapses() {
        let mut b = bot();
        let mut transport = MockTransport::new();
        let (world, mut streamables) = pools();
        b.kill();
        let later = Instant::now() + Duration::from_millis(RESPAWN_DELAY_MS + 10);
        b.process(later, &mut transport, &world, &mut streamables);
        assert!(!b.flags.get(BotFlag::Dead));
        assert_eq!(b.health, 100.0);
    }

    #[test]
    fn generate_state_json_clears_unread_buffers() {
        let mut b = bot();
        let (world, streamables) = pools();
        b.receive_chat("Alice", "hi");
        b.note_event("test event");
        let snapshot = b.generate_state_json(&world, &streamables);
        assert_eq!(snapshot["unread_chat"].as_array().unwrap().len(), 1);
        assert!(b.unread_chat.is_empty());
        assert!(b.important_events.is_empty());
    }

    #[test]
    fn generate_state_json_includes_open_dialog() {
        let mut b = bot();
        let (world, streamables) = pools();
        b.dialog = Some(Dialog {
            id: 1,
            style: DialogStyle::Input,
            title: "Title".into(),
            body: "Body".into(),
            left_label: "OK".into(),
            right_label: "Cancel".into(),
        });
        let snapshot = b.generate_state_json(&world, &streamables);
        assert_eq!(snapshot["dialog"]["title"], "Title");
        assert_eq!(snapshot["dialog"]["style"], "input");
    }

    #[test]
    fn past_reconnect_delay_is_true_before_first_connect_attempt() {
        let b = bot();
        assert!(b.past_reconnect_delay());
    }

    #[test]
    fn go_with_path_takes_direct_shortcut_when_unobstructed_and_flat() {
        let mut b = bot();
        let transport = MockTransport::new();
        let dest = Vec3::new(10.0, 0.0, 1.0);
        assert!(b.go_with_path(dest, &transport, MoveType::Run));
        assert!(b.flags.get(BotFlag::Moving));
        assert!(b.movepath.is_empty());
    }

    #[test]
    fn go_with_path_rejects_spans_beyond_max() {
        let mut b = bot();
        let transport = MockTransport::new();
        // z delta forces the pathfinding fallback instead of the direct
        // shortcut, so the span cap inside `find_path` actually applies.
        let far = Vec3::new(MAX_PATH_SPAN + 50.0, 0.0, 5.0);
        assert!(!b.go_with_path(far, &transport, MoveType::Run));
        assert_eq!(b.important_events.len(), 1);
    }
}
