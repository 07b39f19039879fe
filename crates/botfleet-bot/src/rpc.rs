//! RPC ids and a little-endian payload cursor used by the bot's own event
//! handling. The transport crate treats RPC ids/payloads as opaque bytes
//! (`TransportEvent::Rpc { id, payload }`) — the wire layout is an external
//! oracle, so these constants only need to stay internally consistent with
//! whichever adapter is plugged in underneath. Cursor shape mirrors
//! `botfleet-querier`'s reply parser.

use botfleet_core::types::Vec3;

// RPC ids the server sends to the bot.
pub const RPC_INIT_GAME: u8 = 1;
pub const RPC_REQUEST_CLASS: u8 = 2;
pub const RPC_SET_SPAWN_INFO: u8 = 3;
pub const RPC_REQUEST_SPAWN: u8 = 4;
pub const RPC_PLAYER_JOIN: u8 = 10;
pub const RPC_PLAYER_QUIT: u8 = 11;
pub const RPC_VEHICLE_SPAWN: u8 = 12;
pub const RPC_VEHICLE_DESTROY: u8 = 13;
pub const RPC_STREAM_IN_PLAYER: u8 = 14;
pub const RPC_STREAM_OUT_PLAYER: u8 = 15;
pub const RPC_STREAM_IN_VEHICLE: u8 = 16;
pub const RPC_STREAM_OUT_VEHICLE: u8 = 17;
pub const RPC_SET_PLAYER_POS: u8 = 20;
pub const RPC_SET_PLAYER_HEALTH: u8 = 21;
pub const RPC_SET_PLAYER_ARMOR: u8 = 22;
pub const RPC_CREATE_PICKUP: u8 = 30;
pub const RPC_DESTROY_PICKUP: u8 = 31;
pub const RPC_CREATE_OBJECT: u8 = 32;
pub const RPC_DESTROY_OBJECT: u8 = 33;
pub const RPC_CREATE_LABEL: u8 = 34;
pub const RPC_DESTROY_LABEL: u8 = 35;
pub const RPC_SHOW_DIALOG: u8 = 40;
pub const RPC_CHAT_MESSAGE: u8 = 41;

// RPC ids the bot sends to the server.
pub const RPC_CLIENT_JOIN: u8 = 50;
pub const RPC_OUT_REQUEST_CLASS: u8 = 51;
pub const RPC_OUT_REQUEST_SPAWN: u8 = 52;
pub const RPC_SPAWN: u8 = 53;
pub const RPC_AUTH_RESPONSE: u8 = 54;
pub const RPC_CHAT: u8 = 55;
pub const RPC_SERVER_COMMAND: u8 = 56;
pub const RPC_DIALOG_RESPONSE: u8 = 57;
pub const RPC_PICKUP: u8 = 58;

/// Little-endian cursor over an RPC payload. Every `read` returns `None` on
/// short input instead of panicking — a malformed/truncated payload is
/// just dropped by the caller.
pub struct Cursor<'a> {
    bytes: &'a [u8],
    pos: usize,
}

impl<'a> Cursor<'a> {
    pub fn new(bytes: &'a [u8]) -> Self {
        Self { bytes, pos: 0 }
    }

    pub fn u8(&mut self) -> Option<u8> {
        let v = *self.bytes.get(self.pos)?;
        self.pos += 1;
        Some(v)
    }

    pub fn u16_le(&mut self) -> Option<u16> {
        let slice = self.bytes.get(self.pos..self.pos + 2)?;
        self.pos += 2;
        Some(u16::from_le_bytes(slice.try_into().ok()?))
    }

    pub fn i16_le(&mut self) -> Option<i16> {
        self.u16_le().map(|v| v as i16)
    }

    pub fn u32_le(&mut self) -> Option<u32> {
        let slice = self.bytes.get(self.pos..self.pos + 4)?;
        self.pos += 4;
        Some(u32::from_le_bytes(slice.try_into().ok()?))
    }

    pub fn i32_le(&mut self) -> Option<i32> {
        self.u32_le().map(|v| v as i32)
    }

    pub fn f32_le(&mut self) -> Option<f32> {
        self.u32_le().map(f32::from_bits)
    }

    pub fn vec3(&mut self) -> Option<Vec3> {
        Some(Vec3::new(self.f32_le()?, self.f32_le()?, self.f32_le()?))
    }

    pub fn bytes(&mut self, len: usize) -> Option<&'a [u8]> {
        let slice = self.bytes.get(self.pos..self.pos + len)?;
        self.pos += len;
        Some(slice)
    }

    pub fn string_u8_len(&mut self) -> Option<String> {
        let len = self.u8()? as usize;
        Some(String::from_utf8_lossy(self.bytes(len)?).into_owned())
    }

    pub fn string_u16_len(&mut self) -> Option<String> {
        let len = self.u16_le()? as usize;
        Some(String::from_utf8_lossy(self.bytes(len)?).into_owned())
    }

    /// Consumes whatever remains of the payload as UTF-8 — used for chat,
    /// where the RPC's own framing already carries the message length.
    pub fn remaining_string(&mut self) -> String {
        let s = String::from_utf8_lossy(&self.bytes[self.pos..]).into_owned();
        self.pos = self.bytes.len();
        s
    }
}
