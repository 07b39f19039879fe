use std::net::Ipv4Addr;

/// Fixed 4-byte magic every query packet and reply starts with.
pub const MAGIC: [u8; 4] = *b"SAMP";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueryKind {
    Info,
    Players,
    Rules,
    Rcon,
}

impl QueryKind {
    fn type_byte(self) -> u8 {
        match self {
            QueryKind::Info => b'i',
            QueryKind::Players => b'c',
            QueryKind::Rules => b'r',
            QueryKind::Rcon => b'x',
        }
    }
}

/// Builds the 11-byte common header plus type byte: magic, the host's IPv4
/// octets reordered little-endian, the port little-endian, and the packet
/// type. `x` (rcon) callers append the password/command payload afterward.
fn build_header(addr: Ipv4Addr, port: u16, kind: QueryKind) -> Vec<u8> {
    let mut packet = Vec::with_capacity(11);
    packet.extend_from_slice(&MAGIC);
    let mut octets = addr.octets();
    octets.reverse();
    packet.extend_from_slice(&octets);
    packet.extend_from_slice(&port.to_le_bytes());
    packet.push(kind.type_byte());
    packet
}

pub fn build_info_packet(addr: Ipv4Addr, port: u16) -> Vec<u8> {
    build_header(addr, port, QueryKind::Info)
}

pub fn build_players_packet(addr: Ipv4Addr, port: u16) -> Vec<u8> {
    build_header(addr, port, QueryKind::Players)
}

pub fn build_rules_packet(addr: Ipv4Addr, port: u16) -> Vec<u8> {
    build_header(addr, port, QueryKind::Rules)
}

/// Rcon wire layout fixed per the canonical order: 2-byte LE password
/// length + password bytes, then 2-byte LE command length + command bytes.
/// The original source varied this order across helpers; this is the one
/// true layout.
pub fn build_rcon_packet(addr: Ipv4Addr, port: u16, password: &str, command: &str) -> Vec<u8> {
    let mut packet = build_header(addr, port, QueryKind::Rcon);
    let pw = password.as_bytes();
    packet.extend_from_slice(&(pw.len() as u16).to_le_bytes());
    packet.extend_from_slice(pw);
    let cmd = command.as_bytes();
    packet.extend_from_slice(&(cmd.len() as u16).to_le_bytes());
    packet.extend_from_slice(cmd);
    packet
}

/// Bytes past the fixed 11-byte header (magic + IP + port + type byte).
const HEADER_LEN: usize = 11;

#[derive(Debug, Clone, PartialEq)]
pub struct InfoReply {
    pub password: bool,
    pub players: u16,
    pub max_players: u16,
    pub hostname: String,
    pub gamemode: String,
    pub language: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PlayerEntry {
    pub id: u8,
    pub name: String,
    pub score: i32,
    pub ping: i32,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RuleEntry {
    pub name: String,
    pub value: String,
}

/// Decodes bytes as UTF-8; falls back to GBK if the bytes aren't valid
/// UTF-8, matching the GBK↔UTF-8 round trip these game servers use.
pub fn normalize_string(bytes: &[u8]) -> String {
    if let Ok(s) = std::str::from_utf8(bytes) {
        return s.to_string();
    }
    let (cow, _, had_errors) = encoding_rs::GBK.decode(bytes);
    if had_errors {
        String::from_utf8_lossy(bytes).into_owned()
    } else {
        cow.into_owned()
    }
}

struct Cursor<'a> {
    bytes: &'a [u8],
    pos: usize,
}

impl<'a> Cursor<'a> {
    fn new(bytes: &'a [u8]) -> Self {
        Self { bytes, pos: 0 }
    }

    fn u8(&mut self) -> Option<u8> {
        let v = *self.bytes.get(self.pos)?;
        self.pos += 1;
        Some(v)
    }

    fn u16_le(&mut self) -> Option<u16> {
        let slice = self.bytes.get(self.pos..self.pos + 2)?;
        self.pos += 2;
        Some(u16::from_le_bytes(slice.try_into().ok()?))
    }

    fn u32_le(&mut self) -> Option<u32> {
        let slice = self.bytes.get(self.pos..self.pos + 4)?;
        self.pos += 4;
        Some(u32::from_le_bytes(slice.try_into().ok()?))
    }

    fn i32_le(&mut self) -> Option<i32> {
        self.u32_le().map(|v| v as i32)
    }

    fn bytes(&mut self, len: usize) -> Option<&'a [u8]> {
        let slice = self.bytes.get(self.pos..self.pos + len)?;
        self.pos += len;
        Some(slice)
    }

    fn string_u8_len(&mut self) -> Option<String> {
        let len = self.u8()? as usize;
        Some(normalize_string(self.bytes(len)?))
    }

    fn string_u32_len(&mut self) -> Option<String> {
        let len = self.u32_le()? as usize;
        Some(normalize_string(self.bytes(len)?))
    }
}

pub fn parse_info_reply(raw: &[u8]) -> Option<InfoReply> {
    let mut c = Cursor::new(raw.get(HEADER_LEN..)?);
    Some(InfoReply {
        password: c.u8()? != 0,
        players: c.u16_le()?,
        max_players: c.u16_le()?,
        hostname: c.string_u32_len()?,
        gamemode: c.string_u32_len()?,
        language: c.string_u32_len()?,
    })
}

pub fn parse_players_reply(raw: &[u8]) -> Option<Vec<PlayerEntry>> {
    let mut c = Cursor::new(raw.get(HEADER_LEN..)?);
    let count = c.u16_le()?;
    let mut out = Vec::with_capacity(count as usize);
    for _ in 0..count {
        out.push(PlayerEntry {
            id: c.u8()?,
            name: c.string_u8_len()?,
            score: c.i32_le()?,
            ping: c.i32_le()?,
        });
    }
    Some(out)
}

pub fn parse_rules_reply(raw: &[u8]) -> Option<Vec<RuleEntry>> {
    let mut c = Cursor::new(raw.get(HEADER_LEN..)?);
    let count = c.u16_le()?;
    let mut out = Vec::with_capacity(count as usize);
    for _ in 0..count {
        out.push(RuleEntry {
            name: c.string_u8_len()?,
            value: c.string_u8_len()?,
        });
    }
    Some(out)
}

/// Repeated `{u16 len, bytes}` records, terminated by a zero-length record.
pub fn parse_rcon_reply(raw: &[u8]) -> Option<Vec<String>> {
    let mut c = Cursor::new(raw.get(HEADER_LEN..)?);
    let mut lines = Vec::new();
    loop {
        let len = c.u16_le()?;
        if len == 0 {
            break;
        }
        lines.push(normalize_string(c.bytes(len as usize)?));
    }
    Some(lines)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_header() -> Vec<u8> {
        let mut h = MAGIC.to_vec();
        h.extend_from_slice(&[1, 2, 3, 4]);
        h.extend_from_slice(&7777u16.to_le_bytes());
        h.push(b'i');
        h
    }

    #[test]
    fn info_reply_round_trips() {
        let mut raw = sample_header();
        raw.push(1); // password
        raw.extend_from_slice(&7u16.to_le_bytes());
        raw.extend_from_slice(&100u16.to_le_bytes());
        for s in ["Test Server", "Freeroam", "en"] {
            raw.extend_from_slice(&(s.len() as u32).to_le_bytes());
            raw.extend_from_slice(s.as_bytes());
        }

        let info = parse_info_reply(&raw).unwrap();
        assert_eq!(info.hostname, "Test Server");
        assert_eq!(info.gamemode, "Freeroam");
        assert_eq!(info.language, "en");
        assert_eq!(info.players, 7);
        assert_eq!(info.max_players, 100);
        assert!(info.password);
    }

    #[test]
    fn rcon_packet_layout_is_password_then_command() {
        let packet = build_rcon_packet(Ipv4Addr::new(1, 2, 3, 4), 7777, "pw", "cmd");
        assert_eq!(&packet[0..4], b"SAMP");
        assert_eq!(packet[10], b'x');
        let pw_len = u16::from_le_bytes([packet[11], packet[12]]);
        assert_eq!(pw_len, 2);
        assert_eq!(&packet[13..15], b"pw");
        let cmd_len = u16::from_le_bytes([packet[15], packet[16]]);
        assert_eq!(cmd_len, 3);
        assert_eq!(&packet[17..20], b"cmd");
    }

    #[test]
    fn rcon_reply_stops_at_zero_length_record() {
        let mut raw = sample_header();
        raw[10] = b'x';
        raw.extend_from_slice(&3u16.to_le_bytes());
        raw.extend_from_slice(b"abc");
        raw.extend_from_slice(&0u16.to_le_bytes());
        raw.extend_from_slice(&5u16.to_le_bytes()); // must not be read
        raw.extend_from_slice(b"junk!");

        let lines = parse_rcon_reply(&raw).unwrap();
        assert_eq!(lines, vec!["abc".to_string()]);
    }
}
