//! Positional binary schemas for `PlayerInput` (client → server) and
//! `Snapshot` (server → clients).
//!
//! Layout is little-endian and explicit rather than derived, since the two
//! sides of the wire (this crate's server half and the client prediction
//! half in [`crate::client`]) must agree byte-for-byte; a serde-derived
//! encoding would make that agreement implicit and easy to break silently
//! across a refactor.

use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};
use std::io::{self, Cursor, Read, Write};

/// A single client input frame, decoded from a binary WebSocket message.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PlayerInput {
    pub seq: u32,
    pub intent_x: f32,
    pub intent_y: f32,
    pub intent_z: f32,
    pub yaw: f32,
    pub jump_pressed: bool,
    pub fly_down_pressed: bool,
    pub is_flying: bool,
}

impl PlayerInput {
    pub const WIRE_LEN: usize = 4 + 12 + 4 + 1 + 1 + 1;

    pub fn encode(&self) -> Vec<u8> {
        let mut buf = Vec::with_capacity(Self::WIRE_LEN);
        // Unwraps below are infallible: writes into a growable Vec never fail.
        buf.write_u32::<LittleEndian>(self.seq).unwrap();
        buf.write_f32::<LittleEndian>(self.intent_x).unwrap();
        buf.write_f32::<LittleEndian>(self.intent_y).unwrap();
        buf.write_f32::<LittleEndian>(self.intent_z).unwrap();
        buf.write_f32::<LittleEndian>(self.yaw).unwrap();
        buf.write_u8(self.jump_pressed as u8).unwrap();
        buf.write_u8(self.fly_down_pressed as u8).unwrap();
        buf.write_u8(self.is_flying as u8).unwrap();
        buf
    }

    pub fn decode(bytes: &[u8]) -> io::Result<Self> {
        if bytes.len() < Self::WIRE_LEN {
            return Err(io::Error::new(io::ErrorKind::UnexpectedEof, "short input frame"));
        }
        let mut cursor = Cursor::new(bytes);
        Ok(Self {
            seq: cursor.read_u32::<LittleEndian>()?,
            intent_x: cursor.read_f32::<LittleEndian>()?,
            intent_y: cursor.read_f32::<LittleEndian>()?,
            intent_z: cursor.read_f32::<LittleEndian>()?,
            yaw: cursor.read_f32::<LittleEndian>()?,
            jump_pressed: cursor.read_u8()? != 0,
            fly_down_pressed: cursor.read_u8()? != 0,
            is_flying: cursor.read_u8()? != 0,
        })
    }

    /// True if any numeric field is NaN or infinite.
    pub fn has_non_finite(&self) -> bool {
        !self.intent_x.is_finite()
            || !self.intent_y.is_finite()
            || !self.intent_z.is_finite()
            || !self.yaw.is_finite()
    }
}

/// One player's authoritative state within a [`Snapshot`].
#[derive(Debug, Clone, PartialEq)]
pub struct PlayerState {
    pub id: String,
    pub pos: [f32; 3],
    pub vel: [f32; 3],
    pub yaw: f32,
    pub is_grounded: bool,
    pub is_flying: bool,
    pub last_ack: u32,
}

/// A full server → clients state broadcast.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Snapshot {
    pub tick: u32,
    pub players: Vec<PlayerState>,
}

impl Snapshot {
    pub fn encode(&self) -> Vec<u8> {
        let mut buf = Vec::with_capacity(8 + self.players.len() * 48);
        buf.write_u32::<LittleEndian>(self.tick).unwrap();
        buf.write_u16::<LittleEndian>(self.players.len() as u16).unwrap();
        for p in &self.players {
            let id_bytes = p.id.as_bytes();
            debug_assert!(id_bytes.len() <= u8::MAX as usize, "player id too long to encode");
            buf.write_u8(id_bytes.len() as u8).unwrap();
            buf.write_all(id_bytes).unwrap();
            for component in p.pos {
                buf.write_f32::<LittleEndian>(component).unwrap();
            }
            for component in p.vel {
                buf.write_f32::<LittleEndian>(component).unwrap();
            }
            buf.write_f32::<LittleEndian>(p.yaw).unwrap();
            buf.write_u8(p.is_grounded as u8).unwrap();
            buf.write_u8(p.is_flying as u8).unwrap();
            buf.write_u32::<LittleEndian>(p.last_ack).unwrap();
        }
        buf
    }

    pub fn decode(bytes: &[u8]) -> io::Result<Self> {
        let mut cursor = Cursor::new(bytes);
        let tick = cursor.read_u32::<LittleEndian>()?;
        let count = cursor.read_u16::<LittleEndian>()?;
        let mut players = Vec::with_capacity(count as usize);
        for _ in 0..count {
            let id_len = cursor.read_u8()? as usize;
            let mut id_buf = vec![0u8; id_len];
            cursor.read_exact(&mut id_buf)?;
            let id = String::from_utf8(id_buf)
                .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;
            let mut pos = [0f32; 3];
            for slot in &mut pos {
                *slot = cursor.read_f32::<LittleEndian>()?;
            }
            let mut vel = [0f32; 3];
            for slot in &mut vel {
                *slot = cursor.read_f32::<LittleEndian>()?;
            }
            let yaw = cursor.read_f32::<LittleEndian>()?;
            let is_grounded = cursor.read_u8()? != 0;
            let is_flying = cursor.read_u8()? != 0;
            let last_ack = cursor.read_u32::<LittleEndian>()?;
            players.push(PlayerState {
                id,
                pos,
                vel,
                yaw,
                is_grounded,
                is_flying,
                last_ack,
            });
        }
        Ok(Self { tick, players })
    }
}
