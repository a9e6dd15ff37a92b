//! Textual (JSON) control-plane messages.
//!
//! The wire format mixes two tag keys — chunk requests and server-sent
//! messages use `"type"`, while mine/place commands use `"commandType"` —
//! so inbound parsing is done by hand against a closed [`ClientMessage`] set
//! rather than via a single `#[serde(tag = "type")]` enum. Outbound messages
//! are a closed [`ServerMessage`] set, each producing a fixed JSON shape.

use serde::Serialize;
use serde_json::{json, Value};

use crate::error::ServerError;

/// A parsed inbound control-plane message.
#[derive(Debug, Clone, PartialEq)]
pub enum ClientMessage {
    ChunkRequest {
        cx: i32,
        cz: i32,
        lod: u8,
        seq: Option<u32>,
    },
    MineBlock {
        seq: u32,
        x: i32,
        y: i32,
        z: i32,
    },
    PlaceBlock {
        seq: u32,
        x: i32,
        y: i32,
        z: i32,
        block_id: u8,
    },
}

impl ClientMessage {
    pub fn parse(text: &str) -> Result<Self, ServerError> {
        let value: Value = serde_json::from_str(text)?;

        if let Some(kind) = value.get("type").and_then(Value::as_str) {
            return match kind {
                "chunkRequest" => {
                    let cx = req_i32(&value, "cx")?;
                    let cz = req_i32(&value, "cz")?;
                    let lod = req_i32(&value, "lod")? as u8;
                    if lod > 1 {
                        return Err(ServerError::InvalidParameters(format!("lod {lod} out of range")));
                    }
                    let seq = value.get("seq").and_then(Value::as_u64).map(|v| v as u32);
                    Ok(ClientMessage::ChunkRequest { cx, cz, lod, seq })
                }
                other => Err(ServerError::BadRequest(format!("unknown message type: {other}"))),
            };
        }

        if let Some(kind) = value.get("commandType").and_then(Value::as_str) {
            let seq = req_i32(&value, "seq")? as u32;
            let x = req_i32(&value, "targetVoxelX")?;
            let y = req_i32(&value, "targetVoxelY")?;
            let z = req_i32(&value, "targetVoxelZ")?;
            return match kind {
                "mineBlock" => Ok(ClientMessage::MineBlock { seq, x, y, z }),
                "placeBlock" => {
                    let block_id = value
                        .get("blockId")
                        .and_then(Value::as_u64)
                        .ok_or_else(|| ServerError::InvalidParameters("placeBlock missing blockId".into()))?
                        as u8;
                    Ok(ClientMessage::PlaceBlock { seq, x, y, z, block_id })
                }
                other => Err(ServerError::BadRequest(format!("unknown command type: {other}"))),
            };
        }

        Err(ServerError::BadRequest("message has neither type nor commandType".into()))
    }
}

fn req_i32(value: &Value, field: &str) -> Result<i32, ServerError> {
    value
        .get(field)
        .and_then(Value::as_i64)
        .map(|v| v as i32)
        .ok_or_else(|| ServerError::InvalidParameters(format!("missing or non-numeric field: {field}")))
}

/// A player's position in a server → client JSON payload.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct WirePos {
    pub x: f32,
    pub y: f32,
    pub z: f32,
}

/// A closed set of outbound control-plane messages.
#[derive(Debug, Clone)]
pub enum ServerMessage {
    ChunkResponse {
        cx: i32,
        cz: i32,
        lod: u8,
        seq: Option<u32>,
        voxels: Vec<u8>,
    },
    ChunkResponseError {
        cx: i32,
        cz: i32,
        seq: Option<u32>,
        error: ServerError,
    },
    Init {
        player_id: String,
        initial_pos: WirePos,
        known_players: Vec<(String, WirePos)>,
    },
    PlayerLeft {
        player_id: String,
    },
    MineError {
        seq: u32,
        error: ServerError,
    },
    PlaceError {
        seq: u32,
        error: ServerError,
    },
    BlockUpdate {
        chunk_x: i32,
        chunk_z: i32,
        rle_bytes: Vec<u8>,
    },
    /// Sent once, immediately before the connection is closed, when the
    /// server is at its configured player cap.
    ServerFull,
}

impl ServerMessage {
    pub fn to_json(&self) -> Value {
        match self {
            ServerMessage::ChunkResponse { cx, cz, lod, seq, voxels } => json!({
                "type": "chunkResponse",
                "cx": cx,
                "cz": cz,
                "lod": lod,
                "seq": seq,
                "voxels": voxels,
            }),
            ServerMessage::ChunkResponseError { cx, cz, seq, error } => json!({
                "type": "chunkResponseError",
                "cx": cx,
                "cz": cz,
                "seq": seq,
                "code": error.code(),
                "reason": error.reason(),
            }),
            ServerMessage::Init { player_id, initial_pos, known_players } => json!({
                "type": "init",
                "playerId": player_id,
                "initialPos": initial_pos,
                "state": {
                    "players": known_players.iter().map(|(id, pos)| json!({
                        "id": id,
                        "position": pos,
                    })).collect::<Vec<_>>(),
                },
            }),
            ServerMessage::PlayerLeft { player_id } => json!({
                "type": "playerLeft",
                "playerId": player_id,
            }),
            ServerMessage::MineError { seq, error } => json!({
                "type": "mineError",
                "seq": seq,
                "code": error.code(),
                "reason": error.reason(),
            }),
            ServerMessage::PlaceError { seq, error } => json!({
                "type": "placeError",
                "seq": seq,
                "code": error.code(),
                "reason": error.reason(),
            }),
            ServerMessage::BlockUpdate { chunk_x, chunk_z, rle_bytes } => json!({
                "type": "blockUpdate",
                "chunkX": chunk_x,
                "chunkZ": chunk_z,
                "rleBytes": rle_bytes,
            }),
            ServerMessage::ServerFull => json!({
                "type": "serverFull",
                "code": ServerError::ServerFull.code(),
                "reason": ServerError::ServerFull.reason(),
            }),
        }
    }

    pub fn to_text(&self) -> String {
        self.to_json().to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_chunk_request() {
        let msg = ClientMessage::parse(r#"{"type":"chunkRequest","cx":1,"cz":-2,"lod":0,"seq":7}"#).unwrap();
        assert_eq!(
            msg,
            ClientMessage::ChunkRequest { cx: 1, cz: -2, lod: 0, seq: Some(7) }
        );
    }

    #[test]
    fn parses_mine_block() {
        let msg = ClientMessage::parse(
            r#"{"commandType":"mineBlock","seq":3,"targetVoxelX":5,"targetVoxelY":64,"targetVoxelZ":5}"#,
        )
        .unwrap();
        assert_eq!(msg, ClientMessage::MineBlock { seq: 3, x: 5, y: 64, z: 5 });
    }

    #[test]
    fn parses_place_block() {
        let msg = ClientMessage::parse(
            r#"{"commandType":"placeBlock","seq":4,"targetVoxelX":1,"targetVoxelY":2,"targetVoxelZ":3,"blockId":9}"#,
        )
        .unwrap();
        assert_eq!(
            msg,
            ClientMessage::PlaceBlock { seq: 4, x: 1, y: 2, z: 3, block_id: 9 }
        );
    }

    #[test]
    fn rejects_unknown_shape() {
        assert!(ClientMessage::parse(r#"{"foo":"bar"}"#).is_err());
    }

    #[test]
    fn invalid_json_is_typed_error() {
        let err = ClientMessage::parse("{not json").unwrap_err();
        assert_eq!(err.code(), "InvalidJSON");
    }

    #[test]
    fn block_update_shape() {
        let msg = ServerMessage::BlockUpdate { chunk_x: 1, chunk_z: 2, rle_bytes: vec![1, 2, 3] };
        let value = msg.to_json();
        assert_eq!(value["type"], "blockUpdate");
        assert_eq!(value["chunkX"], 1);
    }
}
