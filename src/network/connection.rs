//! Per-connection WebSocket handling: handshake, capacity check, frame
//! routing, and the request/reply path for chunk requests and block
//! mutations.
//!
//! Binary frames decode straight onto the inbound-input channel drained by
//! the simulation thread at tick start. Text frames are parsed
//! against the closed [`ClientMessage`] set and either answered directly
//! (chunk requests, which only ever read the thread-safe chunk store) or
//! routed through the simulation lock (mutations, which touch the
//! simulation-thread-only collider queues).

use std::sync::Arc;
use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::WebSocketStream;

use crate::constants::CHUNK_W;
use crate::error::ServerError;
use crate::mutation;
use crate::player::{allocate_id_excluding, PlayerId};
use crate::simulation::InboundInput;
use crate::wire::binary::PlayerInput;
use crate::wire::json::{ClientMessage, ServerMessage};
use crate::world::chunk::{ChunkKey, Lod};

use super::server::{broadcast, Shared};

/// Fixed spawn column for every new connection. The server parses none of
/// the client's data at connect time, so there is no client
/// input to derive a spawn point from; every player starts over the
/// pre-warmed origin tile.
const SPAWN_X: f32 = 0.0;
const SPAWN_Z: f32 = 0.0;

pub async fn handle_connection(stream: TcpStream, shared: Arc<Shared>) {
    let peer = stream.peer_addr().ok();
    let ws_stream = match tokio_tungstenite::accept_async(stream).await {
        Ok(stream) => stream,
        Err(err) => {
            log::warn!("websocket handshake failed for {peer:?}: {err}");
            return;
        }
    };

    if shared.connections.len() >= shared.config.max_players {
        log::info!("rejecting connection from {peer:?}: server full");
        reject_server_full(ws_stream).await;
        return;
    }

    let id = allocate_id_excluding(|candidate| shared.connections.contains_key(candidate));
    log::info!("player {id} connected from {peer:?}");

    let (mut sink, mut source) = ws_stream.split();
    let (outbound_tx, mut outbound_rx) = mpsc::unbounded_channel::<Message>();
    shared.connections.insert(id.clone(), outbound_tx);

    {
        let mut sim = shared.simulation.lock().await;
        sim.queue_awaiting(id.clone(), SPAWN_X, SPAWN_Z);
    }

    let writer_id = id.clone();
    let writer = tokio::spawn(async move {
        while let Some(message) = outbound_rx.recv().await {
            if sink.send(message).await.is_err() {
                break;
            }
        }
        log::debug!("writer task for {writer_id} exiting");
    });

    while let Some(message) = source.next().await {
        let message = match message {
            Ok(message) => message,
            Err(err) => {
                log::warn!("connection error for {id}: {err}");
                break;
            }
        };
        match message {
            Message::Binary(bytes) => handle_binary(&shared, &id, &bytes),
            Message::Text(text) => handle_text(&shared, &id, &text).await,
            Message::Close(_) => break,
            Message::Ping(_) | Message::Pong(_) | Message::Frame(_) => {}
        }
    }

    writer.abort();
    shared.connections.remove(&id);
    {
        let mut sim = shared.simulation.lock().await;
        sim.disconnect(&id);
    }
    broadcast(&shared, &ServerMessage::PlayerLeft { player_id: id.clone() });
    log::info!("player {id} disconnected");
}

async fn reject_server_full(mut ws_stream: WebSocketStream<TcpStream>) {
    let _ = ws_stream
        .send(Message::Text(ServerMessage::ServerFull.to_text()))
        .await;
    let _ = ws_stream.close(None).await;
}

fn handle_binary(shared: &Shared, id: &PlayerId, bytes: &[u8]) {
    match PlayerInput::decode(bytes) {
        Ok(frame) => {
            let _ = shared.inbound_tx.send(InboundInput { player_id: id.clone(), frame });
        }
        Err(err) => {
            log::warn!("malformed input frame from {id}: {err}");
        }
    }
}

async fn handle_text(shared: &Arc<Shared>, id: &PlayerId, text: &str) {
    let message = match ClientMessage::parse(text) {
        Ok(message) => message,
        Err(err) => {
            log::warn!("invalid JSON from {id}: {err}");
            return;
        }
    };

    match message {
        ClientMessage::ChunkRequest { cx, cz, lod, seq } => {
            handle_chunk_request(shared, id, cx, cz, lod, seq).await;
        }
        ClientMessage::MineBlock { seq, x, y, z } => {
            handle_mutation(shared, id, seq, x, y, z, 0, true).await;
        }
        ClientMessage::PlaceBlock { seq, x, y, z, block_id } => {
            handle_mutation(shared, id, seq, x, y, z, block_id, false).await;
        }
    }
}

async fn handle_chunk_request(shared: &Arc<Shared>, id: &PlayerId, cx: i32, cz: i32, lod_raw: u8, seq: Option<u32>) {
    let Some(lod) = Lod::from_wire(lod_raw) else {
        send_to(
            shared,
            id,
            &ServerMessage::ChunkResponseError {
                cx,
                cz,
                seq,
                error: ServerError::InvalidParameters(format!("unsupported lod {lod_raw}")),
            },
        );
        return;
    };

    let key = ChunkKey::new(cx, cz, lod);
    let timeout = Duration::from_secs(shared.config.chunk_request_timeout_secs);
    let response = match tokio::time::timeout(timeout, shared.chunks.get_or_create(key)).await {
        Ok(Ok(chunk)) => {
            let voxels = chunk.read().voxels.clone();
            ServerMessage::ChunkResponse { cx, cz, lod: lod_raw, seq, voxels }
        }
        Ok(Err(err)) => ServerMessage::ChunkResponseError { cx, cz, seq, error: err },
        Err(_) => ServerMessage::ChunkResponseError {
            cx,
            cz,
            seq,
            error: ServerError::InternalServerError("chunk request timed out".into()),
        },
    };
    send_to(shared, id, &response);
}

/// Validates and applies a mine (`block_id = 0`) or place (`block_id > 0`).
/// The target chunk is resolved once, outside the simulation lock, so the
/// lock is never held across a generation wait, since the tick loop never
/// suspends mid-step; by the time the lock is taken the chunk is
/// resident and the mutation pipeline's own `get_or_create` resolves without
/// suspending.
async fn handle_mutation(shared: &Arc<Shared>, id: &PlayerId, seq: u32, x: i32, y: i32, z: i32, block_id: u8, is_mine: bool) {
    let cx = x.div_euclid(CHUNK_W as i32);
    let cz = z.div_euclid(CHUNK_W as i32);
    let key = ChunkKey::new(cx, cz, Lod::High);
    if let Err(err) = shared.chunks.get_or_create(key).await {
        send_mutation_error(shared, id, seq, is_mine, err);
        return;
    }

    let outcome = {
        let mut sim = shared.simulation.lock().await;
        mutation::mutate(&shared.chunks, &mut sim.queues, x, y, z, is_mine, block_id).await
    };

    match outcome {
        Ok(Some(outcome)) => broadcast(
            shared,
            &ServerMessage::BlockUpdate {
                chunk_x: outcome.chunk_x,
                chunk_z: outcome.chunk_z,
                rle_bytes: outcome.rle_bytes,
            },
        ),
        Ok(None) => {} // idempotent no-op: no broadcast, no rebuild
        Err(err) => {
            log::debug!("rejected {} seq={seq} from {id}: {err}", if is_mine { "mine" } else { "place" });
            send_mutation_error(shared, id, seq, is_mine, err);
        }
    }
}

fn send_mutation_error(shared: &Shared, id: &PlayerId, seq: u32, is_mine: bool, error: ServerError) {
    let message = if is_mine {
        ServerMessage::MineError { seq, error }
    } else {
        ServerMessage::PlaceError { seq, error }
    };
    send_to(shared, id, &message);
}

fn send_to(shared: &Shared, id: &PlayerId, message: &ServerMessage) {
    if let Some(sender) = shared.connections.get(id) {
        let _ = sender.send(Message::Text(message.to_text()));
    }
}
