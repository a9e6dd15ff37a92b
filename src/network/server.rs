//! Accept loop and the fixed-tick simulation driver.
//!
//! [`Shared`] is the state every connection task and the tick-loop task see:
//! the thread-safe chunk store, the simulation behind an async mutex (held
//! only for the duration of one synchronous tick or one mutation), the live
//! connection table, and the inbound-input channel. The tick loop is the
//! only task that ever calls [`crate::simulation::Simulation::tick`].

use std::sync::Arc;
use std::time::Duration;

use dashmap::DashMap;
use tokio::net::TcpListener;
use tokio::sync::{mpsc, Mutex};
use tokio_tungstenite::tungstenite::Message;

use crate::config::ServerConfig;
use crate::constants::FIXED_DT;
use crate::player::PlayerId;
use crate::simulation::{InboundInput, Simulation};
use crate::wire::json::{ServerMessage, WirePos};
use crate::world::chunk::{ChunkKey, Lod};
use crate::world::generation::NoiseHeightField;
use crate::world::store::ChunkStore;

use super::connection::handle_connection;

/// State shared across every connection task and the tick loop.
pub struct Shared {
    pub chunks: Arc<ChunkStore>,
    pub simulation: Arc<Mutex<Simulation>>,
    pub connections: DashMap<PlayerId, mpsc::UnboundedSender<Message>>,
    pub config: ServerConfig,
    pub inbound_tx: mpsc::UnboundedSender<InboundInput>,
}

/// Sends a JSON control message to every connected client. A failed send
/// means that connection's writer task has already exited; its reader loop
/// will notice independently and clean up, so failures here are ignored.
pub fn broadcast(shared: &Shared, message: &ServerMessage) {
    let text = Message::Text(message.to_text());
    for entry in shared.connections.iter() {
        let _ = entry.value().send(text.clone());
    }
}

fn broadcast_binary(shared: &Shared, bytes: Vec<u8>) {
    let frame = Message::Binary(bytes);
    for entry in shared.connections.iter() {
        let _ = entry.value().send(frame.clone());
    }
}

/// Runs the server until a shutdown signal is received.
pub async fn run_server(config: ServerConfig) -> anyhow::Result<()> {
    let height_field = Arc::new(NoiseHeightField::new(config.seed));
    let chunks = ChunkStore::new(height_field, config.generation_concurrency);
    let mut simulation = Simulation::new(chunks.clone(), config.clone());

    // Pre-warm the spawn tile so the first connecting player's spawn height
    // is available immediately, and seed the initial-load collider count so
    // the tick loop knows when it may start draining the awaiting-player
    // list.
    let spawn_key = ChunkKey::new(0, 0, Lod::High);
    let warm_chunks = chunks.clone();
    tokio::spawn(async move {
        let _ = warm_chunks.get_or_create(spawn_key).await;
    });
    let spawn_chunk = loop {
        chunks.drain_generated();
        if let Some(chunk) = chunks.peek(spawn_key) {
            break chunk;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    };
    simulation.queues.enqueue_build(&spawn_chunk);
    let (expected_creates, _) = simulation.queues.queue_len();
    simulation.set_expected_initial_colliders(expected_creates);
    log::info!("spawn tile pre-warmed, expecting {expected_creates} initial colliders");

    let (inbound_tx, inbound_rx) = mpsc::unbounded_channel();
    let shared = Arc::new(Shared {
        chunks,
        simulation: Arc::new(Mutex::new(simulation)),
        connections: DashMap::new(),
        config: config.clone(),
        inbound_tx,
    });

    let tick_task = tokio::spawn(run_tick_loop(shared.clone(), inbound_rx));

    let listener = TcpListener::bind(("0.0.0.0", config.port)).await?;
    log::info!("outcrop-server listening on port {}", config.port);

    loop {
        tokio::select! {
            accepted = listener.accept() => {
                match accepted {
                    Ok((stream, addr)) => {
                        log::debug!("accepted TCP connection from {addr}");
                        let shared = shared.clone();
                        tokio::spawn(async move {
                            handle_connection(stream, shared).await;
                        });
                    }
                    Err(err) => log::warn!("accept failed: {err}"),
                }
            }
            _ = tokio::signal::ctrl_c() => {
                log::info!("shutdown signal received");
                break;
            }
        }
    }

    tick_task.abort();
    Ok(())
}

async fn run_tick_loop(shared: Arc<Shared>, mut inbound_rx: mpsc::UnboundedReceiver<InboundInput>) {
    let mut interval = tokio::time::interval(Duration::from_secs_f32(FIXED_DT));
    interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

    loop {
        interval.tick().await;

        let mut inputs = Vec::new();
        while let Ok(input) = inbound_rx.try_recv() {
            inputs.push(input);
        }

        let mut sim = shared.simulation.lock().await;
        let output = sim.tick(inputs);
        let init_payloads = build_init_payloads(&sim, &output.newly_initialized);
        drop(sim);

        for (id, initial_pos, known_players) in init_payloads {
            if let Some(sender) = shared.connections.get(&id) {
                let message = ServerMessage::Init { player_id: id.clone(), initial_pos, known_players };
                let _ = sender.send(Message::Text(message.to_text()));
            }
        }

        if let Some(snapshot) = output.snapshot {
            broadcast_binary(&shared, snapshot.encode());
        }

        if output.ran_gc {
            log::debug!("proximity GC pass completed, {} chunks resident", shared.chunks.len());
        }
    }
}

/// Builds each newly-initialized player's `init` payload while the
/// simulation lock is still held, so the positions read are consistent with
/// the tick that just ran.
fn build_init_payloads(sim: &Simulation, newly_initialized: &[PlayerId]) -> Vec<(PlayerId, WirePos, Vec<(PlayerId, WirePos)>)> {
    let mut out = Vec::with_capacity(newly_initialized.len());
    for id in newly_initialized {
        let Some(player) = sim.players.get(id) else { continue };
        let Some(pos) = sim.physics.body_translation(player.body_handle) else { continue };
        let initial_pos = WirePos { x: pos.x, y: pos.y, z: pos.z };
        let known_players = sim
            .players
            .iter()
            .filter(|(pid, _)| pid.as_str() != id.as_str())
            .filter_map(|(pid, p)| {
                sim.physics
                    .body_translation(p.body_handle)
                    .map(|pos| (pid.clone(), WirePos { x: pos.x, y: pos.y, z: pos.z }))
            })
            .collect();
        out.push((id.clone(), initial_pos, known_players));
    }
    out
}
