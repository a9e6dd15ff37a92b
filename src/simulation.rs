//! The fixed-tick simulation loop.
//!
//! Owns everything the tick touches: the physics world, the chunk store, the
//! collider queues, and the active/awaiting player lists. Everything here
//! runs on one logical thread — the simulation thread.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::config::ServerConfig;
use crate::constants::{FIXED_DT, GC_INTERVAL_TICKS, SNAPSHOT_EVERY_N_TICKS};
use crate::movement;
use crate::physics::PhysicsWorld;
use crate::player::{spawn_height, AwaitingPlayer, Player, PlayerId};
use crate::wire::binary::{PlayerInput, PlayerState, Snapshot};
use crate::world::chunk::{ChunkKey, Lod};
use crate::world::collider::ColliderQueues;
use crate::world::gc;
use crate::world::store::ChunkStore;

/// Everything the simulation thread owns and mutates each tick.
pub struct Simulation {
    pub physics: PhysicsWorld,
    pub chunks: Arc<ChunkStore>,
    pub queues: ColliderQueues,
    pub players: HashMap<PlayerId, Player>,
    pub awaiting: Vec<AwaitingPlayer>,
    pub config: ServerConfig,

    tick: u32,
    initial_server_load_complete: bool,
    processed_initial_colliders: usize,
    expected_initial_colliders: usize,
}

/// A per-player inbound input frame, deposited by the network layer on a
/// per-connection queue and drained on the simulation thread at tick start.
pub struct InboundInput {
    pub player_id: PlayerId,
    pub frame: PlayerInput,
}

impl Simulation {
    pub fn new(chunks: Arc<ChunkStore>, config: ServerConfig) -> Self {
        Self {
            physics: PhysicsWorld::new(),
            chunks,
            queues: ColliderQueues::new(),
            players: HashMap::new(),
            awaiting: Vec::new(),
            config,
            tick: 0,
            initial_server_load_complete: false,
            processed_initial_colliders: 0,
            expected_initial_colliders: 0,
        }
    }

    /// Number of colliders the pre-warmed spawn chunk is expected to produce,
    /// used to gate `initial_server_load_complete`. Call once after
    /// pre-warming the spawn area, before the tick loop starts.
    pub fn set_expected_initial_colliders(&mut self, n: usize) {
        self.expected_initial_colliders = n;
    }

    /// Runs one fixed tick. `inputs` are this tick's drained input frames;
    /// `player_positions` is filled in for the caller to use afterward (e.g.
    /// snapshot broadcast, GC bookkeeping).
    pub fn tick(&mut self, inputs: Vec<InboundInput>) -> TickOutput {
        let started = Instant::now();

        // Chunks that finished generating since the last tick land in the
        // store here; their solid geometry is handed straight to the
        // collider builder.
        for chunk in self.chunks.drain_generated() {
            self.queues.enqueue_build(&chunk);
        }

        for input in inputs {
            match self.players.get_mut(&input.player_id) {
                Some(player) => {
                    movement::apply_input(&mut self.physics, player, &input.frame);
                }
                None => {
                    log::debug!("dropping input frame for uninitialized player {}", input.player_id);
                }
            }
        }

        // Step 1: drain creation actions.
        let created = self
            .queues
            .drain_create(&mut self.physics, self.config.n_create_per_tick);
        if !self.initial_server_load_complete {
            self.processed_initial_colliders += created;
        }

        // Step 2: drain removal actions.
        self.queues
            .drain_remove(&mut self.physics, self.config.n_remove_per_tick);

        self.physics.update_query_pipeline();

        // Step 3.
        if !self.initial_server_load_complete
            && self.processed_initial_colliders >= self.expected_initial_colliders
        {
            self.initial_server_load_complete = true;
        }

        // Step 4: initialize awaiting players once initial load is done.
        let mut newly_initialized = Vec::new();
        if self.initial_server_load_complete {
            newly_initialized = self.drain_awaiting();
        }

        // Step 5.
        self.physics.step();

        // Step 6: post-step flying-player Y clamp.
        for player in self.players.values() {
            movement::clamp_flying_y_velocity(&mut self.physics, player);
        }

        // Step 7.
        self.tick = self.tick.wrapping_add(1);
        let snapshot = if self.tick % SNAPSHOT_EVERY_N_TICKS == 0 {
            Some(self.build_snapshot())
        } else {
            None
        };

        // Step 8.
        let ran_gc = self.tick % GC_INTERVAL_TICKS == 0;
        if ran_gc {
            let positions: Vec<(f32, f32)> = self
                .players
                .values()
                .filter_map(|p| self.physics.body_translation(p.body_handle))
                .map(|t| (t.x, t.z))
                .collect();
            gc::run(&self.chunks, &mut self.queues, &positions, self.config.gc_radius);
        }

        let elapsed = started.elapsed();
        if elapsed > Duration::from_secs_f32(FIXED_DT) {
            log::info!("tick {} overran budget: {:?}", self.tick, elapsed);
        }

        TickOutput { snapshot, newly_initialized, ran_gc }
    }

    fn drain_awaiting(&mut self) -> Vec<PlayerId> {
        let pending = std::mem::take(&mut self.awaiting);
        let mut initialized = Vec::with_capacity(pending.len());
        for awaiting in pending {
            let key = spawn_chunk_key(awaiting.spawn_x, awaiting.spawn_z);
            let column_top = match self.chunks.peek(key) {
                Some(chunk) => {
                    let (local_x, local_z) = spawn_local_xz(awaiting.spawn_x, awaiting.spawn_z);
                    chunk.read().heightmap[local_x + local_z * crate::constants::CHUNK_W]
                }
                None => 0,
            };
            let y = spawn_height(column_top);
            let (body, collider) = self
                .physics
                .create_player_capsule(nalgebra::vector![awaiting.spawn_x, y, awaiting.spawn_z]);
            self.players.insert(
                awaiting.id.clone(),
                Player {
                    id: awaiting.id.clone(),
                    body_handle: body,
                    collider_handle: collider,
                    last_processed_input_seq: 0,
                    last_yaw: 0.0,
                    is_flying: false,
                    had_movement_intent: false,
                },
            );
            initialized.push(awaiting.id);
        }
        initialized
    }

    fn build_snapshot(&self) -> Snapshot {
        let mut players = Vec::with_capacity(self.players.len());
        for player in self.players.values() {
            let Some(pos) = self.physics.body_translation(player.body_handle) else {
                log::warn!("snapshot: player {} has no body, omitting", player.id);
                continue;
            };
            let Some(vel) = self.physics.body_linvel(player.body_handle) else {
                log::warn!("snapshot: player {} has no body velocity, omitting", player.id);
                continue;
            };
            let grounded = movement::is_grounded(&self.physics, player);
            players.push(PlayerState {
                id: player.id.clone(),
                pos: [pos.x, pos.y, pos.z],
                vel: [vel.x, vel.y, vel.z],
                yaw: player.last_yaw,
                is_grounded: grounded,
                is_flying: player.is_flying,
                last_ack: player.last_processed_input_seq,
            });
        }
        Snapshot { tick: self.tick, players }
    }

    pub fn disconnect(&mut self, id: &PlayerId) -> bool {
        self.awaiting.retain(|p| &p.id != id);
        if let Some(player) = self.players.remove(id) {
            self.physics.remove_player_capsule(player.body_handle);
            true
        } else {
            false
        }
    }

    pub fn queue_awaiting(&mut self, id: PlayerId, spawn_x: f32, spawn_z: f32) {
        self.awaiting.push(AwaitingPlayer { id, spawn_x, spawn_z });
    }
}

fn spawn_chunk_key(x: f32, z: f32) -> ChunkKey {
    let w = crate::constants::CHUNK_W as i32;
    ChunkKey::new((x as i32).div_euclid(w), (z as i32).div_euclid(w), Lod::High)
}

fn spawn_local_xz(x: f32, z: f32) -> (usize, usize) {
    let w = crate::constants::CHUNK_W as i32;
    (
        (x as i32).rem_euclid(w) as usize,
        (z as i32).rem_euclid(w) as usize,
    )
}

/// What a tick produced, for the network layer to act on.
pub struct TickOutput {
    pub snapshot: Option<Snapshot>,
    pub newly_initialized: Vec<PlayerId>,
    pub ran_gc: bool,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::world::generation::NoiseHeightField;

    fn sim() -> Simulation {
        let chunks = ChunkStore::new(Arc::new(NoiseHeightField::new(1)), 2);
        Simulation::new(chunks, ServerConfig::default())
    }

    #[test]
    fn empty_tick_produces_snapshot_every_other_tick() {
        let mut sim = sim();
        let out1 = sim.tick(Vec::new());
        assert!(out1.snapshot.is_none());
        let out2 = sim.tick(Vec::new());
        assert!(out2.snapshot.is_some());
        assert_eq!(out2.snapshot.unwrap().tick, 2);
    }

    #[test]
    fn disconnect_removes_body_and_from_awaiting() {
        let mut sim = sim();
        sim.queue_awaiting("p1".into(), 0.0, 0.0);
        assert!(sim.disconnect(&"p1".to_string()));
        assert!(sim.awaiting.is_empty());
    }

    #[test]
    fn awaiting_player_gets_initialized_once_load_complete() {
        let mut sim = sim();
        sim.set_expected_initial_colliders(0);
        sim.queue_awaiting("p1".into(), 0.0, 0.0);
        let out = sim.tick(Vec::new());
        assert!(out.newly_initialized.contains(&"p1".to_string()));
        assert!(sim.players.contains_key("p1"));
    }

    #[test]
    fn dropped_frame_for_unknown_player_does_not_panic() {
        let mut sim = sim();
        let frame = PlayerInput {
            seq: 1,
            intent_x: 0.0,
            intent_y: 0.0,
            intent_z: 0.0,
            yaw: 0.0,
            jump_pressed: false,
            fly_down_pressed: false,
            is_flying: false,
        };
        sim.tick(vec![InboundInput { player_id: "ghost".into(), frame }]);
    }
}
