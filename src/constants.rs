//! Authoritative simulation constants.
//!
//! These are the hard defaults; [`crate::config::ServerConfig`] allows an
//! operator to override the non-movement values (player cap, GC radius,
//! queue caps, seed) without recompiling. Movement constants are kept as
//! `const`s rather than config fields because client and server must agree
//! on them bit-for-bit to keep prediction replay deterministic.

/// Chunk width/depth in voxels at HIGH LOD.
pub const CHUNK_W: usize = 32;
/// Chunk height in voxels, independent of LOD.
pub const CHUNK_H: usize = 128;
/// Chunk width/depth at LOW LOD.
pub const CHUNK_W_LOW: usize = 16;

/// Fixed simulation step, seconds.
pub const FIXED_DT: f32 = 1.0 / 30.0;
/// Snapshot broadcast runs every other tick (15 Hz).
pub const SNAPSHOT_EVERY_N_TICKS: u32 = 2;
/// Proximity GC runs every 60 seconds of ticks.
pub const GC_INTERVAL_TICKS: u32 = (60.0 / FIXED_DT) as u32;

/// Ground movement speed, m/s.
pub const MAX_SPEED: f32 = 6.0;
/// Flight movement speed, m/s.
pub const FLY_SPEED: f32 = 10.0;
/// Jump impulse velocity, m/s.
pub const JUMP_V: f32 = 7.0;
/// Per-tick horizontal velocity damping while grounded and idle.
pub const GROUND_DAMP: f32 = 0.90;
/// Per-tick horizontal velocity damping while airborne and idle.
pub const AIR_DAMP: f32 = 0.99;

/// Capsule player body: total height, meters.
pub const PLAYER_HEIGHT: f32 = 1.8;
/// Capsule player body: radius, meters.
pub const PLAYER_RADIUS: f32 = 0.4;

/// Ground raycast origin offset above the capsule bottom.
pub const GROUND_RAY_SKIN: f32 = 0.01;
/// Ground raycast maximum time-of-impact.
pub const GROUND_RAY_TOI: f32 = 0.15;

/// Extra clearance added above the column top when placing a spawn.
pub const SPAWN_CLEARANCE: f32 = 0.05;

/// Default proximity GC radius, meters.
pub const DEFAULT_GC_RADIUS: f32 = 500.0;
/// Default generation worker concurrency.
pub const DEFAULT_GEN_CONCURRENCY: usize = 4;
/// Default per-tick collider creation cap.
pub const DEFAULT_N_CREATE: usize = 1024;
/// Default per-tick collider removal cap.
pub const DEFAULT_N_REMOVE: usize = 50;
/// Default connection cap.
pub const DEFAULT_MAX_PLAYERS: usize = 64;
/// Default chunk request timeout, seconds.
pub const CHUNK_REQUEST_TIMEOUT_SECS: u64 = 5;

/// World AABB bound magnitude in X/Z (world spans [-WORLD_XZ, WORLD_XZ]).
pub const WORLD_XZ: i32 = 30_000;
/// World AABB bound in Y (world spans [0, WORLD_Y]).
pub const WORLD_Y: i32 = CHUNK_H as i32;

/// Gravity magnitude, m/s². The server's physics world supplies this itself;
/// the client has no physics engine to fall back on, so its
/// local prediction integrator (`client::predictor`) applies this value
/// directly during airborne replay to stay close to the server's solver.
pub const GRAVITY: f32 = 9.81;
