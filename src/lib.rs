//! `outcrop` — an authoritative multiplayer voxel world server.
//!
//! The simulation thread (see [`simulation::Simulation`]) owns the physics
//! world, the chunk store, and every connected player; it is driven by the
//! fixed-tick loop in [`network::server`]. Chunk generation and collider
//! construction are decoupled from it via the queues in [`world::collider`]
//! so that off-thread work never mutates physics state directly.
//!
//! [`client`] holds the prediction/reconciliation half of the protocol. It
//! is part of this crate rather than a separate one because both halves
//! must agree on the movement constants and wire formats bit-for-bit.

pub mod client;
pub mod config;
pub mod constants;
pub mod error;
pub mod movement;
pub mod mutation;
pub mod network;
pub mod physics;
pub mod player;
pub mod simulation;
pub mod wire;
pub mod world;

pub use config::ServerConfig;
pub use error::{ServerError, ServerResult};
pub use physics::PhysicsWorld;
pub use player::{Player, PlayerId};
pub use simulation::Simulation;
