//! Chunk storage, procedural generation, collider lifecycle, and proximity
//! garbage collection.

pub mod chunk;
pub mod collider;
pub mod gc;
pub mod generation;
pub mod store;

pub use chunk::{Chunk, ChunkKey, Lod};
pub use generation::HeightField;
pub use store::ChunkStore;
