//! Wire protocol: positional binary schemas for the hot path, tagged JSON
//! for the control plane, and the run-length-encoded voxel diff format.

pub mod binary;
pub mod json;
pub mod rle;

pub use binary::{PlayerInput, PlayerState, Snapshot};
pub use json::ClientMessage;
pub use rle::{RleEntry, VoxelChange};
