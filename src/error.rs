//! Crate-wide error handling.
//!
//! [`ServerError`] is the single typed error surfaced to clients over the
//! wire. Every variant maps to one of the stable error-kind strings from the
//! protocol (see [`ServerError::code`]) so the JSON/text representation never
//! depends on the Rust variant name. Internal faults that never reach a
//! client (lock poisoning, channel closure) are folded into
//! [`ServerError::InternalServerError`] via the `From` impls below.

use thiserror::Error;

/// Typed error returned by validation and mutation pipelines.
#[derive(Debug, Clone, Error)]
pub enum ServerError {
    #[error("malformed request: {0}")]
    BadRequest(String),

    #[error("invalid coordinates: {0}")]
    InvalidCoordinates(String),

    #[error("invalid parameters: {0}")]
    InvalidParameters(String),

    #[error("target outside world bounds")]
    OutOfBounds,

    #[error("target voxel is already occupied")]
    BlockOccupied,

    #[error("invalid block id: {0}")]
    InvalidBlockID(u8),

    #[error("failed to apply block mutation")]
    SetBlockFailed,

    #[error("chunk generation failed: {0}")]
    ChunkGenerationFailed(String),

    #[error("internal server error: {0}")]
    InternalServerError(String),

    #[error("server is full")]
    ServerFull,

    #[error("player initialization failed: {0}")]
    InitFailed(String),

    #[error("invalid JSON: {0}")]
    InvalidJSON(String),
}

impl ServerError {
    /// Stable wire identifier for this error kind, used as the `code` field
    /// of JSON error frames (`mineError`, `placeError`, `chunkResponseError`).
    pub fn code(&self) -> &'static str {
        match self {
            ServerError::BadRequest(_) => "BadRequest",
            ServerError::InvalidCoordinates(_) => "InvalidCoordinates",
            ServerError::InvalidParameters(_) => "InvalidParameters",
            ServerError::OutOfBounds => "OutOfBounds",
            ServerError::BlockOccupied => "BlockOccupied",
            ServerError::InvalidBlockID(_) => "InvalidBlockID",
            ServerError::SetBlockFailed => "SetBlockFailed",
            ServerError::ChunkGenerationFailed(_) => "ChunkGenerationFailed",
            ServerError::InternalServerError(_) => "InternalServerError",
            ServerError::ServerFull => "ServerFull",
            ServerError::InitFailed(_) => "InitFailed",
            ServerError::InvalidJSON(_) => "InvalidJSON",
        }
    }

    /// Human-readable reason echoed alongside `code` in error frames.
    pub fn reason(&self) -> String {
        self.to_string()
    }
}

impl From<serde_json::Error> for ServerError {
    fn from(err: serde_json::Error) -> Self {
        ServerError::InvalidJSON(err.to_string())
    }
}

impl<T> From<std::sync::PoisonError<T>> for ServerError {
    fn from(err: std::sync::PoisonError<T>) -> Self {
        ServerError::InternalServerError(format!("lock poisoned: {err}"))
    }
}

pub type ServerResult<T> = Result<T, ServerError>;
