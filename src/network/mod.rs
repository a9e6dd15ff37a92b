//! WebSocket transport: accept loop, per-connection read/write, and the
//! request/reply path for chunk requests.

pub mod connection;
pub mod server;

pub use connection::handle_connection;
pub use server::{run_server, Shared};
