//! Client-side prediction and reconciliation.
//!
//! Everything here runs on the client: it never touches [`crate::physics`]
//! or the chunk store. The client has no rigid-body world of its own, so
//! [`predictor`] mirrors the server's movement formulas with a small
//! analytic integrator instead (rotate intent, grounded/flying branches,
//! gravity) rather than stepping a physics pipeline. Remote players are
//! never predicted; [`remote`] just snaps them to the latest snapshot.

pub mod capture;
pub mod predictor;
pub mod remote;

pub use capture::InputCapture;
pub use predictor::{LocalPlayerState, PendingInput, Predictor};
pub use remote::{RemoteRoster, RemoteState, RosterDelta};
