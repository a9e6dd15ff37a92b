//! Local movement integration, pending-input buffering, and reconciliation
//! against authoritative snapshots.
//!
//! The integrator here deliberately mirrors [`crate::movement::apply_input`]'s
//! branch structure (rotate intent by yaw, grounded vs flying, damping) so
//! that replaying the same captured keys for the same number of steps lands
//! close to what the server computed — but it has no raycast, so "grounded"
//! is whatever the last snapshot reported, held fixed until a jump or the
//! next snapshot arrives, and Y motion while airborne is plain gravity
//! integration rather than a physics-solver step.

use std::collections::VecDeque;

use nalgebra::{vector, Vector2, Vector3};

use crate::constants::{AIR_DAMP, FIXED_DT, FLY_SPEED, GRAVITY, GROUND_DAMP, JUMP_V, MAX_SPEED};
use crate::wire::binary::{PlayerInput, PlayerState};

use super::capture::InputCapture;

const EPSILON: f32 = 1e-4;
/// Optimization gate distance: below this and grounded, the
/// client accepts the snapshot outright instead of replaying pending input.
const SNAP_TOLERANCE: f32 = 0.3;

fn rotate_by_yaw(intent: Vector2<f32>, yaw: f32) -> Vector2<f32> {
    let (sin, cos) = yaw.sin_cos();
    Vector2::new(intent.x * cos - intent.y * sin, intent.x * sin + intent.y * cos)
}

/// The client's local belief about its own player: position, velocity, and
/// the last grounded flag it was told. Position and velocity are not
/// duplicated elsewhere on the client — they live here instead, since there
/// is no physics body to read them from.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LocalPlayerState {
    pub position: Vector3<f32>,
    pub velocity: Vector3<f32>,
    pub is_grounded: bool,
}

/// A buffered, not-yet-acknowledged input frame.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PendingInput {
    pub seq: u32,
    /// `numFixedTicks ≈ round((1/send-rate) / fixed_dt)`.
    pub num_fixed_ticks: u32,
    pub keys: InputCapture,
    /// Horizontal velocity at capture time. Replay itself recomputes
    /// velocity from the predictor's running state, so this is read only by
    /// callers that want to inspect history (tests, debug overlays), never
    /// by `reconcile`.
    pub horizontal_velocity_at_capture: Vector2<f32>,
}

/// Advances one fixed step of the shared movement math, adapted to run
/// without a physics world.
fn integrate(state: &mut LocalPlayerState, keys: &InputCapture, dt: f32) {
    let (ix, iz) = keys.intent_xz();
    let rotated = rotate_by_yaw(Vector2::new(ix, iz), keys.yaw);

    if keys.is_flying {
        let xz = if rotated.norm() > EPSILON {
            rotated * FLY_SPEED
        } else {
            Vector2::new(0.0, 0.0)
        };
        let y = if keys.jump {
            FLY_SPEED / 2.0
        } else if keys.fly_down {
            -FLY_SPEED / 2.0
        } else {
            0.0
        };
        state.velocity = vector![xz.x, y, xz.y];
    } else {
        let xz = if rotated.norm() > EPSILON {
            rotated.normalize() * MAX_SPEED
        } else {
            let damp = if state.is_grounded { GROUND_DAMP } else { AIR_DAMP };
            Vector2::new(state.velocity.x, state.velocity.z) * damp
        };
        let vy = if state.is_grounded {
            if keys.jump {
                state.is_grounded = false;
                JUMP_V
            } else {
                0.0
            }
        } else {
            state.velocity.y - GRAVITY * dt
        };
        state.velocity = vector![xz.x, vy, xz.y];
    }

    state.position += state.velocity * dt;
}

/// Owns the local player's predicted state and its pending-input buffer.
pub struct Predictor {
    pub state: LocalPlayerState,
    pending: VecDeque<PendingInput>,
    next_seq: u32,
    ticks_per_send: u32,
}

impl Predictor {
    /// `send_rate_hz` is the server's snapshot broadcast rate (15 Hz),
    /// used to derive each pending input's replay step count.
    pub fn new(spawn: Vector3<f32>, send_rate_hz: f32) -> Self {
        let ticks_per_send = ((1.0 / send_rate_hz) / FIXED_DT).round().max(1.0) as u32;
        Self {
            state: LocalPlayerState { position: spawn, velocity: Vector3::zeros(), is_grounded: true },
            pending: VecDeque::new(),
            next_seq: 0,
            ticks_per_send,
        }
    }

    pub fn pending_len(&self) -> usize {
        self.pending.len()
    }

    /// Captures one client tick: assigns the next seq, integrates locally,
    /// buffers the resulting [`PendingInput`], and returns the wire frame to
    /// send.
    pub fn capture_and_step(&mut self, keys: InputCapture) -> PlayerInput {
        self.next_seq = self.next_seq.wrapping_add(1);
        let seq = self.next_seq;

        integrate(&mut self.state, &keys, FIXED_DT);

        self.pending.push_back(PendingInput {
            seq,
            num_fixed_ticks: self.ticks_per_send,
            keys,
            horizontal_velocity_at_capture: Vector2::new(self.state.velocity.x, self.state.velocity.z),
        });

        keys.to_wire(seq)
    }

    /// Reconciles local state against an authoritative [`PlayerState`].
    pub fn reconcile(&mut self, snapshot: &PlayerState) {
        let authoritative = Vector3::new(snapshot.pos[0], snapshot.pos[1], snapshot.pos[2]);
        let predicted = self.state.position;
        let drift = (predicted - authoritative).norm();

        // Gate evaluated against the pre-reconciliation predicted position,
        // before it's overwritten below.
        let skip_replay = snapshot.is_grounded && !snapshot.is_flying && drift < SNAP_TOLERANCE;

        // Step 1 + 2: overwrite position, seed replay velocity.
        self.state.position = authoritative;
        self.state.velocity = Vector3::new(snapshot.vel[0], snapshot.vel[1], snapshot.vel[2]);
        self.state.is_grounded = snapshot.is_grounded;

        // Step 3: drop acknowledged inputs.
        self.pending.retain(|p| p.seq > snapshot.last_ack);

        if skip_replay {
            return;
        }

        // Step 4: replay remaining pending inputs.
        for pending in self.pending.iter() {
            for _ in 0..pending.num_fixed_ticks {
                integrate(&mut self.state, &pending.keys, FIXED_DT);
            }
        }
    }
}
