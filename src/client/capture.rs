//! Raw input state, captured once per client tick.
//!
//! This is the client-side analogue of [`crate::wire::binary::PlayerInput`]
//! before it is bound to a sequence number: the set of keys/camera state a
//! caller reads from whatever input backend it uses (camera and input
//! systems themselves are someone else's concern), handed to the predictor
//! each tick.

use crate::wire::binary::PlayerInput;

/// A snapshot of locally-pressed movement keys and camera yaw, taken once
/// per client tick. Movement-intent XZ is derived
/// from the four directional flags rather than stored pre-rotated, so the
/// same capture can be replayed against a different yaw if needed.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct InputCapture {
    pub forward: bool,
    pub back: bool,
    pub left: bool,
    pub right: bool,
    pub jump: bool,
    pub fly_down: bool,
    pub is_flying: bool,
    pub yaw: f32,
}

impl InputCapture {
    pub fn idle(yaw: f32) -> Self {
        Self {
            forward: false,
            back: false,
            left: false,
            right: false,
            jump: false,
            fly_down: false,
            is_flying: false,
            yaw,
        }
    }

    /// Local-space XZ movement intent in `[-1,1]` per axis, forward = -Z.
    pub fn intent_xz(&self) -> (f32, f32) {
        let mut x = 0.0;
        let mut z = 0.0;
        if self.forward {
            z -= 1.0;
        }
        if self.back {
            z += 1.0;
        }
        if self.left {
            x -= 1.0;
        }
        if self.right {
            x += 1.0;
        }
        (x, z)
    }

    /// Builds the wire frame for this capture, bound to `seq`.
    pub fn to_wire(&self, seq: u32) -> PlayerInput {
        let (x, z) = self.intent_xz();
        PlayerInput {
            seq,
            intent_x: x,
            intent_y: 0.0,
            intent_z: z,
            yaw: self.yaw,
            jump_pressed: self.jump,
            fly_down_pressed: self.fly_down,
            is_flying: self.is_flying,
        }
    }
}
