//! Player lifecycle: id allocation, spawn, disconnect cleanup.

use rapier3d::prelude::{ColliderHandle, RigidBodyHandle};
use rand::Rng;
use std::collections::HashMap;

use crate::constants::{PLAYER_HEIGHT, SPAWN_CLEARANCE};
use crate::wire::binary::PlayerInput;

/// Opaque per-connection player identifier. Generated as a random 10-char
/// base36 token.
pub type PlayerId = String;

const ID_ALPHABET: &[u8] = b"0123456789abcdefghijklmnopqrstuvwxyz";
const ID_LEN: usize = 10;

/// Generates a random id not already present in `existing`.
pub fn allocate_id(existing: &HashMap<PlayerId, Player>) -> PlayerId {
    allocate_id_excluding(|id| existing.contains_key(id))
}

/// General form of [`allocate_id`] for callers whose "already in use" set
/// isn't a `HashMap<PlayerId, Player>` — the network layer assigns an id
/// before a `Player` record exists, checking only its live connection table.
pub fn allocate_id_excluding(mut taken: impl FnMut(&str) -> bool) -> PlayerId {
    loop {
        let id: String = {
            let mut rng = rand::thread_rng();
            (0..ID_LEN)
                .map(|_| ID_ALPHABET[rng.gen_range(0..ID_ALPHABET.len())] as char)
                .collect()
        };
        if !taken(&id) {
            return id;
        }
    }
}

/// A connected player. Position and velocity are not duplicated here — they
/// live on the physics body and are read through `body_handle`.
pub struct Player {
    pub id: PlayerId,
    pub body_handle: RigidBodyHandle,
    pub collider_handle: ColliderHandle,
    pub last_processed_input_seq: u32,
    pub last_yaw: f32,
    pub is_flying: bool,
    /// Last input's movement-intent presence, retained for logging only.
    pub had_movement_intent: bool,
}

impl Player {
    pub fn apply_input_metadata(&mut self, input: &PlayerInput) {
        self.last_processed_input_seq = input.seq;
        self.last_yaw = input.yaw;
        self.is_flying = input.is_flying;
        self.had_movement_intent = input.intent_x != 0.0 || input.intent_z != 0.0;
    }
}

/// A connection that has been assigned an id but has no physics body yet.
pub struct AwaitingPlayer {
    pub id: PlayerId,
    pub spawn_x: f32,
    pub spawn_z: f32,
}

/// Feet-safe spawn Y for a column whose heightmap top is `column_top`.
/// The column surface is authoritatively `column_top + 1`.
pub fn spawn_height(column_top: i32) -> f32 {
    let surface = column_top as f32 + 1.0;
    surface + PLAYER_HEIGHT / 2.0 + SPAWN_CLEARANCE
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn spawn_height_matches_formula() {
        // heightmap[0]=63 gives initialPos.y = 63+1+0.9+0.05.
        let y = spawn_height(63);
        assert!((y - (63.0 + 1.0 + 0.9 + 0.05)).abs() < 1e-5);
    }

    #[test]
    fn allocate_id_avoids_collisions() {
        let mut existing = HashMap::new();
        let first = allocate_id(&existing);
        existing.insert(
            first.clone(),
            Player {
                id: first.clone(),
                body_handle: RigidBodyHandle::invalid(),
                collider_handle: ColliderHandle::invalid(),
                last_processed_input_seq: 0,
                last_yaw: 0.0,
                is_flying: false,
                had_movement_intent: false,
            },
        );
        let second = allocate_id(&existing);
        assert_ne!(first, second);
        assert_eq!(second.len(), ID_LEN);
    }
}
