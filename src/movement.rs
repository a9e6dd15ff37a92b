//! Input decoding and per-tick movement integration.

use nalgebra::{point, vector, Vector2};

use crate::constants::{
    AIR_DAMP, FLY_SPEED, GROUND_DAMP, GROUND_RAY_SKIN, GROUND_RAY_TOI, JUMP_V, MAX_SPEED, PLAYER_HEIGHT,
};
use crate::physics::PhysicsWorld;
use crate::player::Player;
use crate::wire::binary::PlayerInput;

const EPSILON: f32 = 1e-4;

/// Rotates a 2-D intent vector by `yaw` radians about Y-up.
fn rotate_by_yaw(intent: Vector2<f32>, yaw: f32) -> Vector2<f32> {
    let (sin, cos) = yaw.sin_cos();
    Vector2::new(
        intent.x * cos - intent.y * sin,
        intent.x * sin + intent.y * cos,
    )
}

/// True if a downward raycast from just below the player's feet hits
/// something within `GROUND_RAY_TOI`.
pub fn is_grounded(physics: &PhysicsWorld, player: &Player) -> bool {
    let Some(pos) = physics.body_translation(player.body_handle) else {
        return false;
    };
    let half_height = PLAYER_HEIGHT / 2.0;
    let origin = point![pos.x, pos.y - half_height + GROUND_RAY_SKIN, pos.z];
    physics.raycast_down(origin, GROUND_RAY_TOI, player.collider_handle)
}

/// Applies one input frame to `player`'s physics body.
///
/// Returns `false` if the frame was rejected (non-finite fields) and must
/// not advance the stored sequence number.
pub fn apply_input(physics: &mut PhysicsWorld, player: &mut Player, input: &PlayerInput) -> bool {
    if input.has_non_finite() {
        log::debug!("dropping non-finite input frame seq={} for player", input.seq);
        return false;
    }

    let Some(current_vel) = physics.body_linvel(player.body_handle) else {
        return false;
    };

    let intent = Vector2::new(input.intent_x, input.intent_z);
    let rotated = rotate_by_yaw(intent, input.yaw);

    let new_linvel = if input.is_flying {
        let xz = if rotated.norm() > EPSILON {
            rotated * FLY_SPEED
        } else {
            Vector2::new(0.0, 0.0)
        };
        let y = if input.jump_pressed {
            FLY_SPEED / 2.0
        } else if input.fly_down_pressed {
            -FLY_SPEED / 2.0
        } else {
            0.0
        };
        vector![xz.x, y, xz.y]
    } else {
        let grounded = is_grounded(physics, player);
        let xz = if rotated.norm() > EPSILON {
            rotated.normalize() * MAX_SPEED
        } else {
            let damp = if grounded { GROUND_DAMP } else { AIR_DAMP };
            Vector2::new(current_vel.x, current_vel.z) * damp
        };
        let mut y = current_vel.y;
        if grounded && input.jump_pressed {
            y = JUMP_V;
        }
        vector![xz.x, y, xz.y]
    };

    if new_linvel.iter().all(|c| c.is_finite()) {
        physics.set_linvel(player.body_handle, new_linvel, true);
    } else {
        log::debug!("skipping set_linvel for non-finite computed velocity, seq={}", input.seq);
    }

    player.apply_input_metadata(input);
    true
}

/// Zeroes residual Y velocity for flying players after the physics step
/// runs. A player who submits no frame this tick gets no damping at all —
/// damping only happens as part of `apply_input`.
pub fn clamp_flying_y_velocity(physics: &mut PhysicsWorld, player: &Player) {
    if !player.is_flying {
        return;
    }
    if let Some(vel) = physics.body_linvel(player.body_handle) {
        if vel.y != 0.0 {
            physics.set_linvel(player.body_handle, vector![vel.x, 0.0, vel.z], true);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use nalgebra::vector as v;

    fn fresh_player(physics: &mut PhysicsWorld) -> Player {
        let (body, collider) = physics.create_player_capsule(v![0.0, 100.0, 0.0]);
        Player {
            id: "p1".into(),
            body_handle: body,
            collider_handle: collider,
            last_processed_input_seq: 0,
            last_yaw: 0.0,
            is_flying: false,
            had_movement_intent: false,
        }
    }

    fn input(seq: u32) -> PlayerInput {
        PlayerInput {
            seq,
            intent_x: 0.0,
            intent_y: 0.0,
            intent_z: -1.0,
            yaw: 0.0,
            jump_pressed: false,
            fly_down_pressed: false,
            is_flying: false,
        }
    }

    #[test]
    fn forward_intent_sets_horizontal_speed() {
        let mut physics = PhysicsWorld::new();
        let mut player = fresh_player(&mut physics);
        apply_input(&mut physics, &mut player, &input(1));
        let vel = physics.body_linvel(player.body_handle).unwrap();
        assert!((vel.z - (-MAX_SPEED)).abs() < 1e-4);
        assert_eq!(player.last_processed_input_seq, 1);
    }

    #[test]
    fn yaw_rotates_intent() {
        let mut physics = PhysicsWorld::new();
        let mut player = fresh_player(&mut physics);
        let mut frame = input(1);
        frame.yaw = std::f32::consts::FRAC_PI_2;
        apply_input(&mut physics, &mut player, &frame);
        let vel = physics.body_linvel(player.body_handle).unwrap();
        assert!(vel.x.abs() > 1.0, "rotating -Z intent by 90 degrees should push along X");
    }

    #[test]
    fn non_finite_frame_is_rejected_without_advancing_seq() {
        let mut physics = PhysicsWorld::new();
        let mut player = fresh_player(&mut physics);
        player.last_processed_input_seq = 5;
        let mut frame = input(6);
        frame.yaw = f32::NAN;
        let applied = apply_input(&mut physics, &mut player, &frame);
        assert!(!applied);
        assert_eq!(player.last_processed_input_seq, 5);
    }

    #[test]
    fn flying_jump_sets_positive_y_and_fly_down_sets_negative() {
        let mut physics = PhysicsWorld::new();
        let mut player = fresh_player(&mut physics);
        let mut frame = input(1);
        frame.is_flying = true;
        frame.jump_pressed = true;
        frame.intent_x = 0.0;
        frame.intent_z = 0.0;
        apply_input(&mut physics, &mut player, &frame);
        let vel = physics.body_linvel(player.body_handle).unwrap();
        assert!((vel.y - FLY_SPEED / 2.0).abs() < 1e-4);

        let mut frame2 = input(2);
        frame2.is_flying = true;
        frame2.fly_down_pressed = true;
        frame2.intent_x = 0.0;
        frame2.intent_z = 0.0;
        apply_input(&mut physics, &mut player, &frame2);
        let vel2 = physics.body_linvel(player.body_handle).unwrap();
        assert!((vel2.y - (-FLY_SPEED / 2.0)).abs() < 1e-4);
    }

    #[test]
    fn idle_grounded_frame_applies_ground_damp() {
        let mut physics = PhysicsWorld::new();
        let (body, collider) = physics.create_player_capsule(v![0.0, 1.0, 0.0]);
        physics.create_cuboid_collider(v![50.0, 1.0, 50.0], v![0.0, -1.0, 0.0]);
        physics.update_query_pipeline();
        let mut player = Player {
            id: "p1".into(),
            body_handle: body,
            collider_handle: collider,
            last_processed_input_seq: 0,
            last_yaw: 0.0,
            is_flying: false,
            had_movement_intent: false,
        };
        physics.set_linvel(player.body_handle, v![4.0, 0.0, 0.0], true);
        let mut frame = input(1);
        frame.intent_x = 0.0;
        frame.intent_z = 0.0;
        apply_input(&mut physics, &mut player, &frame);
        let vel = physics.body_linvel(player.body_handle).unwrap();
        assert!((vel.x - 4.0 * GROUND_DAMP).abs() < 1e-4);
    }

    #[test]
    fn idle_airborne_frame_applies_air_damp() {
        let mut physics = PhysicsWorld::new();
        let mut player = fresh_player(&mut physics);
        physics.update_query_pipeline();
        physics.set_linvel(player.body_handle, v![4.0, 0.0, 0.0], true);
        let mut frame = input(1);
        frame.intent_x = 0.0;
        frame.intent_z = 0.0;
        apply_input(&mut physics, &mut player, &frame);
        let vel = physics.body_linvel(player.body_handle).unwrap();
        assert!((vel.x - 4.0 * AIR_DAMP).abs() < 1e-4);
    }

    #[test]
    fn flying_post_step_clamp_zeroes_y_velocity() {
        let mut physics = PhysicsWorld::new();
        let mut player = fresh_player(&mut physics);
        player.is_flying = true;
        physics.set_linvel(player.body_handle, v![0.0, 3.0, 0.0], true);
        clamp_flying_y_velocity(&mut physics, &player);
        let vel = physics.body_linvel(player.body_handle).unwrap();
        assert_eq!(vel.y, 0.0);
    }
}
