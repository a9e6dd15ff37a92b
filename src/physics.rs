//! Thin wrapper over the rigid-body physics world: body/collider
//! creation, linear-velocity read/write, raycast-down, step.
//!
//! Built on `rapier3d`; nothing outside this module touches rapier types
//! directly, so the physics engine could be swapped without touching
//! movement, collider-lifecycle, or snapshot code.

use nalgebra::{vector, Vector3};
use rapier3d::prelude::*;

use crate::constants::{FIXED_DT, PLAYER_HEIGHT, PLAYER_RADIUS};

/// Owns every rapier collection. Mutated only from the simulation thread.
pub struct PhysicsWorld {
    pub rigid_body_set: RigidBodySet,
    pub collider_set: ColliderSet,
    island_manager: IslandManager,
    broad_phase: BroadPhaseMultiSap,
    narrow_phase: NarrowPhase,
    impulse_joint_set: ImpulseJointSet,
    multibody_joint_set: MultibodyJointSet,
    ccd_solver: CCDSolver,
    integration_parameters: IntegrationParameters,
    physics_pipeline: PhysicsPipeline,
    query_pipeline: QueryPipeline,
    gravity: Vector3<f32>,
}

impl PhysicsWorld {
    pub fn new() -> Self {
        let mut integration_parameters = IntegrationParameters::default();
        integration_parameters.dt = FIXED_DT;
        Self {
            rigid_body_set: RigidBodySet::new(),
            collider_set: ColliderSet::new(),
            island_manager: IslandManager::new(),
            broad_phase: BroadPhaseMultiSap::new(),
            narrow_phase: NarrowPhase::new(),
            impulse_joint_set: ImpulseJointSet::new(),
            multibody_joint_set: MultibodyJointSet::new(),
            ccd_solver: CCDSolver::new(),
            integration_parameters,
            physics_pipeline: PhysicsPipeline::new(),
            query_pipeline: QueryPipeline::new(),
            gravity: vector![0.0, -9.81, 0.0],
        }
    }

    /// Steps the simulation by one fixed tick.
    pub fn step(&mut self) {
        let physics_hooks = ();
        let event_handler = ();
        self.physics_pipeline.step(
            &self.gravity,
            &self.integration_parameters,
            &mut self.island_manager,
            &mut self.broad_phase,
            &mut self.narrow_phase,
            &mut self.rigid_body_set,
            &mut self.collider_set,
            &mut self.impulse_joint_set,
            &mut self.multibody_joint_set,
            &mut self.ccd_solver,
            Some(&mut self.query_pipeline),
            &physics_hooks,
            &event_handler,
        );
    }

    /// Creates a dynamic capsule body (total height 1.8 m, radius 0.4 m,
    /// origin at capsule center) at `position`, returning its rigid-body and
    /// collider handles.
    pub fn create_player_capsule(&mut self, position: Vector3<f32>) -> (RigidBodyHandle, ColliderHandle) {
        let half_height = (PLAYER_HEIGHT - 2.0 * PLAYER_RADIUS).max(0.0) / 2.0;
        let body = RigidBodyBuilder::dynamic()
            .translation(position)
            .lock_rotations()
            .build();
        let body_handle = self.rigid_body_set.insert(body);
        let collider = ColliderBuilder::capsule_y(half_height, PLAYER_RADIUS)
            .friction(0.0)
            .build();
        let collider_handle =
            self.collider_set
                .insert_with_parent(collider, body_handle, &mut self.rigid_body_set);
        (body_handle, collider_handle)
    }

    /// Removes a player's body and its attached collider together; the two
    /// must always be destroyed as a pair on disconnect.
    pub fn remove_player_capsule(&mut self, body_handle: RigidBodyHandle) {
        self.rigid_body_set.remove(
            body_handle,
            &mut self.island_manager,
            &mut self.collider_set,
            &mut self.impulse_joint_set,
            &mut self.multibody_joint_set,
            true,
        );
    }

    /// Creates a standalone static cuboid collider (chunk geometry has no
    /// parent rigid body) with the given half-extents, centered at the
    /// given world position.
    pub fn create_cuboid_collider(&mut self, half_extents: Vector3<f32>, translation: Vector3<f32>) -> ColliderHandle {
        let collider = ColliderBuilder::cuboid(half_extents.x, half_extents.y, half_extents.z)
            .translation(translation)
            .friction(0.7)
            .build();
        self.collider_set.insert(collider)
    }

    /// Removes a collider by handle. Missing handles are the caller's
    /// responsibility to detect and skip with a debug log.
    pub fn remove_collider(&mut self, handle: ColliderHandle, wake: bool) -> bool {
        self.collider_set
            .remove(handle, &mut self.island_manager, &mut self.rigid_body_set, wake)
            .is_some()
    }

    pub fn body_translation(&self, handle: RigidBodyHandle) -> Option<Vector3<f32>> {
        self.rigid_body_set.get(handle).map(|b| *b.translation())
    }

    pub fn body_linvel(&self, handle: RigidBodyHandle) -> Option<Vector3<f32>> {
        self.rigid_body_set.get(handle).map(|b| *b.linvel())
    }

    /// Sets linear velocity directly. Callers must guard against non-finite
    /// components before calling.
    pub fn set_linvel(&mut self, handle: RigidBodyHandle, linvel: Vector3<f32>, wake: bool) {
        if let Some(body) = self.rigid_body_set.get_mut(handle) {
            body.set_linvel(linvel, wake);
        }
    }

    /// Downward raycast from `origin` in direction (0,-1,0) up to `max_toi`.
    /// Excludes `exclude` (the player's own collider) from the hit test.
    pub fn raycast_down(&self, origin: nalgebra::Point3<f32>, max_toi: f32, exclude: ColliderHandle) -> bool {
        let ray = Ray::new(origin, vector![0.0, -1.0, 0.0]);
        let filter = QueryFilter::default().exclude_collider(exclude);
        self.query_pipeline
            .cast_ray(&self.rigid_body_set, &self.collider_set, &ray, max_toi, true, filter)
            .is_some()
    }

    /// Must be called after any collider-set mutation and before the next
    /// raycast, so spatial queries see up-to-date geometry.
    pub fn update_query_pipeline(&mut self) {
        self.query_pipeline.update(&self.rigid_body_set, &self.collider_set);
    }
}

impl Default for PhysicsWorld {
    fn default() -> Self {
        Self::new()
    }
}
