use super::*;
use crate::constants::CHUNK_W;
use crate::physics::PhysicsWorld;
use crate::world::chunk::{ChunkKey, Lod};
use std::sync::Arc;

fn empty_chunk() -> Chunk {
    Chunk::empty(ChunkKey::new(0, 0, Lod::High))
}

#[test]
fn single_solid_voxel_yields_one_unit_cuboid() {
    let mut chunk = empty_chunk();
    chunk.set(5, 5, 5, 1);
    let cuboids = greedy_mesh(&chunk);
    assert_eq!(cuboids.len(), 1);
    assert_eq!(cuboids[0], Cuboid { x: 5, y: 5, z: 5, w: 1, h: 1, d: 1 });
}

#[test]
fn two_adjacent_voxels_along_x_merge() {
    let mut chunk = empty_chunk();
    chunk.set(0, 0, 0, 1);
    chunk.set(1, 0, 0, 1);
    let cuboids = greedy_mesh(&chunk);
    assert_eq!(cuboids.len(), 1);
    assert_eq!(cuboids[0].w, 2);
}

#[test]
fn fully_solid_chunk_collapses_to_one_cuboid() {
    let mut chunk = empty_chunk();
    for v in chunk.voxels.iter_mut() {
        *v = 2;
    }
    let cuboids = greedy_mesh(&chunk);
    assert_eq!(cuboids.len(), 1);
    let c = cuboids[0];
    assert_eq!((c.w, c.h, c.d), (CHUNK_W, crate::constants::CHUNK_H, CHUNK_W));
}

#[test]
fn empty_chunk_has_no_colliders() {
    let chunk = empty_chunk();
    assert!(greedy_mesh(&chunk).is_empty());
}

#[test]
fn enqueue_build_and_drain_populates_handles() {
    let mut chunk = empty_chunk();
    chunk.set(0, 0, 0, 1);
    let shared: SharedChunk = Arc::new(parking_lot::RwLock::new(chunk));

    let mut queues = ColliderQueues::new();
    queues.enqueue_build(&shared);
    assert_eq!(queues.queue_len().0, 1);

    let mut physics = PhysicsWorld::new();
    let ran = queues.drain_create(&mut physics, 10);
    assert_eq!(ran, 1);
    assert_eq!(shared.read().collider_handles.len(), 1);
    assert_eq!(physics.collider_set.len(), 1);
}

#[test]
fn low_lod_cuboid_is_scaled_to_the_tile_world_footprint() {
    // LOW LOD packs the same CHUNK_W-meter tile into half as many cells
    // along X/Z, so a full-width LOW chunk's single merged cuboid must still
    // span the tile's real 32m footprint, not its 16-cell grid extent.
    let mut chunk = Chunk::empty(ChunkKey::new(0, 0, Lod::Low));
    for v in chunk.voxels.iter_mut() {
        *v = 2;
    }
    let shared: SharedChunk = Arc::new(parking_lot::RwLock::new(chunk));

    let mut queues = ColliderQueues::new();
    queues.enqueue_build(&shared);
    let mut physics = PhysicsWorld::new();
    queues.drain_create(&mut physics, 10);

    let handle = shared.read().collider_handles[0];
    let collider = physics.collider_set.get(handle).unwrap();
    let cuboid = collider.shape().as_cuboid().expect("expected a cuboid shape");
    assert_eq!(cuboid.half_extents.x, CHUNK_W as f32 / 2.0);
    assert_eq!(cuboid.half_extents.z, CHUNK_W as f32 / 2.0);
    assert_eq!(collider.translation().x, CHUNK_W as f32 / 2.0);
    assert_eq!(collider.translation().z, CHUNK_W as f32 / 2.0);
}

#[test]
fn retire_drains_handles_into_remove_queue() {
    let mut chunk = empty_chunk();
    chunk.set(0, 0, 0, 1);
    let shared: SharedChunk = Arc::new(parking_lot::RwLock::new(chunk));

    let mut queues = ColliderQueues::new();
    queues.enqueue_build(&shared);
    let mut physics = PhysicsWorld::new();
    queues.drain_create(&mut physics, 10);
    assert_eq!(shared.read().collider_handles.len(), 1);

    queues.retire(&shared);
    assert_eq!(shared.read().collider_handles.len(), 0, "retire must clear the chunk's handle vector");
    assert_eq!(queues.queue_len().1, 1);

    let removed = queues.drain_remove(&mut physics, 10);
    assert_eq!(removed, 1);
    assert_eq!(physics.collider_set.len(), 0);
}

#[test]
fn drain_remove_skips_missing_handle_without_panicking() {
    let mut queues = ColliderQueues::new();
    let mut physics = PhysicsWorld::new();
    let handle = physics.create_cuboid_collider(nalgebra::vector![1.0, 1.0, 1.0], nalgebra::vector![0.0, 0.0, 0.0]);
    physics.remove_collider(handle, true);
    queues.to_remove.push_back(handle);
    let removed = queues.drain_remove(&mut physics, 10);
    assert_eq!(removed, 1, "already-missing handles still count as drained, just skipped");
}
