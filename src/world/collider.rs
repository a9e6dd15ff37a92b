//! Greedy-meshed cuboid collider construction and the two per-tick queues
//! that decouple mesh generation from physics-world mutation.

use nalgebra::vector;
use rapier3d::prelude::ColliderHandle;
use rustc_hash::FxHashMap;
use std::collections::VecDeque;

use crate::constants::CHUNK_H;
use crate::physics::PhysicsWorld;
use crate::world::chunk::{Chunk, ChunkKey};
use crate::world::store::SharedChunk;

/// One maximal axis-aligned cuboid of solid, exposed voxels, in chunk-local
/// voxel coordinates (inclusive min corner, exclusive extents).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Cuboid {
    x: usize,
    y: usize,
    z: usize,
    w: usize,
    h: usize,
    d: usize,
}

/// A queued physics-world mutation, run exactly once when drained.
type QueuedAction = Box<dyn FnOnce(&mut PhysicsWorld) + Send>;

/// The to-create and to-remove FIFOs. Single-producer-single-consumer from
/// the simulation thread's point of view, so plain `VecDeque`s suffice — no
/// channel or lock is needed.
#[derive(Default)]
pub struct ColliderQueues {
    to_create: VecDeque<(ChunkKey, QueuedAction)>,
    to_remove: VecDeque<ColliderHandle>,
    /// Outstanding creation-action count per chunk, so proximity GC can tell
    /// whether a chunk still has builds in flight and defer deletion.
    pending_creates: FxHashMap<ChunkKey, usize>,
}

impl ColliderQueues {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn queue_len(&self) -> (usize, usize) {
        (self.to_create.len(), self.to_remove.len())
    }

    /// True if `key` still has queued-but-unrun creation actions.
    pub fn has_pending_creates(&self, key: ChunkKey) -> bool {
        self.pending_creates.get(&key).copied().unwrap_or(0) > 0
    }

    /// Greedily meshes `chunk`'s solid voxels into cuboids and enqueues one
    /// creation action per cuboid. Collider handles land on `chunk` only
    /// when the action runs.
    pub fn enqueue_build(&mut self, chunk: &SharedChunk) {
        let (key, cuboids) = {
            let guard = chunk.read();
            (guard.key, greedy_mesh(&guard))
        };
        if cuboids.is_empty() {
            return;
        }
        *self.pending_creates.entry(key).or_insert(0) += cuboids.len();
        for cuboid in cuboids {
            let chunk = chunk.clone();
            let action: QueuedAction = Box::new(move |physics: &mut PhysicsWorld| {
                let (ox, oz, voxel_size) = {
                    let guard = chunk.read();
                    let (ox, oz) = guard.key.world_origin_xz();
                    (ox, oz, guard.horizontal_voxel_size())
                };
                // X/Z are scaled by the chunk's horizontal voxel size so a
                // coarser LOD's grid cells still cover the right world-space
                // footprint; Y is never LOD-scaled.
                let half_extents = vector![
                    cuboid.w as f32 * voxel_size / 2.0,
                    cuboid.h as f32 / 2.0,
                    cuboid.d as f32 * voxel_size / 2.0
                ];
                let center = vector![
                    ox + (cuboid.x as f32 + cuboid.w as f32 / 2.0) * voxel_size,
                    cuboid.y as f32 + cuboid.h as f32 / 2.0,
                    oz + (cuboid.z as f32 + cuboid.d as f32 / 2.0) * voxel_size
                ];
                let handle = physics.create_cuboid_collider(half_extents, center);
                chunk.write().collider_handles.push(handle);
            });
            self.to_create.push_back((key, action));
        }
    }

    /// Drains `chunk.collider_handles` into the to-remove queue and clears
    /// it. Retirement is symmetric with build: every handle a build action
    /// ever pushed is queued for removal exactly once.
    pub fn retire(&mut self, chunk: &SharedChunk) {
        let handles: Vec<ColliderHandle> = {
            let mut guard = chunk.write();
            guard.collider_handles.drain(..).collect()
        };
        self.to_remove.extend(handles);
    }

    /// Runs up to `max` queued creation actions. Returns how many ran.
    pub fn drain_create(&mut self, physics: &mut PhysicsWorld, max: usize) -> usize {
        let mut ran = 0;
        while ran < max {
            match self.to_create.pop_front() {
                Some((key, action)) => {
                    action(physics);
                    if let Some(count) = self.pending_creates.get_mut(&key) {
                        *count -= 1;
                        if *count == 0 {
                            self.pending_creates.remove(&key);
                        }
                    }
                    ran += 1;
                }
                None => break,
            }
        }
        ran
    }

    /// Removes up to `max` queued handles from the physics world. Missing
    /// handles are skipped with a debug log.
    pub fn drain_remove(&mut self, physics: &mut PhysicsWorld, max: usize) -> usize {
        let mut ran = 0;
        while ran < max {
            match self.to_remove.pop_front() {
                Some(handle) => {
                    if !physics.remove_collider(handle, true) {
                        log::debug!("collider handle {handle:?} already gone, skipping");
                    }
                    ran += 1;
                }
                None => break,
            }
        }
        ran
    }
}

/// 3-D greedy meshing with exposure gating: only solid voxels with at least
/// one air or out-of-chunk neighbor seed a cuboid, and each cuboid expands
/// greedily first along X, then Z, then Y.
fn greedy_mesh(chunk: &Chunk) -> Vec<Cuboid> {
    let w = chunk.width();
    let h = CHUNK_H;
    let mut visited = vec![false; w * w * h];
    let idx = |x: usize, y: usize, z: usize| y * w * w + z * w + x;

    let is_solid = |x: usize, y: usize, z: usize| chunk.get(x, y, z) != 0;
    let is_air_or_out = |x: isize, y: isize, z: isize| -> bool {
        if y < 0 || y as usize >= h {
            return true;
        }
        if x < 0 || x as usize >= w || z < 0 || z as usize >= w {
            // Out-of-chunk neighbors on -X/+X/-Z/+Z are treated as air.
            return true;
        }
        !is_solid(x as usize, y as usize, z as usize)
    };

    let mut cuboids = Vec::new();

    for y in 0..h {
        for z in 0..w {
            for x in 0..w {
                if visited[idx(x, y, z)] || !is_solid(x, y, z) {
                    continue;
                }
                let exposed = is_air_or_out(x as isize - 1, y as isize, z as isize)
                    || is_air_or_out(x as isize + 1, y as isize, z as isize)
                    || is_air_or_out(x as isize, y as isize - 1, z as isize)
                    || is_air_or_out(x as isize, y as isize + 1, z as isize)
                    || is_air_or_out(x as isize, y as isize, z as isize - 1)
                    || is_air_or_out(x as isize, y as isize, z as isize + 1);
                if !exposed {
                    continue;
                }

                // Expand width along +X.
                let mut width = 1;
                while x + width < w && is_solid(x + width, y, z) && !visited[idx(x + width, y, z)] {
                    width += 1;
                }

                // Expand depth along +Z over the whole width strip.
                let mut depth = 1;
                'depth: while z + depth < w {
                    for dx in 0..width {
                        if !is_solid(x + dx, y, z + depth) || visited[idx(x + dx, y, z + depth)] {
                            break 'depth;
                        }
                    }
                    depth += 1;
                }

                // Expand height along +Y over the whole width x depth slab.
                let mut height = 1;
                'height: while y + height < h {
                    for dz in 0..depth {
                        for dx in 0..width {
                            if !is_solid(x + dx, y + height, z + dz) || visited[idx(x + dx, y + height, z + dz)] {
                                break 'height;
                            }
                        }
                    }
                    height += 1;
                }

                for dy in 0..height {
                    for dz in 0..depth {
                        for dx in 0..width {
                            visited[idx(x + dx, y + dy, z + dz)] = true;
                        }
                    }
                }

                cuboids.push(Cuboid { x, y, z, w: width, h: height, d: depth });
            }
        }
    }

    cuboids
}

#[cfg(test)]
#[path = "collider_tests.rs"]
mod tests;
