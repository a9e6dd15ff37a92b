//! The procedural height function contract and chunk voxel fill algorithm.

use noise::{NoiseFn, Perlin};

use crate::constants::CHUNK_W;
use crate::world::chunk::Chunk;

/// A deterministic, seeded height function: for a given seed, two calls with
/// the same world column must return the same value. The core depends only
/// on this trait, not on any specific noise algorithm — implementers may
/// substitute their own.
pub trait HeightField: Send + Sync {
    /// Column top-y for the world column centered at `(world_x, world_z)`.
    fn height_at(&self, world_x: f32, world_z: f32) -> i32;
}

/// Default height field: a small fractal sum of Perlin octaves, seeded and
/// scaled to a plausible terrain height band. This exists so the crate runs
/// stand-alone; any other deterministic height function satisfies the core.
pub struct NoiseHeightField {
    perlin: Perlin,
    base_height: f64,
    amplitude: f64,
    frequency: f64,
    octaves: u32,
}

impl NoiseHeightField {
    pub fn new(seed: u32) -> Self {
        Self {
            perlin: Perlin::new(seed),
            base_height: 64.0,
            amplitude: 24.0,
            frequency: 0.01,
            octaves: 4,
        }
    }
}

impl HeightField for NoiseHeightField {
    fn height_at(&self, world_x: f32, world_z: f32) -> i32 {
        let mut value = 0.0;
        let mut amplitude = self.amplitude;
        let mut frequency = self.frequency;
        for _ in 0..self.octaves {
            value += self
                .perlin
                .get([world_x as f64 * frequency, world_z as f64 * frequency])
                * amplitude;
            amplitude *= 0.5;
            frequency *= 2.0;
        }
        (self.base_height + value).round() as i32
    }
}

/// Surface block ids for the uniform dirt/stone mapping. A biome definition
/// could substitute for this; implementers may use a uniform mapping
/// instead.
pub const BLOCK_AIR: u8 = 0;
pub const BLOCK_DIRT: u8 = 1;
pub const BLOCK_STONE: u8 = 2;

/// Depth, below the column top, at which dirt gives way to stone.
const DIRT_DEPTH: i32 = 4;

/// Fills `chunk`'s voxel grid and reference-resolution heightmap from
/// `height_field`. `chunk` must be freshly allocated (`Chunk::empty`); this
/// does not merge with existing voxel data.
pub fn generate(chunk: &mut Chunk, height_field: &dyn HeightField) {
    let w = chunk.width();
    let (origin_x, origin_z) = chunk.key.world_origin_xz();

    for z in 0..w {
        for x in 0..w {
            let voxel_size = CHUNK_W as f32 / w as f32;
            let world_x = origin_x + (x as f32 + 0.5) * voxel_size;
            let world_z = origin_z + (z as f32 + 0.5) * voxel_size;
            let top = height_field.height_at(world_x, world_z);

            for y in 0..crate::constants::CHUNK_H {
                let yi = y as i32;
                let block = if yi > top {
                    BLOCK_AIR
                } else if yi > top - DIRT_DEPTH {
                    BLOCK_DIRT
                } else {
                    BLOCK_STONE
                };
                let idx = chunk.flat_index(x, y, z);
                chunk.voxels[idx] = block;
            }
        }
    }

    // Reference-resolution heightmap: always sampled at CHUNK_W x CHUNK_W,
    // independent of this chunk's own voxel-grid LOD.
    for z in 0..CHUNK_W {
        for x in 0..CHUNK_W {
            let world_x = origin_x + x as f32 + 0.5;
            let world_z = origin_z + z as f32 + 0.5;
            let top = height_field.height_at(world_x, world_z).max(0);
            chunk.heightmap[x + z * CHUNK_W] = top;
        }
    }

    chunk.is_generated = true;
    chunk.last_accessed = std::time::Instant::now();
    chunk.collider_handles.clear();
}

/// High-LOD chunk construction helper used by the store's generation workers.
pub fn generate_new(key: crate::world::ChunkKey, height_field: &dyn HeightField) -> Chunk {
    let mut chunk = Chunk::empty(key);
    generate(&mut chunk, height_field);
    chunk
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::world::{ChunkKey, Lod};

    #[test]
    fn generation_is_deterministic() {
        let hf = NoiseHeightField::new(12345);
        let key = ChunkKey::new(3, -2, Lod::High);
        let a = generate_new(key, &hf);
        let b = generate_new(key, &hf);
        assert_eq!(a.voxels, b.voxels);
        assert_eq!(a.heightmap, b.heightmap);
    }

    #[test]
    fn heightmap_consistency_invariant() {
        let hf = NoiseHeightField::new(999);
        let chunk = generate_new(ChunkKey::new(0, 0, Lod::High), &hf);
        for z in 0..CHUNK_W {
            for x in 0..CHUNK_W {
                let h = chunk.heightmap[x + z * CHUNK_W];
                if h > 0 {
                    assert_ne!(chunk.get(x, h as usize, z), 0);
                }
                for y in (h as usize + 1)..crate::constants::CHUNK_H {
                    assert_eq!(chunk.get(x, y, z), 0, "voxel above heightmap must be air");
                }
            }
        }
    }

    #[test]
    fn fill_produces_only_known_blocks() {
        let hf = NoiseHeightField::new(7);
        let chunk = generate_new(ChunkKey::new(0, 0, Lod::High), &hf);
        for &b in &chunk.voxels {
            assert!(b == BLOCK_AIR || b == BLOCK_DIRT || b == BLOCK_STONE);
        }
    }

    #[test]
    fn low_lod_chunk_still_has_reference_resolution_heightmap() {
        let hf = NoiseHeightField::new(7);
        let chunk = generate_new(ChunkKey::new(0, 0, Lod::Low), &hf);
        assert_eq!(chunk.heightmap.len(), CHUNK_W * CHUNK_W);
    }
}
