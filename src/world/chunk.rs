//! The [`Chunk`] data model and its [`ChunkKey`].

use rapier3d::prelude::ColliderHandle;
use std::time::Instant;

use crate::constants::{CHUNK_H, CHUNK_W, CHUNK_W_LOW};

/// Level of detail. Distinct LODs of the same horizontal tile are distinct
/// chunks. `Low` is an optional resolution tier; this crate implements it
/// but never mixes LODs when answering a single client's requests for the
/// same tile.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Lod {
    High,
    Low,
}

impl Lod {
    pub fn from_wire(value: u8) -> Option<Self> {
        match value {
            0 => Some(Lod::High),
            1 => Some(Lod::Low),
            _ => None,
        }
    }

    pub fn to_wire(self) -> u8 {
        match self {
            Lod::High => 0,
            Lod::Low => 1,
        }
    }

    /// Horizontal voxel-grid width/depth at this LOD.
    pub fn width(self) -> usize {
        match self {
            Lod::High => CHUNK_W,
            Lod::Low => CHUNK_W_LOW,
        }
    }
}

/// Uniquely identifies a chunk: horizontal tile index plus LOD.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ChunkKey {
    pub cx: i32,
    pub cz: i32,
    pub lod: Lod,
}

impl ChunkKey {
    pub fn new(cx: i32, cz: i32, lod: Lod) -> Self {
        Self { cx, cz, lod }
    }

    /// World-space XZ origin (minimum corner) of this chunk's horizontal tile.
    /// LOD does not change the tile's world footprint, only its voxel density.
    pub fn world_origin_xz(&self) -> (f32, f32) {
        (
            (self.cx * CHUNK_W as i32) as f32,
            (self.cz * CHUNK_W as i32) as f32,
        )
    }
}

/// A W×H×D voxel tile. Always holds a W×D heightmap at the *reference*
/// (HIGH) resolution regardless of its own LOD's voxel grid resolution.
pub struct Chunk {
    pub key: ChunkKey,
    /// Dense voxel array indexed by `y*W*D + z*W + x`, `W`/`D` = `key.lod.width()`.
    pub voxels: Vec<u8>,
    /// Per-column top-y, always `CHUNK_W * CHUNK_W` entries long.
    pub heightmap: Vec<i32>,
    pub collider_handles: Vec<ColliderHandle>,
    pub last_modified: Instant,
    pub last_accessed: Instant,
    pub is_generated: bool,
}

impl Chunk {
    pub fn empty(key: ChunkKey) -> Self {
        let w = key.lod.width();
        let now = Instant::now();
        Self {
            key,
            voxels: vec![0u8; w * w * CHUNK_H],
            heightmap: vec![0; CHUNK_W * CHUNK_W],
            collider_handles: Vec::new(),
            last_modified: now,
            last_accessed: now,
            is_generated: false,
        }
    }

    pub fn width(&self) -> usize {
        self.key.lod.width()
    }

    /// World-space meters spanned by one voxel-grid cell along X/Z. 1.0 at
    /// HIGH LOD; > 1.0 at any coarser LOD, since every LOD covers the same
    /// `CHUNK_W`-meter tile footprint with fewer cells. The vertical axis is
    /// never LOD-scaled (`CHUNK_H` is constant), so this applies to X/Z only.
    pub fn horizontal_voxel_size(&self) -> f32 {
        CHUNK_W as f32 / self.width() as f32
    }

    #[inline]
    pub fn flat_index(&self, x: usize, y: usize, z: usize) -> usize {
        let w = self.width();
        y * w * w + z * w + x
    }

    pub fn get(&self, x: usize, y: usize, z: usize) -> u8 {
        self.voxels[self.flat_index(x, y, z)]
    }

    pub fn set(&mut self, x: usize, y: usize, z: usize, block_id: u8) {
        let idx = self.flat_index(x, y, z);
        self.voxels[idx] = block_id;
        self.last_modified = Instant::now();
    }

    /// Recomputes `heightmap[x + z*CHUNK_W]` for one reference-resolution
    /// column by scanning the voxel grid at this chunk's own LOD and mapping
    /// the column index back to reference resolution.
    ///
    /// Only meaningful to call at HIGH LOD, since only HIGH chunks scan a
    /// full-resolution voxel column; LOW chunks recompute their heightmap
    /// wholly during generation (see `generation.rs`).
    pub fn recompute_heightmap_column(&mut self, x: usize, z: usize) {
        debug_assert_eq!(self.width(), CHUNK_W, "heightmap recompute only valid at HIGH LOD");
        let mut top = -1i32;
        for y in (0..CHUNK_H).rev() {
            if self.get(x, y, z) != 0 {
                top = y as i32;
                break;
            }
        }
        self.heightmap[x + z * CHUNK_W] = top.max(0);
    }

    /// Center of the chunk tile in world XZ, used by proximity GC.
    pub fn center_xz(&self) -> (f32, f32) {
        let (ox, oz) = self.key.world_origin_xz();
        let half = CHUNK_W as f32 / 2.0;
        (ox + half, oz + half)
    }
}
