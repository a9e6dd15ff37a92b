//! Block mutation: validation, voxel write, RLE diff, collider rebuild.

use std::sync::Arc;

use crate::constants::{CHUNK_W, WORLD_XZ, WORLD_Y};
use crate::error::{ServerError, ServerResult};
use crate::world::chunk::{ChunkKey, Lod};
use crate::world::collider::ColliderQueues;
use crate::world::store::ChunkStore;
use crate::wire::rle;

/// Result of a successful mutation: the chunk tile to broadcast to, and the
/// RLE-encoded diff bytes. `None` means the mutation was an idempotent no-op.
pub struct MutationOutcome {
    pub chunk_x: i32,
    pub chunk_z: i32,
    pub rle_bytes: Vec<u8>,
}

/// Validates and applies a mine (`is_mine = true`, always clears to air) or
/// place (`is_mine = false`, writes `block_id`) at world voxel coordinates
/// `(wx, wy, wz)`. Mine/place is the caller's explicit intent rather than
/// something inferred from `block_id`, so a malformed `placeBlock{blockId:0}`
/// is rejected as `InvalidBlockID` instead of silently mining.
pub async fn mutate(
    store: &Arc<ChunkStore>,
    queues: &mut ColliderQueues,
    wx: i32,
    wy: i32,
    wz: i32,
    is_mine: bool,
    block_id: u8,
) -> ServerResult<Option<MutationOutcome>> {
    if wx < -WORLD_XZ || wx >= WORLD_XZ || wz < -WORLD_XZ || wz >= WORLD_XZ {
        return Err(ServerError::OutOfBounds);
    }
    if wy < 0 || wy >= WORLD_Y {
        return Err(ServerError::OutOfBounds);
    }
    if !is_mine && block_id == 0 {
        return Err(ServerError::InvalidBlockID(block_id));
    }
    let target = if is_mine { 0 } else { block_id };

    let cx = wx.div_euclid(CHUNK_W as i32);
    let cz = wz.div_euclid(CHUNK_W as i32);
    let local_x = wx.rem_euclid(CHUNK_W as i32) as usize;
    let local_z = wz.rem_euclid(CHUNK_W as i32) as usize;
    let local_y = wy as usize;

    let key = ChunkKey::new(cx, cz, Lod::High);
    let chunk = store.get_or_create(key).await?;

    let (existing, flat_index) = {
        let guard = chunk.read();
        (guard.get(local_x, local_y, local_z), guard.flat_index(local_x, local_y, local_z))
    };

    // Place preconditions; mine has no extra checks beyond bounds.
    if !is_mine && existing != 0 {
        return Err(ServerError::BlockOccupied);
    }

    if existing == target {
        return Ok(None);
    }

    {
        let mut guard = chunk.write();
        guard.set(local_x, local_y, local_z, target);
        guard.recompute_heightmap_column(local_x, local_z);
    }

    let rle_bytes = rle::encode_single(flat_index as u32, target);

    // A mutated chunk's whole collider set is retired and re-queued, never
    // partially rebuilt.
    queues.retire(&chunk);
    queues.enqueue_build(&chunk);

    Ok(Some(MutationOutcome { chunk_x: cx, chunk_z: cz, rle_bytes }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::world::generation::NoiseHeightField;

    fn store() -> Arc<ChunkStore> {
        ChunkStore::new(Arc::new(NoiseHeightField::new(1)), 2)
    }

    async fn warm(store: &Arc<ChunkStore>, key: ChunkKey) {
        loop {
            store.drain_generated();
            if store.contains(key) {
                break;
            }
            let s = store.clone();
            tokio::spawn(async move {
                let _ = s.get_or_create(key).await;
            });
            tokio::time::sleep(std::time::Duration::from_millis(5)).await;
        }
    }

    #[tokio::test]
    async fn mine_clears_voxel_and_broadcasts_diff() {
        let store = store();
        let key = ChunkKey::new(0, 0, Lod::High);
        warm(&store, key).await;
        let mut queues = ColliderQueues::new();

        // Find a solid column first.
        let chunk = store.peek(key).unwrap();
        let h = chunk.read().heightmap[0];
        assert!(h > 0, "need a solid column for this test");

        let outcome = mutate(&store, &mut queues, 0, h, 0, true, 0).await.unwrap();
        let outcome = outcome.expect("mining a solid voxel must not be a no-op");
        let changes = rle::decode(&outcome.rle_bytes).unwrap();
        assert_eq!(changes.len(), 1);
        assert_eq!(changes[0].block_id, 0);
        assert_eq!(chunk.read().get(0, h as usize, 0), 0);
    }

    #[tokio::test]
    async fn mining_air_is_idempotent_no_op() {
        let store = store();
        let key = ChunkKey::new(0, 0, Lod::High);
        warm(&store, key).await;
        let mut queues = ColliderQueues::new();

        let outcome = mutate(&store, &mut queues, 0, 127, 0, true, 0).await.unwrap();
        assert!(outcome.is_none(), "mining an already-air voxel must be a no-op");
    }

    #[tokio::test]
    async fn place_on_occupied_cell_is_rejected() {
        let store = store();
        let key = ChunkKey::new(0, 0, Lod::High);
        warm(&store, key).await;
        let mut queues = ColliderQueues::new();

        let chunk = store.peek(key).unwrap();
        let h = chunk.read().heightmap[0];
        let err = mutate(&store, &mut queues, 0, h, 0, false, 5).await.unwrap_err();
        assert_eq!(err.code(), "BlockOccupied");
    }

    #[tokio::test]
    async fn place_with_zero_block_id_is_rejected() {
        let store = store();
        let key = ChunkKey::new(0, 0, Lod::High);
        warm(&store, key).await;
        let mut queues = ColliderQueues::new();

        let err = mutate(&store, &mut queues, 0, 127, 0, false, 0).await.unwrap_err();
        assert_eq!(err.code(), "InvalidBlockID");
    }

    #[tokio::test]
    async fn out_of_bounds_coordinates_rejected() {
        let store = store();
        let mut queues = ColliderQueues::new();
        let err = mutate(&store, &mut queues, 0, 9999, 0, true, 1).await.unwrap_err();
        assert_eq!(err.code(), "OutOfBounds");
    }
}
