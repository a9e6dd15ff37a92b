//! Proximity garbage collection.
//!
//! Runs once every [`crate::constants::GC_INTERVAL_TICKS`] ticks from the
//! simulation loop. A chunk is eligible for deletion if there are no active
//! players, or every active player's XZ distance from the chunk's tile
//! center is at least `gc_radius`. Deletion is deferred one cycle if the
//! chunk still has creation actions in flight, so a just-requested chunk is
//! never yanked out from under its own collider build.

use crate::world::collider::ColliderQueues;
use crate::world::store::ChunkStore;

/// Runs one GC pass. `player_positions` is every active player's world XZ.
/// Returns the number of chunks removed.
pub fn run(store: &ChunkStore, queues: &mut ColliderQueues, player_positions: &[(f32, f32)], gc_radius: f32) -> usize {
    let mut removed = 0;
    for key in store.keys() {
        let Some(chunk) = store.peek(key) else { continue };

        if queues.has_pending_creates(key) {
            continue;
        }

        let (cx, cz) = chunk.read().center_xz();
        let in_range = player_positions.is_empty()
            || player_positions
                .iter()
                .all(|&(px, pz)| distance(cx, cz, px, pz) >= gc_radius);

        if !in_range {
            continue;
        }

        queues.retire(&chunk);
        store.remove(key);
        removed += 1;
        log::debug!("gc: evicted chunk ({}, {}, lod {:?})", key.cx, key.cz, key.lod);
    }
    removed
}

fn distance(ax: f32, az: f32, bx: f32, bz: f32) -> f32 {
    ((ax - bx).powi(2) + (az - bz).powi(2)).sqrt()
}
