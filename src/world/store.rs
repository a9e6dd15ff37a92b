//! Chunk store with bounded-concurrency, deduplicated, async generation.
//!
//! Generation workers run off the simulation thread with capped concurrency.
//! A worker never writes into `chunks` itself: it produces an owned [`Chunk`]
//! and hands it to the simulation thread over `ready_tx`; only
//! [`ChunkStore::drain_generated`], called once per tick from the simulation
//! loop, performs the actual insert. This keeps "chunk store writes only on
//! the simulation thread" true even though generation itself is concurrent.

use dashmap::DashMap;
use parking_lot::RwLock;
use rustc_hash::FxHashMap;
use std::sync::Arc;
use tokio::sync::{mpsc, Notify, Semaphore};

use crate::error::{ServerError, ServerResult};
use crate::world::chunk::{Chunk, ChunkKey};
use crate::world::generation::{self, HeightField};

/// Chunks are behind a synchronous [`parking_lot::RwLock`] rather than an
/// async one: collider-queue actions and the movement/mutation pipelines run
/// synchronously inside the simulation tick and must never await a lock.
pub type SharedChunk = Arc<RwLock<Chunk>>;

/// Thread-safe voxel chunk store keyed by [`ChunkKey`].
pub struct ChunkStore {
    chunks: DashMap<ChunkKey, SharedChunk>,
    in_flight: parking_lot::Mutex<FxHashMap<ChunkKey, Arc<Notify>>>,
    semaphore: Arc<Semaphore>,
    height_field: Arc<dyn HeightField>,
    ready_tx: mpsc::UnboundedSender<(ChunkKey, Chunk)>,
    ready_rx: parking_lot::Mutex<mpsc::UnboundedReceiver<(ChunkKey, Chunk)>>,
}

impl ChunkStore {
    pub fn new(height_field: Arc<dyn HeightField>, concurrency: usize) -> Arc<Self> {
        let (ready_tx, ready_rx) = mpsc::unbounded_channel();
        Arc::new(Self {
            chunks: DashMap::new(),
            in_flight: parking_lot::Mutex::new(FxHashMap::default()),
            semaphore: Arc::new(Semaphore::new(concurrency.max(1))),
            height_field,
            ready_tx,
            ready_rx: parking_lot::Mutex::new(ready_rx),
        })
    }

    /// Returns the chunk for `key` if already resident, without triggering
    /// generation. Used by hot paths (movement, mutation) that must not
    /// block on a future.
    pub fn peek(&self, key: ChunkKey) -> Option<SharedChunk> {
        self.chunks.get(&key).map(|entry| entry.value().clone())
    }

    pub fn contains(&self, key: ChunkKey) -> bool {
        self.chunks.contains_key(&key)
    }

    pub fn remove(&self, key: ChunkKey) -> Option<SharedChunk> {
        self.chunks.remove(&key).map(|(_, v)| v)
    }

    pub fn len(&self) -> usize {
        self.chunks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.chunks.is_empty()
    }

    /// All currently resident chunk keys, for GC scanning.
    pub fn keys(&self) -> Vec<ChunkKey> {
        self.chunks.iter().map(|entry| *entry.key()).collect()
    }

    /// Retrieves the chunk for `key`, generating it if absent. Duplicate
    /// concurrent requests for the same key share one in-flight generation.
    pub async fn get_or_create(self: &Arc<Self>, key: ChunkKey) -> ServerResult<SharedChunk> {
        loop {
            if let Some(chunk) = self.peek(key) {
                chunk.write().last_accessed = std::time::Instant::now();
                return Ok(chunk);
            }

            let notify = {
                let mut in_flight = self.in_flight.lock();
                if let Some(existing) = in_flight.get(&key) {
                    existing.clone()
                } else {
                    let notify = Arc::new(Notify::new());
                    in_flight.insert(key, notify.clone());
                    self.spawn_generation(key);
                    notify
                }
            };

            notify.notified().await;

            if let Some(chunk) = self.peek(key) {
                return Ok(chunk);
            }
            // Notified but still absent: generation failed. The in-flight
            // entry was already removed by the failing worker; report the
            // typed error rather than looping forever.
            if !self.in_flight.lock().contains_key(&key) {
                return Err(ServerError::ChunkGenerationFailed(format!(
                    "generation failed for chunk ({}, {}, lod {:?})",
                    key.cx, key.cz, key.lod
                )));
            }
            // Another caller's generation attempt is in flight; keep waiting.
        }
    }

    fn spawn_generation(self: &Arc<Self>, key: ChunkKey) {
        let store = self.clone();
        tokio::spawn(async move {
            let _permit = store.semaphore.acquire().await.expect("semaphore never closed");
            log::debug!("generating chunk ({}, {}, lod {:?})", key.cx, key.cz, key.lod);

            let height_field = store.height_field.clone();
            let result = tokio::task::spawn_blocking(move || {
                generation::generate_new(key, height_field.as_ref())
            })
            .await;

            match result {
                Ok(chunk) => {
                    // Hand off to the simulation thread; do not insert here.
                    let _ = store.ready_tx.send((key, chunk));
                }
                Err(join_err) => {
                    log::warn!("chunk generation panicked for {key:?}: {join_err}");
                    store.in_flight.lock().remove(&key);
                }
            }
        });
    }

    /// Test-only synchronous insert, bypassing the generation pipeline.
    #[cfg(test)]
    pub fn test_insert(&self, key: ChunkKey, chunk: Chunk) {
        self.chunks.insert(key, Arc::new(RwLock::new(chunk)));
    }

    /// Drains chunks that finished generating since the last call, inserting
    /// each into the store and waking its waiters. Must be called only from
    /// the simulation thread. Returns the newly-inserted chunks so the
    /// caller can enqueue their initial collider build.
    pub fn drain_generated(&self) -> Vec<SharedChunk> {
        let mut inserted = Vec::new();
        let mut rx = self.ready_rx.lock();
        while let Ok((key, chunk)) = rx.try_recv() {
            let shared = Arc::new(RwLock::new(chunk));
            self.chunks.insert(key, shared.clone());
            if let Some(notify) = self.in_flight.lock().remove(&key) {
                notify.notify_waiters();
            }
            inserted.push(shared);
        }
        inserted
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::world::chunk::Lod;
    use crate::world::generation::NoiseHeightField;

    #[tokio::test]
    async fn get_or_create_generates_and_caches() {
        let store = ChunkStore::new(Arc::new(NoiseHeightField::new(1)), 2);
        let key = ChunkKey::new(0, 0, Lod::High);

        let handle = {
            let store = store.clone();
            tokio::spawn(async move { store.get_or_create(key).await })
        };

        // The generation worker needs a moment to populate ready_tx; drain
        // in a loop the way the simulation thread would each tick.
        let chunk = loop {
            store.drain_generated();
            if store.contains(key) {
                break handle.await.unwrap().unwrap();
            }
            tokio::time::sleep(std::time::Duration::from_millis(5)).await;
        };
        assert_eq!(chunk.read().key, key);
        assert!(store.contains(key));
    }

    #[tokio::test]
    async fn duplicate_requests_share_one_generation() {
        let store = ChunkStore::new(Arc::new(NoiseHeightField::new(1)), 1);
        let key = ChunkKey::new(5, 5, Lod::High);

        let a = {
            let store = store.clone();
            tokio::spawn(async move { store.get_or_create(key).await })
        };
        let b = {
            let store = store.clone();
            tokio::spawn(async move { store.get_or_create(key).await })
        };

        loop {
            store.drain_generated();
            if store.contains(key) {
                break;
            }
            tokio::time::sleep(std::time::Duration::from_millis(5)).await;
        }

        assert!(a.await.unwrap().is_ok());
        assert!(b.await.unwrap().is_ok());
        assert_eq!(store.len(), 1);
    }
}
