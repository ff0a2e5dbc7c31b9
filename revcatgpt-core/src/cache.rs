//! Process-wide query embedding cache.
//!
//! A bounded least-recently-used map from [`QueryKey`] to [`Embedding`],
//! constructed once at startup and shared by `Arc` across request handlers.
//! A single mutex guards the LRU list, so a lookup-and-refresh or an
//! insert-and-evict is atomic with respect to every other access. The lock is
//! never held across an `.await`.

use lru::LruCache;
use std::num::NonZeroUsize;
use std::sync::{Mutex, MutexGuard};

use crate::types::{Embedding, QueryKey};

/// Default number of cached query embeddings.
pub const DEFAULT_CACHE_CAPACITY: usize = 100;

/// Bounded LRU cache of query embeddings.
pub struct EmbeddingCache {
    entries: Mutex<LruCache<QueryKey, Embedding>>,
    capacity: NonZeroUsize,
}

impl std::fmt::Debug for EmbeddingCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EmbeddingCache")
            .field("capacity", &self.capacity)
            .field("len", &self.len())
            .finish()
    }
}

impl EmbeddingCache {
    /// Create a cache holding at most `capacity` entries (0 is treated as 1).
    pub fn new(capacity: usize) -> Self {
        let capacity = NonZeroUsize::new(capacity).unwrap_or(NonZeroUsize::MIN);
        Self {
            entries: Mutex::new(LruCache::new(capacity)),
            capacity,
        }
    }

    /// Look up an embedding, marking it most recently used on a hit.
    pub fn get(&self, key: &QueryKey) -> Option<Embedding> {
        self.lock().get(key).cloned()
    }

    /// Insert or replace an embedding, evicting the least recently used entry
    /// when the cache is full.
    pub fn put(&self, key: QueryKey, embedding: Embedding) {
        if let Some((evicted, _)) = self.lock().push(key, embedding)
            && evicted != key
        {
            tracing::trace!("evicted least recently used query embedding");
        }
    }

    /// Whether the key is cached, without touching its recency.
    pub fn contains(&self, key: &QueryKey) -> bool {
        self.lock().contains(key)
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity.get()
    }

    // A panic while holding the lock cannot leave the LRU list half-updated
    // from our side, so a poisoned lock is still usable.
    fn lock(&self) -> MutexGuard<'_, LruCache<QueryKey, Embedding>> {
        self.entries
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl Default for EmbeddingCache {
    fn default() -> Self {
        Self::new(DEFAULT_CACHE_CAPACITY)
    }
}
