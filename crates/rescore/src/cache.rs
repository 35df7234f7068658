//! Feature vector cache
//!
//! Logged vectors are stored under `(query id, global doc id)` so a later
//! stage of the same request (e.g. a response writer) can fetch them.

use crate::logger::FeatureVector;
use lru::LruCache;
use ltrank_core::DocId;
use parking_lot::Mutex;
use std::num::NonZeroUsize;

/// Storage for logged feature vectors
pub trait FeatureVectorCache: Send + Sync {
    /// Vector logged for `doc` under `query_id`
    fn get(&self, query_id: u64, doc: DocId) -> Option<FeatureVector>;

    /// Store the vector logged for `doc` under `query_id`
    fn put(&self, query_id: u64, doc: DocId, vector: FeatureVector);
}

/// Bounded in-memory cache evicting the least recently used vector
pub struct LruFeatureVectorCache {
    entries: Mutex<LruCache<(u64, DocId), FeatureVector>>,
}

impl LruFeatureVectorCache {
    /// Cache holding at most `capacity` vectors (at least one)
    pub fn new(capacity: usize) -> Self {
        let capacity = NonZeroUsize::new(capacity.max(1)).unwrap_or(NonZeroUsize::MIN);
        LruFeatureVectorCache {
            entries: Mutex::new(LruCache::new(capacity)),
        }
    }

    /// Maximum number of vectors held
    pub fn capacity(&self) -> usize {
        self.entries.lock().cap().get()
    }

    /// Number of vectors held
    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    /// Whether the cache is empty
    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }

    /// Drop every vector
    pub fn clear(&self) {
        self.entries.lock().clear();
    }
}

impl FeatureVectorCache for LruFeatureVectorCache {
    fn get(&self, query_id: u64, doc: DocId) -> Option<FeatureVector> {
        self.entries.lock().get(&(query_id, doc)).cloned()
    }

    fn put(&self, query_id: u64, doc: DocId, vector: FeatureVector) {
        self.entries.lock().put((query_id, doc), vector);
    }
}

impl std::fmt::Debug for LruFeatureVectorCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let entries = self.entries.lock();
        f.debug_struct("LruFeatureVectorCache")
            .field("len", &entries.len())
            .field("capacity", &entries.cap())
            .finish()
    }
}
