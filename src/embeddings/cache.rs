//! In-process embedding cache keyed by agent name

use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;

/// Append-only vector cache
///
/// The first vector stored under a key wins; later inserts for the same key
/// are ignored until [`EmbeddingCache::clear`].
#[derive(Debug, Default)]
pub struct EmbeddingCache {
    entries: RwLock<HashMap<String, Arc<Vec<f32>>>>,
}

impl EmbeddingCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: &str) -> Option<Arc<Vec<f32>>> {
        self.entries.read().get(key).cloned()
    }

    /// Store a vector unless the key is already present; returns the cached value
    pub fn insert(&self, key: &str, vector: Vec<f32>) -> Arc<Vec<f32>> {
        let mut entries = self.entries.write();
        Arc::clone(
            entries
                .entry(key.to_string())
                .or_insert_with(|| Arc::new(vector)),
        )
    }

    pub fn contains(&self, key: &str) -> bool {
        self.entries.read().contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }

    /// Drop every cached vector
    pub fn clear(&self) {
        self.entries.write().clear();
    }
}
