//! In-Memory Backend
//!
//! Volatile chunk storage for tests and ephemeral nodes.
//! Uses DashMap for sharded concurrent access instead of a single RwLock.

use bytes::Bytes;
use dashmap::DashMap;

use super::backend::{BackendInfo, BackendKind, ChunkBackend, KeyEntry};
use super::key::ChunkKey;
use crate::error::Result;

/// In-memory chunk backend
#[derive(Default)]
pub struct MemoryBackend {
    /// Storage (key -> payload)
    chunks: DashMap<ChunkKey, Bytes>,
}

impl MemoryBackend {
    /// Create a new in-memory backend
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored chunks
    pub fn len(&self) -> usize {
        self.chunks.len()
    }

    /// Check if the backend holds no chunks
    pub fn is_empty(&self) -> bool {
        self.chunks.is_empty()
    }
}

impl ChunkBackend for MemoryBackend {
    fn get(&self, key: &ChunkKey) -> Result<Option<Bytes>> {
        // Bytes clone is a refcount bump; the payload is never shared mutably
        Ok(self.chunks.get(key).map(|data| data.value().clone()))
    }

    fn put(&self, key: &ChunkKey, data: Bytes) -> Result<()> {
        self.chunks.insert(key.clone(), data);
        Ok(())
    }

    fn delete(&self, key: &ChunkKey) -> Result<bool> {
        Ok(self.chunks.remove(key).is_some())
    }

    fn exists(&self, key: &ChunkKey) -> Result<bool> {
        Ok(self.chunks.contains_key(key))
    }

    fn list_keys(&self) -> Result<Vec<KeyEntry>> {
        // Shards are locked one at a time; concurrent writers on other
        // shards may or may not be observed.
        Ok(self
            .chunks
            .iter()
            .map(|entry| KeyEntry {
                key: entry.key().clone(),
                size: entry.value().len() as u64,
            })
            .collect())
    }

    fn info(&self) -> BackendInfo {
        BackendInfo {
            kind: BackendKind::Memory,
            path: None,
            capacity: None,
            writable: true,
        }
    }
}

// =============================================================================
// Tests
// =============================================================================
