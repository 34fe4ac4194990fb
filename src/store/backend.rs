//! Storage Backend Trait
//!
//! The capability every chunk backend provides: `get / put / delete /
//! exists / list_keys`. Key validation and bulk-scan semantics live in
//! [`ChunkStore`](super::ChunkStore) and are written once against this trait.

use std::fmt;
use std::path::PathBuf;

use bytes::Bytes;
use serde::{Deserialize, Serialize};

use super::key::ChunkKey;
use crate::error::Result;

/// Backend kind
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum BackendKind {
    /// One file per chunk under a storage root
    Disk,
    /// Volatile concurrent map
    Memory,
}

impl fmt::Display for BackendKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BackendKind::Disk => write!(f, "disk"),
            BackendKind::Memory => write!(f, "memory"),
        }
    }
}

/// A key observed during enumeration, with the payload size at that moment
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyEntry {
    /// Chunk key
    pub key: ChunkKey,
    /// Payload size in bytes
    pub size: u64,
}

/// Filesystem capacity of the storage root
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Capacity {
    /// Bytes available to unprivileged writers
    pub free_bytes: u64,
    /// Total filesystem size in bytes
    pub total_bytes: u64,
}

/// Backend description reported in stats and at startup
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BackendInfo {
    /// Backend kind
    pub kind: BackendKind,
    /// Resolved storage root (disk only)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path: Option<PathBuf>,
    /// Capacity, when the backend exposes it
    #[serde(skip_serializing_if = "Option::is_none")]
    pub capacity: Option<Capacity>,
    /// Whether new chunks can currently be written
    pub writable: bool,
}

/// Chunk storage backend
///
/// Every method is blocking and must be individually atomic per key.
/// Implementations must not serialize unrelated keys behind one lock.
pub trait ChunkBackend: Send + Sync {
    /// Get a chunk payload, `None` if absent
    fn get(&self, key: &ChunkKey) -> Result<Option<Bytes>>;

    /// Store a payload, replacing any previous one wholesale
    fn put(&self, key: &ChunkKey, data: Bytes) -> Result<()>;

    /// Remove a chunk, returning whether it was present
    fn delete(&self, key: &ChunkKey) -> Result<bool>;

    /// Check if a chunk exists
    fn exists(&self, key: &ChunkKey) -> Result<bool>;

    /// Snapshot of the current key set with sizes
    fn list_keys(&self) -> Result<Vec<KeyEntry>>;

    /// Whether the backing medium exists at all
    fn is_provisioned(&self) -> bool {
        true
    }

    /// Describe the backend
    fn info(&self) -> BackendInfo;
}
