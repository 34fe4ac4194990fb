//! Chunk Store
//!
//! Backend-agnostic chunk operations: key validation, single-chunk CRUD,
//! and the snapshot-and-filter bulk scans behind `delete_all` and `stats`.

use std::sync::Arc;
use std::time::Instant;

use bytes::Bytes;
use serde::{Deserialize, Serialize};
use tracing::{debug, error, info, warn};

use super::backend::{BackendInfo, ChunkBackend};
use super::disk::DiskBackend;
use super::key::{validate_object_id, ChunkKey};
use super::memory::MemoryBackend;
use super::BackendKind;
use crate::codec;
use crate::config::StoreConfig;
use crate::error::{Error, Result};
use crate::monitoring::{HealthCheckResult, Operation, Outcome, StoreMetrics};

const MIB: f64 = 1024.0 * 1024.0;

/// Outcome of the enumeration behind [`ChunkStore::stats`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StoreStatus {
    /// Backend enumerated normally
    Ok,
    /// Storage root does not exist; counts are zero
    DirectoryNotFound,
}

/// Aggregate usage snapshot
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoreStats {
    /// Node identifier
    pub node_id: String,
    /// Number of chunks
    pub total_chunks: u64,
    /// Sum of payload sizes in bytes
    pub total_bytes: u64,
    /// `total_bytes` in MiB
    pub storage_used_mb: f64,
    /// Backend description and capacity
    pub backend: BackendInfo,
    /// Enumeration status
    pub status: StoreStatus,
}

/// Chunk store over a pluggable backend
pub struct ChunkStore {
    /// Storage backend
    backend: Arc<dyn ChunkBackend>,
    /// Node identifier (diagnostics only)
    node_id: String,
    /// Operation metrics
    metrics: Arc<StoreMetrics>,
}

impl ChunkStore {
    /// Initialize the store from configuration.
    ///
    /// Fails with [`Error::StorageInit`] if a disk root cannot be created or
    /// written; the store never comes up half-initialized.
    pub fn open(config: &StoreConfig) -> Result<Self> {
        config.validate()?;

        let backend: Arc<dyn ChunkBackend> = match config.backend {
            BackendKind::Disk => Arc::new(DiskBackend::open(
                &config.storage_path,
                config.sync_writes,
            )?),
            BackendKind::Memory => Arc::new(MemoryBackend::new()),
        };

        let store = Self::with_backend(backend, config.node_id.clone())?;
        store.log_startup_summary();
        Ok(store)
    }

    /// Create a store over an existing backend
    pub fn with_backend(
        backend: Arc<dyn ChunkBackend>,
        node_id: impl Into<String>,
    ) -> Result<Self> {
        Ok(Self {
            backend,
            node_id: node_id.into(),
            metrics: Arc::new(StoreMetrics::new()?),
        })
    }

    /// Create a volatile store (tests, ephemeral nodes)
    pub fn in_memory(node_id: impl Into<String>) -> Result<Self> {
        Self::with_backend(Arc::new(MemoryBackend::new()), node_id)
    }

    /// Get the node identifier
    pub fn node_id(&self) -> &str {
        &self.node_id
    }

    /// Get the operation metrics
    pub fn metrics(&self) -> &Arc<StoreMetrics> {
        &self.metrics
    }

    /// Describe the backend
    pub fn backend_info(&self) -> BackendInfo {
        self.backend.info()
    }

    // =========================================================================
    // Single-chunk operations
    // =========================================================================

    /// Store `payload` under `(object_id, chunk_index)`, replacing any
    /// previous payload
    pub fn write(
        &self,
        object_id: &str,
        chunk_index: u32,
        payload: impl Into<Bytes>,
    ) -> Result<()> {
        let payload = payload.into();
        self.instrumented(Operation::Write, || {
            let key = ChunkKey::new(object_id, chunk_index)?;
            self.put(&key, payload)
        })
    }

    /// Store a base64-encoded payload.
    ///
    /// The key is validated and the payload decoded before the backend is
    /// touched, so a malformed payload leaves the store unchanged.
    pub fn write_encoded(&self, object_id: &str, chunk_index: u32, encoded: &str) -> Result<()> {
        self.instrumented(Operation::Write, || {
            let key = ChunkKey::new(object_id, chunk_index)?;
            let payload = codec::decode_payload(&key, encoded)?;
            self.put(&key, payload)
        })
    }

    fn put(&self, key: &ChunkKey, payload: Bytes) -> Result<()> {
        let size = payload.len() as u64;
        self.backend.put(key, payload)?;
        self.metrics.add_bytes_written(size);
        info!("Stored chunk {} ({} bytes)", key, size);
        Ok(())
    }

    /// Read a chunk payload verbatim
    pub fn read(&self, object_id: &str, chunk_index: u32) -> Result<Bytes> {
        self.instrumented(Operation::Read, || {
            let key = ChunkKey::new(object_id, chunk_index)?;
            match self.backend.get(&key)? {
                Some(data) => {
                    self.metrics.add_bytes_read(data.len() as u64);
                    debug!("Read chunk {} ({} bytes)", key, data.len());
                    Ok(data)
                }
                None => Err(Error::ChunkNotFound {
                    key: key.to_string(),
                }),
            }
        })
    }

    /// Remove a chunk.
    ///
    /// Absent keys are a successful no-op; the returned flag only tells
    /// whether something was removed.
    pub fn delete(&self, object_id: &str, chunk_index: u32) -> Result<bool> {
        self.instrumented(Operation::Delete, || {
            let key = ChunkKey::new(object_id, chunk_index)?;
            let removed = self.backend.delete(&key)?;
            if removed {
                info!("Deleted chunk {}", key);
            } else {
                debug!("Chunk {} not present, nothing to delete", key);
            }
            Ok(removed)
        })
    }

    /// Check whether a chunk exists
    pub fn exists(&self, object_id: &str, chunk_index: u32) -> Result<bool> {
        self.instrumented(Operation::Exists, || {
            let key = ChunkKey::new(object_id, chunk_index)?;
            self.backend.exists(&key)
        })
    }

    // =========================================================================
    // Bulk operations
    // =========================================================================

    /// Remove every chunk owned by `object_id`, returning how many were
    /// removed.
    ///
    /// Takes a snapshot of the key set, filters by owner and removes each
    /// match. Individual failures are logged and skipped.
    pub fn delete_all(&self, object_id: &str) -> Result<usize> {
        self.instrumented(Operation::DeleteAll, || {
            validate_object_id(object_id)?;

            let snapshot = self.backend.list_keys()?;
            let mut removed = 0;
            let mut failed = 0;

            for entry in snapshot.iter().filter(|e| e.key.belongs_to(object_id)) {
                match self.backend.delete(&entry.key) {
                    Ok(true) => removed += 1,
                    Ok(false) => debug!("Chunk {} vanished before removal", entry.key),
                    Err(e) => {
                        failed += 1;
                        warn!("Failed to remove chunk {}: {}", entry.key, e);
                    }
                }
            }

            self.metrics.add_bulk_deleted(removed as u64);
            if failed > 0 {
                warn!(
                    "Deleted {} chunks for object {} ({} could not be removed)",
                    removed, object_id, failed
                );
            } else {
                info!("Deleted {} chunks for object {}", removed, object_id);
            }
            Ok(removed)
        })
    }

    /// Aggregate usage snapshot.
    ///
    /// Count and byte total come from the same enumeration pass. A missing
    /// storage root yields zero counts instead of an error.
    pub fn stats(&self) -> Result<StoreStats> {
        self.instrumented(Operation::Stats, || {
            let listed = self.backend.list_keys();
            let (total_chunks, total_bytes, status): (u64, u64, StoreStatus) = match listed {
                Ok(entries) => (
                    entries.len() as u64,
                    entries.iter().map(|e| e.size).sum(),
                    StoreStatus::Ok,
                ),
                Err(Error::StorageEnumeration { source })
                    if source.kind() == std::io::ErrorKind::NotFound =>
                {
                    (0, 0, StoreStatus::DirectoryNotFound)
                }
                Err(e) => return Err(e),
            };

            Ok(StoreStats {
                node_id: self.node_id.clone(),
                total_chunks,
                total_bytes,
                storage_used_mb: total_bytes as f64 / MIB,
                backend: self.backend.info(),
                status,
            })
        })
    }

    /// Storage health probe
    pub fn health_check(&self) -> HealthCheckResult {
        HealthCheckResult::storage(self.backend.is_provisioned(), &self.backend.info())
    }

    // =========================================================================
    // Internals
    // =========================================================================

    fn instrumented<T>(&self, operation: Operation, f: impl FnOnce() -> Result<T>) -> Result<T> {
        let start = Instant::now();
        let result = f();
        let outcome = Outcome::of(&result);
        self.metrics.observe(operation, outcome, start.elapsed());

        if let Err(e) = &result {
            match outcome {
                Outcome::NotFound => debug!("{}: {}", operation, e),
                Outcome::Invalid => debug!("{} rejected: {}", operation, e),
                _ => error!("{} failed: {}", operation, e),
            }
        }
        result
    }

    fn log_startup_summary(&self) {
        let info = self.backend.info();

        info!("Chunk store initialized");
        info!("  Node ID: {}", self.node_id);
        info!("  Backend: {}", info.kind);
        if let Some(path) = &info.path {
            info!("  Storage path: {}", path.display());
        }
        if let Some(capacity) = &info.capacity {
            info!(
                "  Free space: {} MB / {} MB",
                capacity.free_bytes / (1024 * 1024),
                capacity.total_bytes / (1024 * 1024)
            );
        }
        if info.writable {
            info!("  Writable: true");
        } else {
            warn!("  Writable: false");
        }
    }
}

// =============================================================================
// Tests
// =============================================================================
