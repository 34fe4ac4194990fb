//! Disk Backend
//!
//! One file per chunk directly under the storage root, named by
//! [`ChunkKey::file_name`].
//!
//! # Design
//!
//! - Writes go to a hidden temp file and are renamed over the target, so
//!   readers see either the old or the new payload, never a truncated file
//! - Enumeration lists the directory and decodes file names; anything that
//!   does not decode (temp files, foreign files) is ignored
//! - Stale temp files from interrupted writes are swept at open

use std::fs::{self, OpenOptions};
use std::io::{self, Write};
use std::path::{Component, Path, PathBuf};

use bytes::Bytes;
use tracing::{debug, info, warn};
use uuid::Uuid;

use super::backend::{BackendInfo, BackendKind, Capacity, ChunkBackend, KeyEntry};
use super::key::ChunkKey;
use crate::error::{Error, Result};

const TEMP_PREFIX: &str = ".chunk-";
const TEMP_SUFFIX: &str = ".tmp";

/// Disk-backed chunk storage
#[derive(Debug, Clone)]
pub struct DiskBackend {
    /// Absolute, normalized storage root
    root: PathBuf,
    /// fsync temp files before rename
    sync_writes: bool,
}

impl DiskBackend {
    /// Open a storage root, creating it if missing.
    ///
    /// Fails with [`Error::StorageInit`] if the directory cannot be created
    /// or is not writable.
    pub fn open(path: impl AsRef<Path>, sync_writes: bool) -> Result<Self> {
        let root = normalize_path(path.as_ref()).map_err(|e| Error::StorageInit {
            path: path.as_ref().to_path_buf(),
            reason: format!("cannot resolve path: {}", e),
        })?;

        if root.exists() {
            if !root.is_dir() {
                return Err(Error::StorageInit {
                    path: root,
                    reason: "not a directory".to_string(),
                });
            }
            debug!("Using existing storage directory {}", root.display());
        } else {
            fs::create_dir_all(&root).map_err(|e| Error::StorageInit {
                path: root.clone(),
                reason: format!("cannot create directory: {}", e),
            })?;
            info!("Created storage directory {}", root.display());
        }

        probe_writable(&root).map_err(|e| Error::StorageInit {
            path: root.clone(),
            reason: format!("directory is not writable: {}", e),
        })?;

        let backend = Self { root, sync_writes };
        let swept = backend.sweep_temp_files();
        if swept > 0 {
            info!("Removed {} stale temp files", swept);
        }

        Ok(backend)
    }

    /// Get the resolved storage root
    pub fn root(&self) -> &Path {
        &self.root
    }

    fn chunk_path(&self, key: &ChunkKey) -> PathBuf {
        self.root.join(key.file_name())
    }

    /// Fixed-length temp name, independent of the key length
    fn temp_path(&self) -> PathBuf {
        self.root.join(format!(
            "{}{}{}",
            TEMP_PREFIX,
            Uuid::new_v4().simple(),
            TEMP_SUFFIX
        ))
    }

    /// Atomic write: write to temp file then rename
    fn atomic_write(&self, key: &ChunkKey, data: &[u8]) -> io::Result<()> {
        let tmp = self.temp_path();
        let written = self
            .write_temp(&tmp, data)
            .and_then(|()| fs::rename(&tmp, self.chunk_path(key)));

        if written.is_err() {
            let _ = fs::remove_file(&tmp);
        }
        written
    }

    fn write_temp(&self, tmp: &Path, data: &[u8]) -> io::Result<()> {
        let mut f = OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(tmp)?;
        f.write_all(data)?;
        if self.sync_writes {
            f.sync_all()?;
        }
        Ok(())
    }

    /// Remove temp files left behind by interrupted writes
    fn sweep_temp_files(&self) -> usize {
        let Ok(entries) = fs::read_dir(&self.root) else {
            return 0;
        };

        let mut removed = 0;
        for entry in entries.flatten() {
            let name = entry.file_name();
            let Some(name) = name.to_str() else {
                continue;
            };
            if is_temp_file_name(name) {
                match fs::remove_file(entry.path()) {
                    Ok(()) => removed += 1,
                    Err(e) => warn!("Failed to remove stale temp file {}: {}", name, e),
                }
            }
        }
        removed
    }

    /// Storage root vanished after open
    fn root_missing(&self, operation: &'static str, key: &ChunkKey) -> Error {
        Error::StorageRead {
            operation,
            key: key.to_string(),
            source: io::Error::new(io::ErrorKind::NotFound, "storage root is missing"),
        }
    }

    #[cfg(unix)]
    fn capacity(&self) -> Option<Capacity> {
        let stat = nix::sys::statvfs::statvfs(self.root.as_path()).ok()?;
        let fragment = stat.fragment_size() as u64;
        Some(Capacity {
            free_bytes: stat.blocks_available() as u64 * fragment,
            total_bytes: stat.blocks() as u64 * fragment,
        })
    }

    #[cfg(not(unix))]
    fn capacity(&self) -> Option<Capacity> {
        None
    }
}

impl ChunkBackend for DiskBackend {
    fn get(&self, key: &ChunkKey) -> Result<Option<Bytes>> {
        match fs::read(self.chunk_path(key)) {
            Ok(data) => Ok(Some(Bytes::from(data))),
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                if self.is_provisioned() {
                    Ok(None)
                } else {
                    Err(self.root_missing("read", key))
                }
            }
            Err(source) => Err(Error::StorageRead {
                operation: "read",
                key: key.to_string(),
                source,
            }),
        }
    }

    fn put(&self, key: &ChunkKey, data: Bytes) -> Result<()> {
        self.atomic_write(key, &data)
            .map_err(|source| Error::StorageWrite {
                operation: "write",
                key: key.to_string(),
                source,
            })
    }

    fn delete(&self, key: &ChunkKey) -> Result<bool> {
        match fs::remove_file(self.chunk_path(key)) {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(false),
            Err(source) => Err(Error::StorageWrite {
                operation: "delete",
                key: key.to_string(),
                source,
            }),
        }
    }

    fn exists(&self, key: &ChunkKey) -> Result<bool> {
        match fs::metadata(self.chunk_path(key)) {
            Ok(meta) => Ok(meta.is_file()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                if self.is_provisioned() {
                    Ok(false)
                } else {
                    Err(self.root_missing("exists", key))
                }
            }
            Err(source) => Err(Error::StorageRead {
                operation: "exists",
                key: key.to_string(),
                source,
            }),
        }
    }

    fn list_keys(&self) -> Result<Vec<KeyEntry>> {
        let entries =
            fs::read_dir(&self.root).map_err(|source| Error::StorageEnumeration { source })?;

        let mut keys = Vec::new();
        for entry in entries {
            let entry = match entry {
                Ok(entry) => entry,
                Err(e) => {
                    debug!("Skipping unreadable directory entry: {}", e);
                    continue;
                }
            };
            let name = entry.file_name();
            let Some(key) = name.to_str().and_then(ChunkKey::from_file_name) else {
                continue;
            };
            // Removed between listing and stat: no longer part of the snapshot
            let Ok(meta) = entry.metadata() else {
                continue;
            };
            if meta.is_file() {
                keys.push(KeyEntry {
                    key,
                    size: meta.len(),
                });
            }
        }
        Ok(keys)
    }

    fn is_provisioned(&self) -> bool {
        self.root.is_dir()
    }

    fn info(&self) -> BackendInfo {
        let writable = fs::metadata(&self.root)
            .map(|m| m.is_dir() && !m.permissions().readonly())
            .unwrap_or(false);

        BackendInfo {
            kind: BackendKind::Disk,
            path: Some(self.root.clone()),
            capacity: self.capacity(),
            writable,
        }
    }
}

/// Resolve to an absolute path and fold `.`/`..` lexically
fn normalize_path(path: &Path) -> io::Result<PathBuf> {
    if path.as_os_str().is_empty() {
        return Err(io::Error::new(
            io::ErrorKind::InvalidInput,
            "storage path is empty",
        ));
    }
    let absolute = if path.is_absolute() {
        path.to_path_buf()
    } else {
        std::env::current_dir()?.join(path)
    };

    let mut normalized = PathBuf::new();
    for component in absolute.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                normalized.pop();
            }
            other => normalized.push(other.as_os_str()),
        }
    }
    Ok(normalized)
}

/// Create and remove a probe file
fn probe_writable(root: &Path) -> io::Result<()> {
    let probe = root.join(format!(".probe-{}", Uuid::new_v4().simple()));
    OpenOptions::new()
        .write(true)
        .create_new(true)
        .open(&probe)?;
    fs::remove_file(&probe)
}

fn is_temp_file_name(name: &str) -> bool {
    name.starts_with(TEMP_PREFIX) && name.ends_with(TEMP_SUFFIX)
}

// =============================================================================
// Tests
// =============================================================================
