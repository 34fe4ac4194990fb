//! Startup Configuration
//!
//! Plain structs built once by the binary from CLI flags / environment and
//! handed to [`ChunkStore::open`](crate::store::ChunkStore::open) and the
//! HTTP server. Nothing below `main` reads the process environment.

use std::net::SocketAddr;
use std::path::PathBuf;

use crate::error::{Error, Result};
use crate::store::BackendKind;

/// Default storage root, relative to the working directory
pub const DEFAULT_STORAGE_PATH: &str = "./storage";

/// Default node identifier
pub const DEFAULT_NODE_ID: &str = "chunkserver-1";

/// Default HTTP listen address
pub const DEFAULT_LISTEN_ADDR: &str = "0.0.0.0:9001";

/// Default request body limit (64MB)
pub const DEFAULT_MAX_BODY_BYTES: usize = 64 * 1024 * 1024;

/// Chunk store configuration
#[derive(Debug, Clone)]
pub struct StoreConfig {
    /// Backend kind
    pub backend: BackendKind,
    /// Storage root (disk backend only)
    pub storage_path: PathBuf,
    /// Node identifier, used only for diagnostics and stats labeling
    pub node_id: String,
    /// fsync each chunk before it becomes visible
    pub sync_writes: bool,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            backend: BackendKind::Disk,
            storage_path: PathBuf::from(DEFAULT_STORAGE_PATH),
            node_id: DEFAULT_NODE_ID.to_string(),
            sync_writes: false,
        }
    }
}

impl StoreConfig {
    /// Configuration for a volatile store
    pub fn in_memory(node_id: impl Into<String>) -> Self {
        Self {
            backend: BackendKind::Memory,
            node_id: node_id.into(),
            ..Default::default()
        }
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        if self.node_id.trim().is_empty() {
            return Err(Error::Config("node id must not be empty".to_string()));
        }
        if self.backend == BackendKind::Disk && self.storage_path.as_os_str().is_empty() {
            return Err(Error::Config(
                "storage path is required for the disk backend".to_string(),
            ));
        }
        Ok(())
    }
}

/// HTTP server configuration
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Listen address
    pub listen_addr: SocketAddr,
    /// Maximum accepted request body in bytes
    pub max_body_bytes: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen_addr: SocketAddr::from(([0, 0, 0, 0], 9001)),
            max_body_bytes: DEFAULT_MAX_BODY_BYTES,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    #[test]
    fn test_defaults() {
        let config = StoreConfig::default();
        assert_eq!(config.backend, BackendKind::Disk);
        assert_eq!(config.storage_path, PathBuf::from("./storage"));
        assert_eq!(config.node_id, "chunkserver-1");
        assert!(config.validate().is_ok());

        let server = ServerConfig::default();
        assert_eq!(server.listen_addr.to_string(), DEFAULT_LISTEN_ADDR);
    }

    #[test]
    fn test_validate_rejects_empty_node_id() {
        let config = StoreConfig {
            node_id: "  ".to_string(),
            ..Default::default()
        };
        assert_matches!(config.validate(), Err(Error::Config(_)));
    }

    #[test]
    fn test_memory_backend_ignores_storage_path() {
        let config = StoreConfig {
            storage_path: PathBuf::new(),
            ..StoreConfig::in_memory("node-a")
        };
        assert!(config.validate().is_ok());

        let disk = StoreConfig {
            storage_path: PathBuf::new(),
            ..Default::default()
        };
        assert_matches!(disk.validate(), Err(Error::Config(_)));
    }
}
