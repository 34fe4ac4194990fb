//! Chunkserver - Chunk Storage Node
//!
//! Stores fixed-identity binary chunks for a distributed object store. Each
//! chunk is addressed by `(object id, chunk index)` and held by a pluggable
//! backend: one file per chunk under a storage root, or an in-process map.
//!
//! # Architecture
//!
//! ```text
//! HTTP (/api/chunk/*) → ChunkStore → ChunkBackend (Disk | Memory)
//!                           │
//!                           └──▶ StoreMetrics / HealthCheck
//! ```
//!
//! # Modules
//!
//! - [`store`] - Chunk keys, the store and its backends
//! - [`codec`] - Base64 payload encoding for the transport
//! - [`config`] - Store and server configuration
//! - [`monitoring`] - Prometheus metrics and health probes
//! - [`server`] - HTTP transport
//! - [`error`] - Error types

pub mod codec;
pub mod config;
pub mod error;
pub mod monitoring;
pub mod server;
pub mod store;

// Re-export commonly used types
pub use config::{ServerConfig, StoreConfig};
pub use error::{Error, Result};
pub use monitoring::{HealthCheck, StoreMetrics};
pub use server::AppState;
pub use store::{
    BackendKind, ChunkBackend, ChunkKey, ChunkStore, DiskBackend, MemoryBackend, StoreStats,
    StoreStatus,
};

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
