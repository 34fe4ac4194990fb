//! Error types for the Chunkserver

use std::path::PathBuf;

use thiserror::Error;

/// Result type alias using our Error type
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in the Chunkserver
#[derive(Error, Debug)]
#[allow(clippy::enum_variant_names)]
pub enum Error {
    // =========================================================================
    // Caller Errors
    // =========================================================================
    /// Malformed key component (object id or chunk index)
    #[error("Invalid chunk key: {0}")]
    Validation(String),

    /// Payload could not be decoded from its transport encoding
    #[error("Failed to decode payload for {key}: {source}")]
    Encoding {
        key: String,
        #[source]
        source: base64::DecodeError,
    },

    /// No record exists for the key
    #[error("Chunk not found: {key}")]
    ChunkNotFound { key: String },

    // =========================================================================
    // Storage Errors
    // =========================================================================
    /// Storage root could not be prepared at startup
    #[error("Storage initialization failed for {path:?}: {reason}")]
    StorageInit { path: PathBuf, reason: String },

    /// Backend I/O fault while reading
    #[error("{operation} failed for {key}: {source}")]
    StorageRead {
        operation: &'static str,
        key: String,
        #[source]
        source: std::io::Error,
    },

    /// Backend I/O fault while writing or removing
    #[error("{operation} failed for {key}: {source}")]
    StorageWrite {
        operation: &'static str,
        key: String,
        #[source]
        source: std::io::Error,
    },

    /// Backend key set could not be listed
    #[error("Failed to enumerate chunks: {source}")]
    StorageEnumeration {
        #[source]
        source: std::io::Error,
    },

    // =========================================================================
    // Process Errors
    // =========================================================================
    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Metrics registry error
    #[error("Metrics error: {0}")]
    Metrics(#[from] prometheus::Error),

    /// I/O error outside of chunk operations (listener, sockets)
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    /// True for lookups that missed; an expected outcome, not a fault
    pub fn is_not_found(&self) -> bool {
        matches!(self, Error::ChunkNotFound { .. })
    }

    /// True when the caller supplied bad input
    pub fn is_client_error(&self) -> bool {
        matches!(self, Error::Validation(_) | Error::Encoding { .. })
    }
}
