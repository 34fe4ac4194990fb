//! Chunk Storage
//!
//! Binary chunks keyed by `(object id, chunk index)` over a pluggable backend.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                         ChunkStore                           │
//! │   key validation · write/read/delete/exists · bulk scans     │
//! ├──────────────────────────────────────────────────────────────┤
//! │                 ChunkBackend (get/put/delete/list)           │
//! │  ┌────────────────────────┐   ┌────────────────────────────┐ │
//! │  │ DiskBackend            │   │ MemoryBackend              │ │
//! │  │ file per chunk,        │   │ DashMap<ChunkKey, Bytes>   │ │
//! │  │ temp + rename writes   │   │                            │ │
//! │  └────────────────────────┘   └────────────────────────────┘ │
//! └──────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Consistency
//!
//! - Per-key operations are atomic; unrelated keys never share a lock
//! - `delete_all` and `stats` enumerate a snapshot and tolerate concurrent
//!   mutation
//! - Last write wins for concurrent writers of the same key

mod backend;
mod chunk_store;
mod disk;
mod key;
mod memory;

pub use backend::{BackendInfo, BackendKind, Capacity, ChunkBackend, KeyEntry};
pub use chunk_store::{ChunkStore, StoreStats, StoreStatus};
pub use disk::DiskBackend;
pub use key::{validate_object_id, ChunkKey, MAX_OBJECT_ID_LEN};
pub use memory::MemoryBackend;
