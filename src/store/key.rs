//! Chunk Keys
//!
//! Composite `(object id, chunk index)` keys and their on-disk file names.
//!
//! # File Name Encoding
//!
//! ```text
//! {object_id}_chunk_{chunk_index}.bin
//! ```
//!
//! Decoding splits on the *last* `_chunk_` separator. The `{index}.bin`
//! suffix can never contain the separator, so the encoding stays injective
//! even for object ids that contain `_chunk_` themselves.

use std::fmt;

use crate::error::{Error, Result};

/// Maximum object id length in bytes (keeps file names under NAME_MAX)
pub const MAX_OBJECT_ID_LEN: usize = 200;

const CHUNK_SEPARATOR: &str = "_chunk_";
const CHUNK_EXTENSION: &str = ".bin";

/// Chunk key - composite of owning object id and chunk index
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ChunkKey {
    /// Owning object id (validated)
    object_id: String,
    /// Position of the chunk within its object
    chunk_index: u32,
}

impl ChunkKey {
    /// Create a new chunk key, rejecting object ids that could escape the
    /// storage root
    pub fn new(object_id: impl Into<String>, chunk_index: u32) -> Result<Self> {
        let object_id = object_id.into();
        validate_object_id(&object_id)?;
        Ok(Self {
            object_id,
            chunk_index,
        })
    }

    /// Get the owning object id
    #[inline]
    pub fn object_id(&self) -> &str {
        &self.object_id
    }

    /// Get the chunk index
    #[inline]
    pub fn chunk_index(&self) -> u32 {
        self.chunk_index
    }

    /// Check whether this key belongs to `object_id`
    #[inline]
    pub fn belongs_to(&self, object_id: &str) -> bool {
        self.object_id == object_id
    }

    /// File name used by the disk backend
    pub fn file_name(&self) -> String {
        format!(
            "{}{}{}{}",
            self.object_id, CHUNK_SEPARATOR, self.chunk_index, CHUNK_EXTENSION
        )
    }

    /// Decode a file name produced by [`ChunkKey::file_name`].
    ///
    /// Returns `None` for anything else found in the storage root.
    pub fn from_file_name(name: &str) -> Option<Self> {
        let stem = name.strip_suffix(CHUNK_EXTENSION)?;
        let split = stem.rfind(CHUNK_SEPARATOR)?;
        let object_id = &stem[..split];
        let index = &stem[split + CHUNK_SEPARATOR.len()..];

        if !is_canonical_index(index) {
            return None;
        }
        let chunk_index = index.parse::<u32>().ok()?;

        Self::new(object_id, chunk_index).ok()
    }
}

impl fmt::Display for ChunkKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.object_id, self.chunk_index)
    }
}

/// Validate a caller-supplied object id.
///
/// Rejects empty ids, ids longer than [`MAX_OBJECT_ID_LEN`], path separators,
/// control characters, and the `.`/`..` directory names.
pub fn validate_object_id(object_id: &str) -> Result<()> {
    if object_id.is_empty() {
        return Err(Error::Validation("object id must not be empty".to_string()));
    }
    if object_id.len() > MAX_OBJECT_ID_LEN {
        return Err(Error::Validation(format!(
            "object id exceeds {} bytes",
            MAX_OBJECT_ID_LEN
        )));
    }
    if object_id == "." || object_id == ".." {
        return Err(Error::Validation(format!(
            "object id '{}' is a reserved path name",
            object_id
        )));
    }
    if let Some(c) = object_id
        .chars()
        .find(|c| *c == '/' || *c == '\\' || c.is_control())
    {
        return Err(Error::Validation(format!(
            "object id contains forbidden character {:?}",
            c
        )));
    }
    Ok(())
}

/// Decimal digits without sign or leading zeros
fn is_canonical_index(s: &str) -> bool {
    !s.is_empty()
        && s.bytes().all(|b| b.is_ascii_digit())
        && (s == "0" || !s.starts_with('0'))
}

// =============================================================================
// Tests
// =============================================================================
