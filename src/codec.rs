//! Payload Transport Encoding
//!
//! Chunks travel as standard-alphabet base64 text inside JSON bodies.

use base64::engine::general_purpose::STANDARD as B64;
use base64::Engine as _;
use bytes::Bytes;

use crate::error::{Error, Result};
use crate::store::ChunkKey;

/// Decode a base64 payload destined for `key`
pub fn decode_payload(key: &ChunkKey, encoded: &str) -> Result<Bytes> {
    B64.decode(encoded.trim())
        .map(Bytes::from)
        .map_err(|source| Error::Encoding {
            key: key.to_string(),
            source,
        })
}

/// Encode a payload for the wire
pub fn encode_payload(data: &[u8]) -> String {
    B64.encode(data)
}
