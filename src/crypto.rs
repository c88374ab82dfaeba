//! Block hashing for MeshLedger
//!
//! The digest of a block is SHA-256 over
//! `previous_block_hash ++ decimal(nonce) ++ canonical_json({transactions, index})`,
//! rendered as 64 lowercase hex characters.

use crate::blockchain::BlockData;
use crate::error::ChainError;
use sha2::{Digest, Sha256};

/// Canonical serialization of the hashed block content.
///
/// Struct field order fixes the JSON key order, so structurally equal data
/// always produces identical bytes.
pub fn canonical_block_data(data: &BlockData) -> Result<String, ChainError> {
    serde_json::to_string(data).map_err(|e| {
        ChainError::SerializationError(format!("Failed to canonicalize block data: {}", e))
    })
}

/// Digest over an already canonicalized payload. The miner calls this in its
/// inner loop so the block data is serialized only once per search.
pub fn digest_block(previous_block_hash: &str, canonical_data: &str, nonce: u64) -> String {
    let mut hasher = Sha256::new();
    hasher.update(previous_block_hash.as_bytes());
    hasher.update(nonce.to_string().as_bytes());
    hasher.update(canonical_data.as_bytes());
    hex::encode(hasher.finalize())
}

pub fn hash_block(
    previous_block_hash: &str,
    data: &BlockData,
    nonce: u64,
) -> Result<String, ChainError> {
    let canonical = canonical_block_data(data)?;
    Ok(digest_block(previous_block_hash, &canonical, nonce))
}
