//! Proof-of-work nonce search

use crate::blockchain::{BlockData, Candidate};
use crate::crypto::{canonical_block_data, digest_block};
use crate::error::ChainError;
use std::time::Instant;
use tracing::debug;

/// A block hash must start with this many zero characters.
pub const DIFFICULTY_PREFIX: &str = "0000";

/// Winning nonce together with the digest it produces.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProofOfWork {
    pub nonce: u64,
    pub hash: String,
}

pub fn difficulty_met(hash: &str) -> bool {
    hash.starts_with(DIFFICULTY_PREFIX)
}

/// Search nonces from 0 upwards until the digest meets the difficulty.
///
/// There is no iteration cap and no cancellation: callers that must stay
/// responsive run this on a blocking worker.
pub fn proof_of_work(previous_block_hash: &str, data: &BlockData) -> Result<ProofOfWork, ChainError> {
    let canonical = canonical_block_data(data)?;
    let start = Instant::now();

    let mut nonce: u64 = 0;
    loop {
        let hash = digest_block(previous_block_hash, &canonical, nonce);
        if difficulty_met(&hash) {
            debug!(
                index = data.index,
                nonce,
                elapsed_ms = start.elapsed().as_millis() as u64,
                "pow.found"
            );
            return Ok(ProofOfWork { nonce, hash });
        }
        nonce = nonce.checked_add(1).ok_or_else(|| {
            ChainError::InvalidBlock("Nonce space exhausted without meeting difficulty".to_string())
        })?;
    }
}

pub fn mine_candidate(candidate: &Candidate) -> Result<ProofOfWork, ChainError> {
    proof_of_work(&candidate.previous_block_hash, &candidate.data)
}
