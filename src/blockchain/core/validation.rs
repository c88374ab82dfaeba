use crate::blockchain::core::chain::{
    Block, ReceivePolicy, GENESIS_HASH, GENESIS_INDEX, GENESIS_NONCE,
};
use crate::crypto::hash_block;
use crate::error::ChainError;
use crate::miner::difficulty_met;

/// Genesis blocks from different nodes differ only in their timestamp, which
/// is informational and not compared.
pub fn is_genesis(block: &Block) -> bool {
    block.index == GENESIS_INDEX
        && block.nonce == GENESIS_NONCE
        && block.previous_block_hash == GENESIS_HASH
        && block.hash == GENESIS_HASH
        && block.transactions.is_empty()
}

/// Recompute the hash of a non-genesis block and check it against the stored
/// hash and the difficulty.
pub fn validate_block_proof(block: &Block) -> Result<(), ChainError> {
    let recomputed = hash_block(&block.previous_block_hash, &block.data(), block.nonce)?;
    if recomputed != block.hash {
        return Err(ChainError::InvalidBlock(format!(
            "Block {} hash mismatch. Expected {}, but got {}.",
            block.index, recomputed, block.hash
        )));
    }
    if !difficulty_met(&block.hash) {
        return Err(ChainError::InvalidBlock(format!(
            "Block {} hash {} does not meet the difficulty target.",
            block.index, block.hash
        )));
    }
    Ok(())
}

/// Structural checks only: genesis first, then linkage and index continuity
/// for every pair. Proofs are not recomputed.
pub fn validate_linkage(chain: &[Block]) -> Result<(), ChainError> {
    let genesis = chain
        .first()
        .ok_or_else(|| ChainError::InvalidChain("Chain is empty.".to_string()))?;
    if !is_genesis(genesis) {
        return Err(ChainError::InvalidChain(
            "First block is not the genesis block.".to_string(),
        ));
    }

    for pair in chain.windows(2) {
        let (previous, current) = (&pair[0], &pair[1]);
        if current.previous_block_hash != previous.hash {
            return Err(ChainError::InvalidChain(format!(
                "Block {} links to {}, but block {} has hash {}.",
                current.index, current.previous_block_hash, previous.index, previous.hash
            )));
        }
        if current.index != previous.index + 1 {
            return Err(ChainError::InvalidChain(format!(
                "Block index {} does not follow {}.",
                current.index, previous.index
            )));
        }
    }

    Ok(())
}

/// Check a whole candidate chain, reporting the first violation found.
///
/// Linkage first (see [`validate_linkage`]), then the proof of every
/// non-genesis block.
pub fn validate_chain(chain: &[Block]) -> Result<(), ChainError> {
    validate_linkage(chain)?;

    for block in &chain[1..] {
        validate_block_proof(block).map_err(|e| ChainError::InvalidChain(e.to_string()))?;
    }

    Ok(())
}

/// The check a ledger restored from storage must pass. It matches what the
/// receive policy accepted in the first place, so every chain the node could
/// have persisted also restores.
pub fn validate_stored_chain(chain: &[Block], policy: ReceivePolicy) -> Result<(), ChainError> {
    match policy {
        ReceivePolicy::TrustLinkage => validate_linkage(chain),
        ReceivePolicy::VerifyProof => validate_chain(chain),
    }
}

pub fn chain_is_valid(chain: &[Block]) -> bool {
    validate_chain(chain).is_ok()
}
