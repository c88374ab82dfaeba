//! Longest-valid-chain consensus

use crate::blockchain::{validate_chain, Blockchain, LedgerSnapshot};
use tracing::{info, warn};

/// Outcome of a consensus round.
#[derive(Debug, Clone, PartialEq)]
pub struct Resolution {
    pub snapshot: LedgerSnapshot,
    pub replaced: bool,
}

/// Consensus engine for selecting the canonical chain
pub struct Consensus;

impl Consensus {
    /// Position of the peer snapshot that would replace a chain of
    /// `local_len` blocks, judged on length alone.
    ///
    /// Only peers strictly longer than the local chain qualify. Among those the
    /// longest wins, and a peer as long as the standing candidate displaces it,
    /// so ties go to the last one iterated. This departs on purpose from the
    /// strict "longer than the running maximum" rule, where the first wins.
    pub fn select_longest(local_len: usize, peers: &[LedgerSnapshot]) -> Option<usize> {
        let mut max_len = local_len;
        let mut selected = None;
        for (i, peer) in peers.iter().enumerate() {
            let len = peer.chain.len();
            if len > local_len && len >= max_len {
                max_len = len;
                selected = Some(i);
            }
        }
        selected
    }

    /// Pick the longest peer snapshot and adopt it if its chain validates.
    ///
    /// Only the final candidate is validated. Peers that failed to respond must
    /// be left out of `peers` rather than passed as empty snapshots.
    pub fn resolve(local: LedgerSnapshot, mut peers: Vec<LedgerSnapshot>) -> Resolution {
        let Some(i) = Self::select_longest(local.chain.len(), &peers) else {
            return Resolution {
                snapshot: local,
                replaced: false,
            };
        };

        let candidate = peers.swap_remove(i);
        match validate_chain(&candidate.chain) {
            Ok(()) => Resolution {
                snapshot: candidate,
                replaced: true,
            },
            Err(e) => {
                warn!(
                    candidate_len = candidate.chain.len(),
                    error = %e,
                    "consensus.candidate_invalid"
                );
                Resolution {
                    snapshot: local,
                    replaced: false,
                }
            }
        }
    }
}

impl Blockchain {
    /// Run [`Consensus::resolve`] against peer snapshots and install the
    /// winner. Returns whether the local state was replaced.
    pub fn resolve_consensus(&mut self, peers: Vec<LedgerSnapshot>) -> bool {
        let local_len = self.len();
        let resolution = Consensus::resolve(self.take_snapshot(), peers);
        if resolution.replaced {
            info!(
                old_len = local_len,
                new_len = resolution.snapshot.chain.len(),
                "consensus.chain_replaced"
            );
        }
        self.install_snapshot(resolution.snapshot);
        resolution.replaced
    }
}
