//! Checkpoint chain (interlink) maintenance.
//!
//! Level `i` of the chain holds the latest hash whose difficulty beat the prior
//! target halved `i + 1` times. Each level doubles the work it attests to, so the
//! chain stays logarithmic in the total work and lets a verifier bound relative
//! chain work without replaying intermediate blocks.
use crate::codec::halve;
use crate::types::Difficulty;

/// Ordered checkpoint hashes, one per difficulty-doubling level.
pub type CheckpointChain = Vec<Vec<u8>>;

/// Record `candidate_hash` at every level its difficulty qualifies for.
///
/// Starting from `prior` halved once, each level that `new` still beats is
/// overwritten (or appended when it is the next index). Stops at the first
/// halved level at least as hard as `new`. The chain never shrinks.
pub fn extend(
    candidate_hash: &[u8],
    new: Difficulty,
    prior: Difficulty,
    mut chain: CheckpointChain,
) -> CheckpointChain {
    let mut level = halve(prior);
    let mut index = 0usize;

    while level.is_easier_than(&new) {
        match chain.get_mut(index) {
            Some(slot) => *slot = candidate_hash.to_vec(),
            None => chain.push(candidate_hash.to_vec()),
        }
        level = halve(level);
        index += 1;
    }

    chain
}

/// Number of levels `new` qualifies for above `prior`.
pub fn qualifying_levels(new: Difficulty, prior: Difficulty) -> usize {
    let mut level = halve(prior);
    let mut count = 0usize;
    while level.is_easier_than(&new) {
        level = halve(level);
        count += 1;
    }
    count
}
