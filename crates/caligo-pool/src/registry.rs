//! nullifier and commitment registries
//!
//! two monotonic sets: spent nullifiers and seen commitments. both
//! only ever grow; the check-then-set in `mark_*` is atomic with
//! respect to the enclosing ledger operation because all mutation runs
//! inside one critical section.

use std::collections::HashSet;

use caligo_merkle::Fe;

use crate::error::{PoolError, Result};

/// spent-nullifier set - the double-spend guard
#[derive(Clone, Debug, Default)]
pub struct NullifierSet {
    spent: HashSet<Fe>,
}

impl NullifierSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_spent(&self, nullifier: &Fe) -> bool {
        self.spent.contains(nullifier)
    }

    /// record a nullifier as spent, exactly once
    pub fn mark_spent(&mut self, nullifier: Fe) -> Result<()> {
        if !self.spent.insert(nullifier) {
            return Err(PoolError::NullifierAlreadySpent);
        }
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.spent.len()
    }

    pub fn is_empty(&self) -> bool {
        self.spent.is_empty()
    }
}

/// seen-commitment set - rejects resubmission of identical commitments
/// independently of nullifier checks
#[derive(Clone, Debug, Default)]
pub struct CommitmentSet {
    seen: HashSet<Fe>,
}

impl CommitmentSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_seen(&self, commitment: &Fe) -> bool {
        self.seen.contains(commitment)
    }

    /// record a commitment, exactly once
    pub fn mark_seen(&mut self, commitment: Fe) -> Result<()> {
        if !self.seen.insert(commitment) {
            return Err(PoolError::DuplicateCommitment);
        }
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.seen.len()
    }

    pub fn is_empty(&self) -> bool {
        self.seen.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn nullifier_spent_exactly_once() {
        let mut set = NullifierSet::new();
        let nf = Fe::from_u64(42);

        assert!(!set.is_spent(&nf));
        set.mark_spent(nf).unwrap();
        assert!(set.is_spent(&nf));
        assert_eq!(set.mark_spent(nf), Err(PoolError::NullifierAlreadySpent));
        assert_eq!(set.len(), 1);
    }

    #[test]
    fn commitment_seen_exactly_once() {
        let mut set = CommitmentSet::new();
        let c = Fe::from_u64(7);

        set.mark_seen(c).unwrap();
        assert_eq!(set.mark_seen(c), Err(PoolError::DuplicateCommitment));
        assert!(set.is_seen(&c));
    }
}
