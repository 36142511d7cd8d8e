//! incremental merkle accumulator with bounded root history
//!
//! filled-subtrees scheme: for each level keep the rightmost non-zero
//! hash, pad empty subtrees with precomputed zero hashes. insertion
//! walks leaf to root in O(depth) without materializing the tree.
//!
//! every insertion pushes the new root into a fixed-size ring buffer;
//! a proof built against a root stays valid until that root is
//! overwritten, so callers get a bounded staleness window instead of
//! indefinite root validity.

use thiserror::Error;

use crate::field::{hash2, Fe};

/// number of historical roots kept by default
pub const DEFAULT_ROOT_HISTORY: usize = 30;

pub const MIN_DEPTH: usize = 4;
pub const MAX_DEPTH: usize = 32;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TreeError {
    #[error("merkle tree is full")]
    TreeFull,

    #[error("tree depth {0} outside supported range {MIN_DEPTH}..={MAX_DEPTH}")]
    InvalidDepth(usize),

    #[error("root history size must be non-zero")]
    InvalidHistorySize,
}

/// append-only merkle accumulator
#[derive(Clone, Debug)]
pub struct Accumulator {
    depth: usize,
    next_leaf_index: u64,
    /// rightmost non-zero hash per level, length = depth
    filled: Vec<Fe>,
    /// zeros[i] = root of an empty subtree of height i, length = depth + 1
    zeros: Vec<Fe>,
    /// ring buffer of the last `roots.len()` roots
    roots: Vec<Fe>,
    cursor: usize,
}

impl Accumulator {
    /// empty accumulator; the initial root (all-zero tree) seeds the history
    pub fn new(depth: usize, root_history: usize) -> Result<Self, TreeError> {
        if !(MIN_DEPTH..=MAX_DEPTH).contains(&depth) {
            return Err(TreeError::InvalidDepth(depth));
        }
        if root_history == 0 {
            return Err(TreeError::InvalidHistorySize);
        }

        let mut zeros = Vec::with_capacity(depth + 1);
        zeros.push(Fe::ZERO);
        for level in 1..=depth {
            let below = zeros[level - 1];
            zeros.push(hash2(&below, &below));
        }

        let mut roots = vec![Fe::ZERO; root_history];
        roots[0] = zeros[depth];

        Ok(Self {
            depth,
            next_leaf_index: 0,
            filled: zeros[..depth].to_vec(),
            zeros,
            roots,
            cursor: 0,
        })
    }

    /// insert a leaf, returning its assigned index
    pub fn insert(&mut self, leaf: Fe) -> Result<u64, TreeError> {
        if self.next_leaf_index == self.capacity() {
            return Err(TreeError::TreeFull);
        }

        let leaf_index = self.next_leaf_index;
        let mut node = leaf;
        let mut index = leaf_index;

        for level in 0..self.depth {
            if index & 1 == 0 {
                // left child: becomes the filled subtree, sibling is empty
                self.filled[level] = node;
                node = hash2(&node, &self.zeros[level]);
            } else {
                // right child: pair with the previously filled subtree
                node = hash2(&self.filled[level], &node);
            }
            index >>= 1;
        }

        self.cursor = (self.cursor + 1) % self.roots.len();
        self.roots[self.cursor] = node;
        self.next_leaf_index += 1;

        Ok(leaf_index)
    }

    /// whether `root` is still inside the history window
    ///
    /// the zero root is never known, even before it is overwritten
    pub fn is_known_root(&self, root: &Fe) -> bool {
        if root.is_zero() {
            return false;
        }
        // scan backwards from the cursor; the latest root is the common case
        let len = self.roots.len();
        (0..len).any(|i| self.roots[(self.cursor + len - i) % len] == *root)
    }

    pub fn latest_root(&self) -> Fe {
        self.roots[self.cursor]
    }

    pub fn depth(&self) -> usize {
        self.depth
    }

    pub fn next_leaf_index(&self) -> u64 {
        self.next_leaf_index
    }

    pub fn capacity(&self) -> u64 {
        1u64 << self.depth
    }

    /// leaves that can still be inserted
    pub fn remaining(&self) -> u64 {
        self.capacity() - self.next_leaf_index
    }

    pub fn is_full(&self) -> bool {
        self.next_leaf_index == self.capacity()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// recompute the root naively from a full leaf list
    fn naive_root(depth: usize, leaves: &[Fe]) -> Fe {
        let mut level: Vec<Fe> = leaves.to_vec();
        level.resize(1 << depth, Fe::ZERO);
        for _ in 0..depth {
            level = level.chunks(2).map(|pair| hash2(&pair[0], &pair[1])).collect();
        }
        level[0]
    }

    #[test]
    fn sequential_indices_and_roots_match_naive() {
        let mut acc = Accumulator::new(4, DEFAULT_ROOT_HISTORY).unwrap();
        let mut leaves = Vec::new();

        for i in 0..5u64 {
            let leaf = Fe::from_u64(100 + i);
            let index = acc.insert(leaf).unwrap();
            assert_eq!(index, i);
            leaves.push(leaf);
            assert_eq!(acc.latest_root(), naive_root(4, &leaves));
        }
        assert_eq!(acc.next_leaf_index(), 5);
    }

    #[test]
    fn empty_root_matches_naive() {
        let acc = Accumulator::new(6, 8).unwrap();
        assert_eq!(acc.latest_root(), naive_root(6, &[]));
    }

    #[test]
    fn tree_full() {
        let mut acc = Accumulator::new(4, 4).unwrap();
        for i in 0..16u64 {
            acc.insert(Fe::from_u64(i)).unwrap();
        }
        assert!(acc.is_full());
        assert_eq!(acc.insert(Fe::from_u64(99)), Err(TreeError::TreeFull));
    }

    #[test]
    fn root_history_window_evicts() {
        let history = 4;
        let mut acc = Accumulator::new(8, history).unwrap();

        let first = acc.latest_root();
        assert!(acc.is_known_root(&first));

        // history-1 further insertions keep the empty root alive
        for i in 0..(history as u64 - 1) {
            acc.insert(Fe::from_u64(i)).unwrap();
        }
        assert!(acc.is_known_root(&first));

        // one more overwrites its slot
        acc.insert(Fe::from_u64(1000)).unwrap();
        assert!(!acc.is_known_root(&first));
        assert!(acc.is_known_root(&acc.latest_root()));
    }

    #[test]
    fn zero_root_never_known() {
        let acc = Accumulator::new(4, 4).unwrap();
        assert!(!acc.is_known_root(&Fe::ZERO));
    }

    #[test]
    fn rejects_bad_parameters() {
        assert_eq!(Accumulator::new(2, 4).unwrap_err(), TreeError::InvalidDepth(2));
        assert_eq!(Accumulator::new(40, 4).unwrap_err(), TreeError::InvalidDepth(40));
        assert_eq!(Accumulator::new(8, 0).unwrap_err(), TreeError::InvalidHistorySize);
    }

    #[test]
    fn random_leaves_match_naive_root() {
        use rand::{Rng, SeedableRng};

        let mut rng = rand::rngs::StdRng::seed_from_u64(7);
        let mut acc = Accumulator::new(6, 8).unwrap();
        let mut leaves = Vec::new();

        for _ in 0..40 {
            let leaf = Fe::reduce(&rng.gen::<[u8; 32]>());
            acc.insert(leaf).unwrap();
            leaves.push(leaf);
        }
        assert_eq!(acc.latest_root(), naive_root(6, &leaves));
    }

    #[test]
    fn all_recent_roots_stay_known() {
        let history = 6;
        let mut acc = Accumulator::new(8, history).unwrap();
        let mut recent = Vec::new();

        for i in 0..20u64 {
            acc.insert(Fe::from_u64(i)).unwrap();
            recent.push(acc.latest_root());
        }

        for (age, root) in recent.iter().rev().enumerate() {
            assert_eq!(acc.is_known_root(root), age < history, "age {age}");
        }
    }
}
