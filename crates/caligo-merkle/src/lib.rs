//! caligo merkle accumulator
//!
//! append-only commitment tree for the caligo shielded pool:
//!
//! - [`Fe`]: 32-byte field elements in the bn254 scalar field
//! - [`hash2`]: domain-separated two-to-one compression over [`Fe`]
//! - [`Accumulator`]: fixed-depth incremental merkle tree with a
//!   bounded ring buffer of historical roots
//!
//! insertion runs in O(depth) using the filled-subtrees scheme: only
//! the rightmost non-zero hash per level is kept, empty subtrees are
//! padded with precomputed zero hashes. the root ring buffer gives
//! proofs a bounded staleness window without unbounded history growth.

pub mod field;
pub mod tree;

pub use field::{hash2, Fe};
pub use tree::{Accumulator, TreeError, DEFAULT_ROOT_HISTORY, MAX_DEPTH, MIN_DEPTH};

/// domain separator for tree node hashing
pub const TREE_DOMAIN: &[u8] = b"caligo.merkle.node.v1";
