//! field elements for tree and commitment hashing
//!
//! commitments, nullifiers and merkle nodes are all elements of the
//! bn254 scalar field, stored as canonical 32-byte big-endian values.
//! the two-to-one compression is blake3 with a versioned domain
//! separator, reduced into the field.

use core::fmt;

use num_bigint::BigUint;
use serde::{Deserialize, Serialize};

use crate::TREE_DOMAIN;

/// bn254 scalar field modulus, big-endian
pub const MODULUS: [u8; 32] = [
    0x30, 0x64, 0x4e, 0x72, 0xe1, 0x31, 0xa0, 0x29, 0xb8, 0x50, 0x45, 0xb6, 0x81, 0x81, 0x58,
    0x5d, 0x28, 0x33, 0xe8, 0x48, 0x79, 0xb9, 0x70, 0x91, 0x43, 0xe1, 0xf5, 0x93, 0xf0, 0x00,
    0x00, 0x01,
];

/// canonical field element (big-endian, always < MODULUS)
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Fe([u8; 32]);

impl Fe {
    pub const ZERO: Self = Self([0u8; 32]);

    /// parse canonical bytes, rejecting values >= MODULUS
    pub fn from_bytes(bytes: [u8; 32]) -> Option<Self> {
        // fixed-width big-endian magnitudes compare lexicographically
        if bytes < MODULUS {
            Some(Self(bytes))
        } else {
            None
        }
    }

    /// reduce arbitrary bytes (big-endian) into the field
    pub fn reduce(bytes: &[u8]) -> Self {
        let n = BigUint::from_bytes_be(bytes) % BigUint::from_bytes_be(&MODULUS);
        let reduced = n.to_bytes_be();
        let mut out = [0u8; 32];
        out[32 - reduced.len()..].copy_from_slice(&reduced);
        Self(out)
    }

    pub fn from_u64(v: u64) -> Self {
        let mut out = [0u8; 32];
        out[24..].copy_from_slice(&v.to_be_bytes());
        Self(out)
    }

    pub fn from_u128(v: u128) -> Self {
        let mut out = [0u8; 32];
        out[16..].copy_from_slice(&v.to_be_bytes());
        Self(out)
    }

    pub fn to_bytes(&self) -> [u8; 32] {
        self.0
    }

    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    pub fn is_zero(&self) -> bool {
        self.0 == [0u8; 32]
    }
}

impl fmt::Debug for Fe {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Fe({})", hex::encode(self.0))
    }
}

impl fmt::Display for Fe {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&hex::encode(self.0))
    }
}

impl AsRef<[u8]> for Fe {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

/// two-to-one compression over the field
///
/// deterministic and side-effect free; every tree insertion costs
/// `depth` calls to this function
pub fn hash2(a: &Fe, b: &Fe) -> Fe {
    let mut hasher = blake3::Hasher::new();
    hasher.update(TREE_DOMAIN);
    hasher.update(&a.0);
    hasher.update(&b.0);
    Fe::reduce(hasher.finalize().as_bytes())
}
