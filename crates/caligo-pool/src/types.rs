//! value types for the shielded pool
//!
//! tokens and public addresses are opaque 32-byte identifiers; amounts
//! are u128 with checked arithmetic only. memos are size-capped opaque
//! blobs the pool forwards but never interprets.

use core::fmt;

use serde::{Deserialize, Serialize};

use crate::error::PoolError;
use crate::TOKEN_DOMAIN;

/// maximum encrypted memo size forwarded in events
pub const MAX_MEMO_BYTES: usize = 1024;

/// token identifier (32 bytes, derived from token metadata)
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TokenId(pub [u8; 32]);

impl TokenId {
    /// native asset of the host chain
    pub const NATIVE: Self = Self([0u8; 32]);

    pub fn from_bytes(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    /// derive a token id from metadata (chain id, contract address, ...)
    pub fn derive(metadata: &[u8]) -> Self {
        let mut hasher = blake3::Hasher::new();
        hasher.update(TOKEN_DOMAIN);
        hasher.update(metadata);
        Self(*hasher.finalize().as_bytes())
    }

    pub fn is_native(&self) -> bool {
        *self == Self::NATIVE
    }
}

impl fmt::Display for TokenId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&hex::encode(self.0))
    }
}

/// public (transparent) address for unshield recipients and relayers
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Address(pub [u8; 32]);

impl Address {
    /// the zero address; invalid as a recipient, means "no relayer"
    pub const ZERO: Self = Self([0u8; 32]);

    pub fn from_bytes(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    pub fn is_zero(&self) -> bool {
        self.0 == [0u8; 32]
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&hex::encode(self.0))
    }
}

/// token amount with checked arithmetic
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize,
)]
pub struct Amount(pub u128);

impl Amount {
    pub const ZERO: Self = Self(0);

    pub fn new(amount: u128) -> Self {
        Self(amount)
    }

    pub fn checked_add(self, other: Self) -> Option<Self> {
        self.0.checked_add(other.0).map(Self)
    }

    pub fn checked_sub(self, other: Self) -> Option<Self> {
        self.0.checked_sub(other.0).map(Self)
    }

    pub fn is_zero(&self) -> bool {
        self.0 == 0
    }
}

impl From<u128> for Amount {
    fn from(v: u128) -> Self {
        Self(v)
    }
}

impl From<u64> for Amount {
    fn from(v: u64) -> Self {
        Self(v as u128)
    }
}

impl From<Amount> for u128 {
    fn from(v: Amount) -> Self {
        v.0
    }
}

impl fmt::Display for Amount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// opaque encrypted memo attached to transfer/swap outputs
///
/// the pool only enforces the size cap and forwards the bytes in
/// events; encryption and decryption happen off-ledger
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Memo(Vec<u8>);

impl Memo {
    pub fn new(bytes: Vec<u8>) -> Result<Self, PoolError> {
        if bytes.len() > MAX_MEMO_BYTES {
            return Err(PoolError::MemoTooLarge);
        }
        Ok(Self(bytes))
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}
