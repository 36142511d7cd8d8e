//! error taxonomy for pool operations
//!
//! proof rejection, nullifier reuse and commitment collision are
//! permanent for a given input; `InsufficientPoolBalance` is
//! transient and may succeed on retry once the pool is topped up.
//! `BalanceUnderflow` is an invariant violation: liquidity must be
//! checked before any decrement, never clamped after.

use thiserror::Error;

use caligo_merkle::TreeError;

use crate::types::MAX_MEMO_BYTES;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum PoolError {
    #[error("proof rejected by verifier")]
    InvalidProof,

    #[error("nullifier already spent")]
    NullifierAlreadySpent,

    #[error("commitment already known")]
    DuplicateCommitment,

    #[error("root is not in the recent root history")]
    UnknownRoot,

    #[error("invalid amount")]
    InvalidAmount,

    #[error("token not supported")]
    UnsupportedToken,

    #[error("token is blacklisted")]
    TokenBlacklisted,

    #[error("pool balance insufficient for payout")]
    InsufficientPoolBalance,

    #[error("invalid recipient or relayer address")]
    InvalidRecipient,

    #[error("relayer is not approved by the router")]
    RelayerNotApproved,

    #[error("value transfer failed")]
    TransferFailed,

    #[error("claimed swap rate outside tolerated bound")]
    InvalidSwapRate,

    #[error("batch size mismatch")]
    BatchSizeMismatch,

    #[error("batch exceeds maximum size")]
    BatchSizeTooLarge,

    #[error("merkle tree is full")]
    MerkleTreeFull,

    #[error("memo exceeds {MAX_MEMO_BYTES} bytes")]
    MemoTooLarge,

    #[error("aggregate balance underflow")]
    BalanceUnderflow,

    #[error("caller is not the pool owner")]
    NotOwner,

    #[error("caller is not the pending owner")]
    NotPendingOwner,

    #[error("tree: {0}")]
    Tree(TreeError),
}

impl From<TreeError> for PoolError {
    fn from(e: TreeError) -> Self {
        match e {
            TreeError::TreeFull => PoolError::MerkleTreeFull,
            other => PoolError::Tree(other),
        }
    }
}

pub type Result<T> = std::result::Result<T, PoolError>;
