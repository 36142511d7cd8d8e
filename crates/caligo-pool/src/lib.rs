//! caligo shielded pool
//!
//! proof-gated value-custody ledger: deposit fungible value under a
//! hidden commitment (shield), move it between hidden balances
//! (transfer/swap), and exit to a public address (unshield), with a
//! zk verifier attesting to each transition.
//!
//! # architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────┐
//! │                      SHIELDED POOL                        │
//! ├──────────────────────────────────────────────────────────┤
//! │                                                           │
//! │  admission (PoolService)                                  │
//! │  ├─ proof verification outside the lock                   │
//! │  └─ serialized commit section                             │
//! │                                                           │
//! │  ledger (one atomic transition per operation)             │
//! │  ├─ merkle accumulator + bounded root history             │
//! │  ├─ nullifier / commitment registries                     │
//! │  ├─ token policy (ever-supported is monotone)             │
//! │  ├─ relayer router (empty approval table = open)          │
//! │  └─ per-token aggregate balances + fee settlement         │
//! │                                                           │
//! │  external capabilities                                    │
//! │  ├─ ProofVerifier  (zk circuits, opaque accept/reject)    │
//! │  ├─ Bank           (native / token custody primitive)     │
//! │  └─ SwapQuote      (price oracle for rate bounding)       │
//! │                                                           │
//! └──────────────────────────────────────────────────────────┘
//! ```
//!
//! safety rests on three invariants the ledger enforces regardless of
//! proof content: a nullifier is spent at most once, a commitment is
//! inserted at most once, and aggregate payouts per token never exceed
//! aggregate inflow.

pub mod bank;
pub mod error;
pub mod events;
pub mod ledger;
pub mod oracle;
pub mod policy;
pub mod registry;
pub mod service;
pub mod settle;
pub mod types;
pub mod verifier;

pub use bank::{Bank, MockBank, Payout};
pub use error::{PoolError, Result};
pub use events::{EventRecord, PoolEvent};
pub use ledger::{
    BatchInput, BatchTransferRequest, BatchUnshieldInput, BatchUnshieldRequest, Ledger,
    LedgerConfig, MultiTransferRequest, ShieldReceipt, ShieldRequest, SwapReceipt, SwapRequest,
    TransferReceipt, TransferRequest, UnshieldReceipt, UnshieldRequest,
};
pub use oracle::{FixedQuote, SwapQuote};
pub use policy::{RelayerRouter, TokenPolicy};
pub use registry::{CommitmentSet, NullifierSet};
pub use service::PoolService;
pub use settle::Balances;
pub use types::{Address, Amount, Memo, TokenId, MAX_MEMO_BYTES};
pub use verifier::{ProofKind, ProofVerifier, StaticVerifier};

pub use caligo_merkle::{Accumulator, Fe};

/// domain separator for token id derivation
pub const TOKEN_DOMAIN: &[u8] = b"caligo.pool.token.v1";
