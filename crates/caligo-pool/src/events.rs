//! structured records emitted for off-chain indexers and relayers
//!
//! each successful operation appends one or more records. amounts are
//! omitted wherever privacy requires it: a shield event names the
//! commitment and token but never the amount; transfer events expose
//! only what is already public input to the proof.

use serde::{Deserialize, Serialize};

use caligo_merkle::Fe;

use crate::types::{Address, Amount, Memo, TokenId};

/// a commitment together with its assigned leaf index
pub type InsertedLeaf = (Fe, u64);

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum PoolEvent {
    /// accumulator insertion, for indexers rebuilding the tree
    LeafInserted { leaf: Fe, index: u64, root: Fe },

    /// shield: amount deliberately omitted
    Shielded { token: TokenId, commitment: Fe, leaf_index: u64 },

    /// hidden-to-hidden transfer (single, batch, or multi-input)
    Transferred {
        nullifiers: Vec<Fe>,
        outputs: Vec<InsertedLeaf>,
        relayer: Address,
        fee: Amount,
        memos: Vec<Memo>,
    },

    /// hidden-to-public exit; the amount is public by nature
    Unshielded {
        nullifiers: Vec<Fe>,
        token: TokenId,
        recipient: Address,
        amount: Amount,
        change: Option<InsertedLeaf>,
    },

    Swapped {
        nullifier: Fe,
        token_in: TokenId,
        token_out: TokenId,
        swap_amount: Amount,
        output_amount: Amount,
        outputs: Vec<InsertedLeaf>,
        memo: Option<Memo>,
    },

    TokenAdded { token: TokenId },
    TokenRemoved { token: TokenId },
    TokenBlacklistUpdated { token: TokenId, blacklisted: bool },
    RelayerApprovalUpdated { relayer: Address, approved: bool },

    OwnershipProposed { to: Address },
    OwnershipTransferred { from: Address, to: Address },
}

/// event plus admission timestamp (unix seconds)
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct EventRecord {
    pub at: i64,
    pub event: PoolEvent,
}
