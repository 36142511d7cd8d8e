//! the shielded ledger state machine
//!
//! every operation is a one-shot, commit-or-reject transition: all
//! preconditions are checked before any mutation, the external payout
//! is the last fallible step, and the registry/tree/balance writes
//! that follow cannot fail. there is no pending state to track.
//!
//! value conservation inside a transfer (input = outputs + fee) is
//! enforced by the circuit, not here; the ledger enforces freshness,
//! non-repetition and liquidity.

use std::collections::HashSet;
use std::sync::Arc;

use chrono::Utc;
use tracing::{debug, info};

use caligo_merkle::{Accumulator, Fe};

use crate::bank::{Bank, Payout};
use crate::error::{PoolError, Result};
use crate::events::{EventRecord, InsertedLeaf, PoolEvent};
use crate::oracle::SwapQuote;
use crate::policy::{RelayerRouter, TokenPolicy};
use crate::registry::{CommitmentSet, NullifierSet};
use crate::settle::{stage_relay_fee, Balances};
use crate::types::{Address, Amount, Memo, TokenId};
use crate::verifier::{inputs, ProofKind, ProofVerifier};

/// slippage basis-point denominator
const BPS: u128 = 10_000;

/// ledger parameters fixed at construction or owned by the admin surface
#[derive(Clone, Debug)]
pub struct LedgerConfig {
    pub tree_depth: usize,
    pub root_history: usize,
    /// dust threshold for shield
    pub min_shield_amount: Amount,
    /// flat platform fee charged on swaps, denominated in token_out
    pub platform_fee: Amount,
    pub treasury: Address,
    /// tolerated excess of claimed swap output over the oracle quote
    pub slippage_bps: u16,
    pub max_batch: usize,
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self {
            tree_depth: 20,
            root_history: caligo_merkle::DEFAULT_ROOT_HISTORY,
            min_shield_amount: Amount::new(1),
            platform_fee: Amount::ZERO,
            treasury: Address::ZERO,
            slippage_bps: 100,
            max_batch: 16,
        }
    }
}

// ---- requests ----

#[derive(Clone, Debug)]
pub struct ShieldRequest {
    pub from: Address,
    pub token: TokenId,
    pub amount: Amount,
    pub commitment: Fe,
}

#[derive(Clone, Debug)]
pub struct TransferRequest {
    pub proof: Vec<u8>,
    pub root: Fe,
    pub nullifier: Fe,
    /// second output may be zero (single-output transfer)
    pub out1: Fe,
    pub out2: Fe,
    pub relayer: Address,
    pub fee: Amount,
    pub memos: Vec<Memo>,
}

#[derive(Clone, Debug)]
pub struct UnshieldRequest {
    pub proof: Vec<u8>,
    pub root: Fe,
    pub nullifier: Fe,
    pub token: TokenId,
    pub recipient: Address,
    pub amount: Amount,
    /// zero means no change note
    pub change: Fe,
    pub relayer: Address,
    pub fee: Amount,
}

#[derive(Clone, Debug)]
pub struct SwapRequest {
    pub proof: Vec<u8>,
    pub root: Fe,
    pub nullifier: Fe,
    pub token_in: TokenId,
    pub token_out: TokenId,
    pub swap_amount: Amount,
    /// claimed output, bound into the proof and rate-checked here
    pub output_amount: Amount,
    pub min_amount_out: Amount,
    /// commitment of the swapped-amount note in token_out
    pub out: Fe,
    /// zero means no change note in token_in
    pub change: Fe,
    pub memo: Option<Memo>,
}

/// one spent input inside a batch
#[derive(Clone, Debug)]
pub struct BatchInput {
    pub proof: Vec<u8>,
    pub root: Fe,
    pub nullifier: Fe,
}

#[derive(Clone, Debug)]
pub struct BatchTransferRequest {
    pub inputs: Vec<BatchInput>,
    pub out1: Fe,
    pub out2: Fe,
    pub relayer: Address,
    pub total_fee: Amount,
    pub memos: Vec<Memo>,
}

#[derive(Clone, Debug)]
pub struct BatchUnshieldInput {
    pub proof: Vec<u8>,
    pub root: Fe,
    pub nullifier: Fe,
    pub amount: Amount,
}

#[derive(Clone, Debug)]
pub struct BatchUnshieldRequest {
    pub inputs: Vec<BatchUnshieldInput>,
    pub token: TokenId,
    pub recipient: Address,
    /// zero means no change note
    pub change: Fe,
    pub relayer: Address,
    pub total_fee: Amount,
}

#[derive(Clone, Debug)]
pub struct MultiTransferRequest {
    pub proof: Vec<u8>,
    /// one root per input; roots may differ across inputs
    pub roots: Vec<Fe>,
    pub nullifiers: Vec<Fe>,
    pub out1: Fe,
    pub out2: Fe,
    pub relayer: Address,
    pub fee: Amount,
    pub memos: Vec<Memo>,
}

// ---- receipts ----

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ShieldReceipt {
    pub leaf_index: u64,
    pub root: Fe,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TransferReceipt {
    pub outputs: Vec<InsertedLeaf>,
    pub root: Fe,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct UnshieldReceipt {
    pub change: Option<InsertedLeaf>,
    pub root: Fe,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SwapReceipt {
    pub outputs: Vec<InsertedLeaf>,
    pub root: Fe,
}

/// the shielded pool ledger
///
/// single-writer: callers needing concurrent admission wrap it in a
/// [`crate::service::PoolService`], which serializes the mutation
/// section and runs proof verification outside it
pub struct Ledger<B: Bank> {
    config: LedgerConfig,
    tree: Accumulator,
    nullifiers: NullifierSet,
    commitments: CommitmentSet,
    policy: TokenPolicy,
    relayers: RelayerRouter,
    balances: Balances,
    verifier: Arc<dyn ProofVerifier>,
    oracle: Box<dyn SwapQuote>,
    bank: B,
    owner: Address,
    pending_owner: Option<Address>,
    events: Vec<EventRecord>,
}

impl<B: Bank> Ledger<B> {
    pub fn new(
        config: LedgerConfig,
        verifier: Arc<dyn ProofVerifier>,
        oracle: Box<dyn SwapQuote>,
        bank: B,
        owner: Address,
    ) -> Result<Self> {
        let tree = Accumulator::new(config.tree_depth, config.root_history)?;
        Ok(Self {
            config,
            tree,
            nullifiers: NullifierSet::new(),
            commitments: CommitmentSet::new(),
            policy: TokenPolicy::new(),
            relayers: RelayerRouter::new(),
            balances: Balances::new(),
            verifier,
            oracle,
            bank,
            owner,
            pending_owner: None,
            events: Vec::new(),
        })
    }

    // ---- operations ----

    /// shield: public value in, hidden commitment out
    pub fn shield(&mut self, req: &ShieldRequest) -> Result<ShieldReceipt> {
        if req.amount.is_zero() || req.amount < self.config.min_shield_amount {
            return Err(PoolError::InvalidAmount);
        }
        if !self.policy.is_supported(&req.token) {
            return Err(PoolError::UnsupportedToken);
        }
        if self.policy.is_blacklisted(&req.token) {
            return Err(PoolError::TokenBlacklisted);
        }
        self.check_fresh_commitment(req.commitment)?;
        if self.tree.remaining() < 1 {
            return Err(PoolError::MerkleTreeFull);
        }
        // credit headroom is a precondition so the pull below stays the
        // last fallible step
        if self.balances.get(&req.token).checked_add(req.amount).is_none() {
            return Err(PoolError::InvalidAmount);
        }

        // last fallible step before mutation
        self.bank.pull(req.from, req.token, req.amount)?;

        let (commitment, leaf_index) = self.insert_leaf(req.commitment)?;
        self.balances.credit(req.token, req.amount)?;
        self.policy.mark_ever_supported(req.token);
        self.record(PoolEvent::Shielded {
            token: req.token,
            commitment,
            leaf_index,
        });

        info!(token = %req.token, leaf_index, "shield admitted");
        Ok(ShieldReceipt { leaf_index, root: self.tree.latest_root() })
    }

    /// hidden-to-hidden transfer
    pub fn transfer(&mut self, req: &TransferRequest) -> Result<TransferReceipt> {
        self.transfer_inner(req, true)
    }

    pub(crate) fn transfer_admitted(&mut self, req: &TransferRequest) -> Result<TransferReceipt> {
        self.transfer_inner(req, false)
    }

    fn transfer_inner(&mut self, req: &TransferRequest, check_proof: bool) -> Result<TransferReceipt> {
        let fee_payout = self.stage_fee(TokenId::NATIVE, req.relayer, req.fee)?;
        let outs = self.check_outputs(&[req.out1, req.out2], req.memos.len())?;
        self.check_known_root(req.root)?;
        self.check_unspent(req.nullifier)?;
        if !self.balances.covers(&TokenId::NATIVE, req.fee) {
            return Err(PoolError::InsufficientPoolBalance);
        }

        if check_proof {
            let public = inputs::transfer(
                req.root, req.nullifier, req.out1, req.out2, &req.relayer, req.fee,
            );
            self.check_proof(ProofKind::Transfer, &req.proof, &public)?;
        }

        if let Some(payout) = fee_payout {
            self.bank.payout_all(&[payout])?;
        }

        self.nullifiers.mark_spent(req.nullifier)?;
        let outputs = self.insert_leaves(&outs)?;
        if !req.fee.is_zero() {
            self.balances.debit(TokenId::NATIVE, req.fee)?;
        }
        self.record(PoolEvent::Transferred {
            nullifiers: vec![req.nullifier],
            outputs: outputs.clone(),
            relayer: req.relayer,
            fee: req.fee,
            memos: req.memos.clone(),
        });

        info!(nullifier = %req.nullifier, outputs = outputs.len(), "transfer admitted");
        Ok(TransferReceipt { outputs, root: self.tree.latest_root() })
    }

    /// hidden-to-public exit, with optional change note
    pub fn unshield(&mut self, req: &UnshieldRequest) -> Result<UnshieldReceipt> {
        self.unshield_inner(req, true)
    }

    pub(crate) fn unshield_admitted(&mut self, req: &UnshieldRequest) -> Result<UnshieldReceipt> {
        self.unshield_inner(req, false)
    }

    fn unshield_inner(&mut self, req: &UnshieldRequest, check_proof: bool) -> Result<UnshieldReceipt> {
        if req.amount.is_zero() {
            return Err(PoolError::InvalidAmount);
        }
        if req.recipient.is_zero() {
            return Err(PoolError::InvalidRecipient);
        }
        let fee_payout = self.stage_fee(req.token, req.relayer, req.fee)?;
        // ever-supported, not currently-supported: revoking a token must
        // not trap funds that were already shielded
        if !self.policy.was_ever_supported(&req.token) {
            return Err(PoolError::UnsupportedToken);
        }
        self.check_known_root(req.root)?;
        self.check_unspent(req.nullifier)?;
        let outs = self.check_outputs(&[req.change], 0)?;

        let total = req
            .amount
            .checked_add(req.fee)
            .ok_or(PoolError::InvalidAmount)?;
        if !self.balances.covers(&req.token, total) {
            return Err(PoolError::InsufficientPoolBalance);
        }

        if check_proof {
            let public = inputs::unshield(
                req.root,
                req.nullifier,
                &req.token,
                &req.recipient,
                req.amount,
                req.change,
                &req.relayer,
                req.fee,
            );
            self.check_proof(ProofKind::Unshield, &req.proof, &public)?;
        }

        let mut payouts = vec![Payout { to: req.recipient, token: req.token, amount: req.amount }];
        payouts.extend(fee_payout);
        self.bank.payout_all(&payouts)?;

        self.nullifiers.mark_spent(req.nullifier)?;
        let change = self.insert_leaves(&outs)?.into_iter().next();
        self.balances.debit(req.token, total)?;
        self.record(PoolEvent::Unshielded {
            nullifiers: vec![req.nullifier],
            token: req.token,
            recipient: req.recipient,
            amount: req.amount,
            change,
        });

        info!(token = %req.token, amount = %req.amount, "unshield admitted");
        Ok(UnshieldReceipt { change, root: self.tree.latest_root() })
    }

    /// hidden swap of token_in for token_out, with optional change in token_in
    pub fn swap(&mut self, req: &SwapRequest) -> Result<SwapReceipt> {
        self.swap_inner(req, true)
    }

    pub(crate) fn swap_admitted(&mut self, req: &SwapRequest) -> Result<SwapReceipt> {
        self.swap_inner(req, false)
    }

    fn swap_inner(&mut self, req: &SwapRequest, check_proof: bool) -> Result<SwapReceipt> {
        if req.swap_amount.is_zero() || req.output_amount.is_zero() {
            return Err(PoolError::InvalidAmount);
        }
        if req.out.is_zero() {
            return Err(PoolError::DuplicateCommitment);
        }
        for token in [&req.token_in, &req.token_out] {
            if !self.policy.is_supported(token) {
                return Err(PoolError::UnsupportedToken);
            }
            if self.policy.is_blacklisted(token) {
                return Err(PoolError::TokenBlacklisted);
            }
        }
        if req.output_amount < req.min_amount_out {
            return Err(PoolError::InvalidSwapRate);
        }
        self.check_swap_rate(req)?;

        let fee_payout =
            stage_relay_fee(req.token_out, self.config.treasury, self.config.platform_fee)?;
        self.check_known_root(req.root)?;
        self.check_unspent(req.nullifier)?;
        let outs = self.check_outputs(&[req.out, req.change], 0)?;

        // liquidity of token_out must cover the claimed output plus the
        // platform fee before any state mutation
        let out_total = req
            .output_amount
            .checked_add(self.config.platform_fee)
            .ok_or(PoolError::InvalidAmount)?;
        if !self.balances.covers(&req.token_out, out_total) {
            return Err(PoolError::InsufficientPoolBalance);
        }
        if !self.balances.covers(&req.token_in, req.swap_amount) {
            return Err(PoolError::InsufficientPoolBalance);
        }

        if check_proof {
            let public = inputs::swap(
                req.root,
                req.nullifier,
                req.out,
                req.change,
                &req.token_in,
                &req.token_out,
                req.swap_amount,
                req.output_amount,
            );
            self.check_proof(ProofKind::Swap, &req.proof, &public)?;
        }

        if let Some(payout) = fee_payout {
            self.bank.payout_all(&[payout])?;
        }

        self.nullifiers.mark_spent(req.nullifier)?;
        let outputs = self.insert_leaves(&outs)?;
        self.balances.debit(req.token_in, req.swap_amount)?;
        self.balances.credit(req.token_out, req.output_amount)?;
        if !self.config.platform_fee.is_zero() {
            self.balances.debit(req.token_out, self.config.platform_fee)?;
        }
        self.record(PoolEvent::Swapped {
            nullifier: req.nullifier,
            token_in: req.token_in,
            token_out: req.token_out,
            swap_amount: req.swap_amount,
            output_amount: req.output_amount,
            outputs: outputs.clone(),
            memo: req.memo.clone(),
        });

        info!(token_in = %req.token_in, token_out = %req.token_out, "swap admitted");
        Ok(SwapReceipt { outputs, root: self.tree.latest_root() })
    }

    /// N independent proofs spending N inputs into one shared output pair
    pub fn batch_transfer(&mut self, req: &BatchTransferRequest) -> Result<TransferReceipt> {
        self.batch_transfer_inner(req, true)
    }

    pub(crate) fn batch_transfer_admitted(
        &mut self,
        req: &BatchTransferRequest,
    ) -> Result<TransferReceipt> {
        self.batch_transfer_inner(req, false)
    }

    fn batch_transfer_inner(
        &mut self,
        req: &BatchTransferRequest,
        check_proofs: bool,
    ) -> Result<TransferReceipt> {
        let share = self.check_batch_fee(req.inputs.len(), req.total_fee)?;
        let fee_payout = self.stage_fee(TokenId::NATIVE, req.relayer, req.total_fee)?;
        let outs = self.check_outputs(&[req.out1, req.out2], req.memos.len())?;
        self.check_batch_inputs(req.inputs.iter().map(|i| (i.root, i.nullifier)))?;
        if !self.balances.covers(&TokenId::NATIVE, req.total_fee) {
            return Err(PoolError::InsufficientPoolBalance);
        }

        if check_proofs {
            for input in &req.inputs {
                let public = inputs::transfer(
                    input.root, input.nullifier, req.out1, req.out2, &req.relayer, share,
                );
                self.check_proof(ProofKind::Transfer, &input.proof, &public)?;
            }
        }

        if let Some(payout) = fee_payout {
            self.bank.payout_all(&[payout])?;
        }

        let nullifiers: Vec<Fe> = req.inputs.iter().map(|i| i.nullifier).collect();
        for nf in &nullifiers {
            self.nullifiers.mark_spent(*nf)?;
        }
        // one shared output pair regardless of batch size
        let outputs = self.insert_leaves(&outs)?;
        if !req.total_fee.is_zero() {
            self.balances.debit(TokenId::NATIVE, req.total_fee)?;
        }
        self.record(PoolEvent::Transferred {
            nullifiers: nullifiers.clone(),
            outputs: outputs.clone(),
            relayer: req.relayer,
            fee: req.total_fee,
            memos: req.memos.clone(),
        });

        info!(batch = nullifiers.len(), "batch transfer admitted");
        Ok(TransferReceipt { outputs, root: self.tree.latest_root() })
    }

    /// N independent proofs unshielding to one shared recipient
    pub fn batch_unshield(&mut self, req: &BatchUnshieldRequest) -> Result<UnshieldReceipt> {
        self.batch_unshield_inner(req, true)
    }

    pub(crate) fn batch_unshield_admitted(
        &mut self,
        req: &BatchUnshieldRequest,
    ) -> Result<UnshieldReceipt> {
        self.batch_unshield_inner(req, false)
    }

    fn batch_unshield_inner(
        &mut self,
        req: &BatchUnshieldRequest,
        check_proofs: bool,
    ) -> Result<UnshieldReceipt> {
        let share = self.check_batch_fee(req.inputs.len(), req.total_fee)?;
        if req.recipient.is_zero() {
            return Err(PoolError::InvalidRecipient);
        }
        let fee_payout = self.stage_fee(req.token, req.relayer, req.total_fee)?;
        if !self.policy.was_ever_supported(&req.token) {
            return Err(PoolError::UnsupportedToken);
        }

        let mut total_amount = Amount::ZERO;
        for input in &req.inputs {
            if input.amount.is_zero() {
                return Err(PoolError::InvalidAmount);
            }
            total_amount = total_amount
                .checked_add(input.amount)
                .ok_or(PoolError::InvalidAmount)?;
        }

        self.check_batch_inputs(req.inputs.iter().map(|i| (i.root, i.nullifier)))?;
        let outs = self.check_outputs(&[req.change], 0)?;

        let total = total_amount
            .checked_add(req.total_fee)
            .ok_or(PoolError::InvalidAmount)?;
        if !self.balances.covers(&req.token, total) {
            return Err(PoolError::InsufficientPoolBalance);
        }

        if check_proofs {
            for input in &req.inputs {
                let public = inputs::unshield(
                    input.root,
                    input.nullifier,
                    &req.token,
                    &req.recipient,
                    input.amount,
                    req.change,
                    &req.relayer,
                    share,
                );
                self.check_proof(ProofKind::Unshield, &input.proof, &public)?;
            }
        }

        let mut payouts =
            vec![Payout { to: req.recipient, token: req.token, amount: total_amount }];
        payouts.extend(fee_payout);
        self.bank.payout_all(&payouts)?;

        let nullifiers: Vec<Fe> = req.inputs.iter().map(|i| i.nullifier).collect();
        for nf in &nullifiers {
            self.nullifiers.mark_spent(*nf)?;
        }
        let change = self.insert_leaves(&outs)?.into_iter().next();
        self.balances.debit(req.token, total)?;
        self.record(PoolEvent::Unshielded {
            nullifiers: nullifiers.clone(),
            token: req.token,
            recipient: req.recipient,
            amount: total_amount,
            change,
        });

        info!(batch = nullifiers.len(), token = %req.token, "batch unshield admitted");
        Ok(UnshieldReceipt { change, root: self.tree.latest_root() })
    }

    /// one proof attesting to 2..=N inputs spent jointly
    pub fn multi_transfer(&mut self, req: &MultiTransferRequest) -> Result<TransferReceipt> {
        self.multi_transfer_inner(req, true)
    }

    pub(crate) fn multi_transfer_admitted(
        &mut self,
        req: &MultiTransferRequest,
    ) -> Result<TransferReceipt> {
        self.multi_transfer_inner(req, false)
    }

    fn multi_transfer_inner(
        &mut self,
        req: &MultiTransferRequest,
        check_proof: bool,
    ) -> Result<TransferReceipt> {
        if req.roots.len() != req.nullifiers.len() || req.nullifiers.len() < 2 {
            return Err(PoolError::BatchSizeMismatch);
        }
        if req.nullifiers.len() > inputs::MAX_MULTI_INPUTS {
            return Err(PoolError::BatchSizeTooLarge);
        }
        let fee_payout = self.stage_fee(TokenId::NATIVE, req.relayer, req.fee)?;
        let outs = self.check_outputs(&[req.out1, req.out2], req.memos.len())?;
        self.check_batch_inputs(req.roots.iter().copied().zip(req.nullifiers.iter().copied()))?;
        if !self.balances.covers(&TokenId::NATIVE, req.fee) {
            return Err(PoolError::InsufficientPoolBalance);
        }

        if check_proof {
            let public = inputs::multi_transfer(
                &req.roots, &req.nullifiers, req.out1, req.out2, &req.relayer, req.fee,
            );
            self.check_proof(ProofKind::MultiTransfer, &req.proof, &public)?;
        }

        if let Some(payout) = fee_payout {
            self.bank.payout_all(&[payout])?;
        }

        for nf in &req.nullifiers {
            self.nullifiers.mark_spent(*nf)?;
        }
        let outputs = self.insert_leaves(&outs)?;
        if !req.fee.is_zero() {
            self.balances.debit(TokenId::NATIVE, req.fee)?;
        }
        self.record(PoolEvent::Transferred {
            nullifiers: req.nullifiers.clone(),
            outputs: outputs.clone(),
            relayer: req.relayer,
            fee: req.fee,
            memos: req.memos.clone(),
        });

        info!(inputs = req.nullifiers.len(), "multi-input transfer admitted");
        Ok(TransferReceipt { outputs, root: self.tree.latest_root() })
    }

    // ---- admin surface ----

    pub fn add_supported_token(&mut self, caller: Address, token: TokenId) -> Result<()> {
        self.only_owner(caller)?;
        self.policy.add_supported(token);
        self.record(PoolEvent::TokenAdded { token });
        Ok(())
    }

    /// clears "currently supported" only; ever-supported is permanent
    pub fn remove_supported_token(&mut self, caller: Address, token: TokenId) -> Result<()> {
        self.only_owner(caller)?;
        self.policy.remove_supported(token);
        self.record(PoolEvent::TokenRemoved { token });
        Ok(())
    }

    pub fn set_token_blacklisted(
        &mut self,
        caller: Address,
        token: TokenId,
        blacklisted: bool,
    ) -> Result<()> {
        self.only_owner(caller)?;
        self.policy.set_blacklisted(token, blacklisted);
        self.record(PoolEvent::TokenBlacklistUpdated { token, blacklisted });
        Ok(())
    }

    /// relayer-router configuration: an empty approval table means
    /// open relaying, the first approval closes it
    pub fn set_relayer_approval(
        &mut self,
        caller: Address,
        relayer: Address,
        approved: bool,
    ) -> Result<()> {
        self.only_owner(caller)?;
        if relayer.is_zero() {
            return Err(PoolError::InvalidRecipient);
        }
        if approved {
            self.relayers.approve(relayer);
        } else {
            self.relayers.revoke(&relayer);
        }
        self.record(PoolEvent::RelayerApprovalUpdated { relayer, approved });
        Ok(())
    }

    pub fn set_slippage_bps(&mut self, caller: Address, bps: u16) -> Result<()> {
        self.only_owner(caller)?;
        if bps as u128 > BPS {
            return Err(PoolError::InvalidAmount);
        }
        self.config.slippage_bps = bps;
        Ok(())
    }

    pub fn set_platform_fee(&mut self, caller: Address, fee: Amount) -> Result<()> {
        self.only_owner(caller)?;
        self.config.platform_fee = fee;
        Ok(())
    }

    pub fn set_treasury(&mut self, caller: Address, treasury: Address) -> Result<()> {
        self.only_owner(caller)?;
        self.config.treasury = treasury;
        Ok(())
    }

    /// two-step ownership transfer, step one
    pub fn transfer_ownership(&mut self, caller: Address, new_owner: Address) -> Result<()> {
        self.only_owner(caller)?;
        if new_owner.is_zero() {
            return Err(PoolError::InvalidRecipient);
        }
        self.pending_owner = Some(new_owner);
        self.record(PoolEvent::OwnershipProposed { to: new_owner });
        Ok(())
    }

    /// two-step ownership transfer, step two: the proposed owner accepts
    pub fn accept_ownership(&mut self, caller: Address) -> Result<()> {
        if self.pending_owner != Some(caller) {
            return Err(PoolError::NotPendingOwner);
        }
        let previous = self.owner;
        self.owner = caller;
        self.pending_owner = None;
        self.record(PoolEvent::OwnershipTransferred { from: previous, to: caller });
        Ok(())
    }

    // ---- queries ----

    pub fn balance(&self, token: &TokenId) -> Amount {
        self.balances.get(token)
    }

    pub fn latest_root(&self) -> Fe {
        self.tree.latest_root()
    }

    pub fn is_known_root(&self, root: &Fe) -> bool {
        self.tree.is_known_root(root)
    }

    pub fn is_spent(&self, nullifier: &Fe) -> bool {
        self.nullifiers.is_spent(nullifier)
    }

    pub fn is_token_supported(&self, token: &TokenId) -> bool {
        self.policy.is_supported(token)
    }

    pub fn is_relayer_permitted(&self, relayer: &Address) -> bool {
        self.relayers.permits(relayer)
    }

    pub fn next_leaf_index(&self) -> u64 {
        self.tree.next_leaf_index()
    }

    pub fn owner(&self) -> Address {
        self.owner
    }

    pub fn config(&self) -> &LedgerConfig {
        &self.config
    }

    pub fn events(&self) -> &[EventRecord] {
        &self.events
    }

    /// hand accumulated events to the indexing sink
    pub fn drain_events(&mut self) -> Vec<EventRecord> {
        std::mem::take(&mut self.events)
    }

    pub fn bank(&self) -> &B {
        &self.bank
    }

    pub fn bank_mut(&mut self) -> &mut B {
        &mut self.bank
    }

    pub(crate) fn verifier_handle(&self) -> Arc<dyn ProofVerifier> {
        Arc::clone(&self.verifier)
    }

    // ---- precondition helpers ----

    fn only_owner(&self, caller: Address) -> Result<()> {
        if caller != self.owner {
            return Err(PoolError::NotOwner);
        }
        Ok(())
    }

    /// relay-fee staging behind the router: a non-zero relayer must be
    /// permitted before its fee payout is staged
    fn stage_fee(&self, token: TokenId, relayer: Address, fee: Amount) -> Result<Option<Payout>> {
        if !relayer.is_zero() && !self.relayers.permits(&relayer) {
            return Err(PoolError::RelayerNotApproved);
        }
        stage_relay_fee(token, relayer, fee)
    }

    fn check_known_root(&self, root: Fe) -> Result<()> {
        if !self.tree.is_known_root(&root) {
            return Err(PoolError::UnknownRoot);
        }
        Ok(())
    }

    fn check_unspent(&self, nullifier: Fe) -> Result<()> {
        if self.nullifiers.is_spent(&nullifier) {
            return Err(PoolError::NullifierAlreadySpent);
        }
        Ok(())
    }

    fn check_fresh_commitment(&self, commitment: Fe) -> Result<()> {
        // zero is the empty-leaf padding value and can never be a note
        if commitment.is_zero() || self.commitments.is_seen(&commitment) {
            return Err(PoolError::DuplicateCommitment);
        }
        Ok(())
    }

    /// filter zero slots, reject duplicates and collisions, check capacity
    fn check_outputs(&self, candidates: &[Fe], memo_count: usize) -> Result<Vec<Fe>> {
        let outs: Vec<Fe> = candidates.iter().copied().filter(|c| !c.is_zero()).collect();
        for (i, out) in outs.iter().enumerate() {
            if self.commitments.is_seen(out) {
                return Err(PoolError::DuplicateCommitment);
            }
            if outs[..i].contains(out) {
                return Err(PoolError::DuplicateCommitment);
            }
        }
        // memos attach to actual outputs, not to empty slots
        if memo_count > outs.len() {
            return Err(PoolError::BatchSizeMismatch);
        }
        if self.tree.remaining() < outs.len() as u64 {
            return Err(PoolError::MerkleTreeFull);
        }
        Ok(outs)
    }

    /// shared per-input precondition pass for batch and multi-input
    /// spends: every root known, every nullifier unspent and pairwise
    /// distinct. runs entirely before any mutation.
    fn check_batch_inputs(&self, items: impl Iterator<Item = (Fe, Fe)>) -> Result<()> {
        let mut in_batch = HashSet::new();
        for (root, nullifier) in items {
            self.check_known_root(root)?;
            self.check_unspent(nullifier)?;
            if !in_batch.insert(nullifier) {
                return Err(PoolError::NullifierAlreadySpent);
            }
        }
        Ok(())
    }

    fn check_batch_fee(&self, batch_size: usize, total_fee: Amount) -> Result<Amount> {
        if batch_size == 0 {
            return Err(PoolError::BatchSizeMismatch);
        }
        if batch_size > self.config.max_batch {
            return Err(PoolError::BatchSizeTooLarge);
        }
        // reject non-exact division instead of leaking rounding remainders
        if total_fee.0 % batch_size as u128 != 0 {
            return Err(PoolError::InvalidAmount);
        }
        Ok(Amount::new(total_fee.0 / batch_size as u128))
    }

    fn check_swap_rate(&self, req: &SwapRequest) -> Result<()> {
        let quote = self
            .oracle
            .expected_out(&req.token_in, &req.token_out, req.swap_amount)
            .ok_or(PoolError::InvalidSwapRate)?;
        let max_out = quote
            .0
            .checked_mul(BPS + self.config.slippage_bps as u128)
            .map(|v| v / BPS)
            .ok_or(PoolError::InvalidSwapRate)?;
        if req.output_amount.0 > max_out {
            debug!(
                claimed = %req.output_amount,
                quote = %quote,
                max_out,
                "swap rate outside tolerance"
            );
            return Err(PoolError::InvalidSwapRate);
        }
        Ok(())
    }

    fn check_proof(&self, kind: ProofKind, proof: &[u8], public: &[Fe]) -> Result<()> {
        if !self.verifier.verify(kind, proof, public) {
            return Err(PoolError::InvalidProof);
        }
        Ok(())
    }

    // ---- mutation helpers (preconditions already checked) ----

    fn insert_leaf(&mut self, leaf: Fe) -> Result<InsertedLeaf> {
        self.commitments.mark_seen(leaf)?;
        let index = self.tree.insert(leaf)?;
        let root = self.tree.latest_root();
        self.events.push(EventRecord {
            at: Utc::now().timestamp(),
            event: PoolEvent::LeafInserted { leaf, index, root },
        });
        Ok((leaf, index))
    }

    fn insert_leaves(&mut self, leaves: &[Fe]) -> Result<Vec<InsertedLeaf>> {
        leaves.iter().map(|leaf| self.insert_leaf(*leaf)).collect()
    }

    fn record(&mut self, event: PoolEvent) {
        self.events.push(EventRecord { at: Utc::now().timestamp(), event });
    }
}
