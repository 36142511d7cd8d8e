//! concurrent admission front for the ledger
//!
//! the ledger is a single-writer state machine; this wrapper gives it
//! linearizable concurrent admission. proof verification is CPU-bound
//! and side-effect free, so it runs outside the mutex; preconditions
//! are re-checked and all effects applied inside one critical section.
//! two submissions racing on the same nullifier therefore see exactly
//! one success and one `NullifierAlreadySpent`.

use std::sync::{Arc, Mutex, MutexGuard};

use tracing::warn;

use caligo_merkle::Fe;

use crate::bank::Bank;
use crate::error::{PoolError, Result};
use crate::ledger::{
    BatchTransferRequest, BatchUnshieldRequest, Ledger, MultiTransferRequest, ShieldRequest,
    ShieldReceipt, SwapReceipt, SwapRequest, TransferReceipt, TransferRequest, UnshieldReceipt,
    UnshieldRequest,
};
use crate::verifier::{inputs, ProofKind, ProofVerifier};

pub struct PoolService<B: Bank> {
    ledger: Arc<Mutex<Ledger<B>>>,
    verifier: Arc<dyn ProofVerifier>,
}

impl<B: Bank> Clone for PoolService<B> {
    fn clone(&self) -> Self {
        Self {
            ledger: Arc::clone(&self.ledger),
            verifier: Arc::clone(&self.verifier),
        }
    }
}

impl<B: Bank> PoolService<B> {
    pub fn new(ledger: Ledger<B>) -> Self {
        let verifier = ledger.verifier_handle();
        Self {
            ledger: Arc::new(Mutex::new(ledger)),
            verifier,
        }
    }

    fn lock(&self) -> MutexGuard<'_, Ledger<B>> {
        // mutation sections never panic mid-write (all fallible steps
        // precede them), so a poisoned guard is safe to take over
        self.ledger.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn check(&self, kind: ProofKind, proof: &[u8], public: &[Fe]) -> Result<()> {
        if !self.verifier.verify(kind, proof, public) {
            warn!(?kind, "proof rejected before admission");
            return Err(PoolError::InvalidProof);
        }
        Ok(())
    }

    /// run a closure against the locked ledger (queries, admin calls)
    pub fn with_ledger<R>(&self, f: impl FnOnce(&mut Ledger<B>) -> R) -> R {
        f(&mut self.lock())
    }

    pub fn shield(&self, req: &ShieldRequest) -> Result<ShieldReceipt> {
        self.lock().shield(req)
    }

    pub fn transfer(&self, req: &TransferRequest) -> Result<TransferReceipt> {
        let public = inputs::transfer(
            req.root, req.nullifier, req.out1, req.out2, &req.relayer, req.fee,
        );
        self.check(ProofKind::Transfer, &req.proof, &public)?;
        self.lock().transfer_admitted(req)
    }

    pub fn unshield(&self, req: &UnshieldRequest) -> Result<UnshieldReceipt> {
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
        self.check(ProofKind::Unshield, &req.proof, &public)?;
        self.lock().unshield_admitted(req)
    }

    pub fn swap(&self, req: &SwapRequest) -> Result<SwapReceipt> {
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
        self.check(ProofKind::Swap, &req.proof, &public)?;
        self.lock().swap_admitted(req)
    }

    pub fn batch_transfer(&self, req: &BatchTransferRequest) -> Result<TransferReceipt> {
        if let Some(share) = batch_fee_share(req.inputs.len(), req.total_fee.0) {
            for input in &req.inputs {
                let public = inputs::transfer(
                    input.root,
                    input.nullifier,
                    req.out1,
                    req.out2,
                    &req.relayer,
                    crate::types::Amount::new(share),
                );
                self.check(ProofKind::Transfer, &input.proof, &public)?;
            }
        }
        // size/divisibility violations fall through to the ledger's checks
        self.lock().batch_transfer_admitted(req)
    }

    pub fn batch_unshield(&self, req: &BatchUnshieldRequest) -> Result<UnshieldReceipt> {
        if let Some(share) = batch_fee_share(req.inputs.len(), req.total_fee.0) {
            for input in &req.inputs {
                let public = inputs::unshield(
                    input.root,
                    input.nullifier,
                    &req.token,
                    &req.recipient,
                    input.amount,
                    req.change,
                    &req.relayer,
                    crate::types::Amount::new(share),
                );
                self.check(ProofKind::Unshield, &input.proof, &public)?;
            }
        }
        self.lock().batch_unshield_admitted(req)
    }

    pub fn multi_transfer(&self, req: &MultiTransferRequest) -> Result<TransferReceipt> {
        if req.roots.len() == req.nullifiers.len()
            && (2..=inputs::MAX_MULTI_INPUTS).contains(&req.nullifiers.len())
        {
            let public = inputs::multi_transfer(
                &req.roots, &req.nullifiers, req.out1, req.out2, &req.relayer, req.fee,
            );
            self.check(ProofKind::MultiTransfer, &req.proof, &public)?;
        }
        self.lock().multi_transfer_admitted(req)
    }
}

fn batch_fee_share(batch_size: usize, total_fee: u128) -> Option<u128> {
    if batch_size == 0 || total_fee % batch_size as u128 != 0 {
        return None;
    }
    Some(total_fee / batch_size as u128)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;

    use crate::bank::MockBank;
    use crate::ledger::LedgerConfig;
    use crate::oracle::FixedQuote;
    use crate::types::{Address, Amount, TokenId};
    use crate::verifier::StaticVerifier;

    fn service_with_note() -> (PoolService<MockBank>, Fe, Fe) {
        let owner = Address::from_bytes([0xAA; 32]);
        let alice = Address::from_bytes([1u8; 32]);
        let mut bank = MockBank::new();
        bank.credit(alice, TokenId::NATIVE, Amount::new(1000));

        let mut ledger = Ledger::new(
            LedgerConfig::default(),
            Arc::new(StaticVerifier::accepting()),
            Box::new(FixedQuote::new()),
            bank,
            owner,
        )
        .unwrap();
        ledger.add_supported_token(owner, TokenId::NATIVE).unwrap();
        ledger
            .shield(&ShieldRequest {
                from: alice,
                token: TokenId::NATIVE,
                amount: Amount::new(1000),
                commitment: Fe::from_u64(11),
            })
            .unwrap();

        let root = ledger.latest_root();
        let service = PoolService::new(ledger);
        (service, root, Fe::from_u64(77))
    }

    #[test]
    fn racing_spends_of_one_nullifier_admit_exactly_one() {
        let (service, root, nullifier) = service_with_note();

        let mut handles = Vec::new();
        for i in 0..8u64 {
            let service = service.clone();
            handles.push(thread::spawn(move || {
                service.transfer(&TransferRequest {
                    proof: vec![],
                    root,
                    nullifier,
                    out1: Fe::from_u64(1000 + i),
                    out2: Fe::ZERO,
                    relayer: Address::ZERO,
                    fee: Amount::ZERO,
                    memos: vec![],
                })
            }));
        }

        let results: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();
        let successes = results.iter().filter(|r| r.is_ok()).count();
        let double_spends = results
            .iter()
            .filter(|r| matches!(r, Err(PoolError::NullifierAlreadySpent)))
            .count();

        assert_eq!(successes, 1);
        assert_eq!(double_spends, results.len() - 1);
    }

    #[test]
    fn rejected_proof_never_takes_the_lock_path() {
        let owner = Address::from_bytes([0xAA; 32]);
        let ledger = Ledger::new(
            LedgerConfig::default(),
            Arc::new(StaticVerifier::rejecting()),
            Box::new(FixedQuote::new()),
            MockBank::new(),
            owner,
        )
        .unwrap();
        let root = ledger.latest_root();
        let service = PoolService::new(ledger);

        let result = service.transfer(&TransferRequest {
            proof: vec![],
            root,
            nullifier: Fe::from_u64(1),
            out1: Fe::from_u64(2),
            out2: Fe::ZERO,
            relayer: Address::ZERO,
            fee: Amount::ZERO,
            memos: vec![],
        });
        assert_eq!(result, Err(PoolError::InvalidProof));
        service.with_ledger(|l| assert!(!l.is_spent(&Fe::from_u64(1))));
    }
}
