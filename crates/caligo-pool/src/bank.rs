//! value-transfer primitive
//!
//! the pool holds custody of shielded funds in an external bank
//! (native transfers and token pulls on the host chain). the ledger
//! only sees a success signal; any failure maps to `TransferFailed`
//! and aborts the whole operation.

use std::collections::HashMap;

use crate::error::{PoolError, Result};
use crate::types::{Address, Amount, TokenId};

/// one outbound transfer from pool custody
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Payout {
    pub to: Address,
    pub token: TokenId,
    pub amount: Amount,
}

/// custody primitive the ledger settles against
///
/// `payout_all` must be all-or-nothing: either every listed transfer
/// lands or none do. this is what lets a ledger operation treat the
/// payout step as a single fallible action and stay atomic.
pub trait Bank: Send {
    /// pull `amount` of `token` from `from` into pool custody
    fn pull(&mut self, from: Address, token: TokenId, amount: Amount) -> Result<()>;

    /// pay out of pool custody, atomically across all entries
    fn payout_all(&mut self, payouts: &[Payout]) -> Result<()>;
}

/// in-memory bank with failure injection, for tests
#[derive(Clone, Debug, Default)]
pub struct MockBank {
    accounts: HashMap<(Address, TokenId), u128>,
    custody: HashMap<TokenId, u128>,
    fail_payouts: bool,
}

impl MockBank {
    pub fn new() -> Self {
        Self::default()
    }

    /// fund a test account
    pub fn credit(&mut self, account: Address, token: TokenId, amount: Amount) {
        *self.accounts.entry((account, token)).or_default() += amount.0;
    }

    pub fn account_balance(&self, account: Address, token: TokenId) -> Amount {
        Amount::new(self.accounts.get(&(account, token)).copied().unwrap_or(0))
    }

    pub fn custody_balance(&self, token: TokenId) -> Amount {
        Amount::new(self.custody.get(&token).copied().unwrap_or(0))
    }

    /// make every subsequent payout fail, to exercise rollback paths
    pub fn set_fail_payouts(&mut self, fail: bool) {
        self.fail_payouts = fail;
    }
}

impl Bank for MockBank {
    fn pull(&mut self, from: Address, token: TokenId, amount: Amount) -> Result<()> {
        let balance = self.accounts.entry((from, token)).or_default();
        if *balance < amount.0 {
            return Err(PoolError::TransferFailed);
        }
        *balance -= amount.0;
        *self.custody.entry(token).or_default() += amount.0;
        Ok(())
    }

    fn payout_all(&mut self, payouts: &[Payout]) -> Result<()> {
        if self.fail_payouts {
            return Err(PoolError::TransferFailed);
        }

        // validate custody covers every token before touching anything
        let mut needed: HashMap<TokenId, u128> = HashMap::new();
        for p in payouts {
            let total = needed.entry(p.token).or_default();
            *total = total
                .checked_add(p.amount.0)
                .ok_or(PoolError::TransferFailed)?;
        }
        for (token, total) in &needed {
            if self.custody.get(token).copied().unwrap_or(0) < *total {
                return Err(PoolError::TransferFailed);
            }
        }

        for p in payouts {
            *self.custody.entry(p.token).or_default() -= p.amount.0;
            *self.accounts.entry((p.to, p.token)).or_default() += p.amount.0;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pull_moves_funds_into_custody() {
        let mut bank = MockBank::new();
        let alice = Address::from_bytes([1u8; 32]);
        bank.credit(alice, TokenId::NATIVE, Amount::new(100));

        bank.pull(alice, TokenId::NATIVE, Amount::new(60)).unwrap();
        assert_eq!(bank.account_balance(alice, TokenId::NATIVE), Amount::new(40));
        assert_eq!(bank.custody_balance(TokenId::NATIVE), Amount::new(60));

        assert_eq!(
            bank.pull(alice, TokenId::NATIVE, Amount::new(50)),
            Err(PoolError::TransferFailed)
        );
    }

    #[test]
    fn payout_all_is_all_or_nothing() {
        let mut bank = MockBank::new();
        let alice = Address::from_bytes([1u8; 32]);
        let bob = Address::from_bytes([2u8; 32]);
        bank.credit(alice, TokenId::NATIVE, Amount::new(100));
        bank.pull(alice, TokenId::NATIVE, Amount::new(100)).unwrap();

        // second payout overdraws custody: neither lands
        let result = bank.payout_all(&[
            Payout { to: bob, token: TokenId::NATIVE, amount: Amount::new(80) },
            Payout { to: bob, token: TokenId::NATIVE, amount: Amount::new(30) },
        ]);
        assert_eq!(result, Err(PoolError::TransferFailed));
        assert_eq!(bank.account_balance(bob, TokenId::NATIVE), Amount::ZERO);
        assert_eq!(bank.custody_balance(TokenId::NATIVE), Amount::new(100));

        bank.payout_all(&[Payout {
            to: bob,
            token: TokenId::NATIVE,
            amount: Amount::new(100),
        }])
        .unwrap();
        assert_eq!(bank.account_balance(bob, TokenId::NATIVE), Amount::new(100));
    }

    #[test]
    fn injected_payout_failure() {
        let mut bank = MockBank::new();
        bank.set_fail_payouts(true);
        assert_eq!(bank.payout_all(&[]), Err(PoolError::TransferFailed));
    }
}
