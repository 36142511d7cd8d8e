//! aggregate balances and fee settlement
//!
//! per-token aggregate custody accounting: sum of everything ever
//! shielded in, minus everything unshielded or paid out as fees. the
//! ledger checks liquidity explicitly before every decrement, so a
//! `BalanceUnderflow` out of [`Balances::debit`] is an invariant
//! violation, not a user error.

use std::collections::HashMap;

use crate::bank::Payout;
use crate::error::{PoolError, Result};
use crate::types::{Address, Amount, TokenId};

/// per-token aggregate shielded balances
#[derive(Clone, Debug, Default)]
pub struct Balances {
    by_token: HashMap<TokenId, u128>,
}

impl Balances {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, token: &TokenId) -> Amount {
        Amount::new(self.by_token.get(token).copied().unwrap_or(0))
    }

    pub fn credit(&mut self, token: TokenId, amount: Amount) -> Result<()> {
        let balance = self.by_token.entry(token).or_default();
        *balance = balance
            .checked_add(amount.0)
            .ok_or(PoolError::InvalidAmount)?;
        Ok(())
    }

    /// never clamps: decrementing below zero is a hard failure
    pub fn debit(&mut self, token: TokenId, amount: Amount) -> Result<()> {
        let balance = self.by_token.entry(token).or_default();
        *balance = balance
            .checked_sub(amount.0)
            .ok_or(PoolError::BalanceUnderflow)?;
        Ok(())
    }

    /// liquidity precondition for payouts
    pub fn covers(&self, token: &TokenId, amount: Amount) -> bool {
        self.get(token) >= amount
    }
}

/// validate a relay fee and stage its payout
///
/// a zero relayer address means self-relay: the fee must be zero, and
/// a non-zero fee is rejected rather than silently burned
pub fn stage_relay_fee(token: TokenId, relayer: Address, fee: Amount) -> Result<Option<Payout>> {
    if relayer.is_zero() {
        if !fee.is_zero() {
            return Err(PoolError::InvalidRecipient);
        }
        return Ok(None);
    }
    if fee.is_zero() {
        return Ok(None);
    }
    Ok(Some(Payout { to: relayer, token, amount: fee }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn debit_never_clamps() {
        let mut balances = Balances::new();
        balances.credit(TokenId::NATIVE, Amount::new(50)).unwrap();
        assert_eq!(
            balances.debit(TokenId::NATIVE, Amount::new(51)),
            Err(PoolError::BalanceUnderflow)
        );
        // the failed debit left the balance untouched
        assert_eq!(balances.get(&TokenId::NATIVE), Amount::new(50));

        balances.debit(TokenId::NATIVE, Amount::new(50)).unwrap();
        assert_eq!(balances.get(&TokenId::NATIVE), Amount::ZERO);
    }

    #[test]
    fn fee_to_zero_relayer_is_rejected_not_burned() {
        assert_eq!(
            stage_relay_fee(TokenId::NATIVE, Address::ZERO, Amount::new(1)),
            Err(PoolError::InvalidRecipient)
        );
        assert_eq!(
            stage_relay_fee(TokenId::NATIVE, Address::ZERO, Amount::ZERO),
            Ok(None)
        );
    }

    #[test]
    fn staged_fee_targets_relayer() {
        let relayer = Address::from_bytes([7u8; 32]);
        let staged = stage_relay_fee(TokenId::NATIVE, relayer, Amount::new(9)).unwrap();
        assert_eq!(
            staged,
            Some(Payout { to: relayer, token: TokenId::NATIVE, amount: Amount::new(9) })
        );
        // zero fee with a relayer set stages nothing
        assert_eq!(stage_relay_fee(TokenId::NATIVE, relayer, Amount::ZERO), Ok(None));
    }
}
