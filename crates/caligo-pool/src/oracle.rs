//! swap quote capability
//!
//! price discovery is external; the ledger only needs an expected
//! output for a (token_in, token_out, amount) triple to bound the
//! exchange rate a prover may claim. a malicious prover claiming an
//! absurd rate is rejected here even if the circuit would accept it.

use std::collections::HashMap;

use crate::types::{Amount, TokenId};

pub trait SwapQuote: Send + Sync {
    /// expected output amount for a swap, or `None` when the pair is
    /// unpriced (which rejects the swap)
    fn expected_out(&self, token_in: &TokenId, token_out: &TokenId, amount_in: Amount)
        -> Option<Amount>;
}

/// fixed rational rates per pair, for tests and closed deployments
#[derive(Clone, Debug, Default)]
pub struct FixedQuote {
    /// (token_in, token_out) -> (numerator, denominator)
    rates: HashMap<(TokenId, TokenId), (u128, u128)>,
}

impl FixedQuote {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_rate(&mut self, token_in: TokenId, token_out: TokenId, num: u128, den: u128) {
        assert!(den != 0, "rate denominator must be non-zero");
        self.rates.insert((token_in, token_out), (num, den));
    }
}

impl SwapQuote for FixedQuote {
    fn expected_out(
        &self,
        token_in: &TokenId,
        token_out: &TokenId,
        amount_in: Amount,
    ) -> Option<Amount> {
        let (num, den) = self.rates.get(&(*token_in, *token_out))?;
        amount_in.0.checked_mul(*num).map(|v| Amount::new(v / den))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fixed_quote_rates() {
        let a = TokenId::derive(b"a");
        let b = TokenId::derive(b"b");
        let mut quote = FixedQuote::new();
        quote.set_rate(a, b, 2, 1);

        assert_eq!(quote.expected_out(&a, &b, Amount::new(50)), Some(Amount::new(100)));
        // unpriced pair and unpriced direction reject
        assert_eq!(quote.expected_out(&b, &a, Amount::new(50)), None);
    }
}
