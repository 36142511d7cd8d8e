//! proof verifier capability
//!
//! the pool treats zk verification as an opaque boolean oracle: one
//! verifier per operation kind, each with a fixed public-input arity.
//! the ledger never interprets proofs, it only binds the public-input
//! vector and trusts the circuit for value conservation.

use caligo_merkle::Fe;

use crate::types::{Address, Amount, TokenId};

/// operation kinds with distinct circuits
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ProofKind {
    Transfer,
    Unshield,
    Swap,
    MultiTransfer,
}

/// opaque accept/reject capability
///
/// implementations must be pure: same (kind, proof, inputs) always
/// gives the same answer, no side effects. verification may be slow
/// and is safe to run outside the ledger's critical section.
pub trait ProofVerifier: Send + Sync {
    fn verify(&self, kind: ProofKind, proof: &[u8], public_inputs: &[Fe]) -> bool;
}

/// deterministic stub verifier for exercising ledger logic without
/// real circuit arithmetic
#[derive(Clone, Copy, Debug)]
pub struct StaticVerifier {
    accept: bool,
}

impl StaticVerifier {
    pub fn accepting() -> Self {
        Self { accept: true }
    }

    pub fn rejecting() -> Self {
        Self { accept: false }
    }
}

impl ProofVerifier for StaticVerifier {
    fn verify(&self, _kind: ProofKind, _proof: &[u8], _public_inputs: &[Fe]) -> bool {
        self.accept
    }
}

/// public-input vector builders
///
/// the exact layouts are part of the protocol: proofs are generated
/// against them, and substituting any field after proof generation
/// must invalidate the proof
pub mod inputs {
    use super::*;

    /// maximum inputs for a multi-input transfer proof
    pub const MAX_MULTI_INPUTS: usize = 8;

    pub fn address_fe(addr: &Address) -> Fe {
        Fe::reduce(&addr.0)
    }

    pub fn token_fe(token: &TokenId) -> Fe {
        Fe::reduce(&token.0)
    }

    pub fn amount_fe(amount: Amount) -> Fe {
        Fe::from_u128(amount.0)
    }

    /// `[root, nullifier, out1, out2, relayer, fee]`
    pub fn transfer(
        root: Fe,
        nullifier: Fe,
        out1: Fe,
        out2: Fe,
        relayer: &Address,
        fee: Amount,
    ) -> Vec<Fe> {
        vec![root, nullifier, out1, out2, address_fe(relayer), amount_fe(fee)]
    }

    /// `[root, nullifier, token, recipient, amount, change, relayer, fee]`
    ///
    /// the change commitment is bound here so a caller cannot swap in a
    /// different change note after proof generation
    #[allow(clippy::too_many_arguments)]
    pub fn unshield(
        root: Fe,
        nullifier: Fe,
        token: &TokenId,
        recipient: &Address,
        amount: Amount,
        change: Fe,
        relayer: &Address,
        fee: Amount,
    ) -> Vec<Fe> {
        vec![
            root,
            nullifier,
            token_fe(token),
            address_fe(recipient),
            amount_fe(amount),
            change,
            address_fe(relayer),
            amount_fe(fee),
        ]
    }

    /// `[root, nullifier, out, change, token_in, token_out, swap_amount, output_amount]`
    #[allow(clippy::too_many_arguments)]
    pub fn swap(
        root: Fe,
        nullifier: Fe,
        out: Fe,
        change: Fe,
        token_in: &TokenId,
        token_out: &TokenId,
        swap_amount: Amount,
        output_amount: Amount,
    ) -> Vec<Fe> {
        vec![
            root,
            nullifier,
            out,
            change,
            token_fe(token_in),
            token_fe(token_out),
            amount_fe(swap_amount),
            amount_fe(output_amount),
        ]
    }

    /// fixed-arity multi-input layout: roots and nullifiers zero-padded
    /// to [`MAX_MULTI_INPUTS`], then `[out1, out2, relayer, fee, count]`
    pub fn multi_transfer(
        roots: &[Fe],
        nullifiers: &[Fe],
        out1: Fe,
        out2: Fe,
        relayer: &Address,
        fee: Amount,
    ) -> Vec<Fe> {
        debug_assert_eq!(roots.len(), nullifiers.len());
        debug_assert!(roots.len() <= MAX_MULTI_INPUTS);

        let mut v = Vec::with_capacity(2 * MAX_MULTI_INPUTS + 5);
        v.extend_from_slice(roots);
        v.resize(MAX_MULTI_INPUTS, Fe::ZERO);
        v.extend_from_slice(nullifiers);
        v.resize(2 * MAX_MULTI_INPUTS, Fe::ZERO);
        v.push(out1);
        v.push(out2);
        v.push(address_fe(relayer));
        v.push(amount_fe(fee));
        v.push(Fe::from_u64(roots.len() as u64));
        v
    }
}

#[cfg(test)]
mod tests {
    use super::inputs::*;
    use super::*;

    #[test]
    fn static_verifier() {
        let accept = StaticVerifier::accepting();
        let reject = StaticVerifier::rejecting();
        assert!(accept.verify(ProofKind::Transfer, b"", &[]));
        assert!(!reject.verify(ProofKind::Transfer, b"", &[]));
    }

    #[test]
    fn transfer_layout() {
        let v = transfer(
            Fe::from_u64(1),
            Fe::from_u64(2),
            Fe::from_u64(3),
            Fe::from_u64(4),
            &Address::ZERO,
            Amount::new(5),
        );
        assert_eq!(v.len(), 6);
        assert_eq!(v[0], Fe::from_u64(1));
        assert_eq!(v[5], Fe::from_u64(5));
    }

    #[test]
    fn multi_transfer_layout_is_fixed_arity() {
        let roots = [Fe::from_u64(1), Fe::from_u64(2)];
        let nfs = [Fe::from_u64(3), Fe::from_u64(4)];
        let v = multi_transfer(
            &roots,
            &nfs,
            Fe::from_u64(5),
            Fe::from_u64(6),
            &Address::ZERO,
            Amount::ZERO,
        );
        assert_eq!(v.len(), 2 * MAX_MULTI_INPUTS + 5);
        // zero padding after the real entries
        assert_eq!(v[2], Fe::ZERO);
        assert_eq!(v[MAX_MULTI_INPUTS], Fe::from_u64(3));
        // trailing count
        assert_eq!(v[2 * MAX_MULTI_INPUTS + 4], Fe::from_u64(2));
    }

    #[test]
    fn changing_the_change_commitment_changes_inputs() {
        let token = TokenId::derive(b"t");
        let mk = |change: Fe| {
            unshield(
                Fe::from_u64(1),
                Fe::from_u64(2),
                &token,
                &Address::from_bytes([9u8; 32]),
                Amount::new(60),
                change,
                &Address::ZERO,
                Amount::ZERO,
            )
        };
        assert_ne!(mk(Fe::from_u64(10)), mk(Fe::from_u64(11)));
    }
}
