//! token support and relayer routing policy
//!
//! per token: "currently supported" gates new shield/swap inflow,
//! "ever supported" gates unshield. the ever-supported bit is a
//! monotone append-only set - once a token has accepted deposits, the
//! operator can stop new inflow but can never trap already-shielded
//! funds by revoking support.
//!
//! relayer routing: an empty approval table means open relaying; once
//! any relayer is approved, fee payouts only route to approved ones.

use std::collections::{HashMap, HashSet};

use crate::types::{Address, TokenId};

#[derive(Clone, Copy, Debug, Default)]
struct TokenRecord {
    supported: bool,
    ever_supported: bool,
    blacklisted: bool,
}

/// token support and blacklist state
#[derive(Clone, Debug, Default)]
pub struct TokenPolicy {
    records: HashMap<TokenId, TokenRecord>,
}

impl TokenPolicy {
    pub fn new() -> Self {
        Self::default()
    }

    /// accept a token for new inflow; sets the ever-supported bit
    pub fn add_supported(&mut self, token: TokenId) {
        let rec = self.records.entry(token).or_default();
        rec.supported = true;
        rec.ever_supported = true;
    }

    /// stop accepting new inflow; the ever-supported bit survives
    pub fn remove_supported(&mut self, token: TokenId) {
        if let Some(rec) = self.records.get_mut(&token) {
            rec.supported = false;
        }
    }

    /// mark the token as having held shielded funds
    pub fn mark_ever_supported(&mut self, token: TokenId) {
        self.records.entry(token).or_default().ever_supported = true;
    }

    pub fn set_blacklisted(&mut self, token: TokenId, blacklisted: bool) {
        self.records.entry(token).or_default().blacklisted = blacklisted;
    }

    pub fn is_supported(&self, token: &TokenId) -> bool {
        self.records.get(token).map_or(false, |r| r.supported)
    }

    pub fn was_ever_supported(&self, token: &TokenId) -> bool {
        self.records.get(token).map_or(false, |r| r.ever_supported)
    }

    pub fn is_blacklisted(&self, token: &TokenId) -> bool {
        self.records.get(token).map_or(false, |r| r.blacklisted)
    }
}

/// owner-configured routing table for relay fees
///
/// self-relay (zero relayer, zero fee) never consults this table
#[derive(Clone, Debug, Default)]
pub struct RelayerRouter {
    approved: HashSet<Address>,
}

impl RelayerRouter {
    pub fn new() -> Self {
        Self::default()
    }

    /// returns false if the relayer was already approved
    pub fn approve(&mut self, relayer: Address) -> bool {
        self.approved.insert(relayer)
    }

    /// returns false if the relayer was not approved
    pub fn revoke(&mut self, relayer: &Address) -> bool {
        self.approved.remove(relayer)
    }

    /// no approvals configured: any relayer may claim fees
    pub fn is_open(&self) -> bool {
        self.approved.is_empty()
    }

    pub fn permits(&self, relayer: &Address) -> bool {
        self.is_open() || self.approved.contains(relayer)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ever_supported_is_monotone() {
        let mut policy = TokenPolicy::new();
        let token = TokenId::derive(b"usdc");

        assert!(!policy.is_supported(&token));
        assert!(!policy.was_ever_supported(&token));

        policy.add_supported(token);
        assert!(policy.is_supported(&token));
        assert!(policy.was_ever_supported(&token));

        policy.remove_supported(token);
        assert!(!policy.is_supported(&token));
        // the whole point: revoking support cannot clear this
        assert!(policy.was_ever_supported(&token));
    }

    #[test]
    fn blacklist_is_independent_of_support() {
        let mut policy = TokenPolicy::new();
        let token = TokenId::derive(b"dot");

        policy.add_supported(token);
        policy.set_blacklisted(token, true);
        assert!(policy.is_supported(&token));
        assert!(policy.is_blacklisted(&token));

        policy.set_blacklisted(token, false);
        assert!(!policy.is_blacklisted(&token));
    }

    #[test]
    fn remove_unknown_token_is_noop() {
        let mut policy = TokenPolicy::new();
        policy.remove_supported(TokenId::derive(b"ghost"));
        assert!(!policy.was_ever_supported(&TokenId::derive(b"ghost")));
    }

    #[test]
    fn empty_router_permits_everyone() {
        let router = RelayerRouter::new();
        assert!(router.is_open());
        assert!(router.permits(&Address::from_bytes([7u8; 32])));
    }

    #[test]
    fn approvals_close_the_router() {
        let mut router = RelayerRouter::new();
        let approved = Address::from_bytes([1u8; 32]);
        let other = Address::from_bytes([2u8; 32]);

        assert!(router.approve(approved));
        assert!(!router.approve(approved));
        assert!(!router.is_open());
        assert!(router.permits(&approved));
        assert!(!router.permits(&other));

        // revoking the last approval reopens relaying
        assert!(router.revoke(&approved));
        assert!(router.permits(&other));
    }
}
