//! shared fixtures for pool integration tests

use std::sync::Arc;

use caligo_pool::{
    Address, Amount, Fe, FixedQuote, Ledger, LedgerConfig, MockBank, ProofVerifier,
    ShieldRequest, StaticVerifier, TokenId,
};

pub const OWNER: Address = Address([0xAA; 32]);
pub const ALICE: Address = Address([0x01; 32]);
pub const BOB: Address = Address([0x02; 32]);
pub const RELAYER: Address = Address([0x03; 32]);

pub fn token_x() -> TokenId {
    TokenId::derive(b"token-x")
}

pub fn token_y() -> TokenId {
    TokenId::derive(b"token-y")
}

pub fn ledger_with(
    config: LedgerConfig,
    verifier: impl ProofVerifier + 'static,
    quote: FixedQuote,
) -> Ledger<MockBank> {
    Ledger::new(
        config,
        Arc::new(verifier),
        Box::new(quote),
        MockBank::new(),
        OWNER,
    )
    .unwrap()
}

/// accepting verifier, default config, token-x pre-added
pub fn default_ledger() -> Ledger<MockBank> {
    let mut ledger = ledger_with(
        LedgerConfig::default(),
        StaticVerifier::accepting(),
        FixedQuote::new(),
    );
    ledger.add_supported_token(OWNER, token_x()).unwrap();
    ledger
}

/// fund `from` and shield `amount` of `token` under `commitment`
pub fn shield(
    ledger: &mut Ledger<MockBank>,
    from: Address,
    token: TokenId,
    amount: u128,
    commitment: Fe,
) -> u64 {
    ledger.bank_mut().credit(from, token, Amount::new(amount));
    ledger
        .shield(&ShieldRequest {
            from,
            token,
            amount: Amount::new(amount),
            commitment,
        })
        .unwrap()
        .leaf_index
}
