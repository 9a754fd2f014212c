use cardvault::application::engine::CardEngine;
use cardvault::config::EngineConfig;
use cardvault::crypto::CardCipher;
use cardvault::domain::balance::Balance;
use cardvault::domain::card::{CardId, Expiry, OwnerId};
use cardvault::domain::lifecycle::Identity;
use cardvault::domain::ports::CardRepositoryBox;
use cardvault::infrastructure::in_memory::InMemoryCardRepository;
use rust_decimal::Decimal;
use std::io::Write;
use std::sync::Arc;
use tempfile::NamedTempFile;

pub const TEST_KEY: &str = "0123456789abcdef0123456789abcdef";

pub fn cipher() -> Arc<CardCipher> {
    Arc::new(CardCipher::new(TEST_KEY.as_bytes()).expect("valid test key"))
}

pub fn engine_over(repository: CardRepositoryBox, config: EngineConfig) -> CardEngine {
    CardEngine::new(repository, cipher(), config).expect("valid config")
}

/// An engine over a fresh in-memory store, plus a handle on that store.
pub fn in_memory_engine() -> (CardEngine, InMemoryCardRepository) {
    let repository = InMemoryCardRepository::new(cipher());
    let engine = engine_over(Box::new(repository.clone()), EngineConfig::default());
    (engine, repository)
}

pub fn admin() -> Identity {
    Identity::admin(OwnerId::new())
}

pub async fn issue_funded(engine: &CardEngine, owner: OwnerId, balance: Decimal) -> CardId {
    engine
        .issue_card_with_balance(
            &admin(),
            owner,
            Expiry::parse("12/30").unwrap(),
            Balance::new(balance).unwrap(),
        )
        .await
        .expect("issuance should succeed")
        .id
}

pub fn write_script(lines: &[&str]) -> NamedTempFile {
    let mut file = NamedTempFile::new().unwrap();
    writeln!(file, "op, user, role, card, to, owner, amount, expiry").unwrap();
    for line in lines {
        writeln!(file, "{line}").unwrap();
    }
    file
}
