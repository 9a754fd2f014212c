use super::record::CardRecord;
use crate::crypto::{CardCipher, EncryptedBlob};
use crate::domain::balance::Balance;
use crate::domain::card::{Card, CardId, OwnerId};
use crate::domain::ports::{CardFilter, CardRepository};
use crate::error::{CardError, Result};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

#[derive(Default)]
struct Tables {
    cards: HashMap<CardId, CardRecord>,
    /// Unique index over sealed numbers.
    numbers: HashMap<EncryptedBlob, CardId>,
}

/// A thread-safe in-memory card store.
///
/// Every mutation runs under a single write lock, which makes the
/// check-then-insert of `insert` and the pairwise write of `save_atomically`
/// all-or-nothing. Ideal for testing or for runs where persistence is not
/// required.
#[derive(Clone)]
pub struct InMemoryCardRepository {
    cipher: Arc<CardCipher>,
    tables: Arc<RwLock<Tables>>,
}

impl InMemoryCardRepository {
    /// Creates a new, empty store sealing numbers with `cipher`.
    pub fn new(cipher: Arc<CardCipher>) -> Self {
        Self {
            cipher,
            tables: Arc::new(RwLock::new(Tables::default())),
        }
    }
}

#[async_trait]
impl CardRepository for InMemoryCardRepository {
    async fn find_by_id(&self, id: CardId) -> Result<Option<Card>> {
        let tables = self.tables.read().await;
        tables
            .cards
            .get(&id)
            .map(|record| record.open(&self.cipher))
            .transpose()
    }

    async fn find_by_id_and_owner(&self, id: CardId, owner: OwnerId) -> Result<Option<Card>> {
        let tables = self.tables.read().await;
        tables
            .cards
            .get(&id)
            .filter(|record| record.owner == owner)
            .map(|record| record.open(&self.cipher))
            .transpose()
    }

    async fn find_all(&self, filter: &CardFilter) -> Result<Vec<Card>> {
        let tables = self.tables.read().await;
        let mut cards = Vec::new();
        for record in tables.cards.values() {
            let card = record.open(&self.cipher)?;
            if filter.matches(&card) {
                cards.push(card);
            }
        }
        cards.sort_by_key(|card| card.id);
        Ok(cards)
    }

    async fn exists_by_encrypted_number(&self, blob: &EncryptedBlob) -> Result<bool> {
        let tables = self.tables.read().await;
        Ok(tables.numbers.contains_key(blob))
    }

    async fn insert(&self, card: Card, number: EncryptedBlob) -> Result<Card> {
        let mut tables = self.tables.write().await;
        if tables.numbers.contains_key(&number) {
            return Err(CardError::DuplicateNumber);
        }
        if tables.cards.contains_key(&card.id) {
            return Err(CardError::ConcurrentModification(card.id));
        }

        let record = CardRecord::seal(&card, number.clone());
        tables.numbers.insert(number, card.id);
        tables.cards.insert(card.id, record.clone());

        Ok(Card {
            version: record.version,
            ..card
        })
    }

    async fn save(&self, card: Card) -> Result<Card> {
        let mut tables = self.tables.write().await;
        let record = tables
            .cards
            .get_mut(&card.id)
            .ok_or_else(|| CardError::NotFound(format!("card {}", card.id)))?;
        record.apply(&card)?;
        Ok(Card {
            version: record.version,
            ..card
        })
    }

    async fn save_atomically(&self, first: Card, second: Card) -> Result<(Card, Card)> {
        if first.id == second.id {
            return Err(CardError::InvalidRequest(
                "Atomic save needs two distinct cards".to_string(),
            ));
        }

        let mut tables = self.tables.write().await;
        let mut staged = Vec::with_capacity(2);
        for card in [&first, &second] {
            let mut record = tables
                .cards
                .get(&card.id)
                .cloned()
                .ok_or_else(|| CardError::NotFound(format!("card {}", card.id)))?;
            record.apply(card)?;
            staged.push(record);
        }

        // Both versions checked out; commit.
        let versions = (staged[0].version, staged[1].version);
        for record in staged {
            tables.cards.insert(record.id, record);
        }

        Ok((
            Card {
                version: versions.0,
                ..first
            },
            Card {
                version: versions.1,
                ..second
            },
        ))
    }

    async fn sum_balance_by_owner(&self, owner: OwnerId) -> Result<Balance> {
        let tables = self.tables.read().await;
        Balance::total(
            tables
                .cards
                .values()
                .filter(|record| record.owner == owner)
                .map(|record| record.balance),
        )
    }

    async fn delete(&self, id: CardId) -> Result<bool> {
        let mut tables = self.tables.write().await;
        match tables.cards.remove(&id) {
            Some(record) => {
                tables.numbers.remove(&record.number);
                Ok(true)
            }
            None => Ok(false),
        }
    }
}
