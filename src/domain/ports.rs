use super::balance::Balance;
use super::card::{Card, CardId, OwnerId};
use super::lifecycle::CardStatus;
use crate::crypto::EncryptedBlob;
use crate::error::Result;
use async_trait::async_trait;

/// Persistence boundary for cards.
///
/// Implementations own the encrypted representation of card numbers: they
/// seal on insert and open on every read, using the cipher handle they were
/// constructed with. Writes are version-checked; a stale `Card::version`
/// fails with `CardError::ConcurrentModification`.
#[async_trait]
pub trait CardRepository: Send + Sync {
    async fn find_by_id(&self, id: CardId) -> Result<Option<Card>>;

    async fn find_by_id_and_owner(&self, id: CardId, owner: OwnerId) -> Result<Option<Card>>;

    async fn find_all(&self, filter: &CardFilter) -> Result<Vec<Card>>;

    /// Existence oracle: is this exact blob already stored?
    async fn exists_by_encrypted_number(&self, blob: &EncryptedBlob) -> Result<bool>;

    /// Persists a new card whose number was sealed as `number`.
    ///
    /// The blob is stored as given, never re-encrypted. The existence check
    /// and the write happen as one unit; a blob that is already present
    /// fails with `CardError::DuplicateNumber`.
    async fn insert(&self, card: Card, number: EncryptedBlob) -> Result<Card>;

    /// Updates status and balance of an existing card.
    async fn save(&self, card: Card) -> Result<Card>;

    /// Updates both cards, or neither.
    async fn save_atomically(&self, first: Card, second: Card) -> Result<(Card, Card)>;

    async fn sum_balance_by_owner(&self, owner: OwnerId) -> Result<Balance>;

    /// Removes a card; returns false when it did not exist.
    async fn delete(&self, id: CardId) -> Result<bool>;
}

pub type CardRepositoryBox = Box<dyn CardRepository>;

/// Optional criteria for listing cards. Balance bounds are inclusive.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CardFilter {
    pub owner: Option<OwnerId>,
    pub status: Option<CardStatus>,
    pub min_balance: Option<Balance>,
    pub max_balance: Option<Balance>,
}

impl CardFilter {
    pub fn owned_by(mut self, owner: OwnerId) -> Self {
        self.owner = Some(owner);
        self
    }

    pub fn with_status(mut self, status: CardStatus) -> Self {
        self.status = Some(status);
        self
    }

    pub fn with_min_balance(mut self, min: Balance) -> Self {
        self.min_balance = Some(min);
        self
    }

    pub fn with_max_balance(mut self, max: Balance) -> Self {
        self.max_balance = Some(max);
        self
    }

    pub fn matches(&self, card: &Card) -> bool {
        self.owner.is_none_or(|owner| card.owner == owner)
            && self.status.is_none_or(|status| card.status == status)
            && self.min_balance.is_none_or(|min| card.balance >= min)
            && self.max_balance.is_none_or(|max| card.balance <= max)
    }
}
