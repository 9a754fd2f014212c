use crate::crypto::{CardCipher, EncryptedBlob};
use crate::domain::balance::Balance;
use crate::domain::card::{Card, CardId, CardNumber, Expiry, OwnerId};
use crate::domain::lifecycle::CardStatus;
use crate::error::{CardError, Result};
use serde::{Deserialize, Serialize};

/// The persisted row for a card. The number only ever exists here in
/// sealed form.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CardRecord {
    pub id: CardId,
    pub owner: OwnerId,
    pub number: EncryptedBlob,
    pub expiry: Expiry,
    pub status: CardStatus,
    pub balance: Balance,
    pub version: u64,
}

impl CardRecord {
    /// Builds the first stored version of `card` around an already sealed number.
    pub fn seal(card: &Card, number: EncryptedBlob) -> Self {
        Self {
            id: card.id,
            owner: card.owner,
            number,
            expiry: card.expiry,
            status: card.status,
            balance: card.balance,
            version: 1,
        }
    }

    /// Decrypts the number and rebuilds the domain card.
    pub fn open(&self, cipher: &CardCipher) -> Result<Card> {
        let plaintext = cipher.decrypt(&self.number)?;
        let number = CardNumber::parse(&plaintext).map_err(|_| {
            CardError::CryptoFailure(format!("stored number of card {} is corrupt", self.id))
        })?;
        Ok(Card {
            id: self.id,
            owner: self.owner,
            number,
            expiry: self.expiry,
            status: self.status,
            balance: self.balance,
            version: self.version,
        })
    }

    /// Applies the mutable fields of `card`, enforcing the version check.
    pub fn apply(&mut self, card: &Card) -> Result<()> {
        if card.version != self.version {
            return Err(CardError::ConcurrentModification(self.id));
        }
        self.status = card.status;
        self.balance = card.balance;
        self.version += 1;
        Ok(())
    }
}
