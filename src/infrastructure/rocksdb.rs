use super::record::CardRecord;
use crate::crypto::{CardCipher, EncryptedBlob};
use crate::domain::balance::Balance;
use crate::domain::card::{Card, CardId, OwnerId};
use crate::domain::ports::{CardFilter, CardRepository};
use crate::error::{CardError, Result};
use async_trait::async_trait;
use rocksdb::{ColumnFamily, ColumnFamilyDescriptor, DB, IteratorMode, Options, WriteBatch};
use std::path::Path;
use std::sync::Arc;
use tokio::sync::Mutex;

/// Column Family for card rows, keyed by card id.
pub const CF_CARDS: &str = "cards";
/// Column Family indexing sealed numbers to card ids.
pub const CF_CARD_NUMBERS: &str = "card_numbers";

/// A persistent card store implementation using RocksDB.
///
/// Card rows and the unique number index live in separate Column Families
/// and are always written together through a `WriteBatch`. Writers are
/// serialized by an internal lock so that version checks and the uniqueness
/// check happen in the same unit as the write.
///
/// This struct is thread-safe (`Clone` shares the underlying `Arc<DB>`).
#[derive(Clone)]
pub struct RocksDBCardRepository {
    db: Arc<DB>,
    cipher: Arc<CardCipher>,
    write_lock: Arc<Mutex<()>>,
}

fn internal(message: impl Into<String>) -> CardError {
    CardError::InternalError(Box::new(std::io::Error::other(message.into())))
}

impl RocksDBCardRepository {
    /// Opens or creates a RocksDB instance at the specified path.
    ///
    /// Ensures that the required column families ("cards" and "card_numbers") exist.
    ///
    /// # Arguments
    ///
    /// * `path` - The filesystem path where the database will be stored.
    /// * `cipher` - The handle used to seal and open card numbers.
    pub fn open<P: AsRef<Path>>(path: P, cipher: Arc<CardCipher>) -> Result<Self> {
        let mut opts = Options::default();
        opts.create_if_missing(true);
        opts.create_missing_column_families(true);

        let cf_cards = ColumnFamilyDescriptor::new(CF_CARDS, Options::default());
        let cf_numbers = ColumnFamilyDescriptor::new(CF_CARD_NUMBERS, Options::default());

        let db = DB::open_cf_descriptors(&opts, path, vec![cf_cards, cf_numbers])?;

        Ok(Self {
            db: Arc::new(db),
            cipher,
            write_lock: Arc::new(Mutex::new(())),
        })
    }

    fn cf(&self, name: &str) -> Result<&ColumnFamily> {
        self.db
            .cf_handle(name)
            .ok_or_else(|| internal(format!("Column family '{name}' not found")))
    }

    fn load(&self, id: CardId) -> Result<Option<CardRecord>> {
        let cf = self.cf(CF_CARDS)?;
        match self.db.get_cf(cf, id.as_uuid().as_bytes())? {
            Some(bytes) => {
                let record = serde_json::from_slice(&bytes)
                    .map_err(|e| CardError::InternalError(Box::new(e)))?;
                Ok(Some(record))
            }
            None => Ok(None),
        }
    }

    fn put_record(&self, batch: &mut WriteBatch, record: &CardRecord) -> Result<()> {
        let cf = self.cf(CF_CARDS)?;
        let value = serde_json::to_vec(record).map_err(|e| CardError::InternalError(Box::new(e)))?;
        batch.put_cf(cf, record.id.as_uuid().as_bytes(), value);
        Ok(())
    }

    fn records(&self) -> Result<Vec<CardRecord>> {
        let cf = self.cf(CF_CARDS)?;
        let mut records = Vec::new();
        for item in self.db.iterator_cf(cf, IteratorMode::Start) {
            let (_key, value) = item?;
            let record: CardRecord = serde_json::from_slice(&value)
                .map_err(|e| CardError::InternalError(Box::new(e)))?;
            records.push(record);
        }
        Ok(records)
    }
}

#[async_trait]
impl CardRepository for RocksDBCardRepository {
    async fn find_by_id(&self, id: CardId) -> Result<Option<Card>> {
        self.load(id)?
            .map(|record| record.open(&self.cipher))
            .transpose()
    }

    async fn find_by_id_and_owner(&self, id: CardId, owner: OwnerId) -> Result<Option<Card>> {
        self.load(id)?
            .filter(|record| record.owner == owner)
            .map(|record| record.open(&self.cipher))
            .transpose()
    }

    async fn find_all(&self, filter: &CardFilter) -> Result<Vec<Card>> {
        let mut cards = Vec::new();
        for record in self.records()? {
            let card = record.open(&self.cipher)?;
            if filter.matches(&card) {
                cards.push(card);
            }
        }
        cards.sort_by_key(|card| card.id);
        Ok(cards)
    }

    async fn exists_by_encrypted_number(&self, blob: &EncryptedBlob) -> Result<bool> {
        let cf = self.cf(CF_CARD_NUMBERS)?;
        // Just check if the key exists without retrieving the value
        Ok(self.db.get_pinned_cf(cf, blob.as_str().as_bytes())?.is_some())
    }

    async fn insert(&self, card: Card, number: EncryptedBlob) -> Result<Card> {
        let _guard = self.write_lock.lock().await;
        if self.exists_by_encrypted_number(&number).await? {
            return Err(CardError::DuplicateNumber);
        }
        if self.load(card.id)?.is_some() {
            return Err(CardError::ConcurrentModification(card.id));
        }

        let record = CardRecord::seal(&card, number);
        let mut batch = WriteBatch::default();
        self.put_record(&mut batch, &record)?;
        batch.put_cf(
            self.cf(CF_CARD_NUMBERS)?,
            record.number.as_str().as_bytes(),
            card.id.as_uuid().as_bytes(),
        );
        self.db.write(batch)?;

        Ok(Card {
            version: record.version,
            ..card
        })
    }

    async fn save(&self, card: Card) -> Result<Card> {
        let _guard = self.write_lock.lock().await;
        let mut record = self
            .load(card.id)?
            .ok_or_else(|| CardError::NotFound(format!("card {}", card.id)))?;
        record.apply(&card)?;

        let mut batch = WriteBatch::default();
        self.put_record(&mut batch, &record)?;
        self.db.write(batch)?;

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

        let _guard = self.write_lock.lock().await;
        let mut batch = WriteBatch::default();
        let mut versions = [0u64; 2];
        for (slot, card) in [&first, &second].into_iter().enumerate() {
            let mut record = self
                .load(card.id)?
                .ok_or_else(|| CardError::NotFound(format!("card {}", card.id)))?;
            record.apply(card)?;
            self.put_record(&mut batch, &record)?;
            versions[slot] = record.version;
        }
        self.db.write(batch)?;

        Ok((
            Card {
                version: versions[0],
                ..first
            },
            Card {
                version: versions[1],
                ..second
            },
        ))
    }

    async fn sum_balance_by_owner(&self, owner: OwnerId) -> Result<Balance> {
        Balance::total(
            self.records()?
                .into_iter()
                .filter(|record| record.owner == owner)
                .map(|record| record.balance),
        )
    }

    async fn delete(&self, id: CardId) -> Result<bool> {
        let _guard = self.write_lock.lock().await;
        let Some(record) = self.load(id)? else {
            return Ok(false);
        };

        let mut batch = WriteBatch::default();
        batch.delete_cf(self.cf(CF_CARDS)?, id.as_uuid().as_bytes());
        batch.delete_cf(self.cf(CF_CARD_NUMBERS)?, record.number.as_str().as_bytes());
        self.db.write(batch)?;
        Ok(true)
    }
}
