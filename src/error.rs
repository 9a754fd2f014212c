use crate::domain::card::CardId;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum CardError {
    #[error("Crypto failure: {0}")]
    CryptoFailure(String),
    #[error("Could not generate a unique card number after {attempts} attempts")]
    ExhaustedGeneration { attempts: usize },
    #[error("Invalid status transition: {0}")]
    InvalidTransition(String),
    #[error("Invalid request: {0}")]
    InvalidRequest(String),
    #[error("Operation conflict: {0}")]
    OperationConflict(String),
    #[error("Insufficient funds on source card {0}")]
    InsufficientFunds(CardId),
    #[error("Not found: {0}")]
    NotFound(String),
    #[error("Forbidden: {0}")]
    Forbidden(String),
    #[error("Card {0} was modified concurrently")]
    ConcurrentModification(CardId),
    #[error("Balance would exceed the largest representable amount")]
    BalanceOverflow,
    #[error("Card number already exists")]
    DuplicateNumber,
    #[error("Configuration error: {0}")]
    Configuration(String),
    #[error("CSV error: {0}")]
    CsvError(#[from] csv::Error),
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
    #[cfg(feature = "storage-rocksdb")]
    #[error("Storage error: {0}")]
    StorageError(#[from] rocksdb::Error),
    #[error("Internal error: {0}")]
    InternalError(#[source] Box<dyn std::error::Error + Send + Sync>),
}

impl CardError {
    /// Returns true for errors caused by the caller's request rather than
    /// by the engine or its storage.
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            CardError::InvalidTransition(_)
                | CardError::InvalidRequest(_)
                | CardError::OperationConflict(_)
                | CardError::InsufficientFunds(_)
                | CardError::NotFound(_)
                | CardError::Forbidden(_)
                | CardError::BalanceOverflow
        )
    }
}

pub type Result<T> = std::result::Result<T, CardError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_client_error_classification() {
        assert!(CardError::InvalidRequest("same card".into()).is_client_error());
        assert!(CardError::InsufficientFunds(CardId::new()).is_client_error());
        assert!(!CardError::CryptoFailure("bad tag".into()).is_client_error());
        assert!(!CardError::ExhaustedGeneration { attempts: 10 }.is_client_error());
        assert!(!CardError::ConcurrentModification(CardId::new()).is_client_error());
        assert!(CardError::BalanceOverflow.is_client_error());
    }
}
