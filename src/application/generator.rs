use crate::crypto::{CardCipher, EncryptedBlob};
use crate::domain::card::{CARD_NUMBER_LENGTH, CardNumber};
use crate::domain::luhn;
use crate::domain::ports::CardRepository;
use crate::error::{CardError, Result};
use rand::Rng;
use rand::rngs::OsRng;
use std::sync::Arc;

/// A freshly generated number together with the exact blob that was checked
/// for existence. The blob is what must be persisted.
#[derive(Debug, Clone)]
pub struct GeneratedNumber {
    pub number: CardNumber,
    pub sealed: EncryptedBlob,
}

/// Produces Luhn-valid card numbers that are not yet in use.
pub struct NumberGenerator {
    cipher: Arc<CardCipher>,
    max_attempts: usize,
}

impl NumberGenerator {
    pub fn new(cipher: Arc<CardCipher>, max_attempts: usize) -> Self {
        Self {
            cipher,
            max_attempts,
        }
    }

    /// Draws candidates until one is absent from `oracle`, giving up with
    /// `ExhaustedGeneration` after the configured number of attempts.
    pub async fn generate_unique_number(
        &self,
        oracle: &dyn CardRepository,
    ) -> Result<GeneratedNumber> {
        for attempt in 1..=self.max_attempts {
            let number = CardNumber::parse(&luhn::complete(&random_prefix())?)?;
            let sealed = self
                .cipher
                .encrypt(number.as_str())?
                .ok_or_else(|| CardError::CryptoFailure("empty card number".to_string()))?;

            if !oracle.exists_by_encrypted_number(&sealed).await? {
                tracing::info!(attempt, "Generated unique card number");
                return Ok(GeneratedNumber { number, sealed });
            }
            tracing::warn!(attempt, "Card number collision detected, retrying");
        }

        tracing::error!(
            attempts = self.max_attempts,
            "Failed to generate a unique card number"
        );
        Err(CardError::ExhaustedGeneration {
            attempts: self.max_attempts,
        })
    }
}

fn random_prefix() -> String {
    (0..CARD_NUMBER_LENGTH - 1)
        .map(|_| char::from(b'0' + OsRng.gen_range(0..10u8)))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::in_memory::InMemoryCardRepository;

    #[test]
    fn test_random_prefix_shape() {
        for _ in 0..100 {
            let prefix = random_prefix();
            assert_eq!(prefix.len(), 15);
            assert!(prefix.bytes().all(|b| b.is_ascii_digit()));
        }
    }

    #[tokio::test]
    async fn test_generates_valid_unique_number() {
        let cipher = Arc::new(CardCipher::new(&[8u8; 32]).unwrap());
        let repo = InMemoryCardRepository::new(cipher.clone());
        let generator = NumberGenerator::new(cipher.clone(), 10);

        let generated = generator.generate_unique_number(&repo).await.unwrap();
        assert_eq!(generated.number.as_str().len(), 16);
        assert!(luhn::is_valid(generated.number.as_str()));
        assert_eq!(
            cipher.decrypt(&generated.sealed).unwrap(),
            generated.number.as_str()
        );
    }
}
