use crate::error::{CardError, Result};

/// Policy default for the number generator's circuit breaker.
pub const DEFAULT_MAX_GENERATION_ATTEMPTS: usize = 10;
/// Policy default for retrying a transfer after a version conflict.
pub const DEFAULT_MAX_TRANSFER_RETRIES: usize = 3;

/// Tunables for [`crate::application::engine::CardEngine`].
///
/// The encryption key is not part of this struct; it goes straight into
/// [`crate::crypto::CardCipher`] and is never kept around in plain form.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineConfig {
    pub max_generation_attempts: usize,
    pub max_transfer_retries: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            max_generation_attempts: DEFAULT_MAX_GENERATION_ATTEMPTS,
            max_transfer_retries: DEFAULT_MAX_TRANSFER_RETRIES,
        }
    }
}

impl EngineConfig {
    pub fn with_max_generation_attempts(mut self, attempts: usize) -> Self {
        self.max_generation_attempts = attempts;
        self
    }

    pub fn with_max_transfer_retries(mut self, retries: usize) -> Self {
        self.max_transfer_retries = retries;
        self
    }

    pub fn validate(&self) -> Result<()> {
        if self.max_generation_attempts == 0 {
            return Err(CardError::Configuration(
                "max_generation_attempts must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = EngineConfig::default();
        assert_eq!(config.max_generation_attempts, 10);
        assert_eq!(config.max_transfer_retries, 3);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_zero_attempts_rejected() {
        let config = EngineConfig::default().with_max_generation_attempts(0);
        assert!(matches!(
            config.validate(),
            Err(CardError::Configuration(_))
        ));
    }
}
