use super::balance::Balance;
use super::lifecycle::CardStatus;
use super::luhn;
use crate::error::{CardError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Length of every issued card number.
pub const CARD_NUMBER_LENGTH: usize = 16;

const VISIBLE_DIGITS: usize = 4;
const MASKED_DIGITS: usize = 12;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CardId(Uuid);

impl CardId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    pub fn from_uuid(id: Uuid) -> Self {
        Self(id)
    }

    pub fn as_uuid(&self) -> Uuid {
        self.0
    }
}

impl Default for CardId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for CardId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Reference to the account holder owning a card.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OwnerId(Uuid);

impl OwnerId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    pub fn from_uuid(id: Uuid) -> Self {
        Self(id)
    }
}

impl Default for OwnerId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for OwnerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// A plaintext, checksum-valid card number.
///
/// Only ever lives for the duration of a request. `Debug` prints the masked
/// form so the number cannot leak through logs.
#[derive(Clone, PartialEq, Eq)]
pub struct CardNumber(String);

impl CardNumber {
    pub fn parse(number: &str) -> Result<Self> {
        if number.len() != CARD_NUMBER_LENGTH || !number.bytes().all(|b| b.is_ascii_digit()) {
            return Err(CardError::InvalidRequest(format!(
                "Card number must be {CARD_NUMBER_LENGTH} decimal digits"
            )));
        }
        if !luhn::is_valid(number) {
            return Err(CardError::InvalidRequest(
                "Card number fails the Luhn check".to_string(),
            ));
        }
        Ok(Self(number.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Renders the number as `**** **** **** 1234`.
    pub fn masked(&self) -> String {
        mask(&self.0)
    }
}

impl fmt::Debug for CardNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("CardNumber").field(&self.masked()).finish()
    }
}

fn mask(number: &str) -> String {
    let digits: String = number.chars().filter(char::is_ascii_digit).collect();
    let visible = &digits[digits.len().saturating_sub(VISIBLE_DIGITS)..];

    let mut masked = String::with_capacity(MASKED_DIGITS + 3 + 1 + visible.len());
    for i in 0..MASKED_DIGITS {
        masked.push('*');
        if (i + 1) % 4 == 0 {
            masked.push(' ');
        }
    }
    masked.push_str(visible);
    masked
}

/// Card expiry in `MM/YY` form.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Expiry {
    month: u8,
    year: u8,
}

impl Expiry {
    pub fn parse(input: &str) -> Result<Self> {
        let invalid = || {
            CardError::InvalidRequest(format!("Invalid expiry '{input}', expected MM/YY"))
        };
        let (mm, yy) = input.split_once('/').ok_or_else(invalid)?;
        if mm.len() != 2 || yy.len() != 2 {
            return Err(invalid());
        }
        if !mm.bytes().chain(yy.bytes()).all(|b| b.is_ascii_digit()) {
            return Err(invalid());
        }
        let month: u8 = mm.parse().map_err(|_| invalid())?;
        let year: u8 = yy.parse().map_err(|_| invalid())?;
        if !(1..=12).contains(&month) {
            return Err(invalid());
        }
        Ok(Self { month, year })
    }

    pub fn month(&self) -> u8 {
        self.month
    }

    pub fn year(&self) -> u8 {
        self.year
    }
}

impl TryFrom<String> for Expiry {
    type Error = CardError;

    fn try_from(value: String) -> Result<Self> {
        Self::parse(&value)
    }
}

impl From<Expiry> for String {
    fn from(expiry: Expiry) -> Self {
        expiry.to_string()
    }
}

impl fmt::Display for Expiry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:02}/{:02}", self.month, self.year)
    }
}

/// A payment card as seen by the engine, with its number decrypted.
///
/// `version` is bumped by the store on every successful write and is used
/// to reject stale updates.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Card {
    pub id: CardId,
    pub owner: OwnerId,
    pub number: CardNumber,
    pub expiry: Expiry,
    pub status: CardStatus,
    pub balance: Balance,
    pub version: u64,
}

impl Card {
    /// A freshly issued card: `Active`, not yet persisted.
    pub fn issue(owner: OwnerId, number: CardNumber, expiry: Expiry, balance: Balance) -> Self {
        Self {
            id: CardId::new(),
            owner,
            number,
            expiry,
            status: CardStatus::Active,
            balance,
            version: 0,
        }
    }

    pub fn view(&self) -> CardView {
        CardView::from(self)
    }
}

/// Read model handed back to callers. Carries only the masked number.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CardView {
    pub id: CardId,
    pub owner: OwnerId,
    pub masked_number: String,
    pub expiry: Expiry,
    pub status: CardStatus,
    pub balance: Balance,
}

impl From<&Card> for CardView {
    fn from(card: &Card) -> Self {
        Self {
            id: card.id,
            owner: card.owner,
            masked_number: card.number.masked(),
            expiry: card.expiry,
            status: card.status,
            balance: card.balance,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_card_number_parse() {
        assert!(CardNumber::parse("4111111111111111").is_ok());
        assert!(matches!(
            CardNumber::parse("4111111111111112"),
            Err(CardError::InvalidRequest(_))
        ));
        assert!(matches!(
            CardNumber::parse("411111111111111"),
            Err(CardError::InvalidRequest(_))
        ));
        assert!(matches!(
            CardNumber::parse("4111-1111-1111-1"),
            Err(CardError::InvalidRequest(_))
        ));
    }

    #[test]
    fn test_masking() {
        let number = CardNumber::parse("4111111111111111").unwrap();
        assert_eq!(number.masked(), "**** **** **** 1111");
        assert_eq!(mask("12"), "**** **** **** 12");
    }

    #[test]
    fn test_debug_never_prints_plaintext() {
        let number = CardNumber::parse("4024000000000004").unwrap();
        let debug = format!("{number:?}");
        assert!(!debug.contains("4024000000000004"));
        assert!(debug.contains("0004"));
    }

    #[test]
    fn test_expiry_parse() {
        let expiry = Expiry::parse("07/29").unwrap();
        assert_eq!(expiry.month(), 7);
        assert_eq!(expiry.year(), 29);
        assert_eq!(expiry.to_string(), "07/29");

        for bad in ["13/29", "00/29", "7/29", "07/2029", "0729", "ab/cd", ""] {
            assert!(
                matches!(Expiry::parse(bad), Err(CardError::InvalidRequest(_))),
                "{bad} should be rejected"
            );
        }
    }

    #[test]
    fn test_issued_card_is_active() {
        let card = Card::issue(
            OwnerId::new(),
            CardNumber::parse("4111111111111111").unwrap(),
            Expiry::parse("12/30").unwrap(),
            Balance::ZERO,
        );
        assert_eq!(card.status, CardStatus::Active);
        assert_eq!(card.version, 0);
        assert_eq!(card.view().masked_number, "**** **** **** 1111");
    }
}
