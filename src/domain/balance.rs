use crate::error::{CardError, Result};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Number of fractional digits carried by every monetary value.
pub const MONEY_SCALE: u32 = 2;

/// Largest value that still fits the 96-bit mantissa at scale 2.
pub const MAX_MONEY: Decimal =
    Decimal::from_parts(u32::MAX, u32::MAX, u32::MAX, false, MONEY_SCALE);

fn has_money_scale(value: Decimal) -> bool {
    value.normalize().scale() <= MONEY_SCALE
}

fn rescaled(mut value: Decimal) -> Decimal {
    value.rescale(MONEY_SCALE);
    value
}

/// Keeps a result only if it is still exact at scale 2.
fn exact(value: Option<Decimal>) -> Result<Decimal> {
    value
        .filter(|v| v.scale() == MONEY_SCALE && *v <= MAX_MONEY)
        .ok_or(CardError::BalanceOverflow)
}

/// The funds held on a card.
///
/// A fixed-point value with 2 decimal places that can never go negative.
/// Arithmetic is checked: a result that cannot be held exactly at scale 2
/// fails with `CardError::BalanceOverflow` instead of losing cents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default, Serialize, Deserialize)]
#[serde(try_from = "Decimal", into = "Decimal")]
pub struct Balance(Decimal);

/// A strictly positive amount of money moved by a transfer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "Decimal", into = "Decimal")]
pub struct Amount(Decimal);

impl Amount {
    pub fn new(value: Decimal) -> Result<Self> {
        if value <= Decimal::ZERO {
            return Err(CardError::InvalidRequest(
                "Transfer amount must be positive".to_string(),
            ));
        }
        if !has_money_scale(value) {
            return Err(CardError::InvalidRequest(format!(
                "Amount {value} has more than {MONEY_SCALE} fractional digits"
            )));
        }
        if value > MAX_MONEY {
            return Err(CardError::BalanceOverflow);
        }
        Ok(Self(rescaled(value)))
    }

    pub fn value(&self) -> Decimal {
        self.0
    }
}

impl TryFrom<Decimal> for Amount {
    type Error = CardError;

    fn try_from(value: Decimal) -> Result<Self> {
        Self::new(value)
    }
}

impl From<Amount> for Decimal {
    fn from(amount: Amount) -> Self {
        amount.0
    }
}

impl From<Amount> for Balance {
    fn from(amount: Amount) -> Self {
        Self(amount.0)
    }
}

impl Balance {
    pub const ZERO: Self = Self(Decimal::from_parts(0, 0, 0, false, MONEY_SCALE));

    pub fn new(value: Decimal) -> Result<Self> {
        if value < Decimal::ZERO {
            return Err(CardError::InvalidRequest(
                "Balance cannot be negative".to_string(),
            ));
        }
        if !has_money_scale(value) {
            return Err(CardError::InvalidRequest(format!(
                "Balance {value} has more than {MONEY_SCALE} fractional digits"
            )));
        }
        if value > MAX_MONEY {
            return Err(CardError::BalanceOverflow);
        }
        Ok(Self(rescaled(value)))
    }

    pub fn value(&self) -> Decimal {
        self.0
    }

    /// Adds `amount`, failing when the result no longer fits at scale 2.
    pub fn credit(self, amount: Amount) -> Result<Self> {
        self.checked_add(amount.into())
    }

    /// Removes `amount`, or returns `None` when the balance would go negative.
    pub fn debit(self, amount: Amount) -> Option<Self> {
        if self.0 >= amount.0 {
            self.0.checked_sub(amount.0).map(Self)
        } else {
            None
        }
    }

    pub fn checked_add(self, other: Balance) -> Result<Self> {
        exact(self.0.checked_add(other.0)).map(Self)
    }

    /// Sums balances without ever rounding.
    pub fn total(balances: impl IntoIterator<Item = Balance>) -> Result<Self> {
        balances
            .into_iter()
            .try_fold(Balance::ZERO, Balance::checked_add)
    }
}

impl TryFrom<Decimal> for Balance {
    type Error = CardError;

    fn try_from(value: Decimal) -> Result<Self> {
        Self::new(value)
    }
}

impl From<Balance> for Decimal {
    fn from(balance: Balance) -> Self {
        balance.0
    }
}

impl fmt::Display for Amount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl fmt::Display for Balance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", rescaled(self.0))
    }
}
