//! Currency codes and minor-unit amount helpers.

use crate::errors::{DomainError, DomainResult};
use serde::{Deserialize, Serialize};
use std::fmt::{self, Display};
use std::str::FromStr;

/// Amount in minor currency units (cents)
pub type Amount = i64;

/// ISO 4217 style currency code, always three uppercase ASCII letters
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Currency(String);

impl Currency {
    /// Parse and normalize a currency code (`"eur"` becomes `"EUR"`)
    pub fn new(code: impl AsRef<str>) -> DomainResult<Self> {
        let normalized = code.as_ref().trim().to_ascii_uppercase();
        if normalized.len() == 3 && normalized.chars().all(|c| c.is_ascii_uppercase()) {
            Ok(Self(normalized))
        } else {
            Err(DomainError::InvalidCurrency(code.as_ref().to_string()))
        }
    }

    /// Euro
    pub fn eur() -> Self {
        Self("EUR".to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Display for Currency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for Currency {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

impl TryFrom<String> for Currency {
    type Error = DomainError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<Currency> for String {
    fn from(currency: Currency) -> Self {
        currency.0
    }
}

/// `unit_price × quantity` with overflow detection
pub fn line_total(unit_price: Amount, quantity: u32) -> DomainResult<Amount> {
    unit_price
        .checked_mul(Amount::from(quantity))
        .ok_or_else(|| DomainError::AmountOverflow("line total".to_string()))
}

/// Sum of amounts with overflow detection
pub fn sum_amounts<I>(amounts: I) -> DomainResult<Amount>
where
    I: IntoIterator<Item = Amount>,
{
    amounts.into_iter().try_fold(0, |acc: Amount, amount| {
        acc.checked_add(amount)
            .ok_or_else(|| DomainError::AmountOverflow("order total".to_string()))
    })
}
