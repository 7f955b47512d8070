use std::fmt;
use std::str::FromStr;

use bigdecimal::{BigDecimal, ToPrimitive, Zero};
use thiserror::Error;

/// ISO 4217 codes whose smallest processor unit is the major unit itself.
pub const ZERO_DECIMAL_CURRENCIES: &[&str] = &[
    "BIF", "CLP", "DJF", "GNF", "JPY", "KMF", "KRW", "MGA", "PYG", "RWF", "UGX", "VND", "VUV",
    "XAF", "XOF", "XPF",
];

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AmountError {
    #[error("invalid currency code '{0}'")]
    InvalidCurrency(String),
    #[error("amount must not be negative")]
    Negative,
    #[error("amount {0} is too large")]
    OutOfRange(String),
}

/// Upper-cased ISO 4217 currency code.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Currency(String);

impl Currency {
    pub fn new(code: &str) -> Result<Self, AmountError> {
        let code = code.trim();
        if code.len() != 3 || !code.chars().all(|c| c.is_ascii_alphabetic()) {
            return Err(AmountError::InvalidCurrency(code.to_string()));
        }
        Ok(Self(code.to_ascii_uppercase()))
    }

    pub fn code(&self) -> &str {
        &self.0
    }

    /// Lower-case form, as the processor API expects it.
    pub fn processor_code(&self) -> String {
        self.0.to_ascii_lowercase()
    }

    pub fn is_zero_decimal(&self) -> bool {
        ZERO_DECIMAL_CURRENCIES.contains(&self.0.as_str())
    }
}

impl FromStr for Currency {
    type Err = AmountError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

impl fmt::Display for Currency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Convert a major-unit amount into the integer smallest unit for `currency`.
///
/// Zero-decimal currencies pass through unscaled, every other currency is
/// multiplied by 100. The result is rounded half away from zero, so
/// `10.005 MAD` becomes `1001`.
pub fn to_minor_units(amount: &BigDecimal, currency: &Currency) -> Result<i64, AmountError> {
    if amount < &BigDecimal::zero() {
        return Err(AmountError::Negative);
    }

    let scaled = if currency.is_zero_decimal() {
        amount.clone()
    } else {
        amount.clone() * BigDecimal::from(100)
    };
    let half = BigDecimal::from(5) / BigDecimal::from(10);

    // `with_scale(0)` truncates toward zero; adding one half first rounds.
    (scaled + half)
        .with_scale(0)
        .to_i64()
        .ok_or_else(|| AmountError::OutOfRange(amount.to_string()))
}
