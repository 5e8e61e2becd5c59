use std::fmt;

use crate::{Currency, EngineError};

/// Signed amount in **minor units** of a currency.
///
/// The value is signed:
/// - positive = income / increase
/// - negative = expense / decrease
///
/// # Examples
///
/// ```rust
/// use engine::{Currency, Money};
///
/// let amount = Money::new(-2000, Currency::Uah);
/// assert_eq!(amount.to_string(), "-20.00UAH");
/// assert_eq!(amount.to_milliunits().unwrap(), -20_000);
/// ```
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Money {
    minor: i64,
    currency: Currency,
}

impl Money {
    /// Creates a new amount from minor units.
    #[must_use]
    pub const fn new(minor: i64, currency: Currency) -> Self {
        Self { minor, currency }
    }

    /// Amount expressed in ledger milliunits.
    pub fn to_milliunits(self) -> Result<i64, EngineError> {
        self.minor
            .checked_mul(milliunit_factor(self.currency))
            .ok_or_else(|| EngineError::InvalidAmount(format!("{} overflows milliunits", self.minor)))
    }
}

impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sign = if self.minor < 0 { "-" } else { "" };
        let abs = self.minor.unsigned_abs();
        let digits = u32::from(self.currency.minor_units());
        let scale = 10u64.pow(digits);
        let major = abs / scale;
        let fraction = abs % scale;
        if digits == 0 {
            return write!(f, "{sign}{major}{}", self.currency);
        }
        write!(
            f,
            "{sign}{major}.{fraction:0width$}{}",
            self.currency,
            width = digits as usize
        )
    }
}

fn milliunit_factor(currency: Currency) -> i64 {
    10i64.pow(3u32.saturating_sub(u32::from(currency.minor_units())))
}
