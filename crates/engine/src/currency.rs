use serde::{Deserialize, Serialize};

/// ISO currency of a bank account.
///
/// ## Minor units
///
/// The bank reports amounts as an `i64` number of **minor units** (see `Money`),
/// while the ledger stores **milliunits**. `minor_units()` returns how many
/// decimal digits the currency uses, which drives both formatting and the
/// minor ⇄ milliunit conversion.
///
/// Example: UAH has 2 minor units, so `20.00 UAH` ⇄ `2000` minor ⇄ `20000` milliunits.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Currency {
    #[default]
    Uah,
    Usd,
    Eur,
    Pln,
    Gbp,
}

impl Currency {
    /// Canonical currency code.
    #[must_use]
    pub const fn code(self) -> &'static str {
        match self {
            Currency::Uah => "UAH",
            Currency::Usd => "USD",
            Currency::Eur => "EUR",
            Currency::Pln => "PLN",
            Currency::Gbp => "GBP",
        }
    }

    /// Number of fraction digits used when formatting amounts.
    #[must_use]
    pub const fn minor_units(self) -> u8 {
        match self {
            Currency::Uah | Currency::Usd | Currency::Eur | Currency::Pln | Currency::Gbp => 2,
        }
    }
}

impl core::fmt::Display for Currency {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.code())
    }
}
