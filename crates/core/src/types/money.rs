//! Decimal money amounts.
//!
//! All prices are `rust_decimal::Decimal` in the currency's standard unit and
//! are rounded to cents with [`round2`] (half away from zero), which matches
//! how totals are printed on invoices.

use core::fmt;

use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};

/// Round an amount to two decimal places, half away from zero.
#[must_use]
pub fn round2(amount: Decimal) -> Decimal {
    amount.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
}

/// A price with currency information.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Price {
    /// Amount in the currency's standard unit (e.g., euros, not cents).
    pub amount: Decimal,
    /// ISO 4217 currency code.
    pub currency_code: CurrencyCode,
}

impl Price {
    /// Create a new price, rounding the amount to cents.
    #[must_use]
    pub fn new(amount: Decimal, currency_code: CurrencyCode) -> Self {
        Self {
            amount: round2(amount),
            currency_code,
        }
    }

    /// Zero in the given currency.
    #[must_use]
    pub const fn zero(currency_code: CurrencyCode) -> Self {
        Self {
            amount: Decimal::ZERO,
            currency_code,
        }
    }
}

impl fmt::Display for Price {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.2} {}", self.amount, self.currency_code.code())
    }
}

/// ISO 4217 currency codes the shop invoices in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum CurrencyCode {
    #[default]
    EUR,
    UAH,
    USD,
    PLN,
    GBP,
}

impl CurrencyCode {
    /// The three-letter ISO code.
    #[must_use]
    pub const fn code(self) -> &'static str {
        match self {
            Self::EUR => "EUR",
            Self::UAH => "UAH",
            Self::USD => "USD",
            Self::PLN => "PLN",
            Self::GBP => "GBP",
        }
    }
}
