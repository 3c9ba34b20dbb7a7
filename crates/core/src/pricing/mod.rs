//! Sign pricing.
//!
//! Prices are deterministic functions of the sign geometry and the
//! server-supplied [`PricingConfig`]. The editor uses them to show a live
//! price; the server recomputes them when a project is added to the cart so
//! the stored order never trusts client arithmetic.

mod calculator;
mod config;
mod quote;

use rust_decimal::Decimal;
use thiserror::Error;

pub use calculator::{
    AREA_FACTOR, BASE_FEE, ENGRAVING_FACTOR, EngravedObject, MAX_SIDE_MM, SignGeometry,
    UnitPriceBreakdown, lookup_rates, unit_price,
};
pub use config::{DiscountTier, MaterialRates, PricingConfig, VatTable};
pub use quote::{
    AccessoryLine, CustomerContext, LineQuote, MAX_ACCESSORY_PRICE, MAX_ACCESSORY_QUANTITY,
    PriceQuote, SignLine, discount_percent, quote, vat_percent,
};

/// Errors from price computation.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum PricingError {
    /// No coefficients for this thickness/tape combination.
    #[error("no material configured for {thickness_mm} mm (tape: {tape})")]
    UnknownMaterial { thickness_mm: Decimal, tape: bool },

    /// Sizes are missing, negative or not finite.
    #[error("invalid geometry: {0}")]
    InvalidGeometry(String),

    /// Copies or accessory quantities are out of range.
    #[error("invalid quantity: {0}")]
    InvalidQuantity(String),

    /// The rate table itself is inconsistent.
    #[error("invalid pricing config: {0}")]
    InvalidConfig(String),
}
