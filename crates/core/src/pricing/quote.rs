//! Order-level pricing: copies, accessories, discount tiers and VAT.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::PricingError;
use super::calculator::{SignGeometry, UnitPriceBreakdown, unit_price};
use super::config::{DiscountTier, PricingConfig, VatTable};
use crate::types::{CurrencyCode, UserType, round2};

/// Largest quantity of one accessory in a cart.
pub const MAX_ACCESSORY_QUANTITY: u32 = 100_000;
/// Largest accepted accessory unit price.
pub const MAX_ACCESSORY_PRICE: Decimal = Decimal::from_parts(1_000_000, 0, 0, false, 0);

/// Who is buying, for VAT purposes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CustomerContext {
    /// ISO 3166-1 alpha-2 delivery country.
    pub country: String,
    pub user_type: UserType,
}

impl CustomerContext {
    #[must_use]
    pub fn new(country: impl Into<String>, user_type: UserType) -> Self {
        Self {
            country: country.into(),
            user_type,
        }
    }
}

/// One sign design ordered in some number of copies.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignLine {
    pub geometry: SignGeometry,
    pub copies: u32,
}

/// An accessory (mounting kit, stand, screws) at a fixed unit price.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccessoryLine {
    pub id: String,
    pub name: String,
    pub quantity: u32,
    pub unit_price: Decimal,
}

/// Priced sign line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineQuote {
    pub unit: UnitPriceBreakdown,
    pub copies: u32,
    pub line_total: Decimal,
}

/// Full price of a cart.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PriceQuote {
    pub currency: CurrencyCode,
    pub lines: Vec<LineQuote>,
    pub accessories_total: Decimal,
    pub subtotal: Decimal,
    pub discount_percent: Decimal,
    pub discount: Decimal,
    pub net: Decimal,
    pub vat_percent: Decimal,
    pub vat: Decimal,
    pub total: Decimal,
}

impl PriceQuote {
    /// Total number of physical signs.
    #[must_use]
    pub fn sign_count(&self) -> u32 {
        self.lines
            .iter()
            .fold(0_u32, |count, l| count.saturating_add(l.copies))
    }
}

/// Discount percentage for a subtotal: the first tier whose range contains it.
#[must_use]
pub fn discount_percent(subtotal: Decimal, tiers: &[DiscountTier]) -> Decimal {
    tiers
        .iter()
        .find(|tier| {
            subtotal >= tier.min_subtotal && tier.max_subtotal.is_none_or(|max| subtotal < max)
        })
        .map_or(Decimal::ZERO, |tier| tier.percent)
}

/// VAT percentage for a delivery country and customer type.
///
/// Businesses outside the seller's country are reverse-charged (0 %) when the
/// country is listed in the table; unlisted countries always use the default.
#[must_use]
pub fn vat_percent(table: &VatTable, country: &str, user_type: UserType) -> Decimal {
    let country = country.trim().to_ascii_uppercase();
    let listed = table.rates.get(&country).copied();

    match user_type {
        UserType::Business if !country.eq_ignore_ascii_case(&table.home_country) => {
            listed.map_or(table.default_percent, |_| Decimal::ZERO)
        }
        _ => listed.unwrap_or(table.default_percent),
    }
}

/// Price a whole cart.
///
/// # Errors
///
/// Returns `PricingError::InvalidQuantity` for zero copies, accessories
/// outside the accepted quantity or price range, and totals beyond the
/// decimal range; plus any error from [`unit_price`].
pub fn quote(
    lines: &[SignLine],
    accessories: &[AccessoryLine],
    config: &PricingConfig,
    customer: &CustomerContext,
) -> Result<PriceQuote, PricingError> {
    let lines = lines
        .iter()
        .map(|line| {
            if line.copies == 0 {
                return Err(PricingError::InvalidQuantity(
                    "copies must be at least 1".to_owned(),
                ));
            }
            let unit = unit_price(&line.geometry, config)?;
            let line_total = unit
                .unit
                .checked_mul(Decimal::from(line.copies))
                .ok_or_else(|| out_of_range("line total"))?;
            Ok(LineQuote {
                unit,
                copies: line.copies,
                line_total,
            })
        })
        .collect::<Result<Vec<_>, PricingError>>()?;

    let mut accessories_total = Decimal::ZERO;
    for accessory in accessories {
        if accessory.quantity == 0
            || accessory.quantity > MAX_ACCESSORY_QUANTITY
            || accessory.unit_price < Decimal::ZERO
            || accessory.unit_price > MAX_ACCESSORY_PRICE
        {
            return Err(PricingError::InvalidQuantity(format!(
                "accessory {} needs a quantity between 1 and {MAX_ACCESSORY_QUANTITY} \
                 and a price between 0 and {MAX_ACCESSORY_PRICE}",
                accessory.id
            )));
        }
        accessories_total = round2(accessory.unit_price)
            .checked_mul(Decimal::from(accessory.quantity))
            .and_then(|cost| accessories_total.checked_add(cost))
            .ok_or_else(|| out_of_range("accessories total"))?;
    }

    let subtotal = lines
        .iter()
        .try_fold(accessories_total, |sum, l| sum.checked_add(l.line_total))
        .ok_or_else(|| out_of_range("subtotal"))?;
    let discount_pct = discount_percent(subtotal, &config.discount_tiers);
    let discount = percent_of(subtotal, discount_pct).ok_or_else(|| out_of_range("discount"))?;
    let net = subtotal - discount;
    let vat_pct = vat_percent(&config.vat, &customer.country, customer.user_type);
    let vat = percent_of(net, vat_pct).ok_or_else(|| out_of_range("VAT"))?;
    let total = net.checked_add(vat).ok_or_else(|| out_of_range("total"))?;

    Ok(PriceQuote {
        currency: config.currency,
        lines,
        accessories_total,
        subtotal,
        discount_percent: discount_pct,
        discount,
        net,
        vat_percent: vat_pct,
        vat,
        total,
    })
}

/// `round2(amount * percent / 100)`, or `None` on overflow.
fn percent_of(amount: Decimal, percent: Decimal) -> Option<Decimal> {
    amount
        .checked_mul(percent)
        .and_then(|v| v.checked_div(Decimal::ONE_HUNDRED))
        .map(round2)
}

fn out_of_range(what: &str) -> PricingError {
    PricingError::InvalidQuantity(format!("{what} is out of range"))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn d(units: i64) -> Decimal {
        Decimal::new(units, 0)
    }

    fn line(copies: u32) -> SignLine {
        SignLine {
            geometry: SignGeometry::plate(d(120), d(80), Decimal::new(16, 1)),
            copies,
        }
    }

    #[test]
    fn test_discount_tier_boundaries() {
        let tiers = PricingConfig::default().discount_tiers;
        assert_eq!(discount_percent(Decimal::new(9999, 2), &tiers), d(0));
        assert_eq!(discount_percent(d(100), &tiers), d(5));
        assert_eq!(discount_percent(Decimal::new(49_999, 2), &tiers), d(5));
        assert_eq!(discount_percent(d(500), &tiers), d(10));
        assert_eq!(discount_percent(d(1_000_000), &tiers), d(15));
        assert_eq!(discount_percent(d(50), &[]), d(0));
    }

    #[test]
    fn test_vat_rules() {
        let table = PricingConfig::default().vat;
        assert_eq!(vat_percent(&table, "ua", UserType::Consumer), d(20));
        assert_eq!(vat_percent(&table, "PL", UserType::Consumer), d(23));
        assert_eq!(vat_percent(&table, "PL", UserType::Business), d(0));
        assert_eq!(vat_percent(&table, "UA", UserType::Business), d(20));
        assert_eq!(vat_percent(&table, "US", UserType::Business), d(20));
        assert_eq!(vat_percent(&table, "FR", UserType::Admin), d(20));
    }

    #[test]
    fn test_quote_totals() {
        let config = PricingConfig::default();
        let accessories = vec![AccessoryLine {
            id: "screws".to_owned(),
            name: "Mounting screws".to_owned(),
            quantity: 2,
            unit_price: Decimal::new(150, 2),
        }];
        let customer = CustomerContext::new("UA", UserType::Consumer);

        let quote = quote(&[line(3), line(1)], &accessories, &config, &customer).unwrap();

        // 4 * 12.19 = 48.76, + 3.00 accessories
        assert_eq!(quote.subtotal, Decimal::new(5176, 2));
        assert_eq!(quote.discount, d(0));
        assert_eq!(quote.vat, Decimal::new(1035, 2));
        assert_eq!(quote.total, Decimal::new(6211, 2));
        assert_eq!(quote.sign_count(), 4);
    }

    #[test]
    fn test_quote_applies_discount_before_vat() {
        let config = PricingConfig::default();
        let customer = CustomerContext::new("DE", UserType::Consumer);

        // 10 * 12.19 = 121.90 -> 5 % tier
        let quote = quote(&[line(10)], &[], &config, &customer).unwrap();
        assert_eq!(quote.discount_percent, d(5));
        assert_eq!(quote.discount, Decimal::new(610, 2));
        assert_eq!(quote.net, Decimal::new(11_580, 2));
        // 19 % of 115.80 = 22.002
        assert_eq!(quote.vat, Decimal::new(2200, 2));
        assert_eq!(quote.total, Decimal::new(13_780, 2));
    }

    #[test]
    fn test_quote_rejects_zero_copies() {
        let config = PricingConfig::default();
        let customer = CustomerContext::new("UA", UserType::Consumer);
        assert!(matches!(
            quote(&[line(0)], &[], &config, &customer),
            Err(PricingError::InvalidQuantity(_))
        ));
    }

    #[test]
    fn test_quote_rejects_huge_accessory() {
        let config = PricingConfig::default();
        let customer = CustomerContext::new("UA", UserType::Consumer);
        let accessory = |quantity: u32, unit_price: Decimal| AccessoryLine {
            id: "stand".to_owned(),
            name: "Desk stand".to_owned(),
            quantity,
            unit_price,
        };

        for huge in [
            accessory(u32::MAX, Decimal::MAX / Decimal::TWO),
            accessory(1, Decimal::MAX),
            accessory(MAX_ACCESSORY_QUANTITY + 1, Decimal::ONE),
        ] {
            assert!(matches!(
                quote(&[], &[huge], &config, &customer),
                Err(PricingError::InvalidQuantity(_))
            ));
        }

        // The largest accepted accessory still prices normally.
        let quote = quote(
            &[],
            &[accessory(MAX_ACCESSORY_QUANTITY, MAX_ACCESSORY_PRICE)],
            &config,
            &customer,
        )
        .unwrap();
        assert_eq!(quote.accessories_total, d(100_000_000_000));
    }

    #[test]
    fn test_quote_rejects_oversized_plate() {
        let config = PricingConfig::default();
        let customer = CustomerContext::new("UA", UserType::Consumer);
        let huge = SignLine {
            geometry: SignGeometry::plate(
                Decimal::new(10_000_000_000_000_000, 0),
                Decimal::new(10_000_000_000_000_000, 0),
                Decimal::new(16, 1),
            ),
            copies: u32::MAX,
        };
        assert!(matches!(
            quote(&[huge], &[], &config, &customer),
            Err(PricingError::InvalidGeometry(_))
        ));
    }
}
