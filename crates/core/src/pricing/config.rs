//! The rate table the server hands to every editor.

use std::collections::BTreeMap;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::PricingError;
use crate::types::CurrencyCode;

/// Complete pricing configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PricingConfig {
    #[serde(default)]
    pub currency: CurrencyCode,
    /// Material coefficients keyed by thickness and tape option.
    pub materials: Vec<MaterialRates>,
    /// Surcharge per millimetre of perimeter when the sign has a border.
    pub border_coefficient: Decimal,
    /// Volume discounts over the order subtotal.
    #[serde(default)]
    pub discount_tiers: Vec<DiscountTier>,
    pub vat: VatTable,
}

/// Coefficients for one material variant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MaterialRates {
    pub thickness_mm: Decimal,
    /// Adhesive tape on the back.
    #[serde(default)]
    pub tape: bool,
    pub k_material: Decimal,
    pub k_engraving: Decimal,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
}

/// A discount percentage applied when `min_subtotal <= subtotal < max_subtotal`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiscountTier {
    pub min_subtotal: Decimal,
    /// `None` means no upper bound.
    #[serde(default)]
    pub max_subtotal: Option<Decimal>,
    pub percent: Decimal,
}

/// VAT rates by country.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VatTable {
    /// Seller's country (ISO 3166-1 alpha-2).
    pub home_country: String,
    /// Rate used for countries not listed.
    pub default_percent: Decimal,
    /// Per-country rates, keyed by upper-case alpha-2 code.
    #[serde(default)]
    pub rates: BTreeMap<String, Decimal>,
}

impl PricingConfig {
    /// Check the table for mistakes an admin could make when editing it.
    ///
    /// # Errors
    ///
    /// Returns `PricingError::InvalidConfig` describing the first problem.
    pub fn validate(&self) -> Result<(), PricingError> {
        if self.materials.is_empty() {
            return Err(invalid("at least one material is required"));
        }

        for (i, material) in self.materials.iter().enumerate() {
            if material.thickness_mm <= Decimal::ZERO {
                return Err(invalid(format!("material {i}: thickness must be positive")));
            }
            if material.k_material < Decimal::ZERO || material.k_engraving < Decimal::ZERO {
                return Err(invalid(format!(
                    "material {i}: coefficients must not be negative"
                )));
            }
            let duplicate = self.materials.iter().skip(i + 1).any(|other| {
                other.tape == material.tape && same_thickness(other.thickness_mm, material.thickness_mm)
            });
            if duplicate {
                return Err(invalid(format!(
                    "duplicate material {} mm (tape: {})",
                    material.thickness_mm, material.tape
                )));
            }
        }

        if self.border_coefficient < Decimal::ZERO {
            return Err(invalid("border coefficient must not be negative"));
        }

        let mut tiers: Vec<&DiscountTier> = self.discount_tiers.iter().collect();
        tiers.sort_by(|a, b| a.min_subtotal.cmp(&b.min_subtotal));
        for (i, tier) in tiers.iter().enumerate() {
            if tier.percent < Decimal::ZERO || tier.percent > Decimal::ONE_HUNDRED {
                return Err(invalid("discount percent must be between 0 and 100"));
            }
            if let Some(max) = tier.max_subtotal
                && max <= tier.min_subtotal
            {
                return Err(invalid(format!(
                    "discount tier starting at {} has an empty range",
                    tier.min_subtotal
                )));
            }
            if let Some(next) = tiers.get(i + 1) {
                let overlaps = tier
                    .max_subtotal
                    .is_none_or(|max| max > next.min_subtotal);
                if overlaps {
                    return Err(invalid(format!(
                        "discount tiers starting at {} and {} overlap",
                        tier.min_subtotal, next.min_subtotal
                    )));
                }
            }
        }

        let vat_ok = |p: &Decimal| *p >= Decimal::ZERO && *p <= Decimal::ONE_HUNDRED;
        if !vat_ok(&self.vat.default_percent) || !self.vat.rates.values().all(vat_ok) {
            return Err(invalid("VAT rates must be between 0 and 100"));
        }
        if self.vat.home_country.len() != 2 {
            return Err(invalid("home country must be a two-letter code"));
        }

        Ok(())
    }

    /// Upper-case country keys so lookups are case-insensitive.
    #[must_use]
    pub fn normalized(mut self) -> Self {
        self.vat.home_country = self.vat.home_country.to_ascii_uppercase();
        self.vat.rates = self
            .vat
            .rates
            .into_iter()
            .map(|(k, v)| (k.to_ascii_uppercase(), v))
            .collect();
        self
    }
}

impl Default for PricingConfig {
    /// The shop's standard aluminium-composite rate card.
    fn default() -> Self {
        let material = |thickness: i64, tape: bool, k_material: i64, k_engraving: i64| {
            MaterialRates {
                thickness_mm: Decimal::new(thickness, 1),
                tape,
                k_material: Decimal::new(k_material, 2),
                k_engraving: Decimal::new(k_engraving, 2),
                label: None,
            }
        };

        Self {
            currency: CurrencyCode::EUR,
            materials: vec![
                material(8, false, 80, 100),
                material(8, true, 95, 100),
                material(16, false, 100, 100),
                material(16, true, 115, 100),
                material(32, false, 160, 110),
                material(32, true, 175, 110),
            ],
            border_coefficient: Decimal::new(2, 3),
            discount_tiers: vec![
                DiscountTier {
                    min_subtotal: Decimal::new(100, 0),
                    max_subtotal: Some(Decimal::new(500, 0)),
                    percent: Decimal::new(5, 0),
                },
                DiscountTier {
                    min_subtotal: Decimal::new(500, 0),
                    max_subtotal: Some(Decimal::new(2000, 0)),
                    percent: Decimal::new(10, 0),
                },
                DiscountTier {
                    min_subtotal: Decimal::new(2000, 0),
                    max_subtotal: None,
                    percent: Decimal::new(15, 0),
                },
            ],
            vat: VatTable {
                home_country: "UA".to_owned(),
                default_percent: Decimal::new(20, 0),
                rates: BTreeMap::from([
                    ("UA".to_owned(), Decimal::new(20, 0)),
                    ("PL".to_owned(), Decimal::new(23, 0)),
                    ("DE".to_owned(), Decimal::new(19, 0)),
                    ("CZ".to_owned(), Decimal::new(21, 0)),
                ]),
            },
        }
    }
}

/// Thicknesses are compared to the nearest 0.01 mm.
pub(crate) fn same_thickness(a: Decimal, b: Decimal) -> bool {
    a.round_dp(2) == b.round_dp(2)
}

fn invalid(message: impl Into<String>) -> PricingError {
    PricingError::InvalidConfig(message.into())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        assert!(PricingConfig::default().validate().is_ok());
    }

    #[test]
    fn test_rejects_duplicate_material() {
        let mut config = PricingConfig::default();
        let mut dup = config.materials[0].clone();
        dup.thickness_mm = Decimal::new(800, 3); // 0.800 == 0.8
        config.materials.push(dup);
        assert!(matches!(
            config.validate(),
            Err(PricingError::InvalidConfig(msg)) if msg.contains("duplicate")
        ));
    }

    #[test]
    fn test_rejects_overlapping_tiers() {
        let mut config = PricingConfig::default();
        config.discount_tiers[0].max_subtotal = Some(Decimal::new(600, 0));
        assert!(config.validate().is_err());

        let mut open_ended = PricingConfig::default();
        open_ended.discount_tiers[1].max_subtotal = None;
        assert!(open_ended.validate().is_err());
    }

    #[test]
    fn test_rejects_empty_materials_and_bad_vat() {
        let mut config = PricingConfig::default();
        config.materials.clear();
        assert!(config.validate().is_err());

        let mut config = PricingConfig::default();
        config.vat.default_percent = Decimal::new(150, 0);
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_json_accepts_numbers_and_strings() {
        let json = r#"{
            "materials": [{"thickness_mm": 1.6, "k_material": "1.0", "k_engraving": 1}],
            "border_coefficient": 0.002,
            "vat": {"home_country": "ua", "default_percent": 20, "rates": {"pl": 23}}
        }"#;
        let config: PricingConfig = serde_json::from_str(json).unwrap();
        let config = config.normalized();
        assert!(config.validate().is_ok());
        assert_eq!(config.vat.home_country, "UA");
        assert!(config.vat.rates.contains_key("PL"));
        assert_eq!(config.currency, CurrencyCode::EUR);
    }
}
