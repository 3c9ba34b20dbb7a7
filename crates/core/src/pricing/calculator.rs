//! Unit price of a single sign.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::PricingError;
use super::config::{MaterialRates, PricingConfig, same_thickness};
use crate::canvas::{CanvasSnapshot, px_to_mm};
use crate::types::round2;

/// Fixed handling fee per sign.
pub const BASE_FEE: Decimal = Decimal::from_parts(115, 0, 0, false, 2);
/// Plate cost per mm² before the material coefficient.
pub const AREA_FACTOR: Decimal = Decimal::from_parts(115, 0, 0, false, 5);
/// Engraving cost per mm of (width + height) before the engraving coefficient.
pub const ENGRAVING_FACTOR: Decimal = Decimal::from_parts(39, 0, 0, false, 3);
/// Largest plate side or engraved object side accepted, in millimetres.
pub const MAX_SIDE_MM: Decimal = Decimal::from_parts(10_000, 0, 0, false, 0);

/// Size of one engraved object, in millimetres.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct EngravedObject {
    pub width_mm: Decimal,
    pub height_mm: Decimal,
}

/// Everything about a sign that affects its price.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignGeometry {
    pub width_mm: Decimal,
    pub height_mm: Decimal,
    pub thickness_mm: Decimal,
    #[serde(default)]
    pub tape: bool,
    #[serde(default)]
    pub border: bool,
    #[serde(default)]
    pub objects: Vec<EngravedObject>,
}

impl SignGeometry {
    /// A plate with nothing engraved on it.
    #[must_use]
    pub const fn plate(width_mm: Decimal, height_mm: Decimal, thickness_mm: Decimal) -> Self {
        Self {
            width_mm,
            height_mm,
            thickness_mm,
            tape: false,
            border: false,
            objects: Vec::new(),
        }
    }

    /// Measure a canvas.
    ///
    /// The plate size is the canvas size; every engraved top-level object
    /// contributes its rotated bounding box. The border flag comes from the
    /// canvas' border object.
    ///
    /// # Errors
    ///
    /// Returns `PricingError::InvalidGeometry` if a measurement is not finite.
    pub fn from_canvas(
        snapshot: &CanvasSnapshot,
        thickness_mm: Decimal,
        tape: bool,
    ) -> Result<Self, PricingError> {
        let objects = snapshot
            .objects
            .iter()
            .filter(|object| object.is_engraved())
            .map(|object| {
                let bbox = object.bounding_box();
                Ok(EngravedObject {
                    width_mm: px_to_decimal_mm(bbox.width)?,
                    height_mm: px_to_decimal_mm(bbox.height)?,
                })
            })
            .collect::<Result<Vec<_>, PricingError>>()?;

        Ok(Self {
            width_mm: px_to_decimal_mm(snapshot.width)?,
            height_mm: px_to_decimal_mm(snapshot.height)?,
            thickness_mm,
            tape,
            border: snapshot.has_border(),
            objects,
        })
    }

    fn validate(&self) -> Result<(), PricingError> {
        if self.width_mm <= Decimal::ZERO || self.height_mm <= Decimal::ZERO {
            return Err(PricingError::InvalidGeometry(format!(
                "plate size must be positive, got {}x{} mm",
                self.width_mm, self.height_mm
            )));
        }
        if self.width_mm > MAX_SIDE_MM || self.height_mm > MAX_SIDE_MM {
            return Err(PricingError::InvalidGeometry(format!(
                "plate sides are limited to {MAX_SIDE_MM} mm, got {}x{} mm",
                self.width_mm, self.height_mm
            )));
        }
        if self
            .objects
            .iter()
            .any(|o| o.width_mm < Decimal::ZERO || o.height_mm < Decimal::ZERO)
        {
            return Err(PricingError::InvalidGeometry(
                "object sizes must not be negative".to_owned(),
            ));
        }
        if self
            .objects
            .iter()
            .any(|o| o.width_mm > MAX_SIDE_MM || o.height_mm > MAX_SIDE_MM)
        {
            return Err(PricingError::InvalidGeometry(format!(
                "engraved objects are limited to {MAX_SIDE_MM} mm per side"
            )));
        }
        Ok(())
    }
}

/// Pixels to millimetres, kept to 0.001 mm.
fn px_to_decimal_mm(px: f64) -> Result<Decimal, PricingError> {
    Decimal::try_from(px_to_mm(px))
        .map(|mm| mm.round_dp(3))
        .map_err(|_| PricingError::InvalidGeometry(format!("measurement {px} px is not finite")))
}

/// Components of a unit price, each rounded to cents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnitPriceBreakdown {
    /// Handling fee plus plate material.
    pub base: Decimal,
    /// Sum of engraving costs over all objects.
    pub engraving: Decimal,
    /// Perimeter surcharge (zero without a border).
    pub border: Decimal,
    /// `round2(base + engraving + border)` computed from unrounded parts.
    pub unit: Decimal,
}

/// Find the coefficients for a thickness/tape combination.
///
/// # Errors
///
/// Returns `PricingError::UnknownMaterial` if the table has no such entry.
pub fn lookup_rates(
    config: &PricingConfig,
    thickness_mm: Decimal,
    tape: bool,
) -> Result<&MaterialRates, PricingError> {
    config
        .materials
        .iter()
        .find(|m| m.tape == tape && same_thickness(m.thickness_mm, thickness_mm))
        .ok_or(PricingError::UnknownMaterial { thickness_mm, tape })
}

/// Price one sign.
///
/// ```text
/// base      = 1.15 + width * height * 0.00115 * k_material
/// engraving = Σ (w + h) * 0.039 * k_engraving
/// border    = 2 * (width + height) * border_coefficient   (if bordered)
/// ```
///
/// # Errors
///
/// Returns `PricingError::UnknownMaterial`, or `PricingError::InvalidGeometry`
/// for bad sizes and for prices beyond the decimal range.
pub fn unit_price(
    geometry: &SignGeometry,
    config: &PricingConfig,
) -> Result<UnitPriceBreakdown, PricingError> {
    geometry.validate()?;
    let rates = lookup_rates(config, geometry.thickness_mm, geometry.tape)?;

    let base = geometry
        .width_mm
        .checked_mul(geometry.height_mm)
        .and_then(|area| area.checked_mul(AREA_FACTOR))
        .and_then(|cost| cost.checked_mul(rates.k_material))
        .and_then(|cost| cost.checked_add(BASE_FEE))
        .ok_or_else(|| out_of_range("plate"))?;

    let engraving = geometry
        .objects
        .iter()
        .try_fold(Decimal::ZERO, |sum, o| {
            o.width_mm
                .checked_add(o.height_mm)
                .and_then(|side| side.checked_mul(ENGRAVING_FACTOR))
                .and_then(|cost| cost.checked_mul(rates.k_engraving))
                .and_then(|cost| sum.checked_add(cost))
        })
        .ok_or_else(|| out_of_range("engraving"))?;

    let border = if geometry.border {
        geometry
            .width_mm
            .checked_add(geometry.height_mm)
            .and_then(|half| half.checked_mul(Decimal::TWO))
            .and_then(|perimeter| perimeter.checked_mul(config.border_coefficient))
            .ok_or_else(|| out_of_range("border"))?
    } else {
        Decimal::ZERO
    };

    let unit = base
        .checked_add(engraving)
        .and_then(|sum| sum.checked_add(border))
        .ok_or_else(|| out_of_range("unit"))?;

    Ok(UnitPriceBreakdown {
        base: round2(base),
        engraving: round2(engraving),
        border: round2(border),
        unit: round2(unit),
    })
}

fn out_of_range(part: &str) -> PricingError {
    PricingError::InvalidGeometry(format!("{part} price is out of range"))
}
