//! Unit conversion and bounding boxes.
//!
//! The canvas works in CSS pixels at 96 DPI; the workshop prices in
//! millimetres.

use super::CanvasObject;

/// CSS reference resolution.
pub const PX_PER_INCH: f64 = 96.0;
/// Millimetres per inch.
pub const MM_PER_INCH: f64 = 25.4;

/// Convert CSS pixels to millimetres.
#[must_use]
pub fn px_to_mm(px: f64) -> f64 {
    px * MM_PER_INCH / PX_PER_INCH
}

/// Convert millimetres to CSS pixels.
#[must_use]
pub fn mm_to_px(mm: f64) -> f64 {
    mm * PX_PER_INCH / MM_PER_INCH
}

/// Convert square millimetres to square centimetres.
#[must_use]
pub fn mm2_to_cm2(mm2: f64) -> f64 {
    mm2 / 100.0
}

/// Axis-aligned size of an object after scaling and rotation, in pixels.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoundingBox {
    pub width: f64,
    pub height: f64,
}

impl BoundingBox {
    /// The same box in millimetres.
    #[must_use]
    pub fn to_mm(self) -> Self {
        Self {
            width: px_to_mm(self.width),
            height: px_to_mm(self.height),
        }
    }

    /// Perimeter in the box's unit.
    #[must_use]
    pub fn perimeter(self) -> f64 {
        2.0 * (self.width + self.height)
    }
}

impl CanvasObject {
    /// Axis-aligned bounding box in pixels.
    ///
    /// Negative scales (flips) count by magnitude.
    #[must_use]
    pub fn bounding_box(&self) -> BoundingBox {
        let w = (self.width * self.scale_x).abs();
        let h = (self.height * self.scale_y).abs();
        let radians = self.angle.to_radians();
        let (sin, cos) = (radians.sin().abs(), radians.cos().abs());
        BoundingBox {
            width: w.mul_add(cos, h * sin),
            height: w.mul_add(sin, h * cos),
        }
    }
}
