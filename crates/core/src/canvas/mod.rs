//! Canvas snapshots: model, measurement, cleanup and (re)loading.
//!
//! # Loading
//!
//! [`import_json`] is the single entry point for canvas JSON coming from
//! storage or the network. It sanitizes the raw value, parses it, and
//! rebuilds every QR code path from its stored text. QR failures do not
//! abort the load: the object keeps its previous path and a warning is
//! returned alongside the snapshot.

pub mod geometry;
mod model;
pub mod qr;
pub mod sanitize;

use serde_json::Value;
use thiserror::Error;

pub use geometry::{BoundingBox, mm_to_px, px_to_mm};
pub use model::{CanvasObject, CanvasSnapshot, ObjectData};
pub use qr::{QrError, QrPath, qr_path};
pub use sanitize::sanitize;

/// Errors from canvas (de)serialization.
#[derive(Debug, Error)]
pub enum CanvasError {
    /// The JSON text could not be parsed or does not describe a canvas.
    #[error("invalid canvas JSON: {0}")]
    InvalidJson(#[from] serde_json::Error),

    /// Canvas dimensions are missing, zero or not finite.
    #[error("invalid canvas size {width}x{height}")]
    InvalidSize { width: f64, height: f64 },
}

/// Non-fatal problem found while loading a canvas.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CanvasWarning {
    /// Which object, as a path of indices into `objects`.
    pub object_path: Vec<usize>,
    pub message: String,
}

/// A loaded canvas plus anything that could not be restored.
#[derive(Debug, Clone)]
pub struct ImportedCanvas {
    pub snapshot: CanvasSnapshot,
    pub warnings: Vec<CanvasWarning>,
}

impl CanvasSnapshot {
    /// Sanitize the snapshot in place (via its JSON form).
    ///
    /// # Errors
    ///
    /// Returns `CanvasError::InvalidJson` if the cleaned value no longer
    /// describes a canvas (e.g. a required field held a DOM node).
    pub fn sanitized(self) -> Result<Self, CanvasError> {
        let value = serde_json::to_value(self)?;
        Ok(serde_json::from_value(sanitize(value))?)
    }

    fn check_size(&self) -> Result<(), CanvasError> {
        let valid = |v: f64| v.is_finite() && v > 0.0;
        if valid(self.width) && valid(self.height) {
            Ok(())
        } else {
            Err(CanvasError::InvalidSize {
                width: self.width,
                height: self.height,
            })
        }
    }
}

/// Serialize a snapshot for storage.
///
/// # Errors
///
/// Returns `CanvasError` if the snapshot has an invalid size or cannot be
/// serialized.
pub fn export_json(snapshot: &CanvasSnapshot) -> Result<String, CanvasError> {
    snapshot.check_size()?;
    let value = sanitize(serde_json::to_value(snapshot)?);
    Ok(serde_json::to_string(&value)?)
}

/// Load a snapshot from stored JSON text.
///
/// # Errors
///
/// Returns `CanvasError` if the text is not a canvas or has an invalid size.
pub fn import_json(text: &str) -> Result<ImportedCanvas, CanvasError> {
    let raw: Value = serde_json::from_str(text)?;
    import_value(raw)
}

/// Load a snapshot from an already-parsed JSON value.
///
/// # Errors
///
/// Same as [`import_json`].
pub fn import_value(raw: Value) -> Result<ImportedCanvas, CanvasError> {
    let mut snapshot: CanvasSnapshot = serde_json::from_value(sanitize(raw))?;
    snapshot.check_size()?;
    let warnings = regenerate_qr_codes(&mut snapshot);
    Ok(ImportedCanvas { snapshot, warnings })
}

/// Rebuild the `path` of every QR object from its text.
///
/// The rendered size (`width * scaleX`) is kept; width/height are set to
/// the module count and the scale adjusted to compensate.
pub fn regenerate_qr_codes(snapshot: &mut CanvasSnapshot) -> Vec<CanvasWarning> {
    let mut warnings = Vec::new();
    for (index, object) in snapshot.objects.iter_mut().enumerate() {
        regenerate_object(object, &mut vec![index], &mut warnings);
    }
    warnings
}

fn regenerate_object(
    object: &mut CanvasObject,
    position: &mut Vec<usize>,
    warnings: &mut Vec<CanvasWarning>,
) {
    if let Some(text) = object.qr_text().map(str::to_owned) {
        match qr_path(&text) {
            Ok(qr) => apply_qr_path(object, &qr),
            Err(e) => warnings.push(CanvasWarning {
                object_path: position.clone(),
                message: e.to_string(),
            }),
        }
    }

    for (index, child) in object.objects.iter_mut().enumerate() {
        position.push(index);
        regenerate_object(child, position, warnings);
        position.pop();
    }
}

#[allow(clippy::cast_precision_loss)] // module counts are at most 177
fn apply_qr_path(object: &mut CanvasObject, qr: &QrPath) {
    let modules = qr.modules as f64;
    let rendered_w = object.width * object.scale_x;
    let rendered_h = object.height * object.scale_y;

    object.width = modules;
    object.height = modules;
    if rendered_w != 0.0 && rendered_h != 0.0 {
        object.scale_x = rendered_w / modules;
        object.scale_y = rendered_h / modules;
    }
    object
        .extra
        .insert("path".to_owned(), Value::String(qr.path.clone()));
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn test_import_regenerates_stale_qr_path() {
        let text = json!({
            "width": 400, "height": 300,
            "objects": [
                {"type": "path", "width": 21, "height": 21, "scaleX": 4, "scaleY": 4,
                 "path": "M0,0 garbage", "data": {"qrText": "https://signs.example/p/7"}}
            ]
        })
        .to_string();

        let imported = import_json(&text).unwrap();
        assert!(imported.warnings.is_empty());

        let qr = &imported.snapshot.objects[0];
        let expected = qr_path("https://signs.example/p/7").unwrap();
        assert_eq!(qr.extra["path"], Value::String(expected.path));
        assert!((qr.width * qr.scale_x - 84.0).abs() < 1e-9);
    }

    #[test]
    fn test_import_reports_unencodable_qr_and_keeps_going() {
        let text = json!({
            "width": 400, "height": 300,
            "objects": [
                {"type": "path", "width": 10, "height": 10, "path": "M0,0", "data": {"qrText": ""}},
                {"type": "textbox", "width": 50, "height": 10}
            ]
        })
        .to_string();

        let imported = import_json(&text).unwrap();
        assert_eq!(imported.snapshot.object_count(), 2);
        assert_eq!(imported.warnings.len(), 1);
        assert_eq!(imported.warnings[0].object_path, vec![0]);
        assert_eq!(imported.snapshot.objects[0].extra["path"], "M0,0");
    }

    #[test]
    fn test_import_rejects_zero_size() {
        let err = import_json(r#"{"width": 0, "height": 10, "objects": []}"#).unwrap_err();
        assert!(matches!(err, CanvasError::InvalidSize { .. }));
    }

    #[test]
    fn test_round_trip_preserves_objects_and_qr_text() {
        let mut snapshot = CanvasSnapshot::blank(453.5, 302.4);
        snapshot.objects.push(CanvasObject::new("textbox", 120.0, 24.0));
        snapshot
            .objects
            .push(CanvasObject::qr_code("WIFI:S:shop;T:WPA;P:secret;;", 90.0));
        let mut group = CanvasObject::new("group", 100.0, 100.0);
        group.objects.push(CanvasObject::qr_code("nested", 40.0));
        snapshot.objects.push(group);
        snapshot
            .extra
            .insert("_renderCount".to_owned(), json!(12));

        let json = export_json(&snapshot).unwrap();
        let imported = import_json(&json).unwrap();

        assert_eq!(imported.snapshot.object_count(), snapshot.object_count());
        assert_eq!(imported.snapshot.qr_texts(), snapshot.qr_texts());
        assert!(!imported.snapshot.extra.contains_key("_renderCount"));
    }
}
