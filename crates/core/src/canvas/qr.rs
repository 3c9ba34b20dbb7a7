//! QR code vector paths.
//!
//! QR objects are stored with their payload text; the vector path is
//! rebuilt from the text whenever a canvas is loaded so the rendered code
//! always matches what is printed on the order.

use qrcode::{Color, EcLevel, QrCode};
use thiserror::Error;

/// Errors from building a QR path.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum QrError {
    /// Nothing to encode.
    #[error("QR text is empty")]
    EmptyText,
    /// The encoder rejected the payload (usually too long).
    #[error("cannot encode QR code: {0}")]
    Encode(String),
}

/// SVG path data for a QR code, one unit per module.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QrPath {
    /// Path data (`M x,y h n v1 h -n z` per horizontal run of dark modules).
    pub path: String,
    /// Modules per side.
    pub modules: usize,
}

/// Encode `text` with medium error correction and trace its dark modules.
///
/// # Errors
///
/// Returns `QrError::EmptyText` for empty input and `QrError::Encode` when
/// the payload does not fit in a QR code.
pub fn qr_path(text: &str) -> Result<QrPath, QrError> {
    if text.is_empty() {
        return Err(QrError::EmptyText);
    }

    let code = QrCode::with_error_correction_level(text.as_bytes(), EcLevel::M)
        .map_err(|e| QrError::Encode(e.to_string()))?;
    let modules = code.width();
    let colors = code.to_colors();

    let mut path = String::new();
    for (y, row) in colors.chunks(modules).enumerate() {
        let mut x = 0;
        while x < row.len() {
            if row.get(x) != Some(&Color::Dark) {
                x += 1;
                continue;
            }
            let start = x;
            while row.get(x) == Some(&Color::Dark) {
                x += 1;
            }
            let run = x - start;
            path.push_str(&format!("M{start},{y}h{run}v1h-{run}z"));
        }
    }

    Ok(QrPath { path, modules })
}
