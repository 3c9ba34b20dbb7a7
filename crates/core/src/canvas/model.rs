//! Canvas snapshot types.
//!
//! A snapshot is the JSON the drawing library exports for one sign. Only the
//! properties the shop reasons about (geometry, visibility, editor metadata)
//! are typed; everything else round-trips untouched through `extra`.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

const fn one() -> f64 {
    1.0
}

const fn yes() -> bool {
    true
}

#[allow(clippy::trivially_copy_pass_by_ref)] // serde skip_serializing_if signature
const fn is_false(value: &bool) -> bool {
    !*value
}

/// Serialized state of one sign canvas.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CanvasSnapshot {
    /// Drawing library version that produced the snapshot.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    /// Canvas width in pixels.
    pub width: f64,
    /// Canvas height in pixels.
    pub height: f64,
    /// Background fill (colour string or pattern object).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub background: Option<Value>,
    /// Objects in z-order, bottom first.
    #[serde(default)]
    pub objects: Vec<CanvasObject>,
    /// Remaining library properties.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl CanvasSnapshot {
    /// An empty canvas of the given pixel size.
    #[must_use]
    pub fn blank(width: f64, height: f64) -> Self {
        Self {
            version: None,
            width,
            height,
            background: None,
            objects: Vec::new(),
            extra: Map::new(),
        }
    }

    /// Number of top-level objects.
    #[must_use]
    pub fn object_count(&self) -> usize {
        self.objects.len()
    }

    /// Visit every object depth-first, including group children.
    pub fn walk<'a>(&'a self, visit: &mut impl FnMut(&'a CanvasObject)) {
        for object in &self.objects {
            object.walk(visit);
        }
    }

    /// Visit every object mutably, depth-first.
    pub fn walk_mut(&mut self, visit: &mut impl FnMut(&mut CanvasObject)) {
        for object in &mut self.objects {
            object.walk_mut(visit);
        }
    }

    /// QR payloads of all QR objects, in document order.
    #[must_use]
    pub fn qr_texts(&self) -> Vec<&str> {
        let mut texts = Vec::new();
        self.walk(&mut |object| {
            if let Some(text) = object.qr_text() {
                texts.push(text);
            }
        });
        texts
    }

    /// Whether the design has a border frame.
    #[must_use]
    pub fn has_border(&self) -> bool {
        self.objects.iter().any(CanvasObject::is_border)
    }

    /// Font families referenced by text objects, deduplicated, in first-use order.
    #[must_use]
    pub fn font_families(&self) -> Vec<String> {
        let mut families: Vec<String> = Vec::new();
        self.walk(&mut |object| {
            if let Some(Value::String(family)) = object.extra.get("fontFamily")
                && !families.iter().any(|f| f == family)
            {
                families.push(family.clone());
            }
        });
        families
    }
}

/// One drawable object on the canvas.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CanvasObject {
    /// Library object type (`textbox`, `image`, `rect`, `path`, `group`, ...).
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub left: f64,
    #[serde(default)]
    pub top: f64,
    /// Unscaled width in pixels.
    #[serde(default)]
    pub width: f64,
    /// Unscaled height in pixels.
    #[serde(default)]
    pub height: f64,
    #[serde(default = "one")]
    pub scale_x: f64,
    #[serde(default = "one")]
    pub scale_y: f64,
    /// Rotation in degrees.
    #[serde(default)]
    pub angle: f64,
    #[serde(default = "yes")]
    pub visible: bool,
    /// Editor metadata attached to the object.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<ObjectData>,
    /// Children of a group.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub objects: Vec<CanvasObject>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl CanvasObject {
    /// A plain object of the given type and unscaled size.
    #[must_use]
    pub fn new(kind: impl Into<String>, width: f64, height: f64) -> Self {
        Self {
            kind: kind.into(),
            left: 0.0,
            top: 0.0,
            width,
            height,
            scale_x: 1.0,
            scale_y: 1.0,
            angle: 0.0,
            visible: true,
            data: None,
            objects: Vec::new(),
            extra: Map::new(),
        }
    }

    /// A QR code object encoding `text`. The path is filled in by
    /// [`super::regenerate_qr_codes`].
    #[must_use]
    pub fn qr_code(text: impl Into<String>, size_px: f64) -> Self {
        let mut object = Self::new("path", size_px, size_px);
        object.data = Some(ObjectData {
            qr_text: Some(text.into()),
            ..ObjectData::default()
        });
        object
    }

    /// QR payload when this object is a QR code.
    #[must_use]
    pub fn qr_text(&self) -> Option<&str> {
        self.data.as_ref().and_then(|d| d.qr_text.as_deref())
    }

    #[must_use]
    pub fn is_border(&self) -> bool {
        self.data.as_ref().is_some_and(|d| d.is_border)
    }

    /// Whether the object is engraved and therefore priced.
    ///
    /// Hidden objects, the border frame, cut outlines and the background
    /// plate are not engraved.
    #[must_use]
    pub fn is_engraved(&self) -> bool {
        if !self.visible {
            return false;
        }
        self.data
            .as_ref()
            .is_none_or(|d| !(d.is_border || d.is_cut_outline || d.is_background))
    }

    fn walk<'a>(&'a self, visit: &mut impl FnMut(&'a Self)) {
        visit(self);
        for child in &self.objects {
            child.walk(visit);
        }
    }

    fn walk_mut(&mut self, visit: &mut impl FnMut(&mut Self)) {
        visit(self);
        for child in &mut self.objects {
            child.walk_mut(visit);
        }
    }
}

/// Editor metadata stored under an object's `data` property.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ObjectData {
    /// Text encoded by a QR code object.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub qr_text: Option<String>,
    /// The frame drawn around the sign edge.
    #[serde(default, skip_serializing_if = "is_false")]
    pub is_border: bool,
    /// The contour the plate is cut along.
    #[serde(default, skip_serializing_if = "is_false")]
    pub is_cut_outline: bool,
    /// The plate itself.
    #[serde(default, skip_serializing_if = "is_false")]
    pub is_background: bool,
    /// Accessory (holes, mounting tape, stand) the object represents.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub accessory_id: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}
