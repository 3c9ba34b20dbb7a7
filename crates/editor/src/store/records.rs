//! Records kept in the editor store.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use signcraft_core::canvas::CanvasSnapshot;
use signcraft_core::pricing::AccessoryLine;
use signcraft_core::{CanvasId, ProjectId, UnsavedSignId};

use crate::session::ToolbarState;

/// A named collection of sign canvases.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Project {
    pub id: ProjectId,
    pub name: String,
    #[serde(default)]
    pub canvases: Vec<ProjectCanvas>,
    #[serde(default)]
    pub accessories: Vec<AccessoryLine>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Project {
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id: ProjectId::generate(),
            name: name.into(),
            canvases: Vec::new(),
            accessories: Vec::new(),
            created_at: now,
            updated_at: now,
        }
    }

    #[must_use]
    pub fn canvas(&self, id: CanvasId) -> Option<&ProjectCanvas> {
        self.canvases.iter().find(|c| c.id == id)
    }

    pub fn canvas_mut(&mut self, id: CanvasId) -> Option<&mut ProjectCanvas> {
        self.canvases.iter_mut().find(|c| c.id == id)
    }

    /// Total number of physical signs across all canvases.
    #[must_use]
    pub fn sign_count(&self) -> u32 {
        self.canvases
            .iter()
            .fold(0_u32, |count, c| count.saturating_add(c.copies_count))
    }
}

/// One canvas inside a project.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectCanvas {
    pub id: CanvasId,
    pub canvas: CanvasSnapshot,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub preview_svg: Option<String>,
    pub copies_count: u32,
    #[serde(default)]
    pub toolbar: ToolbarState,
    pub updated_at: DateTime<Utc>,
}

impl ProjectCanvas {
    #[must_use]
    pub fn new(canvas: CanvasSnapshot) -> Self {
        Self {
            id: CanvasId::generate(),
            canvas,
            preview_svg: None,
            copies_count: 1,
            toolbar: ToolbarState::default(),
            updated_at: Utc::now(),
        }
    }
}

impl From<UnsavedSign> for ProjectCanvas {
    fn from(sign: UnsavedSign) -> Self {
        Self {
            id: CanvasId::new(sign.id.as_uuid()),
            copies_count: sign.toolbar.copies.max(1),
            canvas: sign.canvas,
            preview_svg: sign.preview_svg,
            toolbar: sign.toolbar,
            updated_at: Utc::now(),
        }
    }
}

/// A draft canvas that does not belong to a project yet.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UnsavedSign {
    pub id: UnsavedSignId,
    pub canvas: CanvasSnapshot,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub preview_svg: Option<String>,
    #[serde(default)]
    pub toolbar: ToolbarState,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl UnsavedSign {
    #[must_use]
    pub fn new(canvas: CanvasSnapshot) -> Self {
        let now = Utc::now();
        Self {
            id: UnsavedSignId::generate(),
            canvas,
            preview_svg: None,
            toolbar: ToolbarState::default(),
            created_at: now,
            updated_at: now,
        }
    }
}
