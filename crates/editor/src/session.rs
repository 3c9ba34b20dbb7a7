//! Editor session state shared between editor components.
//!
//! The toolbar, the accessory picker, the canvas list and the cart button all
//! need to know which project and canvas are open and what the toolbar is set
//! to. They share one [`EditorSession`] handle instead of reaching into
//! process-wide globals.

use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use signcraft_core::pricing::AccessoryLine;
use signcraft_core::{CanvasId, ProjectId};

use crate::store::{KvBackend, StoreError};

/// Store holding the session pointers.
pub const LOCAL_STATE_STORE: &str = "localState";
/// Key of the open project id.
pub const CURRENT_PROJECT_KEY: &str = "currentProjectId";
/// Key of the open canvas id.
pub const CURRENT_CANVAS_KEY: &str = "currentCanvasId";

/// Material and quantity choices on the editor toolbar.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolbarState {
    pub thickness_mm: Decimal,
    #[serde(default)]
    pub tape: bool,
    #[serde(default)]
    pub border: bool,
    pub copies: u32,
    /// Colour scheme, font and other presentation-only settings.
    #[serde(default, flatten)]
    pub extra: Map<String, Value>,
}

impl Default for ToolbarState {
    fn default() -> Self {
        Self {
            thickness_mm: Decimal::new(16, 1),
            tape: false,
            border: false,
            copies: 1,
            extra: Map::new(),
        }
    }
}

/// Plain copy of the session at one point in time.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SessionState {
    pub current_project_id: Option<ProjectId>,
    pub current_canvas_id: Option<CanvasId>,
    pub selected_accessories: Vec<AccessoryLine>,
    pub toolbar: ToolbarState,
}

/// Cloneable handle to the editor session.
#[derive(Debug, Clone, Default)]
pub struct EditorSession {
    inner: Arc<RwLock<SessionState>>,
}

impl EditorSession {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Start a session with the project/canvas pointers saved by the previous
    /// one. Unreadable pointers are logged and ignored.
    pub async fn restore<B: KvBackend>(backend: &B) -> Self {
        let session = Self::new();
        let project = read_pointer(backend, CURRENT_PROJECT_KEY).await;
        let canvas = read_pointer(backend, CURRENT_CANVAS_KEY).await;
        {
            let mut state = session.write();
            state.current_project_id = project.map(ProjectId::new);
            state.current_canvas_id = canvas.map(CanvasId::new);
        }
        session
    }

    /// Save the project/canvas pointers.
    ///
    /// # Errors
    ///
    /// Returns `StoreError` if the backend write fails.
    pub async fn persist<B: KvBackend>(&self, backend: &B) -> Result<(), StoreError> {
        let (project, canvas) = {
            let state = self.read();
            (state.current_project_id, state.current_canvas_id)
        };
        write_pointer(backend, CURRENT_PROJECT_KEY, project.map(|id| id.to_string())).await?;
        write_pointer(backend, CURRENT_CANVAS_KEY, canvas.map(|id| id.to_string())).await
    }

    #[must_use]
    pub fn snapshot(&self) -> SessionState {
        self.read().clone()
    }

    #[must_use]
    pub fn current_project(&self) -> Option<ProjectId> {
        self.read().current_project_id
    }

    /// Open a project. Clears the canvas pointer when the project changes.
    pub fn set_current_project(&self, id: Option<ProjectId>) {
        let mut state = self.write();
        if state.current_project_id != id {
            state.current_canvas_id = None;
        }
        state.current_project_id = id;
    }

    #[must_use]
    pub fn current_canvas(&self) -> Option<CanvasId> {
        self.read().current_canvas_id
    }

    pub fn set_current_canvas(&self, id: Option<CanvasId>) {
        self.write().current_canvas_id = id;
    }

    #[must_use]
    pub fn selected_accessories(&self) -> Vec<AccessoryLine> {
        self.read().selected_accessories.clone()
    }

    pub fn set_selected_accessories(&self, accessories: Vec<AccessoryLine>) {
        self.write().selected_accessories = accessories;
    }

    #[must_use]
    pub fn toolbar(&self) -> ToolbarState {
        self.read().toolbar.clone()
    }

    /// Modify the toolbar state and return the new value.
    pub fn update_toolbar(&self, update: impl FnOnce(&mut ToolbarState)) -> ToolbarState {
        let mut state = self.write();
        update(&mut state.toolbar);
        state.toolbar.copies = state.toolbar.copies.max(1);
        state.toolbar.clone()
    }

    fn read(&self) -> RwLockReadGuard<'_, SessionState> {
        self.inner.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, SessionState> {
        self.inner.write().unwrap_or_else(PoisonError::into_inner)
    }
}

async fn read_pointer<B: KvBackend>(backend: &B, key: &str) -> Option<uuid::Uuid> {
    match backend.get(LOCAL_STATE_STORE, key).await {
        Ok(Some(Value::String(raw))) => match raw.parse() {
            Ok(id) => Some(id),
            Err(e) => {
                tracing::warn!(key, error = %e, "Ignoring malformed session pointer");
                None
            }
        },
        Ok(_) => None,
        Err(e) => {
            tracing::warn!(key, error = %e, "Failed to read session pointer");
            None
        }
    }
}

async fn write_pointer<B: KvBackend>(
    backend: &B,
    key: &str,
    value: Option<String>,
) -> Result<(), StoreError> {
    match value {
        Some(id) => backend.put(LOCAL_STATE_STORE, key, Value::String(id)).await,
        None => backend.delete(LOCAL_STATE_STORE, key).await.map(|_| ()),
    }
}
