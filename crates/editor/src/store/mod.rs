//! Local persistence for projects and draft signs.
//!
//! The editor keeps two stores in the `card-editor` database:
//!
//! - `projects` - named projects, each an ordered list of canvases
//! - `unsavedSigns` - draft canvases not yet attached to a project
//!
//! Canvases are sanitized on the way in and their QR codes rebuilt on the way
//! out, so a record written by an older editor (or a buggy one) loads into a
//! clean snapshot.

mod backend;
mod records;

use std::sync::Arc;

use chrono::Utc;
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use signcraft_core::canvas::{CanvasError, CanvasSnapshot, regenerate_qr_codes};
use signcraft_core::{ProjectId, UnsavedSignId};
use thiserror::Error;

pub use backend::{FileBackend, KvBackend, MemoryBackend};
pub use records::{Project, ProjectCanvas, UnsavedSign};

/// Name of the editor database.
pub const DATABASE_NAME: &str = "card-editor";
/// Store holding named projects.
pub const PROJECTS_STORE: &str = "projects";
/// Store holding draft canvases.
pub const UNSAVED_SIGNS_STORE: &str = "unsavedSigns";

/// Errors from the editor store.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// A stored value could not be decoded.
    #[error("corrupt data in store {store}: {message}")]
    DataCorruption {
        store: String,
        key: Option<String>,
        message: String,
    },

    #[error("not found: {0}")]
    NotFound(String),

    #[error("invalid store name: {0}")]
    InvalidStoreName(String),

    #[error("canvas error: {0}")]
    Canvas(#[from] CanvasError),
}

/// Result of moving drafts into a project.
#[derive(Debug, Clone)]
pub struct AttachOutcome {
    pub project: Project,
    /// Draft ids that were moved, in request order.
    pub attached: Vec<UnsavedSignId>,
    /// Requested ids with no matching draft.
    pub missing: Vec<UnsavedSignId>,
}

/// Typed access to the editor's two stores.
#[derive(Debug)]
pub struct ProjectStore<B> {
    backend: Arc<B>,
}

impl<B> Clone for ProjectStore<B> {
    fn clone(&self) -> Self {
        Self {
            backend: Arc::clone(&self.backend),
        }
    }
}

impl<B: KvBackend> ProjectStore<B> {
    #[must_use]
    pub fn new(backend: B) -> Self {
        Self::from_shared(Arc::new(backend))
    }

    /// Use a backend that is also shared with other components (e.g. the
    /// session's pointer persistence).
    #[must_use]
    pub const fn from_shared(backend: Arc<B>) -> Self {
        Self { backend }
    }

    #[must_use]
    pub const fn backend(&self) -> &Arc<B> {
        &self.backend
    }

    // =========================================================================
    // Projects
    // =========================================================================

    /// Load a project.
    ///
    /// # Errors
    ///
    /// Returns `StoreError` if the backend fails or the record is corrupt.
    pub async fn get_project(&self, id: ProjectId) -> Result<Option<Project>, StoreError> {
        let key = id.to_string();
        let Some(value) = self.backend.get(PROJECTS_STORE, &key).await? else {
            return Ok(None);
        };
        let mut project: Project = decode(PROJECTS_STORE, &key, value)?;
        for canvas in &mut project.canvases {
            repair_qr_codes(&mut canvas.canvas, &key);
        }
        Ok(Some(project))
    }

    /// Insert or replace a project. Returns the stored (sanitized) record.
    ///
    /// # Errors
    ///
    /// Returns `StoreError` if a canvas cannot be sanitized or the write fails.
    pub async fn put_project(&self, mut project: Project) -> Result<Project, StoreError> {
        project.canvases = project
            .canvases
            .into_iter()
            .map(|mut entry| {
                entry.canvas = entry.canvas.sanitized()?;
                Ok(entry)
            })
            .collect::<Result<_, StoreError>>()?;
        self.backend
            .put(PROJECTS_STORE, &project.id.to_string(), encode(&project)?)
            .await?;
        tracing::debug!(project_id = %project.id, canvases = project.canvases.len(), "Saved project");
        Ok(project)
    }

    /// Delete a project. Returns whether it existed.
    ///
    /// # Errors
    ///
    /// Returns `StoreError` if the backend fails.
    pub async fn delete_project(&self, id: ProjectId) -> Result<bool, StoreError> {
        self.backend.delete(PROJECTS_STORE, &id.to_string()).await
    }

    /// All projects, most recently updated first.
    ///
    /// # Errors
    ///
    /// Returns `StoreError` if the backend fails or a record is corrupt.
    pub async fn list_projects(&self) -> Result<Vec<Project>, StoreError> {
        let mut projects = self
            .backend
            .list(PROJECTS_STORE)
            .await?
            .into_iter()
            .map(|(key, value)| {
                let mut project = decode::<Project>(PROJECTS_STORE, &key, value)?;
                for canvas in &mut project.canvases {
                    repair_qr_codes(&mut canvas.canvas, &key);
                }
                Ok(project)
            })
            .collect::<Result<Vec<_>, StoreError>>()?;
        projects.sort_by(|a, b| b.updated_at.cmp(&a.updated_at).then(a.name.cmp(&b.name)));
        Ok(projects)
    }

    // =========================================================================
    // Unsaved signs
    // =========================================================================

    /// Load a draft.
    ///
    /// # Errors
    ///
    /// Returns `StoreError` if the backend fails or the record is corrupt.
    pub async fn get_unsaved_sign(
        &self,
        id: UnsavedSignId,
    ) -> Result<Option<UnsavedSign>, StoreError> {
        let key = id.to_string();
        let Some(value) = self.backend.get(UNSAVED_SIGNS_STORE, &key).await? else {
            return Ok(None);
        };
        let mut sign: UnsavedSign = decode(UNSAVED_SIGNS_STORE, &key, value)?;
        repair_qr_codes(&mut sign.canvas, &key);
        Ok(Some(sign))
    }

    /// Insert or replace a draft. Returns the stored (sanitized) record.
    ///
    /// # Errors
    ///
    /// Returns `StoreError` if the canvas cannot be sanitized or the write fails.
    pub async fn put_unsaved_sign(&self, mut sign: UnsavedSign) -> Result<UnsavedSign, StoreError> {
        sign.canvas = sign.canvas.sanitized()?;
        self.backend
            .put(UNSAVED_SIGNS_STORE, &sign.id.to_string(), encode(&sign)?)
            .await?;
        Ok(sign)
    }

    /// Delete a draft. Returns whether it existed.
    ///
    /// # Errors
    ///
    /// Returns `StoreError` if the backend fails.
    pub async fn delete_unsaved_sign(&self, id: UnsavedSignId) -> Result<bool, StoreError> {
        self.backend
            .delete(UNSAVED_SIGNS_STORE, &id.to_string())
            .await
    }

    /// All drafts, oldest first (the order they were started in).
    ///
    /// # Errors
    ///
    /// Returns `StoreError` if the backend fails or a record is corrupt.
    pub async fn list_unsaved_signs(&self) -> Result<Vec<UnsavedSign>, StoreError> {
        let mut signs = self
            .backend
            .list(UNSAVED_SIGNS_STORE)
            .await?
            .into_iter()
            .map(|(key, value)| {
                let mut sign = decode::<UnsavedSign>(UNSAVED_SIGNS_STORE, &key, value)?;
                repair_qr_codes(&mut sign.canvas, &key);
                Ok(sign)
            })
            .collect::<Result<Vec<_>, StoreError>>()?;
        signs.sort_by_key(|s| s.created_at);
        Ok(signs)
    }

    /// Delete every draft.
    ///
    /// # Errors
    ///
    /// Returns `StoreError` if the backend fails.
    pub async fn clear_unsaved_signs(&self) -> Result<(), StoreError> {
        self.backend.clear(UNSAVED_SIGNS_STORE).await
    }

    // =========================================================================
    // Draft migration
    // =========================================================================

    /// Append drafts to an existing project and remove them from the draft
    /// store.
    ///
    /// The project is written before any draft is deleted, so an interrupted
    /// call can leave a duplicate draft but never loses one.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::NotFound` if the project does not exist, or any
    /// backend error.
    pub async fn attach_unsaved_signs(
        &self,
        project_id: ProjectId,
        sign_ids: &[UnsavedSignId],
    ) -> Result<AttachOutcome, StoreError> {
        let mut project = self
            .get_project(project_id)
            .await?
            .ok_or_else(|| StoreError::NotFound(format!("project {project_id}")))?;

        let mut attached = Vec::with_capacity(sign_ids.len());
        let mut missing = Vec::new();
        for &sign_id in sign_ids {
            match self.get_unsaved_sign(sign_id).await? {
                Some(sign) => {
                    project.canvases.push(ProjectCanvas::from(sign));
                    attached.push(sign_id);
                }
                None => missing.push(sign_id),
            }
        }

        if !missing.is_empty() {
            tracing::warn!(
                project_id = %project_id,
                missing = ?missing,
                "Some drafts were not found and were skipped"
            );
        }

        project.updated_at = Utc::now();
        let project = self.put_project(project).await?;
        for sign_id in &attached {
            self.delete_unsaved_sign(*sign_id).await?;
        }

        tracing::info!(
            project_id = %project_id,
            attached = attached.len(),
            "Attached drafts to project"
        );
        Ok(AttachOutcome {
            project,
            attached,
            missing,
        })
    }

    /// Turn every draft into a new project and remove those drafts.
    ///
    /// Only the drafts copied into the project are deleted; one written
    /// while the project is being saved stays in the draft store.
    ///
    /// # Errors
    ///
    /// Returns `StoreError` if reading, writing or deleting fails.
    pub async fn save_unsaved_as_project(&self, name: &str) -> Result<Project, StoreError> {
        let drafts = self.list_unsaved_signs().await?;
        let copied: Vec<UnsavedSignId> = drafts.iter().map(|sign| sign.id).collect();
        let mut project = Project::new(name);
        project
            .canvases
            .extend(drafts.into_iter().map(ProjectCanvas::from));

        let project = self.put_project(project).await?;
        for sign_id in copied {
            self.delete_unsaved_sign(sign_id).await?;
        }

        tracing::info!(
            project_id = %project.id,
            canvases = project.canvases.len(),
            "Saved drafts as new project"
        );
        Ok(project)
    }
}

fn encode<T: Serialize>(record: &T) -> Result<Value, StoreError> {
    Ok(serde_json::to_value(record)?)
}

fn decode<T: DeserializeOwned>(store: &str, key: &str, value: Value) -> Result<T, StoreError> {
    serde_json::from_value(value).map_err(|e| StoreError::DataCorruption {
        store: store.to_owned(),
        key: Some(key.to_owned()),
        message: e.to_string(),
    })
}

fn repair_qr_codes(canvas: &mut CanvasSnapshot, key: &str) {
    for warning in regenerate_qr_codes(canvas) {
        tracing::warn!(
            key,
            object = ?warning.object_path,
            "Could not regenerate QR code: {}",
            warning.message
        );
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use chrono::Duration;
    use signcraft_core::canvas::CanvasObject;

    fn store() -> ProjectStore<MemoryBackend> {
        ProjectStore::new(MemoryBackend::new())
    }

    fn canvas_with_qr(text: &str) -> CanvasSnapshot {
        let mut canvas = CanvasSnapshot::blank(400.0, 300.0);
        canvas.objects.push(CanvasObject::qr_code(text, 120.0));
        canvas
    }

    #[tokio::test]
    async fn test_project_round_trip_and_delete() {
        let store = store();
        let mut project = Project::new("Office doors");
        project
            .canvases
            .push(ProjectCanvas::new(CanvasSnapshot::blank(400.0, 300.0)));
        let id = project.id;

        store.put_project(project.clone()).await.unwrap();
        let loaded = store.get_project(id).await.unwrap().unwrap();
        assert_eq!(loaded.name, "Office doors");
        assert_eq!(loaded.canvases.len(), 1);

        assert!(store.delete_project(id).await.unwrap());
        assert!(store.get_project(id).await.unwrap().is_none());
        assert!(!store.delete_project(id).await.unwrap());
    }

    #[tokio::test]
    async fn test_list_projects_newest_first() {
        let store = store();
        let now = Utc::now();
        for (name, age) in [("old", 3), ("newest", 0), ("middle", 1)] {
            let mut project = Project::new(name);
            project.updated_at = now - Duration::hours(age);
            store.put_project(project).await.unwrap();
        }

        let names: Vec<String> = store
            .list_projects()
            .await
            .unwrap()
            .into_iter()
            .map(|p| p.name)
            .collect();
        assert_eq!(names, vec!["newest", "middle", "old"]);
    }

    #[tokio::test]
    async fn test_canvases_are_sanitized_before_storage() {
        let store = store();
        let mut canvas = CanvasSnapshot::blank(400.0, 300.0);
        canvas
            .extra
            .insert("_private".to_owned(), Value::Bool(true));
        canvas.extra.insert(
            "lowerCanvasEl".to_owned(),
            serde_json::json!({"nodeType": 1, "nodeName": "CANVAS"}),
        );
        let sign = UnsavedSign::new(canvas);
        let id = sign.id;

        store.put_unsaved_sign(sign).await.unwrap();
        let raw = store
            .backend()
            .get(UNSAVED_SIGNS_STORE, &id.to_string())
            .await
            .unwrap()
            .unwrap();
        let stored_canvas = &raw["canvas"];
        assert!(stored_canvas.get("_private").is_none());
        assert!(stored_canvas.get("lowerCanvasEl").is_none());
    }

    #[tokio::test]
    async fn test_qr_paths_are_rebuilt_on_load() {
        let store = store();
        let sign = UnsavedSign::new(canvas_with_qr("https://example.com/door/12"));
        let id = sign.id;
        store.put_unsaved_sign(sign).await.unwrap();

        // Corrupt the stored path behind the store's back.
        let mut raw = store
            .backend()
            .get(UNSAVED_SIGNS_STORE, &id.to_string())
            .await
            .unwrap()
            .unwrap();
        raw["canvas"]["objects"][0]["path"] = Value::String("garbage".to_owned());
        store
            .backend()
            .put(UNSAVED_SIGNS_STORE, &id.to_string(), raw)
            .await
            .unwrap();

        let loaded = store.get_unsaved_sign(id).await.unwrap().unwrap();
        let object = &loaded.canvas.objects[0];
        assert_eq!(object.qr_text(), Some("https://example.com/door/12"));
        let path = object.extra["path"].as_str().unwrap();
        assert!(path.starts_with("M0,0h7v1h-7z"));
    }

    async fn corrupt_first_qr_path(store: &ProjectStore<MemoryBackend>, name: &str, key: &str) {
        let mut raw = store.backend().get(name, key).await.unwrap().unwrap();
        let canvas = if name == PROJECTS_STORE {
            &mut raw["canvases"][0]["canvas"]
        } else {
            &mut raw["canvas"]
        };
        canvas["objects"][0]["path"] = Value::String("garbage".to_owned());
        store.backend().put(name, key, raw).await.unwrap();
    }

    #[tokio::test]
    async fn test_qr_paths_are_rebuilt_when_listing() {
        let store = store();
        let sign = store
            .put_unsaved_sign(UnsavedSign::new(canvas_with_qr("https://example.com/door/12")))
            .await
            .unwrap();
        let mut project = Project::new("Doors");
        project
            .canvases
            .push(ProjectCanvas::new(canvas_with_qr("https://example.com/door/12")));
        let project = store.put_project(project).await.unwrap();

        corrupt_first_qr_path(&store, UNSAVED_SIGNS_STORE, &sign.id.to_string()).await;
        corrupt_first_qr_path(&store, PROJECTS_STORE, &project.id.to_string()).await;

        let drafts = store.list_unsaved_signs().await.unwrap();
        let path = drafts[0].canvas.objects[0].extra["path"].as_str().unwrap();
        assert!(path.starts_with("M0,0h7v1h-7z"));

        let projects = store.list_projects().await.unwrap();
        let path = projects[0].canvases[0].canvas.objects[0].extra["path"]
            .as_str()
            .unwrap();
        assert!(path.starts_with("M0,0h7v1h-7z"));
    }

    #[tokio::test]
    async fn test_attach_unsaved_signs() {
        let store = store();
        let project = store.put_project(Project::new("Shop")).await.unwrap();

        let first = store
            .put_unsaved_sign(UnsavedSign::new(canvas_with_qr("one")))
            .await
            .unwrap();
        let second = store
            .put_unsaved_sign(UnsavedSign::new(canvas_with_qr("two")))
            .await
            .unwrap();
        let ghost = UnsavedSignId::generate();

        let outcome = store
            .attach_unsaved_signs(project.id, &[second.id, ghost, first.id])
            .await
            .unwrap();

        assert_eq!(outcome.attached, vec![second.id, first.id]);
        assert_eq!(outcome.missing, vec![ghost]);
        let texts: Vec<&str> = outcome
            .project
            .canvases
            .iter()
            .flat_map(|c| c.canvas.qr_texts())
            .collect();
        assert_eq!(texts, vec!["two", "one"]);

        assert!(store.list_unsaved_signs().await.unwrap().is_empty());
        let stored = store.get_project(project.id).await.unwrap().unwrap();
        assert_eq!(stored.canvases.len(), 2);
    }

    #[tokio::test]
    async fn test_attach_to_unknown_project_keeps_drafts() {
        let store = store();
        let sign = store
            .put_unsaved_sign(UnsavedSign::new(CanvasSnapshot::blank(100.0, 100.0)))
            .await
            .unwrap();

        let result = store
            .attach_unsaved_signs(ProjectId::generate(), &[sign.id])
            .await;
        assert!(matches!(result, Err(StoreError::NotFound(_))));
        assert_eq!(store.list_unsaved_signs().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_save_unsaved_as_project() {
        let store = store();
        let mut first = UnsavedSign::new(canvas_with_qr("a"));
        first.created_at -= Duration::minutes(5);
        first.toolbar.copies = 4;
        store.put_unsaved_sign(first).await.unwrap();
        store
            .put_unsaved_sign(UnsavedSign::new(canvas_with_qr("b")))
            .await
            .unwrap();

        let project = store.save_unsaved_as_project("Drafts").await.unwrap();

        assert_eq!(project.name, "Drafts");
        assert_eq!(project.canvases.len(), 2);
        assert_eq!(project.canvases[0].copies_count, 4);
        assert_eq!(project.canvases[0].canvas.qr_texts(), vec!["a"]);
        assert!(store.list_unsaved_signs().await.unwrap().is_empty());
        assert!(store.get_project(project.id).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_clear_unsaved_signs() {
        let store = store();
        for text in ["a", "b"] {
            store
                .put_unsaved_sign(UnsavedSign::new(canvas_with_qr(text)))
                .await
                .unwrap();
        }
        store.clear_unsaved_signs().await.unwrap();
        assert!(store.list_unsaved_signs().await.unwrap().is_empty());
    }

    /// Writes one more draft as soon as a project is saved, the way a second
    /// editor window could between listing the drafts and removing them.
    struct LateDraftBackend {
        inner: MemoryBackend,
        late: std::sync::Mutex<Option<UnsavedSign>>,
    }

    impl KvBackend for LateDraftBackend {
        async fn get(&self, store: &str, key: &str) -> Result<Option<Value>, StoreError> {
            self.inner.get(store, key).await
        }

        async fn put(&self, store: &str, key: &str, value: Value) -> Result<(), StoreError> {
            if store == PROJECTS_STORE {
                let late = self.late.lock().unwrap().take();
                if let Some(sign) = late {
                    self.inner
                        .put(UNSAVED_SIGNS_STORE, &sign.id.to_string(), encode(&sign)?)
                        .await?;
                }
            }
            self.inner.put(store, key, value).await
        }

        async fn delete(&self, store: &str, key: &str) -> Result<bool, StoreError> {
            self.inner.delete(store, key).await
        }

        async fn list(&self, store: &str) -> Result<Vec<(String, Value)>, StoreError> {
            self.inner.list(store).await
        }

        async fn clear(&self, store: &str) -> Result<(), StoreError> {
            self.inner.clear(store).await
        }
    }

    #[tokio::test]
    async fn test_save_unsaved_as_project_keeps_late_draft() {
        let late = UnsavedSign::new(canvas_with_qr("late"));
        let late_id = late.id;
        let store = ProjectStore::new(LateDraftBackend {
            inner: MemoryBackend::new(),
            late: std::sync::Mutex::new(Some(late)),
        });
        store
            .put_unsaved_sign(UnsavedSign::new(canvas_with_qr("early")))
            .await
            .unwrap();

        let project = store.save_unsaved_as_project("Drafts").await.unwrap();

        assert_eq!(project.canvases.len(), 1);
        assert_eq!(project.canvases[0].canvas.qr_texts(), vec!["early"]);
        let remaining = store.list_unsaved_signs().await.unwrap();
        assert_eq!(remaining.len(), 1);
        assert_eq!(remaining[0].id, late_id);
    }

    #[tokio::test]
    async fn test_corrupt_record_is_reported() {
        let store = store();
        let id = ProjectId::generate();
        store
            .backend()
            .put(PROJECTS_STORE, &id.to_string(), serde_json::json!({"name": 5}))
            .await
            .unwrap();
        assert!(matches!(
            store.get_project(id).await,
            Err(StoreError::DataCorruption { .. })
        ));
    }
}
