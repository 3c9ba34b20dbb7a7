//! Integration tests for the editor's on-disk project store.
//!
//! Projects and drafts are written through one `FileBackend`, read back
//! through a fresh one, and finally turned into a cart request that the
//! server-side pricing accepts.

#![allow(clippy::unwrap_used)]

use rust_decimal::Decimal;
use serde_json::json;

use signcraft_core::UserType;
use signcraft_core::canvas::{CanvasObject, CanvasSnapshot, mm_to_px};
use signcraft_core::pricing::{CustomerContext, PricingConfig};
use signcraft_editor::{
    FileBackend, Project, ProjectCanvas, ProjectStore, StoreError, UnsavedSign, cart_request,
};
use signcraft_storefront::services::pricing::price_cart;

const DATABASE: &str = "signcraft-editor";

async fn open(root: &tempfile::TempDir) -> ProjectStore<FileBackend> {
    ProjectStore::new(FileBackend::open(root.path(), DATABASE).await.unwrap())
}

fn plate(width_mm: f64, height_mm: f64) -> CanvasSnapshot {
    CanvasSnapshot::blank(mm_to_px(width_mm), mm_to_px(height_mm))
}

// =============================================================================
// Persistence Tests
// =============================================================================

#[tokio::test]
async fn test_project_survives_reopening_the_store() {
    let root = tempfile::tempdir().unwrap();

    let mut project = Project::new("Office doors");
    let mut entry = ProjectCanvas::new(plate(120.0, 80.0));
    entry.copies_count = 4;
    project.canvases.push(entry);
    let saved = open(&root).await.put_project(project).await.unwrap();

    let reopened = open(&root).await;
    let loaded = reopened.get_project(saved.id).await.unwrap().unwrap();
    assert_eq!(loaded.name, "Office doors");
    assert_eq!(loaded.sign_count(), 4);
    assert_eq!(reopened.list_projects().await.unwrap().len(), 1);

    assert!(reopened.delete_project(saved.id).await.unwrap());
    assert!(open(&root).await.get_project(saved.id).await.unwrap().is_none());
}

#[tokio::test]
async fn test_transient_canvas_keys_are_not_persisted() {
    let root = tempfile::tempdir().unwrap();
    let store = open(&root).await;

    let mut canvas = plate(100.0, 50.0);
    canvas.extra.insert("_hoverCursor".to_owned(), json!("pointer"));
    let mut text = CanvasObject::new("textbox", 40.0, 10.0);
    text.extra.insert("_cacheCanvas".to_owned(), json!({"w": 1}));
    canvas.objects.push(text);

    let draft = store
        .put_unsaved_sign(UnsavedSign::new(canvas))
        .await
        .unwrap();

    let file = std::fs::read_to_string(
        store
            .backend()
            .dir()
            .read_dir()
            .unwrap()
            .map(|entry| entry.unwrap().path())
            .find(|path| path.is_file())
            .unwrap(),
    )
    .unwrap();
    assert!(file.contains(&draft.id.to_string()));
    assert!(!file.contains("_hoverCursor"));
    assert!(!file.contains("_cacheCanvas"));
}

// =============================================================================
// Draft Migration Tests
// =============================================================================

#[tokio::test]
async fn test_drafts_move_into_project() {
    let root = tempfile::tempdir().unwrap();
    let store = open(&root).await;

    let project = store.put_project(Project::new("Menu boards")).await.unwrap();
    let first = store
        .put_unsaved_sign(UnsavedSign::new(plate(120.0, 80.0)))
        .await
        .unwrap();
    let second = store
        .put_unsaved_sign(UnsavedSign::new(plate(200.0, 100.0)))
        .await
        .unwrap();
    let kept = store
        .put_unsaved_sign(UnsavedSign::new(plate(50.0, 50.0)))
        .await
        .unwrap();
    let unknown = UnsavedSign::new(plate(10.0, 10.0)).id;

    let outcome = store
        .attach_unsaved_signs(project.id, &[first.id, second.id, unknown])
        .await
        .unwrap();

    assert_eq!(outcome.attached, vec![first.id, second.id]);
    assert_eq!(outcome.missing, vec![unknown]);
    assert_eq!(outcome.project.canvases.len(), 2);

    let reopened = open(&root).await;
    let drafts = reopened.list_unsaved_signs().await.unwrap();
    assert_eq!(drafts.len(), 1);
    assert_eq!(drafts[0].id, kept.id);
    let stored = reopened.get_project(project.id).await.unwrap().unwrap();
    assert_eq!(stored.canvases.len(), 2);
}

#[tokio::test]
async fn test_attach_to_missing_project_keeps_drafts() {
    let root = tempfile::tempdir().unwrap();
    let store = open(&root).await;
    let draft = store
        .put_unsaved_sign(UnsavedSign::new(plate(120.0, 80.0)))
        .await
        .unwrap();

    let result = store
        .attach_unsaved_signs(Project::new("never saved").id, &[draft.id])
        .await;

    assert!(matches!(result, Err(StoreError::NotFound(_))));
    assert!(store.get_unsaved_sign(draft.id).await.unwrap().is_some());
}

// =============================================================================
// Store to Cart Tests
// =============================================================================

#[tokio::test]
async fn test_saved_drafts_price_like_the_server() {
    let root = tempfile::tempdir().unwrap();
    let store = open(&root).await;

    let mut draft = UnsavedSign::new(plate(120.0, 80.0));
    draft.toolbar.copies = 2;
    store.put_unsaved_sign(draft).await.unwrap();
    let mut taped = UnsavedSign::new(plate(120.0, 80.0));
    taped.toolbar.tape = true;
    store.put_unsaved_sign(taped).await.unwrap();

    let project = store.save_unsaved_as_project("Reception").await.unwrap();
    assert!(store.list_unsaved_signs().await.unwrap().is_empty());
    assert_eq!(project.sign_count(), 3);

    let request = cart_request(&project, Some("UA".to_owned())).unwrap();
    let priced = price_cart(
        &request.canvases,
        &request.accessories,
        &PricingConfig::default(),
        &CustomerContext::new("UA", UserType::Consumer),
    )
    .unwrap();

    assert_eq!(priced.quote.sign_count(), 3);
    let mut units: Vec<Decimal> = priced.quote.lines.iter().map(|l| l.unit.unit).collect();
    units.sort();
    // 1.6 mm without tape (k 1.00) and with tape (k 1.15)
    assert_eq!(units, vec![Decimal::new(1219, 2), Decimal::new(1385, 2)]);
}
