//! Template and category route handlers.
//!
//! Reads are public; writes need an admin token. Stored canvases are
//! sanitized the same way cart canvases are.

use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
};
use serde::Deserialize;
use serde_json::Value;
use tracing::instrument;

use signcraft_core::api::{CategoryInput, CategoryView, TemplateInput, TemplateView};
use signcraft_core::canvas::import_value;
use signcraft_core::{TemplateCategoryId, TemplateId};

use crate::db::{RepositoryError, TemplateRepository};
use crate::error::{AppError, Result};
use crate::middleware::RequireAdmin;
use crate::state::AppState;

/// Longest accepted template or category name.
const MAX_NAME_LEN: usize = 200;

/// Query params for the template listing.
#[derive(Debug, Deserialize)]
pub struct TemplateQuery {
    pub category: Option<TemplateCategoryId>,
}

fn clean_name(name: &str, what: &str) -> Result<String> {
    let name = name.trim();
    if name.is_empty() {
        return Err(AppError::BadRequest(format!("{what} name is required")));
    }
    if name.chars().count() > MAX_NAME_LEN {
        return Err(AppError::BadRequest(format!(
            "{what} name must be at most {MAX_NAME_LEN} characters"
        )));
    }
    Ok(name.to_owned())
}

/// Sanitize the canvas and normalize the name.
fn clean_input(input: TemplateInput) -> Result<TemplateInput> {
    let imported =
        import_value(input.canvas).map_err(|e| AppError::BadRequest(format!("canvas: {e}")))?;
    let canvas: Value = serde_json::to_value(&imported.snapshot)
        .map_err(|e| AppError::Internal(format!("canvas serialization: {e}")))?;

    Ok(TemplateInput {
        name: clean_name(&input.name, "Template")?,
        category_id: input.category_id,
        canvas,
        preview_svg: input.preview_svg,
    })
}

fn unknown_category() -> AppError {
    AppError::BadRequest("Unknown template category".to_string())
}

/// List templates, optionally by category.
#[instrument(skip(state))]
pub async fn index(
    State(state): State<AppState>,
    Query(query): Query<TemplateQuery>,
) -> Result<Json<Vec<TemplateView>>> {
    let templates = TemplateRepository::new(state.pool())
        .list(query.category)
        .await?;
    Ok(Json(templates))
}

/// One template.
#[instrument(skip(state))]
pub async fn show(
    State(state): State<AppState>,
    Path(id): Path<TemplateId>,
) -> Result<Json<TemplateView>> {
    TemplateRepository::new(state.pool())
        .get(id)
        .await?
        .map(Json)
        .ok_or_else(|| AppError::NotFound("Template not found".to_string()))
}

/// Create a template.
#[instrument(skip(state, admin, input), fields(admin_id = %admin.id))]
pub async fn create(
    RequireAdmin(admin): RequireAdmin,
    State(state): State<AppState>,
    Json(input): Json<TemplateInput>,
) -> Result<impl IntoResponse> {
    let input = clean_input(input)?;
    let template = TemplateRepository::new(state.pool())
        .create(&input)
        .await
        .map_err(|e| match e {
            RepositoryError::NotFound => unknown_category(),
            other => other.into(),
        })?;

    tracing::info!(template_id = %template.id, name = %template.name, "Template created");
    Ok((StatusCode::CREATED, Json(template)))
}

/// Replace a template.
#[instrument(skip(state, admin, input), fields(admin_id = %admin.id))]
pub async fn update(
    RequireAdmin(admin): RequireAdmin,
    State(state): State<AppState>,
    Path(id): Path<TemplateId>,
    Json(input): Json<TemplateInput>,
) -> Result<Json<TemplateView>> {
    let input = clean_input(input)?;
    let repo = TemplateRepository::new(state.pool());

    match repo.update(id, &input).await {
        Ok(template) => {
            tracing::info!(template_id = %id, "Template updated");
            Ok(Json(template))
        }
        // NotFound is either the template or its new category
        Err(RepositoryError::NotFound) => match repo.get(id).await? {
            Some(_) => Err(unknown_category()),
            None => Err(AppError::NotFound("Template not found".to_string())),
        },
        Err(e) => Err(e.into()),
    }
}

/// Delete a template.
#[instrument(skip(state, admin), fields(admin_id = %admin.id))]
pub async fn delete(
    RequireAdmin(admin): RequireAdmin,
    State(state): State<AppState>,
    Path(id): Path<TemplateId>,
) -> Result<StatusCode> {
    if !TemplateRepository::new(state.pool()).delete(id).await? {
        return Err(AppError::NotFound("Template not found".to_string()));
    }
    tracing::info!(template_id = %id, "Template deleted");
    Ok(StatusCode::NO_CONTENT)
}

/// List categories.
#[instrument(skip(state))]
pub async fn categories(State(state): State<AppState>) -> Result<Json<Vec<CategoryView>>> {
    let categories = TemplateRepository::new(state.pool())
        .list_categories()
        .await?;
    Ok(Json(categories))
}

/// Create a category.
#[instrument(skip(state, admin, input), fields(admin_id = %admin.id))]
pub async fn create_category(
    RequireAdmin(admin): RequireAdmin,
    State(state): State<AppState>,
    Json(input): Json<CategoryInput>,
) -> Result<impl IntoResponse> {
    let name = clean_name(&input.name, "Category")?;
    let category = TemplateRepository::new(state.pool())
        .create_category(&name)
        .await?;

    tracing::info!(category_id = %category.id, name = %category.name, "Category created");
    Ok((StatusCode::CREATED, Json(category)))
}

/// Delete a category; its templates become uncategorised.
#[instrument(skip(state, admin), fields(admin_id = %admin.id))]
pub async fn delete_category(
    RequireAdmin(admin): RequireAdmin,
    State(state): State<AppState>,
    Path(id): Path<TemplateCategoryId>,
) -> Result<StatusCode> {
    if !TemplateRepository::new(state.pool())
        .delete_category(id)
        .await?
    {
        return Err(AppError::NotFound("Category not found".to_string()));
    }
    tracing::info!(category_id = %id, "Category deleted");
    Ok(StatusCode::NO_CONTENT)
}
