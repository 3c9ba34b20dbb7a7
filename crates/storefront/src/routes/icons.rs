//! Icon asset handlers.

use axum::{
    Json,
    extract::{Path, State},
    http::header::{CACHE_CONTROL, CONTENT_TYPE},
    response::IntoResponse,
};
use tracing::instrument;

use signcraft_core::api::IconView;

use crate::error::Result;
use crate::state::AppState;

/// All icons, sorted by name.
#[instrument(skip(state))]
pub async fn index(State(state): State<AppState>) -> Result<Json<Vec<IconView>>> {
    let icons = state.icons().list().await?;
    Ok(Json(icons.as_ref().clone()))
}

/// One icon file.
#[instrument(skip(state))]
pub async fn show(
    State(state): State<AppState>,
    Path(name): Path<String>,
) -> Result<impl IntoResponse> {
    let icon = state.icons().get(&name).await?;
    Ok((
        [
            (CONTENT_TYPE, icon.content_type),
            (CACHE_CONTROL, "public, max-age=86400"),
        ],
        icon.bytes,
    ))
}
