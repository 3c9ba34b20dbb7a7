//! Invoice and delivery note handlers.

use axum::{
    extract::{Path, Query, State},
    http::header::{CONTENT_DISPOSITION, CONTENT_TYPE},
    response::{Html, IntoResponse},
};
use serde::Deserialize;
use tracing::instrument;

use signcraft_core::OrderId;

use crate::error::Result;
use crate::middleware::RequireAuth;
use crate::models::CurrentUser;
use crate::routes::cart::load_order;
use crate::services::auth::AuthService;
use crate::services::documents::{DocumentKind, render_html};
use crate::services::pdf::{DocumentError, PdfRenderer};
use crate::state::AppState;

/// Query params for document endpoints.
#[derive(Debug, Deserialize)]
pub struct DocumentQuery {
    /// `invoice` (default) or `delivery-note`.
    #[serde(rename = "type", default)]
    pub kind: DocumentKind,
}

async fn document_html(
    state: &AppState,
    caller: &CurrentUser,
    id: OrderId,
    kind: DocumentKind,
) -> Result<(String, String)> {
    let (order, project) = load_order(state, caller, id).await?;
    let buyer = AuthService::new(state.pool())
        .get_user(order.user_id)
        .await?;
    let html = render_html(kind, &buyer, &order, &project).map_err(DocumentError::from)?;
    Ok((order.order_number, html))
}

/// HTML preview of a document.
#[instrument(skip(state, user), fields(user_id = %user.id))]
pub async fn html(
    RequireAuth(user): RequireAuth,
    State(state): State<AppState>,
    Path(id): Path<OrderId>,
    Query(query): Query<DocumentQuery>,
) -> Result<Html<String>> {
    let (_, html) = document_html(&state, &user, id, query.kind).await?;
    Ok(Html(html))
}

/// Document as PDF.
#[instrument(skip(state, user), fields(user_id = %user.id))]
pub async fn pdf(
    RequireAuth(user): RequireAuth,
    State(state): State<AppState>,
    Path(id): Path<OrderId>,
    Query(query): Query<DocumentQuery>,
) -> Result<impl IntoResponse> {
    let renderer = state.pdf().ok_or(DocumentError::Unavailable)?;
    let (order_number, html) = document_html(&state, &user, id, query.kind).await?;
    let pdf = renderer.render(&html).await?;

    tracing::info!(order_id = %id, kind = %query.kind, bytes = pdf.len(), "Document rendered");
    Ok((
        [
            (CONTENT_TYPE, "application/pdf".to_string()),
            (
                CONTENT_DISPOSITION,
                format!("inline; filename=\"{}\"", query.kind.file_name(&order_number)),
            ),
        ],
        pdf,
    ))
}
