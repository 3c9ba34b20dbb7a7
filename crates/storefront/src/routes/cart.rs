//! Cart and order route handlers.
//!
//! Submitting a cart places an order: every canvas is repriced on the
//! server, then the cart project and its order are stored together.

use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
};
use serde::Deserialize;
use tracing::instrument;

use signcraft_core::api::{AddToCartRequest, CartEntry, OrderSummary, StatusUpdate};
use signcraft_core::pricing::CustomerContext;
use signcraft_core::{OrderId, OrderStatus};

use crate::db::OrderRepository;
use crate::error::{AppError, Result, add_breadcrumb};
use crate::middleware::{RequireAdmin, RequireAuth};
use crate::models::order::cart_entry;
use crate::models::{CartProject, CurrentUser, NewOrder, Order, User};
use crate::services::auth::{AuthService, is_country_code};
use crate::services::pricing::price_cart;
use crate::state::AppState;

/// Longest accepted project name.
const MAX_PROJECT_NAME_LEN: usize = 200;

/// Query params for the admin order listing.
#[derive(Debug, Deserialize)]
pub struct OrdersQuery {
    pub status: Option<OrderStatus>,
}

/// Delivery country: explicit, then billing country, then the seller's.
fn resolve_country(requested: Option<&str>, user: &User, home_country: &str) -> Result<String> {
    let country = requested
        .map(str::trim)
        .filter(|c| !c.is_empty())
        .or_else(|| user.country())
        .unwrap_or(home_country)
        .to_ascii_uppercase();

    if !is_country_code(&country) {
        return Err(AppError::BadRequest(
            "country must be a two-letter code".to_string(),
        ));
    }
    Ok(country)
}

fn clean_project_name(name: &str) -> Result<String> {
    let name = name.trim();
    if name.is_empty() {
        return Err(AppError::BadRequest("project_name is required".to_string()));
    }
    if name.chars().count() > MAX_PROJECT_NAME_LEN {
        return Err(AppError::BadRequest(format!(
            "project_name must be at most {MAX_PROJECT_NAME_LEN} characters"
        )));
    }
    Ok(name.to_owned())
}

/// Load an order the caller may see. Other users' orders are reported as
/// missing.
pub(crate) async fn load_order(
    state: &AppState,
    caller: &CurrentUser,
    id: OrderId,
) -> Result<(Order, CartProject)> {
    let (order, project) = OrderRepository::new(state.pool())
        .get_with_project(id)
        .await?
        .ok_or_else(|| AppError::NotFound("Order not found".to_string()))?;

    if !caller.can_access(order.user_id) {
        tracing::warn!(user_id = %caller.id, order_id = %id, "Order access denied");
        return Err(AppError::NotFound("Order not found".to_string()));
    }
    Ok((order, project))
}

/// Place an order for the submitted canvases.
#[instrument(skip(state, user, request), fields(user_id = %user.id, canvases = request.canvases.len()))]
pub async fn add(
    RequireAuth(user): RequireAuth,
    State(state): State<AppState>,
    Json(request): Json<AddToCartRequest>,
) -> Result<impl IntoResponse> {
    let project_name = clean_project_name(&request.project_name)?;
    let buyer = AuthService::new(state.pool()).get_user(user.id).await?;
    let country = resolve_country(
        request.country.as_deref(),
        &buyer,
        &state.config().home_country,
    )?;

    let config = state.pricing().config(state.pool()).await?;
    let customer = CustomerContext::new(country.clone(), buyer.user_type);
    let priced = price_cart(&request.canvases, &request.accessories, &config, &customer)?;

    let (order, project) = OrderRepository::new(state.pool())
        .create(&NewOrder {
            user_id: buyer.id,
            project_name,
            canvases: priced.canvases,
            accessories: request.accessories,
            quote: priced.quote,
            country,
        })
        .await?;

    tracing::info!(
        order_id = %order.id,
        order_number = %order.order_number,
        signs = order.signs,
        total = %order.total_amount,
        "Order placed"
    );
    add_breadcrumb(
        "cart",
        "Order placed",
        Some(&[("order_number", order.order_number.as_str())]),
    );

    if let Some(email) = state.email().cloned() {
        let public_url = state.config().public_url.clone();
        let (order, project) = (order.clone(), project.clone());
        tokio::spawn(async move {
            if let Err(e) = email
                .send_order_confirmation(&buyer, &order, &project, &public_url)
                .await
            {
                tracing::warn!(order_id = %order.id, error = %e, "Order confirmation email failed");
            }
        });
    }

    Ok((StatusCode::CREATED, Json(cart_entry(&order, &project))))
}

/// The caller's orders, newest first.
#[instrument(skip(state, user), fields(user_id = %user.id))]
pub async fn index(
    RequireAuth(user): RequireAuth,
    State(state): State<AppState>,
) -> Result<Json<Vec<OrderSummary>>> {
    let orders = OrderRepository::new(state.pool())
        .list_for_user(user.id)
        .await?;
    Ok(Json(orders.iter().map(Order::summary).collect()))
}

/// One order with its design snapshot.
#[instrument(skip(state, user), fields(user_id = %user.id))]
pub async fn show(
    RequireAuth(user): RequireAuth,
    State(state): State<AppState>,
    Path(id): Path<OrderId>,
) -> Result<Json<CartEntry>> {
    let (order, project) = load_order(&state, &user, id).await?;
    Ok(Json(cart_entry(&order, &project)))
}

/// Every order, optionally filtered by status.
#[instrument(skip(state, admin), fields(admin_id = %admin.id))]
pub async fn all(
    RequireAdmin(admin): RequireAdmin,
    State(state): State<AppState>,
    Query(query): Query<OrdersQuery>,
) -> Result<Json<Vec<OrderSummary>>> {
    let orders = OrderRepository::new(state.pool())
        .list_all(query.status)
        .await?;
    Ok(Json(orders.iter().map(Order::summary).collect()))
}

/// Move an order to its next production status.
#[instrument(skip(state, admin), fields(admin_id = %admin.id))]
pub async fn update_status(
    RequireAdmin(admin): RequireAdmin,
    State(state): State<AppState>,
    Path(id): Path<OrderId>,
    Json(update): Json<StatusUpdate>,
) -> Result<Json<OrderSummary>> {
    let repo = OrderRepository::new(state.pool());
    let order = repo
        .get(id)
        .await?
        .ok_or_else(|| AppError::NotFound("Order not found".to_string()))?;

    if !order.status.can_transition_to(update.status) {
        return Err(AppError::Conflict(format!(
            "cannot move order from {} to {}",
            order.status.label(),
            update.status.label()
        )));
    }

    let order = repo
        .update_status(id, order.status, update.status)
        .await?;
    tracing::info!(order_id = %id, status = ?order.status, "Order status updated");
    Ok(Json(order.summary()))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use chrono::Utc;
    use signcraft_core::api::ProfileFields;
    use signcraft_core::{Email, UserId, UserType};

    fn user(country: Option<&str>) -> User {
        User {
            id: UserId::new(1),
            email: Email::parse("a@example.com").unwrap(),
            user_type: UserType::Consumer,
            profile: ProfileFields {
                country: country.map(str::to_owned),
                ..ProfileFields::default()
            },
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn test_resolve_country_precedence() {
        assert_eq!(resolve_country(Some("de"), &user(Some("PL")), "UA").unwrap(), "DE");
        assert_eq!(resolve_country(None, &user(Some("PL")), "UA").unwrap(), "PL");
        assert_eq!(resolve_country(Some("  "), &user(None), "UA").unwrap(), "UA");
        assert!(resolve_country(Some("Germany"), &user(None), "UA").is_err());
    }

    #[test]
    fn test_clean_project_name() {
        assert_eq!(clean_project_name(" Lobby ").unwrap(), "Lobby");
        assert!(clean_project_name("").is_err());
    }
}
