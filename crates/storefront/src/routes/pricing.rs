//! Pricing route handlers.

use axum::{Json, extract::State};
use tracing::instrument;

use signcraft_core::api::QuoteRequest;
use signcraft_core::pricing::{CustomerContext, PriceQuote, PricingConfig};

use crate::error::{AppError, Result};
use crate::middleware::RequireAdmin;
use crate::services::auth::is_country_code;
use crate::services::pricing::price_cart;
use crate::state::AppState;

/// Current rate table.
#[instrument(skip(state))]
pub async fn config(State(state): State<AppState>) -> Result<Json<PricingConfig>> {
    let config = state.pricing().config(state.pool()).await?;
    Ok(Json(config.as_ref().clone()))
}

/// Replace the rate table.
#[instrument(skip(state, admin, config), fields(admin_id = %admin.id))]
pub async fn update_config(
    RequireAdmin(admin): RequireAdmin,
    State(state): State<AppState>,
    Json(config): Json<PricingConfig>,
) -> Result<Json<PricingConfig>> {
    let stored = state.pricing().store(state.pool(), config).await?;
    Ok(Json(stored.as_ref().clone()))
}

/// Price canvases without ordering them.
#[instrument(skip(state, request), fields(canvases = request.canvases.len(), country = %request.country))]
pub async fn quote(
    State(state): State<AppState>,
    Json(request): Json<QuoteRequest>,
) -> Result<Json<PriceQuote>> {
    let country = request.country.trim().to_ascii_uppercase();
    if !is_country_code(&country) {
        return Err(AppError::BadRequest(
            "country must be a two-letter code".to_string(),
        ));
    }

    let config = state.pricing().config(state.pool()).await?;
    let customer = CustomerContext::new(country, request.user_type);
    let priced = price_cart(&request.canvases, &request.accessories, &config, &customer)?;
    Ok(Json(priced.quote))
}
