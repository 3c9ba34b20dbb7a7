//! HTTP route handlers for the API.
//!
//! # Route Structure
//!
//! ```text
//! GET    /health                        - Liveness
//! GET    /health/ready                  - Readiness (database ping)
//!
//! # Auth
//! POST   /auth/register                 - Create account, returns token
//! POST   /auth/login                    - Password login, returns token
//! GET    /auth/me                       - Current profile
//! PUT    /auth/me                       - Update profile/billing
//!
//! # Templates (writes: admin)
//! GET    /templates[?category=<id>]     - List templates
//! POST   /templates                     - Create template
//! GET    /templates/categories          - List categories
//! POST   /templates/categories          - Create category
//! DELETE /templates/categories/{id}     - Delete category
//! GET    /templates/{id}                - Template detail
//! PUT    /templates/{id}                - Replace template
//! DELETE /templates/{id}                - Delete template
//!
//! # Icons
//! GET    /icons                         - Icon listing
//! GET    /icons/{name}                  - Icon file
//!
//! # Pricing
//! GET    /pricing/config                - Rate table
//! PUT    /pricing/config                - Replace rate table (admin)
//! POST   /pricing/quote                 - Price canvases
//!
//! # Cart (auth)
//! POST   /cart                          - Place order
//! GET    /cart                          - Own orders
//! GET    /cart/all[?status=]            - All orders (admin)
//! GET    /cart/{id}                     - Order with project (owner or admin)
//! PATCH  /cart/{id}/status              - Change status (admin)
//! GET    /cart/getPdfs/{id}?type=       - Invoice / delivery note PDF
//! GET    /cart/getPdfs/{id}/html?type=  - Same document as HTML
//! ```

pub mod auth;
pub mod cart;
pub mod documents;
pub mod health;
pub mod icons;
pub mod pricing;
pub mod templates;

use axum::{
    Router,
    extract::Request,
    http::{
        HeaderValue, Method,
        header::{AUTHORIZATION, CONTENT_TYPE},
    },
    middleware,
    routing::{get, patch, post},
};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::middleware::{
    api_rate_limiter, auth_rate_limiter, request_id_middleware, security_headers_middleware,
};
use crate::state::AppState;

/// Create the auth routes router.
pub fn auth_routes() -> Router<AppState> {
    let credentials = Router::new()
        .route("/register", post(auth::register))
        .route("/login", post(auth::login))
        .layer(auth_rate_limiter());

    Router::new()
        .route("/me", get(auth::me).put(auth::update_me))
        .merge(credentials)
}

/// Create the template routes router.
pub fn template_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(templates::index).post(templates::create))
        .route(
            "/categories",
            get(templates::categories).post(templates::create_category),
        )
        .route(
            "/categories/{id}",
            axum::routing::delete(templates::delete_category),
        )
        .route(
            "/{id}",
            get(templates::show)
                .put(templates::update)
                .delete(templates::delete),
        )
}

/// Create the icon routes router.
pub fn icon_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(icons::index))
        .route("/{name}", get(icons::show))
}

/// Create the pricing routes router.
pub fn pricing_routes() -> Router<AppState> {
    let quote = Router::new()
        .route("/quote", post(pricing::quote))
        .layer(api_rate_limiter());

    Router::new()
        .route("/config", get(pricing::config).put(pricing::update_config))
        .merge(quote)
}

/// Create the cart routes router.
pub fn cart_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(cart::index).post(cart::add))
        .route("/all", get(cart::all))
        .route("/getPdfs/{id}", get(documents::pdf))
        .route("/getPdfs/{id}/html", get(documents::html))
        .route("/{id}", get(cart::show))
        .route("/{id}/status", patch(cart::update_status))
        .layer(api_rate_limiter())
}

/// Create all API routes.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/health", get(health::health))
        .route("/health/ready", get(health::readiness))
        .nest("/auth", auth_routes())
        .nest("/templates", template_routes())
        .nest("/icons", icon_routes())
        .nest("/pricing", pricing_routes())
        .nest("/cart", cart_routes())
}

/// CORS for the editor, which is served from `public_url`.
fn cors_layer(public_url: &str) -> CorsLayer {
    let layer = CorsLayer::new()
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::PATCH,
            Method::DELETE,
        ])
        .allow_headers([AUTHORIZATION, CONTENT_TYPE]);

    let origin = url::Url::parse(public_url)
        .ok()
        .map(|url| url.origin().ascii_serialization())
        .and_then(|origin| HeaderValue::from_str(&origin).ok());

    match origin {
        Some(origin) => layer.allow_origin(origin),
        None => {
            tracing::warn!(public_url, "Could not derive CORS origin, cross-origin requests disabled");
            layer
        }
    }
}

/// The complete application: routes, state and the middleware stack.
///
/// Sentry layers are added by the binary so tests can run without them.
pub fn app(state: AppState) -> Router {
    let cors = cors_layer(&state.config().public_url);

    routes()
        .layer(middleware::from_fn(security_headers_middleware))
        .layer(cors)
        .layer(middleware::from_fn(request_id_middleware))
        .layer(
            TraceLayer::new_for_http().make_span_with(|request: &Request| {
                tracing::info_span!(
                    "http_request",
                    method = %request.method(),
                    uri = %request.uri(),
                    request_id = tracing::field::Empty,
                )
            }),
        )
        .with_state(state)
}
