//! HTTP middleware stack for the API.
//!
//! # Middleware Order (bottom to top in Router)
//!
//! 1. Sentry layer (capture errors)
//! 2. `TraceLayer` (request tracing)
//! 3. Request ID (add unique ID to each request)
//! 4. CORS (editor origin)
//! 5. Security headers
//! 6. Rate limiting (governor, per route group)
//!
//! Authentication is not a layer: handlers take [`RequireAuth`] or
//! [`RequireAdmin`] extractors.

pub mod auth;
pub mod rate_limit;
pub mod request_id;
pub mod security_headers;

pub use auth::{AuthRejection, RequireAdmin, RequireAuth};
pub use rate_limit::{api_rate_limiter, auth_rate_limiter};
pub use request_id::request_id_middleware;
pub use security_headers::security_headers_middleware;
