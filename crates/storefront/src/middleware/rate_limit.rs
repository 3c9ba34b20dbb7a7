//! Rate limiting middleware using governor and `tower_governor`.
//!
//! Provides configurable rate limiters for different endpoint categories:
//! - `auth_rate_limiter`: Strict limits for login/registration (~10/min)
//! - `api_rate_limiter`: Relaxed limits for cart, pricing and documents (~60/min)

use std::net::{IpAddr, SocketAddr};
use std::sync::Arc;

use axum::extract::ConnectInfo;
use axum::http::Request;
use governor::clock::QuantaInstant;
use governor::middleware::NoOpMiddleware;
use tower_governor::{GovernorError, GovernorLayer, governor::GovernorConfigBuilder};

// =============================================================================
// Client IP Key Extractor
// =============================================================================

/// Headers carrying the original client address, most trusted first.
/// Only the first entry of a comma-separated list is used.
const CLIENT_IP_HEADERS: [&str; 3] = ["cf-connecting-ip", "x-forwarded-for", "x-real-ip"];

/// Key extractor that reads the client IP from proxy headers, falling back
/// to the peer address of the connection.
#[derive(Clone, Copy)]
pub struct ClientIpKeyExtractor;

impl tower_governor::key_extractor::KeyExtractor for ClientIpKeyExtractor {
    type Key = IpAddr;

    fn extract<T>(&self, req: &Request<T>) -> Result<Self::Key, GovernorError> {
        let headers = req.headers();
        let forwarded = CLIENT_IP_HEADERS.iter().find_map(|name| {
            headers
                .get(*name)
                .and_then(|v| v.to_str().ok())
                .and_then(|s| s.split(',').next())
                .and_then(|s| s.trim().parse::<IpAddr>().ok())
        });
        if let Some(ip) = forwarded {
            return Ok(ip);
        }

        // Requires the server to be started with connect info
        req.extensions()
            .get::<ConnectInfo<SocketAddr>>()
            .map(|ConnectInfo(addr)| addr.ip())
            .ok_or(GovernorError::UnableToExtractKey)
    }
}

// =============================================================================
// Rate Limiter Configuration
// =============================================================================

/// Rate limiter layer type for Axum.
pub type RateLimiterLayer =
    GovernorLayer<ClientIpKeyExtractor, NoOpMiddleware<QuantaInstant>, axum::body::Body>;

/// Seconds per replenished token and burst size for login/registration.
const AUTH_LIMIT: (u64, u32) = (6, 5);
/// Seconds per replenished token and burst size for cart, quotes and documents.
const API_LIMIT: (u64, u32) = (1, 50);

fn limiter((seconds, burst): (u64, u32)) -> RateLimiterLayer {
    let config = GovernorConfigBuilder::default()
        .key_extractor(ClientIpKeyExtractor)
        .per_second(seconds)
        .burst_size(burst)
        .finish()
        .expect("rate limiter periods and bursts are non-zero constants");
    GovernorLayer::new(Arc::new(config))
}

/// Rate limiter for `/auth/login` and `/auth/register`: one request every
/// 6 seconds per IP after a burst of 5.
#[must_use]
pub fn auth_rate_limiter() -> RateLimiterLayer {
    limiter(AUTH_LIMIT)
}

/// Rate limiter for cart, pricing quote and document endpoints: one request
/// per second per IP after a burst of 50.
#[must_use]
pub fn api_rate_limiter() -> RateLimiterLayer {
    limiter(API_LIMIT)
}
