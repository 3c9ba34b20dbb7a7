//! Integration tests for SignCraft.
//!
//! # Running Tests
//!
//! ```bash
//! # Tests that need no database
//! cargo test -p signcraft-integration-tests
//!
//! # Include the HTTP tests (migrations are applied automatically)
//! SIGNCRAFT_TEST_DATABASE_URL=postgres://localhost/signcraft_test \
//!     cargo test -p signcraft-integration-tests
//! ```
//!
//! # Test Categories
//!
//! - `pricing` - Canvas JSON through import, measurement and quoting
//! - `editor_store` - Projects and drafts on disk
//! - `storefront_api` - HTTP API against a real database

#![allow(
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::missing_panics_doc,
    clippy::print_stderr
)]

use std::net::{IpAddr, Ipv4Addr};
use std::path::PathBuf;
use std::sync::atomic::{AtomicU32, Ordering};

use axum::Router;
use axum::body::Body;
use axum::http::{Method, Request, StatusCode, header};
use axum::response::Response;
use secrecy::SecretString;
use serde_json::Value;
use sqlx::PgPool;
use tower::ServiceExt;

use signcraft_core::UserType;
use signcraft_core::api::ProfileFields;
use signcraft_core::canvas::{CanvasObject, CanvasSnapshot, mm_to_px};
use signcraft_storefront::config::{JwtConfig, StorefrontConfig};
use signcraft_storefront::services::auth::AuthService;
use signcraft_storefront::{AppState, app};

/// Environment variable naming the database used by HTTP tests.
pub const TEST_DATABASE_URL: &str = "SIGNCRAFT_TEST_DATABASE_URL";

/// HS256 secret the in-process server signs tokens with.
pub const TEST_JWT_SECRET: &str = "integration-test-secret-with-enough-entropy-7Qm2";

static COUNTER: AtomicU32 = AtomicU32::new(1);

fn next_id() -> u32 {
    COUNTER.fetch_add(1, Ordering::Relaxed)
}

/// Canvas of the given size in millimetres, serialized like the editor does.
#[must_use]
pub fn canvas_json(width_mm: f64, height_mm: f64) -> Value {
    serde_json::to_value(CanvasSnapshot::blank(mm_to_px(width_mm), mm_to_px(height_mm))).unwrap()
}

/// Same as [`canvas_json`] with one engraved text object of the given size.
#[must_use]
pub fn canvas_with_text(width_mm: f64, height_mm: f64, text_mm: (f64, f64)) -> Value {
    let mut snapshot = CanvasSnapshot::blank(mm_to_px(width_mm), mm_to_px(height_mm));
    snapshot.objects.push(CanvasObject::new(
        "textbox",
        mm_to_px(text_mm.0),
        mm_to_px(text_mm.1),
    ));
    serde_json::to_value(snapshot).unwrap()
}

/// An email address no other test run uses.
#[must_use]
pub fn unique_email(prefix: &str) -> String {
    let nanos = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap()
        .as_nanos();
    format!("{prefix}-{nanos}-{}@signcraft.test", next_id())
}

/// Configuration for an in-process server.
#[must_use]
pub fn test_config(database_url: &str) -> StorefrontConfig {
    StorefrontConfig {
        database_url: SecretString::from(database_url.to_owned()),
        host: IpAddr::V4(Ipv4Addr::LOCALHOST),
        port: 0,
        public_url: "http://localhost:5173".to_owned(),
        jwt: JwtConfig {
            secret: SecretString::from(TEST_JWT_SECRET.to_owned()),
            ttl_hours: 1,
        },
        icons_dir: PathBuf::from("/nonexistent/signcraft-icons"),
        chrome_bin: None,
        home_country: "UA".to_owned(),
        email: None,
        sentry_dsn: None,
        sentry_environment: None,
        sentry_sample_rate: 0.0,
        sentry_traces_sample_rate: 0.0,
    }
}

/// A storefront router over a migrated test database.
pub struct TestApp {
    pub router: Router,
    pub state: AppState,
    pub pool: PgPool,
}

impl TestApp {
    /// Build the app, or `None` when no test database is configured.
    pub async fn spawn() -> Option<Self> {
        let Ok(database_url) = std::env::var(TEST_DATABASE_URL) else {
            eprintln!("{TEST_DATABASE_URL} not set, skipping");
            return None;
        };

        let pool = PgPool::connect(&database_url)
            .await
            .expect("Failed to connect to test database");
        sqlx::migrate!("../storefront/migrations")
            .run(&pool)
            .await
            .expect("Failed to run migrations");

        Some(Self::with_pool(&database_url, pool))
    }

    /// Build the app over a pool that never connects.
    ///
    /// Only routes that do not touch the database can be exercised.
    #[must_use]
    pub fn offline() -> Self {
        let database_url = "postgres://signcraft@127.0.0.1:1/unreachable";
        let pool = PgPool::connect_lazy(database_url).unwrap();
        Self::with_pool(database_url, pool)
    }

    fn with_pool(database_url: &str, pool: PgPool) -> Self {
        let state = AppState::new(test_config(database_url), pool.clone());
        Self {
            router: app(state.clone()),
            state,
            pool,
        }
    }

    /// Send a prepared request through the full middleware stack.
    pub async fn send(&self, request: Request<Body>) -> Response {
        self.router.clone().oneshot(request).await.unwrap()
    }

    /// Send one request and decode the body.
    ///
    /// JSON bodies are parsed, other bodies become `Value::String` and an
    /// empty body is `Value::Null`.
    pub async fn request(
        &self,
        method: Method,
        uri: &str,
        token: Option<&str>,
        body: Option<&Value>,
    ) -> (StatusCode, Value) {
        // A distinct client address per request keeps the rate limiters out of the way.
        let id = next_id();
        let client_ip = Ipv4Addr::from(0x0a00_0000 | (id & 0x00ff_ffff));
        let mut builder = Request::builder()
            .method(method)
            .uri(uri)
            .header("x-forwarded-for", client_ip.to_string());
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
        }
        let request = match body {
            Some(body) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(serde_json::to_vec(body).unwrap()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };

        let response = self.send(request).await;
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let json = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes)
                .unwrap_or_else(|_| Value::String(String::from_utf8_lossy(&bytes).into_owned()))
        };
        (status, json)
    }

    /// Register a customer over HTTP and return `(token, response body)`.
    pub async fn register(&self, email: &str, body_extra: Value) -> (String, Value) {
        let mut body = serde_json::json!({
            "email": email,
            "password": "correct-horse-battery",
        });
        if let (Some(target), Value::Object(extra)) = (body.as_object_mut(), body_extra) {
            target.extend(extra);
        }
        let (status, json) = self
            .request(Method::POST, "/auth/register", None, Some(&body))
            .await;
        assert_eq!(status, StatusCode::CREATED, "registration failed: {json}");
        (json["token"].as_str().unwrap().to_owned(), json)
    }

    /// Create an admin directly and return a bearer token for it.
    pub async fn admin_token(&self) -> String {
        let admin = AuthService::new(&self.pool)
            .create_user(
                &unique_email("admin"),
                "correct-horse-battery",
                UserType::Admin,
                ProfileFields::default(),
            )
            .await
            .unwrap();
        self.state.jwt().generate_token(&admin).unwrap()
    }
}
