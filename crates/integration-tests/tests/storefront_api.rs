//! Integration tests for the storefront HTTP API.
//!
//! Requests go through the full router and middleware stack in-process.
//! Tests marked "offline" run without a database; the others are skipped
//! unless `SIGNCRAFT_TEST_DATABASE_URL` points at a `PostgreSQL` database.

#![allow(clippy::unwrap_used)]

use std::time::{SystemTime, UNIX_EPOCH};

use axum::body::Body;
use axum::http::{Method, Request, StatusCode};
use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation};
use rust_decimal::Decimal;
use serde_json::{Value, json};

use signcraft_core::{OrderId, OrderStatus, UserType};
use signcraft_integration_tests::{
    TEST_JWT_SECRET, TestApp, canvas_json, canvas_with_text, unique_email,
};
use signcraft_storefront::db::{OrderRepository, RepositoryError};
use signcraft_storefront::services::auth::Claims;

fn token_for(sub: &str, user_type: UserType) -> String {
    let now = i64::try_from(
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap()
            .as_secs(),
    )
    .unwrap();
    let claims = Claims {
        sub: sub.to_owned(),
        email: "someone@signcraft.test".to_owned(),
        user_type,
        exp: now + 600,
        iat: now,
        jti: "integration".to_owned(),
    };
    jsonwebtoken::encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(TEST_JWT_SECRET.as_bytes()),
    )
    .unwrap()
}

fn decimal(value: &Value) -> Decimal {
    value.as_str().unwrap().parse().unwrap()
}

fn cart_body(country: &str) -> Value {
    json!({
        "project_name": "Office doors",
        "canvases": [
            {"canvas": canvas_json(120.0, 80.0), "copies_count": 2, "thickness_mm": "1.6"},
            {
                "canvas": canvas_with_text(200.0, 100.0, (80.0, 20.0)),
                "preview_svg": "<svg xmlns=\"http://www.w3.org/2000/svg\"></svg>",
                "copies_count": 3,
                "thickness_mm": "1.6",
                "tape": true
            }
        ],
        "country": country
    })
}

// =============================================================================
// Offline Tests
// =============================================================================

#[tokio::test]
async fn test_health_passes_through_middleware() {
    let app = TestApp::offline();
    let response = app
        .send(
            Request::builder()
                .uri("/health")
                .header("x-request-id", "req-integration-1")
                .body(Body::empty())
                .unwrap(),
        )
        .await;

    assert_eq!(response.status(), StatusCode::OK);
    let headers = response.headers();
    assert_eq!(headers["x-request-id"], "req-integration-1");
    assert_eq!(headers["x-content-type-options"], "nosniff");
    assert_eq!(headers["x-frame-options"], "DENY");
    assert!(headers.contains_key("content-security-policy"));
}

#[tokio::test]
async fn test_cart_requires_a_valid_token() {
    let app = TestApp::offline();

    let (status, body) = app.request(Method::GET, "/cart", None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert!(body["message"].is_string());

    let (status, _) = app
        .request(Method::GET, "/cart", Some("not-a-jwt"), None)
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_admin_routes_reject_customers() {
    let app = TestApp::offline();
    let token = token_for("41", UserType::Business);

    let (status, _) = app
        .request(
            Method::PUT,
            "/pricing/config",
            Some(&token),
            Some(&serde_json::to_value(app.state.pricing().default_config()).unwrap()),
        )
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) = app
        .request(Method::GET, "/cart/all", Some(&token), None)
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_quote_rejects_bad_country_before_pricing() {
    let app = TestApp::offline();
    let (status, body) = app
        .request(
            Method::POST,
            "/pricing/quote",
            None,
            Some(&json!({
                "canvases": [{"canvas": canvas_json(120.0, 80.0), "copies_count": 1, "thickness_mm": "1.6"}],
                "country": "Ukraine"
            })),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "country must be a two-letter code");
}

#[tokio::test]
async fn test_icons_without_directory() {
    let app = TestApp::offline();

    let (status, body) = app.request(Method::GET, "/icons", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!([]));

    let (status, _) = app
        .request(Method::GET, "/icons/payload.exe", None, None)
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_pdf_without_browser_is_unavailable() {
    let app = TestApp::offline();
    let token = token_for("41", UserType::Consumer);
    let (status, body) = app
        .request(
            Method::GET,
            "/cart/getPdfs/1?type=invoice",
            Some(&token),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(body["message"], "PDF rendering is not available");
}

// =============================================================================
// Account Tests
// =============================================================================

#[tokio::test]
async fn test_register_login_and_profile() {
    let Some(app) = TestApp::spawn().await else {
        return;
    };
    let email = unique_email("customer");

    let (token, body) = app
        .register(&email, json!({"first_name": "Olena", "country": "ua"}))
        .await;
    let user_id = body["user"]["id"].as_i64().unwrap();
    assert_eq!(body["user"]["user_type"], "consumer");
    assert_eq!(body["user"]["country"], "UA");

    // Token subject is the new user's id
    let claims = jsonwebtoken::decode::<Claims>(
        &token,
        &DecodingKey::from_secret(TEST_JWT_SECRET.as_bytes()),
        &Validation::default(),
    )
    .unwrap()
    .claims;
    assert_eq!(claims.sub, user_id.to_string());

    // Same email again
    let (status, body) = app
        .request(
            Method::POST,
            "/auth/register",
            None,
            Some(&json!({"email": email.to_uppercase(), "password": "another-long-password"})),
        )
        .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["message"], "An account with this email already exists");

    let (status, _) = app
        .request(
            Method::POST,
            "/auth/login",
            None,
            Some(&json!({"email": email, "password": "wrong-password"})),
        )
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, body) = app
        .request(
            Method::POST,
            "/auth/login",
            None,
            Some(&json!({"email": email, "password": "correct-horse-battery"})),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    let login_token = body["token"].as_str().unwrap().to_owned();

    let (status, body) = app
        .request(
            Method::PUT,
            "/auth/me",
            Some(&login_token),
            Some(&json!({"city": "Lviv", "country": "PL"})),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["city"], "Lviv");

    let (status, body) = app
        .request(Method::GET, "/auth/me", Some(&token), None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["country"], "PL");
    assert_eq!(body["id"].as_i64().unwrap(), user_id);
}

#[tokio::test]
async fn test_admin_cannot_self_register() {
    let Some(app) = TestApp::spawn().await else {
        return;
    };
    let (status, _) = app
        .request(
            Method::POST,
            "/auth/register",
            None,
            Some(&json!({
                "email": unique_email("wannabe"),
                "password": "correct-horse-battery",
                "user_type": "admin"
            })),
        )
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

// =============================================================================
// Cart Tests
// =============================================================================

#[tokio::test]
async fn test_order_is_priced_on_the_server() {
    let Some(app) = TestApp::spawn().await else {
        return;
    };
    let (token, _) = app
        .register(&unique_email("buyer"), json!({"country": "UA"}))
        .await;

    let (status, entry) = app
        .request(Method::POST, "/cart", Some(&token), Some(&cart_body("ua")))
        .await;
    assert_eq!(status, StatusCode::CREATED, "{entry}");

    let order = &entry["order"];
    assert_eq!(order["signs"], 5);
    assert_eq!(order["status"], "new");
    assert_eq!(order["country"], "UA");
    assert!(order["order_number"].as_str().unwrap().starts_with("SC-"));
    assert_eq!(
        decimal(&order["total_amount"]),
        decimal(&order["net_amount"]) + decimal(&order["vat_amount"])
    );

    let project = &entry["project"];
    assert_eq!(project["project_name"], "Office doors");
    assert_eq!(project["canvases"].as_array().unwrap().len(), 2);
    assert_eq!(
        decimal(&project["quote"]["total"]),
        decimal(&order["total_amount"])
    );

    let (status, orders) = app.request(Method::GET, "/cart", Some(&token), None).await;
    assert_eq!(status, StatusCode::OK);
    assert!(
        orders
            .as_array()
            .unwrap()
            .iter()
            .any(|o| o["id"] == order["id"])
    );
}

#[tokio::test]
async fn test_business_buyer_abroad_is_reverse_charged() {
    let Some(app) = TestApp::spawn().await else {
        return;
    };
    let (token, _) = app
        .register(
            &unique_email("company"),
            json!({"user_type": "business", "company": "Tablice Sp. z o.o.", "country": "PL"}),
        )
        .await;

    // Delivery country comes from the billing address
    let mut body = cart_body("PL");
    body.as_object_mut().unwrap().remove("country");
    let (status, entry) = app
        .request(Method::POST, "/cart", Some(&token), Some(&body))
        .await;
    assert_eq!(status, StatusCode::CREATED, "{entry}");
    assert_eq!(entry["order"]["country"], "PL");
    assert_eq!(decimal(&entry["order"]["vat_amount"]), Decimal::ZERO);
}

#[tokio::test]
async fn test_orders_are_private_and_admins_move_them_forward() {
    let Some(app) = TestApp::spawn().await else {
        return;
    };
    let (owner, _) = app.register(&unique_email("owner"), json!({})).await;
    let (stranger, _) = app.register(&unique_email("stranger"), json!({})).await;
    let admin = app.admin_token().await;

    let (_, entry) = app
        .request(Method::POST, "/cart", Some(&owner), Some(&cart_body("UA")))
        .await;
    let id = entry["order"]["id"].as_i64().unwrap();
    let number = entry["order"]["order_number"].as_str().unwrap().to_owned();

    let (status, _) = app
        .request(Method::GET, &format!("/cart/{id}"), Some(&stranger), None)
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = app
        .request(Method::GET, &format!("/cart/{id}"), Some(&admin), None)
        .await;
    assert_eq!(status, StatusCode::OK);

    let (status, html) = app
        .request(
            Method::GET,
            &format!("/cart/getPdfs/{id}/html?type=delivery-note"),
            Some(&owner),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert!(html.as_str().unwrap().contains(&number));

    let status_uri = format!("/cart/{id}/status");
    let (status, _) = app
        .request(
            Method::PATCH,
            &status_uri,
            Some(&owner),
            Some(&json!({"status": "in_production"})),
        )
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) = app
        .request(
            Method::PATCH,
            &status_uri,
            Some(&admin),
            Some(&json!({"status": "delivered"})),
        )
        .await;
    assert_eq!(status, StatusCode::CONFLICT);

    let (status, body) = app
        .request(
            Method::PATCH,
            &status_uri,
            Some(&admin),
            Some(&json!({"status": "in_production"})),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "in_production");
}

#[tokio::test]
async fn test_status_change_from_stale_state_is_rejected() {
    let Some(app) = TestApp::spawn().await else {
        return;
    };
    let (owner, _) = app.register(&unique_email("owner"), json!({})).await;
    let (_, entry) = app
        .request(Method::POST, "/cart", Some(&owner), Some(&cart_body("UA")))
        .await;
    let id = OrderId::new(i32::try_from(entry["order"]["id"].as_i64().unwrap()).unwrap());

    // Two admins both saw the order as new; only the first change lands.
    let repo = OrderRepository::new(&app.pool);
    let moved = repo
        .update_status(id, OrderStatus::New, OrderStatus::InProduction)
        .await
        .unwrap();
    assert_eq!(moved.status, OrderStatus::InProduction);

    let stale = repo
        .update_status(id, OrderStatus::New, OrderStatus::Cancelled)
        .await;
    assert!(matches!(stale, Err(RepositoryError::Conflict(_))));
    assert_eq!(
        repo.get(id).await.unwrap().unwrap().status,
        OrderStatus::InProduction
    );
}

#[tokio::test]
async fn test_cart_rejects_zero_copies() {
    let Some(app) = TestApp::spawn().await else {
        return;
    };
    let (token, _) = app.register(&unique_email("zero"), json!({})).await;
    let mut body = cart_body("UA");
    body["canvases"][0]["copies_count"] = json!(0);

    let (status, _) = app
        .request(Method::POST, "/cart", Some(&token), Some(&body))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_quote_rejects_out_of_range_sizes_and_accessories() {
    let Some(app) = TestApp::spawn().await else {
        return;
    };

    let (status, body) = app
        .request(
            Method::POST,
            "/pricing/quote",
            None,
            Some(&json!({
                "canvases": [{
                    "canvas": {"width": 1e16, "height": 1e16, "objects": []},
                    "copies_count": 1,
                    "thickness_mm": "1.6"
                }],
                "country": "UA"
            })),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST, "{body}");

    let (status, body) = app
        .request(
            Method::POST,
            "/pricing/quote",
            None,
            Some(&json!({
                "canvases": [{"canvas": canvas_json(120.0, 80.0), "copies_count": 1, "thickness_mm": "1.6"}],
                "accessories": [{
                    "id": "stand",
                    "name": "Desk stand",
                    "quantity": u32::MAX,
                    "unit_price": (Decimal::MAX / Decimal::TWO).to_string()
                }],
                "country": "UA"
            })),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST, "{body}");
}

// =============================================================================
// Template Tests
// =============================================================================

#[tokio::test]
async fn test_template_lifecycle() {
    let Some(app) = TestApp::spawn().await else {
        return;
    };
    let admin = app.admin_token().await;
    let category_name = unique_email("category");

    let (status, category) = app
        .request(
            Method::POST,
            "/templates/categories",
            Some(&admin),
            Some(&json!({"name": category_name})),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);
    let category_id = category["id"].as_str().unwrap().to_owned();

    let (status, template) = app
        .request(
            Method::POST,
            "/templates",
            Some(&admin),
            Some(&json!({
                "name": "Door sign",
                "category_id": category_id,
                "canvas": canvas_with_text(120.0, 80.0, (60.0, 12.0))
            })),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED, "{template}");
    let template_id = template["id"].as_str().unwrap().to_owned();

    let (status, listed) = app
        .request(
            Method::GET,
            &format!("/templates?category={category_id}"),
            None,
            None,
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(listed.as_array().unwrap().len(), 1);

    let (status, _) = app
        .request(
            Method::DELETE,
            &format!("/templates/{template_id}"),
            Some(&admin),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    // Second delete finds nothing
    let (status, _) = app
        .request(
            Method::DELETE,
            &format!("/templates/{template_id}"),
            Some(&admin),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_template_with_unknown_category_is_rejected() {
    let Some(app) = TestApp::spawn().await else {
        return;
    };
    let admin = app.admin_token().await;
    let (status, _) = app
        .request(
            Method::POST,
            "/templates",
            Some(&admin),
            Some(&json!({
                "name": "Orphan",
                "category_id": "00000000-0000-4000-8000-000000000000",
                "canvas": canvas_json(100.0, 50.0)
            })),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}
