//! JSON bodies exchanged between the editor and the HTTP API.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::pricing::{AccessoryLine, PriceQuote};
use crate::types::{
    CartProjectId, OrderId, OrderStatus, TemplateCategoryId, TemplateId, UserId, UserType,
};

/// Billing/profile fields shared by registration and profile updates.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProfileFields {
    #[serde(default)]
    pub first_name: Option<String>,
    #[serde(default)]
    pub last_name: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub company: Option<String>,
    #[serde(default)]
    pub vat_number: Option<String>,
    #[serde(default)]
    pub street: Option<String>,
    #[serde(default)]
    pub city: Option<String>,
    #[serde(default)]
    pub postcode: Option<String>,
    /// ISO 3166-1 alpha-2.
    #[serde(default)]
    pub country: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegisterRequest {
    pub email: String,
    pub password: String,
    /// `consumer` or `business`; admins are created from the CLI.
    #[serde(default)]
    pub user_type: UserType,
    #[serde(flatten)]
    pub profile: ProfileFields,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

/// Public view of a user account.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserProfile {
    pub id: UserId,
    pub email: String,
    pub user_type: UserType,
    #[serde(flatten)]
    pub profile: ProfileFields,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthResponse {
    pub token: String,
    pub user: UserProfile,
}

/// One canvas submitted to the cart.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CartCanvasInput {
    /// Canvas JSON as exported by the editor.
    pub canvas: Value,
    #[serde(default)]
    pub preview_svg: Option<String>,
    pub copies_count: u32,
    pub thickness_mm: Decimal,
    #[serde(default)]
    pub tape: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AddToCartRequest {
    pub project_name: String,
    pub canvases: Vec<CartCanvasInput>,
    #[serde(default)]
    pub accessories: Vec<AccessoryLine>,
    /// Delivery country; defaults to the account's billing country.
    #[serde(default)]
    pub country: Option<String>,
}

/// Ask the server to price canvases without ordering them.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QuoteRequest {
    pub canvases: Vec<CartCanvasInput>,
    #[serde(default)]
    pub accessories: Vec<AccessoryLine>,
    pub country: String,
    #[serde(default)]
    pub user_type: UserType,
}

/// Order row as returned by the API.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderSummary {
    pub id: OrderId,
    pub order_number: String,
    pub user_id: UserId,
    pub cart_project_id: CartProjectId,
    pub signs: i32,
    pub net_amount: Decimal,
    pub vat_amount: Decimal,
    pub total_amount: Decimal,
    pub status: OrderStatus,
    pub country: String,
    pub created_at: DateTime<Utc>,
}

/// Order together with its stored project.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CartEntry {
    pub order: OrderSummary,
    pub project: CartProjectView,
}

/// Stored design snapshot of an order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CartProjectView {
    pub id: CartProjectId,
    pub project_name: String,
    pub canvases: Value,
    pub accessories: Vec<AccessoryLine>,
    pub quote: PriceQuote,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatusUpdate {
    pub status: OrderStatus,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TemplateInput {
    pub name: String,
    #[serde(default)]
    pub category_id: Option<TemplateCategoryId>,
    pub canvas: Value,
    #[serde(default)]
    pub preview_svg: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TemplateView {
    pub id: TemplateId,
    pub name: String,
    pub category_id: Option<TemplateCategoryId>,
    pub canvas: Value,
    pub preview_svg: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CategoryInput {
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoryView {
    pub id: TemplateCategoryId,
    pub name: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IconView {
    pub name: String,
    pub url: String,
}

/// Error body of every non-2xx JSON response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorBody {
    pub message: String,
}
