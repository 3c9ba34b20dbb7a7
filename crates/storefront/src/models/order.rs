//! Order and cart project domain types.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use signcraft_core::api::{CartEntry, CartProjectView, OrderSummary};
use signcraft_core::pricing::{AccessoryLine, LineQuote, PriceQuote};
use signcraft_core::{CartProjectId, OrderId, OrderStatus, UserId};

/// A placed order (domain type).
#[derive(Debug, Clone)]
pub struct Order {
    pub id: OrderId,
    /// Human-facing number, e.g. `SC-2025-1042`.
    pub order_number: String,
    pub user_id: UserId,
    pub cart_project_id: CartProjectId,
    /// Total number of physical signs.
    pub signs: i32,
    pub net_amount: Decimal,
    pub vat_amount: Decimal,
    pub total_amount: Decimal,
    pub status: OrderStatus,
    /// Delivery country (ISO 3166-1 alpha-2).
    pub country: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Order {
    #[must_use]
    pub fn summary(&self) -> OrderSummary {
        OrderSummary {
            id: self.id,
            order_number: self.order_number.clone(),
            user_id: self.user_id,
            cart_project_id: self.cart_project_id,
            signs: self.signs,
            net_amount: self.net_amount,
            vat_amount: self.vat_amount,
            total_amount: self.total_amount,
            status: self.status,
            country: self.country.clone(),
            created_at: self.created_at,
        }
    }
}

/// One repriced canvas as stored with a cart project.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CartCanvas {
    /// Sanitized canvas JSON.
    pub canvas: Value,
    #[serde(default)]
    pub preview_svg: Option<String>,
    pub copies_count: u32,
    pub thickness_mm: Decimal,
    #[serde(default)]
    pub tape: bool,
    /// Server-computed price of this canvas.
    pub price: LineQuote,
}

/// Design snapshot an order was placed for.
#[derive(Debug, Clone)]
pub struct CartProject {
    pub id: CartProjectId,
    pub user_id: UserId,
    pub project_name: String,
    pub canvases: Vec<CartCanvas>,
    pub accessories: Vec<AccessoryLine>,
    pub quote: PriceQuote,
    pub created_at: DateTime<Utc>,
}

impl CartProject {
    /// Sum of copies over all canvases.
    #[must_use]
    pub fn sign_count(&self) -> u32 {
        self.canvases.iter().map(|c| c.copies_count).sum()
    }

    #[must_use]
    pub fn view(&self) -> CartProjectView {
        CartProjectView {
            id: self.id,
            project_name: self.project_name.clone(),
            canvases: serde_json::to_value(&self.canvases).unwrap_or(Value::Null),
            accessories: self.accessories.clone(),
            quote: self.quote.clone(),
            created_at: self.created_at,
        }
    }
}

/// Build the API body for an order and its project.
#[must_use]
pub fn cart_entry(order: &Order, project: &CartProject) -> CartEntry {
    CartEntry {
        order: order.summary(),
        project: project.view(),
    }
}

/// A cart submission after server-side pricing, ready to insert.
#[derive(Debug, Clone)]
pub struct NewOrder {
    pub user_id: UserId,
    pub project_name: String,
    pub canvases: Vec<CartCanvas>,
    pub accessories: Vec<AccessoryLine>,
    pub quote: PriceQuote,
    pub country: String,
}

impl NewOrder {
    /// Sum of copies over all canvases.
    #[must_use]
    pub fn sign_count(&self) -> u32 {
        self.canvases.iter().map(|c| c.copies_count).sum()
    }
}
