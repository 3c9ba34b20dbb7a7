//! Order and cart project repository.
//!
//! A cart project and its order are always written together in one
//! transaction; `orders.cart_project_id` is a foreign key.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::PgPool;
use sqlx::types::Json;

use signcraft_core::pricing::{AccessoryLine, PriceQuote};
use signcraft_core::{CartProjectId, OrderId, OrderStatus, UserId};

use super::RepositoryError;
use crate::models::order::{CartCanvas, CartProject, NewOrder, Order};

const ORDER_COLUMNS: &str = "id, order_number, user_id, cart_project_id, signs, net_amount, \
     vat_amount, total_amount, status, country, created_at, updated_at";

#[derive(sqlx::FromRow)]
struct OrderRow {
    id: OrderId,
    order_number: String,
    user_id: UserId,
    cart_project_id: CartProjectId,
    signs: i32,
    net_amount: Decimal,
    vat_amount: Decimal,
    total_amount: Decimal,
    status: OrderStatus,
    country: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<OrderRow> for Order {
    fn from(r: OrderRow) -> Self {
        Self {
            id: r.id,
            order_number: r.order_number,
            user_id: r.user_id,
            cart_project_id: r.cart_project_id,
            signs: r.signs,
            net_amount: r.net_amount,
            vat_amount: r.vat_amount,
            total_amount: r.total_amount,
            status: r.status,
            country: r.country,
            created_at: r.created_at,
            updated_at: r.updated_at,
        }
    }
}

#[derive(sqlx::FromRow)]
struct CartProjectRow {
    id: CartProjectId,
    user_id: UserId,
    project_name: String,
    canvases: Json<Vec<CartCanvas>>,
    accessories: Json<Vec<AccessoryLine>>,
    quote: Json<PriceQuote>,
    created_at: DateTime<Utc>,
}

impl From<CartProjectRow> for CartProject {
    fn from(r: CartProjectRow) -> Self {
        Self {
            id: r.id,
            user_id: r.user_id,
            project_name: r.project_name,
            canvases: r.canvases.0,
            accessories: r.accessories.0,
            quote: r.quote.0,
            created_at: r.created_at,
        }
    }
}

const PROJECT_COLUMNS: &str =
    "id, user_id, project_name, canvases, accessories, quote, created_at";

/// Repository for orders and their cart projects.
pub struct OrderRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> OrderRepository<'a> {
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Store a cart project and create its order, atomically.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if either insert fails; nothing is
    /// written in that case.
    pub async fn create(&self, new: &NewOrder) -> Result<(Order, CartProject), RepositoryError> {
        let signs = i32::try_from(new.sign_count())
            .map_err(|_| RepositoryError::Conflict("too many signs in one order".to_owned()))?;

        let mut tx = self.pool.begin().await?;

        let project = sqlx::query_as::<_, CartProjectRow>(&format!(
            r"
            INSERT INTO cart_projects (id, user_id, project_name, canvases, accessories, quote)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING {PROJECT_COLUMNS}
            "
        ))
        .bind(CartProjectId::generate())
        .bind(new.user_id)
        .bind(&new.project_name)
        .bind(Json(&new.canvases))
        .bind(Json(&new.accessories))
        .bind(Json(&new.quote))
        .fetch_one(&mut *tx)
        .await?;

        let order = sqlx::query_as::<_, OrderRow>(&format!(
            r"
            INSERT INTO orders (order_number, user_id, cart_project_id, signs,
                                net_amount, vat_amount, total_amount, country)
            VALUES ('SC-' || to_char(NOW(), 'YYYY') || '-' || nextval('order_number_seq'),
                    $1, $2, $3, $4, $5, $6, $7)
            RETURNING {ORDER_COLUMNS}
            "
        ))
        .bind(new.user_id)
        .bind(project.id)
        .bind(signs)
        .bind(new.quote.net)
        .bind(new.quote.vat)
        .bind(new.quote.total)
        .bind(&new.country)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;

        Ok((order.into(), project.into()))
    }

    /// Get an order by ID.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get(&self, id: OrderId) -> Result<Option<Order>, RepositoryError> {
        let row = sqlx::query_as::<_, OrderRow>(&format!(
            "SELECT {ORDER_COLUMNS} FROM orders WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(self.pool)
        .await?;

        Ok(row.map(Order::from))
    }

    /// Get an order with its cart project.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::DataCorruption` if the order exists but its
    /// project does not.
    pub async fn get_with_project(
        &self,
        id: OrderId,
    ) -> Result<Option<(Order, CartProject)>, RepositoryError> {
        let Some(order) = self.get(id).await? else {
            return Ok(None);
        };

        let project = sqlx::query_as::<_, CartProjectRow>(&format!(
            "SELECT {PROJECT_COLUMNS} FROM cart_projects WHERE id = $1"
        ))
        .bind(order.cart_project_id)
        .fetch_optional(self.pool)
        .await?
        .ok_or_else(|| {
            RepositoryError::DataCorruption(format!(
                "order {} references missing cart project {}",
                order.id, order.cart_project_id
            ))
        })?;

        Ok(Some((order, project.into())))
    }

    /// A user's orders, newest first.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list_for_user(&self, user_id: UserId) -> Result<Vec<Order>, RepositoryError> {
        let rows = sqlx::query_as::<_, OrderRow>(&format!(
            "SELECT {ORDER_COLUMNS} FROM orders WHERE user_id = $1 ORDER BY created_at DESC, id DESC"
        ))
        .bind(user_id)
        .fetch_all(self.pool)
        .await?;

        Ok(rows.into_iter().map(Order::from).collect())
    }

    /// All orders, newest first, optionally filtered by status.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list_all(
        &self,
        status: Option<OrderStatus>,
    ) -> Result<Vec<Order>, RepositoryError> {
        let rows = sqlx::query_as::<_, OrderRow>(&format!(
            r"
            SELECT {ORDER_COLUMNS} FROM orders
            WHERE $1::order_status IS NULL OR status = $1
            ORDER BY created_at DESC, id DESC
            "
        ))
        .bind(status)
        .fetch_all(self.pool)
        .await?;

        Ok(rows.into_iter().map(Order::from).collect())
    }

    /// Move an order from `from` to `to` in a single statement.
    ///
    /// The row is only updated while it still has status `from`, so two
    /// concurrent changes cannot both pass the transition check.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Conflict` if the order no longer has
    /// status `from` (or doesn't exist).
    pub async fn update_status(
        &self,
        id: OrderId,
        from: OrderStatus,
        to: OrderStatus,
    ) -> Result<Order, RepositoryError> {
        let row = sqlx::query_as::<_, OrderRow>(&format!(
            r"
            UPDATE orders SET status = $3, updated_at = NOW()
            WHERE id = $1 AND status = $2
            RETURNING {ORDER_COLUMNS}
            "
        ))
        .bind(id)
        .bind(from)
        .bind(to)
        .fetch_optional(self.pool)
        .await?
        .ok_or_else(|| {
            RepositoryError::Conflict(format!(
                "order is no longer {}, reload and try again",
                from.label()
            ))
        })?;

        Ok(row.into())
    }
}
