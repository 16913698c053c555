//! # Order Repository
//!
//! Database operations for orders and order items.
//!
//! ## Order Lifecycle (storage side)
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  1. CREATE                                                             │
//! │     └── insert_with_items() → Order { status: Pending } + items        │
//! │         (one transaction: header and lines appear together or not)     │
//! │                                                                         │
//! │  2. TRANSITION                                                         │
//! │     └── transition_status(id, Pending, Paid | Canceled)                │
//! │         UPDATE ... WHERE status = 'pending' RETURNING ...              │
//! │         Exactly one concurrent caller wins the claim.                  │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::Utc;
use sqlx::SqlitePool;
use tracing::debug;

use crate::error::{DbError, DbResult};
use retail_core::{Order, OrderItem, OrderStatus};

const ORDER_COLUMNS: &str = "id, customer_id, user_id, promo_id, order_date, status, \
                             total_cents, discount_cents, updated_at, deleted_at";

/// Repository for order database operations.
#[derive(Debug, Clone)]
pub struct OrderRepository {
    pool: SqlitePool,
}

impl OrderRepository {
    /// Creates a new OrderRepository.
    pub fn new(pool: SqlitePool) -> Self {
        OrderRepository { pool }
    }

    /// Persists an order header and all of its items atomically.
    ///
    /// ## Snapshot Pattern
    /// Items carry the unit price captured while building the order. It is
    /// never re-read from the catalog.
    pub async fn insert_with_items(&self, order: &Order, items: &[OrderItem]) -> DbResult<()> {
        debug!(
            id = %order.id,
            customer_id = %order.customer_id,
            items = items.len(),
            total_cents = order.total_cents,
            "Inserting order"
        );

        let mut tx = self.pool.begin().await?;

        sqlx::query(
            r#"
            INSERT INTO orders (
                id, customer_id, user_id, promo_id, order_date, status,
                total_cents, discount_cents, updated_at, deleted_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)
            "#,
        )
        .bind(&order.id)
        .bind(&order.customer_id)
        .bind(&order.user_id)
        .bind(&order.promo_id)
        .bind(order.order_date)
        .bind(order.status)
        .bind(order.total_cents)
        .bind(order.discount_cents)
        .bind(order.updated_at)
        .bind(order.deleted_at)
        .execute(&mut *tx)
        .await?;

        for item in items {
            sqlx::query(
                r#"
                INSERT INTO order_items (
                    id, order_id, product_id, quantity, price_cents, subtotal_cents, created_at
                ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
                "#,
            )
            .bind(&item.id)
            .bind(&item.order_id)
            .bind(&item.product_id)
            .bind(item.quantity)
            .bind(item.price_cents)
            .bind(item.subtotal_cents)
            .bind(item.created_at)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;

        Ok(())
    }

    /// Gets a live order by ID.
    pub async fn get_by_id(&self, id: &str) -> DbResult<Option<Order>> {
        let sql = format!(
            "SELECT {} FROM orders WHERE id = ?1 AND deleted_at IS NULL",
            ORDER_COLUMNS
        );

        let order = sqlx::query_as::<_, Order>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(order)
    }

    /// Gets all items of an order, in the order they were requested.
    pub async fn get_items(&self, order_id: &str) -> DbResult<Vec<OrderItem>> {
        let items = sqlx::query_as::<_, OrderItem>(
            r#"
            SELECT id, order_id, product_id, quantity, price_cents, subtotal_cents, created_at
            FROM order_items
            WHERE order_id = ?1
            ORDER BY rowid
            "#,
        )
        .bind(order_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(items)
    }

    /// Moves an order from `from` to `to` if, and only if, it is still in
    /// `from`.
    ///
    /// ## Returns
    /// * `Ok(Order)` - The updated order; this caller won the transition
    /// * `Err(DbError::StatusConflict)` - The order is no longer in `from`
    /// * `Err(DbError::NotFound)` - Missing or soft-deleted
    pub async fn transition_status(
        &self,
        id: &str,
        from: OrderStatus,
        to: OrderStatus,
    ) -> DbResult<Order> {
        debug!(id = %id, from = %from, to = %to, "Transitioning order");

        let sql = format!(
            r#"
            UPDATE orders SET status = ?3, updated_at = ?4
            WHERE id = ?1 AND status = ?2 AND deleted_at IS NULL
            RETURNING {}
            "#,
            ORDER_COLUMNS
        );

        let updated = sqlx::query_as::<_, Order>(&sql)
            .bind(id)
            .bind(from)
            .bind(to)
            .bind(Utc::now())
            .fetch_optional(&self.pool)
            .await?;

        if let Some(order) = updated {
            return Ok(order);
        }

        match self.get_by_id(id).await? {
            None => Err(DbError::not_found("Order", id)),
            Some(current) => Err(DbError::StatusConflict {
                order_id: id.to_string(),
                current: current.status,
            }),
        }
    }

    /// Soft-deletes an order. Stock and promotion effects are not reversed.
    pub async fn soft_delete(&self, id: &str) -> DbResult<()> {
        let now = Utc::now();

        let result = sqlx::query(
            "UPDATE orders SET deleted_at = ?2, updated_at = ?2 WHERE id = ?1 AND deleted_at IS NULL",
        )
        .bind(id)
        .bind(now)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Order", id));
        }

        Ok(())
    }
}
