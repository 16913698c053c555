//! # Inventory Repository
//!
//! The stock ledger: one `inventory` row per product plus an append-only
//! `inventory_history` trail.
//!
//! ## Ledger Operations
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                       Stock Movements                                   │
//! │                                                                         │
//! │  reserve(p, n)   quantity - n   guard: live row, quantity >= n         │
//! │  release(p, n)   quantity + n   guard: quantity + n <= MAX_STOCK       │
//! │                                 (soft-deleted rows still accept it,    │
//! │                                  so compensation always lands)          │
//! │  adjust(p, ±d)   quantity + d   guard: live row, 0 <= result <= MAX    │
//! │                                                                         │
//! │  Each movement = one transaction:                                      │
//! │    UPDATE ... RETURNING quantity   (atomic check-and-set)              │
//! │    INSERT INTO inventory_history   (signed change, level after)        │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! The ledger knows nothing about orders. Callers own the at-most-once
//! guarantee for releases.

use chrono::Utc;
use sqlx::SqlitePool;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::error::{DbError, DbResult};
use retail_core::validation::validate_stock_delta;
use retail_core::{
    Inventory, InventoryHistory, LowStockAlert, ValidationError, MAX_STOCK_QUANTITY,
};

/// Repository for the inventory ledger.
#[derive(Debug, Clone)]
pub struct InventoryRepository {
    pool: SqlitePool,
}

impl InventoryRepository {
    /// Creates a new InventoryRepository.
    pub fn new(pool: SqlitePool) -> Self {
        InventoryRepository { pool }
    }

    /// Creates the inventory row for a product.
    ///
    /// A positive starting quantity is recorded in the history as
    /// `initial stock`.
    pub async fn init(&self, product_id: &str, quantity: i64) -> DbResult<Inventory> {
        if !(0..=MAX_STOCK_QUANTITY).contains(&quantity) {
            return Err(ValidationError::OutOfRange {
                field: "quantity".to_string(),
                min: 0,
                max: MAX_STOCK_QUANTITY,
            }
            .into());
        }

        debug!(product_id = %product_id, quantity = quantity, "Initializing inventory");

        let now = Utc::now();
        let mut tx = self.pool.begin().await?;

        sqlx::query(
            r#"
            INSERT INTO inventory (product_id, quantity, updated_at, deleted_at)
            VALUES (?1, ?2, ?3, NULL)
            "#,
        )
        .bind(product_id)
        .bind(quantity)
        .bind(now)
        .execute(&mut *tx)
        .await?;

        if quantity > 0 {
            sqlx::query(
                r#"
                INSERT INTO inventory_history (
                    id, product_id, quantity_change, quantity_after, reason, user_id, created_at
                ) VALUES (?1, ?2, ?3, ?3, 'initial stock', 'system', ?4)
                "#,
            )
            .bind(Uuid::new_v4().to_string())
            .bind(product_id)
            .bind(quantity)
            .bind(now)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;

        Ok(Inventory {
            product_id: product_id.to_string(),
            quantity,
            updated_at: now,
            deleted_at: None,
        })
    }

    /// Takes `quantity` units out of stock.
    ///
    /// ## Returns
    /// * `Ok(new_quantity)` - Stock decremented, history written
    /// * `Err(DbError::InsufficientStock)` - Fewer than `quantity` on hand
    /// * `Err(DbError::NotFound)` - No live inventory row
    /// * `Err(DbError::Validation)` - `quantity` not in `1..=MAX_STOCK_QUANTITY`
    pub async fn reserve(
        &self,
        product_id: &str,
        quantity: i64,
        user_id: &str,
        reason: &str,
    ) -> DbResult<i64> {
        validate_stock_delta(quantity)?;
        self.apply_change(product_id, -quantity, user_id, reason, false)
            .await
    }

    /// Puts `quantity` units back into stock.
    ///
    /// Not filtered by soft delete: a reservation taken before the product
    /// was retired must still be returnable.
    pub async fn release(
        &self,
        product_id: &str,
        quantity: i64,
        user_id: &str,
        reason: &str,
    ) -> DbResult<i64> {
        validate_stock_delta(quantity)?;
        self.apply_change(product_id, quantity, user_id, reason, true)
            .await
    }

    /// Manual signed stock correction (receiving goods, shrinkage, counts).
    ///
    /// Refuses to take stock below zero. The magnitude is bounded like any
    /// other movement, so a zero delta is rejected.
    pub async fn adjust(
        &self,
        product_id: &str,
        delta: i64,
        user_id: &str,
        reason: &str,
    ) -> DbResult<i64> {
        validate_stock_delta(delta.saturating_abs())?;
        self.apply_change(product_id, delta, user_id, reason, false)
            .await
    }

    /// One guarded movement plus its history row, in one transaction.
    async fn apply_change(
        &self,
        product_id: &str,
        delta: i64,
        user_id: &str,
        reason: &str,
        include_deleted: bool,
    ) -> DbResult<i64> {
        debug!(
            product_id = %product_id,
            delta = delta,
            reason = %reason,
            "Applying stock change"
        );

        let now = Utc::now();
        let mut tx = self.pool.begin().await?;

        let new_quantity: Option<i64> = sqlx::query_scalar(
            r#"
            UPDATE inventory
            SET quantity = quantity + ?2, updated_at = ?3
            WHERE product_id = ?1
              AND (?4 OR deleted_at IS NULL)
              AND quantity + ?2 >= 0
              AND quantity + ?2 <= ?5
            RETURNING quantity
            "#,
        )
        .bind(product_id)
        .bind(delta)
        .bind(now)
        .bind(include_deleted)
        .bind(MAX_STOCK_QUANTITY)
        .fetch_optional(&mut *tx)
        .await?;

        let Some(new_quantity) = new_quantity else {
            // Release the connection before the diagnostic read.
            tx.rollback().await?;
            return Err(self
                .classify_refusal(product_id, delta, include_deleted)
                .await);
        };

        sqlx::query(
            r#"
            INSERT INTO inventory_history (
                id, product_id, quantity_change, quantity_after, reason, user_id, created_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
            "#,
        )
        .bind(Uuid::new_v4().to_string())
        .bind(product_id)
        .bind(delta)
        .bind(new_quantity)
        .bind(reason)
        .bind(user_id)
        .bind(now)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;

        debug!(product_id = %product_id, quantity = new_quantity, "Stock changed");
        Ok(new_quantity)
    }

    /// Works out why a guarded update matched nothing.
    async fn classify_refusal(&self, product_id: &str, delta: i64, include_deleted: bool) -> DbError {
        let current: Result<Option<i64>, sqlx::Error> = sqlx::query_scalar(
            "SELECT quantity FROM inventory WHERE product_id = ?1 AND (?2 OR deleted_at IS NULL)",
        )
        .bind(product_id)
        .bind(include_deleted)
        .fetch_optional(&self.pool)
        .await;

        match current {
            Err(e) => e.into(),
            Ok(None) => DbError::not_found("Inventory", product_id),
            Ok(Some(available)) if delta < 0 => {
                warn!(
                    product_id = %product_id,
                    available = available,
                    requested = -delta,
                    "Stock guard refused decrement"
                );
                DbError::InsufficientStock {
                    product_id: product_id.to_string(),
                    available,
                    requested: -delta,
                }
            }
            Ok(Some(_)) => DbError::StockLimitExceeded {
                product_id: product_id.to_string(),
            },
        }
    }

    /// Current live inventory row.
    pub async fn get(&self, product_id: &str) -> DbResult<Option<Inventory>> {
        let inventory = sqlx::query_as::<_, Inventory>(
            r#"
            SELECT product_id, quantity, updated_at, deleted_at
            FROM inventory
            WHERE product_id = ?1 AND deleted_at IS NULL
            "#,
        )
        .bind(product_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(inventory)
    }

    /// Newest-first history for one product.
    pub async fn history(&self, product_id: &str, limit: u32) -> DbResult<Vec<InventoryHistory>> {
        let rows = sqlx::query_as::<_, InventoryHistory>(
            r#"
            SELECT id, product_id, quantity_change, quantity_after, reason, user_id, created_at
            FROM inventory_history
            WHERE product_id = ?1
            ORDER BY rowid DESC
            LIMIT ?2
            "#,
        )
        .bind(product_id)
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows)
    }

    /// Live products whose stock is below `threshold`, lowest first.
    pub async fn low_stock(&self, threshold: i64) -> DbResult<Vec<LowStockAlert>> {
        let rows = sqlx::query_as::<_, LowStockAlert>(
            r#"
            SELECT
                p.id AS product_id,
                p.name AS product_name,
                p.barcode,
                i.quantity
            FROM inventory i
            INNER JOIN products p ON p.id = i.product_id
            WHERE i.quantity < ?1
              AND i.deleted_at IS NULL
              AND p.deleted_at IS NULL
            ORDER BY i.quantity ASC, p.name ASC
            "#,
        )
        .bind(threshold)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
