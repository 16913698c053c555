//! # Payment Repository
//!
//! Appends payment records. Recording a payment does not change the order
//! status; paying and recording are separate operations.

use chrono::Utc;
use sqlx::SqlitePool;
use tracing::debug;
use uuid::Uuid;

use crate::error::DbResult;
use retail_core::{Payment, PaymentMethod};

#[derive(Debug, Clone)]
pub struct PaymentRepository {
    pool: SqlitePool,
}

impl PaymentRepository {
    pub fn new(pool: SqlitePool) -> Self {
        PaymentRepository { pool }
    }

    /// Records a payment against an order.
    ///
    /// * `Err(DbError::ForeignKeyViolation)` - Order doesn't exist
    pub async fn record(
        &self,
        order_id: &str,
        amount_cents: i64,
        method: PaymentMethod,
    ) -> DbResult<Payment> {
        debug!(order_id = %order_id, amount_cents = amount_cents, ?method, "Recording payment");

        let payment = Payment {
            id: Uuid::new_v4().to_string(),
            order_id: order_id.to_string(),
            amount_cents,
            method,
            payment_date: Utc::now(),
        };

        sqlx::query(
            r#"
            INSERT INTO payments (id, order_id, amount_cents, method, payment_date)
            VALUES (?1, ?2, ?3, ?4, ?5)
            "#,
        )
        .bind(&payment.id)
        .bind(&payment.order_id)
        .bind(payment.amount_cents)
        .bind(payment.method)
        .bind(payment.payment_date)
        .execute(&self.pool)
        .await?;

        Ok(payment)
    }

    /// All payments of an order, oldest first.
    pub async fn list_for_order(&self, order_id: &str) -> DbResult<Vec<Payment>> {
        let payments = sqlx::query_as::<_, Payment>(
            r#"
            SELECT id, order_id, amount_cents, method, payment_date
            FROM payments
            WHERE order_id = ?1
            ORDER BY rowid
            "#,
        )
        .bind(order_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(payments)
    }
}
