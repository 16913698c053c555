//! # Promotion Repository
//!
//! Promo code lookup and the `used_count` counter.
//!
//! Whether a code applies to an order is decided in
//! `retail_core::promotion::evaluate`. This repository only loads rows and
//! moves the counter, with the limit re-checked inside the UPDATE so that
//! `used_count <= usage_limit` holds however many orders race for the last
//! slot.

use chrono::Utc;
use sqlx::SqlitePool;
use tracing::{debug, warn};

use crate::error::{DbError, DbResult};
use retail_core::{Promotion, PromotionRejection, PromotionStatus};

const PROMOTION_COLUMNS: &str = "id, code, description, discount_type, discount_value, \
                                 start_date, end_date, min_order_cents, usage_limit, used_count, \
                                 status, created_at, updated_at, deleted_at";

/// Repository for promotion database operations.
#[derive(Debug, Clone)]
pub struct PromotionRepository {
    pool: SqlitePool,
}

impl PromotionRepository {
    pub fn new(pool: SqlitePool) -> Self {
        PromotionRepository { pool }
    }

    /// Finds a live promotion by code.
    ///
    /// Matching is case-insensitive (`code` is declared `COLLATE NOCASE`).
    pub async fn find_by_code(&self, code: &str) -> DbResult<Option<Promotion>> {
        let sql = format!(
            "SELECT {} FROM promotions WHERE code = ?1 AND deleted_at IS NULL",
            PROMOTION_COLUMNS
        );

        let promotion = sqlx::query_as::<_, Promotion>(&sql)
            .bind(code.trim())
            .fetch_optional(&self.pool)
            .await?;

        Ok(promotion)
    }

    /// Gets a live promotion by id.
    pub async fn get_by_id(&self, id: &str) -> DbResult<Option<Promotion>> {
        let sql = format!(
            "SELECT {} FROM promotions WHERE id = ?1 AND deleted_at IS NULL",
            PROMOTION_COLUMNS
        );

        let promotion = sqlx::query_as::<_, Promotion>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(promotion)
    }

    /// Inserts a promotion.
    ///
    /// * `Err(DbError::UniqueViolation)` - Code already used (any case)
    pub async fn insert(&self, promotion: &Promotion) -> DbResult<Promotion> {
        debug!(code = %promotion.code, "Inserting promotion");

        sqlx::query(
            r#"
            INSERT INTO promotions (
                id, code, description, discount_type, discount_value,
                start_date, end_date, min_order_cents, usage_limit, used_count,
                status, created_at, updated_at, deleted_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14)
            "#,
        )
        .bind(&promotion.id)
        .bind(promotion.code.trim())
        .bind(&promotion.description)
        .bind(promotion.discount_type)
        .bind(promotion.discount_value)
        .bind(promotion.start_date)
        .bind(promotion.end_date)
        .bind(promotion.min_order_cents)
        .bind(promotion.usage_limit)
        .bind(promotion.used_count)
        .bind(promotion.status)
        .bind(promotion.created_at)
        .bind(promotion.updated_at)
        .bind(promotion.deleted_at)
        .execute(&self.pool)
        .await?;

        Ok(promotion.clone())
    }

    /// Consumes one use of a promotion.
    ///
    /// ## Returns
    /// * `Ok(used_count)` - Counter after the increment
    /// * `Err(DbError::PromotionUnavailable)` - Inactive, or the last slot
    ///   was taken by a concurrent order
    /// * `Err(DbError::NotFound)` - Missing or soft-deleted
    pub async fn redeem(&self, id: &str) -> DbResult<i64> {
        debug!(promo_id = %id, "Redeeming promotion");

        let used: Option<i64> = sqlx::query_scalar(
            r#"
            UPDATE promotions
            SET used_count = used_count + 1, updated_at = ?2
            WHERE id = ?1
              AND deleted_at IS NULL
              AND status = 'active'
              AND (usage_limit = 0 OR used_count < usage_limit)
            RETURNING used_count
            "#,
        )
        .bind(id)
        .bind(Utc::now())
        .fetch_optional(&self.pool)
        .await?;

        if let Some(used) = used {
            return Ok(used);
        }

        let promotion = self
            .get_by_id(id)
            .await?
            .ok_or_else(|| DbError::not_found("Promotion", id))?;

        let reason = if promotion.status != PromotionStatus::Active {
            PromotionRejection::Inactive
        } else {
            PromotionRejection::LimitReached
        };

        warn!(promo_id = %id, reason = %reason, "Promotion redeem refused");
        Err(DbError::PromotionUnavailable {
            promo_id: id.to_string(),
            reason,
        })
    }

    /// Gives one use back. Floors at zero and ignores status and soft
    /// delete, so compensation always lands.
    pub async fn release(&self, id: &str) -> DbResult<i64> {
        debug!(promo_id = %id, "Releasing promotion use");

        let used: Option<i64> = sqlx::query_scalar(
            r#"
            UPDATE promotions
            SET used_count = MAX(used_count - 1, 0), updated_at = ?2
            WHERE id = ?1
            RETURNING used_count
            "#,
        )
        .bind(id)
        .bind(Utc::now())
        .fetch_optional(&self.pool)
        .await?;

        used.ok_or_else(|| DbError::not_found("Promotion", id))
    }

    /// Activates or deactivates a promotion.
    pub async fn set_status(&self, id: &str, status: PromotionStatus) -> DbResult<()> {
        let result = sqlx::query(
            "UPDATE promotions SET status = ?2, updated_at = ?3 WHERE id = ?1 AND deleted_at IS NULL",
        )
        .bind(id)
        .bind(status)
        .bind(Utc::now())
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Promotion", id));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use crate::repository::fixtures;
    use crate::DbError;
    use retail_core::{PromotionRejection, PromotionStatus};

    #[tokio::test]
    async fn test_find_by_code_ignores_case() {
        let db = fixtures::db().await;
        let promo = db.promotions().insert(&fixtures::promotion("SAVE10", 0)).await.unwrap();

        let found = db.promotions().find_by_code(" save10 ").await.unwrap().unwrap();
        assert_eq!(found.id, promo.id);
        assert!(db.promotions().find_by_code("SAVE20").await.unwrap().is_none());

        assert!(matches!(
            db.promotions().insert(&fixtures::promotion("Save10", 0)).await,
            Err(DbError::UniqueViolation { .. })
        ));
    }

    #[tokio::test]
    async fn test_redeem_respects_limit_and_release_floors() {
        let db = fixtures::db().await;
        let promo = db.promotions().insert(&fixtures::promotion("ONCE", 1)).await.unwrap();

        assert_eq!(db.promotions().redeem(&promo.id).await.unwrap(), 1);
        assert!(matches!(
            db.promotions().redeem(&promo.id).await,
            Err(DbError::PromotionUnavailable { reason: PromotionRejection::LimitReached, .. })
        ));

        assert_eq!(db.promotions().release(&promo.id).await.unwrap(), 0);
        assert_eq!(db.promotions().release(&promo.id).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_inactive_promotion_not_redeemable() {
        let db = fixtures::db().await;
        let promo = db.promotions().insert(&fixtures::promotion("OFF", 0)).await.unwrap();
        db.promotions().set_status(&promo.id, PromotionStatus::Inactive).await.unwrap();

        assert!(matches!(
            db.promotions().redeem(&promo.id).await,
            Err(DbError::PromotionUnavailable { reason: PromotionRejection::Inactive, .. })
        ));
        assert!(matches!(
            db.promotions().redeem("missing").await,
            Err(DbError::NotFound { .. })
        ));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_redeems_stop_at_limit() {
        let db = fixtures::db().await;
        let promo = db.promotions().insert(&fixtures::promotion("RUSH", 3)).await.unwrap();

        let handles: Vec<_> = (0..10)
            .map(|_| {
                let db = db.clone();
                let id = promo.id.clone();
                tokio::spawn(async move { db.promotions().redeem(&id).await })
            })
            .collect();

        let mut redeemed = 0;
        for handle in handles {
            if handle.await.unwrap().is_ok() {
                redeemed += 1;
            }
        }

        assert_eq!(redeemed, 3);
        let row = db.promotions().get_by_id(&promo.id).await.unwrap().unwrap();
        assert_eq!(row.used_count, 3);
    }
}
