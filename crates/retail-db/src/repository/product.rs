//! # Product Repository
//!
//! Catalog reads for order building, plus the small amount of catalog
//! writing needed for seeding and tests.
//!
//! ## Price Snapshot
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  resolve(product_id) ──► CatalogEntry { name, price_cents }            │
//! │                                   │                                     │
//! │                                   ▼ copied once                         │
//! │                         OrderItem.price_cents                          │
//! │                                                                         │
//! │  Later price edits never touch existing order lines.                   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::Utc;
use sqlx::SqlitePool;
use tracing::debug;
use uuid::Uuid;

use crate::error::{DbError, DbResult};
use retail_core::validation::validate_price_cents;
use retail_core::{CatalogEntry, Product};

const PRODUCT_COLUMNS: &str = "id, name, barcode, price_cents, category_id, supplier_id, \
                               created_at, updated_at, deleted_at";

/// Repository for product database operations.
///
/// ## Usage
/// ```rust,ignore
/// let repo = ProductRepository::new(pool);
/// let entry = repo.resolve("uuid-here").await?;
/// ```
#[derive(Debug, Clone)]
pub struct ProductRepository {
    pool: SqlitePool,
}

impl ProductRepository {
    /// Creates a new ProductRepository.
    pub fn new(pool: SqlitePool) -> Self {
        ProductRepository { pool }
    }

    /// Resolves a product to what an order line needs.
    ///
    /// ## Returns
    /// * `Ok(CatalogEntry)` - Product exists and is not soft-deleted
    /// * `Err(DbError::NotFound)` - Missing or soft-deleted
    pub async fn resolve(&self, product_id: &str) -> DbResult<CatalogEntry> {
        debug!(product_id = %product_id, "Resolving catalog entry");

        let product = self
            .get_by_id(product_id)
            .await?
            .ok_or_else(|| DbError::not_found("Product", product_id))?;

        Ok(CatalogEntry {
            product_id: product.id,
            name: product.name,
            price_cents: product.price_cents,
        })
    }

    /// Gets a live (not soft-deleted) product by its ID.
    pub async fn get_by_id(&self, id: &str) -> DbResult<Option<Product>> {
        let sql = format!(
            "SELECT {} FROM products WHERE id = ?1 AND deleted_at IS NULL",
            PRODUCT_COLUMNS
        );

        let product = sqlx::query_as::<_, Product>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(product)
    }

    /// Gets a live product by its barcode.
    pub async fn get_by_barcode(&self, barcode: &str) -> DbResult<Option<Product>> {
        let sql = format!(
            "SELECT {} FROM products WHERE barcode = ?1 AND deleted_at IS NULL",
            PRODUCT_COLUMNS
        );

        let product = sqlx::query_as::<_, Product>(&sql)
            .bind(barcode.trim())
            .fetch_optional(&self.pool)
            .await?;

        Ok(product)
    }

    /// Inserts a new product.
    ///
    /// ## Returns
    /// * `Ok(Product)` - Inserted product
    /// * `Err(DbError::UniqueViolation)` - Barcode already exists
    /// * `Err(DbError::Validation)` - Price negative or above `MAX_PRICE_CENTS`
    pub async fn insert(&self, product: &Product) -> DbResult<Product> {
        validate_price_cents(product.price_cents)?;

        debug!(id = %product.id, name = %product.name, "Inserting product");

        sqlx::query(
            r#"
            INSERT INTO products (
                id, name, barcode, price_cents, category_id, supplier_id,
                created_at, updated_at, deleted_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
            "#,
        )
        .bind(&product.id)
        .bind(&product.name)
        .bind(&product.barcode)
        .bind(product.price_cents)
        .bind(&product.category_id)
        .bind(&product.supplier_id)
        .bind(product.created_at)
        .bind(product.updated_at)
        .bind(product.deleted_at)
        .execute(&self.pool)
        .await?;

        Ok(product.clone())
    }

    /// Changes the current catalog price. Existing order lines keep their
    /// snapshot.
    pub async fn update_price(&self, id: &str, price_cents: i64) -> DbResult<()> {
        validate_price_cents(price_cents)?;

        debug!(id = %id, price_cents = price_cents, "Updating product price");

        let result = sqlx::query(
            r#"
            UPDATE products SET price_cents = ?2, updated_at = ?3
            WHERE id = ?1 AND deleted_at IS NULL
            "#,
        )
        .bind(id)
        .bind(price_cents)
        .bind(Utc::now())
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Product", id));
        }

        Ok(())
    }

    /// Soft-deletes a product by setting `deleted_at`.
    ///
    /// ## Why Soft Delete?
    /// - Historical order lines still reference this product
    /// - Stock already reserved for pending orders can still be released
    pub async fn soft_delete(&self, id: &str) -> DbResult<()> {
        debug!(id = %id, "Soft-deleting product");

        let now = Utc::now();

        let result = sqlx::query(
            r#"
            UPDATE products SET deleted_at = ?2, updated_at = ?2
            WHERE id = ?1 AND deleted_at IS NULL
            "#,
        )
        .bind(id)
        .bind(now)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Product", id));
        }

        Ok(())
    }

    /// Counts live products (for diagnostics and seeding).
    pub async fn count(&self) -> DbResult<i64> {
        let count: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM products WHERE deleted_at IS NULL")
                .fetch_one(&self.pool)
                .await?;

        Ok(count)
    }
}

/// Helper to generate a new product ID.
pub fn generate_product_id() -> String {
    Uuid::new_v4().to_string()
}

#[cfg(test)]
mod tests {
    use crate::repository::fixtures;
    use crate::DbError;
    use retail_core::MAX_PRICE_CENTS;

    #[tokio::test]
    async fn test_resolve_returns_current_price() {
        let db = fixtures::db().await;
        let product = db.products().insert(&fixtures::product("Keyboard", 75_000)).await.unwrap();

        let entry = db.products().resolve(&product.id).await.unwrap();
        assert_eq!(entry.price_cents, 75_000);
        assert_eq!(entry.name, "Keyboard");

        db.products().update_price(&product.id, 80_000).await.unwrap();
        assert_eq!(db.products().resolve(&product.id).await.unwrap().price_cents, 80_000);
    }

    #[tokio::test]
    async fn test_price_bounds_enforced_on_write() {
        let db = fixtures::db().await;

        let err = db.products().insert(&fixtures::product("Broken", -1)).await.unwrap_err();
        assert!(matches!(err, DbError::Validation(_)));
        assert!(db
            .products()
            .insert(&fixtures::product("Absurd", MAX_PRICE_CENTS + 1))
            .await
            .is_err());
        assert_eq!(db.products().count().await.unwrap(), 0);

        let product = db.products().insert(&fixtures::product("Free", 0)).await.unwrap();
        assert!(matches!(
            db.products().update_price(&product.id, i64::MAX).await,
            Err(DbError::Validation(_))
        ));
        assert_eq!(db.products().resolve(&product.id).await.unwrap().price_cents, 0);
    }

    #[tokio::test]
    async fn test_soft_deleted_product_is_not_found() {
        let db = fixtures::db().await;
        let product = db.products().insert(&fixtures::product("Mouse", 25_000)).await.unwrap();

        db.products().soft_delete(&product.id).await.unwrap();

        assert!(matches!(
            db.products().resolve(&product.id).await,
            Err(DbError::NotFound { .. })
        ));
        assert_eq!(db.products().count().await.unwrap(), 0);
        // Second delete finds nothing live.
        assert!(db.products().soft_delete(&product.id).await.is_err());
    }

    #[tokio::test]
    async fn test_duplicate_barcode_rejected() {
        let db = fixtures::db().await;
        let mut a = fixtures::product("A", 100);
        a.barcode = Some("5901234123457".to_string());
        let mut b = fixtures::product("B", 200);
        b.barcode = a.barcode.clone();

        db.products().insert(&a).await.unwrap();
        assert!(matches!(
            db.products().insert(&b).await,
            Err(DbError::UniqueViolation { .. })
        ));
        let found = db.products().get_by_barcode("5901234123457").await.unwrap().unwrap();
        assert_eq!(found.id, a.id);
    }
}
