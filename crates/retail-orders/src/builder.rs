//! # Order Builder
//!
//! Turns a [`CreateOrderRequest`] into a persisted `Pending` order, or
//! leaves no trace.
//!
//! ## Build Steps
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  1. validate          merge duplicate lines, check bounds              │
//! │  2. customer          must exist                                       │
//! │  3. price snapshot    resolve every line, total = Σ price × qty        │
//! │  4. reserve           per line, in request order ──┐                   │
//! │  5. promotion         evaluate on total, redeem ───┤ effects           │
//! │  6. persist           header + items in one tx     │                   │
//! │                                                    ▼                   │
//! │  on failure at 4-6:   undo effects in reverse (promo, then lines)      │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! If an undo fails the caller gets `CompensationFailed` naming the effects
//! left behind, and an error with `critical = true` is logged.

use chrono::{NaiveDate, Utc};
use tracing::{debug, error, info, instrument, warn};
use uuid::Uuid;

use retail_core::promotion::{evaluate, normalize_code};
use retail_core::validation::validate_create_order;
use retail_core::{
    CreateOrderRequest, Money, Order, OrderItem, OrderLineRequest, OrderStatus, Promotion,
    ValidationError,
};

use crate::error::{CompensationStage, FulfillmentResult, OrderError, StuckEffect};
use crate::ports::Collaborators;

/// A line with its price frozen.
#[derive(Debug, Clone)]
struct PricedLine {
    /// Index of the line's first occurrence in the request.
    line: usize,
    product_id: String,
    quantity: i64,
    unit_price: Money,
    subtotal: Money,
}

/// Stock taken for one line, to give back on failure.
#[derive(Debug, Clone)]
struct Reservation {
    product_id: String,
    quantity: i64,
}

/// Builds orders against the collaborator ports.
#[derive(Clone)]
pub struct OrderBuilder {
    ports: Collaborators,
}

impl OrderBuilder {
    pub fn new(ports: Collaborators) -> Self {
        OrderBuilder { ports }
    }

    /// Runs the whole build. `today` decides promotion date windows.
    #[instrument(skip(self, request), fields(customer_id = %request.customer_id))]
    pub async fn build(
        &self,
        request: CreateOrderRequest,
        today: NaiveDate,
    ) -> FulfillmentResult<(Order, Vec<OrderItem>)> {
        let lines = validate_create_order(&request)?;

        if !self.ports.customers.exists(&request.customer_id).await? {
            return Err(OrderError::not_found("Customer", &request.customer_id));
        }

        let priced = self.price_lines(&request.items, &lines).await?;
        let total = priced
            .iter()
            .try_fold(Money::zero(), |acc, p| acc.checked_add(p.subtotal))
            .ok_or_else(|| amount_overflow("total"))?;

        let order_id = Uuid::new_v4().to_string();
        let reason = format!("order {}", order_id);
        debug!(order_id = %order_id, total = %total, lines = priced.len(), "Priced order");

        let mut reserved: Vec<Reservation> = Vec::with_capacity(priced.len());
        for line in &priced {
            match self
                .ports
                .inventory
                .reserve(&line.product_id, line.quantity, &request.user_id, &reason)
                .await
            {
                Ok(left) => {
                    debug!(product_id = %line.product_id, quantity = line.quantity, left, "Reserved");
                    reserved.push(Reservation {
                        product_id: line.product_id.clone(),
                        quantity: line.quantity,
                    });
                }
                Err(e) => {
                    let cause = e.at_line(line.line);
                    return Err(self
                        .compensate(cause, &reserved, None, &request.user_id, &reason)
                        .await);
                }
            }
        }

        let mut promotion: Option<Promotion> = None;
        let mut discount = Money::zero();
        if let Some(code) = request.promo_code.as_deref().and_then(normalize_code) {
            match self.apply_promotion(&code, total, today).await {
                Ok((promo, off)) => {
                    discount = off;
                    promotion = Some(promo);
                }
                Err(e) => {
                    return Err(self
                        .compensate(e, &reserved, None, &request.user_id, &reason)
                        .await);
                }
            }
        }

        let now = Utc::now();
        let order = Order {
            id: order_id.clone(),
            customer_id: request.customer_id.clone(),
            user_id: request.user_id.clone(),
            promo_id: promotion.as_ref().map(|p| p.id.clone()),
            order_date: now,
            status: OrderStatus::Pending,
            total_cents: total.cents(),
            discount_cents: discount.cents(),
            updated_at: now,
            deleted_at: None,
        };
        let items: Vec<OrderItem> = priced
            .iter()
            .map(|line| OrderItem {
                id: Uuid::new_v4().to_string(),
                order_id: order_id.clone(),
                product_id: line.product_id.clone(),
                quantity: line.quantity,
                price_cents: line.unit_price.cents(),
                subtotal_cents: line.subtotal.cents(),
                created_at: now,
            })
            .collect();

        if let Err(e) = self.ports.orders.insert_with_items(&order, &items).await {
            error!(order_id = %order_id, error = %e, "Failed to persist order");
            let cause = match e {
                OrderError::Storage(_) => e,
                other => OrderError::Storage(other.to_string()),
            };
            return Err(self
                .compensate(
                    cause,
                    &reserved,
                    order.promo_id.as_deref(),
                    &request.user_id,
                    &reason,
                )
                .await);
        }

        info!(
            order_id = %order.id,
            total = %order.total(),
            discount = %order.discount(),
            promo_id = ?order.promo_id,
            "Order created"
        );

        Ok((order, items))
    }

    /// Resolves every merged line's price, tagging failures with the index
    /// of the line in the caller's request.
    async fn price_lines(
        &self,
        requested: &[OrderLineRequest],
        lines: &[OrderLineRequest],
    ) -> FulfillmentResult<Vec<PricedLine>> {
        let mut priced = Vec::with_capacity(lines.len());

        for line in lines {
            let index = requested
                .iter()
                .position(|r| r.product_id == line.product_id)
                .unwrap_or(priced.len());

            let entry = self
                .ports
                .catalog
                .resolve(&line.product_id)
                .await
                .map_err(|e| e.at_line(index))?;

            let unit_price = entry.price();
            let subtotal = unit_price
                .checked_multiply_quantity(line.quantity)
                .ok_or_else(|| amount_overflow("subtotal"))?;
            priced.push(PricedLine {
                line: index,
                product_id: entry.product_id,
                quantity: line.quantity,
                unit_price,
                subtotal,
            });
        }

        Ok(priced)
    }

    /// Looks up, evaluates and redeems a promo code.
    ///
    /// The evaluation sees a snapshot of `used_count`; the redeem is what
    /// actually enforces the limit.
    async fn apply_promotion(
        &self,
        code: &str,
        total: Money,
        today: NaiveDate,
    ) -> FulfillmentResult<(Promotion, Money)> {
        let promotion = self
            .ports
            .promotions
            .find_by_code(code)
            .await?
            .ok_or_else(|| OrderError::not_found("Promotion", code))?;

        let discount = evaluate(&promotion, total, today).map_err(|reason| {
            OrderError::promotion(&promotion.code, reason, promotion.min_order_amount())
        })?;

        self.ports.promotions.redeem(&promotion).await?;
        debug!(code = %promotion.code, discount = %discount, "Promotion redeemed");

        Ok((promotion, discount))
    }

    /// Undoes a failed build's effects, most recent first.
    async fn compensate(
        &self,
        cause: OrderError,
        reserved: &[Reservation],
        promo_id: Option<&str>,
        actor_id: &str,
        reason: &str,
    ) -> OrderError {
        let mut stuck = Vec::new();
        let rollback = format!("{} rolled back", reason);

        if let Some(promo_id) = promo_id {
            if let Err(e) = self.ports.promotions.release(promo_id).await {
                error!(critical = true, promo_id = %promo_id, error = %e, "Failed to release promotion");
                stuck.push(StuckEffect::Redemption {
                    promo_id: promo_id.to_string(),
                });
            }
        }

        for reservation in reserved.iter().rev() {
            if let Err(e) = self
                .ports
                .inventory
                .release(&reservation.product_id, reservation.quantity, actor_id, &rollback)
                .await
            {
                error!(
                    critical = true,
                    product_id = %reservation.product_id,
                    quantity = reservation.quantity,
                    error = %e,
                    "Failed to release reservation"
                );
                stuck.push(StuckEffect::Reservation {
                    product_id: reservation.product_id.clone(),
                    quantity: reservation.quantity,
                });
            }
        }

        if stuck.is_empty() {
            warn!(error = %cause, released = reserved.len(), "Order build rolled back");
            cause
        } else {
            OrderError::CompensationFailed {
                during: CompensationStage::OrderBuild,
                cause: Box::new(cause),
                stuck,
            }
        }
    }
}

fn amount_overflow(field: &str) -> OrderError {
    OrderError::Validation(ValidationError::OutOfRange {
        field: field.to_string(),
        min: 0,
        max: i64::MAX,
    })
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use async_trait::async_trait;
    use chrono::Utc;

    use super::*;
    use crate::ports::{CatalogReader, InventoryLedger, OrderStore};
    use crate::sqlite::{SqliteInventory, SqliteOrders};
    use crate::testing;
    use retail_core::{CatalogEntry, LowStockAlert, OrderLineRequest};
    use retail_db::Database;

    /// Persistence that always fails after the effects were applied.
    struct BrokenOrderStore {
        inner: SqliteOrders,
    }

    #[async_trait]
    impl OrderStore for BrokenOrderStore {
        async fn insert_with_items(&self, _: &Order, _: &[OrderItem]) -> FulfillmentResult<()> {
            Err(OrderError::Storage("disk I/O error".to_string()))
        }

        async fn get(&self, order_id: &str) -> FulfillmentResult<Option<Order>> {
            self.inner.get(order_id).await
        }

        async fn items(&self, order_id: &str) -> FulfillmentResult<Vec<OrderItem>> {
            self.inner.items(order_id).await
        }

        async fn transition(
            &self,
            order_id: &str,
            from: OrderStatus,
            to: OrderStatus,
        ) -> FulfillmentResult<Order> {
            self.inner.transition(order_id, from, to).await
        }
    }

    /// Catalog whose prices went out of range upstream.
    struct OverpricedCatalog {
        price_cents: i64,
    }

    #[async_trait]
    impl CatalogReader for OverpricedCatalog {
        async fn resolve(&self, product_id: &str) -> FulfillmentResult<CatalogEntry> {
            Ok(CatalogEntry {
                product_id: product_id.to_string(),
                name: "Overpriced".to_string(),
                price_cents: self.price_cents,
            })
        }
    }

    /// Reserves normally but can't give stock back.
    struct StickyInventory {
        inner: SqliteInventory,
    }

    #[async_trait]
    impl InventoryLedger for StickyInventory {
        async fn reserve(
            &self,
            product_id: &str,
            quantity: i64,
            actor_id: &str,
            reason: &str,
        ) -> FulfillmentResult<i64> {
            self.inner.reserve(product_id, quantity, actor_id, reason).await
        }

        async fn release(&self, _: &str, _: i64, _: &str, _: &str) -> FulfillmentResult<i64> {
            Err(OrderError::Storage("database is locked".to_string()))
        }

        async fn low_stock(&self, threshold: i64) -> FulfillmentResult<Vec<LowStockAlert>> {
            self.inner.low_stock(threshold).await
        }
    }

    fn request(
        customer_id: &str,
        items: Vec<OrderLineRequest>,
        promo: Option<&str>,
    ) -> CreateOrderRequest {
        CreateOrderRequest {
            customer_id: customer_id.to_string(),
            user_id: "staff-1".to_string(),
            items,
            promo_code: promo.map(str::to_string),
        }
    }

    async fn stock(db: &Database, product_id: &str) -> i64 {
        db.inventory().get(product_id).await.unwrap().unwrap().quantity
    }

    #[tokio::test]
    async fn test_builds_pending_order_with_snapshot_prices() {
        let db = testing::db().await;
        let customer = testing::customer(&db).await;
        let mouse = testing::product(&db, "Mouse", 2_500, 10).await;
        let builder = OrderBuilder::new(Collaborators::sqlite(&db));

        let (order, items) = builder
            .build(
                request(&customer, vec![OrderLineRequest::new(&mouse, 4)], None),
                Utc::now().date_naive(),
            )
            .await
            .unwrap();

        assert_eq!(order.status, OrderStatus::Pending);
        assert_eq!(order.total_cents, 10_000);
        assert_eq!(order.discount_cents, 0);
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].price_cents, 2_500);
        assert_eq!(stock(&db, &mouse).await, 6);

        // Later price changes don't touch the stored line.
        db.products().update_price(&mouse, 9_900).await.unwrap();
        let stored = db.orders().get_items(&order.id).await.unwrap();
        assert_eq!(stored[0].price_cents, 2_500);
    }

    #[tokio::test]
    async fn test_duplicate_lines_are_merged() {
        let db = testing::db().await;
        let customer = testing::customer(&db).await;
        let cable = testing::product(&db, "Cable", 500, 10).await;
        let builder = OrderBuilder::new(Collaborators::sqlite(&db));

        let (_, items) = builder
            .build(
                request(
                    &customer,
                    vec![OrderLineRequest::new(&cable, 2), OrderLineRequest::new(&cable, 3)],
                    None,
                ),
                Utc::now().date_naive(),
            )
            .await
            .unwrap();

        assert_eq!(items.len(), 1);
        assert_eq!(items[0].quantity, 5);
        assert_eq!(stock(&db, &cable).await, 5);
    }

    #[tokio::test]
    async fn test_second_line_short_releases_first() {
        let db = testing::db().await;
        let customer = testing::customer(&db).await;
        let a = testing::product(&db, "Desk", 30_000, 5).await;
        let b = testing::product(&db, "Lamp", 4_000, 1).await;
        let builder = OrderBuilder::new(Collaborators::sqlite(&db));

        let err = builder
            .build(
                request(
                    &customer,
                    vec![OrderLineRequest::new(&a, 2), OrderLineRequest::new(&b, 3)],
                    None,
                ),
                Utc::now().date_naive(),
            )
            .await
            .unwrap_err();

        match err {
            OrderError::InsufficientStock {
                line,
                ref product_id,
                available,
                requested,
            } => {
                assert_eq!(line, Some(1));
                assert_eq!(product_id, &b);
                assert_eq!(available, 1);
                assert_eq!(requested, 3);
            }
            other => panic!("unexpected error: {other}"),
        }

        assert_eq!(stock(&db, &a).await, 5);
        assert_eq!(stock(&db, &b).await, 1);
    }

    #[tokio::test]
    async fn test_unknown_product_fails_before_any_reservation() {
        let db = testing::db().await;
        let customer = testing::customer(&db).await;
        let a = testing::product(&db, "Desk", 30_000, 5).await;
        let builder = OrderBuilder::new(Collaborators::sqlite(&db));

        let err = builder
            .build(
                request(
                    &customer,
                    vec![OrderLineRequest::new(&a, 1), OrderLineRequest::new("ghost", 1)],
                    None,
                ),
                Utc::now().date_naive(),
            )
            .await
            .unwrap_err();

        assert!(matches!(err, OrderError::NotFound { line: Some(1), .. }));
        assert_eq!(stock(&db, &a).await, 5);
    }

    #[tokio::test]
    async fn test_unknown_customer() {
        let db = testing::db().await;
        let a = testing::product(&db, "Desk", 30_000, 5).await;
        let builder = OrderBuilder::new(Collaborators::sqlite(&db));

        let err = builder
            .build(
                request("nobody", vec![OrderLineRequest::new(&a, 1)], None),
                Utc::now().date_naive(),
            )
            .await
            .unwrap_err();

        assert!(matches!(err, OrderError::NotFound { ref entity, .. } if entity == "Customer"));
    }

    #[tokio::test]
    async fn test_promotion_rejection_releases_stock() {
        let db = testing::db().await;
        let customer = testing::customer(&db).await;
        let a = testing::product(&db, "Desk", 30_000, 5).await;
        let promo = testing::promotion(&db, "BIG", 1_000, 0).await;
        db.promotions()
            .set_status(&promo, retail_core::PromotionStatus::Inactive)
            .await
            .unwrap();
        let builder = OrderBuilder::new(Collaborators::sqlite(&db));

        let err = builder
            .build(
                request(&customer, vec![OrderLineRequest::new(&a, 2)], Some("big")),
                Utc::now().date_naive(),
            )
            .await
            .unwrap_err();

        assert!(matches!(err, OrderError::PromotionInactive { .. }));
        assert_eq!(stock(&db, &a).await, 5);
    }

    #[tokio::test]
    async fn test_promotion_outside_window() {
        let db = testing::db().await;
        let customer = testing::customer(&db).await;
        let a = testing::product(&db, "Desk", 30_000, 5).await;
        testing::promotion(&db, "LATER", 1_000, 0).await;
        let builder = OrderBuilder::new(Collaborators::sqlite(&db));

        // Promotions from testing::promotion run 2000-01-01 ..= 2999-12-31.
        let err = builder
            .build(
                request(&customer, vec![OrderLineRequest::new(&a, 1)], Some("LATER")),
                NaiveDate::from_ymd_opt(1999, 12, 31).unwrap(),
            )
            .await
            .unwrap_err();

        assert!(matches!(err, OrderError::PromotionExpired { ref code } if code == "LATER"));
        assert_eq!(stock(&db, &a).await, 5);
    }

    #[tokio::test]
    async fn test_unknown_promo_code() {
        let db = testing::db().await;
        let customer = testing::customer(&db).await;
        let a = testing::product(&db, "Desk", 30_000, 5).await;
        let builder = OrderBuilder::new(Collaborators::sqlite(&db));

        let err = builder
            .build(
                request(&customer, vec![OrderLineRequest::new(&a, 1)], Some("NOPE")),
                Utc::now().date_naive(),
            )
            .await
            .unwrap_err();

        assert!(matches!(err, OrderError::NotFound { ref entity, .. } if entity == "Promotion"));
        assert_eq!(stock(&db, &a).await, 5);
    }

    #[tokio::test]
    async fn test_persist_failure_undoes_promo_and_stock() {
        let db = testing::db().await;
        let customer = testing::customer(&db).await;
        let a = testing::product(&db, "Desk", 30_000, 5).await;
        let promo = testing::promotion(&db, "SAVE10", 1_000, 5).await;

        let mut ports = Collaborators::sqlite(&db);
        ports.orders = Arc::new(BrokenOrderStore {
            inner: SqliteOrders::new(db.clone()),
        });
        let builder = OrderBuilder::new(ports);

        let err = builder
            .build(
                request(&customer, vec![OrderLineRequest::new(&a, 2)], Some("SAVE10")),
                Utc::now().date_naive(),
            )
            .await
            .unwrap_err();

        assert!(err.is_retryable());
        assert_eq!(stock(&db, &a).await, 5);
        let promo = db.promotions().get_by_id(&promo).await.unwrap().unwrap();
        assert_eq!(promo.used_count, 0);
    }

    #[tokio::test]
    async fn test_failed_release_reports_stuck_reservation() {
        let db = testing::db().await;
        let customer = testing::customer(&db).await;
        let a = testing::product(&db, "Desk", 30_000, 5).await;
        let b = testing::product(&db, "Lamp", 4_000, 0).await;

        let mut ports = Collaborators::sqlite(&db);
        ports.inventory = Arc::new(StickyInventory {
            inner: SqliteInventory::new(db.clone()),
        });
        let builder = OrderBuilder::new(ports);

        let err = builder
            .build(
                request(
                    &customer,
                    vec![OrderLineRequest::new(&a, 2), OrderLineRequest::new(&b, 1)],
                    None,
                ),
                Utc::now().date_naive(),
            )
            .await
            .unwrap_err();

        match err {
            OrderError::CompensationFailed {
                during,
                cause,
                stuck,
            } => {
                assert_eq!(during, CompensationStage::OrderBuild);
                assert!(matches!(*cause, OrderError::InsufficientStock { line: Some(1), .. }));
                assert_eq!(
                    stuck,
                    vec![StuckEffect::Reservation {
                        product_id: a.clone(),
                        quantity: 2
                    }]
                );
            }
            other => panic!("unexpected error: {other}"),
        }
        assert_eq!(stock(&db, &a).await, 3);
    }

    #[tokio::test]
    async fn test_amount_overflow_rejected_before_reserving() {
        let db = testing::db().await;
        let customer = testing::customer(&db).await;
        let a = testing::product(&db, "Desk", 30_000, 5).await;
        let b = testing::product(&db, "Lamp", 4_000, 5).await;
        let today = Utc::now().date_naive();

        // One line whose subtotal can't be represented.
        let mut ports = Collaborators::sqlite(&db);
        ports.catalog = Arc::new(OverpricedCatalog {
            price_cents: i64::MAX / 2,
        });
        let err = OrderBuilder::new(ports)
            .build(request(&customer, vec![OrderLineRequest::new(&a, 3)], None), today)
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            OrderError::Validation(ValidationError::OutOfRange { ref field, .. }) if field == "subtotal"
        ));

        // Lines that fit on their own but not summed.
        let mut ports = Collaborators::sqlite(&db);
        ports.catalog = Arc::new(OverpricedCatalog {
            price_cents: i64::MAX / 4,
        });
        let err = OrderBuilder::new(ports)
            .build(
                request(
                    &customer,
                    vec![OrderLineRequest::new(&a, 3), OrderLineRequest::new(&b, 3)],
                    None,
                ),
                today,
            )
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            OrderError::Validation(ValidationError::OutOfRange { ref field, .. }) if field == "total"
        ));
        assert!(!err.is_retryable());

        assert_eq!(stock(&db, &a).await, 5);
        assert_eq!(stock(&db, &b).await, 5);
    }
}
