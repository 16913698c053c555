//! # Collaborator Ports
//!
//! The order builder and lifecycle talk to storage only through these
//! traits. [`crate::sqlite`] implements them over `retail-db`; tests swap
//! in doubles that fail on purpose.
//!
//! ```text
//!   OrderBuilder / OrderLifecycle
//!          │
//!          ▼
//!   ┌──────────────┬──────────────────┬─────────────────┬─────────────┐
//!   │CatalogReader │ InventoryLedger  │ PromotionLedger │ OrderStore  │ ...
//!   └──────────────┴──────────────────┴─────────────────┴─────────────┘
//! ```
//!
//! Ledger operations are atomic and conditional on their own: a reserve
//! either takes the stock or fails, it never leaves a partial change.

use std::sync::Arc;

use async_trait::async_trait;
use retail_core::{
    CatalogEntry, LowStockAlert, Order, OrderItem, OrderStatus, Payment, PaymentMethod, Promotion,
};

use crate::error::FulfillmentResult;

/// Price and identity lookup for order lines.
#[async_trait]
pub trait CatalogReader: Send + Sync {
    /// `NotFound` when the product is missing or soft-deleted.
    async fn resolve(&self, product_id: &str) -> FulfillmentResult<CatalogEntry>;
}

#[async_trait]
pub trait CustomerDirectory: Send + Sync {
    async fn exists(&self, customer_id: &str) -> FulfillmentResult<bool>;
}

/// On-hand stock, changed only by conditional deltas.
#[async_trait]
pub trait InventoryLedger: Send + Sync {
    /// Takes `quantity` out of stock. Returns the stock left.
    ///
    /// Fails with `InsufficientStock` rather than going negative.
    async fn reserve(
        &self,
        product_id: &str,
        quantity: i64,
        actor_id: &str,
        reason: &str,
    ) -> FulfillmentResult<i64>;

    /// Puts `quantity` back. Returns the stock after.
    async fn release(
        &self,
        product_id: &str,
        quantity: i64,
        actor_id: &str,
        reason: &str,
    ) -> FulfillmentResult<i64>;

    async fn low_stock(&self, threshold: i64) -> FulfillmentResult<Vec<LowStockAlert>>;
}

/// Promo code lookup and the usage counter.
#[async_trait]
pub trait PromotionLedger: Send + Sync {
    /// Case-insensitive lookup of a live promotion.
    async fn find_by_code(&self, code: &str) -> FulfillmentResult<Option<Promotion>>;

    /// Counts one use, refusing past the limit or when inactive.
    async fn redeem(&self, promotion: &Promotion) -> FulfillmentResult<i64>;

    /// Gives one use back. Never drops below zero.
    async fn release(&self, promo_id: &str) -> FulfillmentResult<i64>;
}

#[async_trait]
pub trait OrderStore: Send + Sync {
    /// Header and items become visible together or not at all.
    async fn insert_with_items(&self, order: &Order, items: &[OrderItem]) -> FulfillmentResult<()>;

    async fn get(&self, order_id: &str) -> FulfillmentResult<Option<Order>>;

    async fn items(&self, order_id: &str) -> FulfillmentResult<Vec<OrderItem>>;

    /// Conditional status move. `InvalidTransition` when the order is no
    /// longer in `from`; exactly one concurrent caller wins.
    async fn transition(
        &self,
        order_id: &str,
        from: OrderStatus,
        to: OrderStatus,
    ) -> FulfillmentResult<Order>;
}

#[async_trait]
pub trait PaymentRecorder: Send + Sync {
    async fn record(
        &self,
        order_id: &str,
        amount_cents: i64,
        method: PaymentMethod,
    ) -> FulfillmentResult<Payment>;

    async fn list(&self, order_id: &str) -> FulfillmentResult<Vec<Payment>>;
}

/// Every collaborator the fulfillment transaction needs, shared by the
/// builder, the lifecycle and the service.
#[derive(Clone)]
pub struct Collaborators {
    pub catalog: Arc<dyn CatalogReader>,
    pub customers: Arc<dyn CustomerDirectory>,
    pub inventory: Arc<dyn InventoryLedger>,
    pub promotions: Arc<dyn PromotionLedger>,
    pub orders: Arc<dyn OrderStore>,
    pub payments: Arc<dyn PaymentRecorder>,
}
