//! # SQLite Adapters
//!
//! Implements the collaborator ports over `retail-db` repositories.
//!
//! Errors go through `From<DbError> for OrderError`, except where the
//! repository error lacks context the caller has (the promo code on a
//! refused redeem, the requested target on a lost transition).

use std::sync::Arc;

use async_trait::async_trait;
use retail_core::{
    CatalogEntry, LowStockAlert, Order, OrderItem, OrderStatus, Payment, PaymentMethod, Promotion,
};
use retail_db::{Database, DbError};

use crate::error::{FulfillmentResult, OrderError};
use crate::ports::{
    CatalogReader, Collaborators, CustomerDirectory, InventoryLedger, OrderStore, PaymentRecorder,
    PromotionLedger,
};

impl Collaborators {
    /// Wires every port to the same database.
    pub fn sqlite(db: &Database) -> Self {
        Collaborators {
            catalog: Arc::new(SqliteCatalog { db: db.clone() }),
            customers: Arc::new(SqliteCustomers { db: db.clone() }),
            inventory: Arc::new(SqliteInventory { db: db.clone() }),
            promotions: Arc::new(SqlitePromotions { db: db.clone() }),
            orders: Arc::new(SqliteOrders { db: db.clone() }),
            payments: Arc::new(SqlitePayments { db: db.clone() }),
        }
    }
}

#[derive(Clone)]
pub struct SqliteCatalog {
    db: Database,
}

#[async_trait]
impl CatalogReader for SqliteCatalog {
    async fn resolve(&self, product_id: &str) -> FulfillmentResult<CatalogEntry> {
        Ok(self.db.products().resolve(product_id).await?)
    }
}

#[derive(Clone)]
pub struct SqliteCustomers {
    db: Database,
}

#[async_trait]
impl CustomerDirectory for SqliteCustomers {
    async fn exists(&self, customer_id: &str) -> FulfillmentResult<bool> {
        Ok(self.db.customers().exists(customer_id).await?)
    }
}

#[derive(Clone)]
pub struct SqliteInventory {
    db: Database,
}

impl SqliteInventory {
    pub fn new(db: Database) -> Self {
        SqliteInventory { db }
    }
}

#[async_trait]
impl InventoryLedger for SqliteInventory {
    async fn reserve(
        &self,
        product_id: &str,
        quantity: i64,
        actor_id: &str,
        reason: &str,
    ) -> FulfillmentResult<i64> {
        Ok(self
            .db
            .inventory()
            .reserve(product_id, quantity, actor_id, reason)
            .await?)
    }

    async fn release(
        &self,
        product_id: &str,
        quantity: i64,
        actor_id: &str,
        reason: &str,
    ) -> FulfillmentResult<i64> {
        Ok(self
            .db
            .inventory()
            .release(product_id, quantity, actor_id, reason)
            .await?)
    }

    async fn low_stock(&self, threshold: i64) -> FulfillmentResult<Vec<LowStockAlert>> {
        Ok(self.db.inventory().low_stock(threshold).await?)
    }
}

#[derive(Clone)]
pub struct SqlitePromotions {
    db: Database,
}

impl SqlitePromotions {
    pub fn new(db: Database) -> Self {
        SqlitePromotions { db }
    }
}

#[async_trait]
impl PromotionLedger for SqlitePromotions {
    async fn find_by_code(&self, code: &str) -> FulfillmentResult<Option<Promotion>> {
        Ok(self.db.promotions().find_by_code(code).await?)
    }

    async fn redeem(&self, promotion: &Promotion) -> FulfillmentResult<i64> {
        match self.db.promotions().redeem(&promotion.id).await {
            Ok(used) => Ok(used),
            Err(DbError::PromotionUnavailable { reason, .. }) => Err(OrderError::promotion(
                &promotion.code,
                reason,
                promotion.min_order_amount(),
            )),
            Err(other) => Err(other.into()),
        }
    }

    async fn release(&self, promo_id: &str) -> FulfillmentResult<i64> {
        Ok(self.db.promotions().release(promo_id).await?)
    }
}

#[derive(Clone)]
pub struct SqliteOrders {
    db: Database,
}

impl SqliteOrders {
    pub fn new(db: Database) -> Self {
        SqliteOrders { db }
    }
}

#[async_trait]
impl OrderStore for SqliteOrders {
    async fn insert_with_items(&self, order: &Order, items: &[OrderItem]) -> FulfillmentResult<()> {
        Ok(self.db.orders().insert_with_items(order, items).await?)
    }

    async fn get(&self, order_id: &str) -> FulfillmentResult<Option<Order>> {
        Ok(self.db.orders().get_by_id(order_id).await?)
    }

    async fn items(&self, order_id: &str) -> FulfillmentResult<Vec<OrderItem>> {
        Ok(self.db.orders().get_items(order_id).await?)
    }

    async fn transition(
        &self,
        order_id: &str,
        from: OrderStatus,
        to: OrderStatus,
    ) -> FulfillmentResult<Order> {
        match self.db.orders().transition_status(order_id, from, to).await {
            Ok(order) => Ok(order),
            Err(DbError::StatusConflict { current, .. }) => Err(OrderError::InvalidTransition {
                order_id: order_id.to_string(),
                from: current,
                to,
            }),
            Err(other) => Err(other.into()),
        }
    }
}

#[derive(Clone)]
pub struct SqlitePayments {
    db: Database,
}

#[async_trait]
impl PaymentRecorder for SqlitePayments {
    async fn record(
        &self,
        order_id: &str,
        amount_cents: i64,
        method: PaymentMethod,
    ) -> FulfillmentResult<Payment> {
        Ok(self
            .db
            .payments()
            .record(order_id, amount_cents, method)
            .await?)
    }

    async fn list(&self, order_id: &str) -> FulfillmentResult<Vec<Payment>> {
        Ok(self.db.payments().list_for_order(order_id).await?)
    }
}
