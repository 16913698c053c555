//! # Order Service
//!
//! The caller-facing surface. Every operation returns `Result<_, ApiError>`.
//!
//! ## Cancellation Safety
//! Builds and cancels run in their own spawned task. If the caller drops
//! the future mid-build, the task still runs to completion (or full
//! compensation), so a half-built order is never left behind.

use chrono::Utc;
use serde::{Deserialize, Serialize};
use tokio::task::JoinError;
use tracing::{info, instrument, warn};
use ts_rs::TS;

use retail_core::validation::validate_payment_amount;
use retail_core::{
    CreateOrderRequest, LowStockAlert, Order, OrderItem, OrderStatus, Payment, PaymentMethod,
};
use retail_db::Database;

use crate::api::ApiError;
use crate::builder::OrderBuilder;
use crate::config::ServiceConfig;
use crate::error::{FulfillmentResult, OrderError};
use crate::lifecycle::OrderLifecycle;
use crate::ports::Collaborators;

/// An order with its lines and the amount due.
#[derive(Debug, Clone, Serialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct OrderResult {
    pub order: Order,
    pub items: Vec<OrderItem>,
    /// `total − discount`
    pub final_amount_cents: i64,
}

impl OrderResult {
    pub fn new(order: Order, items: Vec<OrderItem>) -> Self {
        let final_amount_cents = order.final_amount().cents();
        OrderResult {
            order,
            items,
            final_amount_cents,
        }
    }
}

/// Payment to record alongside (or after) paying an order.
#[derive(Debug, Clone, Default, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct PaymentRequest {
    /// Defaults to the order's amount due.
    #[serde(default)]
    pub amount_cents: Option<i64>,
    /// Defaults to the configured payment method.
    #[serde(default)]
    pub method: Option<PaymentMethod>,
}

#[derive(Clone)]
pub struct OrderService {
    ports: Collaborators,
    builder: OrderBuilder,
    lifecycle: OrderLifecycle,
    config: ServiceConfig,
}

impl OrderService {
    pub fn new(ports: Collaborators, config: ServiceConfig) -> Self {
        OrderService {
            builder: OrderBuilder::new(ports.clone()),
            lifecycle: OrderLifecycle::new(ports.clone()),
            ports,
            config,
        }
    }

    /// Serves orders from an already open database.
    pub fn with_database(db: &Database, config: ServiceConfig) -> Self {
        OrderService::new(Collaborators::sqlite(db), config)
    }

    /// Opens (and migrates) the configured database.
    pub async fn connect(config: ServiceConfig) -> Result<Self, ApiError> {
        let db = Database::new(config.db_config())
            .await
            .map_err(OrderError::from)?;
        info!(path = ?config.database_path, "Order service ready");
        Ok(OrderService::with_database(&db, config))
    }

    pub fn config(&self) -> &ServiceConfig {
        &self.config
    }

    /// Builds a new pending order.
    #[instrument(skip(self, request), fields(customer_id = %request.customer_id, lines = request.items.len()))]
    pub async fn create_order(&self, request: CreateOrderRequest) -> Result<OrderResult, ApiError> {
        let builder = self.builder.clone();
        let today = Utc::now().date_naive();

        let built = tokio::spawn(async move { builder.build(request, today).await })
            .await
            .map_err(task_failed)?;
        let (order, items) = built?;

        Ok(OrderResult::new(order, items))
    }

    /// Marks an order paid, then records a payment if one is given.
    ///
    /// The status change stands even if recording the payment fails (that
    /// is logged); record it again with [`OrderService::record_payment`].
    #[instrument(skip(self, payment))]
    pub async fn pay_order(
        &self,
        order_id: &str,
        payment: Option<PaymentRequest>,
    ) -> Result<OrderResult, ApiError> {
        let order = self.lifecycle.pay(order_id).await?;

        if let Some(payment) = payment {
            let amount = payment
                .amount_cents
                .unwrap_or_else(|| order.final_amount().cents());
            if let Err(e) = self.store_payment(order_id, amount, payment.method).await {
                warn!(order_id = %order_id, error = %e, "Order paid but payment not recorded");
            }
        }

        Ok(self.with_items(order).await?)
    }

    /// Cancels a pending order, releasing its stock and promotion use.
    #[instrument(skip(self))]
    pub async fn cancel_order(&self, order_id: &str) -> Result<OrderResult, ApiError> {
        let lifecycle = self.lifecycle.clone();
        let id = order_id.to_string();

        let canceled = tokio::spawn(async move { lifecycle.cancel(&id).await })
            .await
            .map_err(task_failed)?;
        let order = canceled?;

        Ok(self.with_items(order).await?)
    }

    #[instrument(skip(self))]
    pub async fn get_order(&self, order_id: &str) -> Result<OrderResult, ApiError> {
        let order = self
            .ports
            .orders
            .get(order_id)
            .await?
            .ok_or_else(|| OrderError::not_found("Order", order_id))?;

        Ok(self.with_items(order).await?)
    }

    /// Records a payment against an existing order. Doesn't change status.
    ///
    /// Pending orders may take a deposit and paid orders a late record;
    /// canceled orders accept no money.
    #[instrument(skip(self))]
    pub async fn record_payment(
        &self,
        order_id: &str,
        amount_cents: i64,
        method: Option<PaymentMethod>,
    ) -> Result<Payment, ApiError> {
        let order = self
            .ports
            .orders
            .get(order_id)
            .await?
            .ok_or_else(|| OrderError::not_found("Order", order_id))?;

        if order.status == OrderStatus::Canceled {
            return Err(OrderError::InvalidTransition {
                order_id: order_id.to_string(),
                from: OrderStatus::Canceled,
                to: OrderStatus::Paid,
            }
            .into());
        }

        Ok(self.store_payment(order_id, amount_cents, method).await?)
    }

    #[instrument(skip(self))]
    pub async fn payments(&self, order_id: &str) -> Result<Vec<Payment>, ApiError> {
        Ok(self.ports.payments.list(order_id).await?)
    }

    /// Products under the configured stock threshold.
    #[instrument(skip(self))]
    pub async fn low_stock(&self) -> Result<Vec<LowStockAlert>, ApiError> {
        Ok(self
            .ports
            .inventory
            .low_stock(self.config.low_stock_threshold)
            .await?)
    }

    async fn store_payment(
        &self,
        order_id: &str,
        amount_cents: i64,
        method: Option<PaymentMethod>,
    ) -> FulfillmentResult<Payment> {
        validate_payment_amount(amount_cents)?;
        let method = method.unwrap_or(self.config.default_payment_method);

        let payment = self.ports.payments.record(order_id, amount_cents, method).await?;
        info!(order_id = %order_id, amount_cents, ?method, "Payment recorded");
        Ok(payment)
    }

    async fn with_items(&self, order: Order) -> FulfillmentResult<OrderResult> {
        let items = self.ports.orders.items(&order.id).await?;
        Ok(OrderResult::new(order, items))
    }
}

fn task_failed(err: JoinError) -> OrderError {
    OrderError::Storage(format!("order task failed: {}", err))
}
