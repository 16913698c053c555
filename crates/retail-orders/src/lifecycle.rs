//! # Order Lifecycle
//!
//! Moves persisted orders out of `Pending`.
//!
//! ```text
//!              pay                       cancel
//!   Pending ─────────► Paid    Pending ─────────► Canceled
//!                                         │
//!                                         ├── release every line's stock
//!                                         └── release the promotion use
//! ```
//!
//! The status move is a conditional claim: of two concurrent cancels only
//! one gets past it, so stock is released once. Compensation runs after
//! the claim and is best-effort; what can't be released is reported as
//! `CompensationFailed`.

use tracing::{debug, error, info, instrument};

use retail_core::{Order, OrderTransition};

use crate::error::{CompensationStage, FulfillmentResult, OrderError, StuckEffect};
use crate::ports::Collaborators;

#[derive(Clone)]
pub struct OrderLifecycle {
    ports: Collaborators,
}

impl OrderLifecycle {
    pub fn new(ports: Collaborators) -> Self {
        OrderLifecycle { ports }
    }

    /// Marks a pending order paid. Payment records are separate.
    #[instrument(skip(self))]
    pub async fn pay(&self, order_id: &str) -> FulfillmentResult<Order> {
        let order = self.claim(order_id, OrderTransition::Pay).await?;
        info!(order_id = %order_id, amount = %order.final_amount(), "Order paid");
        Ok(order)
    }

    /// Cancels a pending order and gives back what it took.
    #[instrument(skip(self))]
    pub async fn cancel(&self, order_id: &str) -> FulfillmentResult<Order> {
        let order = self.claim(order_id, OrderTransition::Cancel).await?;
        self.release_effects(&order).await?;
        info!(order_id = %order_id, "Order canceled");
        Ok(order)
    }

    /// Checks the transition table against the current status, then takes
    /// the conditional update. A concurrent mover that got there first
    /// surfaces as `InvalidTransition` from the store.
    async fn claim(&self, order_id: &str, transition: OrderTransition) -> FulfillmentResult<Order> {
        let current = self
            .ports
            .orders
            .get(order_id)
            .await?
            .ok_or_else(|| OrderError::not_found("Order", order_id))?;

        let target = current
            .status
            .transition(transition)
            .map_err(|e| OrderError::from_core(order_id, e))?;

        debug!(order_id = %order_id, from = %current.status, to = %target, "Claiming transition");
        self.ports
            .orders
            .transition(order_id, current.status, target)
            .await
    }

    /// Releases stock per line and the promotion use, continuing past
    /// failures so one stuck line doesn't strand the others.
    async fn release_effects(&self, order: &Order) -> FulfillmentResult<()> {
        let reason = format!("order {} canceled", order.id);

        let items = match self.ports.orders.items(&order.id).await {
            Ok(items) => items,
            Err(e) => {
                error!(critical = true, order_id = %order.id, error = %e, "Canceled order's lines unreadable");
                let mut stuck = vec![StuckEffect::OrderLines {
                    order_id: order.id.clone(),
                }];
                stuck.extend(order.promo_id.iter().map(|promo_id| StuckEffect::Redemption {
                    promo_id: promo_id.clone(),
                }));
                return Err(OrderError::CompensationFailed {
                    during: CompensationStage::Cancel,
                    cause: Box::new(e),
                    stuck,
                });
            }
        };

        let mut first_error: Option<OrderError> = None;
        let mut stuck = Vec::new();

        for item in &items {
            if let Err(e) = self
                .ports
                .inventory
                .release(&item.product_id, item.quantity, &order.user_id, &reason)
                .await
            {
                error!(
                    critical = true,
                    order_id = %order.id,
                    product_id = %item.product_id,
                    quantity = item.quantity,
                    error = %e,
                    "Failed to release stock of canceled order"
                );
                stuck.push(StuckEffect::Reservation {
                    product_id: item.product_id.clone(),
                    quantity: item.quantity,
                });
                first_error.get_or_insert(e);
            }
        }

        if let Some(promo_id) = &order.promo_id {
            if let Err(e) = self.ports.promotions.release(promo_id).await {
                error!(critical = true, order_id = %order.id, promo_id = %promo_id, error = %e, "Failed to release promotion of canceled order");
                stuck.push(StuckEffect::Redemption {
                    promo_id: promo_id.clone(),
                });
                first_error.get_or_insert(e);
            }
        }

        match first_error {
            None => Ok(()),
            Some(cause) => Err(OrderError::CompensationFailed {
                during: CompensationStage::Cancel,
                cause: Box::new(cause),
                stuck,
            }),
        }
    }
}
