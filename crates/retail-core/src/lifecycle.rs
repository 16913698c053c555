//! # Order Lifecycle
//!
//! The order status transition table.
//!
//! ```text
//!                 pay
//!   ┌─────────┐ ───────► ┌────────┐
//!   │ Pending │          │  Paid  │   (terminal)
//!   └─────────┘ ───────► └────────┘
//!        │       cancel  ┌──────────┐
//!        └─────────────► │ Canceled │ (terminal, stock + promo released)
//!                        └──────────┘
//! ```
//!
//! Anything not drawn above is rejected with
//! [`CoreError::InvalidTransition`].

use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::error::{CoreError, CoreResult};
use crate::types::OrderStatus;

/// A requested status change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum OrderTransition {
    Pay,
    Cancel,
}

impl OrderTransition {
    /// Status the order ends up in if the transition is allowed.
    pub const fn target(&self) -> OrderStatus {
        match self {
            OrderTransition::Pay => OrderStatus::Paid,
            OrderTransition::Cancel => OrderStatus::Canceled,
        }
    }

    /// Whether this transition must undo the order's reservations.
    pub const fn compensates(&self) -> bool {
        matches!(self, OrderTransition::Cancel)
    }
}

impl OrderStatus {
    /// Applies `transition` to this status.
    ///
    /// ## Example
    /// ```rust
    /// use retail_core::{OrderStatus, OrderTransition};
    ///
    /// assert_eq!(
    ///     OrderStatus::Pending.transition(OrderTransition::Pay).unwrap(),
    ///     OrderStatus::Paid
    /// );
    /// assert!(OrderStatus::Paid.transition(OrderTransition::Cancel).is_err());
    /// ```
    pub fn transition(self, transition: OrderTransition) -> CoreResult<OrderStatus> {
        match (self, transition) {
            (OrderStatus::Pending, OrderTransition::Pay) => Ok(OrderStatus::Paid),
            (OrderStatus::Pending, OrderTransition::Cancel) => Ok(OrderStatus::Canceled),
            (from, t) => Err(CoreError::InvalidTransition {
                from,
                to: t.target(),
            }),
        }
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
