//! # Fulfillment Errors
//!
//! Failure taxonomy of the order fulfillment transaction.
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  Kind                    Carries                  Retry?               │
//! │  ─────────────────────   ──────────────────────   ──────               │
//! │  NotFound                entity, id, line?        no                   │
//! │  InsufficientStock       line?, product, avail    no                   │
//! │  Promotion*              code                     no                   │
//! │  InvalidTransition       order, from, to          no                   │
//! │  Validation              field detail             no                   │
//! │    (incl. constraint                                                    │
//! │     violations)                                                         │
//! │  Storage                 detail (logged only)     yes                  │
//! │  CompensationFailed      cause + stuck effects    no, reconcile        │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use std::fmt;

use retail_core::{
    CoreError, Money, OrderStatus, PromotionRejection, ValidationError, MAX_STOCK_QUANTITY,
};
use retail_db::DbError;
use serde::Serialize;
use thiserror::Error;
use tracing::{error, warn};
use ts_rs::TS;

/// An effect of a failed or canceled order that could not be undone.
///
/// Operators reconcile these by hand.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, TS)]
#[ts(export)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum StuckEffect {
    /// Stock still taken out for a product.
    Reservation { product_id: String, quantity: i64 },
    /// A promotion use still counted.
    Redemption { promo_id: String },
    /// The order's lines could not even be loaded; every reservation of
    /// the order is suspect.
    OrderLines { order_id: String },
}

impl fmt::Display for StuckEffect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StuckEffect::Reservation {
                product_id,
                quantity,
            } => write!(f, "{} unit(s) of {} still reserved", quantity, product_id),
            StuckEffect::Redemption { promo_id } => {
                write!(f, "promotion {} still redeemed", promo_id)
            }
            StuckEffect::OrderLines { order_id } => {
                write!(f, "reservations of order {} unknown", order_id)
            }
        }
    }
}

/// What was being undone when compensation failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompensationStage {
    /// Rolling back a build that failed part way.
    OrderBuild,
    /// Releasing the stock and promotion use of a canceled order.
    Cancel,
}

impl fmt::Display for CompensationStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CompensationStage::OrderBuild => write!(f, "order build"),
            CompensationStage::Cancel => write!(f, "cancel"),
        }
    }
}

/// Errors of the order fulfillment transaction.
#[derive(Debug, Error)]
pub enum OrderError {
    /// Product, customer, promotion or order missing (or soft-deleted).
    #[error("{entity} not found: {id}")]
    NotFound {
        entity: String,
        id: String,
        /// Index into the request's items, for product lookups.
        line: Option<usize>,
    },

    #[error("Insufficient stock for product {product_id}: available {available}, requested {requested}")]
    InsufficientStock {
        line: Option<usize>,
        product_id: String,
        available: i64,
        requested: i64,
    },

    #[error("Promotion {code} is not active")]
    PromotionInactive { code: String },

    #[error("Promotion {code} is not valid today")]
    PromotionExpired { code: String },

    #[error("Order amount is below the {minimum} minimum of promotion {code}")]
    PromotionBelowMinimum { code: String, minimum: Money },

    #[error("Promotion {code} has reached its usage limit")]
    PromotionLimitReached { code: String },

    #[error("Cannot move order {order_id} from {from} to {to}")]
    InvalidTransition {
        order_id: String,
        from: OrderStatus,
        to: OrderStatus,
    },

    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    /// The storage failed. The detail is for logs, not for callers.
    #[error("Storage failure: {0}")]
    Storage(String),

    /// Undoing the effects of a failed build (or a cancel) failed.
    #[error("Compensation of {during} failed after '{cause}': {}", format_stuck(.stuck))]
    CompensationFailed {
        during: CompensationStage,
        cause: Box<OrderError>,
        stuck: Vec<StuckEffect>,
    },
}

fn format_stuck(stuck: &[StuckEffect]) -> String {
    stuck
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

impl OrderError {
    pub fn not_found(entity: impl Into<String>, id: impl Into<String>) -> Self {
        OrderError::NotFound {
            entity: entity.into(),
            id: id.into(),
            line: None,
        }
    }

    /// Tags a per-line failure with the index of the failing line.
    pub fn at_line(self, index: usize) -> Self {
        match self {
            OrderError::NotFound { entity, id, .. } => OrderError::NotFound {
                entity,
                id,
                line: Some(index),
            },
            OrderError::InsufficientStock {
                product_id,
                available,
                requested,
                ..
            } => OrderError::InsufficientStock {
                line: Some(index),
                product_id,
                available,
                requested,
            },
            other => other,
        }
    }

    /// Maps a promotion evaluation/redeem refusal for `code`.
    pub fn promotion(code: &str, reason: PromotionRejection, minimum: Money) -> Self {
        let code = code.to_string();
        match reason {
            PromotionRejection::Inactive => OrderError::PromotionInactive { code },
            PromotionRejection::Expired => OrderError::PromotionExpired { code },
            PromotionRejection::BelowMinimum => OrderError::PromotionBelowMinimum { code, minimum },
            PromotionRejection::LimitReached => OrderError::PromotionLimitReached { code },
        }
    }

    /// Converts a transition-table refusal for `order_id`.
    pub fn from_core(order_id: &str, err: CoreError) -> Self {
        match err {
            CoreError::InvalidTransition { from, to } => OrderError::InvalidTransition {
                order_id: order_id.to_string(),
                from,
                to,
            },
            CoreError::PromotionRejected { code, reason } => {
                OrderError::promotion(&code, reason, Money::zero())
            }
            CoreError::Validation(v) => OrderError::Validation(v),
        }
    }

    /// Index of the failing request line, when the failure is per-line.
    pub fn line(&self) -> Option<usize> {
        match self {
            OrderError::NotFound { line, .. } | OrderError::InsufficientStock { line, .. } => *line,
            OrderError::CompensationFailed { cause, .. } => cause.line(),
            _ => None,
        }
    }

    /// Promo code involved, for promotion failures.
    pub fn promo_code(&self) -> Option<&str> {
        match self {
            OrderError::PromotionInactive { code }
            | OrderError::PromotionExpired { code }
            | OrderError::PromotionBelowMinimum { code, .. }
            | OrderError::PromotionLimitReached { code } => Some(code),
            OrderError::CompensationFailed { cause, .. } => cause.promo_code(),
            _ => None,
        }
    }

    /// Only transient storage failures are worth retrying as-is.
    pub fn is_retryable(&self) -> bool {
        matches!(self, OrderError::Storage(_))
    }

    /// Leaves the system needing manual reconciliation.
    pub fn is_critical(&self) -> bool {
        matches!(self, OrderError::CompensationFailed { .. })
    }
}

/// Generic storage-to-fulfillment mapping.
///
/// Adapters handle the cases that need more context (promotion code,
/// transition target) before falling back to this. Constraint violations
/// mean the input was wrong, so they surface as non-retryable validation
/// errors with the SQL detail kept in the logs.
impl From<DbError> for OrderError {
    fn from(err: DbError) -> Self {
        match err {
            DbError::NotFound { entity, id } => OrderError::NotFound {
                entity,
                id,
                line: None,
            },
            DbError::InsufficientStock {
                product_id,
                available,
                requested,
            } => OrderError::InsufficientStock {
                line: None,
                product_id,
                available,
                requested,
            },
            DbError::PromotionUnavailable { promo_id, reason } => {
                OrderError::promotion(&promo_id, reason, Money::zero())
            }
            DbError::StatusConflict { order_id, current } => OrderError::InvalidTransition {
                order_id,
                from: current,
                to: current,
            },
            DbError::Validation(v) => OrderError::Validation(v),
            DbError::StockLimitExceeded { product_id } => {
                warn!(product_id = %product_id, "Stock movement past the ledger limit");
                OrderError::Validation(ValidationError::OutOfRange {
                    field: "quantity".to_string(),
                    min: 0,
                    max: MAX_STOCK_QUANTITY,
                })
            }
            DbError::UniqueViolation { field, value } => {
                warn!(field = %field, value = %value, "Unique constraint refused write");
                OrderError::Validation(ValidationError::InvalidFormat {
                    field,
                    reason: "already exists".to_string(),
                })
            }
            DbError::ForeignKeyViolation { message } => {
                warn!(detail = %message, "Foreign key constraint refused write");
                OrderError::Validation(ValidationError::InvalidFormat {
                    field: "reference".to_string(),
                    reason: "refers to a missing record".to_string(),
                })
            }
            DbError::CheckViolation { message } => {
                warn!(detail = %message, "Check constraint refused write");
                OrderError::Validation(ValidationError::InvalidFormat {
                    field: "record".to_string(),
                    reason: "violates a data constraint".to_string(),
                })
            }
            other => {
                error!(error = %other, "Storage operation failed");
                OrderError::Storage(other.to_string())
            }
        }
    }
}

/// Result type for fulfillment operations.
pub type FulfillmentResult<T> = Result<T, OrderError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_at_line_tags_stock_failures_only() {
        let err = OrderError::InsufficientStock {
            line: None,
            product_id: "p".to_string(),
            available: 1,
            requested: 3,
        }
        .at_line(2);
        assert_eq!(err.line(), Some(2));

        let err = OrderError::PromotionExpired {
            code: "X".to_string(),
        }
        .at_line(2);
        assert_eq!(err.line(), None);
        assert_eq!(err.promo_code(), Some("X"));
    }

    #[test]
    fn test_storage_is_the_only_retryable_kind() {
        assert!(OrderError::Storage("disk".to_string()).is_retryable());
        assert!(!OrderError::not_found("Order", "o").is_retryable());
        assert!(!OrderError::PromotionLimitReached {
            code: "X".to_string()
        }
        .is_retryable());
    }

    #[test]
    fn test_compensation_failure_keeps_cause_details() {
        let err = OrderError::CompensationFailed {
            during: CompensationStage::OrderBuild,
            cause: Box::new(
                OrderError::InsufficientStock {
                    line: None,
                    product_id: "b".to_string(),
                    available: 0,
                    requested: 1,
                }
                .at_line(1),
            ),
            stuck: vec![StuckEffect::Reservation {
                product_id: "a".to_string(),
                quantity: 2,
            }],
        };
        assert!(err.is_critical());
        assert_eq!(err.line(), Some(1));
        assert!(err.to_string().contains("2 unit(s) of a still reserved"));
    }

    #[test]
    fn test_db_errors_map_by_kind() {
        let err: OrderError = DbError::PromotionUnavailable {
            promo_id: "promo".to_string(),
            reason: PromotionRejection::LimitReached,
        }
        .into();
        assert!(matches!(err, OrderError::PromotionLimitReached { .. }));

        let err: OrderError = DbError::PoolExhausted.into();
        assert!(err.is_retryable());
    }

    #[test]
    fn test_constraint_violations_are_not_retryable() {
        let violations = [
            DbError::duplicate("products.barcode", "5901234123457"),
            DbError::ForeignKeyViolation {
                message: "FOREIGN KEY constraint failed".to_string(),
            },
            DbError::CheckViolation {
                message: "CHECK constraint failed: quantity >= 0".to_string(),
            },
            DbError::StockLimitExceeded {
                product_id: "p".to_string(),
            },
            DbError::Validation(ValidationError::MustBePositive {
                field: "quantity".to_string(),
            }),
        ];

        for db_err in violations {
            let err: OrderError = db_err.into();
            assert!(matches!(err, OrderError::Validation(_)), "{err}");
            assert!(!err.is_retryable());
            assert!(!err.to_string().contains("constraint failed"));
        }
    }

    #[test]
    fn test_from_core_transition() {
        let err = OrderError::from_core(
            "o1",
            CoreError::InvalidTransition {
                from: OrderStatus::Paid,
                to: OrderStatus::Canceled,
            },
        );
        assert_eq!(err.to_string(), "Cannot move order o1 from paid to canceled");
    }
}
