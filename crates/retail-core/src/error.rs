//! # Error Types
//!
//! Domain-specific error types for retail-core.
//!
//! ## Error Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Error Types                                     │
//! │                                                                         │
//! │  retail-core errors (this file)                                        │
//! │  ├── CoreError          - General domain errors                        │
//! │  ├── PromotionRejection - Why a promo code cannot be applied           │
//! │  └── ValidationError    - Input validation failures                    │
//! │                                                                         │
//! │  retail-db errors (separate crate)                                     │
//! │  └── DbError            - Database operation failures                  │
//! │                                                                         │
//! │  retail-orders errors                                                  │
//! │  ├── OrderError         - Fulfillment failures (with compensation)     │
//! │  └── ApiError           - What callers see (serialized)                │
//! │                                                                         │
//! │  Flow: ValidationError → CoreError → OrderError → ApiError             │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use serde::{Deserialize, Serialize};
use thiserror::Error;
use ts_rs::TS;

use crate::types::OrderStatus;

// =============================================================================
// Core Error
// =============================================================================

/// Core business logic errors.
#[derive(Debug, Error)]
pub enum CoreError {
    /// An order status change that is not in the transition table.
    ///
    /// ## When This Occurs
    /// - Paying or canceling an order that is already Paid
    /// - Paying or canceling an order that is already Canceled
    #[error("Cannot move order from {from} to {to}")]
    InvalidTransition { from: OrderStatus, to: OrderStatus },

    /// A promotion was rejected for the given order amount/date.
    #[error("Promotion {code} rejected: {reason}")]
    PromotionRejected {
        code: String,
        reason: PromotionRejection,
    },

    /// Validation error (wraps ValidationError).
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),
}

// =============================================================================
// Promotion Rejection
// =============================================================================

/// Reason a promo code cannot be applied to an order.
///
/// `NotFound` is not part of this enum: an unknown code is a lookup failure
/// reported by the storage layer, not an evaluation result.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Error, TS)]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum PromotionRejection {
    /// Promotion status is not `active`.
    #[error("promotion is not active")]
    Inactive,

    /// Evaluation date is outside `[start_date, end_date]`.
    #[error("promotion is not valid for this date")]
    Expired,

    /// Order amount is under `min_order_amount`.
    #[error("order amount is below the promotion minimum")]
    BelowMinimum,

    /// `used_count` has reached a non-zero `usage_limit`.
    #[error("promotion usage limit reached")]
    LimitReached,
}

// =============================================================================
// Validation Error
// =============================================================================

/// Input validation errors.
///
/// These errors occur before any side effect of an order build runs.
#[derive(Debug, Error)]
pub enum ValidationError {
    /// A required field is missing or empty.
    #[error("{field} is required")]
    Required { field: String },

    /// Field value is too long.
    #[error("{field} must be at most {max} characters")]
    TooLong { field: String, max: usize },

    /// Numeric value is out of range.
    #[error("{field} must be between {min} and {max}")]
    OutOfRange { field: String, min: i64, max: i64 },

    /// Value must be positive.
    #[error("{field} must be positive")]
    MustBePositive { field: String },

    /// Invalid value (e.g., a duplicate or dangling reference).
    #[error("{field} has invalid format: {reason}")]
    InvalidFormat { field: String, reason: String },
}

// =============================================================================
// Result Type Alias
// =============================================================================

/// Convenience type alias for Results with CoreError.
pub type CoreResult<T> = Result<T, CoreError>;

// =============================================================================
// Unit Tests
// =============================================================================
