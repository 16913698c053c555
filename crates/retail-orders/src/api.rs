//! # API Error Type
//!
//! What callers of [`crate::OrderService`] receive when an operation fails.
//!
//! ## Serialization
//! ```json
//! {
//!   "code": "INSUFFICIENT_STOCK",
//!   "message": "Insufficient stock for product 9f1c…: available 1, requested 3",
//!   "line": 1,
//!   "retryable": false
//! }
//! ```
//!
//! `line` is present for per-line failures, `promoCode` for promotion
//! failures. Storage details never leave the process: they are logged and
//! replaced with a generic message.

use serde::Serialize;
use thiserror::Error;
use ts_rs::TS;

use crate::error::{CompensationStage, OrderError};

/// API error returned from order service operations.
#[derive(Debug, Clone, Serialize, Error, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
#[error("{message}")]
pub struct ApiError {
    /// Machine-readable error code for programmatic handling
    pub code: ErrorCode,

    /// Human-readable error message for display
    pub message: String,

    /// Index of the failing line in the request's items
    #[serde(skip_serializing_if = "Option::is_none")]
    pub line: Option<usize>,

    /// The promo code a promotion failure refers to
    #[serde(skip_serializing_if = "Option::is_none")]
    pub promo_code: Option<String>,

    /// Whether retrying the same call may succeed
    pub retryable: bool,
}

/// Error codes for API responses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, TS)]
#[ts(export)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    /// Product, customer, promotion or order missing
    NotFound,

    InsufficientStock,

    PromotionInactive,

    /// Outside the promotion's date window
    PromotionExpired,

    PromotionBelowMinimum,

    PromotionLimitReached,

    /// Order isn't in a status the operation can leave
    InvalidTransition,

    /// Input validation failed
    ValidationError,

    /// Storage failed; retryable
    StorageFailure,

    /// Effects of a failed order could not be undone; needs reconciliation
    CompensationFailed,
}

impl ApiError {
    /// Creates a new API error.
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        ApiError {
            code,
            message: message.into(),
            line: None,
            promo_code: None,
            retryable: code == ErrorCode::StorageFailure,
        }
    }

    pub fn not_found(resource: &str, id: &str) -> Self {
        ApiError::new(ErrorCode::NotFound, format!("{} not found: {}", resource, id))
    }

    pub fn validation(message: impl Into<String>) -> Self {
        ApiError::new(ErrorCode::ValidationError, message)
    }

    pub fn storage() -> Self {
        ApiError::new(
            ErrorCode::StorageFailure,
            "Storage temporarily unavailable, please retry",
        )
    }
}

impl From<OrderError> for ApiError {
    fn from(err: OrderError) -> Self {
        let line = err.line();
        let promo_code = err.promo_code().map(str::to_string);

        let mut api = match &err {
            OrderError::NotFound { .. } => ApiError::new(ErrorCode::NotFound, err.to_string()),
            OrderError::InsufficientStock { .. } => {
                ApiError::new(ErrorCode::InsufficientStock, err.to_string())
            }
            OrderError::PromotionInactive { .. } => {
                ApiError::new(ErrorCode::PromotionInactive, err.to_string())
            }
            OrderError::PromotionExpired { .. } => {
                ApiError::new(ErrorCode::PromotionExpired, err.to_string())
            }
            OrderError::PromotionBelowMinimum { .. } => {
                ApiError::new(ErrorCode::PromotionBelowMinimum, err.to_string())
            }
            OrderError::PromotionLimitReached { .. } => {
                ApiError::new(ErrorCode::PromotionLimitReached, err.to_string())
            }
            OrderError::InvalidTransition { .. } => {
                ApiError::new(ErrorCode::InvalidTransition, err.to_string())
            }
            OrderError::Validation(v) => ApiError::validation(v.to_string()),
            OrderError::Storage(detail) => {
                // Log the actual error but return a generic message
                tracing::error!("Storage failure: {}", detail);
                ApiError::storage()
            }
            OrderError::CompensationFailed { during, .. } => {
                tracing::error!(critical = true, "{}", err);
                let message = match during {
                    CompensationStage::OrderBuild => {
                        "Order failed and could not be fully rolled back; reconciliation required"
                    }
                    CompensationStage::Cancel => {
                        "Order canceled but some stock or promotion uses were not released; reconciliation required"
                    }
                };
                ApiError::new(ErrorCode::CompensationFailed, message)
            }
        };

        api.line = line;
        api.promo_code = promo_code;
        api
    }
}
