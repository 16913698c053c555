//! # Validation Module
//!
//! Input validation for the order fulfillment transaction.
//!
//! ## Validation Strategy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      Validation Layers                                  │
//! │                                                                         │
//! │  Layer 1: Client (admin dashboard / storefront)                        │
//! │  └── Immediate user feedback                                           │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 2: THIS MODULE (before any side effect)                         │
//! │  ├── non-empty line list, bounded size                                 │
//! │  ├── quantity > 0 and ≤ MAX_ITEM_QUANTITY                              │
//! │  └── ids present, promo code length                                    │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 3: Database (SQLite)                                            │
//! │  ├── CHECK (quantity >= 0), CHECK (used_count >= 0)                    │
//! │  └── UNIQUE / FOREIGN KEY constraints                                  │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use crate::error::ValidationError;
use crate::types::{CreateOrderRequest, OrderLineRequest};
use crate::{
    MAX_ITEM_QUANTITY, MAX_ORDER_LINES, MAX_PRICE_CENTS, MAX_PROMO_CODE_LEN, MAX_STOCK_QUANTITY,
};

/// Result type for validation operations.
pub type ValidationResult<T> = Result<T, ValidationError>;

// =============================================================================
// Field Validators
// =============================================================================

/// Validates a required identifier (non-blank).
pub fn validate_id(field: &str, id: &str) -> ValidationResult<()> {
    if id.trim().is_empty() {
        return Err(ValidationError::Required {
            field: field.to_string(),
        });
    }

    Ok(())
}

/// Validates an order line quantity.
///
/// ## Rules
/// - Must be positive (> 0)
/// - Must not exceed MAX_ITEM_QUANTITY (999)
pub fn validate_quantity(qty: i64) -> ValidationResult<()> {
    if qty <= 0 {
        return Err(ValidationError::MustBePositive {
            field: "quantity".to_string(),
        });
    }

    if qty > MAX_ITEM_QUANTITY {
        return Err(ValidationError::OutOfRange {
            field: "quantity".to_string(),
            min: 1,
            max: MAX_ITEM_QUANTITY,
        });
    }

    Ok(())
}

/// Validates a ledger movement size (reserve/release/adjust magnitude).
pub fn validate_stock_delta(qty: i64) -> ValidationResult<()> {
    if qty <= 0 {
        return Err(ValidationError::MustBePositive {
            field: "quantity".to_string(),
        });
    }

    if qty > MAX_STOCK_QUANTITY {
        return Err(ValidationError::OutOfRange {
            field: "quantity".to_string(),
            min: 1,
            max: MAX_STOCK_QUANTITY,
        });
    }

    Ok(())
}

/// Validates a catalog price in minor units (zero allowed for free items).
pub fn validate_price_cents(cents: i64) -> ValidationResult<()> {
    if !(0..=MAX_PRICE_CENTS).contains(&cents) {
        return Err(ValidationError::OutOfRange {
            field: "price".to_string(),
            min: 0,
            max: MAX_PRICE_CENTS,
        });
    }

    Ok(())
}

/// Validates a payment amount in minor units.
pub fn validate_payment_amount(cents: i64) -> ValidationResult<()> {
    if cents <= 0 {
        return Err(ValidationError::MustBePositive {
            field: "payment amount".to_string(),
        });
    }

    Ok(())
}

/// Validates a promo code as typed by the user.
pub fn validate_promo_code(code: &str) -> ValidationResult<()> {
    let code = code.trim();

    if code.is_empty() {
        return Err(ValidationError::Required {
            field: "promo code".to_string(),
        });
    }

    if code.chars().count() > MAX_PROMO_CODE_LEN {
        return Err(ValidationError::TooLong {
            field: "promo code".to_string(),
            max: MAX_PROMO_CODE_LEN,
        });
    }

    Ok(())
}

// =============================================================================
// Request Validators
// =============================================================================

/// Validates a whole create-order request and returns its lines with
/// duplicate products merged.
///
/// ## Why Merge?
/// The builder reserves once per product. Two lines for the same product
/// become one line with the summed quantity, so the reservation and its
/// compensation stay one-to-one with order items.
///
/// ## Example
/// ```rust
/// use retail_core::types::{CreateOrderRequest, OrderLineRequest};
/// use retail_core::validation::validate_create_order;
///
/// let request = CreateOrderRequest {
///     customer_id: "c1".to_string(),
///     user_id: "u1".to_string(),
///     items: vec![OrderLineRequest::new("p1", 2), OrderLineRequest::new("p1", 1)],
///     promo_code: None,
/// };
/// let lines = validate_create_order(&request).unwrap();
/// assert_eq!(lines, vec![OrderLineRequest::new("p1", 3)]);
/// ```
pub fn validate_create_order(
    request: &CreateOrderRequest,
) -> ValidationResult<Vec<OrderLineRequest>> {
    validate_id("customer_id", &request.customer_id)?;
    validate_id("user_id", &request.user_id)?;

    if request.items.is_empty() {
        return Err(ValidationError::Required {
            field: "items".to_string(),
        });
    }

    if request.items.len() > MAX_ORDER_LINES {
        return Err(ValidationError::OutOfRange {
            field: "items".to_string(),
            min: 1,
            max: MAX_ORDER_LINES as i64,
        });
    }

    let mut merged: Vec<OrderLineRequest> = Vec::with_capacity(request.items.len());
    for line in &request.items {
        validate_id("product_id", &line.product_id)?;
        validate_quantity(line.quantity)?;

        match merged.iter_mut().find(|m| m.product_id == line.product_id) {
            Some(existing) => {
                existing.quantity += line.quantity;
                validate_quantity(existing.quantity)?;
            }
            None => merged.push(line.clone()),
        }
    }

    if let Some(code) = request.promo_code.as_deref() {
        if !code.trim().is_empty() {
            validate_promo_code(code)?;
        }
    }

    Ok(merged)
}

// =============================================================================
// Unit Tests
// =============================================================================
