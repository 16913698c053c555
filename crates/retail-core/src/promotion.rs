//! # Promotion Evaluation
//!
//! Decides whether a promo code applies to an order amount on a given day
//! and how much it takes off. Loading the row and committing the
//! redemption are the database layer's job; this module only judges.
//!
//! ## Check Order
//! ```text
//! status == active ─── no ──► Inactive
//!      │
//! start ≤ today ≤ end ─ no ──► Expired
//!      │
//! amount ≥ min_order ── no ──► BelowMinimum
//!      │
//! limit == 0 || used < limit ─ no ──► LimitReached
//!      │
//!      ▼
//! discount = rule.amount_off(amount)
//! ```
//!
//! The limit check here is advisory. The authoritative check is repeated
//! inside the conditional redeem update, since concurrent orders may take
//! the remaining slots between evaluation and redemption.

use chrono::NaiveDate;

use crate::error::PromotionRejection;
use crate::money::Money;
use crate::types::{Promotion, PromotionStatus};

/// Evaluates `promotion` against `order_amount` on `today`.
///
/// ## Returns
/// * `Ok(discount)` - Discount amount, always `<= order_amount`
/// * `Err(PromotionRejection)` - First failing rule
pub fn evaluate(
    promotion: &Promotion,
    order_amount: Money,
    today: NaiveDate,
) -> Result<Money, PromotionRejection> {
    if promotion.status != PromotionStatus::Active {
        return Err(PromotionRejection::Inactive);
    }

    if today < promotion.start_date || today > promotion.end_date {
        return Err(PromotionRejection::Expired);
    }

    if order_amount < promotion.min_order_amount() {
        return Err(PromotionRejection::BelowMinimum);
    }

    if !promotion.has_remaining_uses() {
        return Err(PromotionRejection::LimitReached);
    }

    Ok(promotion.discount().amount_off(order_amount))
}

/// Normalizes a user-typed promo code.
///
/// Returns `None` for blank input so "no code" and "empty code" are the
/// same thing. Case is left alone: the `promotions.code` column compares
/// with `COLLATE NOCASE`.
pub fn normalize_code(code: &str) -> Option<String> {
    let code = code.trim();
    if code.is_empty() {
        None
    } else {
        Some(code.to_string())
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
