//! # retail-core: Pure Business Logic for Order Fulfillment
//!
//! This crate holds the rules of the order fulfillment transaction as pure
//! functions with zero I/O dependencies.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                     Retail Fulfillment Architecture                     │
//! │                                                                         │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │            Admin dashboard / staff order entry                  │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │ create / pay / cancel                  │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │              retail-orders (builder + lifecycle)                │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │               ★ retail-core (THIS CRATE) ★                      │   │
//! │  │                                                                 │   │
//! │  │   ┌───────────┐  ┌───────────┐  ┌───────────┐  ┌───────────┐  │   │
//! │  │   │   types   │  │   money   │  │ promotion │  │ lifecycle │  │   │
//! │  │   │  Order    │  │   Money   │  │ evaluate  │  │ Pending → │  │   │
//! │  │   │ Inventory │  │ Discount  │  │ discount  │  │ Paid/Canc │  │   │
//! │  │   └───────────┘  └───────────┘  └───────────┘  └───────────┘  │   │
//! │  │                                                                 │   │
//! │  │   NO I/O • NO DATABASE • NO NETWORK • PURE FUNCTIONS           │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │                  retail-db (Database Layer)                     │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`types`] - Domain types (Product, Inventory, Promotion, Order, ...)
//! - [`money`] - Money type with integer arithmetic (no floating point!)
//! - [`promotion`] - Promo code evaluation and discount computation
//! - [`lifecycle`] - Order status transition table
//! - [`error`] - Domain error types
//! - [`validation`] - Input validation
//!
//! ## Example Usage
//!
//! ```rust
//! use retail_core::money::Money;
//! use retail_core::types::Discount;
//!
//! let total = Money::from_cents(150_000);
//! let discount = Discount::Percent { bps: 1000 }.amount_off(total);
//! assert_eq!(discount.cents(), 15_000);
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod lifecycle;
pub mod money;
pub mod promotion;
pub mod types;
pub mod validation;

// =============================================================================
// Re-exports for Convenience
// =============================================================================

pub use error::{CoreError, PromotionRejection, ValidationError};
pub use lifecycle::OrderTransition;
pub use money::Money;
pub use types::*;

// =============================================================================
// Crate-Level Constants
// =============================================================================

/// Maximum number of distinct lines allowed in a single order.
///
/// ## Business Reason
/// Keeps a single fulfillment transaction (and its compensation path)
/// bounded.
pub const MAX_ORDER_LINES: usize = 100;

/// Maximum quantity of a single product in one order.
pub const MAX_ITEM_QUANTITY: i64 = 999;

/// Upper guard for an inventory row. Releases that would push stock past
/// this value are rejected as corrupt input.
pub const MAX_STOCK_QUANTITY: i64 = 1_000_000_000;

/// Highest catalog price in minor units. With the line and quantity
/// bounds this keeps every order total well inside `i64`.
pub const MAX_PRICE_CENTS: i64 = 10_000_000_000;

/// Maximum promo code length.
pub const MAX_PROMO_CODE_LEN: usize = 50;

/// Default threshold for low stock alerts.
pub const DEFAULT_LOW_STOCK_THRESHOLD: i64 = 10;
