//! # Domain Types
//!
//! Core domain types of the order fulfillment transaction.
//!
//! ## Type Map
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Domain Types                                    │
//! │                                                                         │
//! │  ┌─────────────────┐   ┌─────────────────┐   ┌─────────────────┐       │
//! │  │    Product      │   │   Inventory     │   │   Promotion     │       │
//! │  │  ─────────────  │   │  ─────────────  │   │  ─────────────  │       │
//! │  │  id (UUID)      │◄──│  product_id     │   │  code (unique)  │       │
//! │  │  barcode        │   │  quantity ≥ 0   │   │  discount       │       │
//! │  │  price_cents    │   │  + history rows │   │  used / limit   │       │
//! │  └─────────────────┘   └─────────────────┘   └─────────────────┘       │
//! │          ▲                                            ▲                 │
//! │          │ product_id                        promo_id │                 │
//! │  ┌───────┴─────────┐   ┌─────────────────┐   ┌───────┴─────────┐       │
//! │  │   OrderItem     │──►│     Order       │◄──│    Payment      │       │
//! │  │  price snapshot │   │  status         │   │  order_id       │       │
//! │  │  subtotal       │   │  total/discount │   │  method, amount │       │
//! │  └─────────────────┘   └─────────────────┘   └─────────────────┘       │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## References by ID
//! Entities never embed each other. Every relation is an opaque UUID string
//! resolved through an explicit lookup, so there are no back-pointers and no
//! ownership ambiguity between orders, customers and promotions.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use ts_rs::TS;

use crate::money::Money;

// =============================================================================
// Product & Catalog
// =============================================================================

/// A product in the catalog.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct Product {
    /// Unique identifier (UUID v4).
    pub id: String,

    /// Display name.
    pub name: String,

    /// Barcode (EAN-13, UPC-A, etc.). Unique when present.
    pub barcode: Option<String>,

    /// Current unit price in minor units.
    pub price_cents: i64,

    /// Category reference (owned by catalog CRUD, opaque here).
    pub category_id: Option<String>,

    /// Supplier reference (owned by catalog CRUD, opaque here).
    pub supplier_id: Option<String>,

    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,

    #[ts(as = "String")]
    pub updated_at: DateTime<Utc>,

    /// Soft delete marker.
    #[ts(as = "Option<String>")]
    pub deleted_at: Option<DateTime<Utc>>,
}

impl Product {
    /// Returns the price as a Money type.
    #[inline]
    pub fn price(&self) -> Money {
        Money::from_cents(self.price_cents)
    }

    #[inline]
    pub fn is_deleted(&self) -> bool {
        self.deleted_at.is_some()
    }
}

/// What the catalog reader hands to the order builder: identity and the
/// price to snapshot into the order line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct CatalogEntry {
    pub product_id: String,
    pub name: String,
    pub price_cents: i64,
}

impl CatalogEntry {
    #[inline]
    pub fn price(&self) -> Money {
        Money::from_cents(self.price_cents)
    }
}

// =============================================================================
// Customer
// =============================================================================

/// A customer an order is placed for. Lookup only in this core.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct Customer {
    pub id: String,
    pub name: String,
    pub phone: Option<String>,
    pub email: Option<String>,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
    #[ts(as = "Option<String>")]
    pub deleted_at: Option<DateTime<Utc>>,
}

// =============================================================================
// Inventory
// =============================================================================

/// On-hand stock for one product (1:1 with Product).
///
/// `quantity` is only ever changed through the ledger's conditional
/// updates, never written as an absolute value.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct Inventory {
    pub product_id: String,
    pub quantity: i64,
    #[ts(as = "String")]
    pub updated_at: DateTime<Utc>,
    #[ts(as = "Option<String>")]
    pub deleted_at: Option<DateTime<Utc>>,
}

/// Append-only audit record of a stock change.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct InventoryHistory {
    pub id: String,
    pub product_id: String,
    /// Signed change: negative for reservations, positive for releases.
    pub quantity_change: i64,
    /// Stock level right after the change.
    pub quantity_after: i64,
    pub reason: String,
    /// Staff member who caused the change.
    pub user_id: String,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
}

/// A product whose stock is under the alert threshold.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct LowStockAlert {
    pub product_id: String,
    pub product_name: String,
    pub barcode: Option<String>,
    pub quantity: i64,
}

// =============================================================================
// Promotion
// =============================================================================

/// How a promotion's `discount_value` is interpreted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "lowercase"))]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum DiscountType {
    /// `discount_value` is basis points of the order amount.
    Percent,
    /// `discount_value` is a flat amount in minor units.
    Fixed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "lowercase"))]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum PromotionStatus {
    Active,
    Inactive,
}

/// A promo code row.
///
/// `used_count` is mutated only by the promotion ledger's redeem/release
/// operations and satisfies `used_count <= usage_limit` whenever
/// `usage_limit > 0` (0 means unlimited).
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct Promotion {
    pub id: String,
    pub code: String,
    pub description: Option<String>,
    pub discount_type: DiscountType,
    /// Basis points for `Percent`, minor units for `Fixed`.
    pub discount_value: i64,
    /// First valid day (inclusive).
    #[ts(as = "String")]
    pub start_date: NaiveDate,
    /// Last valid day (inclusive).
    #[ts(as = "String")]
    pub end_date: NaiveDate,
    pub min_order_cents: i64,
    /// 0 = unlimited.
    pub usage_limit: i64,
    pub used_count: i64,
    pub status: PromotionStatus,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
    #[ts(as = "String")]
    pub updated_at: DateTime<Utc>,
    #[ts(as = "Option<String>")]
    pub deleted_at: Option<DateTime<Utc>>,
}

impl Promotion {
    /// Returns the typed discount rule.
    pub fn discount(&self) -> Discount {
        match self.discount_type {
            DiscountType::Percent => Discount::Percent {
                bps: self.discount_value.clamp(0, 10_000) as u32,
            },
            DiscountType::Fixed => Discount::Fixed(Money::from_cents(self.discount_value.max(0))),
        }
    }

    #[inline]
    pub fn min_order_amount(&self) -> Money {
        Money::from_cents(self.min_order_cents)
    }

    #[inline]
    pub fn is_unlimited(&self) -> bool {
        self.usage_limit == 0
    }

    /// Whether another redemption fits under the usage limit.
    #[inline]
    pub fn has_remaining_uses(&self) -> bool {
        self.is_unlimited() || self.used_count < self.usage_limit
    }
}

/// A discount rule, already decoded from the promotion row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum Discount {
    /// Percentage of the order amount in basis points (1000 = 10%).
    Percent { bps: u32 },
    /// Flat amount off, capped at the order amount.
    Fixed(Money),
}

impl Discount {
    /// Amount taken off `order_amount`. Never exceeds `order_amount`, so
    /// the final amount of an order can never go negative.
    pub fn amount_off(&self, order_amount: Money) -> Money {
        if !order_amount.is_positive() {
            return Money::zero();
        }
        match *self {
            Discount::Percent { bps } => order_amount.percentage(bps.min(10_000)),
            Discount::Fixed(value) => value.max(Money::zero()).min(order_amount),
        }
    }
}

// =============================================================================
// Order Status
// =============================================================================

/// The status of an order.
///
/// Closed set; allowed moves live in [`crate::lifecycle`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "lowercase"))]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum OrderStatus {
    /// Created, stock reserved, awaiting payment or cancellation.
    Pending,
    /// Terminal: paid.
    Paid,
    /// Terminal: canceled, reservations released.
    Canceled,
}

impl OrderStatus {
    pub const fn as_str(&self) -> &'static str {
        match self {
            OrderStatus::Pending => "pending",
            OrderStatus::Paid => "paid",
            OrderStatus::Canceled => "canceled",
        }
    }

    /// Terminal states accept no further transition.
    pub const fn is_terminal(&self) -> bool {
        matches!(self, OrderStatus::Paid | OrderStatus::Canceled)
    }
}

impl Default for OrderStatus {
    fn default() -> Self {
        OrderStatus::Pending
    }
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// =============================================================================
// Order
// =============================================================================

/// An order header.
///
/// `total_cents` is Σ of the item subtotals, fixed at creation time.
/// The amount due is derived by [`Order::final_amount`] and never stored.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct Order {
    pub id: String,
    pub customer_id: String,
    /// Staff member who entered the order.
    pub user_id: String,
    pub promo_id: Option<String>,
    #[ts(as = "String")]
    pub order_date: DateTime<Utc>,
    pub status: OrderStatus,
    /// Sum of line subtotals before discount.
    pub total_cents: i64,
    pub discount_cents: i64,
    #[ts(as = "String")]
    pub updated_at: DateTime<Utc>,
    #[ts(as = "Option<String>")]
    pub deleted_at: Option<DateTime<Utc>>,
}

impl Order {
    #[inline]
    pub fn total(&self) -> Money {
        Money::from_cents(self.total_cents)
    }

    #[inline]
    pub fn discount(&self) -> Money {
        Money::from_cents(self.discount_cents)
    }

    /// Amount due: `total − discount`.
    #[inline]
    pub fn final_amount(&self) -> Money {
        self.total() - self.discount()
    }
}

/// A line of an order. Immutable once created.
///
/// Uses the snapshot pattern: `price_cents` is the catalog price at the
/// moment the order was built and is never re-read.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct OrderItem {
    pub id: String,
    pub order_id: String,
    pub product_id: String,
    pub quantity: i64,
    /// Unit price at time of order (frozen).
    pub price_cents: i64,
    /// `price_cents × quantity`.
    pub subtotal_cents: i64,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
}

impl OrderItem {
    #[inline]
    pub fn subtotal(&self) -> Money {
        Money::from_cents(self.subtotal_cents)
    }
}

// =============================================================================
// Payment
// =============================================================================

#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "snake_case"))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum PaymentMethod {
    Cash,
    Card,
    BankTransfer,
    EWallet,
}

impl Default for PaymentMethod {
    fn default() -> Self {
        PaymentMethod::Cash
    }
}

impl std::str::FromStr for PaymentMethod {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "cash" => Ok(PaymentMethod::Cash),
            "card" | "credit" | "debit" => Ok(PaymentMethod::Card),
            "bank_transfer" | "transfer" => Ok(PaymentMethod::BankTransfer),
            "e_wallet" | "ewallet" | "wallet" => Ok(PaymentMethod::EWallet),
            other => Err(format!("unknown payment method '{}'", other)),
        }
    }
}

/// A payment recorded against an order. Recording is not processing.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct Payment {
    pub id: String,
    pub order_id: String,
    pub amount_cents: i64,
    pub method: PaymentMethod,
    #[ts(as = "String")]
    pub payment_date: DateTime<Utc>,
}

impl Payment {
    #[inline]
    pub fn amount(&self) -> Money {
        Money::from_cents(self.amount_cents)
    }
}

// =============================================================================
// Order Requests
// =============================================================================

/// One requested line: a product and how many.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct OrderLineRequest {
    pub product_id: String,
    pub quantity: i64,
}

impl OrderLineRequest {
    pub fn new(product_id: impl Into<String>, quantity: i64) -> Self {
        OrderLineRequest {
            product_id: product_id.into(),
            quantity,
        }
    }
}

/// Input of the order fulfillment transaction.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct CreateOrderRequest {
    pub customer_id: String,
    /// Staff member entering the order.
    pub user_id: String,
    pub items: Vec<OrderLineRequest>,
    #[serde(default)]
    pub promo_code: Option<String>,
}

// =============================================================================
// Unit Tests
// =============================================================================
