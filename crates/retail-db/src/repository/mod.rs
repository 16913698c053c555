//! # Repository Module
//!
//! Database repository implementations for order fulfillment.
//!
//! ## Counter Discipline
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  Shared counters are changed with ONE conditional statement each:      │
//! │                                                                         │
//! │  ❌ WRONG: read, check in Rust, write back                             │
//! │     SELECT quantity ...; if q >= n { UPDATE ... SET quantity = q - n } │
//! │     (two concurrent orders both see q = 5 and both take 3)             │
//! │                                                                         │
//! │  ✅ CORRECT: guard inside the UPDATE                                   │
//! │     UPDATE inventory SET quantity = quantity - ?n                      │
//! │     WHERE product_id = ?id AND quantity >= ?n                          │
//! │     RETURNING quantity                                                 │
//! │                                                                         │
//! │  Zero rows back means the guard refused (or the row is missing);       │
//! │  the repository re-reads only to report which.                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Available Repositories
//!
//! - [`product::ProductRepository`] - Catalog reads, price resolution
//! - [`customer::CustomerRepository`] - Customer lookup
//! - [`inventory::InventoryRepository`] - Stock ledger with history
//! - [`promotion::PromotionRepository`] - Promo codes and usage counter
//! - [`order::OrderRepository`] - Orders, items, status transitions
//! - [`payment::PaymentRepository`] - Payment records

pub mod customer;
pub mod inventory;
pub mod order;
pub mod payment;
pub mod product;
pub mod promotion;
