//! # retail-orders: Order Fulfillment Transaction
//!
//! Creates orders all-or-nothing and moves them through their lifecycle.
//!
//! ## Architecture
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                           retail-orders                                 │
//! │                                                                         │
//! │  ┌───────────────────────────────────────────────────────────────────┐  │
//! │  │  OrderService        create / pay / cancel / get / record_payment │  │
//! │  │  → Result<_, ApiError>                                            │  │
//! │  └──────────────┬───────────────────────────────┬────────────────────┘  │
//! │                 ▼                               ▼                       │
//! │  ┌──────────────────────────┐     ┌──────────────────────────┐          │
//! │  │  OrderBuilder            │     │  OrderLifecycle          │          │
//! │  │  price → reserve → promo │     │  claim status → release  │          │
//! │  │  → persist, or undo      │     │  stock and promo         │          │
//! │  └────────────┬─────────────┘     └────────────┬─────────────┘          │
//! │               ▼                                ▼                        │
//! │  ┌───────────────────────────────────────────────────────────────────┐  │
//! │  │  ports: CatalogReader  CustomerDirectory  InventoryLedger         │  │
//! │  │         PromotionLedger  OrderStore  PaymentRecorder              │  │
//! │  └──────────────────────────────┬────────────────────────────────────┘  │
//! │                                 ▼                                       │
//! │                    sqlite adapters → retail-db                          │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Guarantees
//! - Stock never goes negative; concurrent orders can't oversell
//! - A promotion is never used past its limit
//! - A failed build leaves stock and promotion counters as they were, or
//!   reports exactly what it could not undo
//! - `Paid` and `Canceled` are final

pub mod api;
pub mod builder;
pub mod config;
pub mod error;
pub mod lifecycle;
pub mod ports;
pub mod service;
pub mod sqlite;
pub mod telemetry;

pub use api::{ApiError, ErrorCode};
pub use builder::OrderBuilder;
pub use config::{ConfigError, ServiceConfig};
pub use error::{CompensationStage, FulfillmentResult, OrderError, StuckEffect};
pub use lifecycle::OrderLifecycle;
pub use ports::Collaborators;
pub use service::{OrderResult, OrderService, PaymentRequest};
pub use telemetry::init_tracing;
