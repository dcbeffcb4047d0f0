//! # billbook-core: Pure Business Logic for Billbook
//!
//! This crate is the **heart** of Billbook, a small-business invoicing
//! system. It contains the invoice lifecycle rules as pure functions with
//! zero I/O dependencies.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Billbook Architecture                            │
//! │                                                                         │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                    apps/cli (`billbook`)                        │   │
//! │  │    export ──► import ──► overdue ──► mark-paid ──► dashboard   │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │               ★ billbook-core (THIS CRATE) ★                    │   │
//! │  │                                                                 │   │
//! │  │   ┌───────────┐  ┌───────────┐  ┌───────────┐  ┌───────────┐  │   │
//! │  │   │  payment  │  │ numbering │  │  backup   │  │ analytics │  │   │
//! │  │   │  overdue  │  │ INV-YYYY- │  │ validate  │  │ dashboard │  │   │
//! │  │   │  paid     │  │   NNNN    │  │ export    │  │  numbers  │  │   │
//! │  │   └───────────┘  └───────────┘  └───────────┘  └───────────┘  │   │
//! │  │                                                                 │   │
//! │  │   NO I/O • NO DATABASE • NO SYSTEM CLOCK • PURE FUNCTIONS      │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │                  billbook-db (Database Layer)                   │   │
//! │  │     SQLite queries, migrations, repositories, backup import     │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`types`] - Domain types (Client, Invoice, PaymentTerms, etc.)
//! - [`money`] - Money type with integer arithmetic
//! - [`payment`] - Payment status engine (overdue, due soon, paid/unpaid)
//! - [`numbering`] - `INV-YYYY-NNNN` invoice numbers
//! - [`backup`] - Backup document export and validation
//! - [`analytics`] - Dashboard figures
//! - [`settings`] - Per-tenant settings document
//! - [`validation`] - Input validation rules
//! - [`clock`] / [`identity`] - Seams for time and caller identity
//! - [`error`] - Domain error types
//!
//! ## Example Usage
//!
//! ```rust
//! use billbook_core::payment::{days_overdue, is_overdue, urgency_level};
//! use billbook_core::types::{InvoiceStatus, Urgency};
//! # use billbook_core::types::{Invoice, TenantId};
//! # use billbook_core::money::Money;
//! use chrono::{NaiveDate, TimeZone, Utc};
//!
//! # let day = NaiveDate::from_ymd_opt(2025, 1, 1).unwrap();
//! # let t0 = Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap();
//! # let invoice = Invoice {
//! #     id: "i1".into(), tenant_id: TenantId::new("u1").unwrap(),
//! #     number: "INV-2025-0001".into(), client_id: "c1".into(),
//! #     status: InvoiceStatus::Pending, subtotal: Money::zero(), tax: Money::zero(),
//! #     total: Money::zero(), issued_date: day,
//! #     due_date: NaiveDate::from_ymd_opt(2025, 1, 10).unwrap(),
//! #     payment_terms: None, payment_method: None, transaction_id: None,
//! #     payment_date: None, course_info: None, notes: None, items: vec![],
//! #     created_at: t0, updated_at: t0,
//! # };
//! // Pending invoice due 2025-01-10, checked on 2025-01-15
//! let now = Utc.with_ymd_and_hms(2025, 1, 15, 0, 0, 0).unwrap();
//!
//! assert!(is_overdue(&invoice, now));
//! assert_eq!(days_overdue(&invoice, now), 5);
//! assert_eq!(urgency_level(&invoice, now), Urgency::Medium);
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod analytics;
pub mod backup;
pub mod clock;
pub mod error;
pub mod identity;
pub mod money;
pub mod numbering;
pub mod payment;
pub mod settings;
pub mod types;
pub mod validation;

#[cfg(test)]
pub(crate) mod test_support;

// =============================================================================
// Re-exports for Convenience
// =============================================================================
// These allow users to do `use billbook_core::Money` instead of
// `use billbook_core::money::Money`

pub use clock::{Clock, FixedClock, SystemClock};
pub use error::{CoreError, CoreResult, ValidationError};
pub use identity::{Identity, StaticIdentity};
pub use money::Money;
pub use numbering::{InvoiceNumber, NumberSequence};
pub use settings::Settings;
pub use types::*;

// =============================================================================
// Crate-Level Constants
// =============================================================================

/// Version written into every backup document.
pub const BACKUP_VERSION: &str = "1.0.0";

/// Payment method recorded when an invoice is marked paid without one.
pub const DEFAULT_PAYMENT_METHOD: &str = "Bank Transfer";

/// Default look-ahead window for "due soon", in days.
pub const DUE_SOON_HORIZON_DAYS: u32 = 7;

/// Maximum number of rows returned by a client search.
pub const CLIENT_SEARCH_LIMIT: i64 = 50;

/// Maximum length of client and course names.
pub const MAX_NAME_LENGTH: usize = 200;
