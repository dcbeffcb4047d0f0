//! # Repository Module
//!
//! Tenant-scoped database repositories for Billbook.
//!
//! ## Repository Pattern
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Repository Pattern                                   │
//! │                                                                         │
//! │  CLI command                                                           │
//! │       │                                                                 │
//! │       │  db.invoices(&tenant).mark_paid(id, method)                    │
//! │       ▼                                                                 │
//! │  InvoiceRepository { pool, tenant, clock }                             │
//! │  ├── loads the row (WHERE id = ? AND user_id = ?)                      │
//! │  ├── applies billbook-core rules (payment::mark_as_paid)               │
//! │  └── writes the result back                                            │
//! │       │                                                                 │
//! │       │  SQL Query                                                      │
//! │       ▼                                                                 │
//! │  SQLite Database                                                       │
//! │                                                                         │
//! │  The tenant is fixed when the repository is created, so every         │
//! │  statement it issues is scoped by user_id.                             │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Available Repositories
//!
//! - [`ClientRepository`] - Client CRUD, search and invoice counts
//! - [`InvoiceRepository`] - Invoice CRUD and payment status operations
//! - [`CourseRepository`] - Course name autocomplete
//! - [`SettingsRepository`] - Per-tenant settings document
//! - [`SequenceRepository`] - Durable invoice number counter
//! - [`BackupService`] - Backup export and transactional import

pub mod backup;
pub mod client;
pub mod course;
pub mod invoice;
pub mod sequence;
pub mod settings;

pub use backup::{BackupService, ImportStats};
pub use client::ClientRepository;
pub use course::CourseRepository;
pub use invoice::{InvoiceRepository, StatusUpdate};
pub use sequence::SequenceRepository;
pub use settings::SettingsRepository;

use sqlx::SqliteConnection;

use crate::error::DbResult;

/// The tenant that owns row `id` of `table`, if the id exists at all.
///
/// Ids are global primary keys, so an id taken by another tenant must be
/// detected before a skip-on-conflict insert silently keeps their row.
pub(crate) async fn owner_of(conn: &mut SqliteConnection, table: &'static str, id: &str) -> DbResult<Option<String>> {
    let sql = format!("SELECT user_id FROM {table} WHERE id = ?1");
    let owner = sqlx::query_scalar::<_, String>(&sql)
        .bind(id)
        .fetch_optional(&mut *conn)
        .await?;

    Ok(owner)
}

#[cfg(test)]
pub(crate) mod test_support {
    use billbook_core::{FixedClock, Money, NewClient, NewInvoiceItem, PaymentTerms, TenantId};
    use chrono::{DateTime, NaiveDate, TimeZone, Utc};

    use crate::pool::{Database, DbConfig};

    /// 2025-01-15 00:00 UTC, the instant every storage test runs at.
    pub fn test_now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 1, 15, 0, 0, 0).unwrap()
    }

    pub async fn test_db() -> Database {
        Database::new(DbConfig::in_memory())
            .await
            .unwrap()
            .with_clock(FixedClock(test_now()))
    }

    pub fn tenant(id: &str) -> TenantId {
        TenantId::new(id).unwrap()
    }

    pub fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    pub fn new_client(name: &str) -> NewClient {
        NewClient {
            name: name.to_string(),
            email: format!("{}@example.com", name.to_lowercase().replace(' ', ".")),
            phone: None,
            address: "1 Main St".to_string(),
            city: "Springfield".to_string(),
            state: "IL".to_string(),
            zip_code: "62701".to_string(),
            tax_id: None,
            default_unit_price: None,
            billing_address: None,
            requires_course_info: false,
        }
    }

    pub fn consulting(hours: f64) -> NewInvoiceItem {
        NewInvoiceItem::new("Consulting", hours, Money::from_cents(10000))
    }

    pub fn net(days: u32) -> PaymentTerms {
        PaymentTerms::custom(days, None)
    }
}
