//! # billbook-db: Database Layer for Billbook
//!
//! Tenant-scoped storage for clients, invoices, courses, settings and the
//! invoice number sequence, plus backup export and import. SQLite through
//! sqlx; all business rules come from `billbook-core`.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Billbook Data Flow                               │
//! │                                                                         │
//! │  CLI command (billbook import backup.json)                             │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                    billbook-db (THIS CRATE)                     │   │
//! │  │                                                                 │   │
//! │  │   ┌───────────────┐    ┌────────────────┐   ┌──────────────┐  │   │
//! │  │   │   Database    │    │  Repositories  │   │  Migrations  │  │   │
//! │  │   │   (pool.rs)   │    │ (per tenant)   │   │  (embedded)  │  │   │
//! │  │   │               │    │                │   │              │  │   │
//! │  │   │ SqlitePool    │    │ ClientRepo     │   │ 001_initial_ │  │   │
//! │  │   │ Clock         │◄───│ InvoiceRepo    │   │   schema.sql │  │   │
//! │  │   │               │    │ BackupService  │   │              │  │   │
//! │  │   └───────────────┘    └────────────────┘   └──────────────┘  │   │
//! │  │                                                                 │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                     SQLite Database                             │   │
//! │  │   ./billbook.db (or BILLBOOK_DATABASE_PATH)                    │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Module Organization
//!
//! - [`pool`] - Connection pool creation and configuration
//! - [`migrations`] - Embedded database migrations
//! - [`error`] - Database error types
//! - [`repository`] - Repositories and the backup service
//!
//! ## Usage
//!
//! ```rust,ignore
//! use billbook_core::TenantId;
//! use billbook_db::{Database, DbConfig};
//!
//! let db = Database::new(DbConfig::new("billbook.db")).await?;
//! let tenant = TenantId::new("user-1")?;
//!
//! let overdue = db.invoices(&tenant).overdue().await?;
//! let backup = db.backup(&tenant).export().await?;
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod migrations;
pub mod pool;
pub mod repository;

// =============================================================================
// Re-exports
// =============================================================================

pub use error::{DbError, DbResult};
pub use pool::{Database, DbConfig};

// Repository re-exports for convenience
pub use repository::{
    BackupService, ClientRepository, CourseRepository, ImportStats, InvoiceRepository, SequenceRepository,
    SettingsRepository, StatusUpdate,
};
