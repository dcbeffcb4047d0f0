//! # Schema Migrations
//!
//! The Billbook schema ships inside the binary and is brought up to date
//! every time a [`Database`](crate::Database) opens.
//!
//! ## Schema
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Billbook tables                                  │
//! │                                                                         │
//! │  clients ◄──── invoices ◄──── invoice_items                             │
//! │     │             │                                                     │
//! │     └─────────────┴──── user_id on every row (owning tenant)            │
//! │                                                                         │
//! │  courses            (user_id, name) unique, case-insensitive            │
//! │  user_settings      one JSON document per user_id                       │
//! │  invoice_sequences  (user_id, year) → last issued number                │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Repositories filter on `user_id` themselves; the schema only makes sure
//! the column is there. [`missing_tenant_columns`] checks that for every
//! table the repositories scope.
//!
//! ## Changing the schema
//! Add `migrations/sqlite/NNN_what_changed.sql`. Applied files are
//! checksummed by sqlx, so an edited one refuses to start.

use sqlx::SqlitePool;
use tracing::{info, warn};

use crate::error::DbResult;

/// Tables whose rows belong to exactly one tenant.
pub const TENANT_TABLES: &[&str] = &[
    "clients",
    "invoices",
    "invoice_items",
    "courses",
    "user_settings",
    "invoice_sequences",
];

static MIGRATOR: sqlx::migrate::Migrator = sqlx::migrate!("../../migrations/sqlite");

/// Applies every embedded migration the database hasn't seen yet.
pub async fn run_migrations(pool: &SqlitePool) -> DbResult<()> {
    info!(embedded = MIGRATOR.migrations.len(), "Applying schema migrations");

    MIGRATOR.run(pool).await?;

    let missing = missing_tenant_columns(pool).await?;
    if !missing.is_empty() {
        warn!(?missing, "Tables without a user_id column");
    }

    info!("Schema up to date");
    Ok(())
}

/// `(embedded, applied)` migration counts, for the health check.
pub async fn migration_status(pool: &SqlitePool) -> DbResult<(usize, usize)> {
    let total = MIGRATOR.migrations.len();

    // Before the first run the bookkeeping table doesn't exist yet
    let applied: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM _sqlx_migrations WHERE success = 1")
        .fetch_one(pool)
        .await
        .unwrap_or(0);

    Ok((total, applied as usize))
}

/// Names from [`TENANT_TABLES`] that are absent or lack a `user_id` column.
pub async fn missing_tenant_columns(pool: &SqlitePool) -> DbResult<Vec<&'static str>> {
    let mut missing = Vec::new();
    for table in TENANT_TABLES {
        let columns: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM pragma_table_info(?1) WHERE name = 'user_id'")
            .bind(table)
            .fetch_one(pool)
            .await?;
        if columns == 0 {
            missing.push(*table);
        }
    }
    Ok(missing)
}
