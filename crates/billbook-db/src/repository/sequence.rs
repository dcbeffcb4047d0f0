//! # Invoice Number Sequences
//!
//! The durable, per-tenant, per-year counter behind `INV-YYYY-NNNN`.
//!
//! ## Why a Table
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  invoice_sequences                                                      │
//! │  ┌──────────┬──────┬────────────┐                                      │
//! │  │ user_id  │ year │ last_value │   PRIMARY KEY (user_id, year)        │
//! │  ├──────────┼──────┼────────────┤                                      │
//! │  │ user-1   │ 2024 │        118 │                                      │
//! │  │ user-1   │ 2025 │          7 │ ← next number is INV-2025-0008       │
//! │  │ user-2   │ 2025 │          3 │                                      │
//! │  └──────────┴──────┴────────────┘                                      │
//! │                                                                         │
//! │  Issue = one UPSERT ... RETURNING:                                     │
//! │    INSERT (tenant, year, 1)                                            │
//! │    ON CONFLICT DO UPDATE SET last_value = last_value + 1               │
//! │    RETURNING last_value                                                │
//! │                                                                         │
//! │  SQLite serializes writers, so two concurrent callers can never        │
//! │  read the same last_value. A new year starts a new row at 1.           │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use billbook_core::{Clock, InvoiceNumber, TenantId};
use chrono::Datelike;
use sqlx::{SqliteConnection, SqlitePool};
use std::sync::Arc;
use tracing::{debug, info};

use crate::error::{DbError, DbResult};

fn to_sequence(value: i64) -> DbResult<u32> {
    u32::try_from(value).map_err(|_| DbError::Internal(format!("invoice sequence out of range: {value}")))
}

/// Atomically issues the next sequence value for `(tenant, year)`.
///
/// Runs on whatever connection or transaction the caller holds, so an
/// invoice insert and its number share one atomic unit.
pub(crate) async fn next_value(conn: &mut SqliteConnection, tenant: &TenantId, year: i32) -> DbResult<u32> {
    let value: i64 = sqlx::query_scalar(
        "INSERT INTO invoice_sequences (user_id, year, last_value) VALUES (?1, ?2, 1)
         ON CONFLICT(user_id, year) DO UPDATE SET last_value = last_value + 1
         RETURNING last_value",
    )
    .bind(tenant.as_str())
    .bind(year)
    .fetch_one(&mut *conn)
    .await?;

    to_sequence(value)
}

/// Raises the counter so `number` is never issued again. Never lowers it.
pub(crate) async fn observe_number(
    conn: &mut SqliteConnection,
    tenant: &TenantId,
    number: InvoiceNumber,
) -> DbResult<()> {
    sqlx::query(
        "INSERT INTO invoice_sequences (user_id, year, last_value) VALUES (?1, ?2, ?3)
         ON CONFLICT(user_id, year) DO UPDATE SET last_value = MAX(last_value, excluded.last_value)",
    )
    .bind(tenant.as_str())
    .bind(number.year)
    .bind(i64::from(number.sequence))
    .execute(&mut *conn)
    .await?;

    Ok(())
}

/// Repository for the invoice number counter, bound to one tenant.
///
/// ## Usage
/// ```rust,ignore
/// let seq = db.sequences(&tenant);
/// let preview = seq.preview_next().await?;   // INV-2025-0008, nothing consumed
/// let issued = seq.next_number().await?;     // INV-2025-0008
/// ```
#[derive(Clone)]
pub struct SequenceRepository {
    pool: SqlitePool,
    tenant: TenantId,
    clock: Arc<dyn Clock>,
}

impl SequenceRepository {
    pub fn new(pool: SqlitePool, tenant: TenantId, clock: Arc<dyn Clock>) -> Self {
        SequenceRepository { pool, tenant, clock }
    }

    fn current_year(&self) -> i32 {
        self.clock.now().year()
    }

    async fn last_value(&self, year: i32) -> DbResult<u32> {
        let value: Option<i64> =
            sqlx::query_scalar("SELECT last_value FROM invoice_sequences WHERE user_id = ?1 AND year = ?2")
                .bind(self.tenant.as_str())
                .bind(year)
                .fetch_optional(&self.pool)
                .await?;

        to_sequence(value.unwrap_or(0))
    }

    /// Issues the next number for the current year.
    pub async fn next_number(&self) -> DbResult<InvoiceNumber> {
        let year = self.current_year();
        let mut conn = self.pool.acquire().await?;
        let sequence = next_value(&mut conn, &self.tenant, year).await?;

        let number = InvoiceNumber { year, sequence };
        debug!(tenant = %self.tenant, number = %number, "Issued invoice number");
        Ok(number)
    }

    /// The number [`next_number`](Self::next_number) would return, without consuming it.
    pub async fn preview_next(&self) -> DbResult<InvoiceNumber> {
        let year = self.current_year();
        let last = self.last_value(year).await?;
        Ok(InvoiceNumber {
            year,
            sequence: last.saturating_add(1),
        })
    }

    /// Last issued sequence value in the current year (0 when none).
    pub async fn current_sequence(&self) -> DbResult<u32> {
        self.last_value(self.current_year()).await
    }

    /// Makes `next` the sequence of the next number issued in `year`.
    ///
    /// Unlike [`observe`](Self::observe) this may move the counter backwards;
    /// it is an administrative override.
    pub async fn set_sequence(&self, year: i32, next: u32) -> DbResult<()> {
        let last = i64::from(next.saturating_sub(1));

        sqlx::query(
            "INSERT INTO invoice_sequences (user_id, year, last_value) VALUES (?1, ?2, ?3)
             ON CONFLICT(user_id, year) DO UPDATE SET last_value = excluded.last_value",
        )
        .bind(self.tenant.as_str())
        .bind(year)
        .bind(last)
        .execute(&self.pool)
        .await?;

        info!(tenant = %self.tenant, year, next, "Invoice sequence set");
        Ok(())
    }

    /// Accounts for a number issued elsewhere (e.g. restored from a backup).
    pub async fn observe(&self, number: InvoiceNumber) -> DbResult<()> {
        let mut conn = self.pool.acquire().await?;
        observe_number(&mut conn, &self.tenant, number).await
    }

    /// Forgets every year; the next number is `...-0001`.
    pub async fn reset(&self) -> DbResult<()> {
        sqlx::query("DELETE FROM invoice_sequences WHERE user_id = ?1")
            .bind(self.tenant.as_str())
            .execute(&self.pool)
            .await?;

        info!(tenant = %self.tenant, "Invoice sequence reset");
        Ok(())
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repository::test_support::{tenant, test_db, test_now};
    use billbook_core::FixedClock;
    use chrono::{TimeZone, Utc};
    use std::collections::HashSet;

    #[tokio::test]
    async fn test_sequential_numbers() {
        let db = test_db().await;
        let seq = db.sequences(&tenant("user-1"));

        assert_eq!(seq.preview_next().await.unwrap().to_string(), "INV-2025-0001");
        assert_eq!(seq.next_number().await.unwrap().to_string(), "INV-2025-0001");
        assert_eq!(seq.next_number().await.unwrap().to_string(), "INV-2025-0002");
        assert_eq!(seq.preview_next().await.unwrap().to_string(), "INV-2025-0003");
        assert_eq!(seq.current_sequence().await.unwrap(), 2);
    }

    #[tokio::test]
    async fn test_tenants_have_independent_counters() {
        let db = test_db().await;
        db.sequences(&tenant("user-1")).next_number().await.unwrap();
        db.sequences(&tenant("user-1")).next_number().await.unwrap();

        let other = db.sequences(&tenant("user-2")).next_number().await.unwrap();
        assert_eq!(other.sequence, 1);
    }

    #[tokio::test]
    async fn test_year_rollover_restarts_at_one() {
        let db = test_db().await;
        let t = tenant("user-1");
        db.sequences(&t).next_number().await.unwrap();
        db.sequences(&t).next_number().await.unwrap();

        let next_year = db.clone().with_clock(FixedClock(Utc.with_ymd_and_hms(2026, 1, 1, 0, 0, 0).unwrap()));
        assert_eq!(next_year.sequences(&t).next_number().await.unwrap().to_string(), "INV-2026-0001");
    }

    #[tokio::test]
    async fn test_concurrent_issue_is_unique() {
        let db = test_db().await;
        let seq = db.sequences(&tenant("user-1"));

        let handles: Vec<_> = (0..20)
            .map(|_| {
                let seq = seq.clone();
                tokio::spawn(async move { seq.next_number().await.unwrap() })
            })
            .collect();

        let mut seen = HashSet::new();
        for handle in handles {
            let number = handle.await.unwrap();
            assert!(seen.insert(number.to_string()), "duplicate {number}");
        }
        assert_eq!(seen.len(), 20);
        assert_eq!(seq.current_sequence().await.unwrap(), 20);
    }

    #[tokio::test]
    async fn test_observe_never_lowers() {
        let db = test_db().await;
        let seq = db.sequences(&tenant("user-1"));

        seq.observe(InvoiceNumber { year: 2025, sequence: 41 }).await.unwrap();
        seq.observe(InvoiceNumber { year: 2025, sequence: 3 }).await.unwrap();

        assert_eq!(seq.next_number().await.unwrap().sequence, 42);
    }

    #[tokio::test]
    async fn test_set_and_reset() {
        let db = test_db().await;
        let seq = db.sequences(&tenant("user-1"));
        let year = test_now().year();

        seq.set_sequence(year, 100).await.unwrap();
        assert_eq!(seq.next_number().await.unwrap().sequence, 100);

        seq.reset().await.unwrap();
        assert_eq!(seq.current_sequence().await.unwrap(), 0);
        assert_eq!(seq.next_number().await.unwrap().sequence, 1);
    }
}
