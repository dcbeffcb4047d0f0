//! # Invoice Repository
//!
//! Tenant-scoped invoice CRUD plus the payment status operations.
//!
//! ## Stored vs Displayed Status
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                                                                         │
//! │   write path                          read path                        │
//! │   ──────────                          ─────────                        │
//! │   draft    ──► 'draft'                'draft'   ──► draft              │
//! │   pending  ──► 'pending'              'pending' ──► pending            │
//! │   overdue  ──► 'pending'                            or overdue when    │
//! │   paid     ──► 'paid'                               now > due date     │
//! │                                       'paid'    ──► paid               │
//! │                                                                         │
//! │   Overdue is never a stored fact: it is derived on every read with     │
//! │   billbook_core::payment::update_invoice_status, so no background      │
//! │   job has to sweep invoices.                                           │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Update Strategy
//! `update` rewrites the header and replaces the whole item collection
//! (delete all, then reinsert) inside one transaction.

use billbook_core::numbering::InvoiceNumber;
use billbook_core::payment::{self, refresh_statuses, update_invoice_status};
use billbook_core::validation::validate_invoice_draft;
use billbook_core::{
    Clock, CoreError, CourseInfo, Invoice, InvoiceDraft, InvoiceItem, InvoiceStatus, Money,
    OverdueInvoice, PaymentTerms, TenantId, DEFAULT_PAYMENT_METHOD,
};
use chrono::{DateTime, Datelike, NaiveDate, Utc};
use sqlx::{SqliteConnection, SqlitePool};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, info};
use uuid::Uuid;

use crate::error::{DbError, DbResult};
use crate::repository::client::fetch_client;
use crate::repository::sequence::{next_value, observe_number};

const INVOICE_COLUMNS: &str = "id, number, client_id, status, subtotal_cents, tax_cents, total_cents, \
     issued_date, due_date, payment_terms_days, payment_terms_description, payment_method, \
     transaction_id, payment_date, course_name, course_id, cohort, training_dates, notes, \
     created_at, updated_at";

const ITEM_COLUMNS: &str = "id, invoice_id, description, quantity, unit_price_cents, amount_cents";

// =============================================================================
// Row Mapping
// =============================================================================

#[derive(Debug, sqlx::FromRow)]
struct InvoiceRow {
    id: String,
    number: String,
    client_id: String,
    status: InvoiceStatus,
    subtotal_cents: i64,
    tax_cents: i64,
    total_cents: i64,
    issued_date: NaiveDate,
    due_date: NaiveDate,
    payment_terms_days: Option<i64>,
    payment_terms_description: Option<String>,
    payment_method: Option<String>,
    transaction_id: Option<String>,
    payment_date: Option<NaiveDate>,
    course_name: Option<String>,
    course_id: Option<String>,
    cohort: Option<String>,
    training_dates: Option<String>,
    notes: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl InvoiceRow {
    fn into_domain(self, tenant: &TenantId, items: Vec<InvoiceItem>) -> Invoice {
        let payment_terms = self
            .payment_terms_days
            .and_then(|days| u32::try_from(days).ok())
            .map(|days| PaymentTerms::custom(days, self.payment_terms_description.as_deref()));

        let has_course = self.course_name.is_some()
            || self.course_id.is_some()
            || self.cohort.is_some()
            || self.training_dates.is_some();
        let course_info = has_course.then(|| CourseInfo {
            course_name: self.course_name.unwrap_or_default(),
            course_id: self.course_id.unwrap_or_default(),
            cohort: self.cohort.unwrap_or_default(),
            training_dates: self.training_dates.unwrap_or_default(),
        });

        Invoice {
            id: self.id,
            tenant_id: tenant.clone(),
            number: self.number,
            client_id: self.client_id,
            status: self.status,
            subtotal: Money::from_cents(self.subtotal_cents),
            tax: Money::from_cents(self.tax_cents),
            total: Money::from_cents(self.total_cents),
            issued_date: self.issued_date,
            due_date: self.due_date,
            payment_terms,
            payment_method: self.payment_method,
            transaction_id: self.transaction_id,
            payment_date: self.payment_date,
            course_info,
            notes: self.notes,
            items,
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
    }
}

#[derive(Debug, sqlx::FromRow)]
struct ItemRow {
    id: String,
    invoice_id: String,
    description: String,
    quantity: f64,
    unit_price_cents: i64,
    amount_cents: i64,
}

impl From<ItemRow> for InvoiceItem {
    fn from(row: ItemRow) -> Self {
        InvoiceItem {
            id: row.id,
            description: row.description,
            quantity: row.quantity,
            unit_price: Money::from_cents(row.unit_price_cents),
            amount: Money::from_cents(row.amount_cents),
        }
    }
}

/// The status written to storage: overdue is kept as pending.
pub(crate) fn persisted_status(status: InvoiceStatus) -> InvoiceStatus {
    match status {
        InvoiceStatus::Overdue => InvoiceStatus::Pending,
        other => other,
    }
}

// =============================================================================
// Shared Statements
// =============================================================================

/// Inserts an invoice header (no items) for `invoice.tenant_id`.
///
/// With `skip_existing`, an id that is already taken is left untouched and
/// the call reports 0 affected rows.
pub(crate) async fn insert_invoice(
    conn: &mut SqliteConnection,
    invoice: &Invoice,
    skip_existing: bool,
) -> DbResult<u64> {
    let terms = invoice.payment_terms.as_ref();
    let course = invoice.course_info.as_ref();
    let sql = format!(
        "INSERT INTO invoices (
            id, user_id, number, client_id, status, subtotal_cents, tax_cents, total_cents,
            issued_date, due_date, payment_terms_days, payment_terms_description,
            payment_method, transaction_id, payment_date,
            course_name, course_id, cohort, training_dates, notes, created_at, updated_at
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15,
                  ?16, ?17, ?18, ?19, ?20, ?21, ?22)
        {}",
        if skip_existing { "ON CONFLICT(id) DO NOTHING" } else { "" }
    );

    let result = sqlx::query(&sql)
        .bind(&invoice.id)
        .bind(invoice.tenant_id.as_str())
        .bind(&invoice.number)
        .bind(&invoice.client_id)
        .bind(persisted_status(invoice.status))
        .bind(invoice.subtotal.cents())
        .bind(invoice.tax.cents())
        .bind(invoice.total.cents())
        .bind(invoice.issued_date)
        .bind(invoice.due_date)
        .bind(terms.map(|t| i64::from(t.days)))
        .bind(terms.map(|t| t.description.as_str()))
        .bind(&invoice.payment_method)
        .bind(&invoice.transaction_id)
        .bind(invoice.payment_date)
        .bind(course.map(|c| c.course_name.as_str()))
        .bind(course.map(|c| c.course_id.as_str()))
        .bind(course.map(|c| c.cohort.as_str()))
        .bind(course.map(|c| c.training_dates.as_str()))
        .bind(&invoice.notes)
        .bind(invoice.created_at)
        .bind(invoice.updated_at)
        .execute(&mut *conn)
        .await?;

    Ok(result.rows_affected())
}

/// Inserts one line item at `position` under `invoice_id`.
pub(crate) async fn insert_item(
    conn: &mut SqliteConnection,
    tenant: &TenantId,
    invoice_id: &str,
    position: i64,
    item: &InvoiceItem,
    skip_existing: bool,
) -> DbResult<u64> {
    let sql = format!(
        "INSERT INTO invoice_items (
            id, invoice_id, user_id, position, description, quantity, unit_price_cents, amount_cents
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
        {}",
        if skip_existing { "ON CONFLICT(id) DO NOTHING" } else { "" }
    );

    let result = sqlx::query(&sql)
        .bind(&item.id)
        .bind(invoice_id)
        .bind(tenant.as_str())
        .bind(position)
        .bind(&item.description)
        .bind(item.quantity)
        .bind(item.unit_price.cents())
        .bind(item.amount.cents())
        .execute(&mut *conn)
        .await?;

    Ok(result.rows_affected())
}

async fn insert_items(
    conn: &mut SqliteConnection,
    tenant: &TenantId,
    invoice_id: &str,
    items: &[InvoiceItem],
) -> DbResult<()> {
    for (position, item) in items.iter().enumerate() {
        insert_item(conn, tenant, invoice_id, position as i64, item, false).await?;
    }
    Ok(())
}

/// Loads one invoice with its items, exactly as stored (no status derivation).
async fn load_invoice(conn: &mut SqliteConnection, tenant: &TenantId, id: &str) -> DbResult<Option<Invoice>> {
    let sql = format!("SELECT {INVOICE_COLUMNS} FROM invoices WHERE id = ?1 AND user_id = ?2");
    let Some(row) = sqlx::query_as::<_, InvoiceRow>(&sql)
        .bind(id)
        .bind(tenant.as_str())
        .fetch_optional(&mut *conn)
        .await?
    else {
        return Ok(None);
    };

    let sql = format!(
        "SELECT {ITEM_COLUMNS} FROM invoice_items
         WHERE invoice_id = ?1 AND user_id = ?2
         ORDER BY position ASC"
    );
    let items = sqlx::query_as::<_, ItemRow>(&sql)
        .bind(id)
        .bind(tenant.as_str())
        .fetch_all(&mut *conn)
        .await?;

    Ok(Some(row.into_domain(tenant, items.into_iter().map(InvoiceItem::from).collect())))
}

/// Loads every invoice of `tenant` matching `filter` (a WHERE fragment over
/// `invoices` whose only parameter is `?2`), newest first.
async fn load_invoices(
    conn: &mut SqliteConnection,
    tenant: &TenantId,
    filter: Option<(&str, &str)>,
) -> DbResult<Vec<Invoice>> {
    let (clause, param) = match filter {
        Some((clause, param)) => (format!(" AND {clause}"), Some(param)),
        None => (String::new(), None),
    };

    let sql = format!(
        "SELECT {INVOICE_COLUMNS} FROM invoices
         WHERE user_id = ?1{clause}
         ORDER BY created_at DESC, number DESC"
    );
    let mut query = sqlx::query_as::<_, InvoiceRow>(&sql).bind(tenant.as_str());
    if let Some(param) = param {
        query = query.bind(param);
    }
    let rows = query.fetch_all(&mut *conn).await?;

    let sql = format!(
        "SELECT {ITEM_COLUMNS} FROM invoice_items
         WHERE user_id = ?1
         ORDER BY invoice_id ASC, position ASC"
    );
    let item_rows = sqlx::query_as::<_, ItemRow>(&sql)
        .bind(tenant.as_str())
        .fetch_all(&mut *conn)
        .await?;

    let mut items_by_invoice: HashMap<String, Vec<InvoiceItem>> = HashMap::new();
    for row in item_rows {
        items_by_invoice
            .entry(row.invoice_id.clone())
            .or_default()
            .push(InvoiceItem::from(row));
    }

    Ok(rows
        .into_iter()
        .map(|row| {
            let items = items_by_invoice.remove(&row.id).unwrap_or_default();
            row.into_domain(tenant, items)
        })
        .collect())
}

// =============================================================================
// Inputs
// =============================================================================

/// A targeted status + settlement patch that leaves items alone.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StatusUpdate {
    pub status: InvoiceStatus,
    pub payment_method: Option<String>,
    pub transaction_id: Option<String>,
    pub payment_date: Option<NaiveDate>,
}

impl StatusUpdate {
    fn from_invoice(invoice: &Invoice) -> Self {
        StatusUpdate {
            status: invoice.status,
            payment_method: invoice.payment_method.clone(),
            transaction_id: invoice.transaction_id.clone(),
            payment_date: invoice.payment_date,
        }
    }
}

// =============================================================================
// Repository
// =============================================================================

/// Repository for invoice database operations, bound to one tenant.
///
/// Every read returns invoices with their displayed status (overdue derived
/// from the clock).
///
/// ## Usage
/// ```rust,ignore
/// let invoices = db.invoices(&tenant);
///
/// let inv = invoices.create(draft).await?;           // INV-2025-0001
/// let paid = invoices.mark_paid(&inv.id, "Check").await?;
/// let late = invoices.overdue().await?;
/// ```
#[derive(Clone)]
pub struct InvoiceRepository {
    pool: SqlitePool,
    tenant: TenantId,
    clock: Arc<dyn Clock>,
}

impl InvoiceRepository {
    /// Creates a new InvoiceRepository.
    pub fn new(pool: SqlitePool, tenant: TenantId, clock: Arc<dyn Clock>) -> Self {
        InvoiceRepository { pool, tenant, clock }
    }

    /// Checks the client and course-info rule, then resolves the number.
    ///
    /// A blank number draws from the tenant's sequence; a manual number in
    /// `INV-YYYY-NNNN` form advances the sequence past it.
    async fn prepare(
        &self,
        conn: &mut SqliteConnection,
        draft: &InvoiceDraft,
        existing_number: Option<&str>,
        now: DateTime<Utc>,
    ) -> DbResult<String> {
        validate_invoice_draft(draft)?;

        let client = fetch_client(conn, &self.tenant, &draft.client_id)
            .await?
            .ok_or_else(|| CoreError::ClientNotFound(draft.client_id.clone()))?;

        if client.requires_course_info && draft.course_info.is_none() {
            return Err(CoreError::CourseInfoRequired {
                client_id: client.id,
            }
            .into());
        }

        let manual = draft
            .number
            .as_deref()
            .map(str::trim)
            .filter(|n| !n.is_empty())
            .or(existing_number);

        match manual {
            Some(number) => {
                if let Ok(parsed) = number.parse::<InvoiceNumber>() {
                    observe_number(conn, &self.tenant, parsed).await?;
                }
                Ok(number.to_string())
            }
            None => {
                let year = now.year();
                let sequence = next_value(conn, &self.tenant, year).await?;
                Ok(InvoiceNumber { year, sequence }.to_string())
            }
        }
    }

    /// Builds the stored invoice from a validated draft.
    fn materialize(
        &self,
        id: String,
        number: String,
        draft: InvoiceDraft,
        created_at: DateTime<Utc>,
        now: DateTime<Utc>,
    ) -> DbResult<Invoice> {
        let due_date = draft.resolve_due_date()?;

        let mut invoice = Invoice {
            id,
            tenant_id: self.tenant.clone(),
            number,
            client_id: draft.client_id,
            status: persisted_status(draft.status),
            subtotal: Money::zero(),
            tax: draft.tax,
            total: Money::zero(),
            issued_date: draft.issued_date,
            due_date,
            payment_terms: draft.payment_terms,
            payment_method: draft.payment_method,
            transaction_id: draft.transaction_id,
            payment_date: draft.payment_date,
            course_info: draft.course_info,
            notes: draft.notes,
            items: draft.items.into_iter().map(|item| item.into_item()).collect(),
            created_at,
            updated_at: now,
        };
        invoice.recompute_totals();

        // Settlement fields only exist on paid invoices.
        if invoice.status == InvoiceStatus::Paid {
            invoice = payment::mark_as_paid(&invoice, now, DEFAULT_PAYMENT_METHOD);
        } else {
            invoice.payment_method = None;
            invoice.transaction_id = None;
            invoice.payment_date = None;
        }

        Ok(invoice)
    }

    /// Creates an invoice and its items in one transaction.
    ///
    /// ## What This Does
    /// 1. Validates the draft
    /// 2. Checks the client belongs to the tenant (else `NotFound`)
    /// 3. Enforces course info for clients that require it (else `Conflict`)
    /// 4. Assigns the next `INV-YYYY-NNNN` when no number was given
    /// 5. Derives due date, subtotal and total
    pub async fn create(&self, draft: InvoiceDraft) -> DbResult<Invoice> {
        let now = self.clock.now();
        let mut tx = self.pool.begin().await?;

        let number = self.prepare(&mut tx, &draft, None, now).await?;
        let invoice = self.materialize(Uuid::new_v4().to_string(), number, draft, now, now)?;

        insert_invoice(&mut tx, &invoice, false).await?;
        insert_items(&mut tx, &self.tenant, &invoice.id, &invoice.items).await?;

        tx.commit().await?;

        info!(
            tenant = %self.tenant,
            id = %invoice.id,
            number = %invoice.number,
            total = %invoice.total,
            "Invoice created"
        );
        Ok(update_invoice_status(invoice, now))
    }

    /// Gets an invoice by id, or `None` when absent or owned by another tenant.
    pub async fn find(&self, id: &str) -> DbResult<Option<Invoice>> {
        let mut conn = self.pool.acquire().await?;
        let invoice = load_invoice(&mut conn, &self.tenant, id).await?;
        Ok(invoice.map(|inv| update_invoice_status(inv, self.clock.now())))
    }

    /// Gets an invoice by id.
    ///
    /// ## Returns
    /// * `Err(DbError::NotFound)` - Missing, or owned by another tenant
    pub async fn get(&self, id: &str) -> DbResult<Invoice> {
        self.find(id)
            .await?
            .ok_or_else(|| CoreError::InvoiceNotFound(id.to_string()).into())
    }

    /// All invoices, newest first.
    pub async fn list(&self) -> DbResult<Vec<Invoice>> {
        let mut conn = self.pool.acquire().await?;
        let invoices = load_invoices(&mut conn, &self.tenant, None).await?;

        debug!(tenant = %self.tenant, count = invoices.len(), "Listed invoices");
        Ok(refresh_statuses(invoices, self.clock.now()))
    }

    /// Invoices addressed to one client, newest first.
    pub async fn list_for_client(&self, client_id: &str) -> DbResult<Vec<Invoice>> {
        let mut conn = self.pool.acquire().await?;
        let invoices = load_invoices(&mut conn, &self.tenant, Some(("client_id = ?2", client_id))).await?;
        Ok(refresh_statuses(invoices, self.clock.now()))
    }

    /// Replaces an invoice: header fields are rewritten and the whole item
    /// collection is deleted and reinserted.
    ///
    /// The number is kept when the draft carries none. `created_at` is kept.
    pub async fn update(&self, id: &str, draft: InvoiceDraft) -> DbResult<Invoice> {
        let now = self.clock.now();
        let mut tx = self.pool.begin().await?;

        let existing = load_invoice(&mut tx, &self.tenant, id)
            .await?
            .ok_or_else(|| CoreError::InvoiceNotFound(id.to_string()))?;

        let number = self.prepare(&mut tx, &draft, Some(&existing.number), now).await?;
        let invoice = self.materialize(existing.id, number, draft, existing.created_at, now)?;

        let terms = invoice.payment_terms.as_ref();
        let course = invoice.course_info.as_ref();
        sqlx::query(
            "UPDATE invoices SET
                number = ?1, client_id = ?2, status = ?3, subtotal_cents = ?4, tax_cents = ?5,
                total_cents = ?6, issued_date = ?7, due_date = ?8, payment_terms_days = ?9,
                payment_terms_description = ?10, payment_method = ?11, transaction_id = ?12,
                payment_date = ?13, course_name = ?14, course_id = ?15, cohort = ?16,
                training_dates = ?17, notes = ?18, updated_at = ?19
             WHERE id = ?20 AND user_id = ?21",
        )
        .bind(&invoice.number)
        .bind(&invoice.client_id)
        .bind(invoice.status)
        .bind(invoice.subtotal.cents())
        .bind(invoice.tax.cents())
        .bind(invoice.total.cents())
        .bind(invoice.issued_date)
        .bind(invoice.due_date)
        .bind(terms.map(|t| i64::from(t.days)))
        .bind(terms.map(|t| t.description.as_str()))
        .bind(&invoice.payment_method)
        .bind(&invoice.transaction_id)
        .bind(invoice.payment_date)
        .bind(course.map(|c| c.course_name.as_str()))
        .bind(course.map(|c| c.course_id.as_str()))
        .bind(course.map(|c| c.cohort.as_str()))
        .bind(course.map(|c| c.training_dates.as_str()))
        .bind(&invoice.notes)
        .bind(invoice.updated_at)
        .bind(id)
        .bind(self.tenant.as_str())
        .execute(&mut *tx)
        .await?;

        sqlx::query("DELETE FROM invoice_items WHERE invoice_id = ?1 AND user_id = ?2")
            .bind(id)
            .bind(self.tenant.as_str())
            .execute(&mut *tx)
            .await?;
        insert_items(&mut tx, &self.tenant, id, &invoice.items).await?;

        tx.commit().await?;

        info!(tenant = %self.tenant, id = %id, items = invoice.items.len(), "Invoice updated");
        Ok(update_invoice_status(invoice, now))
    }

    /// Deletes an invoice and its items.
    pub async fn delete(&self, id: &str) -> DbResult<()> {
        let mut tx = self.pool.begin().await?;

        sqlx::query("DELETE FROM invoice_items WHERE invoice_id = ?1 AND user_id = ?2")
            .bind(id)
            .bind(self.tenant.as_str())
            .execute(&mut *tx)
            .await?;

        let result = sqlx::query("DELETE FROM invoices WHERE id = ?1 AND user_id = ?2")
            .bind(id)
            .bind(self.tenant.as_str())
            .execute(&mut *tx)
            .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Invoice", id));
        }

        tx.commit().await?;

        info!(tenant = %self.tenant, id = %id, "Invoice deleted");
        Ok(())
    }

    /// Writes status and settlement fields only; items are untouched.
    pub async fn update_status(&self, id: &str, update: StatusUpdate) -> DbResult<Invoice> {
        let now = self.clock.now();
        let mut conn = self.pool.acquire().await?;
        write_status(&mut conn, &self.tenant, id, &update, now).await?;

        debug!(tenant = %self.tenant, id = %id, status = %update.status, "Invoice status updated");

        let invoice = load_invoice(&mut conn, &self.tenant, id)
            .await?
            .ok_or_else(|| CoreError::InvoiceNotFound(id.to_string()))?;
        Ok(update_invoice_status(invoice, now))
    }

    /// Records a payment. Existing settlement fields are kept, so paying
    /// twice keeps the first payment date and reference.
    pub async fn mark_paid(&self, id: &str, fallback_method: &str) -> DbResult<Invoice> {
        self.transition(id, |invoice, now| payment::mark_as_paid(invoice, now, fallback_method))
            .await
    }

    /// Reverses a payment: settlement fields are cleared and the invoice
    /// reads as pending or overdue again.
    pub async fn mark_unpaid(&self, id: &str) -> DbResult<Invoice> {
        self.transition(id, payment::mark_as_unpaid).await
    }

    async fn transition(
        &self,
        id: &str,
        apply: impl FnOnce(&Invoice, DateTime<Utc>) -> Invoice,
    ) -> DbResult<Invoice> {
        let now = self.clock.now();
        let mut tx = self.pool.begin().await?;

        let current = load_invoice(&mut tx, &self.tenant, id)
            .await?
            .ok_or_else(|| CoreError::InvoiceNotFound(id.to_string()))?;

        let next = apply(&current, now);
        write_status(&mut tx, &self.tenant, id, &StatusUpdate::from_invoice(&next), now).await?;

        tx.commit().await?;

        info!(
            tenant = %self.tenant,
            id = %id,
            from = %current.status,
            to = %next.status,
            "Invoice payment status changed"
        );
        Ok(update_invoice_status(next, now))
    }

    /// Overdue invoices, most overdue first.
    pub async fn overdue(&self) -> DbResult<Vec<OverdueInvoice>> {
        let invoices = self.list().await?;
        Ok(payment::overdue_invoices(&invoices, self.clock.now()))
    }

    /// Pending invoices falling due within `horizon_days`.
    pub async fn due_soon(&self, horizon_days: u32) -> DbResult<Vec<Invoice>> {
        let invoices = self.list().await?;
        Ok(payment::due_soon_invoices(&invoices, self.clock.now(), horizon_days))
    }

    /// Number of invoices owned by the tenant.
    pub async fn count(&self) -> DbResult<i64> {
        let count = sqlx::query_scalar("SELECT COUNT(*) FROM invoices WHERE user_id = ?1")
            .bind(self.tenant.as_str())
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }
}

async fn write_status(
    conn: &mut SqliteConnection,
    tenant: &TenantId,
    id: &str,
    update: &StatusUpdate,
    now: DateTime<Utc>,
) -> DbResult<()> {
    let result = sqlx::query(
        "UPDATE invoices
         SET status = ?1, payment_method = ?2, transaction_id = ?3, payment_date = ?4, updated_at = ?5
         WHERE id = ?6 AND user_id = ?7",
    )
    .bind(persisted_status(update.status))
    .bind(&update.payment_method)
    .bind(&update.transaction_id)
    .bind(update.payment_date)
    .bind(now)
    .bind(id)
    .bind(tenant.as_str())
    .execute(&mut *conn)
    .await?;

    if result.rows_affected() == 0 {
        return Err(DbError::not_found("Invoice", id));
    }
    Ok(())
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repository::test_support::{consulting, date, net, new_client, tenant, test_db};
    use billbook_core::{ClientPatch, NewInvoiceItem, Urgency};

    async fn seeded() -> (crate::pool::Database, TenantId, String) {
        let db = test_db().await;
        let t = tenant("user-1");
        let client = db.clients(&t).create(new_client("Acme")).await.unwrap();
        (db, t, client.id)
    }

    #[tokio::test]
    async fn test_create_assigns_number_and_totals() {
        let (db, t, client_id) = seeded().await;
        let repo = db.invoices(&t);

        let mut draft = InvoiceDraft::new(&client_id, date(2025, 1, 1), net(30), vec![consulting(2.0), consulting(0.5)]);
        draft.tax = Money::from_cents(2500);

        let first = repo.create(draft.clone()).await.unwrap();
        assert_eq!(first.number, "INV-2025-0001");
        assert_eq!(first.subtotal.cents(), 25000);
        assert_eq!(first.total.cents(), 27500);
        assert_eq!(first.due_date, date(2025, 1, 31));
        assert_eq!(first.status, InvoiceStatus::Pending);

        let second = repo.create(draft).await.unwrap();
        assert_eq!(second.number, "INV-2025-0002");

        let fetched = repo.get(&first.id).await.unwrap();
        assert_eq!(fetched, first);
    }

    #[tokio::test]
    async fn test_manual_number_advances_sequence() {
        let (db, t, client_id) = seeded().await;
        let repo = db.invoices(&t);

        let mut draft = InvoiceDraft::new(&client_id, date(2025, 1, 1), net(30), vec![consulting(1.0)]);
        draft.number = Some("INV-2025-0040".into());
        repo.create(draft.clone()).await.unwrap();

        draft.number = None;
        assert_eq!(repo.create(draft).await.unwrap().number, "INV-2025-0041");
    }

    #[tokio::test]
    async fn test_create_requires_owned_client() {
        let (db, _t, client_id) = seeded().await;
        let other = db.invoices(&tenant("user-2"));

        let draft = InvoiceDraft::new(&client_id, date(2025, 1, 1), net(30), vec![consulting(1.0)]);
        assert!(matches!(other.create(draft).await, Err(DbError::NotFound { .. })));
    }

    #[tokio::test]
    async fn test_course_info_required() {
        let (db, t, client_id) = seeded().await;
        db.clients(&t)
            .update(
                &client_id,
                ClientPatch {
                    requires_course_info: Some(true),
                    ..Default::default()
                },
            )
            .await
            .unwrap();

        let repo = db.invoices(&t);
        let mut draft = InvoiceDraft::new(&client_id, date(2025, 1, 1), net(30), vec![consulting(1.0)]);
        assert!(matches!(repo.create(draft.clone()).await, Err(DbError::Conflict { .. })));

        draft.course_info = Some(CourseInfo {
            course_name: "Rust Fundamentals".into(),
            cohort: "Spring".into(),
            ..Default::default()
        });
        let created = repo.create(draft).await.unwrap();
        assert_eq!(created.course_info.unwrap().cohort, "Spring");
    }

    #[tokio::test]
    async fn test_delete_client_with_invoices_conflicts() {
        let (db, t, client_id) = seeded().await;
        let draft = InvoiceDraft::new(&client_id, date(2025, 1, 1), net(30), vec![consulting(1.0)]);
        let invoice = db.invoices(&t).create(draft).await.unwrap();

        let err = db.clients(&t).delete(&client_id).await.unwrap_err();
        assert!(matches!(err, DbError::Conflict { .. }));

        db.invoices(&t).delete(&invoice.id).await.unwrap();
        db.clients(&t).delete(&client_id).await.unwrap();
    }

    #[tokio::test]
    async fn test_update_replaces_items() {
        let (db, t, client_id) = seeded().await;
        let repo = db.invoices(&t);
        let created = repo
            .create(InvoiceDraft::new(&client_id, date(2025, 1, 1), net(30), vec![consulting(1.0), consulting(2.0)]))
            .await
            .unwrap();

        let replacement = InvoiceDraft::new(
            &client_id,
            date(2025, 1, 2),
            net(15),
            vec![NewInvoiceItem::new("Workshop", 1.0, Money::from_cents(50000))],
        );
        let updated = repo.update(&created.id, replacement).await.unwrap();

        assert_eq!(updated.number, created.number);
        assert_eq!(updated.created_at, created.created_at);
        assert_eq!(updated.items.len(), 1);
        assert_eq!(updated.total.cents(), 50000);

        let fetched = repo.get(&created.id).await.unwrap();
        assert_eq!(fetched.items.len(), 1);
        assert_eq!(fetched.items[0].description, "Workshop");
        assert_eq!(fetched.due_date, date(2025, 1, 17));
    }

    #[tokio::test]
    async fn test_overdue_is_derived_on_read() {
        // Clock is 2025-01-15; due 2025-01-10 → 5 days overdue.
        let (db, t, client_id) = seeded().await;
        let repo = db.invoices(&t);

        let mut draft = InvoiceDraft::new(&client_id, date(2025, 1, 1), net(9), vec![consulting(1.0)]);
        draft.due_date = Some(date(2025, 1, 10));
        let late = repo.create(draft).await.unwrap();
        assert_eq!(late.status, InvoiceStatus::Overdue);

        let stored: InvoiceStatus = sqlx::query_scalar("SELECT status FROM invoices WHERE id = ?1")
            .bind(&late.id)
            .fetch_one(db.pool())
            .await
            .unwrap();
        assert_eq!(stored, InvoiceStatus::Pending);

        let overdue = repo.overdue().await.unwrap();
        assert_eq!(overdue.len(), 1);
        assert_eq!(overdue[0].days_overdue, 5);
        assert_eq!(
            payment::urgency_level(&overdue[0].invoice, db.now()),
            Urgency::Medium
        );
    }

    #[tokio::test]
    async fn test_due_soon() {
        let (db, t, client_id) = seeded().await;
        let repo = db.invoices(&t);

        let mut soon = InvoiceDraft::new(&client_id, date(2025, 1, 10), net(30), vec![consulting(1.0)]);
        soon.due_date = Some(date(2025, 1, 20));
        repo.create(soon).await.unwrap();

        let later = InvoiceDraft::new(&client_id, date(2025, 1, 10), net(60), vec![consulting(1.0)]);
        repo.create(later).await.unwrap();

        let due = repo.due_soon(7).await.unwrap();
        assert_eq!(due.len(), 1);
        assert_eq!(due[0].due_date, date(2025, 1, 20));
    }

    #[tokio::test]
    async fn test_mark_paid_then_unpaid() {
        let (db, t, client_id) = seeded().await;
        let repo = db.invoices(&t);
        let mut draft = InvoiceDraft::new(&client_id, date(2025, 1, 1), net(9), vec![consulting(1.0)]);
        draft.due_date = Some(date(2025, 1, 10));
        let created = repo.create(draft).await.unwrap();

        let paid = repo.mark_paid(&created.id, "Check").await.unwrap();
        assert_eq!(paid.status, InvoiceStatus::Paid);
        assert_eq!(paid.payment_method.as_deref(), Some("Check"));
        assert_eq!(paid.payment_date, Some(date(2025, 1, 15)));
        let reference = paid.transaction_id.clone().unwrap();
        assert!(reference.starts_with("TRX-"));

        // Paying again keeps the first settlement.
        let again = repo.mark_paid(&created.id, "Credit Card").await.unwrap();
        assert_eq!(again.payment_method.as_deref(), Some("Check"));
        assert_eq!(again.transaction_id.as_deref(), Some(reference.as_str()));

        let unpaid = repo.mark_unpaid(&created.id).await.unwrap();
        assert_eq!(unpaid.status, InvoiceStatus::Overdue);
        assert!(unpaid.payment_method.is_none());
        assert!(unpaid.transaction_id.is_none());
        assert!(unpaid.payment_date.is_none());

        let fetched = repo.get(&created.id).await.unwrap();
        assert_eq!(fetched.status, InvoiceStatus::Overdue);
        assert_eq!(fetched.items.len(), 1);
    }

    #[tokio::test]
    async fn test_update_status_is_targeted() {
        let (db, t, client_id) = seeded().await;
        let repo = db.invoices(&t);
        let created = repo
            .create(InvoiceDraft::new(&client_id, date(2025, 1, 1), net(30), vec![consulting(3.0)]))
            .await
            .unwrap();

        let updated = repo
            .update_status(
                &created.id,
                StatusUpdate {
                    status: InvoiceStatus::Paid,
                    payment_method: Some("Bank Transfer".into()),
                    transaction_id: Some("WIRE-1".into()),
                    payment_date: Some(date(2025, 1, 14)),
                },
            )
            .await
            .unwrap();

        assert_eq!(updated.status, InvoiceStatus::Paid);
        assert_eq!(updated.transaction_id.as_deref(), Some("WIRE-1"));
        assert_eq!(updated.items, created.items);

        let missing = repo.update_status("nope", StatusUpdate::default()).await;
        assert!(matches!(missing, Err(DbError::NotFound { .. })));
    }

    #[tokio::test]
    async fn test_tenant_isolation() {
        let (db, t, client_id) = seeded().await;
        let created = db
            .invoices(&t)
            .create(InvoiceDraft::new(&client_id, date(2025, 1, 1), net(30), vec![consulting(1.0)]))
            .await
            .unwrap();

        let other = db.invoices(&tenant("user-2"));
        assert!(other.list().await.unwrap().is_empty());
        assert!(matches!(other.get(&created.id).await, Err(DbError::NotFound { .. })));
        assert!(matches!(other.mark_paid(&created.id, "Check").await, Err(DbError::NotFound { .. })));
        assert!(matches!(other.delete(&created.id).await, Err(DbError::NotFound { .. })));

        assert_eq!(db.invoices(&t).list_for_client(&client_id).await.unwrap().len(), 1);
    }
}
