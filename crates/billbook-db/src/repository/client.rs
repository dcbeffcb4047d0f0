//! # Client Repository
//!
//! Tenant-scoped CRUD for clients.
//!
//! ## Key Operations
//! - Create / get / update / delete
//! - Name search (case-insensitive substring, capped at 50 rows)
//! - Listing with invoice counts for the client management screen
//!
//! ## Delete Guard
//! ```text
//! delete(client_id)
//!     │
//!     ├── BEGIN
//!     ├── SELECT COUNT(*) FROM invoices WHERE client_id = ? AND user_id = ?
//!     │       │
//!     │       ├── > 0 ──► ROLLBACK ──► DbError::Conflict
//!     │       │
//!     │       └── = 0 ──► DELETE FROM clients ... ──► COMMIT
//!     │                        │
//!     │                        └── 0 rows ──► DbError::NotFound
//! ```

use billbook_core::validation::{
    validate_email, validate_name, validate_new_client, validate_non_negative, validate_search_query,
};
use billbook_core::{
    BillingAddress, Client, ClientPatch, ClientWithInvoiceCount, Clock, CoreError, Money, NewClient,
    TenantId, CLIENT_SEARCH_LIMIT,
};
use chrono::{DateTime, Utc};
use sqlx::{SqliteConnection, SqlitePool};
use std::sync::Arc;
use tracing::{debug, info};
use uuid::Uuid;

use crate::error::{DbError, DbResult};

/// Column list shared by every client SELECT.
pub(crate) const CLIENT_COLUMNS: &str = "id, name, email, phone, address, city, state, zip_code, \
     tax_id, default_unit_price_cents, billing_address_street, billing_address_city, \
     billing_address_state, billing_address_zip, requires_course_info, created_at, updated_at";

// =============================================================================
// Row Mapping
// =============================================================================

#[derive(Debug, sqlx::FromRow)]
pub(crate) struct ClientRow {
    id: String,
    name: String,
    email: String,
    phone: Option<String>,
    address: String,
    city: String,
    state: String,
    zip_code: String,
    tax_id: Option<String>,
    default_unit_price_cents: Option<i64>,
    billing_address_street: Option<String>,
    billing_address_city: Option<String>,
    billing_address_state: Option<String>,
    billing_address_zip: Option<String>,
    requires_course_info: bool,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl ClientRow {
    pub(crate) fn into_domain(self, tenant: &TenantId) -> Client {
        // A billing address exists only when its street was stored.
        let billing_address = self.billing_address_street.map(|street| BillingAddress {
            address: street,
            city: self.billing_address_city.unwrap_or_default(),
            state: self.billing_address_state.unwrap_or_default(),
            zip_code: self.billing_address_zip.unwrap_or_default(),
        });

        Client {
            id: self.id,
            tenant_id: tenant.clone(),
            name: self.name,
            email: self.email,
            phone: self.phone,
            address: self.address,
            city: self.city,
            state: self.state,
            zip_code: self.zip_code,
            tax_id: self.tax_id,
            default_unit_price: self.default_unit_price_cents.map(Money::from_cents),
            billing_address,
            requires_course_info: self.requires_course_info,
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
    }
}

#[derive(Debug, sqlx::FromRow)]
struct ClientCountRow {
    #[sqlx(flatten)]
    client: ClientRow,
    invoice_count: i64,
}

// =============================================================================
// Shared Statements
// =============================================================================

/// Inserts a client row for `client.tenant_id`.
///
/// With `skip_existing`, an id that is already taken is left untouched and
/// the call reports 0 affected rows instead of failing.
pub(crate) async fn insert_client(
    conn: &mut SqliteConnection,
    client: &Client,
    skip_existing: bool,
) -> DbResult<u64> {
    let billing = client.billing_address.as_ref();
    let sql = format!(
        "INSERT INTO clients (
            id, user_id, name, email, phone, address, city, state, zip_code, tax_id,
            default_unit_price_cents, billing_address_street, billing_address_city,
            billing_address_state, billing_address_zip, requires_course_info,
            created_at, updated_at
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16, ?17, ?18)
        {}",
        if skip_existing { "ON CONFLICT(id) DO NOTHING" } else { "" }
    );

    let result = sqlx::query(&sql)
        .bind(&client.id)
        .bind(client.tenant_id.as_str())
        .bind(&client.name)
        .bind(&client.email)
        .bind(&client.phone)
        .bind(&client.address)
        .bind(&client.city)
        .bind(&client.state)
        .bind(&client.zip_code)
        .bind(&client.tax_id)
        .bind(client.default_unit_price.map(|p| p.cents()))
        .bind(billing.map(|b| b.address.as_str()))
        .bind(billing.map(|b| b.city.as_str()))
        .bind(billing.map(|b| b.state.as_str()))
        .bind(billing.map(|b| b.zip_code.as_str()))
        .bind(client.requires_course_info)
        .bind(client.created_at)
        .bind(client.updated_at)
        .execute(&mut *conn)
        .await?;

    Ok(result.rows_affected())
}

/// Fetches a client owned by `tenant` on an open connection or transaction.
pub(crate) async fn fetch_client(
    conn: &mut SqliteConnection,
    tenant: &TenantId,
    id: &str,
) -> DbResult<Option<Client>> {
    let sql = format!("SELECT {CLIENT_COLUMNS} FROM clients WHERE id = ?1 AND user_id = ?2");

    let row = sqlx::query_as::<_, ClientRow>(&sql)
        .bind(id)
        .bind(tenant.as_str())
        .fetch_optional(&mut *conn)
        .await?;

    Ok(row.map(|r| r.into_domain(tenant)))
}

// =============================================================================
// Repository
// =============================================================================

/// Repository for client database operations, bound to one tenant.
///
/// ## Usage
/// ```rust,ignore
/// let clients = db.clients(&tenant);
///
/// let acme = clients.create(new_client).await?;
/// let found = clients.search("acm").await?;
/// clients.delete(&acme.id).await?;
/// ```
#[derive(Clone)]
pub struct ClientRepository {
    pool: SqlitePool,
    tenant: TenantId,
    clock: Arc<dyn Clock>,
}

impl ClientRepository {
    /// Creates a new ClientRepository.
    pub fn new(pool: SqlitePool, tenant: TenantId, clock: Arc<dyn Clock>) -> Self {
        ClientRepository { pool, tenant, clock }
    }

    /// Creates a client with a fresh id.
    pub async fn create(&self, input: NewClient) -> DbResult<Client> {
        validate_new_client(&input)?;

        let now = self.clock.now();
        let client = Client {
            id: Uuid::new_v4().to_string(),
            tenant_id: self.tenant.clone(),
            name: input.name.trim().to_string(),
            email: input.email.trim().to_string(),
            phone: input.phone,
            address: input.address,
            city: input.city,
            state: input.state,
            zip_code: input.zip_code,
            tax_id: input.tax_id,
            default_unit_price: input.default_unit_price,
            billing_address: input.billing_address,
            requires_course_info: input.requires_course_info,
            created_at: now,
            updated_at: now,
        };

        let mut conn = self.pool.acquire().await?;
        insert_client(&mut conn, &client, false).await?;

        info!(tenant = %self.tenant, id = %client.id, name = %client.name, "Client created");
        Ok(client)
    }

    /// Gets a client by id, or `None` when absent or owned by another tenant.
    pub async fn find(&self, id: &str) -> DbResult<Option<Client>> {
        let mut conn = self.pool.acquire().await?;
        fetch_client(&mut conn, &self.tenant, id).await
    }

    /// Gets a client by id.
    ///
    /// ## Returns
    /// * `Err(DbError::NotFound)` - Missing, or owned by another tenant
    pub async fn get(&self, id: &str) -> DbResult<Client> {
        self.find(id)
            .await?
            .ok_or_else(|| CoreError::ClientNotFound(id.to_string()).into())
    }

    /// All clients ordered by name.
    pub async fn list(&self) -> DbResult<Vec<Client>> {
        let sql = format!("SELECT {CLIENT_COLUMNS} FROM clients WHERE user_id = ?1 ORDER BY name ASC");

        let rows = sqlx::query_as::<_, ClientRow>(&sql)
            .bind(self.tenant.as_str())
            .fetch_all(&self.pool)
            .await?;

        debug!(tenant = %self.tenant, count = rows.len(), "Listed clients");
        Ok(rows.into_iter().map(|r| r.into_domain(&self.tenant)).collect())
    }

    /// Clients whose name contains `term`, case-insensitively.
    ///
    /// An empty term lists everything (still capped).
    pub async fn search(&self, term: &str) -> DbResult<Vec<Client>> {
        let term = validate_search_query(term)?;
        let pattern = format!("%{}%", escape_like(&term));

        debug!(tenant = %self.tenant, term = %term, "Searching clients");

        let sql = format!(
            "SELECT {CLIENT_COLUMNS} FROM clients
             WHERE user_id = ?1 AND name LIKE ?2 ESCAPE '\\'
             ORDER BY name ASC
             LIMIT ?3"
        );

        let rows = sqlx::query_as::<_, ClientRow>(&sql)
            .bind(self.tenant.as_str())
            .bind(pattern)
            .bind(CLIENT_SEARCH_LIMIT)
            .fetch_all(&self.pool)
            .await?;

        Ok(rows.into_iter().map(|r| r.into_domain(&self.tenant)).collect())
    }

    /// Applies a partial update. An empty patch returns the client unchanged.
    pub async fn update(&self, id: &str, patch: ClientPatch) -> DbResult<Client> {
        let mut client = self.get(id).await?;
        if patch.is_empty() {
            return Ok(client);
        }

        patch.apply(&mut client);
        validate_name(&client.name)?;
        validate_email(&client.email)?;
        if let Some(price) = client.default_unit_price {
            validate_non_negative("default_unit_price", price)?;
        }
        client.updated_at = self.clock.now();

        let billing = client.billing_address.as_ref();
        let result = sqlx::query(
            "UPDATE clients SET
                name = ?1, email = ?2, phone = ?3, address = ?4, city = ?5, state = ?6,
                zip_code = ?7, tax_id = ?8, default_unit_price_cents = ?9,
                billing_address_street = ?10, billing_address_city = ?11,
                billing_address_state = ?12, billing_address_zip = ?13,
                requires_course_info = ?14, updated_at = ?15
             WHERE id = ?16 AND user_id = ?17",
        )
        .bind(&client.name)
        .bind(&client.email)
        .bind(&client.phone)
        .bind(&client.address)
        .bind(&client.city)
        .bind(&client.state)
        .bind(&client.zip_code)
        .bind(&client.tax_id)
        .bind(client.default_unit_price.map(|p| p.cents()))
        .bind(billing.map(|b| b.address.as_str()))
        .bind(billing.map(|b| b.city.as_str()))
        .bind(billing.map(|b| b.state.as_str()))
        .bind(billing.map(|b| b.zip_code.as_str()))
        .bind(client.requires_course_info)
        .bind(client.updated_at)
        .bind(id)
        .bind(self.tenant.as_str())
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Client", id));
        }

        info!(tenant = %self.tenant, id = %id, "Client updated");
        Ok(client)
    }

    /// Deletes a client that has no invoices.
    ///
    /// ## Returns
    /// * `Err(DbError::Conflict)` - Invoices still reference the client
    /// * `Err(DbError::NotFound)` - Missing, or owned by another tenant
    pub async fn delete(&self, id: &str) -> DbResult<()> {
        let mut tx = self.pool.begin().await?;

        let invoice_count: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM invoices WHERE client_id = ?1 AND user_id = ?2")
                .bind(id)
                .bind(self.tenant.as_str())
                .fetch_one(&mut *tx)
                .await?;

        if invoice_count > 0 {
            return Err(CoreError::ClientHasInvoices {
                client_id: id.to_string(),
                invoice_count,
            }
            .into());
        }

        let result = sqlx::query("DELETE FROM clients WHERE id = ?1 AND user_id = ?2")
            .bind(id)
            .bind(self.tenant.as_str())
            .execute(&mut *tx)
            .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Client", id));
        }

        tx.commit().await?;

        info!(tenant = %self.tenant, id = %id, "Client deleted");
        Ok(())
    }

    /// All clients with the number of invoices each one has, ordered by name.
    pub async fn list_with_invoice_counts(&self) -> DbResult<Vec<ClientWithInvoiceCount>> {
        let columns: String = CLIENT_COLUMNS
            .split(", ")
            .map(|c| format!("c.{}", c.trim()))
            .collect::<Vec<_>>()
            .join(", ");
        let sql = format!(
            "SELECT {columns}, COUNT(i.id) AS invoice_count
             FROM clients c
             LEFT JOIN invoices i ON i.client_id = c.id AND i.user_id = c.user_id
             WHERE c.user_id = ?1
             GROUP BY c.id
             ORDER BY c.name ASC"
        );

        let rows = sqlx::query_as::<_, ClientCountRow>(&sql)
            .bind(self.tenant.as_str())
            .fetch_all(&self.pool)
            .await?;

        Ok(rows
            .into_iter()
            .map(|r| ClientWithInvoiceCount {
                client: r.client.into_domain(&self.tenant),
                invoice_count: r.invoice_count,
            })
            .collect())
    }

    /// Number of clients owned by the tenant.
    pub async fn count(&self) -> DbResult<i64> {
        let count = sqlx::query_scalar("SELECT COUNT(*) FROM clients WHERE user_id = ?1")
            .bind(self.tenant.as_str())
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }
}

/// Escapes LIKE wildcards so user input matches literally.
fn escape_like(term: &str) -> String {
    let mut escaped = String::with_capacity(term.len());
    for ch in term.chars() {
        if matches!(ch, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(ch);
    }
    escaped
}

// =============================================================================
// Unit Tests
// =============================================================================
