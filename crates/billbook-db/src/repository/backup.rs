//! # Backup Service
//!
//! Export of a tenant's data to the portable backup document, and the
//! transactional import that restores one.
//!
//! ## Import Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                                                                         │
//! │  JSON text ──► billbook_core::backup::validate_str                     │
//! │                    │                                                    │
//! │                    ├── invalid ──► DbError::Validation (nothing written)│
//! │                    ▼                                                    │
//! │  BEGIN                                                                 │
//! │   ├── clear_existing? DELETE items, invoices, clients (this tenant)    │
//! │   ├── for client:   INSERT ... ON CONFLICT(id) DO NOTHING              │
//! │   └── for invoice:  INSERT ... ON CONFLICT(id) DO NOTHING              │
//! │         ├── advance the number sequence past INV-YYYY-NNNN numbers     │
//! │         └── for item: INSERT ... ON CONFLICT(id) DO NOTHING            │
//! │  COMMIT                                                                │
//! │                                                                         │
//! │  Any error between BEGIN and COMMIT drops the transaction, which       │
//! │  rolls back every row written by this call.                            │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Skip-on-Conflict
//! An id that already exists keeps its stored row; the record still counts
//! as processed. Importing the same backup twice therefore changes nothing
//! the second time. The id is looked up before anything else, so a skipped
//! record's client or invoice reference is never checked. An id that exists
//! under *another* tenant is a `Conflict`, never a silent skip.

use billbook_core::backup::{self, BackupData, BackupItem};
use billbook_core::numbering::InvoiceNumber;
use billbook_core::{Clock, InvoiceItem, TenantId};
use serde::{Deserialize, Serialize};
use sqlx::{SqliteConnection, SqlitePool};
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::error::{DbError, DbResult};
use crate::repository::client::{insert_client, ClientRepository};
use crate::repository::invoice::{insert_invoice, insert_item, InvoiceRepository};
use crate::repository::owner_of;
use crate::repository::sequence::observe_number;
use crate::repository::settings::SettingsRepository;

/// Counts of records processed by an import (skipped duplicates included).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImportStats {
    pub clients: usize,
    pub invoices: usize,
    pub items: usize,
}

/// Backup export and import, bound to one tenant.
///
/// ## Usage
/// ```rust,ignore
/// let backup = db.backup(&tenant);
///
/// let doc = backup.export().await?;
/// let json = serde_json::to_string_pretty(&doc)?;
///
/// let stats = backup.import_json(&json, false).await?;
/// println!("{} clients, {} invoices", stats.clients, stats.invoices);
/// ```
#[derive(Clone)]
pub struct BackupService {
    pool: SqlitePool,
    tenant: TenantId,
    clock: Arc<dyn Clock>,
}

impl BackupService {
    pub fn new(pool: SqlitePool, tenant: TenantId, clock: Arc<dyn Clock>) -> Self {
        BackupService { pool, tenant, clock }
    }

    /// Snapshot of the tenant's settings, clients and invoices.
    pub async fn export(&self) -> DbResult<BackupData> {
        let settings = SettingsRepository::new(self.pool.clone(), self.tenant.clone(), self.clock.clone())
            .get_value()
            .await?;
        let clients = ClientRepository::new(self.pool.clone(), self.tenant.clone(), self.clock.clone())
            .list()
            .await?;
        let invoices = InvoiceRepository::new(self.pool.clone(), self.tenant.clone(), self.clock.clone())
            .list()
            .await?;

        info!(
            tenant = %self.tenant,
            clients = clients.len(),
            invoices = invoices.len(),
            "Backup exported"
        );
        Ok(backup::export(settings, &clients, &invoices, self.clock.now()))
    }

    /// Validates and imports a backup given as JSON text.
    pub async fn import_json(&self, json: &str, clear_existing: bool) -> DbResult<ImportStats> {
        let data = backup::validate_str(json)?;
        self.import(&data, clear_existing).await
    }

    /// Imports validated backup data in a single transaction.
    ///
    /// Records are written for the caller's tenant whatever the document
    /// says. Settings are not restored.
    ///
    /// ## Returns
    /// * `Err(DbError::ForeignKeyViolation)` - An invoice or item names a parent that doesn't exist
    /// * `Err(DbError::Conflict)` - An id is already taken by another tenant
    pub async fn import(&self, data: &BackupData, clear_existing: bool) -> DbResult<ImportStats> {
        let now = self.clock.now();
        info!(
            tenant = %self.tenant,
            version = %data.version,
            clients = data.clients.len(),
            invoices = data.invoices.len(),
            clear_existing,
            "Importing backup"
        );

        let mut tx = self.pool.begin().await?;

        if clear_existing {
            self.clear(&mut tx).await?;
        }

        let mut stats = ImportStats::default();

        for record in &data.clients {
            if self.already_present(&mut tx, "clients", &record.id).await? {
                debug!(id = %record.id, "Client already present, skipped");
            } else {
                insert_client(&mut tx, &record.to_client(&self.tenant, now), true).await?;
            }
            stats.clients += 1;
        }

        for record in &data.invoices {
            // A skipped invoice keeps its stored client; only new rows need one.
            if self.already_present(&mut tx, "invoices", &record.id).await? {
                debug!(id = %record.id, "Invoice already present, skipped");
            } else {
                self.require_parent(&mut tx, "clients", &record.client_id, "invoice", &record.id)
                    .await?;
                insert_invoice(&mut tx, &record.to_invoice(&self.tenant, now), true).await?;
            }
            if let Ok(number) = record.number.parse::<InvoiceNumber>() {
                observe_number(&mut tx, &self.tenant, number).await?;
            }
            stats.invoices += 1;

            for (position, item) in record.items.iter().enumerate() {
                self.import_item(&mut tx, position as i64, item).await?;
                stats.items += 1;
            }
        }

        tx.commit().await?;

        info!(
            tenant = %self.tenant,
            clients = stats.clients,
            invoices = stats.invoices,
            items = stats.items,
            "Backup imported"
        );
        Ok(stats)
    }

    /// Items carry their own parent id; it usually, but not always, matches
    /// the invoice they were listed under.
    async fn import_item(&self, conn: &mut SqliteConnection, position: i64, item: &BackupItem) -> DbResult<()> {
        if self.already_present(conn, "invoice_items", &item.id).await? {
            debug!(id = %item.id, "Item already present, skipped");
            return Ok(());
        }
        self.require_parent(conn, "invoices", &item.invoice_id, "item", &item.id)
            .await?;

        let line = InvoiceItem {
            id: item.id.clone(),
            description: item.description.clone(),
            quantity: item.quantity,
            unit_price: item.unit_price,
            amount: item.amount,
        };

        insert_item(conn, &self.tenant, &item.invoice_id, position, &line, true).await?;
        Ok(())
    }

    /// Deletes the tenant's items, invoices and clients, in that order.
    async fn clear(&self, conn: &mut SqliteConnection) -> DbResult<()> {
        for table in ["invoice_items", "invoices", "clients"] {
            let sql = format!("DELETE FROM {table} WHERE user_id = ?1");
            let removed = sqlx::query(&sql)
                .bind(self.tenant.as_str())
                .execute(&mut *conn)
                .await?
                .rows_affected();
            debug!(tenant = %self.tenant, table, removed, "Cleared existing rows");
        }
        Ok(())
    }

    /// True when `id` is already stored for this tenant and must be skipped.
    ///
    /// Checked before any parent lookup: a skipped row is never re-validated.
    async fn already_present(&self, conn: &mut SqliteConnection, table: &'static str, id: &str) -> DbResult<bool> {
        match owner_of(conn, table, id).await? {
            None => Ok(false),
            Some(owner) if owner == self.tenant.as_str() => Ok(true),
            Some(_) => {
                warn!(tenant = %self.tenant, table, id = %id, "Backup id owned by another tenant");
                Err(DbError::conflict(format!("{table} id '{id}' belongs to another account")))
            }
        }
    }

    /// The parent row must exist and belong to this tenant.
    async fn require_parent(
        &self,
        conn: &mut SqliteConnection,
        table: &'static str,
        parent_id: &str,
        child: &str,
        child_id: &str,
    ) -> DbResult<()> {
        match owner_of(conn, table, parent_id).await? {
            Some(owner) if owner == self.tenant.as_str() => Ok(()),
            Some(_) => Err(DbError::conflict(format!(
                "{child} '{child_id}' references {table} id '{parent_id}' owned by another account"
            ))),
            None => Err(DbError::ForeignKeyViolation {
                message: format!("{child} '{child_id}' references missing {table} id '{parent_id}'"),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repository::test_support::{consulting, date, net, new_client, tenant, test_db};
    use billbook_core::{InvoiceDraft, InvoiceStatus};
    use serde_json::json;

    #[tokio::test]
    async fn test_export_contains_tenant_data_only() {
        let db = test_db().await;
        let t = tenant("user-1");
        let client = db.clients(&t).create(new_client("Acme")).await.unwrap();
        db.invoices(&t)
            .create(InvoiceDraft::new(&client.id, date(2025, 1, 1), net(30), vec![consulting(2.0)]))
            .await
            .unwrap();
        db.clients(&tenant("user-2")).create(new_client("Globex")).await.unwrap();

        let doc = db.backup(&t).export().await.unwrap();

        assert_eq!(doc.version, "1.0.0");
        assert_eq!(doc.clients.len(), 1);
        assert_eq!(doc.clients[0].name, "Acme");
        assert_eq!(doc.invoices.len(), 1);
        assert_eq!(doc.invoices[0].items.len(), 1);
        assert!(doc.settings.is_object());
    }

    #[tokio::test]
    async fn test_invalid_document_writes_nothing() {
        let db = test_db().await;
        let t = tenant("user-1");

        let bad = json!({
            "version": "1.0.0",
            "timestamp": "2025-01-15T00:00:00Z",
            "settings": {},
            "clients": [{ "id": "c1", "name": "Acme" }, { "id": "c2" }],
            "invoices": []
        });
        let err = db.backup(&t).import_json(&bad.to_string(), false).await.unwrap_err();

        assert!(matches!(err, DbError::Validation(_)));
        assert_eq!(db.clients(&t).count().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_imported_numbers_advance_sequence() {
        let db = test_db().await;
        let t = tenant("user-1");
        let doc = json!({
            "version": "1.0.0",
            "timestamp": "2025-01-15T00:00:00Z",
            "settings": {},
            "clients": [{ "id": "c1", "name": "Acme" }],
            "invoices": [{
                "id": "i1", "clientId": "c1", "invoiceNumber": "INV-2025-0017",
                "status": "paid", "total": 100, "issueDate": "2025-01-02", "dueDate": "2025-02-01",
                "items": []
            }]
        });
        db.backup(&t).import_json(&doc.to_string(), false).await.unwrap();

        let imported = db.invoices(&t).get("i1").await.unwrap();
        assert_eq!(imported.status, InvoiceStatus::Paid);
        assert_eq!(imported.total.cents(), 10000);
        assert_eq!(db.sequences(&t).preview_next().await.unwrap().to_string(), "INV-2025-0018");
    }

    #[tokio::test]
    async fn test_clear_existing_only_touches_own_tenant() {
        let db = test_db().await;
        let mine = tenant("user-1");
        let theirs = tenant("user-2");
        db.clients(&mine).create(new_client("Old Client")).await.unwrap();
        db.clients(&theirs).create(new_client("Globex")).await.unwrap();

        let doc = json!({
            "version": "1.0.0",
            "timestamp": "2025-01-15T00:00:00Z",
            "settings": {},
            "clients": [{ "id": "c1", "name": "Acme" }],
            "invoices": []
        });
        let stats = db.backup(&mine).import_json(&doc.to_string(), true).await.unwrap();

        assert_eq!(stats.clients, 1);
        let names: Vec<String> = db.clients(&mine).list().await.unwrap().into_iter().map(|c| c.name).collect();
        assert_eq!(names, vec!["Acme"]);
        assert_eq!(db.clients(&theirs).count().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_id_owned_by_other_tenant_conflicts() {
        let db = test_db().await;
        let doc = json!({
            "version": "1.0.0",
            "timestamp": "2025-01-15T00:00:00Z",
            "settings": {},
            "clients": [{ "id": "c1", "name": "Acme" }],
            "invoices": []
        })
        .to_string();

        db.backup(&tenant("user-1")).import_json(&doc, false).await.unwrap();
        let err = db.backup(&tenant("user-2")).import_json(&doc, false).await.unwrap_err();

        assert!(matches!(err, DbError::Conflict { .. }));
        assert_eq!(db.clients(&tenant("user-2")).count().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_skipped_records_ignore_their_references() {
        let db = test_db().await;
        let t = tenant("user-1");
        let first = json!({
            "version": "1.0.0",
            "timestamp": "2025-01-15T00:00:00Z",
            "settings": {},
            "clients": [{ "id": "c1", "name": "Acme" }],
            "invoices": [{
                "id": "i1", "client_id": "c1", "number": "INV-2025-0001",
                "items": [{ "id": "it1", "description": "Consulting", "quantity": 1, "unit_price": 100 }]
            }]
        });
        db.backup(&t).import_json(&first.to_string(), false).await.unwrap();

        // Same ids, but pointing at parents that no longer exist anywhere.
        let stale = json!({
            "version": "1.0.0",
            "timestamp": "2025-01-16T00:00:00Z",
            "settings": {},
            "clients": [],
            "invoices": [
                { "id": "i1", "client_id": "c-old", "number": "INV-2025-0001", "items": [] },
                { "id": "i2", "client_id": "c1", "number": "INV-2025-0002",
                  "items": [{ "id": "it1", "invoice_id": "gone", "description": "Moved" }] }
            ]
        });
        let stats = db.backup(&t).import_json(&stale.to_string(), false).await.unwrap();

        assert_eq!(stats, ImportStats { clients: 0, invoices: 2, items: 1 });
        let kept = db.invoices(&t).get("i1").await.unwrap();
        assert_eq!(kept.client_id, "c1");
        assert_eq!(kept.items.len(), 1);
        assert_eq!(kept.items[0].description, "Consulting");
        assert!(db.invoices(&t).get("i2").await.unwrap().items.is_empty());
    }
}
