//! End-to-end backup tests: export, validate and import against a real
//! (in-memory) SQLite database.

use billbook_core::{
    backup, FixedClock, InvoiceDraft, InvoiceStatus, Money, NewClient, NewInvoiceItem, PaymentTerms, TenantId,
};
use billbook_db::{Database, DbConfig, DbError, ImportStats};
use chrono::{NaiveDate, TimeZone, Utc};
use serde_json::json;

// =============================================================================
// Helpers
// =============================================================================

async fn test_db() -> Database {
    let now = Utc.with_ymd_and_hms(2025, 1, 15, 0, 0, 0).unwrap();
    Database::new(DbConfig::in_memory())
        .await
        .unwrap()
        .with_clock(FixedClock(now))
}

fn tenant(id: &str) -> TenantId {
    TenantId::new(id).unwrap()
}

async fn row_count(db: &Database, table: &str, tenant: &TenantId) -> i64 {
    let sql = format!("SELECT COUNT(*) FROM {table} WHERE user_id = ?1");
    sqlx::query_scalar::<_, i64>(&sql)
        .bind(tenant.as_str())
        .fetch_one(db.pool())
        .await
        .unwrap()
}

async fn counts(db: &Database, tenant: &TenantId) -> (i64, i64, i64) {
    (
        row_count(db, "clients", tenant).await,
        row_count(db, "invoices", tenant).await,
        row_count(db, "invoice_items", tenant).await,
    )
}

fn envelope(clients: serde_json::Value, invoices: serde_json::Value) -> String {
    json!({
        "version": "1.0.0",
        "timestamp": "2025-01-15T00:00:00Z",
        "settings": {},
        "clients": clients,
        "invoices": invoices,
    })
    .to_string()
}

/// Two clients, three invoices (one paid), four items.
async fn populate(db: &Database, tenant: &TenantId) {
    let clients = db.clients(tenant);
    let invoices = db.invoices(tenant);

    let mut ids = Vec::new();
    for name in ["Acme", "Globex"] {
        let client = clients
            .create(NewClient {
                name: name.to_string(),
                email: format!("billing@{}.example.com", name.to_lowercase()),
                phone: None,
                address: "1 Main St".to_string(),
                city: "Springfield".to_string(),
                state: "IL".to_string(),
                zip_code: "62701".to_string(),
                tax_id: None,
                default_unit_price: None,
                billing_address: None,
                requires_course_info: false,
            })
            .await
            .unwrap();
        ids.push(client.id);
    }

    let issued = NaiveDate::from_ymd_opt(2025, 1, 2).unwrap();
    let first = invoices
        .create(InvoiceDraft::new(
            &ids[0],
            issued,
            PaymentTerms::custom(30, None),
            vec![
                NewInvoiceItem::new("Consulting", 2.0, Money::from_cents(15000)),
                NewInvoiceItem::new("Materials", 1.0, Money::from_cents(4500)),
            ],
        ))
        .await
        .unwrap();
    invoices.mark_paid(&first.id, "Check").await.unwrap();

    invoices
        .create(InvoiceDraft::new(
            &ids[0],
            issued,
            PaymentTerms::custom(5, None),
            vec![NewInvoiceItem::new("Workshop", 1.0, Money::from_cents(120000))],
        ))
        .await
        .unwrap();
    invoices
        .create(InvoiceDraft::new(
            &ids[1],
            issued,
            PaymentTerms::custom(30, None),
            vec![NewInvoiceItem::new("Coaching", 3.0, Money::from_cents(20000))],
        ))
        .await
        .unwrap();
}

// =============================================================================
// Tests
// =============================================================================

#[tokio::test]
async fn test_export_import_round_trip_into_fresh_tenant() {
    let db = test_db().await;
    let source = tenant("user-1");
    populate(&db, &source).await;

    let exported = db.backup(&source).export().await.unwrap();
    let json = serde_json::to_string(&exported).unwrap();

    // The exported document passes validation unchanged.
    let revalidated = backup::validate_str(&json).unwrap();
    assert_eq!(revalidated.clients, exported.clients);
    assert_eq!(revalidated.invoices, exported.invoices);

    // Ids are global, so restore into a second database.
    let target_db = test_db().await;
    let target = tenant("user-1");
    let stats = target_db.backup(&target).import_json(&json, false).await.unwrap();

    assert_eq!(
        stats,
        ImportStats {
            clients: 2,
            invoices: 3,
            items: 4
        }
    );
    assert_eq!(counts(&target_db, &target).await, (2, 3, 4));

    let paid: Vec<_> = target_db
        .invoices(&target)
        .list()
        .await
        .unwrap()
        .into_iter()
        .filter(|inv| inv.status == InvoiceStatus::Paid)
        .collect();
    assert_eq!(paid.len(), 1);
    assert_eq!(paid[0].payment_method.as_deref(), Some("Check"));
    assert_eq!(paid[0].total.cents(), 34500);

    // Restored numbers push the sequence forward.
    let next = target_db.sequences(&target).preview_next().await.unwrap();
    assert_eq!(next.to_string(), "INV-2025-0004");
}

#[tokio::test]
async fn test_import_twice_adds_nothing_the_second_time() {
    let db = test_db().await;
    let t = tenant("user-1");
    let json = envelope(
        json!([{ "id": "c1", "name": "Acme" }, { "id": "c2", "name": "Globex" }]),
        json!([
            { "id": "i1", "clientId": "c1", "invoiceNumber": "INV-2025-0001",
              "items": [{ "id": "it1", "description": "Consulting", "quantity": 2, "unitPrice": 100 }] },
            { "id": "i2", "client_id": "c2", "number": "INV-2025-0002",
              "items": [{ "id": "it2", "description": "Workshop", "quantity": 1, "price": 1200 },
                        { "id": "it3", "description": "Materials", "quantity": 4, "unit_price": 45 }] }
        ]),
    );

    let first = db.backup(&t).import_json(&json, false).await.unwrap();
    let after_first = counts(&db, &t).await;

    let second = db.backup(&t).import_json(&json, false).await.unwrap();
    let after_second = counts(&db, &t).await;

    assert_eq!(after_first, (2, 2, 3));
    assert_eq!(after_second, after_first);
    // Skipped duplicates still count as processed.
    assert_eq!(first, second);
}

#[tokio::test]
async fn test_failed_item_rolls_back_whole_import() {
    let db = test_db().await;
    let t = tenant("user-1");
    let json = envelope(
        json!([{ "id": "c1", "name": "Acme" }]),
        json!([
            { "id": "i1", "client_id": "c1", "number": "INV-2025-0001",
              "items": [{ "id": "it1", "description": "Consulting", "quantity": 1, "unit_price": 100 }] },
            { "id": "i2", "client_id": "c1", "number": "INV-2025-0002",
              "items": [{ "id": "it2", "invoice_id": "no-such-invoice", "description": "Orphan" }] }
        ]),
    );

    let err = db.backup(&t).import_json(&json, false).await.unwrap_err();

    assert!(matches!(err, DbError::ForeignKeyViolation { .. }));
    assert_eq!(counts(&db, &t).await, (0, 0, 0));
    // The sequence bump rolled back with everything else.
    assert_eq!(db.sequences(&t).current_sequence().await.unwrap(), 0);
}

#[tokio::test]
async fn test_invoice_with_unknown_client_rolls_back() {
    let db = test_db().await;
    let t = tenant("user-1");
    let json = envelope(
        json!([{ "id": "c1", "name": "Acme" }]),
        json!([{ "id": "i1", "client_id": "c9", "number": "INV-2025-0001" }]),
    );

    let err = db.backup(&t).import_json(&json, false).await.unwrap_err();

    assert!(matches!(err, DbError::ForeignKeyViolation { .. }));
    assert_eq!(counts(&db, &t).await, (0, 0, 0));
}

#[tokio::test]
async fn test_minimal_backup_imports_one_of_each() {
    let db = test_db().await;
    let t = tenant("user-1");
    let json = envelope(
        json!([{ "id": "c1", "name": "Acme" }]),
        json!([{
            "id": "inv1", "client_id": "c1", "invoice_number": "INV-2025-0001",
            "items": [{ "id": "it1", "description": "Consulting", "quantity": 2, "unitPrice": 100, "amount": 200 }]
        }]),
    );

    let stats = db.backup(&t).import_json(&json, false).await.unwrap();

    assert_eq!(stats.clients, 1);
    assert_eq!(stats.invoices, 1);
    assert_eq!(counts(&db, &t).await, (1, 1, 1));

    let invoice = db.invoices(&t).get("inv1").await.unwrap();
    assert_eq!(invoice.number, "INV-2025-0001");
    assert_eq!(invoice.items.len(), 1);
    assert_eq!(invoice.items[0].amount.cents(), 20000);
    assert_eq!(invoice.items[0].unit_price.cents(), 10000);
}

#[tokio::test]
async fn test_clear_existing_replaces_own_data_only() {
    let db = test_db().await;
    let mine = tenant("user-1");
    let theirs = tenant("user-2");
    populate(&db, &mine).await;
    populate(&db, &theirs).await;

    let json = envelope(json!([{ "id": "c1", "name": "Acme" }]), json!([]));
    db.backup(&mine).import_json(&json, true).await.unwrap();

    assert_eq!(counts(&db, &mine).await, (1, 0, 0));
    assert_eq!(counts(&db, &theirs).await, (2, 3, 4));
}

#[tokio::test]
async fn test_payload_user_id_is_ignored() {
    let db = test_db().await;
    let t = tenant("user-1");
    let json = envelope(
        json!([{ "id": "c1", "name": "Acme", "user_id": "someone-else" }]),
        json!([]),
    );

    db.backup(&t).import_json(&json, false).await.unwrap();

    assert_eq!(row_count(&db, "clients", &t).await, 1);
    assert_eq!(row_count(&db, "clients", &tenant("someone-else")).await, 0);
}

#[tokio::test]
async fn test_due_date_derived_from_terms_reads_back_overdue() {
    let db = test_db().await;
    let t = tenant("user-1");
    let json = envelope(
        json!([{ "id": "c1", "name": "Acme" }]),
        json!([{ "id": "i1", "client_id": "c1", "number": "INV-2024-0001",
                 "issuedDate": "2024-12-01", "paymentTerms": { "days": 30 } }]),
    );

    db.backup(&t).import_json(&json, false).await.unwrap();

    let invoice = db.invoices(&t).get("i1").await.unwrap();
    assert_eq!(invoice.due_date, NaiveDate::from_ymd_opt(2024, 12, 31).unwrap());
    assert_eq!(invoice.status, InvoiceStatus::Overdue);
}
