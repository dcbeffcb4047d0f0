//! Builders shared by the unit tests of this crate.

use chrono::{DateTime, NaiveDate, TimeZone, Utc};

use crate::money::Money;
use crate::types::{Invoice, InvoiceItem, InvoiceStatus, TenantId};

pub fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

pub fn at(y: i32, m: u32, d: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(y, m, d, 0, 0, 0).unwrap()
}

pub fn invoice(id: &str, status: InvoiceStatus, due: NaiveDate) -> Invoice {
    let created = at(2025, 1, 1);
    let items = vec![InvoiceItem {
        id: format!("{id}-item"),
        description: "Consulting".to_string(),
        quantity: 2.0,
        unit_price: Money::from_cents(10000),
        amount: Money::from_cents(20000),
    }];

    Invoice {
        id: id.to_string(),
        tenant_id: TenantId::new("user-1").unwrap(),
        number: "INV-2025-0001".to_string(),
        client_id: "c1".to_string(),
        status,
        subtotal: Money::from_cents(20000),
        tax: Money::zero(),
        total: Money::from_cents(20000),
        issued_date: date(2025, 1, 1),
        due_date: due,
        payment_terms: None,
        payment_method: None,
        transaction_id: None,
        payment_date: None,
        course_info: None,
        notes: None,
        items,
        created_at: created,
        updated_at: created,
    }
}
