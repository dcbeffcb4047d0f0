//! # Payment Status Engine
//!
//! Decides whether an invoice is overdue, due soon or settled, and computes
//! the result of recording or reversing a payment.
//!
//! ## Status Machine
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                                                                         │
//! │   ┌───────┐  send   ┌─────────┐  now > due  ┌─────────┐                 │
//! │   │ Draft │ ──────► │ Pending │ ──────────► │ Overdue │   (derived)     │
//! │   └───────┘         └────┬────┘             └────┬────┘                 │
//! │                          │ mark_as_paid          │ mark_as_paid         │
//! │                          ▼                       ▼                      │
//! │                     ┌─────────┐                                         │
//! │                     │  Paid   │ ── mark_as_unpaid ──► Pending/Overdue   │
//! │                     └─────────┘     (never Draft)                       │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Every function here is total and pure: the current instant is passed in,
//! nothing is read from the system clock. An invoice falls due at midnight
//! UTC at the start of its due date ([`Invoice::due_at`]).

use chrono::{DateTime, Duration, Utc};

use crate::types::{Invoice, InvoiceStatus, OverdueInvoice, Urgency};

const SECONDS_PER_DAY: i64 = 86_400;

/// Whole days from `from` to `to`, rounded toward negative infinity.
fn whole_days(from: DateTime<Utc>, to: DateTime<Utc>) -> i64 {
    (to - from).num_seconds().div_euclid(SECONDS_PER_DAY)
}

fn is_settled_or_draft(invoice: &Invoice) -> bool {
    matches!(invoice.status, InvoiceStatus::Paid | InvoiceStatus::Draft)
}

// =============================================================================
// Queries
// =============================================================================

/// True when the invoice is neither paid nor a draft and `now` is past its due instant.
pub fn is_overdue(invoice: &Invoice, now: DateTime<Utc>) -> bool {
    !is_settled_or_draft(invoice) && now > invoice.due_at()
}

/// `floor((now - due) / 1 day)`. Negative while the invoice is not yet due.
pub fn days_overdue(invoice: &Invoice, now: DateTime<Utc>) -> i64 {
    whole_days(invoice.due_at(), now)
}

/// All overdue invoices, most overdue first.
///
/// Ties keep their input order (`sort_by` is stable).
///
/// ## Example
/// ```rust,ignore
/// let overdue = overdue_invoices(&invoices, clock.now());
/// for entry in &overdue {
///     println!("{} {}", entry.invoice.number, format_days_overdue(entry.days_overdue));
/// }
/// ```
pub fn overdue_invoices(invoices: &[Invoice], now: DateTime<Utc>) -> Vec<OverdueInvoice> {
    let mut overdue: Vec<OverdueInvoice> = invoices
        .iter()
        .filter(|inv| is_overdue(inv, now))
        .map(|inv| OverdueInvoice {
            days_overdue: days_overdue(inv, now),
            invoice: inv.clone(),
        })
        .collect();

    overdue.sort_by(|a, b| b.days_overdue.cmp(&a.days_overdue));
    overdue
}

/// Pending invoices falling due within `[now, now + horizon_days]`, both ends inclusive.
pub fn due_soon_invoices(invoices: &[Invoice], now: DateTime<Utc>, horizon_days: u32) -> Vec<Invoice> {
    let horizon = now + Duration::days(i64::from(horizon_days));

    invoices
        .iter()
        .filter(|inv| inv.status == InvoiceStatus::Pending)
        .filter(|inv| {
            let due = inv.due_at();
            due >= now && due <= horizon
        })
        .cloned()
        .collect()
}

/// How urgently an invoice needs attention.
///
/// ```text
/// paid / draft                     → low
/// overdue by more than 30 days     → critical
/// overdue by more than 7 days      → high
/// overdue by up to 7 days          → medium
/// due within 3 days                → medium
/// otherwise                        → low
/// ```
pub fn urgency_level(invoice: &Invoice, now: DateTime<Utc>) -> Urgency {
    if is_settled_or_draft(invoice) {
        return Urgency::Low;
    }

    let days_until_due = whole_days(now, invoice.due_at());

    if days_until_due < 0 {
        let overdue = -days_until_due;
        return if overdue > 30 {
            Urgency::Critical
        } else if overdue > 7 {
            Urgency::High
        } else {
            Urgency::Medium
        };
    }

    if days_until_due <= 3 {
        Urgency::Medium
    } else {
        Urgency::Low
    }
}

// =============================================================================
// Transitions
// =============================================================================

/// Synthetic payment reference: `TRX-<millis>-<tag>`.
///
/// `<millis>` is the last eight digits of the Unix time in milliseconds and
/// `<tag>` is four hex digits hashed from the invoice id, so invoices paid
/// in the same millisecond still get different references. Same inputs give
/// the same reference. Not a unique key; nothing looks invoices up by it.
pub fn transaction_reference(now: DateTime<Utc>, invoice_id: &str) -> String {
    // FNV-1a, folded to 16 bits
    let hash = invoice_id
        .bytes()
        .fold(0x811c_9dc5_u32, |h, b| (h ^ u32::from(b)).wrapping_mul(0x0100_0193));
    format!(
        "TRX-{:08}-{:04X}",
        now.timestamp_millis().rem_euclid(100_000_000),
        (hash >> 16) ^ (hash & 0xFFFF)
    )
}

/// Records a payment.
///
/// Existing settlement fields win, so paying twice keeps the first payment
/// date, method and reference. Missing ones are filled from `now` and
/// `fallback_method`.
pub fn mark_as_paid(invoice: &Invoice, now: DateTime<Utc>, fallback_method: &str) -> Invoice {
    let mut paid = invoice.clone();

    paid.status = InvoiceStatus::Paid;
    paid.payment_date = paid.payment_date.or(Some(now.date_naive()));
    if paid.payment_method.as_deref().map_or(true, |m| m.trim().is_empty()) {
        paid.payment_method = Some(fallback_method.to_string());
    }
    if paid.transaction_id.as_deref().map_or(true, |t| t.trim().is_empty()) {
        paid.transaction_id = Some(transaction_reference(now, &invoice.id));
    }

    paid
}

/// Reverses a payment: clears settlement fields and falls back to
/// `Overdue` or `Pending` depending on the due date. Never `Draft`.
pub fn mark_as_unpaid(invoice: &Invoice, now: DateTime<Utc>) -> Invoice {
    let mut unpaid = invoice.clone();

    unpaid.payment_date = None;
    unpaid.payment_method = None;
    unpaid.transaction_id = None;
    unpaid.status = if now > invoice.due_at() {
        InvoiceStatus::Overdue
    } else {
        InvoiceStatus::Pending
    };

    unpaid
}

/// Derives the displayed status: a pending invoice past due reads as overdue.
///
/// Paid and draft invoices are returned unchanged. Nothing is written back.
pub fn update_invoice_status(mut invoice: Invoice, now: DateTime<Utc>) -> Invoice {
    if invoice.status == InvoiceStatus::Pending && now > invoice.due_at() {
        invoice.status = InvoiceStatus::Overdue;
    }
    invoice
}

/// Applies [`update_invoice_status`] to a whole batch.
pub fn refresh_statuses(invoices: Vec<Invoice>, now: DateTime<Utc>) -> Vec<Invoice> {
    invoices
        .into_iter()
        .map(|inv| update_invoice_status(inv, now))
        .collect()
}

// =============================================================================
// Reminders
// =============================================================================

/// "1 day overdue" / "N days overdue".
pub fn format_days_overdue(days: i64) -> String {
    if days == 1 {
        "1 day overdue".to_string()
    } else {
        format!("{days} days overdue")
    }
}

/// Reminder line for an overdue invoice; `None` when it is not overdue.
///
/// ## Example
/// ```text
/// Invoice INV-2025-0001 is 5 days overdue (Due: 2025-01-10). Amount: $200.00
/// ```
pub fn payment_reminder(invoice: &Invoice, now: DateTime<Utc>) -> Option<String> {
    if !is_overdue(invoice, now) {
        return None;
    }

    Some(format!(
        "Invoice {} is {} (Due: {}). Amount: {}",
        invoice.number,
        format_days_overdue(days_overdue(invoice, now)),
        invoice.due_date.format("%Y-%m-%d"),
        invoice.total
    ))
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{at, date, invoice};
    use chrono::TimeZone;

    #[test]
    fn test_overdue_example_five_days() {
        let inv = invoice("i1", InvoiceStatus::Pending, date(2025, 1, 10));
        let now = at(2025, 1, 15);

        assert!(is_overdue(&inv, now));
        assert_eq!(days_overdue(&inv, now), 5);
        assert_eq!(urgency_level(&inv, now), Urgency::Medium);
    }

    #[test]
    fn test_overdue_example_critical() {
        let inv = invoice("i1", InvoiceStatus::Pending, date(2025, 1, 10));
        let now = at(2025, 2, 20);

        assert_eq!(days_overdue(&inv, now), 41);
        assert_eq!(urgency_level(&inv, now), Urgency::Critical);
    }

    #[test]
    fn test_paid_and_draft_never_overdue() {
        let now = at(2025, 6, 1);
        for status in [InvoiceStatus::Paid, InvoiceStatus::Draft] {
            let inv = invoice("i1", status, date(2025, 1, 10));
            assert!(!is_overdue(&inv, now));
            assert_eq!(urgency_level(&inv, now), Urgency::Low);
        }
    }

    #[test]
    fn test_not_overdue_at_due_instant() {
        let inv = invoice("i1", InvoiceStatus::Pending, date(2025, 1, 10));
        assert!(!is_overdue(&inv, at(2025, 1, 10)));
        let later = Utc.with_ymd_and_hms(2025, 1, 10, 0, 0, 1).unwrap();
        assert!(is_overdue(&inv, later));
        assert_eq!(days_overdue(&inv, later), 0);
    }

    #[test]
    fn test_days_overdue_is_monotonic() {
        let inv = invoice("i1", InvoiceStatus::Overdue, date(2025, 1, 10));
        let mut previous = i64::MIN;
        for hours in (1..24 * 60).step_by(7) {
            let now = at(2025, 1, 10) + Duration::hours(hours);
            let days = days_overdue(&inv, now);
            assert!(days >= previous);
            previous = days;
        }
    }

    #[test]
    fn test_overdue_sorted_desc_and_stable() {
        let invoices = vec![
            invoice("a", InvoiceStatus::Pending, date(2025, 1, 10)),
            invoice("b", InvoiceStatus::Pending, date(2025, 1, 1)),
            invoice("c", InvoiceStatus::Paid, date(2024, 12, 1)),
            invoice("d", InvoiceStatus::Overdue, date(2025, 1, 10)),
            invoice("e", InvoiceStatus::Pending, date(2025, 3, 1)),
        ];

        let overdue = overdue_invoices(&invoices, at(2025, 1, 20));
        let ids: Vec<&str> = overdue.iter().map(|o| o.invoice.id.as_str()).collect();
        assert_eq!(ids, vec!["b", "a", "d"]);
        assert_eq!(overdue[0].days_overdue, 19);
        assert_eq!(overdue[1].days_overdue, 10);
    }

    #[test]
    fn test_due_soon_window_inclusive() {
        let now = at(2025, 1, 10);
        let invoices = vec![
            invoice("today", InvoiceStatus::Pending, date(2025, 1, 10)),
            invoice("edge", InvoiceStatus::Pending, date(2025, 1, 17)),
            invoice("beyond", InvoiceStatus::Pending, date(2025, 1, 18)),
            invoice("past", InvoiceStatus::Pending, date(2025, 1, 9)),
            invoice("draft", InvoiceStatus::Draft, date(2025, 1, 12)),
        ];

        let due: Vec<String> = due_soon_invoices(&invoices, now, 7)
            .into_iter()
            .map(|i| i.id)
            .collect();
        assert_eq!(due, vec!["today", "edge"]);
    }

    #[test]
    fn test_urgency_before_due() {
        let now = at(2025, 1, 10);
        let soon = invoice("s", InvoiceStatus::Pending, date(2025, 1, 13));
        let later = invoice("l", InvoiceStatus::Pending, date(2025, 1, 20));
        assert_eq!(urgency_level(&soon, now), Urgency::Medium);
        assert_eq!(urgency_level(&later, now), Urgency::Low);

        let high = invoice("h", InvoiceStatus::Pending, date(2024, 12, 25));
        assert_eq!(urgency_level(&high, now), Urgency::High);
    }

    #[test]
    fn test_mark_as_paid_is_idempotent() {
        let inv = invoice("i1", InvoiceStatus::Pending, date(2025, 1, 10));
        let t1 = Utc.with_ymd_and_hms(2025, 1, 12, 10, 30, 0).unwrap();
        let t2 = Utc.with_ymd_and_hms(2025, 2, 1, 8, 0, 0).unwrap();

        let once = mark_as_paid(&inv, t1, "Bank Transfer");
        assert_eq!(once.status, InvoiceStatus::Paid);
        assert_eq!(once.payment_date, Some(date(2025, 1, 12)));
        assert_eq!(once.payment_method.as_deref(), Some("Bank Transfer"));
        assert_eq!(once.transaction_id, Some(transaction_reference(t1, &inv.id)));

        let twice = mark_as_paid(&once, t2, "Check");
        assert_eq!(twice.payment_date, once.payment_date);
        assert_eq!(twice.transaction_id, once.transaction_id);
        assert_eq!(twice.payment_method, once.payment_method);
    }

    #[test]
    fn test_mark_as_paid_keeps_supplied_method() {
        let mut inv = invoice("i1", InvoiceStatus::Pending, date(2025, 1, 10));
        inv.payment_method = Some("Card".into());
        let paid = mark_as_paid(&inv, at(2025, 1, 5), "Bank Transfer");
        assert_eq!(paid.payment_method.as_deref(), Some("Card"));
    }

    #[test]
    fn test_paid_unpaid_round_trip() {
        let inv = invoice("i1", InvoiceStatus::Pending, date(2025, 1, 10));

        for (now, expected) in [
            (at(2025, 1, 5), InvoiceStatus::Pending),
            (at(2025, 1, 15), InvoiceStatus::Overdue),
        ] {
            let back = mark_as_unpaid(&mark_as_paid(&inv, now, "Bank Transfer"), now);
            assert_eq!(back.status, expected);
            assert_eq!(back.status, update_invoice_status(inv.clone(), now).status);
            assert!(back.payment_date.is_none());
            assert!(back.payment_method.is_none());
            assert!(back.transaction_id.is_none());
        }
    }

    #[test]
    fn test_unpaid_never_becomes_draft() {
        let inv = invoice("i1", InvoiceStatus::Draft, date(2025, 1, 10));
        assert_eq!(mark_as_unpaid(&inv, at(2025, 1, 1)).status, InvoiceStatus::Pending);
    }

    #[test]
    fn test_update_invoice_status() {
        let now = at(2025, 1, 15);
        let pending = invoice("p", InvoiceStatus::Pending, date(2025, 1, 10));
        let draft = invoice("d", InvoiceStatus::Draft, date(2025, 1, 10));
        let future = invoice("f", InvoiceStatus::Pending, date(2025, 2, 10));

        let refreshed = refresh_statuses(vec![pending, draft, future], now);
        let statuses: Vec<InvoiceStatus> = refreshed.iter().map(|i| i.status).collect();
        assert_eq!(
            statuses,
            vec![InvoiceStatus::Overdue, InvoiceStatus::Draft, InvoiceStatus::Pending]
        );
    }

    #[test]
    fn test_payment_reminder() {
        let inv = invoice("i1", InvoiceStatus::Pending, date(2025, 1, 10));
        assert_eq!(
            payment_reminder(&inv, at(2025, 1, 15)).unwrap(),
            "Invoice INV-2025-0001 is 5 days overdue (Due: 2025-01-10). Amount: $200.00"
        );
        assert!(payment_reminder(&inv, at(2025, 1, 5)).is_none());
        assert_eq!(format_days_overdue(1), "1 day overdue");
    }

    #[test]
    fn test_transaction_reference_shape() {
        let reference = transaction_reference(at(2025, 1, 15), "i1");
        assert!(reference.starts_with("TRX-"));
        assert_eq!(reference.len(), 17);
        assert_eq!(reference, transaction_reference(at(2025, 1, 15), "i1"));
    }

    #[test]
    fn test_same_instant_payments_get_distinct_references() {
        let now = at(2025, 1, 15);
        let first = mark_as_paid(&invoice("i1", InvoiceStatus::Pending, date(2025, 1, 10)), now, "Check");
        let second = mark_as_paid(&invoice("i2", InvoiceStatus::Pending, date(2025, 1, 10)), now, "Check");

        assert_eq!(first.transaction_id.as_deref(), Some("TRX-99200000-7C97"));
        assert_eq!(second.transaction_id.as_deref(), Some("TRX-99200000-7F7A"));
    }
}
