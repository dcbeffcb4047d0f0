//! # Dashboard Analytics
//!
//! Revenue figures computed from a tenant's invoices. Numbers only; charts
//! and formatting belong to whatever front end displays them.
//!
//! All month boundaries are calendar months of the invoice's issue date,
//! relative to the month containing `now` (UTC).

use chrono::{DateTime, Datelike, Months, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::money::Money;
use crate::types::{Client, Invoice, InvoiceStatus};

/// Number of clients reported by [`top_clients`].
pub const TOP_CLIENT_LIMIT: usize = 5;

/// Months covered by [`monthly_revenue`], current month included.
pub const REVENUE_SERIES_MONTHS: u32 = 6;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardMetrics {
    /// Sum of totals across every invoice, whatever its status.
    pub total_revenue: Money,
    /// Paid invoices issued in the current month.
    pub monthly_revenue: Money,
    pub total_invoices: usize,
    pub paid_invoices: usize,
    pub pending_amount: Money,
    pub overdue_amount: Money,
    /// Percent change of paid revenue against the previous month; 0 without a baseline.
    pub monthly_growth: f64,
    pub average_invoice_value: Money,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MonthlyRevenue {
    /// "Jan 2025"
    pub month: String,
    pub revenue: Money,
    pub invoices: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusBreakdown {
    pub status: InvoiceStatus,
    pub count: usize,
    pub value: Money,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TopClient {
    pub client_id: String,
    pub name: String,
    pub revenue: Money,
    pub invoices: usize,
}

fn month_start(date: NaiveDate) -> NaiveDate {
    date.with_day(1).unwrap_or(date)
}

fn same_month(a: NaiveDate, b: NaiveDate) -> bool {
    a.year() == b.year() && a.month() == b.month()
}

fn paid_in_month(invoices: &[Invoice], month: NaiveDate) -> impl Iterator<Item = &Invoice> {
    invoices
        .iter()
        .filter(move |inv| inv.status == InvoiceStatus::Paid && same_month(inv.issued_date, month))
}

fn sum_totals<'a>(invoices: impl Iterator<Item = &'a Invoice>) -> Money {
    invoices.map(|inv| inv.total).sum()
}

/// Headline numbers for the dashboard.
///
/// Pass invoices through [`crate::payment::refresh_statuses`] first so that
/// overdue amounts reflect `now`.
pub fn dashboard_metrics(invoices: &[Invoice], now: DateTime<Utc>) -> DashboardMetrics {
    let this_month = month_start(now.date_naive());
    let last_month = this_month
        .checked_sub_months(Months::new(1))
        .unwrap_or(this_month);

    let total_revenue = sum_totals(invoices.iter());
    let total_invoices = invoices.len();
    let by_status = |status: InvoiceStatus| invoices.iter().filter(move |inv| inv.status == status);

    let monthly_revenue = sum_totals(paid_in_month(invoices, this_month));
    let previous_revenue = sum_totals(paid_in_month(invoices, last_month));

    let monthly_growth = if previous_revenue.cents() > 0 {
        (monthly_revenue.cents() - previous_revenue.cents()) as f64 / previous_revenue.cents() as f64 * 100.0
    } else {
        0.0
    };

    let average_invoice_value = if total_invoices > 0 {
        Money::from_cents((total_revenue.cents() as f64 / total_invoices as f64).round() as i64)
    } else {
        Money::zero()
    };

    DashboardMetrics {
        total_revenue,
        monthly_revenue,
        total_invoices,
        paid_invoices: by_status(InvoiceStatus::Paid).count(),
        pending_amount: sum_totals(by_status(InvoiceStatus::Pending)),
        overdue_amount: sum_totals(by_status(InvoiceStatus::Overdue)),
        monthly_growth,
        average_invoice_value,
    }
}

/// Paid revenue per month, oldest first, ending with the current month.
pub fn monthly_revenue(invoices: &[Invoice], now: DateTime<Utc>) -> Vec<MonthlyRevenue> {
    let this_month = month_start(now.date_naive());

    (0..REVENUE_SERIES_MONTHS)
        .rev()
        .filter_map(|back| this_month.checked_sub_months(Months::new(back)))
        .map(|month| {
            let paid: Vec<&Invoice> = paid_in_month(invoices, month).collect();
            MonthlyRevenue {
                month: month.format("%b %Y").to_string(),
                revenue: sum_totals(paid.iter().copied()),
                invoices: paid.len(),
            }
        })
        .collect()
}

/// Count and value per status, in `draft, pending, paid, overdue` order.
/// Statuses with no invoices are left out.
pub fn status_distribution(invoices: &[Invoice]) -> Vec<StatusBreakdown> {
    InvoiceStatus::ALL
        .iter()
        .map(|&status| {
            let matching: Vec<&Invoice> = invoices.iter().filter(|inv| inv.status == status).collect();
            StatusBreakdown {
                status,
                count: matching.len(),
                value: sum_totals(matching.iter().copied()),
            }
        })
        .filter(|b| b.count > 0)
        .collect()
}

/// The five clients with the highest invoiced totals.
///
/// Ties are broken by client name so the ranking is deterministic.
pub fn top_clients(invoices: &[Invoice], clients: &[Client]) -> Vec<TopClient> {
    let names: HashMap<&str, &str> = clients
        .iter()
        .map(|c| (c.id.as_str(), c.name.as_str()))
        .collect();

    let mut stats: HashMap<&str, (Money, usize)> = HashMap::new();
    for inv in invoices {
        let entry = stats.entry(inv.client_id.as_str()).or_insert((Money::zero(), 0));
        entry.0 += inv.total;
        entry.1 += 1;
    }

    let mut ranked: Vec<TopClient> = stats
        .into_iter()
        .map(|(client_id, (revenue, count))| TopClient {
            client_id: client_id.to_string(),
            name: names.get(client_id).copied().unwrap_or(client_id).to_string(),
            revenue,
            invoices: count,
        })
        .collect();

    ranked.sort_by(|a, b| b.revenue.cmp(&a.revenue).then_with(|| a.name.cmp(&b.name)));
    ranked.truncate(TOP_CLIENT_LIMIT);
    ranked
}
