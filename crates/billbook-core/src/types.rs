//! # Domain Types
//!
//! Core domain types used throughout Billbook.
//!
//! ## Type Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Domain Types                                    │
//! │                                                                         │
//! │  ┌─────────────────┐   ┌─────────────────┐   ┌─────────────────┐       │
//! │  │     Client      │   │     Invoice     │   │   InvoiceItem   │       │
//! │  │  ─────────────  │ 1 │  ─────────────  │ 1 │  ─────────────  │       │
//! │  │  id (UUID)      │──►│  id (UUID)      │──►│  id (UUID)      │       │
//! │  │  tenant_id      │ * │  number         │ * │  quantity (f64) │       │
//! │  │  name           │   │  status         │   │  unit_price     │       │
//! │  │  requires_      │   │  subtotal/tax/  │   │  amount         │       │
//! │  │  course_info    │   │  total (cents)  │   └─────────────────┘       │
//! │  └─────────────────┘   └─────────────────┘                              │
//! │                                                                         │
//! │  ┌─────────────────┐   ┌─────────────────┐   ┌─────────────────┐       │
//! │  │    TenantId     │   │  InvoiceStatus  │   │  PaymentTerms   │       │
//! │  │  owning user    │   │  Draft          │   │  days           │       │
//! │  │  account        │   │  Pending        │   │  description    │       │
//! │  └─────────────────┘   │  Paid           │   └─────────────────┘       │
//! │                        │  Overdue        │                              │
//! │                        └─────────────────┘                              │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Dual-Key Identity Pattern
//! Every invoice has:
//! - `id`: UUID v4 - immutable, used for database relations and backups
//! - `number`: `INV-YYYY-NNNN` - human-facing, printed on the document

use chrono::{DateTime, Days, NaiveDate, NaiveTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::ValidationError;
use crate::money::Money;

// =============================================================================
// Tenant
// =============================================================================

/// The owning user account. Every read and write is scoped by one.
///
/// Construction rejects blank identifiers, so a repository method that takes
/// a `&TenantId` can never issue an unscoped query.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TenantId(String);

impl TenantId {
    /// Creates a tenant identifier from a non-blank string.
    pub fn new(id: impl Into<String>) -> Result<Self, ValidationError> {
        let id = id.into();
        let trimmed = id.trim();
        if trimmed.is_empty() {
            return Err(ValidationError::required("user_id"));
        }
        Ok(TenantId(trimmed.to_string()))
    }

    #[inline]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TenantId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

// =============================================================================
// Invoice Status
// =============================================================================

/// The status of an invoice.
///
/// `Draft`, `Pending` and `Paid` are stored ground truth. `Overdue` is
/// normally derived at read time from `Pending` + due date, but legacy rows
/// and backups may carry it explicitly.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "lowercase"))]
#[serde(rename_all = "lowercase")]
pub enum InvoiceStatus {
    /// Being prepared; never considered due.
    #[default]
    Draft,
    /// Sent to the client and awaiting payment.
    Pending,
    /// Settled.
    Paid,
    /// Pending and past its due date.
    Overdue,
}

impl InvoiceStatus {
    pub const ALL: [InvoiceStatus; 4] = [
        InvoiceStatus::Draft,
        InvoiceStatus::Pending,
        InvoiceStatus::Paid,
        InvoiceStatus::Overdue,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            InvoiceStatus::Draft => "draft",
            InvoiceStatus::Pending => "pending",
            InvoiceStatus::Paid => "paid",
            InvoiceStatus::Overdue => "overdue",
        }
    }
}

impl fmt::Display for InvoiceStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for InvoiceStatus {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "draft" => Ok(InvoiceStatus::Draft),
            "pending" => Ok(InvoiceStatus::Pending),
            "paid" => Ok(InvoiceStatus::Paid),
            "overdue" => Ok(InvoiceStatus::Overdue),
            _ => Err(ValidationError::NotAllowed {
                field: "status".to_string(),
                allowed: InvoiceStatus::ALL
                    .iter()
                    .map(|s| s.as_str().to_string())
                    .collect(),
            }),
        }
    }
}

// =============================================================================
// Client
// =============================================================================

/// A postal address used for billing when it differs from the main address.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BillingAddress {
    pub address: String,
    pub city: String,
    pub state: String,
    pub zip_code: String,
}

/// A customer that invoices are addressed to.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Client {
    pub id: String,
    pub tenant_id: TenantId,
    pub name: String,
    pub email: String,
    pub phone: Option<String>,
    pub address: String,
    pub city: String,
    pub state: String,
    pub zip_code: String,
    pub tax_id: Option<String>,
    /// Pre-fills the unit price of new invoice lines.
    pub default_unit_price: Option<Money>,
    pub billing_address: Option<BillingAddress>,
    /// Invoices for this client must carry [`CourseInfo`].
    pub requires_course_info: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Input for creating a client.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewClient {
    pub name: String,
    pub email: String,
    pub phone: Option<String>,
    pub address: String,
    pub city: String,
    pub state: String,
    pub zip_code: String,
    pub tax_id: Option<String>,
    pub default_unit_price: Option<Money>,
    pub billing_address: Option<BillingAddress>,
    #[serde(default)]
    pub requires_course_info: bool,
}

/// Partial update for a client. `None` leaves a field untouched.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClientPatch {
    pub name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub address: Option<String>,
    pub city: Option<String>,
    pub state: Option<String>,
    pub zip_code: Option<String>,
    pub tax_id: Option<String>,
    pub default_unit_price: Option<Money>,
    pub requires_course_info: Option<bool>,
    /// Replaces the billing address.
    pub billing_address: Option<BillingAddress>,
    /// Removes the billing address (takes precedence over `billing_address`).
    #[serde(default)]
    pub clear_billing_address: bool,
}

impl ClientPatch {
    /// True when applying the patch would change nothing.
    pub fn is_empty(&self) -> bool {
        self.name.is_none()
            && self.email.is_none()
            && self.phone.is_none()
            && self.address.is_none()
            && self.city.is_none()
            && self.state.is_none()
            && self.zip_code.is_none()
            && self.tax_id.is_none()
            && self.default_unit_price.is_none()
            && self.requires_course_info.is_none()
            && self.billing_address.is_none()
            && !self.clear_billing_address
    }

    /// Applies the patch to a client in place.
    pub fn apply(&self, client: &mut Client) {
        if let Some(name) = &self.name {
            client.name = name.clone();
        }
        if let Some(email) = &self.email {
            client.email = email.clone();
        }
        if let Some(phone) = &self.phone {
            client.phone = Some(phone.clone());
        }
        if let Some(address) = &self.address {
            client.address = address.clone();
        }
        if let Some(city) = &self.city {
            client.city = city.clone();
        }
        if let Some(state) = &self.state {
            client.state = state.clone();
        }
        if let Some(zip_code) = &self.zip_code {
            client.zip_code = zip_code.clone();
        }
        if let Some(tax_id) = &self.tax_id {
            client.tax_id = Some(tax_id.clone());
        }
        if let Some(price) = self.default_unit_price {
            client.default_unit_price = Some(price);
        }
        if let Some(flag) = self.requires_course_info {
            client.requires_course_info = flag;
        }
        if self.clear_billing_address {
            client.billing_address = None;
        } else if let Some(billing) = &self.billing_address {
            client.billing_address = Some(billing.clone());
        }
    }
}

/// A client together with the number of invoices that reference it.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClientWithInvoiceCount {
    #[serde(flatten)]
    pub client: Client,
    pub invoice_count: i64,
}

// =============================================================================
// Payment Terms
// =============================================================================

/// Standard payment terms offered in the invoice form.
pub const STANDARD_PAYMENT_TERMS: &[(u32, &str)] = &[
    (0, "Due on Receipt"),
    (15, "Net 15"),
    (30, "Net 30"),
    (45, "Net 45"),
    (60, "Net 60"),
    (90, "Net 90"),
];

/// A `{days, description}` pair used to derive a due date from an issue date.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentTerms {
    pub days: u32,
    pub description: String,
}

impl PaymentTerms {
    /// All standard payment terms, shortest first.
    pub fn standard() -> Vec<PaymentTerms> {
        STANDARD_PAYMENT_TERMS
            .iter()
            .map(|(days, description)| PaymentTerms {
                days: *days,
                description: description.to_string(),
            })
            .collect()
    }

    /// Looks up a standard term by its number of days.
    pub fn by_days(days: u32) -> Option<PaymentTerms> {
        Self::standard().into_iter().find(|t| t.days == days)
    }

    /// Builds custom terms. Without a description: "Net 1 day" / "Net 20 days".
    ///
    /// ## Example
    /// ```rust
    /// use billbook_core::types::PaymentTerms;
    ///
    /// assert_eq!(PaymentTerms::custom(20, None).description, "Net 20 days");
    /// assert_eq!(PaymentTerms::custom(10, Some("2/10")).description, "2/10");
    /// ```
    pub fn custom(days: u32, description: Option<&str>) -> PaymentTerms {
        let description = match description {
            Some(d) if !d.trim().is_empty() => d.trim().to_string(),
            _ => format!("Net {} {}", days, if days == 1 { "day" } else { "days" }),
        };
        PaymentTerms { days, description }
    }

    /// Due date = issue date + `days`.
    pub fn due_date(&self, issued: NaiveDate) -> NaiveDate {
        issued
            .checked_add_days(Days::new(u64::from(self.days)))
            .unwrap_or(NaiveDate::MAX)
    }
}

impl Default for PaymentTerms {
    fn default() -> Self {
        PaymentTerms {
            days: 30,
            description: "Net 30".to_string(),
        }
    }
}

// =============================================================================
// Course
// =============================================================================

/// Training-session metadata printed on an invoice.
///
/// Free text; not a foreign key into [`Course`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CourseInfo {
    pub course_name: String,
    pub course_id: String,
    pub cohort: String,
    pub training_dates: String,
}

/// Autocomplete entry for course names, unique per tenant (case-insensitive).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Course {
    pub id: String,
    pub name: String,
    pub created_at: DateTime<Utc>,
}

// =============================================================================
// Invoice Item
// =============================================================================

/// A line on an invoice. `amount = quantity × unit_price`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InvoiceItem {
    pub id: String,
    pub description: String,
    /// Positive; fractional values (hours, days) are allowed.
    pub quantity: f64,
    pub unit_price: Money,
    pub amount: Money,
}

/// Input for an invoice line; the amount is always derived.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewInvoiceItem {
    pub description: String,
    pub quantity: f64,
    pub unit_price: Money,
}

impl NewInvoiceItem {
    pub fn new(description: impl Into<String>, quantity: f64, unit_price: Money) -> Self {
        NewInvoiceItem {
            description: description.into(),
            quantity,
            unit_price,
        }
    }

    /// Materializes the line with a fresh id and derived amount.
    pub fn into_item(self) -> InvoiceItem {
        InvoiceItem {
            id: uuid::Uuid::new_v4().to_string(),
            amount: self.unit_price.times_quantity(self.quantity),
            description: self.description,
            quantity: self.quantity,
            unit_price: self.unit_price,
        }
    }
}

// =============================================================================
// Invoice
// =============================================================================

/// An invoice with its line items.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Invoice {
    pub id: String,
    pub tenant_id: TenantId,
    /// Human-facing number, `INV-YYYY-NNNN`.
    pub number: String,
    pub client_id: String,
    pub status: InvoiceStatus,
    pub subtotal: Money,
    pub tax: Money,
    /// Always `subtotal + tax`.
    pub total: Money,
    pub issued_date: NaiveDate,
    pub due_date: NaiveDate,
    pub payment_terms: Option<PaymentTerms>,
    /// Settlement fields; populated only while `status == Paid`.
    pub payment_method: Option<String>,
    pub transaction_id: Option<String>,
    pub payment_date: Option<NaiveDate>,
    pub course_info: Option<CourseInfo>,
    pub notes: Option<String>,
    pub items: Vec<InvoiceItem>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Invoice {
    /// The instant the invoice falls due: midnight UTC at the start of the
    /// due date. An invoice due "2025-01-10" is overdue from then on.
    pub fn due_at(&self) -> DateTime<Utc> {
        start_of_day(self.due_date)
    }

    /// Recomputes `subtotal` from the items and `total` from subtotal + tax.
    pub fn recompute_totals(&mut self) {
        self.subtotal = self.items.iter().map(|i| i.amount).sum();
        self.total = self.subtotal + self.tax;
    }
}

/// Midnight UTC at the start of `date`.
pub fn start_of_day(date: NaiveDate) -> DateTime<Utc> {
    date.and_time(NaiveTime::MIN).and_utc()
}

/// Input for creating or fully replacing an invoice.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InvoiceDraft {
    pub client_id: String,
    /// Assigned from the tenant's number sequence when absent.
    pub number: Option<String>,
    pub status: InvoiceStatus,
    pub tax: Money,
    pub issued_date: NaiveDate,
    /// Derived from `payment_terms` when absent.
    pub due_date: Option<NaiveDate>,
    pub payment_terms: Option<PaymentTerms>,
    pub payment_method: Option<String>,
    pub transaction_id: Option<String>,
    pub payment_date: Option<NaiveDate>,
    pub course_info: Option<CourseInfo>,
    pub notes: Option<String>,
    pub items: Vec<NewInvoiceItem>,
}

impl InvoiceDraft {
    /// Minimal draft: pending, no tax, due per `terms`.
    pub fn new(
        client_id: impl Into<String>,
        issued_date: NaiveDate,
        terms: PaymentTerms,
        items: Vec<NewInvoiceItem>,
    ) -> Self {
        InvoiceDraft {
            client_id: client_id.into(),
            number: None,
            status: InvoiceStatus::Pending,
            tax: Money::zero(),
            issued_date,
            due_date: None,
            payment_terms: Some(terms),
            payment_method: None,
            transaction_id: None,
            payment_date: None,
            course_info: None,
            notes: None,
            items,
        }
    }

    /// The explicit due date, or one derived from payment terms.
    pub fn resolve_due_date(&self) -> Result<NaiveDate, ValidationError> {
        match (self.due_date, &self.payment_terms) {
            (Some(due), _) => Ok(due),
            (None, Some(terms)) => Ok(terms.due_date(self.issued_date)),
            (None, None) => Err(ValidationError::required("due_date")),
        }
    }
}

// =============================================================================
// Payment Status Views
// =============================================================================

/// How urgently an invoice needs attention.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Urgency {
    Low,
    Medium,
    High,
    Critical,
}

/// An overdue invoice with its age in whole days.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OverdueInvoice {
    pub invoice: Invoice,
    pub days_overdue: i64,
}

// =============================================================================
// Unit Tests
// =============================================================================
