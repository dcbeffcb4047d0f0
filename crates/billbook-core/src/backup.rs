//! # Backup Format
//!
//! The portable snapshot of a tenant's data, and the validation that turns
//! an untrusted JSON document into that snapshot.
//!
//! ## Document Shape
//! ```text
//! {
//!   "version":   "1.0.0",
//!   "timestamp": "2025-01-15T09:30:00Z",
//!   "settings":  { ... },
//!   "clients":   [ { "id": "c1", "name": "Acme", ... } ],
//!   "invoices":  [ { "id": "i1", "number": "INV-2025-0001",
//!                    "client_id": "c1", ..., "items": [ ... ] } ]
//! }
//! ```
//!
//! ## Field Aliases
//! Backups come from several generations of the product, so one logical
//! field may be spelled several ways. Each field has an ordered alias list;
//! the first alias holding a non-empty value wins.
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────────────────┐
//! │  raw JSON ──► validate() ──► BackupData (canonical, snake_case)          │
//! │                  │                                                       │
//! │                  ├── invoice.client:  client_id │ clientId │ client      │
//! │                  ├── invoice.number:  number │ invoice_number │          │
//! │                  │                    invoiceNumber                      │
//! │                  ├── invoice.tax:     tax │ taxAmount │ tax_amount       │
//! │                  └── item.unit_price: unit_price │ unitPrice │ price     │
//! │                                                                          │
//! │  Ambiguity stops here. Nothing downstream ever sees an alias.           │
//! └──────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! `null` and empty strings count as absent. Money may be a JSON number or a
//! numeric string, in decimal currency units. Dates may be `YYYY-MM-DD`,
//! RFC 3339, or `Jan 05, 2025`.
//!
//! Validation is all-or-nothing: the first bad record fails the whole
//! document, before anything touches storage.

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::ValidationError;
use crate::money::{self, Money};
use crate::types::{
    BillingAddress, Client, CourseInfo, Invoice, InvoiceItem, InvoiceStatus, PaymentTerms,
    TenantId,
};
use crate::validation::ValidationResult;
use crate::BACKUP_VERSION;

// =============================================================================
// Canonical Records
// =============================================================================

/// A complete backup document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BackupData {
    pub version: String,
    /// ISO-8601 creation time, kept verbatim.
    pub timestamp: String,
    /// Settings document; any JSON object.
    pub settings: Value,
    pub clients: Vec<BackupClient>,
    pub invoices: Vec<BackupInvoice>,
}

/// A client as it appears in a backup, flattened to column names.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BackupClient {
    pub id: String,
    pub name: String,
    pub email: String,
    pub phone: Option<String>,
    pub address: String,
    pub city: String,
    pub state: String,
    pub zip_code: String,
    pub tax_id: Option<String>,
    #[serde(with = "money::as_decimal_opt")]
    pub default_unit_price: Option<Money>,
    pub billing_address_street: Option<String>,
    pub billing_address_city: Option<String>,
    pub billing_address_state: Option<String>,
    pub billing_address_zip: Option<String>,
    pub requires_course_info: bool,
    pub created_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
}

/// An invoice as it appears in a backup, items inline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BackupInvoice {
    pub id: String,
    pub number: String,
    pub client_id: String,
    pub status: InvoiceStatus,
    #[serde(with = "money::as_decimal")]
    pub subtotal: Money,
    #[serde(with = "money::as_decimal")]
    pub tax: Money,
    #[serde(with = "money::as_decimal")]
    pub total: Money,
    pub issued_date: Option<NaiveDate>,
    pub due_date: Option<NaiveDate>,
    pub payment_terms_days: Option<u32>,
    pub payment_terms_description: Option<String>,
    pub notes: Option<String>,
    pub payment_method: Option<String>,
    pub transaction_id: Option<String>,
    pub payment_date: Option<NaiveDate>,
    pub course_name: Option<String>,
    pub course_id: Option<String>,
    pub cohort: Option<String>,
    pub training_dates: Option<String>,
    pub created_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
    pub items: Vec<BackupItem>,
}

/// An invoice line as it appears in a backup.
///
/// `invoice_id` is carried explicitly: an item may name a parent other than
/// the invoice it is nested under.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BackupItem {
    pub id: String,
    pub invoice_id: String,
    pub description: String,
    pub quantity: f64,
    #[serde(with = "money::as_decimal")]
    pub unit_price: Money,
    #[serde(with = "money::as_decimal")]
    pub amount: Money,
}

// =============================================================================
// Domain ⇄ Backup
// =============================================================================

impl From<&Client> for BackupClient {
    fn from(c: &Client) -> Self {
        let billing = c.billing_address.as_ref();
        BackupClient {
            id: c.id.clone(),
            name: c.name.clone(),
            email: c.email.clone(),
            phone: c.phone.clone(),
            address: c.address.clone(),
            city: c.city.clone(),
            state: c.state.clone(),
            zip_code: c.zip_code.clone(),
            tax_id: c.tax_id.clone(),
            default_unit_price: c.default_unit_price,
            billing_address_street: billing.map(|b| b.address.clone()),
            billing_address_city: billing.map(|b| b.city.clone()),
            billing_address_state: billing.map(|b| b.state.clone()),
            billing_address_zip: billing.map(|b| b.zip_code.clone()),
            requires_course_info: c.requires_course_info,
            created_at: Some(c.created_at),
            updated_at: Some(c.updated_at),
        }
    }
}

impl BackupClient {
    /// Materializes the record for `tenant`; absent timestamps become `now`.
    pub fn to_client(&self, tenant: &TenantId, now: DateTime<Utc>) -> Client {
        let has_billing = self.billing_address_street.is_some()
            || self.billing_address_city.is_some()
            || self.billing_address_state.is_some()
            || self.billing_address_zip.is_some();

        let billing_address = has_billing.then(|| BillingAddress {
            address: self.billing_address_street.clone().unwrap_or_default(),
            city: self.billing_address_city.clone().unwrap_or_default(),
            state: self.billing_address_state.clone().unwrap_or_default(),
            zip_code: self.billing_address_zip.clone().unwrap_or_default(),
        });

        Client {
            id: self.id.clone(),
            tenant_id: tenant.clone(),
            name: self.name.clone(),
            email: self.email.clone(),
            phone: self.phone.clone(),
            address: self.address.clone(),
            city: self.city.clone(),
            state: self.state.clone(),
            zip_code: self.zip_code.clone(),
            tax_id: self.tax_id.clone(),
            default_unit_price: self.default_unit_price,
            billing_address,
            requires_course_info: self.requires_course_info,
            created_at: self.created_at.unwrap_or(now),
            updated_at: self.updated_at.unwrap_or(now),
        }
    }
}

impl From<&Invoice> for BackupInvoice {
    fn from(inv: &Invoice) -> Self {
        let course = inv.course_info.as_ref();
        BackupInvoice {
            id: inv.id.clone(),
            number: inv.number.clone(),
            client_id: inv.client_id.clone(),
            status: inv.status,
            subtotal: inv.subtotal,
            tax: inv.tax,
            total: inv.total,
            issued_date: Some(inv.issued_date),
            due_date: Some(inv.due_date),
            payment_terms_days: inv.payment_terms.as_ref().map(|t| t.days),
            payment_terms_description: inv.payment_terms.as_ref().map(|t| t.description.clone()),
            notes: inv.notes.clone(),
            payment_method: inv.payment_method.clone(),
            transaction_id: inv.transaction_id.clone(),
            payment_date: inv.payment_date,
            course_name: course.map(|c| c.course_name.clone()),
            course_id: course.map(|c| c.course_id.clone()),
            cohort: course.map(|c| c.cohort.clone()),
            training_dates: course.map(|c| c.training_dates.clone()),
            created_at: Some(inv.created_at),
            updated_at: Some(inv.updated_at),
            items: inv
                .items
                .iter()
                .map(|item| BackupItem {
                    id: item.id.clone(),
                    invoice_id: inv.id.clone(),
                    description: item.description.clone(),
                    quantity: item.quantity,
                    unit_price: item.unit_price,
                    amount: item.amount,
                })
                .collect(),
        }
    }
}

impl BackupInvoice {
    /// Materializes the invoice header for `tenant`.
    ///
    /// A missing due date comes from the payment terms when there are any;
    /// other missing dates fall back to `now`. Only items whose `invoice_id` is
    /// this invoice are attached; the rest belong to another parent.
    pub fn to_invoice(&self, tenant: &TenantId, now: DateTime<Utc>) -> Invoice {
        let today = now.date_naive();
        let issued_date = self.issued_date.unwrap_or(today);

        let payment_terms = self
            .payment_terms_days
            .map(|days| PaymentTerms::custom(days, self.payment_terms_description.as_deref()));

        let has_course = self.course_name.is_some()
            || self.course_id.is_some()
            || self.cohort.is_some()
            || self.training_dates.is_some();
        let course_info = has_course.then(|| CourseInfo {
            course_name: self.course_name.clone().unwrap_or_default(),
            course_id: self.course_id.clone().unwrap_or_default(),
            cohort: self.cohort.clone().unwrap_or_default(),
            training_dates: self.training_dates.clone().unwrap_or_default(),
        });

        Invoice {
            id: self.id.clone(),
            tenant_id: tenant.clone(),
            number: self.number.clone(),
            client_id: self.client_id.clone(),
            status: self.status,
            subtotal: self.subtotal,
            tax: self.tax,
            total: self.total,
            issued_date,
            due_date: self
                .due_date
                .or_else(|| payment_terms.as_ref().map(|t| t.due_date(issued_date)))
                .unwrap_or(today),
            payment_terms,
            payment_method: self.payment_method.clone(),
            transaction_id: self.transaction_id.clone(),
            payment_date: self.payment_date,
            course_info,
            notes: self.notes.clone(),
            items: self
                .items
                .iter()
                .filter(|item| item.invoice_id == self.id)
                .map(|item| InvoiceItem {
                    id: item.id.clone(),
                    description: item.description.clone(),
                    quantity: item.quantity,
                    unit_price: item.unit_price,
                    amount: item.amount,
                })
                .collect(),
            created_at: self.created_at.unwrap_or(now),
            updated_at: self.updated_at.unwrap_or(now),
        }
    }
}

// =============================================================================
// Export
// =============================================================================

/// Assembles a backup document. No validation: the inputs are canonical.
pub fn export(
    settings: Value,
    clients: &[Client],
    invoices: &[Invoice],
    now: DateTime<Utc>,
) -> BackupData {
    BackupData {
        version: BACKUP_VERSION.to_string(),
        timestamp: now.to_rfc3339(),
        settings,
        clients: clients.iter().map(BackupClient::from).collect(),
        invoices: invoices.iter().map(BackupInvoice::from).collect(),
    }
}

// =============================================================================
// Validate
// =============================================================================

fn not_present(field: &str) -> ValidationError {
    ValidationError::required(field)
}

fn wrong_shape(field: &str, expected: &str) -> ValidationError {
    ValidationError::InvalidFormat {
        field: field.to_string(),
        reason: format!("must be {expected}"),
    }
}

/// Follows a dotted path (`billingAddress.zipCode`) through nested objects.
fn lookup<'a>(obj: &'a Map<String, Value>, path: &str) -> Option<&'a Value> {
    let mut segments = path.split('.');
    let mut current = obj.get(segments.next()?)?;
    for segment in segments {
        current = current.as_object()?.get(segment)?;
    }
    Some(current)
}

fn is_absent(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::String(s) => s.trim().is_empty(),
        _ => false,
    }
}

/// First alias holding a present value.
fn first<'a>(obj: &'a Map<String, Value>, aliases: &[&str]) -> Option<&'a Value> {
    aliases
        .iter()
        .filter_map(|alias| lookup(obj, alias))
        .find(|v| !is_absent(v))
}

/// Text of a scalar; ids exported by older versions may be numbers.
fn scalar_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.trim().to_string()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

fn parse_date(s: &str) -> Option<NaiveDate> {
    let s = s.trim();
    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .ok()
        .or_else(|| DateTime::parse_from_rfc3339(s).ok().map(|dt| dt.with_timezone(&Utc).date_naive()))
        .or_else(|| NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S%.f").ok().map(|dt| dt.date()))
        .or_else(|| NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S%.f").ok().map(|dt| dt.date()))
        .or_else(|| NaiveDate::parse_from_str(s, "%b %d, %Y").ok())
}

fn parse_datetime(s: &str) -> Option<DateTime<Utc>> {
    let s = s.trim();
    DateTime::parse_from_rfc3339(s)
        .ok()
        .map(|dt| dt.with_timezone(&Utc))
        .or_else(|| NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S%.f").ok().map(|dt| dt.and_utc()))
        .or_else(|| NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S%.f").ok().map(|dt| dt.and_utc()))
        .or_else(|| parse_date(s).map(crate::types::start_of_day))
}

/// One entry of a backup array, with the context needed for error messages.
struct Record<'a> {
    entity: &'static str,
    id: String,
    obj: &'a Map<String, Value>,
}

impl<'a> Record<'a> {
    fn new(entity: &'static str, index: usize, value: &'a Value) -> ValidationResult<Self> {
        let obj = value.as_object().ok_or_else(|| {
            ValidationError::invalid_record(entity, format!("#{index}"), "entry must be an object")
        })?;
        let id = first(obj, &["id"])
            .and_then(scalar_text)
            .unwrap_or_else(|| format!("#{index}"));
        Ok(Record { entity, id, obj })
    }

    fn fail(&self, reason: impl Into<String>) -> ValidationError {
        ValidationError::invalid_record(self.entity, self.id.clone(), reason)
    }

    fn invalid(&self, field: &str, value: &Value, expected: &str) -> ValidationError {
        self.fail(format!("{field} must be {expected}, got {value}"))
    }

    fn text(&self, aliases: &[&str]) -> ValidationResult<Option<String>> {
        match first(self.obj, aliases) {
            None => Ok(None),
            Some(v) => scalar_text(v)
                .map(Some)
                .ok_or_else(|| self.invalid(aliases[0], v, "text")),
        }
    }

    fn text_or_empty(&self, aliases: &[&str]) -> ValidationResult<String> {
        Ok(self.text(aliases)?.unwrap_or_default())
    }

    fn number(&self, aliases: &[&str]) -> ValidationResult<Option<f64>> {
        let Some(v) = first(self.obj, aliases) else {
            return Ok(None);
        };
        let parsed = match v {
            Value::Number(n) => n.as_f64(),
            Value::String(s) => s.trim().parse::<f64>().ok(),
            _ => None,
        };
        match parsed {
            Some(n) if n.is_finite() => Ok(Some(n)),
            _ => Err(self.invalid(aliases[0], v, "a number")),
        }
    }

    fn money(&self, aliases: &[&str]) -> ValidationResult<Option<Money>> {
        Ok(self.number(aliases)?.map(Money::from_decimal))
    }

    fn days(&self, aliases: &[&str]) -> ValidationResult<Option<u32>> {
        match self.number(aliases)? {
            None => Ok(None),
            Some(n) if n >= 0.0 && n.fract() == 0.0 && n <= f64::from(u32::MAX) => Ok(Some(n as u32)),
            Some(n) => Err(self.fail(format!("{} must be a whole number of days, got {n}", aliases[0]))),
        }
    }

    fn flag(&self, aliases: &[&str]) -> ValidationResult<bool> {
        let Some(v) = first(self.obj, aliases) else {
            return Ok(false);
        };
        match v {
            Value::Bool(b) => Ok(*b),
            Value::Number(n) => Ok(n.as_f64().is_some_and(|n| n != 0.0)),
            Value::String(s) => match s.trim().to_ascii_lowercase().as_str() {
                "true" | "1" | "yes" => Ok(true),
                "false" | "0" | "no" => Ok(false),
                _ => Err(self.invalid(aliases[0], v, "true or false")),
            },
            _ => Err(self.invalid(aliases[0], v, "true or false")),
        }
    }

    fn date(&self, aliases: &[&str]) -> ValidationResult<Option<NaiveDate>> {
        match first(self.obj, aliases) {
            None => Ok(None),
            Some(v) => v
                .as_str()
                .and_then(parse_date)
                .map(Some)
                .ok_or_else(|| self.invalid(aliases[0], v, "a date")),
        }
    }

    fn datetime(&self, aliases: &[&str]) -> ValidationResult<Option<DateTime<Utc>>> {
        match first(self.obj, aliases) {
            None => Ok(None),
            Some(v) => v
                .as_str()
                .and_then(parse_datetime)
                .map(Some)
                .ok_or_else(|| self.invalid(aliases[0], v, "a timestamp")),
        }
    }

    /// `client_id`, `clientId`, then `client` as a string or an object with an `id`.
    fn client_ref(&self) -> ValidationResult<Option<String>> {
        if let Some(id) = self.text(&["client_id", "clientId"])? {
            return Ok(Some(id));
        }
        match first(self.obj, &["client"]) {
            None => Ok(None),
            Some(Value::Object(client)) => Ok(first(client, &["id"]).and_then(scalar_text)),
            Some(v) => scalar_text(v)
                .map(Some)
                .ok_or_else(|| self.invalid("client", v, "an id or an object with an id")),
        }
    }
}

fn validate_client(index: usize, value: &Value) -> ValidationResult<BackupClient> {
    let rec = Record::new("client", index, value)?;

    let id = rec.text(&["id"])?;
    let name = rec.text(&["name"])?;
    let (id, name) = match (id, name) {
        (Some(id), Some(name)) => (id, name),
        (id, name) => {
            let missing: Vec<&str> = [("id", id.is_none()), ("name", name.is_none())]
                .into_iter()
                .filter_map(|(field, gone)| gone.then_some(field))
                .collect();
            return Err(rec.fail(format!("missing required fields: {}", missing.join(", "))));
        }
    };

    let email = rec
        .text(&["email"])?
        .unwrap_or_else(|| format!("client-{id}@example.com"));

    Ok(BackupClient {
        email,
        phone: rec.text(&["phone"])?,
        address: rec.text_or_empty(&["address"])?,
        city: rec.text_or_empty(&["city"])?,
        state: rec.text_or_empty(&["state"])?,
        zip_code: rec.text_or_empty(&["zip_code", "zipCode"])?,
        tax_id: rec.text(&["tax_id", "taxId"])?,
        default_unit_price: rec.money(&["default_unit_price", "defaultUnitPrice"])?,
        billing_address_street: rec.text(&["billing_address_street", "billingAddress.address"])?,
        billing_address_city: rec.text(&["billing_address_city", "billingAddress.city"])?,
        billing_address_state: rec.text(&["billing_address_state", "billingAddress.state"])?,
        billing_address_zip: rec.text(&["billing_address_zip", "billingAddress.zipCode"])?,
        requires_course_info: rec.flag(&["requires_course_info", "requiresCourseInfo"])?,
        created_at: rec.datetime(&["created_at", "createdAt"])?,
        updated_at: rec.datetime(&["updated_at", "updatedAt"])?,
        id,
        name,
    })
}

fn validate_item(parent_id: &str, index: usize, value: &Value) -> ValidationResult<BackupItem> {
    let rec = Record::new("invoice item", index, value)?;

    let id = rec
        .text(&["id"])?
        .ok_or_else(|| rec.fail(format!("missing id (invoice '{parent_id}')")))?;

    let quantity = rec.number(&["quantity"])?.unwrap_or(1.0);
    let unit_price = rec
        .money(&["unit_price", "unitPrice", "price"])?
        .unwrap_or_default();
    let amount = rec
        .money(&["amount"])?
        .unwrap_or_else(|| unit_price.times_quantity(quantity));

    Ok(BackupItem {
        invoice_id: rec
            .text(&["invoice_id", "invoiceId"])?
            .unwrap_or_else(|| parent_id.to_string()),
        description: rec.text_or_empty(&["description"])?,
        id,
        quantity,
        unit_price,
        amount,
    })
}

fn validate_invoice(index: usize, value: &Value) -> ValidationResult<BackupInvoice> {
    let rec = Record::new("invoice", index, value)?;

    let id = rec.text(&["id"])?;
    let client_id = rec.client_ref()?;
    let number = rec.text(&["number", "invoice_number", "invoiceNumber"])?;

    let (id, client_id, number) = match (id, client_id, number) {
        (Some(id), Some(client), Some(number)) => (id, client, number),
        (id, client, number) => {
            let missing: Vec<&str> = [
                ("id", id.is_none()),
                ("client reference (client_id, clientId, client)", client.is_none()),
                ("number (number, invoice_number, invoiceNumber)", number.is_none()),
            ]
            .into_iter()
            .filter_map(|(field, gone)| gone.then_some(field))
            .collect();
            return Err(rec.fail(format!("missing required fields: {}", missing.join(", "))));
        }
    };

    let status = match rec.text(&["status"])? {
        None => InvoiceStatus::Pending,
        Some(s) => s.parse().map_err(|_| rec.fail(format!("unknown status '{s}'")))?,
    };

    let items = match first(rec.obj, &["items"]) {
        None => Vec::new(),
        Some(Value::Array(entries)) => entries
            .iter()
            .enumerate()
            .map(|(i, item)| validate_item(&id, i, item))
            .collect::<ValidationResult<Vec<_>>>()?,
        Some(v) => return Err(rec.invalid("items", v, "an array")),
    };

    Ok(BackupInvoice {
        status,
        subtotal: rec.money(&["subtotal"])?.unwrap_or_default(),
        tax: rec.money(&["tax", "taxAmount", "tax_amount"])?.unwrap_or_default(),
        total: rec.money(&["total", "amount"])?.unwrap_or_default(),
        issued_date: rec.date(&["issued_date", "issuedDate", "issueDate"])?,
        due_date: rec.date(&["due_date", "dueDate"])?,
        payment_terms_days: rec.days(&["payment_terms_days", "paymentTerms.days"])?,
        payment_terms_description: rec.text(&["payment_terms_description", "paymentTerms.description"])?,
        notes: rec.text(&["notes"])?,
        payment_method: rec.text(&["payment_method", "paymentMethod"])?,
        transaction_id: rec.text(&["transaction_id", "transactionId"])?,
        payment_date: rec.date(&["payment_date", "paymentDate"])?,
        course_name: rec.text(&["course_name", "courseInfo.courseName"])?,
        course_id: rec.text(&["course_id", "courseInfo.courseId"])?,
        cohort: rec.text(&["cohort", "courseInfo.cohort"])?,
        training_dates: rec.text(&["training_dates", "courseInfo.trainingDates"])?,
        created_at: rec.datetime(&["created_at", "createdAt"])?,
        updated_at: rec.datetime(&["updated_at", "updatedAt"])?,
        id,
        number,
        client_id,
        items,
    })
}

/// Checks an untrusted document and resolves every alias.
///
/// ## Rules
/// ```text
/// document         JSON object
/// version          present
/// timestamp        present
/// settings         JSON object
/// clients          array; every entry has id and name
/// invoices         array; every entry has id, a client reference and a number
/// items            array when present; every entry has id
/// typed fields     parse (status, money, dates) or the record is rejected
/// ```
///
/// ## Example
/// ```rust
/// use billbook_core::backup::validate;
/// use serde_json::json;
///
/// let raw = json!({
///     "version": "1.0.0",
///     "timestamp": "2025-01-15T00:00:00Z",
///     "settings": {},
///     "clients": [{ "id": "c1", "name": "Acme" }],
///     "invoices": [{ "id": "i1", "clientId": "c1", "invoiceNumber": "INV-2025-0001" }]
/// });
///
/// let data = validate(&raw).unwrap();
/// assert_eq!(data.invoices[0].client_id, "c1");
/// assert_eq!(data.invoices[0].number, "INV-2025-0001");
/// ```
pub fn validate(raw: &Value) -> ValidationResult<BackupData> {
    let doc = raw
        .as_object()
        .ok_or_else(|| wrong_shape("backup", "a JSON object"))?;

    let version = first(doc, &["version"])
        .and_then(scalar_text)
        .ok_or_else(|| not_present("version"))?;
    let timestamp = first(doc, &["timestamp"])
        .and_then(scalar_text)
        .ok_or_else(|| not_present("timestamp"))?;

    let settings = match doc.get("settings") {
        Some(v @ Value::Object(_)) => v.clone(),
        _ => return Err(wrong_shape("settings", "an object")),
    };
    let clients = doc
        .get("clients")
        .and_then(Value::as_array)
        .ok_or_else(|| wrong_shape("clients", "an array"))?;
    let invoices = doc
        .get("invoices")
        .and_then(Value::as_array)
        .ok_or_else(|| wrong_shape("invoices", "an array"))?;

    let clients = clients
        .iter()
        .enumerate()
        .map(|(i, c)| validate_client(i, c))
        .collect::<ValidationResult<Vec<_>>>()?;
    let invoices = invoices
        .iter()
        .enumerate()
        .map(|(i, inv)| validate_invoice(i, inv))
        .collect::<ValidationResult<Vec<_>>>()?;

    Ok(BackupData {
        version,
        timestamp,
        settings,
        clients,
        invoices,
    })
}

/// Parses and validates a backup from JSON text.
pub fn validate_str(json: &str) -> ValidationResult<BackupData> {
    let raw: Value = serde_json::from_str(json).map_err(|e| ValidationError::InvalidFormat {
        field: "backup".to_string(),
        reason: e.to_string(),
    })?;
    validate(&raw)
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{at, date, invoice};
    use serde_json::json;

    fn envelope(clients: Value, invoices: Value) -> Value {
        json!({
            "version": "1.0.0",
            "timestamp": "2025-01-15T00:00:00.000Z",
            "settings": {},
            "clients": clients,
            "invoices": invoices,
        })
    }

    fn client() -> Client {
        let now = at(2025, 1, 1);
        Client {
            id: "c1".into(),
            tenant_id: TenantId::new("user-1").unwrap(),
            name: "Acme".into(),
            email: "billing@acme.test".into(),
            phone: Some("555-0100".into()),
            address: "1 Main St".into(),
            city: "Springfield".into(),
            state: "IL".into(),
            zip_code: "62701".into(),
            tax_id: None,
            default_unit_price: Some(Money::from_cents(12550)),
            billing_address: Some(BillingAddress {
                address: "PO Box 9".into(),
                city: "Springfield".into(),
                state: "IL".into(),
                zip_code: "62702".into(),
            }),
            requires_course_info: true,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn test_export_then_validate_round_trip() {
        let mut inv = invoice("i1", InvoiceStatus::Paid, date(2025, 1, 31));
        inv.payment_terms = Some(PaymentTerms::default());
        inv.payment_date = Some(date(2025, 1, 20));
        inv.payment_method = Some("Check".into());
        inv.course_info = Some(CourseInfo {
            course_name: "Rust Fundamentals".into(),
            course_id: "RF-1".into(),
            cohort: "Spring".into(),
            training_dates: "Jan 6-8".into(),
        });

        let exported = export(json!({"company": {}}), &[client()], &[inv], at(2025, 2, 1));
        let raw = serde_json::to_value(&exported).unwrap();
        let restored = validate(&raw).unwrap();

        assert_eq!(restored, exported);
        assert_eq!(restored.version, "1.0.0");
    }

    #[test]
    fn test_domain_round_trip_through_backup_records() {
        let tenant = TenantId::new("user-1").unwrap();
        let original = client();
        let back = BackupClient::from(&original).to_client(&tenant, at(2030, 1, 1));
        assert_eq!(back, original);

        let inv = invoice("i1", InvoiceStatus::Pending, date(2025, 1, 31));
        let back = BackupInvoice::from(&inv).to_invoice(&tenant, at(2030, 1, 1));
        assert_eq!(back, inv);
    }

    #[test]
    fn test_aliases_resolve_to_canonical_names() {
        let raw = envelope(
            json!([{
                "id": "c1", "name": "Acme", "zipCode": "62701", "taxId": "TX-1",
                "defaultUnitPrice": "95.5", "requiresCourseInfo": true,
                "billingAddress": {"address": "PO Box 9", "city": "Springfield", "state": "IL", "zipCode": "62702"}
            }]),
            json!([{
                "id": "i1", "client": {"id": "c1", "name": "Acme"}, "invoiceNumber": "INV-2025-0001",
                "status": "paid", "taxAmount": 10, "amount": 210, "subtotal": 200,
                "issueDate": "Jan 05, 2025", "dueDate": "2025-02-04T00:00:00.000Z",
                "paymentTerms": {"days": 30, "description": "Net 30"},
                "paymentMethod": "Check", "transactionId": "TRX-1", "paymentDate": "2025-01-20",
                "courseInfo": {"courseName": "Rust", "cohort": "A"},
                "items": [{"id": "it1", "description": "Consulting", "quantity": 2, "price": 100}]
            }]),
        );

        let data = validate(&raw).unwrap();
        let c = &data.clients[0];
        assert_eq!(c.zip_code, "62701");
        assert_eq!(c.tax_id.as_deref(), Some("TX-1"));
        assert_eq!(c.default_unit_price, Some(Money::from_cents(9550)));
        assert!(c.requires_course_info);
        assert_eq!(c.billing_address_zip.as_deref(), Some("62702"));
        assert_eq!(c.email, "client-c1@example.com");

        let inv = &data.invoices[0];
        assert_eq!(inv.client_id, "c1");
        assert_eq!(inv.number, "INV-2025-0001");
        assert_eq!(inv.status, InvoiceStatus::Paid);
        assert_eq!(inv.tax.cents(), 1000);
        assert_eq!(inv.total.cents(), 21000);
        assert_eq!(inv.issued_date, Some(date(2025, 1, 5)));
        assert_eq!(inv.due_date, Some(date(2025, 2, 4)));
        assert_eq!(inv.payment_terms_days, Some(30));
        assert_eq!(inv.transaction_id.as_deref(), Some("TRX-1"));
        assert_eq!(inv.course_name.as_deref(), Some("Rust"));
        assert_eq!(inv.course_id, None);

        let item = &inv.items[0];
        assert_eq!(item.invoice_id, "i1");
        assert_eq!(item.unit_price.cents(), 10000);
        assert_eq!(item.amount.cents(), 20000);
    }

    #[test]
    fn test_client_ref_precedence() {
        let raw = envelope(
            json!([]),
            json!([{"id": "i1", "client_id": "first", "clientId": "second", "client": "third", "number": "N-1"}]),
        );
        assert_eq!(validate(&raw).unwrap().invoices[0].client_id, "first");

        let raw = envelope(
            json!([]),
            json!([{"id": "i1", "client_id": "", "clientId": null, "client": "third", "number": "N-1"}]),
        );
        assert_eq!(validate(&raw).unwrap().invoices[0].client_id, "third");
    }

    #[test]
    fn test_lenient_defaults() {
        let raw = envelope(
            json!([]),
            json!([{"id": 7, "clientId": 3, "number": "INV-2025-0007", "items": [{"id": "x", "unitPrice": 12.5}]}]),
        );
        let inv = &validate(&raw).unwrap().invoices[0];

        assert_eq!(inv.id, "7");
        assert_eq!(inv.client_id, "3");
        assert_eq!(inv.status, InvoiceStatus::Pending);
        assert!(inv.total.is_zero());
        assert!(inv.issued_date.is_none());
        assert_eq!(inv.items[0].quantity, 1.0);
        assert_eq!(inv.items[0].amount.cents(), 1250);
    }

    #[test]
    fn test_rejects_bad_envelope() {
        assert!(validate(&json!([])).is_err());
        assert_eq!(
            validate(&json!({"timestamp": "t", "settings": {}, "clients": [], "invoices": []})),
            Err(ValidationError::required("version"))
        );
        assert!(validate(&json!({"version": "1", "timestamp": "t", "settings": [], "clients": [], "invoices": []})).is_err());
        assert!(validate(&json!({"version": "1", "timestamp": "t", "settings": {}, "clients": {}, "invoices": []})).is_err());
    }

    #[test]
    fn test_rejects_client_without_name() {
        let raw = envelope(json!([{"id": "c1", "name": "Ok"}, {"id": "c2"}]), json!([]));
        let err = validate(&raw).unwrap_err();
        assert_eq!(
            err,
            ValidationError::invalid_record("client", "c2", "missing required fields: name")
        );
    }

    #[test]
    fn test_rejects_invoice_without_client_ref() {
        let raw = envelope(json!([]), json!([{"id": "inv-7", "number": "INV-2025-0007"}]));
        let err = validate(&raw).unwrap_err().to_string();
        assert!(err.contains("inv-7"));
        assert!(err.contains("client reference"));
    }

    #[test]
    fn test_rejects_unparsable_fields() {
        let bad_status = envelope(json!([]), json!([{"id": "i", "client_id": "c", "number": "n", "status": "void"}]));
        assert!(validate(&bad_status).is_err());

        let bad_date = envelope(json!([]), json!([{"id": "i", "client_id": "c", "number": "n", "dueDate": "soon"}]));
        assert!(validate(&bad_date).is_err());

        let bad_money = envelope(json!([]), json!([{"id": "i", "client_id": "c", "number": "n", "total": "lots"}]));
        assert!(validate(&bad_money).is_err());

        let item_without_id = envelope(
            json!([]),
            json!([{"id": "i", "client_id": "c", "number": "n", "items": [{"description": "x"}]}]),
        );
        assert!(validate(&item_without_id).is_err());
    }

    #[test]
    fn test_validate_str_reports_bad_json() {
        assert!(matches!(
            validate_str("{not json"),
            Err(ValidationError::InvalidFormat { .. })
        ));
    }

    #[test]
    fn test_missing_due_date_follows_payment_terms() {
        let raw = envelope(
            json!([{"id": "c1", "name": "Acme"}]),
            json!([
                {"id": "i1", "client_id": "c1", "number": "INV-2024-0001",
                 "issuedDate": "2024-12-01", "paymentTerms": {"days": 30}},
                {"id": "i2", "client_id": "c1", "number": "INV-2024-0002", "issuedDate": "2024-12-01"}
            ]),
        );
        let data = validate(&raw).unwrap();
        let tenant = TenantId::new("user-1").unwrap();
        let now = at(2025, 1, 15);

        let with_terms = data.invoices[0].to_invoice(&tenant, now);
        assert_eq!(with_terms.due_date, date(2024, 12, 31));
        assert_eq!(with_terms.payment_terms.map(|t| t.days), Some(30));

        let without_terms = data.invoices[1].to_invoice(&tenant, now);
        assert_eq!(without_terms.due_date, date(2025, 1, 15));
    }
}
