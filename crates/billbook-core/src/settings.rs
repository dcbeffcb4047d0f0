//! # Settings
//!
//! Per-tenant business profile: company details, payment instructions and
//! invoice defaults. Stored as one JSON document per tenant, created with
//! [`Settings::default`] on first access and replaced wholesale on save.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::ValidationError;
use crate::types::{InvoiceStatus, PaymentTerms};
use crate::validation::ValidationResult;
use crate::DEFAULT_PAYMENT_METHOD;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CompanyDetails {
    pub name: String,
    pub address: String,
    pub city: String,
    pub state: String,
    pub zip_code: String,
    pub email: String,
    pub phone: String,
    pub website: Option<String>,
    pub tax_id: Option<String>,
    pub logo: Option<String>,
}

impl Default for CompanyDetails {
    fn default() -> Self {
        CompanyDetails {
            name: "Your Company".to_string(),
            address: String::new(),
            city: String::new(),
            state: String::new(),
            zip_code: String::new(),
            email: String::new(),
            phone: String::new(),
            website: None,
            tax_id: None,
            logo: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct BankTransferInfo {
    pub bank_name: String,
    pub account_name: String,
    pub account_number: String,
    pub iban: Option<String>,
    pub swift_bic: Option<String>,
    pub currency: String,
    pub routing_number: Option<String>,
}

impl Default for BankTransferInfo {
    fn default() -> Self {
        BankTransferInfo {
            bank_name: String::new(),
            account_name: String::new(),
            account_number: String::new(),
            iban: None,
            swift_bic: None,
            currency: "USD".to_string(),
            routing_number: None,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CheckInfo {
    pub payee_name: String,
    pub mailing_address: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PaymentSettings {
    pub bank_transfer: BankTransferInfo,
    pub check: CheckInfo,
    pub accepted_methods: Vec<String>,
    pub payment_instructions: Option<String>,
}

impl Default for PaymentSettings {
    fn default() -> Self {
        PaymentSettings {
            bank_transfer: BankTransferInfo::default(),
            check: CheckInfo::default(),
            accepted_methods: vec![
                DEFAULT_PAYMENT_METHOD.to_string(),
                "Check".to_string(),
                "Credit Card".to_string(),
            ],
            payment_instructions: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct InvoiceDefaults {
    pub payment_terms: PaymentTerms,
    /// Status given to new invoices: `draft` or `pending`.
    pub default_status: InvoiceStatus,
    pub currency: String,
    /// Percentage, e.g. `8.25`.
    pub tax_rate: f64,
    pub invoice_notes: Option<String>,
    pub invoice_footer: Option<String>,
}

impl Default for InvoiceDefaults {
    fn default() -> Self {
        InvoiceDefaults {
            payment_terms: PaymentTerms::default(),
            default_status: InvoiceStatus::Draft,
            currency: "USD".to_string(),
            tax_rate: 0.0,
            invoice_notes: None,
            invoice_footer: None,
        }
    }
}

/// The whole settings document for one tenant.
///
/// Unknown or missing sections deserialize to their defaults, so documents
/// written by older versions still load.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Settings {
    pub company: CompanyDetails,
    pub payment: PaymentSettings,
    pub invoice_defaults: InvoiceDefaults,
    /// Stamped by the repository on every save.
    pub last_updated: Option<DateTime<Utc>>,
}

impl Settings {
    /// First accepted payment method, used when a payment is recorded without one.
    pub fn default_payment_method(&self) -> &str {
        self.payment
            .accepted_methods
            .iter()
            .map(|m| m.trim())
            .find(|m| !m.is_empty())
            .unwrap_or(DEFAULT_PAYMENT_METHOD)
    }

    pub fn validate(&self) -> ValidationResult<()> {
        if !matches!(
            self.invoice_defaults.default_status,
            InvoiceStatus::Draft | InvoiceStatus::Pending
        ) {
            return Err(ValidationError::NotAllowed {
                field: "invoiceDefaults.defaultStatus".to_string(),
                allowed: vec!["draft".to_string(), "pending".to_string()],
            });
        }

        let rate = self.invoice_defaults.tax_rate;
        if !rate.is_finite() || !(0.0..=100.0).contains(&rate) {
            return Err(ValidationError::OutOfRange {
                field: "invoiceDefaults.taxRate".to_string(),
                min: 0,
                max: 100,
            });
        }

        Ok(())
    }
}
