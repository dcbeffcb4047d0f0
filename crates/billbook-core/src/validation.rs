//! # Validation Module
//!
//! Input validation for clients, invoice drafts and courses.
//!
//! ## Validation Strategy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      Validation Layers                                  │
//! │                                                                         │
//! │  Layer 1: Deserialization (serde)                                      │
//! │  └── Shape and type of the input                                       │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 2: THIS MODULE                                                  │
//! │  ├── Required fields, lengths, positive quantities                     │
//! │  └── Course info when the client demands it                            │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 3: Database (SQLite)                                            │
//! │  ├── NOT NULL / CHECK constraints                                      │
//! │  └── Foreign key constraints                                           │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Backup payloads are validated separately in [`crate::backup`], because
//! they are deliberately lenient about field names and missing values.

use crate::error::ValidationError;
use crate::money::Money;
use crate::types::{CourseInfo, InvoiceDraft, NewClient, NewInvoiceItem};
use crate::MAX_NAME_LENGTH;

/// Result type for validation operations.
pub type ValidationResult<T> = Result<T, ValidationError>;

// =============================================================================
// String Validators
// =============================================================================

fn required_text(field: &str, value: &str, max: usize) -> ValidationResult<()> {
    let value = value.trim();

    if value.is_empty() {
        return Err(ValidationError::required(field));
    }

    if value.chars().count() > max {
        return Err(ValidationError::TooLong {
            field: field.to_string(),
            max,
        });
    }

    Ok(())
}

/// Validates a client or course display name.
///
/// ## Example
/// ```rust
/// use billbook_core::validation::validate_name;
///
/// assert!(validate_name("Acme Training Ltd").is_ok());
/// assert!(validate_name("   ").is_err());
/// ```
pub fn validate_name(name: &str) -> ValidationResult<()> {
    required_text("name", name, MAX_NAME_LENGTH)
}

/// Validates an email address.
///
/// Only the shape `local@domain` is checked; deliverability is not our concern.
pub fn validate_email(email: &str) -> ValidationResult<()> {
    required_text("email", email, 254)?;

    let email = email.trim();
    match email.split_once('@') {
        Some((local, domain)) if !local.is_empty() && !domain.is_empty() && !domain.contains('@') => {
            Ok(())
        }
        _ => Err(ValidationError::InvalidFormat {
            field: "email".to_string(),
            reason: "must look like name@domain".to_string(),
        }),
    }
}

/// Validates a search query and returns it trimmed.
///
/// ## Rules
/// - Can be empty (callers return the default listing)
/// - Maximum 100 characters
pub fn validate_search_query(query: &str) -> ValidationResult<String> {
    let query = query.trim();

    if query.chars().count() > 100 {
        return Err(ValidationError::TooLong {
            field: "query".to_string(),
            max: 100,
        });
    }

    Ok(query.to_string())
}

/// Validates a manually entered invoice number.
///
/// Any non-blank text is accepted so that numbers from older numbering
/// schemes survive; the generator only ever produces `INV-YYYY-NNNN`.
pub fn validate_invoice_number(number: &str) -> ValidationResult<()> {
    required_text("number", number, 50)
}

// =============================================================================
// Numeric Validators
// =============================================================================

/// Validates a line-item quantity.
///
/// ## Rules
/// - Must be a finite number greater than zero
/// - Fractions are fine (1.5 hours)
///
/// ## Example
/// ```rust
/// use billbook_core::validation::validate_quantity;
///
/// assert!(validate_quantity(0.5).is_ok());
/// assert!(validate_quantity(0.0).is_err());
/// assert!(validate_quantity(f64::NAN).is_err());
/// ```
pub fn validate_quantity(qty: f64) -> ValidationResult<()> {
    if !qty.is_finite() || qty <= 0.0 {
        return Err(ValidationError::MustBePositive {
            field: "quantity".to_string(),
        });
    }

    Ok(())
}

/// Validates a monetary amount that may be zero but not negative.
pub fn validate_non_negative(field: &str, amount: Money) -> ValidationResult<()> {
    if amount.is_negative() {
        return Err(ValidationError::OutOfRange {
            field: field.to_string(),
            min: 0,
            max: i64::MAX,
        });
    }

    Ok(())
}

// =============================================================================
// Entity Validators
// =============================================================================

/// Validates input for a new client.
pub fn validate_new_client(client: &NewClient) -> ValidationResult<()> {
    validate_name(&client.name)?;
    validate_email(&client.email)?;

    if let Some(price) = client.default_unit_price {
        validate_non_negative("default_unit_price", price)?;
    }

    Ok(())
}

/// Validates one invoice line.
pub fn validate_item(item: &NewInvoiceItem) -> ValidationResult<()> {
    required_text("description", &item.description, 500)?;
    validate_quantity(item.quantity)?;
    validate_non_negative("unit_price", item.unit_price)
}

/// Validates course information attached to an invoice.
///
/// Only the course name is mandatory; id, cohort and dates are optional text.
pub fn validate_course_info(info: &CourseInfo) -> ValidationResult<()> {
    required_text("course_name", &info.course_name, MAX_NAME_LENGTH)
}

/// Validates an invoice draft before it is persisted.
///
/// ## Rules
/// ```text
/// client_id      non-blank
/// number         non-blank when given
/// items          at least one, each valid
/// tax            ≥ 0
/// due date       explicit, or derivable from payment terms,
///                and not before the issue date
/// course info    course name present when given
/// ```
///
/// Whether course info is *required* depends on the client and is checked
/// by the repository, which can see the client row.
pub fn validate_invoice_draft(draft: &InvoiceDraft) -> ValidationResult<()> {
    if draft.client_id.trim().is_empty() {
        return Err(ValidationError::required("client_id"));
    }

    if let Some(number) = &draft.number {
        validate_invoice_number(number)?;
    }

    if draft.items.is_empty() {
        return Err(ValidationError::required("items"));
    }
    for item in &draft.items {
        validate_item(item)?;
    }

    validate_non_negative("tax", draft.tax)?;

    let due = draft.resolve_due_date()?;
    if due < draft.issued_date {
        return Err(ValidationError::InvalidFormat {
            field: "due_date".to_string(),
            reason: "must not be before the issue date".to_string(),
        });
    }

    if let Some(info) = &draft.course_info {
        validate_course_info(info)?;
    }

    Ok(())
}

// =============================================================================
// Unit Tests
// =============================================================================
