//! # Error Types
//!
//! Domain-specific error types for billbook-core.
//!
//! ## Error Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Error Types                                     │
//! │                                                                         │
//! │  billbook-core errors (this file)                                      │
//! │  ├── CoreError        - Business rule violations                       │
//! │  └── ValidationError  - Malformed input / backup payloads              │
//! │                                                                         │
//! │  billbook-db errors (separate crate)                                   │
//! │  └── DbError          - NotFound / Conflict / Validation / Storage     │
//! │                                                                         │
//! │  Flow: ValidationError → CoreError → DbError → CLI (anyhow)            │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Design Principles
//! 1. Use `thiserror` for derive macros (not manual impl)
//! 2. Include context in error messages (invoice number, client ID, etc.)
//! 3. Errors are enum variants, never String

use thiserror::Error;

// =============================================================================
// Core Error
// =============================================================================

/// Core business logic errors.
#[derive(Debug, Error)]
pub enum CoreError {
    /// Client does not exist, or belongs to another tenant.
    ///
    /// Both cases are reported identically so a caller cannot test for
    /// other tenants' records.
    #[error("Client not found: {0}")]
    ClientNotFound(String),

    /// Invoice does not exist, or belongs to another tenant.
    #[error("Invoice not found: {0}")]
    InvoiceNotFound(String),

    /// Client still has invoices and cannot be deleted.
    ///
    /// ## User Workflow
    /// ```text
    /// Delete client "Acme"
    ///      │
    ///      ▼
    /// Count invoices for Acme: 3
    ///      │
    ///      ▼
    /// ClientHasInvoices { client_id, invoice_count: 3 }
    ///      │
    ///      ▼
    /// UI shows: "Cannot delete client with existing invoices"
    /// ```
    #[error("Cannot delete client {client_id}: {invoice_count} invoice(s) still reference it")]
    ClientHasInvoices {
        client_id: String,
        invoice_count: i64,
    },

    /// Client is flagged `requires_course_info` but the invoice has none.
    #[error("Client {client_id} requires course information on every invoice")]
    CourseInfoRequired { client_id: String },

    /// Caller identity could not be established.
    #[error("Unauthenticated")]
    Unauthenticated,

    /// Validation error (wraps ValidationError).
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),
}

// =============================================================================
// Validation Error
// =============================================================================

/// Input validation errors.
///
/// Used both for interactive input (client forms, invoice drafts) and for
/// backup payloads, where `InvalidRecord` names the offending entry.
#[derive(Debug, Error, PartialEq)]
pub enum ValidationError {
    /// A required field is missing or empty.
    #[error("{field} is required")]
    Required { field: String },

    /// Field value is too long.
    #[error("{field} must be at most {max} characters")]
    TooLong { field: String, max: usize },

    /// Value must be positive.
    #[error("{field} must be positive")]
    MustBePositive { field: String },

    /// Numeric value is out of range.
    #[error("{field} must be between {min} and {max}")]
    OutOfRange { field: String, min: i64, max: i64 },

    /// Invalid format (e.g., invalid UUID, invalid date).
    #[error("{field} has invalid format: {reason}")]
    InvalidFormat { field: String, reason: String },

    /// Value is not in allowed set.
    #[error("{field} must be one of: {allowed:?}")]
    NotAllowed { field: String, allowed: Vec<String> },

    /// A record inside a backup payload is unusable.
    ///
    /// ## Example
    /// ```text
    /// Invalid invoice 'inv-7': missing client reference (client_id, clientId, client)
    /// ```
    #[error("Invalid {entity} '{id}': {reason}")]
    InvalidRecord {
        entity: String,
        id: String,
        reason: String,
    },
}

impl ValidationError {
    /// Shorthand for [`ValidationError::Required`].
    pub fn required(field: impl Into<String>) -> Self {
        ValidationError::Required {
            field: field.into(),
        }
    }

    /// Shorthand for [`ValidationError::InvalidRecord`].
    pub fn invalid_record(
        entity: impl Into<String>,
        id: impl Into<String>,
        reason: impl Into<String>,
    ) -> Self {
        ValidationError::InvalidRecord {
            entity: entity.into(),
            id: id.into(),
            reason: reason.into(),
        }
    }
}

// =============================================================================
// Result Type Alias
// =============================================================================

/// Convenience type alias for Results with CoreError.
pub type CoreResult<T> = Result<T, CoreError>;

// =============================================================================
// Unit Tests
// =============================================================================
