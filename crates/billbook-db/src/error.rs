//! # Database Error Types
//!
//! Error types for database operations.
//!
//! ## Error Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Error Propagation                                    │
//! │                                                                         │
//! │  SQLite Error (sqlx::Error)        CoreError / ValidationError         │
//! │       │                                   │                             │
//! │       ▼                                   ▼                             │
//! │  DbError (this module) ← Adds context and categorization               │
//! │       │                                                                 │
//! │       │   NotFound      entity missing or owned by another tenant      │
//! │       │   Conflict      referential invariant would break              │
//! │       │   Validation    malformed input / backup payload               │
//! │       │   (the rest)    storage failure; transaction rolled back       │
//! │       ▼                                                                 │
//! │  CLI (anyhow) ← Prints the message, exits non-zero                     │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use billbook_core::{CoreError, ValidationError};
use thiserror::Error;

/// Database operation errors.
///
/// These errors wrap sqlx errors and domain errors and provide additional
/// context for debugging and user feedback.
#[derive(Debug, Error)]
pub enum DbError {
    /// Entity not found in database.
    ///
    /// ## When This Occurs
    /// - ID doesn't exist
    /// - ID exists but belongs to another tenant (reported identically)
    #[error("{entity} not found: {id}")]
    NotFound { entity: String, id: String },

    /// The operation would break a referential invariant.
    ///
    /// ## When This Occurs
    /// - Deleting a client that still has invoices
    /// - Invoice for a course-info client without course info
    /// - Backup record whose id is already owned by another tenant
    #[error("Conflict: {message}")]
    Conflict { message: String },

    /// Input rejected before any write.
    #[error("Validation failed: {0}")]
    Validation(#[from] ValidationError),

    /// Caller identity could not be established.
    #[error("Unauthenticated")]
    Unauthenticated,

    /// Unique constraint violation.
    ///
    /// ## When This Occurs
    /// - Duplicate course name for a tenant
    /// - Any UNIQUE index violation
    #[error("Duplicate {field}: '{value}' already exists")]
    UniqueViolation { field: String, value: String },

    /// Foreign key constraint violation.
    ///
    /// ## When This Occurs
    /// - Invoice referencing a non-existent client
    /// - Invoice item referencing a non-existent invoice
    #[error("Foreign key violation: {message}")]
    ForeignKeyViolation { message: String },

    /// Database connection failed.
    ///
    /// ## When This Occurs
    /// - Database file doesn't exist and can't be created
    /// - File permissions issue
    /// - Disk full
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    /// Migration failed.
    #[error("Migration failed: {0}")]
    MigrationFailed(String),

    /// Query execution failed.
    #[error("Query failed: {0}")]
    QueryFailed(String),

    /// Transaction failed.
    #[error("Transaction failed: {0}")]
    TransactionFailed(String),

    /// Pool exhausted (all connections in use).
    #[error("Connection pool exhausted")]
    PoolExhausted,

    /// Internal database error.
    #[error("Internal database error: {0}")]
    Internal(String),
}

impl DbError {
    /// Creates a NotFound error for a given entity type and ID.
    pub fn not_found(entity: impl Into<String>, id: impl Into<String>) -> Self {
        DbError::NotFound {
            entity: entity.into(),
            id: id.into(),
        }
    }

    /// Creates a Conflict error.
    pub fn conflict(message: impl Into<String>) -> Self {
        DbError::Conflict {
            message: message.into(),
        }
    }

    /// True for failures of the storage engine itself (the `StorageError` class).
    pub fn is_storage(&self) -> bool {
        !matches!(
            self,
            DbError::NotFound { .. }
                | DbError::Conflict { .. }
                | DbError::Validation(_)
                | DbError::Unauthenticated
        )
    }
}

/// Convert sqlx errors to DbError.
///
/// ## Error Mapping
/// ```text
/// sqlx::Error::RowNotFound    → DbError::NotFound
/// sqlx::Error::Database       → Analyze message for constraint type
/// sqlx::Error::PoolTimedOut   → DbError::PoolExhausted
/// Other                       → DbError::Internal
/// ```
impl From<sqlx::Error> for DbError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::RowNotFound => DbError::NotFound {
                entity: "Record".to_string(),
                id: "unknown".to_string(),
            },

            sqlx::Error::Database(db_err) => {
                let msg = db_err.message();

                // SQLite error messages for constraints:
                // UNIQUE constraint: "UNIQUE constraint failed: <table>.<column>"
                // FK constraint: "FOREIGN KEY constraint failed"
                if msg.contains("UNIQUE constraint failed") {
                    let field = msg
                        .split("UNIQUE constraint failed: ")
                        .nth(1)
                        .unwrap_or("unknown")
                        .to_string();
                    DbError::UniqueViolation {
                        field,
                        value: "unknown".to_string(),
                    }
                } else if msg.contains("FOREIGN KEY constraint failed") {
                    DbError::ForeignKeyViolation {
                        message: msg.to_string(),
                    }
                } else {
                    DbError::QueryFailed(msg.to_string())
                }
            }

            sqlx::Error::PoolTimedOut => DbError::PoolExhausted,

            sqlx::Error::PoolClosed => DbError::ConnectionFailed("Pool is closed".to_string()),

            _ => DbError::Internal(err.to_string()),
        }
    }
}

impl From<sqlx::migrate::MigrateError> for DbError {
    fn from(err: sqlx::migrate::MigrateError) -> Self {
        DbError::MigrationFailed(err.to_string())
    }
}

/// Settings documents are stored as JSON text.
impl From<serde_json::Error> for DbError {
    fn from(err: serde_json::Error) -> Self {
        DbError::Internal(format!("JSON encoding failed: {err}"))
    }
}

/// Maps domain errors onto the storage taxonomy.
impl From<CoreError> for DbError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::ClientNotFound(id) => DbError::not_found("Client", id),
            CoreError::InvoiceNotFound(id) => DbError::not_found("Invoice", id),
            CoreError::Validation(v) => DbError::Validation(v),
            CoreError::Unauthenticated => DbError::Unauthenticated,
            rule @ (CoreError::ClientHasInvoices { .. } | CoreError::CourseInfoRequired { .. }) => {
                DbError::conflict(rule.to_string())
            }
        }
    }
}

/// Result type for database operations.
pub type DbResult<T> = Result<T, DbError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_core_error_mapping() {
        let err: DbError = CoreError::ClientHasInvoices {
            client_id: "c1".into(),
            invoice_count: 2,
        }
        .into();
        assert!(matches!(err, DbError::Conflict { .. }));
        assert!(!err.is_storage());

        let err: DbError = CoreError::InvoiceNotFound("i9".into()).into();
        assert_eq!(err.to_string(), "Invoice not found: i9");

        assert!(DbError::QueryFailed("boom".into()).is_storage());
    }
}
