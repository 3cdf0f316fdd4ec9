//! # Database Error Types
//!
//! Error types for store operations, and the error callers of the catalog
//! and ledger services see.
//!
//! ## Error Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Error Propagation                                    │
//! │                                                                         │
//! │  SQLite Error (sqlx::Error)                                            │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  DbError ← categorized: unique / check / foreign key / busy / ...      │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  Service (BookCatalog, LoanLedger, ReferenceData)                      │
//! │       │  known constraint?  ──yes──►  LibraryError::Domain(CoreError)  │
//! │       │                                                                 │
//! │       └──no──►  LibraryError::Store(DbError)                           │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use libris_core::{CoreError, ErrorKind, ValidationError};
use thiserror::Error;

/// Database operation errors.
///
/// These errors wrap sqlx errors and provide additional context
/// for debugging and user feedback.
#[derive(Debug, Error)]
pub enum DbError {
    /// Entity not found in database.
    #[error("{entity} not found: {id}")]
    NotFound { entity: String, id: String },

    /// Unique constraint violation.
    ///
    /// `field` is SQLite's `table.column` list, e.g. `books.isbn`.
    #[error("Duplicate {field}: '{value}' already exists")]
    UniqueViolation { field: String, value: String },

    /// Named CHECK constraint violation, e.g. `reviews_rating_range`.
    #[error("Check constraint {constraint} failed")]
    CheckViolation { constraint: String },

    /// Foreign key constraint violation.
    #[error("Foreign key violation: {message}")]
    ForeignKeyViolation { message: String },

    /// Another connection holds the write lock past the busy timeout.
    #[error("Database busy: {0}")]
    Busy(String),

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

    /// Creates a UniqueViolation error.
    pub fn duplicate(field: impl Into<String>, value: impl Into<String>) -> Self {
        DbError::UniqueViolation {
            field: field.into(),
            value: value.into(),
        }
    }

    /// Fills in the offending value of a unique violation.
    ///
    /// SQLite only reports the column, repositories know the value.
    pub fn with_value(self, value: impl Into<String>) -> Self {
        match self {
            DbError::UniqueViolation { field, .. } => DbError::UniqueViolation {
                field,
                value: value.into(),
            },
            other => other,
        }
    }

    /// True when this is a unique violation on the given `table.column` list.
    pub fn violates_unique(&self, columns: &str) -> bool {
        matches!(self, DbError::UniqueViolation { field, .. } if field == columns)
    }

    /// True when this is a violation of the named CHECK constraint.
    pub fn violates_check(&self, name: &str) -> bool {
        matches!(self, DbError::CheckViolation { constraint } if constraint == name)
    }

    /// True for failures that may succeed if the call is repeated.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            DbError::Busy(_)
                | DbError::PoolExhausted
                | DbError::ConnectionFailed(_)
                | DbError::TransactionFailed(_)
        )
    }
}

/// SQLite primary result codes for lock contention.
const SQLITE_BUSY: i32 = 5;
const SQLITE_LOCKED: i32 = 6;

/// Convert sqlx errors to DbError.
///
/// ## Error Mapping
/// ```text
/// sqlx::Error::RowNotFound    → DbError::NotFound
/// sqlx::Error::Database       → Analyze message / code for constraint type
/// sqlx::Error::PoolTimedOut   → DbError::PoolExhausted
/// sqlx::Error::Io             → DbError::ConnectionFailed
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

                // SQLite constraint messages:
                // UNIQUE: "UNIQUE constraint failed: <table>.<column>[, ...]"
                // CHECK:  "CHECK constraint failed: <constraint name>"
                // FK:     "FOREIGN KEY constraint failed"
                if let Some(field) = msg.strip_prefix("UNIQUE constraint failed: ") {
                    DbError::UniqueViolation {
                        field: field.to_string(),
                        value: "unknown".to_string(),
                    }
                } else if let Some(constraint) = msg.strip_prefix("CHECK constraint failed: ") {
                    DbError::CheckViolation {
                        constraint: constraint.trim().to_string(),
                    }
                } else if msg.contains("FOREIGN KEY constraint failed") {
                    DbError::ForeignKeyViolation {
                        message: msg.to_string(),
                    }
                } else if is_lock_contention(db_err.code().as_deref(), msg) {
                    DbError::Busy(msg.to_string())
                } else {
                    DbError::QueryFailed(msg.to_string())
                }
            }

            sqlx::Error::PoolTimedOut => DbError::PoolExhausted,

            sqlx::Error::PoolClosed => DbError::ConnectionFailed("Pool is closed".to_string()),

            sqlx::Error::Io(io) => DbError::ConnectionFailed(io.to_string()),

            _ => DbError::Internal(err.to_string()),
        }
    }
}

fn is_lock_contention(code: Option<&str>, msg: &str) -> bool {
    let primary = code
        .and_then(|c| c.parse::<i32>().ok())
        .map(|c| c & 0xff);

    matches!(primary, Some(SQLITE_BUSY) | Some(SQLITE_LOCKED))
        || msg.contains("database is locked")
}

impl From<sqlx::migrate::MigrateError> for DbError {
    fn from(err: sqlx::migrate::MigrateError) -> Self {
        DbError::MigrationFailed(err.to_string())
    }
}

/// Result type for database operations.
pub type DbResult<T> = Result<T, DbError>;

// =============================================================================
// Library Error
// =============================================================================

/// Error returned by [`crate::BookCatalog`], [`crate::LoanLedger`] and
/// [`crate::ReferenceData`].
///
/// Callers match on [`LibraryError::kind`] and never need to know whether a
/// rule was caught by local validation or by the store.
#[derive(Debug, Error)]
pub enum LibraryError {
    /// A domain outcome: validation, constraint, not found, unavailable, ...
    #[error(transparent)]
    Domain(#[from] CoreError),

    /// A store failure with no domain meaning.
    #[error(transparent)]
    Store(#[from] DbError),
}

impl From<ValidationError> for LibraryError {
    fn from(err: ValidationError) -> Self {
        LibraryError::Domain(CoreError::Validation(err))
    }
}

impl LibraryError {
    /// Returns the taxonomy bucket for this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            LibraryError::Domain(err) => err.kind(),
            LibraryError::Store(
                DbError::UniqueViolation { .. }
                | DbError::CheckViolation { .. }
                | DbError::ForeignKeyViolation { .. },
            ) => ErrorKind::ConstraintViolation,
            LibraryError::Store(DbError::NotFound { .. }) => ErrorKind::NotFound,
            LibraryError::Store(_) => ErrorKind::Store,
        }
    }

    /// Returns the domain error, if this is one.
    pub fn as_domain(&self) -> Option<&CoreError> {
        match self {
            LibraryError::Domain(err) => Some(err),
            LibraryError::Store(_) => None,
        }
    }

    /// Returns true if the caller may retry the operation.
    ///
    /// ## Retryable
    /// - Lock contention, pool exhaustion, connection loss
    /// - A conditional update lost to a concurrent caller
    ///
    /// ## Never Retried
    /// - Validation and constraint violations
    /// - NotFound, Unavailable, AlreadyReturned
    pub fn is_retryable(&self) -> bool {
        match self {
            LibraryError::Domain(CoreError::ConcurrencyConflict { .. }) => true,
            LibraryError::Domain(_) => false,
            LibraryError::Store(err) => err.is_transient(),
        }
    }
}

/// Result type for service operations.
pub type LibraryResult<T> = Result<T, LibraryError>;

// =============================================================================
// Unit Tests
// =============================================================================
