//! # Error Types
//!
//! Domain-specific error types for libris-core.
//!
//! ## Error Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Error Types                                     │
//! │                                                                         │
//! │  libris-core errors (this file)                                        │
//! │  ├── ValidationError  - Shape rules broken before any write            │
//! │  ├── CoreError        - Domain outcomes (duplicate, unavailable, ...)  │
//! │  └── ErrorKind        - Coarse taxonomy callers branch on              │
//! │                                                                         │
//! │  libris-db errors (separate crate)                                     │
//! │  ├── DbError          - Raw store failures                             │
//! │  └── LibraryError     - What Catalog / Ledger callers see              │
//! │                                                                         │
//! │  Flow: ValidationError → CoreError → LibraryError ← DbError            │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Design Principles
//! 1. Use `thiserror` for derive macros (not manual impl)
//! 2. Every message names the offending field or entity key
//! 3. Errors are enum variants, never String
//! 4. A violation caught by the store maps to the same variant as the
//!    local check that should have caught it

use chrono::{DateTime, Utc};
use serde::Serialize;
use thiserror::Error;

// =============================================================================
// Error Kind
// =============================================================================

/// Coarse error taxonomy.
///
/// ## Mapping
/// ```text
/// Validation          ← InvalidIsbn, TitleTooLong, LoanDurationExceeded, ...
/// ConstraintViolation ← DuplicateIsbn, DuplicateCategory, RatingOutOfRange,
///                       BookOnLoan, CopiesBelowOutstanding, UnknownReference
/// NotFound            ← NotFound
/// Unavailable         ← Unavailable
/// AlreadyReturned     ← AlreadyReturned
/// ConcurrencyConflict ← ConcurrencyConflict
/// Store               ← anything the database layer could not classify
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    Validation,
    ConstraintViolation,
    NotFound,
    Unavailable,
    AlreadyReturned,
    ConcurrencyConflict,
    Store,
}

// =============================================================================
// Core Error
// =============================================================================

/// Domain errors for catalog and lending operations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CoreError {
    /// Validation error (wraps ValidationError).
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    /// A book with this ISBN is already in the catalog.
    #[error("Duplicate isbn: '{isbn}' already exists")]
    DuplicateIsbn { isbn: String },

    /// A category with this name already exists.
    #[error("Duplicate category name: '{name}' already exists")]
    DuplicateCategory { name: String },

    /// The association row (book, author) or (book, category) already exists.
    #[error("Book {book_id} is already linked to {relation} {other_id}")]
    DuplicateAssociation {
        book_id: String,
        relation: String,
        other_id: String,
    },

    /// A foreign key points to a row that does not exist.
    #[error("Unknown {entity} reference: {id}")]
    UnknownReference { entity: String, id: String },

    /// Lookup, delete or update target is absent.
    #[error("{entity} not found: {key}")]
    NotFound { entity: String, key: String },

    /// No copies of the book are left to lend.
    ///
    /// ## When This Occurs
    /// ```text
    /// issue_loan(book_id)
    ///      │
    ///      ▼
    /// UPDATE books SET available = available - 1
    /// WHERE id = ? AND available > 0        ← 0 rows affected
    ///      │
    ///      ▼
    /// Unavailable { book_id }
    /// ```
    #[error("No copies of book {book_id} are available")]
    Unavailable { book_id: String },

    /// The loan was already closed.
    #[error("Loan {loan_id} has already been returned")]
    AlreadyReturned { loan_id: String },

    /// The book still has copies out on loan and cannot be removed.
    #[error("Book {isbn} has {open_loans} open loan(s) and cannot be removed")]
    BookOnLoan { isbn: String, open_loans: i64 },

    /// `copies` would drop below the number of copies currently lent out.
    #[error("Cannot set copies of book {isbn} to {requested}: {on_loan} copies are on loan")]
    CopiesBelowOutstanding {
        isbn: String,
        requested: i64,
        on_loan: i64,
    },

    /// A conditional update lost for a reason other than availability.
    #[error("Concurrent modification of {entity} {key}, retry the operation")]
    ConcurrencyConflict { entity: String, key: String },
}

impl CoreError {
    /// Creates a NotFound error for a given entity type and key.
    pub fn not_found(entity: impl Into<String>, key: impl Into<String>) -> Self {
        CoreError::NotFound {
            entity: entity.into(),
            key: key.into(),
        }
    }

    /// Creates a ConcurrencyConflict error.
    pub fn conflict(entity: impl Into<String>, key: impl Into<String>) -> Self {
        CoreError::ConcurrencyConflict {
            entity: entity.into(),
            key: key.into(),
        }
    }

    /// Returns the taxonomy bucket for this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            CoreError::Validation(err) => err.kind(),
            CoreError::DuplicateIsbn { .. }
            | CoreError::DuplicateCategory { .. }
            | CoreError::DuplicateAssociation { .. }
            | CoreError::UnknownReference { .. }
            | CoreError::BookOnLoan { .. }
            | CoreError::CopiesBelowOutstanding { .. } => ErrorKind::ConstraintViolation,
            CoreError::NotFound { .. } => ErrorKind::NotFound,
            CoreError::Unavailable { .. } => ErrorKind::Unavailable,
            CoreError::AlreadyReturned { .. } => ErrorKind::AlreadyReturned,
            CoreError::ConcurrencyConflict { .. } => ErrorKind::ConcurrencyConflict,
        }
    }
}

// =============================================================================
// Validation Error
// =============================================================================

/// Input validation errors.
///
/// These are raised by [`crate::validation`] before anything reaches the
/// store, and re-raised by libris-db when the matching CHECK constraint
/// fires.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    /// ISBN is not exactly 13 characters.
    #[error("isbn '{isbn}' must be exactly 13 characters, got {length}")]
    InvalidIsbn { isbn: String, length: usize },

    /// Title exceeds the maximum length.
    #[error("title must be at most 200 characters, got {length}")]
    TitleTooLong { length: usize },

    /// Rating is outside 1..=5.
    #[error("rating {rating} must be between 1 and 5")]
    RatingOutOfRange { rating: i64 },

    /// Loan period is longer than allowed.
    #[error("loan period of {days} days exceeds the maximum of 30 days")]
    LoanDurationExceeded { days: i64 },

    /// Due date precedes the loan date.
    #[error("due_date {due_date} is before loan_date {loan_date}")]
    DueBeforeLoan {
        loan_date: DateTime<Utc>,
        due_date: DateTime<Utc>,
    },

    /// Copy count is negative.
    #[error("copies must not be negative, got {copies}")]
    NegativeCopies { copies: i64 },

    /// A required field is missing or blank.
    #[error("{field} is required")]
    Required { field: String },
}

impl ValidationError {
    /// Returns the taxonomy bucket for this error.
    ///
    /// The rating range is a schema CHECK constraint, so it reports as a
    /// constraint violation wherever it is caught.
    pub fn kind(&self) -> ErrorKind {
        match self {
            ValidationError::RatingOutOfRange { .. } => ErrorKind::ConstraintViolation,
            _ => ErrorKind::Validation,
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
