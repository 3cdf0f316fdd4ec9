//! # libris-core: Pure Domain Logic for Libris
//!
//! This crate holds the catalog and lending domain as plain types and pure
//! functions with zero I/O dependencies.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Libris Architecture                             │
//! │                                                                         │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │              Callers (CLI, HTTP handler, seed binary)           │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │         libris-db: BookCatalog • LoanLedger • ReferenceData     │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │ uses                                   │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │               ★ libris-core (THIS CRATE) ★                      │   │
//! │  │                                                                 │   │
//! │  │   ┌───────────┐   ┌──────────────┐   ┌───────────────┐         │   │
//! │  │   │   types   │   │  validation  │   │     error     │         │   │
//! │  │   │ Book      │   │ isbn, title  │   │ CoreError     │         │   │
//! │  │   │ BookLoan  │   │ rating, loan │   │ ErrorKind     │         │   │
//! │  │   └───────────┘   └──────────────┘   └───────────────┘         │   │
//! │  │                                                                 │   │
//! │  │   NO I/O • NO DATABASE • NO NETWORK • PURE FUNCTIONS           │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`types`] - Domain types (Book, BookLoan, Author, Review, etc.)
//! - [`validation`] - Shape rules checked before any write
//! - [`error`] - Domain error types and the error taxonomy
//!
//! ## Example Usage
//!
//! ```rust
//! use chrono::{Duration, Utc};
//! use libris_core::validation::{validate_isbn, validate_loan_period};
//!
//! assert!(validate_isbn("9780000000001").is_ok());
//! assert!(validate_isbn("978-0-123").is_err());
//!
//! let loan_date = Utc::now();
//! assert!(validate_loan_period(loan_date, loan_date + Duration::days(30)).is_ok());
//! assert!(validate_loan_period(loan_date, loan_date + Duration::days(31)).is_err());
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod types;
pub mod validation;

// =============================================================================
// Re-exports for Convenience
// =============================================================================

pub use error::{CoreError, CoreResult, ErrorKind, ValidationError};
pub use types::*;

// =============================================================================
// Crate-Level Constants
// =============================================================================

/// Exact length of an ISBN, in characters.
pub const ISBN_LENGTH: usize = 13;

/// Maximum title length, in characters. Empty titles are allowed.
pub const MAX_TITLE_LENGTH: usize = 200;

/// Longest permitted loan, in days (inclusive).
pub const MAX_LOAN_DAYS: i64 = 30;

/// Lowest review rating.
pub const MIN_RATING: i64 = 1;

/// Highest review rating.
pub const MAX_RATING: i64 = 5;
