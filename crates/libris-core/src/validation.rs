//! # Validation Module
//!
//! Shape rules checked before any write reaches the store.
//!
//! ## Validation Strategy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      Validation Layers                                  │
//! │                                                                         │
//! │  Layer 1: Typed input (serde)                                          │
//! │  └── title is a required String: absent/NULL never gets this far       │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 2: THIS MODULE (pure, deterministic)                            │
//! │  ├── isbn length == 13                                                 │
//! │  ├── title length <= 200                                               │
//! │  ├── rating in 1..=5                                                   │
//! │  └── due_date - loan_date <= 30 days                                   │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 3: Database (SQLite)                                            │
//! │  ├── NOT NULL / UNIQUE constraints                                     │
//! │  └── Named CHECK constraints mirroring Layer 2                         │
//! │                                                                         │
//! │  A Layer 3 failure is reported as the same Layer 2 error               │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Lengths are counted in characters, not bytes.
//!
//! ## Usage
//! ```rust
//! use libris_core::validation::{validate_isbn, validate_title};
//!
//! validate_isbn("9780000000001").unwrap();
//! validate_title("").unwrap();
//! ```

use chrono::{DateTime, Duration, Utc};

use crate::error::ValidationError;
use crate::types::{NewAuthor, NewBook, NewCategory, NewPublisher, NewReview};
use crate::{ISBN_LENGTH, MAX_LOAN_DAYS, MAX_RATING, MAX_TITLE_LENGTH, MIN_RATING};

/// Result type for validation operations.
pub type ValidationResult<T> = Result<T, ValidationError>;

// =============================================================================
// String Validators
// =============================================================================

/// Validates an ISBN.
///
/// ## Rules
/// - Exactly 13 characters. Hyphenated forms are rejected, callers strip them.
///
/// ## Example
/// ```rust
/// use libris_core::validation::validate_isbn;
///
/// assert!(validate_isbn("9780123456789").is_ok());
/// assert!(validate_isbn("978012345678").is_err());
/// assert!(validate_isbn("97801234567890").is_err());
/// ```
pub fn validate_isbn(isbn: &str) -> ValidationResult<()> {
    let length = isbn.chars().count();

    if length != ISBN_LENGTH {
        return Err(ValidationError::InvalidIsbn {
            isbn: isbn.to_string(),
            length,
        });
    }

    Ok(())
}

/// Validates a book title.
///
/// ## Rules
/// - At most 200 characters
/// - Empty string is valid
pub fn validate_title(title: &str) -> ValidationResult<()> {
    let length = title.chars().count();

    if length > MAX_TITLE_LENGTH {
        return Err(ValidationError::TitleTooLong { length });
    }

    Ok(())
}

/// Validates a required name field (author, publisher, category).
pub fn validate_required(field: &str, value: &str) -> ValidationResult<()> {
    if value.trim().is_empty() {
        return Err(ValidationError::Required {
            field: field.to_string(),
        });
    }

    Ok(())
}

// =============================================================================
// Numeric Validators
// =============================================================================

/// Validates a copy count. Zero is allowed.
pub fn validate_copies(copies: i64) -> ValidationResult<()> {
    if copies < 0 {
        return Err(ValidationError::NegativeCopies { copies });
    }

    Ok(())
}

/// Validates a review rating.
///
/// ## Example
/// ```rust
/// use libris_core::validation::validate_rating;
///
/// assert!(validate_rating(1).is_ok());
/// assert!(validate_rating(5).is_ok());
/// assert!(validate_rating(0).is_err());
/// assert!(validate_rating(6).is_err());
/// ```
pub fn validate_rating(rating: i64) -> ValidationResult<()> {
    if !(MIN_RATING..=MAX_RATING).contains(&rating) {
        return Err(ValidationError::RatingOutOfRange { rating });
    }

    Ok(())
}

// =============================================================================
// Loan Period
// =============================================================================

/// Validates a loan period.
///
/// ## Rules
/// - `due_date >= loan_date`
/// - `due_date - loan_date <= 30 days` (exactly 30 days is allowed)
///
/// ```text
/// loan_date                         loan_date + 30d
///     │◄──────────── allowed ──────────►│
///     ▼                                 ▼
/// ────●─────────────────────────────────●──────► time
///   due < loan: DueBeforeLoan     due > +30d: LoanDurationExceeded
/// ```
pub fn validate_loan_period(
    loan_date: DateTime<Utc>,
    due_date: DateTime<Utc>,
) -> ValidationResult<()> {
    if due_date < loan_date {
        return Err(ValidationError::DueBeforeLoan {
            loan_date,
            due_date,
        });
    }

    let period = due_date - loan_date;
    if period > Duration::days(MAX_LOAN_DAYS) {
        return Err(ValidationError::LoanDurationExceeded {
            days: whole_days_rounded_up(period),
        });
    }

    Ok(())
}

fn whole_days_rounded_up(period: Duration) -> i64 {
    let days = period.num_days();
    if period > Duration::days(days) {
        days + 1
    } else {
        days
    }
}

// =============================================================================
// Record Validators
// =============================================================================

/// Validates everything the catalog checks before inserting a book.
pub fn validate_new_book(book: &NewBook) -> ValidationResult<()> {
    validate_isbn(&book.isbn)?;
    validate_title(&book.title)?;
    validate_copies(book.copies)?;
    Ok(())
}

pub fn validate_new_author(author: &NewAuthor) -> ValidationResult<()> {
    validate_required("author name", &author.name)
}

pub fn validate_new_publisher(publisher: &NewPublisher) -> ValidationResult<()> {
    validate_required("publisher name", &publisher.name)
}

pub fn validate_new_category(category: &NewCategory) -> ValidationResult<()> {
    validate_required("category name", &category.name)
}

pub fn validate_new_review(review: &NewReview) -> ValidationResult<()> {
    validate_rating(review.rating)
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_isbn_boundaries() {
        assert!(validate_isbn(&"9".repeat(13)).is_ok());

        for len in [0, 12, 14] {
            let isbn = "9".repeat(len);
            assert_eq!(
                validate_isbn(&isbn),
                Err(ValidationError::InvalidIsbn { isbn, length: len })
            );
        }

        // Hyphenated form, 17 characters
        assert!(validate_isbn("978-0-123456-47-2").is_err());
    }

    #[test]
    fn test_validate_isbn_counts_characters() {
        // 13 characters, more than 13 bytes
        assert!(validate_isbn("ééééééééééééé").is_ok());
    }

    #[test]
    fn test_validate_title_boundaries() {
        assert!(validate_title("").is_ok());
        assert!(validate_title(&"T".repeat(200)).is_ok());
        assert_eq!(
            validate_title(&"T".repeat(201)),
            Err(ValidationError::TitleTooLong { length: 201 })
        );
        assert!(validate_title(&"ü".repeat(200)).is_ok());
    }

    #[test]
    fn test_validate_rating() {
        for ok in 1..=5 {
            assert!(validate_rating(ok).is_ok());
        }
        assert!(validate_rating(0).is_err());
        assert_eq!(
            validate_rating(6),
            Err(ValidationError::RatingOutOfRange { rating: 6 })
        );
    }

    #[test]
    fn test_validate_copies() {
        assert!(validate_copies(0).is_ok());
        assert!(validate_copies(1_000_000).is_ok());
        assert!(validate_copies(-1).is_err());
    }

    #[test]
    fn test_validate_loan_period_boundaries() {
        let loan = Utc::now();

        assert!(validate_loan_period(loan, loan).is_ok());
        assert!(validate_loan_period(loan, loan + Duration::days(30)).is_ok());
        assert_eq!(
            validate_loan_period(loan, loan + Duration::days(31)),
            Err(ValidationError::LoanDurationExceeded { days: 31 })
        );
        assert_eq!(
            validate_loan_period(loan, loan + Duration::days(30) + Duration::seconds(1)),
            Err(ValidationError::LoanDurationExceeded { days: 31 })
        );
        assert!(matches!(
            validate_loan_period(loan, loan - Duration::seconds(1)),
            Err(ValidationError::DueBeforeLoan { .. })
        ));
    }

    #[test]
    fn test_validate_required() {
        assert!(validate_required("category name", "Computers").is_ok());
        assert_eq!(
            validate_required("category name", "   "),
            Err(ValidationError::Required {
                field: "category name".to_string()
            })
        );
    }

    #[test]
    fn test_validate_new_book_order() {
        // ISBN is reported before title
        let book = NewBook::new("short", "T".repeat(300));
        assert!(matches!(
            validate_new_book(&book),
            Err(ValidationError::InvalidIsbn { .. })
        ));

        let book = NewBook::new("9780000000001", "ok").copies(-2);
        assert_eq!(
            validate_new_book(&book),
            Err(ValidationError::NegativeCopies { copies: -2 })
        );
    }
}
