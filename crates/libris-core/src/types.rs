//! # Domain Types
//!
//! Core domain types used throughout Libris.
//!
//! ## Type Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Domain Types                                    │
//! │                                                                         │
//! │  ┌─────────────────┐   ┌─────────────────┐   ┌─────────────────┐       │
//! │  │      Book       │   │    BookLoan     │   │     Review      │       │
//! │  │  ─────────────  │   │  ─────────────  │   │  ─────────────  │       │
//! │  │  id (UUID)      │◄──│  book_id (FK)   │   │  id (UUID)      │       │
//! │  │  isbn (unique)  │   │  loan_date      │   │  rating 1..=5   │       │
//! │  │  copies         │   │  due_date       │   │  comment        │       │
//! │  │  available      │   │  returned       │   └─────────────────┘       │
//! │  └────────┬────────┘   └─────────────────┘                              │
//! │           │ many-to-many          one-to-many                           │
//! │  ┌────────┴────────┐   ┌─────────────────┐   ┌─────────────────┐       │
//! │  │     Author      │   │    Category     │   │   Publisher     │       │
//! │  └─────────────────┘   └─────────────────┘   └─────────────────┘       │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Dual-Key Identity Pattern
//! Books carry:
//! - `id`: UUID v4 - immutable, used for relations (loans, associations)
//! - `isbn`: business key, unique, what catalog callers look books up by

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Generates a new surrogate key.
pub fn new_id() -> String {
    Uuid::new_v4().to_string()
}

// =============================================================================
// Book
// =============================================================================

/// A catalogued title and its copy counters.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct Book {
    /// Unique identifier (UUID v4).
    pub id: String,

    /// 13-character ISBN, unique across the catalog.
    pub isbn: String,

    /// Title, 0-200 characters.
    pub title: String,

    pub publication_year: i32,

    /// Total physical copies owned.
    pub copies: i64,

    /// Copies not currently on loan. Maintained by the store, never by callers.
    pub available: i64,

    pub publisher_id: Option<String>,

    pub created_at: DateTime<Utc>,

    /// Bumped on every mutation, counter changes included.
    pub last_modified: DateTime<Utc>,
}

impl Book {
    /// Number of copies currently lent out.
    #[inline]
    pub fn on_loan(&self) -> i64 {
        self.copies - self.available
    }

    /// Checks `0 <= available <= copies`.
    pub fn counters_consistent(&self) -> bool {
        self.available >= 0 && self.available <= self.copies
    }
}

/// Caller input for adding a book to the catalog.
///
/// `available` is deliberately absent: it always starts equal to `copies`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewBook {
    pub isbn: String,
    pub title: String,
    #[serde(default)]
    pub publication_year: i32,
    #[serde(default)]
    pub copies: i64,
    #[serde(default)]
    pub publisher_id: Option<String>,
}

impl NewBook {
    /// Creates a book input with no publisher and zero copies.
    pub fn new(isbn: impl Into<String>, title: impl Into<String>) -> Self {
        NewBook {
            isbn: isbn.into(),
            title: title.into(),
            publication_year: 0,
            copies: 0,
            publisher_id: None,
        }
    }

    /// Sets the copy count.
    pub fn copies(mut self, copies: i64) -> Self {
        self.copies = copies;
        self
    }

    /// Sets the publication year.
    pub fn publication_year(mut self, year: i32) -> Self {
        self.publication_year = year;
        self
    }

    /// Sets the publisher reference.
    pub fn publisher(mut self, publisher_id: impl Into<String>) -> Self {
        self.publisher_id = Some(publisher_id.into());
        self
    }

    /// Builds the full record: fresh id, `available = copies`, both
    /// timestamps set to `now`.
    pub fn into_book(self, now: DateTime<Utc>) -> Book {
        Book {
            id: new_id(),
            isbn: self.isbn,
            title: self.title,
            publication_year: self.publication_year,
            copies: self.copies,
            available: self.copies,
            publisher_id: self.publisher_id,
            created_at: now,
            last_modified: now,
        }
    }
}

// =============================================================================
// Loan
// =============================================================================

/// Lifecycle of a loan.
///
/// ```text
/// Active ──return_loan──► Returned (terminal)
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LoanStatus {
    /// Copy is out with a borrower.
    Active,
    /// Copy is back on the shelf.
    Returned,
}

/// A single copy lent out of a book.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct BookLoan {
    /// Unique identifier (UUID v4).
    pub id: String,
    pub book_id: String,
    pub loan_date: DateTime<Utc>,
    pub due_date: DateTime<Utc>,
    pub returned: bool,
    /// Set exactly when `returned` becomes true.
    pub return_date: Option<DateTime<Utc>>,
}

impl BookLoan {
    /// Creates an open loan.
    pub fn open(
        book_id: impl Into<String>,
        loan_date: DateTime<Utc>,
        due_date: DateTime<Utc>,
    ) -> Self {
        BookLoan {
            id: new_id(),
            book_id: book_id.into(),
            loan_date,
            due_date,
            returned: false,
            return_date: None,
        }
    }

    /// Current state of the loan.
    pub fn status(&self) -> LoanStatus {
        if self.returned {
            LoanStatus::Returned
        } else {
            LoanStatus::Active
        }
    }

    /// An open loan past its due date.
    pub fn is_overdue(&self, now: DateTime<Utc>) -> bool {
        !self.returned && now > self.due_date
    }
}

// =============================================================================
// Reference Data
// =============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct Author {
    pub id: String,
    pub name: String,
    pub biography: Option<String>,
    pub birth_year: Option<i32>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewAuthor {
    pub name: String,
    #[serde(default)]
    pub biography: Option<String>,
    #[serde(default)]
    pub birth_year: Option<i32>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct Publisher {
    pub id: String,
    pub name: String,
    pub address: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewPublisher {
    pub name: String,
    #[serde(default)]
    pub address: Option<String>,
}

/// A classification label; names are unique.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct Category {
    pub id: String,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewCategory {
    pub name: String,
}

impl NewCategory {
    pub fn new(name: impl Into<String>) -> Self {
        NewCategory { name: name.into() }
    }
}

/// A customer review. Not tied to the book catalog.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct Review {
    pub id: String,
    /// 1..=5, enforced locally and by a CHECK constraint.
    pub rating: i64,
    pub comment: Option<String>,
    pub customer_id: String,
    pub product_id: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewReview {
    pub rating: i64,
    #[serde(default)]
    pub comment: Option<String>,
    pub customer_id: String,
    pub product_id: String,
}

impl NewReview {
    pub fn into_review(self, now: DateTime<Utc>) -> Review {
        Review {
            id: new_id(),
            rating: self.rating,
            comment: self.comment,
            customer_id: self.customer_id,
            product_id: self.product_id,
            created_at: now,
        }
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
