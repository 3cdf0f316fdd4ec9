//! # libris-db: Storage and Services for Libris
//!
//! SQLite storage for the catalog and the loan ledger, and the services
//! that keep `available` consistent under concurrent callers.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                          Libris Data Flow                               │
//! │                                                                         │
//! │  Caller (any number of concurrent tasks)                               │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                    libris-db (THIS CRATE)                       │   │
//! │  │                                                                 │   │
//! │  │   ┌──────────────┐   ┌──────────────┐   ┌──────────────────┐   │   │
//! │  │   │ BookCatalog  │   │  LoanLedger  │   │  ReferenceData   │   │   │
//! │  │   └──────┬───────┘   └──────┬───────┘   └────────┬─────────┘   │   │
//! │  │          └──────────────────┼────────────────────┘             │   │
//! │  │                             ▼                                  │   │
//! │  │   ┌──────────────┐   ┌──────────────┐   ┌──────────────────┐   │   │
//! │  │   │   Database   │   │ Repositories │   │    Migrations    │   │   │
//! │  │   │  (pool.rs)   │◄──│ availability │   │    (embedded)    │   │   │
//! │  │   └──────────────┘   └──────────────┘   └──────────────────┘   │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  SQLite (WAL, foreign keys on, busy timeout)                           │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Module Organization
//!
//! - [`pool`] - Connection pool creation and the [`Database`] handle
//! - [`config`] - Pool settings, from code or the environment
//! - [`migrations`] - Embedded database migrations
//! - [`error`] - [`DbError`] and the caller-facing [`LibraryError`]
//! - [`repository`] - Row-level SQL
//! - [`catalog`], [`ledger`], [`reference`] - The services
//! - [`retry`] - Backoff for retryable failures
//!
//! ## Usage
//!
//! ```rust,ignore
//! use libris_db::{Database, DbConfig};
//! use libris_core::NewBook;
//!
//! let db = Database::new(DbConfig::from_env()?).await?;
//!
//! let book = db.catalog().add_book(NewBook::new("9780000000001", "Dune").copies(2)).await?;
//! let loan = db.ledger().issue_loan(&book.id, today, today + Duration::days(14)).await?;
//! db.ledger().return_loan(&loan.id).await?;
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod catalog;
pub mod config;
pub mod error;
pub mod ledger;
pub mod migrations;
pub mod pool;
pub mod reference;
pub mod repository;
pub mod retry;

// =============================================================================
// Re-exports
// =============================================================================

pub use catalog::BookCatalog;
pub use config::{ConfigError, DbConfig};
pub use error::{DbError, DbResult, LibraryError, LibraryResult};
pub use ledger::LoanLedger;
pub use pool::Database;
pub use reference::ReferenceData;
pub use retry::{with_backoff, RetryPolicy};

// Repository re-exports for convenience
pub use repository::author::AuthorRepository;
pub use repository::book::BookRepository;
pub use repository::category::CategoryRepository;
pub use repository::loan::LoanRepository;
pub use repository::publisher::PublisherRepository;
pub use repository::review::ReviewRepository;
