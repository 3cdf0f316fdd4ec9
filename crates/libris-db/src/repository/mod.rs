//! # Repository Module
//!
//! Row-level database access for Libris. Repositories know SQL, not rules:
//! validation and error classification live in the services above them.
//!
//! ## Layering
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                                                                         │
//! │  BookCatalog / LoanLedger / ReferenceData   (validate, classify, log)  │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  Repositories (pool-backed)         Connection functions (tx-backed)   │
//! │  ├── BookRepository                 ├── availability::checkout         │
//! │  ├── LoanRepository (reads)         ├── availability::checkin          │
//! │  ├── AuthorRepository               ├── loan::insert                   │
//! │  ├── PublisherRepository            └── loan::close                    │
//! │  ├── CategoryRepository                                                │
//! │  └── ReviewRepository                                                  │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  SQLite Database                                                       │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Available Repositories
//!
//! - [`book::BookRepository`] - Books, copy counts and associations
//! - [`loan::LoanRepository`] - Loan history reads
//! - [`author::AuthorRepository`], [`publisher::PublisherRepository`],
//!   [`category::CategoryRepository`], [`review::ReviewRepository`]

pub mod author;
pub mod availability;
pub mod book;
pub mod category;
pub mod loan;
pub mod publisher;
pub mod review;
