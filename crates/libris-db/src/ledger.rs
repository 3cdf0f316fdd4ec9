//! # Loan Ledger
//!
//! Issues and closes loans. Every loan transition is paired with an
//! availability change inside one transaction.
//!
//! ## Issue / Return
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  issue_loan                          return_loan                        │
//! │  ──────────                          ───────────                        │
//! │  validate period                     BEGIN                              │
//! │  BEGIN                               close loan (WHERE returned = 0)    │
//! │  checkout (WHERE available > 0)        0 rows → NotFound /              │
//! │    0 rows → probe → NotFound /                  AlreadyReturned         │
//! │             Unavailable              checkin (WHERE available < copies) │
//! │  insert loan                           0 rows → warn, no-op             │
//! │  COMMIT                              COMMIT                             │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! The first statement of each transaction is a write, so a contending
//! writer waits on SQLite's busy handler instead of failing.

use chrono::{DateTime, Utc};
use sqlx::SqlitePool;
use tracing::{info, warn};

use crate::error::{DbError, LibraryResult};
use crate::repository::availability;
use crate::repository::loan::{self, LoanRepository};
use libris_core::validation::validate_loan_period;
use libris_core::{BookLoan, CoreError};

/// Loan ledger service.
#[derive(Debug, Clone)]
pub struct LoanLedger {
    pool: SqlitePool,
    loans: LoanRepository,
}

impl LoanLedger {
    pub fn new(pool: SqlitePool) -> Self {
        LoanLedger {
            loans: LoanRepository::new(pool.clone()),
            pool,
        }
    }

    /// Lends one copy of a book.
    ///
    /// ## Errors
    /// - `LoanDurationExceeded`, `DueBeforeLoan` on the period
    /// - `NotFound` when the book does not exist
    /// - `Unavailable` when every copy is out
    pub async fn issue_loan(
        &self,
        book_id: &str,
        loan_date: DateTime<Utc>,
        due_date: DateTime<Utc>,
    ) -> LibraryResult<BookLoan> {
        validate_loan_period(loan_date, due_date)?;

        let now = Utc::now();
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| DbError::TransactionFailed(e.to_string()))?;

        if !availability::checkout(&mut *tx, book_id, now).await? {
            let err = match availability::probe(&mut *tx, book_id).await? {
                None => CoreError::not_found("Book", book_id),
                Some(0) => CoreError::Unavailable {
                    book_id: book_id.to_string(),
                },
                Some(_) => CoreError::conflict("Book", book_id),
            };

            warn!(book_id = %book_id, error = %err, "Loan refused");
            return Err(err.into());
        }

        let loan = BookLoan::open(book_id, loan_date, due_date);
        loan::insert(&mut *tx, &loan).await?;

        tx.commit()
            .await
            .map_err(|e| DbError::TransactionFailed(e.to_string()))?;

        info!(
            loan_id = %loan.id,
            book_id = %book_id,
            due_date = %loan.due_date,
            "Loan issued"
        );
        Ok(loan)
    }

    /// Closes an open loan and puts the copy back.
    ///
    /// ## Errors
    /// - `NotFound` when no loan has this ID
    /// - `AlreadyReturned` when the loan is already closed
    pub async fn return_loan(&self, loan_id: &str) -> LibraryResult<BookLoan> {
        let now = Utc::now();
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| DbError::TransactionFailed(e.to_string()))?;

        let Some(book_id) = loan::close(&mut *tx, loan_id, now).await? else {
            let err = match loan::find(&mut *tx, loan_id).await? {
                None => CoreError::not_found("Loan", loan_id),
                Some(existing) if existing.returned => CoreError::AlreadyReturned {
                    loan_id: loan_id.to_string(),
                },
                Some(_) => CoreError::conflict("Loan", loan_id),
            };

            warn!(loan_id = %loan_id, error = %err, "Return refused");
            return Err(err.into());
        };

        if !availability::checkin(&mut *tx, &book_id, now).await? {
            warn!(
                loan_id = %loan_id,
                book_id = %book_id,
                "Book already fully available, counter left unchanged"
            );
        }

        let returned = loan::find(&mut *tx, loan_id)
            .await?
            .ok_or_else(|| CoreError::conflict("Loan", loan_id))?;

        tx.commit()
            .await
            .map_err(|e| DbError::TransactionFailed(e.to_string()))?;

        info!(loan_id = %loan_id, book_id = %book_id, "Loan returned");
        Ok(returned)
    }

    /// Finds a loan by ID.
    pub async fn find_loan(&self, loan_id: &str) -> LibraryResult<BookLoan> {
        self.loans
            .get_by_id(loan_id)
            .await?
            .ok_or_else(|| CoreError::not_found("Loan", loan_id).into())
    }

    /// Open loans for a book, oldest first.
    pub async fn open_loans_for_book(&self, book_id: &str) -> LibraryResult<Vec<BookLoan>> {
        Ok(self.loans.open_for_book(book_id).await?)
    }

    /// Full loan history for a book, oldest first.
    pub async fn loans_for_book(&self, book_id: &str) -> LibraryResult<Vec<BookLoan>> {
        Ok(self.loans.all_for_book(book_id).await?)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::retry::{with_backoff, RetryPolicy};
    use crate::{Database, DbConfig, LibraryError};
    use chrono::Duration;
    use libris_core::{ErrorKind, LoanStatus, NewBook, ValidationError};
    use std::time::Duration as StdDuration;

    async fn setup(copies: i64) -> (Database, String) {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let book = db
            .catalog()
            .add_book(NewBook::new("9780000000001", "Lendable").copies(copies))
            .await
            .unwrap();
        (db, book.id)
    }

    async fn available(db: &Database, book_id: &str) -> i64 {
        db.catalog().find_book_by_id(book_id).await.unwrap().available
    }

    #[tokio::test]
    async fn test_lending_cycle() {
        let (db, book_id) = setup(1).await;
        let ledger = db.ledger();
        let today = Utc::now();
        let due = today + Duration::days(14);

        let loan = ledger.issue_loan(&book_id, today, due).await.unwrap();
        assert_eq!(loan.status(), LoanStatus::Active);
        assert_eq!(available(&db, &book_id).await, 0);

        let err = ledger.issue_loan(&book_id, today, due).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Unavailable);

        let returned = ledger.return_loan(&loan.id).await.unwrap();
        assert_eq!(returned.status(), LoanStatus::Returned);
        assert!(returned.return_date.is_some());
        assert_eq!(available(&db, &book_id).await, 1);

        assert!(ledger.open_loans_for_book(&book_id).await.unwrap().is_empty());
        assert_eq!(ledger.loans_for_book(&book_id).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_loan_period_bounds() {
        let (db, book_id) = setup(2).await;
        let ledger = db.ledger();
        let today = Utc::now();

        ledger
            .issue_loan(&book_id, today, today + Duration::days(30))
            .await
            .unwrap();

        let err = ledger
            .issue_loan(&book_id, today, today + Duration::days(31))
            .await
            .unwrap_err();
        assert!(matches!(
            err.as_domain(),
            Some(CoreError::Validation(ValidationError::LoanDurationExceeded { days: 31 }))
        ));

        let err = ledger
            .issue_loan(&book_id, today, today - Duration::days(1))
            .await
            .unwrap_err();
        assert!(matches!(
            err.as_domain(),
            Some(CoreError::Validation(ValidationError::DueBeforeLoan { .. }))
        ));

        // Refused periods never touch the counter
        assert_eq!(available(&db, &book_id).await, 1);
    }

    #[tokio::test]
    async fn test_issue_for_missing_book() {
        let (db, _) = setup(1).await;
        let today = Utc::now();

        let err = db
            .ledger()
            .issue_loan("ghost", today, today + Duration::days(1))
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);
    }

    #[tokio::test]
    async fn test_double_return() {
        let (db, book_id) = setup(3).await;
        let ledger = db.ledger();
        let today = Utc::now();

        let loan = ledger
            .issue_loan(&book_id, today, today + Duration::days(7))
            .await
            .unwrap();
        ledger.return_loan(&loan.id).await.unwrap();

        let err = ledger.return_loan(&loan.id).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::AlreadyReturned);
        assert_eq!(available(&db, &book_id).await, 3);

        let err = ledger.return_loan("ghost").await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);
    }

    #[tokio::test]
    async fn test_return_at_capacity_is_a_no_op() {
        let (db, book_id) = setup(1).await;
        let ledger = db.ledger();
        let today = Utc::now();

        let loan = ledger
            .issue_loan(&book_id, today, today + Duration::days(7))
            .await
            .unwrap();

        // Counter repaired behind the ledger's back
        sqlx::query("UPDATE books SET available = copies WHERE id = ?1")
            .bind(&book_id)
            .execute(db.pool())
            .await
            .unwrap();

        let returned = ledger.return_loan(&loan.id).await.unwrap();
        assert!(returned.returned);
        assert_eq!(available(&db, &book_id).await, 1);
    }

    #[tokio::test]
    async fn test_counters_match_open_loans() {
        let (db, book_id) = setup(3).await;
        let ledger = db.ledger();
        let today = Utc::now();
        let due = today + Duration::days(10);

        let first = ledger.issue_loan(&book_id, today, due).await.unwrap();
        let _second = ledger.issue_loan(&book_id, today, due).await.unwrap();
        ledger.return_loan(&first.id).await.unwrap();
        let _third = ledger.issue_loan(&book_id, today, due).await.unwrap();

        let book = db.catalog().find_book_by_id(&book_id).await.unwrap();
        let open = ledger.open_loans_for_book(&book_id).await.unwrap().len() as i64;
        assert!(book.counters_consistent());
        assert_eq!(book.available, book.copies - open);
        assert_eq!(ledger.find_loan(&first.id).await.unwrap().status(), LoanStatus::Returned);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_issues_for_last_copy() {
        let dir = tempfile::tempdir().unwrap();
        let config = DbConfig::new(dir.path().join("concurrent.db"))
            .max_connections(5)
            .busy_timeout(StdDuration::from_secs(10));
        let db = Database::new(config).await.unwrap();

        let book = db
            .catalog()
            .add_book(NewBook::new("9780000000099", "Last Copy").copies(1))
            .await
            .unwrap();

        let today = Utc::now();
        let due = today + Duration::days(14);

        let mut handles = Vec::new();
        for _ in 0..5 {
            let ledger = db.ledger();
            let book_id = book.id.clone();
            handles.push(tokio::spawn(async move {
                with_backoff(&RetryPolicy::default(), "issue_loan", || {
                    ledger.issue_loan(&book_id, today, due)
                })
                .await
            }));
        }

        let mut successes = 0;
        let mut unavailable = 0;
        for handle in handles {
            match handle.await.unwrap() {
                Ok(_) => successes += 1,
                Err(LibraryError::Domain(CoreError::Unavailable { .. })) => unavailable += 1,
                Err(other) => panic!("unexpected error: {other}"),
            }
        }

        assert_eq!(successes, 1);
        assert_eq!(unavailable, 4);

        let book = db.catalog().find_book(&book.isbn).await.unwrap();
        assert_eq!(book.available, 0);
        assert_eq!(db.ledger().open_loans_for_book(&book.id).await.unwrap().len(), 1);

        db.close().await;
    }
}
