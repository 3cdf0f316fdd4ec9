//! # Loan Repository
//!
//! Loan rows. Reads go through the pool; writes take a connection so the
//! ledger can pair them with the availability counter in one transaction.
//!
//! ## Loan Lifecycle
//! ```text
//! insert (returned = 0)
//!      │
//!      ▼
//! close:  UPDATE ... SET returned = 1 WHERE id = ? AND returned = 0
//!         RETURNING book_id
//!      │
//!      ├── Some(book_id) → caller increments availability
//!      └── None          → caller probes: missing or already returned
//! ```

use chrono::{DateTime, Utc};
use sqlx::{SqliteConnection, SqlitePool};
use tracing::debug;

use crate::error::DbResult;
use libris_core::BookLoan;

/// Repository for loan reads.
#[derive(Debug, Clone)]
pub struct LoanRepository {
    pool: SqlitePool,
}

impl LoanRepository {
    /// Creates a new LoanRepository.
    pub fn new(pool: SqlitePool) -> Self {
        LoanRepository { pool }
    }

    /// Gets a loan by ID.
    pub async fn get_by_id(&self, id: &str) -> DbResult<Option<BookLoan>> {
        let mut conn = self.pool.acquire().await?;
        find(&mut conn, id).await
    }

    /// Open loans for a book, oldest first.
    pub async fn open_for_book(&self, book_id: &str) -> DbResult<Vec<BookLoan>> {
        let loans = sqlx::query_as::<_, BookLoan>(
            r#"
            SELECT id, book_id, loan_date, due_date, returned, return_date
            FROM book_loans
            WHERE book_id = ?1 AND returned = 0
            ORDER BY loan_date, id
            "#,
        )
        .bind(book_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(loans)
    }

    /// Every loan for a book, open and closed, oldest first.
    pub async fn all_for_book(&self, book_id: &str) -> DbResult<Vec<BookLoan>> {
        let loans = sqlx::query_as::<_, BookLoan>(
            r#"
            SELECT id, book_id, loan_date, due_date, returned, return_date
            FROM book_loans
            WHERE book_id = ?1
            ORDER BY loan_date, id
            "#,
        )
        .bind(book_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(loans)
    }

    /// Counts open loans for a book.
    pub async fn count_open_for_book(&self, book_id: &str) -> DbResult<i64> {
        let count: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM book_loans WHERE book_id = ?1 AND returned = 0",
        )
        .bind(book_id)
        .fetch_one(&self.pool)
        .await?;

        Ok(count)
    }
}

/// Inserts an open loan row.
pub async fn insert(conn: &mut SqliteConnection, loan: &BookLoan) -> DbResult<()> {
    debug!(loan_id = %loan.id, book_id = %loan.book_id, "Inserting loan");

    sqlx::query(
        r#"
        INSERT INTO book_loans (id, book_id, loan_date, due_date, returned, return_date)
        VALUES (?1, ?2, ?3, ?4, ?5, ?6)
        "#,
    )
    .bind(&loan.id)
    .bind(&loan.book_id)
    .bind(loan.loan_date)
    .bind(loan.due_date)
    .bind(loan.returned)
    .bind(loan.return_date)
    .execute(&mut *conn)
    .await?;

    Ok(())
}

/// Marks an open loan returned.
///
/// Returns the loan's book id, or `None` if no open loan with this id exists.
pub async fn close(
    conn: &mut SqliteConnection,
    loan_id: &str,
    now: DateTime<Utc>,
) -> DbResult<Option<String>> {
    let book_id: Option<String> = sqlx::query_scalar(
        r#"
        UPDATE book_loans SET
            returned = 1,
            return_date = ?2
        WHERE id = ?1 AND returned = 0
        RETURNING book_id
        "#,
    )
    .bind(loan_id)
    .bind(now)
    .fetch_optional(&mut *conn)
    .await?;

    debug!(loan_id = %loan_id, closed = book_id.is_some(), "Closing loan");
    Ok(book_id)
}

/// Reads a loan on the given connection.
pub async fn find(conn: &mut SqliteConnection, loan_id: &str) -> DbResult<Option<BookLoan>> {
    let loan = sqlx::query_as::<_, BookLoan>(
        r#"
        SELECT id, book_id, loan_date, due_date, returned, return_date
        FROM book_loans
        WHERE id = ?1
        "#,
    )
    .bind(loan_id)
    .fetch_optional(&mut *conn)
    .await?;

    Ok(loan)
}
