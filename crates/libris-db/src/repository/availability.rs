//! # Availability Counter
//!
//! The only code that moves `books.available` after a book is inserted.
//!
//! ## Conditional Update
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  5 callers, 1 copy left                                                 │
//! │                                                                         │
//! │  UPDATE books SET available = available - 1                            │
//! │  WHERE id = ? AND available > 0                                        │
//! │                                                                         │
//! │  caller A  ── 1 row  ──►  available 1 → 0                              │
//! │  caller B  ── 0 rows ──►  probe: available = 0 → Unavailable           │
//! │  caller C  ── 0 rows ──►  probe: available = 0 → Unavailable           │
//! │  ...                                                                    │
//! │                                                                         │
//! │  Read-then-write (SELECT available; if > 0 UPDATE) would let several   │
//! │  callers see 1 and all decrement.                                      │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Functions take a connection so they join the caller's transaction.

use chrono::{DateTime, Utc};
use sqlx::SqliteConnection;
use tracing::debug;

use crate::error::DbResult;

/// Takes one copy off the shelf if any is left.
///
/// Returns `false` when no row matched (book absent or `available = 0`).
pub async fn checkout(
    conn: &mut SqliteConnection,
    book_id: &str,
    now: DateTime<Utc>,
) -> DbResult<bool> {
    let result = sqlx::query(
        r#"
        UPDATE books SET
            available = available - 1,
            last_modified = ?2
        WHERE id = ?1 AND available > 0
        "#,
    )
    .bind(book_id)
    .bind(now)
    .execute(&mut *conn)
    .await?;

    debug!(book_id = %book_id, rows = result.rows_affected(), "Checkout");
    Ok(result.rows_affected() > 0)
}

/// Puts one copy back if the shelf is not already full.
///
/// Returns `false` when no row matched (book absent or `available = copies`).
pub async fn checkin(
    conn: &mut SqliteConnection,
    book_id: &str,
    now: DateTime<Utc>,
) -> DbResult<bool> {
    let result = sqlx::query(
        r#"
        UPDATE books SET
            available = available + 1,
            last_modified = ?2
        WHERE id = ?1 AND available < copies
        "#,
    )
    .bind(book_id)
    .bind(now)
    .execute(&mut *conn)
    .await?;

    debug!(book_id = %book_id, rows = result.rows_affected(), "Checkin");
    Ok(result.rows_affected() > 0)
}

/// Reads the current counter, `None` if the book does not exist.
pub async fn probe(conn: &mut SqliteConnection, book_id: &str) -> DbResult<Option<i64>> {
    let available: Option<i64> = sqlx::query_scalar("SELECT available FROM books WHERE id = ?1")
        .bind(book_id)
        .fetch_optional(&mut *conn)
        .await?;

    Ok(available)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Database, DbConfig};
    use libris_core::NewBook;

    #[tokio::test]
    async fn test_checkout_stops_at_zero() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let book = NewBook::new("9784444444444", "Scarce")
            .copies(1)
            .into_book(Utc::now());
        db.books().insert(&book).await.unwrap();

        let mut conn = db.pool().acquire().await.unwrap();
        assert!(checkout(&mut conn, &book.id, Utc::now()).await.unwrap());
        assert!(!checkout(&mut conn, &book.id, Utc::now()).await.unwrap());
        assert_eq!(probe(&mut conn, &book.id).await.unwrap(), Some(0));
    }

    #[tokio::test]
    async fn test_checkin_stops_at_copies() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let book = NewBook::new("9784444444445", "Full Shelf")
            .copies(2)
            .into_book(Utc::now());
        db.books().insert(&book).await.unwrap();

        let mut conn = db.pool().acquire().await.unwrap();
        assert!(!checkin(&mut conn, &book.id, Utc::now()).await.unwrap());
        assert!(checkout(&mut conn, &book.id, Utc::now()).await.unwrap());
        assert!(checkin(&mut conn, &book.id, Utc::now()).await.unwrap());
        assert_eq!(probe(&mut conn, &book.id).await.unwrap(), Some(2));
    }

    #[tokio::test]
    async fn test_missing_book() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let mut conn = db.pool().acquire().await.unwrap();

        assert!(!checkout(&mut conn, "nope", Utc::now()).await.unwrap());
        assert!(!checkin(&mut conn, "nope", Utc::now()).await.unwrap());
        assert_eq!(probe(&mut conn, "nope").await.unwrap(), None);
    }
}
