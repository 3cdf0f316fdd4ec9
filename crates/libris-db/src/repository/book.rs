//! # Book Repository
//!
//! Database operations for books and their author/category associations.
//!
//! ## Single-Statement Rule
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │              Every mutation here is ONE statement                       │
//! │                                                                         │
//! │  ❌ WRONG: two round trips (row can vanish or change in between)       │
//! │     SELECT ... WHERE isbn = ?   →  DELETE ... WHERE isbn = ?           │
//! │                                                                         │
//! │  ✅ CORRECT: match-and-mutate, inspect rows_affected                   │
//! │     DELETE FROM books WHERE isbn = ? AND <guard>                       │
//! │     UPDATE books SET copies = ? WHERE isbn = ? AND <guard>             │
//! │                                                                         │
//! │  rows_affected == 0  →  caller probes to classify the failure          │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! The `available` counter moved by loans lives in
//! [`super::availability`], not here.

use chrono::{DateTime, Utc};
use sqlx::SqlitePool;
use tracing::debug;

use crate::error::{DbError, DbResult};
use libris_core::{Author, Book, Category, Publisher};

/// Repository for book database operations.
///
/// ## Usage
/// ```rust,ignore
/// let repo = BookRepository::new(pool);
///
/// repo.insert(&book).await?;
/// let found = repo.get_by_isbn("9780000000001").await?;
/// ```
#[derive(Debug, Clone)]
pub struct BookRepository {
    pool: SqlitePool,
}

impl BookRepository {
    /// Creates a new BookRepository.
    pub fn new(pool: SqlitePool) -> Self {
        BookRepository { pool }
    }

    /// Inserts a new book.
    ///
    /// ## Returns
    /// * `Ok(())` - Inserted
    /// * `Err(DbError::UniqueViolation)` - ISBN already exists (`books.isbn`)
    /// * `Err(DbError::CheckViolation)` - a `books_*` CHECK fired
    pub async fn insert(&self, book: &Book) -> DbResult<()> {
        debug!(isbn = %book.isbn, id = %book.id, "Inserting book");

        sqlx::query(
            r#"
            INSERT INTO books (
                id, isbn, title, publication_year,
                copies, available, publisher_id,
                created_at, last_modified
            ) VALUES (
                ?1, ?2, ?3, ?4,
                ?5, ?6, ?7,
                ?8, ?9
            )
            "#,
        )
        .bind(&book.id)
        .bind(&book.isbn)
        .bind(&book.title)
        .bind(book.publication_year)
        .bind(book.copies)
        .bind(book.available)
        .bind(&book.publisher_id)
        .bind(book.created_at)
        .bind(book.last_modified)
        .execute(&self.pool)
        .await
        .map_err(|e| DbError::from(e).with_value(&book.isbn))?;

        Ok(())
    }

    /// Gets a book by its ISBN (exact match).
    pub async fn get_by_isbn(&self, isbn: &str) -> DbResult<Option<Book>> {
        let book = sqlx::query_as::<_, Book>(
            r#"
            SELECT
                id, isbn, title, publication_year,
                copies, available, publisher_id,
                created_at, last_modified
            FROM books
            WHERE isbn = ?1
            "#,
        )
        .bind(isbn)
        .fetch_optional(&self.pool)
        .await?;

        Ok(book)
    }

    /// Gets a book by its surrogate ID.
    pub async fn get_by_id(&self, id: &str) -> DbResult<Option<Book>> {
        let book = sqlx::query_as::<_, Book>(
            r#"
            SELECT
                id, isbn, title, publication_year,
                copies, available, publisher_id,
                created_at, last_modified
            FROM books
            WHERE id = ?1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(book)
    }

    /// Lists books ordered by title.
    pub async fn list(&self, limit: u32) -> DbResult<Vec<Book>> {
        let books = sqlx::query_as::<_, Book>(
            r#"
            SELECT
                id, isbn, title, publication_year,
                copies, available, publisher_id,
                created_at, last_modified
            FROM books
            ORDER BY title, isbn
            LIMIT ?1
            "#,
        )
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        Ok(books)
    }

    /// Deletes a book by ISBN unless it has an open loan.
    ///
    /// Match and delete are one statement. Returns whether a row was deleted.
    /// Closed loans and associations go with it (`ON DELETE CASCADE`).
    pub async fn delete_by_isbn(&self, isbn: &str) -> DbResult<bool> {
        debug!(isbn = %isbn, "Deleting book");

        let result = sqlx::query(
            r#"
            DELETE FROM books
            WHERE isbn = ?1
            AND NOT EXISTS (
                SELECT 1 FROM book_loans l
                WHERE l.book_id = books.id AND l.returned = 0
            )
            "#,
        )
        .bind(isbn)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Sets `copies`, shifting `available` by the same delta.
    ///
    /// The copies-on-loan count (`copies - available`) is preserved, and the
    /// statement matches nothing if `copies` would drop below it.
    ///
    /// ```text
    /// copies=5 available=2 (3 on loan)
    ///   set_copies(8) → copies=8 available=5
    ///   set_copies(3) → copies=3 available=0
    ///   set_copies(2) → 0 rows (2 < 3 on loan)
    /// ```
    pub async fn set_copies(
        &self,
        isbn: &str,
        copies: i64,
        now: DateTime<Utc>,
    ) -> DbResult<bool> {
        debug!(isbn = %isbn, copies = copies, "Setting copies");

        // Right-hand sides see the pre-update row
        let result = sqlx::query(
            r#"
            UPDATE books SET
                available = ?2 - (copies - available),
                copies = ?2,
                last_modified = ?3
            WHERE isbn = ?1
            AND (copies - available) <= ?2
            "#,
        )
        .bind(isbn)
        .bind(copies)
        .bind(now)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Recomputes `available` from the open loans, clamped to `[0, copies]`.
    pub async fn reconcile_available(&self, isbn: &str, now: DateTime<Utc>) -> DbResult<bool> {
        debug!(isbn = %isbn, "Reconciling availability");

        let result = sqlx::query(
            r#"
            UPDATE books SET
                available = MAX(0, MIN(copies, copies - (
                    SELECT COUNT(*) FROM book_loans l
                    WHERE l.book_id = books.id AND l.returned = 0
                ))),
                last_modified = ?2
            WHERE isbn = ?1
            "#,
        )
        .bind(isbn)
        .bind(now)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Counts open loans for the book with this ISBN.
    ///
    /// ## Returns
    /// * `Ok(None)` - No such book
    /// * `Ok(Some(n))` - Book exists with `n` open loans
    pub async fn open_loans_by_isbn(&self, isbn: &str) -> DbResult<Option<i64>> {
        let count: Option<i64> = sqlx::query_scalar(
            r#"
            SELECT (
                SELECT COUNT(*) FROM book_loans l
                WHERE l.book_id = b.id AND l.returned = 0
            )
            FROM books b
            WHERE b.isbn = ?1
            "#,
        )
        .bind(isbn)
        .fetch_optional(&self.pool)
        .await?;

        Ok(count)
    }

    /// Counts total books (for diagnostics).
    pub async fn count(&self) -> DbResult<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM books")
            .fetch_one(&self.pool)
            .await?;

        Ok(count)
    }

    // =========================================================================
    // Associations
    // =========================================================================

    /// Links an author to a book.
    ///
    /// `Err(DbError::UniqueViolation)` on `book_authors.book_id, book_authors.author_id`
    /// when already linked; `Err(DbError::ForeignKeyViolation)` when either side is missing.
    pub async fn link_author(&self, book_id: &str, author_id: &str) -> DbResult<()> {
        debug!(book_id = %book_id, author_id = %author_id, "Linking author");

        sqlx::query("INSERT INTO book_authors (book_id, author_id) VALUES (?1, ?2)")
            .bind(book_id)
            .bind(author_id)
            .execute(&self.pool)
            .await
            .map_err(|e| DbError::from(e).with_value(format!("{book_id}/{author_id}")))?;

        Ok(())
    }

    /// Links a category to a book.
    pub async fn link_category(&self, book_id: &str, category_id: &str) -> DbResult<()> {
        debug!(book_id = %book_id, category_id = %category_id, "Linking category");

        sqlx::query("INSERT INTO book_categories (book_id, category_id) VALUES (?1, ?2)")
            .bind(book_id)
            .bind(category_id)
            .execute(&self.pool)
            .await
            .map_err(|e| DbError::from(e).with_value(format!("{book_id}/{category_id}")))?;

        Ok(())
    }

    /// Authors of a book, ordered by name.
    pub async fn authors_of(&self, book_id: &str) -> DbResult<Vec<Author>> {
        let authors = sqlx::query_as::<_, Author>(
            r#"
            SELECT a.id, a.name, a.biography, a.birth_year
            FROM authors a
            INNER JOIN book_authors ba ON ba.author_id = a.id
            WHERE ba.book_id = ?1
            ORDER BY a.name
            "#,
        )
        .bind(book_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(authors)
    }

    /// Categories of a book, ordered by name.
    pub async fn categories_of(&self, book_id: &str) -> DbResult<Vec<Category>> {
        let categories = sqlx::query_as::<_, Category>(
            r#"
            SELECT c.id, c.name
            FROM categories c
            INNER JOIN book_categories bc ON bc.category_id = c.id
            WHERE bc.book_id = ?1
            ORDER BY c.name
            "#,
        )
        .bind(book_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(categories)
    }

    /// Publisher of a book, if it has one.
    pub async fn publisher_of(&self, book_id: &str) -> DbResult<Option<Publisher>> {
        let publisher = sqlx::query_as::<_, Publisher>(
            r#"
            SELECT p.id, p.name, p.address
            FROM publishers p
            INNER JOIN books b ON b.publisher_id = p.id
            WHERE b.id = ?1
            "#,
        )
        .bind(book_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(publisher)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Database, DbConfig};
    use libris_core::NewBook;

    async fn setup() -> (Database, BookRepository) {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let repo = db.books();
        (db, repo)
    }

    #[tokio::test]
    async fn test_insert_and_get() {
        let (_db, repo) = setup().await;
        let book = NewBook::new("9781111111111", "Found Me")
            .copies(2)
            .into_book(Utc::now());

        repo.insert(&book).await.unwrap();

        let by_isbn = repo.get_by_isbn("9781111111111").await.unwrap().unwrap();
        assert_eq!(by_isbn.id, book.id);
        assert_eq!(by_isbn.title, "Found Me");
        assert_eq!(by_isbn.available, 2);

        let by_id = repo.get_by_id(&book.id).await.unwrap().unwrap();
        assert_eq!(by_id.isbn, "9781111111111");

        assert!(repo.get_by_isbn("nope").await.unwrap().is_none());
        assert_eq!(repo.count().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_unique_isbn_enforced_by_store() {
        let (_db, repo) = setup().await;
        let now = Utc::now();

        repo.insert(&NewBook::new("9785555555555", "One").into_book(now))
            .await
            .unwrap();
        let err = repo
            .insert(&NewBook::new("9785555555555", "Two (dup)").into_book(now))
            .await
            .unwrap_err();

        assert!(err.violates_unique("books.isbn"), "got {err:?}");
        assert!(matches!(
            err,
            DbError::UniqueViolation { ref value, .. } if value == "9785555555555"
        ));
    }

    #[tokio::test]
    async fn test_check_constraints_backstop_validation() {
        let (_db, repo) = setup().await;
        let now = Utc::now();

        let short = NewBook::new("978", "Short isbn").into_book(now);
        assert!(repo
            .insert(&short)
            .await
            .unwrap_err()
            .violates_check("books_isbn_length"));

        let long = NewBook::new("9786666666668", "T".repeat(201)).into_book(now);
        assert!(repo
            .insert(&long)
            .await
            .unwrap_err()
            .violates_check("books_title_length"));

        let mut overfull = NewBook::new("9786666666669", "Overfull").copies(1).into_book(now);
        overfull.available = 2;
        assert!(repo
            .insert(&overfull)
            .await
            .unwrap_err()
            .violates_check("books_available_in_range"));

        let exact = NewBook::new("9786666666667", "T".repeat(200)).into_book(now);
        repo.insert(&exact).await.unwrap();
    }

    #[tokio::test]
    async fn test_set_copies_preserves_on_loan() {
        let (_db, repo) = setup().await;
        let mut book = NewBook::new("9783333333333", "Inventory")
            .copies(5)
            .into_book(Utc::now());
        book.available = 2;
        repo.insert(&book).await.unwrap();

        assert!(repo.set_copies(&book.isbn, 8, Utc::now()).await.unwrap());
        let got = repo.get_by_isbn(&book.isbn).await.unwrap().unwrap();
        assert_eq!((got.copies, got.available), (8, 5));

        assert!(repo.set_copies(&book.isbn, 3, Utc::now()).await.unwrap());
        let got = repo.get_by_isbn(&book.isbn).await.unwrap().unwrap();
        assert_eq!((got.copies, got.available), (3, 0));

        assert!(!repo.set_copies(&book.isbn, 2, Utc::now()).await.unwrap());
        assert!(!repo.set_copies("missing", 10, Utc::now()).await.unwrap());
    }

    #[tokio::test]
    async fn test_delete_by_isbn() {
        let (_db, repo) = setup().await;
        let book = NewBook::new("9782222222222", "To Be Removed")
            .copies(1)
            .into_book(Utc::now());
        repo.insert(&book).await.unwrap();

        assert!(repo.delete_by_isbn("9782222222222").await.unwrap());
        assert!(!repo.delete_by_isbn("9782222222222").await.unwrap());
        assert_eq!(repo.count().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_open_loans_by_isbn() {
        let (_db, repo) = setup().await;
        let book = NewBook::new("9782222222223", "Counted").into_book(Utc::now());
        repo.insert(&book).await.unwrap();

        assert_eq!(repo.open_loans_by_isbn(&book.isbn).await.unwrap(), Some(0));
        assert_eq!(repo.open_loans_by_isbn("9780000000000").await.unwrap(), None);
    }
}
