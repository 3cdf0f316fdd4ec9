//! # Book Catalog
//!
//! Owns book records and their copy counters.
//!
//! ## Operation Shape
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  validate      libris_core::validation (pure)                          │
//! │     │                                                                   │
//! │     ▼                                                                   │
//! │  derive        available = copies, created_at = last_modified = now    │
//! │     │                                                                   │
//! │     ▼                                                                   │
//! │  write         ONE guarded statement                                   │
//! │     │          0 rows → probe → NotFound / BookOnLoan / ...            │
//! │     │          store error → same error the local check would raise    │
//! │     ▼                                                                   │
//! │  log           info! with isbn / book_id                               │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::Utc;
use sqlx::SqlitePool;
use tracing::{info, warn};

use crate::error::{DbError, LibraryError, LibraryResult};
use crate::repository::book::BookRepository;
use libris_core::validation::{validate_copies, validate_new_book};
use libris_core::{Author, Book, Category, CoreError, NewBook, Publisher, ValidationError};

/// Book catalog service.
#[derive(Debug, Clone)]
pub struct BookCatalog {
    books: BookRepository,
}

impl BookCatalog {
    pub fn new(pool: SqlitePool) -> Self {
        BookCatalog {
            books: BookRepository::new(pool),
        }
    }

    /// Adds a book with every copy available.
    ///
    /// ## Errors
    /// - `InvalidIsbn`, `TitleTooLong`, `NegativeCopies` on shape
    /// - `DuplicateIsbn` when the ISBN is taken
    /// - `UnknownReference` when `publisher_id` names no publisher
    pub async fn add_book(&self, input: NewBook) -> LibraryResult<Book> {
        validate_new_book(&input)?;

        let book = input.into_book(Utc::now());

        self.books
            .insert(&book)
            .await
            .map_err(|e| reclassify_insert(e, &book))?;

        info!(isbn = %book.isbn, book_id = %book.id, copies = book.copies, "Book added");
        Ok(book)
    }

    /// Finds a book by exact ISBN.
    pub async fn find_book(&self, isbn: &str) -> LibraryResult<Book> {
        self.books
            .get_by_isbn(isbn)
            .await?
            .ok_or_else(|| CoreError::not_found("Book", isbn).into())
    }

    /// Finds a book by its surrogate ID.
    pub async fn find_book_by_id(&self, id: &str) -> LibraryResult<Book> {
        self.books
            .get_by_id(id)
            .await?
            .ok_or_else(|| CoreError::not_found("Book", id).into())
    }

    /// Books ordered by title, at most `limit`.
    pub async fn list_books(&self, limit: u32) -> LibraryResult<Vec<Book>> {
        Ok(self.books.list(limit).await?)
    }

    /// Removes a book and its closed loan history.
    ///
    /// Fails with `BookOnLoan` while any copy is out.
    pub async fn remove_book(&self, isbn: &str) -> LibraryResult<()> {
        if self.books.delete_by_isbn(isbn).await? {
            info!(isbn = %isbn, "Book removed");
            return Ok(());
        }

        let err = match self.books.open_loans_by_isbn(isbn).await? {
            None => CoreError::not_found("Book", isbn),
            Some(open_loans) if open_loans > 0 => CoreError::BookOnLoan {
                isbn: isbn.to_string(),
                open_loans,
            },
            // The blocking loan was returned between the two statements
            Some(_) => CoreError::conflict("Book", isbn),
        };

        warn!(isbn = %isbn, error = %err, "Book not removed");
        Err(err.into())
    }

    /// Sets the total copy count.
    ///
    /// Copies on loan stay on loan: `available` moves by the same delta as
    /// `copies`, and shrinking below the on-loan count is rejected.
    pub async fn update_book_copies(&self, isbn: &str, new_copies: i64) -> LibraryResult<()> {
        validate_copies(new_copies)?;

        if self.books.set_copies(isbn, new_copies, Utc::now()).await? {
            info!(isbn = %isbn, copies = new_copies, "Copies updated");
            return Ok(());
        }

        let err = match self.books.get_by_isbn(isbn).await? {
            None => CoreError::not_found("Book", isbn),
            Some(book) if book.on_loan() > new_copies => CoreError::CopiesBelowOutstanding {
                isbn: isbn.to_string(),
                requested: new_copies,
                on_loan: book.on_loan(),
            },
            Some(_) => CoreError::conflict("Book", isbn),
        };

        warn!(isbn = %isbn, requested = new_copies, error = %err, "Copies not updated");
        Err(err.into())
    }

    /// Recomputes `available` from the open loans.
    ///
    /// Repairs drift left by writes that bypassed the ledger.
    pub async fn reconcile_availability(&self, isbn: &str) -> LibraryResult<Book> {
        if !self.books.reconcile_available(isbn, Utc::now()).await? {
            return Err(CoreError::not_found("Book", isbn).into());
        }

        let book = self.find_book(isbn).await?;
        info!(
            isbn = %isbn,
            copies = book.copies,
            available = book.available,
            "Availability reconciled"
        );
        Ok(book)
    }

    /// Total number of catalogued books.
    pub async fn count_books(&self) -> LibraryResult<i64> {
        Ok(self.books.count().await?)
    }

    // =========================================================================
    // Relations
    // =========================================================================

    pub async fn link_author(&self, isbn: &str, author_id: &str) -> LibraryResult<()> {
        let book = self.find_book(isbn).await?;

        self.books
            .link_author(&book.id, author_id)
            .await
            .map_err(|e| reclassify_link(e, &book.id, "book_authors", "author", author_id))?;

        info!(isbn = %isbn, author_id = %author_id, "Author linked");
        Ok(())
    }

    pub async fn link_category(&self, isbn: &str, category_id: &str) -> LibraryResult<()> {
        let book = self.find_book(isbn).await?;

        self.books
            .link_category(&book.id, category_id)
            .await
            .map_err(|e| reclassify_link(e, &book.id, "book_categories", "category", category_id))?;

        info!(isbn = %isbn, category_id = %category_id, "Category linked");
        Ok(())
    }

    pub async fn authors_of(&self, isbn: &str) -> LibraryResult<Vec<Author>> {
        let book = self.find_book(isbn).await?;
        Ok(self.books.authors_of(&book.id).await?)
    }

    pub async fn categories_of(&self, isbn: &str) -> LibraryResult<Vec<Category>> {
        let book = self.find_book(isbn).await?;
        Ok(self.books.categories_of(&book.id).await?)
    }

    pub async fn publisher_of(&self, isbn: &str) -> LibraryResult<Option<Publisher>> {
        let book = self.find_book(isbn).await?;
        Ok(self.books.publisher_of(&book.id).await?)
    }
}

/// Maps a failed book insert to the error local validation would raise.
fn reclassify_insert(err: DbError, book: &Book) -> LibraryError {
    if err.violates_unique("books.isbn") {
        return CoreError::DuplicateIsbn {
            isbn: book.isbn.clone(),
        }
        .into();
    }
    if err.violates_check("books_isbn_length") {
        return ValidationError::InvalidIsbn {
            isbn: book.isbn.clone(),
            length: book.isbn.chars().count(),
        }
        .into();
    }
    if err.violates_check("books_title_length") {
        return ValidationError::TitleTooLong {
            length: book.title.chars().count(),
        }
        .into();
    }
    if err.violates_check("books_copies_non_negative") {
        return ValidationError::NegativeCopies {
            copies: book.copies,
        }
        .into();
    }
    if let (DbError::ForeignKeyViolation { .. }, Some(publisher_id)) = (&err, &book.publisher_id)
    {
        return CoreError::UnknownReference {
            entity: "Publisher".to_string(),
            id: publisher_id.clone(),
        }
        .into();
    }

    err.into()
}

fn reclassify_link(
    err: DbError,
    book_id: &str,
    table: &str,
    relation: &str,
    other_id: &str,
) -> LibraryError {
    let columns = format!("{table}.book_id, {table}.{relation}_id");

    if err.violates_unique(&columns) {
        return CoreError::DuplicateAssociation {
            book_id: book_id.to_string(),
            relation: relation.to_string(),
            other_id: other_id.to_string(),
        }
        .into();
    }
    if matches!(err, DbError::ForeignKeyViolation { .. }) {
        return CoreError::UnknownReference {
            entity: relation.to_string(),
            id: other_id.to_string(),
        }
        .into();
    }

    err.into()
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Database, DbConfig};
    use chrono::Duration;
    use libris_core::{ErrorKind, NewAuthor, NewCategory, NewPublisher};

    async fn setup() -> (Database, BookCatalog) {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let catalog = db.catalog();
        (db, catalog)
    }

    #[tokio::test]
    async fn test_add_then_find() {
        let (_db, catalog) = setup().await;
        let input = NewBook::new("9780000000001", "The Dispossessed")
            .copies(3)
            .publication_year(1974);

        let added = catalog.add_book(input.clone()).await.unwrap();
        let found = catalog.find_book("9780000000001").await.unwrap();

        assert_eq!(found.isbn, input.isbn);
        assert_eq!(found.title, input.title);
        assert_eq!(found.copies, 3);
        assert_eq!(found.publication_year, 1974);
        assert_eq!(found.available, 3);
        assert_eq!(found.id, added.id);

        assert_eq!(catalog.find_book_by_id(&added.id).await.unwrap().isbn, input.isbn);
        assert_eq!(catalog.count_books().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_duplicate_isbn() {
        let (_db, catalog) = setup().await;
        catalog
            .add_book(NewBook::new("9780000000001", "First"))
            .await
            .unwrap();

        let err = catalog
            .add_book(NewBook::new("9780000000001", "Second"))
            .await
            .unwrap_err();

        assert_eq!(err.kind(), ErrorKind::ConstraintViolation);
        assert!(matches!(
            err.as_domain(),
            Some(CoreError::DuplicateIsbn { isbn }) if isbn == "9780000000001"
        ));
    }

    #[tokio::test]
    async fn test_shape_boundaries() {
        let (_db, catalog) = setup().await;

        catalog
            .add_book(NewBook::new("9780000000002", "T".repeat(200)))
            .await
            .unwrap();
        let err = catalog
            .add_book(NewBook::new("9780000000003", "T".repeat(201)))
            .await
            .unwrap_err();
        assert!(matches!(
            err.as_domain(),
            Some(CoreError::Validation(ValidationError::TitleTooLong { length: 201 }))
        ));

        for isbn in ["978000000000", "97800000000001"] {
            let err = catalog.add_book(NewBook::new(isbn, "x")).await.unwrap_err();
            assert_eq!(err.kind(), ErrorKind::Validation);
            assert!(matches!(
                err.as_domain(),
                Some(CoreError::Validation(ValidationError::InvalidIsbn { .. }))
            ));
        }

        let err = catalog
            .add_book(NewBook::new("9780000000004", "Neg").copies(-1))
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Validation);

        catalog
            .add_book(NewBook::new("9780000000005", ""))
            .await
            .unwrap();
    }

    #[test]
    fn test_store_violations_match_local_errors() {
        let book = NewBook::new("978", "x").copies(2).into_book(Utc::now());

        let err = reclassify_insert(
            DbError::CheckViolation {
                constraint: "books_isbn_length".into(),
            },
            &book,
        );
        assert_eq!(
            err.as_domain(),
            Some(&CoreError::Validation(ValidationError::InvalidIsbn {
                isbn: "978".into(),
                length: 3,
            }))
        );

        let err = reclassify_insert(DbError::duplicate("books.isbn", "978"), &book);
        assert!(matches!(err.as_domain(), Some(CoreError::DuplicateIsbn { .. })));

        let err = reclassify_insert(DbError::Internal("boom".into()), &book);
        assert_eq!(err.kind(), ErrorKind::Store);
    }

    #[tokio::test]
    async fn test_find_missing() {
        let (_db, catalog) = setup().await;
        let err = catalog.find_book("9789999999999").await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);
        assert_eq!(err.to_string(), "Book not found: 9789999999999");
    }

    #[tokio::test]
    async fn test_remove_book() {
        let (db, catalog) = setup().await;
        let book = catalog
            .add_book(NewBook::new("9780000000010", "Ephemeral").copies(1))
            .await
            .unwrap();

        let today = Utc::now();
        let loan = db
            .ledger()
            .issue_loan(&book.id, today, today + Duration::days(7))
            .await
            .unwrap();

        let err = catalog.remove_book(&book.isbn).await.unwrap_err();
        assert!(matches!(
            err.as_domain(),
            Some(CoreError::BookOnLoan { open_loans: 1, .. })
        ));

        db.ledger().return_loan(&loan.id).await.unwrap();
        catalog.remove_book(&book.isbn).await.unwrap();

        assert_eq!(catalog.find_book(&book.isbn).await.unwrap_err().kind(), ErrorKind::NotFound);
        // Closed loan history goes with the book
        assert!(db.loans().get_by_id(&loan.id).await.unwrap().is_none());

        let err = catalog.remove_book(&book.isbn).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);
    }

    #[tokio::test]
    async fn test_update_copies() {
        let (db, catalog) = setup().await;
        let book = catalog
            .add_book(NewBook::new("9780000000020", "Popular").copies(3))
            .await
            .unwrap();

        let today = Utc::now();
        for _ in 0..2 {
            db.ledger()
                .issue_loan(&book.id, today, today + Duration::days(14))
                .await
                .unwrap();
        }

        catalog.update_book_copies(&book.isbn, 5).await.unwrap();
        let got = catalog.find_book(&book.isbn).await.unwrap();
        assert_eq!((got.copies, got.available), (5, 3));

        catalog.update_book_copies(&book.isbn, 2).await.unwrap();
        let got = catalog.find_book(&book.isbn).await.unwrap();
        assert_eq!((got.copies, got.available), (2, 0));

        let err = catalog.update_book_copies(&book.isbn, 1).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ConstraintViolation);
        assert!(matches!(
            err.as_domain(),
            Some(CoreError::CopiesBelowOutstanding {
                requested: 1,
                on_loan: 2,
                ..
            })
        ));

        let err = catalog.update_book_copies(&book.isbn, -1).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Validation);

        let err = catalog.update_book_copies("9789999999999", 4).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);
    }

    #[tokio::test]
    async fn test_reconcile_repairs_drift() {
        let (db, catalog) = setup().await;
        let book = catalog
            .add_book(NewBook::new("9780000000030", "Drifted").copies(4))
            .await
            .unwrap();

        let today = Utc::now();
        db.ledger()
            .issue_loan(&book.id, today, today + Duration::days(3))
            .await
            .unwrap();

        // Simulate a write that bypassed the ledger
        sqlx::query("UPDATE books SET available = 0 WHERE id = ?1")
            .bind(&book.id)
            .execute(db.pool())
            .await
            .unwrap();

        let fixed = catalog.reconcile_availability(&book.isbn).await.unwrap();
        assert_eq!(fixed.available, 3);
        assert!(fixed.counters_consistent());

        let err = catalog
            .reconcile_availability("9789999999999")
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);
    }

    #[tokio::test]
    async fn test_relations_round_trip() {
        let (db, catalog) = setup().await;
        let reference = db.reference();

        let publisher = reference
            .add_publisher(NewPublisher {
                name: "Ace Books".into(),
                address: Some("New York".into()),
            })
            .await
            .unwrap();
        let book = catalog
            .add_book(
                NewBook::new("9780000000040", "Co-written")
                    .copies(1)
                    .publisher(&publisher.id),
            )
            .await
            .unwrap();

        let mut author_ids = Vec::new();
        for name in ["Ann Leckie", "Becky Chambers"] {
            let author = reference
                .add_author(NewAuthor {
                    name: name.into(),
                    biography: None,
                    birth_year: None,
                })
                .await
                .unwrap();
            catalog.link_author(&book.isbn, &author.id).await.unwrap();
            author_ids.push(author.id);
        }
        for name in ["Fiction", "Space Opera"] {
            let category = reference.add_category(NewCategory::new(name)).await.unwrap();
            catalog.link_category(&book.isbn, &category.id).await.unwrap();
        }

        let authors = catalog.authors_of(&book.isbn).await.unwrap();
        assert_eq!(
            authors.iter().map(|a| a.name.as_str()).collect::<Vec<_>>(),
            ["Ann Leckie", "Becky Chambers"]
        );
        let categories = catalog.categories_of(&book.isbn).await.unwrap();
        assert_eq!(
            categories.iter().map(|c| c.name.as_str()).collect::<Vec<_>>(),
            ["Fiction", "Space Opera"]
        );
        assert_eq!(
            catalog.publisher_of(&book.isbn).await.unwrap(),
            Some(publisher)
        );
        assert_eq!(
            db.authors().book_isbns(&author_ids[0]).await.unwrap(),
            vec![book.isbn.clone()]
        );

        let err = catalog
            .link_author(&book.isbn, &author_ids[0])
            .await
            .unwrap_err();
        assert!(matches!(
            err.as_domain(),
            Some(CoreError::DuplicateAssociation { relation, .. }) if relation == "author"
        ));

        let err = catalog.link_category(&book.isbn, "ghost").await.unwrap_err();
        assert!(matches!(
            err.as_domain(),
            Some(CoreError::UnknownReference { .. })
        ));
    }

    #[tokio::test]
    async fn test_unknown_publisher() {
        let (_db, catalog) = setup().await;
        let err = catalog
            .add_book(NewBook::new("9780000000050", "Orphan").publisher("ghost"))
            .await
            .unwrap_err();

        assert!(matches!(
            err.as_domain(),
            Some(CoreError::UnknownReference { entity, id }) if entity == "Publisher" && id == "ghost"
        ));
    }

    #[tokio::test]
    async fn test_list_books_orders_by_title() {
        let (_db, catalog) = setup().await;
        for (isbn, title) in [("9780000000062", "Zeta"), ("9780000000061", "Alpha")] {
            catalog.add_book(NewBook::new(isbn, title)).await.unwrap();
        }

        let titles: Vec<String> = catalog
            .list_books(10)
            .await
            .unwrap()
            .into_iter()
            .map(|b| b.title)
            .collect();
        assert_eq!(titles, ["Alpha", "Zeta"]);
    }
}
