//! Author rows.

use sqlx::SqlitePool;
use tracing::debug;

use crate::error::DbResult;
use libris_core::Author;

#[derive(Debug, Clone)]
pub struct AuthorRepository {
    pool: SqlitePool,
}

impl AuthorRepository {
    pub fn new(pool: SqlitePool) -> Self {
        AuthorRepository { pool }
    }

    pub async fn insert(&self, author: &Author) -> DbResult<()> {
        debug!(id = %author.id, name = %author.name, "Inserting author");

        sqlx::query("INSERT INTO authors (id, name, biography, birth_year) VALUES (?1, ?2, ?3, ?4)")
            .bind(&author.id)
            .bind(&author.name)
            .bind(&author.biography)
            .bind(author.birth_year)
            .execute(&self.pool)
            .await?;

        Ok(())
    }

    pub async fn get_by_id(&self, id: &str) -> DbResult<Option<Author>> {
        let author = sqlx::query_as::<_, Author>(
            "SELECT id, name, biography, birth_year FROM authors WHERE id = ?1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(author)
    }

    /// ISBNs of the books this author is linked to, ordered.
    pub async fn book_isbns(&self, author_id: &str) -> DbResult<Vec<String>> {
        let isbns: Vec<String> = sqlx::query_scalar(
            r#"
            SELECT b.isbn
            FROM books b
            INNER JOIN book_authors ba ON ba.book_id = b.id
            WHERE ba.author_id = ?1
            ORDER BY b.isbn
            "#,
        )
        .bind(author_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(isbns)
    }
}
