//! Publisher rows.

use sqlx::SqlitePool;
use tracing::debug;

use crate::error::DbResult;
use libris_core::Publisher;

#[derive(Debug, Clone)]
pub struct PublisherRepository {
    pool: SqlitePool,
}

impl PublisherRepository {
    pub fn new(pool: SqlitePool) -> Self {
        PublisherRepository { pool }
    }

    pub async fn insert(&self, publisher: &Publisher) -> DbResult<()> {
        debug!(id = %publisher.id, name = %publisher.name, "Inserting publisher");

        sqlx::query("INSERT INTO publishers (id, name, address) VALUES (?1, ?2, ?3)")
            .bind(&publisher.id)
            .bind(&publisher.name)
            .bind(&publisher.address)
            .execute(&self.pool)
            .await?;

        Ok(())
    }

    pub async fn get_by_id(&self, id: &str) -> DbResult<Option<Publisher>> {
        let publisher = sqlx::query_as::<_, Publisher>(
            "SELECT id, name, address FROM publishers WHERE id = ?1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(publisher)
    }
}
