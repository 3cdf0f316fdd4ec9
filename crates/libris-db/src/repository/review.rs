//! Review rows. `reviews_rating_range` rejects ratings outside 1..=5.

use sqlx::SqlitePool;
use tracing::debug;

use crate::error::DbResult;
use libris_core::Review;

#[derive(Debug, Clone)]
pub struct ReviewRepository {
    pool: SqlitePool,
}

impl ReviewRepository {
    pub fn new(pool: SqlitePool) -> Self {
        ReviewRepository { pool }
    }

    pub async fn insert(&self, review: &Review) -> DbResult<()> {
        debug!(id = %review.id, rating = review.rating, "Inserting review");

        sqlx::query(
            r#"
            INSERT INTO reviews (id, rating, comment, customer_id, product_id, created_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6)
            "#,
        )
        .bind(&review.id)
        .bind(review.rating)
        .bind(&review.comment)
        .bind(&review.customer_id)
        .bind(&review.product_id)
        .bind(review.created_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    pub async fn get_by_id(&self, id: &str) -> DbResult<Option<Review>> {
        let review = sqlx::query_as::<_, Review>(
            r#"
            SELECT id, rating, comment, customer_id, product_id, created_at
            FROM reviews
            WHERE id = ?1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(review)
    }

    /// Reviews for a product, newest first.
    pub async fn for_product(&self, product_id: &str) -> DbResult<Vec<Review>> {
        let reviews = sqlx::query_as::<_, Review>(
            r#"
            SELECT id, rating, comment, customer_id, product_id, created_at
            FROM reviews
            WHERE product_id = ?1
            ORDER BY created_at DESC, id
            "#,
        )
        .bind(product_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(reviews)
    }
}

#[cfg(test)]
mod tests {
    use crate::{Database, DbConfig};
    use chrono::Utc;
    use libris_core::NewReview;

    #[tokio::test]
    async fn test_rating_check_backstops_validation() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let repo = db.reviews();

        let review = |rating| {
            NewReview {
                rating,
                comment: None,
                customer_id: "c-1".into(),
                product_id: "p-1".into(),
            }
            .into_review(Utc::now())
        };

        repo.insert(&review(5)).await.unwrap();
        repo.insert(&review(1)).await.unwrap();

        for bad in [0, 6] {
            let err = repo.insert(&review(bad)).await.unwrap_err();
            assert!(err.violates_check("reviews_rating_range"), "got {err:?}");
        }

        assert_eq!(repo.for_product("p-1").await.unwrap().len(), 2);
    }
}
