//! # Reference Data
//!
//! Authors, publishers, categories and reviews. Plain create/read with
//! the shape checks each entity needs; no counters involved.

use chrono::Utc;
use sqlx::SqlitePool;
use tracing::info;

use crate::error::{DbError, LibraryError, LibraryResult};
use crate::repository::author::AuthorRepository;
use crate::repository::category::CategoryRepository;
use crate::repository::publisher::PublisherRepository;
use crate::repository::review::ReviewRepository;
use libris_core::validation::{
    validate_new_author, validate_new_category, validate_new_publisher, validate_new_review,
};
use libris_core::{
    new_id, Author, Category, CoreError, NewAuthor, NewCategory, NewPublisher, NewReview,
    Publisher, Review, ValidationError,
};

/// Reference-data service.
#[derive(Debug, Clone)]
pub struct ReferenceData {
    authors: AuthorRepository,
    publishers: PublisherRepository,
    categories: CategoryRepository,
    reviews: ReviewRepository,
}

impl ReferenceData {
    pub fn new(pool: SqlitePool) -> Self {
        ReferenceData {
            authors: AuthorRepository::new(pool.clone()),
            publishers: PublisherRepository::new(pool.clone()),
            categories: CategoryRepository::new(pool.clone()),
            reviews: ReviewRepository::new(pool),
        }
    }

    // =========================================================================
    // Authors
    // =========================================================================

    pub async fn add_author(&self, input: NewAuthor) -> LibraryResult<Author> {
        validate_new_author(&input)?;

        let author = Author {
            id: new_id(),
            name: input.name,
            biography: input.biography,
            birth_year: input.birth_year,
        };
        self.authors.insert(&author).await?;

        info!(author_id = %author.id, name = %author.name, "Author added");
        Ok(author)
    }

    pub async fn get_author(&self, id: &str) -> LibraryResult<Author> {
        self.authors
            .get_by_id(id)
            .await?
            .ok_or_else(|| CoreError::not_found("Author", id).into())
    }

    // =========================================================================
    // Publishers
    // =========================================================================

    pub async fn add_publisher(&self, input: NewPublisher) -> LibraryResult<Publisher> {
        validate_new_publisher(&input)?;

        let publisher = Publisher {
            id: new_id(),
            name: input.name,
            address: input.address,
        };
        self.publishers.insert(&publisher).await?;

        info!(publisher_id = %publisher.id, name = %publisher.name, "Publisher added");
        Ok(publisher)
    }

    pub async fn get_publisher(&self, id: &str) -> LibraryResult<Publisher> {
        self.publishers
            .get_by_id(id)
            .await?
            .ok_or_else(|| CoreError::not_found("Publisher", id).into())
    }

    // =========================================================================
    // Categories
    // =========================================================================

    /// Adds a category; `DuplicateCategory` when the name is taken.
    pub async fn add_category(&self, input: NewCategory) -> LibraryResult<Category> {
        validate_new_category(&input)?;

        let category = Category {
            id: new_id(),
            name: input.name,
        };
        self.categories.insert(&category).await.map_err(|e| {
            if e.violates_unique("categories.name") {
                LibraryError::from(CoreError::DuplicateCategory {
                    name: category.name.clone(),
                })
            } else {
                e.into()
            }
        })?;

        info!(category_id = %category.id, name = %category.name, "Category added");
        Ok(category)
    }

    pub async fn get_category(&self, id: &str) -> LibraryResult<Category> {
        self.categories
            .get_by_id(id)
            .await?
            .ok_or_else(|| CoreError::not_found("Category", id).into())
    }

    pub async fn find_category_by_name(&self, name: &str) -> LibraryResult<Category> {
        self.categories
            .get_by_name(name)
            .await?
            .ok_or_else(|| CoreError::not_found("Category", name).into())
    }

    // =========================================================================
    // Reviews
    // =========================================================================

    /// Adds a review; `RatingOutOfRange` outside 1..=5.
    pub async fn add_review(&self, input: NewReview) -> LibraryResult<Review> {
        validate_new_review(&input)?;

        let review = input.into_review(Utc::now());
        self.reviews
            .insert(&review)
            .await
            .map_err(|e| reclassify_review(e, review.rating))?;

        info!(review_id = %review.id, rating = review.rating, "Review added");
        Ok(review)
    }

    pub async fn get_review(&self, id: &str) -> LibraryResult<Review> {
        self.reviews
            .get_by_id(id)
            .await?
            .ok_or_else(|| CoreError::not_found("Review", id).into())
    }

    pub async fn reviews_for_product(&self, product_id: &str) -> LibraryResult<Vec<Review>> {
        Ok(self.reviews.for_product(product_id).await?)
    }
}

fn reclassify_review(err: DbError, rating: i64) -> LibraryError {
    if err.violates_check("reviews_rating_range") {
        ValidationError::RatingOutOfRange { rating }.into()
    } else {
        err.into()
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
