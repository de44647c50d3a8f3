use async_trait::async_trait;
use sqlx::PgPool;
use uuid::Uuid;

use crate::error::AppError;
use crate::reviews::repo_types::{NewReview, Review, ReviewChanges, ReviewRow};

#[async_trait]
pub trait ReviewStore: Send + Sync {
    async fn create(&self, review: NewReview) -> Result<Review, AppError>;
    /// Returns `None` when no review has that id.
    async fn update(&self, changes: ReviewChanges) -> Result<Option<Review>, AppError>;
    async fn delete(&self, id: Uuid) -> Result<bool, AppError>;
    async fn list_by_movie(&self, movie_id: &str) -> Result<Vec<Review>, AppError>;
    async fn list_by_author(&self, author_id: Uuid) -> Result<Vec<Review>, AppError>;
    async fn find_by_author_and_movie(
        &self,
        author_id: Uuid,
        movie_id: &str,
    ) -> Result<Option<Review>, AppError>;
}

const REVIEW_COLUMNS: &str = "id, content, rating, tags, author_id, author_nickname, \
                              movie_id, movie_title, created_at, updated_at";

#[derive(Clone)]
pub struct PgReviewStore {
    db: PgPool,
}

impl PgReviewStore {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }
}

#[async_trait]
impl ReviewStore for PgReviewStore {
    async fn create(&self, review: NewReview) -> Result<Review, AppError> {
        let row = sqlx::query_as::<_, ReviewRow>(&format!(
            r#"
            INSERT INTO reviews (content, rating, tags, author_id, author_nickname, movie_id, movie_title)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING {REVIEW_COLUMNS}
            "#
        ))
        .bind(&review.review.content)
        .bind(review.review.rating)
        .bind(&review.review.tags)
        .bind(review.author.id)
        .bind(&review.author.nickname)
        .bind(&review.movie.id)
        .bind(&review.movie.title)
        .fetch_one(&self.db)
        .await?;
        Ok(row.into())
    }

    async fn update(&self, changes: ReviewChanges) -> Result<Option<Review>, AppError> {
        let row = sqlx::query_as::<_, ReviewRow>(&format!(
            r#"
            UPDATE reviews
               SET content = $2, rating = $3, updated_at = now()
             WHERE id = $1
            RETURNING {REVIEW_COLUMNS}
            "#
        ))
        .bind(changes.id)
        .bind(&changes.content)
        .bind(changes.rating)
        .fetch_optional(&self.db)
        .await?;
        Ok(row.map(Review::from))
    }

    async fn delete(&self, id: Uuid) -> Result<bool, AppError> {
        let res = sqlx::query("DELETE FROM reviews WHERE id = $1")
            .bind(id)
            .execute(&self.db)
            .await?;
        Ok(res.rows_affected() > 0)
    }

    async fn list_by_movie(&self, movie_id: &str) -> Result<Vec<Review>, AppError> {
        let rows = sqlx::query_as::<_, ReviewRow>(&format!(
            "SELECT {REVIEW_COLUMNS} FROM reviews WHERE movie_id = $1 ORDER BY created_at DESC"
        ))
        .bind(movie_id)
        .fetch_all(&self.db)
        .await?;
        Ok(rows.into_iter().map(Review::from).collect())
    }

    async fn list_by_author(&self, author_id: Uuid) -> Result<Vec<Review>, AppError> {
        let rows = sqlx::query_as::<_, ReviewRow>(&format!(
            "SELECT {REVIEW_COLUMNS} FROM reviews WHERE author_id = $1 ORDER BY created_at DESC"
        ))
        .bind(author_id)
        .fetch_all(&self.db)
        .await?;
        Ok(rows.into_iter().map(Review::from).collect())
    }

    async fn find_by_author_and_movie(
        &self,
        author_id: Uuid,
        movie_id: &str,
    ) -> Result<Option<Review>, AppError> {
        let row = sqlx::query_as::<_, ReviewRow>(&format!(
            r#"
            SELECT {REVIEW_COLUMNS}
              FROM reviews
             WHERE author_id = $1 AND movie_id = $2
             ORDER BY created_at DESC
             LIMIT 1
            "#
        ))
        .bind(author_id)
        .bind(movie_id)
        .fetch_optional(&self.db)
        .await?;
        Ok(row.map(Review::from))
    }
}
