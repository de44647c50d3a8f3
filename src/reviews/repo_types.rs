use serde::Serialize;
use sqlx::FromRow;
use time::OffsetDateTime;
use uuid::Uuid;

#[derive(Debug, Clone, FromRow)]
pub struct ReviewRow {
    pub id: Uuid,
    pub content: String,
    pub rating: f64,
    pub tags: Vec<String>,
    pub author_id: Uuid,
    pub author_nickname: String,
    pub movie_id: String,
    pub movie_title: String,
    pub created_at: OffsetDateTime,
    pub updated_at: OffsetDateTime,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReviewBody {
    pub content: String,
    pub rating: f64,
    pub tags: Vec<String>,
}

/// Author as it was when the review was written.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AuthorSnapshot {
    pub id: Uuid,
    #[serde(rename = "nickName")]
    pub nickname: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MovieSnapshot {
    pub id: String,
    pub title: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Review {
    pub id: Uuid,
    pub review: ReviewBody,
    pub author: AuthorSnapshot,
    pub movie: MovieSnapshot,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
}

impl From<ReviewRow> for Review {
    fn from(r: ReviewRow) -> Self {
        Self {
            id: r.id,
            review: ReviewBody {
                content: r.content,
                rating: r.rating,
                tags: r.tags,
            },
            author: AuthorSnapshot {
                id: r.author_id,
                nickname: r.author_nickname,
            },
            movie: MovieSnapshot {
                id: r.movie_id,
                title: r.movie_title,
            },
            created_at: r.created_at,
            updated_at: r.updated_at,
        }
    }
}

/// A validated review ready to insert.
#[derive(Debug, Clone)]
pub struct NewReview {
    pub review: ReviewBody,
    pub author: AuthorSnapshot,
    pub movie: MovieSnapshot,
}

/// The only fields a review update may change.
#[derive(Debug, Clone)]
pub struct ReviewChanges {
    pub id: Uuid,
    pub content: String,
    pub rating: f64,
}
