use serde::de::DeserializeOwned;
use tracing::info;
use uuid::Uuid;

use crate::{
    error::AppError,
    reviews::{
        dto::{AuthorPart, CreateReviewForm, MoviePart, ReviewPart, UpdatePart, UpdateReviewForm},
        repo_types::{AuthorSnapshot, MovieSnapshot, NewReview, Review, ReviewBody, ReviewChanges},
    },
    state::AppState,
};

/// Parses one JSON form part. A missing part parses as `T::default()` so that
/// every missing field gets reported together.
fn parse_part<T>(name: &str, raw: Option<&str>) -> Result<T, AppError>
where
    T: DeserializeOwned + Default,
{
    match raw.map(str::trim).filter(|s| !s.is_empty()) {
        None => Ok(T::default()),
        Some(s) => serde_json::from_str(s)
            .map_err(|e| AppError::Validation(format!("malformed {name}: {e}"))),
    }
}

fn non_blank(v: Option<String>) -> Option<String> {
    v.map(|s| s.trim().to_string()).filter(|s| !s.is_empty())
}

fn missing_fields(missing: Vec<&str>) -> AppError {
    AppError::Validation(format!("missing required fields: {}", missing.join(", ")))
}

fn check_rating(rating: f64) -> Result<f64, AppError> {
    if rating.is_finite() {
        Ok(rating)
    } else {
        Err(AppError::Validation("rating must be a number".into()))
    }
}

pub(crate) fn parse_uuid(name: &str, raw: Option<&str>) -> Result<Uuid, AppError> {
    let raw = raw
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .ok_or_else(|| AppError::Validation(format!("{name} is required")))?;
    Uuid::parse_str(raw).map_err(|_| AppError::Validation(format!("{name} is not a valid id")))
}

pub(crate) fn validate_new_review(form: CreateReviewForm) -> Result<NewReview, AppError> {
    let review: ReviewPart = parse_part("review", form.review.as_deref())?;
    let author: AuthorPart = parse_part("author", form.author.as_deref())?;
    let movie: MoviePart = parse_part("movie", form.movie.as_deref())?;

    let content = non_blank(review.content);
    let author_nickname = non_blank(author.nickname);
    let movie_id = non_blank(movie.id.map(|id| id.into_string()));
    let movie_title = non_blank(movie.title);

    let mut missing = Vec::new();
    if content.is_none() {
        missing.push("review.content");
    }
    if review.rating.is_none() {
        missing.push("review.rating");
    }
    if author.id.is_none() {
        missing.push("author._id");
    }
    if author_nickname.is_none() {
        missing.push("author.nickName");
    }
    if movie_id.is_none() {
        missing.push("movie.id");
    }
    if movie_title.is_none() {
        missing.push("movie.title");
    }

    match (content, review.rating, author.id, author_nickname, movie_id, movie_title) {
        (Some(content), Some(rating), Some(author_id), Some(nickname), Some(movie_id), Some(title)) => {
            Ok(NewReview {
                review: ReviewBody {
                    content,
                    rating: check_rating(rating)?,
                    tags: review
                        .tags
                        .into_iter()
                        .map(|t| t.trim().to_string())
                        .filter(|t| !t.is_empty())
                        .collect(),
                },
                author: AuthorSnapshot {
                    id: author_id,
                    nickname,
                },
                movie: MovieSnapshot {
                    id: movie_id,
                    title,
                },
            })
        }
        _ => Err(missing_fields(missing)),
    }
}

pub(crate) fn validate_changes(form: UpdateReviewForm) -> Result<ReviewChanges, AppError> {
    let part: UpdatePart = parse_part("review", form.review.as_deref())?;
    let content = non_blank(part.content);

    let mut missing = Vec::new();
    if part.id.is_none() {
        missing.push("review._id");
    }
    if content.is_none() {
        missing.push("review.content");
    }
    if part.rating.is_none() {
        missing.push("review.rating");
    }

    match (part.id, content, part.rating) {
        (Some(id), Some(content), Some(rating)) => Ok(ReviewChanges {
            id,
            content,
            rating: check_rating(rating)?,
        }),
        _ => Err(missing_fields(missing)),
    }
}

pub async fn create_review(state: &AppState, form: CreateReviewForm) -> Result<Review, AppError> {
    let new = validate_new_review(form)?;
    let review = state.reviews.create(new).await?;
    info!(review_id = %review.id, movie_id = %review.movie.id, author_id = %review.author.id, "review created");
    Ok(review)
}

pub async fn update_review(state: &AppState, form: UpdateReviewForm) -> Result<Review, AppError> {
    let changes = validate_changes(form)?;
    let id = changes.id;
    let review = state
        .reviews
        .update(changes)
        .await?
        .ok_or_else(|| AppError::NotFound("review not found".into()))?;
    info!(review_id = %id, "review updated");
    Ok(review)
}

pub async fn delete_review(state: &AppState, id: Option<&str>) -> Result<(), AppError> {
    let id = parse_uuid("id", id)?;
    if !state.reviews.delete(id).await? {
        return Err(AppError::NotFound(
            "review not found or already deleted".into(),
        ));
    }
    info!(review_id = %id, "review deleted");
    Ok(())
}

pub async fn movie_reviews(state: &AppState, movie_id: Option<&str>) -> Result<Vec<Review>, AppError> {
    let movie_id = movie_id
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .ok_or_else(|| AppError::Validation("movie id is required".into()))?;
    state.reviews.list_by_movie(movie_id).await
}

pub async fn find_review(
    state: &AppState,
    user_id: Option<&str>,
    movie_id: Option<&str>,
) -> Result<Review, AppError> {
    let author_id = parse_uuid("userId", user_id)?;
    let movie_id = movie_id
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .ok_or_else(|| AppError::Validation("movieId is required".into()))?;
    state
        .reviews
        .find_by_author_and_movie(author_id, movie_id)
        .await?
        .ok_or_else(|| AppError::NotFound("review does not exist".into()))
}

pub async fn user_reviews(state: &AppState, user_id: Option<&str>) -> Result<Vec<Review>, AppError> {
    let author_id = parse_uuid("userId", user_id)?;
    state.reviews.list_by_author(author_id).await
}
