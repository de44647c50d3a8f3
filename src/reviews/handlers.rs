use axum::{
    extract::{Query, State},
    http::StatusCode,
    routing::{delete, get, post},
    Form, Json, Router,
};
use tracing::instrument;

use crate::{
    auth::dto::MessageResponse,
    error::AppError,
    reviews::{
        dto::{
            CreateReviewForm, CreateReviewResponse, CreatedReview, FindQuery, IdQuery,
            MovieReviewsResponse, ReviewResponse, UpdateReviewForm, UserReviewsResponse,
            UserReviewsQuery,
        },
        services,
    },
    state::AppState,
};

pub fn review_routes() -> Router<AppState> {
    Router::new()
        .route("/review/create", post(create))
        .route("/review/update", post(update))
        .route("/review/delete", delete(remove))
        .route("/review/view", get(view))
        .route("/review/find", get(find))
        .route("/review/findUserReviews", get(find_user_reviews))
}

#[instrument(skip(state, form))]
pub async fn create(
    State(state): State<AppState>,
    Form(form): Form<CreateReviewForm>,
) -> Result<(StatusCode, Json<CreateReviewResponse>), AppError> {
    let review = services::create_review(&state, form).await?;
    Ok((
        StatusCode::CREATED,
        Json(CreateReviewResponse {
            success: true,
            message: "review created".into(),
            data: CreatedReview { review },
        }),
    ))
}

#[instrument(skip(state, form))]
pub async fn update(
    State(state): State<AppState>,
    Form(form): Form<UpdateReviewForm>,
) -> Result<Json<MessageResponse>, AppError> {
    services::update_review(&state, form).await?;
    Ok(Json(MessageResponse::ok("review updated")))
}

#[instrument(skip(state))]
pub async fn remove(
    State(state): State<AppState>,
    Query(q): Query<IdQuery>,
) -> Result<Json<MessageResponse>, AppError> {
    services::delete_review(&state, q.id.as_deref()).await?;
    Ok(Json(MessageResponse::ok("review deleted")))
}

#[instrument(skip(state))]
pub async fn view(
    State(state): State<AppState>,
    Query(q): Query<IdQuery>,
) -> Result<Json<MovieReviewsResponse>, AppError> {
    let reviews = services::movie_reviews(&state, q.id.as_deref()).await?;
    Ok(Json(MovieReviewsResponse {
        success: true,
        message: "movie reviews".into(),
        reviews,
    }))
}

#[instrument(skip(state))]
pub async fn find(
    State(state): State<AppState>,
    Query(q): Query<FindQuery>,
) -> Result<Json<ReviewResponse>, AppError> {
    let review = services::find_review(&state, q.user_id.as_deref(), q.movie_id.as_deref()).await?;
    Ok(Json(ReviewResponse {
        success: true,
        message: "review".into(),
        review,
    }))
}

#[instrument(skip(state))]
pub async fn find_user_reviews(
    State(state): State<AppState>,
    Query(q): Query<UserReviewsQuery>,
) -> Result<Json<UserReviewsResponse>, AppError> {
    let data = services::user_reviews(&state, q.user_id.as_deref()).await?;
    Ok(Json(UserReviewsResponse {
        success: true,
        message: "user reviews".into(),
        data,
    }))
}
