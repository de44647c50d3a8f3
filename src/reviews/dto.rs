use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::reviews::repo_types::Review;

/// Form body for `/review/create`. Each field holds a JSON document, the way
/// the web client submits them.
#[derive(Debug, Default, Deserialize)]
pub struct CreateReviewForm {
    pub review: Option<String>,
    pub author: Option<String>,
    pub movie: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct UpdateReviewForm {
    pub review: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct ReviewPart {
    pub content: Option<String>,
    pub rating: Option<f64>,
    #[serde(default)]
    pub tags: Vec<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct AuthorPart {
    #[serde(alias = "_id")]
    pub id: Option<Uuid>,
    #[serde(rename = "nickName")]
    pub nickname: Option<String>,
}

/// Movie ids arrive as strings or as numbers from the catalogue API.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum MovieId {
    Text(String),
    Number(serde_json::Number),
}

impl MovieId {
    pub fn into_string(self) -> String {
        match self {
            MovieId::Text(s) => s,
            MovieId::Number(n) => n.to_string(),
        }
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct MoviePart {
    pub id: Option<MovieId>,
    pub title: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct UpdatePart {
    #[serde(alias = "_id")]
    pub id: Option<Uuid>,
    pub content: Option<String>,
    pub rating: Option<f64>,
}

#[derive(Debug, Deserialize)]
pub struct IdQuery {
    pub id: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FindQuery {
    pub user_id: Option<String>,
    pub movie_id: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserReviewsQuery {
    pub user_id: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct CreatedReview {
    pub review: Review,
}

#[derive(Debug, Serialize)]
pub struct CreateReviewResponse {
    pub success: bool,
    pub message: String,
    pub data: CreatedReview,
}

#[derive(Debug, Serialize)]
pub struct MovieReviewsResponse {
    pub success: bool,
    pub message: String,
    pub reviews: Vec<Review>,
}

#[derive(Debug, Serialize)]
pub struct ReviewResponse {
    pub success: bool,
    pub message: String,
    pub review: Review,
}

#[derive(Debug, Serialize)]
pub struct UserReviewsResponse {
    pub success: bool,
    pub message: String,
    pub data: Vec<Review>,
}
