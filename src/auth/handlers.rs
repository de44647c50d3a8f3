use axum::{
    extract::State,
    http::StatusCode,
    routing::{delete, get, post},
    Form, Json, Router,
};
use axum_extra::extract::CookieJar;
use tracing::instrument;

use crate::{
    auth::{
        dto::{
            LoginRequest, LoginResponse, MessageResponse, PublicUser, RefreshResponse,
            RegisterRequest, WithdrawalRequest,
        },
        extractors::AuthUser,
        services, session,
    },
    error::AppError,
    state::AppState,
};

pub fn auth_routes() -> Router<AppState> {
    Router::new()
        .route("/register", post(register))
        .route("/login", post(login))
        .route("/logout", post(logout))
        .route("/withdrawal", delete(withdrawal))
        .route("/refreshToken", post(refresh))
}

pub fn me_routes() -> Router<AppState> {
    Router::new().route("/me", get(get_me))
}

#[instrument(skip(state, payload))]
pub async fn register(
    State(state): State<AppState>,
    Form(payload): Form<RegisterRequest>,
) -> Result<(StatusCode, Json<MessageResponse>), AppError> {
    services::register(&state, payload).await?;
    Ok((
        StatusCode::CREATED,
        Json(MessageResponse::ok("registration complete")),
    ))
}

#[instrument(skip(state, jar, payload))]
pub async fn login(
    State(state): State<AppState>,
    jar: CookieJar,
    Form(payload): Form<LoginRequest>,
) -> Result<(CookieJar, Json<LoginResponse>), AppError> {
    let out = services::login(&state, &payload.email, payload.password).await?;

    let cookie = session::refresh_cookie(
        out.refresh_token,
        state.jwt.refresh_ttl,
        state.config.production,
    );
    Ok((
        jar.add(cookie),
        Json(LoginResponse {
            success: true,
            message: "login successful".into(),
            access_token: out.access_token,
            user: out.user,
        }),
    ))
}

#[instrument(skip(state, jar))]
pub async fn logout(
    State(state): State<AppState>,
    jar: CookieJar,
) -> Result<(CookieJar, Json<MessageResponse>), AppError> {
    let token = session::read_refresh_token(&jar);
    services::logout(&state, token.as_deref()).await?;
    Ok((
        jar.remove(session::removal_cookie(state.config.production)),
        Json(MessageResponse::ok("logout successful")),
    ))
}

#[instrument(skip(state, payload))]
pub async fn withdrawal(
    State(state): State<AppState>,
    Form(payload): Form<WithdrawalRequest>,
) -> Result<Json<MessageResponse>, AppError> {
    services::withdraw(&state, &payload.email).await?;
    Ok(Json(MessageResponse::ok("account deleted")))
}

#[instrument(skip(state, jar))]
pub async fn refresh(
    State(state): State<AppState>,
    jar: CookieJar,
) -> Result<(StatusCode, Json<RefreshResponse>), AppError> {
    let token = session::read_refresh_token(&jar);
    let (access_token, user) = services::refresh(&state, token.as_deref()).await?;
    Ok((
        StatusCode::CREATED,
        Json(RefreshResponse {
            success: true,
            message: "access token reissued".into(),
            access_token,
            user_data: user,
        }),
    ))
}

#[instrument(skip(state, user))]
pub async fn get_me(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
) -> Result<Json<PublicUser>, AppError> {
    // Claims may outlive the account; confirm it still exists.
    let stored = state
        .users
        .find_by_id(user.id)
        .await?
        .ok_or_else(|| AppError::Unauthorized("user not found".into()))?;
    Ok(Json(PublicUser::from(&stored)))
}
