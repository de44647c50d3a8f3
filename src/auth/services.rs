use lazy_static::lazy_static;
use regex::Regex;
use tracing::{info, warn};

use crate::{
    auth::{
        dto::{PublicUser, RegisterRequest},
        password,
        repo_types::NewUser,
    },
    error::AppError,
    state::AppState,
};

pub(crate) fn is_valid_email(email: &str) -> bool {
    lazy_static! {
        static ref EMAIL_RE: Regex = Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").unwrap();
    }
    EMAIL_RE.is_match(email)
}

pub(crate) fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

/// Tokens minted by a successful login.
#[derive(Debug)]
pub struct LoginOutcome {
    pub access_token: String,
    pub refresh_token: String,
    pub user: PublicUser,
}

pub async fn register(state: &AppState, req: RegisterRequest) -> Result<PublicUser, AppError> {
    let email = normalize_email(&req.email);
    let nickname = req.nickname.trim().to_string();

    let mut missing = Vec::new();
    if email.is_empty() {
        missing.push("email");
    }
    if req.password.is_empty() {
        missing.push("password");
    }
    if nickname.is_empty() {
        missing.push("nickName");
    }
    if !missing.is_empty() {
        return Err(AppError::Validation(format!(
            "missing required fields: {}",
            missing.join(", ")
        )));
    }
    if !is_valid_email(&email) {
        warn!(%email, "invalid email");
        return Err(AppError::Validation("invalid email".into()));
    }

    if state.users.find_by_email(&email).await?.is_some() {
        warn!(%email, "email already registered");
        return Err(AppError::Conflict("email already registered".into()));
    }

    let password_hash = password::hash(req.password).await?;

    // The unique index still decides when two registrations race.
    let user = state
        .users
        .create(NewUser {
            email,
            nickname,
            password_hash,
        })
        .await?;

    info!(user_id = %user.id, email = %user.email, "user registered");
    Ok(PublicUser::from(&user))
}

/// Verifies credentials, mints both tokens and persists the refresh token.
///
/// The refresh token is stored before anything is returned, so a caller never
/// holds a token the server does not know about. Each login replaces the
/// previous refresh token: one live session per user.
pub async fn login(
    state: &AppState,
    email: &str,
    password: String,
) -> Result<LoginOutcome, AppError> {
    let email = normalize_email(email);
    if email.is_empty() || password.is_empty() {
        return Err(AppError::Validation(
            "email and password are required".into(),
        ));
    }

    let Some(user) = state.users.find_by_email(&email).await? else {
        // Same argon2 cost as a wrong password.
        password::verify_dummy(password).await?;
        warn!(%email, "login unknown email");
        return Err(AppError::InvalidCredentials);
    };

    if !password::verify(password, user.password_hash.clone()).await? {
        warn!(%email, user_id = %user.id, "login invalid password");
        return Err(AppError::InvalidCredentials);
    }

    let public = PublicUser::from(&user);
    let access_token = state.jwt.issue_access_token(&public)?;
    let refresh_token = state.jwt.issue_refresh_token(&public)?;

    if !state.users.set_refresh_token(user.id, &refresh_token).await? {
        warn!(user_id = %user.id, "user vanished before refresh token was stored");
        return Err(AppError::Internal(anyhow::anyhow!(
            "refresh token not persisted for {}",
            user.id
        )));
    }

    info!(user_id = %user.id, email = %user.email, "user logged in");
    Ok(LoginOutcome {
        access_token,
        refresh_token,
        user: public,
    })
}

/// Clears the stored refresh token if any user holds it. Idempotent.
pub async fn logout(state: &AppState, refresh_token: Option<&str>) -> Result<(), AppError> {
    let Some(token) = refresh_token else {
        info!("logout without session cookie");
        return Ok(());
    };
    if state.users.clear_refresh_token(token).await? {
        info!("session cleared");
    } else {
        info!("logout for unknown session");
    }
    Ok(())
}

/// Mints a new access token for the holder of a stored refresh token.
///
/// The token must both match what is persisted and carry a valid refresh
/// signature that has not expired. The refresh token itself is not rotated.
pub async fn refresh(
    state: &AppState,
    refresh_token: Option<&str>,
) -> Result<(String, PublicUser), AppError> {
    let Some(token) = refresh_token else {
        return Err(AppError::Unauthorized("refresh token missing".into()));
    };

    let Some(user) = state.users.find_by_refresh_token(token).await? else {
        warn!("refresh token does not match any session");
        return Err(AppError::Unauthorized("refresh token not recognized".into()));
    };

    match state.jwt.verify_refresh(token) {
        Ok(claims) if claims.sub == user.id => {}
        Ok(_) => {
            warn!(user_id = %user.id, "refresh token subject mismatch");
            return Err(AppError::Unauthorized("refresh token not recognized".into()));
        }
        Err(e) => {
            warn!(user_id = %user.id, error = %e, "stored refresh token failed verification");
            return Err(AppError::Unauthorized("refresh token expired or invalid".into()));
        }
    }

    let public = PublicUser::from(&user);
    let access_token = state.jwt.issue_access_token(&public)?;
    info!(user_id = %user.id, "access token reissued");
    Ok((access_token, public))
}

/// Hard-deletes the user with `email`.
pub async fn withdraw(state: &AppState, email: &str) -> Result<(), AppError> {
    let email = normalize_email(email);
    if email.is_empty() {
        return Err(AppError::Validation("email is required".into()));
    }
    if !state.users.delete_by_email(&email).await? {
        return Err(AppError::NotFound("no user with that email".into()));
    }
    info!(%email, "user withdrawn");
    Ok(())
}
