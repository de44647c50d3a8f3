use async_trait::async_trait;
use sqlx::PgPool;

use crate::auth::repo_types::{NewUser, User};
use crate::error::{is_unique_violation, AppError};

/// Persistence for user records and their current refresh token.
#[async_trait]
pub trait UserStore: Send + Sync {
    async fn find_by_email(&self, email: &str) -> Result<Option<User>, AppError>;
    async fn find_by_id(&self, id: uuid::Uuid) -> Result<Option<User>, AppError>;
    async fn find_by_refresh_token(&self, token: &str) -> Result<Option<User>, AppError>;
    /// Fails with `AppError::Conflict` when the email is already taken.
    async fn create(&self, user: NewUser) -> Result<User, AppError>;
    /// Overwrites the stored refresh token. Returns false if the user is gone.
    async fn set_refresh_token(&self, id: uuid::Uuid, token: &str) -> Result<bool, AppError>;
    /// Clears the refresh token of whichever user holds `token`.
    async fn clear_refresh_token(&self, token: &str) -> Result<bool, AppError>;
    async fn delete_by_email(&self, email: &str) -> Result<bool, AppError>;
}

const USER_COLUMNS: &str =
    "id, email, nickname, password_hash, refresh_token, created_at, updated_at";

#[derive(Clone)]
pub struct PgUserStore {
    db: PgPool,
}

impl PgUserStore {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }
}

#[async_trait]
impl UserStore for PgUserStore {
    async fn find_by_email(&self, email: &str) -> Result<Option<User>, AppError> {
        let user = sqlx::query_as::<_, User>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE email = $1"
        ))
        .bind(email)
        .fetch_optional(&self.db)
        .await?;
        Ok(user)
    }

    async fn find_by_id(&self, id: uuid::Uuid) -> Result<Option<User>, AppError> {
        let user = sqlx::query_as::<_, User>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.db)
        .await?;
        Ok(user)
    }

    async fn find_by_refresh_token(&self, token: &str) -> Result<Option<User>, AppError> {
        let user = sqlx::query_as::<_, User>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE refresh_token = $1"
        ))
        .bind(token)
        .fetch_optional(&self.db)
        .await?;
        Ok(user)
    }

    async fn create(&self, user: NewUser) -> Result<User, AppError> {
        sqlx::query_as::<_, User>(&format!(
            r#"
            INSERT INTO users (email, nickname, password_hash)
            VALUES ($1, $2, $3)
            RETURNING {USER_COLUMNS}
            "#
        ))
        .bind(&user.email)
        .bind(&user.nickname)
        .bind(&user.password_hash)
        .fetch_one(&self.db)
        .await
        .map_err(|e| {
            if is_unique_violation(&e) {
                AppError::Conflict("email already registered".into())
            } else {
                e.into()
            }
        })
    }

    async fn set_refresh_token(&self, id: uuid::Uuid, token: &str) -> Result<bool, AppError> {
        let res = sqlx::query(
            "UPDATE users SET refresh_token = $2, updated_at = now() WHERE id = $1",
        )
        .bind(id)
        .bind(token)
        .execute(&self.db)
        .await?;
        Ok(res.rows_affected() == 1)
    }

    async fn clear_refresh_token(&self, token: &str) -> Result<bool, AppError> {
        let res = sqlx::query(
            "UPDATE users SET refresh_token = NULL, updated_at = now() WHERE refresh_token = $1",
        )
        .bind(token)
        .execute(&self.db)
        .await?;
        Ok(res.rows_affected() > 0)
    }

    async fn delete_by_email(&self, email: &str) -> Result<bool, AppError> {
        let res = sqlx::query("DELETE FROM users WHERE email = $1")
            .bind(email)
            .execute(&self.db)
            .await?;
        Ok(res.rows_affected() > 0)
    }
}
