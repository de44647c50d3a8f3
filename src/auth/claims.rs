use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::auth::dto::PublicUser;

/// Type of JWT: access or refresh.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum TokenKind {
    Access,
    Refresh,
}

/// JWT payload. Both token kinds carry the same identity fields.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: Uuid,        // user ID
    pub email: String,
    pub nickname: String,
    pub iat: usize,       // issued at (unix timestamp)
    pub exp: usize,       // expires at (unix timestamp)
    pub iss: String,
    pub aud: String,
    pub kind: TokenKind,
    pub jti: Uuid,        // unique per token
}

impl Claims {
    pub fn user(&self) -> PublicUser {
        PublicUser {
            id: self.sub,
            email: self.email.clone(),
            nickname: self.nickname.clone(),
        }
    }
}
