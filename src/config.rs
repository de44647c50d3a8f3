use std::time::Duration;

use anyhow::{bail, Context};
use serde::Deserialize;

/// Longest accepted token lifetime: one year.
const MAX_TTL_MINUTES: i64 = 60 * 24 * 365;

#[derive(Debug, Clone, Deserialize)]
pub struct JwtConfig {
    pub access_secret: String,
    pub refresh_secret: String,
    pub issuer: String,
    pub audience: String,
    pub access_ttl_minutes: i64,
    pub refresh_ttl_minutes: i64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DbConnectConfig {
    pub max_attempts: u32,
    pub retry_secs: u64,
}

impl DbConnectConfig {
    pub fn retry_delay(&self) -> Duration {
        Duration::from_secs(self.retry_secs)
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub database_url: String,
    pub host: String,
    pub port: u16,
    /// `APP_ENV=production` turns on secure cookies and the CORS allow-list.
    pub production: bool,
    pub cors_allowed_origins: Vec<String>,
    pub db_connect: DbConnectConfig,
    pub jwt: JwtConfig,
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds the config from an arbitrary key lookup so boot validation can be
    /// exercised without touching the process environment.
    pub fn from_lookup<F>(get: F) -> anyhow::Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let required = |key: &str| -> anyhow::Result<String> {
            match get(key) {
                Some(v) if !v.trim().is_empty() => Ok(v),
                _ => bail!("{key} must be set"),
            }
        };
        let parsed = |key: &str, default: i64| -> anyhow::Result<i64> {
            match get(key) {
                Some(v) => v.parse::<i64>().with_context(|| format!("{key} is not a number")),
                None => Ok(default),
            }
        };

        let jwt = JwtConfig {
            access_secret: required("JWT_ACCESS_SECRET")?,
            refresh_secret: required("JWT_REFRESH_SECRET")?,
            issuer: get("JWT_ISSUER").unwrap_or_else(|| "reelnote".into()),
            audience: get("JWT_AUDIENCE").unwrap_or_else(|| "reelnote-users".into()),
            access_ttl_minutes: parsed("JWT_ACCESS_TTL_MINUTES", 15)?,
            refresh_ttl_minutes: parsed("JWT_REFRESH_TTL_MINUTES", 60 * 24 * 7)?,
        };
        if jwt.access_secret == jwt.refresh_secret {
            bail!("JWT_ACCESS_SECRET and JWT_REFRESH_SECRET must differ");
        }
        if jwt.access_ttl_minutes <= 0 || jwt.refresh_ttl_minutes <= 0 {
            bail!("token lifetimes must be positive");
        }
        if jwt.access_ttl_minutes > MAX_TTL_MINUTES || jwt.refresh_ttl_minutes > MAX_TTL_MINUTES {
            bail!("token lifetimes must not exceed {MAX_TTL_MINUTES} minutes");
        }

        let port = match get("APP_PORT") {
            Some(v) => v.parse::<u16>().context("APP_PORT is not a valid port")?,
            None => 8080,
        };

        let cors_allowed_origins = get("CORS_ALLOWED_ORIGINS")
            .map(|v| {
                v.split(',')
                    .map(|o| o.trim().to_string())
                    .filter(|o| !o.is_empty())
                    .collect()
            })
            .unwrap_or_default();

        let db_connect = DbConnectConfig {
            max_attempts: parsed("DB_CONNECT_MAX_ATTEMPTS", 5)?.max(1) as u32,
            retry_secs: parsed("DB_CONNECT_RETRY_SECS", 3)?.max(0) as u64,
        };

        Ok(Self {
            database_url: required("DATABASE_URL")?,
            host: get("APP_HOST").unwrap_or_else(|| "0.0.0.0".into()),
            port,
            production: get("APP_ENV").as_deref() == Some("production"),
            cors_allowed_origins,
            db_connect,
            jwt,
        })
    }
}
