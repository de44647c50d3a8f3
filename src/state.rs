use std::sync::Arc;

use sqlx::PgPool;

use crate::auth::jwt::JwtKeys;
use crate::auth::repo::{PgUserStore, UserStore};
use crate::config::AppConfig;
use crate::reviews::repo::{PgReviewStore, ReviewStore};

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub jwt: Arc<JwtKeys>,
    pub users: Arc<dyn UserStore>,
    pub reviews: Arc<dyn ReviewStore>,
}

impl AppState {
    pub async fn init(config: AppConfig) -> anyhow::Result<Self> {
        let db = crate::db::connect(&config.database_url, &config.db_connect).await?;
        Ok(Self::with_pool(Arc::new(config), db))
    }

    pub fn with_pool(config: Arc<AppConfig>, db: PgPool) -> Self {
        let users = Arc::new(PgUserStore::new(db.clone())) as Arc<dyn UserStore>;
        let reviews = Arc::new(PgReviewStore::new(db)) as Arc<dyn ReviewStore>;
        Self::from_parts(config, users, reviews)
    }

    pub fn from_parts(
        config: Arc<AppConfig>,
        users: Arc<dyn UserStore>,
        reviews: Arc<dyn ReviewStore>,
    ) -> Self {
        let jwt = Arc::new(JwtKeys::from_config(&config.jwt));
        Self {
            config,
            jwt,
            users,
            reviews,
        }
    }
}
