use std::sync::Arc;

use anyhow::Context;
use sqlx::{postgres::PgPoolOptions, PgPool};
use time::Duration;
use tracing::{info, warn};

use crate::{
    auth::{
        repo::{PgUserRepository, UserRepository},
        sessions::{PgSessionStore, SessionStore},
    },
    config::AppConfig,
    meals::repo::{MealRepository, PgMealRepository},
    memory::{MemoryMealRepository, MemorySessionStore, MemoryUserRepository},
};

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub users: Arc<dyn UserRepository>,
    pub meals: Arc<dyn MealRepository>,
    pub sessions: Arc<dyn SessionStore>,
}

impl AppState {
    pub async fn init(config: AppConfig) -> anyhow::Result<Self> {
        let config = Arc::new(config);

        let Some(url) = config.database_url.as_deref() else {
            warn!("DATABASE_URL not set; using in-memory storage, data is lost on exit");
            return Ok(Self::in_memory(config));
        };

        let db = PgPoolOptions::new()
            .max_connections(config.max_connections)
            .connect(url)
            .await
            .context("connect to database")?;

        sqlx::migrate!("./migrations")
            .run(&db)
            .await
            .context("run migrations")?;
        info!("database ready");

        Ok(Self::from_pool(db, config))
    }

    pub fn from_pool(db: PgPool, config: Arc<AppConfig>) -> Self {
        let ttl = Duration::minutes(config.session.ttl_minutes);
        Self {
            users: Arc::new(PgUserRepository::new(db.clone())),
            meals: Arc::new(PgMealRepository::new(db.clone())),
            sessions: Arc::new(PgSessionStore::new(db, ttl)),
            config,
        }
    }

    pub fn in_memory(config: Arc<AppConfig>) -> Self {
        let ttl = Duration::minutes(config.session.ttl_minutes);
        Self {
            users: Arc::new(MemoryUserRepository::default()),
            meals: Arc::new(MemoryMealRepository::default()),
            sessions: Arc::new(MemorySessionStore::new(ttl)),
            config,
        }
    }

    #[cfg(test)]
    pub fn fake() -> Self {
        Self::in_memory(Arc::new(AppConfig {
            database_url: None,
            max_connections: 1,
            session: crate::config::SessionConfig::default(),
        }))
    }
}
