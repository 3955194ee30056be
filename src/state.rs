use std::sync::Arc;

use anyhow::Context;
use sqlx::postgres::PgPoolOptions;

use crate::config::{AppConfig, StoreBackend};
use crate::users::{memory::MemoryUserStore, pg::PgUserStore, repo::UserRepository, store::UserStore};

#[derive(Clone)]
pub struct AppState {
    pub users: UserRepository,
    pub config: Arc<AppConfig>,
}

impl AppState {
    pub async fn init(config: AppConfig) -> anyhow::Result<Self> {
        let store: Arc<dyn UserStore> = match &config.store {
            StoreBackend::Postgres {
                url,
                max_connections,
            } => {
                let db = PgPoolOptions::new()
                    .max_connections(*max_connections)
                    .connect(url)
                    .await
                    .context("connect to database")?;

                if let Err(e) = sqlx::migrate!("./migrations").run(&db).await {
                    tracing::warn!(error = %e, "migration failed; continuing");
                }
                Arc::new(PgUserStore::new(db))
            }
            StoreBackend::Memory => {
                tracing::warn!("using in-memory user store; data is lost on restart");
                Arc::new(MemoryUserStore::new())
            }
        };

        crate::auth::services::prime_dummy_hash();
        Ok(Self::from_parts(UserRepository::new(store), Arc::new(config)))
    }

    pub fn from_parts(users: UserRepository, config: Arc<AppConfig>) -> Self {
        Self { users, config }
    }

    pub fn in_memory(config: AppConfig) -> Self {
        let store = Arc::new(MemoryUserStore::new()) as Arc<dyn UserStore>;
        Self::from_parts(UserRepository::new(store), Arc::new(config))
    }
}
