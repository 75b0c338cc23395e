use std::sync::Arc;

use payloads::Role;
use tracing::info;

use super::{
    auth::hash_password,
    config::{Config, StoreKind},
    database::{Store, init_redis},
    error::StartupError,
    memory::MemoryStore,
    models::{InsertOutcome, User},
    utils::normalize_email,
};

pub struct AppState {
    pub config: Config,
    pub store: Arc<dyn Store>,
}

impl AppState {
    pub async fn new(config: Config) -> Result<Arc<Self>, StartupError> {
        let store: Arc<dyn Store> = match config.store {
            StoreKind::Redis => {
                info!("Connecting to redis at {}", config.redis_url);
                Arc::new(init_redis(&config.redis_url).await?)
            }
            StoreKind::Memory => {
                info!("Using in-memory store, data is lost on shutdown");
                Arc::new(MemoryStore::new())
            }
        };

        let state = Self::with_store(config, store);
        state.seed_admin().await?;

        Ok(state)
    }

    pub fn with_store(config: Config, store: Arc<dyn Store>) -> Arc<Self> {
        Arc::new(Self { config, store })
    }

    /// Creates the configured admin account unless it already exists.
    pub async fn seed_admin(&self) -> Result<(), StartupError> {
        let Some(seed) = &self.config.admin else {
            return Ok(());
        };

        let email = normalize_email(&seed.email);
        if self.store.find_user_by_email(&email).await?.is_some() {
            info!("Admin account {email} already present");
            return Ok(());
        }

        let admin = User::new(
            email.clone(),
            "Administrator".to_string(),
            chrono::NaiveDate::default(),
            hash_password(&seed.password, self.config.hash_memory_kib)?,
            format!("admin:{email}"),
            Role::Admin,
        );

        match self.store.insert_user(&admin).await? {
            InsertOutcome::Inserted => info!("Seeded admin account {email}"),
            InsertOutcome::Duplicate => info!("Admin account {email} created concurrently"),
        }

        Ok(())
    }
}
