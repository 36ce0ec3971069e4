use std::sync::Arc;

use crate::auth::{
    jwt::JwtKeys,
    repo::{MemoryUserStore, PgUserStore, UserStore},
    services::AuthService,
};
use crate::config::AppConfig;
use crate::db;

/// Request-time state. Token policy (TTL, realm) lives only in the service's `JwtKeys`.
#[derive(Clone)]
pub struct AppState {
    pub auth: AuthService,
}

impl AppState {
    pub async fn init(config: AppConfig) -> anyhow::Result<Self> {
        let store: Arc<dyn UserStore> = match &config.database_url {
            Some(url) => Arc::new(PgUserStore::new(db::connect(url).await?)),
            None => {
                tracing::warn!("DATABASE_URL not set; users are kept in memory and lost on restart");
                Arc::new(MemoryUserStore::default())
            }
        };
        Ok(Self::from_parts(&config, store))
    }

    pub fn from_parts(config: &AppConfig, store: Arc<dyn UserStore>) -> Self {
        let keys = JwtKeys::from_config(&config.jwt);
        Self {
            auth: AuthService::new(store, keys),
        }
    }

    #[cfg(test)]
    pub fn fake() -> Self {
        Self::fake_with_realm(crate::config::DEFAULT_REALM)
    }

    #[cfg(test)]
    pub fn fake_with_realm(realm: &str) -> Self {
        let config = AppConfig {
            database_url: None,
            jwt: crate::config::JwtConfig {
                secret: "test".into(),
                ttl_minutes: crate::config::DEFAULT_TTL_MINUTES,
                realm: realm.into(),
            },
            host: "127.0.0.1".into(),
            port: 0,
        };
        Self::from_parts(&config, Arc::new(MemoryUserStore::default()))
    }
}
