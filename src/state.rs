use std::sync::Arc;

use crate::config::Config;
use crate::db::Store;
use crate::services::{
    AuthService, PasswordHasher, PlayerService, RateLimiter, SeaOrmAuthService,
    SeaOrmPlayerService, TokenService,
};

/// Everything a request handler may touch, built once at startup and
/// injected into the router.
#[derive(Clone)]
pub struct SharedState {
    pub config: Arc<Config>,

    pub store: Store,

    pub auth_service: Arc<dyn AuthService>,

    pub player_service: Arc<dyn PlayerService>,

    pub login_limiter: RateLimiter,
}

impl SharedState {
    pub async fn new(config: Config) -> anyhow::Result<Self> {
        let store = Store::with_pool_options(
            &config.general.database_url,
            config.general.max_db_connections,
            config.general.min_db_connections,
        )
        .await?;

        Self::with_store(config, store)
    }

    pub fn with_store(config: Config, store: Store) -> anyhow::Result<Self> {
        let hasher = PasswordHasher::from_config(&config.security)?;
        let tokens = TokenService::new(
            config.security.jwt_secret.as_bytes(),
            chrono::Duration::minutes(i64::from(config.security.token_ttl_minutes)),
        );

        let auth_service = Arc::new(SeaOrmAuthService::new(store.clone(), hasher, tokens))
            as Arc<dyn AuthService + Send + Sync + 'static>;

        let player_service = Arc::new(SeaOrmPlayerService::new(store.clone()))
            as Arc<dyn PlayerService + Send + Sync + 'static>;

        let login_limiter = RateLimiter::from_config(&config.security.login_rate_limit);

        Ok(Self {
            config: Arc::new(config),
            store,
            auth_service,
            player_service,
            login_limiter,
        })
    }
}
