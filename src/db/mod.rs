use anyhow::Result;
use sea_orm::{
    ConnectOptions, ConnectionTrait, Database, DatabaseConnection, DbErr, SqlErr, Statement,
};
use std::path::Path;
use std::time::Duration;
use thiserror::Error;
use tracing::info;

use crate::models::{NewPlayer, NewUser, Player, User};

pub mod migrator;
pub mod repositories;

/// Failures surfaced by the credential store.
#[derive(Debug, Error)]
pub enum StoreError {
    /// A uniqueness constraint rejected the write.
    #[error("Record already exists: {0}")]
    Conflict(String),

    /// The database could not be reached or failed the statement. Retryable.
    #[error("Storage unavailable: {0}")]
    Unavailable(#[from] DbErr),
}

impl StoreError {
    fn from_insert(err: DbErr, key: &str) -> Self {
        match err.sql_err() {
            Some(SqlErr::UniqueConstraintViolation(_)) => Self::Conflict(key.to_string()),
            _ => Self::Unavailable(err),
        }
    }
}

/// Lifetime of the single `:memory:` connection. The database lives only as
/// long as that connection, so the pool must never recycle it.
const MEMORY_CONN_LIFETIME: Duration = Duration::from_secs(60 * 60 * 24 * 365);

fn is_in_memory(db_url: &str) -> bool {
    db_url.contains(":memory:")
}

/// Pool settings for `db_url`. In-memory SQLite is meant for tests: it gets
/// exactly one connection that is never reaped.
fn connect_options(db_url: &str, max_connections: u32, min_connections: u32) -> ConnectOptions {
    let mut opt = ConnectOptions::new(db_url.to_string());
    opt.connect_timeout(Duration::from_secs(10))
        .acquire_timeout(Duration::from_secs(10))
        .sqlx_logging(false);

    if is_in_memory(db_url) {
        opt.max_connections(1)
            .min_connections(1)
            .idle_timeout(MEMORY_CONN_LIFETIME)
            .max_lifetime(MEMORY_CONN_LIFETIME);
    } else {
        opt.max_connections(max_connections)
            .min_connections(min_connections)
            .idle_timeout(Duration::from_secs(300))
            .max_lifetime(Duration::from_secs(600));
    }

    opt
}

#[derive(Clone)]
pub struct Store {
    pub conn: DatabaseConnection,
}

impl Store {
    pub async fn new(db_url: &str) -> Result<Self> {
        Self::with_pool_options(db_url, 5, 1).await
    }

    pub async fn with_pool_options(
        db_url: &str,
        max_connections: u32,
        min_connections: u32,
    ) -> Result<Self> {
        use sea_orm_migration::MigratorTrait;

        if db_url.starts_with("sqlite:") && !is_in_memory(db_url) {
            let path_str = db_url
                .trim_start_matches("sqlite://")
                .trim_start_matches("sqlite:");
            let path_str = path_str.split('?').next().unwrap_or(path_str);
            if let Some(parent) = Path::new(path_str).parent() {
                tokio::fs::create_dir_all(parent).await.ok();
            }
            if !Path::new(path_str).exists() {
                std::fs::File::create(path_str)?;
            }
        }

        let opt = connect_options(db_url, max_connections, min_connections);
        let min_connections = opt.get_min_connections().unwrap_or_default();
        let max_connections = opt.get_max_connections().unwrap_or_default();

        let conn = Database::connect(opt).await?;

        migrator::Migrator::up(&conn, None).await?;

        info!(
            "Database connected & migrations applied (pool: {}-{})",
            min_connections, max_connections
        );

        Ok(Self { conn })
    }

    pub async fn ping(&self) -> Result<()> {
        let backend = self.conn.get_database_backend();
        self.conn
            .query_one(Statement::from_string(backend, "SELECT 1".to_string()))
            .await?;
        Ok(())
    }

    fn user_repo(&self) -> repositories::user::UserRepository {
        repositories::user::UserRepository::new(self.conn.clone())
    }

    fn player_repo(&self) -> repositories::player::PlayerRepository {
        repositories::player::PlayerRepository::new(self.conn.clone())
    }

    // ========================================================================
    // Users
    // ========================================================================

    pub async fn find_user_by_username(&self, username: &str) -> Result<Option<User>, StoreError> {
        self.user_repo().get_by_username(username).await
    }

    pub async fn insert_user(&self, user: NewUser) -> Result<User, StoreError> {
        self.user_repo().insert(user).await
    }

    // ========================================================================
    // Players
    // ========================================================================

    pub async fn list_players(&self) -> Result<Vec<Player>, StoreError> {
        self.player_repo().list().await
    }

    pub async fn insert_player(&self, player: NewPlayer) -> Result<Player, StoreError> {
        self.player_repo().insert(player).await
    }
}
