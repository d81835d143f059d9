//! Domain service for the player roster.

use thiserror::Error;

use crate::db::StoreError;
use crate::models::{NewPlayer, Player};

#[derive(Debug, Error)]
pub enum PlayerError {
    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("Storage error: {0}")]
    Storage(String),
}

impl From<StoreError> for PlayerError {
    fn from(err: StoreError) -> Self {
        Self::Storage(err.to_string())
    }
}

#[async_trait::async_trait]
pub trait PlayerService: Send + Sync {
    /// All players, ordered by id.
    async fn list(&self) -> Result<Vec<Player>, PlayerError>;

    /// Stores a player and returns it with its server-assigned id.
    async fn create(&self, player: NewPlayer, created_by: &str) -> Result<Player, PlayerError>;
}
