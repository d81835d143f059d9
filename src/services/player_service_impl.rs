//! `SeaORM` implementation of the `PlayerService` trait.

use async_trait::async_trait;
use tracing::info;

use crate::db::Store;
use crate::models::{NewPlayer, Player};
use crate::services::player_service::{PlayerError, PlayerService};

pub struct SeaOrmPlayerService {
    store: Store,
}

impl SeaOrmPlayerService {
    #[must_use]
    pub const fn new(store: Store) -> Self {
        Self { store }
    }
}

#[async_trait]
impl PlayerService for SeaOrmPlayerService {
    async fn list(&self) -> Result<Vec<Player>, PlayerError> {
        Ok(self.store.list_players().await?)
    }

    async fn create(&self, player: NewPlayer, created_by: &str) -> Result<Player, PlayerError> {
        if player.nombre.trim().is_empty() {
            return Err(PlayerError::Validation("nombre is required".to_string()));
        }

        let player = self.store.insert_player(player).await?;
        info!(player_id = player.id, "Player {} added by {created_by}", player.nombre);
        Ok(player)
    }
}
