use sea_orm::{ActiveModelTrait, DatabaseConnection, EntityTrait, QueryOrder, Set};

use crate::db::StoreError;
use crate::entities::{players, prelude::*};
use crate::models::{NewPlayer, Player};

/// Repository for roster entries
pub struct PlayerRepository {
    conn: DatabaseConnection,
}

impl PlayerRepository {
    #[must_use]
    pub const fn new(conn: DatabaseConnection) -> Self {
        Self { conn }
    }

    fn map_model(p: players::Model) -> Player {
        Player {
            id: p.id,
            nombre: p.nombre,
            posicion: p.posicion,
            equipo: p.equipo,
        }
    }

    pub async fn list(&self) -> Result<Vec<Player>, StoreError> {
        let rows = Players::find()
            .order_by_asc(players::Column::Id)
            .all(&self.conn)
            .await?;

        Ok(rows.into_iter().map(Self::map_model).collect())
    }

    pub async fn insert(&self, player: NewPlayer) -> Result<Player, StoreError> {
        let active = players::ActiveModel {
            nombre: Set(player.nombre),
            posicion: Set(player.posicion),
            equipo: Set(player.equipo),
            ..Default::default()
        };

        let model = active.insert(&self.conn).await?;
        Ok(Self::map_model(model))
    }
}
