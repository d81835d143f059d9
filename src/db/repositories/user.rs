use sea_orm::{ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, Set};
use tracing::info;

use crate::db::StoreError;
use crate::entities::{prelude::*, users};
use crate::models::{NewUser, User};

pub struct UserRepository {
    conn: DatabaseConnection,
}

impl UserRepository {
    #[must_use]
    pub const fn new(conn: DatabaseConnection) -> Self {
        Self { conn }
    }

    fn map_model(model: users::Model) -> User {
        User {
            id: model.id,
            username: model.username,
            hashed_password: model.hashed_password,
            pin: model.pin,
        }
    }

    pub async fn get_by_username(&self, username: &str) -> Result<Option<User>, StoreError> {
        let user = Users::find()
            .filter(users::Column::Username.eq(username))
            .one(&self.conn)
            .await?;

        Ok(user.map(Self::map_model))
    }

    /// Inserts a new account. A username collision detected by the database's
    /// unique constraint is reported as [`StoreError::Conflict`].
    pub async fn insert(&self, user: NewUser) -> Result<User, StoreError> {
        let active = users::ActiveModel {
            username: Set(user.username.clone()),
            hashed_password: Set(user.hashed_password),
            pin: Set(user.pin),
            ..Default::default()
        };

        let model = active
            .insert(&self.conn)
            .await
            .map_err(|e| StoreError::from_insert(e, &user.username))?;

        info!(user_id = model.id, "Stored user {}", model.username);
        Ok(Self::map_model(model))
    }
}
