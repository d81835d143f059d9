use axum::{
    Extension, Json,
    extract::{State, rejection::JsonRejection},
};
use std::sync::Arc;

use super::auth::CurrentUser;
use super::{ApiError, AppState};
use crate::models::{NewPlayer, Player};

/// GET /jugadores/
pub async fn list_players(
    State(state): State<Arc<AppState>>,
) -> Result<Json<Vec<Player>>, ApiError> {
    let players = state.player_service().list().await?;
    Ok(Json(players))
}

/// POST /jugadores/
/// The id is always assigned by storage; one present in the body is ignored.
pub async fn create_player(
    State(state): State<Arc<AppState>>,
    Extension(CurrentUser(username)): Extension<CurrentUser>,
    payload: Result<Json<NewPlayer>, JsonRejection>,
) -> Result<Json<Player>, ApiError> {
    let Json(payload) = payload?;
    let player = state.player_service().create(payload, &username).await?;
    Ok(Json(player))
}
