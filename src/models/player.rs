use serde::{Deserialize, Serialize};

/// A roster entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Player {
    pub id: i32,
    pub nombre: String,
    pub posicion: String,
    pub equipo: String,
}

/// Roster entry as submitted by a client. Any id in the payload is ignored.
#[derive(Debug, Clone, Deserialize)]
pub struct NewPlayer {
    pub nombre: String,
    pub posicion: String,
    pub equipo: String,
}
