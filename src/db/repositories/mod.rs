pub mod player;
pub mod user;
