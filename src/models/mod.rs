pub mod player;
pub mod user;

pub use player::{NewPlayer, Player};
pub use user::{NewUser, User};
