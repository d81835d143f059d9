pub use super::players::Entity as Players;
pub use super::users::Entity as Users;
