/// A registered account as held by the credential store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct User {
    pub id: i32,
    pub username: String,
    pub hashed_password: String,
    pub pin: String,
}

/// Fields supplied when persisting a new account; the id is assigned by storage.
#[derive(Debug, Clone)]
pub struct NewUser {
    pub username: String,
    pub hashed_password: String,
    pub pin: String,
}
