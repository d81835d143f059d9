//! `SeaORM` implementation of the `AuthService` trait.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rand::Rng;
use subtle::ConstantTimeEq;
use tracing::{info, warn};

use crate::db::Store;
use crate::models::NewUser;
use crate::services::auth_service::{AccessToken, AuthError, AuthService, Registration};
use crate::services::password::PasswordHasher;
use crate::services::token::TokenService;

pub struct SeaOrmAuthService {
    store: Store,
    hasher: PasswordHasher,
    tokens: TokenService,
}

impl SeaOrmAuthService {
    #[must_use]
    pub const fn new(store: Store, hasher: PasswordHasher, tokens: TokenService) -> Self {
        Self {
            store,
            hasher,
            tokens,
        }
    }
}

/// Server-side PIN: always four digits, never user-supplied.
fn generate_pin() -> String {
    rand::rng().random_range(1000..=9999).to_string()
}

fn pins_match(expected: &str, supplied: &str) -> bool {
    expected.as_bytes().ct_eq(supplied.as_bytes()).into()
}

#[async_trait]
impl AuthService for SeaOrmAuthService {
    async fn register(&self, username: &str, password: &str) -> Result<Registration, AuthError> {
        if username.trim().is_empty() {
            return Err(AuthError::Validation("Username is required".to_string()));
        }
        if password.is_empty() {
            return Err(AuthError::Validation("Password is required".to_string()));
        }

        // Fast path; the unique constraint on insert is what actually guards
        // against two concurrent registrations of the same name.
        if self.store.find_user_by_username(username).await?.is_some() {
            return Err(AuthError::Conflict(username.to_string()));
        }

        let pin = generate_pin();
        let hashed_password = self.hasher.hash_async(password).await?;

        let user = self
            .store
            .insert_user(NewUser {
                username: username.to_string(),
                hashed_password,
                pin: pin.clone(),
            })
            .await?;

        info!(user_id = user.id, "Registered user {}", user.username);

        Ok(Registration {
            username: user.username,
            pin,
        })
    }

    async fn login(
        &self,
        username: &str,
        password: &str,
        pin: &str,
        now: DateTime<Utc>,
    ) -> Result<AccessToken, AuthError> {
        let Some(user) = self.store.find_user_by_username(username).await? else {
            warn!("Login failed for {username}");
            return Err(AuthError::InvalidCredentials);
        };

        if !self
            .hasher
            .verify_async(password, &user.hashed_password)
            .await?
        {
            warn!("Login failed for {username}");
            return Err(AuthError::InvalidCredentials);
        }

        if !pins_match(&user.pin, pin) {
            warn!("Login failed for {username}");
            return Err(AuthError::InvalidCredentials);
        }

        let issued = self
            .tokens
            .issue(&user.username, now)
            .map_err(|e| AuthError::Internal(e.to_string()))?;

        info!(user_id = user.id, "User {} logged in", user.username);

        Ok(AccessToken {
            access_token: issued.token,
            expires_at: issued.expires_at,
        })
    }

    fn authenticate(&self, token: &str, now: DateTime<Utc>) -> Result<String, AuthError> {
        self.tokens.verify(token, now).map_err(|e| {
            tracing::debug!("Rejected bearer token: {e}");
            AuthError::Unauthorized
        })
    }
}
