//! Domain service for account registration, login and bearer token checks.

use chrono::{DateTime, Utc};
use serde::Serialize;
use thiserror::Error;

use crate::db::StoreError;

/// Errors specific to authentication operations.
#[derive(Debug, Error)]
pub enum AuthError {
    #[error("Username already taken: {0}")]
    Conflict(String),

    #[error("Validation failed: {0}")]
    Validation(String),

    /// Unknown user, wrong password or wrong PIN. Deliberately undifferentiated.
    #[error("Invalid credentials")]
    InvalidCredentials,

    #[error("Unauthorized")]
    Unauthorized,

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<StoreError> for AuthError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Conflict(username) => Self::Conflict(username),
            StoreError::Unavailable(e) => Self::Storage(e.to_string()),
        }
    }
}

impl From<anyhow::Error> for AuthError {
    fn from(err: anyhow::Error) -> Self {
        Self::Internal(err.to_string())
    }
}

/// Outcome of a registration. The PIN is only ever returned here.
#[derive(Debug, Clone, Serialize)]
pub struct Registration {
    pub username: String,
    pub pin: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct AccessToken {
    pub access_token: String,
    pub expires_at: DateTime<Utc>,
}

/// Domain service trait for authentication.
#[async_trait::async_trait]
pub trait AuthService: Send + Sync {
    /// Creates an account and generates its 4-digit PIN.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::Conflict`] if the username is taken.
    async fn register(&self, username: &str, password: &str) -> Result<Registration, AuthError>;

    /// Checks username, password and PIN, in that order, and issues a token.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::InvalidCredentials`] if any factor fails.
    async fn login(
        &self,
        username: &str,
        password: &str,
        pin: &str,
        now: DateTime<Utc>,
    ) -> Result<AccessToken, AuthError>;

    /// Resolves a bearer token to the acting username.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::Unauthorized`] for malformed, tampered or expired tokens.
    fn authenticate(&self, token: &str, now: DateTime<Utc>) -> Result<String, AuthError>;
}
