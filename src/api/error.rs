use axum::{
    Json,
    extract::rejection::{FormRejection, JsonRejection, QueryRejection},
    http::{HeaderValue, StatusCode, header},
    response::{IntoResponse, Response},
};
use std::fmt;
use std::time::Duration;

use super::ErrorBody;
use crate::services::{AuthError, PlayerError, RateLimited};

#[derive(Debug)]
pub enum ApiError {
    /// Username already registered.
    Conflict(String),

    ValidationError(String),

    /// The request could not be parsed into the handler's input type.
    MalformedRequest { status: StatusCode, detail: &'static str },

    /// Login failed on any factor.
    InvalidCredentials,

    /// Missing, invalid or expired bearer token.
    Unauthorized(String),

    RateLimited { retry_after: Duration },

    /// Storage or other server-side failure. The message is logged, never returned.
    InternalError(String),
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ApiError::Conflict(msg) => write!(f, "Conflict: {}", msg),
            ApiError::ValidationError(msg) => write!(f, "Validation error: {}", msg),
            ApiError::MalformedRequest { status, detail } => {
                write!(f, "Malformed request ({status}): {detail}")
            }
            ApiError::InvalidCredentials => write!(f, "Invalid credentials"),
            ApiError::Unauthorized(msg) => write!(f, "Unauthorized: {}", msg),
            ApiError::RateLimited { retry_after } => {
                write!(f, "Rate limited for {}s", retry_after.as_secs())
            }
            ApiError::InternalError(msg) => write!(f, "Internal error: {}", msg),
        }
    }
}

impl std::error::Error for ApiError {}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, detail) = match &self {
            ApiError::Conflict(_) => (StatusCode::BAD_REQUEST, "El usuario ya existe".to_string()),
            ApiError::ValidationError(msg) => (StatusCode::BAD_REQUEST, msg.clone()),
            ApiError::MalformedRequest { status, detail } => (*status, (*detail).to_string()),
            ApiError::InvalidCredentials => (
                StatusCode::UNAUTHORIZED,
                "Credenciales o PIN incorrectos".to_string(),
            ),
            ApiError::Unauthorized(msg) => (StatusCode::UNAUTHORIZED, msg.clone()),
            ApiError::RateLimited { .. } => (
                StatusCode::TOO_MANY_REQUESTS,
                "Rate limit exceeded. Please try again later.".to_string(),
            ),
            ApiError::InternalError(msg) => {
                tracing::error!("Internal error: {}", msg);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "An internal error occurred".to_string(),
                )
            }
        };

        let mut response = (status, Json(ErrorBody { detail })).into_response();

        match &self {
            ApiError::InvalidCredentials | ApiError::Unauthorized(_) => {
                response.headers_mut().insert(
                    header::WWW_AUTHENTICATE,
                    HeaderValue::from_static("Bearer"),
                );
            }
            ApiError::RateLimited { retry_after } => {
                // Whole seconds, rounded up
                let secs = retry_after.as_secs() + u64::from(retry_after.subsec_nanos() > 0);
                if let Ok(value) = HeaderValue::from_str(&secs.to_string()) {
                    response.headers_mut().insert(header::RETRY_AFTER, value);
                }
            }
            _ => {}
        }

        response
    }
}

impl From<AuthError> for ApiError {
    fn from(err: AuthError) -> Self {
        match err {
            AuthError::Conflict(username) => Self::Conflict(username),
            AuthError::Validation(msg) => Self::ValidationError(msg),
            AuthError::InvalidCredentials => Self::InvalidCredentials,
            AuthError::Unauthorized => Self::unauthorized(),
            AuthError::Storage(msg) | AuthError::Internal(msg) => Self::InternalError(msg),
        }
    }
}

impl From<PlayerError> for ApiError {
    fn from(err: PlayerError) -> Self {
        match err {
            PlayerError::Validation(msg) => Self::ValidationError(msg),
            PlayerError::Storage(msg) => Self::InternalError(msg),
        }
    }
}

impl From<RateLimited> for ApiError {
    fn from(err: RateLimited) -> Self {
        Self::RateLimited {
            retry_after: err.retry_after,
        }
    }
}

// Rejection texts echo serde's wording and can quote submitted values, so only
// the status is kept.
impl From<QueryRejection> for ApiError {
    fn from(err: QueryRejection) -> Self {
        tracing::debug!(status = %err.status(), "Rejected query string");
        Self::MalformedRequest {
            status: err.status(),
            detail: "Parámetros de consulta inválidos o incompletos",
        }
    }
}

impl From<FormRejection> for ApiError {
    fn from(err: FormRejection) -> Self {
        tracing::debug!(status = %err.status(), "Rejected form body");
        Self::MalformedRequest {
            status: err.status(),
            detail: "Formulario inválido o incompleto",
        }
    }
}

impl From<JsonRejection> for ApiError {
    fn from(err: JsonRejection) -> Self {
        tracing::debug!(status = %err.status(), "Rejected JSON body");
        Self::MalformedRequest {
            status: err.status(),
            detail: "Cuerpo JSON inválido o incompleto",
        }
    }
}

impl ApiError {
    pub fn unauthorized() -> Self {
        ApiError::Unauthorized("Token inválido o expirado".to_string())
    }
}
