use axum::{
    Form, Json,
    extract::{
        ConnectInfo, Query, Request, State,
        rejection::{FormRejection, QueryRejection},
    },
    http::{HeaderMap, header},
    middleware::Next,
    response::Response,
};
use chrono::Utc;
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::sync::Arc;
use std::time::Instant;

use super::{
    ApiError, AppState, LoginForm, LoginQuery, RegisterParams, RegisterResponse, TokenResponse,
};

/// Username of the verified bearer, inserted by [`auth_middleware`].
#[derive(Debug, Clone)]
pub struct CurrentUser(pub String);

// ============================================================================
// Middleware
// ============================================================================

/// Requires a valid `Authorization: Bearer <token>` header.
pub async fn auth_middleware(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    mut request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let token = extract_bearer(&headers).ok_or_else(ApiError::unauthorized)?;

    let username = state.auth_service().authenticate(token, Utc::now())?;

    tracing::Span::current().record("user_id", username.as_str());
    request.extensions_mut().insert(CurrentUser(username));

    Ok(next.run(request).await)
}

/// Counts every request against the caller's address before the login
/// handler runs, so over-limit attempts never reach the credential checks.
pub async fn login_rate_limit(
    State(state): State<Arc<AppState>>,
    request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let addr = client_addr(&request);

    if let Err(limited) = state.login_limiter().check(addr, Instant::now()).await {
        tracing::warn!(client = %addr, "Login rate limit exceeded");
        return Err(limited.into());
    }

    Ok(next.run(request).await)
}

fn extract_bearer(headers: &HeaderMap) -> Option<&str> {
    let value = headers.get(header::AUTHORIZATION)?.to_str().ok()?;
    let (scheme, token) = value.split_once(' ')?;

    if !scheme.eq_ignore_ascii_case("bearer") {
        return None;
    }

    let token = token.trim();
    (!token.is_empty()).then_some(token)
}

/// Peer address from the connection; requests served without connection
/// info all share the unspecified address.
fn client_addr(request: &Request) -> IpAddr {
    request
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map_or(IpAddr::V4(Ipv4Addr::UNSPECIFIED), |ConnectInfo(addr)| {
            addr.ip()
        })
}

// ============================================================================
// Handlers
// ============================================================================

/// POST /register
/// Creates an account and returns its PIN. The PIN is never shown again.
pub async fn register(
    State(state): State<Arc<AppState>>,
    params: Result<Query<RegisterParams>, QueryRejection>,
) -> Result<Json<RegisterResponse>, ApiError> {
    let Query(params) = params?;
    let registration = state
        .auth_service()
        .register(&params.username, &params.password)
        .await?;

    Ok(Json(RegisterResponse {
        message: "Usuario creado correctamente".to_string(),
        tu_pin_de_seguridad: registration.pin,
    }))
}

/// POST /token
/// Exchanges username + password + PIN for a bearer token.
pub async fn login(
    State(state): State<Arc<AppState>>,
    query: Result<Query<LoginQuery>, QueryRejection>,
    form: Result<Form<LoginForm>, FormRejection>,
) -> Result<Json<TokenResponse>, ApiError> {
    let Query(query) = query?;
    let Form(form) = form?;
    let token = state
        .auth_service()
        .login(
            &form.username,
            &form.password,
            &query.security_token,
            Utc::now(),
        )
        .await?;

    Ok(Json(TokenResponse {
        access_token: token.access_token,
        token_type: "bearer",
    }))
}
