use axum::{
    Router,
    body::Body,
    extract::ConnectInfo,
    http::{Request, StatusCode, header},
    response::Response,
};
use chrono::{Duration, Utc};
use http_body_util::BodyExt;
use rugby_roster::api::AppState;
use rugby_roster::config::Config;
use rugby_roster::services::TokenService;
use std::io::Write;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use tower::ServiceExt;

const SECRET: &str = "integration-test-secret";

fn test_config() -> Config {
    let mut config = Config::default();
    config.general.database_url = "sqlite::memory:".to_string();
    config.security.jwt_secret = SECRET.to_string();
    config.security.argon2_memory_cost_kib = 1024;
    config.security.argon2_time_cost = 1;
    config.observability.metrics_enabled = false;
    config
}

async fn spawn_app_with_state() -> (Router, Arc<AppState>) {
    let state = rugby_roster::api::create_app_state_from_config(test_config(), None)
        .await
        .expect("Failed to create app state");
    (rugby_roster::api::router(state.clone()), state)
}

async fn spawn_app() -> Router {
    spawn_app_with_state().await.0
}

async fn body_json(response: Response) -> serde_json::Value {
    let body = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&body).unwrap()
}

fn peer(ip: &str) -> ConnectInfo<SocketAddr> {
    ConnectInfo(format!("{ip}:40000").parse().unwrap())
}

async fn register(app: &Router, username: &str, password: &str) -> Response {
    app.clone()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri(format!(
                    "/register?username={username}&password={password}"
                ))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap()
}

async fn register_ok(app: &Router, username: &str, password: &str) -> String {
    let response = register(app, username, password).await;
    assert_eq!(response.status(), StatusCode::OK);

    let json = body_json(response).await;
    json["tu_pin_de_seguridad"].as_str().unwrap().to_string()
}

async fn login_from(
    app: &Router,
    ip: &str,
    username: &str,
    password: &str,
    pin: &str,
) -> Response {
    app.clone()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri(format!("/token?security_token={pin}"))
                .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
                .extension(peer(ip))
                .body(Body::from(format!(
                    "grant_type=password&username={username}&password={password}"
                )))
                .unwrap(),
        )
        .await
        .unwrap()
}

async fn token_for(app: &Router, username: &str, password: &str, pin: &str) -> String {
    let response = login_from(app, "10.1.1.1", username, password, pin).await;
    assert_eq!(response.status(), StatusCode::OK);

    let json = body_json(response).await;
    json["access_token"].as_str().unwrap().to_string()
}

async fn list_players(app: &Router, token: Option<&str>) -> Response {
    let mut builder = Request::builder().uri("/jugadores/");
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
    }
    app.clone()
        .oneshot(builder.body(Body::empty()).unwrap())
        .await
        .unwrap()
}

fn wrong_pin(pin: &str) -> &'static str {
    if pin == "1000" { "1001" } else { "1000" }
}

#[tokio::test]
async fn test_register_returns_four_digit_pin() {
    let app = spawn_app().await;

    let response = register(&app, "ana", "hunter22").await;
    assert_eq!(response.status(), StatusCode::OK);

    let json = body_json(response).await;
    assert!(json["message"].is_string());
    let pin = json["tu_pin_de_seguridad"].as_str().unwrap();
    assert_eq!(pin.len(), 4);
    assert!(pin.chars().all(|c| c.is_ascii_digit()));
}

#[tokio::test]
async fn test_duplicate_registration_is_rejected() {
    let app = spawn_app().await;
    let pin = register_ok(&app, "ana", "hunter22").await;

    let response = register(&app, "ana", "another1").await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let json = body_json(response).await;
    assert!(json["detail"].is_string());

    // The original account and its PIN are untouched.
    let response = login_from(&app, "10.0.0.1", "ana", "hunter22", &pin).await;
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_login_requires_all_three_factors() {
    let app = spawn_app().await;
    let pin = register_ok(&app, "ana", "hunter22").await;
    let bad_pin = wrong_pin(&pin);

    let cases = [
        ("ghost", "hunter22", pin.as_str()),
        ("ana", "wrongpass", pin.as_str()),
        ("ana", "hunter22", bad_pin),
    ];

    let mut details = Vec::new();
    for (i, (username, password, pin)) in cases.iter().enumerate() {
        let ip = format!("10.0.1.{i}");
        let response = login_from(&app, &ip, username, password, pin).await;
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(response.headers()[header::WWW_AUTHENTICATE], "Bearer");
        details.push(body_json(response).await["detail"].clone());
    }

    // Same message whichever factor failed.
    assert!(details.windows(2).all(|w| w[0] == w[1]));

    let response = login_from(&app, "10.0.1.9", "ana", "hunter22", &pin).await;
    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(json["token_type"], "bearer");
    assert!(json["access_token"].as_str().is_some_and(|t| !t.is_empty()));
}

#[tokio::test]
async fn test_sixth_login_attempt_is_rate_limited() {
    let app = spawn_app().await;
    let pin = register_ok(&app, "ana", "hunter22").await;
    let bad_pin = wrong_pin(&pin);

    // Attempts 1-5 are evaluated normally.
    for _ in 0..4 {
        let response = login_from(&app, "192.168.0.10", "ana", "hunter22", bad_pin).await;
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }
    let response = login_from(&app, "192.168.0.10", "ana", "hunter22", &pin).await;
    assert_eq!(response.status(), StatusCode::OK);

    // The 6th fails even with correct credentials.
    let response = login_from(&app, "192.168.0.10", "ana", "hunter22", &pin).await;
    assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
    assert!(response.headers().contains_key(header::RETRY_AFTER));

    // Other addresses keep their own budget.
    let response = login_from(&app, "192.168.0.11", "ana", "hunter22", &pin).await;
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_register_is_not_rate_limited() {
    let app = spawn_app().await;

    for i in 0..7 {
        let response = register(&app, &format!("user{i}"), "hunter22").await;
        assert_eq!(response.status(), StatusCode::OK);
    }
}

#[tokio::test]
async fn test_player_routes_require_token() {
    let app = spawn_app().await;

    let response = list_players(&app, None).await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    let response = list_players(&app, Some("not-a-token")).await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/jugadores/")
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(
                    serde_json::json!({
                        "nombre": "Hugo",
                        "posicion": "Ala",
                        "equipo": "Club"
                    })
                    .to_string(),
                ))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_create_then_list_players() {
    let app = spawn_app().await;
    let pin = register_ok(&app, "ana", "hunter22").await;
    let token = token_for(&app, "ana", "hunter22", &pin).await;

    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/jugadores/")
                .header(header::AUTHORIZATION, format!("Bearer {token}"))
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(
                    serde_json::json!({
                        "id": 999,
                        "nombre": "Hugo",
                        "posicion": "Ala",
                        "equipo": "Los Pumas"
                    })
                    .to_string(),
                ))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let created = body_json(response).await;
    let id = created["id"].as_i64().unwrap();
    assert_ne!(id, 999);
    assert_eq!(created["nombre"], "Hugo");

    let response = list_players(&app, Some(&token)).await;
    assert_eq!(response.status(), StatusCode::OK);

    let players = body_json(response).await;
    let players = players.as_array().unwrap();
    assert_eq!(players.len(), 1);
    assert_eq!(players[0]["id"], id);
    assert_eq!(players[0]["posicion"], "Ala");
    assert_eq!(players[0]["equipo"], "Los Pumas");
}

#[tokio::test]
async fn test_token_lifetime_is_sixty_minutes() {
    let app = spawn_app().await;
    let tokens = TokenService::new(SECRET.as_bytes(), Duration::minutes(60));

    // Issued 59 minutes ago: still valid.
    let fresh = tokens
        .issue("ana", Utc::now() - Duration::minutes(59))
        .unwrap();
    let response = list_players(&app, Some(&fresh.token)).await;
    assert_eq!(response.status(), StatusCode::OK);

    // Issued 61 minutes ago: expired.
    let stale = tokens
        .issue("ana", Utc::now() - Duration::minutes(61))
        .unwrap();
    let response = list_players(&app, Some(&stale.token)).await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_token_signed_with_other_secret_rejected() {
    let app = spawn_app().await;
    let forged = TokenService::new(b"someone-elses-secret", Duration::minutes(60))
        .issue("ana", Utc::now())
        .unwrap();

    let response = list_players(&app, Some(&forged.token)).await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_health_endpoints() {
    let app = spawn_app().await;

    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .uri("/health/live")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers()["x-content-type-options"],
        "nosniff"
    );

    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .uri("/health/ready")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(json["checks"]["database"], true);
}

async fn assert_detail_body(response: Response, status: StatusCode) {
    assert_eq!(response.status(), status);
    assert_eq!(
        response.headers()[header::CONTENT_TYPE],
        "application/json"
    );
    let json = body_json(response).await;
    let detail = json["detail"].as_str().unwrap();
    assert!(!detail.contains("deserialize"));
}

#[tokio::test]
async fn test_malformed_requests_get_detail_body() {
    let app = spawn_app().await;

    // Missing password in the query
    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/register?username=ana")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_detail_body(response, StatusCode::BAD_REQUEST).await;

    // Missing PIN in the query
    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/token")
                .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
                .extension(peer("10.2.0.1"))
                .body(Body::from("username=ana&password=hunter22"))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_detail_body(response, StatusCode::BAD_REQUEST).await;

    // Missing password in the login form
    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/token?security_token=1234")
                .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
                .extension(peer("10.2.0.3"))
                .body(Body::from("username=ana"))
                .unwrap(),
        )
        .await
        .unwrap();
    assert!(response.status().is_client_error());
    let json = body_json(response).await;
    assert!(json["detail"].is_string());

    // Player body missing fields
    let pin = register_ok(&app, "ana", "hunter22").await;
    let token = token_for(&app, "ana", "hunter22", &pin).await;
    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/jugadores/")
                .header(header::AUTHORIZATION, format!("Bearer {token}"))
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(r#"{"nombre": "Hugo"}"#))
                .unwrap(),
        )
        .await
        .unwrap();
    assert!(response.status().is_client_error());
    let json = body_json(response).await;
    assert_eq!(json["detail"], "Cuerpo JSON inválido o incompleto");
}

#[derive(Clone, Default)]
struct CapturedLogs(Arc<Mutex<Vec<u8>>>);

impl Write for CapturedLogs {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.0.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}

#[tokio::test]
async fn test_logs_never_contain_password_or_pin() {
    let logs = CapturedLogs::default();
    let writer = logs.clone();
    let subscriber = tracing_subscriber::fmt()
        .with_max_level(tracing::Level::TRACE)
        .with_ansi(false)
        .with_writer(move || writer.clone())
        .finish();
    let _guard = tracing::subscriber::set_default(subscriber);

    let app = spawn_app().await;
    let pin = register_ok(&app, "ana", "SuperSecretPw").await;
    let response = login_from(&app, "10.3.0.1", "ana", "SuperSecretPw", &pin).await;
    assert_eq!(response.status(), StatusCode::OK);

    let output = String::from_utf8(logs.0.lock().unwrap().clone()).unwrap();
    assert!(output.contains("/register"));
    assert!(output.contains("/token"));
    assert!(!output.contains("SuperSecretPw"));
    assert!(!output.contains(&format!("security_token={pin}")));
}

#[tokio::test]
async fn test_storage_failure_is_generic_server_error() {
    let (app, state) = spawn_app_with_state().await;
    let token = TokenService::new(SECRET.as_bytes(), Duration::minutes(60))
        .issue("ana", Utc::now())
        .unwrap();

    state.shared.store.conn.clone().close().await.unwrap();

    let response = list_players(&app, Some(&token.token)).await;
    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    let body = response.into_body().collect().await.unwrap().to_bytes();
    let text = String::from_utf8(body.to_vec()).unwrap();
    let json: serde_json::Value = serde_json::from_str(&text).unwrap();
    assert_eq!(json["detail"], "An internal error occurred");
    assert!(!text.contains("Pool"));
    assert!(!text.contains("DbErr"));

    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .uri("/health/ready")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    let json = body_json(response).await;
    assert_eq!(json["ready"], false);
    assert_eq!(json["checks"]["database"], false);
}
