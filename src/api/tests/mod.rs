use super::*;
use crate::access::CredentialConfiguration;
use axum::body::Body;
use axum::http::Request;
use axum::http::StatusCode;
use std::time::Duration;
use tower::ServiceExt;

fn gate(tokens: &[&str]) -> AccessGate {
    AccessGate::new(CredentialConfiguration::new(None, tokens.iter().copied()))
}

/// Host routes standing in for the application's own endpoints
fn host_routes() -> Router {
    Router::new().route("/douyin/detail", get(|| async { "detail" }))
}

async fn get_status(app: Router, uri: &str, token: Option<&str>) -> StatusCode {
    let mut builder = Request::builder().uri(uri);
    if let Some(token) = token {
        builder = builder.header("token", token);
    }
    let response = app
        .oneshot(builder.body(Body::empty()).unwrap())
        .await
        .unwrap();
    response.status()
}

#[tokio::test]
async fn health_is_public() {
    let app = create_router(gate(&["t1"]), &ApiConfig::default(), host_routes());
    assert_eq!(get_status(app, "/health", None).await, StatusCode::OK);
}

#[tokio::test]
async fn host_routes_are_gated() {
    let config = ApiConfig::default();

    let app = create_router(gate(&["t1"]), &config, host_routes());
    assert_eq!(
        get_status(app, "/douyin/detail", None).await,
        StatusCode::UNAUTHORIZED
    );

    let app = create_router(gate(&["t1"]), &config, host_routes());
    assert_eq!(
        get_status(app, "/douyin/detail", Some("t1")).await,
        StatusCode::OK
    );
}

#[tokio::test]
async fn token_probe_reports_authorized() {
    let app = create_router(gate(&["t1"]), &ApiConfig::default(), Router::new());
    let request = Request::builder()
        .uri("/token")
        .header("token", "t1")
        .body(Body::empty())
        .unwrap();

    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let json: Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(json["authorized"], true);
}

#[tokio::test]
async fn token_probe_rejects_unknown_token() {
    let app = create_router(gate(&["t1"]), &ApiConfig::default(), Router::new());
    assert_eq!(
        get_status(app, "/token", Some("t3")).await,
        StatusCode::UNAUTHORIZED
    );
}

#[tokio::test]
async fn test_cors_enabled() {
    let config = ApiConfig {
        cors_enabled: true,
        cors_origins: vec!["*".to_string()],
        ..ApiConfig::default()
    };
    let app = create_router(gate(&[]), &config, Router::new());

    let request = Request::builder()
        .uri("/health")
        .header("Origin", "http://localhost:3000")
        .body(Body::empty())
        .unwrap();
    let response = app.oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert!(
        response
            .headers()
            .contains_key("access-control-allow-origin"),
        "CORS header must be present when enabled"
    );
}

#[tokio::test]
async fn test_cors_disabled() {
    let config = ApiConfig {
        cors_enabled: false,
        ..ApiConfig::default()
    };
    let app = create_router(gate(&[]), &config, Router::new());

    let request = Request::builder()
        .uri("/health")
        .header("Origin", "http://localhost:3000")
        .body(Body::empty())
        .unwrap();
    let response = app.oneshot(request).await.unwrap();

    assert!(
        !response
            .headers()
            .contains_key("access-control-allow-origin"),
        "no CORS header when disabled"
    );
}

#[tokio::test]
async fn test_cors_specific_origin() {
    let config = ApiConfig {
        cors_enabled: true,
        cors_origins: vec!["http://allowed.example".to_string()],
        ..ApiConfig::default()
    };
    let app = create_router(gate(&[]), &config, Router::new());

    let request = Request::builder()
        .uri("/health")
        .header("Origin", "http://allowed.example")
        .body(Body::empty())
        .unwrap();
    let response = app.oneshot(request).await.unwrap();

    assert_eq!(
        response.headers().get("access-control-allow-origin").unwrap(),
        "http://allowed.example"
    );
}

#[tokio::test]
async fn server_stops_on_shutdown() {
    let config = ApiConfig {
        // Port 0 = OS assigns a free port
        bind_address: "127.0.0.1:0".parse().unwrap(),
        ..ApiConfig::default()
    };
    let shutdown = CancellationToken::new();

    let server = tokio::spawn({
        let shutdown = shutdown.clone();
        async move { start_api_server(gate(&[]), &config, Router::new(), shutdown).await }
    });

    tokio::time::sleep(Duration::from_millis(100)).await;
    shutdown.cancel();

    let result = tokio::time::timeout(Duration::from_secs(5), server)
        .await
        .expect("server must stop after shutdown")
        .unwrap();
    assert!(result.is_ok());
}

#[tokio::test]
async fn bind_failure_is_io_error() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let config = ApiConfig {
        bind_address: listener.local_addr().unwrap(),
        ..ApiConfig::default()
    };

    let result = start_api_server(gate(&[]), &config, Router::new(), CancellationToken::new()).await;
    assert!(matches!(result, Err(Error::Io(_))));
}
