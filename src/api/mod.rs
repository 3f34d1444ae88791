//! REST API boundary
//!
//! API mode exposes the host application's routes behind the token gate. This
//! module owns only the boundary: authentication, CORS, request tracing and the
//! server lifecycle. The host application supplies the actual endpoints.

use crate::access::AccessGate;
use crate::config::ApiConfig;
use crate::error::{Error, Result};
use axum::{Json, Router, http::HeaderValue, middleware, routing::get};
use serde_json::{Value, json};
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::trace::TraceLayer;

pub mod auth;
pub mod error_response;

/// Wrap `routes` with the token gate and add the built-in endpoints
///
/// # Routes
///
/// - `GET /health` - Liveness probe, never authenticated
/// - `GET /token` - Returns `{"authorized": true}` when the caller's token passes
/// - everything in `routes`, behind the gate
pub fn create_router(gate: AccessGate, config: &ApiConfig, routes: Router) -> Router {
    let protected = routes
        .route("/token", get(token_check))
        .layer(middleware::from_fn_with_state(gate, auth::require_token));

    let router = Router::new()
        .route("/health", get(health_check))
        .merge(protected)
        .layer(TraceLayer::new_for_http());

    if config.cors_enabled {
        router.layer(build_cors_layer(&config.cors_origins))
    } else {
        router
    }
}

async fn health_check() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}

async fn token_check() -> Json<Value> {
    Json(json!({ "authorized": true }))
}

/// Build a CORS layer based on configured origins
///
/// `"*"` anywhere in the list, or an empty list, allows any origin.
fn build_cors_layer(origins: &[String]) -> CorsLayer {
    let allow_any = origins.iter().any(|o| o == "*");

    if allow_any || origins.is_empty() {
        CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any)
    } else {
        let allowed: Vec<HeaderValue> = origins.iter().filter_map(|o| o.parse().ok()).collect();

        CorsLayer::new()
            .allow_origin(AllowOrigin::list(allowed))
            .allow_methods(Any)
            .allow_headers(Any)
    }
}

/// Serve `routes` behind the gate on the configured address
///
/// Runs until `shutdown` is cancelled, then stops accepting connections and
/// lets in-flight requests finish.
///
/// # Example
///
/// ```no_run
/// use axum::Router;
/// use douk_hooks::access::AccessGate;
/// use douk_hooks::config::Config;
/// use tokio_util::sync::CancellationToken;
///
/// # async fn example() -> douk_hooks::Result<()> {
/// let config = Config::default();
/// let gate = AccessGate::from_config(&config.access);
/// let shutdown = CancellationToken::new();
///
/// douk_hooks::api::start_api_server(gate, &config.api, Router::new(), shutdown).await?;
/// # Ok(())
/// # }
/// ```
pub async fn start_api_server(
    gate: AccessGate,
    config: &ApiConfig,
    routes: Router,
    shutdown: CancellationToken,
) -> Result<()> {
    let bind_address = config.bind_address;

    tracing::info!(address = %bind_address, open = gate.is_open(), "Starting API server");

    let app = create_router(gate, config, routes);

    let listener = TcpListener::bind(bind_address).await.map_err(Error::Io)?;

    tracing::info!(address = %bind_address, "API server listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(async move { shutdown.cancelled().await })
        .await
        .map_err(|e| Error::ApiServerError(e.to_string()))?;

    tracing::info!("API server stopped");
    Ok(())
}

// unwrap/expect are acceptable in tests for concise failure-on-error assertions
#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests;
