//! Token middleware for the REST API
//!
//! Reads the caller's credential from the `token` header, or from the `token`
//! query parameter when the header is absent, and asks the [`AccessGate`]
//! whether the request may proceed. Denied requests receive a 401 response.

use crate::access::AccessGate;
use crate::error::Error;
use axum::{
    extract::{Query, Request, State},
    middleware::Next,
    response::{IntoResponse, Response},
};
use serde::Deserialize;
use std::borrow::Cow;

/// Header carrying the caller's credential
pub const TOKEN_HEADER: &str = "token";

/// Query string fallback for clients that cannot set headers
#[derive(Debug, Default, Deserialize)]
pub struct TokenQuery {
    /// Credential passed as `?token=...`
    pub token: Option<String>,
}

/// Authentication middleware backed by an [`AccessGate`]
///
/// # Examples
///
/// ```no_run
/// use axum::{Router, middleware};
/// use douk_hooks::access::{AccessGate, CredentialConfiguration};
/// use douk_hooks::api::auth::require_token;
///
/// let gate = AccessGate::new(CredentialConfiguration::new(None, ["secret-token"]));
/// let router: Router = Router::new()
///     .layer(middleware::from_fn_with_state(gate, require_token));
/// ```
pub async fn require_token(
    State(gate): State<AccessGate>,
    request: Request,
    next: Next,
) -> Response {
    let presented = presented_token(&request);
    let (allowed, message) = match &presented {
        Ok(token) => (
            gate.authorize(token.as_deref()),
            if token.is_some() {
                "Invalid token"
            } else {
                "Missing token"
            },
        ),
        Err(()) => (false, "Invalid token"),
    };
    drop(presented);

    if allowed {
        return next.run(request).await;
    }

    tracing::debug!(path = %request.uri().path(), reason = message, "Rejected API request");
    Error::Unauthorized(message.to_string()).into_response()
}

/// The credential a request carries, `Ok(None)` when it carries none
///
/// A non-empty `token` header wins; the query string is only parsed without
/// one. A header that is not UTF-8 or a query that does not parse is `Err`.
fn presented_token(request: &Request) -> Result<Option<Cow<'_, str>>, ()> {
    let header = request
        .headers()
        .get(TOKEN_HEADER)
        .filter(|value| !value.is_empty());
    if let Some(value) = header {
        return std::str::from_utf8(value.as_bytes())
            .map(|token| Some(Cow::Borrowed(token)))
            .map_err(|_| ());
    }

    match Query::<TokenQuery>::try_from_uri(request.uri()) {
        Ok(Query(query)) => Ok(query.token.filter(|t| !t.is_empty()).map(Cow::Owned)),
        Err(rejection) => {
            tracing::debug!(error = %rejection, "Unreadable token query parameter");
            Err(())
        }
    }
}
