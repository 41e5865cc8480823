#![cfg(feature = "web")]

use crate::app::AppState;
use crate::error::{Result, VisualizerError};
use axum::{
    extract::{Request, State},
    http::header,
    middleware::Next,
    response::{IntoResponse, Response},
};
use std::sync::Arc;

/// The authenticated caller, attached to each request that passes `require_token`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Principal(pub String);

/// Token authentication middleware
///
/// Accepts `Authorization: Token <t>` and `Authorization: Bearer <t>`.
/// On success the configured principal is inserted into the request
/// extensions; otherwise a 401 JSON body is returned.
///
/// # Arguments
/// * `state` - Shared application state holding the expected token
/// * `request` - The incoming request
/// * `next` - Next middleware in the chain
pub async fn require_token(
    State(state): State<Arc<AppState>>,
    mut request: Request,
    next: Next,
) -> Response {
    let header_value = request
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok());

    match check_authorization(header_value, &state.config.auth_token) {
        Ok(()) => {
            request
                .extensions_mut()
                .insert(Principal(state.config.auth_principal.clone()));
            next.run(request).await
        }
        Err(e) => e.into_response(),
    }
}

/// Validate an `Authorization` header value against the expected token
///
/// # Errors
/// * `Unauthorized` if the header is absent, malformed, or carries another token
pub fn check_authorization(header_value: Option<&str>, expected: &str) -> Result<()> {
    let value = header_value.ok_or(VisualizerError::Unauthorized(
        "Authentication credentials were not provided.",
    ))?;

    let (scheme, token) = value
        .trim()
        .split_once(' ')
        .ok_or(VisualizerError::Unauthorized("Invalid token header."))?;

    if !scheme.eq_ignore_ascii_case("token") && !scheme.eq_ignore_ascii_case("bearer") {
        return Err(VisualizerError::Unauthorized(
            "Authentication credentials were not provided.",
        ));
    }

    if constant_time_eq(token.trim().as_bytes(), expected.as_bytes()) {
        Ok(())
    } else {
        Err(VisualizerError::Unauthorized("Invalid token."))
    }
}

fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    a.iter().zip(b).fold(0u8, |acc, (x, y)| acc | (x ^ y)) == 0
}
