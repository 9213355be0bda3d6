//! HTTP basic authentication against static credentials.
//!
//! Implements constant-time comparison to mitigate timing attacks.

use axum::{
    http::{header, HeaderMap, HeaderValue},
    response::{IntoResponse, Response},
};
use base64::{engine::general_purpose::STANDARD, Engine};
use subtle::ConstantTimeEq;

use super::Identity;
use crate::config::BasicCredentials;
use crate::errors::AppError;

const CHALLENGE: &str = r#"Basic realm="Restricted""#;

/// Resolve the caller from the `Authorization` header.
///
/// Valid credentials map to the single global list.
pub fn resolve(expected: &BasicCredentials, headers: &HeaderMap) -> Result<Identity, Response> {
    let Some(value) = headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
    else {
        return Err(challenge("Authorization required"));
    };

    let Some(encoded) = value.strip_prefix("Basic ") else {
        return Err(challenge("Invalid authorization header"));
    };

    let Some((username, password)) = decode_credentials(encoded) else {
        return Err(challenge("Invalid base64 encoding"));
    };

    // evaluate both comparisons before combining
    let user_ok = constant_time_compare(&username, &expected.username);
    let pass_ok = constant_time_compare(&password, &expected.password);
    if user_ok & pass_ok {
        Ok(Identity::global())
    } else {
        tracing::warn!(username = %username, "Rejected basic auth credentials");
        Err(challenge("Invalid credentials"))
    }
}

/// Decode `base64(username:password)`.
fn decode_credentials(encoded: &str) -> Option<(String, String)> {
    let bytes = STANDARD.decode(encoded.trim()).ok()?;
    let text = String::from_utf8(bytes).ok()?;
    let (username, password) = text.split_once(':')?;
    Some((username.to_string(), password.to_string()))
}

/// Perform constant-time string comparison.
fn constant_time_compare(a: &str, b: &str) -> bool {
    a.as_bytes().ct_eq(b.as_bytes()).into()
}

/// 401 carrying a basic-auth challenge.
fn challenge(message: &str) -> Response {
    let mut response = AppError::Unauthorized(message.to_string()).into_response();
    response
        .headers_mut()
        .insert(header::WWW_AUTHENTICATE, HeaderValue::from_static(CHALLENGE));
    response
}
