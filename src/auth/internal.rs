//! Gate for the service-to-service API.
//!
//! Requests are accepted without a user login when they come from a private
//! or loopback address. `X-Forwarded-For` is only honored when the peer is
//! itself internal. The list owner is taken from `X-User-ID`, then the
//! configured service user, then `service`.

use std::net::{IpAddr, SocketAddr};

use axum::{
    extract::{ConnectInfo, Request, State},
    http::HeaderMap,
    middleware::Next,
    response::{IntoResponse, Response},
};

use super::Identity;
use crate::config::Config;
use crate::db::keys::Owner;
use crate::errors::AppError;
use crate::AppState;

pub const USER_ID_HEADER: &str = "x-user-id";
pub const FORWARDED_FOR_HEADER: &str = "x-forwarded-for";
pub const DEFAULT_SERVICE_USER: &str = "service";

pub async fn require_internal_network(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Response {
    let peer = request
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| *addr);
    let client = client_ip(request.headers(), peer);

    if !client.is_some_and(is_internal) {
        tracing::warn!(
            client = ?client,
            peer = ?peer,
            path = %request.uri().path(),
            "Rejected internal API request from outside the private network"
        );
        return AppError::Forbidden("Forbidden: Internal API access only".to_string())
            .into_response();
    }

    let identity = service_identity(&state.config, request.headers());
    tracing::debug!(client = ?client, owner = %identity.owner, path = %request.uri().path(), "Internal API access");
    request.extensions_mut().insert(identity);
    next.run(request).await
}

/// The TCP peer, unless the peer is itself an internal proxy; then the last
/// `X-Forwarded-For` entry, which is the address that proxy saw.
///
/// Entries further left are supplied by the client and are never trusted.
fn client_ip(headers: &HeaderMap, peer: Option<SocketAddr>) -> Option<IpAddr> {
    let peer_ip = peer?.ip();
    if !is_internal(peer_ip) {
        return Some(peer_ip);
    }

    let forwarded = headers
        .get(FORWARDED_FOR_HEADER)
        .and_then(|v| v.to_str().ok())
        .filter(|v| !v.trim().is_empty());

    match forwarded {
        Some(list) => list.rsplit(',').next()?.trim().parse().ok(),
        None => Some(peer_ip),
    }
}

/// Private IPv4 ranges, loopback, and IPv6 unique-local addresses.
fn is_internal(ip: IpAddr) -> bool {
    match ip {
        IpAddr::V4(v4) => v4.is_private() || v4.is_loopback(),
        IpAddr::V6(v6) => match v6.to_ipv4_mapped() {
            Some(v4) => v4.is_private() || v4.is_loopback(),
            None => v6.is_loopback() || (v6.segments()[0] & 0xfe00) == 0xfc00,
        },
    }
}

fn service_identity(config: &Config, headers: &HeaderMap) -> Identity {
    if !config.auth.is_multi_user() {
        return Identity::global();
    }

    let user_id = headers
        .get(USER_ID_HEADER)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
        .or_else(|| config.service_user_id.clone())
        .unwrap_or_else(|| DEFAULT_SERVICE_USER.to_string());

    Identity {
        owner: Owner::User(user_id),
        user: None,
    }
}
