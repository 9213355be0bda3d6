//! Caller identity resolution.
//!
//! Each [`AuthStrategy`] has its own resolver; the gate middleware picks the
//! configured one and stores the resulting [`Identity`] in the request
//! extensions for the handlers.

pub mod basic;
pub mod internal;
pub mod oauth;
pub mod session;

use axum::{
    extract::{Request, State},
    http::{header, HeaderMap, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
};
use tower_sessions::Session;

use crate::config::AuthStrategy;
use crate::db::keys::Owner;
use crate::errors::AppError;
use crate::AppState;
use session::SessionUser;

/// Where unauthenticated browsers are sent.
pub const LOGIN_PATH: &str = "/auth/yandex";

/// Who is calling, as resolved by the gate.
#[derive(Debug, Clone)]
pub struct Identity {
    /// Whose lists the request operates on
    pub owner: Owner,
    /// Profile of a logged-in user; absent for basic, open and internal access
    pub user: Option<SessionUser>,
}

impl Identity {
    pub fn global() -> Self {
        Self {
            owner: Owner::Global,
            user: None,
        }
    }

    pub fn from_session(user: SessionUser) -> Self {
        Self {
            owner: Owner::User(user.user_id.clone()),
            user: Some(user),
        }
    }

    /// The logged-in user's id, for routes that only exist per user.
    pub fn user_id(&self) -> Result<&str, AppError> {
        self.user
            .as_ref()
            .map(|u| u.user_id.as_str())
            .ok_or_else(|| AppError::Unauthorized("Login required".to_string()))
    }
}

/// Gate for every route that needs a caller identity.
pub async fn require_identity(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Response {
    let resolved = match &state.config.auth {
        AuthStrategy::OAuth(_) => {
            let session = request.extensions().get::<Session>().cloned();
            let headers = request.headers().clone();
            let path = request.uri().path().to_string();
            resolve_session(session, headers, path).await
        }
        AuthStrategy::Basic(credentials) => basic::resolve(credentials, request.headers()),
        AuthStrategy::Open => Ok(Identity::global()),
    };

    match resolved {
        Ok(identity) => {
            request.extensions_mut().insert(identity);
            next.run(request).await
        }
        Err(rejection) => rejection,
    }
}

/// Takes owned request parts; the request itself must not be held across the
/// session read.
async fn resolve_session(
    session: Option<Session>,
    headers: HeaderMap,
    path: String,
) -> Result<Identity, Response> {
    let Some(session) = session else {
        tracing::error!("Session layer missing for {}", path);
        return Err(AppError::Internal("Session layer missing".to_string()).into_response());
    };

    match session::current_user(&session).await {
        Ok(Some(user)) => Ok(Identity::from_session(user)),
        Ok(None) => {
            tracing::debug!("Unauthenticated request for {}", path);
            Err(login_required(&headers))
        }
        Err(e) => Err(e.into_response()),
    }
}

/// Browsers are redirected to the login flow, API clients get a 401.
fn login_required(headers: &HeaderMap) -> Response {
    if wants_html(headers) {
        found(LOGIN_PATH)
    } else {
        AppError::Unauthorized("Unauthorized".to_string()).into_response()
    }
}

fn wants_html(headers: &HeaderMap) -> bool {
    headers
        .get(header::ACCEPT)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|accept| accept.contains("text/html"))
}

/// `302 Found` to `location`.
pub fn found(location: &str) -> Response {
    (StatusCode::FOUND, [(header::LOCATION, location.to_string())]).into_response()
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn test_browser_gets_redirect() {
        let mut headers = HeaderMap::new();
        headers.insert(
            header::ACCEPT,
            HeaderValue::from_static("text/html,application/xhtml+xml,*/*;q=0.8"),
        );
        let resp = login_required(&headers);
        assert_eq!(resp.status(), StatusCode::FOUND);
        assert_eq!(resp.headers()[header::LOCATION], LOGIN_PATH);
    }

    #[test]
    fn test_api_client_gets_unauthorized() {
        let mut headers = HeaderMap::new();
        headers.insert(header::ACCEPT, HeaderValue::from_static("application/json"));
        assert_eq!(login_required(&headers).status(), StatusCode::UNAUTHORIZED);
        assert_eq!(
            login_required(&HeaderMap::new()).status(),
            StatusCode::UNAUTHORIZED
        );
    }

    fn empty_session() -> Session {
        Session::new(
            None,
            std::sync::Arc::new(tower_sessions::MemoryStore::default()),
            None,
        )
    }

    #[tokio::test]
    async fn test_anonymous_session_is_rejected() {
        let rejection = resolve_session(Some(empty_session()), HeaderMap::new(), "/list".into())
            .await
            .unwrap_err();
        assert_eq!(rejection.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_logged_in_session_resolves_user() {
        let session = empty_session();
        let user = SessionUser {
            user_id: "42".into(),
            name: "Anna".into(),
            email: "anna@yandex.ru".into(),
            provider: "yandex".into(),
        };
        session
            .insert(session::SESSION_USER_KEY, &user)
            .await
            .unwrap();

        let identity = resolve_session(Some(session), HeaderMap::new(), "/list".into())
            .await
            .unwrap();
        assert_eq!(identity.owner, Owner::User("42".into()));
        assert_eq!(identity.user, Some(user));
    }

    #[tokio::test]
    async fn test_missing_session_layer_is_internal_error() {
        let rejection = resolve_session(None, HeaderMap::new(), "/list".into())
            .await
            .unwrap_err();
        assert_eq!(rejection.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn test_gate_future_is_send() {
        fn assert_send<T: Send>(_: &T) {}
        let future = resolve_session(None, HeaderMap::new(), String::new());
        assert_send(&future);
    }

    #[test]
    fn test_global_identity_has_no_user_id() {
        assert!(matches!(
            Identity::global().user_id(),
            Err(AppError::Unauthorized(_))
        ));
    }
}
