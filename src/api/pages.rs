//! HTML pages and the health check.

use axum::{
    extract::State,
    response::{Html, IntoResponse, Response},
};
use tower_sessions::Session;

use super::ApiResult;
use crate::auth::{session, LOGIN_PATH};
use crate::errors::AppError;
use crate::AppState;

/// GET / in oauth mode - The app for logged-in users, a welcome page otherwise.
pub async fn index_page(State(state): State<AppState>, session: Session) -> ApiResult<Response> {
    match session::current_user(&session).await? {
        Some(_) => Ok(app_shell(State(state)).await?.into_response()),
        None => Ok(Html(welcome_page()).into_response()),
    }
}

/// The single-page app, read from disk on every request.
pub async fn app_shell(State(state): State<AppState>) -> ApiResult<Html<String>> {
    let path = &state.config.index_path;
    let html = tokio::fs::read_to_string(path).await.map_err(|e| {
        tracing::error!(path = ?path, error = %e, "Failed to read app shell");
        AppError::Internal(format!("Failed to load page: {}", e))
    })?;
    Ok(Html(html))
}

fn welcome_page() -> String {
    format!(
        r#"<!DOCTYPE html>
<html>
<head><meta charset="UTF-8"><title>Shopping list</title></head>
<body>
  <h1>Shopping list</h1>
  <p>Sign in to keep your lists and share them with friends.</p>
  <a href="{}">Sign in with Yandex</a>
</body>
</html>"#,
        LOGIN_PATH
    )
}

/// GET /health
pub async fn health_check(State(state): State<AppState>) -> ApiResult<&'static str> {
    state.store.ping().await?;
    Ok("OK")
}
