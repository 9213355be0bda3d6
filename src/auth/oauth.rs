//! Yandex OAuth login flow.
//!
//! `anonymous -> /auth/yandex -> provider -> /auth/yandex/callback -> session`.
//! An expired or already used authorization code restarts the flow instead of
//! showing an error.

use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::{Html, IntoResponse, Response},
};
use reqwest::Url;
use serde::Deserialize;
use tower_sessions::Session;
use uuid::Uuid;

use super::session::{SessionUser, OAUTH_STATE_KEY, SESSION_USER_KEY};
use super::{found, LOGIN_PATH};
use crate::config::{AuthStrategy, OAuthConfig};
use crate::errors::AppError;
use crate::models::UserRecord;
use crate::AppState;

pub const PROVIDER: &str = "yandex";

/// Query parameters the provider sends back to the callback.
#[derive(Debug, Deserialize)]
pub struct CallbackQuery {
    pub code: Option<String>,
    pub state: Option<String>,
    pub error: Option<String>,
    pub error_description: Option<String>,
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
}

/// Subset of the Yandex ID profile.
#[derive(Debug, Deserialize)]
struct ProviderProfile {
    id: String,
    #[serde(default)]
    login: Option<String>,
    #[serde(default)]
    display_name: Option<String>,
    #[serde(default)]
    real_name: Option<String>,
    #[serde(default)]
    default_email: Option<String>,
    #[serde(default)]
    emails: Vec<String>,
}

impl ProviderProfile {
    fn into_session_user(self) -> SessionUser {
        let name = [self.real_name, self.display_name, self.login]
            .into_iter()
            .flatten()
            .find(|n| !n.trim().is_empty())
            .unwrap_or_default();
        let email = self
            .default_email
            .filter(|e| !e.is_empty())
            .or_else(|| self.emails.into_iter().next())
            .unwrap_or_default();
        SessionUser {
            user_id: self.id,
            name,
            email,
            provider: PROVIDER.to_string(),
        }
    }
}

/// Why completing a login failed.
#[derive(Debug)]
enum LoginError {
    /// The code expired or was already redeemed; start over
    CodeExpired,
    Failed(AppError),
}

impl From<reqwest::Error> for LoginError {
    fn from(err: reqwest::Error) -> Self {
        LoginError::Failed(AppError::from(err))
    }
}

fn oauth_config(state: &AppState) -> Result<&OAuthConfig, AppError> {
    match &state.config.auth {
        AuthStrategy::OAuth(oauth) => Ok(oauth),
        _ => Err(AppError::NotFound("OAuth login is not enabled".to_string())),
    }
}

/// GET /auth/yandex - Redirect to the provider's consent page.
pub async fn begin(State(state): State<AppState>, session: Session) -> Result<Response, AppError> {
    let oauth = oauth_config(&state)?;

    let csrf_state = Uuid::new_v4().to_string();
    session.insert(OAUTH_STATE_KEY, &csrf_state).await?;

    let url = authorize_url(oauth, &csrf_state)?;
    Ok(found(url.as_str()))
}

fn authorize_url(oauth: &OAuthConfig, csrf_state: &str) -> Result<Url, AppError> {
    let mut params = vec![
        ("response_type", "code"),
        ("client_id", oauth.client_id.as_str()),
        ("state", csrf_state),
    ];
    if let Some(callback) = &oauth.callback_url {
        params.push(("redirect_uri", callback.as_str()));
    }
    Url::parse_with_params(&oauth.authorize_url, &params)
        .map_err(|e| AppError::Internal(format!("Invalid authorize URL: {}", e)))
}

/// GET /auth/yandex/callback - Finish the login and open a session.
pub async fn callback(
    State(state): State<AppState>,
    session: Session,
    Query(params): Query<CallbackQuery>,
) -> Response {
    if let Some(error) = params.error {
        let description = params
            .error_description
            .filter(|d| !d.is_empty())
            .unwrap_or_else(|| error.clone());
        tracing::warn!(error = %error, description = %description, "Provider returned an error");
        return error_page(StatusCode::BAD_REQUEST, &error, &description);
    }

    let oauth = match oauth_config(&state) {
        Ok(oauth) => oauth,
        Err(e) => return e.into_response(),
    };

    let expected: Option<String> = match session.remove(OAUTH_STATE_KEY).await {
        Ok(v) => v,
        Err(e) => return AppError::from(e).into_response(),
    };
    if expected.is_none() || expected != params.state {
        tracing::warn!("OAuth state mismatch");
        return error_page(
            StatusCode::BAD_REQUEST,
            "invalid_state",
            "Login session not found or expired. Try logging in again.",
        );
    }

    let Some(code) = params.code.filter(|c| !c.is_empty()) else {
        return error_page(
            StatusCode::BAD_REQUEST,
            "missing_code",
            "The provider did not return an authorization code.",
        );
    };

    let user = match complete_login(&state.http, oauth, &code).await {
        Ok(user) => user,
        Err(LoginError::CodeExpired) => {
            tracing::info!("Authorization code expired, restarting login");
            return found(LOGIN_PATH);
        }
        Err(LoginError::Failed(err)) => {
            tracing::error!(error = %err, "OAuth login failed");
            return error_page(
                StatusCode::INTERNAL_SERVER_ERROR,
                "login_failed",
                err.message(),
            );
        }
    };

    match establish_session(&state, &session, user).await {
        Ok(()) => found("/"),
        Err(e) => e.into_response(),
    }
}

async fn establish_session(
    state: &AppState,
    session: &Session,
    user: SessionUser,
) -> Result<(), AppError> {
    session.cycle_id().await?;
    session.insert(SESSION_USER_KEY, &user).await?;

    state
        .social
        .save_user(&UserRecord {
            id: user.user_id.clone(),
            name: user.name.clone(),
            email: user.email.clone(),
        })
        .await?;

    tracing::info!(user_id = %user.user_id, name = %user.name, email = %user.email, "User logged in");
    Ok(())
}

/// Exchange the code for a token, then fetch the profile.
async fn complete_login(
    http: &reqwest::Client,
    oauth: &OAuthConfig,
    code: &str,
) -> Result<SessionUser, LoginError> {
    let mut form = vec![
        ("grant_type", "authorization_code"),
        ("code", code),
        ("client_id", oauth.client_id.as_str()),
        ("client_secret", oauth.client_secret.as_str()),
    ];
    if let Some(callback) = &oauth.callback_url {
        form.push(("redirect_uri", callback.as_str()));
    }

    let response = http.post(&oauth.token_url).form(&form).send().await?;
    let status = response.status();
    let body = response.text().await?;
    if !status.is_success() {
        if is_expired_code(&body) {
            return Err(LoginError::CodeExpired);
        }
        return Err(LoginError::Failed(AppError::Upstream(format!(
            "token exchange failed ({}): {}",
            status, body
        ))));
    }
    let token: TokenResponse = serde_json::from_str(&body).map_err(|e| {
        LoginError::Failed(AppError::Upstream(format!("invalid token response: {}", e)))
    })?;

    let profile: ProviderProfile = http
        .get(&oauth.userinfo_url)
        .header("Authorization", format!("OAuth {}", token.access_token))
        .send()
        .await?
        .error_for_status()?
        .json()
        .await?;

    if profile.id.is_empty() {
        return Err(LoginError::Failed(AppError::Upstream(
            "profile has no user id".to_string(),
        )));
    }
    Ok(profile.into_session_user())
}

fn is_expired_code(body: &str) -> bool {
    body.contains("invalid_grant") || body.contains("Code has expired")
}

/// GET /logout - Drop the session.
pub async fn logout(session: Session) -> Result<Response, AppError> {
    session.flush().await?;
    Ok(found("/"))
}

fn error_page(status: StatusCode, error: &str, description: &str) -> Response {
    let body = format!(
        r#"<!DOCTYPE html>
<html>
<head><meta charset="UTF-8"><title>Login error</title></head>
<body>
  <h1>Login error</h1>
  <p><strong>Error:</strong> {}</p>
  <p>{}</p>
  <a href="{}">Try again</a> <a href="/">Home</a>
</body>
</html>"#,
        escape_html(error),
        escape_html(description),
        LOGIN_PATH
    );
    (status, Html(body)).into_response()
}

fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn oauth(callback: Option<&str>) -> OAuthConfig {
        OAuthConfig {
            client_id: "client-1".into(),
            client_secret: "secret".into(),
            callback_url: callback.map(str::to_string),
            authorize_url: "https://oauth.yandex.ru/authorize".into(),
            token_url: "https://oauth.yandex.ru/token".into(),
            userinfo_url: "https://login.yandex.ru/info?format=json".into(),
            session_secret: "s".into(),
            cookie_secure: true,
        }
    }

    #[test]
    fn test_authorize_url_params() {
        let url = authorize_url(
            &oauth(Some("https://list.example.com/auth/yandex/callback")),
            "abc",
        )
        .unwrap();
        let params: Vec<(String, String)> = url
            .query_pairs()
            .map(|(k, v)| (k.into_owned(), v.into_owned()))
            .collect();
        assert_eq!(url.host_str(), Some("oauth.yandex.ru"));
        assert!(params.contains(&("response_type".into(), "code".into())));
        assert!(params.contains(&("client_id".into(), "client-1".into())));
        assert!(params.contains(&("state".into(), "abc".into())));
        assert!(params.contains(&(
            "redirect_uri".into(),
            "https://list.example.com/auth/yandex/callback".into()
        )));
    }

    #[test]
    fn test_authorize_url_without_callback() {
        let url = authorize_url(&oauth(None), "abc").unwrap();
        assert!(!url.query_pairs().any(|(k, _)| k == "redirect_uri"));
    }

    #[test]
    fn test_expired_code_detection() {
        assert!(is_expired_code(
            r#"{"error":"invalid_grant","error_description":"Code has expired"}"#
        ));
        assert!(!is_expired_code(r#"{"error":"invalid_client"}"#));
    }

    #[test]
    fn test_profile_name_and_email_fallbacks() {
        let profile: ProviderProfile = serde_json::from_str(
            r#"{"id":"1","login":"anna.k","display_name":"","emails":["anna@yandex.ru"]}"#,
        )
        .unwrap();
        let user = profile.into_session_user();
        assert_eq!(user.user_id, "1");
        assert_eq!(user.name, "anna.k");
        assert_eq!(user.email, "anna@yandex.ru");
        assert_eq!(user.provider, PROVIDER);
    }

    #[test]
    fn test_error_page_escapes_input() {
        let body = escape_html(r#"<script>alert("x")</script>"#);
        assert_eq!(body, "&lt;script&gt;alert(&quot;x&quot;)&lt;/script&gt;");
    }
}
