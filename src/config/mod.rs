//! Configuration module for the shopping list backend.
//!
//! All configuration is loaded from environment variables. Secrets required by the
//! selected auth strategy have no defaults; startup fails when they are missing.

use std::env;
use std::net::SocketAddr;
use std::path::PathBuf;

pub const DEFAULT_AUTHORIZE_URL: &str = "https://oauth.yandex.ru/authorize";
pub const DEFAULT_TOKEN_URL: &str = "https://oauth.yandex.ru/token";
pub const DEFAULT_USERINFO_URL: &str = "https://login.yandex.ru/info?format=json";

/// Yandex OAuth application settings.
#[derive(Debug, Clone)]
pub struct OAuthConfig {
    pub client_id: String,
    pub client_secret: String,
    pub callback_url: Option<String>,
    pub authorize_url: String,
    pub token_url: String,
    pub userinfo_url: String,
    /// Secret the session cookie signing key is derived from
    pub session_secret: String,
    /// Mark the session cookie `Secure`
    pub cookie_secure: bool,
}

/// Static credentials for HTTP basic auth.
#[derive(Clone)]
pub struct BasicCredentials {
    pub username: String,
    pub password: String,
}

// keep the password out of logs
impl std::fmt::Debug for BasicCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BasicCredentials")
            .field("username", &self.username)
            .field("password", &self.password.len())
            .finish()
    }
}

/// How callers are identified.
#[derive(Debug, Clone)]
pub enum AuthStrategy {
    /// Per-user lists behind a Yandex login and a cookie session
    OAuth(OAuthConfig),
    /// One shared list behind static basic-auth credentials
    Basic(BasicCredentials),
    /// One shared list, no authentication
    Open,
}

impl AuthStrategy {
    pub fn name(&self) -> &'static str {
        match self {
            AuthStrategy::OAuth(_) => "oauth",
            AuthStrategy::Basic(_) => "basic",
            AuthStrategy::Open => "none",
        }
    }

    /// Whether lists are stored per user.
    pub fn is_multi_user(&self) -> bool {
        matches!(self, AuthStrategy::OAuth(_))
    }
}

/// Application configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct Config {
    pub auth: AuthStrategy,
    /// Path to the SQLite file backing the key-value store
    pub db_path: PathBuf,
    /// Address to bind the server to
    pub bind_addr: SocketAddr,
    /// Log level (trace, debug, info, warn, error)
    pub log_level: String,
    /// Identity used by the internal API when no `X-User-ID` header is sent
    pub service_user_id: Option<String>,
    /// App shell served on `/`
    pub index_path: PathBuf,
}

/// Reasons the configuration cannot be loaded.
#[derive(Debug, PartialEq, Eq)]
pub enum ConfigError {
    Missing(&'static str),
    Invalid { var: &'static str, value: String },
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::Missing(var) => write!(f, "environment variable {} must be set", var),
            ConfigError::Invalid { var, value } => {
                write!(f, "invalid value {:?} for {}", value, var)
            }
        }
    }
}

impl std::error::Error for ConfigError {}

impl Config {
    /// Load configuration from environment variables, reading `.env` first if present.
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();
        Self::from_vars()
    }

    fn from_vars() -> Result<Self, ConfigError> {
        let db_path = env::var("SHOPLIST_DB_PATH")
            .unwrap_or_else(|_| "./data/shoplist.sqlite".to_string())
            .into();

        let bind_raw =
            env::var("SHOPLIST_BIND_ADDR").unwrap_or_else(|_| "0.0.0.0:8080".to_string());
        let bind_addr = bind_raw.parse().map_err(|_| ConfigError::Invalid {
            var: "SHOPLIST_BIND_ADDR",
            value: bind_raw.clone(),
        })?;

        let log_level = env::var("SHOPLIST_LOG_LEVEL").unwrap_or_else(|_| "info".to_string());

        let service_user_id = non_empty("SHOPLIST_SERVICE_USER_ID");

        let index_path = env::var("SHOPLIST_INDEX_PATH")
            .unwrap_or_else(|_| "./static/index.html".to_string())
            .into();

        let mode = env::var("SHOPLIST_AUTH_MODE").unwrap_or_else(|_| "oauth".to_string());
        let auth = match mode.to_ascii_lowercase().as_str() {
            "oauth" => AuthStrategy::OAuth(oauth_from_vars()?),
            "basic" => AuthStrategy::Basic(BasicCredentials {
                username: required("SHOPLIST_BASIC_USERNAME")?,
                password: required("SHOPLIST_BASIC_PASSWORD")?,
            }),
            "none" => AuthStrategy::Open,
            _ => {
                return Err(ConfigError::Invalid {
                    var: "SHOPLIST_AUTH_MODE",
                    value: mode,
                })
            }
        };

        Ok(Self {
            auth,
            db_path,
            bind_addr,
            log_level,
            service_user_id,
            index_path,
        })
    }
}

fn oauth_from_vars() -> Result<OAuthConfig, ConfigError> {
    let session_secret = required("SHOPLIST_SESSION_SECRET")?;

    let cookie_secure = match env::var("SHOPLIST_COOKIE_SECURE") {
        Ok(v) => match v.to_ascii_lowercase().as_str() {
            "1" | "true" | "yes" => true,
            "0" | "false" | "no" => false,
            _ => {
                return Err(ConfigError::Invalid {
                    var: "SHOPLIST_COOKIE_SECURE",
                    value: v,
                })
            }
        },
        Err(_) => true,
    };

    Ok(OAuthConfig {
        client_id: required("SHOPLIST_YANDEX_CLIENT_ID")?,
        client_secret: required("SHOPLIST_YANDEX_CLIENT_SECRET")?,
        callback_url: non_empty("SHOPLIST_YANDEX_CALLBACK_URL"),
        authorize_url: env::var("SHOPLIST_YANDEX_AUTHORIZE_URL")
            .unwrap_or_else(|_| DEFAULT_AUTHORIZE_URL.to_string()),
        token_url: env::var("SHOPLIST_YANDEX_TOKEN_URL")
            .unwrap_or_else(|_| DEFAULT_TOKEN_URL.to_string()),
        userinfo_url: env::var("SHOPLIST_YANDEX_USERINFO_URL")
            .unwrap_or_else(|_| DEFAULT_USERINFO_URL.to_string()),
        session_secret,
        cookie_secure,
    })
}

fn non_empty(var: &'static str) -> Option<String> {
    env::var(var).ok().filter(|v| !v.trim().is_empty())
}

fn required(var: &'static str) -> Result<String, ConfigError> {
    non_empty(var).ok_or(ConfigError::Missing(var))
}
