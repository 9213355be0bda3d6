//! Shoplist Backend
//!
//! Shopping lists per user and category, with friends and list sharing,
//! stored in a SQLite-backed key-value store.

mod api;
mod auth;
mod config;
mod db;
mod errors;
mod lists;
mod models;
mod social;

use std::net::SocketAddr;
use std::sync::Arc;

use axum::{
    middleware,
    routing::{delete, get, post, put},
    Router,
};
use sqlx::SqlitePool;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tower_sessions::{
    cookie::SameSite, service::SignedCookie, session_store::ExpiredDeletion, Expiry,
    SessionManagerLayer,
};
use tower_sessions_sqlx_store::SqliteStore;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use config::{AuthStrategy, Config, OAuthConfig};
use db::KvStore;
use lists::ListEngine;
use social::Relationships;

/// Application state shared across all handlers.
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<KvStore>,
    pub lists: Arc<ListEngine>,
    pub social: Arc<Relationships>,
    pub config: Arc<Config>,
    /// Login sessions, stored next to the lists
    pub sessions: SqliteStore,
    /// Client for the OAuth provider
    pub http: reqwest::Client,
}

impl AppState {
    pub async fn new(pool: SqlitePool, config: Config) -> Result<Self, sqlx::Error> {
        let sessions = db::init_session_store(&pool).await?;
        let store = Arc::new(KvStore::new(pool));
        Ok(Self {
            lists: Arc::new(ListEngine::new(store.clone())),
            social: Arc::new(Relationships::new(store.clone())),
            store,
            config: Arc::new(config),
            sessions,
            http: reqwest::Client::new(),
        })
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Load configuration
    let config = Config::from_env()?;

    // Initialize logging
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.log_level));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting Shoplist Backend");
    tracing::info!("Database path: {:?}", config.db_path);
    tracing::info!("App shell: {:?}", config.index_path);
    tracing::info!("Bind address: {}", config.bind_addr);
    tracing::info!("Auth mode: {}", config.auth.name());

    match &config.auth {
        AuthStrategy::OAuth(oauth) if oauth.callback_url.is_none() => {
            tracing::warn!(
                "No OAuth callback URL configured (SHOPLIST_YANDEX_CALLBACK_URL). \
                 The provider's registered default will be used"
            );
        }
        AuthStrategy::Open => {
            tracing::warn!("Authentication is disabled! Everyone shares one list");
        }
        _ => {}
    }

    // Initialize database
    let pool = db::init_database(&config.db_path).await?;
    let state = AppState::new(pool, config.clone()).await?;

    // Expired sessions and abandoned logins
    tokio::task::spawn(
        state
            .sessions
            .clone()
            .continuously_delete_expired(tokio::time::Duration::from_secs(60 * 60)),
    );

    // Build router
    let app = create_router(state);

    // Start server
    let listener = tokio::net::TcpListener::bind(&config.bind_addr).await?;
    tracing::info!("Server listening on {}", config.bind_addr);

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await?;

    Ok(())
}

/// List CRUD routes, mounted both for users and for internal services.
fn list_routes() -> Router<AppState> {
    Router::new()
        .route("/list", get(api::list_items))
        .route("/add", post(api::add_item))
        .route("/buy/{name}", put(api::buy_item))
        .route("/delete/{name}", delete(api::delete_item))
        .route("/edit/{name}", put(api::edit_item))
        .route("/reorder", post(api::reorder_items))
}

/// Create the application router with all routes.
///
/// Serve it with `into_make_service_with_connect_info::<SocketAddr>()`; the
/// internal API rejects requests whose peer address is unknown.
pub fn create_router(state: AppState) -> Router {
    let oauth = match &state.config.auth {
        AuthStrategy::OAuth(oauth) => Some(oauth.clone()),
        _ => None,
    };

    // Routes behind the configured auth strategy
    let mut user_routes = list_routes();
    user_routes = if oauth.is_some() {
        user_routes
            .route("/api/user", get(api::current_user))
            .route("/api/users/search", get(api::search_users))
            .route("/api/users/all", get(api::all_users))
            .route("/api/friends", get(api::list_friends))
            .route("/api/friends/add", post(api::add_friend))
            .route("/api/friends/remove", delete(api::remove_friend))
            .route("/api/shared-lists", get(api::shared_lists))
            .route("/api/share-list", post(api::share_list))
    } else {
        user_routes.route("/", get(api::app_shell))
    };
    let user_routes = user_routes.route_layer(middleware::from_fn_with_state(
        state.clone(),
        auth::require_identity,
    ));

    // Service-to-service API, gated by source network
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);
    let internal_routes = list_routes()
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            auth::internal::require_internal_network,
        ))
        .layer(cors);

    let mut app = Router::new()
        .merge(user_routes)
        .nest("/internal/api", internal_routes)
        .route("/health", get(api::health_check));

    if let Some(oauth) = oauth {
        app = app
            .route("/", get(api::index_page))
            .route(auth::LOGIN_PATH, get(auth::oauth::begin))
            .route("/auth/yandex/callback", get(auth::oauth::callback))
            .route("/logout", get(auth::oauth::logout))
            .layer(session_layer(state.sessions.clone(), &oauth));
    }

    app.layer(TraceLayer::new_for_http()).with_state(state)
}

/// Signed `session` cookie over the SQLite session store.
fn session_layer(
    sessions: SqliteStore,
    oauth: &OAuthConfig,
) -> SessionManagerLayer<SqliteStore, SignedCookie> {
    SessionManagerLayer::new(sessions)
        .with_name(auth::session::SESSION_COOKIE)
        .with_secure(oauth.cookie_secure)
        .with_same_site(SameSite::Lax)
        .with_http_only(true)
        .with_expiry(Expiry::OnInactivity(time::Duration::days(30)))
        .with_signed(auth::session::signing_key(&oauth.session_secret))
}
