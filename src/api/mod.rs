use axum::{
    Router,
    http::HeaderValue,
    middleware,
    routing::{get, post},
};
use metrics_exporter_prometheus::PrometheusHandle;
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::config::Config;
use crate::db::{Store, UserStore};
use crate::services::{AccessGuard, AccountService, CredentialHasher, StoreAccountService};

pub mod auth;
mod content;
mod error;
mod observability;
mod types;

pub use error::ApiError;
pub use types::*;

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,

    pub store: Store,

    pub accounts: Arc<dyn AccountService>,

    pub guard: AccessGuard,

    pub prometheus_handle: Option<PrometheusHandle>,
}

impl AppState {
    #[must_use]
    pub const fn store(&self) -> &Store {
        &self.store
    }
}

/// Wires services around an already connected store.
pub fn create_app_state(
    store: Store,
    config: Config,
    prometheus_handle: Option<PrometheusHandle>,
) -> anyhow::Result<Arc<AppState>> {
    let user_store: Arc<dyn UserStore> = Arc::new(store.clone());

    let hasher = CredentialHasher::new(&config.security)?;
    let accounts = Arc::new(StoreAccountService::new(
        user_store.clone(),
        hasher,
        config.security.min_password_length,
    )) as Arc<dyn AccountService>;
    let guard = AccessGuard::new(user_store);

    Ok(Arc::new(AppState {
        config: Arc::new(config),
        store,
        accounts,
        guard,
        prometheus_handle,
    }))
}

pub async fn create_app_state_from_config(
    config: Config,
    prometheus_handle: Option<PrometheusHandle>,
) -> anyhow::Result<Arc<AppState>> {
    let store = Store::with_pool_options(
        &config.general.database_path,
        config.general.max_db_connections,
        config.general.min_db_connections,
    )
    .await?;

    create_app_state(store, config, prometheus_handle)
}

pub fn router(state: Arc<AppState>) -> Router {
    let cors_origins = &state.config.server.cors_allowed_origins;

    let cors_layer = if cors_origins.iter().any(|o| o == "*") {
        CorsLayer::new().allow_origin(Any)
    } else {
        let origins: Vec<HeaderValue> =
            cors_origins.iter().filter_map(|s| s.parse().ok()).collect();
        CorsLayer::new().allow_origin(origins)
    };

    let protected_routes = Router::new()
        .route("/content", get(content::content))
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            auth::require_access_token,
        ));

    let mut app = Router::new()
        .route("/", get(content::index))
        .route("/register", post(auth::register))
        .route("/login", post(auth::login))
        .merge(protected_routes);

    if let Some(handle) = state.prometheus_handle.clone() {
        app = app.route(
            "/metrics",
            get(move || observability::get_metrics(handle.clone())),
        );
    }

    // Logging sits inside TraceLayer so the guard records `user_id` on its span
    app.with_state(state)
        .layer(middleware::from_fn(observability::logging_middleware))
        .layer(cors_layer.allow_methods(Any).allow_headers(Any))
        .layer(TraceLayer::new_for_http())
        .layer(middleware::from_fn(observability::security_headers_middleware))
}
