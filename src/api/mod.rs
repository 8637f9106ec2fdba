use axum::{
    Router,
    extract::DefaultBodyLimit,
    http::HeaderValue,
    middleware,
    routing::{get, post, put},
};
use std::sync::Arc;
use tokio::sync::RwLock;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tower_sessions::{Expiry, MemoryStore, SessionManagerLayer};

use time;

use crate::config::Config;
use crate::db::Store;
use crate::services::{
    AuthService, Mailer, NoopMailer, ReviewService, SeaOrmAuthService, SmtpMailer,
};
use crate::uploads::UploadService;

use metrics_exporter_prometheus::PrometheusHandle;

mod admin;
pub mod auth;
mod documents;
mod error;
mod observability;
mod system;
mod types;

pub use error::ApiError;
pub use types::*;

/// Slack on top of the configured maximum for multipart boundaries and
/// headers, so the transport-layer cap does not fire before the
/// validator's size check can produce its distinct error.
const MULTIPART_OVERHEAD: usize = 64 * 1024;

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<RwLock<Config>>,

    pub store: Store,

    pub uploads: Arc<UploadService>,

    pub auth: Arc<dyn AuthService>,

    pub review: Arc<ReviewService>,

    pub start_time: std::time::Instant,

    pub prometheus_handle: Option<PrometheusHandle>,
}

pub async fn create_app_state_from_config(
    config: Config,
    prometheus_handle: Option<PrometheusHandle>,
) -> anyhow::Result<Arc<AppState>> {
    let mailer: Arc<dyn Mailer> = SmtpMailer::from_config(&config.mail).map_or_else(
        || Arc::new(NoopMailer) as Arc<dyn Mailer>,
        |m| Arc::new(m) as Arc<dyn Mailer>,
    );

    create_app_state_with_mailer(config, mailer, prometheus_handle).await
}

/// State construction with an explicit mail transport, so tests can
/// substitute a fake.
pub async fn create_app_state_with_mailer(
    config: Config,
    mailer: Arc<dyn Mailer>,
    prometheus_handle: Option<PrometheusHandle>,
) -> anyhow::Result<Arc<AppState>> {
    let store = Store::with_pool_options(
        &config.general.database_path,
        config.general.max_db_connections,
        config.general.min_db_connections,
    )
    .await?;

    tokio::fs::create_dir_all(&config.uploads.upload_dir).await?;
    tokio::fs::create_dir_all(&config.uploads.template_dir).await?;

    let config = Arc::new(RwLock::new(config));

    let uploads = Arc::new(UploadService::new(store.clone(), config.clone()));
    let auth = Arc::new(SeaOrmAuthService::new(
        store.clone(),
        config.clone(),
        mailer.clone(),
    )) as Arc<dyn AuthService>;
    let review = Arc::new(ReviewService::new(store.clone(), mailer));

    Ok(Arc::new(AppState {
        config,
        store,
        uploads,
        auth,
        review,
        start_time: std::time::Instant::now(),
        prometheus_handle,
    }))
}

pub async fn router(state: Arc<AppState>) -> Router {
    let (cors_origins, secure_cookies, session_minutes, max_upload_bytes) = {
        let config = state.config.read().await;
        (
            config.server.cors_allowed_origins.clone(),
            config.server.secure_cookies,
            config.server.session_expiry_minutes,
            config.uploads.max_upload_bytes(),
        )
    };

    let protected_routes = create_protected_router(state.clone());

    let session_store = MemoryStore::default();
    let session_layer = SessionManagerLayer::new(session_store)
        .with_secure(secure_cookies)
        .with_same_site(tower_sessions::cookie::SameSite::Lax)
        .with_expiry(Expiry::OnInactivity(time::Duration::minutes(
            session_minutes,
        )));

    let api_router = Router::new()
        .merge(protected_routes)
        .route("/auth/register", post(auth::register))
        .route("/auth/login", post(auth::login))
        .route("/auth/logout", post(auth::logout))
        .route("/templates", get(documents::list_templates))
        .route("/templates/{filename}", get(documents::download_template))
        .layer(session_layer)
        .layer(DefaultBodyLimit::max(max_upload_bytes + MULTIPART_OVERHEAD))
        .with_state(state);

    let cors_layer = if cors_origins.contains(&"*".to_string()) {
        CorsLayer::new().allow_origin(Any)
    } else {
        let origins: Vec<HeaderValue> =
            cors_origins.iter().filter_map(|s| s.parse().ok()).collect();
        CorsLayer::new().allow_origin(origins)
    };

    Router::new()
        .nest("/api", api_router)
        .layer(cors_layer.allow_methods(Any).allow_headers(Any))
        .layer(TraceLayer::new_for_http())
        .layer(middleware::from_fn(observability::logging_middleware))
        .layer(middleware::from_fn(
            observability::security_headers_middleware,
        ))
}

fn create_protected_router(state: Arc<AppState>) -> Router<Arc<AppState>> {
    let admin_routes = Router::new()
        .route("/admin/documents", get(admin::list_documents))
        .route("/admin/documents/{id}/status", put(admin::update_status))
        .route_layer(middleware::from_fn_with_state(
            state,
            auth::admin_middleware,
        ));

    Router::new()
        .route("/auth/me", get(auth::get_current_user))
        .route("/documents", post(documents::upload))
        .route("/documents", get(documents::list_documents))
        .route(
            "/documents/{stored_filename}/download",
            get(documents::download),
        )
        .route("/system/status", get(system::get_status))
        .route("/metrics", get(observability::get_metrics))
        .merge(admin_routes)
        .route_layer(middleware::from_fn(auth::auth_middleware))
}
