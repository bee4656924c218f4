// SPDX-License-Identifier: MIT OR Apache-2.0
#![doc = include_str!("../README.md")]
#![deny(unsafe_code)]
#![warn(missing_docs)]

//! The Axum application wiring every other crate into the HTTP surface
//! from `spec.md` §6.

pub mod auth;
pub mod handlers;
pub mod middleware;
pub mod recorder;

use axum::Router;
use axum::routing::{get, post};
use ota_config::ServerConfig;
use ota_db::PgPool;
use ota_store::BlobStore;
use std::sync::Arc;
use std::time::Duration;
use tower_http::trace::TraceLayer;

/// Request-scoped dependencies shared by every handler: the database pool,
/// the object-store facade, and the static process configuration. Cloned
/// as an `Arc` per Axum's `State` extractor convention (§5: "no shared
/// in-process mutable state besides pooled database and object-store
/// clients").
pub struct AppState {
    /// Connection pool to the metadata store.
    pub pool: PgPool,
    /// Object-store facade.
    pub store: BlobStore,
    /// Static process configuration.
    pub config: ServerConfig,
}

/// Maximum publish requests accepted per window from this process, before
/// `429 Too Many Requests` (§5: "a single misbehaving publisher cannot
/// starve the ingestion pipeline").
const UPLOAD_RATE_LIMIT_MAX: u32 = 30;
const UPLOAD_RATE_LIMIT_WINDOW: Duration = Duration::from_secs(60);

/// Build the full Axum router: device-facing routes (no auth), the asset
/// stream, the publish endpoint (shared-secret, rate-limited), and the
/// bearer-guarded dashboard/state-machine routes.
pub fn build_app(state: Arc<AppState>) -> Router {
    let device_routes = Router::new()
        .route("/api/manifest", get(handlers::manifest::get_manifest))
        .route(
            "/api/manifest/{app}/{channel}",
            get(handlers::manifest::get_manifest_path),
        )
        .route("/api/assets", get(handlers::assets::get_asset));

    let upload_routes = Router::new()
        .route("/upload", post(handlers::upload::post_upload))
        .layer(middleware::RateLimiter::new(UPLOAD_RATE_LIMIT_MAX, UPLOAD_RATE_LIMIT_WINDOW).into_layer())
        // §5: "bound the total request body before buffering" — this caps the
        // whole multipart body, on top of `post_upload`'s per-part check.
        .layer(axum::extract::DefaultBodyLimit::max(state.config.max_upload_bytes as usize));

    let dashboard_routes = Router::new()
        .route(
            "/apps",
            get(handlers::apps::list_applications).post(handlers::apps::create_application),
        )
        .route(
            "/apps/{id}",
            get(handlers::apps::get_application)
                .patch(handlers::apps::update_application)
                .delete(handlers::apps::delete_application),
        )
        .route("/uploads", get(handlers::uploads::list_uploads))
        .route(
            "/uploads/{id}",
            get(handlers::uploads::get_upload)
                .patch(handlers::uploads::update_upload)
                .delete(handlers::uploads::delete_upload),
        )
        .route("/utils/release", post(handlers::utils::post_release))
        .route("/utils/rollback", post(handlers::utils::post_rollback))
        .route("/utils/gc-candidates", get(handlers::maintenance::get_gc_candidates))
        .route_layer(axum::middleware::from_fn_with_state(
            state.clone(),
            auth::require_bearer,
        ));

    Router::new()
        .route("/health", get(handlers::health::get_health))
        .merge(device_routes)
        .merge(upload_routes)
        .merge(dashboard_routes)
        .layer(axum::middleware::from_fn(middleware::request_id_middleware))
        .layer(axum::middleware::from_fn(middleware::RequestLogger::layer))
        .layer(TraceLayer::new_for_http())
        .layer(middleware::CorsConfig::default().to_cors_layer())
        .with_state(state)
}
