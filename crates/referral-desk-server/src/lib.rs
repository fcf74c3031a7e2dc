// SPDX-License-Identifier: Apache-2.0

#![forbid(unsafe_code)]

mod config;
mod http;
mod middleware;

use axum::extract::DefaultBodyLimit;
use axum::middleware::from_fn_with_state;
use axum::routing::{get, post};
use axum::Router;
use referral_desk_store::ReferralStore;
use std::sync::atomic::AtomicU64;
use std::sync::Arc;
use tokio::sync::Mutex;

pub use config::{
    ServerConfig, ENV_API_KEYS, ENV_BIND, ENV_CORS_ALLOWED_ORIGINS, ENV_CURSOR_SECRET,
    ENV_DB_PATH, ENV_DEFAULT_PAGE_SIZE, ENV_IMPORT_BATCH_SIZE, ENV_LOG_JSON, ENV_MAX_BODY_BYTES,
    ENV_MAX_PAGE_SIZE, ENV_REQUIRE_API_KEY,
};

pub const CRATE_NAME: &str = "referral-desk-server";

/// Shared handler state. The single store connection is held for one
/// synchronous operation per request.
#[derive(Clone)]
pub struct AppState {
    pub(crate) store: Arc<Mutex<ReferralStore>>,
    pub(crate) config: Arc<ServerConfig>,
    pub(crate) request_id_seed: Arc<AtomicU64>,
}

impl AppState {
    #[must_use]
    pub fn new(store: ReferralStore, config: ServerConfig) -> Self {
        Self {
            store: Arc::new(Mutex::new(store)),
            config: Arc::new(config),
            request_id_seed: Arc::new(AtomicU64::new(1)),
        }
    }

    #[must_use]
    pub fn config(&self) -> &ServerConfig {
        &self.config
    }
}

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/healthz", get(http::system::healthz_handler))
        .route("/readyz", get(http::system::readyz_handler))
        .route("/v1/version", get(http::system::version_handler))
        .route("/v1/openapi.json", get(http::system::openapi_handler))
        .route(
            "/v1/referrals",
            get(http::referrals::list_handler).post(http::referrals::create_handler),
        )
        .route("/v1/referrals/import", post(http::referrals::import_handler))
        .route("/v1/referrals/export", get(http::referrals::export_handler))
        .route(
            "/v1/referrals/:id",
            get(http::referrals::get_handler)
                .patch(http::referrals::patch_handler)
                .delete(http::referrals::delete_handler),
        )
        .route("/v1/metrics", get(http::metrics::metrics_handler))
        .route("/v1/metrics/export", get(http::metrics::export_handler))
        .route(
            "/v1/referent-contacts",
            get(http::contacts::list_handler).post(http::contacts::create_handler),
        )
        .route(
            "/v1/referent-contacts/:id",
            get(http::contacts::get_handler)
                .patch(http::contacts::patch_handler)
                .delete(http::contacts::delete_handler),
        )
        .fallback(http::system::not_found_handler)
        .layer(from_fn_with_state(state.clone(), middleware::api_key_middleware))
        .layer(from_fn_with_state(state.clone(), middleware::cors_middleware))
        .layer(from_fn_with_state(
            state.clone(),
            middleware::request_tracing_middleware,
        ))
        .layer(DefaultBodyLimit::max(state.config.max_body_bytes))
        .with_state(state)
}
