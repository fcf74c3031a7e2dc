// SPDX-License-Identifier: Apache-2.0

#![forbid(unsafe_code)]

use referral_desk_server::{build_router, AppState, ServerConfig};
use referral_desk_store::ReferralStore;
use tokio::net::TcpListener;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

fn init_tracing(log_json: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    if log_json {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().json())
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer())
            .init();
    }
}

async fn wait_for_shutdown_signal() {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};
        match (
            signal(SignalKind::terminate()),
            signal(SignalKind::interrupt()),
        ) {
            (Ok(mut sigterm), Ok(mut sigint)) => {
                tokio::select! {
                    _ = sigterm.recv() => {}
                    _ = sigint.recv() => {}
                }
            }
            _ => {
                warn!("signal handlers unavailable; falling back to ctrl-c");
                let _ = tokio::signal::ctrl_c().await;
            }
        }
    }
    #[cfg(not(unix))]
    {
        let _ = tokio::signal::ctrl_c().await;
    }
}

#[tokio::main]
async fn main() -> Result<(), String> {
    let config = ServerConfig::from_env();
    init_tracing(config.log_json);
    config.validate().map_err(|e| {
        error!("invalid configuration: {e}");
        e
    })?;
    if std::env::var(referral_desk_server::ENV_CURSOR_SECRET).is_err() {
        warn!("no cursor secret configured; page cursors will not survive a restart");
    }

    let store = ReferralStore::open(&config.db_path)
        .map_err(|e| format!("failed to open store {}: {e}", config.db_path.display()))?;
    info!(
        db_path = %config.db_path.display(),
        schema_version = store.schema_version().unwrap_or_default(),
        "store opened"
    );

    let bind_addr = config.bind_addr.clone();
    let app = build_router(AppState::new(store, config));
    let listener = TcpListener::bind(&bind_addr)
        .await
        .map_err(|e| format!("bind {bind_addr} failed: {e}"))?;
    info!("referral-desk-server listening on {bind_addr}");
    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            wait_for_shutdown_signal().await;
            info!("shutdown signal received; draining requests");
        })
        .await
        .map_err(|e| format!("server failed: {e}"))
}
