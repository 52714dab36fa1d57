// Torb API server
// Decision: Postgres when DATABASE_URL is set, in-memory dev mode otherwise
// Decision: Graceful shutdown on Ctrl-C or SIGTERM, then the cache service is torn down

use std::sync::Arc;

use anyhow::{Context, Result};
use torb_api::{config::ServerConfig, peer, router, AppState};
use torb_core::BoxOffice;
use torb_storage::{hash_password, StorageBackend};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<()> {
    if let Ok(path) = dotenvy::dotenv() {
        eprintln!("Loaded environment from {}", path.display());
    }

    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "torb_api=debug,torb_core=info,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("torb-api starting...");

    let config = ServerConfig::from_env();

    let backend = StorageBackend::from_url(config.database_url.as_deref())
        .await
        .context("Failed to initialize storage")?;
    let storage = if backend.is_dev_mode() {
        "memory"
    } else {
        "postgres"
    };

    let transport = peer::build_transport(config.peer.as_ref())?;
    let office = Arc::new(BoxOffice::new(
        backend.into_store(),
        transport,
        config.box_office.clone(),
    ));
    tracing::info!(
        retry = ?config.box_office.retry,
        cache_max_age = ?config.box_office.cache.max_age,
        "Box office configured"
    );

    if let Some(admin) = &config.admin {
        let pass_hash = hash_password(&admin.password)?;
        office
            .ensure_administrator(&admin.login_name, &admin.nickname, pass_hash)
            .await
            .context("Failed to bootstrap administrator")?;
    }

    let app = router(AppState::new(
        office.clone(),
        config.session.clone(),
        storage,
    ));

    let listener = tokio::net::TcpListener::bind(&config.listen_addr)
        .await
        .context("Failed to bind to address")?;
    tracing::info!("Listening on {}", config.listen_addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    office.shutdown();
    tracing::info!("torb-api stopped");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to listen for Ctrl-C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::info!("Received Ctrl-C, shutting down");
        }
        _ = terminate => {
            tracing::info!("Received SIGTERM, shutting down");
        }
    }
}
