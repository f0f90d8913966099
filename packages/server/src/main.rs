use std::sync::Arc;

use anyhow::Context;
use common::storage::filesystem::FilesystemImageStore;
use tokio::net::TcpListener;
use tracing::{Level, info};

use server::config::AppConfig;
use server::state::AppState;
use server::{build_router, database, seed};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt().with_max_level(Level::INFO).init();

    let config = AppConfig::load().context("Failed to load configuration")?;

    let db = database::init_db(&config.database.url)
        .await
        .context("Failed to initialise database")?;
    seed::ensure_indexes(&db)
        .await
        .context("Failed to create database indexes")?;

    let images = FilesystemImageStore::new(
        config.storage.data_dir.clone(),
        config.storage.max_image_size,
    )
    .await
    .with_context(|| {
        format!(
            "Failed to open image store at {}",
            config.storage.data_dir.display()
        )
    })?;

    let addr = format!("{}:{}", config.server.host, config.server.port);
    let state = AppState {
        db,
        config,
        images: Arc::new(images),
    };
    let app = build_router(state);

    let listener = TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {addr}"))?;
    info!("Server running at http://{}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server shut down");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
        info!("Received Ctrl+C, shutting down");
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{SignalKind, signal};
        match signal(SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
                info!("Received terminate signal, shutting down");
            }
            Err(e) => {
                tracing::error!("Failed to install signal handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
