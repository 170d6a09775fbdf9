use anyhow::Context;
use devevent_api::{app, AppState};
use devevent_domain::repository::Datastore;
use devevent_store::app_config::Config;
use devevent_store::{CloudinaryClient, MemoryDatastore, PgDatastore};
use std::net::SocketAddr;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "devevent_api=debug,devevent_store=info,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Refuses to start without a database URL.
    let config = Config::load().context("Failed to load config")?;
    tracing::info!("Starting DevEvent API on port {}", config.server.port);

    let store: Arc<dyn Datastore> = if config.database.url.starts_with("memory://") {
        tracing::warn!("Using in-memory datastore; nothing will be persisted");
        if config.database.seed_sample_events {
            Arc::new(MemoryDatastore::with_sample_events().await?)
        } else {
            Arc::new(MemoryDatastore::new())
        }
    } else {
        // Connects on the first request, not here.
        Arc::new(PgDatastore::new(&config.database))
    };

    let media = CloudinaryClient::new(&config.media).context("Failed to build media client")?;

    let app_state = AppState {
        store,
        media: Arc::new(media),
        media_folder: config.media.folder.clone(),
        max_upload_bytes: config.server.max_upload_bytes,
    };

    let app = app(app_state);

    let addr = SocketAddr::from(([0, 0, 0, 0], config.server.port));
    tracing::info!("Listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    tracing::warn!("Received Ctrl+C, shutting down");
}
