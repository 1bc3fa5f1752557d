use anyhow::Context;
use std::sync::Arc;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use meetingserver::core::config::AppConfig;
use meetingserver::core::shared::state::AppState;
use meetingserver::core::shared::utils::{create_conn, run_migrations};
use meetingserver::main_module::{build_router, run_axum_server};
use meetingserver::meeting_requests::attachments::{BlobStore, LocalBlobStore};
use meetingserver::meeting_requests::pg_store::PgMeetingRequestStore;
use meetingserver::meeting_requests::store::{InMemoryMeetingRequestStore, MeetingRequestStore};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let config = AppConfig::load()?;

    tokio::fs::create_dir_all(&config.storage.attachments_dir)
        .await
        .with_context(|| {
            format!(
                "Failed to create attachments directory {}",
                config.storage.attachments_dir.display()
            )
        })?;
    let blobs: Arc<dyn BlobStore> = Arc::new(LocalBlobStore::new(&config.storage.attachments_dir));

    let (store, pool) = match config.database.url.as_deref() {
        Some(url) => {
            let pool = create_conn(url, &config.database).context("Failed to connect to database")?;
            let migration_pool = pool.clone();
            tokio::task::spawn_blocking(move || run_migrations(&migration_pool))
                .await?
                .map_err(|e| anyhow::anyhow!("Failed to run migrations: {e}"))?;
            info!("Database ready");
            (
                Arc::new(PgMeetingRequestStore::new(pool.clone())) as Arc<dyn MeetingRequestStore>,
                Some(pool),
            )
        }
        None => {
            warn!("No database configured; meeting requests are kept in memory only");
            (
                Arc::new(InMemoryMeetingRequestStore::new()) as Arc<dyn MeetingRequestStore>,
                None,
            )
        }
    };

    let state = Arc::new(AppState::new(&config, store, blobs, pool));
    let app = build_router(state, config.storage.max_file_size);

    run_axum_server(app, &config.server.bind_address()).await?;
    info!("Server stopped");
    Ok(())
}
