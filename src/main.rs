//! Signal Inbox — Binary Entrypoint
//! Boots the Axum HTTP server: inbound-email webhook, health, metrics.
//!
//! Local runs use in-memory collaborators; the idea directory is seeded
//! from SIGNAL_INBOX_IDEA_IDS (comma-separated ids).

use std::net::SocketAddr;
use std::sync::Arc;

use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use signal_inbox::api::{self, AppState};
use signal_inbox::config::PipelineConfig;
use signal_inbox::metrics::Metrics;
use signal_inbox::pipeline::Pipeline;
use signal_inbox::store::MemorySignalStore;
use signal_inbox::summarize::build_summarizer;
use signal_inbox::target::MemoryIdeaDirectory;

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("signal_inbox=info,warn"));
    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().compact())
        .init();
}

fn seed_directory(directory: &MemoryIdeaDirectory) {
    let Ok(raw) = std::env::var("SIGNAL_INBOX_IDEA_IDS") else {
        return;
    };
    for part in raw.split(',') {
        match part.trim().parse::<i64>() {
            Ok(id) => directory.add_bare(id),
            Err(_) if part.trim().is_empty() => {}
            Err(_) => tracing::warn!(part, "ignoring non-numeric idea id in seed list"),
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env in local/dev; no-op in prod environments.
    let _ = dotenvy::dotenv();
    init_tracing();

    let cfg = PipelineConfig::load()?;
    let metrics = Metrics::init();

    let directory = Arc::new(MemoryIdeaDirectory::default());
    seed_directory(&directory);
    let summarizer = build_summarizer(&cfg.summarizer);
    let store = Arc::new(MemorySignalStore::new());

    let pipeline = Arc::new(Pipeline::new(directory, summarizer, store, cfg));
    let app = api::router(AppState { pipeline }).merge(metrics.router());

    let port: u16 = std::env::var("PORT")
        .ok()
        .and_then(|p| p.parse().ok())
        .unwrap_or(8080);
    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!(%addr, "signal-inbox listening");
    axum::serve(listener, app).await?;
    Ok(())
}
