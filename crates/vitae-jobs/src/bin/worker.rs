//! vitae-worker: the processing daemon.
//!
//! Wires the connection pool, extraction chain, enhancement stage,
//! worker pool, and reaper from environment configuration, then runs
//! until interrupted.

use anyhow::Context;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use vitae_core::EventBus;
use vitae_db::Database;
use vitae_extract::{EnhancementStage, ExtractionChain};
use vitae_jobs::{
    CompletionNotifier, ProcessingPipeline, Reaper, ReaperConfig, Worker, WorkerConfig,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));
    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer())
        .init();

    let database_url = std::env::var("DATABASE_URL").context("DATABASE_URL must be set")?;
    let db = Database::connect(&database_url)
        .await
        .context("Failed to connect to database")?;

    let bus = EventBus::new();
    let chain = ExtractionChain::from_env();
    info!(providers = ?chain.provider_ids(), "Extraction chain configured");

    let pipeline = ProcessingPipeline::new(
        db.clone(),
        chain,
        EnhancementStage::from_env(),
        CompletionNotifier::new(bus.clone()),
    );

    let worker = Worker::new(db.clone(), pipeline, WorkerConfig::from_env());
    let worker_handle = worker.start();

    let reaper = Reaper::new(db, ReaperConfig::from_env());
    let reaper_handle = reaper.start();

    info!("vitae-worker running; press Ctrl-C to stop");
    tokio::signal::ctrl_c()
        .await
        .context("Failed to listen for shutdown signal")?;

    info!("Shutting down");
    worker_handle.shutdown().await.ok();
    reaper_handle.shutdown().await.ok();

    Ok(())
}
