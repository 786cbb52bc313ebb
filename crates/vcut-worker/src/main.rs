//! Video cut worker binary.

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Context;
use tracing::{error, info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use vcut_media::{FfmpegToolkit, MediaConfig};
use vcut_queue::{JobBroker, JobQueue};
use vcut_store::{RedisStateStore, StateRepository, StoreConfig};
use vcut_worker::{JobExecutor, RetentionScheduler, StatusFailureHook, VideoProcessor, WorkerConfig};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Install rustls crypto provider (required for TLS/HTTPS)
    rustls::crypto::ring::default_provider()
        .install_default()
        .expect("Failed to install rustls crypto provider");

    dotenvy::dotenv().ok();

    // Colored output for dev, JSON for production
    let use_json = std::env::var("LOG_FORMAT")
        .map(|v| v.to_lowercase() == "json")
        .unwrap_or(false);

    let env_filter = EnvFilter::from_default_env().add_directive("vcut=info".parse()?);

    if use_json {
        tracing_subscriber::registry()
            .with(fmt::layer().json())
            .with(env_filter)
            .init();
    } else {
        tracing_subscriber::registry()
            .with(fmt::layer().with_ansi(true).with_target(true))
            .with(env_filter)
            .init();
    }

    info!("Starting vcut-worker");

    if std::env::var("METRICS_ENABLED").map(|v| v == "true").unwrap_or(false) {
        let port: u16 = std::env::var("WORKER_METRICS_PORT")
            .ok()
            .and_then(|p| p.parse().ok())
            .unwrap_or(9091);
        let addr = SocketAddr::from(([0, 0, 0, 0], port));
        vcut_worker::metrics::init_exporter(addr).context("failed to start metrics exporter")?;
        info!("Metrics exporter listening on {}", addr);
    }

    let config = WorkerConfig::from_env();
    info!("Worker config: {:?}", config);

    for dir in [&config.upload_folder, &config.processed_folder] {
        tokio::fs::create_dir_all(dir)
            .await
            .with_context(|| format!("failed to create {}", dir.display()))?;
    }

    let store_config = StoreConfig::from_env();
    let store = RedisStateStore::new(&store_config).context("failed to create state store")?;
    let repo = StateRepository::with_config(Arc::new(store), &store_config);

    let media = FfmpegToolkit::new(MediaConfig::from_env());
    if let Err(e) = media.check_tools() {
        warn!("Media tools unavailable, video jobs will fail: {}", e);
    }

    let broker: Arc<dyn JobBroker> = Arc::new(JobQueue::from_env().context("failed to create job queue")?);

    let processor = Arc::new(VideoProcessor::new(repo.clone(), Arc::new(media), &config));
    let hook = Arc::new(StatusFailureHook::new(repo));
    let scheduler = RetentionScheduler::new(broker.clone(), config.retention_interval);
    let executor = Arc::new(JobExecutor::new(config, broker, processor, hook));

    let scheduler_handle = {
        let shutdown = executor.shutdown_signal();
        tokio::spawn(async move { scheduler.run(shutdown).await })
    };

    {
        let executor = executor.clone();
        tokio::spawn(async move {
            tokio::signal::ctrl_c().await.ok();
            info!("Received shutdown signal");
            executor.shutdown();
        });
    }

    if let Err(e) = executor.run().await {
        error!("Executor error: {}", e);
        return Err(e.into());
    }

    scheduler_handle.await.ok();
    info!("Worker shutdown complete");
    Ok(())
}
