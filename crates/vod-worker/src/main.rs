//! Transcode worker binary.

use std::sync::Arc;

use tracing::{error, info};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use vod_worker::{Worker, WorkerConfig, WorkerContext};

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();

    let use_json = std::env::var("LOG_FORMAT")
        .map(|v| v.to_lowercase() == "json")
        .unwrap_or(false);

    let env_filter = EnvFilter::from_default_env()
        .add_directive("vod=info".parse().expect("valid directive"));

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

    info!("Starting vod-worker");

    let config = WorkerConfig::from_env();
    info!("Worker config: {:?}", config);

    let ctx = match WorkerContext::from_env(config).await {
        Ok(ctx) => ctx,
        Err(e) => {
            error!("Failed to connect worker collaborators: {e}");
            std::process::exit(1);
        }
    };

    let worker = Arc::new(Worker::new(ctx));

    let signal_worker = Arc::clone(&worker);
    tokio::spawn(async move {
        tokio::signal::ctrl_c().await.ok();
        info!("Received shutdown signal");
        signal_worker.shutdown();
    });

    if let Err(e) = worker.run().await {
        error!("Worker error: {e}");
        std::process::exit(1);
    }

    info!("Worker shutdown complete");
}
