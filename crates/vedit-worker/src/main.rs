//! Video edit pipeline worker binary.
//!
//! Usage: `vedit-worker <video-id>...`

use std::sync::Arc;

use anyhow::{bail, Context};
use tracing::{error, info};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use vedit_media::{check_ffmpeg, check_ffprobe};
use vedit_models::VideoId;
use vedit_store::JsonFileStore;
use vedit_worker::{metrics, ProcessingLifecycle, RunDispatcher, WorkerConfig};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables
    dotenvy::dotenv().ok();

    init_tracing()?;

    let video_ids: Vec<VideoId> = std::env::args().skip(1).map(VideoId::from).collect();
    if video_ids.is_empty() {
        bail!("usage: vedit-worker <video-id>...");
    }

    info!("Starting vedit-worker");

    let config = WorkerConfig::from_env().context("loading worker configuration")?;
    info!("Worker config: {:?}", config);

    if let Some(addr) = config.metrics_addr {
        metrics::install_exporter(addr)?;
        info!("Prometheus exporter listening on {}", addr);
    }

    let ffmpeg = check_ffmpeg()?;
    let ffprobe = check_ffprobe()?;
    info!("Using {} and {}", ffmpeg.display(), ffprobe.display());

    let store = Arc::new(JsonFileStore::new(config.upload_dir.clone()));
    let lifecycle = Arc::new(ProcessingLifecycle::from_config(config, store));
    let dispatcher = RunDispatcher::new(lifecycle);

    let handles: Vec<_> = video_ids
        .iter()
        .map(|id| dispatcher.dispatch(id.clone()))
        .collect();
    let results = futures::future::join_all(handles).await;

    let mut failed = 0;
    for (video_id, result) in video_ids.iter().zip(results) {
        match result {
            Ok(Ok(())) => info!(video_id = %video_id, "Video processed"),
            Ok(Err(_)) => failed += 1,
            Err(e) => {
                failed += 1;
                error!(video_id = %video_id, "Run task panicked: {}", e);
            }
        }
    }

    if failed > 0 {
        bail!("{} of {} runs failed", failed, video_ids.len());
    }

    info!("Worker finished");
    Ok(())
}

/// Colored output for dev, JSON when `LOG_FORMAT=json`.
fn init_tracing() -> anyhow::Result<()> {
    let use_json = std::env::var("LOG_FORMAT")
        .map(|v| v.to_lowercase() == "json")
        .unwrap_or(false);

    let env_filter = EnvFilter::from_default_env().add_directive("vedit=info".parse()?);

    if use_json {
        tracing_subscriber::registry()
            .with(fmt::layer().json())
            .with(env_filter)
            .init();
    } else {
        tracing_subscriber::registry()
            .with(
                fmt::layer()
                    .with_ansi(true)
                    .with_target(true)
                    .with_thread_ids(false)
                    .with_file(false)
                    .with_line_number(false),
            )
            .with(env_filter)
            .init();
    }
    Ok(())
}
