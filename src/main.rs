use std::process::ExitCode;

use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use media_fetcher_pro::{FetcherConfig, MediaRequest, MediaRouter};

fn load_initial_config() -> FetcherConfig {
    match FetcherConfig::load() {
        Ok(cfg) => {
            if let Err(err) = cfg.validate() {
                warn!(
                    "Invalid configuration detected ({}), falling back to defaults",
                    err
                );
                let default_cfg = FetcherConfig::default();
                if let Err(save_err) = default_cfg.save() {
                    warn!("Failed to persist default configuration: {}", save_err);
                }
                default_cfg
            } else {
                cfg
            }
        }
        Err(err) => {
            warn!(
                "Failed to load configuration from disk: {}. Using defaults",
                err
            );
            let default_cfg = FetcherConfig::default();
            if let Err(save_err) = default_cfg.save() {
                warn!("Failed to persist default configuration: {}", save_err);
            }
            default_cfg
        }
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    media_fetcher_pro::utils::logging::init_tracing();

    let Some(raw_url) = std::env::args().nth(1) else {
        eprintln!("Usage: media-fetcher-pro <URL>");
        return ExitCode::from(2);
    };

    info!("🚀 Starting Media Fetcher Pro");

    let config = load_initial_config();
    let router = match MediaRouter::new(config) {
        Ok(router) => router,
        Err(e) => {
            eprintln!("Failed to initialize: {}", e);
            return ExitCode::FAILURE;
        }
    };

    let cancel = CancellationToken::new();
    let request = MediaRequest::new(raw_url);

    let probe = router.probe(&request, &cancel).await;
    if let Some(size) = probe.size_bytes {
        info!("Estimated size: {} bytes", size);
    }

    match router.route(&request, &cancel).await {
        Ok(artifact) => {
            if let Err(e) = tokio::fs::write(&artifact.filename, &artifact.bytes).await {
                eprintln!("Failed to write {}: {}", artifact.filename, e);
                return ExitCode::FAILURE;
            }
            println!(
                "✅ Saved {} ({}, {} bytes)",
                artifact.filename, artifact.mime_type, artifact.size_bytes
            );
            ExitCode::SUCCESS
        }
        Err(report) => {
            eprintln!("❌ {}", report);
            ExitCode::FAILURE
        }
    }
}
