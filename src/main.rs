//! Server entry point for streamgate.

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use streamgate::{AppState, ArtifactStore, ExtractionRunner, RetryPolicy, YtDlpExtractor, router};
use tokio::net::TcpListener;
use tracing::{debug, info};

mod cli;

use cli::Args;

#[tokio::main]
async fn main() -> Result<()> {
    // Parse CLI arguments first (before tracing, so --help works without logs)
    let args = Args::parse();

    // Determine log level based on verbose/quiet flags
    // Priority: RUST_LOG env var > quiet flag > verbose flag > default (info)
    let default_level = if args.quiet {
        "error"
    } else {
        match args.verbose {
            0 => "info",
            1 => "debug",
            _ => "trace",
        }
    };

    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_level));

    tracing_subscriber::fmt().with_env_filter(filter).init();

    debug!(?args, "CLI arguments parsed");
    info!("Streamgate starting");

    let temp_root = args
        .temp_dir
        .unwrap_or_else(|| std::env::temp_dir().join("streamgate"));
    let artifacts = Arc::new(
        ArtifactStore::new(&temp_root, Duration::from_secs(args.retention_secs))
            .with_context(|| format!("failed to prepare temp dir {}", temp_root.display()))?,
    );
    info!(root = %temp_root.display(), retention_secs = args.retention_secs, "artifact store ready");

    let extractor = YtDlpExtractor::new().with_binary(args.ytdlp_bin);
    let runner = Arc::new(ExtractionRunner::new(
        Arc::new(extractor),
        RetryPolicy::with_max_attempts(u32::from(args.max_attempts)),
    ));

    let state = AppState {
        runner,
        artifacts: Arc::clone(&artifacts),
    };

    let addr = format!("{}:{}", args.bind, args.port);
    let listener = TcpListener::bind(&addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;
    info!(%addr, "listening");

    axum::serve(listener, router(state))
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("HTTP server error")?;

    // Outstanding cleanup timers are aborted rather than drained; the temp
    // root is reclaimed out of band.
    artifacts.shutdown();
    info!("Streamgate stopped");
    Ok(())
}

async fn shutdown_signal() {
    // Both SIGINT and a failed signal registration fall through to shutdown.
    let _ = tokio::signal::ctrl_c().await;
    info!("shutdown signal received");
}
