mod api;
mod cli;
mod pipeline;
mod poller;
mod replay;
mod router;
mod screenshot;
mod state;
#[cfg(test)]
mod testdata;

use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use ict_core::Config;
use tracing::{info, warn};

use crate::cli::{Cli, Command};
use crate::pipeline::{Pipeline, PipelineQueue, MAX_CONCURRENT_RUNS, QUEUE_CAPACITY};
use crate::poller::Poller;
use crate::state::AppState;

/// Resolves on Ctrl-C. If the handler cannot be installed, never resolves.
async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!(error = %e, "Could not listen for Ctrl-C");
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}

async fn serve(config: &Config, pipeline: Arc<Pipeline>) -> anyhow::Result<()> {
    let provider = if config.llm.is_configured() {
        config.llm.provider.clone()
    } else {
        "none".to_string()
    };
    let channels = pipeline.channel_names();
    let (queue, worker) = PipelineQueue::start(pipeline, QUEUE_CAPACITY, MAX_CONCURRENT_RUNS);

    let state = Arc::new(AppState {
        queue,
        provider,
        channels,
    });
    let app = router::build_router(state);

    let addr = config.server.bind_addr();
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("binding {addr}"))?;
    info!("Server listening on http://{}", addr);
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    // The router held the last queue handle; the worker drains and exits.
    info!("HTTP server stopped, waiting for queued alerts");
    worker.await.context("pipeline worker failed")?;
    info!("Server stopped");
    Ok(())
}

async fn poll(config: &Config, pipeline: Arc<Pipeline>) -> anyhow::Result<()> {
    let poller = Poller::new(&config.poller, pipeline)?;
    poller.run_until(shutdown_signal()).await;
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    ict_core::config::load_dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    let config = Config::from_env();
    config.log_summary();

    let pipeline = Arc::new(Pipeline::from_config(&config));

    match cli.command() {
        Command::Serve => serve(&config, pipeline).await?,
        Command::Poll => poll(&config, pipeline).await?,
        Command::Replay { file } => {
            replay::replay_file(pipeline, &file).await?;
        }
    }

    Ok(())
}
