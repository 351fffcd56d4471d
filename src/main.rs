/// Tezos Delegation Indexer
///
/// Mirrors TzKT delegation operations into PostgreSQL, incrementally and
/// idempotently, and serves the indexed delegations over HTTP.
mod cli;
mod db;
mod error;
mod etl;
mod models;
mod pipeline;
mod server;
mod service;
mod tzkt;

use anyhow::{Context, Result};
use clap::Parser;
use cli::{Cli, LogFormat};
use db::{Database, Repository};
use pipeline::Indexer;
use service::DelegationService;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tracing_subscriber::EnvFilter;
use tzkt::TzktClient;

#[tokio::main]
async fn main() -> Result<()> {
    // Load environment variables from .env file
    dotenv::dotenv().ok();

    let cli = Cli::parse();
    init_logging(cli.log_format);
    cli.validate()?;

    println!("🚀 Starting Tezos Delegation Indexer...");

    let tzkt = TzktClient::new(cli.resolve_tzkt_url(), Duration::from_secs(cli.http_timeout))
        .context("Failed to create TzKT client")?;

    // TzKT being down is not fatal: every cycle retries on its own
    match tzkt.test_connection().await {
        Ok(()) => println!("✅ Connected to TzKT: {}", tzkt.base_url()),
        Err(e) => tracing::warn!(error = %e, url = tzkt.base_url(), "TzKT is not reachable yet"),
    }

    let database_url = cli.resolve_database_url()?;

    println!("\n💾 Connecting to PostgreSQL database...");
    let database =
        Database::new(&database_url, &cli.pool_config()).await.context("Failed to connect to PostgreSQL database")?;
    database.test_connection().await.context("Database connection test failed")?;
    println!("✅ Database connected successfully!");

    println!("📋 Running database migrations...");
    database.migrate().await.context("Failed to run database migrations")?;

    let repository: Arc<dyn Repository> = Arc::new(database);
    let service = DelegationService::new(Arc::clone(&repository));
    let indexer = Indexer::new(Arc::new(tzkt), repository, service.clone(), cli.indexer_config());

    if cli.once {
        let stats = indexer.index_once().await.context("Indexing cycle failed")?;
        println!(
            "\n✨ Indexed {} delegations ({} mode, {} fetched, {} skipped) in {:.2}s",
            stats.inserted,
            stats.mode.as_str(),
            stats.fetched,
            stats.transform.skipped(),
            stats.elapsed_time.as_secs_f64()
        );
        return Ok(());
    }

    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    let server_task = if cli.no_server {
        None
    } else {
        let bind = cli.bind_addr();
        let listener =
            tokio::net::TcpListener::bind(bind).await.with_context(|| format!("Failed to bind HTTP API to {bind}"))?;
        tracing::info!("HTTP API listening on http://{}", bind);
        Some(tokio::spawn(server::serve(listener, service, shutdown_rx.clone())))
    };

    let indexer_rx = shutdown_rx.clone();
    let indexer_task = tokio::spawn(async move { indexer.run(indexer_rx).await });

    tracing::info!("Tezos Delegation Indexer initialized successfully");

    tokio::signal::ctrl_c().await.context("Failed to listen for Ctrl+C")?;
    tracing::info!("Shutdown signal received, stopping components");
    let _ = shutdown_tx.send(true);

    let reason = indexer_task.await.context("Indexer task panicked")?;
    tracing::info!(?reason, "Indexer stopped");

    if let Some(task) = server_task {
        task.await.context("HTTP API task panicked")?.context("HTTP API failed")?;
    }

    println!("\n✨ Shutdown complete!");
    Ok(())
}

/// Initialize logging from RUST_LOG, defaulting to `info`
fn init_logging(format: LogFormat) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let builder = tracing_subscriber::fmt().with_env_filter(filter);

    match format {
        LogFormat::Text => builder.init(),
        LogFormat::Json => builder.json().init(),
    }
}
