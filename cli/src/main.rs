//! balindex CLI — run the balance indexer and inspect its database.
//!
//! Usage:
//! ```bash
//! balindex run    --electrs-url http://localhost:3000 --port 4000
//! balindex status --db-path ./data/index.db
//! balindex verify bc1qxy2kgdygjrsqtzq2n0yrf2493p83kkfjhx0wlh
//! ```

mod api;
mod config;
mod logging;

use std::sync::Arc;

use anyhow::{bail, Context, Result};
use clap::Parser;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;

use balindex_core::source::BlockSource;
use balindex_core::store::BalanceStore;
use balindex_core::BigInt;
use balindex_electrs::{EsploraClient, IndexLoop};
use balindex_storage::SqliteStorage;

use crate::config::{Cli, Command};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    logging::init_tracing(&cli.log_config());
    cli.validate()?;

    match cli.command() {
        Command::Run => cmd_run(&cli).await,
        Command::Status => cmd_status(&cli).await,
        Command::Verify { address } => cmd_verify(&cli, &address).await,
    }
}

async fn cmd_run(cli: &Cli) -> Result<()> {
    let store: Arc<dyn BalanceStore> = Arc::new(
        SqliteStorage::open(&cli.db_path)
            .await
            .with_context(|| format!("opening database {}", cli.db_path))?,
    );
    let source = EsploraClient::new(&cli.electrs_url, cli.client_config())?;

    let shutdown = CancellationToken::new();
    spawn_signal_handler(shutdown.clone());

    let listener = TcpListener::bind(("0.0.0.0", cli.port))
        .await
        .with_context(|| format!("binding query API to port {}", cli.port))?;
    tracing::info!(port = cli.port, electrs_url = %source.url(), "Query API listening");

    let app = api::router(api::AppState::new(store.clone(), Arc::new(source.clone())));
    let server_shutdown = shutdown.clone();
    let server = tokio::spawn(async move {
        let token = server_shutdown.clone();
        let result = axum::serve(listener, app)
            .with_graceful_shutdown(async move { token.cancelled().await })
            .await;
        // A dead API takes the indexer down with it.
        server_shutdown.cancel();
        result
    });

    let mut indexer = IndexLoop::new(cli.indexer_config(), source, store);
    indexer.run(shutdown.clone()).await;

    server
        .await
        .context("query API task panicked")?
        .context("query API failed")?;
    tracing::info!("Shutdown complete");
    Ok(())
}

async fn cmd_status(cli: &Cli) -> Result<()> {
    let store = SqliteStorage::open(&cli.db_path)
        .await
        .with_context(|| format!("opening database {}", cli.db_path))?;

    let height = store.last_height().await?;
    let addresses = store.count().await?;
    let updated = store
        .updated_at()
        .await?
        .map(|t| t.to_rfc3339())
        .unwrap_or_else(|| "never".into());

    println!("balindex {}", env!("CARGO_PKG_VERSION"));
    println!("  Database:        {}", cli.db_path);
    println!("  Indexed height:  {height}");
    println!("  Addresses:       {addresses}");
    println!("  Last update:     {updated}");
    Ok(())
}

async fn cmd_verify(cli: &Cli, address: &str) -> Result<()> {
    let store = SqliteStorage::open(&cli.db_path)
        .await
        .with_context(|| format!("opening database {}", cli.db_path))?;
    let client = EsploraClient::new(&cli.electrs_url, cli.client_config())?;

    let indexed = store.last_height().await?;
    let tip = client.tip_height().await?;
    let stored = store
        .balance_of(address)
        .await?
        .unwrap_or_else(|| BigInt::from(0));
    let upstream = client.address_balance(address).await?;

    println!("  Address:   {address}");
    println!("  Indexed:   {stored} (height {indexed})");
    println!("  Upstream:  {upstream} (height {tip})");

    if indexed < tip {
        tracing::warn!(indexed, tip, "index is behind the tip; balances may differ");
    }
    if stored != upstream {
        bail!("balance mismatch for {address}: indexed {stored}, upstream {upstream}");
    }
    println!("  OK");
    Ok(())
}

/// Cancel `shutdown` on Ctrl-C or SIGTERM.
fn spawn_signal_handler(shutdown: CancellationToken) {
    tokio::spawn(async move {
        #[cfg(unix)]
        {
            use tokio::signal::unix::{signal, SignalKind};
            match signal(SignalKind::terminate()) {
                Ok(mut sigterm) => {
                    tokio::select! {
                        _ = tokio::signal::ctrl_c() => {},
                        _ = sigterm.recv() => {},
                    }
                }
                Err(e) => {
                    tracing::warn!(error = %e, "failed to install SIGTERM handler");
                    let _ = tokio::signal::ctrl_c().await;
                }
            }
        }
        #[cfg(not(unix))]
        {
            let _ = tokio::signal::ctrl_c().await;
        }

        tracing::info!("Signal received, shutting down...");
        shutdown.cancel();
    });
}
