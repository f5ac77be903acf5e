// Copyright (c) 2026 ALAS Technology. MIT License.
// See LICENSE for details.

//! # SWELL Ledger Node
//!
//! Entry point for the `swell-node` binary. Parses CLI arguments,
//! initializes logging and metrics, loads or creates the engine state,
//! runs the background settlement loop, and serves the REST API.
//!
//! The binary supports three subcommands:
//!
//! - `run`     — start the ledger node
//! - `status`  — query a running node's status endpoint
//! - `version` — print build version information

mod api;
mod cli;
mod logging;
mod metrics;

use anyhow::{Context, Result};
use chrono::Utc;
use clap::Parser;
use std::sync::Arc;
use tokio::signal;
use tokio::sync::RwLock;

use swell_protocol::assets::AssetId;
use swell_protocol::buffer::ReservePool;
use swell_protocol::engine::LiquidityEngine;
use swell_protocol::governance::{Command, ContractRegistry};

use cli::{Commands, SwellNodeCli};
use logging::LogFormat;
use metrics::NodeMetrics;

/// Assets registered on a freshly created ledger: one 18-digit stable
/// and two 6-digit ones.
const GENESIS_ASSETS: [(&str, u32); 3] = [("DAI", 18), ("USDC", 6), ("USDT", 6)];

#[tokio::main]
async fn main() -> Result<()> {
    let cli = SwellNodeCli::parse();

    match cli.command {
        Commands::Run(args) => run_node(args).await,
        Commands::Status(args) => query_status(args).await,
        Commands::Version => {
            print_version();
            Ok(())
        }
    }
}

/// Starts the full ledger node: API server, metrics endpoint, and the
/// background settlement loop.
async fn run_node(args: cli::RunArgs) -> Result<()> {
    logging::init_logging(
        "swell_node=info,swell_protocol=info,tower_http=debug",
        LogFormat::from_str_lossy(&args.log_format),
    );

    tracing::info!(
        rpc_port = args.rpc_port,
        metrics_port = args.metrics_port,
        settle_interval = args.settle_interval,
        state_file = %args.state_file.display(),
        "starting swell-node"
    );

    // --- Engine state ---
    let engine = load_or_create_engine(&args)?;
    let engine = Arc::new(RwLock::new(engine));
    let pool = Arc::new(RwLock::new(ReservePool::new()));

    // --- Metrics ---
    let node_metrics = Arc::new(NodeMetrics::new());

    // --- Application state ---
    let app_state = api::AppState {
        version: format!(
            "{} (protocol {})",
            env!("CARGO_PKG_VERSION"),
            swell_protocol::config::PROTOCOL_VERSION,
        ),
        engine: Arc::clone(&engine),
        pool: Arc::clone(&pool),
        metrics: Arc::clone(&node_metrics),
    };

    // --- API server ---
    let api_router = api::create_router(app_state);
    let api_addr = format!("0.0.0.0:{}", args.rpc_port);
    let api_listener = tokio::net::TcpListener::bind(&api_addr)
        .await
        .with_context(|| format!("failed to bind RPC listener on {}", api_addr))?;
    tracing::info!("REST API server listening on {}", api_addr);

    // --- Metrics server ---
    let metrics_router = axum::Router::new()
        .route("/metrics", axum::routing::get(metrics::metrics_handler))
        .with_state(Arc::clone(&node_metrics));
    let metrics_addr = format!("0.0.0.0:{}", args.metrics_port);
    let metrics_listener = tokio::net::TcpListener::bind(&metrics_addr)
        .await
        .with_context(|| format!("failed to bind metrics listener on {}", metrics_addr))?;
    tracing::info!("Metrics server listening on {}", metrics_addr);

    // --- Background settlement loop ---
    // Withdrawals that could not be paid immediately sit in the queue;
    // this loop opportunistically drains it as liquidity arrives, so no
    // external keeper is required for a single-node deployment.
    let engine_ref = Arc::clone(&engine);
    let pool_ref = Arc::clone(&pool);
    let metrics_ref = Arc::clone(&node_metrics);
    let settle_loop = tokio::spawn(async move {
        let mut interval =
            tokio::time::interval(std::time::Duration::from_secs(args.settle_interval.max(1)));
        loop {
            interval.tick().await;
            let mut engine = engine_ref.write().await;
            let mut pool = pool_ref.write().await;
            match engine.satisfy_withdrawals(&mut *pool, Utc::now()) {
                Ok(report) => {
                    if !report.payments.is_empty() {
                        tracing::info!(
                            payments = report.payments.len(),
                            remaining = report.remaining,
                            "background settlement pass"
                        );
                    }
                    metrics_ref
                        .settlement_payments_total
                        .inc_by(report.payments.len() as u64);
                    metrics_ref
                        .pending_withdrawals
                        .set(engine.state().buffer.pending_count() as i64);
                    metrics_ref
                        .growing_ratio
                        .set(engine.growing_ratio() as f64 / 1e18);
                }
                Err(e) => tracing::error!("settlement pass failed: {}", e),
            }
        }
    });

    // --- Serve ---
    tokio::select! {
        res = axum::serve(api_listener, api_router) => {
            if let Err(e) = res {
                tracing::error!("API server error: {}", e);
            }
        }
        res = axum::serve(metrics_listener, metrics_router) => {
            if let Err(e) = res {
                tracing::error!("Metrics server error: {}", e);
            }
        }
        _ = shutdown_signal() => {
            tracing::info!("shutdown signal received, draining connections");
        }
    }

    settle_loop.abort();

    // --- Snapshot on the way out ---
    save_engine(&args, &*engine.read().await)?;
    tracing::info!("swell-node stopped");
    Ok(())
}

/// Loads the engine snapshot if one exists, otherwise creates a fresh
/// ledger with the genesis asset set.
fn load_or_create_engine(args: &cli::RunArgs) -> Result<LiquidityEngine> {
    if args.state_file.exists() {
        let bytes = std::fs::read(&args.state_file).with_context(|| {
            format!("failed to read state file {}", args.state_file.display())
        })?;
        let engine: LiquidityEngine = serde_json::from_slice(&bytes).with_context(|| {
            format!("failed to parse state file {}", args.state_file.display())
        })?;
        tracing::info!(
            total_supply = %engine.total_supply(),
            "engine state loaded from snapshot"
        );
        return Ok(engine);
    }

    let now = Utc::now();
    let mut contracts = ContractRegistry::new();
    contracts.register(args.wallet.clone());
    let mut engine = LiquidityEngine::new(args.wallet.clone(), contracts, now)
        .context("failed to create engine")?;

    for (symbol, decimals) in GENESIS_ASSETS {
        engine
            .execute(
                &args.wallet,
                Command::RegisterAsset {
                    asset: AssetId::from(symbol),
                    decimals,
                    enabled: true,
                },
                now,
            )
            .with_context(|| format!("failed to register genesis asset {}", symbol))?;
    }

    tracing::info!(wallet = %args.wallet, "fresh ledger created");
    Ok(engine)
}

/// Writes the engine state snapshot to disk.
fn save_engine(args: &cli::RunArgs, engine: &LiquidityEngine) -> Result<()> {
    let json = serde_json::to_vec_pretty(engine).context("failed to serialize engine state")?;
    std::fs::write(&args.state_file, json).with_context(|| {
        format!("failed to write state file {}", args.state_file.display())
    })?;
    tracing::info!(path = %args.state_file.display(), "engine state saved");
    Ok(())
}

/// Queries a running node's status endpoint and prints the result.
async fn query_status(args: cli::StatusArgs) -> Result<()> {
    let url = format!("{}/status", args.rpc_url.trim_end_matches('/'));
    let body: String = http_get(&url).await?;
    println!("{}", body);
    Ok(())
}

/// Minimal HTTP GET without pulling in a client crate.
/// In a real deployment, swap this for a proper HTTP client.
async fn http_get(url: &str) -> Result<String> {
    let parsed: url::Url = url
        .parse()
        .map_err(|e| anyhow::anyhow!("invalid URL: {}", e))?;

    let host = parsed
        .host_str()
        .ok_or_else(|| anyhow::anyhow!("missing host in URL"))?;
    let port = parsed.port().unwrap_or(80);
    let path = parsed.path();

    let addr = format!("{}:{}", host, port);
    let mut stream = tokio::net::TcpStream::connect(&addr)
        .await
        .with_context(|| format!("failed to connect to {}", addr))?;

    let request = format!(
        "GET {} HTTP/1.1\r\nHost: {}\r\nConnection: close\r\n\r\n",
        path, host,
    );

    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    stream.write_all(request.as_bytes()).await?;
    stream.shutdown().await?;

    let mut buf = Vec::new();
    stream.read_to_end(&mut buf).await?;
    let response = String::from_utf8_lossy(&buf);

    // Strip HTTP headers — everything after the first blank line is the body.
    let body = response
        .split_once("\r\n\r\n")
        .map(|(_, b)| b.to_string())
        .unwrap_or_else(|| response.to_string());

    Ok(body)
}

/// Prints version information to stdout.
fn print_version() {
    println!("swell-node {}", env!("CARGO_PKG_VERSION"));
    println!("protocol   {}", swell_protocol::config::PROTOCOL_VERSION);
}

/// Waits for SIGINT (Ctrl+C) or SIGTERM, whichever comes first.
///
/// On non-Unix platforms, only Ctrl+C is supported.
async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {}
        _ = terminate => {}
    }
}

/// Minimal URL parser — just enough to extract host/port/path.
/// Avoids pulling in the `url` crate for a single use.
mod url {
    pub struct Url {
        host: String,
        port: Option<u16>,
        path: String,
    }

    impl Url {
        pub fn host_str(&self) -> Option<&str> {
            Some(&self.host)
        }

        pub fn port(&self) -> Option<u16> {
            self.port
        }

        pub fn path(&self) -> &str {
            &self.path
        }
    }

    impl std::str::FromStr for Url {
        type Err = String;

        fn from_str(s: &str) -> Result<Self, Self::Err> {
            // Strip scheme.
            let rest = s
                .strip_prefix("http://")
                .or_else(|| s.strip_prefix("https://"))
                .unwrap_or(s);

            let (authority, path) = match rest.find('/') {
                Some(i) => (&rest[..i], &rest[i..]),
                None => (rest, "/"),
            };

            let (host, port) = match authority.rfind(':') {
                Some(i) => {
                    let p = authority[i + 1..]
                        .parse::<u16>()
                        .map_err(|e| format!("bad port: {}", e))?;
                    (authority[..i].to_string(), Some(p))
                }
                None => (authority.to_string(), None),
            };

            Ok(Url {
                host,
                port,
                path: path.to_string(),
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    #[test]
    fn snapshot_roundtrip_through_disk() {
        let dir = tempfile::tempdir().expect("tempdir");
        let state_file = dir.path().join("state.json");

        let args = cli::RunArgs::parse_from([
            "run",
            "--state-file",
            state_file.to_str().unwrap(),
            "--wallet",
            "swell:multisig",
        ]);

        let engine = load_or_create_engine(&args).expect("fresh engine");
        assert_eq!(engine.total_supply(), 0);
        save_engine(&args, &engine).expect("save");

        let reloaded = load_or_create_engine(&args).expect("reload");
        assert_eq!(reloaded.total_supply(), 0);
        assert_eq!(
            reloaded.state().assets.all().len(),
            GENESIS_ASSETS.len()
        );
    }
}
