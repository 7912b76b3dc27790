#![deny(warnings)]

//! On-demand launch projection: reads one request, prints the grid as JSON.

mod config;

use anyhow::{bail, Context, Result};
use config::AppConfig;
use launch_core::LaunchParameters;
use persistence::SqliteHistory;
use price_oracle::{CachedPriceOracle, ListingTable};
use projection::{decode_request, ErrorKind, Grid, ProjectionEngine, ProjectionError};
use std::io::Read;
use std::path::PathBuf;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

struct Args {
    config: PathBuf,
    request: Option<PathBuf>,
    version: bool,
}

fn parse_args() -> Result<Args> {
    let mut args = Args {
        config: PathBuf::from("launch.yaml"),
        request: None,
        version: false,
    };
    let mut it = std::env::args().skip(1);
    while let Some(arg) = it.next() {
        match arg.as_str() {
            "--config" => match it.next() {
                Some(path) => args.config = PathBuf::from(path),
                None => bail!("--config needs a path"),
            },
            "--request" => match it.next() {
                Some(path) => args.request = Some(PathBuf::from(path)),
                None => bail!("--request needs a path"),
            },
            "--version" => args.version = true,
            other => bail!("unknown argument: {other}"),
        }
    }
    Ok(args)
}

fn read_request(path: Option<&PathBuf>) -> Result<String> {
    match path {
        Some(p) => std::fs::read_to_string(p).with_context(|| format!("reading {}", p.display())),
        None => {
            let mut text = String::new();
            std::io::stdin()
                .read_to_string(&mut text)
                .context("reading request from stdin")?;
            Ok(text)
        }
    }
}

async fn project(cfg: &AppConfig, request: &str) -> Result<Grid, ProjectionError> {
    let params: LaunchParameters = decode_request(request)?;
    let history = SqliteHistory::connect(&cfg.database_url).await?;
    run_request(history, cfg, &params).await
}

/// Compute one report against an open store, closing the pool whatever the
/// outcome.
async fn run_request(
    history: SqliteHistory,
    cfg: &AppConfig,
    params: &LaunchParameters,
) -> Result<Grid, ProjectionError> {
    let oracle = CachedPriceOracle::new(
        ListingTable::new(cfg.oracle.listings.clone()),
        cfg.oracle.settings.clone(),
    );
    let result = ProjectionEngine::new(&history, &oracle)
        .with_config(cfg.engine_config())
        .compute(params)
        .await;
    history.pool().close().await;
    result.map(|projection| projection.grid)
}

fn exit_code(kind: ErrorKind) -> i32 {
    match kind {
        ErrorKind::BadInput => 2,
        ErrorKind::Internal => 1,
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // Logs go to stderr; stdout carries only the result document.
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let args = parse_args()?;
    if args.version {
        println!(
            "launch-forecast {} ({} built {})",
            env!("CARGO_PKG_VERSION"),
            env!("GIT_SHA"),
            env!("BUILD_DATE")
        );
        return Ok(());
    }
    let cfg = AppConfig::load(&args.config)?;
    info!(config = %args.config.display(), database = %cfg.database_url, "starting projection");
    let request = read_request(args.request.as_ref())?;

    match project(&cfg, &request).await {
        Ok(grid) => {
            println!("{}", serde_json::to_string(&grid)?);
            Ok(())
        }
        Err(err) => {
            error!(kind = ?err.kind(), "{err}");
            let body = serde_json::json!({ "error": err.body() });
            println!("{body}");
            std::process::exit(exit_code(err.kind()));
        }
    }
}
