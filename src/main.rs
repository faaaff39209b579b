//! Binary entrypoint for the photo kiosk.
//!
//! Delegates all logic to the library crate; no local modules here.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{ArgAction, Parser};
use tokio_util::sync::CancellationToken;
use tracing::{Level, info};
use tracing_subscriber::{EnvFilter, fmt};

use photo_kiosk::config::Configuration;
use photo_kiosk::drive::DriveClient;
use photo_kiosk::session::Session;
use photo_kiosk::web;

/// Simple CLI
#[derive(Debug, Parser)]
#[command(name = "photo-kiosk", about = "Wedding photo-sharing kiosk")]
struct Cli {
    /// Path to YAML config file
    #[arg(short, long, value_name = "FILE", default_value = "kiosk.yaml")]
    config: PathBuf,

    /// Increase log verbosity (repeatable)
    #[arg(short = 'v', long = "verbose", action = ArgAction::Count)]
    verbose: u8,
}

fn init_tracing(verbosity: u8) -> Result<()> {
    // map -v to log level
    let level = match verbosity {
        0 => Level::INFO,
        1 => Level::DEBUG,
        _ => Level::TRACE,
    };
    let filter = EnvFilter::from_default_env()
        .add_directive(format!("photo_kiosk={}", level).parse()?)
        .add_directive("hyper=warn".parse()?)
        .add_directive("reqwest=warn".parse()?);
    fmt().with_env_filter(filter).with_target(true).init();
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose)?;

    let mut cfg = if cli.config.exists() {
        Configuration::from_yaml_file(&cli.config)?
    } else {
        info!(config = %cli.config.display(), "config file not found; using defaults");
        Configuration::default()
    };
    cfg.drive = cfg.drive.with_env_fallback();
    let cfg = cfg.validated().context("validating configuration")?;

    let drive = Arc::new(DriveClient::new(cfg.drive.clone())?);
    let cancel = CancellationToken::new();

    let (session, state) = Session::start(&cfg, drive.clone(), cancel.child_token());
    let server = web::spawn(
        drive,
        state,
        cfg.event.clone(),
        cancel.clone(),
        cfg.bind_addr,
    );

    tokio::signal::ctrl_c()
        .await
        .context("waiting for shutdown signal")?;
    info!("ctrl-c received; shutting down");
    cancel.cancel();

    session.shutdown().await;
    server.await.context("web server task failed")?;
    Ok(())
}
