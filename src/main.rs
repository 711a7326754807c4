//! campus-nav - walking navigation daemon for a campus map
//!
//! Follows the user's position along a walking route to a chosen building,
//! advances through the route's maneuvers and announces turns. The map view
//! is served as JSON over HTTP for whatever renders it (see `nav-tui`).
//!
//! Module structure:
//! - `domain/` - Core types (Coordinate, Building, Route, errors)
//! - `io/` - External interfaces (directions, directory, location, HTTP API)
//! - `services/` - Navigation logic (Navigator, tracker, search)
//! - `presentation/` - Pure map view projection
//! - `infra/` - Infrastructure (Config, Metrics)

use anyhow::Context;
use campus_nav::domain::{BuildingId, NavError};
use campus_nav::infra::{Config, Metrics};
use campus_nav::io::{
    announcer_from_config, load_directory_from_config, source_from_config, start_api_server,
    ApiState, LocationOptions, MapboxDirectionsClient,
};
use campus_nav::services::{create_announce_worker, Directory, NavCommand, Navigator};
use clap::Parser;
use std::sync::Arc;
use tokio::sync::{mpsc, watch};
use tracing::{error, info};
use tracing_subscriber::fmt::time::UtcTime;
use tracing_subscriber::EnvFilter;

/// Campus walking navigation daemon
#[derive(Parser, Debug)]
#[command(name = "campus-nav", version, about)]
struct Args {
    /// Path to TOML configuration file (default: $CONFIG_FILE or config/dev.toml)
    #[arg(short, long)]
    config: Option<String>,

    /// Initial search text, as carried by a shared `?search=` link
    #[arg(long)]
    search: Option<String>,

    /// Building id to navigate to on startup
    #[arg(long)]
    destination: Option<u32>,

    /// Replay positions from a JSON lines file instead of the configured source
    #[arg(long)]
    replay: Option<String>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Default: INFO, use RUST_LOG=debug for per-sample visibility
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_timer(UtcTime::rfc_3339())
        .with_target(false)
        .init();

    info!(version = %env!("CARGO_PKG_VERSION"), git_hash = %env!("GIT_HASH"), "campus_nav_starting");

    let args = Args::parse();
    let config_path = args.config.unwrap_or_else(|| Config::resolve_config_path(&[]));
    let mut config = Config::load_from_path(&config_path);
    if let Some(replay) = args.replay {
        config = config.with_replay_file(replay);
    }

    info!(
        config_file = %config.config_file(),
        site = %config.site_id(),
        directions = %config.directions_base_url(),
        profile = %config.directions_profile(),
        location_source = ?config.location_source(),
        http_port = %config.http_port(),
        "config_loaded"
    );

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let metrics = Arc::new(Metrics::new());

    // A failed directory load is shown to the user, not fatal
    let (directory, startup_error) = match load_directory_from_config(&config).await {
        Ok(directory) => (directory, None),
        Err(e) => (Directory::default(), Some(NavError::from(e))),
    };
    let directory = Arc::new(directory);

    let directions = Arc::new(
        MapboxDirectionsClient::from_config(&config).context("Failed to build directions client")?,
    );

    // Announcements run off the navigator loop
    let (announce_tx, announce_worker) =
        create_announce_worker(announcer_from_config(&config), metrics.clone(), 32);
    tokio::spawn(announce_worker.run());

    let mut navigator =
        Navigator::new(&config, directory.clone(), directions, announce_tx, metrics.clone());
    if let Some(e) = startup_error {
        navigator = navigator.with_error(e);
    }
    if let Some(search) = args.search.as_deref() {
        navigator = navigator.with_initial_search(search);
    }

    let (cmd_tx, cmd_rx) = mpsc::channel(256);
    if let Some(id) = args.destination {
        cmd_tx.send(NavCommand::Select(BuildingId(id))).await.context("Navigator unavailable")?;
    }

    // Single active subscription for the daemon's lifetime
    let (location_tx, location_rx) = mpsc::channel(256);
    let location_source = source_from_config(&config);
    let subscription = location_source.subscribe(LocationOptions::from_config(&config), location_tx);

    let http_port = config.http_port();
    if http_port > 0 {
        let state = ApiState {
            commands: cmd_tx.clone(),
            view: navigator.subscribe_view(),
            directory,
            metrics: metrics.clone(),
            site_id: Arc::new(config.site_id().to_string()),
        };
        let api_shutdown = shutdown_rx.clone();
        tokio::spawn(async move {
            if let Err(e) = start_api_server(http_port, state, api_shutdown).await {
                error!(error = %e, "api_server_error");
            }
        });
    }

    // Periodic metrics summary
    let metrics_clone = metrics.clone();
    let metrics_interval = config.metrics_interval_secs().max(1);
    let mut metrics_shutdown = shutdown_rx.clone();
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(std::time::Duration::from_secs(metrics_interval));
        interval.tick().await;
        loop {
            tokio::select! {
                _ = interval.tick() => metrics_clone.report().log(),
                _ = metrics_shutdown.changed() => break,
            }
        }
    });

    // Handle shutdown on Ctrl+C
    tokio::spawn(async move {
        tokio::signal::ctrl_c().await.ok();
        info!("shutdown_signal_received");
        let _ = shutdown_tx.send(true);
    });

    navigator.run(cmd_rx, location_rx, shutdown_rx).await;
    subscription.unsubscribe();
    drop(cmd_tx);

    info!("campus-nav shutdown complete");
    Ok(())
}
