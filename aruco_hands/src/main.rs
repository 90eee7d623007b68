//! aruco_hands: command-line entry point.

use anyhow::{Context, Result};
use aruco_hands::{app, CancelToken, Cli};
use clap::Parser;
use tracing::{error, info, warn};

fn main() {
    let cfg = Cli::parse().into_config();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| cfg.log_filter().into()),
        )
        .with_target(false)
        .init();

    println!();
    println!("╔══════════════════════════════════════════════════════════════╗");
    println!("║        aruco_hands: hand + ArUco marker OSC streamer         ║");
    println!("╚══════════════════════════════════════════════════════════════╝");
    println!();

    if let Err(e) = run(&cfg) {
        error!("{:#}", e);
        eprintln!("Error: {:#}", e);
        std::process::exit(1);
    }
}

fn run(cfg: &aruco_hands::PipelineConfig) -> Result<()> {
    cfg.validate().context("invalid configuration")?;

    let cancel = CancelToken::new();
    let on_signal = cancel.clone();
    if let Err(err) = ctrlc::set_handler(move || on_signal.cancel()) {
        warn!("failed to install Ctrl+C handler: {err}");
    }

    info!("press Ctrl+C to stop");
    let summary = app::run(cfg, &cancel)?;
    println!();
    println!(
        "  {} frames in {:.1}s ({:.1} fps), {} markers known, {} hovers, {} OSC sent, {} dropped",
        summary.iterations,
        summary.elapsed.as_secs_f64(),
        summary.fps(),
        summary.registry_size,
        summary.interactions,
        summary.delivery.sent,
        summary.delivery.dropped,
    );
    Ok(())
}
