/*
SPDX-FileCopyrightText: Copyright 2026 LG Electronics Inc.
SPDX-License-Identifier: MIT
*/

use std::path::PathBuf;
use std::process;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::{error, info, warn};

use cangen::catalog::Catalog;
use cangen::config::{self, SimulationConfig};
use cangen::engine::{self, Simulator};
use cangen::transmit::{LogTransmitter, Transmitter};

// ── CLI argument definition ───────────────────────────────────────────────────

/// CanGen synthetic CAN signal generator.
///
/// Example:
///   cangen config/base.yaml --dry-run --ticks 100
#[derive(Debug, Parser)]
#[command(
    name = "cangen",
    about = "CanGen – keyframed CAN signal generator",
    long_about = None,
)]
struct Cli {
    /// Path to the YAML base configuration (lists interfaces, DBC and wave files).
    config: PathBuf,

    /// Log frames instead of writing them to CAN sockets.
    #[arg(short = 'n', long = "dry-run", default_value_t = false)]
    dry_run: bool,

    /// Override the update period from the wave files, in milliseconds.
    #[arg(short = 'p', long = "period-ms")]
    period_ms: Option<u64>,

    /// Stop after this many ticks (runs until Ctrl-C when omitted).
    #[arg(short = 't', long = "ticks")]
    ticks: Option<u64>,
}

// ── Startup helpers ───────────────────────────────────────────────────────────

fn open_transmitter(interface: &str, dry_run: bool) -> Result<Box<dyn Transmitter>> {
    #[cfg(feature = "socketcan")]
    if !dry_run {
        let tx = cangen::transmit::SocketCanTransmitter::open(interface)
            .with_context(|| format!("Cannot open CAN interface '{interface}'"))?;
        return Ok(Box::new(tx));
    }

    #[cfg(not(feature = "socketcan"))]
    if !dry_run {
        warn!(interface, "Built without the `socketcan` feature; frames will only be logged");
    }

    Ok(Box::new(LogTransmitter::new(interface)))
}

/// Load every catalog, open every transmitter and build the simulator.
fn build_simulator(cfg: SimulationConfig, dry_run: bool) -> Result<Simulator> {
    let mut sim = Simulator::new(cfg.store);

    for iface in &cfg.interfaces {
        let catalog = Catalog::load_from_file(&iface.dbc_path)
            .with_context(|| format!("Cannot load catalog for interface '{}'", iface.name))?;
        let transmitter = open_transmitter(&iface.name, dry_run)?;
        sim.add_interface(iface.name.clone(), Arc::new(catalog), transmitter);
    }

    for (interface, e) in sim.unresolved() {
        warn!(interface = %interface, error = %e, "Configured name not in catalog; it will be skipped every tick");
    }

    Ok(sim)
}

async fn ctrl_c() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!("Cannot listen for Ctrl-C: {e}");
        std::future::pending::<()>().await;
    }
}

// ── Entry point ───────────────────────────────────────────────────────────────

#[tokio::main]
async fn main() {
    // Initialise structured logging.
    // Level is controlled by the RUST_LOG env-var (e.g. RUST_LOG=debug).
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    info!("CanGen v{} starting up...", env!("CARGO_PKG_VERSION"));

    let cli = Cli::parse();

    info!(
        config    = %cli.config.display(),
        dry_run   = cli.dry_run,
        period_ms = ?cli.period_ms,
        ticks     = ?cli.ticks,
        "Configuration"
    );

    // ── Load configuration ────────────────────────────────────────────────────
    let cfg = match config::load(&cli.config) {
        Ok(cfg) => cfg,
        Err(e) => {
            error!("Failed to load configuration: {:#}", e);
            process::exit(1);
        }
    };

    let period = match cli.period_ms {
        Some(0) => {
            error!("--period-ms must be greater than zero");
            process::exit(1);
        }
        Some(ms) => Duration::from_millis(ms),
        None => cfg.period,
    };

    for iface in &cfg.interfaces {
        info!(
            "  [{name}]  dbc={dbc}  waves={waves}",
            name = iface.name,
            dbc = iface.dbc_path.display(),
            waves = iface.wave_path.display(),
        );
    }

    let mut sim = match build_simulator(cfg, cli.dry_run) {
        Ok(sim) => sim,
        Err(e) => {
            error!("Failed to initialise interfaces: {:#}", e);
            process::exit(1);
        }
    };

    // ── Run ───────────────────────────────────────────────────────────────────
    let summary = engine::run(&mut sim, period, cli.ticks, ctrl_c()).await;

    info!(
        ticks = summary.ticks,
        frames_sent = summary.frames_sent,
        encode_failures = summary.encode_failures,
        send_failures = summary.send_failures,
        "CanGen stopped"
    );
}
