//! # Umbra Sim
//!
//! Headless encounter runner for the Umbra decision core.
//!
//! Loads an encounter file, spawns its units into an in-memory arena, walks a
//! scripted player through it and prints a summary of what happened.
//!
//! ```text
//! umbra-sim [ENCOUNTER.toml] [--json]
//! ```
//!
//! Set `UMBRA_LOG_FORMAT=json` for JSON log lines; `RUST_LOG` filters as usual.

#![warn(missing_docs)]
#![warn(clippy::all)]
#![deny(clippy::unwrap_used)]

mod arena;
mod encounter;
mod sim;

use std::path::PathBuf;

use anyhow::Result;
use tracing::info;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use crate::encounter::Encounter;
use crate::sim::{RunReport, Simulation};

const DEFAULT_ENCOUNTER: &str = concat!(
    env!("CARGO_MANIFEST_DIR"),
    "/assets/encounters/crypt.toml"
);

/// Main entry point.
fn main() -> Result<()> {
    let json_logs = std::env::var("UMBRA_LOG_FORMAT").is_ok_and(|format| format == "json");
    tracing_subscriber::registry()
        .with(json_logs.then(|| fmt::layer().json()))
        .with((!json_logs).then(|| fmt::layer()))
        .with(EnvFilter::from_default_env().add_directive("umbra=info".parse()?))
        .init();

    info!("Umbra sim starting...");
    info!("Version: {}", env!("CARGO_PKG_VERSION"));

    let mut path = PathBuf::from(DEFAULT_ENCOUNTER);
    let mut json_report = false;
    for arg in std::env::args().skip(1) {
        match arg.as_str() {
            "--json" => json_report = true,
            other => path = PathBuf::from(other),
        }
    }

    let (encounter, units) = Encounter::load(&path)?;
    let report = Simulation::new(encounter, units)?.run();

    if json_report {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        print_summary(&report);
    }

    info!("Umbra sim shutdown complete");
    Ok(())
}

fn print_summary(report: &RunReport) {
    println!(
        "{}: {:.1}s over {} ticks, player at {:.0} hp after {} death(s){}",
        report.encounter,
        report.elapsed,
        report.ticks,
        report.player_health,
        report.player_deaths,
        if report.cleared { ", cleared" } else { "" }
    );
    for unit in &report.units {
        println!(
            "  {:<8} {:<10} hp {:>6.1}  phase {}  {:<14} faults {}",
            unit.id.to_string(),
            unit.name,
            unit.health,
            unit.phase,
            unit.state,
            unit.faults
        );
    }
    for (kind, count) in &report.events {
        println!("  {kind:<26} {count}");
    }
    println!(
        "  projectiles {}/{} hit, {} attack windows, {} loot drops, {:.0} damage taken",
        report.arena.projectile_hits,
        report.arena.projectiles_fired,
        report.arena.hitboxes_opened,
        report.arena.loot.len(),
        report.arena.player_damage_taken
    );
}
