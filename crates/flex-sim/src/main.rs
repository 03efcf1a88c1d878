//! flex-sim: replay a payout scenario and print per-epoch reward reports.
//!
//! ```text
//! flex-sim <scenario.toml> [config.toml]
//! ```
//!
//! The config path may also be given through `FLEX_SIM_CONFIG`. The JSON
//! report goes to stdout; logs go to stderr and honor `RUST_LOG`.

mod config;
mod scenario;
mod sim;

use std::path::PathBuf;

use anyhow::Context;
use tracing::info;

use crate::config::SimConfig;
use crate::scenario::Scenario;
use crate::sim::Simulation;

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env().add_directive("flex=info".parse()?),
        )
        .with_writer(std::io::stderr)
        .init();

    let mut args = std::env::args().skip(1);
    let scenario_path = args
        .next()
        .map(PathBuf::from)
        .context("usage: flex-sim <scenario.toml> [config.toml]")?;
    let config_path = args.next().map(PathBuf::from);

    // 1. Load and validate inputs before touching any chain state
    let config = SimConfig::load(config_path.as_deref())?;
    let scenario = Scenario::load(&scenario_path)?;
    info!(steps = scenario.steps.len(), "scenario loaded");

    // 2. Deploy and replay
    let mut sim = Simulation::new(&config)?;
    sim.run(&scenario);
    info!(height = sim.chain().height(), "scenario replayed");

    // 3. Report
    let report = sim.report()?;
    let json = if config.report.pretty {
        serde_json::to_string_pretty(&report)?
    } else {
        serde_json::to_string(&report)?
    };
    println!("{json}");

    if !report.reverted.is_empty() {
        info!(count = report.reverted.len(), "some steps reverted");
    }
    Ok(())
}
