use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{ArgAction, Parser};
use resilient_energy_grid::{config, simulation, telemetry};
use config::Config;
use serde::Serialize;
use simulation::{ScenarioReport, SimulationRunner};
use tracing::info;

#[derive(Debug, Parser)]
#[command(
    author,
    version,
    about = "Run disaster-resilient energy orchestration scenarios",
    long_about = None
)]
struct Cli {
    /// Scenario file names (without .json) to execute
    #[arg(default_values_t = [String::from("sample_transnational_event")])]
    scenarios: Vec<String>,

    /// Directory containing scenario JSON files
    #[arg(long, env = "GRID_DATA_ROOT")]
    data_root: Option<PathBuf>,

    /// Extra TOML configuration layered over config/default.toml
    #[arg(long)]
    config: Option<PathBuf>,

    /// Print the effective optimization parameters and exit
    #[arg(long, action = ArgAction::SetTrue)]
    print_params: bool,

    /// Print the effective layered configuration as TOML and exit
    #[arg(long, action = ArgAction::SetTrue)]
    print_config: bool,

    /// Single-line JSON output
    #[arg(long, action = ArgAction::SetTrue)]
    compact: bool,
}

fn render<T: Serialize>(value: &T, compact: bool) -> Result<String> {
    let out = if compact {
        serde_json::to_string(value)?
    } else {
        serde_json::to_string_pretty(value)?
    };
    Ok(out)
}

#[tokio::main]
async fn main() -> Result<()> {
    telemetry::init_tracing();
    let cli = Cli::parse();

    let mut cfg = Config::load(cli.config.as_deref()).context("failed to load configuration")?;
    if let Some(root) = cli.data_root {
        cfg.simulation.data_root = root;
    }

    if cli.print_config {
        print!("{}", cfg.to_toml().context("failed to render configuration")?);
        return Ok(());
    }

    if cli.print_params {
        println!("{}", render(&cfg.optimization.to_map(), cli.compact)?);
        return Ok(());
    }

    let runner = SimulationRunner::from_config(&cfg)?;
    info!(
        scenarios = cli.scenarios.len(),
        data_root = %cfg.simulation.data_root.display(),
        "running scenarios"
    );

    let results = runner.run_many(&cli.scenarios).await?;
    let reports: Vec<ScenarioReport<'_>> = results.iter().map(ScenarioReport::from).collect();
    let out = match reports.as_slice() {
        [single] => render(single, cli.compact)?,
        many => render(&many, cli.compact)?,
    };
    println!("{out}");
    Ok(())
}
