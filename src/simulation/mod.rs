//! # Scenario Simulation
//!
//! End-to-end execution of a named scenario: load the scenario file, build
//! one snapshot per configured region, run a single orchestration cycle and
//! hand back a serialisable dispatch plan.
//!
//! ## Usage
//!
//! ```rust,no_run
//! use resilient_energy_grid::domain::RegionRegistry;
//! use resilient_energy_grid::optimizer::OptimizationParameters;
//! use resilient_energy_grid::simulation::{default_region_configs, SimulationRunner};
//!
//! # async fn demo() -> resilient_energy_grid::error::Result<()> {
//! let registry = RegionRegistry::new(default_region_configs())?;
//! let runner = SimulationRunner::new("data", registry, OptimizationParameters::default())?;
//!
//! let result = runner.run("sample_transnational_event").await?;
//! println!("{}", serde_json::to_string_pretty(&result.dispatch_logs()).unwrap());
//! # Ok(())
//! # }
//! ```

pub mod defaults;
pub mod runner;

pub use defaults::default_region_configs;
pub use runner::{ScenarioReport, SimulationResult, SimulationRunner};
