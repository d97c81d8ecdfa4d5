use std::path::{Path, PathBuf};

use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};

use crate::domain::{RegionConfig, RegionRegistry};
use crate::error::{GridError, Result};
use crate::forecast::ForecastSettings;
use crate::optimizer::OptimizationParameters;
use crate::orchestrator::OrchestratorSettings;
use crate::simulation::default_region_configs;

const DEFAULT_CONFIG_FILE: &str = "config/default.toml";
const ENV_PREFIX: &str = "GRID__";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub optimization: OptimizationParameters,
    pub forecast: ForecastSettings,
    pub orchestrator: OrchestratorSettings,
    pub simulation: SimulationConfig,
    /// Empty means the built-in Japan/Korea/EU network
    pub regions: Vec<RegionConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulationConfig {
    pub data_root: PathBuf,
    pub load_attempts: u32,
    pub retry_backoff_ms: u64,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            data_root: PathBuf::from("data"),
            load_attempts: 3,
            retry_backoff_ms: 100,
        }
    }
}

impl Config {
    /// Defaults, then `config/default.toml`, then `extra` if given, then `GRID__*` env vars.
    pub fn load(extra: Option<&Path>) -> Result<Self> {
        let mut figment = Figment::from(Serialized::defaults(Config::default()))
            .merge(Toml::file(DEFAULT_CONFIG_FILE));
        if let Some(path) = extra {
            figment = figment.merge(Toml::file(path));
        }
        let cfg: Config = figment.merge(Env::prefixed(ENV_PREFIX).split("__")).extract()?;
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn validate(&self) -> Result<()> {
        self.optimization.validate()?;
        self.forecast.validate()?;
        self.orchestrator.validate()?;
        if self.simulation.load_attempts == 0 {
            return Err(GridError::invalid("load_attempts", 0.0, "must be >= 1"));
        }
        Ok(())
    }

    /// Effective configuration rendered back to TOML.
    pub fn to_toml(&self) -> std::result::Result<String, toml::ser::Error> {
        toml::to_string_pretty(self)
    }

    pub fn region_registry(&self) -> Result<RegionRegistry> {
        if self.regions.is_empty() {
            RegionRegistry::new(default_region_configs())
        } else {
            RegionRegistry::new(self.regions.clone())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use figment::Jail;

    #[test]
    fn test_defaults_without_files() {
        Jail::expect_with(|_jail| {
            let cfg = Config::load(None).expect("defaults load");
            assert_eq!(cfg.optimization, OptimizationParameters::default());
            assert_eq!(cfg.forecast.history_size, 4);
            assert_eq!(cfg.simulation.data_root, PathBuf::from("data"));
            assert_eq!(cfg.region_registry().expect("registry").len(), 3);
            Ok(())
        });
    }

    #[test]
    fn test_file_and_env_layering() {
        Jail::expect_with(|jail| {
            jail.create_file(
                "site.toml",
                r#"
                [optimization]
                ramp_limit_mw = 500.0

                [[regions]]
                name = "North"
                base_demand_mw = 10.0
                base_generation_mw = 20.0
                storage_capacity_mwh = 5.0

                [[regions.grid_connections]]
                target_region = "South"
                capacity_mw = 3.0

                [[regions]]
                name = "South"
                base_demand_mw = 30.0
                base_generation_mw = 10.0
                storage_capacity_mwh = 0.0
                "#,
            )?;
            jail.set_env("GRID__OPTIMIZATION__AI_CONFIDENCE_THRESHOLD", "0.7");

            let cfg = Config::load(Some(Path::new("site.toml"))).expect("layered load");
            assert_eq!(cfg.optimization.ramp_limit_mw, 500.0);
            assert_eq!(cfg.optimization.ai_confidence_threshold, 0.7);
            assert_eq!(cfg.optimization.max_transfer_fraction, 0.6);

            let registry = cfg.region_registry().expect("registry");
            assert_eq!(registry.names().collect::<Vec<_>>(), vec!["North", "South"]);
            let north = registry.get("North").expect("north");
            assert_eq!(north.grid_connections[0].loss_factor, 0.05);
            assert_eq!(north.storage_efficiency, 0.9);
            Ok(())
        });
    }

    #[test]
    fn test_rendered_toml_reloads() {
        Jail::expect_with(|jail| {
            let mut cfg = Config::default();
            cfg.optimization.ramp_limit_mw = 350.0;
            cfg.regions = default_region_configs();
            jail.create_file("dump.toml", &cfg.to_toml().expect("render"))?;

            let reloaded = Config::load(Some(Path::new("dump.toml"))).expect("reload");
            assert_eq!(reloaded.optimization.ramp_limit_mw, 350.0);
            assert_eq!(reloaded.regions.len(), 3);
            assert_eq!(reloaded.regions[0].name, cfg.regions[0].name);
            Ok(())
        });
    }

    #[test]
    fn test_invalid_values_rejected() {
        Jail::expect_with(|jail| {
            jail.set_env("GRID__ORCHESTRATOR__STORAGE_DISCHARGE_FRACTION", "3");
            assert!(Config::load(None).is_err());
            Ok(())
        });
    }
}
