use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use futures::future::try_join_all;
use serde::{Deserialize, Serialize};
use tracing::{info, info_span, warn, Instrument};
use uuid::Uuid;

use crate::config::Config;
use crate::domain::{DisasterEvent, EnergyDispatch, EnergyStatus, RegionRegistry, RegionalSnapshot};
use crate::error::Result;
use crate::forecast::ForecastSettings;
use crate::ingestion::{RegionalDataIngestor, ScenarioFile};
use crate::optimizer::{GreedyAllocator, OptimizationParameters};
use crate::orchestrator::{EnergyOrchestrator, OrchestratorSettings};

/// Dispatch plan of one executed scenario, ready for JSON consumers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimulationResult {
    pub run_id: Uuid,
    pub generated_at: DateTime<Utc>,
    pub scenario: String,
    pub dispatches: Vec<EnergyDispatch>,
    #[serde(default)]
    pub unserved_deficits: BTreeMap<String, f64>,
}

impl SimulationResult {
    /// Dispatches as plain `source`/`target`/`transfer_mw`/`loss_mw` objects.
    pub fn dispatch_logs(&self) -> Vec<serde_json::Value> {
        self.dispatches
            .iter()
            .map(|d| {
                serde_json::json!({
                    "source": d.source,
                    "target": d.target,
                    "transfer_mw": d.transfer_mw,
                    "loss_mw": d.loss_mw,
                })
            })
            .collect()
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }

    pub fn from_json(raw: &str) -> serde_json::Result<Self> {
        serde_json::from_str(raw)
    }
}

/// What the CLI prints per scenario: the plan without run metadata.
#[derive(Debug, Serialize)]
pub struct ScenarioReport<'a> {
    pub scenario: &'a str,
    pub dispatches: &'a [EnergyDispatch],
    pub unserved_deficits: &'a BTreeMap<String, f64>,
}

impl<'a> From<&'a SimulationResult> for ScenarioReport<'a> {
    fn from(result: &'a SimulationResult) -> Self {
        Self {
            scenario: &result.scenario,
            dispatches: &result.dispatches,
            unserved_deficits: &result.unserved_deficits,
        }
    }
}

/// Runs one orchestration cycle per named scenario.
///
/// Each run builds its own orchestrator, so runners share no forecast history
/// and independent scenarios can execute concurrently.
pub struct SimulationRunner {
    ingestor: RegionalDataIngestor,
    regions: RegionRegistry,
    params: OptimizationParameters,
    forecast: ForecastSettings,
    orchestrator: OrchestratorSettings,
}

impl SimulationRunner {
    pub fn new(
        data_root: impl Into<PathBuf>,
        regions: RegionRegistry,
        params: OptimizationParameters,
    ) -> Result<Self> {
        params.validate()?;
        Ok(Self {
            ingestor: RegionalDataIngestor::new(data_root),
            regions,
            params,
            forecast: ForecastSettings::default(),
            orchestrator: OrchestratorSettings::default(),
        })
    }

    pub fn from_config(cfg: &Config) -> Result<Self> {
        cfg.validate()?;
        let ingestor = RegionalDataIngestor::new(cfg.simulation.data_root.clone()).with_retry(
            cfg.simulation.load_attempts,
            Duration::from_millis(cfg.simulation.retry_backoff_ms),
        );
        Ok(Self {
            ingestor,
            regions: cfg.region_registry()?,
            params: cfg.optimization.clone(),
            forecast: cfg.forecast.clone(),
            orchestrator: cfg.orchestrator.clone(),
        })
    }

    pub fn with_forecast_settings(mut self, forecast: ForecastSettings) -> Result<Self> {
        forecast.validate()?;
        self.forecast = forecast;
        Ok(self)
    }

    pub fn with_orchestrator_settings(mut self, orchestrator: OrchestratorSettings) -> Result<Self> {
        orchestrator.validate()?;
        self.orchestrator = orchestrator;
        Ok(self)
    }

    pub fn ingestor(&self) -> &RegionalDataIngestor {
        &self.ingestor
    }

    pub fn regions(&self) -> &RegionRegistry {
        &self.regions
    }

    /// One snapshot per configured region, in registry order.
    ///
    /// Regions missing from the baseline run on their configured defaults;
    /// regions without an event get a zero-severity one.
    pub fn initial_snapshots(&self, scenario: &ScenarioFile) -> Vec<RegionalSnapshot> {
        for name in scenario.baseline.keys() {
            if self.regions.get(name).is_none() {
                warn!(region = %name, "baseline names an unconfigured region, ignoring");
            }
        }

        self.regions
            .iter()
            .map(|config| {
                let status = scenario
                    .baseline
                    .get(&config.name)
                    .copied()
                    .unwrap_or_else(|| EnergyStatus::from_defaults(config));
                let event = scenario
                    .event_for(&config.name)
                    .cloned()
                    .unwrap_or_else(|| DisasterEvent::none(config.name.clone()));
                RegionalSnapshot::new(config.clone(), status, event)
            })
            .collect()
    }

    fn build_orchestrator(&self) -> Result<EnergyOrchestrator> {
        let (demand, supply) = self.forecast.build();
        EnergyOrchestrator::new(
            self.regions.clone(),
            Box::new(GreedyAllocator::new(self.params.clone())),
        )?
        .with_forecasters(demand, supply)
        .with_settings(self.orchestrator.clone())
    }

    pub async fn run(&self, scenario: &str) -> Result<SimulationResult> {
        let run_id = Uuid::new_v4();
        let span = info_span!("simulation", scenario, run_id = %run_id);
        async move {
            let file = self.ingestor.load_scenario(scenario).await?;
            let snapshots = self.initial_snapshots(&file);
            let orchestrator = Arc::new(self.build_orchestrator()?);
            let timeout = orchestrator.settings().cycle_timeout();
            let plan = orchestrator.run_cycle_with_timeout(snapshots, timeout).await?;

            info!(dispatches = plan.len(), "scenario complete");
            Ok(SimulationResult {
                run_id,
                generated_at: Utc::now(),
                scenario: scenario.to_string(),
                dispatches: plan.dispatches,
                unserved_deficits: plan.unserved_deficits,
            })
        }
        .instrument(span)
        .await
    }

    /// Run independent scenarios concurrently; fails on the first error.
    pub async fn run_many<S: AsRef<str>>(&self, scenarios: &[S]) -> Result<Vec<SimulationResult>> {
        try_join_all(scenarios.iter().map(|s| self.run(s.as_ref()))).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{GridConnection, RegionConfig};
    use crate::simulation::default_region_configs;
    use std::fs;
    use tempfile::tempdir;

    fn runner(root: &std::path::Path) -> SimulationRunner {
        SimulationRunner::new(
            root,
            RegionRegistry::new(default_region_configs()).unwrap(),
            OptimizationParameters::default(),
        )
        .unwrap()
    }

    #[test]
    fn test_snapshots_fill_missing_regions_with_defaults() {
        let dir = tempdir().unwrap();
        let runner = runner(dir.path());
        let scenario: ScenarioFile = serde_json::from_str(
            r#"{"events": [{"region": "Japan", "event_type": "earthquake", "severity": 0.6}],
                "baseline": {"Japan": {"demand_mw": 52000, "generation_mw": 48000, "stored_mwh": 8000}}}"#,
        )
        .unwrap();

        let snapshots = runner.initial_snapshots(&scenario);
        assert_eq!(snapshots.len(), 3);

        assert_eq!(snapshots[0].region(), "Japan");
        assert_eq!(snapshots[0].energy_status.generation_mw, 48000.0);
        assert_eq!(snapshots[0].disaster_event.event_type, "earthquake");

        assert_eq!(snapshots[1].region(), "Korea");
        assert_eq!(snapshots[1].energy_status, EnergyStatus::new(35000.0, 37000.0, 5000.0));
        assert_eq!(snapshots[1].disaster_event.event_type, "none");
    }

    #[test]
    fn test_snapshots_take_last_event_per_region() {
        let dir = tempdir().unwrap();
        let scenario: ScenarioFile = serde_json::from_str(
            r#"{"events": [
                {"region": "Korea", "event_type": "storm", "severity": 0.5},
                {"region": "Korea", "event_type": "typhoon", "severity": 2.0}
            ]}"#,
        )
        .unwrap();

        let snapshots = runner(dir.path()).initial_snapshots(&scenario);
        assert_eq!(snapshots[1].region(), "Korea");
        assert_eq!(snapshots[1].disaster_event.event_type, "typhoon");
        assert_eq!(snapshots[1].disaster_event.severity, 2.0);
    }

    #[test]
    fn test_report_round_trips_through_cli_json() {
        let result = SimulationResult {
            run_id: Uuid::new_v4(),
            generated_at: Utc::now(),
            scenario: "shortfall".to_string(),
            dispatches: vec![EnergyDispatch {
                source: "Korea".to_string(),
                target: "Japan".to_string(),
                transfer_mw: 190.0,
                loss_mw: 10.0,
            }],
            unserved_deficits: BTreeMap::from([("Japan".to_string(), 3810.0)]),
        };

        let raw = serde_json::to_string(&ScenarioReport::from(&result)).unwrap();
        let value: serde_json::Value = serde_json::from_str(&raw).unwrap();
        let keys: Vec<&str> = value.as_object().unwrap().keys().map(String::as_str).collect();
        assert_eq!(keys.len(), 3);
        for key in ["scenario", "dispatches", "unserved_deficits"] {
            assert!(keys.contains(&key), "missing {key}");
        }

        assert_eq!(value["scenario"], "shortfall");
        let dispatches: Vec<EnergyDispatch> =
            serde_json::from_value(value["dispatches"].clone()).unwrap();
        assert_eq!(dispatches, result.dispatches);
        let unserved: BTreeMap<String, f64> =
            serde_json::from_value(value["unserved_deficits"].clone()).unwrap();
        assert_eq!(unserved, result.unserved_deficits);
    }

    #[test]
    fn test_invalid_parameters_rejected() {
        let dir = tempdir().unwrap();
        let params = OptimizationParameters {
            ai_confidence_threshold: 1.2,
            ..Default::default()
        };
        let registry = RegionRegistry::new(default_region_configs()).unwrap();
        assert!(SimulationRunner::new(dir.path(), registry, params).is_err());
    }

    #[tokio::test]
    async fn test_run_serializes_plan() {
        let dir = tempdir().unwrap();
        fs::write(
            dir.path().join("shortfall.json"),
            r#"{"events": [], "baseline": {
                "Japan": {"demand_mw": 52000, "generation_mw": 48000, "stored_mwh": 0},
                "Korea": {"demand_mw": 35000, "generation_mw": 40000, "stored_mwh": 0},
                "EU": {"demand_mw": 60000, "generation_mw": 66000, "stored_mwh": 0}
            }}"#,
        )
        .unwrap();

        let result = runner(dir.path()).run("shortfall").await.unwrap();
        assert_eq!(result.scenario, "shortfall");
        assert!(!result.dispatches.is_empty());
        assert!(result.dispatches.iter().all(|d| d.target == "Japan"));

        let logs = result.dispatch_logs();
        for key in ["source", "target", "transfer_mw", "loss_mw"] {
            assert!(logs[0].get(key).is_some(), "missing {key}");
        }
    }

    #[tokio::test]
    async fn test_run_many_keeps_scenarios_apart() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("calm.json"), r#"{"events": [], "baseline": {}}"#).unwrap();
        fs::write(
            dir.path().join("blackout.json"),
            r#"{"baseline": {"A": {"demand_mw": 100, "generation_mw": 0, "stored_mwh": 0}}}"#,
        )
        .unwrap();

        let registry = RegionRegistry::new(vec![
            RegionConfig::new("A", 100.0, 100.0, 0.0),
            RegionConfig::new("B", 0.0, 500.0, 0.0).with_connection(GridConnection::new("A", 50.0, 0.0)),
        ])
        .unwrap();
        let runner =
            SimulationRunner::new(dir.path(), registry, OptimizationParameters::default()).unwrap();

        let results = runner.run_many(&["calm", "blackout"]).await.unwrap();
        assert_eq!(results[0].scenario, "calm");
        assert!(results[0].dispatches.is_empty());
        assert_eq!(results[1].scenario, "blackout");
        assert_eq!(results[1].dispatches.len(), 1);
        assert_eq!(results[1].unserved_deficits["A"], 50.0);
    }

    #[tokio::test]
    async fn test_missing_scenario_propagates() {
        let dir = tempdir().unwrap();
        assert!(runner(dir.path()).run("nope").await.is_err());
    }
}
