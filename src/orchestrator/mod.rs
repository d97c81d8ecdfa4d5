//! # Energy Orchestrator
//!
//! One cycle = forecast every region, add storage discharge, allocate over
//! the incoming-connection graph, then gate the result by forecast confidence.
//!
//! Forecasting is per-region and can fan out across tasks
//! ([`EnergyOrchestrator::run_cycle_concurrent`]); allocation always runs
//! sequentially because surplus is a shared ledger consumed in deficit order.

pub mod gate;

pub use gate::*;

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use tokio::task::JoinSet;
use tracing::{debug, info};

use crate::domain::{EnergyDispatchPlan, IncomingConnections, RegionRegistry, RegionalSnapshot};
use crate::error::{ensure_fraction, GridError, Result};
use crate::forecast::{DemandForecaster, ForecastSettings, SupplyForecaster};
use crate::optimizer::{Allocator, RegionBalance};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OrchestratorSettings {
    /// Share of stored energy dischargeable within one cycle window
    pub storage_discharge_fraction: f64,
    pub cycle_timeout_ms: u64,
}

impl Default for OrchestratorSettings {
    fn default() -> Self {
        Self {
            storage_discharge_fraction: 0.25,
            cycle_timeout_ms: 5_000,
        }
    }
}

impl OrchestratorSettings {
    pub fn validate(&self) -> Result<()> {
        ensure_fraction("storage_discharge_fraction", self.storage_discharge_fraction)?;
        if self.cycle_timeout_ms == 0 {
            return Err(GridError::invalid("cycle_timeout_ms", 0.0, "must be > 0"));
        }
        Ok(())
    }

    pub fn cycle_timeout(&self) -> Duration {
        Duration::from_millis(self.cycle_timeout_ms)
    }
}

/// Combined per-region projection feeding the allocator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegionForecast {
    pub region: String,
    pub demand_mw: f64,
    /// Forecast generation plus storage contribution
    pub supply_mw: f64,
    /// Weaker of the demand and supply confidences
    pub confidence: f64,
}

pub struct EnergyOrchestrator {
    regions: RegionRegistry,
    incoming: IncomingConnections,
    allocator: Box<dyn Allocator>,
    demand_forecaster: DemandForecaster,
    supply_forecaster: SupplyForecaster,
    settings: OrchestratorSettings,
}

impl EnergyOrchestrator {
    pub fn new(regions: RegionRegistry, allocator: Box<dyn Allocator>) -> Result<Self> {
        allocator.parameters().validate()?;
        let incoming = regions.incoming_connections();
        let (demand_forecaster, supply_forecaster) = ForecastSettings::default().build();
        Ok(Self {
            regions,
            incoming,
            allocator,
            demand_forecaster,
            supply_forecaster,
            settings: OrchestratorSettings::default(),
        })
    }

    pub fn with_forecasters(mut self, demand: DemandForecaster, supply: SupplyForecaster) -> Self {
        self.demand_forecaster = demand;
        self.supply_forecaster = supply;
        self
    }

    pub fn with_settings(mut self, settings: OrchestratorSettings) -> Result<Self> {
        settings.validate()?;
        self.settings = settings;
        Ok(self)
    }

    pub fn regions(&self) -> &RegionRegistry {
        &self.regions
    }

    pub fn incoming_connections(&self) -> &IncomingConnections {
        &self.incoming
    }

    pub fn allocator(&self) -> &dyn Allocator {
        self.allocator.as_ref()
    }

    pub fn settings(&self) -> &OrchestratorSettings {
        &self.settings
    }

    /// Forecast one region. Records an observation in both forecasters' histories.
    pub fn forecast_region(&self, snapshot: &RegionalSnapshot) -> Result<RegionForecast> {
        snapshot.validate()?;
        let region = snapshot.region();
        let status = &snapshot.energy_status;

        let demand = self
            .demand_forecaster
            .forecast(region, status, snapshot.disaster_event.severity);
        let supply = self.supply_forecaster.forecast(
            region,
            status,
            snapshot.disaster_event.infrastructure_impact,
        );

        // Cold start: an empty projection falls back to the observed value
        let mut supply_mw = if supply.generation_mw > 0.0 {
            supply.generation_mw
        } else {
            status.generation_mw
        };
        supply_mw += self.storage_contribution(snapshot);
        let demand_mw = if demand.demand_mw > 0.0 {
            demand.demand_mw
        } else {
            status.demand_mw
        };
        let confidence = demand.confidence.min(supply.confidence);

        debug!(region, demand_mw, supply_mw, confidence, "region forecast");
        Ok(RegionForecast {
            region: region.to_string(),
            demand_mw,
            supply_mw,
            confidence,
        })
    }

    /// Dischargeable storage within one cycle, after round-trip losses.
    pub fn storage_contribution(&self, snapshot: &RegionalSnapshot) -> f64 {
        let usable = snapshot
            .energy_status
            .stored_mwh
            .min(snapshot.config.storage_capacity_mwh);
        usable * snapshot.config.storage_efficiency * self.settings.storage_discharge_fraction
    }

    /// Sequential cycle over all snapshots.
    pub fn run_cycle(&self, snapshots: &[RegionalSnapshot]) -> Result<EnergyDispatchPlan> {
        let forecasts = snapshots
            .iter()
            .map(|s| self.forecast_region(s))
            .collect::<Result<Vec<_>>>()?;
        Ok(self.allocate(&forecasts))
    }

    /// Forecast regions on separate tasks, then allocate once all have finished.
    ///
    /// Snapshots of the same region share one task and are forecast in input
    /// order, so repeated regions update history exactly as [`Self::run_cycle`] does.
    pub async fn run_cycle_concurrent(
        self: Arc<Self>,
        snapshots: Vec<RegionalSnapshot>,
    ) -> Result<EnergyDispatchPlan> {
        let mut by_region: IndexMap<String, Vec<(usize, RegionalSnapshot)>> = IndexMap::new();
        for (index, snapshot) in snapshots.into_iter().enumerate() {
            by_region
                .entry(snapshot.region().to_string())
                .or_default()
                .push((index, snapshot));
        }

        let mut tasks = JoinSet::new();
        for group in by_region.into_values() {
            let orchestrator = Arc::clone(&self);
            tasks.spawn(async move {
                group
                    .into_iter()
                    .map(|(index, snapshot)| (index, orchestrator.forecast_region(&snapshot)))
                    .collect::<Vec<_>>()
            });
        }

        let mut indexed = Vec::new();
        while let Some(joined) = tasks.join_next().await {
            let group = joined.map_err(|e| GridError::TaskFailed(e.to_string()))?;
            for (index, forecast) in group {
                indexed.push((index, forecast?));
            }
        }
        // Restore snapshot order so allocation stays deterministic
        indexed.sort_by_key(|(index, _)| *index);
        let forecasts: Vec<RegionForecast> = indexed.into_iter().map(|(_, f)| f).collect();

        Ok(self.allocate(&forecasts))
    }

    /// [`Self::run_cycle_concurrent`] bounded by `timeout`.
    pub async fn run_cycle_with_timeout(
        self: Arc<Self>,
        snapshots: Vec<RegionalSnapshot>,
        timeout: Duration,
    ) -> Result<EnergyDispatchPlan> {
        let started = Instant::now();
        match tokio::time::timeout(timeout, self.run_cycle_concurrent(snapshots)).await {
            Ok(result) => result,
            Err(_) => Err(GridError::CycleTimeout {
                elapsed_ms: started.elapsed().as_millis() as u64,
            }),
        }
    }

    /// Allocate and gate a set of region forecasts.
    pub fn allocate(&self, forecasts: &[RegionForecast]) -> EnergyDispatchPlan {
        let (balances, confidence) = Self::collect_balances(forecasts);
        let raw = self.allocator.allocate(&balances, &self.incoming);
        let threshold = self.allocator.parameters().ai_confidence_threshold;
        let plan = apply_confidence_gate(raw, &confidence, threshold);

        info!(
            allocator = self.allocator.name(),
            regions = balances.len(),
            dispatches = plan.len(),
            total_transferred_mw = plan.total_transferred(),
            total_losses_mw = plan.total_losses(),
            total_unserved_mw = plan.total_unserved(),
            "orchestration cycle complete"
        );
        plan
    }

    /// A region forecast twice keeps its first position and its last values.
    fn collect_balances(forecasts: &[RegionForecast]) -> (Vec<RegionBalance>, HashMap<String, f64>) {
        let mut balances: Vec<RegionBalance> = Vec::with_capacity(forecasts.len());
        let mut positions: HashMap<&str, usize> = HashMap::with_capacity(forecasts.len());
        let mut confidence = HashMap::with_capacity(forecasts.len());

        for forecast in forecasts {
            let balance = RegionBalance::new(forecast.region.clone(), forecast.supply_mw, forecast.demand_mw);
            match positions.get(forecast.region.as_str()) {
                Some(&index) => balances[index] = balance,
                None => {
                    positions.insert(forecast.region.as_str(), balances.len());
                    balances.push(balance);
                }
            }
            confidence.insert(forecast.region.clone(), forecast.confidence);
        }
        (balances, confidence)
    }
}
