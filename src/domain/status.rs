use serde::{Deserialize, Serialize};

use super::RegionConfig;
use crate::error::{ensure_fraction, ensure_non_negative, Result};

/// One disaster affecting one region.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DisasterEvent {
    pub region: String,
    pub event_type: String,
    /// Continuous, higher is worse
    #[serde(default)]
    pub severity: f64,
    /// Fraction of generation capacity knocked out
    #[serde(default)]
    pub infrastructure_impact: f64,
    #[serde(default)]
    pub description: String,
}

impl DisasterEvent {
    /// Synthetic zero-severity event for regions without a listed event.
    pub fn none(region: impl Into<String>) -> Self {
        Self {
            region: region.into(),
            event_type: "none".to_string(),
            severity: 0.0,
            infrastructure_impact: 0.0,
            description: "Baseline operation".to_string(),
        }
    }

    pub fn validate(&self) -> Result<()> {
        ensure_non_negative("severity", self.severity)?;
        ensure_fraction("infrastructure_impact", self.infrastructure_impact)
    }
}

/// Point-in-time demand, generation and storage of one region.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EnergyStatus {
    pub demand_mw: f64,
    pub generation_mw: f64,
    pub stored_mwh: f64,
}

impl EnergyStatus {
    pub fn new(demand_mw: f64, generation_mw: f64, stored_mwh: f64) -> Self {
        Self {
            demand_mw,
            generation_mw,
            stored_mwh,
        }
    }

    /// Status synthesised from configured base values with storage half full.
    pub fn from_defaults(config: &RegionConfig) -> Self {
        Self {
            demand_mw: config.base_demand_mw,
            generation_mw: config.base_generation_mw,
            stored_mwh: config.storage_capacity_mwh / 2.0,
        }
    }

    /// Positive when there is surplus generation.
    pub fn net_balance(&self) -> f64 {
        self.generation_mw - self.demand_mw
    }

    pub fn validate(&self) -> Result<()> {
        ensure_non_negative("demand_mw", self.demand_mw)?;
        ensure_non_negative("generation_mw", self.generation_mw)?;
        ensure_non_negative("stored_mwh", self.stored_mwh)
    }
}

/// Per-cycle input bundle for a single region.
#[derive(Debug, Clone, PartialEq)]
pub struct RegionalSnapshot {
    pub config: RegionConfig,
    pub energy_status: EnergyStatus,
    pub disaster_event: DisasterEvent,
}

impl RegionalSnapshot {
    pub fn new(config: RegionConfig, energy_status: EnergyStatus, disaster_event: DisasterEvent) -> Self {
        Self {
            config,
            energy_status,
            disaster_event,
        }
    }

    pub fn region(&self) -> &str {
        &self.config.name
    }

    pub fn validate(&self) -> Result<()> {
        self.config.validate()?;
        self.energy_status.validate()?;
        self.disaster_event.validate()
    }
}
