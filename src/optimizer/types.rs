use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::domain::{EnergyDispatchPlan, IncomingConnections};
use crate::error::{ensure_fraction, ensure_non_negative, Result};

/// Tunable knobs of the allocation heuristic.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OptimizationParameters {
    /// Cap on one transfer as a fraction of the source's own forecast supply
    pub max_transfer_fraction: f64,
    /// Buffer, as a fraction of demand, a region keeps before exporting
    pub reserve_margin_fraction: f64,
    /// Hard cap on any single transfer (MW)
    pub ramp_limit_mw: f64,
    /// Minimum combined forecast confidence for a dispatch to survive
    pub ai_confidence_threshold: f64,
}

impl Default for OptimizationParameters {
    fn default() -> Self {
        Self {
            max_transfer_fraction: 0.6,
            reserve_margin_fraction: 0.05,
            ramp_limit_mw: 200.0,
            ai_confidence_threshold: 0.55,
        }
    }
}

impl OptimizationParameters {
    pub fn validate(&self) -> Result<()> {
        ensure_fraction("max_transfer_fraction", self.max_transfer_fraction)?;
        ensure_fraction("reserve_margin_fraction", self.reserve_margin_fraction)?;
        ensure_non_negative("ramp_limit_mw", self.ramp_limit_mw)?;
        ensure_fraction("ai_confidence_threshold", self.ai_confidence_threshold)
    }

    /// Flat name -> value export for JSON consumers.
    pub fn to_map(&self) -> BTreeMap<&'static str, f64> {
        BTreeMap::from([
            ("max_transfer_fraction", self.max_transfer_fraction),
            ("reserve_margin_fraction", self.reserve_margin_fraction),
            ("ramp_limit_mw", self.ramp_limit_mw),
            ("ai_confidence_threshold", self.ai_confidence_threshold),
        ])
    }
}

/// Forecast supply and demand of one region entering allocation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegionBalance {
    pub region: String,
    pub supply_mw: f64,
    pub demand_mw: f64,
}

impl RegionBalance {
    pub fn new(region: impl Into<String>, supply_mw: f64, demand_mw: f64) -> Self {
        Self {
            region: region.into(),
            supply_mw,
            demand_mw,
        }
    }

    /// Shortfall of supply against demand.
    pub fn deficit(&self) -> f64 {
        (self.demand_mw - self.supply_mw).max(0.0)
    }

    /// Supply left after demand plus the reserve margin.
    pub fn exportable_surplus(&self, reserve_margin_fraction: f64) -> f64 {
        (self.supply_mw - self.demand_mw * (1.0 + reserve_margin_fraction)).max(0.0)
    }
}

/// Turns regional balances and the incoming-connection graph into a dispatch plan.
///
/// Implementations must be deterministic for identical inputs.
pub trait Allocator: Send + Sync {
    fn allocate(&self, balances: &[RegionBalance], incoming: &IncomingConnections) -> EnergyDispatchPlan;

    fn parameters(&self) -> &OptimizationParameters;

    fn name(&self) -> &'static str;
}
