use std::sync::Arc;

use serde::{Deserialize, Serialize};

use super::{HistoryStore, RollingHistory};
use crate::domain::EnergyStatus;

/// Floor applied to demand-side confidence
pub const MIN_DEMAND_CONFIDENCE: f64 = 0.3;

/// Output of either forecaster; the field the other forecaster owns is 0.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ForecastResult {
    pub demand_mw: f64,
    pub generation_mw: f64,
    /// Heuristic trust score in [0, 1]
    pub confidence: f64,
}

/// Projects next-cycle demand from recent history, inflated by disaster severity.
pub struct DemandForecaster {
    pub disaster_penalty: f64,
    history: Arc<dyn HistoryStore>,
}

impl DemandForecaster {
    pub fn new(history: Arc<dyn HistoryStore>, disaster_penalty: f64) -> Self {
        Self {
            disaster_penalty,
            history,
        }
    }

    pub fn history(&self) -> &Arc<dyn HistoryStore> {
        &self.history
    }

    /// Record the observed demand, then project it.
    ///
    /// Not idempotent: every call appends to the region's history.
    pub fn forecast(&self, region: &str, current: &EnergyStatus, severity: f64) -> ForecastResult {
        let trend = self.history.record(region, current.demand_mw);
        let adjustment = 1.0 + self.disaster_penalty * severity;
        ForecastResult {
            demand_mw: trend * adjustment,
            generation_mw: 0.0,
            confidence: demand_confidence(self.disaster_penalty, severity),
        }
    }
}

impl Default for DemandForecaster {
    fn default() -> Self {
        Self::new(Arc::new(RollingHistory::default()), 0.15)
    }
}

/// Linear in severity, never below [`MIN_DEMAND_CONFIDENCE`].
pub fn demand_confidence(disaster_penalty: f64, severity: f64) -> f64 {
    (1.0 - disaster_penalty * severity).max(MIN_DEMAND_CONFIDENCE)
}
