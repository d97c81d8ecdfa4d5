use std::sync::Arc;

use super::{ForecastResult, HistoryStore, RollingHistory};
use crate::domain::EnergyStatus;

/// Floor applied to supply-side confidence
pub const MIN_SUPPLY_CONFIDENCE: f64 = 0.2;

/// Projects next-cycle generation from recent history, discounted by infrastructure impact.
pub struct SupplyForecaster {
    pub impact_penalty: f64,
    history: Arc<dyn HistoryStore>,
}

impl SupplyForecaster {
    pub fn new(history: Arc<dyn HistoryStore>, impact_penalty: f64) -> Self {
        Self {
            impact_penalty,
            history,
        }
    }

    pub fn history(&self) -> &Arc<dyn HistoryStore> {
        &self.history
    }

    pub fn forecast(
        &self,
        region: &str,
        current: &EnergyStatus,
        infrastructure_impact: f64,
    ) -> ForecastResult {
        let trend = self.history.record(region, current.generation_mw);
        let adjustment = (1.0 - self.impact_penalty * infrastructure_impact).max(0.0);
        ForecastResult {
            demand_mw: 0.0,
            generation_mw: trend * adjustment,
            confidence: adjustment.max(MIN_SUPPLY_CONFIDENCE),
        }
    }
}

impl Default for SupplyForecaster {
    fn default() -> Self {
        Self::new(Arc::new(RollingHistory::default()), 0.2)
    }
}
