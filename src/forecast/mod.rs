pub mod demand;
pub mod history;
pub mod supply;

pub use demand::*;
pub use history::*;
pub use supply::*;

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::error::{ensure_non_negative, GridError, Result};

/// Tuning for both forecasters.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ForecastSettings {
    /// Observations kept per region
    pub history_size: usize,
    /// Demand inflation and confidence loss per unit of severity
    pub disaster_penalty: f64,
    /// Generation loss per unit of infrastructure impact
    pub impact_penalty: f64,
}

impl Default for ForecastSettings {
    fn default() -> Self {
        Self {
            history_size: 4,
            disaster_penalty: 0.15,
            impact_penalty: 0.2,
        }
    }
}

impl ForecastSettings {
    pub fn validate(&self) -> Result<()> {
        if self.history_size == 0 {
            return Err(GridError::invalid("history_size", 0.0, "must be >= 1"));
        }
        ensure_non_negative("disaster_penalty", self.disaster_penalty)?;
        ensure_non_negative("impact_penalty", self.impact_penalty)
    }

    /// Forecasters backed by fresh, independent rolling histories.
    pub fn build(&self) -> (DemandForecaster, SupplyForecaster) {
        let demand_history: Arc<dyn HistoryStore> = Arc::new(RollingHistory::new(self.history_size));
        let supply_history: Arc<dyn HistoryStore> = Arc::new(RollingHistory::new(self.history_size));
        (
            DemandForecaster::new(demand_history, self.disaster_penalty),
            SupplyForecaster::new(supply_history, self.impact_penalty),
        )
    }
}
