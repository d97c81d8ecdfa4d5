use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// One directed transfer for a cycle.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnergyDispatch {
    pub source: String,
    pub target: String,
    /// Power delivered after losses
    pub transfer_mw: f64,
    /// Power dissipated in transit
    pub loss_mw: f64,
}

impl EnergyDispatch {
    /// Gross power spent by the source.
    pub fn gross_mw(&self) -> f64 {
        self.transfer_mw + self.loss_mw
    }

    pub fn touches(&self, region: &str) -> bool {
        self.source == region || self.target == region
    }
}

/// Ordered dispatches of one cycle plus the deficits nothing could cover.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EnergyDispatchPlan {
    pub dispatches: Vec<EnergyDispatch>,
    #[serde(default)]
    pub unserved_deficits: BTreeMap<String, f64>,
}

impl EnergyDispatchPlan {
    pub fn new(dispatches: Vec<EnergyDispatch>) -> Self {
        Self {
            dispatches,
            unserved_deficits: BTreeMap::new(),
        }
    }

    pub fn total_transferred(&self) -> f64 {
        self.dispatches.iter().map(|d| d.transfer_mw).sum()
    }

    pub fn total_losses(&self) -> f64 {
        self.dispatches.iter().map(|d| d.loss_mw).sum()
    }

    pub fn total_unserved(&self) -> f64 {
        self.unserved_deficits.values().sum()
    }

    pub fn is_empty(&self) -> bool {
        self.dispatches.is_empty()
    }

    pub fn len(&self) -> usize {
        self.dispatches.len()
    }

    pub fn targeting<'a>(&'a self, region: &'a str) -> impl Iterator<Item = &'a EnergyDispatch> + 'a {
        self.dispatches.iter().filter(move |d| d.target == region)
    }

    /// Net MW received by `region` across the plan (negative when exporting).
    pub fn net_received(&self, region: &str) -> f64 {
        self.dispatches.iter().fold(0.0, |acc, d| {
            if d.target == region {
                acc + d.transfer_mw
            } else if d.source == region {
                acc - d.gross_mw()
            } else {
                acc
            }
        })
    }
}
