use std::cmp::Reverse;
use std::collections::HashMap;

use itertools::Itertools;
use ordered_float::OrderedFloat;
use tracing::{debug, warn};

use super::{Allocator, OptimizationParameters, RegionBalance};
use crate::domain::{EnergyDispatch, EnergyDispatchPlan, IncomingConnections};

/// Deficits smaller than this are treated as covered
const DEFICIT_EPSILON_MW: f64 = 1e-9;

/// Deterministic greedy allocator:
/// - Largest deficit is served first
/// - Each deficit region draws from its incoming connections in declaration order
/// - Every transfer is capped by surplus, source share, remaining deficit, ramp limit and link capacity
///
/// Fast and explainable, not globally optimal.
#[derive(Debug, Clone, Default)]
pub struct GreedyAllocator {
    pub params: OptimizationParameters,
}

impl GreedyAllocator {
    pub fn new(params: OptimizationParameters) -> Self {
        Self { params }
    }

    /// Deficit regions, largest first; ties keep input order.
    fn deficit_order(balances: &[RegionBalance]) -> Vec<(&str, f64)> {
        balances
            .iter()
            .map(|b| (b.region.as_str(), b.deficit()))
            .filter(|(_, deficit)| *deficit > 0.0)
            .sorted_by_key(|(_, deficit)| Reverse(OrderedFloat(*deficit)))
            .collect()
    }
}

impl Allocator for GreedyAllocator {
    fn allocate(&self, balances: &[RegionBalance], incoming: &IncomingConnections) -> EnergyDispatchPlan {
        let supply: HashMap<&str, f64> = balances
            .iter()
            .map(|b| (b.region.as_str(), b.supply_mw))
            .collect();
        // Running ledger, consumed as transfers are allocated
        let mut surplus: HashMap<&str, f64> = balances
            .iter()
            .map(|b| {
                (
                    b.region.as_str(),
                    b.exportable_surplus(self.params.reserve_margin_fraction),
                )
            })
            .collect();

        let mut plan = EnergyDispatchPlan::default();

        for (target, mut deficit) in Self::deficit_order(balances) {
            for connection in incoming.get(target).map(Vec::as_slice).unwrap_or_default() {
                let source = connection.target_region.as_str();
                let available = surplus.get(source).copied().unwrap_or(0.0);
                if available <= 0.0 {
                    continue;
                }

                let source_share =
                    self.params.max_transfer_fraction * supply.get(source).copied().unwrap_or(0.0);
                let max_transfer = available
                    .min(source_share)
                    .min(deficit)
                    .min(self.params.ramp_limit_mw)
                    .min(connection.capacity_mw);
                if max_transfer <= 0.0 {
                    continue;
                }

                let effective = max_transfer * (1.0 - connection.loss_factor);
                let loss = max_transfer - effective;
                debug!(
                    from = source,
                    to = target,
                    transfer_mw = effective,
                    loss_mw = loss,
                    "dispatch allocated"
                );
                plan.dispatches.push(EnergyDispatch {
                    source: source.to_string(),
                    target: target.to_string(),
                    transfer_mw: effective,
                    loss_mw: loss,
                });

                // Source spends gross power, the target receives net
                surplus.insert(source, (available - max_transfer).max(0.0));
                deficit = (deficit - effective).max(0.0);
                if deficit <= 0.0 {
                    break;
                }
            }

            if deficit > DEFICIT_EPSILON_MW {
                warn!(region = target, unserved_mw = deficit, "deficit left unserved");
                plan.unserved_deficits.insert(target.to_string(), deficit);
            }
        }

        plan
    }

    fn parameters(&self) -> &OptimizationParameters {
        &self.params
    }

    fn name(&self) -> &'static str {
        "greedy-v1"
    }
}
