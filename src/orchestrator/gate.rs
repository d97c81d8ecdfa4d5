use std::collections::HashMap;

use tracing::info;

use crate::domain::EnergyDispatchPlan;

/// Confidence assumed for a region with no forecast in the cycle
pub const UNTRACKED_CONFIDENCE: f64 = 1.0;

/// Drop dispatches whose weaker endpoint confidence is below `threshold`.
///
/// Suppressed transfers are returned to the target's unserved deficit so the
/// plan keeps reporting what was actually left uncovered.
pub fn apply_confidence_gate(
    plan: EnergyDispatchPlan,
    confidence: &HashMap<String, f64>,
    threshold: f64,
) -> EnergyDispatchPlan {
    let lookup = |region: &str| confidence.get(region).copied().unwrap_or(UNTRACKED_CONFIDENCE);

    let EnergyDispatchPlan {
        dispatches,
        mut unserved_deficits,
    } = plan;

    let mut kept = Vec::with_capacity(dispatches.len());
    for dispatch in dispatches {
        let combined = lookup(&dispatch.source).min(lookup(&dispatch.target));
        if combined < threshold {
            info!(
                from = %dispatch.source,
                to = %dispatch.target,
                transfer_mw = dispatch.transfer_mw,
                confidence = combined,
                threshold,
                "dispatch suppressed by confidence gate"
            );
            *unserved_deficits.entry(dispatch.target).or_insert(0.0) += dispatch.transfer_mw;
            continue;
        }
        kept.push(dispatch);
    }

    EnergyDispatchPlan {
        dispatches: kept,
        unserved_deficits,
    }
}
