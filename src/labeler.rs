//! Offline constraint labeling pass.
//!
//! Turns raw weather history into constraint-compliant appliance state labels
//! for decision-model training. Baseline states come from independent
//! threshold rules; the two hard constraints are then repaired as a pure
//! function over an immutable snapshot so the priority scan is a
//! deterministic fold rather than an in-place mutation with hidden ordering.

use crate::appliance::{Appliance, ApplianceStates};
use crate::error::CoreError;
use crate::observation::Observation;
use tracing::warn;

/// Hard cap on concurrently-ON appliances, Fridge included. Because Fridge is
/// pinned ON and excluded from shedding, at most 2 of the other five survive.
pub const MAX_CONCURRENT_ON: usize = 3;

/// One labeled training row.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LabeledRow {
    pub observation: Observation,
    pub states: ApplianceStates,
}

/// Output of a labeling pass over a history slice.
#[derive(Debug, Clone, PartialEq)]
pub struct LabeledDataset {
    pub rows: Vec<LabeledRow>,
    /// Rows dropped because a sensor reading was missing or non-finite.
    pub skipped: usize,
}

/// Threshold rules producing the pre-constraint appliance states.
pub fn baseline_states(temperature: f64, humidity: f64, hour: u8) -> ApplianceStates {
    ApplianceStates::all_off()
        .with(Appliance::Ac, temperature > 28.0)
        .with(
            Appliance::Oven,
            temperature < 26.0 && (10..=20).contains(&hour),
        )
        .with(Appliance::Fan, temperature > 25.0 && humidity > 60.0)
        .with(Appliance::Light, hour >= 18 || hour <= 6)
        .with(Appliance::Tv, (18..=23).contains(&hour))
        .with(Appliance::Fridge, true)
}

/// Repairs constraint violations, returning a corrected copy.
///
/// Rule 1: AC and Oven are mutually exclusive; Oven yields.
/// Rule 2: while more than [`MAX_CONCURRENT_ON`] appliances are ON, the first
/// still-ON appliance in [`Appliance::SHED_PRIORITY`] order is turned off.
pub fn apply_constraints(states: ApplianceStates) -> ApplianceStates {
    let mut repaired = states.with(Appliance::Fridge, true);

    if repaired.is_on(Appliance::Ac) && repaired.is_on(Appliance::Oven) {
        repaired.set(Appliance::Oven, false);
    }

    while repaired.on_count() > MAX_CONCURRENT_ON {
        match Appliance::SHED_PRIORITY
            .into_iter()
            .find(|&a| repaired.is_on(a))
        {
            Some(victim) => repaired.set(victim, false),
            // Only Fridge left; the cap cannot bind further.
            None => break,
        }
    }

    repaired
}

/// Labels a single observation, or reports why it cannot be labeled.
pub fn label_observation(obs: &Observation, row: usize) -> Result<ApplianceStates, CoreError> {
    if !obs.temperature.is_finite() {
        return Err(CoreError::Labeling {
            row,
            reason: "temperature reading missing or not finite".to_string(),
        });
    }
    if !obs.humidity.is_finite() {
        return Err(CoreError::Labeling {
            row,
            reason: "humidity reading missing or not finite".to_string(),
        });
    }

    Ok(apply_constraints(baseline_states(
        obs.temperature,
        obs.humidity,
        obs.hour(),
    )))
}

/// Runs the labeling pass over a history slice.
///
/// Policy for malformed rows: skip the row, log it, and keep going; the pass
/// fails only when nothing survives. Tie-breaking inside the repair is purely
/// order-based, so the same input always yields the same dataset.
pub fn label_history(observations: &[Observation]) -> Result<LabeledDataset, CoreError> {
    let mut rows = Vec::with_capacity(observations.len());
    let mut skipped = 0usize;

    for (index, obs) in observations.iter().enumerate() {
        match label_observation(obs, index) {
            Ok(states) => rows.push(LabeledRow {
                observation: *obs,
                states,
            }),
            Err(err) => {
                warn!(row = index, error = %err, "Skipping unlabelable history row");
                skipped += 1;
            }
        }
    }

    if rows.is_empty() {
        return Err(CoreError::invalid_input(
            "history",
            "no rows could be labeled",
        ));
    }

    Ok(LabeledDataset { rows, skipped })
}
