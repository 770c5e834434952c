//! Appliance-state decision model.
//!
//! A multi-output classifier: one depth-capped tree per controllable
//! appliance, all trained jointly from the constraint-labeled history over
//! the reduced feature set {day, month, hour, temperature, humidity, wind}.
//! No constraint checking happens at inference time; compliance rests on the
//! training labels, and the approximation may stray on unseen inputs.

use crate::appliance::Appliance;
use crate::error::CoreError;
use crate::labeler::LabeledDataset;
use serde::{Deserialize, Serialize};

pub mod tree;

use tree::{DecisionTree, TreeConfig};

/// Width of the reduced feature tuple.
pub const DECISION_FEATURE_DIM: usize = 6;

/// One reduced feature tuple, validated before it reaches the model.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DecisionInput {
    pub day: u8,
    pub month: u8,
    pub hour: u8,
    pub temperature: f64,
    pub humidity: f64,
    pub wind_speed: f64,
}

impl DecisionInput {
    pub fn to_features(&self) -> Result<[f64; DECISION_FEATURE_DIM], CoreError> {
        if !(1..=31).contains(&self.day) {
            return Err(CoreError::invalid_input("Day", "must be in 1..=31"));
        }
        if !(1..=12).contains(&self.month) {
            return Err(CoreError::invalid_input("Month", "must be in 1..=12"));
        }
        if self.hour > 23 {
            return Err(CoreError::invalid_input("Hour", "must be in 0..=23"));
        }
        for (field, value) in [
            ("Temperature", self.temperature),
            ("Humidity", self.humidity),
            ("WindSpeed", self.wind_speed),
        ] {
            if !value.is_finite() {
                return Err(CoreError::invalid_input(field, "must be a finite number"));
            }
        }

        Ok([
            f64::from(self.day),
            f64::from(self.month),
            f64::from(self.hour),
            self.temperature,
            self.humidity,
            self.wind_speed,
        ])
    }
}

/// Trained decision model: one tree per appliance in
/// [`Appliance::CONTROLLABLE`] order. Replaced wholesale by retraining.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DecisionArtifact {
    trees: Vec<DecisionTree>,
}

/// Fits the multi-output classifier on a labeled dataset.
pub fn train(dataset: &LabeledDataset, config: &TreeConfig) -> Result<DecisionArtifact, CoreError> {
    if dataset.rows.is_empty() {
        return Err(CoreError::invalid_input(
            "labeled_dataset",
            "cannot train on an empty dataset",
        ));
    }

    let mut samples = Vec::with_capacity(dataset.rows.len());
    for row in &dataset.rows {
        let obs = &row.observation;
        let input = DecisionInput {
            day: obs.day(),
            month: obs.month(),
            hour: obs.hour(),
            temperature: obs.temperature,
            humidity: obs.humidity,
            wind_speed: obs.wind_speed,
        };
        samples.push(input.to_features()?.to_vec());
    }

    let mut trees = Vec::with_capacity(Appliance::CONTROLLABLE.len());
    for appliance in Appliance::CONTROLLABLE {
        let labels: Vec<bool> = dataset
            .rows
            .iter()
            .map(|row| row.states.is_on(appliance))
            .collect();
        trees.push(DecisionTree::fit(&samples, &labels, config)?);
    }

    Ok(DecisionArtifact { trees })
}

impl DecisionArtifact {
    /// Predicted ON/OFF states in [`Appliance::CONTROLLABLE`] order.
    pub fn predict(&self, input: &DecisionInput) -> Result<[bool; 5], CoreError> {
        let features = input.to_features()?;
        let mut states = [false; 5];
        for (slot, tree) in states.iter_mut().zip(&self.trees) {
            *slot = tree.predict(&features)?;
        }
        Ok(states)
    }
}
