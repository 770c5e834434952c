//! Min-max feature scaler.
//!
//! Bounds are fit once on the training split and frozen into the artifact;
//! inference reuses them unchanged, so out-of-range request values may map
//! outside [0, 1] rather than being clipped or refit.

use crate::error::CoreError;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MinMaxScaler {
    mins: Vec<f64>,
    // max - min per column; a constant column gets range 1 so it scales to 0.
    ranges: Vec<f64>,
}

impl MinMaxScaler {
    pub fn fit(rows: &[Vec<f64>]) -> Result<Self, CoreError> {
        let Some(first) = rows.first() else {
            return Err(CoreError::invalid_input(
                "features",
                "cannot fit scaler on an empty set",
            ));
        };

        let dim = first.len();
        let mut mins = vec![f64::INFINITY; dim];
        let mut maxs = vec![f64::NEG_INFINITY; dim];
        for row in rows {
            if row.len() != dim {
                return Err(CoreError::invalid_input(
                    "features",
                    "inconsistent row width while fitting scaler",
                ));
            }
            for (col, &value) in row.iter().enumerate() {
                mins[col] = mins[col].min(value);
                maxs[col] = maxs[col].max(value);
            }
        }

        let ranges = mins
            .iter()
            .zip(&maxs)
            .map(|(&min, &max)| if max > min { max - min } else { 1.0 })
            .collect();

        Ok(Self { mins, ranges })
    }

    pub fn dim(&self) -> usize {
        self.mins.len()
    }

    pub fn transform(&self, x: &[f64]) -> Result<Vec<f64>, CoreError> {
        if x.len() != self.mins.len() {
            return Err(CoreError::invalid_input(
                "features",
                format!("expected {} values, got {}", self.mins.len(), x.len()),
            ));
        }
        Ok(x.iter()
            .zip(self.mins.iter().zip(&self.ranges))
            .map(|(&value, (&min, &range))| (value - min) / range)
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn training_values_map_into_unit_interval() {
        let rows = vec![vec![0.0, 10.0], vec![5.0, 20.0], vec![10.0, 15.0]];
        let scaler = MinMaxScaler::fit(&rows).expect("fit");

        let scaled = scaler.transform(&[5.0, 10.0]).expect("transform");
        assert_eq!(scaled, vec![0.5, 0.0]);
        let scaled = scaler.transform(&[10.0, 20.0]).expect("transform");
        assert_eq!(scaled, vec![1.0, 1.0]);
    }

    #[test]
    fn constant_column_scales_to_zero() {
        let rows = vec![vec![7.0, 1.0], vec![7.0, 2.0]];
        let scaler = MinMaxScaler::fit(&rows).expect("fit");
        let scaled = scaler.transform(&[7.0, 1.5]).expect("transform");
        assert_eq!(scaled[0], 0.0);
    }

    #[test]
    fn inference_values_are_not_clipped() {
        let rows = vec![vec![0.0], vec![10.0]];
        let scaler = MinMaxScaler::fit(&rows).expect("fit");
        let scaled = scaler.transform(&[20.0]).expect("transform");
        assert_eq!(scaled, vec![2.0]);
    }

    #[test]
    fn empty_fit_set_is_rejected() {
        let err = MinMaxScaler::fit(&[]).unwrap_err();
        assert!(matches!(err, CoreError::InvalidInput { .. }));
    }
}
