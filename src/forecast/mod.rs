//! Hourly consumption forecasting pipeline.
//!
//! Training fits a degree-2 polynomial expansion over the shared feature
//! vector, a min-max scaler, and a Bayesian ridge regression, in that order.
//! All three are frozen into one artifact; inference replays them with the
//! parameters fixed at training time.

use crate::error::CoreError;
use crate::features::{self, DateContext, FEATURE_DIM};
use crate::history::HistoryRow;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};
use tracing::warn;

pub mod bayes;
pub mod poly;
pub mod scaler;

use bayes::{BayesianRidge, BayesianRidgeConfig};
use poly::PolynomialExpansion;
use scaler::MinMaxScaler;

/// Forecasts always cover one day, hour by hour.
pub const HORIZON_HOURS: usize = 24;

/// Upper bound on training input, so a hostile dataset cannot force an
/// unbounded polynomial expansion.
pub const MAX_TRAINING_ROWS: usize = 50_000;

/// Rows below this leave nothing meaningful for the held-out split.
pub const MIN_TRAINING_ROWS: usize = 10;

/// Seed for the shuffled 80/20 train/test split.
pub const TRAIN_SPLIT_SEED: u64 = 42;

const TEST_FRACTION: f64 = 0.2;

/// Trained forecast pipeline: expansion layout, scaler bounds, and regression
/// weights. Read-only once built; retraining replaces the whole artifact.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForecastArtifact {
    poly: PolynomialExpansion,
    scaler: MinMaxScaler,
    model: BayesianRidge,
}

/// Held-out evaluation reported by training.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ForecastDiagnostics {
    pub mse: f64,
    pub train_rows: usize,
    pub test_rows: usize,
    pub skipped_rows: usize,
}

/// One day of predictions plus the calendar context they were built with.
#[derive(Debug, Clone, PartialEq)]
pub struct DayForecast {
    pub predictions: Vec<f64>,
    pub month: u8,
    pub day: u8,
}

/// Fits the full pipeline on historical (observation, consumption) rows.
///
/// Rows with non-finite readings are skipped with a warning, mirroring the
/// labeling pass policy. The split is shuffled with a fixed seed so repeated
/// training on identical data reproduces identical artifacts.
pub fn train(rows: &[HistoryRow]) -> Result<(ForecastArtifact, ForecastDiagnostics), CoreError> {
    if rows.len() > MAX_TRAINING_ROWS {
        return Err(CoreError::invalid_input(
            "history",
            format!("at most {MAX_TRAINING_ROWS} rows are accepted for training"),
        ));
    }

    let mut feature_rows: Vec<[f64; FEATURE_DIM]> = Vec::with_capacity(rows.len());
    let mut targets: Vec<f64> = Vec::with_capacity(rows.len());
    let mut skipped = 0usize;
    for (index, row) in rows.iter().enumerate() {
        if !row.consumption.is_finite() {
            warn!(row = index, "Skipping history row with non-finite consumption");
            skipped += 1;
            continue;
        }
        match features::observation_features(&row.observation) {
            Ok(vector) => {
                feature_rows.push(vector);
                targets.push(row.consumption);
            }
            Err(err) => {
                warn!(row = index, error = %err, "Skipping unusable history row");
                skipped += 1;
            }
        }
    }

    if feature_rows.len() < MIN_TRAINING_ROWS {
        return Err(CoreError::invalid_input(
            "history",
            format!(
                "need at least {MIN_TRAINING_ROWS} usable rows, got {}",
                feature_rows.len()
            ),
        ));
    }

    let poly = PolynomialExpansion::fit(FEATURE_DIM);
    let expanded: Vec<Vec<f64>> = feature_rows
        .iter()
        .map(|row| poly.transform(row))
        .collect::<Result<_, _>>()?;

    // Seeded shuffle, then an 80/20 cut.
    let mut indices: Vec<usize> = (0..expanded.len()).collect();
    let mut rng = rand::rngs::StdRng::seed_from_u64(TRAIN_SPLIT_SEED);
    indices.shuffle(&mut rng);
    let test_len = ((indices.len() as f64) * TEST_FRACTION).ceil() as usize;
    let (test_idx, train_idx) = indices.split_at(test_len);

    let train_features: Vec<Vec<f64>> =
        train_idx.iter().map(|&i| expanded[i].clone()).collect();
    let train_targets: Vec<f64> = train_idx.iter().map(|&i| targets[i]).collect();

    let scaler = MinMaxScaler::fit(&train_features)?;
    let train_scaled: Vec<Vec<f64>> = train_features
        .iter()
        .map(|row| scaler.transform(row))
        .collect::<Result<_, _>>()?;

    let model = BayesianRidge::fit(&train_scaled, &train_targets, &BayesianRidgeConfig::default())?;

    let mut squared_error = 0.0;
    for &i in test_idx {
        let scaled = scaler.transform(&expanded[i])?;
        let predicted = model.predict_one(&scaled)?;
        squared_error += (predicted - targets[i]) * (predicted - targets[i]);
    }
    let mse = if test_idx.is_empty() {
        0.0
    } else {
        squared_error / test_idx.len() as f64
    };

    let diagnostics = ForecastDiagnostics {
        mse,
        train_rows: train_idx.len(),
        test_rows: test_idx.len(),
        skipped_rows: skipped,
    };

    Ok((
        ForecastArtifact {
            poly,
            scaler,
            model,
        },
        diagnostics,
    ))
}

impl ForecastArtifact {
    /// Predicts consumption for each hour of one day.
    ///
    /// Each weather array must hold exactly [`HORIZON_HOURS`] values; the
    /// calendar context is the caller's "now", injected rather than read from
    /// a clock.
    pub fn predict_day(
        &self,
        temperatures: &[f64],
        humidities: &[f64],
        winds: &[f64],
        ctx: &DateContext,
    ) -> Result<DayForecast, CoreError> {
        check_horizon("temperatures", temperatures)?;
        check_horizon("humidities", humidities)?;
        check_horizon("winds", winds)?;

        let mut predictions = Vec::with_capacity(HORIZON_HOURS);
        for hour in 0..HORIZON_HOURS {
            let vector = features::weather_features(
                temperatures[hour],
                humidities[hour],
                winds[hour],
                hour as u8,
                ctx,
            )?;
            let expanded = self.poly.transform(&vector)?;
            let scaled = self.scaler.transform(&expanded)?;
            predictions.push(self.model.predict_one(&scaled)?);
        }

        Ok(DayForecast {
            predictions,
            month: ctx.month,
            day: ctx.day,
        })
    }
}

fn check_horizon(field: &str, values: &[f64]) -> Result<(), CoreError> {
    if values.len() != HORIZON_HOURS {
        return Err(CoreError::invalid_input(
            field,
            format!("must contain exactly {HORIZON_HOURS} values, got {}", values.len()),
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::observation::Observation;
    use time::macros::datetime;
    use time::Duration;

    fn synthetic_history(days: usize) -> Vec<HistoryRow> {
        let start = datetime!(2017-01-01 00:00:00);
        let mut rows = Vec::new();
        for day in 0..days {
            for hour in 0..24u8 {
                let timestamp = start + Duration::days(day as i64) + Duration::hours(hour.into());
                let temperature = 18.0 + 8.0 * (f64::from(hour) / 24.0 * std::f64::consts::TAU).sin()
                    + day as f64 * 0.05;
                let humidity = 55.0 + 10.0 * (f64::from(hour) / 24.0 * std::f64::consts::TAU).cos();
                let wind_speed = 1.0 + f64::from(hour % 5) * 0.4;
                // Consumption loosely tracks temperature and the evening peak.
                let evening = if (17..=21).contains(&hour) { 60.0 } else { 0.0 };
                let consumption =
                    180.0 + 4.0 * temperature + evening + f64::from(hour % 3) * 2.5;
                rows.push(HistoryRow {
                    observation: Observation {
                        timestamp,
                        temperature,
                        humidity,
                        wind_speed,
                    },
                    consumption,
                });
            }
        }
        rows
    }

    #[test]
    fn training_reports_a_finite_mse() {
        let rows = synthetic_history(14);
        let (_, diagnostics) = train(&rows).expect("train");
        assert!(diagnostics.mse.is_finite());
        assert!(diagnostics.train_rows > diagnostics.test_rows);
        assert_eq!(
            diagnostics.train_rows + diagnostics.test_rows,
            rows.len()
        );
    }

    #[test]
    fn training_twice_yields_identical_predictions() {
        let rows = synthetic_history(10);
        let (first, _) = train(&rows).expect("train");
        let (second, _) = train(&rows).expect("train");

        let temps = vec![21.0; HORIZON_HOURS];
        let hums = vec![60.0; HORIZON_HOURS];
        let winds = vec![2.0; HORIZON_HOURS];
        let ctx = DateContext {
            month: 5,
            day: 20,
            is_weekday: true,
        };

        let a = first.predict_day(&temps, &hums, &winds, &ctx).expect("predict");
        let b = second.predict_day(&temps, &hums, &winds, &ctx).expect("predict");
        assert_eq!(a, b);
    }

    #[test]
    fn predictions_cover_every_hour() {
        let rows = synthetic_history(10);
        let (artifact, _) = train(&rows).expect("train");

        let temps: Vec<f64> = (0..24).map(|h| 18.0 + f64::from(h) * 0.2).collect();
        let hums = vec![58.0; HORIZON_HOURS];
        let winds = vec![1.5; HORIZON_HOURS];
        let ctx = DateContext {
            month: 3,
            day: 7,
            is_weekday: false,
        };

        let forecast = artifact
            .predict_day(&temps, &hums, &winds, &ctx)
            .expect("predict");
        assert_eq!(forecast.predictions.len(), HORIZON_HOURS);
        assert_eq!(forecast.month, 3);
        assert_eq!(forecast.day, 7);
        assert!(forecast.predictions.iter().all(|p| p.is_finite()));
    }

    #[test]
    fn short_arrays_are_rejected_not_padded() {
        let rows = synthetic_history(10);
        let (artifact, _) = train(&rows).expect("train");

        let short = vec![20.0; 23];
        let full = vec![60.0; HORIZON_HOURS];
        let ctx = DateContext {
            month: 1,
            day: 1,
            is_weekday: true,
        };

        let err = artifact
            .predict_day(&short, &full, &full, &ctx)
            .unwrap_err();
        assert!(matches!(
            err,
            CoreError::InvalidInput { ref field, .. } if field == "temperatures"
        ));
    }

    #[test]
    fn non_finite_request_values_are_rejected() {
        let rows = synthetic_history(10);
        let (artifact, _) = train(&rows).expect("train");

        let mut temps = vec![20.0; HORIZON_HOURS];
        temps[5] = f64::NAN;
        let full = vec![60.0; HORIZON_HOURS];
        let ctx = DateContext {
            month: 1,
            day: 1,
            is_weekday: true,
        };

        let err = artifact.predict_day(&temps, &full, &full, &ctx).unwrap_err();
        assert!(matches!(err, CoreError::InvalidInput { .. }));
    }

    #[test]
    fn skipped_rows_are_counted() {
        let mut rows = synthetic_history(10);
        rows[3].consumption = f64::NAN;
        rows[7].observation.temperature = f64::NAN;

        let (_, diagnostics) = train(&rows).expect("train");
        assert_eq!(diagnostics.skipped_rows, 2);
    }

    #[test]
    fn tiny_histories_are_rejected() {
        let rows = synthetic_history(10);
        let err = train(&rows[..5]).unwrap_err();
        assert!(matches!(
            err,
            CoreError::InvalidInput { ref field, .. } if field == "history"
        ));
    }

    #[test]
    fn artifact_survives_a_serde_round_trip() {
        let rows = synthetic_history(10);
        let (artifact, _) = train(&rows).expect("train");

        let encoded = serde_json::to_vec(&artifact).expect("encode");
        let decoded: ForecastArtifact = serde_json::from_slice(&encoded).expect("decode");
        assert_eq!(artifact, decoded);
    }
}
