//! The four public engine operations, glued to shared state and the artifact
//! store.
//!
//! Inference clones the current `Arc` handle and drops the lock before doing
//! any numeric work; training builds the replacement artifact off-lock, saves
//! it, then swaps the handle under a short write lock.

use crate::decision::tree::TreeConfig;
use crate::decision::{self, DecisionArtifact, DecisionInput};
use crate::error::CoreError;
use crate::features::DateContext;
use crate::forecast::{self, DayForecast, ForecastArtifact, ForecastDiagnostics};
use crate::history::HistoryRow;
use crate::labeler;
use crate::observation::Observation;
use crate::state::AppState;
use crate::store::{
    self, ArtifactStore, StoreError, DECISION_MODEL_KEY, FORECAST_MODEL_KEY,
};
use crate::suggest::{self, CurrentStates};
use std::sync::{Arc, RwLock};
use thiserror::Error;
use tracing::info;

#[derive(Debug, Error)]
pub enum EngineError {
    #[error(transparent)]
    Core(#[from] CoreError),
    #[error("state lock poisoned")]
    StateLock,
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Summary of a labeling + decision-training run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DecisionTrainReport {
    pub labeled_rows: usize,
    pub skipped_rows: usize,
}

fn forecast_snapshot(
    state: &Arc<RwLock<AppState>>,
) -> Result<Arc<ForecastArtifact>, EngineError> {
    let guard = state.read().map_err(|_| EngineError::StateLock)?;
    guard
        .forecast()
        .cloned()
        .ok_or_else(|| CoreError::ModelUnavailable { artifact: "forecast" }.into())
}

fn decision_snapshot(
    state: &Arc<RwLock<AppState>>,
) -> Result<Arc<DecisionArtifact>, EngineError> {
    let guard = state.read().map_err(|_| EngineError::StateLock)?;
    guard
        .decision()
        .cloned()
        .ok_or_else(|| CoreError::ModelUnavailable { artifact: "decision" }.into())
}

/// Predicts hourly consumption for one day from 24-element weather arrays and
/// the caller's calendar context.
pub fn forecast_day(
    state: &Arc<RwLock<AppState>>,
    temperatures: &[f64],
    humidities: &[f64],
    winds: &[f64],
    ctx: &DateContext,
) -> Result<DayForecast, EngineError> {
    let artifact = forecast_snapshot(state)?;
    Ok(artifact.predict_day(temperatures, humidities, winds, ctx)?)
}

/// Trains the forecast pipeline, saves the artifact, and swaps it in.
pub fn train_forecast_model(
    state: &Arc<RwLock<AppState>>,
    artifacts: &dyn ArtifactStore,
    history: &[HistoryRow],
) -> Result<ForecastDiagnostics, EngineError> {
    let (artifact, diagnostics) = forecast::train(history)?;
    store::save_json(artifacts, FORECAST_MODEL_KEY, &artifact)?;

    let mut guard = state.write().map_err(|_| EngineError::StateLock)?;
    guard.set_forecast(Arc::new(artifact));
    drop(guard);

    info!(
        mse = diagnostics.mse,
        train_rows = diagnostics.train_rows,
        test_rows = diagnostics.test_rows,
        skipped = diagnostics.skipped_rows,
        "Forecast model trained"
    );
    Ok(diagnostics)
}

/// Predicts ideal appliance states and turns the differences against the
/// caller's current states into suggestions.
pub fn optimize(
    state: &Arc<RwLock<AppState>>,
    input: &DecisionInput,
    current: &CurrentStates,
) -> Result<Vec<String>, EngineError> {
    // Bad input is rejected before the model is consulted, so a caller with a
    // malformed request sees InvalidInput even while no model is loaded.
    input.to_features()?;
    suggest::validate_current_states(current)?;

    let artifact = decision_snapshot(state)?;
    let predicted = artifact.predict(input)?;
    Ok(suggest::generate_suggestions(&predicted, current)?)
}

/// Runs the constraint labeler over raw history, trains the decision model on
/// the labels, saves the artifact, and swaps it in.
pub fn label_and_train_decision_model(
    state: &Arc<RwLock<AppState>>,
    artifacts: &dyn ArtifactStore,
    observations: &[Observation],
) -> Result<DecisionTrainReport, EngineError> {
    let dataset = labeler::label_history(observations)?;
    let artifact = decision::train(&dataset, &TreeConfig::default())?;
    store::save_json(artifacts, DECISION_MODEL_KEY, &artifact)?;

    let report = DecisionTrainReport {
        labeled_rows: dataset.rows.len(),
        skipped_rows: dataset.skipped,
    };

    let mut guard = state.write().map_err(|_| EngineError::StateLock)?;
    guard.set_decision(Arc::new(artifact));
    drop(guard);

    info!(
        labeled_rows = report.labeled_rows,
        skipped = report.skipped_rows,
        "Decision model trained"
    );
    Ok(report)
}

/// Installs any previously-saved artifacts from the store. Returns which of
/// (forecast, decision) were found.
pub fn load_models_from_store(
    state: &Arc<RwLock<AppState>>,
    artifacts: &dyn ArtifactStore,
) -> Result<(bool, bool), EngineError> {
    let forecast: Option<ForecastArtifact> = store::load_json(artifacts, FORECAST_MODEL_KEY)?;
    let decision: Option<DecisionArtifact> = store::load_json(artifacts, DECISION_MODEL_KEY)?;

    let loaded = (forecast.is_some(), decision.is_some());
    let mut guard = state.write().map_err(|_| EngineError::StateLock)?;
    if let Some(artifact) = forecast {
        guard.set_forecast(Arc::new(artifact));
    }
    if let Some(artifact) = decision {
        guard.set_decision(Arc::new(artifact));
    }
    Ok(loaded)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;
    use std::collections::BTreeMap;
    use time::macros::datetime;
    use time::Duration;

    fn history(days: usize) -> Vec<HistoryRow> {
        let start = datetime!(2017-01-01 00:00:00);
        (0..days * 24)
            .map(|i| {
                let hour = (i % 24) as u8;
                let temperature =
                    17.0 + 12.0 * (f64::from(hour) / 24.0 * std::f64::consts::TAU).sin().abs();
                HistoryRow {
                    observation: Observation {
                        timestamp: start + Duration::hours(i as i64),
                        temperature,
                        humidity: 48.0 + ((i * 11) % 35) as f64,
                        wind_speed: 0.4 + (i % 6) as f64 * 0.3,
                    },
                    consumption: 200.0 + 3.5 * temperature + (i % 4) as f64,
                }
            })
            .collect()
    }

    fn fresh_state() -> Arc<RwLock<AppState>> {
        Arc::new(RwLock::new(AppState::new()))
    }

    #[test]
    fn forecast_without_artifact_is_model_unavailable() {
        let state = fresh_state();
        let arrays = vec![20.0; 24];
        let ctx = DateContext {
            month: 6,
            day: 1,
            is_weekday: true,
        };

        let err = forecast_day(&state, &arrays, &arrays, &arrays, &ctx).unwrap_err();
        assert!(matches!(
            err,
            EngineError::Core(CoreError::ModelUnavailable { artifact: "forecast" })
        ));
    }

    #[test]
    fn training_installs_a_usable_forecast_model() {
        let state = fresh_state();
        let artifacts = MemoryStore::new();
        let rows = history(12);

        let diagnostics = train_forecast_model(&state, &artifacts, &rows).expect("train");
        assert!(diagnostics.mse.is_finite());

        let arrays = vec![21.0; 24];
        let ctx = DateContext {
            month: 1,
            day: 9,
            is_weekday: true,
        };
        let forecast = forecast_day(&state, &arrays, &arrays, &arrays, &ctx).expect("forecast");
        assert_eq!(forecast.predictions.len(), 24);
        assert_eq!((forecast.month, forecast.day), (1, 9));

        // The artifact also landed in the store.
        assert!(artifacts.load(FORECAST_MODEL_KEY).expect("load").is_some());
    }

    #[test]
    fn optimize_without_model_but_bad_input_reports_invalid_input() {
        let state = fresh_state();
        let input = DecisionInput {
            day: 0,
            month: 6,
            hour: 10,
            temperature: 20.0,
            humidity: 50.0,
            wind_speed: 1.0,
        };

        let err = optimize(&state, &input, &BTreeMap::new()).unwrap_err();
        assert!(matches!(
            err,
            EngineError::Core(CoreError::InvalidInput { ref field, .. }) if field == "Day"
        ));
    }

    #[test]
    fn optimize_without_model_and_good_input_is_model_unavailable() {
        let state = fresh_state();
        let input = DecisionInput {
            day: 5,
            month: 6,
            hour: 10,
            temperature: 20.0,
            humidity: 50.0,
            wind_speed: 1.0,
        };

        let err = optimize(&state, &input, &BTreeMap::new()).unwrap_err();
        assert!(matches!(
            err,
            EngineError::Core(CoreError::ModelUnavailable { artifact: "decision" })
        ));
    }

    #[test]
    fn label_train_optimize_round_trip() {
        let state = fresh_state();
        let artifacts = MemoryStore::new();
        let observations: Vec<Observation> =
            history(12).iter().map(|row| row.observation).collect();

        let report =
            label_and_train_decision_model(&state, &artifacts, &observations).expect("train");
        assert_eq!(report.labeled_rows, observations.len());
        assert_eq!(report.skipped_rows, 0);

        let input = DecisionInput {
            day: 6,
            month: 1,
            hour: 2,
            temperature: 18.0,
            humidity: 50.0,
            wind_speed: 1.0,
        };
        let mut current = BTreeMap::new();
        current.insert("Fridge".to_string(), 0);

        let suggestions = optimize(&state, &input, &current).expect("optimize");
        assert!(suggestions.contains(&"Turn ON Fridge".to_string()));
        assert!(artifacts.load(DECISION_MODEL_KEY).expect("load").is_some());
    }

    #[test]
    fn saved_artifacts_reload_into_fresh_state() {
        let state = fresh_state();
        let artifacts = MemoryStore::new();
        let rows = history(12);
        let observations: Vec<Observation> = rows.iter().map(|row| row.observation).collect();

        train_forecast_model(&state, &artifacts, &rows).expect("train forecast");
        label_and_train_decision_model(&state, &artifacts, &observations)
            .expect("train decision");

        let reloaded_state = fresh_state();
        let loaded = load_models_from_store(&reloaded_state, &artifacts).expect("load");
        assert_eq!(loaded, (true, true));

        let arrays = vec![19.0; 24];
        let ctx = DateContext {
            month: 2,
            day: 3,
            is_weekday: false,
        };
        let from_trained =
            forecast_day(&state, &arrays, &arrays, &arrays, &ctx).expect("forecast");
        let from_reloaded =
            forecast_day(&reloaded_state, &arrays, &arrays, &arrays, &ctx).expect("forecast");
        assert_eq!(from_trained, from_reloaded);
    }
}
