use crate::decision::DecisionArtifact;
use crate::forecast::ForecastArtifact;
use std::sync::Arc;
use tokio::sync::watch;

/// Shared application state holding the currently-loaded model artifacts.
///
/// Artifacts are immutable once installed: readers clone the `Arc` handle and
/// compute against that snapshot without holding the lock. Training swaps the
/// handle wholesale, so a concurrent reader sees either the old or the new
/// artifact, never a partially-built one. Watch channels publish each swap.
#[derive(Debug)]
pub struct AppState {
    forecast: Option<Arc<ForecastArtifact>>,
    forecast_tx: watch::Sender<Option<Arc<ForecastArtifact>>>,
    decision: Option<Arc<DecisionArtifact>>,
    decision_tx: watch::Sender<Option<Arc<DecisionArtifact>>>,
}

impl AppState {
    pub fn new() -> Self {
        let (forecast_tx, _forecast_rx) = watch::channel(None);
        let (decision_tx, _decision_rx) = watch::channel(None);
        Self {
            forecast: None,
            forecast_tx,
            decision: None,
            decision_tx,
        }
    }

    pub fn forecast(&self) -> Option<&Arc<ForecastArtifact>> {
        self.forecast.as_ref()
    }

    pub fn subscribe_forecast(&self) -> watch::Receiver<Option<Arc<ForecastArtifact>>> {
        self.forecast_tx.subscribe()
    }

    pub fn set_forecast(&mut self, artifact: Arc<ForecastArtifact>) {
        self.forecast = Some(Arc::clone(&artifact));
        self.forecast_tx.send_replace(Some(artifact));
    }

    pub fn decision(&self) -> Option<&Arc<DecisionArtifact>> {
        self.decision.as_ref()
    }

    pub fn subscribe_decision(&self) -> watch::Receiver<Option<Arc<DecisionArtifact>>> {
        self.decision_tx.subscribe()
    }

    pub fn set_decision(&mut self, artifact: Arc<DecisionArtifact>) {
        self.decision = Some(Arc::clone(&artifact));
        self.decision_tx.send_replace(Some(artifact));
    }
}

impl Default for AppState {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::decision::tree::TreeConfig;
    use crate::labeler;
    use crate::observation::Observation;
    use time::macros::datetime;
    use time::Duration;

    fn decision_artifact() -> DecisionArtifact {
        let observations: Vec<Observation> = (0..48)
            .map(|i| Observation {
                timestamp: datetime!(2017-04-01 00:00:00) + Duration::hours(i),
                temperature: 20.0 + f64::from((i % 24) as u8),
                humidity: 50.0 + f64::from((i % 10) as u8),
                wind_speed: 1.0,
            })
            .collect();
        let dataset = labeler::label_history(&observations).expect("labeling");
        crate::decision::train(&dataset, &TreeConfig::default()).expect("train")
    }

    #[test]
    fn state_starts_with_no_artifacts() {
        let state = AppState::new();
        assert!(state.forecast().is_none());
        assert!(state.decision().is_none());
    }

    #[test]
    fn set_decision_updates_state_and_watch() {
        let mut state = AppState::new();
        let receiver = state.subscribe_decision();
        let artifact = Arc::new(decision_artifact());

        state.set_decision(Arc::clone(&artifact));

        assert!(state.decision().is_some());
        let seen = receiver.borrow();
        assert!(seen.as_ref().is_some_and(|a| Arc::ptr_eq(a, &artifact)));
    }

    #[test]
    fn swapping_replaces_the_whole_handle() {
        let mut state = AppState::new();
        let first = Arc::new(decision_artifact());
        let second = Arc::new(decision_artifact());

        state.set_decision(Arc::clone(&first));
        let snapshot = state.decision().cloned().expect("snapshot");
        state.set_decision(Arc::clone(&second));

        // The reader's snapshot still points at the old artifact.
        assert!(Arc::ptr_eq(&snapshot, &first));
        assert!(state
            .decision()
            .is_some_and(|current| Arc::ptr_eq(current, &second)));
    }

    #[test]
    fn set_without_subscribers_does_not_fail() {
        let mut state = AppState::new();
        state.set_decision(Arc::new(decision_artifact()));
        assert!(state.decision().is_some());
    }
}
