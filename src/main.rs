use powercast::api::{self, ApiContext};
use powercast::config;
use powercast::engine;
use powercast::history;
use powercast::observation::Observation;
use powercast::state::AppState;
use powercast::store::FileStore;
use powercast::users::{JsonFileUserStore, MemoryUserStore, UserStore};
use std::net::SocketAddr;
use std::sync::{Arc, RwLock};

fn init_tracing() {
    let subscriber = tracing_subscriber::fmt().with_target(false).finish();
    let _ = tracing::subscriber::set_global_default(subscriber);
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    init_tracing();
    tracing::info!(
        config_path = config::DEFAULT_CONFIG_PATH,
        "powercast starting"
    );
    let config = config::load_default()?;
    let state = Arc::new(RwLock::new(AppState::new()));
    let artifacts = FileStore::new(config.models_dir());

    // Install previously trained artifacts, if any.
    let (forecast_loaded, decision_loaded) =
        match engine::load_models_from_store(&state, &artifacts) {
            Ok(loaded) => {
                tracing::info!(
                    forecast = loaded.0,
                    decision = loaded.1,
                    "Artifact store checked"
                );
                loaded
            }
            Err(e) => {
                tracing::warn!(error = %e, "Failed to load saved artifacts");
                (false, false)
            }
        };

    // Train whatever is missing (or everything, when retraining is forced).
    let needs_training =
        config.train_on_start() || !forecast_loaded || !decision_loaded;
    if needs_training {
        match config.history_path() {
            Some(path) => match history::load_history(path) {
                Ok(loaded) => {
                    if loaded.skipped > 0 {
                        tracing::warn!(
                            skipped = loaded.skipped,
                            "Some history rows were dropped while loading"
                        );
                    }
                    train_missing_models(
                        &config,
                        &state,
                        &artifacts,
                        &loaded,
                        forecast_loaded,
                        decision_loaded,
                    );
                }
                Err(e) => {
                    tracing::warn!(error = %e, path = %path.display(), "Failed to load history; models left as-is");
                }
            },
            None => {
                tracing::warn!(
                    "No history path configured; missing models cannot be trained"
                );
            }
        }
    }

    let users: Arc<dyn UserStore> = match JsonFileUserStore::open(config.users_path()) {
        Ok(store) => Arc::new(store),
        Err(e) => {
            tracing::warn!(error = %e, "Failed to open user store; falling back to in-memory");
            Arc::new(MemoryUserStore::new())
        }
    };

    let ctx = ApiContext {
        state: Arc::clone(&state),
        users,
    };
    let app = api::router(ctx);
    let port = config.server_port();
    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!(%addr, "API server listening");
    axum::serve(listener, app).await?;

    Ok(())
}

fn train_missing_models(
    config: &config::Config,
    state: &Arc<RwLock<AppState>>,
    artifacts: &FileStore,
    loaded: &history::History,
    forecast_loaded: bool,
    decision_loaded: bool,
) {
    if config.train_on_start() || !forecast_loaded {
        match engine::train_forecast_model(state, artifacts, &loaded.rows) {
            Ok(diagnostics) => {
                tracing::info!(mse = diagnostics.mse, "Forecast model ready");
            }
            Err(e) => {
                tracing::error!(error = %e, "Forecast training failed");
            }
        }
    }

    if config.train_on_start() || !decision_loaded {
        let observations: Vec<Observation> = loaded.observations();
        match engine::label_and_train_decision_model(state, artifacts, &observations) {
            Ok(report) => {
                tracing::info!(
                    labeled_rows = report.labeled_rows,
                    "Decision model ready"
                );
            }
            Err(e) => {
                tracing::error!(error = %e, "Decision training failed");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use powercast::config;

    #[test]
    fn default_config_is_valid_toml() -> Result<(), Box<dyn std::error::Error>> {
        let _config = config::load_default()?;
        Ok(())
    }
}
