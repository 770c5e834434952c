use crate::state::AppState;
use crate::users::UserStore;
use axum::routing::{get, post};
use axum::Router;
use std::sync::{Arc, RwLock};

pub mod handlers;
pub mod responses;

/// Shared handler context: model state plus the user store collaborator.
#[derive(Clone)]
pub struct ApiContext {
    pub state: Arc<RwLock<AppState>>,
    pub users: Arc<dyn UserStore>,
}

pub fn router(ctx: ApiContext) -> Router {
    Router::new()
        .route(
            "/predict_energy_consumption",
            post(handlers::post_forecast),
        )
        .route("/optimize", post(handlers::post_optimize))
        .route("/update", post(handlers::post_update_states))
        .route("/api/health", get(handlers::get_health))
        .with_state(ctx)
}
