use crate::api::responses::{
    ApiErrorResponse, ForecastSuccessResponse, HealthStatus, HealthSuccessResponse,
    OptimizeSuccessResponse, UpdateSuccessResponse, UsedTime,
};
use crate::api::ApiContext;
use crate::appliance::Appliance;
use crate::decision::DecisionInput;
use crate::engine::{self, EngineError};
use crate::error::CoreError;
use crate::features::DateContext;
use crate::state::AppState;
use crate::suggest::CurrentStates;
use crate::users::{UserStore, UserStoreError};
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Deserialize;
use std::collections::BTreeMap;
use std::sync::{Arc, RwLock};
use time::format_description::well_known::Rfc3339;
use time::OffsetDateTime;
use tracing::error;

const INTERNAL_ERROR_MESSAGE: &str = "Internal server error";

// Forecast

#[derive(Debug, Deserialize)]
pub struct ForecastRequest {
    pub temperatures: Option<Vec<f64>>,
    pub humidities: Option<Vec<f64>>,
    pub winds: Option<Vec<f64>>,
}

pub enum ForecastResponse {
    Success(ForecastSuccessResponse),
    Error {
        status: StatusCode,
        body: ApiErrorResponse,
    },
}

impl IntoResponse for ForecastResponse {
    fn into_response(self) -> Response {
        match self {
            ForecastResponse::Success(body) => (StatusCode::OK, Json(body)).into_response(),
            ForecastResponse::Error { status, body } => (status, Json(body)).into_response(),
        }
    }
}

pub async fn post_forecast(
    State(ctx): State<ApiContext>,
    Json(request): Json<ForecastRequest>,
) -> impl IntoResponse {
    // Calendar features use the caller-facing "now", read once here at the
    // transport edge and injected; the engine never touches a clock.
    build_forecast_response(&ctx.state, request, OffsetDateTime::now_utc())
}

fn build_forecast_response(
    state: &Arc<RwLock<AppState>>,
    request: ForecastRequest,
    now: OffsetDateTime,
) -> ForecastResponse {
    let result = require_array("temperatures", request.temperatures).and_then(|temperatures| {
        let humidities = require_array("humidities", request.humidities)?;
        let winds = require_array("winds", request.winds)?;
        let ctx = DateContext::from_datetime(now);
        engine::forecast_day(state, &temperatures, &humidities, &winds, &ctx)
    });

    match result {
        Ok(forecast) => ForecastResponse::Success(ForecastSuccessResponse {
            status: "success",
            predictions: forecast.predictions,
            used_time: UsedTime {
                month: forecast.month,
                day: forecast.day,
            },
        }),
        Err(err) => {
            let (status, body) = map_engine_error("/predict_energy_consumption", err);
            ForecastResponse::Error { status, body }
        }
    }
}

fn require_array(field: &str, values: Option<Vec<f64>>) -> Result<Vec<f64>, EngineError> {
    values.ok_or_else(|| CoreError::invalid_input(field, "missing required field").into())
}

// Optimize

#[derive(Debug, Deserialize)]
pub struct OptimizeRequest {
    #[serde(rename = "Day")]
    pub day: Option<i64>,
    #[serde(rename = "Month")]
    pub month: Option<i64>,
    #[serde(rename = "Hour")]
    pub hour: Option<i64>,
    #[serde(rename = "Temperature")]
    pub temperature: Option<f64>,
    #[serde(rename = "Humidity")]
    pub humidity: Option<f64>,
    #[serde(rename = "WindSpeed")]
    pub wind_speed: Option<f64>,
    pub current_states: Option<BTreeMap<String, serde_json::Value>>,
}

pub enum OptimizeResponse {
    Success(OptimizeSuccessResponse),
    Error {
        status: StatusCode,
        body: ApiErrorResponse,
    },
}

impl IntoResponse for OptimizeResponse {
    fn into_response(self) -> Response {
        match self {
            OptimizeResponse::Success(body) => (StatusCode::OK, Json(body)).into_response(),
            OptimizeResponse::Error { status, body } => (status, Json(body)).into_response(),
        }
    }
}

pub async fn post_optimize(
    State(ctx): State<ApiContext>,
    Json(request): Json<OptimizeRequest>,
) -> impl IntoResponse {
    build_optimize_response(&ctx.state, request)
}

fn build_optimize_response(
    state: &Arc<RwLock<AppState>>,
    request: OptimizeRequest,
) -> OptimizeResponse {
    let result = parse_optimize_request(request)
        .and_then(|(input, current)| engine::optimize(state, &input, &current));

    match result {
        Ok(suggestions) => {
            let message = if suggestions.is_empty() {
                Some("All appliances are in their predicted states.".to_string())
            } else {
                None
            };
            OptimizeResponse::Success(OptimizeSuccessResponse {
                suggestions,
                message,
            })
        }
        Err(err) => {
            let (status, body) = map_engine_error("/optimize", err);
            OptimizeResponse::Error { status, body }
        }
    }
}

fn parse_optimize_request(
    request: OptimizeRequest,
) -> Result<(DecisionInput, CurrentStates), EngineError> {
    let input = DecisionInput {
        day: required_u8("Day", request.day, 1..=31)?,
        month: required_u8("Month", request.month, 1..=12)?,
        hour: required_u8("Hour", request.hour, 0..=23)?,
        temperature: required_f64("Temperature", request.temperature)?,
        humidity: required_f64("Humidity", request.humidity)?,
        wind_speed: required_f64("WindSpeed", request.wind_speed)?,
    };

    let mut current = CurrentStates::new();
    for (name, value) in request.current_states.unwrap_or_default() {
        let state = value.as_i64().ok_or_else(|| {
            CoreError::invalid_input(
                "current_states",
                format!("state must be 0 (OFF) or 1 (ON) for: {name}"),
            )
        })?;
        current.insert(name, state);
    }

    Ok((input, current))
}

fn required_u8(
    field: &str,
    value: Option<i64>,
    range: std::ops::RangeInclusive<u8>,
) -> Result<u8, EngineError> {
    let value = value
        .ok_or_else(|| CoreError::invalid_input(field, "missing required field"))?;
    u8::try_from(value)
        .ok()
        .filter(|v| range.contains(v))
        .ok_or_else(|| {
            CoreError::invalid_input(
                field,
                format!("must be in {}..={}", range.start(), range.end()),
            )
            .into()
        })
}

fn required_f64(field: &str, value: Option<f64>) -> Result<f64, EngineError> {
    value
        .ok_or_else(|| CoreError::invalid_input(field, "missing required field").into())
}

// Update appliance states

#[derive(Debug, Deserialize)]
pub struct UpdateRequest {
    pub email: Option<String>,
    pub appliances: Option<Vec<i64>>,
    pub total: Option<f64>,
}

pub enum UpdateResponse {
    Success(UpdateSuccessResponse),
    Error {
        status: StatusCode,
        body: ApiErrorResponse,
    },
}

impl IntoResponse for UpdateResponse {
    fn into_response(self) -> Response {
        match self {
            UpdateResponse::Success(body) => (StatusCode::OK, Json(body)).into_response(),
            UpdateResponse::Error { status, body } => (status, Json(body)).into_response(),
        }
    }
}

pub async fn post_update_states(
    State(ctx): State<ApiContext>,
    Json(request): Json<UpdateRequest>,
) -> impl IntoResponse {
    build_update_response(ctx.users.as_ref(), request)
}

fn build_update_response(users: &dyn UserStore, request: UpdateRequest) -> UpdateResponse {
    let (Some(email), Some(appliances)) = (request.email, request.appliances) else {
        return update_error(
            StatusCode::BAD_REQUEST,
            "Email or appliances data missing".to_string(),
        );
    };

    if appliances.len() != Appliance::ALL.len() {
        return update_error(
            StatusCode::BAD_REQUEST,
            format!(
                "appliances must contain exactly {} values, got {}",
                Appliance::ALL.len(),
                appliances.len()
            ),
        );
    }
    if let Some(bad) = appliances.iter().find(|&&v| v != 0 && v != 1) {
        return update_error(
            StatusCode::BAD_REQUEST,
            format!("appliance state must be 0 (OFF) or 1 (ON), got {bad}"),
        );
    }

    let states: BTreeMap<String, i64> = Appliance::ALL
        .iter()
        .zip(&appliances)
        .map(|(appliance, &state)| (appliance.name().to_string(), state))
        .collect();

    match users.update_fields(&email, &states, request.total) {
        Ok(()) => UpdateResponse::Success(UpdateSuccessResponse {
            message: "Appliance states updated successfully!".to_string(),
        }),
        Err(UserStoreError::NotFound(_)) => {
            update_error(StatusCode::NOT_FOUND, "User not found".to_string())
        }
        Err(err) => {
            error!(error = %err, "Internal error while handling /update");
            update_error(
                StatusCode::INTERNAL_SERVER_ERROR,
                INTERNAL_ERROR_MESSAGE.to_string(),
            )
        }
    }
}

fn update_error(status: StatusCode, error: String) -> UpdateResponse {
    UpdateResponse::Error {
        status,
        body: ApiErrorResponse { error },
    }
}

// Health

pub enum HealthResponse {
    Success {
        status: StatusCode,
        body: HealthSuccessResponse,
    },
    Error {
        status: StatusCode,
        body: ApiErrorResponse,
    },
}

impl IntoResponse for HealthResponse {
    fn into_response(self) -> Response {
        match self {
            HealthResponse::Success { status, body } => (status, Json(body)).into_response(),
            HealthResponse::Error { status, body } => (status, Json(body)).into_response(),
        }
    }
}

pub async fn get_health(State(ctx): State<ApiContext>) -> impl IntoResponse {
    build_health_response(&ctx.state, OffsetDateTime::now_utc())
}

fn build_health_response(state: &Arc<RwLock<AppState>>, now: OffsetDateTime) -> HealthResponse {
    let guard = match state.read() {
        Ok(guard) => guard,
        Err(_) => {
            error!("State lock poisoned while handling /api/health");
            return HealthResponse::Error {
                status: StatusCode::INTERNAL_SERVER_ERROR,
                body: ApiErrorResponse {
                    error: INTERNAL_ERROR_MESSAGE.to_string(),
                },
            };
        }
    };
    let has_forecast = guard.forecast().is_some();
    let has_decision = guard.decision().is_some();
    drop(guard);

    let status = match (has_forecast, has_decision) {
        (true, true) => HealthStatus::Ok,
        (false, false) => HealthStatus::Ko,
        _ => HealthStatus::Degraded,
    };
    let status_code = match status {
        HealthStatus::Ko => StatusCode::SERVICE_UNAVAILABLE,
        HealthStatus::Ok | HealthStatus::Degraded => StatusCode::OK,
    };

    HealthResponse::Success {
        status: status_code,
        body: HealthSuccessResponse {
            status,
            timestamp: format_timestamp(now),
        },
    }
}

fn format_timestamp(timestamp: OffsetDateTime) -> String {
    timestamp.format(&Rfc3339).unwrap_or_else(|err| {
        error!(error = %err, "Failed to format response timestamp");
        "1970-01-01T00:00:00Z".to_string()
    })
}

fn map_engine_error(route: &str, err: EngineError) -> (StatusCode, ApiErrorResponse) {
    match err {
        EngineError::Core(CoreError::InvalidInput { .. }) => (
            StatusCode::BAD_REQUEST,
            ApiErrorResponse {
                error: err.to_string(),
            },
        ),
        EngineError::Core(CoreError::ModelUnavailable { .. }) => (
            StatusCode::SERVICE_UNAVAILABLE,
            ApiErrorResponse {
                error: err.to_string(),
            },
        ),
        other => {
            error!(route = route, error = %other, "Internal error while handling request");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                ApiErrorResponse {
                    error: INTERNAL_ERROR_MESSAGE.to_string(),
                },
            )
        }
    }
}
