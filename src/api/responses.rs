use serde::Serialize;

/// Successful forecast payload: one prediction per hour plus the calendar
/// context the features were built with.
#[derive(Debug, Serialize)]
pub struct ForecastSuccessResponse {
    pub status: &'static str,
    pub predictions: Vec<f64>,
    pub used_time: UsedTime,
}

#[derive(Debug, Serialize)]
pub struct UsedTime {
    #[serde(rename = "Month")]
    pub month: u8,
    #[serde(rename = "Day")]
    pub day: u8,
}

#[derive(Debug, Serialize)]
pub struct OptimizeSuccessResponse {
    pub suggestions: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct UpdateSuccessResponse {
    pub message: String,
}

#[derive(Debug, Serialize)]
pub struct ApiErrorResponse {
    pub error: String,
}

#[derive(Debug, Serialize, PartialEq, Eq, Clone, Copy)]
#[serde(rename_all = "lowercase")]
pub enum HealthStatus {
    Ok,
    Degraded,
    Ko,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "snake_case")]
pub struct HealthSuccessResponse {
    pub status: HealthStatus,
    pub timestamp: String,
}
