//! Feature engineering shared by the forecast and decision pipelines.
//!
//! The transform is a pure function: identical input always produces an
//! identical vector, which is what keeps training and serving in parity.

use crate::error::CoreError;
use crate::observation::Observation;
use std::f64::consts::PI;
use time::{OffsetDateTime, Weekday};

/// Dimensionality of the base feature vector.
pub const FEATURE_DIM: usize = 12;

/// Evening hours carry their own indicator and interaction term.
pub fn is_evening(hour: u8) -> bool {
    (17..=21).contains(&hour)
}

/// Calendar context for feature construction.
///
/// The forecast path takes month/day/weekday from the request's "now", while
/// the historical training path derives them from each row's own timestamp.
/// That asymmetry is intentional and lives with the caller: the context is
/// always injected, the core never reads a clock.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DateContext {
    pub month: u8,
    pub day: u8,
    pub is_weekday: bool,
}

impl DateContext {
    pub fn from_datetime(now: OffsetDateTime) -> Self {
        Self {
            month: now.month() as u8,
            day: now.day(),
            is_weekday: !matches!(now.weekday(), Weekday::Saturday | Weekday::Sunday),
        }
    }

    pub fn from_observation(obs: &Observation) -> Self {
        Self {
            month: obs.month(),
            day: obs.day(),
            is_weekday: obs.is_weekday(),
        }
    }
}

fn ensure_finite(field: &str, value: f64) -> Result<(), CoreError> {
    if value.is_finite() {
        Ok(())
    } else {
        Err(CoreError::invalid_input(field, "must be a finite number"))
    }
}

/// Builds the 12-dimension feature vector for one weather reading at `hour`.
///
/// Layout: temperature, humidity, wind speed, hour, sin(2πh/24), cos(2πh/24),
/// month, day, weekday flag, evening flag, temperature×hour,
/// temperature×evening.
pub fn weather_features(
    temperature: f64,
    humidity: f64,
    wind_speed: f64,
    hour: u8,
    ctx: &DateContext,
) -> Result<[f64; FEATURE_DIM], CoreError> {
    ensure_finite("temperature", temperature)?;
    ensure_finite("humidity", humidity)?;
    ensure_finite("wind_speed", wind_speed)?;
    if hour > 23 {
        return Err(CoreError::invalid_input("hour", "must be in 0..=23"));
    }

    let h = f64::from(hour);
    let angle = 2.0 * PI * h / 24.0;
    let weekday = if ctx.is_weekday { 1.0 } else { 0.0 };
    let evening = if is_evening(hour) { 1.0 } else { 0.0 };

    Ok([
        temperature,
        humidity,
        wind_speed,
        h,
        angle.sin(),
        angle.cos(),
        f64::from(ctx.month),
        f64::from(ctx.day),
        weekday,
        evening,
        temperature * h,
        temperature * evening,
    ])
}

/// Historical-path variant: calendar context comes from the observation's own
/// timestamp.
pub fn observation_features(obs: &Observation) -> Result<[f64; FEATURE_DIM], CoreError> {
    weather_features(
        obs.temperature,
        obs.humidity,
        obs.wind_speed,
        obs.hour(),
        &DateContext::from_observation(obs),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::datetime;

    fn ctx() -> DateContext {
        DateContext {
            month: 6,
            day: 15,
            is_weekday: true,
        }
    }

    #[test]
    fn transform_is_deterministic() {
        let first = weather_features(25.5, 60.0, 4.2, 18, &ctx()).expect("features");
        let second = weather_features(25.5, 60.0, 4.2, 18, &ctx()).expect("features");
        assert_eq!(first, second);
    }

    #[test]
    fn layout_matches_the_contract() {
        let features = weather_features(30.0, 50.0, 2.0, 18, &ctx()).expect("features");
        assert_eq!(features.len(), FEATURE_DIM);
        assert_eq!(features[0], 30.0);
        assert_eq!(features[1], 50.0);
        assert_eq!(features[2], 2.0);
        assert_eq!(features[3], 18.0);
        assert!((features[4] - (2.0 * PI * 18.0 / 24.0).sin()).abs() < 1e-12);
        assert!((features[5] - (2.0 * PI * 18.0 / 24.0).cos()).abs() < 1e-12);
        assert_eq!(features[6], 6.0);
        assert_eq!(features[7], 15.0);
        assert_eq!(features[8], 1.0);
        // Hour 18 is in the evening window.
        assert_eq!(features[9], 1.0);
        assert_eq!(features[10], 30.0 * 18.0);
        assert_eq!(features[11], 30.0);
    }

    #[test]
    fn evening_flag_covers_17_to_21() {
        for hour in 0..24u8 {
            let features = weather_features(20.0, 40.0, 1.0, hour, &ctx()).expect("features");
            let expected = if (17..=21).contains(&hour) { 1.0 } else { 0.0 };
            assert_eq!(features[9], expected, "hour {hour}");
        }
    }

    #[test]
    fn non_finite_inputs_are_rejected() {
        let err = weather_features(f64::NAN, 50.0, 2.0, 12, &ctx()).unwrap_err();
        assert!(matches!(
            err,
            CoreError::InvalidInput { ref field, .. } if field == "temperature"
        ));

        let err = weather_features(20.0, f64::INFINITY, 2.0, 12, &ctx()).unwrap_err();
        assert!(matches!(
            err,
            CoreError::InvalidInput { ref field, .. } if field == "humidity"
        ));
    }

    #[test]
    fn out_of_range_hour_is_rejected() {
        let err = weather_features(20.0, 50.0, 2.0, 24, &ctx()).unwrap_err();
        assert!(matches!(
            err,
            CoreError::InvalidInput { ref field, .. } if field == "hour"
        ));
    }

    #[test]
    fn observation_features_use_the_rows_own_date() {
        let obs = Observation {
            timestamp: datetime!(2017-03-04 09:00:00),
            temperature: 18.0,
            humidity: 45.0,
            wind_speed: 1.5,
        };
        let features = observation_features(&obs).expect("features");
        assert_eq!(features[6], 3.0);
        assert_eq!(features[7], 4.0);
        // 2017-03-04 was a Saturday.
        assert_eq!(features[8], 0.0);
    }
}
