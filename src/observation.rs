use time::{PrimitiveDateTime, Weekday};

/// One timestamped weather reading. Immutable once recorded; time-derived
/// fields are recomputed from the timestamp on demand, never stored.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Observation {
    pub timestamp: PrimitiveDateTime,
    pub temperature: f64,
    pub humidity: f64,
    pub wind_speed: f64,
}

impl Observation {
    pub fn hour(&self) -> u8 {
        self.timestamp.hour()
    }

    pub fn day(&self) -> u8 {
        self.timestamp.day()
    }

    pub fn month(&self) -> u8 {
        self.timestamp.month() as u8
    }

    pub fn is_weekday(&self) -> bool {
        !matches!(
            self.timestamp.weekday(),
            Weekday::Saturday | Weekday::Sunday
        )
    }
}
