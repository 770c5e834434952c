//! Historical dataset source.
//!
//! Reads timestamped weather + consumption rows from CSV with the columns
//! Datetime, Temperature, Humidity, WindSpeed, Consumption. Rows that fail to
//! parse are skipped with a warning and counted; the load fails outright only
//! on unreadable files or when no rows survive.

use crate::observation::Observation;
use serde::Deserialize;
use std::path::Path;
use thiserror::Error;
use time::format_description::BorrowedFormatItem;
use time::macros::format_description;
use time::PrimitiveDateTime;
use tracing::warn;

const DATETIME_FORMAT: &[BorrowedFormatItem<'static>] =
    format_description!("[year]-[month]-[day] [hour]:[minute]:[second]");

#[derive(Debug, Error)]
pub enum HistoryError {
    #[error("failed to read history: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to parse history: {0}")]
    Csv(#[from] csv::Error),
    #[error("history contains no usable rows")]
    Empty,
}

/// One historical row: a weather observation plus the consumption recorded
/// for that hour.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HistoryRow {
    pub observation: Observation,
    pub consumption: f64,
}

/// A loaded history slice plus how many source rows were dropped.
#[derive(Debug, Clone, PartialEq)]
pub struct History {
    pub rows: Vec<HistoryRow>,
    pub skipped: usize,
}

impl History {
    pub fn observations(&self) -> Vec<Observation> {
        self.rows.iter().map(|row| row.observation).collect()
    }
}

#[derive(Debug, Deserialize)]
struct RawRow {
    #[serde(rename = "Datetime")]
    datetime: String,
    #[serde(rename = "Temperature")]
    temperature: f64,
    #[serde(rename = "Humidity")]
    humidity: f64,
    #[serde(rename = "WindSpeed")]
    wind_speed: f64,
    #[serde(rename = "Consumption")]
    consumption: f64,
}

pub fn load_history(path: impl AsRef<Path>) -> Result<History, HistoryError> {
    let file = std::fs::File::open(path.as_ref())?;
    let mut reader = csv::Reader::from_reader(file);

    let mut rows = Vec::new();
    let mut skipped = 0usize;
    for (index, record) in reader.deserialize::<RawRow>().enumerate() {
        let raw = match record {
            Ok(raw) => raw,
            Err(err) => {
                warn!(row = index, error = %err, "Skipping unparsable history row");
                skipped += 1;
                continue;
            }
        };
        match PrimitiveDateTime::parse(&raw.datetime, DATETIME_FORMAT) {
            Ok(timestamp) => rows.push(HistoryRow {
                observation: Observation {
                    timestamp,
                    temperature: raw.temperature,
                    humidity: raw.humidity,
                    wind_speed: raw.wind_speed,
                },
                consumption: raw.consumption,
            }),
            Err(err) => {
                warn!(row = index, error = %err, "Skipping history row with bad timestamp");
                skipped += 1;
            }
        }
    }

    if rows.is_empty() {
        return Err(HistoryError::Empty);
    }

    Ok(History { rows, skipped })
}
