//! Normalized per-period forecast record

use super::Range;
use chrono::{DateTime, FixedOffset, NaiveDate};
use serde::{Deserialize, Serialize};

/// When a record applies: an upstream period start, a whole day, or a free label
/// such as "Today" for synthetic records.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum TimeOfDay {
    Instant(DateTime<FixedOffset>),
    Date(NaiveDate),
    Label(String),
}

impl TimeOfDay {
    /// Calendar date in the period's own offset, if known.
    #[must_use]
    pub fn date(&self) -> Option<NaiveDate> {
        match self {
            TimeOfDay::Instant(at) => Some(at.date_naive()),
            TimeOfDay::Date(date) => Some(*date),
            TimeOfDay::Label(_) => None,
        }
    }

    /// Key used to group sub-periods of the same day.
    #[must_use]
    pub fn day_key(&self) -> String {
        match (self.date(), self) {
            (Some(date), _) => date.format("%Y-%m-%d").to_string(),
            (None, TimeOfDay::Label(label)) => label.clone(),
            (None, _) => String::new(),
        }
    }

    /// `MM/DD` for dated records, the label itself otherwise.
    #[must_use]
    pub fn date_label(&self) -> String {
        match self {
            TimeOfDay::Label(label) => label.clone(),
            other => other
                .date()
                .map(|date| date.format("%m/%d").to_string())
                .unwrap_or_default(),
        }
    }
}

/// Unit system a record's numbers are expressed in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum UnitSystem {
    /// inches, °F, mph
    #[default]
    Imperial,
    /// centimeters, °C, km/h
    Metric,
}

/// One forecast period after parsing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForecastRecord {
    pub time_of_day: TimeOfDay,
    /// Upstream period name, e.g. "Tonight" or "Wednesday"
    pub name: String,
    /// Short description, e.g. "Light Snow"
    pub short: String,
    pub snow: Range,
    pub temp: Range,
    pub wind_speed: Range,
    pub wind_gust: Range,
    /// Compass label, e.g. "WSW"
    pub wind_direction: String,
    pub units: UnitSystem,
}

impl ForecastRecord {
    /// Stand-in used when no usable forecast could be fetched, so rendering stays total.
    #[must_use]
    pub fn unavailable() -> Self {
        Self {
            time_of_day: TimeOfDay::Label("Today".to_string()),
            name: "Today".to_string(),
            short: "Unknown".to_string(),
            snow: Range::zero(),
            temp: Range::zero(),
            wind_speed: Range::zero(),
            wind_gust: Range::zero(),
            wind_direction: String::new(),
            units: UnitSystem::Imperial,
        }
    }
}

const COMPASS: [&str; 16] = [
    "N", "NNE", "NE", "ENE", "E", "ESE", "SE", "SSE", "S", "SSW", "SW", "WSW", "W", "WNW", "NW",
    "NNW",
];

/// Convert wind direction from degrees to one of 16 compass labels
#[must_use]
pub fn wind_direction_from_degrees(degrees: f64) -> &'static str {
    let normalized = degrees.rem_euclid(360.0);
    let sector = ((normalized + 11.25) / 22.5).floor() as usize % COMPASS.len();
    COMPASS[sector]
}
