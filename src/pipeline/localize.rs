//! Unit localization stage

use super::Stage;
use crate::models::{ForecastRecord, UnitSystem};

const CM_PER_INCH: f64 = 2.54;
const MPH_PER_KPH: f64 = 0.621_371;

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Brings metric records into imperial units so every renderer sees inches, °F and mph.
#[derive(Debug, Clone, Copy, Default)]
pub struct UnitLocalize;

impl UnitLocalize {
    #[must_use]
    pub fn localize(record: ForecastRecord) -> ForecastRecord {
        match record.units {
            UnitSystem::Imperial => record,
            UnitSystem::Metric => ForecastRecord {
                snow: record.snow.map(|cm| round2(cm / CM_PER_INCH)),
                temp: record.temp.map(|c| round2(c * 9.0 / 5.0 + 32.0)),
                wind_speed: record.wind_speed.map(|kph| round2(kph * MPH_PER_KPH)),
                wind_gust: record.wind_gust.map(|kph| round2(kph * MPH_PER_KPH)),
                units: UnitSystem::Imperial,
                ..record
            },
        }
    }
}

impl Stage for UnitLocalize {
    fn transform(&self, records: Vec<ForecastRecord>) -> Vec<ForecastRecord> {
        records.into_iter().map(Self::localize).collect()
    }
}
