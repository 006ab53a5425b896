//! National Weather Service gridpoint forecasts
//!
//! Turns `properties.periods[]` into one [`ForecastRecord`] per period. Snow depth only
//! exists in the free-text detailed forecast, so it is extracted with a small set of
//! patterns; wind and temperature come from the quantitative fields when present.

use crate::http::{FetchRequest, Fetcher, Validator};
use crate::models::{ForecastRecord, Range, TimeOfDay, UnitSystem};
use crate::{Result, SnowcastError};
use chrono::{DateTime, Duration, FixedOffset, Utc};
use regex::Regex;
use serde::Deserialize;
use serde_json::Value;
use std::sync::LazyLock;
use tracing::{debug, warn};

pub const DEFAULT_BASE_URL: &str = "https://api.weather.gov";

static SNOW_DEPTH: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(\d+)\s+to\s+(\d+)\s+inches").expect("snow depth pattern is valid")
});
static SNOW_KEYWORD: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)snow").expect("snow keyword pattern is valid"));
static SMALL_AMOUNT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"less than|around").expect("small amount pattern is valid"));
static SPEED_TEXT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(\d+(?:\.\d+)?)(?:\s+to\s+(\d+(?:\.\d+)?))?").expect("speed text pattern is valid")
});

#[derive(Debug, Deserialize)]
struct ForecastDocument {
    properties: Option<ForecastProperties>,
}

#[derive(Debug, Deserialize)]
struct ForecastProperties {
    periods: Option<Vec<Period>>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Period {
    #[serde(default)]
    name: String,
    start_time: String,
    #[serde(default)]
    short_forecast: String,
    #[serde(default)]
    detailed_forecast: String,
    temperature: Option<Measure>,
    temperature_unit: Option<String>,
    wind_speed: Option<Measure>,
    wind_gust: Option<Measure>,
    wind_direction: Option<String>,
}

/// NWS ships measures either as quantitative values (with the `_qv` feature flags),
/// as bare numbers, or as text such as "10 to 15 mph".
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum Measure {
    Quantity(Quantity),
    Number(f64),
    Text(String),
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Quantity {
    value: Option<f64>,
    min_value: Option<f64>,
    max_value: Option<f64>,
    unit_code: Option<String>,
}

#[derive(Debug, Deserialize)]
struct PointsDocument {
    properties: Option<PointsProperties>,
}

#[derive(Debug, Deserialize)]
struct PointsProperties {
    forecast: Option<String>,
}

#[derive(Debug, Clone, Copy)]
enum MeasureKind {
    Temperature,
    Speed,
}

pub fn kph_to_mph(kph: f64) -> f64 {
    (kph * 0.621_371).round()
}

pub fn celsius_to_fahrenheit(celsius: f64) -> f64 {
    round2(celsius * 9.0 / 5.0 + 32.0)
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Snow depth in inches from a period's short and detailed text.
pub fn snow_range(short_forecast: &str, detailed_forecast: &str) -> Range {
    if !SNOW_KEYWORD.is_match(short_forecast) {
        return Range::zero();
    }

    if let Some(captures) = SNOW_DEPTH.captures(detailed_forecast) {
        let low = captures[1].parse::<f64>().unwrap_or(0.0);
        let high = captures[2].parse::<f64>().unwrap_or(0.0);
        return Range::new(low, high);
    }

    if SMALL_AMOUNT.is_match(detailed_forecast) {
        return Range::up_to(1.0);
    }

    warn!(
        short_forecast,
        detailed_forecast, "Detected snow, but no depth"
    );
    Range::zero()
}

fn convert(kind: MeasureKind, unit: Option<&str>, value: f64) -> f64 {
    let unit = unit.unwrap_or_default();
    match kind {
        MeasureKind::Temperature if unit.ends_with("degC") || unit == "C" => {
            celsius_to_fahrenheit(value)
        }
        MeasureKind::Speed if unit.contains("km_h") => kph_to_mph(value),
        _ => value,
    }
}

fn measure_range(measure: Option<&Measure>, kind: MeasureKind, fallback_unit: Option<&str>) -> Range {
    match measure {
        Some(Measure::Quantity(quantity)) => {
            let unit = quantity.unit_code.as_deref().or(fallback_unit);
            match (quantity.value, quantity.min_value, quantity.max_value) {
                (Some(value), _, _) => Range::up_to(convert(kind, unit, value)),
                (None, Some(min), Some(max)) => {
                    Range::new(convert(kind, unit, min), convert(kind, unit, max))
                }
                (None, None, Some(max)) => Range::up_to(convert(kind, unit, max)),
                _ => Range::zero(),
            }
        }
        Some(Measure::Number(value)) => Range::up_to(convert(kind, fallback_unit, *value)),
        Some(Measure::Text(text)) => {
            let unit = if text.contains("km/h") { Some("km_h-1") } else { fallback_unit };
            match SPEED_TEXT.captures(text) {
                Some(captures) => {
                    let first = captures[1].parse::<f64>().unwrap_or(0.0);
                    match captures.get(2).and_then(|m| m.as_str().parse::<f64>().ok()) {
                        Some(second) => {
                            Range::new(convert(kind, unit, first), convert(kind, unit, second))
                        }
                        None => Range::up_to(convert(kind, unit, first)),
                    }
                }
                None => Range::zero(),
            }
        }
        None => Range::zero(),
    }
}

fn parse_period(period: Period) -> Result<ForecastRecord> {
    let start = DateTime::parse_from_rfc3339(&period.start_time).map_err(|e| {
        SnowcastError::parse(format!(
            "Invalid startTime '{}' for period '{}': {e}",
            period.start_time, period.name
        ))
    })?;

    let temperature_unit = period.temperature_unit.as_deref();

    Ok(ForecastRecord {
        time_of_day: TimeOfDay::Instant(start),
        snow: snow_range(&period.short_forecast, &period.detailed_forecast),
        temp: measure_range(
            period.temperature.as_ref(),
            MeasureKind::Temperature,
            temperature_unit,
        ),
        wind_speed: measure_range(period.wind_speed.as_ref(), MeasureKind::Speed, None),
        wind_gust: measure_range(period.wind_gust.as_ref(), MeasureKind::Speed, None),
        wind_direction: period.wind_direction.unwrap_or_default(),
        name: period.name,
        short: period.short_forecast,
        units: UnitSystem::Imperial,
    })
}

/// Parses a gridpoint forecast document into records, one per period, in document order.
pub fn parse_forecast(document: Value) -> Result<Vec<ForecastRecord>> {
    let document: ForecastDocument = serde_json::from_value(document)
        .map_err(|e| SnowcastError::parse(format!("Malformed NWS forecast: {e}")))?;

    let periods = document
        .properties
        .and_then(|properties| properties.periods)
        .ok_or_else(|| SnowcastError::parse("NWS forecast has no properties.periods"))?;

    periods.into_iter().map(parse_period).collect()
}

fn parse_updated(updated: &str) -> Option<DateTime<FixedOffset>> {
    DateTime::parse_from_rfc3339(updated)
        .or_else(|_| DateTime::parse_from_str(updated, "%Y-%m-%d %H:%M:%S %z"))
        .ok()
}

/// Whether `document` declares a `properties.updated` no older than `max_age` at `now`.
pub fn is_fresh(document: &Value, now: DateTime<Utc>, max_age: Duration) -> bool {
    let Some(updated) = document
        .pointer("/properties/updated")
        .and_then(Value::as_str)
    else {
        debug!("Forecast has no updated timestamp");
        return false;
    };

    match parse_updated(updated) {
        Some(updated) => now.signed_duration_since(updated) <= max_age,
        None => {
            debug!(updated, "Unparseable updated timestamp");
            false
        }
    }
}

/// Validator rejecting documents older than `max_age`.
pub fn freshness_validator(max_age: Duration) -> impl Fn(&Value) -> bool + Send + Sync {
    move |document| is_fresh(document, Utc::now(), max_age)
}

/// Forecasts from `api.weather.gov`.
#[derive(Debug, Clone)]
pub struct NwsSource {
    base_url: String,
    feature_flags: String,
    max_age: Duration,
}

impl Default for NwsSource {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            feature_flags: "forecast_temperature_qv, forecast_wind_speed_qv".to_string(),
            max_age: Duration::hours(24),
        }
    }
}

impl NwsSource {
    #[must_use]
    pub fn new(feature_flags: impl Into<String>, max_age: Duration) -> Self {
        Self {
            feature_flags: feature_flags.into(),
            max_age,
            ..Self::default()
        }
    }

    #[must_use]
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    #[must_use]
    pub fn points_url(&self, lat: f64, lon: f64) -> String {
        format!("{}/points/{lat:.4},{lon:.4}", self.base_url)
    }

    /// Looks up the gridpoint forecast URL covering a coordinate.
    pub async fn resolve_forecast_url(&self, fetcher: &Fetcher, lat: f64, lon: f64) -> Result<String> {
        let document = fetcher.fetch(&self.points_url(lat, lon), None).await?;
        let points: PointsDocument = serde_json::from_value(document)
            .map_err(|e| SnowcastError::parse(format!("Malformed NWS points document: {e}")))?;

        points
            .properties
            .and_then(|properties| properties.forecast)
            .ok_or_else(|| SnowcastError::parse("NWS points document has no properties.forecast"))
    }

    /// Fetches and parses the forecast at `forecast_url`, rejecting stale documents.
    pub async fn forecast(&self, fetcher: &Fetcher, forecast_url: &str) -> Result<Vec<ForecastRecord>> {
        let fresh = freshness_validator(self.max_age);
        let validator: &Validator<'_> = &fresh;
        let request = FetchRequest::new(forecast_url)
            .header("Feature-Flags", self.feature_flags.as_str())
            .validator(Some(validator));

        let document = fetcher.execute(&request).await?;
        parse_forecast(document)
    }
}
