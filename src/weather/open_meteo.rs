//! `OpenMeteo` daily forecasts for resorts outside NWS coverage

use crate::http::Fetcher;
use crate::models::{ForecastRecord, Range, TimeOfDay, UnitSystem, wind_direction_from_degrees};
use crate::{Result, SnowcastError};
use chrono::NaiveDate;
use serde::Deserialize;
use serde_json::Value;

pub const DEFAULT_BASE_URL: &str = "https://api.open-meteo.com";

const DAILY_FIELDS: &str = "weathercode,temperature_2m_max,temperature_2m_min,snowfall_sum,\
windspeed_10m_max,windgusts_10m_max,winddirection_10m_dominant";

/// Daily forecast response from `OpenMeteo`
#[derive(Debug, Deserialize)]
struct ForecastResponse {
    daily_units: Option<DailyUnits>,
    daily: Option<DailyData>,
}

#[derive(Debug, Deserialize)]
struct DailyUnits {
    #[serde(rename = "temperature_2m_max")]
    temperature: Option<String>,
    #[serde(rename = "windspeed_10m_max")]
    wind_speed: Option<String>,
    #[serde(rename = "snowfall_sum")]
    snowfall: Option<String>,
}

/// Daily weather data from `OpenMeteo`
#[derive(Debug, Deserialize)]
struct DailyData {
    time: Vec<String>,
    #[serde(rename = "weathercode")]
    weather_code: Option<Vec<Option<u8>>>,
    #[serde(rename = "temperature_2m_max")]
    temperature_max: Option<Vec<Option<f64>>>,
    #[serde(rename = "temperature_2m_min")]
    temperature_min: Option<Vec<Option<f64>>>,
    #[serde(rename = "snowfall_sum")]
    snowfall: Option<Vec<Option<f64>>>,
    #[serde(rename = "windspeed_10m_max")]
    wind_speed_max: Option<Vec<Option<f64>>>,
    #[serde(rename = "windgusts_10m_max")]
    wind_gusts_max: Option<Vec<Option<f64>>>,
    #[serde(rename = "winddirection_10m_dominant")]
    wind_direction: Option<Vec<Option<f64>>>,
}

/// Convert `OpenMeteo` weather code to human-readable description
#[must_use]
pub fn weather_code_to_description(code: u8) -> &'static str {
    match code {
        0 => "Clear sky",
        1 => "Mainly clear",
        2 => "Partly cloudy",
        3 => "Overcast",
        45 => "Fog",
        48 => "Depositing rime fog",
        51 => "Light drizzle",
        53 => "Moderate drizzle",
        55 => "Dense drizzle",
        56 => "Light freezing drizzle",
        57 => "Dense freezing drizzle",
        61 => "Slight rain",
        63 => "Moderate rain",
        65 => "Heavy rain",
        66 => "Light freezing rain",
        67 => "Heavy freezing rain",
        71 => "Slight snow fall",
        73 => "Moderate snow fall",
        75 => "Heavy snow fall",
        77 => "Snow grains",
        80 => "Slight rain showers",
        81 => "Moderate rain showers",
        82 => "Violent rain showers",
        85 => "Slight snow showers",
        86 => "Heavy snow showers",
        95 => "Thunderstorm",
        96 => "Thunderstorm with slight hail",
        99 => "Thunderstorm with heavy hail",
        _ => "",
    }
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

fn value_at(series: Option<&Vec<Option<f64>>>, index: usize) -> f64 {
    series
        .and_then(|values| values.get(index))
        .copied()
        .flatten()
        .map_or(0.0, round2)
}

fn check_unit(field: &str, actual: Option<&str>, expected: &str) -> Result<()> {
    match actual {
        Some(unit) if unit == expected => Ok(()),
        other => Err(SnowcastError::parse(format!(
            "OpenMeteo returned {field} in {}, expected {expected}",
            other.unwrap_or("no unit")
        ))),
    }
}

/// Parses a daily `OpenMeteo` response into metric records, one per day.
pub fn parse_forecast(document: Value) -> Result<Vec<ForecastRecord>> {
    let response: ForecastResponse = serde_json::from_value(document)
        .map_err(|e| SnowcastError::parse(format!("Malformed OpenMeteo forecast: {e}")))?;

    let units = response
        .daily_units
        .ok_or_else(|| SnowcastError::parse("OpenMeteo forecast has no daily_units"))?;
    check_unit("temperature", units.temperature.as_deref(), "°C")?;
    check_unit("wind speed", units.wind_speed.as_deref(), "km/h")?;
    check_unit("snowfall", units.snowfall.as_deref(), "cm")?;

    let daily = response
        .daily
        .ok_or_else(|| SnowcastError::parse("OpenMeteo forecast has no daily data"))?;

    daily
        .time
        .iter()
        .enumerate()
        .map(|(i, day)| {
            let date = NaiveDate::parse_from_str(day, "%Y-%m-%d").map_err(|e| {
                SnowcastError::parse(format!("Invalid OpenMeteo date '{day}': {e}"))
            })?;

            let weather_code = daily
                .weather_code
                .as_ref()
                .and_then(|codes| codes.get(i))
                .copied()
                .flatten();
            let direction = daily
                .wind_direction
                .as_ref()
                .and_then(|dirs| dirs.get(i))
                .copied()
                .flatten();

            Ok(ForecastRecord {
                time_of_day: TimeOfDay::Date(date),
                name: date.format("%a").to_string(),
                short: weather_code
                    .map(weather_code_to_description)
                    .unwrap_or_default()
                    .to_string(),
                snow: Range::up_to(value_at(daily.snowfall.as_ref(), i)),
                temp: Range::new(
                    value_at(daily.temperature_min.as_ref(), i),
                    value_at(daily.temperature_max.as_ref(), i),
                ),
                wind_speed: Range::up_to(value_at(daily.wind_speed_max.as_ref(), i)),
                wind_gust: Range::up_to(value_at(daily.wind_gusts_max.as_ref(), i)),
                wind_direction: direction
                    .map(|degrees| wind_direction_from_degrees(degrees).to_string())
                    .unwrap_or_default(),
                units: UnitSystem::Metric,
            })
        })
        .collect()
}

/// Forecasts from `api.open-meteo.com`.
#[derive(Debug, Clone)]
pub struct OpenMeteoSource {
    base_url: String,
}

impl Default for OpenMeteoSource {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
        }
    }
}

impl OpenMeteoSource {
    #[must_use]
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    #[must_use]
    pub fn forecast_url(&self, lat: f64, lon: f64) -> String {
        format!(
            "{}/v1/forecast?latitude={lat}&longitude={lon}&models=best_match&daily={DAILY_FIELDS}&timezone=auto",
            self.base_url
        )
    }

    pub async fn forecast(&self, fetcher: &Fetcher, lat: f64, lon: f64) -> Result<Vec<ForecastRecord>> {
        let document = fetcher.fetch(&self.forecast_url(lat, lon), None).await?;
        parse_forecast(document)
    }
}
