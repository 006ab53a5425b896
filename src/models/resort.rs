//! Ski resort identity and how its forecast is located

use serde::{Deserialize, Serialize};

/// A resort as loaded from the scraped resort list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Resort {
    pub id: String,
    pub name: String,
    /// Latitude in decimal degrees
    pub lat: f64,
    /// Longitude in decimal degrees
    pub lon: f64,
    /// NWS gridpoint forecast URL, when already known
    #[serde(default)]
    pub forecast_url: Option<String>,
    /// Country code (ISO 3166-1 alpha-2)
    #[serde(default)]
    pub country: Option<String>,
    #[serde(default)]
    pub region: Option<String>,
    /// Resort homepage
    #[serde(default)]
    pub url: Option<String>,
}

/// Upstream a resort's forecast comes from.
#[derive(Debug, Clone, PartialEq)]
pub enum ForecastSource {
    /// NWS gridpoint forecast at a known URL
    Nws(String),
    /// NWS forecast found through the points endpoint
    NwsPoints { lat: f64, lon: f64 },
    /// Open-Meteo daily forecast for resorts outside NWS coverage
    OpenMeteo { lat: f64, lon: f64 },
}

impl Resort {
    #[must_use]
    pub fn new(id: impl Into<String>, name: impl Into<String>, lat: f64, lon: f64) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            lat,
            lon,
            forecast_url: None,
            country: None,
            region: None,
            url: None,
        }
    }

    #[must_use]
    pub fn with_forecast_url(mut self, forecast_url: impl Into<String>) -> Self {
        self.forecast_url = Some(forecast_url.into());
        self
    }

    #[must_use]
    pub fn with_country(mut self, country: impl Into<String>) -> Self {
        self.country = Some(country.into());
        self
    }

    #[must_use]
    pub fn forecast_source(&self) -> ForecastSource {
        if let Some(url) = &self.forecast_url {
            return ForecastSource::Nws(url.clone());
        }
        match self.country.as_deref() {
            Some(country) if country.eq_ignore_ascii_case("US") => ForecastSource::NwsPoints {
                lat: self.lat,
                lon: self.lon,
            },
            _ => ForecastSource::OpenMeteo {
                lat: self.lat,
                lon: self.lon,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_explicit_forecast_url_wins() {
        let resort = Resort::new("winter-park", "Winter Park", 39.88, -105.76)
            .with_country("US")
            .with_forecast_url("https://api.weather.gov/gridpoints/BOU/1,2/forecast");

        assert_eq!(
            resort.forecast_source(),
            ForecastSource::Nws("https://api.weather.gov/gridpoints/BOU/1,2/forecast".into())
        );
    }

    #[test]
    fn test_us_resorts_use_points_lookup() {
        let resort = Resort::new("alta", "Alta", 40.58, -111.63).with_country("us");
        assert!(matches!(
            resort.forecast_source(),
            ForecastSource::NwsPoints { .. }
        ));
    }

    #[test]
    fn test_other_resorts_use_open_meteo() {
        let resort = Resort::new("zermatt", "Zermatt", 46.02, 7.75).with_country("CH");
        assert!(matches!(
            resort.forecast_source(),
            ForecastSource::OpenMeteo { .. }
        ));

        let unknown = Resort::new("somewhere", "Somewhere", 1.0, 2.0);
        assert!(matches!(
            unknown.forecast_source(),
            ForecastSource::OpenMeteo { .. }
        ));
    }

    #[test]
    fn test_deserialize_minimal_resort() {
        let resort: Resort = serde_json::from_str(
            r#"{"id":"alta","name":"Alta","lat":40.58,"lon":-111.63}"#,
        )
        .unwrap();
        assert_eq!(resort.name, "Alta");
        assert!(resort.forecast_url.is_none());
    }
}
