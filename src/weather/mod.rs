//! Forecast sources and the degrade-not-abort boundary

use crate::config::ForecastConfig;
use crate::http::Fetcher;
use crate::models::{ForecastRecord, ForecastSource, Resort};
use crate::Result;
use tracing::warn;

pub mod nws;
pub mod open_meteo;

pub use nws::NwsSource;
pub use open_meteo::OpenMeteoSource;

/// Fetches raw forecast records for a resort from whichever upstream covers it.
#[derive(Debug, Clone)]
pub struct ForecastProvider {
    fetcher: Fetcher,
    nws: NwsSource,
    open_meteo: OpenMeteoSource,
}

impl ForecastProvider {
    #[must_use]
    pub fn new(fetcher: Fetcher, config: &ForecastConfig) -> Self {
        Self {
            fetcher,
            nws: NwsSource::new(
                config.nws_feature_flags.clone(),
                chrono::Duration::hours(i64::from(config.max_age_hours)),
            ),
            open_meteo: OpenMeteoSource::default(),
        }
    }

    #[must_use]
    pub fn with_nws(mut self, nws: NwsSource) -> Self {
        self.nws = nws;
        self
    }

    #[must_use]
    pub fn with_open_meteo(mut self, open_meteo: OpenMeteoSource) -> Self {
        self.open_meteo = open_meteo;
        self
    }

    #[must_use]
    pub fn fetcher(&self) -> &Fetcher {
        &self.fetcher
    }

    /// Parsed records for `resort`.
    ///
    /// Upstream failures that survived every retry yield a single
    /// [`ForecastRecord::unavailable`] record; parse errors and cancellation propagate.
    #[tracing::instrument(name = "records_for", skip(self, resort), fields(resort = %resort.id))]
    pub async fn records_for(&self, resort: &Resort) -> Result<Vec<ForecastRecord>> {
        let fetched = match resort.forecast_source() {
            ForecastSource::Nws(url) => self.nws.forecast(&self.fetcher, &url).await,
            ForecastSource::NwsPoints { lat, lon } => {
                match self.nws.resolve_forecast_url(&self.fetcher, lat, lon).await {
                    Ok(url) => self.nws.forecast(&self.fetcher, &url).await,
                    Err(e) => Err(e),
                }
            }
            ForecastSource::OpenMeteo { lat, lon } => {
                self.open_meteo.forecast(&self.fetcher, lat, lon).await
            }
        };

        degrade(fetched)
    }
}

fn degrade(fetched: Result<Vec<ForecastRecord>>) -> Result<Vec<ForecastRecord>> {
    match fetched {
        Ok(records) => Ok(records),
        Err(e) if e.is_retryable() => {
            warn!("Forecast unavailable, substituting placeholder: {e}");
            Ok(vec![ForecastRecord::unavailable()])
        }
        Err(e) => Err(e),
    }
}
