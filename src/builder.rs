//! Builds rendered forecasts for resorts, one at a time or through a bounded worker pool

use crate::cache::ResponseStore;
use crate::config::SnowcastConfig;
use crate::http::Fetcher;
use crate::models::{ForecastRecord, Resort};
use crate::pipeline::{ForecastView, Pipeline};
use crate::weather::ForecastProvider;
use crate::{Result, SnowcastError};
use futures::stream::{self, StreamExt};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{OnceCell, RwLock};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Outcome of one resort in [`ForecastBuilder::build_all`].
#[derive(Debug)]
pub struct ResortForecast {
    pub resort_id: String,
    pub result: Result<ForecastView>,
}

type MemoCell = Arc<OnceCell<Vec<ForecastRecord>>>;

/// Owns the raw-record memo for the resorts it has built.
///
/// The memo lives as long as the builder; nothing is shared between builders.
/// Concurrent builds of one resort share a single upstream fetch.
#[derive(Debug)]
pub struct ForecastBuilder {
    provider: ForecastProvider,
    memo: RwLock<HashMap<String, MemoCell>>,
    workers: usize,
}

impl ForecastBuilder {
    #[must_use]
    pub fn new(provider: ForecastProvider, workers: usize) -> Self {
        Self {
            provider,
            memo: RwLock::new(HashMap::new()),
            workers: workers.max(1),
        }
    }

    pub fn from_config(config: &SnowcastConfig, store: Option<Arc<ResponseStore>>) -> Result<Self> {
        let fetcher = Fetcher::from_config(config, store)?;
        let provider = ForecastProvider::new(fetcher, &config.forecast);
        Ok(Self::new(provider, config.http.workers as usize))
    }

    /// Cancelling it interrupts retry sleeps and stops `build_all` from starting new resorts.
    #[must_use]
    pub fn cancellation_token(&self) -> CancellationToken {
        self.provider.fetcher().cancellation_token()
    }

    /// Parsed records for `resort`, fetched once per builder.
    pub async fn records(&self, resort: &Resort) -> Result<Vec<ForecastRecord>> {
        let cell = self.cell(&resort.id).await;
        if let Some(records) = cell.get() {
            debug!(resort = %resort.id, "Using memoized records");
            return Ok(records.clone());
        }

        let records = cell
            .get_or_try_init(|| self.provider.records_for(resort))
            .await?;
        Ok(records.clone())
    }

    async fn cell(&self, resort_id: &str) -> MemoCell {
        if let Some(cell) = self.memo.read().await.get(resort_id) {
            return Arc::clone(cell);
        }
        Arc::clone(
            self.memo
                .write()
                .await
                .entry(resort_id.to_string())
                .or_default(),
        )
    }

    /// Fetches (or reuses) the resort's records and runs them through `pipeline`.
    pub async fn build_forecast(&self, resort: &Resort, pipeline: &Pipeline) -> Result<ForecastView> {
        let records = self.records(resort).await?;
        Ok(pipeline.run(records))
    }

    /// Drops the memoized records of one resort. Returns whether anything was stored.
    pub async fn forget(&self, resort_id: &str) -> bool {
        self.memo
            .write()
            .await
            .remove(resort_id)
            .is_some_and(|cell| cell.initialized())
    }

    pub async fn clear(&self) {
        self.memo.write().await.clear();
    }

    pub async fn memoized(&self) -> usize {
        self.memo
            .read()
            .await
            .values()
            .filter(|cell| cell.initialized())
            .count()
    }

    /// Builds every resort with at most `workers` in flight. Results keep the input order.
    pub async fn build_all(&self, resorts: &[Resort], pipeline: &Pipeline) -> Vec<ResortForecast> {
        let cancel = self.cancellation_token();
        info!(resorts = resorts.len(), workers = self.workers, "Building forecasts");

        let mut results: Vec<(usize, ResortForecast)> = stream::iter(resorts.iter().enumerate())
            .map(|(index, resort)| {
                let cancel = cancel.clone();
                async move {
                    let result = if cancel.is_cancelled() {
                        Err(SnowcastError::Cancelled)
                    } else {
                        self.build_forecast(resort, pipeline).await
                    };
                    if let Err(e) = &result {
                        warn!(resort = %resort.id, "Failed to build forecast: {e}");
                    }
                    (
                        index,
                        ResortForecast {
                            resort_id: resort.id.clone(),
                            result,
                        },
                    )
                }
            })
            .buffer_unordered(self.workers)
            .collect()
            .await;

        results.sort_by_key(|(index, _)| *index);
        results.into_iter().map(|(_, forecast)| forecast).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn builder() -> ForecastBuilder {
        let config = SnowcastConfig::default();
        let fetcher = Fetcher::new(reqwest::Client::new());
        ForecastBuilder::new(ForecastProvider::new(fetcher, &config.forecast), 0)
    }

    async fn remember(builder: &ForecastBuilder, resort_id: &str) {
        builder
            .cell(resort_id)
            .await
            .set(vec![ForecastRecord::unavailable()])
            .unwrap();
    }

    #[tokio::test]
    async fn test_failed_fetch_is_not_memoized() {
        let builder = builder();
        builder.cancellation_token().cancel();
        let resort = Resort::new("vail", "Vail", 39.6, -106.3);

        let result = builder.records(&resort).await;
        assert!(matches!(result, Err(SnowcastError::Cancelled)));
        assert_eq!(builder.memoized().await, 0);
        assert!(!builder.forget("vail").await);
    }

    #[tokio::test]
    async fn test_worker_count_is_at_least_one() {
        assert_eq!(builder().workers, 1);
    }

    #[tokio::test]
    async fn test_memo_forget_and_clear() {
        let builder = builder();
        remember(&builder, "vail").await;
        remember(&builder, "aspen").await;

        let resort = Resort::new("vail", "Vail", 39.6, -106.3);
        let view = builder
            .build_forecast(&resort, &Pipeline::sentence())
            .await
            .unwrap();
        assert_eq!(view.as_sentence(), Some("no snow Today"));

        assert!(builder.forget("vail").await);
        assert!(!builder.forget("vail").await);
        assert_eq!(builder.memoized().await, 1);
        builder.clear().await;
        assert_eq!(builder.memoized().await, 0);
    }

    #[tokio::test]
    async fn test_cancelled_build_all_starts_nothing() {
        let builder = builder();
        builder.cancellation_token().cancel();
        let resorts = vec![
            Resort::new("a", "A", 1.0, 2.0),
            Resort::new("b", "B", 3.0, 4.0),
        ];

        let results = builder.build_all(&resorts, &Pipeline::sentence()).await;
        assert_eq!(results.len(), 2);
        assert_eq!(results[0].resort_id, "a");
        assert!(results
            .iter()
            .all(|forecast| matches!(forecast.result, Err(SnowcastError::Cancelled))));
    }
}
