//! `snowcast` - Ski resort snow forecasts
//!
//! This library provides a persistent, rule-driven HTTP response cache with
//! bounded retries, and a composable pipeline that turns raw forecast periods
//! into merged, unit-converted and rendered summaries.

pub mod builder;
pub mod cache;
pub mod config;
pub mod error;
pub mod http;
pub mod logging;
pub mod models;
pub mod pipeline;
pub mod weather;

// Re-export core types for public API
pub use builder::{ForecastBuilder, ResortForecast};
pub use cache::{CacheEntry, ResponseStore};
pub use config::SnowcastConfig;
pub use error::SnowcastError;
pub use http::{FetchRequest, Fetcher, RetryPolicy};
pub use models::{ForecastRecord, Range, Resort, TimeOfDay, UnitSystem};
pub use pipeline::{ForecastView, Pipeline, Renderer, Stage};
pub use weather::ForecastProvider;

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Core result type used throughout the library
pub type Result<T> = std::result::Result<T, SnowcastError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version_is_set() {
        assert!(!VERSION.is_empty());
    }
}
