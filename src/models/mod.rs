//! Data models for snow forecasts
//!
//! This module contains the core domain models organized by concern:
//! - Range: closed numeric intervals for forecast uncertainty
//! - Forecast: the normalized per-period forecast record
//! - Resort: resort identity and forecast source selection

pub mod forecast;
pub mod range;
pub mod resort;

// Re-export all public types for convenient access
pub use forecast::{ForecastRecord, TimeOfDay, UnitSystem, wind_direction_from_degrees};
pub use range::{Range, format_amount};
pub use resort::{ForecastSource, Resort};
