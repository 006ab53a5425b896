//! Closed numeric interval used for every forecast quantity

use serde::{Deserialize, Serialize};

/// Forecast uncertainty as a closed interval `[low, high]`.
///
/// Point measurements from upstream are stored either as `point(v)` or,
/// for accumulations such as snow, as `up_to(v)`.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Range {
    pub low: f64,
    pub high: f64,
}

impl Range {
    #[must_use]
    pub fn new(low: f64, high: f64) -> Self {
        Self { low, high }
    }

    #[must_use]
    pub fn zero() -> Self {
        Self::default()
    }

    /// `low = high = value`
    #[must_use]
    pub fn point(value: f64) -> Self {
        Self::new(value, value)
    }

    /// `low = 0, high = value`
    #[must_use]
    pub fn up_to(value: f64) -> Self {
        Self::new(0.0, value)
    }

    #[must_use]
    pub fn is_zero(&self) -> bool {
        self.low == 0.0 && self.high == 0.0
    }

    /// Combines two sub-periods: at least the larger of the lows,
    /// at most both highs accumulated.
    #[must_use]
    pub fn combine(self, other: Range) -> Range {
        Range::new(self.low.max(other.low), self.high + other.high)
    }

    /// `[max(lows), sum(highs)]` over any number of sub-periods.
    /// An empty input merges to zero.
    pub fn merge_all<I: IntoIterator<Item = Range>>(ranges: I) -> Range {
        ranges
            .into_iter()
            .reduce(Range::combine)
            .unwrap_or_default()
    }

    /// Applies `f` to both ends.
    #[must_use]
    pub fn map(self, f: impl Fn(f64) -> f64) -> Range {
        Range::new(f(self.low), f(self.high))
    }
}

/// Formats an amount the way it is shown to readers: at most two decimals,
/// no trailing `.0` for whole numbers.
#[must_use]
pub fn format_amount(value: f64) -> String {
    let rounded = (value * 100.0).round() / 100.0;
    if rounded.fract() == 0.0 {
        format!("{rounded:.0}")
    } else {
        format!("{rounded}")
    }
}
