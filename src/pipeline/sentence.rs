//! Natural-language snow summary

use super::{ForecastView, Renderer};
use crate::models::{ForecastRecord, format_amount};

/// Only the first two zero-snow entries are narrated; later ones are dropped.
const NO_SNOW_POSITIONS: usize = 2;

/// Folds records into a sentence such as `2-4" of snow 03/01 and no snow 03/02`.
#[derive(Debug, Clone, Copy, Default)]
pub struct SentenceRenderer {
    limit: Option<usize>,
}

impl SentenceRenderer {
    /// Narrates only the first `n` records ("today/tonight" views use 2).
    #[must_use]
    pub fn first(n: usize) -> Self {
        Self { limit: Some(n) }
    }

    #[must_use]
    pub fn all() -> Self {
        Self { limit: None }
    }

    #[must_use]
    pub fn sentence(&self, records: &[ForecastRecord]) -> String {
        let limit = self.limit.unwrap_or(records.len());
        let phrases: Vec<String> = records
            .iter()
            .take(limit)
            .enumerate()
            .filter_map(|(index, record)| phrase(index, record))
            .collect();
        to_sentence(&phrases)
    }
}

fn phrase(index: usize, record: &ForecastRecord) -> Option<String> {
    let label = record.time_of_day.date_label();
    let snow = record.snow;

    if snow.high == 0.0 {
        (index < NO_SNOW_POSITIONS).then(|| format!("no snow {label}"))
    } else if snow.high == 1.0 {
        Some(format!("<1\" of snow {label}"))
    } else {
        Some(format!(
            "{}-{}\" of snow {label}",
            format_amount(snow.low),
            format_amount(snow.high)
        ))
    }
}

/// `a`, `a and b`, `a, b, and c`.
#[must_use]
pub fn to_sentence(parts: &[String]) -> String {
    match parts {
        [] => String::new(),
        [only] => only.clone(),
        [first, second] => format!("{first} and {second}"),
        [rest @ .., last] => format!("{}, and {last}", rest.join(", ")),
    }
}

impl Renderer for SentenceRenderer {
    fn render(&self, records: &[ForecastRecord]) -> ForecastView {
        ForecastView::Sentence(self.sentence(records))
    }
}
