//! Composable aggregation over parsed forecast records
//!
//! A [`Pipeline`] is an ordered list of [`Stage`]s applied left to right, followed by a
//! single [`Renderer`] that turns the final sequence into a [`ForecastView`]. Stages never
//! mutate their input; each one hands a new sequence to the next.

use crate::models::ForecastRecord;
use serde::Serialize;
use std::fmt::{self, Display};
use std::sync::Arc;

pub mod localize;
pub mod merge;
pub mod render;
pub mod sentence;

pub use localize::UnitLocalize;
pub use merge::{DailyMerge, PairwiseCombine};
pub use render::{DualUnitRenderer, EmojiRenderer, ShortRenderer};
pub use sentence::SentenceRenderer;

/// One transformation of a record sequence.
pub trait Stage: Send + Sync {
    fn transform(&self, records: Vec<ForecastRecord>) -> Vec<ForecastRecord>;

    fn name(&self) -> &str {
        std::any::type_name::<Self>()
    }
}

impl<F> Stage for F
where
    F: Fn(Vec<ForecastRecord>) -> Vec<ForecastRecord> + Send + Sync,
{
    fn transform(&self, records: Vec<ForecastRecord>) -> Vec<ForecastRecord> {
        self(records)
    }
}

/// Terminal step producing what the page templates consume.
pub trait Renderer: Send + Sync {
    fn render(&self, records: &[ForecastRecord]) -> ForecastView;
}

/// Display-ready strings for one record.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
pub struct RenderedRecord {
    pub time_of_day: String,
    pub name: String,
    pub short: String,
    pub icon: String,
    pub snow: String,
    pub temp: String,
    pub wind_speed: String,
    pub wind_gust: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum ForecastView {
    Sentence(String),
    Rows(Vec<RenderedRecord>),
}

impl ForecastView {
    #[must_use]
    pub fn as_sentence(&self) -> Option<&str> {
        match self {
            ForecastView::Sentence(sentence) => Some(sentence),
            ForecastView::Rows(_) => None,
        }
    }

    #[must_use]
    pub fn rows(&self) -> &[RenderedRecord] {
        match self {
            ForecastView::Sentence(_) => &[],
            ForecastView::Rows(rows) => rows,
        }
    }
}

impl Display for ForecastView {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ForecastView::Sentence(sentence) => write!(f, "{sentence}"),
            ForecastView::Rows(rows) => {
                for row in rows {
                    writeln!(
                        f,
                        "{:<10} {} {:<8} {:>6} {}",
                        row.time_of_day, row.icon, row.snow, row.temp, row.wind_speed
                    )?;
                }
                Ok(())
            }
        }
    }
}

#[derive(Clone)]
pub struct Pipeline {
    stages: Vec<Arc<dyn Stage>>,
    renderer: Arc<dyn Renderer>,
}

impl fmt::Debug for Pipeline {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Pipeline")
            .field(
                "stages",
                &self.stages.iter().map(|stage| stage.name()).collect::<Vec<_>>(),
            )
            .finish_non_exhaustive()
    }
}

impl Pipeline {
    pub fn new(renderer: impl Renderer + 'static) -> Self {
        Self {
            stages: Vec::new(),
            renderer: Arc::new(renderer),
        }
    }

    /// Appends a stage to the end of the chain.
    #[must_use]
    pub fn stage(mut self, stage: impl Stage + 'static) -> Self {
        self.stages.push(Arc::new(stage));
        self
    }

    /// Appends an already shared stage.
    #[must_use]
    pub fn shared_stage(mut self, stage: Arc<dyn Stage>) -> Self {
        self.stages.push(stage);
        self
    }

    /// Localized, merged by day, narrated in full.
    #[must_use]
    pub fn sentence() -> Self {
        Self::new(SentenceRenderer::all())
            .stage(UnitLocalize)
            .stage(DailyMerge)
    }

    /// Localized, first two periods of a day combined, narrating only the first two entries.
    #[must_use]
    pub fn today() -> Self {
        Self::new(SentenceRenderer::first(2))
            .stage(UnitLocalize)
            .stage(PairwiseCombine)
    }

    /// Localized, merged by day, compact snow tokens.
    #[must_use]
    pub fn emoji() -> Self {
        Self::new(EmojiRenderer)
            .stage(UnitLocalize)
            .stage(DailyMerge)
    }

    /// Localized, one row per upstream period with relative day labels.
    #[must_use]
    pub fn short() -> Self {
        Self::new(ShortRenderer::default()).stage(UnitLocalize)
    }

    /// Localized, merged by day, imperial and metric side by side.
    #[must_use]
    pub fn dual_unit() -> Self {
        Self::new(DualUnitRenderer)
            .stage(UnitLocalize)
            .stage(DailyMerge)
    }

    #[must_use]
    pub fn stage_names(&self) -> Vec<&str> {
        self.stages.iter().map(|stage| stage.name()).collect()
    }

    /// Runs every stage without rendering.
    #[must_use]
    pub fn transform(&self, records: Vec<ForecastRecord>) -> Vec<ForecastRecord> {
        self.stages
            .iter()
            .fold(records, |records, stage| stage.transform(records))
    }

    #[must_use]
    pub fn run(&self, records: Vec<ForecastRecord>) -> ForecastView {
        let records = self.transform(records);
        self.renderer.render(&records)
    }
}
