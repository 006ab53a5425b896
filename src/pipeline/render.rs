//! Row renderers: compact emoji tokens, short table cells and dual-unit HTML fragments

use super::{ForecastView, RenderedRecord, Renderer};
use crate::models::{ForecastRecord, Range, TimeOfDay, format_amount};
use chrono::{Local, NaiveDate};

fn icon_for(short: &str) -> &'static str {
    let short = short.to_lowercase();
    if short.contains("snow") {
        "❄️"
    } else if short.contains("sunny") {
        "☀️"
    } else if short.contains("cloud") {
        "☁️"
    } else {
        "⛅️"
    }
}

/// Escapes text for an element body.
fn escape_html(text: &str) -> String {
    html_escape::encode_text(text).into_owned()
}

/// `🚫` for nothing, `<N"` when the low end is zero, `a-b"` otherwise.
#[must_use]
pub fn emoji_snow(snow: Range) -> String {
    if snow.is_zero() {
        "🚫".to_string()
    } else if snow.low == 0.0 {
        format!("<{}\"", format_amount(snow.high))
    } else {
        format!("{}-{}\"", format_amount(snow.low), format_amount(snow.high))
    }
}

/// Like [`emoji_snow`] but spelled out as `0"` when nothing falls.
#[must_use]
pub fn short_snow(snow: Range) -> String {
    if snow.is_zero() {
        "0\"".to_string()
    } else if snow.low == 0.0 {
        format!("<{}\"", format_amount(snow.high))
    } else {
        format!("{}-{}\"", format_amount(snow.low), format_amount(snow.high))
    }
}

/// Centimeters, or millimeters when the amount would show as less than 1 cm.
#[must_use]
pub fn inches_to_metric(inches: f64) -> String {
    let cm = inches * 2.54;
    if cm < 1.0 && cm != 0.0 {
        format!("{} mm", format_amount(cm * 10.0))
    } else {
        format!("{} cm", format_amount(cm))
    }
}

fn dual(imperial: String, metric: String) -> String {
    format!(r#"<span class="imperial">{imperial}</span><span class="metric">{metric}</span>"#)
}

fn weekday(time_of_day: &TimeOfDay) -> String {
    match time_of_day.date() {
        Some(date) => date.format("%a").to_string(),
        None => time_of_day.date_label(),
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct EmojiRenderer;

impl Renderer for EmojiRenderer {
    fn render(&self, records: &[ForecastRecord]) -> ForecastView {
        ForecastView::Rows(
            records
                .iter()
                .map(|record| RenderedRecord {
                    time_of_day: record.time_of_day.date_label(),
                    name: record.name.clone(),
                    short: record.short.clone(),
                    icon: icon_for(&record.short).to_string(),
                    snow: emoji_snow(record.snow),
                    ..RenderedRecord::default()
                })
                .collect(),
        )
    }
}

/// Table cells with "Today"/"Tomorrow"/weekday labels relative to `today`.
#[derive(Debug, Clone, Copy)]
pub struct ShortRenderer {
    today: NaiveDate,
}

impl Default for ShortRenderer {
    fn default() -> Self {
        Self::new(Local::now().date_naive())
    }
}

impl ShortRenderer {
    #[must_use]
    pub fn new(today: NaiveDate) -> Self {
        Self { today }
    }

    fn day_label(&self, time_of_day: &TimeOfDay) -> String {
        match time_of_day.date() {
            Some(date) if date == self.today => "Today".to_string(),
            Some(date) if self.today.succ_opt() == Some(date) => "Tomorrow".to_string(),
            _ => weekday(time_of_day),
        }
    }
}

impl Renderer for ShortRenderer {
    fn render(&self, records: &[ForecastRecord]) -> ForecastView {
        ForecastView::Rows(
            records
                .iter()
                .map(|record| {
                    let speed = format!("{} mph", format_amount(record.wind_speed.high));
                    RenderedRecord {
                        time_of_day: self.day_label(&record.time_of_day),
                        name: record.name.clone(),
                        short: record.short.clone(),
                        icon: icon_for(&record.short).to_string(),
                        snow: short_snow(record.snow),
                        temp: format!("{}°F", format_amount(record.temp.high)),
                        wind_speed: if record.wind_direction.is_empty() {
                            speed
                        } else {
                            format!("{} {speed}", record.wind_direction)
                        },
                        wind_gust: format!("{} mph", format_amount(record.wind_gust.high)),
                    }
                })
                .collect(),
        )
    }
}

/// Imperial and metric `<span>` pairs; the page decides which one to show.
#[derive(Debug, Clone, Copy, Default)]
pub struct DualUnitRenderer;

impl DualUnitRenderer {
    fn snow(snow: Range) -> String {
        if snow.is_zero() {
            dual("0\"".to_string(), "0 cm".to_string())
        } else if snow.low == 0.0 {
            dual(
                format!("{}\"", format_amount(snow.high)),
                inches_to_metric(snow.high),
            )
        } else {
            dual(
                format!("{}-{}\"", format_amount(snow.low), format_amount(snow.high)),
                format!(
                    "{}-{}",
                    inches_to_metric(snow.low),
                    inches_to_metric(snow.high)
                ),
            )
        }
    }

    fn speed(mph: f64) -> String {
        dual(
            format!("{} mph", format_amount(mph)),
            format!("{} kph", format_amount(mph * 1.609_34)),
        )
    }
}

impl Renderer for DualUnitRenderer {
    fn render(&self, records: &[ForecastRecord]) -> ForecastView {
        ForecastView::Rows(
            records
                .iter()
                .map(|record| {
                    let fahrenheit = record.temp.high;
                    let celsius = (fahrenheit - 32.0) * 5.0 / 9.0;
                    RenderedRecord {
                        time_of_day: weekday(&record.time_of_day),
                        name: escape_html(&record.name),
                        short: escape_html(&record.short),
                        icon: icon_for(&record.short).to_string(),
                        snow: Self::snow(record.snow),
                        temp: dual(
                            format!("{} °F", format_amount(fahrenheit)),
                            format!("{} °C", format_amount(celsius)),
                        ),
                        wind_speed: format!(
                            "{} {}",
                            escape_html(&record.wind_direction),
                            Self::speed(record.wind_speed.high)
                        ),
                        wind_gust: Self::speed(record.wind_gust.high),
                    }
                })
                .collect(),
        )
    }
}
