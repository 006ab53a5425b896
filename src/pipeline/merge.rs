//! Grouping stages that fold sub-periods of a day into one record

use super::Stage;
use crate::models::{ForecastRecord, Range};

/// One record per run of consecutive records sharing a day.
///
/// Snow becomes `[max(lows), sum(highs)]`. The merged record keeps the first
/// sub-period's `time_of_day` and `name`; everything else comes from the last one.
#[derive(Debug, Clone, Copy, Default)]
pub struct DailyMerge;

impl Stage for DailyMerge {
    fn transform(&self, records: Vec<ForecastRecord>) -> Vec<ForecastRecord> {
        let mut days: Vec<Vec<ForecastRecord>> = Vec::new();

        for record in records {
            match days.last_mut() {
                Some(day) if day[0].time_of_day.day_key() == record.time_of_day.day_key() => {
                    day.push(record);
                }
                _ => days.push(vec![record]),
            }
        }

        days.into_iter().filter_map(merge_day).collect()
    }
}

fn merge_day(mut day: Vec<ForecastRecord>) -> Option<ForecastRecord> {
    if day.len() == 1 {
        return day.pop();
    }

    let snow = Range::merge_all(day.iter().map(|record| record.snow));
    let mut merged = day.pop()?;
    let first = day.into_iter().next()?;
    merged.time_of_day = first.time_of_day;
    merged.name = first.name;
    merged.snow = snow;
    Some(merged)
}

/// Combines only the first two records of each day; later records of that day pass through.
///
/// Days are matched across the whole sequence, not just consecutive runs. The combined
/// record takes the first record's position.
#[derive(Debug, Clone, Copy, Default)]
pub struct PairwiseCombine;

impl Stage for PairwiseCombine {
    fn transform(&self, records: Vec<ForecastRecord>) -> Vec<ForecastRecord> {
        let keys: Vec<String> = records
            .iter()
            .map(|record| record.time_of_day.day_key())
            .collect();

        // index of the first record -> index of its partner
        let mut partners: Vec<Option<usize>> = vec![None; records.len()];
        let mut absorbed = vec![false; records.len()];
        for first in 0..records.len() {
            if absorbed[first] || keys[..first].contains(&keys[first]) {
                continue;
            }
            if let Some(offset) = keys[first + 1..].iter().position(|key| *key == keys[first]) {
                let second = first + 1 + offset;
                partners[first] = Some(second);
                absorbed[second] = true;
            }
        }

        let seconds: Vec<Option<ForecastRecord>> = records
            .iter()
            .enumerate()
            .map(|(i, record)| absorbed[i].then(|| record.clone()))
            .collect();

        records
            .into_iter()
            .enumerate()
            .filter(|(i, _)| !absorbed[*i])
            .map(|(i, first)| match partners[i].and_then(|j| seconds[j].clone()) {
                Some(second) => ForecastRecord {
                    time_of_day: first.time_of_day,
                    name: first.name,
                    snow: first.snow.combine(second.snow),
                    ..second
                },
                None => first,
            })
            .collect()
    }
}
