// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Marked dates, range selection and coverage statistics.

use crate::time_utils::{date_key, parse_date_key};
use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
#[cfg(feature = "binding-generation")]
use ts_rs::TS;

/// Per-user map from date key (`M/D/YYYY`) to marked flag.
///
/// A missing key means "not marked".
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
#[serde(transparent)]
pub struct MarkedDates(BTreeMap<String, bool>);

impl MarkedDates {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_marked(&self, date: NaiveDate) -> bool {
        self.is_marked_key(&date_key(date))
    }

    pub fn is_marked_key(&self, key: &str) -> bool {
        self.0.get(key).copied().unwrap_or(false)
    }

    /// Flip the flag for `date` and return the new value.
    ///
    /// The key is always written, so un-marking stores `false` rather than
    /// removing the entry.
    pub fn toggle(&mut self, date: NaiveDate) -> bool {
        let key = date_key(date);
        let marked = !self.is_marked_key(&key);
        self.0.insert(key, marked);
        marked
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &bool)> {
        self.0.iter()
    }

    /// Days flagged `true`, skipping keys that are not in canonical
    /// `M/D/YYYY` form (a day-by-day lookup would never hit those).
    pub fn marked_days(&self) -> impl Iterator<Item = NaiveDate> + '_ {
        self.iter()
            .filter(|(_, marked)| **marked)
            .filter_map(|(key, _)| parse_date_key(key).filter(|day| date_key(*day) == *key))
    }
}

impl FromIterator<(String, bool)> for MarkedDates {
    fn from_iter<I: IntoIterator<Item = (String, bool)>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

/// Inclusive date range picked in range-selection mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct SelectedRange {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl SelectedRange {
    /// `None` when `start` is after `end`.
    pub fn new(start: NaiveDate, end: NaiveDate) -> Option<Self> {
        (start <= end).then_some(Self { start, end })
    }

    pub fn contains(&self, day: NaiveDate) -> bool {
        self.start <= day && day <= self.end
    }

    /// Number of days, both endpoints included.
    pub fn total_days(&self) -> u32 {
        let days = (self.end - self.start).num_days() + 1;
        u32::try_from(days).unwrap_or(u32::MAX)
    }
}

/// Coverage of a range by marked dates.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
#[serde(rename_all = "camelCase")]
pub struct Statistics {
    pub marked_count: u32,
    pub total_days: u32,
    /// Percentage of marked days, one decimal place (e.g. "66.7")
    pub percentage: String,
}

/// Count marked days over an inclusive range.
///
/// Returns `None` when there is no complete range to measure.
pub fn compute_statistics(
    marked: &MarkedDates,
    range: Option<&SelectedRange>,
) -> Option<Statistics> {
    let range = range?;

    // The map is small and the range can span millennia, so count from the
    // map side.
    let marked_count = marked
        .marked_days()
        .filter(|day| range.contains(*day))
        .count();
    let marked_count = u32::try_from(marked_count).unwrap_or(u32::MAX);
    let total_days = range.total_days();

    let percentage = f64::from(marked_count) / f64::from(total_days) * 100.0;
    Some(Statistics {
        marked_count,
        total_days,
        percentage: format_percentage(percentage),
    })
}

/// One decimal place with halves rounded up (6.25 -> "6.3").
fn format_percentage(value: f64) -> String {
    format!("{:.1}", (value * 10.0).round() / 10.0)
}

/// One day cell of the month grid.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct DayTile {
    pub date: NaiveDate,
    pub key: String,
    pub marked: bool,
}

/// Tiles for every day in the month containing `cursor`.
pub fn month_tiles(cursor: NaiveDate, marked: &MarkedDates) -> Vec<DayTile> {
    let Some(first) = cursor.with_day(1) else {
        return Vec::new();
    };

    first
        .iter_days()
        .take_while(|day| day.month() == first.month())
        .map(|date| {
            let key = date_key(date);
            DayTile {
                marked: marked.is_marked_key(&key),
                date,
                key,
            }
        })
        .collect()
}
