//! Filter selection and the upstream query builder.
//!
//! The builder only emits parameters that actually constrain the result:
//! "show all" sentinels (`""`, `"All"`, `"Semua"`) are omitted rather than
//! sent literally.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::dates::format_ymd;

/// Values that mean "no filter for this dimension".
const SENTINELS: &[&str] = &["", "All", "Semua"];

fn is_sentinel(value: &str) -> bool {
    SENTINELS.contains(&value.trim())
}

/// Inclusive calendar date range.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateRange {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl DateRange {
    /// Builds a range, swapping the ends if they arrive reversed.
    pub fn new(start: NaiveDate, end: NaiveDate) -> Self {
        if start <= end {
            Self { start, end }
        } else {
            Self { start: end, end: start }
        }
    }

    pub fn single(day: NaiveDate) -> Self {
        Self { start: day, end: day }
    }

    pub fn is_single_day(&self) -> bool {
        self.start == self.end
    }
}

/// The dashboard's current filter state, shared read-only by every view.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FilterSelection {
    /// Vehicle type name, or a sentinel for "all types".
    pub vehicle_type: String,
    /// `"IN"`, `"OUT"`, or anything else for "both directions".
    pub direction: String,
    /// CCTV name (not its location label), or `"All"`.
    pub cctv_name: String,
    pub date_range: DateRange,
}

impl FilterSelection {
    /// A selection that constrains nothing but the dates.
    pub fn unfiltered(date_range: DateRange) -> Self {
        Self {
            vehicle_type: String::new(),
            direction: String::new(),
            cctv_name: "All".to_string(),
            date_range,
        }
    }
}

/// Ordered query parameters, ready to append to a URL.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QueryParams(Vec<(&'static str, String)>);

impl QueryParams {
    pub fn get(&self, key: &str) -> Option<&str> {
        self.0
            .iter()
            .find(|(k, _)| *k == key)
            .map(|(_, v)| v.as_str())
    }

    pub fn keys(&self) -> Vec<&'static str> {
        self.0.iter().map(|(k, _)| *k).collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (*k, v.as_str()))
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    fn push(&mut self, key: &'static str, value: impl Into<String>) {
        self.0.push((key, value.into()));
    }
}

/// Builds the canonical parameter set for `selection` over `range`.
///
/// `range` is passed separately because some views (yesterday's totals, the
/// single-day hourly chart) query dates other than the selection's own.
pub fn build_query(selection: &FilterSelection, range: &DateRange) -> QueryParams {
    let mut params = QueryParams::default();
    params.push("start_date", format_ymd(range.start));
    params.push("end_date", format_ymd(range.end));

    if !is_sentinel(&selection.vehicle_type) {
        params.push("vehicle_type", selection.vehicle_type.trim());
    }

    match selection.direction.trim() {
        d @ ("IN" | "OUT") => params.push("direction", d),
        _ => {}
    }

    if !is_sentinel(&selection.cctv_name) {
        params.push("cctv_name", selection.cctv_name.trim());
    }

    params
}
