//! Hour-of-day bucketing for the detection chart.
//!
//! Two paths exist and must not be mixed. Raw detections are bucketed by the
//! viewer's wall-clock hour. Rows from `summary_hourly` were already bucketed
//! by the server, so their hour is read in UTC to avoid shifting them twice.

use chrono::{DateTime, NaiveDate, NaiveDateTime, TimeZone, Timelike, Utc};
use serde::Serialize;
use std::collections::BTreeMap;
use tracing::debug;

use crate::aggregate::counts::saturating_total;
use crate::aggregate::vehicle::VehicleType;
use crate::models::{DetectionRecord, HourlySummaryRecord};

pub const HOURS_PER_DAY: u32 = 24;

/// Label used on the chart's x-axis, e.g. `"07:00"`.
pub fn hour_label(hour: u32) -> String {
    format!("{hour:02}:00")
}

/// Parses an upstream ISO timestamp into `tz`.
///
/// Timestamps with an offset are converted; timestamps without one are read
/// as wall-clock time in `tz`.
pub fn parse_timestamp<Tz: TimeZone>(value: &str, tz: &Tz) -> Option<DateTime<Tz>> {
    let value = value.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(value) {
        return Some(dt.with_timezone(tz));
    }

    const NAIVE_FORMATS: &[&str] = &["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M"];
    NAIVE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(value, fmt).ok())
        .and_then(|naive| tz.from_local_datetime(&naive).earliest())
}

/// One x-axis point of the hourly chart.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HourlyBucket {
    pub label: String,
    pub hour: u32,
    pub counts: BTreeMap<String, u64>,
}

/// A full day of hourly buckets, always 24 of them, `00:00` through `23:00`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HourlySeries {
    pub buckets: Vec<HourlyBucket>,
}

impl Default for HourlySeries {
    fn default() -> Self {
        Self::empty()
    }
}

impl HourlySeries {
    /// 24 buckets with every charted vehicle type at zero.
    pub fn empty() -> Self {
        let buckets = (0..HOURS_PER_DAY)
            .map(|hour| HourlyBucket {
                label: hour_label(hour),
                hour,
                counts: VehicleType::CHART
                    .iter()
                    .map(|v| (v.as_str().to_string(), 0))
                    .collect(),
            })
            .collect();
        Self { buckets }
    }

    /// Adds `count` to `vehicle_type` at `hour`. Types without a chart series
    /// are ignored.
    fn add(&mut self, hour: u32, vehicle_type: &str, count: u64) {
        if !VehicleType::is_charted(vehicle_type) {
            return;
        }
        if let Some(bucket) = self.buckets.get_mut(hour as usize) {
            let slot = bucket.counts.entry(vehicle_type.to_string()).or_default();
            *slot = slot.saturating_add(count);
        }
    }

    pub fn bucket(&self, hour: u32) -> Option<&HourlyBucket> {
        self.buckets.get(hour as usize)
    }

    /// Sum of one vehicle type across the day.
    pub fn total_for(&self, vehicle_type: &str) -> u64 {
        saturating_total(self.buckets.iter().filter_map(|b| b.counts.get(vehicle_type)))
    }

    pub fn total(&self) -> u64 {
        saturating_total(self.buckets.iter().flat_map(|b| b.counts.values()))
    }
}

/// Buckets raw detections by their wall-clock hour in `tz`.
///
/// When `day` is given, detections whose UTC calendar date differs from it
/// are skipped, even though the bucket hour is read in `tz`. Unparseable
/// timestamps are skipped.
pub fn hourly_from_detections<Tz: TimeZone>(
    records: &[DetectionRecord],
    tz: &Tz,
    day: Option<NaiveDate>,
) -> HourlySeries {
    let mut series = HourlySeries::empty();
    let mut skipped = 0usize;

    for record in records {
        let Some(at) = parse_timestamp(&record.timestamp, tz) else {
            skipped += 1;
            continue;
        };
        if day.is_some_and(|d| at.naive_utc().date() != d) {
            continue;
        }
        series.add(at.hour(), &record.vehicle_type, 1);
    }

    if skipped > 0 {
        debug!(skipped, "Detections with unparseable timestamps dropped");
    }
    series
}

/// Buckets server-side hourly rows by their UTC hour.
pub fn hourly_from_summary(records: &[HourlySummaryRecord]) -> HourlySeries {
    let mut series = HourlySeries::empty();
    let mut skipped = 0usize;

    for record in records {
        match parse_timestamp(&record.hour, &Utc) {
            Some(at) => series.add(at.hour(), &record.vehicle_type, record.count),
            None => skipped += 1,
        }
    }

    if skipped > 0 {
        debug!(skipped, "Hourly rows with unparseable hour dropped");
    }
    series
}

/// One point of the multi-day trend chart.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TrendPoint {
    pub date: NaiveDate,
    pub label: String,
    pub counts: BTreeMap<String, u64>,
}

/// Groups raw detections by (day, hour) in `tz`.
///
/// Only hours that saw at least one detection appear, in chronological order.
/// Each point lists every vehicle type present anywhere in the input.
pub fn hourly_trend<Tz: TimeZone>(records: &[DetectionRecord], tz: &Tz) -> Vec<TrendPoint> {
    let mut seen_types: Vec<&str> = records.iter().map(|r| r.vehicle_type.as_str()).collect();
    seen_types.sort_unstable();
    seen_types.dedup();

    let mut points: BTreeMap<(NaiveDate, u32), BTreeMap<String, u64>> = BTreeMap::new();
    for record in records {
        let Some(at) = parse_timestamp(&record.timestamp, tz) else {
            continue;
        };
        let counts = points.entry((at.date_naive(), at.hour())).or_insert_with(|| {
            seen_types.iter().map(|v| (v.to_string(), 0)).collect()
        });
        *counts.entry(record.vehicle_type.clone()).or_default() += 1;
    }

    points
        .into_iter()
        .map(|((date, hour), counts)| TrendPoint {
            date,
            label: hour_label(hour),
            counts,
        })
        .collect()
}
