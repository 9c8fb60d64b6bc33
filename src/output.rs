//! Output for the headless dashboard: structured log lines, JSON, and CSV
//! rows of the summary table.

use anyhow::Result;
use csv::WriterBuilder;
use serde::Serialize;
use std::fmt::Debug;
use std::fs::OpenOptions;
use std::path::Path;
use tracing::{debug, info};

use crate::aggregate::emissions::pollution_points_for;
use crate::aggregate::hourly::HourlySeries;
use crate::dates::{format_range_display, format_ymd};
use crate::views::DailyReport;

/// Logs any value using Rust's debug pretty-print format.
pub fn print_pretty<T: Debug>(value: &T) {
    debug!("{:#?}", value);
}

/// Logs a value as pretty-printed JSON.
pub fn print_json<T: Serialize>(value: &T) -> Result<()> {
    info!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

/// One line per vehicle type plus a totals line, the way the summary table
/// reads.
pub fn log_report(view: &str, report: &DailyReport) {
    let summary = &report.summary;
    let metrics = &report.metrics;

    for (vehicle, total) in &summary.counts {
        let split = summary
            .in_out_by_vehicle
            .get(vehicle)
            .copied()
            .unwrap_or_default();
        info!(
            view,
            vehicle = %vehicle,
            total,
            inbound = split.inbound,
            outbound = split.outbound,
            co_grams = metrics.co_by_vehicle.get(vehicle).copied().unwrap_or(0),
            "Vehicle count"
        );
    }

    info!(
        view,
        period = %format_range_display(&report.range),
        total = summary.total_overall,
        inbound = summary.total_in,
        outbound = summary.total_out,
        pollution_points = metrics.pollution_points,
        level = metrics.level.as_str(),
        label = metrics.level_label,
        icon = metrics.level_icon,
        slider = metrics.slider_position,
        co_total_grams = metrics.co_total_grams,
        "Summary"
    );
}

/// Logs the non-empty hours of a chart series.
pub fn log_series(view: &str, series: &HourlySeries) {
    for bucket in series.buckets.iter().filter(|b| b.counts.values().any(|c| *c > 0)) {
        let counts = bucket
            .counts
            .iter()
            .map(|(k, v)| format!("{k}={v}"))
            .collect::<Vec<_>>()
            .join(" ");
        info!(view, hour = %bucket.label, counts = %counts, "Hourly");
    }
    info!(view, total = series.total(), "Hourly series");
}

/// A row of the exported summary table.
#[derive(Debug, Default, Serialize)]
pub struct SummaryRow {
    pub start_date: String,
    pub end_date: String,
    pub vehicle_type: String,
    pub total: u64,
    #[serde(rename = "in")]
    pub inbound: u64,
    #[serde(rename = "out")]
    pub outbound: u64,
    pub pollution_points: u64,
    pub co_grams: u64,
}

/// Flattens a report into one row per vehicle type that occurred.
pub fn summary_rows(report: &DailyReport) -> Vec<SummaryRow> {
    let start_date = format_ymd(report.range.start);
    let end_date = format_ymd(report.range.end);

    report
        .summary
        .counts
        .iter()
        .map(|(vehicle, total)| {
            let split = report
                .summary
                .in_out_by_vehicle
                .get(vehicle)
                .copied()
                .unwrap_or_default();
            SummaryRow {
                start_date: start_date.clone(),
                end_date: end_date.clone(),
                vehicle_type: vehicle.clone(),
                total: *total,
                inbound: split.inbound,
                outbound: split.outbound,
                pollution_points: pollution_points_for(vehicle, *total),
                co_grams: report.metrics.co_by_vehicle.get(vehicle).copied().unwrap_or(0),
            }
        })
        .collect()
}

/// Appends a [`SummaryRow`] to a CSV file.
///
/// Creates the file with headers if it does not already exist.
pub fn append_record(path: &str, row: &SummaryRow) -> Result<()> {
    let file_exists = Path::new(path).exists();
    debug!(path, file_exists, "Appending CSV record");

    let file = OpenOptions::new().append(true).create(true).open(path)?;

    let mut writer = WriterBuilder::new()
        .has_headers(!file_exists) // IMPORTANT when appending
        .from_writer(file);

    writer.serialize(row)?;
    writer.flush()?;

    Ok(())
}

/// Appends every row of `report`.
pub fn append_report(path: &str, report: &DailyReport) -> Result<usize> {
    let rows = summary_rows(report);
    for row in &rows {
        append_record(path, row)?;
    }
    Ok(rows.len())
}
