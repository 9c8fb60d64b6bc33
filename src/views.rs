//! The dashboard's polled views: query builder, upstream fetch, and
//! aggregation wired together for each panel.

use async_trait::async_trait;
use chrono::{Local, NaiveDate};
use serde::Serialize;
use std::sync::{Arc, RwLock};

use crate::aggregate::counts::DetectionSummary;
use crate::aggregate::emissions::DerivedMetrics;
use crate::aggregate::hourly::{
    HourlySeries, TrendPoint, hourly_from_detections, hourly_from_summary, hourly_trend,
};
use crate::dates::Clock;
use crate::directory::CctvDirectory;
use crate::fetch::ApiError;
use crate::models::to_records;
use crate::poller::View;
use crate::query::{DateRange, FilterSelection, build_query};
use crate::services::DetectionApi;

/// Totals, IN/OUT split, and emission figures for one date range.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DailyReport {
    pub range: DateRange,
    pub summary: DetectionSummary,
    pub metrics: DerivedMetrics,
}

impl DailyReport {
    pub fn new(range: DateRange, summary: DetectionSummary) -> Self {
        let metrics = DerivedMetrics::from_counts(&summary.counts);
        Self {
            range,
            summary,
            metrics,
        }
    }
}

async fn daily_report(
    api: &dyn DetectionApi,
    filter: &FilterSelection,
    range: DateRange,
) -> Result<DailyReport, ApiError> {
    let params = build_query(filter, &range);
    let rows = api.summary_daily(&params).await?;
    let summary = DetectionSummary::from_records(&to_records(&rows));
    Ok(DailyReport::new(range, summary))
}

/// Pre-aggregated totals over the selected date range.
pub struct TodaySummaryView {
    api: Arc<dyn DetectionApi>,
}

impl TodaySummaryView {
    pub fn new(api: Arc<dyn DetectionApi>) -> Self {
        Self { api }
    }
}

#[async_trait]
impl View for TodaySummaryView {
    type Output = DailyReport;

    fn name(&self) -> &'static str {
        "today_summary"
    }

    async fn load(&self, filter: &FilterSelection) -> Result<DailyReport, ApiError> {
        daily_report(self.api.as_ref(), filter, filter.date_range).await
    }
}

/// Pre-aggregated totals for the day before the clock's today, with the
/// selection's dimension filters.
pub struct YesterdaySummaryView {
    api: Arc<dyn DetectionApi>,
    clock: Arc<dyn Clock>,
}

impl YesterdaySummaryView {
    pub fn new(api: Arc<dyn DetectionApi>, clock: Arc<dyn Clock>) -> Self {
        Self { api, clock }
    }
}

#[async_trait]
impl View for YesterdaySummaryView {
    type Output = DailyReport;

    fn name(&self) -> &'static str {
        "yesterday_summary"
    }

    async fn load(&self, filter: &FilterSelection) -> Result<DailyReport, ApiError> {
        let range = DateRange::single(self.clock.yesterday());
        daily_report(self.api.as_ref(), filter, range).await
    }
}

/// Server-bucketed hourly counts for one day.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HourlyChart {
    pub day: NaiveDate,
    pub series: HourlySeries,
}

/// Hourly chart of the selection's first day, from `summary_hourly`.
pub struct HourlyChartView {
    api: Arc<dyn DetectionApi>,
}

impl HourlyChartView {
    pub fn new(api: Arc<dyn DetectionApi>) -> Self {
        Self { api }
    }
}

#[async_trait]
impl View for HourlyChartView {
    type Output = HourlyChart;

    fn name(&self) -> &'static str {
        "hourly_chart"
    }

    async fn load(&self, filter: &FilterSelection) -> Result<HourlyChart, ApiError> {
        let day = filter.date_range.start;
        let params = build_query(filter, &DateRange::single(day));
        let rows = self.api.summary_hourly(&params).await?;
        Ok(HourlyChart {
            day,
            series: hourly_from_summary(&rows),
        })
    }
}

/// Raw detections over a range: totals plus a local-time trend.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RawTrend {
    pub report: DailyReport,
    /// Hourly buckets of the range's first day, local time.
    pub first_day: HourlySeries,
    /// Sparse (day, hour) points across the whole range, local time.
    pub trend: Vec<TrendPoint>,
}

/// Multi-day trend from the raw `/api/detections/` feed.
pub struct RawTrendView {
    api: Arc<dyn DetectionApi>,
}

impl RawTrendView {
    pub fn new(api: Arc<dyn DetectionApi>) -> Self {
        Self { api }
    }
}

#[async_trait]
impl View for RawTrendView {
    type Output = RawTrend;

    fn name(&self) -> &'static str {
        "raw_trend"
    }

    async fn load(&self, filter: &FilterSelection) -> Result<RawTrend, ApiError> {
        let range = filter.date_range;
        let params = build_query(filter, &range);
        let rows = self.api.detections(&params).await?;

        let summary = DetectionSummary::from_records(&to_records(&rows));
        Ok(RawTrend {
            report: DailyReport::new(range, summary),
            first_day: hourly_from_detections(&rows, &Local, Some(range.start)),
            trend: hourly_trend(&rows, &Local),
        })
    }
}

/// Loads the CCTV list into the shared directory.
pub struct CctvDirectoryView {
    api: Arc<dyn DetectionApi>,
    directory: Arc<RwLock<CctvDirectory>>,
}

impl CctvDirectoryView {
    pub fn new(api: Arc<dyn DetectionApi>, directory: Arc<RwLock<CctvDirectory>>) -> Self {
        Self { api, directory }
    }
}

#[async_trait]
impl View for CctvDirectoryView {
    type Output = CctvDirectory;

    fn name(&self) -> &'static str {
        "cctv_directory"
    }

    async fn load(&self, _filter: &FilterSelection) -> Result<CctvDirectory, ApiError> {
        let entries = self.api.cctv_list().await?;
        let mut directory = self
            .directory
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        directory.apply(entries);
        Ok(directory.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dates::FixedClock;
    use crate::models::{AggregatedDetectionRecord, CctvEntry, DetectionRecord, HourlySummaryRecord};
    use crate::query::QueryParams;
    use std::sync::Mutex;

    /// Records the params of every call and replies with canned rows.
    #[derive(Default)]
    struct RecordingApi {
        seen: Mutex<Vec<(&'static str, QueryParams)>>,
        daily: Vec<AggregatedDetectionRecord>,
        hourly: Vec<HourlySummaryRecord>,
        raw: Vec<DetectionRecord>,
    }

    #[async_trait]
    impl DetectionApi for RecordingApi {
        async fn detections(&self, params: &QueryParams) -> Result<Vec<DetectionRecord>, ApiError> {
            self.seen.lock().unwrap().push(("detections", params.clone()));
            Ok(self.raw.clone())
        }

        async fn summary_daily(
            &self,
            params: &QueryParams,
        ) -> Result<Vec<AggregatedDetectionRecord>, ApiError> {
            self.seen.lock().unwrap().push(("daily", params.clone()));
            Ok(self.daily.clone())
        }

        async fn summary_hourly(
            &self,
            params: &QueryParams,
        ) -> Result<Vec<HourlySummaryRecord>, ApiError> {
            self.seen.lock().unwrap().push(("hourly", params.clone()));
            Ok(self.hourly.clone())
        }

        async fn cctv_list(&self) -> Result<Vec<CctvEntry>, ApiError> {
            Ok(vec![CctvEntry {
                id: 1,
                name: "CAM.A".to_string(),
                location: "Gerbang".to_string(),
                ..Default::default()
            }])
        }
    }

    #[tokio::test]
    async fn test_today_view_aggregates_summary_daily() {
        let api = Arc::new(RecordingApi {
            daily: vec![
                agg("Mobil", "IN", 3),
                agg("Mobil", "OUT", 2),
                agg("Motor", "IN", 10),
            ],
            ..Default::default()
        });
        let view = TodaySummaryView::new(api.clone());

        let report = view.load(&selection()).await.unwrap();

        assert_eq!(report.summary.count_of("Mobil"), 5);
        assert_eq!(report.metrics.pollution_points, 20);
        assert_eq!(report.metrics.co_total_grams, 400);

        let seen = api.seen.lock().unwrap();
        assert_eq!(seen[0].0, "daily");
        assert_eq!(seen[0].1.get("start_date"), Some("2025-07-08"));
        assert_eq!(seen[0].1.get("cctv_name"), None);
    }

    #[tokio::test]
    async fn test_yesterday_view_uses_clock() {
        let api = Arc::new(RecordingApi::default());
        let clock = Arc::new(FixedClock::on(NaiveDate::from_ymd_opt(2025, 7, 1).unwrap()));
        let view = YesterdaySummaryView::new(api.clone(), clock);

        let mut filter = selection();
        filter.vehicle_type = "Bus".to_string();
        let report = view.load(&filter).await.unwrap();

        assert_eq!(report.range, DateRange::single(NaiveDate::from_ymd_opt(2025, 6, 30).unwrap()));
        let seen = api.seen.lock().unwrap();
        assert_eq!(seen[0].1.get("end_date"), Some("2025-06-30"));
        assert_eq!(seen[0].1.get("vehicle_type"), Some("Bus"));
    }

    #[tokio::test]
    async fn test_hourly_view_queries_single_start_day() {
        let api = Arc::new(RecordingApi {
            hourly: vec![HourlySummaryRecord {
                hour: "2025-07-08T09:00:00Z".to_string(),
                vehicle_type: "Truk".to_string(),
                count: 4,
                ..Default::default()
            }],
            ..Default::default()
        });
        let view = HourlyChartView::new(api.clone());

        let mut filter = selection();
        filter.date_range = DateRange::new(
            NaiveDate::from_ymd_opt(2025, 7, 8).unwrap(),
            NaiveDate::from_ymd_opt(2025, 7, 10).unwrap(),
        );
        let chart = view.load(&filter).await.unwrap();

        assert_eq!(chart.series.buckets.len(), 24);
        assert_eq!(chart.series.bucket(9).unwrap().counts["Truk"], 4);
        let seen = api.seen.lock().unwrap();
        assert_eq!(seen[0].1.get("end_date"), Some("2025-07-08"));
    }

    #[tokio::test]
    async fn test_raw_trend_counts_each_detection_once() {
        let api = Arc::new(RecordingApi {
            raw: vec![
                raw("2025-07-08T12:10:00", "Motor", "IN"),
                raw("2025-07-08T12:20:00", "Motor", "OUT"),
                raw("2025-07-08T13:00:00", "Becak", "IN"),
            ],
            ..Default::default()
        });
        let view = RawTrendView::new(api);

        let trend = view.load(&selection()).await.unwrap();

        assert_eq!(trend.report.summary.count_of("Motor"), 2);
        assert_eq!(trend.report.summary.total_overall, 3);
        assert_eq!(trend.first_day.bucket(12).unwrap().counts["Motor"], 2);
        assert_eq!(trend.first_day.total(), 2);
        assert_eq!(trend.trend.len(), 2);
    }

    #[tokio::test]
    async fn test_cctv_view_updates_shared_directory() {
        let directory = Arc::new(RwLock::new(CctvDirectory::default()));
        let view = CctvDirectoryView::new(Arc::new(RecordingApi::default()), directory.clone());

        let loaded = view.load(&selection()).await.unwrap();

        assert_eq!(loaded.stream_selection(), Some("CAM.A"));
        assert_eq!(directory.read().unwrap().entries().len(), 1);
    }

    // Helper functions for tests
    fn selection() -> FilterSelection {
        FilterSelection::unfiltered(DateRange::single(NaiveDate::from_ymd_opt(2025, 7, 8).unwrap()))
    }

    fn agg(vehicle_type: &str, direction: &str, count: u64) -> AggregatedDetectionRecord {
        AggregatedDetectionRecord {
            cctv_name: "CAM.A".to_string(),
            direction: direction.to_string(),
            vehicle_type: vehicle_type.to_string(),
            count,
        }
    }

    fn raw(timestamp: &str, vehicle_type: &str, direction: &str) -> DetectionRecord {
        DetectionRecord {
            timestamp: timestamp.to_string(),
            cctv_name: "CAM.A".to_string(),
            vehicle_type: vehicle_type.to_string(),
            direction: direction.to_string(),
        }
    }
}
