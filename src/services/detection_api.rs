//! Trait for the upstream detection/aggregation service.

use async_trait::async_trait;

use crate::fetch::ApiError;
use crate::models::{AggregatedDetectionRecord, CctvEntry, DetectionRecord, HourlySummaryRecord};
use crate::query::QueryParams;

/// Upstream endpoint paths, relative to the detection API base URL.
pub mod paths {
    pub const DETECTIONS: &str = "/api/detections/";
    pub const SUMMARY_DAILY: &str = "/api/detection/summary_daily/";
    pub const SUMMARY_HOURLY: &str = "/api/detection/summary_hourly/";
    pub const CCTV: &str = "/api/cctv/";
}

/// Abstraction over the detection API so views can be driven by a fake in
/// tests.
///
/// Omitted query parameters mean "unfiltered" on the server side.
#[async_trait]
pub trait DetectionApi: Send + Sync {
    /// Raw detection events matching `params`.
    async fn detections(&self, params: &QueryParams) -> Result<Vec<DetectionRecord>, ApiError>;

    /// Per (cctv, direction, vehicle type) totals over the date range.
    async fn summary_daily(
        &self,
        params: &QueryParams,
    ) -> Result<Vec<AggregatedDetectionRecord>, ApiError>;

    /// Server-bucketed hourly totals.
    async fn summary_hourly(
        &self,
        params: &QueryParams,
    ) -> Result<Vec<HourlySummaryRecord>, ApiError>;

    /// Every configured camera.
    async fn cctv_list(&self) -> Result<Vec<CctvEntry>, ApiError>;
}
