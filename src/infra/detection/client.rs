use async_trait::async_trait;
use serde::de::DeserializeOwned;
use tracing::debug;

use crate::fetch::{ApiError, BasicClient, HttpClient, endpoint_url, fetch_json};
use crate::models::{AggregatedDetectionRecord, CctvEntry, DetectionRecord, HourlySummaryRecord};
use crate::query::QueryParams;
use crate::services::detection_api::{DetectionApi, paths};

/// [`DetectionApi`] over HTTP.
pub struct DetectionApiClient<C = BasicClient> {
    base_url: String,
    client: C,
}

impl<C: HttpClient> DetectionApiClient<C> {
    pub fn new(base_url: impl Into<String>, client: C) -> Self {
        Self {
            base_url: base_url.into(),
            client,
        }
    }

    async fn get_list<T: DeserializeOwned + Send>(
        &self,
        path: &str,
        params: &QueryParams,
    ) -> Result<Vec<T>, ApiError> {
        let url = endpoint_url(&self.base_url, path, params)?;
        let rows: Vec<T> = fetch_json(&self.client, url).await?;
        debug!(path, rows = rows.len(), "Upstream list fetched");
        Ok(rows)
    }
}

#[async_trait]
impl<C: HttpClient> DetectionApi for DetectionApiClient<C> {
    async fn detections(&self, params: &QueryParams) -> Result<Vec<DetectionRecord>, ApiError> {
        self.get_list(paths::DETECTIONS, params).await
    }

    async fn summary_daily(
        &self,
        params: &QueryParams,
    ) -> Result<Vec<AggregatedDetectionRecord>, ApiError> {
        self.get_list(paths::SUMMARY_DAILY, params).await
    }

    async fn summary_hourly(
        &self,
        params: &QueryParams,
    ) -> Result<Vec<HourlySummaryRecord>, ApiError> {
        self.get_list(paths::SUMMARY_HOURLY, params).await
    }

    async fn cctv_list(&self) -> Result<Vec<CctvEntry>, ApiError> {
        self.get_list(paths::CCTV, &QueryParams::default()).await
    }
}
