//! HTTP plumbing shared by every upstream call.

mod basic;
mod client;
mod error;

pub use basic::BasicClient;
pub use client::HttpClient;
pub use error::ApiError;

use reqwest::Url;
use serde::de::DeserializeOwned;
use tracing::debug;

use crate::query::QueryParams;

/// Joins `base` and `path` and appends `params` as the query string.
pub fn endpoint_url(base: &str, path: &str, params: &QueryParams) -> Result<Url, ApiError> {
    let raw = format!("{}/{}", base.trim_end_matches('/'), path.trim_start_matches('/'));
    let mut url = Url::parse(&raw).map_err(|e| ApiError::InvalidUrl {
        url: raw.clone(),
        message: e.to_string(),
    })?;

    if !params.is_empty() {
        let mut pairs = url.query_pairs_mut();
        for (key, value) in params.iter() {
            pairs.append_pair(key, value);
        }
    }

    Ok(url)
}

/// GETs `url` and decodes the JSON body as `T`.
#[tracing::instrument(skip_all, fields(url = %url))]
pub async fn fetch_json<C, T>(client: &C, url: Url) -> Result<T, ApiError>
where
    C: HttpClient + ?Sized,
    T: DeserializeOwned,
{
    debug!("GET");
    let req = reqwest::Request::new(reqwest::Method::GET, url);

    let resp = client.execute(req).await?;
    let status = resp.status();
    if !status.is_success() {
        let body = resp.text().await.unwrap_or_default();
        return Err(ApiError::Status {
            status: status.as_u16(),
            body,
        });
    }

    let bytes = resp.bytes().await?;
    Ok(serde_json::from_slice(&bytes)?)
}
