//! Runtime configuration: upstream base URLs, HTTP timeouts, and per-view
//! refresh cadence.

use std::time::Duration;
use tracing::warn;

pub const DEFAULT_DETECTION_API_URL: &str = "http://127.0.0.1:8002";
pub const DEFAULT_STREAM_API_URL: &str = "http://127.0.0.1:8001";

/// Refresh interval of each view. `None` refreshes only on mount and on
/// filter changes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PollIntervals {
    pub today: Option<Duration>,
    pub yesterday: Option<Duration>,
    pub hourly_chart: Option<Duration>,
    pub raw_trend: Option<Duration>,
    pub cctv: Option<Duration>,
}

impl Default for PollIntervals {
    fn default() -> Self {
        Self {
            today: Some(Duration::from_secs(1)),
            yesterday: Some(Duration::from_secs(10)),
            hourly_chart: None,
            raw_trend: Some(Duration::from_secs(3600)),
            cctv: None,
        }
    }
}

impl PollIntervals {
    /// Every view on the same cadence.
    pub fn uniform(interval: Option<Duration>) -> Self {
        Self {
            today: interval,
            yesterday: interval,
            hourly_chart: interval,
            raw_trend: interval,
            cctv: interval,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DashboardConfig {
    pub detection_api_url: String,
    pub stream_api_url: String,
    pub request_timeout: Duration,
    pub connect_timeout: Duration,
    pub intervals: PollIntervals,
}

impl Default for DashboardConfig {
    fn default() -> Self {
        Self {
            detection_api_url: DEFAULT_DETECTION_API_URL.to_string(),
            stream_api_url: DEFAULT_STREAM_API_URL.to_string(),
            request_timeout: Duration::from_secs(30),
            connect_timeout: Duration::from_secs(10),
            intervals: PollIntervals::default(),
        }
    }
}

impl DashboardConfig {
    /// Reads overrides from the environment.
    ///
    /// `DETECTION_API_URL`, `STREAM_API_URL`, and per-view `POLL_*_MS`
    /// variables (`POLL_TODAY_MS`, `POLL_YESTERDAY_MS`, `POLL_HOURLY_MS`,
    /// `POLL_TREND_MS`, `POLL_CCTV_MS`). A poll value of `0` disables the
    /// timer for that view.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut config = Self::default();

        if let Some(url) = lookup("DETECTION_API_URL").filter(|s| !s.trim().is_empty()) {
            config.detection_api_url = url.trim().to_string();
        }
        if let Some(url) = lookup("STREAM_API_URL").filter(|s| !s.trim().is_empty()) {
            config.stream_api_url = url.trim().to_string();
        }

        let intervals = &mut config.intervals;
        for (key, slot) in [
            ("POLL_TODAY_MS", &mut intervals.today),
            ("POLL_YESTERDAY_MS", &mut intervals.yesterday),
            ("POLL_HOURLY_MS", &mut intervals.hourly_chart),
            ("POLL_TREND_MS", &mut intervals.raw_trend),
            ("POLL_CCTV_MS", &mut intervals.cctv),
        ] {
            if let Some(raw) = lookup(key) {
                match parse_interval_ms(&raw) {
                    Some(value) => *slot = value,
                    None => warn!(key, value = %raw, "Ignoring invalid poll interval"),
                }
            }
        }

        config
    }
}

/// Parses a millisecond interval; `0` means "no timer".
pub fn parse_interval_ms(raw: &str) -> Option<Option<Duration>> {
    let ms: u64 = raw.trim().parse().ok()?;
    Some((ms > 0).then(|| Duration::from_millis(ms)))
}
