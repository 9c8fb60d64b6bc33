use async_trait::async_trait;
use chrono::NaiveDate;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;
use traffic_dashboard::aggregate::PollutionLevel;
use traffic_dashboard::config::{DashboardConfig, PollIntervals};
use traffic_dashboard::dashboard::Dashboard;
use traffic_dashboard::dates::FixedClock;
use traffic_dashboard::fetch::{ApiError, BasicClient};
use traffic_dashboard::infra::detection::DetectionApiClient;
use traffic_dashboard::models::{
    AggregatedDetectionRecord, CctvEntry, DetectionRecord, HourlySummaryRecord,
};
use traffic_dashboard::poller::{Poller, ViewState};
use traffic_dashboard::query::{DateRange, FilterSelection, QueryParams, build_query};
use traffic_dashboard::services::DetectionApi;
use traffic_dashboard::views::TodaySummaryView;

/// In-memory upstream that records every query it receives.
#[derive(Default)]
struct ScriptedApi {
    calls: Mutex<Vec<(&'static str, QueryParams)>>,
}

impl ScriptedApi {
    fn calls_to(&self, endpoint: &str) -> Vec<QueryParams> {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .filter(|(name, _)| *name == endpoint)
            .map(|(_, params)| params.clone())
            .collect()
    }
}

#[async_trait]
impl DetectionApi for ScriptedApi {
    async fn detections(&self, params: &QueryParams) -> Result<Vec<DetectionRecord>, ApiError> {
        self.calls.lock().unwrap().push(("detections", params.clone()));
        Ok(vec![
            raw("2025-07-08T08:15:00", "Mobil", "IN"),
            raw("2025-07-08T08:45:00", "Motor", "OUT"),
            raw("2025-07-08T17:05:00", "Bus", ""),
        ])
    }

    async fn summary_daily(
        &self,
        params: &QueryParams,
    ) -> Result<Vec<AggregatedDetectionRecord>, ApiError> {
        self.calls.lock().unwrap().push(("daily", params.clone()));
        if params.get("vehicle_type") == Some("Bus") {
            return Ok(vec![agg("Bus", "IN", 4)]);
        }
        Ok(vec![
            agg("Mobil", "IN", 3),
            agg("Mobil", "OUT", 2),
            agg("Motor", "IN", 10),
        ])
    }

    async fn summary_hourly(
        &self,
        params: &QueryParams,
    ) -> Result<Vec<HourlySummaryRecord>, ApiError> {
        self.calls.lock().unwrap().push(("hourly", params.clone()));
        Ok(vec![HourlySummaryRecord {
            hour: "2025-07-08T07:00:00Z".to_string(),
            vehicle_type: "Truk".to_string(),
            cctv_name: "CAM.A".to_string(),
            direction: "IN".to_string(),
            count: 6,
        }])
    }

    async fn cctv_list(&self) -> Result<Vec<CctvEntry>, ApiError> {
        Ok(vec![
            CctvEntry {
                id: 1,
                name: "CAM.A".to_string(),
                location: "Gerbang Utama".to_string(),
                ..Default::default()
            },
            CctvEntry {
                id: 2,
                name: "CAM.B".to_string(),
                location: String::new(),
                ..Default::default()
            },
        ])
    }
}

#[tokio::test]
async fn test_full_pipeline() {
    let api = Arc::new(ScriptedApi::default());
    let config = DashboardConfig {
        stream_api_url: "http://stream.local:8001".to_string(),
        intervals: PollIntervals::uniform(None),
        ..Default::default()
    };
    let clock = Arc::new(FixedClock::on(day(2025, 7, 8)));
    let dashboard = Dashboard::start(&config, api.clone(), clock);

    let today = wait_for(&dashboard.today.subscribe(), 1).await;
    let summary = &today.value.unwrap().summary;
    assert_eq!(summary.count_of("Mobil"), 5);
    assert_eq!(summary.count_of("Motor"), 10);
    assert_eq!(summary.total_in, 13);
    assert_eq!(summary.total_out, 2);
    assert_eq!(summary.total_overall, 15);

    let metrics = dashboard.today.latest().unwrap().metrics;
    assert_eq!(metrics.pollution_points, 20);
    assert_eq!(metrics.level, PollutionLevel::Low);
    assert_eq!(metrics.co_total_grams, 400);

    let yesterday = wait_for(&dashboard.yesterday.subscribe(), 1).await;
    assert_eq!(
        yesterday.value.unwrap().range,
        DateRange::single(day(2025, 7, 7))
    );

    let hourly = wait_for(&dashboard.hourly_chart.subscribe(), 1).await;
    let series = hourly.value.unwrap().series;
    assert_eq!(series.buckets.len(), 24);
    assert_eq!(series.bucket(7).unwrap().counts["Truk"], 6);

    let trend = wait_for(&dashboard.raw_trend.subscribe(), 1).await;
    let trend = trend.value.unwrap();
    assert_eq!(trend.report.summary.total_overall, 3);
    assert_eq!(trend.report.summary.undirected(), 1);

    wait_for(&dashboard.cctv.subscribe(), 1).await;
    assert_eq!(
        dashboard.stream_url().as_deref(),
        Some("http://stream.local:8001/video_feed/CAM.A")
    );
    assert!(dashboard.select_stream("CAM.B"));
    assert!(!dashboard.select_stream("CAM.Z"));
    assert_eq!(
        dashboard.snapshot().stream_url.as_deref(),
        Some("http://stream.local:8001/video_feed/CAM.B")
    );

    dashboard.shutdown().await;
}

#[tokio::test]
async fn test_filter_change_refreshes_views() {
    let api = Arc::new(ScriptedApi::default());
    let config = DashboardConfig {
        intervals: PollIntervals::uniform(None),
        ..Default::default()
    };
    let clock = Arc::new(FixedClock::on(day(2025, 7, 8)));
    let dashboard = Dashboard::start(&config, api.clone(), clock);

    let first = wait_for(&dashboard.today.subscribe(), 1).await;

    let changed = dashboard.update_filter(|f| f.vehicle_type = "Bus".to_string());
    assert!(changed);
    assert!(!dashboard.update_filter(|f| f.vehicle_type = "Bus".to_string()));

    let second = wait_for(&dashboard.today.subscribe(), first.generation + 1).await;
    let report = second.value.unwrap();
    assert_eq!(report.summary.count_of("Bus"), 4);
    assert_eq!(report.summary.count_of("Mobil"), 0);

    let daily = api.calls_to("daily");
    assert!(
        daily
            .iter()
            .any(|p| p.get("vehicle_type") == Some("Bus") && p.get("start_date") == Some("2025-07-08"))
    );
    assert_eq!(daily[0].get("vehicle_type"), None);

    dashboard.shutdown().await;
}

/// Answers the first daily summary with out-of-range counts, then with
/// ordinary rows.
#[derive(Default)]
struct SpikeApi {
    daily_calls: AtomicUsize,
}

#[async_trait]
impl DetectionApi for SpikeApi {
    async fn detections(&self, _params: &QueryParams) -> Result<Vec<DetectionRecord>, ApiError> {
        Ok(vec![])
    }

    async fn summary_daily(
        &self,
        _params: &QueryParams,
    ) -> Result<Vec<AggregatedDetectionRecord>, ApiError> {
        if self.daily_calls.fetch_add(1, Ordering::SeqCst) == 0 {
            let body = r#"[
                {"vehicle_type": "Mobil", "direction": "IN", "count": 1e30},
                {"vehicle_type": "Mobil", "direction": "IN", "count": 1},
                {"vehicle_type": "Truk", "direction": "OUT", "count": 18446744073709551615}
            ]"#;
            return Ok(serde_json::from_str(body)?);
        }
        Ok(vec![agg("Mobil", "IN", 3), agg("Mobil", "OUT", 2)])
    }

    async fn summary_hourly(
        &self,
        _params: &QueryParams,
    ) -> Result<Vec<HourlySummaryRecord>, ApiError> {
        Ok(vec![])
    }

    async fn cctv_list(&self) -> Result<Vec<CctvEntry>, ApiError> {
        Ok(vec![])
    }
}

#[tokio::test]
async fn test_huge_counts_do_not_stop_polling() {
    let api = Arc::new(SpikeApi::default());
    let (_filter_tx, filter_rx) =
        tokio::sync::watch::channel(FilterSelection::unfiltered(DateRange::single(day(2025, 7, 8))));
    let poller = Poller::spawn(
        TodaySummaryView::new(api.clone()),
        filter_rx,
        Some(Duration::from_millis(20)),
    );

    let first = wait_for(&poller.subscribe(), 1).await.value.unwrap();
    assert_eq!(first.summary.count_of("Mobil"), u64::MAX);
    assert_eq!(first.summary.total_overall, u64::MAX);
    assert_eq!(first.metrics.level, PollutionLevel::VeryHigh);

    let later = wait_for(&poller.subscribe(), 3).await;
    assert!(api.daily_calls.load(Ordering::SeqCst) >= 3);
    assert_eq!(later.consecutive_failures, 0);
    assert_eq!(later.value.unwrap().summary.count_of("Mobil"), 5);

    poller.shutdown().await;
}

#[test]
fn test_sentinels_are_omitted_from_queries() {
    let range = DateRange::single(day(2025, 7, 8));
    let mut selection = FilterSelection::unfiltered(range);
    selection.vehicle_type = "Semua".to_string();
    selection.direction = "BOTH".to_string();

    let params = build_query(&selection, &range);
    assert_eq!(params.keys(), vec!["start_date", "end_date"]);
}

#[tokio::test]
async fn test_http_client_decodes_summary() {
    let body = r#"[
        {"cctv_name": "CAM.A", "direction": "IN", "vehicle_type": "Mobil", "count": 3},
        {"cctv_name": null, "direction": "OUT", "vehicle_type": "Motor", "count": "2"}
    ]"#;
    let (base, requests) = serve(200, body).await;
    let client = DetectionApiClient::new(base, BasicClient::new());

    let range = DateRange::single(day(2025, 7, 8));
    let mut selection = FilterSelection::unfiltered(range);
    selection.direction = "IN".to_string();
    let rows = client
        .summary_daily(&build_query(&selection, &range))
        .await
        .unwrap();

    assert_eq!(rows.len(), 2);
    assert_eq!(rows[0].count, 3);
    assert_eq!(rows[1].cctv_name, "");
    assert_eq!(rows[1].count, 2);

    let request_line = requests.lock().unwrap()[0].clone();
    assert!(request_line.starts_with("GET /api/detection/summary_daily/?"));
    assert!(request_line.contains("start_date=2025-07-08"));
    assert!(request_line.contains("direction=IN"));
    assert!(!request_line.contains("cctv_name"));
}

#[tokio::test]
async fn test_http_client_reports_status_error() {
    let (base, _) = serve(500, "boom").await;
    let client = DetectionApiClient::new(base, BasicClient::new());

    let err = client.cctv_list().await.unwrap_err();
    match err {
        ApiError::Status { status, body } => {
            assert_eq!(status, 500);
            assert_eq!(body, "boom");
        }
        other => panic!("expected status error, got {other:?}"),
    }
}

#[tokio::test]
async fn test_http_client_rejects_non_list_body() {
    let (base, _) = serve(200, r#"{"detail": "oops"}"#).await;
    let client = DetectionApiClient::new(base, BasicClient::new());

    let err = client.detections(&QueryParams::default()).await.unwrap_err();
    assert!(matches!(err, ApiError::Decode(_)));
}

// Helper functions for tests

fn day(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

fn raw(timestamp: &str, vehicle_type: &str, direction: &str) -> DetectionRecord {
    DetectionRecord {
        timestamp: timestamp.to_string(),
        cctv_name: "CAM.A".to_string(),
        vehicle_type: vehicle_type.to_string(),
        direction: direction.to_string(),
    }
}

fn agg(vehicle_type: &str, direction: &str, count: u64) -> AggregatedDetectionRecord {
    AggregatedDetectionRecord {
        cctv_name: "CAM.A".to_string(),
        direction: direction.to_string(),
        vehicle_type: vehicle_type.to_string(),
        count,
    }
}

/// Waits until the view has published a result of at least `generation`.
async fn wait_for<T: Clone>(
    rx: &tokio::sync::watch::Receiver<ViewState<T>>,
    generation: u64,
) -> ViewState<T> {
    let mut rx = rx.clone();
    tokio::time::timeout(Duration::from_secs(2), async {
        loop {
            {
                let state = rx.borrow_and_update();
                if state.value.is_some() && state.generation >= generation {
                    return state.clone();
                }
            }
            rx.changed().await.unwrap();
        }
    })
    .await
    .unwrap()
}

/// Serves every request with the same canned response and records the
/// request lines.
async fn serve(status: u16, body: &'static str) -> (String, Arc<Mutex<Vec<String>>>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let requests = Arc::new(Mutex::new(Vec::new()));
    let seen = requests.clone();

    tokio::spawn(async move {
        while let Ok((mut socket, _)) = listener.accept().await {
            let mut buf = Vec::new();
            let mut chunk = [0u8; 1024];
            while !buf.windows(4).any(|w| w == b"\r\n\r\n") {
                match socket.read(&mut chunk).await {
                    Ok(0) | Err(_) => break,
                    Ok(n) => buf.extend_from_slice(&chunk[..n]),
                }
            }
            let text = String::from_utf8_lossy(&buf);
            if let Some(line) = text.lines().next() {
                seen.lock().unwrap().push(line.to_string());
            }

            let response = format!(
                "HTTP/1.1 {status} X\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{body}",
                body.len()
            );
            let _ = socket.write_all(response.as_bytes()).await;
            let _ = socket.shutdown().await;
        }
    });

    (format!("http://{addr}"), requests)
}
