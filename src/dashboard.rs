//! Wires the shared filter, clock, directory, and API into one poller per
//! view.

use serde::Serialize;
use std::sync::{Arc, RwLock};
use tokio::sync::watch;
use tracing::info;

use crate::config::DashboardConfig;
use crate::dates::Clock;
use crate::directory::CctvDirectory;
use crate::poller::{Poller, ViewState};
use crate::query::{DateRange, FilterSelection};
use crate::services::DetectionApi;
use crate::views::{
    CctvDirectoryView, DailyReport, HourlyChart, HourlyChartView, RawTrend, RawTrendView,
    TodaySummaryView, YesterdaySummaryView,
};

/// Everything the render layer reads on one frame.
#[derive(Debug, Clone, Serialize)]
pub struct DashboardSnapshot {
    pub filter: FilterSelection,
    pub today: ViewState<DailyReport>,
    pub yesterday: ViewState<DailyReport>,
    pub hourly_chart: ViewState<HourlyChart>,
    pub raw_trend: ViewState<RawTrend>,
    pub cctv: ViewState<CctvDirectory>,
    pub stream_url: Option<String>,
}

pub struct Dashboard {
    filter: watch::Sender<FilterSelection>,
    directory: Arc<RwLock<CctvDirectory>>,
    stream_api_url: String,
    pub today: Poller<DailyReport>,
    pub yesterday: Poller<DailyReport>,
    pub hourly_chart: Poller<HourlyChart>,
    pub raw_trend: Poller<RawTrend>,
    pub cctv: Poller<CctvDirectory>,
}

impl Dashboard {
    /// Starts every view with an unfiltered selection of the clock's today.
    ///
    /// Must be called from inside a Tokio runtime.
    pub fn start(config: &DashboardConfig, api: Arc<dyn DetectionApi>, clock: Arc<dyn Clock>) -> Self {
        let initial = FilterSelection::unfiltered(DateRange::single(clock.today()));
        Self::start_with_filter(config, api, clock, initial)
    }

    pub fn start_with_filter(
        config: &DashboardConfig,
        api: Arc<dyn DetectionApi>,
        clock: Arc<dyn Clock>,
        initial: FilterSelection,
    ) -> Self {
        let (filter_tx, filter_rx) = watch::channel(initial);
        let directory = Arc::new(RwLock::new(CctvDirectory::default()));
        let intervals = &config.intervals;

        info!(
            detection_api = %config.detection_api_url,
            stream_api = %config.stream_api_url,
            "Starting dashboard views"
        );

        Self {
            today: Poller::spawn(
                TodaySummaryView::new(api.clone()),
                filter_rx.clone(),
                intervals.today,
            ),
            yesterday: Poller::spawn(
                YesterdaySummaryView::new(api.clone(), clock),
                filter_rx.clone(),
                intervals.yesterday,
            ),
            hourly_chart: Poller::spawn(
                HourlyChartView::new(api.clone()),
                filter_rx.clone(),
                intervals.hourly_chart,
            ),
            raw_trend: Poller::spawn(
                RawTrendView::new(api.clone()),
                filter_rx.clone(),
                intervals.raw_trend,
            ),
            cctv: Poller::spawn(
                CctvDirectoryView::new(api, directory.clone()),
                filter_rx,
                intervals.cctv,
            ),
            filter: filter_tx,
            directory,
            stream_api_url: config.stream_api_url.clone(),
        }
    }

    pub fn filter(&self) -> FilterSelection {
        self.filter.borrow().clone()
    }

    /// Replaces the selection. Views only refresh when it actually changed.
    pub fn set_filter(&self, selection: FilterSelection) -> bool {
        self.filter.send_if_modified(|current| {
            if *current == selection {
                return false;
            }
            *current = selection;
            true
        })
    }

    /// Edits the selection in place, e.g. to change one dimension.
    pub fn update_filter(&self, edit: impl FnOnce(&mut FilterSelection)) -> bool {
        let mut next = self.filter();
        edit(&mut next);
        self.set_filter(next)
    }

    /// Chooses the camera shown in the live stream.
    pub fn select_stream(&self, cctv_name: &str) -> bool {
        self.directory
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .select_stream(cctv_name)
    }

    pub fn stream_url(&self) -> Option<String> {
        self.directory
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .stream_url(&self.stream_api_url)
    }

    pub fn snapshot(&self) -> DashboardSnapshot {
        DashboardSnapshot {
            filter: self.filter(),
            today: self.today.state(),
            yesterday: self.yesterday.state(),
            hourly_chart: self.hourly_chart.state(),
            raw_trend: self.raw_trend.state(),
            cctv: self.cctv.state(),
            stream_url: self.stream_url(),
        }
    }

    /// Stops every view and waits for their tasks to exit.
    pub async fn shutdown(self) {
        tokio::join!(
            self.today.shutdown(),
            self.yesterday.shutdown(),
            self.hourly_chart.shutdown(),
            self.raw_trend.shutdown(),
            self.cctv.shutdown(),
        );
        info!("Dashboard stopped");
    }
}
