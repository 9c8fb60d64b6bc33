//! Per-view polling supervisor.
//!
//! Each view gets one background task that refreshes it on mount, whenever
//! the shared filter changes, and on a fixed interval. At most one request
//! per view is in flight: issuing a new one drops the previous future, which
//! cancels its HTTP request, so a slow old response can never overwrite a
//! newer one. Fetch failures are logged and the last good value is kept.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{oneshot, watch};
use tokio::task::JoinHandle;
use tokio::time::{Instant, Interval, MissedTickBehavior};
use tracing::{Instrument, debug, error, info_span};

use crate::fetch::ApiError;
use crate::query::FilterSelection;

/// One independently refreshed piece of the dashboard.
#[async_trait]
pub trait View: Send + Sync + 'static {
    type Output: Clone + Send + Sync + 'static;

    /// Short name used in logs.
    fn name(&self) -> &'static str;

    /// Builds the query for `filter`, fetches, and aggregates.
    async fn load(&self, filter: &FilterSelection) -> Result<Self::Output, ApiError>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum PollPhase {
    Idle,
    Fetching,
}

/// What a view currently shows plus its polling bookkeeping.
#[derive(Debug, Clone, Serialize)]
pub struct ViewState<T> {
    /// Result of the latest successful request, kept across failures.
    pub value: Option<T>,
    pub phase: PollPhase,
    /// Sequence number of the request that produced `value`.
    pub generation: u64,
    pub last_success: Option<DateTime<Utc>>,
    pub last_error: Option<String>,
    pub consecutive_failures: u32,
}

impl<T> Default for ViewState<T> {
    fn default() -> Self {
        Self {
            value: None,
            phase: PollPhase::Idle,
            generation: 0,
            last_success: None,
            last_error: None,
            consecutive_failures: 0,
        }
    }
}

/// Why a request was issued.
#[derive(Debug, Clone, Copy)]
enum Trigger {
    Mount,
    FilterChanged,
    Tick,
}

type InFlight<T> = Pin<Box<dyn Future<Output = Result<T, ApiError>> + Send>>;

/// Handle to a running view poller. Dropping it stops the poller.
pub struct Poller<T> {
    name: &'static str,
    state: watch::Receiver<ViewState<T>>,
    stop: Option<oneshot::Sender<()>>,
    task: Option<JoinHandle<()>>,
}

impl<T: Clone + Send + Sync + 'static> Poller<T> {
    /// Starts polling `view`. `interval = None` refreshes only on mount and
    /// on filter changes.
    ///
    /// Must be called from inside a Tokio runtime.
    pub fn spawn<V>(
        view: V,
        filter: watch::Receiver<FilterSelection>,
        interval: Option<Duration>,
    ) -> Self
    where
        V: View<Output = T>,
    {
        let name = view.name();
        let (state_tx, state_rx) = watch::channel(ViewState::default());
        let (stop_tx, stop_rx) = oneshot::channel();

        let supervisor = Supervisor {
            view: Arc::new(view),
            filter,
            state: state_tx,
            ticker: interval.map(ticker),
            in_flight: None,
            seq: 0,
        };
        let task = tokio::spawn(
            supervisor
                .run(stop_rx)
                .instrument(info_span!("poller", view = name)),
        );

        Self {
            name,
            state: state_rx,
            stop: Some(stop_tx),
            task: Some(task),
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Latest successfully loaded value.
    pub fn latest(&self) -> Option<T> {
        self.state.borrow().value.clone()
    }

    pub fn state(&self) -> ViewState<T> {
        self.state.borrow().clone()
    }

    /// Receiver notified on every state change.
    pub fn subscribe(&self) -> watch::Receiver<ViewState<T>> {
        self.state.clone()
    }

    /// Stops the timer, cancels any in-flight request, and waits for the
    /// supervisor to exit.
    pub async fn shutdown(mut self) {
        if let Some(stop) = self.stop.take() {
            let _ = stop.send(());
        }
        if let Some(task) = self.task.take() {
            let _ = task.await;
        }
    }
}

impl<T> Drop for Poller<T> {
    fn drop(&mut self) {
        if let Some(task) = &self.task {
            task.abort();
        }
    }
}

fn ticker(period: Duration) -> Interval {
    // The mount request covers t=0, so the first tick is one period out.
    let mut interval = tokio::time::interval_at(Instant::now() + period, period);
    interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
    interval
}

async fn next_tick(ticker: &mut Option<Interval>) {
    match ticker {
        Some(t) => {
            t.tick().await;
        }
        None => std::future::pending().await,
    }
}

async fn settle<T>(in_flight: &mut Option<(u64, InFlight<T>)>) -> (u64, Result<T, ApiError>) {
    match in_flight {
        Some((id, fut)) => {
            let result = fut.as_mut().await;
            let id = *id;
            *in_flight = None;
            (id, result)
        }
        None => std::future::pending().await,
    }
}

struct Supervisor<V: View> {
    view: Arc<V>,
    filter: watch::Receiver<FilterSelection>,
    state: watch::Sender<ViewState<V::Output>>,
    ticker: Option<Interval>,
    in_flight: Option<(u64, InFlight<V::Output>)>,
    seq: u64,
}

impl<V: View> Supervisor<V> {
    async fn run(mut self, mut stop: oneshot::Receiver<()>) {
        self.issue(Trigger::Mount);

        loop {
            tokio::select! {
                _ = &mut stop => break,
                changed = self.filter.changed() => {
                    if changed.is_err() {
                        debug!("Filter channel closed");
                        break;
                    }
                    if let Some(t) = self.ticker.as_mut() {
                        t.reset();
                    }
                    self.issue(Trigger::FilterChanged);
                }
                _ = next_tick(&mut self.ticker) => self.issue(Trigger::Tick),
                (id, result) = settle(&mut self.in_flight) => self.publish(id, result),
            }
        }

        if self.in_flight.take().is_some() {
            debug!("In-flight request cancelled on shutdown");
        }
        self.state.send_modify(|s| s.phase = PollPhase::Idle);
    }

    fn issue(&mut self, trigger: Trigger) {
        if let Some((old, _)) = self.in_flight.take() {
            debug!(request = old, "In-flight request cancelled");
        }

        self.seq += 1;
        let id = self.seq;
        let filter = self.filter.borrow_and_update().clone();
        let view = Arc::clone(&self.view);

        debug!(request = id, ?trigger, "Issuing request");
        self.state.send_modify(|s| s.phase = PollPhase::Fetching);
        self.in_flight = Some((id, Box::pin(async move { view.load(&filter).await })));
    }

    fn publish(&mut self, id: u64, result: Result<V::Output, ApiError>) {
        if id != self.seq {
            debug!(request = id, latest = self.seq, "Stale response discarded");
            return;
        }

        match result {
            Ok(value) => self.state.send_modify(|s| {
                s.value = Some(value);
                s.phase = PollPhase::Idle;
                s.generation = id;
                s.last_success = Some(Utc::now());
                s.last_error = None;
                s.consecutive_failures = 0;
            }),
            Err(e) => {
                error!(view = self.view.name(), request = id, error = %e, "Fetch failed, keeping last result");
                self.state.send_modify(|s| {
                    s.phase = PollPhase::Idle;
                    s.last_error = Some(e.to_string());
                    s.consecutive_failures += 1;
                });
            }
        }
    }
}
