//! Date formatting helpers and the injectable clock used by the polled views.

use chrono::{DateTime, Datelike, Days, Local, NaiveDate};

use crate::query::DateRange;

/// Indonesian month names, matching the dashboard's display locale.
const MONTHS_ID: [&str; 12] = [
    "Januari",
    "Februari",
    "Maret",
    "April",
    "Mei",
    "Juni",
    "Juli",
    "Agustus",
    "September",
    "Oktober",
    "November",
    "Desember",
];

/// Formats a calendar date as `YYYY-MM-DD`, the form every upstream date
/// parameter uses. No time-zone conversion happens here.
pub fn format_ymd(date: NaiveDate) -> String {
    date.format("%Y-%m-%d").to_string()
}

/// Formats a date for display, e.g. `05 Juli 2025`.
pub fn format_display(date: NaiveDate) -> String {
    format!(
        "{:02} {} {}",
        date.day(),
        MONTHS_ID[date.month0() as usize],
        date.year()
    )
}

/// Display label for a date range: a single date when both ends fall on the
/// same day, otherwise `start - end`.
pub fn format_range_display(range: &DateRange) -> String {
    if range.start == range.end {
        format_display(range.start)
    } else {
        format!("{} - {}", format_display(range.start), format_display(range.end))
    }
}

/// Source of "now" for views that need today/yesterday.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Local>;

    fn today(&self) -> NaiveDate {
        self.now().date_naive()
    }

    fn yesterday(&self) -> NaiveDate {
        let today = self.today();
        today.checked_sub_days(Days::new(1)).unwrap_or(today)
    }
}

/// Wall-clock time.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Local> {
        Local::now()
    }
}

/// A clock pinned to one instant.
#[derive(Debug, Clone, Copy)]
pub struct FixedClock(pub DateTime<Local>);

impl FixedClock {
    /// Pins the clock to local midday on `date`.
    pub fn on(date: NaiveDate) -> Self {
        let naive = date.and_hms_opt(12, 0, 0).unwrap_or_default();
        let now = naive
            .and_local_timezone(Local)
            .earliest()
            .unwrap_or_else(Local::now);
        Self(now)
    }
}

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Local> {
        self.0
    }
}
