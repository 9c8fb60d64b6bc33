//! Detection aggregation and derived environmental heuristics.
//!
//! All reducers here are pure and synchronous. They take whatever the upstream
//! returned for one poll tick and rebuild their output from scratch.

pub mod counts;
pub mod emissions;
pub mod hourly;
pub mod vehicle;

pub use counts::{DetectionSummary, InOutDetail, VehicleTypeCounts};
pub use emissions::{DerivedMetrics, PollutionLevel};
pub use hourly::{HourlyBucket, HourlySeries, TrendPoint};
pub use vehicle::VehicleType;
