//! Detection aggregation and polling-refresh pipeline for the traffic-camera
//! dashboard.
//!
//! The [`dashboard::Dashboard`] owns one [`poller::Poller`] per view. Each
//! poller fetches from a [`services::DetectionApi`], reduces the rows with the
//! pure functions in [`aggregate`], and publishes the result on a watch
//! channel for the render layer.

pub mod aggregate;
pub mod config;
pub mod dashboard;
pub mod dates;
pub mod directory;
pub mod fetch;
pub mod infra;
pub mod models;
pub mod output;
pub mod poller;
pub mod query;
pub mod services;
pub mod views;
