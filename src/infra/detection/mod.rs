mod client;

pub use client::DetectionApiClient;
