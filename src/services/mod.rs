pub mod detection_api;

pub use detection_api::DetectionApi;
