//! Records returned by the upstream detection API.
//!
//! Decoding is lenient inside each element: missing strings become `""`, a
//! missing or malformed `count` becomes 0. A body that is not a list at all is
//! still a decode error.

use serde::{Deserialize, Deserializer, Serialize};

/// Crossing direction relative to the camera's reference line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Direction {
    #[serde(rename = "IN")]
    In,
    #[serde(rename = "OUT")]
    Out,
}

impl Direction {
    /// Parses the upstream direction string; anything other than exactly
    /// `IN` or `OUT` is `None`.
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "IN" => Some(Direction::In),
            "OUT" => Some(Direction::Out),
            _ => None,
        }
    }
}

/// One physical detection event from `/api/detections/`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DetectionRecord {
    #[serde(deserialize_with = "lenient_string")]
    pub timestamp: String,
    #[serde(deserialize_with = "lenient_string")]
    pub cctv_name: String,
    #[serde(deserialize_with = "lenient_string")]
    pub vehicle_type: String,
    #[serde(deserialize_with = "lenient_string")]
    pub direction: String,
}

/// A bucket already summed by the upstream, from `summary_daily`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AggregatedDetectionRecord {
    #[serde(deserialize_with = "lenient_string")]
    pub cctv_name: String,
    #[serde(deserialize_with = "lenient_string")]
    pub direction: String,
    #[serde(deserialize_with = "lenient_string")]
    pub vehicle_type: String,
    #[serde(deserialize_with = "lenient_count")]
    pub count: u64,
}

/// One row of `summary_hourly`; `hour` is an ISO timestamp of the bucket start.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct HourlySummaryRecord {
    #[serde(deserialize_with = "lenient_string")]
    pub hour: String,
    #[serde(deserialize_with = "lenient_string")]
    pub vehicle_type: String,
    #[serde(deserialize_with = "lenient_string")]
    pub cctv_name: String,
    #[serde(deserialize_with = "lenient_string")]
    pub direction: String,
    #[serde(deserialize_with = "lenient_count")]
    pub count: u64,
}

/// A configured camera from `/api/cctv/`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CctvEntry {
    #[serde(deserialize_with = "lenient_id")]
    pub id: i64,
    #[serde(deserialize_with = "lenient_string")]
    pub name: String,
    #[serde(deserialize_with = "lenient_string")]
    pub location: String,
    #[serde(deserialize_with = "lenient_string")]
    pub brand: String,
    #[serde(deserialize_with = "lenient_string")]
    pub ip_address: String,
    #[serde(deserialize_with = "lenient_string")]
    pub rtsp_url: String,
    #[serde(rename = "type", deserialize_with = "lenient_string")]
    pub kind: String,
    #[serde(deserialize_with = "lenient_position")]
    pub line_position: Option<f64>,
}

/// Either input shape the aggregator accepts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Record {
    Raw(DetectionRecord),
    Aggregated(AggregatedDetectionRecord),
}

impl Record {
    pub fn vehicle_type(&self) -> &str {
        match self {
            Record::Raw(r) => &r.vehicle_type,
            Record::Aggregated(r) => &r.vehicle_type,
        }
    }

    pub fn direction(&self) -> Option<Direction> {
        match self {
            Record::Raw(r) => Direction::parse(&r.direction),
            Record::Aggregated(r) => Direction::parse(&r.direction),
        }
    }

    /// A raw record stands for exactly one detection.
    pub fn count(&self) -> u64 {
        match self {
            Record::Raw(_) => 1,
            Record::Aggregated(r) => r.count,
        }
    }
}

impl From<DetectionRecord> for Record {
    fn from(r: DetectionRecord) -> Self {
        Record::Raw(r)
    }
}

impl From<AggregatedDetectionRecord> for Record {
    fn from(r: AggregatedDetectionRecord) -> Self {
        Record::Aggregated(r)
    }
}

/// Wraps a slice of either record shape into [`Record`]s.
pub fn to_records<T: Clone + Into<Record>>(items: &[T]) -> Vec<Record> {
    items.iter().cloned().map(Into::into).collect()
}

fn lenient_string<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<String>::deserialize(deserializer)?.unwrap_or_default())
}

fn lenient_count<'de, D>(deserializer: D) -> Result<u64, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<serde_json::Value>::deserialize(deserializer)?;
    let count = match value {
        Some(serde_json::Value::Number(n)) => n
            .as_u64()
            .or_else(|| n.as_f64().filter(|f| *f > 0.0).map(|f| f as u64))
            .unwrap_or(0),
        Some(serde_json::Value::String(s)) => s.trim().parse().unwrap_or(0),
        _ => 0,
    };
    Ok(count)
}

fn lenient_id<'de, D>(deserializer: D) -> Result<i64, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<serde_json::Value>::deserialize(deserializer)?;
    let id = match value {
        Some(serde_json::Value::Number(n)) => n
            .as_i64()
            .or_else(|| n.as_f64().filter(|f| f.is_finite()).map(|f| f as i64))
            .unwrap_or(0),
        Some(serde_json::Value::String(s)) => s.trim().parse().unwrap_or(0),
        _ => 0,
    };
    Ok(id)
}

fn lenient_position<'de, D>(deserializer: D) -> Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<serde_json::Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(serde_json::Value::Number(n)) => n.as_f64(),
        Some(serde_json::Value::String(s)) => s.trim().parse().ok(),
        _ => None,
    })
}
