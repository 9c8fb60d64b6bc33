//! Per-vehicle-type totals and IN/OUT splits.

use serde::Serialize;
use std::collections::BTreeMap;

use crate::aggregate::vehicle::VehicleType;
use crate::models::{Direction, Record};

/// Total detections per vehicle type. A missing key means zero.
pub type VehicleTypeCounts = BTreeMap<String, u64>;

/// Sums counts, pinning at `u64::MAX` instead of overflowing.
pub fn saturating_total<'a>(values: impl IntoIterator<Item = &'a u64>) -> u64 {
    values.into_iter().fold(0u64, |acc, v| acc.saturating_add(*v))
}

/// Inbound/outbound split for one vehicle type.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct InOutDetail {
    #[serde(rename = "IN")]
    pub inbound: u64,
    #[serde(rename = "OUT")]
    pub outbound: u64,
}

impl InOutDetail {
    pub fn total(&self) -> u64 {
        self.inbound.saturating_add(self.outbound)
    }

    fn add(&mut self, direction: Direction, count: u64) {
        match direction {
            Direction::In => self.inbound = self.inbound.saturating_add(count),
            Direction::Out => self.outbound = self.outbound.saturating_add(count),
        }
    }
}

/// Sums `count` per vehicle type. Raw records count as one each.
pub fn count_by_vehicle(records: &[Record]) -> VehicleTypeCounts {
    let mut counts = VehicleTypeCounts::new();
    for record in records {
        let total = counts.entry(record.vehicle_type().to_string()).or_default();
        *total = total.saturating_add(record.count());
    }
    counts
}

/// Splits counts by direction per vehicle type.
///
/// Every known vehicle type gets an entry, zeroed if absent. Records whose
/// direction is neither `IN` nor `OUT` create their type's entry but add to
/// neither side.
pub fn split_by_direction(records: &[Record]) -> BTreeMap<String, InOutDetail> {
    let mut split: BTreeMap<String, InOutDetail> = VehicleType::ALL
        .iter()
        .map(|v| (v.as_str().to_string(), InOutDetail::default()))
        .collect();

    for record in records {
        let detail = split.entry(record.vehicle_type().to_string()).or_default();
        if let Some(direction) = record.direction() {
            detail.add(direction, record.count());
        }
    }

    split
}

/// Everything the summary table and pie chart need for one query window.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DetectionSummary {
    pub counts: VehicleTypeCounts,
    pub in_out_by_vehicle: BTreeMap<String, InOutDetail>,
    pub total_in: u64,
    pub total_out: u64,
    pub total_overall: u64,
}

impl DetectionSummary {
    pub fn from_records(records: &[Record]) -> Self {
        let counts = count_by_vehicle(records);
        let in_out_by_vehicle = split_by_direction(records);

        let total_in = saturating_total(in_out_by_vehicle.values().map(|d| &d.inbound));
        let total_out = saturating_total(in_out_by_vehicle.values().map(|d| &d.outbound));
        let total_overall = saturating_total(counts.values());

        Self {
            counts,
            in_out_by_vehicle,
            total_in,
            total_out,
            total_overall,
        }
    }

    /// Count for `vehicle_type`, zero when it never occurred.
    pub fn count_of(&self, vehicle_type: &str) -> u64 {
        self.counts.get(vehicle_type).copied().unwrap_or(0)
    }

    /// Records that carried no usable direction.
    pub fn undirected(&self) -> u64 {
        self.total_overall
            .saturating_sub(self.total_in)
            .saturating_sub(self.total_out)
    }
}
