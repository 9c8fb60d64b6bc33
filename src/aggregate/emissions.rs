use serde::Serialize;
use std::collections::BTreeMap;

use crate::aggregate::counts::{VehicleTypeCounts, saturating_total};

/// Pollution points contributed by one detection of each vehicle type.
/// Types not listed contribute nothing.
static POLLUTION_POINTS: &[(&str, u64)] = &[
    ("Motor", 1), // Pertalite
    ("Mobil", 2), // Pertamax
    ("Bus", 5),   // Solar
    ("Truk", 7),  // Solar
    ("Sepeda", 0),
];

/// Estimated grams of CO per detection.
static CO_GRAMS_PER_DETECTION: &[(&str, u64)] = &[
    ("Motor", 30),
    ("Mobil", 20),
    ("Truk", 80),
    ("Bus", 100),
    ("Sepeda", 0),
];

/// Points at which the display slider reaches its right end.
pub const MAX_POLLUTION_POINTS: f64 = 5000.0;

fn weight_of(table: &[(&str, u64)], vehicle_type: &str) -> u64 {
    table
        .iter()
        .find(|(name, _)| *name == vehicle_type)
        .map(|(_, w)| *w)
        .unwrap_or(0)
}

/// Points contributed by `count` detections of one vehicle type.
pub fn pollution_points_for(vehicle_type: &str, count: u64) -> u64 {
    count.saturating_mul(weight_of(POLLUTION_POINTS, vehicle_type))
}

/// Sum of `count × points weight` over every vehicle type.
pub fn pollution_points(counts: &VehicleTypeCounts) -> u64 {
    counts
        .iter()
        .map(|(vehicle, count)| pollution_points_for(vehicle, *count))
        .fold(0u64, u64::saturating_add)
}

/// Pollution band for a points total.
///
/// | Points       | Level     |
/// |--------------|-----------|
/// | < 200        | Low       |
/// | < 1000       | Medium    |
/// | < 3000       | High      |
/// | >= 3000      | Very High |
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum PollutionLevel {
    Low,
    Medium,
    High,
    VeryHigh,
}

impl PollutionLevel {
    /// Negative inputs are treated as zero.
    pub fn from_points(points: i64) -> Self {
        match points.max(0) {
            p if p < 200 => PollutionLevel::Low,
            p if p < 1000 => PollutionLevel::Medium,
            p if p < 3000 => PollutionLevel::High,
            _ => PollutionLevel::VeryHigh,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            PollutionLevel::Low => "Low",
            PollutionLevel::Medium => "Medium",
            PollutionLevel::High => "High",
            PollutionLevel::VeryHigh => "Very High",
        }
    }

    /// Label shown on the dashboard.
    pub fn display_label(&self) -> &'static str {
        match self {
            PollutionLevel::Low => "Rendah",
            PollutionLevel::Medium => "Sedang",
            PollutionLevel::High => "Tinggi",
            PollutionLevel::VeryHigh => "Sangat Tinggi",
        }
    }

    pub fn icon(&self) -> &'static str {
        match self {
            PollutionLevel::Low => "😊",
            PollutionLevel::Medium => "😐",
            PollutionLevel::High => "😟",
            PollutionLevel::VeryHigh => "😷",
        }
    }
}

/// Level for a points total, clamping negatives to zero.
pub fn calculate_pollution_level(points: i64) -> PollutionLevel {
    PollutionLevel::from_points(points)
}

/// Slider position in percent, `0.0..=100.0`.
pub fn slider_position(points: u64) -> f64 {
    (points as f64 / MAX_POLLUTION_POINTS * 100.0).clamp(0.0, 100.0)
}

/// Grams of CO per vehicle type present in `counts`; unknown types map to 0.
pub fn co_emission_summary(counts: &VehicleTypeCounts) -> BTreeMap<String, u64> {
    counts
        .iter()
        .map(|(vehicle, count)| {
            (
                vehicle.clone(),
                count.saturating_mul(weight_of(CO_GRAMS_PER_DETECTION, vehicle)),
            )
        })
        .collect()
}

pub fn total_co_grams(counts: &VehicleTypeCounts) -> u64 {
    saturating_total(co_emission_summary(counts).values())
}

/// Derived environmental figures for one set of counts.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DerivedMetrics {
    pub pollution_points: u64,
    pub level: PollutionLevel,
    pub level_label: &'static str,
    pub level_icon: &'static str,
    pub slider_position: f64,
    pub co_by_vehicle: BTreeMap<String, u64>,
    pub co_total_grams: u64,
}

impl DerivedMetrics {
    pub fn from_counts(counts: &VehicleTypeCounts) -> Self {
        let points = pollution_points(counts);
        let level = calculate_pollution_level(i64::try_from(points).unwrap_or(i64::MAX));
        let co_by_vehicle = co_emission_summary(counts);
        let co_total_grams = saturating_total(co_by_vehicle.values());

        Self {
            pollution_points: points,
            level,
            level_label: level.display_label(),
            level_icon: level.icon(),
            slider_position: slider_position(points),
            co_by_vehicle,
            co_total_grams,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_level_boundaries() {
        assert_eq!(calculate_pollution_level(0).as_str(), "Low");
        assert_eq!(calculate_pollution_level(199).as_str(), "Low");
        assert_eq!(calculate_pollution_level(200).as_str(), "Medium");
        assert_eq!(calculate_pollution_level(999).as_str(), "Medium");
        assert_eq!(calculate_pollution_level(1000).as_str(), "High");
        assert_eq!(calculate_pollution_level(2999).as_str(), "High");
        assert_eq!(calculate_pollution_level(3000).as_str(), "Very High");
        assert_eq!(calculate_pollution_level(-50).as_str(), "Low");
    }

    #[test]
    fn test_level_labels_and_icons() {
        let level = calculate_pollution_level(5000);
        assert_eq!(level.display_label(), "Sangat Tinggi");
        assert_eq!(level.icon(), "😷");
        assert_eq!(calculate_pollution_level(10).display_label(), "Rendah");
    }

    #[test]
    fn test_sepeda_contributes_nothing() {
        let c = counts(&[("Sepeda", 450)]);
        assert_eq!(pollution_points(&c), 0);
        assert_eq!(total_co_grams(&c), 0);
    }

    #[test]
    fn test_unknown_types_contribute_zero() {
        let c = counts(&[("Becak", 100), ("Motor", 3)]);
        assert_eq!(pollution_points(&c), 3);

        let co = co_emission_summary(&c);
        assert_eq!(co["Becak"], 0);
        assert_eq!(co["Motor"], 90);
    }

    #[test]
    fn test_example_metrics() {
        let c = counts(&[("Mobil", 5), ("Motor", 10)]);
        let metrics = DerivedMetrics::from_counts(&c);

        assert_eq!(metrics.pollution_points, 20);
        assert_eq!(metrics.level, PollutionLevel::Low);
        assert_eq!(metrics.co_total_grams, 400);
        assert!((metrics.slider_position - 0.4).abs() < 1e-9);
    }

    #[test]
    fn test_slider_is_clamped() {
        assert_eq!(slider_position(0), 0.0);
        assert_eq!(slider_position(2500), 50.0);
        assert_eq!(slider_position(12_000), 100.0);
    }

    #[test]
    fn test_huge_counts_saturate() {
        let c = counts(&[("Truk", u64::MAX), ("Bus", 3)]);
        let metrics = DerivedMetrics::from_counts(&c);

        assert_eq!(metrics.pollution_points, u64::MAX);
        assert_eq!(metrics.level, PollutionLevel::VeryHigh);
        assert_eq!(metrics.slider_position, 100.0);
        assert_eq!(metrics.co_by_vehicle["Truk"], u64::MAX);
        assert_eq!(metrics.co_total_grams, u64::MAX);
        assert_eq!(total_co_grams(&c), u64::MAX);
    }

    // Helper functions for tests
    fn counts(pairs: &[(&str, u64)]) -> VehicleTypeCounts {
        pairs.iter().map(|(k, v)| (k.to_string(), *v)).collect()
    }
}
