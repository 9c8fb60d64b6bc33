use serde::{Deserialize, Serialize};
use std::fmt;

/// The vehicle categories the dashboard knows how to weigh and chart.
///
/// Aggregation itself stays string-keyed so new upstream categories still
/// show up in totals; this enum is only consulted by the chart and the
/// emission tables.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum VehicleType {
    Motor,
    Mobil,
    Bus,
    Truk,
    Sepeda,
}

impl VehicleType {
    pub const ALL: [VehicleType; 5] = [
        VehicleType::Motor,
        VehicleType::Mobil,
        VehicleType::Bus,
        VehicleType::Truk,
        VehicleType::Sepeda,
    ];

    /// Series drawn on the hourly chart, in legend order.
    pub const CHART: [VehicleType; 4] = [
        VehicleType::Mobil,
        VehicleType::Motor,
        VehicleType::Truk,
        VehicleType::Bus,
    ];

    pub fn parse(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|v| v.as_str() == name)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            VehicleType::Motor => "Motor",
            VehicleType::Mobil => "Mobil",
            VehicleType::Bus => "Bus",
            VehicleType::Truk => "Truk",
            VehicleType::Sepeda => "Sepeda",
        }
    }

    /// Whether `name` has a series on the hourly chart.
    pub fn is_charted(name: &str) -> bool {
        Self::CHART.iter().any(|v| v.as_str() == name)
    }
}

impl fmt::Display for VehicleType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
