//! Data models for the edge grid processor.
//!
//! Two record types flow through the pipeline: [`SensorReading`] (a physical
//! measurement, consumed read-only) and [`GridPoint`] (a computed estimate at
//! one coordinate of the virtual grid). Grid points are immutable once
//! created; a later compute cycle supersedes a point by producing a new one
//! with the same grid id, it never updates the old row.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// ---

/// A physical sensor measurement as delivered by the reading source
/// (remote API when online, local cache table when offline).
#[derive(Debug, Clone, Deserialize, sqlx::FromRow)]
pub struct SensorReading {
    // ---
    pub sensor_id: String,
    pub timestamp: DateTime<Utc>,
    pub latitude: f64,
    pub longitude: f64,
    pub moisture_surface: f64,
    pub moisture_root: f64,
    pub temp_surface: f64,
    pub battery_voltage: f64,
    pub quality_flag: String,
}

/// One computed estimate on the virtual sensor grid.
///
/// `grid_id` is derived from the field id and the rounded coordinate, so
/// recomputing the same coordinate is idempotent across cycles and restarts.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GridPoint {
    // ---
    pub grid_id: String,
    pub field_id: String,
    pub timestamp: DateTime<Utc>,
    pub latitude: f64,
    pub longitude: f64,
    pub moisture_surface: f64,
    pub moisture_root: f64,
    pub temperature: f64,
    pub water_deficit_mm: f64,
    pub stress_index: f64,
    pub irrigation_need: IrrigationNeed,
    pub source_sensors: Vec<String>,
    pub confidence: f64,
    pub computation_mode: String,
    pub edge_device_id: String,
}

/// Irrigation-need severity class derived from water deficit and stress.
///
/// The variant order is the severity order, so `Ord` comparisons between
/// classes are meaningful (e.g. `High > Low`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IrrigationNeed {
    None,
    Low,
    Medium,
    High,
    Critical,
}

impl IrrigationNeed {
    /// Wire/database representation, matching the serde lowercase form.
    pub fn as_str(&self) -> &'static str {
        // ---
        match self {
            IrrigationNeed::None => "none",
            IrrigationNeed::Low => "low",
            IrrigationNeed::Medium => "medium",
            IrrigationNeed::High => "high",
            IrrigationNeed::Critical => "critical",
        }
    }
}

impl std::fmt::Display for IrrigationNeed {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    // ---
    use super::*;

    #[test]
    fn test_irrigation_need_severity_order() {
        // ---
        assert!(IrrigationNeed::None < IrrigationNeed::Low);
        assert!(IrrigationNeed::Low < IrrigationNeed::Medium);
        assert!(IrrigationNeed::Medium < IrrigationNeed::High);
        assert!(IrrigationNeed::High < IrrigationNeed::Critical);
    }

    #[test]
    fn test_irrigation_need_wire_form() {
        // ---
        assert_eq!(IrrigationNeed::Critical.as_str(), "critical");
        assert_eq!(
            serde_json::to_string(&IrrigationNeed::Medium).unwrap(),
            "\"medium\""
        );
        let parsed: IrrigationNeed = serde_json::from_str("\"high\"").unwrap();
        assert_eq!(parsed, IrrigationNeed::High);
    }
}
