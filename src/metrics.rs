//! Derived agronomic metrics.
//!
//! Pure functions of interpolated moisture/temperature. The constants here
//! (field capacity, root depth, stress pivots, classification thresholds) are
//! domain constants shared with downstream compliance and analytics
//! consumers and must not drift.

use crate::models::IrrigationNeed;

/// Volumetric moisture at field capacity.
const FIELD_CAPACITY: f64 = 0.35;

/// Effective root depth expressed in mm of water column (60 cm).
const ROOT_DEPTH_MM: f64 = 600.0;

// ---

/// Water needed (mm) to return the root zone to field capacity.
///
/// Zero when average moisture is at or above field capacity; never negative.
pub fn water_deficit_mm(moisture_surface: f64, moisture_root: f64) -> f64 {
    // ---
    let avg_moisture = (moisture_surface + moisture_root) / 2.0;

    if avg_moisture >= FIELD_CAPACITY {
        return 0.0;
    }

    ((FIELD_CAPACITY - avg_moisture) * ROOT_DEPTH_MM).max(0.0)
}

/// Composite crop stress index on a [0, 1] scale.
///
/// Moisture stress ramps from 0 at 0.20 volumetric moisture to 1 at zero;
/// temperature stress ramps from 0 at 30 °C to 1 at 45 °C. The two are
/// averaged and clamped to 1.
pub fn stress_index(moisture: f64, temperature: f64) -> f64 {
    // ---
    let moisture_stress = ((0.20 - moisture) / 0.20).max(0.0);
    let temp_stress = ((temperature - 30.0) / 15.0).max(0.0);

    ((moisture_stress + temp_stress) / 2.0).min(1.0)
}

/// Classify irrigation need from water deficit (mm) and stress index.
///
/// Ordered thresholds, first match wins.
pub fn classify_irrigation_need(water_deficit: f64, stress_index: f64) -> IrrigationNeed {
    // ---
    if water_deficit < 10.0 && stress_index < 0.2 {
        IrrigationNeed::None
    } else if water_deficit < 30.0 && stress_index < 0.4 {
        IrrigationNeed::Low
    } else if water_deficit < 60.0 && stress_index < 0.6 {
        IrrigationNeed::Medium
    } else if water_deficit < 100.0 && stress_index < 0.8 {
        IrrigationNeed::High
    } else {
        IrrigationNeed::Critical
    }
}

#[cfg(test)]
mod tests {
    // ---
    use super::*;

    #[test]
    fn test_deficit_zero_at_or_above_field_capacity() {
        // ---
        assert_eq!(water_deficit_mm(0.35, 0.35), 0.0);
        assert_eq!(water_deficit_mm(0.40, 0.40), 0.0);
        // Average of 0.30 and 0.40 is exactly field capacity
        assert_eq!(water_deficit_mm(0.30, 0.40), 0.0);
    }

    #[test]
    fn test_deficit_scales_with_dryness() {
        // ---
        // avg 0.25, 0.10 below capacity over 600 mm depth
        assert!((water_deficit_mm(0.20, 0.30) - 60.0).abs() < 1e-9);
        // avg 0.05: (0.35 - 0.05) * 600 = 180 mm
        assert!((water_deficit_mm(0.05, 0.05) - 180.0).abs() < 1e-9);
    }

    #[test]
    fn test_deficit_never_negative() {
        // ---
        for m in [0.0, 0.1, 0.2, 0.35, 0.5, 0.9] {
            assert!(water_deficit_mm(m, m) >= 0.0);
        }
    }

    #[test]
    fn test_stress_index_clamped_to_unit_interval() {
        // ---
        // No stress at comfortable moisture and temperature
        assert_eq!(stress_index(0.30, 20.0), 0.0);

        // Extreme inputs still clamp to 1
        assert_eq!(stress_index(0.0, 60.0), 1.0);

        for m in [0.0, 0.05, 0.1, 0.2, 0.4] {
            for t in [10.0, 25.0, 30.0, 38.0, 50.0] {
                let s = stress_index(m, t);
                assert!((0.0..=1.0).contains(&s), "stress {} out of range", s);
            }
        }
    }

    #[test]
    fn test_stress_components() {
        // ---
        // moisture 0.05: moisture stress (0.20-0.05)/0.20 = 0.75
        // temperature 35: temp stress (35-30)/15 ≈ 0.333
        let s = stress_index(0.05, 35.0);
        assert!((s - (0.75 + 5.0 / 15.0) / 2.0).abs() < 1e-9);
        assert!((s - 0.5417).abs() < 1e-3);
    }

    #[test]
    fn test_classification_thresholds() {
        // ---
        assert_eq!(classify_irrigation_need(0.0, 0.0), IrrigationNeed::None);
        assert_eq!(classify_irrigation_need(9.9, 0.19), IrrigationNeed::None);
        assert_eq!(classify_irrigation_need(10.0, 0.0), IrrigationNeed::Low);
        assert_eq!(classify_irrigation_need(0.0, 0.2), IrrigationNeed::Low);
        assert_eq!(classify_irrigation_need(45.0, 0.5), IrrigationNeed::Medium);
        assert_eq!(classify_irrigation_need(80.0, 0.7), IrrigationNeed::High);
        assert_eq!(classify_irrigation_need(150.0, 0.9), IrrigationNeed::Critical);
        // Either axis alone can push past a class boundary
        assert_eq!(classify_irrigation_need(0.0, 0.85), IrrigationNeed::Critical);
        assert_eq!(classify_irrigation_need(120.0, 0.0), IrrigationNeed::Critical);
    }

    #[test]
    fn test_classification_is_monotonic() {
        // ---
        let deficits = [0.0, 5.0, 10.0, 25.0, 30.0, 55.0, 60.0, 95.0, 100.0, 140.0];
        let stresses = [0.0, 0.1, 0.2, 0.35, 0.4, 0.55, 0.6, 0.75, 0.8, 1.0];

        // Increasing deficit with stress held fixed never lowers severity
        for &s in &stresses {
            let mut prev = IrrigationNeed::None;
            for &d in &deficits {
                let class = classify_irrigation_need(d, s);
                assert!(class >= prev, "severity dropped at deficit={}, stress={}", d, s);
                prev = class;
            }
        }

        // And vice versa
        for &d in &deficits {
            let mut prev = IrrigationNeed::None;
            for &s in &stresses {
                let class = classify_irrigation_need(d, s);
                assert!(class >= prev, "severity dropped at deficit={}, stress={}", d, s);
                prev = class;
            }
        }
    }

    #[test]
    fn test_drought_scenario_is_critical() {
        // ---
        // Dry field at 35 °C: deficit 180 mm, stress ≈ 0.54
        let deficit = water_deficit_mm(0.05, 0.05);
        let stress = stress_index(0.05, 35.0);

        assert!((deficit - 180.0).abs() < 1e-9);
        assert!((stress - 0.54).abs() < 0.01);
        assert_eq!(
            classify_irrigation_need(deficit, stress),
            IrrigationNeed::Critical
        );
    }
}
