//! Inverse Distance Weighting (IDW) interpolation.
//!
//! Estimates moisture and temperature at each virtual grid coordinate from
//! nearby sensor readings. Each in-radius reading contributes with weight
//! `1 / distance^power`; weights are normalized to sum to 1 before the
//! weighted averages are taken. A coordinate with fewer than the configured
//! minimum of in-radius sensors yields no estimate at all; interpolation
//! never extrapolates from insufficient data.

use chrono::{DateTime, Utc};

use crate::config::Config;
use crate::grid::{self, GridCoord};
use crate::metrics;
use crate::models::{GridPoint, SensorReading};

/// Mean Earth radius in meters, for great-circle distances.
const EARTH_RADIUS_M: f64 = 6_371_000.0;

/// Sensors closer than this to a grid coordinate are treated as coincident
/// with it and copied through directly instead of interpolated.
const COINCIDENT_DISTANCE_M: f64 = 1.0;

// ---

/// Great-circle (haversine) distance in meters between two coordinates.
pub fn haversine_distance_m(lat1: f64, lon1: f64, lat2: f64, lon2: f64) -> f64 {
    // ---
    let dlat = (lat2 - lat1).to_radians();
    let dlon = (lon2 - lon1).to_radians();

    let a = (dlat / 2.0).sin().powi(2)
        + lat1.to_radians().cos() * lat2.to_radians().cos() * (dlon / 2.0).sin().powi(2);

    2.0 * EARTH_RADIUS_M * a.sqrt().asin()
}

/// Interpolate an estimate for one grid coordinate from nearby readings.
///
/// Returns `None` when fewer than `cfg.min_sensors` readings lie within the
/// search radius — that is not an error, the coordinate simply gets no grid
/// point this cycle. A reading coincident with the coordinate (closer than
/// 1 m) short-circuits the weighting and is copied through with
/// confidence 1.0.
pub fn interpolate(
    coord: &GridCoord,
    readings: &[SensorReading],
    cfg: &Config,
    now: DateTime<Utc>,
) -> Option<GridPoint> {
    // ---
    let mut weights = Vec::new();
    let mut moisture_surface_values = Vec::new();
    let mut moisture_root_values = Vec::new();
    let mut temp_values = Vec::new();
    let mut source_sensors = Vec::new();
    let mut total_weight = 0.0;

    for reading in readings {
        let distance = haversine_distance_m(
            coord.latitude,
            coord.longitude,
            reading.latitude,
            reading.longitude,
        );

        // Sensors outside the search radius never contribute
        if distance > cfg.search_radius_m {
            continue;
        }

        // A sensor sitting on the grid point is authoritative for it
        if distance < COINCIDENT_DISTANCE_M {
            return Some(build_point(
                coord,
                reading.moisture_surface,
                reading.moisture_root,
                reading.temp_surface,
                vec![reading.sensor_id.clone()],
                1.0,
                cfg,
                now,
            ));
        }

        let weight = 1.0 / distance.powf(cfg.idw_power);
        weights.push(weight);
        moisture_surface_values.push(reading.moisture_surface);
        moisture_root_values.push(reading.moisture_root);
        temp_values.push(reading.temp_surface);
        source_sensors.push(reading.sensor_id.clone());
        total_weight += weight;
    }

    if weights.len() < cfg.min_sensors as usize {
        return None;
    }

    let mut moisture_surface = 0.0;
    let mut moisture_root = 0.0;
    let mut temperature = 0.0;

    for i in 0..weights.len() {
        let norm_weight = weights[i] / total_weight;
        moisture_surface += moisture_surface_values[i] * norm_weight;
        moisture_root += moisture_root_values[i] * norm_weight;
        temperature += temp_values[i] * norm_weight;
    }

    let confidence = confidence_score(weights.len(), &weights);

    Some(build_point(
        coord,
        moisture_surface,
        moisture_root,
        temperature,
        source_sensors,
        confidence,
        cfg,
        now,
    ))
}

/// Assemble a [`GridPoint`] from interpolated values, attaching derived
/// metrics and provenance.
#[allow(clippy::too_many_arguments)]
fn build_point(
    coord: &GridCoord,
    moisture_surface: f64,
    moisture_root: f64,
    temperature: f64,
    source_sensors: Vec<String>,
    confidence: f64,
    cfg: &Config,
    now: DateTime<Utc>,
) -> GridPoint {
    // ---
    let water_deficit = metrics::water_deficit_mm(moisture_surface, moisture_root);
    let stress = metrics::stress_index(moisture_surface, temperature);
    let irrigation_need = metrics::classify_irrigation_need(water_deficit, stress);

    GridPoint {
        grid_id: grid::grid_id(&cfg.field_id, coord),
        field_id: cfg.field_id.clone(),
        timestamp: now,
        latitude: coord.latitude,
        longitude: coord.longitude,
        moisture_surface,
        moisture_root,
        temperature,
        water_deficit_mm: water_deficit,
        stress_index: stress,
        irrigation_need,
        source_sensors,
        confidence,
        computation_mode: cfg.computation_mode(),
        edge_device_id: cfg.edge_device_id.clone(),
    }
}

/// Confidence in an interpolated estimate, in [0, 1].
///
/// More contributing sensors raise the base score (saturating at 10), and a
/// more even weight distribution raises the distribution factor: both more
/// samples and more balanced influence increase trust in the estimate.
fn confidence_score(sensor_count: usize, weights: &[f64]) -> f64 {
    // ---
    let base = (sensor_count as f64 / 10.0).min(1.0);

    if weights.is_empty() {
        return base;
    }

    let distribution_factor = 1.0 / (1.0 + variance(weights));
    base * distribution_factor
}

/// Population variance.
fn variance(values: &[f64]) -> f64 {
    // ---
    if values.is_empty() {
        return 0.0;
    }

    let mean = values.iter().sum::<f64>() / values.len() as f64;
    values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / values.len() as f64
}
