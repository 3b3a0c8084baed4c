//! Virtual grid generation.
//!
//! Derives the fixed set of target coordinates covering a field's extent at
//! the configured spatial resolution. Generation is a pure function of
//! (extent, resolution): identical inputs always yield the identical
//! coordinate sequence in the identical order, because grid identifiers are
//! derived positionally from the coordinates.

/// Bounding extent of a field in decimal degrees.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FieldExtent {
    // ---
    pub min_lat: f64,
    pub max_lat: f64,
    pub min_lon: f64,
    pub max_lon: f64,
}

/// A single target coordinate on the virtual grid.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GridCoord {
    // ---
    pub latitude: f64,
    pub longitude: f64,
}

// ---

/// Convert a spacing in meters to (latitude, longitude) steps in degrees.
///
/// Uses the spherical mid-latitude approximation: one degree of latitude is
/// taken as a constant 111,320 m, and one degree of longitude shrinks with
/// `cos(latitude)`. This introduces a known spatial distortion (growing with
/// field size and latitude) that is accepted for edge-resolution grids.
/// Replacing this with proper geodesic math only requires changing this one
/// function.
fn meters_to_degrees(meters: f64, at_latitude: f64) -> (f64, f64) {
    // ---
    const METERS_PER_DEGREE_LAT: f64 = 111_320.0;

    let lat_step = meters / METERS_PER_DEGREE_LAT;
    let lon_step = meters / (METERS_PER_DEGREE_LAT * at_latitude.to_radians().cos());
    (lat_step, lon_step)
}

/// Generate the complete, order-stable grid covering `extent` at
/// `resolution_m` spacing, inclusive of the extent edges.
///
/// Coordinates are produced lat-major (south to north), ascending longitude
/// within each row. Positions are computed as `min + i * step` from integer
/// indices rather than by accumulating floats, so the sequence is
/// bit-reproducible for the same inputs.
pub fn generate_grid_points(extent: &FieldExtent, resolution_m: f64) -> Vec<GridCoord> {
    // ---
    let mid_lat = (extent.min_lat + extent.max_lat) / 2.0;
    let (lat_step, lon_step) = meters_to_degrees(resolution_m, mid_lat);

    // Inclusive cover: small epsilon absorbs float error at the far edge.
    let eps = 1e-9;
    let rows = ((extent.max_lat - extent.min_lat) / lat_step + eps).floor() as usize + 1;
    let cols = ((extent.max_lon - extent.min_lon) / lon_step + eps).floor() as usize + 1;

    let mut points = Vec::with_capacity(rows * cols);
    for i in 0..rows {
        let latitude = extent.min_lat + i as f64 * lat_step;
        for j in 0..cols {
            let longitude = extent.min_lon + j as f64 * lon_step;
            points.push(GridCoord {
                latitude,
                longitude,
            });
        }
    }

    points
}

/// Deterministic grid cell identifier from the field id and the coordinate
/// rounded to 5 decimal places (~1 m). Stable across calls and restarts.
pub fn grid_id(field_id: &str, coord: &GridCoord) -> String {
    // ---
    format!("{}_{:.5}_{:.5}", field_id, coord.latitude, coord.longitude)
}

#[cfg(test)]
mod tests {
    // ---
    use super::*;

    fn test_extent() -> FieldExtent {
        // ---
        FieldExtent {
            min_lat: 37.7749,
            max_lat: 37.7800,
            min_lon: -122.4194,
            max_lon: -122.4100,
        }
    }

    #[test]
    fn test_grid_is_deterministic_and_order_stable() {
        // ---
        let a = generate_grid_points(&test_extent(), 20.0);
        let b = generate_grid_points(&test_extent(), 20.0);

        assert_eq!(a.len(), b.len());
        for (pa, pb) in a.iter().zip(b.iter()) {
            assert_eq!(pa.latitude.to_bits(), pb.latitude.to_bits());
            assert_eq!(pa.longitude.to_bits(), pb.longitude.to_bits());
        }
    }

    #[test]
    fn test_grid_covers_extent_inclusively() {
        // ---
        let extent = test_extent();
        let points = generate_grid_points(&extent, 20.0);

        assert!(!points.is_empty());
        let first = points.first().unwrap();
        let last = points.last().unwrap();

        // Southwest corner is always the first point
        assert_eq!(first.latitude, extent.min_lat);
        assert_eq!(first.longitude, extent.min_lon);

        // No point escapes the extent, and the far edge is approached
        // within one grid step
        for p in &points {
            assert!(p.latitude >= extent.min_lat && p.latitude <= extent.max_lat);
            assert!(p.longitude >= extent.min_lon && p.longitude <= extent.max_lon);
        }
        let (lat_step, lon_step) = meters_to_degrees(20.0, 37.77745);
        assert!(extent.max_lat - last.latitude < lat_step);
        assert!(extent.max_lon - last.longitude < lon_step);
    }

    #[test]
    fn test_grid_row_ordering_is_lat_major() {
        // ---
        let points = generate_grid_points(&test_extent(), 20.0);

        let mut prev: Option<&GridCoord> = None;
        for p in &points {
            if let Some(q) = prev {
                assert!(
                    p.latitude > q.latitude
                        || (p.latitude == q.latitude && p.longitude > q.longitude),
                    "grid points out of order"
                );
            }
            prev = Some(p);
        }
    }

    #[test]
    fn test_degenerate_extent_yields_single_point() {
        // ---
        let extent = FieldExtent {
            min_lat: 40.0,
            max_lat: 40.0,
            min_lon: -100.0,
            max_lon: -100.0,
        };
        let points = generate_grid_points(&extent, 20.0);
        assert_eq!(points.len(), 1);
    }

    #[test]
    fn test_grid_id_is_pure_and_rounded() {
        // ---
        let coord = GridCoord {
            latitude: 37.774912345,
            longitude: -122.419456789,
        };
        let a = grid_id("field-001", &coord);
        let b = grid_id("field-001", &coord);

        assert_eq!(a, b);
        assert_eq!(a, "field-001_37.77491_-122.41946");

        // Coordinates identical after rounding map to the same cell
        let nearby = GridCoord {
            latitude: 37.774912999,
            longitude: -122.419456001,
        };
        assert_eq!(grid_id("field-001", &nearby), a);
    }

    #[test]
    fn test_lon_step_widens_with_latitude() {
        // ---
        let (lat_eq, lon_eq) = meters_to_degrees(20.0, 0.0);
        let (lat_60, lon_60) = meters_to_degrees(20.0, 60.0);

        assert!((lat_eq - lat_60).abs() < 1e-12);
        // At 60°N a degree of longitude is half as long, so the step doubles
        assert!((lon_60 / lon_eq - 2.0).abs() < 1e-3);
    }
}
