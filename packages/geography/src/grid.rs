//! Candidate point enumeration.
//!
//! Axis sequences follow half-open `arange` semantics: the first value is
//! the minimum, each next value adds one step, and the maximum itself is
//! never reached. Candidates are emitted row-major (latitude outer,
//! longitude inner), so the order depends only on the region definition.

use geo::{BoundingRect, Contains, Point};
use vendor_map_geography_models::GeoPoint;

use crate::ScanRegion;

/// Returns the values `min, min + step, ...` strictly below `max`.
///
/// Returns an empty sequence for a non-positive or non-finite step, or when
/// `max <= min`.
#[must_use]
#[allow(
    clippy::cast_possible_truncation,
    clippy::cast_sign_loss,
    clippy::cast_precision_loss
)]
pub fn axis_values(min: f64, max: f64, step: f64) -> Vec<f64> {
    if !(step.is_finite() && step > 0.0 && min.is_finite() && max.is_finite()) || max <= min {
        return Vec::new();
    }

    let count = ((max - min) / step).ceil() as usize;
    (0..count).map(|i| (i as f64).mul_add(step, min)).collect()
}

/// Returns `center + i * step` for `i` in `-(grid_size / 2)..=grid_size / 2`.
#[must_use]
#[allow(clippy::suboptimal_flops)]
pub fn centered_axis(center: f64, grid_size: u32, step: f64) -> Vec<f64> {
    // Unfused so the values match plain `center + i * step` arithmetic.
    let half = i32::try_from(grid_size / 2).unwrap_or(i32::MAX);
    (-half..=half).map(|i| center + f64::from(i) * step).collect()
}

/// Enumerates the candidate points of a region in row-major order.
#[must_use]
pub fn candidate_points(region: &ScanRegion) -> Vec<GeoPoint> {
    match region {
        ScanRegion::Grid { bounds, step } => {
            let lats = axis_values(bounds.lat_min, bounds.lat_max, *step);
            let lons = axis_values(bounds.lon_min, bounds.lon_max, *step);
            let mut points = Vec::with_capacity(lats.len() * lons.len());
            for &lat in &lats {
                for &lon in &lons {
                    points.push(GeoPoint::new(lat, lon));
                }
            }
            points
        }
        ScanRegion::Centered {
            center,
            grid_size,
            step,
        } => {
            let lats = centered_axis(center.lat, *grid_size, *step);
            let lons = centered_axis(center.lon, *grid_size, *step);
            lats.iter()
                .flat_map(|&lat| lons.iter().map(move |&lon| GeoPoint::new(lat, lon)))
                .collect()
        }
        ScanRegion::Area { shape, step } => {
            let Some(rect) = shape.bounding_rect() else {
                return Vec::new();
            };
            let lats = axis_values(rect.min().y, rect.max().y, *step);
            let lons = axis_values(rect.min().x, rect.max().x, *step);

            let mut points = Vec::new();
            for &lat in &lats {
                for &lon in &lons {
                    if shape.contains(&Point::new(lon, lat)) {
                        points.push(GeoPoint::new(lat, lon));
                    }
                }
            }
            log::debug!(
                "Polygon filter kept {} of {} grid points",
                points.len(),
                lats.len() * lons.len()
            );
            points
        }
    }
}

#[cfg(test)]
mod tests {
    use geo::{LineString, MultiPolygon, Polygon};
    use vendor_map_geography_models::GridBounds;

    use super::*;

    fn square(min: f64, max: f64) -> MultiPolygon<f64> {
        MultiPolygon(vec![Polygon::new(
            LineString::from(vec![(min, min), (max, min), (max, max), (min, max), (min, min)]),
            vec![],
        )])
    }

    #[test]
    fn axis_is_half_open() {
        let values = axis_values(0.0, 1.0, 0.25);
        assert_eq!(values.len(), 4);
        assert!(values[0].abs() < f64::EPSILON);
        assert!((values[3] - 0.75).abs() < 1e-12);
    }

    #[test]
    fn axis_rejects_bad_input() {
        assert!(axis_values(0.0, 1.0, 0.0).is_empty());
        assert!(axis_values(0.0, 1.0, -0.1).is_empty());
        assert!(axis_values(1.0, 0.0, 0.1).is_empty());
        assert!(axis_values(0.0, 1.0, f64::NAN).is_empty());
    }

    #[test]
    fn grid_is_row_major_cartesian_product() {
        let bounds = GridBounds {
            lat_min: -23.6,
            lat_max: -23.5,
            lon_min: -46.7,
            lon_max: -46.6,
        };
        let step = 0.03;
        let region = ScanRegion::Grid { bounds, step };

        let lats = axis_values(bounds.lat_min, bounds.lat_max, step);
        let lons = axis_values(bounds.lon_min, bounds.lon_max, step);
        let expected: Vec<GeoPoint> = lats
            .iter()
            .flat_map(|&lat| lons.iter().map(move |&lon| GeoPoint::new(lat, lon)))
            .collect();

        let points = candidate_points(&region);
        assert_eq!(points, expected);
        // Longitude varies fastest.
        assert!((points[0].lat - points[1].lat).abs() < f64::EPSILON);
    }

    #[test]
    fn centered_three_by_three_keeps_the_center() {
        let (lat, lon) = (-23.543_167, -46.629_333);
        let region = ScanRegion::Centered {
            center: GeoPoint::new(lat, lon),
            grid_size: 3,
            step: 0.0005,
        };
        let points = candidate_points(&region);
        assert_eq!(points.len(), 9);
        assert_eq!(points[4], GeoPoint::new(lat, lon));
        assert_eq!(points[0], GeoPoint::new(lat - 0.0005, lon - 0.0005));
        assert_eq!(points[8], GeoPoint::new(lat + 0.0005, lon + 0.0005));
    }

    #[test]
    fn centered_even_size_spans_both_ends() {
        let values = centered_axis(-23.543_167, 20, 0.0005);
        assert_eq!(values.len(), 21);
        assert_eq!(values[0], -23.543_167 + -10.0 * 0.0005);
        assert_eq!(values[10], -23.543_167);
        assert_eq!(values[20], -23.543_167 + 10.0 * 0.0005);
    }

    #[test]
    fn area_candidates_are_inside_the_shape() {
        let shape = square(0.0, 1.0);
        let region = ScanRegion::Area {
            shape: shape.clone(),
            step: 0.1,
        };
        let points = candidate_points(&region);
        assert!(!points.is_empty());
        for point in &points {
            assert!(shape.contains(&Point::new(point.lon, point.lat)));
        }
        // Points on the boundary (lat == 0 or lon == 0) are excluded.
        assert!(points.iter().all(|p| p.lat > 0.0 && p.lon > 0.0));
    }

    #[test]
    fn area_filters_out_points_outside_a_triangle() {
        let triangle = MultiPolygon(vec![Polygon::new(
            LineString::from(vec![(0.0, 0.0), (1.0, 0.0), (0.0, 1.0), (0.0, 0.0)]),
            vec![],
        )]);
        let region = ScanRegion::Area {
            shape: triangle,
            step: 0.1,
        };
        let points = candidate_points(&region);
        let full_grid = axis_values(0.0, 1.0, 0.1).len().pow(2);
        assert!(points.len() < full_grid);
        assert!(points.iter().all(|p| p.lat + p.lon < 1.0 + 1e-9));
    }
}
