//! [`RegionConfig`] → [`ScanRegion`] resolution.

use geo::{Coord, LineString, MultiPolygon, Polygon};
use vendor_map_geography_models::{GeoPoint, GridBounds, RegionConfig};

use crate::{GeoError, ScanRegion, boundary};

/// Minimum number of distinct vertices in a polygon ring.
const MIN_POLYGON_VERTICES: usize = 3;

/// Resolves a declarative region into a concrete [`ScanRegion`].
///
/// Only `boundary` regions touch the network.
///
/// # Errors
///
/// Returns [`GeoError`] if the step or bounds are invalid, the polygon has
/// too few vertices, or the boundary cannot be downloaded or found.
pub async fn resolve_region(
    client: &reqwest::Client,
    config: &RegionConfig,
) -> Result<ScanRegion, GeoError> {
    validate_step(config.step())?;

    match config {
        RegionConfig::Grid {
            lat_min,
            lat_max,
            lon_min,
            lon_max,
            step,
        } => {
            let bounds = GridBounds {
                lat_min: *lat_min,
                lat_max: *lat_max,
                lon_min: *lon_min,
                lon_max: *lon_max,
            };
            validate_bounds(&bounds)?;
            Ok(ScanRegion::Grid {
                bounds,
                step: *step,
            })
        }
        RegionConfig::Centered {
            lat,
            lon,
            grid_size,
            step,
        } => {
            if *grid_size == 0 || !lat.is_finite() || !lon.is_finite() {
                return Err(GeoError::InvalidRegion {
                    message: format!(
                        "Centered region needs a finite center and a positive grid size, \
                         got ({lat}, {lon}) x {grid_size}"
                    ),
                });
            }
            Ok(ScanRegion::Centered {
                center: GeoPoint::new(*lat, *lon),
                grid_size: *grid_size,
                step: *step,
            })
        }
        RegionConfig::Polygon { vertices, step } => Ok(ScanRegion::Area {
            shape: MultiPolygon(vec![polygon_from_vertices(vertices)?]),
            step: *step,
        }),
        RegionConfig::Boundary {
            url,
            property,
            value,
            step,
        } => {
            let shape = boundary::fetch_boundary(client, url, property, value).await?;
            Ok(ScanRegion::Area { shape, step: *step })
        }
    }
}

/// Builds a polygon from `[lat, lon]` vertices, closing the ring if needed.
///
/// # Errors
///
/// Returns [`GeoError::InvalidRegion`] if there are fewer than three
/// distinct vertices or any coordinate is not finite.
pub fn polygon_from_vertices(vertices: &[[f64; 2]]) -> Result<Polygon<f64>, GeoError> {
    if vertices.iter().flatten().any(|v| !v.is_finite()) {
        return Err(GeoError::InvalidRegion {
            message: "Polygon vertices must be finite".to_string(),
        });
    }

    let mut coords: Vec<Coord<f64>> = vertices
        .iter()
        .map(|[lat, lon]| Coord { x: *lon, y: *lat })
        .collect();

    if coords.first() == coords.last() {
        coords.pop();
    }
    if coords.len() < MIN_POLYGON_VERTICES {
        return Err(GeoError::InvalidRegion {
            message: format!(
                "Polygon needs at least {MIN_POLYGON_VERTICES} distinct vertices, got {}",
                coords.len()
            ),
        });
    }

    // `Polygon::new` closes the exterior ring.
    Ok(Polygon::new(LineString::new(coords), vec![]))
}

fn validate_step(step: f64) -> Result<(), GeoError> {
    if step.is_finite() && step > 0.0 {
        Ok(())
    } else {
        Err(GeoError::InvalidRegion {
            message: format!("Step must be a positive number of degrees, got {step}"),
        })
    }
}

fn validate_bounds(bounds: &GridBounds) -> Result<(), GeoError> {
    if bounds.lat_min < bounds.lat_max && bounds.lon_min < bounds.lon_max {
        Ok(())
    } else {
        Err(GeoError::InvalidRegion {
            message: format!(
                "Bounds are empty or inverted: lat {}..{}, lon {}..{}",
                bounds.lat_min, bounds.lat_max, bounds.lon_min, bounds.lon_max
            ),
        })
    }
}

#[cfg(test)]
mod tests {
    use geo::Contains;

    use super::*;

    #[tokio::test]
    async fn resolves_grid_region() {
        let config = RegionConfig::Grid {
            lat_min: -23.6,
            lat_max: -23.5,
            lon_min: -46.7,
            lon_max: -46.55,
            step: 0.004,
        };
        let region = resolve_region(&reqwest::Client::new(), &config)
            .await
            .unwrap();
        assert!(matches!(region, ScanRegion::Grid { .. }));
    }

    #[tokio::test]
    async fn rejects_inverted_bounds() {
        let config = RegionConfig::Grid {
            lat_min: -23.5,
            lat_max: -23.6,
            lon_min: -46.7,
            lon_max: -46.55,
            step: 0.004,
        };
        let err = resolve_region(&reqwest::Client::new(), &config)
            .await
            .unwrap_err();
        assert!(matches!(err, GeoError::InvalidRegion { .. }));
    }

    #[tokio::test]
    async fn resolves_centered_region() {
        let config = RegionConfig::Centered {
            lat: -23.543_167,
            lon: -46.629_333,
            grid_size: 20,
            step: 0.0005,
        };
        let region = resolve_region(&reqwest::Client::new(), &config)
            .await
            .unwrap();
        assert_eq!(crate::grid::candidate_points(&region).len(), 21 * 21);

        let empty = RegionConfig::Centered {
            lat: -23.5,
            lon: -46.6,
            grid_size: 0,
            step: 0.0005,
        };
        let err = resolve_region(&reqwest::Client::new(), &empty)
            .await
            .unwrap_err();
        assert!(matches!(err, GeoError::InvalidRegion { .. }));
    }

    #[tokio::test]
    async fn rejects_zero_step() {
        let config = RegionConfig::Polygon {
            vertices: vec![[0.0, 0.0], [0.0, 1.0], [1.0, 1.0]],
            step: 0.0,
        };
        let err = resolve_region(&reqwest::Client::new(), &config)
            .await
            .unwrap_err();
        assert!(matches!(err, GeoError::InvalidRegion { .. }));
    }

    #[test]
    fn polygon_vertices_are_lat_lon() {
        let polygon =
            polygon_from_vertices(&[[-23.4, -46.75], [-23.4, -46.6], [-23.72, -46.6]]).unwrap();
        // x = lon, y = lat
        assert!(polygon.contains(&geo::Point::new(-46.62, -23.45)));
        assert!(!polygon.contains(&geo::Point::new(-23.45, -46.62)));
    }

    #[test]
    fn explicitly_closed_ring_is_accepted() {
        let polygon =
            polygon_from_vertices(&[[0.0, 0.0], [0.0, 1.0], [1.0, 1.0], [0.0, 0.0]]).unwrap();
        assert_eq!(polygon.exterior().0.len(), 4);
    }

    #[test]
    fn too_few_vertices_is_an_error() {
        let err = polygon_from_vertices(&[[0.0, 0.0], [0.0, 1.0], [0.0, 0.0]]).unwrap_err();
        assert!(matches!(err, GeoError::InvalidRegion { .. }));
    }
}
