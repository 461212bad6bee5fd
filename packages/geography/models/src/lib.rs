#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Geographic point and scan region types.
//!
//! These types describe *where* a scan looks: individual WGS84 points, the
//! resume identity derived from them, and the declarative region
//! definitions read from scan TOML files. Turning a [`RegionConfig`] into a
//! concrete candidate sequence lives in `vendor_map_geography`.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Number of decimal places kept in a [`PointKey`] (~11 m at the equator).
pub const POINT_KEY_PRECISION: usize = 4;

/// A WGS84 coordinate pair in degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint {
    /// Latitude in degrees.
    pub lat: f64,
    /// Longitude in degrees.
    pub lon: f64,
}

impl GeoPoint {
    /// Creates a point from latitude and longitude.
    #[must_use]
    pub const fn new(lat: f64, lon: f64) -> Self {
        Self { lat, lon }
    }

    /// Returns the resume identity of this point.
    #[must_use]
    pub fn key(&self) -> PointKey {
        PointKey::from_coords(self.lat, self.lon)
    }
}

impl fmt::Display for GeoPoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.6}, {:.6}", self.lat, self.lon)
    }
}

/// Resume identity of a point: `"{lat:.4},{lon:.4}"`.
///
/// Two points that format to the same key are the same point as far as
/// the ledger is concerned.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct PointKey(String);

impl PointKey {
    /// Builds the key for the given coordinates.
    #[must_use]
    pub fn from_coords(lat: f64, lon: f64) -> Self {
        Self(format!(
            "{lat:.prec$},{lon:.prec$}",
            prec = POINT_KEY_PRECISION
        ))
    }

    /// Returns the key as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PointKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Rectangular bounds in degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GridBounds {
    /// Southern edge (inclusive).
    pub lat_min: f64,
    /// Northern edge (exclusive).
    pub lat_max: f64,
    /// Western edge (inclusive).
    pub lon_min: f64,
    /// Eastern edge (exclusive).
    pub lon_max: f64,
}

/// Declarative scan region, tagged by `type` in TOML.
///
/// ```toml
/// [region]
/// type = "grid"
/// lat_min = -23.60
/// lat_max = -23.50
/// lon_min = -46.70
/// lon_max = -46.55
/// step = 0.004
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum RegionConfig {
    /// Every grid point inside a bounding box.
    Grid {
        /// Southern edge (inclusive).
        lat_min: f64,
        /// Northern edge (exclusive).
        lat_max: f64,
        /// Western edge (inclusive).
        lon_min: f64,
        /// Eastern edge (exclusive).
        lon_max: f64,
        /// Grid spacing in degrees.
        step: f64,
    },
    /// Grid points strictly inside a hand-drawn polygon.
    Polygon {
        /// Ring vertices as `[lat, lon]` pairs. The ring is closed
        /// automatically if the last vertex differs from the first.
        vertices: Vec<[f64; 2]>,
        /// Grid spacing in degrees.
        step: f64,
    },
    /// A `grid_size` x `grid_size` block of points around a center, at
    /// offsets `-(grid_size / 2)..=grid_size / 2` steps on each axis. Even
    /// sizes therefore yield `grid_size + 1` points per axis.
    Centered {
        /// Center latitude.
        lat: f64,
        /// Center longitude.
        lon: f64,
        /// Nominal points per axis.
        grid_size: u32,
        /// Grid spacing in degrees.
        step: f64,
    },
    /// Grid points strictly inside an official boundary downloaded as a
    /// `GeoJSON` `FeatureCollection`.
    Boundary {
        /// URL of the `FeatureCollection`.
        url: String,
        /// Feature property used to select the boundary (e.g. `"id"`).
        property: String,
        /// Expected value of `property`, compared as text.
        value: String,
        /// Grid spacing in degrees.
        step: f64,
    },
}

impl RegionConfig {
    /// Returns the grid spacing in degrees.
    #[must_use]
    pub const fn step(&self) -> f64 {
        match self {
            Self::Grid { step, .. }
            | Self::Centered { step, .. }
            | Self::Polygon { step, .. }
            | Self::Boundary { step, .. } => *step,
        }
    }

    /// Short label for logs and plans.
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::Grid { .. } => "grid",
            Self::Centered { .. } => "centered",
            Self::Polygon { .. } => "polygon",
            Self::Boundary { .. } => "boundary",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn key_rounds_to_four_decimals() {
        let key = GeoPoint::new(-23.543_167, -46.629_333).key();
        assert_eq!(key.to_string(), "-23.5432,-46.6293");
    }

    #[test]
    fn nearby_points_share_a_key() {
        let a = GeoPoint::new(-23.543_21, -46.629_31);
        let b = GeoPoint::new(-23.543_19, -46.629_29);
        assert_eq!(a.key(), b.key());
    }

    #[test]
    fn distinct_points_have_distinct_keys() {
        let a = GeoPoint::new(-23.5432, -46.6293);
        let b = GeoPoint::new(-23.5437, -46.6293);
        assert_ne!(a.key(), b.key());
    }

    #[test]
    fn parses_grid_region_from_toml() {
        let region: RegionConfig = toml::from_str(
            r#"
            type = "grid"
            lat_min = -23.6
            lat_max = -23.5
            lon_min = -46.7
            lon_max = -46.55
            step = 0.004
            "#,
        )
        .unwrap();
        assert_eq!(region.kind(), "grid");
        assert!((region.step() - 0.004).abs() < f64::EPSILON);
    }

    #[test]
    fn parses_polygon_region_from_toml() {
        let region: RegionConfig = toml::from_str(
            r#"
            type = "polygon"
            step = 0.0055
            vertices = [[-23.40, -46.75], [-23.40, -46.60], [-23.72, -46.60]]
            "#,
        )
        .unwrap();
        let RegionConfig::Polygon { vertices, .. } = region else {
            panic!("expected polygon region");
        };
        assert_eq!(vertices.len(), 3);
        assert!((vertices[2][0] - -23.72).abs() < f64::EPSILON);
    }

    #[test]
    fn parses_centered_region_from_toml() {
        let region: RegionConfig = toml::from_str(
            r#"
            type = "centered"
            lat = -23.543167
            lon = -46.629333
            grid_size = 3
            step = 0.0005
            "#,
        )
        .unwrap();
        assert_eq!(region.kind(), "centered");
        assert!(matches!(region, RegionConfig::Centered { grid_size: 3, .. }));
    }
}
