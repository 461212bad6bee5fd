#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Scan region resolution.
//!
//! Turns a declarative [`RegionConfig`] into a [`ScanRegion`] (downloading
//! official boundaries when needed) and enumerates the deterministic,
//! row-major candidate point sequence a scan walks over.

pub mod boundary;
pub mod grid;
pub mod region;

use geo::MultiPolygon;
use thiserror::Error;
use vendor_map_geography_models::{GeoPoint, GridBounds};

pub use region::resolve_region;

/// Errors that can occur while resolving a scan region.
#[derive(Debug, Error)]
pub enum GeoError {
    /// HTTP request failed.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// JSON parsing failed.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// The region definition is unusable.
    #[error("Invalid region: {message}")]
    InvalidRegion {
        /// Description of what went wrong.
        message: String,
    },

    /// No feature in the boundary collection matched.
    #[error("No boundary feature with {property} = {value}")]
    BoundaryNotFound {
        /// Property that was searched.
        property: String,
        /// Value that was expected.
        value: String,
    },
}

/// A resolved scan region.
#[derive(Debug, Clone, PartialEq)]
pub enum ScanRegion {
    /// Every grid point inside rectangular bounds.
    Grid {
        /// Grid bounds.
        bounds: GridBounds,
        /// Grid spacing in degrees.
        step: f64,
    },
    /// Points at whole-step offsets from a center.
    Centered {
        /// Center point, always a candidate.
        center: GeoPoint,
        /// Nominal points per axis.
        grid_size: u32,
        /// Grid spacing in degrees.
        step: f64,
    },
    /// Grid points over the shape's bounding box, kept only when strictly
    /// inside the shape. Coordinates are `x = lon`, `y = lat`.
    Area {
        /// The area polygon(s).
        shape: MultiPolygon<f64>,
        /// Grid spacing in degrees.
        step: f64,
    },
}

impl ScanRegion {
    /// Returns the grid spacing in degrees.
    #[must_use]
    pub const fn step(&self) -> f64 {
        match self {
            Self::Grid { step, .. } | Self::Centered { step, .. } | Self::Area { step, .. } => {
                *step
            }
        }
    }
}

/// Converts a `GeoJSON` geometry object into a [`MultiPolygon`].
///
/// Handles both `Polygon` and `MultiPolygon` geometry types; anything else
/// yields `None`.
#[must_use]
pub fn geometry_to_multipolygon(geometry: &serde_json::Value) -> Option<MultiPolygon<f64>> {
    let geometry = geojson::Geometry::from_json_value(geometry.clone()).ok()?;
    let geo_geom: geo::Geometry<f64> = geometry.try_into().ok()?;
    match geo_geom {
        geo::Geometry::MultiPolygon(mp) => Some(mp),
        geo::Geometry::Polygon(p) => Some(MultiPolygon(vec![p])),
        _ => None,
    }
}
