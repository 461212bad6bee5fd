//! District attribution.
//!
//! District polygons from a `GeoJSON` `FeatureCollection` go into an R-tree
//! keyed by bounding box; a lookup narrows candidates by envelope and then
//! runs an exact containment test.

use std::path::Path;

use geo::{BoundingRect, Contains, MultiPolygon, Point};
use rstar::{AABB, RTree, RTreeObject};
use vendor_map_geography::geometry_to_multipolygon;
use vendor_map_geography_models::GeoPoint;

use crate::DatasetError;

/// Name given to points outside every district.
pub const UNKNOWN_DISTRICT: &str = "Unknown";

#[derive(Debug)]
struct DistrictEntry {
    name: String,
    envelope: AABB<[f64; 2]>,
    shape: MultiPolygon<f64>,
}

impl RTreeObject for DistrictEntry {
    type Envelope = AABB<[f64; 2]>;

    fn envelope(&self) -> Self::Envelope {
        self.envelope
    }
}

/// Spatial index of named district polygons.
#[derive(Debug)]
pub struct DistrictIndex {
    tree: RTree<DistrictEntry>,
}

impl DistrictIndex {
    /// An index with no districts; every lookup misses.
    #[must_use]
    pub fn empty() -> Self {
        Self { tree: RTree::new() }
    }

    /// Loads districts from a `GeoJSON` file.
    ///
    /// # Errors
    ///
    /// Returns [`DatasetError`] if the file cannot be read or is not a
    /// `FeatureCollection`.
    pub fn load(path: &Path, name_property: &str) -> Result<Self, DatasetError> {
        let content = std::fs::read_to_string(path)?;
        let index = Self::from_geojson_str(&content, name_property)?;
        log::info!(
            "Loaded {} district(s) from {}",
            index.len(),
            path.display()
        );
        Ok(index)
    }

    /// Parses districts from `GeoJSON` text.
    ///
    /// Features without a usable name or areal geometry are logged and
    /// skipped.
    ///
    /// # Errors
    ///
    /// Returns [`DatasetError`] if the text is not JSON or has no
    /// `features` array.
    pub fn from_geojson_str(content: &str, name_property: &str) -> Result<Self, DatasetError> {
        let json: serde_json::Value = serde_json::from_str(content)?;
        let features = json["features"]
            .as_array()
            .ok_or_else(|| DatasetError::InvalidInput {
                message: "district file is not a GeoJSON FeatureCollection".to_string(),
            })?;

        let mut entries = Vec::with_capacity(features.len());
        for (i, feature) in features.iter().enumerate() {
            let name = match &feature["properties"][name_property] {
                serde_json::Value::String(s) if !s.trim().is_empty() => s.trim().to_string(),
                serde_json::Value::Number(n) => n.to_string(),
                _ => {
                    log::warn!("District feature {i} has no '{name_property}' property");
                    continue;
                }
            };

            let Some(shape) = geometry_to_multipolygon(&feature["geometry"]) else {
                log::warn!("District '{name}' has no polygon geometry");
                continue;
            };
            let Some(rect) = shape.bounding_rect() else {
                continue;
            };

            entries.push(DistrictEntry {
                name,
                envelope: AABB::from_corners(
                    [rect.min().x, rect.min().y],
                    [rect.max().x, rect.max().y],
                ),
                shape,
            });
        }

        Ok(Self {
            tree: RTree::bulk_load(entries),
        })
    }

    /// Number of indexed districts.
    #[must_use]
    pub fn len(&self) -> usize {
        self.tree.size()
    }

    /// Whether the index has no districts.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.tree.size() == 0
    }

    /// Name of the district containing `point`.
    ///
    /// Districts tile the city without overlap, so the first match wins.
    #[must_use]
    pub fn lookup(&self, point: GeoPoint) -> Option<&str> {
        let target = Point::new(point.lon, point.lat);
        let query = AABB::from_point([point.lon, point.lat]);

        self.tree
            .locate_in_envelope_intersecting(&query)
            .find(|entry| entry.shape.contains(&target))
            .map(|entry| entry.name.as_str())
    }

    /// Like [`DistrictIndex::lookup`], falling back to [`UNKNOWN_DISTRICT`].
    #[must_use]
    pub fn name_of(&self, point: GeoPoint) -> &str {
        self.lookup(point).unwrap_or(UNKNOWN_DISTRICT)
    }
}
