//! Nighttime light samples.
//!
//! Radiance comes from a CSV of point samples (`lat`, `lon`, `radiance`)
//! exported from a satellite composite. A scanned point takes the value of
//! the nearest sample, provided it lies within a maximum distance; points
//! farther from every sample read as zero.

use std::path::Path;

use rstar::RTree;
use rstar::primitives::GeomWithData;
use vendor_map_geography_models::GeoPoint;

use crate::DatasetError;

type Sample = GeomWithData<[f64; 2], f64>;

/// Nearest-sample lookup over radiance points. Coordinates are stored as
/// `[lon, lat]`.
pub struct RadianceGrid {
    tree: RTree<Sample>,
    max_distance: f64,
}

impl RadianceGrid {
    /// A grid with no samples; every lookup reads zero.
    #[must_use]
    pub fn empty() -> Self {
        Self {
            tree: RTree::new(),
            max_distance: 0.0,
        }
    }

    /// Builds a grid from `(point, radiance)` samples.
    #[must_use]
    pub fn from_samples(samples: Vec<(GeoPoint, f64)>, max_distance: f64) -> Self {
        let samples = samples
            .into_iter()
            .map(|(p, value)| Sample::new([p.lon, p.lat], value))
            .collect();
        Self {
            tree: RTree::bulk_load(samples),
            max_distance,
        }
    }

    /// Loads samples from a CSV file with `lat`, `lon` and `radiance`
    /// columns (any order, case-insensitive). Rows that do not parse are
    /// logged and skipped.
    ///
    /// # Errors
    ///
    /// Returns [`DatasetError`] if the file cannot be read or lacks one of
    /// the required columns.
    pub fn load(path: &Path, max_distance: f64) -> Result<Self, DatasetError> {
        let mut reader = csv::ReaderBuilder::new()
            .has_headers(true)
            .flexible(true)
            .from_path(path)?;

        let header: Vec<String> = reader.headers()?.iter().map(str::to_lowercase).collect();
        let column = |names: &[&str]| {
            header
                .iter()
                .position(|h| names.contains(&h.trim()))
                .ok_or_else(|| DatasetError::InvalidInput {
                    message: format!(
                        "{} has no {} column",
                        path.display(),
                        names.first().copied().unwrap_or_default()
                    ),
                })
        };
        let lat_idx = column(&["lat", "latitude"])?;
        let lon_idx = column(&["lon", "lng", "longitude"])?;
        let value_idx = column(&["radiance", "value", "avg_rad"])?;

        let mut samples = Vec::new();
        for (line, record) in reader.records().enumerate() {
            let record = record?;
            let field = |i: usize| record.get(i).and_then(|v| v.trim().parse::<f64>().ok());
            match (field(lat_idx), field(lon_idx), field(value_idx)) {
                (Some(lat), Some(lon), Some(value)) => {
                    samples.push((GeoPoint::new(lat, lon), value));
                }
                _ => log::warn!("Skipping radiance row {}", line + 2),
            }
        }

        log::info!(
            "Loaded {} radiance sample(s) from {}",
            samples.len(),
            path.display()
        );
        Ok(Self::from_samples(samples, max_distance))
    }

    /// Number of samples.
    #[must_use]
    pub fn len(&self) -> usize {
        self.tree.size()
    }

    /// Whether there are no samples.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.tree.size() == 0
    }

    /// Radiance at `point`, or zero when no sample is close enough.
    #[must_use]
    pub fn sample(&self, point: GeoPoint) -> f64 {
        let query = [point.lon, point.lat];
        let limit = self.max_distance * self.max_distance;

        self.tree
            .nearest_neighbor(&query)
            .filter(|s| {
                let [x, y] = *s.geom();
                (x - query[0]).powi(2) + (y - query[1]).powi(2) <= limit
            })
            .map_or(0.0, |s| s.data)
    }
}
