#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Scan definition, record, and summary types.
//!
//! A [`ScanDefinition`] is the TOML schema for one named scan: where to
//! look, how much may be spent, which imagery is fresh enough, and how raw
//! detection labels fold into the count columns of the ledger.

use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use vendor_map_geography_models::{GeoPoint, RegionConfig};

/// A named scan, deserialized from TOML.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScanDefinition {
    /// Unique scan identifier (e.g. `"sp_real_shape"`).
    pub id: String,
    /// Human-readable name.
    pub name: String,
    /// Optional free-form notes.
    #[serde(default)]
    pub description: Option<String>,
    /// Path of the append-only CSV ledger.
    pub ledger: PathBuf,
    /// Directory where downloaded images are written.
    pub image_dir: PathBuf,
    /// File name prefix for downloaded images.
    #[serde(default = "default_image_prefix")]
    pub image_prefix: String,
    /// When set, images with at least one detection are copied here.
    #[serde(default)]
    pub training_dir: Option<PathBuf>,
    /// Maximum number of points (persisted + new) before the scan stops.
    pub budget_cap: u64,
    /// Oldest acceptable capture year.
    pub freshness_cutoff: i32,
    /// Minimum delay between consecutive provider calls, in milliseconds.
    #[serde(default = "default_rate_limit_ms")]
    pub rate_limit_ms: u64,
    /// Region to scan.
    pub region: RegionConfig,
    /// Street-level imagery settings.
    #[serde(default)]
    pub imagery: ImageryConfig,
    /// Hosted detection model settings.
    pub detection: DetectionConfig,
    /// Count columns, in ledger order.
    pub categories: Vec<CategoryConfig>,
}

impl ScanDefinition {
    /// Returns the scan identifier.
    #[must_use]
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Returns the human-readable scan name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the rate limit interval.
    #[must_use]
    pub const fn rate_limit(&self) -> Duration {
        Duration::from_millis(self.rate_limit_ms)
    }

    /// Returns the count column names, in ledger order.
    #[must_use]
    pub fn count_columns(&self) -> Vec<String> {
        self.categories.iter().map(|c| c.column.clone()).collect()
    }
}

fn default_image_prefix() -> String {
    "scan".to_string()
}

const fn default_rate_limit_ms() -> u64 {
    1000
}

/// Street View Static API settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ImageryConfig {
    /// Metadata endpoint URL.
    pub metadata_url: String,
    /// Image endpoint URL.
    pub image_url: String,
    /// Image width in pixels.
    pub width: u32,
    /// Image height in pixels.
    pub height: u32,
    /// Horizontal field of view in degrees.
    pub fov: u32,
    /// Timeout for metadata requests, in seconds.
    pub metadata_timeout_secs: u64,
    /// Timeout for image downloads, in seconds.
    pub image_timeout_secs: u64,
}

impl Default for ImageryConfig {
    fn default() -> Self {
        Self {
            metadata_url: "https://maps.googleapis.com/maps/api/streetview/metadata".to_string(),
            image_url: "https://maps.googleapis.com/maps/api/streetview".to_string(),
            width: 640,
            height: 640,
            fov: 90,
            metadata_timeout_secs: 15,
            image_timeout_secs: 20,
        }
    }
}

/// Hosted object-detection model settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DetectionConfig {
    /// Inference endpoint base URL.
    #[serde(default = "default_detection_url")]
    pub base_url: String,
    /// Model project slug.
    pub project: String,
    /// Model version.
    pub version: u32,
    /// Minimum confidence, in percent.
    pub confidence: u8,
    /// Maximum box overlap for non-max suppression, in percent.
    pub overlap: u8,
    /// Timeout for inference requests, in seconds.
    #[serde(default = "default_detection_timeout_secs")]
    pub timeout_secs: u64,
}

impl DetectionConfig {
    /// Returns the thresholds passed to the model on every request.
    #[must_use]
    pub const fn thresholds(&self) -> Thresholds {
        Thresholds {
            confidence: self.confidence,
            overlap: self.overlap,
        }
    }
}

fn default_detection_url() -> String {
    "https://detect.roboflow.com".to_string()
}

const fn default_detection_timeout_secs() -> u64 {
    30
}

/// Detection thresholds, in percent. Passed through to the provider as-is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Thresholds {
    /// Minimum confidence.
    pub confidence: u8,
    /// Maximum overlap.
    pub overlap: u8,
}

/// One count column and the raw labels that feed it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoryConfig {
    /// Canonical category name (e.g. `"vendor"`).
    pub name: String,
    /// Ledger column header (e.g. `"Vendor_Count"`).
    pub column: String,
    /// Raw detection labels counted in this category.
    pub labels: Vec<String>,
}

/// Per-category detection counts, aligned with the scan's categories.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoryCounts(pub Vec<u32>);

impl CategoryCounts {
    /// Creates all-zero counts for `len` categories.
    #[must_use]
    pub fn zeroed(len: usize) -> Self {
        Self(vec![0; len])
    }

    /// Sum over all categories.
    #[must_use]
    pub fn total(&self) -> u64 {
        self.0.iter().map(|&c| u64::from(c)).sum()
    }

    /// Whether any category has a detection.
    #[must_use]
    pub fn is_hit(&self) -> bool {
        self.0.iter().any(|&c| c > 0)
    }

    /// Returns the counts as a slice.
    #[must_use]
    pub fn as_slice(&self) -> &[u32] {
        &self.0
    }
}

/// One ledger row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScanRecord {
    /// Scanned point.
    pub point: GeoPoint,
    /// Capture date as reported by the metadata provider (`YYYY-MM`).
    pub capture_date: String,
    /// Detection counts per category.
    pub counts: CategoryCounts,
    /// Path of the saved image.
    pub image_file: PathBuf,
}

/// Why a candidate point produced no record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SkipReason {
    /// Already present in the ledger.
    AlreadyScanned,
    /// Metadata request failed in transport.
    MetadataFailed,
    /// Provider reported no imagery or no capture date.
    NoImagery,
    /// Imagery older than the freshness cutoff.
    Stale,
    /// Image download failed.
    DownloadFailed,
    /// Detection provider failed; the image stays on disk for reuse.
    DetectionFailed,
}

/// Result of a finished scan run.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScanSummary {
    /// Candidate points in the region.
    pub candidates: u64,
    /// Records in the ledger when the run started.
    pub persisted_at_start: u64,
    /// Candidates skipped because they were already in the ledger.
    pub already_scanned: u64,
    /// Records written during this run.
    pub records_written: u64,
    /// Images downloaded (billable requests) during this run.
    pub images_downloaded: u64,
    /// Images found on disk from an earlier run and reused.
    pub images_reused: u64,
    /// Records with at least one detection.
    pub hits: u64,
    /// Points without imagery or capture date.
    pub no_imagery: u64,
    /// Points with imagery older than the cutoff.
    pub stale: u64,
    /// Metadata or download transport failures.
    pub transient_failures: u64,
    /// Detection provider failures.
    pub detection_failures: u64,
    /// Whether the run stopped because the budget cap was reached.
    pub budget_exhausted: bool,
    /// Ledger size at the end of the run.
    pub ledger_size: u64,
    /// Wall-clock duration of the run.
    pub duration: Duration,
}

impl ScanSummary {
    /// Counts a skipped point.
    pub const fn record_skip(&mut self, reason: SkipReason) {
        match reason {
            SkipReason::AlreadyScanned => self.already_scanned += 1,
            SkipReason::MetadataFailed | SkipReason::DownloadFailed => {
                self.transient_failures += 1;
            }
            SkipReason::NoImagery => self.no_imagery += 1,
            SkipReason::Stale => self.stale += 1,
            SkipReason::DetectionFailed => self.detection_failures += 1,
        }
    }

    /// Points that produced neither a record nor a resume skip.
    #[must_use]
    pub const fn skipped_without_record(&self) -> u64 {
        self.no_imagery + self.stale + self.transient_failures + self.detection_failures
    }
}
