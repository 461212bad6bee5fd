#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Resumable, budget-capped street imagery scans.
//!
//! A scan walks the candidate points of a region in a fixed order and, for
//! each point not yet in the ledger, checks imagery metadata (free),
//! downloads the image (billable), runs object detection, and appends one
//! record to the ledger. The ledger doubles as resume state, so a scan can
//! be interrupted at any point and restarted without paying twice for the
//! same location.
//!
//! - [`registry`] embeds the named scan definitions.
//! - [`coordinator::ScanCoordinator`] runs one scan.
//! - [`providers::Providers`] wires the hosted providers from environment
//!   credentials.

pub mod coordinator;
pub mod images;
pub mod progress;
pub mod providers;
pub mod rate_limit;
pub mod registry;

use thiserror::Error;

pub use coordinator::ScanCoordinator;
pub use providers::Providers;

/// Errors that abort a scan.
///
/// Per-point provider failures are not errors at this level; they are
/// counted in the scan summary and the point is skipped.
#[derive(Debug, Error)]
pub enum ScanError {
    /// The scan definition or environment is unusable.
    #[error("Configuration error: {message}")]
    Config {
        /// Description of the problem.
        message: String,
    },

    /// Region resolution failed.
    #[error("Region error: {0}")]
    Geo(#[from] vendor_map_geography::GeoError),

    /// An imagery client could not be built.
    #[error("Imagery error: {0}")]
    Imagery(#[from] vendor_map_imagery::ImageryError),

    /// A detection client could not be built.
    #[error("Detection error: {0}")]
    Detection(#[from] vendor_map_detection::DetectionError),

    /// The ledger could not be opened or written.
    #[error("Ledger error: {0}")]
    Ledger(#[from] vendor_map_ledger::LedgerError),

    /// An image could not be saved.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A scan definition file failed to parse.
    #[error("TOML error: {0}")]
    Toml(#[from] toml::de::Error),
}
