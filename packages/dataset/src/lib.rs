#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Builds the analysis dataset from a scan ledger.
//!
//! Every ledger row is attributed to a district (point-in-polygon), given a
//! wealth multiplier for that district, matched to the nearest nighttime
//! radiance sample, and turned into a revenue estimate:
//!
//! ```text
//! local_avg_income    = base_income * wealth_index
//! est_monthly_revenue = total_activity * workers_per_stall * local_avg_income
//! shadow_index        = total_activity / ln(1 + radiance)
//! ```

pub mod districts;
pub mod enrich;
pub mod income;
pub mod radiance;
pub mod wealth;

use thiserror::Error;

pub use enrich::{DatasetRow, DatasetSummary, build_dataset};

/// Baseline monthly income of an informal worker, in reais.
pub const DEFAULT_BASE_INCOME: f64 = 2750.0;

/// Workers assumed per detected structure.
pub const DEFAULT_WORKERS_PER_STALL: f64 = 1.5;

/// Maximum distance, in degrees, to the nearest radiance sample.
pub const DEFAULT_RADIANCE_MAX_DISTANCE: f64 = 0.01;

/// Errors from dataset operations.
#[derive(Debug, Error)]
pub enum DatasetError {
    /// An I/O operation failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// CSV reading or writing failed.
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// HTTP request failed.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// JSON parsing failed.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// A weights file failed to parse.
    #[error("TOML error: {0}")]
    Toml(#[from] toml::de::Error),

    /// The ledger could not be read.
    #[error("Ledger error: {0}")]
    Ledger(#[from] vendor_map_ledger::LedgerError),

    /// An input file has the wrong shape.
    #[error("Invalid input: {message}")]
    InvalidInput {
        /// Description of the problem.
        message: String,
    },
}

/// Economic assumptions applied to every row.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Economics {
    /// Baseline monthly income, before the wealth multiplier.
    pub base_income: f64,
    /// Workers per detected structure.
    pub workers_per_stall: f64,
}

impl Default for Economics {
    fn default() -> Self {
        Self {
            base_income: DEFAULT_BASE_INCOME,
            workers_per_stall: DEFAULT_WORKERS_PER_STALL,
        }
    }
}
