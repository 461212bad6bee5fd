#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Object detection for scanned street images.
//!
//! The model itself is hosted elsewhere and treated as a black box: an
//! image goes in with confidence/overlap thresholds, a list of labelled
//! boxes comes out. [`classes::ClassMapping`] folds those labels into the
//! per-category counts written to the ledger.

pub mod classes;
pub mod roboflow;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use vendor_map_scan_models::Thresholds;

/// Errors from detection operations.
#[derive(Debug, Error)]
pub enum DetectionError {
    /// HTTP request failed (including timeouts).
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The provider rejected the request.
    #[error("Provider error (HTTP {status}): {message}")]
    Provider {
        /// Status code returned.
        status: u16,
        /// Provider error message or body preview.
        message: String,
    },

    /// Response parsing failed.
    #[error("Parse error: {message}")]
    Parse {
        /// Description of the parsing failure.
        message: String,
    },
}

/// Axis-aligned box in image pixels, center-based.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    /// Center x.
    pub x: f64,
    /// Center y.
    pub y: f64,
    /// Width.
    pub width: f64,
    /// Height.
    pub height: f64,
}

/// One detected object.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Detection {
    /// Raw class label produced by the model.
    pub label: String,
    /// Confidence in `0.0..=1.0`.
    pub confidence: f64,
    /// Where the object is.
    pub bbox: BoundingBox,
}

/// Hosted detection model.
#[async_trait::async_trait]
pub trait DetectionProvider: Send + Sync {
    /// Runs the model over one encoded image.
    ///
    /// # Errors
    ///
    /// Returns [`DetectionError`] if the request fails or the response
    /// cannot be parsed.
    async fn detect(
        &self,
        image: &[u8],
        thresholds: Thresholds,
    ) -> Result<Vec<Detection>, DetectionError>;
}
