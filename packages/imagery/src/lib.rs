#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Street-level imagery providers.
//!
//! Two capabilities are consumed per scanned point:
//!
//! 1. **Metadata** ([`MetadataProvider`]): free. Reports whether imagery
//!    exists at a location and when it was captured.
//! 2. **Image download** ([`ImageryProvider`]): billable. Returns the raw
//!    image bytes.
//!
//! [`street_view::StreetViewClient`] implements both against the Google
//! Street View Static API.

pub mod street_view;

use std::fmt;

use chrono::{Datelike as _, NaiveDate};
use thiserror::Error;
use vendor_map_geography_models::GeoPoint;

/// Errors from imagery operations.
#[derive(Debug, Error)]
pub enum ImageryError {
    /// HTTP request failed (including timeouts).
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The provider answered with a non-success status code.
    #[error("Unexpected HTTP status {status}")]
    Status {
        /// Status code returned.
        status: u16,
    },

    /// The provider returned an empty image body.
    #[error("Empty image response")]
    EmptyImage,

    /// Response parsing failed.
    #[error("Parse error: {message}")]
    Parse {
        /// Description of the parsing failure.
        message: String,
    },
}

/// Metadata status reported by the provider.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MetadataStatus {
    /// Imagery exists at the location.
    Ok,
    /// No imagery near the location.
    ZeroResults,
    /// The location could not be resolved.
    NotFound,
    /// Quota exhausted.
    OverQueryLimit,
    /// The API key was rejected.
    RequestDenied,
    /// Any other status string.
    Other(String),
}

impl MetadataStatus {
    /// Parses a provider status string.
    #[must_use]
    pub fn parse(status: &str) -> Self {
        match status {
            "OK" => Self::Ok,
            "ZERO_RESULTS" => Self::ZeroResults,
            "NOT_FOUND" => Self::NotFound,
            "OVER_QUERY_LIMIT" => Self::OverQueryLimit,
            "REQUEST_DENIED" => Self::RequestDenied,
            other => Self::Other(other.to_string()),
        }
    }
}

impl fmt::Display for MetadataStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Ok => f.write_str("OK"),
            Self::ZeroResults => f.write_str("ZERO_RESULTS"),
            Self::NotFound => f.write_str("NOT_FOUND"),
            Self::OverQueryLimit => f.write_str("OVER_QUERY_LIMIT"),
            Self::RequestDenied => f.write_str("REQUEST_DENIED"),
            Self::Other(s) => f.write_str(s),
        }
    }
}

/// Capture date of a panorama, as reported by the provider.
///
/// The raw string (normally `YYYY-MM`) is kept verbatim because it is
/// written to the ledger and embedded in image file names.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CaptureDate {
    raw: String,
    year: i32,
}

impl CaptureDate {
    /// Parses `YYYY-MM`, `YYYY-MM-DD`, or `YYYY`.
    ///
    /// Returns `None` for anything else.
    #[must_use]
    pub fn parse(raw: &str) -> Option<Self> {
        let raw = raw.trim();
        let date = NaiveDate::parse_from_str(&format!("{raw}-01"), "%Y-%m-%d")
            .or_else(|_| NaiveDate::parse_from_str(raw, "%Y-%m-%d"))
            .ok();

        if let Some(date) = date {
            return Some(Self {
                raw: raw.to_string(),
                year: date.year(),
            });
        }

        if raw.len() == 4 && raw.bytes().all(|b| b.is_ascii_digit()) {
            return raw.parse().ok().map(|year| Self {
                raw: raw.to_string(),
                year,
            });
        }

        None
    }

    /// Capture year.
    #[must_use]
    pub const fn year(&self) -> i32 {
        self.year
    }

    /// The date exactly as the provider reported it.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.raw
    }
}

impl fmt::Display for CaptureDate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}

/// Metadata for one location.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageMetadata {
    /// Provider status.
    pub status: MetadataStatus,
    /// Capture date, if present and parseable.
    pub date: Option<CaptureDate>,
}

impl ImageMetadata {
    /// Returns the capture date when the status is OK and a date is present.
    #[must_use]
    pub const fn usable_date(&self) -> Option<&CaptureDate> {
        match (&self.status, &self.date) {
            (MetadataStatus::Ok, Some(date)) => Some(date),
            _ => None,
        }
    }
}

/// Source of imagery metadata. Never billable.
#[async_trait::async_trait]
pub trait MetadataProvider: Send + Sync {
    /// Looks up imagery metadata for a point.
    ///
    /// # Errors
    ///
    /// Returns [`ImageryError`] on transport failure or an unparseable
    /// response. "No imagery" is a successful response with a non-OK status.
    async fn metadata(&self, point: GeoPoint) -> Result<ImageMetadata, ImageryError>;
}

/// Source of street-level images. Every successful call is billable.
#[async_trait::async_trait]
pub trait ImageryProvider: Send + Sync {
    /// Downloads the image for a point.
    ///
    /// # Errors
    ///
    /// Returns [`ImageryError`] on transport failure, a non-success status,
    /// or an empty body.
    async fn download(&self, point: GeoPoint) -> Result<Vec<u8>, ImageryError>;
}
