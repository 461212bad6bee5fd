//! Provider wiring.

use std::sync::Arc;

use vendor_map_detection::DetectionProvider;
use vendor_map_detection::roboflow::RoboflowClient;
use vendor_map_imagery::street_view::StreetViewClient;
use vendor_map_imagery::{ImageryProvider, MetadataProvider};
use vendor_map_scan_models::ScanDefinition;

use crate::ScanError;

/// Environment variable holding the Street View API key.
pub const GOOGLE_MAPS_API_KEY_VAR: &str = "GOOGLE_MAPS_API_KEY";

/// Environment variable holding the Roboflow API key.
pub const ROBOFLOW_API_KEY_VAR: &str = "ROBOFLOW_API_KEY";

/// The three external capabilities a scan consumes.
#[derive(Clone)]
pub struct Providers {
    /// Imagery metadata (free).
    pub metadata: Arc<dyn MetadataProvider>,
    /// Image download (billable).
    pub imagery: Arc<dyn ImageryProvider>,
    /// Object detection.
    pub detector: Arc<dyn DetectionProvider>,
}

impl Providers {
    /// Builds the hosted providers for a scan, reading API keys from the
    /// environment.
    ///
    /// # Errors
    ///
    /// Returns [`ScanError::Config`] if a key is missing, or a client error
    /// if an HTTP client cannot be built.
    pub fn from_env(definition: &ScanDefinition) -> Result<Self, ScanError> {
        let maps_key = require_env(GOOGLE_MAPS_API_KEY_VAR)?;
        let roboflow_key = require_env(ROBOFLOW_API_KEY_VAR)?;

        let street_view = Arc::new(StreetViewClient::new(
            maps_key,
            definition.imagery.clone(),
        )?);
        let roboflow = RoboflowClient::new(roboflow_key, &definition.detection)?;
        log::debug!("Detection endpoint: {}", roboflow.endpoint());

        Ok(Self {
            metadata: street_view.clone(),
            imagery: street_view,
            detector: Arc::new(roboflow),
        })
    }
}

fn require_env(name: &str) -> Result<String, ScanError> {
    match std::env::var(name) {
        Ok(value) if !value.trim().is_empty() => Ok(value),
        _ => Err(ScanError::Config {
            message: format!("{name} is not set"),
        }),
    }
}
