//! Google Street View Static API client.
//!
//! The metadata endpoint is free and answers
//! `{"status": "OK", "date": "2024-05", ...}`; the image endpoint is billed
//! per request and returns JPEG bytes.
//!
//! See <https://developers.google.com/maps/documentation/streetview/metadata>

use std::time::Duration;

use serde::Deserialize;
use vendor_map_geography_models::GeoPoint;
use vendor_map_scan_models::ImageryConfig;

use crate::{
    CaptureDate, ImageMetadata, ImageryError, ImageryProvider, MetadataProvider, MetadataStatus,
};

/// Street View Static API client implementing both imagery capabilities.
pub struct StreetViewClient {
    api_key: String,
    config: ImageryConfig,
    client: reqwest::Client,
}

#[derive(Deserialize)]
struct MetadataResponse {
    status: String,
    #[serde(default)]
    date: Option<String>,
}

impl StreetViewClient {
    /// Creates a client with the given API key and settings.
    ///
    /// # Errors
    ///
    /// Returns [`ImageryError::Http`] if the HTTP client cannot be built.
    pub fn new(api_key: String, config: ImageryConfig) -> Result<Self, ImageryError> {
        let client = reqwest::Client::builder().build()?;
        Ok(Self {
            api_key,
            config,
            client,
        })
    }

    fn location(point: GeoPoint) -> String {
        format!("{},{}", point.lat, point.lon)
    }
}

#[async_trait::async_trait]
impl MetadataProvider for StreetViewClient {
    async fn metadata(&self, point: GeoPoint) -> Result<ImageMetadata, ImageryError> {
        let resp = self
            .client
            .get(&self.config.metadata_url)
            .query(&[
                ("location", Self::location(point).as_str()),
                ("key", self.api_key.as_str()),
            ])
            .timeout(Duration::from_secs(self.config.metadata_timeout_secs))
            .send()
            .await?;

        if !resp.status().is_success() {
            return Err(ImageryError::Status {
                status: resp.status().as_u16(),
            });
        }

        let body = resp.text().await?;
        parse_metadata(&body)
    }
}

#[async_trait::async_trait]
impl ImageryProvider for StreetViewClient {
    async fn download(&self, point: GeoPoint) -> Result<Vec<u8>, ImageryError> {
        let size = format!("{}x{}", self.config.width, self.config.height);
        let fov = self.config.fov.to_string();

        let resp = self
            .client
            .get(&self.config.image_url)
            .query(&[
                ("size", size.as_str()),
                ("location", Self::location(point).as_str()),
                ("fov", fov.as_str()),
                ("key", self.api_key.as_str()),
            ])
            .timeout(Duration::from_secs(self.config.image_timeout_secs))
            .send()
            .await?;

        if !resp.status().is_success() {
            return Err(ImageryError::Status {
                status: resp.status().as_u16(),
            });
        }

        let bytes = resp.bytes().await?;
        if bytes.is_empty() {
            return Err(ImageryError::EmptyImage);
        }

        log::trace!("Downloaded {} bytes for {point}", bytes.len());
        Ok(bytes.to_vec())
    }
}

/// Parses a metadata response body.
fn parse_metadata(body: &str) -> Result<ImageMetadata, ImageryError> {
    let response: MetadataResponse =
        serde_json::from_str(body).map_err(|e| ImageryError::Parse {
            message: format!("Invalid metadata response: {e}"),
        })?;

    let date = response
        .date
        .as_deref()
        .filter(|d| !d.trim().is_empty())
        .and_then(|d| {
            let parsed = CaptureDate::parse(d);
            if parsed.is_none() {
                log::debug!("Unparseable capture date in metadata: {d:?}");
            }
            parsed
        });

    Ok(ImageMetadata {
        status: MetadataStatus::parse(&response.status),
        date,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_ok_metadata() {
        let meta = parse_metadata(
            r#"{"copyright":"© Google","date":"2024-05","location":{"lat":-23.54,"lng":-46.63},"pano_id":"abc","status":"OK"}"#,
        )
        .unwrap();
        assert_eq!(meta.status, MetadataStatus::Ok);
        assert_eq!(meta.usable_date().unwrap().as_str(), "2024-05");
    }

    #[test]
    fn parses_zero_results() {
        let meta = parse_metadata(r#"{"status":"ZERO_RESULTS"}"#).unwrap();
        assert_eq!(meta.status, MetadataStatus::ZeroResults);
        assert!(meta.date.is_none());
    }

    #[test]
    fn blank_date_is_absent() {
        let meta = parse_metadata(r#"{"status":"OK","date":""}"#).unwrap();
        assert!(meta.usable_date().is_none());
    }

    #[test]
    fn invalid_json_is_a_parse_error() {
        let err = parse_metadata("<html>").unwrap_err();
        assert!(matches!(err, ImageryError::Parse { .. }));
    }
}
