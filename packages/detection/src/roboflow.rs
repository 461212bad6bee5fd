//! Roboflow hosted inference client.
//!
//! Images are posted base64-encoded as the raw request body to
//! `{base_url}/{project}/{version}`, with the API key and thresholds as
//! query parameters. Thresholds are percentages.
//!
//! See <https://docs.roboflow.com/deploy/hosted-api>

use std::time::Duration;

use base64::{Engine as _, engine::general_purpose};
use serde::Deserialize;
use vendor_map_scan_models::{DetectionConfig, Thresholds};

use crate::{BoundingBox, Detection, DetectionError, DetectionProvider};

/// Maximum length of the response body preview included in errors.
const BODY_PREVIEW_LEN: usize = 300;

/// Hosted Roboflow model.
pub struct RoboflowClient {
    api_key: String,
    endpoint: String,
    timeout: Duration,
    client: reqwest::Client,
}

#[derive(Deserialize)]
struct InferenceResponse {
    #[serde(default)]
    predictions: Vec<Prediction>,
}

#[derive(Deserialize)]
struct Prediction {
    class: String,
    confidence: f64,
    x: f64,
    y: f64,
    width: f64,
    height: f64,
}

impl RoboflowClient {
    /// Creates a client for the configured project and version.
    ///
    /// # Errors
    ///
    /// Returns [`DetectionError::Http`] if the HTTP client cannot be built.
    pub fn new(api_key: String, config: &DetectionConfig) -> Result<Self, DetectionError> {
        let endpoint = format!(
            "{}/{}/{}",
            config.base_url.trim_end_matches('/'),
            config.project,
            config.version
        );
        Ok(Self {
            api_key,
            endpoint,
            timeout: Duration::from_secs(config.timeout_secs),
            client: reqwest::Client::builder().build()?,
        })
    }

    /// The inference URL, without query parameters.
    #[must_use]
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

#[async_trait::async_trait]
impl DetectionProvider for RoboflowClient {
    async fn detect(
        &self,
        image: &[u8],
        thresholds: Thresholds,
    ) -> Result<Vec<Detection>, DetectionError> {
        let encoded = general_purpose::STANDARD.encode(image);
        let confidence = thresholds.confidence.to_string();
        let overlap = thresholds.overlap.to_string();

        let resp = self
            .client
            .post(&self.endpoint)
            .query(&[
                ("api_key", self.api_key.as_str()),
                ("confidence", confidence.as_str()),
                ("overlap", overlap.as_str()),
            ])
            .header(
                reqwest::header::CONTENT_TYPE,
                "application/x-www-form-urlencoded",
            )
            .body(encoded)
            .timeout(self.timeout)
            .send()
            .await?;

        let status = resp.status();
        let body = resp.text().await?;

        if !status.is_success() {
            return Err(DetectionError::Provider {
                status: status.as_u16(),
                message: error_message(&body),
            });
        }

        parse_predictions(&body)
    }
}

/// Parses the `predictions` array of an inference response.
fn parse_predictions(body: &str) -> Result<Vec<Detection>, DetectionError> {
    let response: InferenceResponse =
        serde_json::from_str(body).map_err(|e| DetectionError::Parse {
            message: format!("Invalid inference response: {e}"),
        })?;

    Ok(response
        .predictions
        .into_iter()
        .map(|p| Detection {
            label: p.class,
            confidence: p.confidence,
            bbox: BoundingBox {
                x: p.x,
                y: p.y,
                width: p.width,
                height: p.height,
            },
        })
        .collect())
}

/// Extracts `message` from an error body, or a preview of the raw body.
fn error_message(body: &str) -> String {
    serde_json::from_str::<serde_json::Value>(body)
        .ok()
        .and_then(|v| v["message"].as_str().map(String::from))
        .unwrap_or_else(|| body.chars().take(BODY_PREVIEW_LEN).collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_predictions() {
        let body = r#"{
            "time": 0.12,
            "image": {"width": 640, "height": 640},
            "predictions": [
                {"x": 320.5, "y": 200.0, "width": 40.0, "height": 90.0, "confidence": 0.81, "class": "street_vendor", "class_id": 2},
                {"x": 100.0, "y": 400.0, "width": 120.0, "height": 80.0, "confidence": 0.74, "class": "umbrella", "class_id": 4}
            ]
        }"#;
        let detections = parse_predictions(body).unwrap();
        assert_eq!(detections.len(), 2);
        assert_eq!(detections[0].label, "street_vendor");
        assert!((detections[1].bbox.width - 120.0).abs() < f64::EPSILON);
    }

    #[test]
    fn missing_predictions_is_empty() {
        assert!(parse_predictions(r#"{"time": 0.1}"#).unwrap().is_empty());
    }

    #[test]
    fn error_message_prefers_json_message() {
        assert_eq!(
            error_message(r#"{"message": "Forbidden"}"#),
            "Forbidden".to_string()
        );
        assert_eq!(error_message("Bad Gateway"), "Bad Gateway".to_string());
    }

    #[test]
    fn endpoint_includes_project_and_version() {
        let config = DetectionConfig {
            base_url: "https://detect.roboflow.com/".to_string(),
            project: "camelo-detection-v1".to_string(),
            version: 3,
            confidence: 70,
            overlap: 30,
            timeout_secs: 30,
        };
        let client = RoboflowClient::new("key".to_string(), &config).unwrap();
        assert_eq!(
            client.endpoint(),
            "https://detect.roboflow.com/camelo-detection-v1/3"
        );
    }
}
