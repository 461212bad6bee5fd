//! Official boundary download.
//!
//! Fetches a `GeoJSON` `FeatureCollection` (e.g. municipal boundaries for a
//! whole state) and selects the single feature whose property matches the
//! configured value.

use geo::MultiPolygon;

use crate::{GeoError, geometry_to_multipolygon};

/// Downloads a `FeatureCollection` and returns the geometry of the feature
/// whose `properties[property]` equals `value`.
///
/// # Errors
///
/// Returns [`GeoError`] if the request fails, the response is not a
/// `FeatureCollection`, no feature matches, or the matching geometry is not
/// a polygon.
pub async fn fetch_boundary(
    client: &reqwest::Client,
    url: &str,
    property: &str,
    value: &str,
) -> Result<MultiPolygon<f64>, GeoError> {
    log::info!("Downloading boundary {property}={value} from {url}");

    let resp = client.get(url).send().await?;
    if !resp.status().is_success() {
        return Err(GeoError::InvalidRegion {
            message: format!("Boundary request failed with status {}", resp.status()),
        });
    }
    let body = resp.text().await?;
    let collection: serde_json::Value = serde_json::from_str(&body)?;

    select_boundary(&collection, property, value)
}

/// Selects a feature from a parsed `FeatureCollection` by property value.
///
/// Property values are compared as text, so `"3550308"` matches both a
/// string and a numeric property.
///
/// # Errors
///
/// Returns [`GeoError`] if there is no `features` array, no feature
/// matches, or the matching geometry is not a polygon.
pub fn select_boundary(
    collection: &serde_json::Value,
    property: &str,
    value: &str,
) -> Result<MultiPolygon<f64>, GeoError> {
    let features = collection["features"]
        .as_array()
        .ok_or_else(|| GeoError::InvalidRegion {
            message: "No features array in GeoJSON response".to_string(),
        })?;

    let feature = features
        .iter()
        .find(|f| property_matches(&f["properties"][property], value))
        .ok_or_else(|| GeoError::BoundaryNotFound {
            property: property.to_string(),
            value: value.to_string(),
        })?;

    geometry_to_multipolygon(&feature["geometry"]).ok_or_else(|| GeoError::InvalidRegion {
        message: format!("Boundary {property}={value} is not a Polygon or MultiPolygon"),
    })
}

fn property_matches(actual: &serde_json::Value, expected: &str) -> bool {
    match actual {
        serde_json::Value::String(s) => s == expected,
        serde_json::Value::Null => false,
        other => other.to_string() == expected,
    }
}
