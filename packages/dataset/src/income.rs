//! Baseline income from IBGE's SIDRA statistics API.
//!
//! The default query asks for the latest quarterly average income of
//! self-employed workers in São Paulo state (PNAD Contínua, table 5442).
//! Municipal figures are not published quarterly, so the state value
//! stands in for the city.

use std::time::Duration;

use crate::{DEFAULT_BASE_INCOME, DatasetError};

/// SIDRA query for the latest self-employed average income in SP state.
pub const SIDRA_INCOME_URL: &str = "https://apisidra.ibge.gov.br/values/t/5442/n3/35/v/5932/p/last%201/c11923/32815/d/v5932%202";

const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// A baseline income and the period it describes.
#[derive(Debug, Clone, PartialEq)]
pub struct IncomeBaseline {
    /// Monthly income in reais.
    pub value: f64,
    /// Reference period as published (e.g. `"3º trimestre 2024"`).
    pub period: String,
}

impl IncomeBaseline {
    /// The built-in estimate used when nothing better is available.
    #[must_use]
    pub fn fallback() -> Self {
        Self {
            value: DEFAULT_BASE_INCOME,
            period: "2024 estimate".to_string(),
        }
    }
}

/// Fetches the baseline income from a SIDRA `values` endpoint.
///
/// # Errors
///
/// Returns [`DatasetError`] if the request fails or the response has no
/// data row.
pub async fn fetch_base_income(
    client: &reqwest::Client,
    url: &str,
) -> Result<IncomeBaseline, DatasetError> {
    log::info!("Fetching baseline income from {url}");

    let resp = client.get(url).timeout(REQUEST_TIMEOUT).send().await?;
    if !resp.status().is_success() {
        return Err(DatasetError::InvalidInput {
            message: format!("SIDRA request failed with status {}", resp.status()),
        });
    }
    let body = resp.text().await?;
    let json: serde_json::Value = serde_json::from_str(&body)?;

    parse_sidra(&json)
}

/// Reads the first data row of a SIDRA response.
///
/// SIDRA returns an array whose first element describes the columns; the
/// value is in `V` and the period name in `D3N`.
///
/// # Errors
///
/// Returns [`DatasetError::InvalidInput`] if there is no data row or its
/// value is not a positive number.
pub fn parse_sidra(json: &serde_json::Value) -> Result<IncomeBaseline, DatasetError> {
    let row = json
        .as_array()
        .and_then(|rows| rows.get(1))
        .ok_or_else(|| DatasetError::InvalidInput {
            message: "SIDRA response has no data row".to_string(),
        })?;

    let raw = row["V"].as_str().unwrap_or_default().trim();
    let value = raw
        .parse::<f64>()
        .ok()
        .filter(|v| v.is_finite() && *v > 0.0)
        .ok_or_else(|| DatasetError::InvalidInput {
            message: format!("SIDRA value {raw:?} is not a positive number"),
        })?;

    Ok(IncomeBaseline {
        value,
        period: row["D3N"].as_str().unwrap_or_default().to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reads_value_and_period_from_first_data_row() {
        let json = serde_json::json!([
            {"V": "Valor", "D3N": "Trimestre"},
            {"V": "2893", "D3N": "3º trimestre 2024"}
        ]);
        let baseline = parse_sidra(&json).unwrap();
        assert!((baseline.value - 2893.0).abs() < f64::EPSILON);
        assert_eq!(baseline.period, "3º trimestre 2024");
    }

    #[test]
    fn header_only_response_is_an_error() {
        let json = serde_json::json!([{"V": "Valor", "D3N": "Trimestre"}]);
        assert!(matches!(
            parse_sidra(&json),
            Err(DatasetError::InvalidInput { .. })
        ));
    }

    #[test]
    fn suppressed_value_is_an_error() {
        let json = serde_json::json!([
            {"V": "Valor", "D3N": "Trimestre"},
            {"V": "...", "D3N": "3º trimestre 2024"}
        ]);
        assert!(parse_sidra(&json).is_err());
    }

    #[test]
    fn fallback_is_the_default_income() {
        let baseline = IncomeBaseline::fallback();
        assert!((baseline.value - DEFAULT_BASE_INCOME).abs() < f64::EPSILON);
    }
}
