//! Row enrichment and dataset output.

use std::collections::BTreeMap;
use std::fmt;
use std::path::Path;

use serde::Serialize;
use vendor_map_geography_models::GeoPoint;
use vendor_map_ledger::LedgerRow;

use crate::districts::DistrictIndex;
use crate::radiance::RadianceGrid;
use crate::wealth::WealthIndex;
use crate::{DatasetError, Economics};

/// One row of the enriched dataset.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DatasetRow {
    /// Latitude.
    #[serde(rename = "Lat")]
    pub lat: f64,
    /// Longitude.
    #[serde(rename = "Lon")]
    pub lon: f64,
    /// District name, or `"Unknown"`.
    #[serde(rename = "District")]
    pub district: String,
    /// Capture date as recorded in the ledger.
    #[serde(rename = "Date")]
    pub date: String,
    /// Capture year, when the date parses.
    #[serde(rename = "Year")]
    pub year: Option<i32>,
    /// Sum of all count columns.
    #[serde(rename = "Total_Activity")]
    pub total_activity: u64,
    /// District wealth multiplier.
    #[serde(rename = "Wealth_Index")]
    pub wealth_index: f64,
    /// Baseline income scaled by the wealth multiplier.
    #[serde(rename = "Local_Avg_Income")]
    pub local_avg_income: f64,
    /// Estimated monthly revenue at this point.
    #[serde(rename = "Est_Monthly_Revenue_R$")]
    pub est_monthly_revenue: f64,
    /// Nearest nighttime radiance sample.
    #[serde(rename = "Nighttime_Radiance")]
    pub nighttime_radiance: f64,
    /// Activity relative to light, empty where there is no light.
    #[serde(rename = "Shadow_Index")]
    pub shadow_index: Option<f64>,
    /// Image path from the ledger.
    #[serde(rename = "Image_File")]
    pub image_file: String,
}

/// Enriches one ledger row.
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn enrich_row(
    row: &LedgerRow,
    districts: &DistrictIndex,
    wealth: &WealthIndex,
    radiance: &RadianceGrid,
    economics: Economics,
) -> DatasetRow {
    let point = GeoPoint::new(row.lat, row.lon);
    let district = districts.name_of(point).to_string();
    let wealth_index = wealth.lookup(&district);
    let total_activity = row.total();
    let nighttime_radiance = radiance.sample(point);

    let local_avg_income = economics.base_income * wealth_index;
    let activity = total_activity as f64;
    let est_monthly_revenue = activity * economics.workers_per_stall * local_avg_income;
    let shadow_index = (nighttime_radiance > 0.0).then(|| activity / nighttime_radiance.ln_1p());

    DatasetRow {
        lat: row.lat,
        lon: row.lon,
        district,
        date: row.date.clone(),
        year: parse_year(&row.date),
        total_activity,
        wealth_index,
        local_avg_income,
        est_monthly_revenue,
        nighttime_radiance,
        shadow_index,
        image_file: row.image_file.clone(),
    }
}

/// Year of a `YYYY-MM` (or `YYYY...`) date string.
fn parse_year(date: &str) -> Option<i32> {
    let year = date.trim().get(..4)?;
    if year.bytes().all(|b| b.is_ascii_digit()) {
        year.parse().ok()
    } else {
        None
    }
}

/// Reads a ledger and enriches every row.
///
/// # Errors
///
/// Returns [`DatasetError`] if the ledger cannot be read.
pub fn build_dataset(
    ledger: &Path,
    districts: &DistrictIndex,
    wealth: &WealthIndex,
    radiance: &RadianceGrid,
    economics: Economics,
) -> Result<Vec<DatasetRow>, DatasetError> {
    let contents = vendor_map_ledger::read_rows(ledger)?;
    log::info!(
        "Enriching {} ledger row(s) from {}",
        contents.rows.len(),
        ledger.display()
    );

    Ok(contents
        .rows
        .iter()
        .map(|row| enrich_row(row, districts, wealth, radiance, economics))
        .collect())
}

/// Writes the dataset as CSV, creating parent directories.
///
/// # Errors
///
/// Returns [`DatasetError`] if the file cannot be created or written.
pub fn write_dataset(path: &Path, rows: &[DatasetRow]) -> Result<(), DatasetError> {
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        std::fs::create_dir_all(parent)?;
    }

    let mut writer = csv::Writer::from_path(path)?;
    for row in rows {
        writer.serialize(row)?;
    }
    writer.flush()?;
    Ok(())
}

/// Aggregate figures for a built dataset.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DatasetSummary {
    /// Rows in the dataset.
    pub rows: usize,
    /// Rows with positive activity.
    pub active_rows: usize,
    /// Sum of estimated monthly revenue.
    pub total_revenue: f64,
    /// Districts with the highest total revenue, descending.
    pub top_districts: Vec<(String, f64)>,
}

impl DatasetSummary {
    /// Summarizes rows, keeping the `top` highest-revenue districts.
    #[must_use]
    pub fn from_rows(rows: &[DatasetRow], top: usize) -> Self {
        let mut by_district: BTreeMap<&str, f64> = BTreeMap::new();
        for row in rows.iter().filter(|r| r.total_activity > 0) {
            *by_district.entry(row.district.as_str()).or_default() += row.est_monthly_revenue;
        }

        let mut top_districts: Vec<(String, f64)> = by_district
            .into_iter()
            .map(|(name, revenue)| (name.to_string(), revenue))
            .collect();
        top_districts.sort_by(|a, b| b.1.total_cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
        top_districts.truncate(top);

        Self {
            rows: rows.len(),
            active_rows: rows.iter().filter(|r| r.total_activity > 0).count(),
            total_revenue: rows.iter().map(|r| r.est_monthly_revenue).sum(),
            top_districts,
        }
    }
}

impl fmt::Display for DatasetSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "{} row(s), {} with activity, R$ {:.2} estimated monthly revenue",
            self.rows, self.active_rows, self.total_revenue
        )?;
        for (district, revenue) in &self.top_districts {
            writeln!(f, "  {district:<30} R$ {revenue:.2}")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ledger_row(lat: f64, lon: f64, counts: &[u64], date: &str) -> LedgerRow {
        LedgerRow {
            lat,
            lon,
            date: date.to_string(),
            counts: counts
                .iter()
                .enumerate()
                .map(|(i, c)| (format!("C{i}"), *c))
                .collect(),
            image_file: "img.jpg".to_string(),
        }
    }

    fn districts() -> DistrictIndex {
        DistrictIndex::from_geojson_str(
            r#"{"type": "FeatureCollection", "features": [{
                "type": "Feature",
                "properties": {"name": "Distrito de Pinheiros"},
                "geometry": {"type": "Polygon", "coordinates": [[
                    [-46.72, -23.58], [-46.68, -23.58], [-46.68, -23.55], [-46.72, -23.55], [-46.72, -23.58]
                ]]}
            }]}"#,
            "name",
        )
        .unwrap()
    }

    #[test]
    fn computes_revenue_from_wealth_and_activity() {
        let radiance = RadianceGrid::from_samples(
            vec![(GeoPoint::new(-23.565, -46.70), std::f64::consts::E - 1.0)],
            0.01,
        );
        let row = enrich_row(
            &ledger_row(-23.565, -46.70, &[2, 1], "2024-05"),
            &districts(),
            &WealthIndex::sao_paulo(),
            &radiance,
            Economics::default(),
        );

        assert_eq!(row.district, "Distrito de Pinheiros");
        assert_eq!(row.total_activity, 3);
        assert_eq!(row.year, Some(2024));
        assert!((row.wealth_index - 1.8).abs() < 1e-12);
        assert!((row.local_avg_income - 4950.0).abs() < 1e-9);
        assert!((row.est_monthly_revenue - 22_275.0).abs() < 1e-6);
        assert!((row.shadow_index.unwrap() - 3.0).abs() < 1e-9);
    }

    #[test]
    fn dark_or_unknown_points_use_defaults() {
        let row = enrich_row(
            &ledger_row(-23.70, -46.50, &[1], "garbage"),
            &districts(),
            &WealthIndex::sao_paulo(),
            &RadianceGrid::empty(),
            Economics {
                base_income: 1000.0,
                workers_per_stall: 2.0,
            },
        );

        assert_eq!(row.district, "Unknown");
        assert!((row.wealth_index - 0.75).abs() < f64::EPSILON);
        assert!((row.est_monthly_revenue - 1500.0).abs() < 1e-9);
        assert!(row.shadow_index.is_none());
        assert_eq!(row.year, None);
    }

    #[test]
    fn writes_csv_with_dataset_columns() {
        let dir = std::env::temp_dir().join("vendor_map_dataset_write");
        let _ = std::fs::remove_dir_all(&dir);
        let ledger = dir.join("ledger.csv");
        std::fs::create_dir_all(&dir).unwrap();
        std::fs::write(
            &ledger,
            "Lat,Lon,Date,Structure_Count,Image_File\n\
             -23.565,-46.7,2023-02,2,a.jpg\n\
             -23.7,-46.5,2023-03,0,b.jpg\n",
        )
        .unwrap();

        let rows = build_dataset(
            &ledger,
            &districts(),
            &WealthIndex::sao_paulo(),
            &RadianceGrid::empty(),
            Economics::default(),
        )
        .unwrap();
        assert_eq!(rows.len(), 2);

        let output = dir.join("out").join("dataset.csv");
        write_dataset(&output, &rows).unwrap();
        let text = std::fs::read_to_string(&output).unwrap();
        let mut lines = text.lines();
        assert_eq!(
            lines.next().unwrap(),
            "Lat,Lon,District,Date,Year,Total_Activity,Wealth_Index,Local_Avg_Income,\
             Est_Monthly_Revenue_R$,Nighttime_Radiance,Shadow_Index,Image_File"
        );
        assert!(lines.next().unwrap().starts_with("-23.565,-46.7,Distrito de Pinheiros,2023-02,2023,2,"));

        let summary = DatasetSummary::from_rows(&rows, 5);
        assert_eq!(summary.rows, 2);
        assert_eq!(summary.active_rows, 1);
        assert_eq!(summary.top_districts.len(), 1);
        assert_eq!(summary.top_districts[0].0, "Distrito de Pinheiros");

        std::fs::remove_dir_all(&dir).ok();
    }
}
