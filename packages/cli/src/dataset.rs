//! `dataset` subcommand.

use std::path::PathBuf;

use clap::Args;
use vendor_map_dataset::districts::DistrictIndex;
use vendor_map_dataset::enrich::write_dataset;
use vendor_map_dataset::income::{IncomeBaseline, SIDRA_INCOME_URL, fetch_base_income};
use vendor_map_dataset::radiance::RadianceGrid;
use vendor_map_dataset::wealth::WealthIndex;
use vendor_map_dataset::{
    DEFAULT_BASE_INCOME, DEFAULT_RADIANCE_MAX_DISTANCE, DEFAULT_WORKERS_PER_STALL,
    DatasetSummary, Economics, build_dataset,
};

#[derive(Args)]
pub struct DatasetArgs {
    /// Scan ledger to enrich
    #[arg(long)]
    ledger: PathBuf,
    /// `GeoJSON` `FeatureCollection` of district polygons
    #[arg(long)]
    districts: Option<PathBuf>,
    /// Feature property holding the district name
    #[arg(long, default_value = "name")]
    district_property: String,
    /// CSV of nighttime radiance samples (`lat`, `lon`, `radiance`)
    #[arg(long)]
    radiance: Option<PathBuf>,
    /// Maximum distance in degrees to the nearest radiance sample
    #[arg(long, default_value_t = DEFAULT_RADIANCE_MAX_DISTANCE)]
    radiance_max_distance: f64,
    /// Wealth table TOML (defaults to the built-in São Paulo table)
    #[arg(long)]
    weights: Option<PathBuf>,
    /// Output CSV
    #[arg(long)]
    output: PathBuf,
    /// Baseline monthly income
    #[arg(long, default_value_t = DEFAULT_BASE_INCOME, conflicts_with = "fetch_income")]
    base_income: f64,
    /// Fetch the baseline income from IBGE SIDRA, falling back to the
    /// built-in estimate if the request fails
    #[arg(long)]
    fetch_income: bool,
    /// Workers per detected structure
    #[arg(long, default_value_t = DEFAULT_WORKERS_PER_STALL)]
    workers_per_stall: f64,
    /// Number of districts to list in the summary
    #[arg(long, default_value_t = 10)]
    top: usize,
}

/// Builds and writes the enriched dataset.
///
/// # Errors
///
/// Returns an error if any input cannot be read or the output cannot be
/// written.
pub async fn run(args: &DatasetArgs) -> Result<(), Box<dyn std::error::Error>> {
    let districts = match &args.districts {
        Some(path) => DistrictIndex::load(path, &args.district_property)?,
        None => {
            log::warn!("No district file given, every point will be 'Unknown'");
            DistrictIndex::empty()
        }
    };

    let radiance = match &args.radiance {
        Some(path) => RadianceGrid::load(path, args.radiance_max_distance)?,
        None => {
            log::warn!("No radiance file given, nighttime radiance will be 0");
            RadianceGrid::empty()
        }
    };

    let wealth = match &args.weights {
        Some(path) => WealthIndex::load(path)?,
        None => WealthIndex::sao_paulo(),
    };
    log::info!(
        "Wealth table: {} district key(s), default multiplier {}",
        wealth.len(),
        wealth.default_weight()
    );

    let base_income = if args.fetch_income {
        let baseline = match fetch_base_income(&reqwest::Client::new(), SIDRA_INCOME_URL).await {
            Ok(baseline) => baseline,
            Err(e) => {
                log::warn!("Could not fetch baseline income, using the built-in estimate: {e}");
                IncomeBaseline::fallback()
            }
        };
        log::info!("Baseline income R$ {:.2} ({})", baseline.value, baseline.period);
        baseline.value
    } else {
        args.base_income
    };

    let economics = Economics {
        base_income,
        workers_per_stall: args.workers_per_stall,
    };

    let rows = build_dataset(&args.ledger, &districts, &wealth, &radiance, economics)?;
    write_dataset(&args.output, &rows)?;

    let summary = DatasetSummary::from_rows(&rows, args.top);
    log::info!("Saved {} row(s) to {}", rows.len(), args.output.display());
    print!("{summary}");

    Ok(())
}
