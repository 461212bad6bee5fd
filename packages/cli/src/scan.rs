//! `scans`, `plan`, `scan` and `status` subcommands.

use vendor_map_cli_utils::{MultiProgress, ScanBar, confirm_spend};
use vendor_map_geography::{ScanRegion, resolve_region};
use vendor_map_scan::coordinator::{ScanPlan, plan as plan_scan};
use vendor_map_scan::registry::all_definitions;
use vendor_map_scan::{Providers, ScanCoordinator};
use vendor_map_scan_models::{ScanDefinition, ScanSummary};

/// Prints the built-in scan definitions.
pub fn list() {
    println!("{:<16} {:<10} {:>7} {:>6}  NAME", "ID", "REGION", "CAP", "SINCE");
    println!("{}", "-".repeat(72));
    for definition in &all_definitions() {
        println!(
            "{:<16} {:<10} {:>7} {:>6}  {}",
            definition.id(),
            definition.region.kind(),
            definition.budget_cap,
            definition.freshness_cutoff,
            definition.name()
        );
    }
}

async fn region_for(definition: &ScanDefinition) -> Result<ScanRegion, Box<dyn std::error::Error>> {
    log::info!(
        "Resolving {} region for '{}'...",
        definition.region.kind(),
        definition.id()
    );
    let client = reqwest::Client::new();
    Ok(resolve_region(&client, &definition.region).await?)
}

fn print_plan(definition: &ScanDefinition, plan: &ScanPlan) {
    println!("Scan:              {} ({})", definition.name(), definition.id());
    println!("Ledger:            {}", definition.ledger.display());
    println!("Candidates:        {}", plan.candidates);
    println!("Already scanned:   {}", plan.already_scanned);
    println!("Ledger size:       {}", plan.persisted);
    println!(
        "Remaining budget:  {} of {}",
        plan.remaining_budget, definition.budget_cap
    );
    println!("Worst-case spend:  {} image(s)", plan.worst_case_spend);
}

/// Resolves the region and prints what a run would do.
///
/// # Errors
///
/// Returns an error if the region cannot be resolved or the ledger cannot
/// be read.
pub async fn plan(definition: &ScanDefinition) -> Result<(), Box<dyn std::error::Error>> {
    let region = region_for(definition).await?;
    let plan = plan_scan(definition, &region)?;
    print_plan(definition, &plan);
    Ok(())
}

/// Runs a scan after confirmation.
///
/// # Errors
///
/// Returns an error if credentials are missing, the region cannot be
/// resolved, the prompt fails, or the scan aborts.
pub async fn run(
    mut definition: ScanDefinition,
    yes: bool,
    limit: Option<u64>,
    multi: &MultiProgress,
) -> Result<(), Box<dyn std::error::Error>> {
    if let Some(limit) = limit {
        definition.budget_cap = definition.budget_cap.min(limit);
    }

    let providers = Providers::from_env(&definition)?;
    let region = region_for(&definition).await?;
    let plan = plan_scan(&definition, &region)?;
    print_plan(&definition, &plan);

    if plan.worst_case_spend == 0 {
        println!("Nothing to scan.");
        return Ok(());
    }

    if !yes && !confirm_spend(definition.id(), plan.worst_case_spend)? {
        println!("Aborted.");
        return Ok(());
    }

    let progress = ScanBar::new(multi, &format!("Scanning {}", definition.name()));
    let coordinator = ScanCoordinator::new(definition, providers, progress);
    let summary = coordinator.run(&region).await?;
    print_summary(&summary);

    Ok(())
}

fn print_summary(summary: &ScanSummary) {
    println!();
    println!("Records written:   {}", summary.records_written);
    println!("Hits:              {}", summary.hits);
    println!(
        "Images:            {} downloaded, {} reused",
        summary.images_downloaded, summary.images_reused
    );
    println!(
        "Skipped:           {} already scanned, {} no imagery, {} stale, {} transient, {} detection",
        summary.already_scanned,
        summary.no_imagery,
        summary.stale,
        summary.transient_failures,
        summary.detection_failures
    );
    println!("Ledger size:       {}", summary.ledger_size);
    if summary.budget_exhausted {
        println!("Budget cap reached.");
    }
    println!("Duration:          {:.1}s", summary.duration.as_secs_f64());
}

/// Prints a ledger summary.
///
/// # Errors
///
/// Returns an error if the ledger exists but cannot be read.
pub fn status(definition: &ScanDefinition) -> Result<(), Box<dyn std::error::Error>> {
    let summary = vendor_map_ledger::summarize(&definition.ledger)?;

    println!("Scan:              {} ({})", definition.name(), definition.id());
    println!("Ledger:            {}", definition.ledger.display());
    println!("Rows:              {}", summary.rows);
    println!("Distinct points:   {}", summary.distinct_points);
    println!("Hits:              {}", summary.hits);
    println!(
        "Budget used:       {} of {}",
        summary.distinct_points, definition.budget_cap
    );
    if let Some(latest) = &summary.latest_capture {
        println!("Latest capture:    {latest}");
    }
    for (column, total) in &summary.column_totals {
        println!("  {column:<20} {total}");
    }
    Ok(())
}
