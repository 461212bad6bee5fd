#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Terminal plumbing for the `vendor_map` binary.
//!
//! [`ScanBar`] renders a running scan through the [`ScanProgress`]
//! observer, [`init_logger`] routes `log` output around the bar with
//! `indicatif-log-bridge`, and [`confirm_spend`] asks before a billable run.

use std::sync::Arc;
use std::time::Duration;

use indicatif::{ProgressBar, ProgressStyle};
use vendor_map_scan::progress::ScanProgress;
use vendor_map_scan_models::ScanSummary;

pub use indicatif::MultiProgress;

const SPINNER_TEMPLATE: &str = "{spinner:.cyan} {msg}";
const BAR_TEMPLATE: &str = "  {wide_bar:.cyan/dim} {pos}/{len} [{eta}] {msg}";

/// Scan progress as an `indicatif` bar.
///
/// Spins while the region resolves, then turns into a bar over the
/// candidate points.
pub struct ScanBar {
    bar: ProgressBar,
}

impl ScanBar {
    /// Adds a scan bar labelled `label` to `multi`.
    #[must_use]
    pub fn new(multi: &MultiProgress, label: &str) -> Arc<dyn ScanProgress> {
        let bar = multi.add(ProgressBar::new_spinner());
        bar.set_style(
            ProgressStyle::with_template(SPINNER_TEMPLATE)
                .unwrap_or_else(|_| ProgressStyle::default_spinner()),
        );
        bar.enable_steady_tick(Duration::from_millis(120));
        bar.set_message(label.to_string());
        Arc::new(Self { bar })
    }
}

impl ScanProgress for ScanBar {
    fn started(&self, candidates: u64) {
        self.bar.set_length(candidates);
        self.bar.set_style(
            ProgressStyle::with_template(BAR_TEMPLATE)
                .unwrap_or_else(|_| ProgressStyle::default_bar())
                .progress_chars("=>-"),
        );
    }

    fn point_done(&self, summary: &ScanSummary, spent: u64) {
        self.bar.inc(1);
        self.bar.set_message(format!(
            "{} recorded, {} hit(s), {spent} spent",
            summary.records_written, summary.hits
        ));
    }

    fn finished(&self, summary: &ScanSummary) {
        let ending = if summary.budget_exhausted {
            "cap reached"
        } else {
            "done"
        };
        self.bar.finish_with_message(format!(
            "{ending}: {} recorded, {} hit(s)",
            summary.records_written, summary.hits
        ));
    }
}

/// Installs `pretty_env_logger` behind `indicatif-log-bridge`.
///
/// Logs at `info` unless `RUST_LOG` says otherwise. Every bar must be added
/// to the returned [`MultiProgress`] so log lines print above it.
#[must_use]
pub fn init_logger() -> MultiProgress {
    let multi = MultiProgress::new();
    let logger = pretty_env_logger::formatted_builder()
        .filter_level(log::LevelFilter::Info)
        .parse_env("RUST_LOG")
        .build();
    let level = logger.filter();

    if let Err(e) = indicatif_log_bridge::LogWrapper::new(multi.clone(), logger).try_init() {
        eprintln!("Logger already initialized: {e}");
    }
    log::set_max_level(level);

    multi
}

/// Asks whether to start a run that may pay for up to `worst_case` images.
///
/// # Errors
///
/// Returns an error if the terminal cannot be read.
pub fn confirm_spend(scan: &str, worst_case: u64) -> Result<bool, dialoguer::Error> {
    dialoguer::Confirm::new()
        .with_prompt(format!(
            "Scan '{scan}' may download up to {worst_case} billable image(s). Continue?"
        ))
        .default(false)
        .interact()
}
