//! Scan progress observers.
//!
//! The coordinator reports where a run stands through [`ScanProgress`] and
//! never renders anything itself. The CLI plugs in an `indicatif` bar;
//! tests and headless runs use [`NullProgress`].

use std::sync::Arc;

use vendor_map_scan_models::ScanSummary;

/// Observes a running scan.
pub trait ScanProgress: Send + Sync {
    /// The region resolved to `candidates` points.
    fn started(&self, candidates: u64);

    /// One more candidate was handled. `summary` holds the running totals
    /// and `spent` the budget used so far this run.
    fn point_done(&self, summary: &ScanSummary, spent: u64);

    /// The run ended, normally or at the budget cap.
    fn finished(&self, summary: &ScanSummary);
}

/// Ignores all progress updates.
pub struct NullProgress;

impl ScanProgress for NullProgress {
    fn started(&self, _candidates: u64) {}
    fn point_done(&self, _summary: &ScanSummary, _spent: u64) {}
    fn finished(&self, _summary: &ScanSummary) {}
}

/// Returns a shared [`NullProgress`].
#[must_use]
pub fn null_progress() -> Arc<dyn ScanProgress> {
    Arc::new(NullProgress)
}
