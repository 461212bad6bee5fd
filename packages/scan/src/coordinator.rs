//! The scan loop.
//!
//! For every candidate point, in order:
//!
//! 1. Skip it if its key is already in the ledger.
//! 2. Stop the whole run if `persisted + spent >= budget_cap`.
//! 3. Ask for metadata. No imagery, no date, or a capture year below the
//!    freshness cutoff ends the point with nothing spent and nothing
//!    recorded, so it is checked again on the next run.
//! 4. Download the image (or reuse the one already on disk) and save it.
//! 5. Run detection, fold labels into category counts, append the record.
//!
//! Only step 4 costs money. The cap is checked before it, and every point
//! that reaches it consumes one unit of budget whether the image was
//! downloaded or reused.

use std::collections::BTreeSet;
use std::path::Path;
use std::sync::Arc;
use std::time::Instant;

use vendor_map_detection::classes::ClassMapping;
use vendor_map_geography::ScanRegion;
use vendor_map_geography::grid::candidate_points;
use vendor_map_geography_models::{GeoPoint, PointKey};
use vendor_map_ledger::Ledger;
use vendor_map_scan_models::{ScanDefinition, ScanRecord, ScanSummary, SkipReason};

use crate::progress::ScanProgress;
use crate::rate_limit::RateLimiter;
use crate::{Providers, ScanError, images};

/// What a scan would do, computed without any provider call.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ScanPlan {
    /// Candidate points in the region.
    pub candidates: u64,
    /// Candidates already present in the ledger.
    pub already_scanned: u64,
    /// Distinct points in the ledger (this region or not).
    pub persisted: u64,
    /// Budget left before the cap.
    pub remaining_budget: u64,
    /// Upper bound on images this run can pay for.
    pub worst_case_spend: u64,
}

/// Computes a [`ScanPlan`] from the region and the current ledger.
///
/// # Errors
///
/// Returns [`ScanError::Ledger`] if an existing ledger cannot be read.
pub fn plan(definition: &ScanDefinition, region: &ScanRegion) -> Result<ScanPlan, ScanError> {
    let keys = existing_keys(&definition.ledger)?;
    let candidates = candidate_points(region);

    let already_scanned = candidates
        .iter()
        .filter(|p| keys.contains(&p.key()))
        .count() as u64;
    let persisted = keys.len() as u64;
    let remaining_budget = definition.budget_cap.saturating_sub(persisted);
    let pending = candidates.len() as u64 - already_scanned;

    Ok(ScanPlan {
        candidates: candidates.len() as u64,
        already_scanned,
        persisted,
        remaining_budget,
        worst_case_spend: pending.min(remaining_budget),
    })
}

fn existing_keys(path: &Path) -> Result<BTreeSet<PointKey>, ScanError> {
    if !path.exists() {
        return Ok(BTreeSet::new());
    }
    let contents = vendor_map_ledger::read_rows(path)?;
    Ok(contents.rows.iter().map(vendor_map_ledger::LedgerRow::key).collect())
}

/// Runs one scan definition against a set of providers.
pub struct ScanCoordinator {
    definition: ScanDefinition,
    providers: Providers,
    mapping: ClassMapping,
    progress: Arc<dyn ScanProgress>,
}

/// Mutable state for the lifetime of one run.
struct Session {
    ledger: Ledger,
    limiter: RateLimiter,
    summary: ScanSummary,
    spent: u64,
    attempted: BTreeSet<PointKey>,
}

enum Visit {
    Recorded,
    Skipped(SkipReason),
}

impl ScanCoordinator {
    /// Creates a coordinator. Nothing is opened or requested until
    /// [`ScanCoordinator::run`].
    #[must_use]
    pub fn new(
        definition: ScanDefinition,
        providers: Providers,
        progress: Arc<dyn ScanProgress>,
    ) -> Self {
        let mapping = ClassMapping::new(&definition.categories);
        Self {
            definition,
            providers,
            mapping,
            progress,
        }
    }

    /// Walks the region until candidates run out or the budget cap is hit.
    ///
    /// Reaching the cap is a normal end of the run, reported through
    /// [`ScanSummary::budget_exhausted`].
    ///
    /// # Errors
    ///
    /// Returns [`ScanError`] if the ledger cannot be opened or written, or
    /// an image cannot be saved. Records appended before the failure stay
    /// in the ledger.
    pub async fn run(&self, region: &ScanRegion) -> Result<ScanSummary, ScanError> {
        let started = Instant::now();
        let definition = &self.definition;
        let candidates = candidate_points(region);

        let ledger = Ledger::open(&definition.ledger, &definition.count_columns())?;
        let mut session = Session {
            summary: ScanSummary {
                candidates: candidates.len() as u64,
                persisted_at_start: ledger.len(),
                ..ScanSummary::default()
            },
            ledger,
            limiter: RateLimiter::new(definition.rate_limit()),
            spent: 0,
            attempted: BTreeSet::new(),
        };

        log::info!(
            "Scan '{}': {} candidate point(s), {} already in ledger, cap {}",
            definition.id,
            candidates.len(),
            session.summary.persisted_at_start,
            definition.budget_cap
        );

        self.progress.started(candidates.len() as u64);

        for point in candidates {
            let key = point.key();
            if session.ledger.contains(&key) || session.attempted.contains(&key) {
                session.summary.record_skip(SkipReason::AlreadyScanned);
                self.progress.point_done(&session.summary, session.spent);
                continue;
            }

            if session.summary.persisted_at_start + session.spent >= definition.budget_cap {
                log::info!(
                    "Budget cap {} reached ({} persisted + {} this run), stopping",
                    definition.budget_cap,
                    session.summary.persisted_at_start,
                    session.spent
                );
                session.summary.budget_exhausted = true;
                break;
            }

            session.attempted.insert(key);
            match self.visit(point, &mut session).await? {
                Visit::Recorded => {}
                Visit::Skipped(reason) => session.summary.record_skip(reason),
            }

            self.progress.point_done(&session.summary, session.spent);
        }

        let mut summary = session.summary;
        summary.ledger_size = session.ledger.len();
        summary.duration = started.elapsed();

        self.progress.finished(&summary);
        log::info!(
            "Scan '{}' finished in {:.1}s: {} record(s), {} hit(s), {} download(s), {} reused, \
             {} without imagery, {} stale, {} transient failure(s), {} detection failure(s), \
             ledger size {}",
            definition.id,
            summary.duration.as_secs_f64(),
            summary.records_written,
            summary.hits,
            summary.images_downloaded,
            summary.images_reused,
            summary.no_imagery,
            summary.stale,
            summary.transient_failures,
            summary.detection_failures,
            summary.ledger_size
        );

        Ok(summary)
    }

    async fn visit(&self, point: GeoPoint, session: &mut Session) -> Result<Visit, ScanError> {
        let definition = &self.definition;

        session.limiter.wait().await;

        let metadata = match self.providers.metadata.metadata(point).await {
            Ok(metadata) => metadata,
            Err(e) => {
                log::warn!("Metadata lookup failed at {point}: {e}");
                return Ok(Visit::Skipped(SkipReason::MetadataFailed));
            }
        };

        let Some(date) = metadata.usable_date() else {
            log::debug!("No imagery at {point} ({})", metadata.status);
            return Ok(Visit::Skipped(SkipReason::NoImagery));
        };

        if date.year() < definition.freshness_cutoff {
            log::debug!(
                "Imagery at {point} from {date} is older than {}",
                definition.freshness_cutoff
            );
            return Ok(Visit::Skipped(SkipReason::Stale));
        }

        let path = images::image_path(
            &definition.image_dir,
            &definition.image_prefix,
            point,
            date.as_str(),
        );

        let image = if let Some(bytes) = images::read_existing(&path)? {
            log::debug!("Reusing {}", path.display());
            session.summary.images_reused += 1;
            session.spent += 1;
            bytes
        } else {
            match self.providers.imagery.download(point).await {
                Ok(bytes) => {
                    images::save_image(&path, &bytes)?;
                    session.summary.images_downloaded += 1;
                    session.spent += 1;
                    bytes
                }
                Err(e) => {
                    log::warn!("Image download failed at {point}: {e}");
                    return Ok(Visit::Skipped(SkipReason::DownloadFailed));
                }
            }
        };

        let detections = match self
            .providers
            .detector
            .detect(&image, definition.detection.thresholds())
            .await
        {
            Ok(detections) => detections,
            Err(e) => {
                log::warn!(
                    "Detection failed at {point}, image kept at {}: {e}",
                    path.display()
                );
                return Ok(Visit::Skipped(SkipReason::DetectionFailed));
            }
        };

        let counts = self.mapping.reduce(&detections);
        let hit = counts.is_hit();
        let record = ScanRecord {
            point,
            capture_date: date.as_str().to_string(),
            counts,
            image_file: path,
        };
        session.ledger.append(&record)?;
        session.summary.records_written += 1;

        if hit {
            session.summary.hits += 1;
            log::info!(
                "[HIT] {} @ {point}: {:?}",
                record.capture_date,
                record.counts.as_slice()
            );
            if let Some(training_dir) = &definition.training_dir
                && let Err(e) = images::harvest(training_dir, point, &record.image_file)
            {
                log::warn!("Could not copy {} for training: {e}", record.image_file.display());
            }
        } else {
            log::debug!("Nothing detected at {point}");
        }

        Ok(Visit::Recorded)
    }
}
