//! Raw label → canonical category reduction.
//!
//! Models tend to accumulate synonyms over training rounds (`"vendor"` and
//! `"street_vendor"`, `"stall"` and `"vendor_stall"`). Each configured
//! category lists the labels it accepts; any label not listed anywhere is
//! ignored. A label listed under several categories counts in each.

use std::collections::BTreeMap;

use vendor_map_scan_models::{CategoryConfig, CategoryCounts};

use crate::Detection;

/// Lookup table from raw label to category indices.
#[derive(Debug, Clone)]
pub struct ClassMapping {
    labels: BTreeMap<String, Vec<usize>>,
    categories: usize,
}

impl ClassMapping {
    /// Builds the mapping from category configs. Index `i` in the produced
    /// counts corresponds to `categories[i]`.
    #[must_use]
    pub fn new(categories: &[CategoryConfig]) -> Self {
        let mut labels: BTreeMap<String, Vec<usize>> = BTreeMap::new();
        for (idx, category) in categories.iter().enumerate() {
            for label in &category.labels {
                let entry = labels.entry(label.clone()).or_default();
                if !entry.contains(&idx) {
                    entry.push(idx);
                }
            }
        }

        Self {
            labels,
            categories: categories.len(),
        }
    }

    /// Reduces detections to per-category counts.
    #[must_use]
    pub fn reduce(&self, detections: &[Detection]) -> CategoryCounts {
        let mut counts = CategoryCounts::zeroed(self.categories);
        for detection in detections {
            match self.labels.get(&detection.label) {
                Some(indices) => {
                    for &idx in indices {
                        counts.0[idx] += 1;
                    }
                }
                None => log::trace!("Ignoring detection label {:?}", detection.label),
            }
        }
        counts
    }
}
