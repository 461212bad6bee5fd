//! Compile-time registry of named scan definitions.
//!
//! Each entry is an `(id, toml_content)` pair embedded via `include_str!`.
//! Adding a scan requires creating a TOML file in `scans/` and adding a
//! corresponding entry here. Paths inside the definitions are relative to
//! the working directory the scan is run from.

use std::collections::BTreeSet;
use std::path::Path;

use vendor_map_scan_models::ScanDefinition;

use crate::ScanError;

/// Number of registered scans. Enforced by a test.
#[cfg(test)]
const EXPECTED_SCAN_COUNT: usize = 6;

/// Embedded TOML scan definitions.
const SCAN_TOMLS: &[(&str, &str)] = &[
    ("sp_scanner", include_str!("../scans/sp_scanner.toml")),
    ("full_city_scan", include_str!("../scans/full_city_scan.toml")),
    ("sp_real_shape", include_str!("../scans/sp_real_shape.toml")),
    ("sp_polygon", include_str!("../scans/sp_polygon.toml")),
    ("sp_full_city", include_str!("../scans/sp_full_city.toml")),
    ("sp_macro", include_str!("../scans/sp_macro.toml")),
];

/// Returns all registered scan definitions.
///
/// # Panics
///
/// Panics if any embedded TOML file fails to parse. Since these are
/// compile-time constants, parse failures indicate a development error
/// and are caught by the tests below.
#[must_use]
pub fn all_definitions() -> Vec<ScanDefinition> {
    SCAN_TOMLS
        .iter()
        .map(|(id, toml_str)| {
            toml::de::from_str(toml_str)
                .unwrap_or_else(|e| panic!("Failed to parse scan definition '{id}': {e}"))
        })
        .collect()
}

/// Looks up a registered scan by id.
#[must_use]
pub fn find_definition(id: &str) -> Option<ScanDefinition> {
    all_definitions().into_iter().find(|d| d.id == id)
}

/// Reads and validates a scan definition from a TOML file.
///
/// # Errors
///
/// Returns [`ScanError`] if the file cannot be read, does not parse, or
/// fails [`validate`].
pub fn load_definition(path: &Path) -> Result<ScanDefinition, ScanError> {
    let content = std::fs::read_to_string(path)?;
    let definition: ScanDefinition = toml::de::from_str(&content)?;
    validate(&definition)?;
    log::debug!(
        "Loaded scan definition '{}' from {}",
        definition.id,
        path.display()
    );
    Ok(definition)
}

/// Checks the parts of a definition that the type system does not.
///
/// Region geometry is checked separately when the region is resolved.
///
/// # Errors
///
/// Returns [`ScanError::Config`] describing the first problem found.
pub fn validate(definition: &ScanDefinition) -> Result<(), ScanError> {
    let fail = |message: String| -> Result<(), ScanError> {
        Err(ScanError::Config {
            message: format!("scan '{}': {message}", definition.id),
        })
    };

    if definition.id.trim().is_empty() {
        return fail("id is empty".to_string());
    }
    if definition.budget_cap == 0 {
        return fail("budget_cap must be positive".to_string());
    }
    if definition.categories.is_empty() {
        return fail("at least one category is required".to_string());
    }

    let mut columns = BTreeSet::new();
    for category in &definition.categories {
        if category.column.trim().is_empty() {
            return fail(format!("category '{}' has an empty column", category.name));
        }
        if !columns.insert(category.column.as_str()) {
            return fail(format!("duplicate column '{}'", category.column));
        }
        if category.labels.is_empty() {
            log::warn!(
                "Scan '{}': category '{}' accepts no labels and will always count 0",
                definition.id,
                category.name
            );
        }
    }

    let detection = &definition.detection;
    if detection.confidence > 100 || detection.overlap > 100 {
        return fail(format!(
            "thresholds must be percentages (confidence {}, overlap {})",
            detection.confidence, detection.overlap
        ));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use vendor_map_geography_models::RegionConfig;

    #[test]
    fn loads_all_definitions() {
        let definitions = all_definitions();
        assert_eq!(
            definitions.len(),
            EXPECTED_SCAN_COUNT,
            "Expected {EXPECTED_SCAN_COUNT} scan definitions, found {}. \
             Update EXPECTED_SCAN_COUNT after adding/removing scans.",
            definitions.len()
        );
    }

    #[test]
    fn definition_ids_are_unique_and_match_keys() {
        let mut seen = BTreeSet::new();
        for ((key, _), definition) in SCAN_TOMLS.iter().zip(all_definitions()) {
            assert_eq!(*key, definition.id, "Registry key does not match id");
            assert!(
                seen.insert(definition.id.clone()),
                "Duplicate scan id: {}",
                definition.id
            );
        }
    }

    #[test]
    fn all_definitions_validate() {
        for definition in &all_definitions() {
            assert!(!definition.name.is_empty(), "{} has empty name", definition.id);
            assert!(
                !definition.detection.project.is_empty(),
                "{} has empty detection project",
                definition.id
            );
            assert!(
                definition.region.step() > 0.0,
                "{} has non-positive step",
                definition.id
            );
            validate(definition).unwrap();
        }
    }

    #[test]
    fn ledgers_and_image_dirs_are_distinct() {
        let definitions = all_definitions();
        let ledgers: BTreeSet<_> = definitions.iter().map(|d| d.ledger.clone()).collect();
        let dirs: BTreeSet<_> = definitions.iter().map(|d| d.image_dir.clone()).collect();
        assert_eq!(ledgers.len(), definitions.len());
        assert_eq!(dirs.len(), definitions.len());
    }

    #[test]
    fn real_shape_uses_municipal_boundary() {
        let definition = find_definition("sp_real_shape").unwrap();
        assert!(matches!(
            definition.region,
            RegionConfig::Boundary { ref value, .. } if value == "3550308"
        ));
        assert_eq!(definition.count_columns(), vec!["Structure_Count"]);
        assert!(definition.training_dir.is_some());
    }

    #[test]
    fn market_scans_are_centered_on_25_de_marco() {
        let small = find_definition("sp_scanner").unwrap();
        assert!(matches!(
            small.region,
            RegionConfig::Centered { grid_size: 3, .. }
        ));
        assert_eq!(small.detection.confidence, 15);
        assert_eq!(
            small.count_columns(),
            vec!["Vendor_Count", "Stall_Count", "Merch_Count"]
        );

        let large = find_definition("full_city_scan").unwrap();
        assert!(matches!(
            large.region,
            RegionConfig::Centered { grid_size: 20, .. }
        ));
        assert_eq!(large.freshness_cutoff, 2023);
        assert_eq!(large.detection.confidence, 40);
    }

    #[test]
    fn unknown_id_is_none() {
        assert!(find_definition("nope").is_none());
    }

    #[test]
    fn rejects_duplicate_columns() {
        let mut definition = find_definition("sp_macro").unwrap();
        definition.categories[1].column = definition.categories[0].column.clone();
        assert!(matches!(
            validate(&definition),
            Err(ScanError::Config { .. })
        ));
    }

    #[test]
    fn rejects_zero_cap_and_bad_thresholds() {
        let mut definition = find_definition("sp_macro").unwrap();
        definition.budget_cap = 0;
        assert!(validate(&definition).is_err());

        let mut definition = find_definition("sp_macro").unwrap();
        definition.detection.confidence = 140;
        assert!(validate(&definition).is_err());

        let mut definition = find_definition("sp_macro").unwrap();
        definition.categories.clear();
        assert!(validate(&definition).is_err());
    }

    #[test]
    fn loads_definition_from_file() {
        let dir = std::env::temp_dir().join("vendor_map_scan_registry_load");
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("custom.toml");
        std::fs::write(&path, SCAN_TOMLS[5].1.replace("sp_macro", "custom")).unwrap();

        let definition = load_definition(&path).unwrap();
        assert_eq!(definition.id, "custom");

        std::fs::write(&path, "id = ").unwrap();
        assert!(matches!(load_definition(&path), Err(ScanError::Toml(_))));

        std::fs::remove_dir_all(&dir).ok();
    }
}
