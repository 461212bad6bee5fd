//! District wealth multipliers.
//!
//! A table is an ordered list of `(key, weight)` pairs plus a default.
//! Lookup walks the list in order and returns the weight of the first key
//! that appears in the district name as whole words, so
//! `"Distrito de Pinheiros"` matches `"Pinheiros"` but `"Jose Bonifacio"`
//! does not match `"Se"`. Matching is case-insensitive.

use std::path::Path;

use serde::Deserialize;

use crate::DatasetError;

/// Embedded São Paulo table.
const SAO_PAULO_TOML: &str = include_str!("../weights/sao_paulo.toml");

#[derive(Debug, Clone, PartialEq, Deserialize)]
struct WeightEntry {
    key: String,
    weight: f64,
}

/// Ordered substring lookup from district name to wealth multiplier.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct WealthIndex {
    default: f64,
    #[serde(default, rename = "district")]
    entries: Vec<WeightEntry>,
}

impl WealthIndex {
    /// The built-in São Paulo table.
    ///
    /// # Panics
    ///
    /// Panics if the embedded TOML fails to parse, which the tests below
    /// rule out.
    #[must_use]
    pub fn sao_paulo() -> Self {
        Self::from_toml_str(SAO_PAULO_TOML)
            .unwrap_or_else(|e| panic!("Failed to parse embedded wealth table: {e}"))
    }

    /// Parses a table from TOML.
    ///
    /// # Errors
    ///
    /// Returns [`DatasetError::Toml`] if the text does not parse.
    pub fn from_toml_str(content: &str) -> Result<Self, DatasetError> {
        Ok(toml::de::from_str(content)?)
    }

    /// Loads a table from a TOML file.
    ///
    /// # Errors
    ///
    /// Returns [`DatasetError`] if the file cannot be read or parsed.
    pub fn load(path: &Path) -> Result<Self, DatasetError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    /// Weight for districts that match no key.
    #[must_use]
    pub const fn default_weight(&self) -> f64 {
        self.default
    }

    /// Number of keyed entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the table has no keyed entries.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Multiplier for a district name.
    #[must_use]
    pub fn lookup(&self, district: &str) -> f64 {
        let district = district.to_lowercase();
        self.entries
            .iter()
            .find(|e| contains_words(&district, &e.key.to_lowercase()))
            .map_or(self.default, |e| e.weight)
    }
}

/// Whether `needle` occurs in `haystack` bounded by non-alphanumeric
/// characters or the ends of the string.
fn contains_words(haystack: &str, needle: &str) -> bool {
    if needle.is_empty() {
        return false;
    }
    haystack.match_indices(needle).any(|(start, _)| {
        let end = start + needle.len();
        let before = haystack[..start].chars().next_back();
        let after = haystack[end..].chars().next();
        !before.is_some_and(char::is_alphanumeric) && !after.is_some_and(char::is_alphanumeric)
    })
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeSet;

    use super::*;

    #[test]
    fn embedded_table_loads() {
        let index = WealthIndex::sao_paulo();
        assert_eq!(index.len(), 30);
        assert!((index.default_weight() - 0.75).abs() < f64::EPSILON);
    }

    #[test]
    fn embedded_keys_are_unique() {
        let index = WealthIndex::sao_paulo();
        let mut seen = BTreeSet::new();
        for entry in &index.entries {
            assert!(seen.insert(&entry.key), "Duplicate key: {}", entry.key);
            assert!(entry.weight > 0.0, "{} has non-positive weight", entry.key);
        }
    }

    #[test]
    fn matches_words_case_insensitively() {
        let index = WealthIndex::sao_paulo();
        assert!((index.lookup("Distrito de Pinheiros") - 1.8).abs() < f64::EPSILON);
        assert!((index.lookup("ITAIM BIBI") - 1.8).abs() < f64::EPSILON);
        assert!((index.lookup("Tatuape") - 1.1).abs() < f64::EPSILON);
        assert!((index.lookup("Barra Funda") - 1.0).abs() < f64::EPSILON);
    }

    #[test]
    fn short_keys_need_word_boundaries() {
        let index = WealthIndex::sao_paulo();
        assert!((index.lookup("Se") - 1.3).abs() < f64::EPSILON);
        assert!((index.lookup("Jose Bonifacio") - 0.75).abs() < f64::EPSILON);
        assert!((index.lookup("Parelheiros") - 0.75).abs() < f64::EPSILON);
        assert!(contains_words("vila mariana", "vila mariana"));
        assert!(!contains_words("santanas", "santana"));
    }

    #[test]
    fn first_listed_key_wins() {
        let index = WealthIndex::from_toml_str(
            r#"
            default = 0.5
            [[district]]
            key = "Vila"
            weight = 2.0
            [[district]]
            key = "Vila Mariana"
            weight = 1.4
            "#,
        )
        .unwrap();
        assert!((index.lookup("Vila Mariana") - 2.0).abs() < f64::EPSILON);
    }

    #[test]
    fn unmatched_uses_default() {
        let index = WealthIndex::sao_paulo();
        assert!((index.lookup("Parelheiros") - 0.75).abs() < f64::EPSILON);
        assert!((index.lookup("Unknown") - 0.75).abs() < f64::EPSILON);
    }
}
