//! Registry of all built-in dataset definitions.
//!
//! Each `.toml` file in `packages/source/datasets/` is baked into the binary
//! at compile time via `include_str!`.

use crate::source_def::{DatasetDefinition, parse_dataset_toml};

/// Embedded TOML definitions, keyed by file stem.
const DATASET_TOMLS: &[(&str, &str)] = &[
    ("gtd", include_str!("../datasets/gtd.toml")),
    ("incidents", include_str!("../datasets/incidents.toml")),
];

/// Identifier of the definition used when none is requested.
pub const DEFAULT_DATASET_ID: &str = "gtd";

/// Total number of embedded definitions (used in tests).
#[cfg(test)]
const EXPECTED_DATASET_COUNT: usize = 2;

/// Returns all built-in dataset definitions, parsed from embedded TOML.
///
/// # Panics
///
/// Panics if any embedded TOML is malformed (the configs ship with the
/// binary, so the tests below catch this before release).
#[must_use]
pub fn all_datasets() -> Vec<DatasetDefinition> {
    DATASET_TOMLS
        .iter()
        .map(|(name, toml)| {
            parse_dataset_toml(toml).unwrap_or_else(|e| panic!("Failed to parse {name}.toml: {e}"))
        })
        .collect()
}

/// Looks up a built-in definition by its `id`.
#[must_use]
pub fn find_dataset(id: &str) -> Option<DatasetDefinition> {
    all_datasets().into_iter().find(|def| def.id == id)
}

/// Returns the definition used when the caller does not pick one.
///
/// # Panics
///
/// Panics if [`DEFAULT_DATASET_ID`] is not among the embedded definitions.
#[must_use]
pub fn default_dataset() -> DatasetDefinition {
    find_dataset(DEFAULT_DATASET_ID)
        .unwrap_or_else(|| panic!("default dataset '{DEFAULT_DATASET_ID}' is not embedded"))
}
