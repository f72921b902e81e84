//! Sparse year -> country -> count table.

use incident_atlas_analytics_models::{AggregatedCount, NestedCountView, ViewKind};

use crate::ViewError;
use crate::aggregate::as_year;

/// Builds the nested-count view from `(year, country)` counts.
///
/// Only observed combinations become entries.
///
/// # Errors
///
/// Returns [`ViewError::InsufficientData`] if `counts` holds no
/// `(year, country)` entry.
pub fn build_nested_counts(counts: &[AggregatedCount]) -> Result<NestedCountView, ViewError> {
    let mut view = NestedCountView::default();

    for entry in counts {
        let (Some(year), Some(country)) = (
            as_year(&entry.primary),
            entry.secondary.as_ref().and_then(|s| s.as_text()),
        ) else {
            continue;
        };
        *view
            .by_year
            .entry(year)
            .or_default()
            .entry(country.to_owned())
            .or_default() += entry.value;
    }

    if view.by_year.is_empty() {
        return Err(ViewError::InsufficientData {
            view: ViewKind::NestedCount,
            reason: "no records with a country".to_string(),
        });
    }

    Ok(view)
}
