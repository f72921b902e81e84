//! Dataset-wide headline figures and per-country totals.

use std::collections::BTreeMap;

use incident_atlas_analytics_models::{
    AggregatedCount, AttackTypeCount, CountryTotal, GroupField, GroupSpec, SummaryView, ViewKind,
};
use incident_atlas_incident_models::CleanedRecord;

use crate::ViewError;
use crate::aggregate::{as_year, count_by, sum_casualties_by};
use crate::ranking::top_n;
use crate::stats::{DECOMPOSITION_PERIOD, decompose_yearly, numeric_columns};

/// Incident count per country, highest first, ties by name.
#[must_use]
pub fn country_totals(records: &[CleanedRecord]) -> Vec<CountryTotal> {
    let counts = count_by(records, GroupSpec::single(GroupField::Country));
    top_n(text_counts(&counts), usize::MAX)
        .into_iter()
        .map(|(country, count)| CountryTotal { country, count })
        .collect()
}

/// Builds the summary view.
///
/// A dataset spanning too few years for the seasonal decomposition still
/// gets a summary, with no decomposition.
///
/// # Errors
///
/// Returns [`ViewError::InsufficientData`] if `records` is empty.
pub fn build_summary(
    records: &[CleanedRecord],
    attack_type_limit: usize,
) -> Result<SummaryView, ViewError> {
    if records.is_empty() {
        return Err(ViewError::InsufficientData {
            view: ViewKind::Summary,
            reason: "no records".to_string(),
        });
    }

    let by_year = GroupSpec::single(GroupField::Year);

    let incidents_by_year: BTreeMap<i32, u64> = count_by(records, by_year)
        .iter()
        .filter_map(|entry| Some((as_year(&entry.primary)?, entry.value)))
        .collect();

    let casualties_by_year = sum_casualties_by(records, by_year)
        .iter()
        .filter_map(|entry| Some((as_year(&entry.primary)?, entry.value)))
        .collect();

    let attack_types = count_by(records, GroupSpec::single(GroupField::AttackType));
    let top_attack_types = top_n(text_counts(&attack_types), attack_type_limit)
        .into_iter()
        .map(|(attack_type, count)| AttackTypeCount { attack_type, count })
        .collect();

    let decomposition = match decompose_yearly(&incidents_by_year, DECOMPOSITION_PERIOD) {
        Ok(decomposition) => Some(decomposition),
        Err(e) => {
            log::info!("{e}; leaving out the seasonal decomposition");
            None
        }
    };

    Ok(SummaryView {
        incidents_by_year,
        casualties_by_year,
        top_attack_types,
        country_totals: country_totals(records),
        numeric_columns: numeric_columns(records),
        decomposition,
    })
}

fn text_counts(counts: &[AggregatedCount]) -> Vec<(String, u64)> {
    counts
        .iter()
        .filter_map(|entry| Some((entry.primary.as_text()?.to_owned(), entry.value)))
        .collect()
}
