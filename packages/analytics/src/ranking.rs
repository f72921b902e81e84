//! Per-year top groups.

use std::collections::BTreeMap;

use incident_atlas_analytics_models::{AggregatedCount, RankedGroup, RankingView, ViewKind};

use crate::ViewError;
use crate::aggregate::as_year;

/// Sorts `(name, count)` pairs by descending count, breaking ties by
/// ascending name, and keeps at most `limit` of them.
#[must_use]
pub fn top_n(mut entries: Vec<(String, u64)>, limit: usize) -> Vec<(String, u64)> {
    entries.sort_by(|(a_name, a_count), (b_name, b_count)| {
        b_count.cmp(a_count).then_with(|| a_name.cmp(b_name))
    });
    entries.truncate(limit);
    entries
}

/// Builds the ranking view from `(year, group)` counts.
///
/// Each year is ranked independently. Counts should come from grouping by
/// [`incident_atlas_analytics_models::GroupField::RankingGroup`] so that
/// unknown groups are already left out.
///
/// # Errors
///
/// Returns [`ViewError::InsufficientData`] if `counts` holds no
/// `(year, group)` entry.
pub fn build_ranking(counts: &[AggregatedCount], limit: usize) -> Result<RankingView, ViewError> {
    let mut per_year: BTreeMap<i32, Vec<(String, u64)>> = BTreeMap::new();

    for entry in counts {
        let (Some(year), Some(group)) = (
            as_year(&entry.primary),
            entry.secondary.as_ref().and_then(|s| s.as_text()),
        ) else {
            log::warn!(
                "Skipping aggregate ({}, {:?}) without a year/group key",
                entry.primary,
                entry.secondary
            );
            continue;
        };
        per_year
            .entry(year)
            .or_default()
            .push((group.to_owned(), entry.value));
    }

    if per_year.is_empty() {
        return Err(ViewError::InsufficientData {
            view: ViewKind::Ranking,
            reason: "no records with a known group name".to_string(),
        });
    }

    let by_year = per_year
        .into_iter()
        .map(|(year, groups)| {
            let ranked = top_n(groups, limit)
                .into_iter()
                .map(|(group, count)| RankedGroup { group, count })
                .collect();
            (year, ranked)
        })
        .collect();

    Ok(RankingView { by_year })
}
