//! Attack types over time: stacked, normalized-stacked and grouped series.
//!
//! Counts are pivoted onto a dense year axis: a category with no incidents
//! in some year gets an explicit `0` there rather than a gap.

use std::collections::{BTreeMap, BTreeSet};

use incident_atlas_analytics_models::{
    AggregatedCount, AttackTypeCount, SeriesSet, StackMode, TimeSeriesView, ViewKind,
};

use crate::ViewError;
use crate::aggregate::as_year;
use crate::ranking::top_n;

/// Builds the time-series view from `(year, category)` counts.
///
/// `years` extends the axis beyond the years found in `counts`; pass every
/// year present in the dataset so that a year whose records all lack a
/// category still shows up (with a total of `0`).
///
/// # Errors
///
/// Returns [`ViewError::InsufficientData`] if `counts` holds no
/// `(year, category)` entry.
pub fn build_time_series(
    counts: &[AggregatedCount],
    years: &BTreeSet<i32>,
) -> Result<TimeSeriesView, ViewError> {
    let mut cells: BTreeMap<(String, i32), u64> = BTreeMap::new();
    let mut axis = years.clone();

    for entry in counts {
        let (Some(year), Some(category)) = (
            as_year(&entry.primary),
            entry.secondary.as_ref().and_then(|s| s.as_text()),
        ) else {
            log::warn!(
                "Skipping aggregate ({}, {:?}) without a year/category key",
                entry.primary,
                entry.secondary
            );
            continue;
        };
        axis.insert(year);
        *cells.entry((category.to_owned(), year)).or_default() += entry.value;
    }

    if cells.is_empty() {
        return Err(ViewError::InsufficientData {
            view: ViewKind::TimeSeries,
            reason: "no records with both a year and an attack type".to_string(),
        });
    }

    let years: Vec<i32> = axis.into_iter().collect();
    let categories: BTreeSet<&str> = cells.keys().map(|(c, _)| c.as_str()).collect();

    let stacked: BTreeMap<String, Vec<u64>> = categories
        .iter()
        .map(|&category| {
            let series = years
                .iter()
                .map(|&year| {
                    cells
                        .get(&(category.to_owned(), year))
                        .copied()
                        .unwrap_or(0)
                })
                .collect();
            (category.to_owned(), series)
        })
        .collect();

    let totals: Vec<u64> = (0..years.len())
        .map(|i| stacked.values().map(|series| series[i]).sum())
        .collect();

    let normalized = stacked
        .iter()
        .map(|(category, series)| {
            let fractions = series
                .iter()
                .zip(&totals)
                .map(|(&count, &total)| fraction(count, total))
                .collect();
            (category.clone(), fractions)
        })
        .collect();

    log::debug!(
        "Built time series: {} categories over {} years",
        stacked.len(),
        years.len()
    );

    Ok(TimeSeriesView {
        years,
        grouped: SeriesSet {
            mode: StackMode::Grouped,
            series: stacked.clone(),
        },
        stacked: SeriesSet {
            mode: StackMode::Stacked,
            series: stacked,
        },
        normalized: SeriesSet {
            mode: StackMode::Normalized,
            series: normalized,
        },
    })
}

/// Re-keys the stacked counts by year: every attack type seen that year,
/// highest count first.
#[must_use]
pub fn attack_types_by_year(view: &TimeSeriesView) -> BTreeMap<i32, Vec<AttackTypeCount>> {
    view.years
        .iter()
        .enumerate()
        .map(|(i, &year)| {
            let observed = view
                .stacked
                .series
                .iter()
                .filter(|(_, series)| series[i] > 0)
                .map(|(category, series)| (category.clone(), series[i]))
                .collect();
            let ranked = top_n(observed, usize::MAX)
                .into_iter()
                .map(|(attack_type, count)| AttackTypeCount { attack_type, count })
                .collect();
            (year, ranked)
        })
        .collect()
}

/// `count / total`, defined as `0` when the total is `0`.
#[allow(clippy::cast_precision_loss)]
fn fraction(count: u64, total: u64) -> f64 {
    if total == 0 {
        0.0
    } else {
        count as f64 / total as f64
    }
}
