#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Aggregation and view builders.
//!
//! Every builder is a pure function over an immutable slice of cleaned
//! records (or over aggregates of it), so builders can run in any order or
//! in parallel. [`build_view`] dispatches on a [`ViewKind`] and runs the
//! grouping each view needs.

pub mod aggregate;
pub mod geo;
pub mod nested;
pub mod ranking;
pub mod scatter;
pub mod stats;
pub mod summary;
pub mod time_series;

use incident_atlas_analytics_models::{GroupField, GroupSpec, View, ViewKind};
use incident_atlas_incident_models::{CleanedRecord, RANKING_LIMIT, SUMMARY_ATTACK_TYPE_LIMIT};
use thiserror::Error;

/// Errors that can occur while building a view.
#[derive(Debug, Error)]
pub enum ViewError {
    /// The view's required inputs are empty after cleaning.
    ///
    /// Fatal for the requesting view only.
    #[error("Insufficient data for {view} view: {reason}")]
    InsufficientData {
        /// The view that could not be built.
        view: ViewKind,
        /// What was missing.
        reason: String,
    },
}

/// Tunables for the view builders.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ViewOptions {
    /// Groups kept per year in the ranking view.
    pub ranking_limit: usize,
    /// Attack types listed in the summary view.
    pub attack_type_limit: usize,
}

impl Default for ViewOptions {
    fn default() -> Self {
        Self {
            ranking_limit: RANKING_LIMIT,
            attack_type_limit: SUMMARY_ATTACK_TYPE_LIMIT,
        }
    }
}

/// Builds one view from the cleaned record set.
///
/// # Errors
///
/// Returns [`ViewError::InsufficientData`] if the records hold nothing the
/// view can be built from.
pub fn build_view(
    kind: ViewKind,
    records: &[CleanedRecord],
    options: ViewOptions,
) -> Result<View, ViewError> {
    log::debug!("Building {kind} view over {} records", records.len());

    Ok(match kind {
        ViewKind::TimeSeries => {
            let counts = aggregate::count_by(
                records,
                GroupSpec::pair(GroupField::Year, GroupField::AttackType),
            );
            View::TimeSeries(time_series::build_time_series(
                &counts,
                &aggregate::years_present(records),
            )?)
        }
        ViewKind::Ranking => {
            let counts = aggregate::count_by(
                records,
                GroupSpec::pair(GroupField::Year, GroupField::RankingGroup),
            );
            View::Ranking(ranking::build_ranking(&counts, options.ranking_limit)?)
        }
        ViewKind::NestedCount => {
            let counts = aggregate::count_by(
                records,
                GroupSpec::pair(GroupField::Year, GroupField::Country),
            );
            View::NestedCount(nested::build_nested_counts(&counts)?)
        }
        ViewKind::Scatter => View::Scatter(scatter::build_scatter(records)?),
        ViewKind::Geo => View::Geo(geo::build_geo(records)?),
        ViewKind::Summary => View::Summary(summary::build_summary(
            records,
            options.attack_type_limit,
        )?),
    })
}
