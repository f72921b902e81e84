#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Cleaning rules that turn raw [`IncidentRecord`]s into [`CleanedRecord`]s.
//!
//! Rules, applied in order:
//!
//! 1. Missing latitude/longitude is imputed with the median of that field
//!    over the other records of the same city. A record that still lacks
//!    either value keeps no coordinates and is left out of geospatial views
//!    only.
//! 2. Missing killed/wounded counts become `0`. Negative counts are
//!    malformed input and fail the run with [`CleanError::ValueOutOfRange`].
//! 3. Missing, empty or `"Unknown"` group names are kept but excluded from
//!    group rankings (see [`CleanedRecord::ranking_group`]).
//! 4. Missing target types become [`UNKNOWN_SENTINEL`].

pub mod median;

use incident_atlas_incident_models::{
    CleanedRecord, Coordinates, IncidentField, IncidentRecord, UNKNOWN_SENTINEL,
};
use serde::Serialize;

use crate::median::city_medians;

/// Errors raised by the cleaning rules.
#[derive(Debug, thiserror::Error)]
pub enum CleanError {
    /// A casualty count is negative or not a finite number.
    #[error("Row {row}: {field} value {value} is out of range (expected a non-negative count)")]
    ValueOutOfRange {
        /// 1-based data row number.
        row: u64,
        /// Offending field.
        field: IncidentField,
        /// Offending value.
        value: f64,
    },
}

/// Counts of what each cleaning rule did.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CleaningReport {
    /// Records seen.
    pub records: u64,
    /// Records whose latitude was imputed from the city median.
    pub latitude_imputed: u64,
    /// Records whose longitude was imputed from the city median.
    pub longitude_imputed: u64,
    /// Records left without coordinates after imputation.
    pub without_coordinates: u64,
    /// Records whose killed count defaulted to `0`.
    pub killed_defaulted: u64,
    /// Records whose wounded count defaulted to `0`.
    pub wounded_defaulted: u64,
    /// Records whose target type defaulted to the sentinel.
    pub target_type_defaulted: u64,
    /// Records excluded from group rankings.
    pub excluded_from_ranking: u64,
}

/// Output of [`clean`].
#[derive(Debug, Clone)]
pub struct CleanedDataset {
    /// Cleaned records, in source order.
    pub records: Vec<CleanedRecord>,
    /// What the rules did.
    pub report: CleaningReport,
}

impl CleanedDataset {
    /// Returns how many records can be placed on a map.
    #[must_use]
    pub fn geolocated(&self) -> usize {
        self.records.iter().filter(|r| r.has_coordinates()).count()
    }
}

/// Applies every cleaning rule to `records`.
///
/// # Errors
///
/// Returns [`CleanError::ValueOutOfRange`] for the first record (in source
/// order) with a negative or non-finite casualty count. No partially
/// cleaned dataset is returned.
pub fn clean(records: Vec<IncidentRecord>) -> Result<CleanedDataset, CleanError> {
    let mut report = CleaningReport::default();

    // Rule 1 inputs must be computed over the raw set before any record is
    // consumed.
    let lat_medians = city_medians(&records, |r| r.latitude);
    let lng_medians = city_medians(&records, |r| r.longitude);

    let mut cleaned = Vec::with_capacity(records.len());

    for record in &records {
        report.records += 1;

        // ── Rule 1: coordinates ──────────────────────────────────────
        let city_median = |medians: &std::collections::BTreeMap<&str, f64>| {
            record
                .city
                .as_deref()
                .and_then(|city| medians.get(city).copied())
        };

        let latitude = record.latitude.or_else(|| {
            let imputed = city_median(&lat_medians);
            if imputed.is_some() {
                report.latitude_imputed += 1;
            }
            imputed
        });
        let longitude = record.longitude.or_else(|| {
            let imputed = city_median(&lng_medians);
            if imputed.is_some() {
                report.longitude_imputed += 1;
            }
            imputed
        });

        let coordinates = match (latitude, longitude) {
            (Some(latitude), Some(longitude)) => Some(Coordinates {
                latitude,
                longitude,
            }),
            _ => {
                report.without_coordinates += 1;
                None
            }
        };

        // ── Rule 2: casualties ───────────────────────────────────────
        let killed = casualty(record, IncidentField::Killed, record.killed)?;
        let wounded = casualty(record, IncidentField::Wounded, record.wounded)?;
        if record.killed.is_none() {
            report.killed_defaulted += 1;
        }
        if record.wounded.is_none() {
            report.wounded_defaulted += 1;
        }

        // ── Rule 4: target type ──────────────────────────────────────
        let target_type = record.target_type.clone().unwrap_or_else(|| {
            report.target_type_defaulted += 1;
            UNKNOWN_SENTINEL.to_string()
        });

        let cleaned_record = CleanedRecord {
            row: record.row,
            year: record.year,
            month: record.month,
            day: record.day,
            country: record.country.clone(),
            city: record.city.clone(),
            region: record.region.clone(),
            coordinates,
            attack_type: record.attack_type.clone(),
            target_type,
            group_name: record.group_name.clone(),
            killed,
            wounded,
        };

        // ── Rule 3: group name ───────────────────────────────────────
        if cleaned_record.ranking_group().is_none() {
            report.excluded_from_ranking += 1;
        }

        cleaned.push(cleaned_record);
    }

    log::info!(
        "Cleaned {} records: {} lat / {} lng imputed, {} without coordinates, \
         {} target types defaulted, {} excluded from rankings",
        report.records,
        report.latitude_imputed,
        report.longitude_imputed,
        report.without_coordinates,
        report.target_type_defaulted,
        report.excluded_from_ranking,
    );

    Ok(CleanedDataset {
        records: cleaned,
        report,
    })
}

/// Validates one casualty count, defaulting a missing value to `0`.
fn casualty(
    record: &IncidentRecord,
    field: IncidentField,
    value: Option<f64>,
) -> Result<f64, CleanError> {
    match value {
        None => Ok(0.0),
        Some(v) if v.is_finite() && v >= 0.0 => Ok(v),
        Some(v) => Err(CleanError::ValueOutOfRange {
            row: record.row,
            field,
            value: v,
        }),
    }
}
