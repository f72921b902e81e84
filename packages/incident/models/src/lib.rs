#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Incident record types shared across the incident atlas.
//!
//! [`IncidentRecord`] is a row exactly as the loader read it. The cleaner
//! turns each one into a [`CleanedRecord`], whose invariants (casualties are
//! always present and non-negative, coordinates are either both present or
//! absent, target type is never missing) every view builder relies on.

use serde::{Deserialize, Serialize};
use strum_macros::{AsRefStr, Display, EnumString};

/// Placeholder categorical value meaning "not recorded".
///
/// Distinct from a truly missing field: a record whose target type is
/// missing gets this value during cleaning, while a group name equal to it
/// is treated the same as a missing group name.
pub const UNKNOWN_SENTINEL: &str = "Unknown";

/// Most groups kept per year in the ranking view, and its default.
pub const RANKING_LIMIT: usize = 10;

/// Default number of attack types listed in the summary view.
pub const SUMMARY_ATTACK_TYPE_LIMIT: usize = 5;

/// The typed fields of an [`IncidentRecord`].
///
/// Dataset definitions map source column names onto these fields, and
/// loader/cleaner errors use them to say which field was at fault.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    AsRefStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum IncidentField {
    /// Year the incident occurred. The only required field.
    Year,
    /// Month the incident occurred.
    Month,
    /// Day of month the incident occurred.
    Day,
    /// Country name.
    Country,
    /// City name. Also the partition key for coordinate imputation.
    City,
    /// World region name.
    Region,
    /// Latitude (WGS84).
    Latitude,
    /// Longitude (WGS84).
    Longitude,
    /// Primary attack type (e.g. "Bombing/Explosion").
    AttackType,
    /// Primary target type (e.g. "Private Citizens & Property").
    TargetType,
    /// Name of the perpetrator group.
    GroupName,
    /// Number of people killed.
    Killed,
    /// Number of people wounded.
    Wounded,
}

impl IncidentField {
    /// Returns whether a source must provide this field.
    #[must_use]
    pub const fn is_required(self) -> bool {
        matches!(self, Self::Year)
    }

    /// Returns all variants of this enum.
    #[must_use]
    pub const fn all() -> &'static [Self] {
        &[
            Self::Year,
            Self::Month,
            Self::Day,
            Self::Country,
            Self::City,
            Self::Region,
            Self::Latitude,
            Self::Longitude,
            Self::AttackType,
            Self::TargetType,
            Self::GroupName,
            Self::Killed,
            Self::Wounded,
        ]
    }
}

/// One row of the raw dataset, with every column mapped to its typed field.
///
/// Apart from `year`, every field may be absent: an empty cell in the
/// source becomes `None`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IncidentRecord {
    /// 1-based data row number in the source (header excluded).
    pub row: u64,
    /// Year the incident occurred.
    pub year: i32,
    /// Month (1-12). Some sources use `0` for "unknown".
    pub month: Option<u32>,
    /// Day of month. Some sources use `0` for "unknown".
    pub day: Option<u32>,
    /// Country name.
    pub country: Option<String>,
    /// City name.
    pub city: Option<String>,
    /// World region name.
    pub region: Option<String>,
    /// Latitude (WGS84).
    pub latitude: Option<f64>,
    /// Longitude (WGS84).
    pub longitude: Option<f64>,
    /// Primary attack type.
    pub attack_type: Option<String>,
    /// Primary target type.
    pub target_type: Option<String>,
    /// Perpetrator group name.
    pub group_name: Option<String>,
    /// Number of people killed.
    pub killed: Option<f64>,
    /// Number of people wounded.
    pub wounded: Option<f64>,
}

/// A latitude/longitude pair. Only exists when both values are known.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Coordinates {
    /// Latitude (WGS84).
    pub latitude: f64,
    /// Longitude (WGS84).
    pub longitude: f64,
}

/// An [`IncidentRecord`] after imputation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CleanedRecord {
    /// 1-based data row number in the source.
    pub row: u64,
    /// Year the incident occurred.
    pub year: i32,
    /// Month (unused by aggregation).
    pub month: Option<u32>,
    /// Day of month (unused by aggregation).
    pub day: Option<u32>,
    /// Country name.
    pub country: Option<String>,
    /// City name. Used as the display label by geospatial consumers.
    pub city: Option<String>,
    /// World region name.
    pub region: Option<String>,
    /// Source or imputed coordinates. `None` excludes the record from
    /// geospatial views only.
    pub coordinates: Option<Coordinates>,
    /// Primary attack type.
    pub attack_type: Option<String>,
    /// Primary target type, [`UNKNOWN_SENTINEL`] when not recorded.
    pub target_type: String,
    /// Perpetrator group name as loaded.
    pub group_name: Option<String>,
    /// Number of people killed, `0` when not recorded.
    pub killed: f64,
    /// Number of people wounded, `0` when not recorded.
    pub wounded: f64,
}

impl CleanedRecord {
    /// Returns `killed + wounded`.
    #[must_use]
    pub fn total_casualties(&self) -> f64 {
        self.killed + self.wounded
    }

    /// Returns the group name if this record takes part in group rankings.
    ///
    /// Missing, empty and [`UNKNOWN_SENTINEL`] group names yield `None`.
    #[must_use]
    pub fn ranking_group(&self) -> Option<&str> {
        self.group_name
            .as_deref()
            .filter(|name| !name.is_empty() && *name != UNKNOWN_SENTINEL)
    }

    /// Returns whether the record can be placed on a map.
    #[must_use]
    pub const fn has_coordinates(&self) -> bool {
        self.coordinates.is_some()
    }
}
