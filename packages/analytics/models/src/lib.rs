#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Aggregation keys, aggregate triples and view types.
//!
//! Every view is an immutable value built in full from the cleaned record
//! set on each run. Keyed views use [`BTreeMap`] so that iteration, and
//! therefore serialized output, is deterministic.

use std::collections::BTreeMap;

use incident_atlas_incident_models::{Coordinates, IncidentField};
use serde::{Deserialize, Serialize};
use strum_macros::{AsRefStr, Display, EnumString};

// ── Grouping ─────────────────────────────────────────────────────────────

/// A field that cleaned records can be grouped by.
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
pub enum GroupField {
    /// Incident year.
    Year,
    /// Incident month.
    Month,
    /// Country name.
    Country,
    /// City name.
    City,
    /// Region name.
    Region,
    /// Primary attack type.
    AttackType,
    /// Primary target type (never missing after cleaning).
    TargetType,
    /// Group name as loaded.
    GroupName,
    /// Group name, with missing/empty/"Unknown" groups left out.
    RankingGroup,
}

/// One or two fields to group by.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GroupSpec {
    /// First grouping field.
    pub primary: GroupField,
    /// Optional second grouping field.
    pub secondary: Option<GroupField>,
}

impl GroupSpec {
    /// Groups by a single field.
    #[must_use]
    pub const fn single(field: GroupField) -> Self {
        Self {
            primary: field,
            secondary: None,
        }
    }

    /// Groups by two fields.
    #[must_use]
    pub const fn pair(primary: GroupField, secondary: GroupField) -> Self {
        Self {
            primary,
            secondary: Some(secondary),
        }
    }
}

impl std::fmt::Display for GroupSpec {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.secondary {
            Some(secondary) => write!(f, "({}, {secondary})", self.primary),
            None => write!(f, "({})", self.primary),
        }
    }
}

/// An opaque group key value.
///
/// Compared exactly: text is case-sensitive and never normalized.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum GroupValue {
    /// Integer-valued fields (year, month).
    Int(i64),
    /// Categorical fields.
    Text(String),
}

impl GroupValue {
    /// Returns the integer value, if this is an integer key.
    #[must_use]
    pub const fn as_int(&self) -> Option<i64> {
        match self {
            Self::Int(v) => Some(*v),
            Self::Text(_) => None,
        }
    }

    /// Returns the text value, if this is a categorical key.
    #[must_use]
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Int(_) => None,
            Self::Text(s) => Some(s),
        }
    }
}

impl std::fmt::Display for GroupValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Int(v) => write!(f, "{v}"),
            Self::Text(s) => f.write_str(s),
        }
    }
}

/// One aggregate: a key combination and the measure over its records.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Aggregated<T> {
    /// Value of the primary grouping field.
    pub primary: GroupValue,
    /// Value of the secondary grouping field, if grouping by two fields.
    pub secondary: Option<GroupValue>,
    /// Count or sum over the matching records.
    pub value: T,
}

/// Number of records per key combination.
pub type AggregatedCount = Aggregated<u64>;

/// Sum of `killed + wounded` per key combination.
pub type AggregatedCasualties = Aggregated<f64>;

// ── Time series ──────────────────────────────────────────────────────────

/// How a series set is meant to be drawn.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    AsRefStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum StackMode {
    /// Raw counts stacked on top of each other.
    Stacked,
    /// Fractions of each year's total, stacked to 1.0.
    Normalized,
    /// Raw counts drawn side by side, not stacked.
    Grouped,
}

impl StackMode {
    /// Returns whether the renderer should stack the series.
    #[must_use]
    pub const fn is_cumulative(self) -> bool {
        !matches!(self, Self::Grouped)
    }
}

/// Per-category series aligned on a shared year axis.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SeriesSet<T> {
    /// Presentation mode.
    pub mode: StackMode,
    /// Category -> one value per year of the axis.
    pub series: BTreeMap<String, Vec<T>>,
}

/// Attack-type counts over a dense year axis, in three presentations.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TimeSeriesView {
    /// Year axis, ascending. Every series has one entry per year.
    pub years: Vec<i32>,
    /// Raw counts.
    pub stacked: SeriesSet<u64>,
    /// Fractions of each year's total (all `0` for an empty year).
    pub normalized: SeriesSet<f64>,
    /// Raw counts flagged for non-cumulative rendering.
    pub grouped: SeriesSet<u64>,
}

impl TimeSeriesView {
    /// Returns the per-year totals across all categories.
    #[must_use]
    pub fn year_totals(&self) -> Vec<u64> {
        (0..self.years.len())
            .map(|i| self.stacked.series.values().map(|s| s[i]).sum())
            .collect()
    }

    /// Returns the categories, in series order.
    #[must_use]
    pub fn categories(&self) -> Vec<&str> {
        self.stacked.series.keys().map(String::as_str).collect()
    }
}

// ── Ranking ──────────────────────────────────────────────────────────────

/// A group and its incident count within one year.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RankedGroup {
    /// Group name.
    pub group: String,
    /// Incidents attributed to the group that year.
    pub count: u64,
}

/// Per-year top groups, highest count first.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RankingView {
    /// Year -> ranked groups.
    pub by_year: BTreeMap<i32, Vec<RankedGroup>>,
}

// ── Nested counts ────────────────────────────────────────────────────────

/// Sparse year -> country -> count lookup table.
///
/// Only observed combinations are present; there is no zero-filling.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NestedCountView {
    /// Year -> (country -> count).
    pub by_year: BTreeMap<i32, BTreeMap<String, u64>>,
}

impl NestedCountView {
    /// Looks up the count for one `(year, country)` combination.
    #[must_use]
    pub fn get(&self, year: i32, country: &str) -> Option<u64> {
        self.by_year.get(&year)?.get(country).copied()
    }
}

// ── Scatter ──────────────────────────────────────────────────────────────

/// One record's casualties, for the killed-vs-wounded scatter plot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScatterPoint {
    /// Incident year (the filter key).
    pub year: i32,
    /// Number killed.
    pub killed: f64,
    /// Number wounded.
    pub wounded: f64,
    /// Target type.
    pub target_type: String,
    /// `killed + wounded` (marker size).
    pub total: f64,
    /// Color token assigned to the target type.
    pub color: String,
}

/// A target type and its assigned color.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TargetColor {
    /// Target type.
    pub target_type: String,
    /// Color token.
    pub color: String,
}

/// Per-record casualty points with a stable target-type color map.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScatterView {
    /// Name of the palette colors were drawn from.
    pub palette: String,
    /// Color per target type, in first-appearance order.
    pub colors: Vec<TargetColor>,
    /// Every point, in source order.
    pub points: Vec<ScatterPoint>,
}

impl ScatterView {
    /// Returns the points of a single year.
    ///
    /// A pure re-filter: colors come from the full-dataset assignment, so
    /// they stay the same whichever year is selected.
    #[must_use]
    pub fn filter_year(&self, year: i32) -> Vec<&ScatterPoint> {
        self.points.iter().filter(|p| p.year == year).collect()
    }

    /// Returns the earliest and latest year with points (slider range).
    #[must_use]
    pub fn year_range(&self) -> Option<(i32, i32)> {
        let min = self.points.iter().map(|p| p.year).min()?;
        let max = self.points.iter().map(|p| p.year).max()?;
        Some((min, max))
    }

    /// Returns the color assigned to `target_type`.
    #[must_use]
    pub fn color_for(&self, target_type: &str) -> Option<&str> {
        self.colors
            .iter()
            .find(|c| c.target_type == target_type)
            .map(|c| c.color.as_str())
    }
}

// ── Supplementary views ──────────────────────────────────────────────────

/// A coordinate-valid record for the map collaborator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GeoPoint {
    /// Source row, for cross-referencing.
    pub row: u64,
    /// Incident year.
    pub year: i32,
    /// Source or imputed coordinates.
    pub coordinates: Coordinates,
    /// Display label (the city name).
    pub label: Option<String>,
}

/// The coordinate-valid subset plus the point to center the map on.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GeoView {
    /// Mean latitude/longitude of all points.
    pub center: Coordinates,
    /// Every geolocated record.
    pub points: Vec<GeoPoint>,
}

/// Incident count for one country.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CountryTotal {
    /// Country name.
    pub country: String,
    /// Incident count.
    pub count: u64,
}

/// Incident count for one attack type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttackTypeCount {
    /// Attack type.
    pub attack_type: String,
    /// Incident count.
    pub count: u64,
}

/// Distribution of one numeric column, as a dataframe `describe()` row.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ColumnStats {
    /// Records with a value in this column.
    pub count: u64,
    /// Arithmetic mean.
    pub mean: f64,
    /// Sample standard deviation, `None` for a single value.
    pub std_dev: Option<f64>,
    /// Smallest value.
    pub min: f64,
    /// 25th percentile.
    pub q25: f64,
    /// 50th percentile.
    pub median: f64,
    /// 75th percentile.
    pub q75: f64,
    /// Largest value.
    pub max: f64,
}

/// Additive decomposition of the yearly incident counts into trend,
/// seasonal and residual components.
///
/// Every series is aligned with `years`. `trend` and `residual` are `None`
/// for the years at either edge that the centered moving average does not
/// reach.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SeasonalDecomposition {
    /// Length of one seasonal cycle, in years.
    pub period: usize,
    /// Years that have at least one incident, ascending.
    pub years: Vec<i32>,
    /// Incident count per year.
    pub observed: Vec<f64>,
    /// Centered moving average over one period.
    pub trend: Vec<Option<f64>>,
    /// Repeating component, zero-mean over one period.
    pub seasonal: Vec<f64>,
    /// `observed - trend - seasonal`.
    pub residual: Vec<Option<f64>>,
}

/// Dataset-wide headline figures.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SummaryView {
    /// Incidents per year.
    pub incidents_by_year: BTreeMap<i32, u64>,
    /// `killed + wounded` per year.
    pub casualties_by_year: BTreeMap<i32, f64>,
    /// Most frequent attack types overall, highest first.
    pub top_attack_types: Vec<AttackTypeCount>,
    /// Incidents per country, highest first (choropleth input).
    pub country_totals: Vec<CountryTotal>,
    /// Distribution of each numeric field that has any value.
    pub numeric_columns: BTreeMap<IncidentField, ColumnStats>,
    /// `None` when there are too few years to decompose.
    pub decomposition: Option<SeasonalDecomposition>,
}

// ── Tagged view ──────────────────────────────────────────────────────────

/// Identifies a view, e.g. on the command line.
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
#[serde(rename_all = "kebab-case")]
#[strum(serialize_all = "kebab-case")]
pub enum ViewKind {
    /// [`TimeSeriesView`].
    TimeSeries,
    /// [`RankingView`].
    Ranking,
    /// [`NestedCountView`].
    NestedCount,
    /// [`ScatterView`].
    Scatter,
    /// [`GeoView`].
    Geo,
    /// [`SummaryView`].
    Summary,
}

impl ViewKind {
    /// Returns all variants of this enum.
    #[must_use]
    pub const fn all() -> &'static [Self] {
        &[
            Self::TimeSeries,
            Self::Ranking,
            Self::NestedCount,
            Self::Scatter,
            Self::Geo,
            Self::Summary,
        ]
    }
}

/// Any built view.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "view", rename_all = "kebab-case")]
pub enum View {
    /// Attack types over time.
    TimeSeries(TimeSeriesView),
    /// Top groups per year.
    Ranking(RankingView),
    /// Year -> country -> count.
    NestedCount(NestedCountView),
    /// Casualties by target type.
    Scatter(ScatterView),
    /// Geolocated records.
    Geo(GeoView),
    /// Headline figures.
    Summary(SummaryView),
}

impl View {
    /// Returns which kind of view this is.
    #[must_use]
    pub const fn kind(&self) -> ViewKind {
        match self {
            Self::TimeSeries(_) => ViewKind::TimeSeries,
            Self::Ranking(_) => ViewKind::Ranking,
            Self::NestedCount(_) => ViewKind::NestedCount,
            Self::Scatter(_) => ViewKind::Scatter,
            Self::Geo(_) => ViewKind::Geo,
            Self::Summary(_) => ViewKind::Summary,
        }
    }
}
