//! Config-driven dataset definition.
//!
//! [`DatasetDefinition`] captures everything that differs between incident
//! exports: which source column feeds which [`IncidentField`], the field
//! delimiter, and the tunables of the derived views. One generic loader
//! handles every dataset.

use incident_atlas_incident_models::{IncidentField, RANKING_LIMIT, SUMMARY_ATTACK_TYPE_LIMIT};
use serde::Deserialize;

use crate::SourceReadError;

// ── Top-level dataset definition ─────────────────────────────────────────

/// A complete, config-driven dataset definition.
///
/// Loaded from TOML, either embedded at compile time (see
/// [`crate::registry`]) or supplied by the user.
#[derive(Debug, Clone, Deserialize)]
pub struct DatasetDefinition {
    /// Unique identifier (e.g., `"gtd"`).
    pub id: String,
    /// Human-readable name.
    pub name: String,
    /// Single-character field delimiter. Defaults to `","`.
    #[serde(default = "default_delimiter")]
    pub delimiter: String,
    /// Source column names for each incident field.
    pub columns: ColumnMapping,
    /// Tunables for the derived views.
    #[serde(default)]
    pub views: ViewSettings,
}

fn default_delimiter() -> String {
    ",".to_string()
}

impl DatasetDefinition {
    /// Returns the delimiter as the single byte the CSV reader expects.
    ///
    /// # Errors
    ///
    /// Returns [`SourceReadError::Definition`] if the delimiter is not a
    /// single ASCII character.
    pub fn delimiter_byte(&self) -> Result<u8, SourceReadError> {
        match self.delimiter.as_bytes() {
            [byte] if byte.is_ascii() => Ok(*byte),
            _ => Err(SourceReadError::Definition {
                message: format!(
                    "{}: delimiter must be a single ASCII character, got '{}'",
                    self.id, self.delimiter
                ),
            }),
        }
    }
}

// ── Column mapping ───────────────────────────────────────────────────────

/// Source column names for each [`IncidentField`].
///
/// Only `year` is mandatory; any other field left out of the mapping is
/// always absent on loaded records.
#[derive(Debug, Clone, Deserialize)]
pub struct ColumnMapping {
    /// Column holding the incident year.
    pub year: String,
    /// Column holding the month.
    pub month: Option<String>,
    /// Column holding the day of month.
    pub day: Option<String>,
    /// Column holding the country name.
    pub country: Option<String>,
    /// Column holding the city name.
    pub city: Option<String>,
    /// Column holding the region name.
    pub region: Option<String>,
    /// Column holding the latitude.
    pub latitude: Option<String>,
    /// Column holding the longitude.
    pub longitude: Option<String>,
    /// Column holding the primary attack type.
    pub attack_type: Option<String>,
    /// Column holding the primary target type.
    pub target_type: Option<String>,
    /// Column holding the perpetrator group name.
    pub group_name: Option<String>,
    /// Column holding the number killed.
    pub killed: Option<String>,
    /// Column holding the number wounded.
    pub wounded: Option<String>,
}

impl ColumnMapping {
    /// Returns the source column mapped to `field`, if any.
    #[must_use]
    pub fn column_for(&self, field: IncidentField) -> Option<&str> {
        match field {
            IncidentField::Year => Some(self.year.as_str()),
            IncidentField::Month => self.month.as_deref(),
            IncidentField::Day => self.day.as_deref(),
            IncidentField::Country => self.country.as_deref(),
            IncidentField::City => self.city.as_deref(),
            IncidentField::Region => self.region.as_deref(),
            IncidentField::Latitude => self.latitude.as_deref(),
            IncidentField::Longitude => self.longitude.as_deref(),
            IncidentField::AttackType => self.attack_type.as_deref(),
            IncidentField::TargetType => self.target_type.as_deref(),
            IncidentField::GroupName => self.group_name.as_deref(),
            IncidentField::Killed => self.killed.as_deref(),
            IncidentField::Wounded => self.wounded.as_deref(),
        }
    }
}

// ── View settings ────────────────────────────────────────────────────────

/// Tunables for the derived views.
#[derive(Debug, Clone, Copy, Deserialize)]
pub struct ViewSettings {
    /// Maximum number of groups per year in the ranking view, at most
    /// [`RANKING_LIMIT`].
    #[serde(default = "default_ranking_limit")]
    pub ranking_limit: usize,
    /// Number of attack types listed in the summary view.
    #[serde(default = "default_summary_attack_type_limit")]
    pub summary_attack_type_limit: usize,
}

const fn default_ranking_limit() -> usize {
    RANKING_LIMIT
}

const fn default_summary_attack_type_limit() -> usize {
    SUMMARY_ATTACK_TYPE_LIMIT
}

impl Default for ViewSettings {
    fn default() -> Self {
        Self {
            ranking_limit: RANKING_LIMIT,
            summary_attack_type_limit: SUMMARY_ATTACK_TYPE_LIMIT,
        }
    }
}

/// Parses a [`DatasetDefinition`] from a TOML string.
///
/// # Errors
///
/// Returns [`SourceReadError::Definition`] if the TOML is malformed, is
/// missing required keys, names an unusable delimiter, or asks for a
/// ranking longer than [`RANKING_LIMIT`].
pub fn parse_dataset_toml(toml_str: &str) -> Result<DatasetDefinition, SourceReadError> {
    let definition: DatasetDefinition =
        toml::de::from_str(toml_str).map_err(|e| SourceReadError::Definition {
            message: e.to_string(),
        })?;
    definition.delimiter_byte()?;
    if definition.views.ranking_limit > RANKING_LIMIT {
        return Err(SourceReadError::Definition {
            message: format!(
                "{}: ranking_limit must be at most {RANKING_LIMIT}, got {}",
                definition.id, definition.views.ranking_limit
            ),
        });
    }
    Ok(definition)
}
