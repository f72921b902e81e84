#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Dataset definitions and loading of raw incident records.
//!
//! A [`source_def::DatasetDefinition`] says which source column feeds which
//! incident field; [`csv_load::CsvLoader`] applies it to a delimited file
//! and produces [`IncidentRecord`]s with no business logic beyond type
//! coercion.

pub mod csv_load;
pub mod parsing;
pub mod progress;
pub mod registry;
pub mod source_def;

use std::path::{Path, PathBuf};

use incident_atlas_incident_models::{IncidentField, IncidentRecord};

use crate::csv_load::CsvLoader;
use crate::source_def::DatasetDefinition;

/// Errors that can occur while reading an incident source.
///
/// All of these are fatal: a source that cannot be read completely is
/// never handed to the cleaner.
#[derive(Debug, thiserror::Error)]
pub enum SourceReadError {
    /// The source file could not be opened.
    #[error("Failed to open {}: {source}", .path.display())]
    Open {
        /// Path that was requested.
        path: PathBuf,
        /// Underlying I/O error.
        source: std::io::Error,
    },

    /// I/O error while reading.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The delimited text is malformed (e.g., a row with the wrong number
    /// of cells).
    #[error("CSV parse error: {0}")]
    Csv(#[from] csv::Error),

    /// A column required by the dataset definition is not in the header.
    #[error("Missing required column '{column}' for field {field}")]
    MissingColumn {
        /// Field the column was mapped to.
        field: IncidentField,
        /// Column name the definition expected.
        column: String,
    },

    /// A typed cell could not be parsed.
    #[error("Row {row}: invalid value '{value}' in column '{column}' ({field})")]
    InvalidValue {
        /// 1-based data row number.
        row: u64,
        /// Field being parsed.
        field: IncidentField,
        /// Source column name.
        column: String,
        /// Raw cell text.
        value: String,
    },

    /// The dataset definition itself is unusable.
    #[error("Invalid dataset definition: {message}")]
    Definition {
        /// Description of what went wrong.
        message: String,
    },
}

/// Reads a dataset definition from a TOML file on disk.
///
/// # Errors
///
/// Returns [`SourceReadError`] if the file cannot be read or parsed.
pub fn read_definition(path: &Path) -> Result<DatasetDefinition, SourceReadError> {
    let text = std::fs::read_to_string(path).map_err(|source| SourceReadError::Open {
        path: path.to_path_buf(),
        source,
    })?;
    source_def::parse_dataset_toml(&text)
}

/// Loads every record of the file at `path` using `definition`.
///
/// # Errors
///
/// Returns [`SourceReadError`] if the file cannot be read or any row fails
/// to parse.
pub fn load_incidents(
    definition: &DatasetDefinition,
    path: &Path,
    limit: Option<u64>,
) -> Result<Vec<IncidentRecord>, SourceReadError> {
    let mut loader = CsvLoader::new(definition)?;
    if let Some(limit) = limit {
        loader = loader.with_max_records(limit);
    }
    loader.load_path(path)
}
