//! Renders views to their file formats and publishes them atomically.
//!
//! Every output is first rendered in memory, then written to
//! `<name>.tmp`, and only renamed into place once every temp file of the
//! batch has been written. A failed run therefore never leaves a partial
//! file behind.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use incident_atlas_analytics::time_series::attack_types_by_year;
use incident_atlas_analytics_models::{GeoView, View, ViewKind};
use incident_atlas_clean::CleaningReport;
use incident_atlas_incident_models::Coordinates;
use serde::Serialize;

/// Year -> country -> count (nested-count view).
pub const HEATMAP_FILE: &str = "heatmap_data.json";

/// Year -> top groups (ranking view).
pub const TOP_GROUPS_FILE: &str = "top_groups_by_year.json";

/// Year axis plus stacked/normalized/grouped series (time-series view).
pub const TIMESERIES_FILE: &str = "attack_types_timeseries.json";

/// Year -> attack types with counts (time-series view).
pub const ATTACK_TYPES_BY_YEAR_FILE: &str = "attack_types_by_year.json";

/// Color map plus casualty points (scatter view).
pub const TARGET_CASUALTIES_FILE: &str = "target_casualties.json";

/// One `GeoJSON` feature per line (geo view).
pub const INCIDENTS_GEOJSONSEQ_FILE: &str = "incidents.geojsonseq";

/// Headline figures (summary view).
pub const SUMMARY_FILE: &str = "summary.json";

/// Incidents per country (summary view).
pub const COUNTRY_TOTALS_FILE: &str = "country_totals.json";

/// Run description, written last.
pub const METADATA_FILE: &str = "metadata.json";

/// Errors that can occur while rendering or writing outputs.
#[derive(Debug, thiserror::Error)]
pub enum ExportError {
    /// A file could not be written, renamed or removed.
    #[error("Failed to write {}: {source}", .path.display())]
    Io {
        /// File being written.
        path: PathBuf,
        /// Underlying I/O error.
        source: std::io::Error,
    },

    /// A view could not be serialized.
    #[error("Failed to serialize {name}: {source}")]
    Json {
        /// Output being rendered.
        name: &'static str,
        /// Underlying serialization error.
        source: serde_json::Error,
    },
}

/// A rendered output file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Output {
    /// File name within the output directory.
    pub name: &'static str,
    /// File contents.
    pub contents: Vec<u8>,
}

/// Returns the files a view of `kind` is exported to, primary file first.
#[must_use]
pub const fn file_names(kind: ViewKind) -> &'static [&'static str] {
    match kind {
        ViewKind::TimeSeries => &[TIMESERIES_FILE, ATTACK_TYPES_BY_YEAR_FILE],
        ViewKind::Ranking => &[TOP_GROUPS_FILE],
        ViewKind::NestedCount => &[HEATMAP_FILE],
        ViewKind::Scatter => &[TARGET_CASUALTIES_FILE],
        ViewKind::Geo => &[INCIDENTS_GEOJSONSEQ_FILE],
        ViewKind::Summary => &[SUMMARY_FILE, COUNTRY_TOTALS_FILE],
    }
}

fn json<T: Serialize + ?Sized>(name: &'static str, value: &T) -> Result<Output, ExportError> {
    let mut contents =
        serde_json::to_vec_pretty(value).map_err(|source| ExportError::Json { name, source })?;
    contents.push(b'\n');
    Ok(Output { name, contents })
}

/// Renders `view` to every file it is exported to, primary file first.
///
/// # Errors
///
/// Returns [`ExportError::Json`] if serialization fails.
pub fn render_view(view: &View) -> Result<Vec<Output>, ExportError> {
    Ok(match view {
        View::TimeSeries(series) => vec![
            json(TIMESERIES_FILE, series)?,
            json(ATTACK_TYPES_BY_YEAR_FILE, &attack_types_by_year(series))?,
        ],
        View::Ranking(ranking) => vec![json(TOP_GROUPS_FILE, ranking)?],
        View::NestedCount(nested) => vec![json(HEATMAP_FILE, nested)?],
        View::Scatter(scatter) => vec![json(TARGET_CASUALTIES_FILE, scatter)?],
        View::Geo(geo) => vec![render_geojsonseq(geo)?],
        View::Summary(summary) => vec![
            json(SUMMARY_FILE, summary)?,
            json(COUNTRY_TOTALS_FILE, &summary.country_totals)?,
        ],
    })
}

/// Renders the geo view as newline-delimited `GeoJSON` point features.
///
/// # Errors
///
/// Returns [`ExportError::Json`] if serialization fails.
pub fn render_geojsonseq(view: &GeoView) -> Result<Output, ExportError> {
    let name = INCIDENTS_GEOJSONSEQ_FILE;
    let mut contents = Vec::new();

    for point in &view.points {
        let feature = serde_json::json!({
            "type": "Feature",
            "geometry": {
                "type": "Point",
                "coordinates": [point.coordinates.longitude, point.coordinates.latitude]
            },
            "properties": {
                "row": point.row,
                "year": point.year,
                "city": point.label,
            }
        });

        serde_json::to_writer(&mut contents, &feature)
            .map_err(|source| ExportError::Json { name, source })?;
        contents.push(b'\n');
    }

    Ok(Output { name, contents })
}

/// First and last year of the cleaned dataset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct YearRange {
    /// Earliest year.
    pub first: i32,
    /// Latest year.
    pub last: i32,
}

/// Contents of `metadata.json`.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Metadata {
    /// Id of the dataset definition used.
    pub dataset_id: String,
    /// Human-readable dataset name.
    pub dataset_name: String,
    /// RFC 3339 timestamp of the run.
    pub generated_at: String,
    /// Input file as given on the command line.
    pub input: String,
    /// Cleaned records.
    pub records: u64,
    /// Records that can be placed on a map.
    pub geolocated: u64,
    /// `None` when there are no records.
    pub year_range: Option<YearRange>,
    /// Geo view center, `None` when that view was skipped.
    pub map_center: Option<Coordinates>,
    /// What the cleaning rules did.
    pub cleaning: CleaningReport,
    /// Files written by this run, in write order.
    pub outputs: Vec<String>,
    /// Views that were not built, with the reason.
    pub skipped: BTreeMap<ViewKind, String>,
}

/// Renders `metadata.json`.
///
/// # Errors
///
/// Returns [`ExportError::Json`] if serialization fails.
pub fn render_metadata(metadata: &Metadata) -> Result<Output, ExportError> {
    json(METADATA_FILE, metadata)
}

/// Writes `outputs` into `dir`, each through a `.tmp` sibling, and returns
/// the final paths.
///
/// All temp files are written before any of them is renamed.
///
/// # Errors
///
/// Returns [`ExportError::Io`] if the directory cannot be created or any
/// file cannot be written or renamed.
pub fn publish(dir: &Path, outputs: &[Output]) -> Result<Vec<PathBuf>, ExportError> {
    std::fs::create_dir_all(dir).map_err(|source| ExportError::Io {
        path: dir.to_path_buf(),
        source,
    })?;

    let mut staged = Vec::with_capacity(outputs.len());
    for output in outputs {
        let tmp_path = dir.join(format!("{}.tmp", output.name));
        if let Err(source) = std::fs::write(&tmp_path, &output.contents) {
            discard(&staged);
            std::fs::remove_file(&tmp_path).ok();
            return Err(ExportError::Io {
                path: tmp_path,
                source,
            });
        }
        staged.push((tmp_path, dir.join(output.name)));
    }

    let mut written = Vec::with_capacity(staged.len());
    for (i, (tmp_path, path)) in staged.iter().enumerate() {
        if let Err(source) = std::fs::rename(tmp_path, path) {
            discard(&staged[i..]);
            return Err(ExportError::Io {
                path: path.clone(),
                source,
            });
        }
        log::info!("Wrote {}", path.display());
        written.push(path.clone());
    }

    Ok(written)
}

fn discard(staged: &[(PathBuf, PathBuf)]) {
    for (tmp_path, _) in staged {
        if let Err(e) = std::fs::remove_file(tmp_path) {
            log::warn!("Could not remove {}: {e}", tmp_path.display());
        }
    }
}

/// Removes the files of a view that was skipped this run, so outputs from
/// an earlier run are not mistaken for current ones.
///
/// # Errors
///
/// Returns [`ExportError::Io`] if an existing file cannot be removed.
pub fn remove_stale(dir: &Path, kind: ViewKind) -> Result<(), ExportError> {
    for name in file_names(kind) {
        let path = dir.join(name);
        match std::fs::remove_file(&path) {
            Ok(()) => log::info!("Removed stale {}", path.display()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(source) => return Err(ExportError::Io { path, source }),
        }
    }
    Ok(())
}
