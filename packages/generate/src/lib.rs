#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Runs the incident pipeline end to end: load, clean, build views, export.
//!
//! Loading and cleaning errors abort the run before any file is written.
//! View builders run in parallel on blocking worker threads over a shared
//! `Arc<[CleanedRecord]>`; a view that lacks data is skipped and reported
//! in `metadata.json` without affecting its siblings.

pub mod export;

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use incident_atlas_analytics::{ViewError, ViewOptions, build_view};
use incident_atlas_analytics_models::{View, ViewKind};
use incident_atlas_clean::{CleanError, CleanedDataset};
use incident_atlas_incident_models::CleanedRecord;
use incident_atlas_source::SourceReadError;
use incident_atlas_source::csv_load::CsvLoader;
use incident_atlas_source::progress::{ProgressCallback, null_progress};
use incident_atlas_source::source_def::DatasetDefinition;

use crate::export::{ExportError, Metadata, YearRange};

/// Errors that abort a pipeline run, tagged with the failing stage.
#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    /// The input could not be read.
    #[error("load stage failed: {0}")]
    Load(#[from] SourceReadError),

    /// A cleaning rule rejected the data.
    #[error("clean stage failed: {0}")]
    Clean(#[from] CleanError),

    /// Outputs could not be rendered or written.
    #[error("export stage failed: {0}")]
    Export(#[from] ExportError),

    /// A worker task panicked or was cancelled.
    #[error("{stage} stage worker failed: {source}")]
    Worker {
        /// Stage the worker belonged to.
        stage: &'static str,
        /// Join failure.
        source: tokio::task::JoinError,
    },
}

impl PipelineError {
    /// Name of the stage that failed.
    #[must_use]
    pub const fn stage(&self) -> &'static str {
        match self {
            Self::Load(_) => "load",
            Self::Clean(_) => "clean",
            Self::Export(_) => "export",
            Self::Worker { stage, .. } => *stage,
        }
    }
}

fn worker(stage: &'static str) -> impl Fn(tokio::task::JoinError) -> PipelineError {
    move |source| PipelineError::Worker { stage, source }
}

/// Arguments for a full pipeline run.
pub struct GenerateArgs {
    /// Delimited input file.
    pub input: PathBuf,

    /// Directory the outputs are written to.
    pub output_dir: PathBuf,

    /// Maximum number of data rows to load (useful for testing).
    pub limit: Option<u64>,
}

/// Progress reporters for a run.
#[derive(Clone)]
pub struct PipelineProgress {
    /// Advanced once per stage (load, clean, views, export).
    pub stages: Arc<dyn ProgressCallback>,
    /// Advanced per loaded row.
    pub rows: Arc<dyn ProgressCallback>,
}

/// Number of stages [`PipelineProgress::stages`] is advanced through.
pub const STAGE_COUNT: u64 = 4;

impl Default for PipelineProgress {
    fn default() -> Self {
        Self {
            stages: null_progress(),
            rows: null_progress(),
        }
    }
}

/// Views built by one run, plus the ones that could not be built.
#[derive(Debug, Default)]
pub struct BuiltViews {
    /// Successfully built views.
    pub views: BTreeMap<ViewKind, View>,
    /// Skipped views and why.
    pub skipped: BTreeMap<ViewKind, String>,
}

/// What a finished run produced.
#[derive(Debug)]
pub struct RunSummary {
    /// Files written, `metadata.json` last.
    pub written: Vec<PathBuf>,
    /// Skipped views and why.
    pub skipped: BTreeMap<ViewKind, String>,
}

/// Converts the dataset definition's view settings to builder options.
#[must_use]
pub const fn view_options(definition: &DatasetDefinition) -> ViewOptions {
    ViewOptions {
        ranking_limit: definition.views.ranking_limit,
        attack_type_limit: definition.views.summary_attack_type_limit,
    }
}

/// Loads and cleans `input` on a blocking worker.
///
/// `progress.rows` is finished once loading is done.
///
/// # Errors
///
/// Returns [`PipelineError::Load`] or [`PipelineError::Clean`] if either
/// stage fails.
pub async fn load_and_clean(
    definition: &DatasetDefinition,
    input: &Path,
    limit: Option<u64>,
    progress: &PipelineProgress,
) -> Result<CleanedDataset, PipelineError> {
    let mut loader = CsvLoader::new(definition)?.with_progress(Arc::clone(&progress.rows));
    if let Some(limit) = limit {
        loader = loader.with_max_records(limit);
    }

    progress.stages.set_message("Loading incidents...".to_string());
    let input = input.to_path_buf();
    let raw = tokio::task::spawn_blocking(move || loader.load_path(&input))
        .await
        .map_err(worker("load"))??;
    log::info!("Loaded {} raw records", raw.len());
    progress.rows.finish(format!("Loaded {} rows", raw.len()));
    progress.stages.inc(1);

    progress.stages.set_message("Cleaning records...".to_string());
    let cleaned = tokio::task::spawn_blocking(move || incident_atlas_clean::clean(raw))
        .await
        .map_err(worker("clean"))??;
    progress.stages.inc(1);

    Ok(cleaned)
}

/// Builds every view in parallel over the shared record set.
///
/// # Errors
///
/// Returns [`PipelineError::Worker`] if a builder task panics. Insufficient
/// data is not an error here; it lands in [`BuiltViews::skipped`].
pub async fn build_views(
    records: Arc<[CleanedRecord]>,
    options: ViewOptions,
) -> Result<BuiltViews, PipelineError> {
    let spawn = |kind: ViewKind| {
        let records = Arc::clone(&records);
        tokio::task::spawn_blocking(move || (kind, build_view(kind, &records, options)))
    };

    let (time_series, ranking, nested, scatter, geo, summary) = tokio::try_join!(
        spawn(ViewKind::TimeSeries),
        spawn(ViewKind::Ranking),
        spawn(ViewKind::NestedCount),
        spawn(ViewKind::Scatter),
        spawn(ViewKind::Geo),
        spawn(ViewKind::Summary),
    )
    .map_err(worker("views"))?;

    let mut built = BuiltViews::default();
    for (kind, result) in [time_series, ranking, nested, scatter, geo, summary] {
        match result {
            Ok(view) => {
                built.views.insert(kind, view);
            }
            Err(ViewError::InsufficientData { reason, .. }) => {
                log::warn!("Skipping {kind} view: {reason}");
                built.skipped.insert(kind, reason);
            }
        }
    }

    Ok(built)
}

fn year_range(records: &[CleanedRecord]) -> Option<YearRange> {
    let first = records.iter().map(|r| r.year).min()?;
    let last = records.iter().map(|r| r.year).max()?;
    Some(YearRange { first, last })
}

/// Runs the full pipeline and writes every output to `args.output_dir`.
///
/// Outputs of skipped views that remain from an earlier run are removed.
/// `metadata.json` is written last.
///
/// # Errors
///
/// Returns [`PipelineError`] naming the stage that failed. Nothing is
/// written if loading or cleaning fails.
pub async fn run(
    definition: &DatasetDefinition,
    args: &GenerateArgs,
    progress: &PipelineProgress,
) -> Result<RunSummary, PipelineError> {
    let cleaned = load_and_clean(definition, &args.input, args.limit, progress).await?;
    let geolocated = cleaned.geolocated() as u64;
    let year_range = year_range(&cleaned.records);

    let CleanedDataset { records, report } = cleaned;
    let records: Arc<[CleanedRecord]> = records.into();

    progress.stages.set_message("Building views...".to_string());
    let built = build_views(Arc::clone(&records), view_options(definition)).await?;
    progress.stages.inc(1);

    progress.stages.set_message("Writing outputs...".to_string());
    let mut outputs = Vec::new();
    for view in built.views.values() {
        outputs.extend(export::render_view(view)?);
    }

    let map_center = match built.views.get(&ViewKind::Geo) {
        Some(View::Geo(geo)) => Some(geo.center),
        _ => None,
    };

    for &kind in built.skipped.keys() {
        export::remove_stale(&args.output_dir, kind)?;
    }
    let mut written = export::publish(&args.output_dir, &outputs)?;

    let metadata = Metadata {
        dataset_id: definition.id.clone(),
        dataset_name: definition.name.clone(),
        generated_at: chrono::Utc::now().to_rfc3339(),
        input: args.input.display().to_string(),
        records: report.records,
        geolocated,
        year_range,
        map_center,
        cleaning: report,
        outputs: outputs.iter().map(|o| o.name.to_string()).collect(),
        skipped: built.skipped.clone(),
    };
    written.extend(export::publish(
        &args.output_dir,
        &[export::render_metadata(&metadata)?],
    )?);
    progress.stages.inc(1);

    log::info!(
        "Wrote {} files to {} ({} views skipped)",
        written.len(),
        args.output_dir.display(),
        built.skipped.len()
    );

    Ok(RunSummary {
        written,
        skipped: built.skipped,
    })
}

#[cfg(test)]
mod tests {
    use incident_atlas_source::registry::find_dataset;

    use super::*;
    use crate::export::{
        ATTACK_TYPES_BY_YEAR_FILE, HEATMAP_FILE, INCIDENTS_GEOJSONSEQ_FILE, METADATA_FILE,
        SUMMARY_FILE, TARGET_CASUALTIES_FILE, TIMESERIES_FILE, TOP_GROUPS_FILE,
    };

    const HEADER: &str = "iyear,imonth,iday,country_txt,city,region_txt,latitude,longitude,\
                          attacktype1_txt,targtype1_txt,gname,nkill,nwound\n";

    struct Scratch(PathBuf);

    impl Scratch {
        fn new() -> Self {
            let dir =
                std::env::temp_dir().join(format!("incident_atlas_run_{}", uuid::Uuid::new_v4()));
            std::fs::create_dir_all(&dir).unwrap();
            Self(dir)
        }

        fn args(&self, csv: &str) -> GenerateArgs {
            let input = self.0.join("input.csv");
            std::fs::write(&input, csv).unwrap();
            GenerateArgs {
                input,
                output_dir: self.0.join("out"),
                limit: None,
            }
        }
    }

    impl Drop for Scratch {
        fn drop(&mut self) {
            std::fs::remove_dir_all(&self.0).ok();
        }
    }

    fn gtd() -> DatasetDefinition {
        find_dataset("gtd").unwrap()
    }

    fn read_json(dir: &Path, name: &str) -> serde_json::Value {
        serde_json::from_slice(&std::fs::read(dir.join(name)).unwrap()).unwrap()
    }

    fn sample_csv() -> String {
        let rows = [
            "2000,1,5,Peru,Lima,South America,10.0,-77.0,Bombing/Explosion,Military,Shining Path,2,3",
            "2000,2,0,Peru,Lima,South America,,,Bombing/Explosion,Police,Shining Path,,1",
            "2000,3,1,Peru,Lima,South America,30.0,-75.0,Armed Assault,,Unknown,0,0",
            "2001,4,2,Chile,Santiago,South America,,,Armed Assault,Business,MIR,1,",
            "2001,5,9,Peru,Cusco,South America,-13.5,-72.0,Bombing/Explosion,Military,Shining Path,0,0",
        ];
        let mut csv = HEADER.to_string();
        for row in rows {
            csv.push_str(row);
            csv.push('\n');
        }
        csv
    }

    #[tokio::test]
    async fn full_run_writes_every_view() {
        let scratch = Scratch::new();
        let args = scratch.args(&sample_csv());

        let summary = run(&gtd(), &args, &PipelineProgress::default())
            .await
            .unwrap();
        assert!(summary.skipped.is_empty(), "{:?}", summary.skipped);
        assert_eq!(
            summary.written.last().and_then(|p| p.file_name()),
            Some(std::ffi::OsStr::new(METADATA_FILE))
        );

        let out = &args.output_dir;
        let heatmap = read_json(out, HEATMAP_FILE);
        assert_eq!(heatmap, serde_json::json!({"2000": {"Peru": 3}, "2001": {"Chile": 1, "Peru": 1}}));

        let top = read_json(out, TOP_GROUPS_FILE);
        assert_eq!(top["2000"], serde_json::json!([{"group": "Shining Path", "count": 2}]));

        let series = read_json(out, TIMESERIES_FILE);
        assert_eq!(series["years"], serde_json::json!([2000, 2001]));
        assert_eq!(series["stacked"]["series"]["Armed Assault"], serde_json::json!([1, 1]));
        assert_eq!(series["grouped"]["mode"], "grouped");

        let by_year = read_json(out, ATTACK_TYPES_BY_YEAR_FILE);
        assert_eq!(by_year["2000"][0]["attack_type"], "Bombing/Explosion");

        let scatter = read_json(out, TARGET_CASUALTIES_FILE);
        assert_eq!(scatter["colors"][0]["targetType"], "Military");
        assert_eq!(scatter["colors"][2]["targetType"], "Unknown");

        let geo = std::fs::read_to_string(out.join(INCIDENTS_GEOJSONSEQ_FILE)).unwrap();
        assert_eq!(geo.lines().count(), 4, "Lima imputed, Santiago not");

        let summary_json = read_json(out, SUMMARY_FILE);
        assert_eq!(summary_json["incidentsByYear"]["2000"], 3);
        assert_eq!(summary_json["numericColumns"]["year"]["count"], 5);
        assert_eq!(summary_json["numericColumns"]["killed"]["max"], 2.0);
        assert!(summary_json["decomposition"].is_null(), "two years only");

        let metadata = read_json(out, METADATA_FILE);
        assert_eq!(metadata["datasetId"], "gtd");
        assert_eq!(metadata["records"], 5);
        assert_eq!(metadata["geolocated"], 4);
        assert_eq!(metadata["cleaning"]["latitudeImputed"], 1);
        assert_eq!(metadata["yearRange"], serde_json::json!({"first": 2000, "last": 2001}));
    }

    #[tokio::test]
    async fn limit_caps_loaded_rows() {
        let scratch = Scratch::new();
        let mut args = scratch.args(&sample_csv());
        args.limit = Some(3);

        run(&gtd(), &args, &PipelineProgress::default())
            .await
            .unwrap();

        let metadata = read_json(&args.output_dir, METADATA_FILE);
        assert_eq!(metadata["records"], 3);
        assert_eq!(metadata["geolocated"], 3, "second Lima row imputed");
        assert_eq!(metadata["yearRange"], serde_json::json!({"first": 2000, "last": 2000}));
    }

    #[derive(Default)]
    struct RowEvents(std::sync::Mutex<Vec<String>>);

    impl ProgressCallback for RowEvents {
        fn set_total(&self, total: u64) {
            self.0.lock().unwrap().push(format!("total {total}"));
        }
        fn inc(&self, _delta: u64) {}
        fn set_message(&self, _msg: String) {}
        fn finish(&self, msg: String) {
            self.0.lock().unwrap().push(msg);
        }
    }

    #[tokio::test]
    async fn limit_sizes_and_finishes_row_progress() {
        let scratch = Scratch::new();
        let mut args = scratch.args(&sample_csv());
        args.limit = Some(2);
        let rows = Arc::new(RowEvents::default());
        let progress = PipelineProgress {
            rows: Arc::clone(&rows) as Arc<dyn ProgressCallback>,
            ..PipelineProgress::default()
        };

        load_and_clean(&gtd(), &args.input, args.limit, &progress)
            .await
            .unwrap();

        assert_eq!(
            *rows.0.lock().unwrap(),
            vec!["total 2".to_string(), "Loaded 2 rows".to_string()]
        );
    }

    #[tokio::test]
    async fn rerun_produces_identical_views() {
        let scratch = Scratch::new();
        let args = scratch.args(&sample_csv());
        let definition = gtd();

        run(&definition, &args, &PipelineProgress::default())
            .await
            .unwrap();
        let first: Vec<Vec<u8>> = [HEATMAP_FILE, TOP_GROUPS_FILE, TIMESERIES_FILE, TARGET_CASUALTIES_FILE]
            .iter()
            .map(|name| std::fs::read(args.output_dir.join(name)).unwrap())
            .collect();

        run(&definition, &args, &PipelineProgress::default())
            .await
            .unwrap();
        let second: Vec<Vec<u8>> = [HEATMAP_FILE, TOP_GROUPS_FILE, TIMESERIES_FILE, TARGET_CASUALTIES_FILE]
            .iter()
            .map(|name| std::fs::read(args.output_dir.join(name)).unwrap())
            .collect();

        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn negative_casualties_abort_before_writing() {
        let scratch = Scratch::new();
        let csv = format!(
            "{HEADER}2000,1,1,Peru,Lima,South America,1.0,1.0,Bombing/Explosion,Military,X,-1,0\n"
        );
        let args = scratch.args(&csv);

        let err = run(&gtd(), &args, &PipelineProgress::default())
            .await
            .unwrap_err();
        assert_eq!(err.stage(), "clean");
        assert!(matches!(
            err,
            PipelineError::Clean(CleanError::ValueOutOfRange { row: 1, .. })
        ));
        assert!(!args.output_dir.exists());
    }

    #[tokio::test]
    async fn missing_column_fails_the_load_stage() {
        let scratch = Scratch::new();
        let args = scratch.args("year,country\n2000,Peru\n");

        let err = run(&gtd(), &args, &PipelineProgress::default())
            .await
            .unwrap_err();
        assert_eq!(err.stage(), "load");
        assert!(!args.output_dir.exists());
    }

    #[tokio::test]
    async fn view_without_data_is_skipped_and_stale_output_removed() {
        let scratch = Scratch::new();
        let args = scratch.args(&sample_csv());
        let definition = gtd();
        run(&definition, &args, &PipelineProgress::default())
            .await
            .unwrap();
        assert!(args.output_dir.join(INCIDENTS_GEOJSONSEQ_FILE).exists());

        let no_coordinates = format!(
            "{HEADER}2000,1,1,Peru,Lima,South America,,,Bombing/Explosion,Military,X,1,0\n"
        );
        std::fs::write(&args.input, no_coordinates).unwrap();
        let summary = run(&definition, &args, &PipelineProgress::default())
            .await
            .unwrap();

        assert_eq!(summary.skipped.keys().copied().collect::<Vec<_>>(), vec![ViewKind::Geo]);
        assert!(!args.output_dir.join(INCIDENTS_GEOJSONSEQ_FILE).exists());
        assert!(args.output_dir.join(HEATMAP_FILE).exists());
        let metadata = read_json(&args.output_dir, METADATA_FILE);
        assert!(metadata["skipped"]["geo"].is_string());
        assert!(metadata["mapCenter"].is_null());
    }

    #[tokio::test]
    async fn builds_views_in_parallel_over_shared_records() {
        let records: Arc<[CleanedRecord]> = Vec::new().into();
        let built = build_views(records, ViewOptions::default()).await.unwrap();
        assert!(built.views.is_empty());
        assert_eq!(built.skipped.len(), ViewKind::all().len());
    }
}
