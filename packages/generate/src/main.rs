#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! CLI for generating the incident views from a delimited export.
//!
//! `all` runs the whole pipeline and writes every output file, `view`
//! builds a single view and prints it to stdout, and `definitions` lists
//! the embedded dataset definitions.

use std::io::Write as _;
use std::path::PathBuf;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use incident_atlas_analytics::build_view;
use incident_atlas_analytics_models::{View, ViewKind};
use incident_atlas_cli_utils::IndicatifProgress;
use incident_atlas_generate::{
    GenerateArgs, PipelineProgress, STAGE_COUNT, export, load_and_clean, view_options,
};
use incident_atlas_source::registry;
use incident_atlas_source::source_def::DatasetDefinition;

#[derive(Parser)]
#[command(name = "incident_atlas_generate", about = "Incident view generation tool")]
struct Cli {
    /// Dataset definition TOML file (defaults to the embedded GTD mapping)
    #[arg(long, conflicts_with = "dataset")]
    definition: Option<PathBuf>,

    /// Embedded dataset definition to use, by id
    #[arg(long)]
    dataset: Option<String>,

    /// Maximum number of rows to load (useful for testing)
    #[arg(long)]
    limit: Option<u64>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the full pipeline and write every output
    All {
        /// Delimited input file
        #[arg(long)]
        input: PathBuf,

        /// Directory to write outputs to
        #[arg(long, default_value = "data/generated")]
        output_dir: PathBuf,
    },
    /// Build a single view and print it as JSON
    View {
        /// View to build (time-series, ranking, nested-count, scatter, geo, summary)
        kind: String,

        /// Delimited input file
        #[arg(long)]
        input: PathBuf,

        /// Only print points of this year (scatter view)
        #[arg(long)]
        year: Option<i32>,
    },
    /// List the embedded dataset definitions
    Definitions,
}

fn resolve_definition(cli: &Cli) -> Result<DatasetDefinition, Box<dyn std::error::Error>> {
    if let Some(path) = &cli.definition {
        return Ok(incident_atlas_source::read_definition(path)?);
    }
    match &cli.dataset {
        Some(id) => registry::find_dataset(id)
            .ok_or_else(|| format!("Unknown dataset '{id}' (see `definitions`)").into()),
        None => Ok(registry::default_dataset()),
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let multi = incident_atlas_cli_utils::init_logger();
    let cli = Cli::parse();

    match &cli.command {
        Commands::Definitions => {
            let mut stdout = std::io::stdout().lock();
            for definition in registry::all_datasets() {
                writeln!(stdout, "{:<12} {}", definition.id, definition.name)?;
            }
        }
        Commands::All { input, output_dir } => {
            let definition = resolve_definition(&cli)?;
            log::info!("Using dataset definition '{}'", definition.id);

            let progress = PipelineProgress {
                stages: IndicatifProgress::steps_bar(&multi, "Pipeline", STAGE_COUNT),
                rows: IndicatifProgress::records_bar(&multi, "Loading"),
            };
            let args = GenerateArgs {
                input: input.clone(),
                output_dir: output_dir.clone(),
                limit: cli.limit,
            };

            let summary = incident_atlas_generate::run(&definition, &args, &progress)
                .await
                .inspect_err(|e| log::error!("Run failed in {} stage: {e}", e.stage()))?;
            progress.stages.finish(format!(
                "Wrote {} files ({} views skipped)",
                summary.written.len(),
                summary.skipped.len()
            ));
        }
        Commands::View { kind, input, year } => {
            let kind: ViewKind = kind
                .parse()
                .map_err(|_| format!("Unknown view '{kind}'"))?;
            let definition = resolve_definition(&cli)?;
            let progress = PipelineProgress {
                rows: IndicatifProgress::records_bar(&multi, "Loading"),
                ..PipelineProgress::default()
            };
            let cleaned = load_and_clean(&definition, input, cli.limit, &progress).await?;

            let options = view_options(&definition);
            let records: Arc<[_]> = cleaned.records.into();
            let view =
                tokio::task::spawn_blocking(move || build_view(kind, &records, options)).await??;

            let contents = match (&view, year) {
                (View::Scatter(scatter), Some(year)) => {
                    let mut json = serde_json::to_vec_pretty(&scatter.filter_year(*year))?;
                    json.push(b'\n');
                    json
                }
                (_, Some(_)) => {
                    log::warn!("--year only applies to the scatter view; ignoring");
                    primary_output(&view)?
                }
                (_, None) => primary_output(&view)?,
            };

            std::io::stdout().lock().write_all(&contents)?;
        }
    }

    Ok(())
}

fn primary_output(view: &View) -> Result<Vec<u8>, Box<dyn std::error::Error>> {
    export::render_view(view)?
        .into_iter()
        .next()
        .map(|output| output.contents)
        .ok_or_else(|| format!("{} view rendered no output", view.kind()).into())
}
