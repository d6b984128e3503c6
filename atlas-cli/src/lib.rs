//! Command-line interface for building and inspecting atlas tile files.
//!
//! Options are layered with `ortho_config`: CLI flags override `ATLAS_*`
//! environment variables, which override configuration files. Reports are
//! printed to stdout as JSON; logs go to stderr as JSON lines.
#![forbid(unsafe_code)]

use std::io::{self, Write};

use atlas_core::TileFileStats;
use atlas_data::{OsmIngestSummary, TileBuildReport, build_tile_file, ingest_osm_pbf};
use camino::{Utf8Path, Utf8PathBuf};
use clap::{Parser, Subcommand};
use log::info;
use ortho_config::{OrthoConfig, SubcmdConfigMerge};
use serde::{Deserialize, Serialize};
use structured_logger::{Builder, json::new_writer};

mod error;
mod fs;

pub use error::CliError;

const ARG_OSM_PBF: &str = "osm-pbf";
const ARG_OUTPUT: &str = "output";
const ENV_BUILD_OSM_PBF: &str = "ATLAS_CMDS_BUILD_OSM_PBF";
const ENV_BUILD_OUTPUT: &str = "ATLAS_CMDS_BUILD_OUTPUT";
const ENV_SUMMARY_OSM_PBF: &str = "ATLAS_CMDS_SUMMARY_OSM_PBF";

/// Run the atlas CLI with the current process arguments and environment.
///
/// # Errors
/// Returns [`CliError`] when arguments are invalid, inputs are missing or
/// the command itself fails.
pub fn run() -> Result<(), CliError> {
    let cli = Cli::try_parse().map_err(CliError::ArgumentParsing)?;
    init_logging(&cli.log_level)?;
    let mut stdout = io::stdout().lock();
    match cli.command {
        Command::Build(args) => write_json(&mut stdout, &run_build(args)?),
        Command::Summary(args) => write_json(&mut stdout, &run_summary(args)?),
    }
}

fn init_logging(level: &str) -> Result<(), CliError> {
    Builder::with_level(level)
        .with_target_writer("*", new_writer(io::stderr()))
        .try_init()
        .map_err(CliError::Logging)
}

fn run_build(args: BuildArgs) -> Result<BuildOutput, CliError> {
    let config = args.into_config()?;
    config.validate()?;
    fs::ensure_parent_dir(&config.output).map_err(|source| CliError::CreateOutputDirectory {
        path: config.output.clone(),
        source,
    })?;
    let report = build_tile_file(config.osm_pbf.as_std_path(), config.output.as_std_path())?;
    info!(
        "wrote {} features into {} tiles at {}",
        report.features, report.tiles.tiles, config.output
    );
    Ok(BuildOutput::new(config, report))
}

fn run_summary(args: SummaryArgs) -> Result<SummaryOutput, CliError> {
    let config = args.into_config()?;
    require_existing(&config.osm_pbf, ARG_OSM_PBF)?;
    let summary = ingest_osm_pbf(config.osm_pbf.as_std_path())?;
    info!("summarised {}", config.osm_pbf);
    Ok(SummaryOutput {
        input: config.osm_pbf,
        summary: ElementCounts::from(&summary),
    })
}

fn write_json<W: Write>(writer: &mut W, value: &impl Serialize) -> Result<(), CliError> {
    serde_json::to_writer_pretty(&mut *writer, value).map_err(CliError::SerialiseOutput)?;
    writer.write_all(b"\n").map_err(CliError::WriteOutput)
}

fn require_existing(path: &Utf8Path, field: &'static str) -> Result<(), CliError> {
    match fs::file_is_file(path) {
        Ok(true) => Ok(()),
        Ok(false) => Err(CliError::SourcePathNotFile {
            field,
            path: path.to_path_buf(),
        }),
        Err(source) if source.kind() == io::ErrorKind::NotFound => {
            Err(CliError::MissingSourceFile {
                field,
                path: path.to_path_buf(),
            })
        }
        Err(source) => Err(CliError::InspectSourcePath {
            field,
            path: path.to_path_buf(),
            source,
        }),
    }
}

#[derive(Debug, Parser)]
#[command(
    name = "atlas",
    about = "Build and inspect tiled map files from OpenStreetMap extracts",
    version
)]
struct Cli {
    /// Minimum level of the JSON log lines written to stderr.
    #[arg(long, global = true, default_value = "info", value_name = "level")]
    log_level: String,
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Ingest an OSM PBF extract and write a tile file.
    Build(BuildArgs),
    /// Count the elements of an OSM PBF extract.
    Summary(SummaryArgs),
}

/// CLI arguments for the `build` subcommand.
#[derive(Debug, Clone, Parser, Deserialize, Serialize, OrthoConfig, Default)]
#[command(
    name = "build",
    long_about = "Decode an OSM PBF extract, derive features from tagged \
                 nodes and ways, and write them as a tile file. Paths can \
                 come from CLI flags, configuration files, or environment \
                 variables.",
    about = "Build a tile file from an OSM PBF extract"
)]
#[ortho_config(prefix = "ATLAS")]
struct BuildArgs {
    /// Path to the OpenStreetMap PBF file.
    #[arg(long = ARG_OSM_PBF, value_name = "path")]
    #[serde(default)]
    osm_pbf: Option<Utf8PathBuf>,
    /// Destination of the tile file; existing files are replaced.
    #[arg(long = ARG_OUTPUT, value_name = "path")]
    #[serde(default)]
    output: Option<Utf8PathBuf>,
}

impl BuildArgs {
    fn into_config(self) -> Result<BuildConfig, CliError> {
        let merged = self.load_and_merge().map_err(CliError::Configuration)?;
        BuildConfig::try_from(merged)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct BuildConfig {
    osm_pbf: Utf8PathBuf,
    output: Utf8PathBuf,
}

impl BuildConfig {
    fn validate(&self) -> Result<(), CliError> {
        require_existing(&self.osm_pbf, ARG_OSM_PBF)?;
        if fs::is_existing_dir(&self.output) {
            return Err(CliError::OutputIsDirectory {
                path: self.output.clone(),
            });
        }
        Ok(())
    }
}

impl TryFrom<BuildArgs> for BuildConfig {
    type Error = CliError;

    fn try_from(args: BuildArgs) -> Result<Self, Self::Error> {
        let osm_pbf = args.osm_pbf.ok_or(CliError::MissingArgument {
            field: ARG_OSM_PBF,
            env: ENV_BUILD_OSM_PBF,
        })?;
        let output = args.output.ok_or(CliError::MissingArgument {
            field: ARG_OUTPUT,
            env: ENV_BUILD_OUTPUT,
        })?;
        Ok(Self { osm_pbf, output })
    }
}

/// CLI arguments for the `summary` subcommand.
#[derive(Debug, Clone, Parser, Deserialize, Serialize, OrthoConfig, Default)]
#[command(name = "summary", about = "Count the elements of an OSM PBF extract")]
#[ortho_config(prefix = "ATLAS")]
struct SummaryArgs {
    /// Path to the OpenStreetMap PBF file.
    #[arg(long = ARG_OSM_PBF, value_name = "path")]
    #[serde(default)]
    osm_pbf: Option<Utf8PathBuf>,
}

impl SummaryArgs {
    fn into_config(self) -> Result<SummaryConfig, CliError> {
        let merged = self.load_and_merge().map_err(CliError::Configuration)?;
        SummaryConfig::try_from(merged)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct SummaryConfig {
    osm_pbf: Utf8PathBuf,
}

impl TryFrom<SummaryArgs> for SummaryConfig {
    type Error = CliError;

    fn try_from(args: SummaryArgs) -> Result<Self, Self::Error> {
        let osm_pbf = args.osm_pbf.ok_or(CliError::MissingArgument {
            field: ARG_OSM_PBF,
            env: ENV_SUMMARY_OSM_PBF,
        })?;
        Ok(Self { osm_pbf })
    }
}

/// Element counts as printed by the CLI.
#[derive(Debug, Clone, PartialEq, Serialize)]
struct ElementCounts {
    nodes: u64,
    ways: u64,
    relations: u64,
    changesets: u64,
    bounds: Option<Bounds>,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
struct Bounds {
    min_lat: f64,
    min_lon: f64,
    max_lat: f64,
    max_lon: f64,
}

impl From<&OsmIngestSummary> for ElementCounts {
    fn from(summary: &OsmIngestSummary) -> Self {
        Self {
            nodes: summary.nodes,
            ways: summary.ways,
            relations: summary.relations,
            changesets: summary.changesets,
            bounds: summary.bounds.map(|rect| Bounds {
                min_lat: rect.min().y,
                min_lon: rect.min().x,
                max_lat: rect.max().y,
                max_lon: rect.max().x,
            }),
        }
    }
}

/// Report of the `build` subcommand.
#[derive(Debug, Clone, PartialEq, Serialize)]
struct BuildOutput {
    input: Utf8PathBuf,
    output: Utf8PathBuf,
    summary: ElementCounts,
    features: usize,
    skipped_ways: u64,
    tiles: TileFileStats,
}

impl BuildOutput {
    fn new(config: BuildConfig, report: TileBuildReport) -> Self {
        Self {
            input: config.osm_pbf,
            output: config.output,
            summary: ElementCounts::from(&report.summary),
            features: report.features,
            skipped_ways: report.skipped_ways,
            tiles: report.tiles,
        }
    }
}

/// Report of the `summary` subcommand.
#[derive(Debug, Clone, PartialEq, Serialize)]
struct SummaryOutput {
    input: Utf8PathBuf,
    summary: ElementCounts,
}

#[cfg(test)]
mod tests;
