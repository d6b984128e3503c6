//! Error types emitted by the atlas CLI.

use std::sync::Arc;

use atlas_data::OsmIngestError;
use camino::Utf8PathBuf;
use thiserror::Error;

/// Errors emitted by the atlas CLI.
#[derive(Debug, Error)]
pub enum CliError {
    /// Provided arguments failed Clap validation.
    #[error(transparent)]
    ArgumentParsing(#[from] clap::Error),
    /// Configuration layering failed (files, env, CLI).
    #[error("failed to load configuration: {0}")]
    Configuration(#[from] Arc<ortho_config::OrthoError>),
    /// A required option is missing after configuration merging.
    #[error("missing {field} (set --{field} or {env})")]
    MissingArgument {
        field: &'static str,
        env: &'static str,
    },
    /// A referenced input path does not exist on disk.
    #[error("{field} path {path:?} does not exist")]
    MissingSourceFile {
        field: &'static str,
        path: Utf8PathBuf,
    },
    /// A referenced input path exists but is not a file.
    #[error("{field} path {path:?} exists but is not a file")]
    SourcePathNotFile {
        field: &'static str,
        path: Utf8PathBuf,
    },
    /// A referenced input path could not be inspected.
    #[error("failed to inspect {field} path {path:?}: {source}")]
    InspectSourcePath {
        field: &'static str,
        path: Utf8PathBuf,
        #[source]
        source: std::io::Error,
    },
    /// The output path names an existing directory.
    #[error("output path {path:?} is a directory")]
    OutputIsDirectory { path: Utf8PathBuf },
    /// Creating the output's parent directory failed.
    #[error("failed to create output directory for {path:?}: {source}")]
    CreateOutputDirectory {
        path: Utf8PathBuf,
        #[source]
        source: std::io::Error,
    },
    /// Ingestion or tile file writing failed.
    #[error("failed to process OSM data: {0}")]
    Ingest(#[from] OsmIngestError),
    /// Installing the logger failed.
    #[error("failed to install logger: {0}")]
    Logging(#[source] log::SetLoggerError),
    /// Serialising the command report failed.
    #[error("failed to serialise report: {0}")]
    SerialiseOutput(#[source] serde_json::Error),
    /// Writing the command report failed.
    #[error("failed to write report: {0}")]
    WriteOutput(#[source] std::io::Error),
}
