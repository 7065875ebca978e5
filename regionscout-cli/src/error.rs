//! Error types emitted by the RegionScout CLI.
//!
//! Keep this error type reasonably small, as many CLI helpers return
//! `Result<_, CliError>` and the workspace enables `clippy::result_large_err`.

use std::sync::Arc;

use camino::Utf8PathBuf;
use regionscout_core::query::UnknownVariant;
use regionscout_core::selection::SelectionError;
use regionscout_core::{EstimateError, SessionError};
use regionscout_data::BackendBuildError;
use thiserror::Error;

/// Errors emitted by the RegionScout CLI.
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
    /// The region is not four comma-separated finite coordinates.
    #[error("invalid {field} `{value}`: {message}")]
    InvalidRegion {
        field: &'static str,
        value: String,
        message: String,
    },
    /// A list option named an unknown entry.
    #[error("invalid {field}: {source}")]
    InvalidChoice {
        field: &'static str,
        #[source]
        source: UnknownVariant,
    },
    /// The selection rejected the requested region.
    #[error("failed to select region: {0}")]
    Selection(#[from] SelectionError),
    /// Constructing the HTTP backend failed.
    #[error("failed to build backend for {base_url:?}: {source}")]
    BuildBackend {
        base_url: String,
        #[source]
        source: BackendBuildError,
    },
    /// The output directory could not be created or opened.
    #[error("failed to open output directory {path:?}: {source}")]
    OpenOutputDirectory {
        path: Utf8PathBuf,
        #[source]
        source: std::io::Error,
    },
    /// The async runtime could not be started.
    #[error("failed to start runtime: {0}")]
    Runtime(#[source] std::io::Error),
    /// The search was refused or failed.
    #[error(transparent)]
    Search(#[from] SessionError),
    /// One or more formats failed to export.
    #[error("{message}")]
    Export { message: String },
    /// The estimate was refused or failed.
    #[error(transparent)]
    Estimate(#[from] EstimateError),
    /// Serialising the estimate failed.
    #[error("failed to serialise estimate: {0}")]
    SerialiseEstimate(#[source] serde_json::Error),
    /// Writing command output failed.
    #[error("failed to write output: {0}")]
    WriteOutput(#[source] std::io::Error),
}
