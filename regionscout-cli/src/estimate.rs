//! Estimate command: pre-flight time and cost of a search.

use std::io::Write;

use clap::Parser;
use geo::Rect;
use ortho_config::{OrthoConfig, SubcmdConfigMerge};
use regionscout_core::Session;
use regionscout_core::download::MemoryDownloads;
use regionscout_core::map::HeadlessMap;
use regionscout_data::HttpBackendConfig;
use serde::{Deserialize, Serialize};

use crate::backend::{BackendFactory, HttpBackendFactory, backend_config, runtime};
use crate::region::parse_region;
use crate::{
    ARG_BASE_URL, ARG_BBOX, ARG_GOOGLE_API_KEY, ARG_QUERY, ARG_TIMEOUT_SECS, CliError,
    ENV_ESTIMATE_BBOX, ENV_ESTIMATE_GOOGLE_API_KEY, ENV_ESTIMATE_QUERY,
};

/// CLI arguments for the `estimate` subcommand.
#[derive(Debug, Clone, Parser, Deserialize, Serialize, OrthoConfig, Default)]
#[command(
    long_about = "Ask the estimator how many places a search would match and \
                 how long and how much each enrichment tier would take. \
                 Prints the estimate as JSON.",
    about = "Estimate the time and cost of a search"
)]
#[ortho_config(prefix = "REGIONSCOUT")]
pub(crate) struct EstimateArgs {
    /// Free-text place query.
    #[arg(value_name = "query")]
    #[serde(default)]
    pub(crate) query: Option<String>,
    /// Region corners as `lat_sw,lng_sw,lat_ne,lng_ne`.
    #[arg(long = ARG_BBOX, value_name = "corners", allow_hyphen_values = true)]
    #[serde(default)]
    pub(crate) bbox: Option<String>,
    /// Places API key.
    #[arg(long = ARG_GOOGLE_API_KEY, value_name = "key")]
    #[serde(default)]
    pub(crate) google_api_key: Option<String>,
    /// Base URL of the backend services.
    #[arg(long = ARG_BASE_URL, value_name = "url")]
    #[serde(default)]
    pub(crate) base_url: Option<String>,
    /// Request timeout in seconds; unlimited when absent or zero.
    #[arg(long = ARG_TIMEOUT_SECS, value_name = "seconds")]
    #[serde(default)]
    pub(crate) timeout_secs: Option<u64>,
}

impl EstimateArgs {
    pub(crate) fn into_config(self) -> Result<EstimateConfig, CliError> {
        let merged = self.load_and_merge().map_err(CliError::Configuration)?;
        EstimateConfig::try_from(merged)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) struct EstimateConfig {
    pub(crate) region: Rect<f64>,
    pub(crate) query: String,
    pub(crate) google_api_key: String,
    pub(crate) backend: HttpBackendConfig,
}

impl TryFrom<EstimateArgs> for EstimateConfig {
    type Error = CliError;

    fn try_from(args: EstimateArgs) -> Result<Self, Self::Error> {
        let query = args.query.ok_or(CliError::MissingArgument {
            field: ARG_QUERY,
            env: ENV_ESTIMATE_QUERY,
        })?;
        let bbox = args.bbox.ok_or(CliError::MissingArgument {
            field: ARG_BBOX,
            env: ENV_ESTIMATE_BBOX,
        })?;
        let google_api_key = args.google_api_key.ok_or(CliError::MissingArgument {
            field: ARG_GOOGLE_API_KEY,
            env: ENV_ESTIMATE_GOOGLE_API_KEY,
        })?;
        Ok(Self {
            region: parse_region(ARG_BBOX, &bbox)?,
            query,
            google_api_key,
            backend: backend_config(args.base_url, args.timeout_secs),
        })
    }
}

pub(crate) fn run_estimate(args: EstimateArgs) -> Result<(), CliError> {
    let mut stdout = std::io::stdout().lock();
    run_estimate_with(args, &HttpBackendFactory, &mut stdout)
}

pub(crate) fn run_estimate_with<F>(
    args: EstimateArgs,
    factory: &F,
    writer: &mut dyn Write,
) -> Result<(), CliError>
where
    F: BackendFactory,
{
    let config = args.into_config()?;
    let backend = factory.build(&config.backend)?;
    let mut session = Session::new(HeadlessMap::new(), backend, MemoryDownloads::default());
    let overlay = session.surface_mut().draw_rectangle(config.region);
    session.draw_complete(overlay, config.region)?;

    let estimate =
        runtime()?.block_on(session.estimate(&config.query, &config.google_api_key))?;
    serde_json::to_writer_pretty(&mut *writer, &estimate).map_err(CliError::SerialiseEstimate)?;
    writeln!(writer).map_err(CliError::WriteOutput)?;
    Ok(())
}
