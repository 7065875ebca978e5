//! Command-line interface for RegionScout.
//!
//! `search` selects a region, submits a query to the backend services and
//! saves the requested exports into a directory. `estimate` asks how long and
//! how much such a search would cost.
#![forbid(unsafe_code)]

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;
use tracing_subscriber::util::{SubscriberInitExt, TryInitError};

mod backend;
mod error;
mod estimate;
mod region;
mod search;

pub use error::CliError;

use estimate::{EstimateArgs, run_estimate};
use search::{SearchArgs, run_search};

const ARG_QUERY: &str = "query";
const ARG_BBOX: &str = "bbox";
const ARG_PROMPT: &str = "prompt";
const ARG_TIERS: &str = "tiers";
const ARG_FORMATS: &str = "formats";
const ARG_GOOGLE_API_KEY: &str = "google-api-key";
const ARG_LLM_KEY: &str = "llm-key";
const ARG_VLM_KEY: &str = "vlm-key";
const ARG_BASE_URL: &str = "base-url";
const ARG_TIMEOUT_SECS: &str = "timeout-secs";
const ARG_OUTPUT_DIR: &str = "output-dir";

const ENV_SEARCH_QUERY: &str = "REGIONSCOUT_CMDS_SEARCH_QUERY";
const ENV_SEARCH_BBOX: &str = "REGIONSCOUT_CMDS_SEARCH_BBOX";
const ENV_SEARCH_PROMPT: &str = "REGIONSCOUT_CMDS_SEARCH_PROMPT";
const ENV_SEARCH_GOOGLE_API_KEY: &str = "REGIONSCOUT_CMDS_SEARCH_GOOGLE_API_KEY";
const ENV_ESTIMATE_QUERY: &str = "REGIONSCOUT_CMDS_ESTIMATE_QUERY";
const ENV_ESTIMATE_BBOX: &str = "REGIONSCOUT_CMDS_ESTIMATE_BBOX";
const ENV_ESTIMATE_GOOGLE_API_KEY: &str = "REGIONSCOUT_CMDS_ESTIMATE_GOOGLE_API_KEY";

/// Run the RegionScout CLI with the current process arguments and environment.
///
/// # Errors
///
/// Returns a [`CliError`] when arguments or configuration are invalid, the
/// backend cannot be reached, or an export fails.
pub fn run() -> Result<(), CliError> {
    let cli = Cli::try_parse().map_err(CliError::ArgumentParsing)?;
    match cli.command {
        Command::Search(args) => run_search(args),
        Command::Estimate(args) => run_estimate(args),
    }
}

/// Send `log` records to stderr, filtered by `RUST_LOG` (default `info`).
///
/// # Errors
///
/// Returns [`TryInitError`] when a global subscriber or logger is already
/// installed.
pub fn init_logging() -> Result<(), TryInitError> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .finish()
        .try_init()
}

#[derive(Debug, Parser)]
#[command(
    name = "regionscout",
    about = "Search a map region for places and export the results",
    version
)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Search a region and save the requested exports.
    Search(SearchArgs),
    /// Estimate the time and cost of a search.
    Estimate(EstimateArgs),
}

#[cfg(test)]
mod tests;
