//! Search command implementation for the RegionScout CLI.

use std::io::Write;

use camino::Utf8PathBuf;
use clap::Parser;
use geo::Rect;
use log::{info, warn};
use ortho_config::{OrthoConfig, SubcmdConfigMerge};
use regionscout_core::map::HeadlessMap;
use regionscout_core::query::QueryForm;
use regionscout_core::{SearchOutcome, Session, SubmitOutcome};
use regionscout_data::HttpBackendConfig;
use regionscout_fs::DirectoryTarget;
use serde::{Deserialize, Serialize};

use crate::backend::{BackendFactory, HttpBackendFactory, backend_config, runtime};
use crate::region::{parse_choices, parse_region};
use crate::{
    ARG_BASE_URL, ARG_BBOX, ARG_FORMATS, ARG_GOOGLE_API_KEY, ARG_LLM_KEY, ARG_OUTPUT_DIR,
    ARG_PROMPT, ARG_QUERY, ARG_TIERS, ARG_TIMEOUT_SECS, ARG_VLM_KEY, CliError,
    ENV_SEARCH_BBOX, ENV_SEARCH_GOOGLE_API_KEY, ENV_SEARCH_PROMPT, ENV_SEARCH_QUERY,
};

/// CLI arguments for the `search` subcommand.
#[derive(Debug, Clone, Parser, Deserialize, Serialize, OrthoConfig, Default)]
#[command(
    long_about = "Search for places inside a rectangular region and export \
                 the results. Every option can also come from configuration \
                 files or REGIONSCOUT_CMDS_SEARCH_* environment variables.",
    about = "Search a region and export the results"
)]
#[ortho_config(prefix = "REGIONSCOUT")]
pub(crate) struct SearchArgs {
    /// Free-text place query, e.g. "coffee shops".
    #[arg(value_name = "query")]
    #[serde(default)]
    pub(crate) query: Option<String>,
    /// Region corners as `lat_sw,lng_sw,lat_ne,lng_ne`.
    #[arg(long = ARG_BBOX, value_name = "corners", allow_hyphen_values = true)]
    #[serde(default)]
    pub(crate) bbox: Option<String>,
    /// What makes a place a good match, for the recommender.
    #[arg(long = ARG_PROMPT, value_name = "text")]
    #[serde(default)]
    pub(crate) prompt: Option<String>,
    /// Comma-separated enrichment tiers (`reviews`, `photos`).
    #[arg(long = ARG_TIERS, value_name = "list")]
    #[serde(default)]
    pub(crate) tiers: Option<String>,
    /// Comma-separated output formats (`json`, `excel`, `kmz`).
    #[arg(long = ARG_FORMATS, value_name = "list")]
    #[serde(default)]
    pub(crate) formats: Option<String>,
    /// Places API key.
    #[arg(long = ARG_GOOGLE_API_KEY, value_name = "key")]
    #[serde(default)]
    pub(crate) google_api_key: Option<String>,
    /// LLM key, required with the reviews tier.
    #[arg(long = ARG_LLM_KEY, value_name = "key")]
    #[serde(default)]
    pub(crate) llm_key: Option<String>,
    /// VLM key, required with the photos tier.
    #[arg(long = ARG_VLM_KEY, value_name = "key")]
    #[serde(default)]
    pub(crate) vlm_key: Option<String>,
    /// Base URL of the backend services.
    #[arg(long = ARG_BASE_URL, value_name = "url")]
    #[serde(default)]
    pub(crate) base_url: Option<String>,
    /// Request timeout in seconds; unlimited when absent or zero.
    #[arg(long = ARG_TIMEOUT_SECS, value_name = "seconds")]
    #[serde(default)]
    pub(crate) timeout_secs: Option<u64>,
    /// Directory the exported files are written to.
    #[arg(long = ARG_OUTPUT_DIR, value_name = "dir")]
    #[serde(default)]
    pub(crate) output_dir: Option<Utf8PathBuf>,
}

impl SearchArgs {
    pub(crate) fn into_config(self) -> Result<SearchConfig, CliError> {
        let merged = self.load_and_merge().map_err(CliError::Configuration)?;
        SearchConfig::try_from(merged)
    }
}

/// Resolved `search` command configuration.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct SearchConfig {
    /// Region to search.
    pub(crate) region: Rect<f64>,
    /// Form submitted for the region; validated by the session.
    pub(crate) form: QueryForm,
    /// Backend settings.
    pub(crate) backend: HttpBackendConfig,
    /// Where exports are saved.
    pub(crate) output_dir: Utf8PathBuf,
}

impl TryFrom<SearchArgs> for SearchConfig {
    type Error = CliError;

    fn try_from(args: SearchArgs) -> Result<Self, Self::Error> {
        let text_query = args.query.ok_or(CliError::MissingArgument {
            field: ARG_QUERY,
            env: ENV_SEARCH_QUERY,
        })?;
        let bbox = args.bbox.ok_or(CliError::MissingArgument {
            field: ARG_BBOX,
            env: ENV_SEARCH_BBOX,
        })?;
        let region = parse_region(ARG_BBOX, &bbox)?;
        let prompt_info = args.prompt.ok_or(CliError::MissingArgument {
            field: ARG_PROMPT,
            env: ENV_SEARCH_PROMPT,
        })?;
        let google_api_key = args.google_api_key.ok_or(CliError::MissingArgument {
            field: ARG_GOOGLE_API_KEY,
            env: ENV_SEARCH_GOOGLE_API_KEY,
        })?;
        let tiers = parse_choices(ARG_TIERS, args.tiers.as_deref())?;
        let formats = parse_choices(ARG_FORMATS, args.formats.as_deref())?;

        Ok(Self {
            region,
            form: QueryForm {
                text_query,
                prompt_info,
                tiers,
                formats,
                google_api_key,
                llm_key: args.llm_key.unwrap_or_default(),
                vlm_key: args.vlm_key.unwrap_or_default(),
            },
            backend: backend_config(args.base_url, args.timeout_secs),
            output_dir: args.output_dir.unwrap_or_else(|| Utf8PathBuf::from(".")),
        })
    }
}

pub(crate) fn run_search(args: SearchArgs) -> Result<(), CliError> {
    let mut stdout = std::io::stdout().lock();
    run_search_with(args, &HttpBackendFactory, &mut stdout)
}

pub(crate) fn run_search_with<F>(
    args: SearchArgs,
    factory: &F,
    writer: &mut dyn Write,
) -> Result<(), CliError>
where
    F: BackendFactory,
{
    let config = args.into_config()?;
    execute_search(&config, factory, writer)
}

fn execute_search<F>(
    config: &SearchConfig,
    factory: &F,
    writer: &mut dyn Write,
) -> Result<(), CliError>
where
    F: BackendFactory,
{
    let backend = factory.build(&config.backend)?;
    let target =
        DirectoryTarget::open(&config.output_dir).map_err(|source| CliError::OpenOutputDirectory {
            path: config.output_dir.clone(),
            source,
        })?;
    let mut session = Session::new(HeadlessMap::new(), backend, target);
    let overlay = session.surface_mut().draw_rectangle(config.region);
    session.draw_complete(overlay, config.region)?;

    info!("searching for {:?}", config.form.text_query);
    let outcome = runtime()?.block_on(session.submit(&config.form))?;
    match outcome {
        SubmitOutcome::Completed(outcome) => {
            write_summary(writer, &outcome, session.target().saved())?;
            match outcome.export.error_message() {
                Some(message) => Err(CliError::Export { message }),
                None => Ok(()),
            }
        }
        SubmitOutcome::Stale => {
            warn!("search response was superseded");
            Ok(())
        }
    }
}

fn write_summary(
    writer: &mut dyn Write,
    outcome: &SearchOutcome,
    saved: &[Utf8PathBuf],
) -> Result<(), CliError> {
    let mut lines = vec![format!(
        "found {} places ({} mapped, {} without coordinates)",
        outcome.places.len(),
        outcome.render.rendered,
        outcome.render.skipped
    )];
    lines.extend(saved.iter().map(|path| format!("saved {path}")));
    if let Some(Ok(report)) = &outcome.export.archive_render {
        lines.push(format!("archive contains {} mapped places", report.rendered));
    }
    if let Some(err) = outcome.export.archive_error() {
        lines.push(format!("warning: could not read the exported archive: {err}"));
    }
    for line in lines {
        writeln!(writer, "{line}").map_err(CliError::WriteOutput)?;
    }
    Ok(())
}

#[cfg(test)]
pub(crate) fn config_from_layers_for_test(
    layers: Vec<ortho_config::MergeLayer<'static>>,
) -> Result<SearchConfig, CliError> {
    let merged = SearchArgs::merge_from_layers(layers).map_err(CliError::from)?;
    SearchConfig::try_from(merged)
}
