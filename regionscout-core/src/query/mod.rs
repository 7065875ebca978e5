//! Query form state, validation and the submission state machine.

use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize, Serializer};
use thiserror::Error;

use crate::BoundingBox;

mod orchestrator;

pub use orchestrator::{Completion, QueryOrchestrator, QueryPhase, RequestId, SubmitError, Ticket};

/// Optional enrichment requested alongside the basic search.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Tier {
    /// Review summaries; needs an LLM key.
    Reviews,
    /// Photo summaries; needs a VLM key.
    Photos,
}

/// Artifact formats an export can produce.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExportFormat {
    /// Spreadsheet produced by the conversion service.
    Excel,
    /// Raw search response, serialised locally.
    Json,
    /// Compressed geospatial archive produced by the conversion service.
    Kmz,
}

impl ExportFormat {
    /// Every supported format.
    pub const ALL: [Self; 3] = [Self::Excel, Self::Json, Self::Kmz];

    /// Wire name used in requests.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Excel => "excel",
            Self::Json => "json",
            Self::Kmz => "kmz",
        }
    }

    /// File extension of the produced artifact.
    #[must_use]
    pub const fn extension(self) -> &'static str {
        match self {
            Self::Excel => "xlsx",
            Self::Json => "json",
            Self::Kmz => "kmz",
        }
    }

    /// Media type of the produced artifact.
    #[must_use]
    pub const fn media_type(self) -> &'static str {
        match self {
            Self::Excel => "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet",
            Self::Json => "application/json",
            Self::Kmz => "application/vnd.google-earth.kmz",
        }
    }
}

impl fmt::Display for ExportFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when parsing an unknown format or tier name.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown {kind} `{value}`")]
pub struct UnknownVariant {
    /// What was being parsed.
    pub kind: &'static str,
    /// The rejected input.
    pub value: String,
}

impl FromStr for ExportFormat {
    type Err = UnknownVariant;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|format| format.as_str().eq_ignore_ascii_case(value.trim()))
            .ok_or_else(|| UnknownVariant {
                kind: "format",
                value: value.to_owned(),
            })
    }
}

impl FromStr for Tier {
    type Err = UnknownVariant;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "reviews" => Ok(Self::Reviews),
            "photos" => Ok(Self::Photos),
            _ => Err(UnknownVariant {
                kind: "tier",
                value: value.to_owned(),
            }),
        }
    }
}

/// A credential passed through to the backend.
///
/// The key is never persisted and its `Debug` output is redacted so it cannot
/// leak through logs.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ApiKey(String);

impl ApiKey {
    /// Wrap a key, returning `None` when it is blank.
    #[must_use]
    pub fn new(value: impl Into<String>) -> Option<Self> {
        let value = value.into();
        let trimmed = value.trim();
        if trimmed.is_empty() {
            None
        } else {
            Some(Self(trimmed.to_owned()))
        }
    }

    /// The raw key, for building requests.
    #[must_use]
    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for ApiKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("ApiKey(<redacted>)")
    }
}

/// Raw form state as entered by the user.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QueryForm {
    /// Free-text place query, e.g. "coffee shops".
    pub text_query: String,
    /// Extra instructions for the recommender.
    pub prompt_info: String,
    /// Requested enrichment tiers.
    pub tiers: BTreeSet<Tier>,
    /// Requested artifact formats.
    pub formats: BTreeSet<ExportFormat>,
    /// Places API key.
    pub google_api_key: String,
    /// Key for review summaries.
    pub llm_key: String,
    /// Key for photo summaries.
    pub vlm_key: String,
}

/// Reasons a form is refused before any request is sent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum ValidationError {
    /// No output format was selected.
    #[error("Please select at least one output format.")]
    NoFormats,
    /// No region is selected on the map.
    #[error("Please draw a search area on the map.")]
    MissingBoundingBox,
    /// The query text is blank.
    #[error("Please enter a search query.")]
    MissingQuery,
    /// The recommender prompt is blank.
    #[error("Please describe what you are looking for.")]
    MissingPrompt,
    /// The Places API key is blank.
    #[error("Please enter a Google API key.")]
    MissingGoogleKey,
    /// Reviews were requested without an LLM key.
    #[error("An LLM key is required when reviews are selected.")]
    MissingLlmKey,
    /// Photos were requested without a VLM key.
    #[error("A VLM key is required when photos are selected.")]
    MissingVlmKey,
}

/// A validated search request.
///
/// Serialises to the flattened payload the search service expects, with
/// formats under `format` and absent tier keys sent as empty strings.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct QueryRequest {
    /// Free-text place query.
    pub text_query: String,
    /// Extra instructions for the recommender.
    pub prompt_info: String,
    /// Requested enrichment tiers.
    pub tiers: BTreeSet<Tier>,
    /// Requested artifact formats.
    #[serde(rename = "format")]
    pub formats: BTreeSet<ExportFormat>,
    /// Places API key.
    pub google_api_key: ApiKey,
    /// Present iff reviews were requested.
    #[serde(serialize_with = "key_or_empty")]
    pub llm_key: Option<ApiKey>,
    /// Present iff photos were requested.
    #[serde(serialize_with = "key_or_empty")]
    pub vlm_key: Option<ApiKey>,
    /// Selected region.
    #[serde(flatten)]
    pub bbox: BoundingBox,
}

fn key_or_empty<S>(key: &Option<ApiKey>, serializer: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    serializer.serialize_str(key.as_ref().map_or("", ApiKey::expose))
}

impl QueryRequest {
    /// Validate form state against the current selection.
    ///
    /// Checks run in a fixed order (formats, region, query, prompt, Google
    /// key, LLM key, VLM key) and the first failure is reported. Tier keys
    /// are only kept when their tier is selected.
    ///
    /// # Errors
    ///
    /// Returns the first [`ValidationError`] encountered.
    ///
    /// # Examples
    /// ```
    /// use regionscout_core::query::{QueryForm, QueryRequest, ValidationError};
    ///
    /// let form = QueryForm::default();
    /// assert_eq!(QueryRequest::from_form(&form, None), Err(ValidationError::NoFormats));
    /// ```
    pub fn from_form(
        form: &QueryForm,
        bbox: Option<BoundingBox>,
    ) -> Result<Self, ValidationError> {
        if form.formats.is_empty() {
            return Err(ValidationError::NoFormats);
        }
        let bbox = bbox.ok_or(ValidationError::MissingBoundingBox)?;
        let text_query = form.text_query.trim();
        if text_query.is_empty() {
            return Err(ValidationError::MissingQuery);
        }
        let prompt_info = form.prompt_info.trim();
        if prompt_info.is_empty() {
            return Err(ValidationError::MissingPrompt);
        }
        let google_api_key =
            ApiKey::new(form.google_api_key.as_str()).ok_or(ValidationError::MissingGoogleKey)?;
        let llm_key = tier_key(form, Tier::Reviews, &form.llm_key, ValidationError::MissingLlmKey)?;
        let vlm_key = tier_key(form, Tier::Photos, &form.vlm_key, ValidationError::MissingVlmKey)?;

        Ok(Self {
            text_query: text_query.to_owned(),
            prompt_info: prompt_info.to_owned(),
            tiers: form.tiers.clone(),
            formats: form.formats.clone(),
            google_api_key,
            llm_key,
            vlm_key,
            bbox,
        })
    }
}

fn tier_key(
    form: &QueryForm,
    tier: Tier,
    raw: &str,
    missing: ValidationError,
) -> Result<Option<ApiKey>, ValidationError> {
    if !form.tiers.contains(&tier) {
        return Ok(None);
    }
    ApiKey::new(raw).map(Some).ok_or(missing)
}
