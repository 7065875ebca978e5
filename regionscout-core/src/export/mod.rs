//! Per-format export of a result set.
//!
//! Conversions for the selected formats are dispatched together on the
//! current task and handled as they complete. Each format either produces a
//! download or a recorded failure; one failing format never stops the
//! others. The KMZ archive is also fed back into the marker renderer so the
//! map shows exactly what was exported.

use std::collections::BTreeSet;

use futures_util::future::LocalBoxFuture;
use futures_util::stream::{FuturesUnordered, StreamExt};
use log::{debug, warn};
use thiserror::Error;

use crate::archive::ArchiveError;
use crate::backend::{ArtifactConverter, ExcelRequest, KmzRequest, TransportError};
use crate::download::{DownloadError, DownloadTarget, ExportArtifact, trigger_download};
use crate::map::MarkerSurface;
use crate::marker::{MarkerRenderer, RenderReport};
use crate::query::{ExportFormat, QueryRequest};
use crate::{BoundingBox, PlaceResult};

/// Filename used for the raw JSON export.
pub const JSON_FILENAME: &str = "response.json";

/// Errors captured for a single format.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ExportError {
    /// The conversion service call failed.
    #[error(transparent)]
    Conversion(#[from] TransportError),
    /// The result set could not be serialised.
    #[error("failed to serialise results: {message}")]
    Serialize {
        /// Serializer message.
        message: String,
    },
    /// The artifact could not be saved.
    #[error(transparent)]
    Download(#[from] DownloadError),
}

/// A format that failed to export.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportFailure {
    /// The failing format.
    pub format: ExportFormat,
    /// What went wrong.
    pub error: ExportError,
}

/// A saved artifact.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DownloadedArtifact {
    /// Format that produced the artifact.
    pub format: ExportFormat,
    /// Name it was saved under.
    pub filename: String,
    /// Payload size in bytes.
    pub size: usize,
}

/// Everything an export run produced.
#[derive(Debug, Default)]
pub struct ExportReport {
    /// Artifacts saved, in completion order.
    pub downloads: Vec<DownloadedArtifact>,
    /// Formats that failed, in completion order.
    pub failures: Vec<ExportFailure>,
    /// Outcome of re-rendering from the KMZ archive, when one was produced.
    pub archive_render: Option<Result<RenderReport, ArchiveError>>,
}

impl ExportReport {
    /// Whether every format produced a download.
    #[must_use]
    pub fn is_success(&self) -> bool {
        self.failures.is_empty()
    }

    /// Formats that failed, sorted.
    #[must_use]
    pub fn failed_formats(&self) -> BTreeSet<ExportFormat> {
        self.failures.iter().map(|failure| failure.format).collect()
    }

    /// One message naming every failing format, or `None` on success.
    ///
    /// # Examples
    /// ```
    /// use regionscout_core::backend::TransportError;
    /// use regionscout_core::export::{ExportError, ExportFailure, ExportReport};
    /// use regionscout_core::query::ExportFormat;
    ///
    /// let mut report = ExportReport::default();
    /// assert!(report.error_message().is_none());
    /// report.failures.push(ExportFailure {
    ///     format: ExportFormat::Excel,
    ///     error: ExportError::Conversion(TransportError::Service { message: "boom".into() }),
    /// });
    /// assert_eq!(
    ///     report.error_message().as_deref(),
    ///     Some("export failed for excel: service error: boom"),
    /// );
    /// ```
    #[must_use]
    pub fn error_message(&self) -> Option<String> {
        if self.failures.is_empty() {
            return None;
        }
        let details: Vec<String> = self
            .failures
            .iter()
            .map(|failure| format!("{}: {}", failure.format, failure.error))
            .collect();
        Some(format!("export failed for {}", details.join("; ")))
    }

    /// Rendering error from the archive path, if parsing failed.
    #[must_use]
    pub fn archive_error(&self) -> Option<&ArchiveError> {
        self.archive_render.as_ref()?.as_ref().err()
    }
}

/// Inputs shared by every format of one export.
#[derive(Debug, Clone, Copy)]
pub struct ExportJob<'a> {
    /// Result set to export.
    pub places: &'a [PlaceResult],
    /// Formats to produce.
    pub formats: &'a BTreeSet<ExportFormat>,
    /// Selected region, sent with the KMZ conversion.
    pub bbox: BoundingBox,
    /// Query text, used for filenames and the archive's search term.
    pub query: &'a str,
}

impl<'a> ExportJob<'a> {
    /// Export `places` as requested by `request`.
    #[must_use]
    pub fn for_request(request: &'a QueryRequest, places: &'a [PlaceResult]) -> Self {
        Self {
            places,
            formats: &request.formats,
            bbox: request.bbox,
            query: &request.text_query,
        }
    }
}

/// Filename for `format` given the query text.
///
/// JSON always uses [`JSON_FILENAME`]; other formats replace every run of
/// whitespace in the query with `_`.
///
/// # Examples
/// ```
/// use regionscout_core::export::artifact_filename;
/// use regionscout_core::query::ExportFormat;
///
/// assert_eq!(artifact_filename("coffee  shops\tnearby", ExportFormat::Excel), "coffee_shops_nearby.xlsx");
/// assert_eq!(artifact_filename("coffee shops", ExportFormat::Json), "response.json");
/// ```
#[must_use]
pub fn artifact_filename(query: &str, format: ExportFormat) -> String {
    if format == ExportFormat::Json {
        return JSON_FILENAME.to_owned();
    }
    let mut stem = String::with_capacity(query.len());
    let mut in_whitespace = false;
    for ch in query.chars() {
        if ch.is_whitespace() {
            if !in_whitespace {
                stem.push('_');
            }
            in_whitespace = true;
        } else {
            stem.push(ch);
            in_whitespace = false;
        }
    }
    format!("{stem}.{}", format.extension())
}

type Conversion<'a> = LocalBoxFuture<'a, (ExportFormat, Result<Vec<u8>, ExportError>)>;

/// Runs the per-format conversions of an export.
#[derive(Debug, Default, Clone, Copy)]
pub struct ExportPipeline;

impl ExportPipeline {
    /// Create a pipeline.
    #[must_use]
    pub fn new() -> Self {
        Self
    }

    /// Produce every format in `job` and save the artifacts.
    ///
    /// Conversions run concurrently; downloads and the KMZ re-render happen
    /// one at a time as conversions finish, in whatever order that is.
    pub async fn run<C, T, S>(
        &self,
        converter: &C,
        target: &mut T,
        renderer: &mut MarkerRenderer,
        surface: &mut S,
        job: ExportJob<'_>,
    ) -> ExportReport
    where
        C: ArtifactConverter + ?Sized,
        T: DownloadTarget + ?Sized,
        S: MarkerSurface + ?Sized,
    {
        let mut pending: FuturesUnordered<Conversion<'_>> = job
            .formats
            .iter()
            .map(|format| convert(converter, job, *format))
            .collect();
        debug!("dispatched {} conversions", pending.len());

        let mut report = ExportReport::default();
        while let Some((format, outcome)) = pending.next().await {
            let payload = match outcome {
                Ok(payload) => payload,
                Err(error) => {
                    warn!("{format} conversion failed: {error}");
                    report.failures.push(ExportFailure { format, error });
                    continue;
                }
            };

            let artifact = ExportArtifact {
                format,
                payload,
                suggested_filename: artifact_filename(job.query, format),
            };
            match trigger_download(target, &artifact) {
                Ok(()) => report.downloads.push(DownloadedArtifact {
                    format,
                    filename: artifact.suggested_filename.clone(),
                    size: artifact.payload.len(),
                }),
                Err(error) => {
                    warn!("{format} download failed: {error}");
                    report.failures.push(ExportFailure {
                        format,
                        error: error.into(),
                    });
                }
            }

            if format == ExportFormat::Kmz {
                let rendered = renderer.render_archive(surface, &artifact.payload);
                if let Err(err) = &rendered {
                    warn!("exported archive could not be rendered: {err}");
                }
                report.archive_render = Some(rendered);
            }
        }
        report
    }
}

fn convert<'a, C>(converter: &'a C, job: ExportJob<'a>, format: ExportFormat) -> Conversion<'a>
where
    C: ArtifactConverter + ?Sized,
{
    Box::pin(async move {
        let outcome = match format {
            ExportFormat::Json => {
                serde_json::to_vec_pretty(job.places).map_err(|err| ExportError::Serialize {
                    message: err.to_string(),
                })
            }
            ExportFormat::Excel => converter
                .convert_excel(&ExcelRequest {
                    places: job.places,
                })
                .await
                .map_err(ExportError::from),
            ExportFormat::Kmz => converter
                .convert_kmz(&KmzRequest::new(job.places, &job.bbox, job.query))
                .await
                .map_err(ExportError::from),
        };
        (format, outcome)
    })
}
