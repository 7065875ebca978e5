//! One interactive session: map, selection, submission and export.
//!
//! [`Session`] owns a single instance of each controller together with the
//! map surface, the backend and the download target, and wires the flow
//! from a drawn rectangle to saved artifacts.

use geo::Rect;
use log::{debug, info, warn};
use thiserror::Error;

use crate::backend::{Backend, Estimate, EstimateRequest, TransportError};
use crate::download::DownloadTarget;
use crate::export::{ExportJob, ExportPipeline, ExportReport};
use crate::map::{MapSurface, MarkerId};
use crate::marker::{MarkerRenderer, RenderReport};
use crate::query::{
    ApiKey, Completion, QueryForm, QueryOrchestrator, SubmitError, Ticket, ValidationError,
};
use crate::selection::{
    OverlayId, RegionSelectionController, SelectionError, SelectionEvent, WatchId,
};
use crate::PlaceResult;

/// Errors surfaced by [`Session::submit`] and [`Session::apply_search`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SessionError {
    /// The submission was refused before any request was sent.
    #[error(transparent)]
    Submit(#[from] SubmitError),
    /// The primary search failed; markers and exports were left untouched.
    #[error("search failed: {0}")]
    Search(#[source] TransportError),
}

/// Errors surfaced by [`Session::estimate`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EstimateError {
    /// Inputs were missing.
    #[error(transparent)]
    Invalid(#[from] ValidationError),
    /// The estimator call failed.
    #[error("estimate failed: {0}")]
    Transport(#[from] TransportError),
}

/// Results of an applied search.
#[derive(Debug)]
pub struct SearchOutcome {
    /// Places returned by the search service.
    pub places: Vec<PlaceResult>,
    /// Outcome of the structured render.
    pub render: RenderReport,
    /// Outcome of the per-format export.
    pub export: ExportReport,
}

/// Whether a search outcome was applied.
#[derive(Debug)]
pub enum SubmitOutcome {
    /// The outcome belonged to the latest request and was applied.
    Completed(SearchOutcome),
    /// The outcome belonged to a superseded request and was discarded.
    Stale,
}

/// Abandons the in-flight submission when dropped before it settles.
struct PendingSearch<'a> {
    orchestrator: &'a mut QueryOrchestrator,
    settled: bool,
}

impl<'a> PendingSearch<'a> {
    const fn new(orchestrator: &'a mut QueryOrchestrator) -> Self {
        Self {
            orchestrator,
            settled: false,
        }
    }

    fn settle(mut self) {
        self.settled = true;
    }
}

impl Drop for PendingSearch<'_> {
    fn drop(&mut self) {
        if !self.settled {
            debug!("submission dropped before the search answered");
            self.orchestrator.abandon();
        }
    }
}

/// State and collaborators of one session.
#[derive(Debug)]
pub struct Session<M, B, T> {
    surface: M,
    backend: B,
    target: T,
    selection: RegionSelectionController,
    renderer: MarkerRenderer,
    orchestrator: QueryOrchestrator,
    pipeline: ExportPipeline,
}

impl<M, B, T> Session<M, B, T>
where
    M: MapSurface,
    B: Backend,
    T: DownloadTarget,
{
    /// Start a session with nothing selected.
    pub fn new(surface: M, backend: B, target: T) -> Self {
        Self {
            surface,
            backend,
            target,
            selection: RegionSelectionController::new(),
            renderer: MarkerRenderer::new(),
            orchestrator: QueryOrchestrator::new(),
            pipeline: ExportPipeline::new(),
        }
    }

    /// The map surface.
    pub fn surface(&self) -> &M {
        &self.surface
    }

    /// The map surface, for hosts that drive its drawing primitive.
    pub fn surface_mut(&mut self) -> &mut M {
        &mut self.surface
    }

    /// The backend.
    pub fn backend(&self) -> &B {
        &self.backend
    }

    /// The download target.
    pub fn target(&self) -> &T {
        &self.target
    }

    /// Selection state.
    pub fn selection(&self) -> &RegionSelectionController {
        &self.selection
    }

    /// Displayed markers.
    pub fn renderer(&self) -> &MarkerRenderer {
        &self.renderer
    }

    /// Submission state.
    pub fn orchestrator(&self) -> &QueryOrchestrator {
        &self.orchestrator
    }

    /// Forward a completed draw gesture.
    ///
    /// # Errors
    ///
    /// See [`RegionSelectionController::on_draw_complete`].
    pub fn draw_complete(
        &mut self,
        overlay: OverlayId,
        geometry: Rect<f64>,
    ) -> Result<SelectionEvent, SelectionError> {
        self.selection
            .on_draw_complete(&mut self.surface, overlay, geometry)
    }

    /// Forward a bounds-changed notification.
    pub fn bounds_changed(&mut self, watch: WatchId, geometry: Rect<f64>) -> Option<SelectionEvent> {
        self.selection.on_bounds_changed(watch, geometry)
    }

    /// Undo the last draw.
    pub fn undo(&mut self) -> SelectionEvent {
        self.selection.undo(&mut self.surface)
    }

    /// Forward a marker click.
    pub fn marker_clicked(&mut self, marker: MarkerId) -> bool {
        self.renderer.on_marker_click(&mut self.surface, marker)
    }

    /// Validate `form` against the current selection and issue a ticket.
    ///
    /// Hosts that send the search themselves pair this with
    /// [`Self::apply_search`]; [`Self::submit`] does both.
    ///
    /// # Errors
    ///
    /// Returns [`SubmitError`] when busy or when validation fails.
    pub fn begin_submission(&mut self, form: &QueryForm) -> Result<Ticket, SubmitError> {
        self.orchestrator.begin(form, self.selection.bbox())
    }

    /// Give up on the in-flight submission; its late outcome is discarded.
    pub fn abandon_submission(&mut self) {
        self.orchestrator.abandon();
    }

    /// Validate, search, render and export.
    ///
    /// Dropping the returned future while the search is pending abandons the
    /// submission, so the session is not left loading.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::Submit`] when the form is refused and
    /// [`SessionError::Search`] when the search fails. Export failures do not
    /// fail the submission; they are listed in the [`ExportReport`].
    pub async fn submit(&mut self, form: &QueryForm) -> Result<SubmitOutcome, SessionError> {
        let ticket = self.begin_submission(form)?;
        let pending = PendingSearch::new(&mut self.orchestrator);
        let outcome = self.backend.search(ticket.request()).await;
        pending.settle();
        self.apply_search(&ticket, outcome).await
    }

    /// Apply the outcome of the search issued for `ticket`.
    ///
    /// Outcomes of superseded tickets are discarded without touching the
    /// markers. On success the structured render completes before any
    /// conversion is dispatched.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::Search`] when `outcome` is a failure of the
    /// latest request.
    pub async fn apply_search(
        &mut self,
        ticket: &Ticket,
        outcome: Result<Vec<PlaceResult>, TransportError>,
    ) -> Result<SubmitOutcome, SessionError> {
        let places = match self.orchestrator.complete(ticket.id(), outcome) {
            Completion::Stale => return Ok(SubmitOutcome::Stale),
            Completion::Applied(Err(err)) => {
                warn!("search {:?} failed: {err}", ticket.id());
                return Err(SessionError::Search(err));
            }
            Completion::Applied(Ok(places)) => places,
        };

        info!("search returned {} places", places.len());
        let render = self.renderer.render_places(&mut self.surface, &places);
        let job = ExportJob::for_request(ticket.request(), &places);
        let export = self
            .pipeline
            .run(
                &self.backend,
                &mut self.target,
                &mut self.renderer,
                &mut self.surface,
                job,
            )
            .await;
        if let Some(message) = export.error_message() {
            warn!("{message}");
        }
        debug!("export finished with {} downloads", export.downloads.len());

        Ok(SubmitOutcome::Completed(SearchOutcome {
            places,
            render,
            export,
        }))
    }

    /// Ask the estimator how long and how much a search would cost.
    ///
    /// Purely informational; no session state changes.
    ///
    /// # Errors
    ///
    /// Returns [`EstimateError::Invalid`] without a selection, query or key
    /// and [`EstimateError::Transport`] when the call fails.
    pub async fn estimate(&self, query: &str, google_api_key: &str) -> Result<Estimate, EstimateError> {
        let bbox = self
            .selection
            .bbox()
            .ok_or(ValidationError::MissingBoundingBox)?;
        let text_query = query.trim();
        if text_query.is_empty() {
            return Err(ValidationError::MissingQuery.into());
        }
        let google_api_key = ApiKey::new(google_api_key).ok_or(ValidationError::MissingGoogleKey)?;
        let request = EstimateRequest {
            text_query: text_query.to_owned(),
            google_api_key,
            bbox,
        };
        Ok(self.backend.estimate(&request).await?)
    }
}
