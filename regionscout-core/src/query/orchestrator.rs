//! Submission state machine with request identity.

use log::{debug, warn};
use thiserror::Error;

use super::{QueryForm, QueryRequest, ValidationError};
use crate::BoundingBox;

/// Phase of the submission state machine.
///
/// `Success` and `Failed` report how the last request ended; a new
/// submission is accepted from either of them as if from `Idle`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum QueryPhase {
    /// Ready for a submission.
    #[default]
    Idle,
    /// Checking form state.
    Validating,
    /// Waiting for the search service.
    Submitting,
    /// The last request succeeded.
    Success,
    /// The last request failed.
    Failed,
}

/// Monotonically increasing identity of a dispatched request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct RequestId(pub u64);

/// Permission to send one validated request.
#[derive(Debug, Clone)]
pub struct Ticket {
    id: RequestId,
    request: QueryRequest,
}

impl Ticket {
    /// Identity to pass back to [`QueryOrchestrator::complete`].
    #[must_use]
    pub fn id(&self) -> RequestId {
        self.id
    }

    /// The validated request.
    #[must_use]
    pub fn request(&self) -> &QueryRequest {
        &self.request
    }
}

/// Reasons a submission is refused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum SubmitError {
    /// A request is already in flight.
    #[error("a search is already in progress")]
    Busy,
    /// Form state failed validation.
    #[error(transparent)]
    Invalid(#[from] ValidationError),
}

/// Whether an outcome was applied.
#[derive(Debug, Clone, PartialEq)]
pub enum Completion<T> {
    /// The outcome belongs to the latest request.
    Applied(T),
    /// The outcome belongs to a superseded request and was discarded.
    Stale,
}

/// Drives one session's submissions.
///
/// The orchestrator never performs I/O itself: [`Self::begin`] hands out a
/// [`Ticket`] for the caller to send, and [`Self::complete`] accepts the
/// outcome. Only the latest ticket's outcome is applied.
///
/// # Examples
/// ```
/// use std::collections::BTreeSet;
/// use regionscout_core::BoundingBox;
/// use regionscout_core::query::{
///     Completion, ExportFormat, QueryForm, QueryOrchestrator, SubmitError,
/// };
///
/// let bbox = BoundingBox { lat_sw: 0.0, lng_sw: 0.0, lat_ne: 1.0, lng_ne: 1.0 };
/// let form = QueryForm {
///     text_query: "bakeries".into(),
///     prompt_info: "open late".into(),
///     formats: BTreeSet::from([ExportFormat::Json]),
///     google_api_key: "key".into(),
///     ..QueryForm::default()
/// };
/// let mut orchestrator = QueryOrchestrator::new();
/// let ticket = orchestrator.begin(&form, Some(bbox)).unwrap();
/// assert_eq!(orchestrator.begin(&form, Some(bbox)).unwrap_err(), SubmitError::Busy);
/// let outcome: Result<u32, String> = Ok(3);
/// assert_eq!(orchestrator.complete(ticket.id(), outcome), Completion::Applied(Ok(3)));
/// assert!(!orchestrator.is_loading());
/// ```
#[derive(Debug, Default)]
pub struct QueryOrchestrator {
    phase: QueryPhase,
    last_issued: u64,
    in_flight: Option<RequestId>,
}

impl QueryOrchestrator {
    /// Create an idle orchestrator.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Current phase.
    #[must_use]
    pub fn phase(&self) -> QueryPhase {
        self.phase
    }

    /// Whether a request is in flight and new submissions are refused.
    #[must_use]
    pub fn is_loading(&self) -> bool {
        self.in_flight.is_some()
    }

    /// Validate `form` and, on success, issue a ticket for a new request.
    ///
    /// # Errors
    ///
    /// Returns [`SubmitError::Busy`] while a request is in flight and
    /// [`SubmitError::Invalid`] when validation fails; neither changes the
    /// in-flight request.
    pub fn begin(
        &mut self,
        form: &QueryForm,
        bbox: Option<BoundingBox>,
    ) -> Result<Ticket, SubmitError> {
        if self.is_loading() {
            debug!("submission refused: request {:?} in flight", self.in_flight);
            return Err(SubmitError::Busy);
        }

        self.phase = QueryPhase::Validating;
        let request = match QueryRequest::from_form(form, bbox) {
            Ok(request) => request,
            Err(err) => {
                self.phase = QueryPhase::Idle;
                debug!("submission rejected: {err}");
                return Err(err.into());
            }
        };

        self.last_issued += 1;
        let id = RequestId(self.last_issued);
        self.in_flight = Some(id);
        self.phase = QueryPhase::Submitting;
        debug!("request {id:?} dispatched for {:?}", request.text_query);
        Ok(Ticket { id, request })
    }

    /// Record the outcome of request `id`.
    ///
    /// Outcomes of anything but the in-flight request are discarded and
    /// leave the state untouched. Otherwise the loading flag is cleared
    /// whatever the outcome.
    pub fn complete<T, E>(&mut self, id: RequestId, outcome: Result<T, E>) -> Completion<Result<T, E>> {
        if self.in_flight != Some(id) {
            warn!("discarding response for superseded request {id:?}");
            return Completion::Stale;
        }
        self.in_flight = None;
        self.phase = if outcome.is_ok() {
            QueryPhase::Success
        } else {
            QueryPhase::Failed
        };
        debug!("request {id:?} finished: {:?}", self.phase);
        Completion::Applied(outcome)
    }

    /// Give up on the in-flight request.
    ///
    /// The loading flag is cleared and a late outcome for the abandoned
    /// request will be reported as [`Completion::Stale`].
    pub fn abandon(&mut self) {
        if let Some(id) = self.in_flight.take() {
            debug!("request {id:?} abandoned");
        }
        self.phase = QueryPhase::Idle;
    }
}
