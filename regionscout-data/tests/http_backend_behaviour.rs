#![expect(
    clippy::expect_used,
    reason = "behaviour tests use expect for readable failures"
)]

//! Behavioural tests for [`HttpBackend`] against a one-shot local server.

mod support;

use std::cell::{Cell, RefCell};
use std::collections::BTreeSet;
use std::time::Duration;

use regionscout_core::backend::{
    ArtifactConverter, Estimate, EstimateRequest, KmzRequest, PlaceSearch, TransportError,
};
use regionscout_core::query::{ApiKey, ExportFormat, QueryForm, QueryRequest};
use regionscout_core::{BoundingBox, PlaceResult};
use regionscout_data::HttpBackend;
use rstest::{fixture, rstest};
use rstest_bdd_macros::{given, scenario, then, when};
use serde_json::json;

use support::{
    CannedResponse, RecordedRequest, backend_for, block_on, exchange, local_listener,
    serve_silently,
};

const KMZ_BYTES: &[u8] = b"PK\x03\x04not-really-a-zip";

fn bbox() -> BoundingBox {
    BoundingBox {
        lat_sw: 40.4,
        lng_sw: -80.0,
        lat_ne: 40.5,
        lng_ne: -79.9,
    }
}

fn query_request() -> QueryRequest {
    let form = QueryForm {
        text_query: "coffee".into(),
        prompt_info: "somewhere quiet".into(),
        formats: BTreeSet::from([ExportFormat::Json, ExportFormat::Kmz]),
        google_api_key: "g-key".into(),
        ..QueryForm::default()
    };
    QueryRequest::from_form(&form, Some(bbox())).expect("valid form")
}

fn estimate_request() -> EstimateRequest {
    EstimateRequest {
        text_query: "coffee".into(),
        google_api_key: ApiKey::new("g-key").expect("non-blank key"),
        bbox: bbox(),
    }
}

fn sample_places() -> Vec<PlaceResult> {
    vec![
        PlaceResult::new("Cafe A", 40.44, -79.99),
        PlaceResult::new("Cafe B", 40.45, -79.98),
    ]
}

#[derive(Debug)]
enum Outcome {
    Places(Result<Vec<PlaceResult>, TransportError>),
    Estimate(Result<Estimate, TransportError>),
    Bytes(Result<Vec<u8>, TransportError>),
}

impl Outcome {
    fn error(&self) -> Option<&TransportError> {
        match self {
            Self::Places(result) => result.as_ref().err(),
            Self::Estimate(result) => result.as_ref().err(),
            Self::Bytes(result) => result.as_ref().err(),
        }
    }
}

/// World state for HTTP backend scenarios.
#[derive(Debug, Default)]
struct HttpWorld {
    response: RefCell<Option<CannedResponse>>,
    unreachable: Cell<bool>,
    outcome: RefCell<Option<Outcome>>,
    request: RefCell<Option<RecordedRequest>>,
}

impl HttpWorld {
    fn run<F>(&self, call: F) -> Outcome
    where
        F: AsyncFnOnce(HttpBackend) -> Outcome,
    {
        if self.unreachable.get() {
            return block_on(async {
                let (listener, addr) = local_listener().await;
                drop(listener);
                call(backend_for(addr, None)).await
            });
        }
        let response = self
            .response
            .borrow_mut()
            .take()
            .expect("a canned response is configured");
        let (outcome, request) = block_on(exchange(response, call));
        self.request.replace(Some(request));
        outcome
    }

    fn request_json(&self) -> serde_json::Value {
        self.request
            .borrow()
            .as_ref()
            .expect("the server saw a request")
            .json()
    }

    fn with_error<R>(&self, check: impl FnOnce(&TransportError) -> R) -> R {
        let outcome = self.outcome.borrow();
        let error = outcome
            .as_ref()
            .and_then(Outcome::error)
            .expect("the call failed");
        check(error)
    }
}

#[fixture]
fn world() -> HttpWorld {
    HttpWorld::default()
}

// --- Given steps ---

#[given("a service answering 200 with two places")]
fn service_with_places(world: &HttpWorld) {
    let body = serde_json::to_value(sample_places()).expect("places serialise");
    world.response.replace(Some(CannedResponse::json(200, &body)));
}

#[given("a service answering {status} with detail {detail}")]
fn service_with_detail(world: &HttpWorld, status: u16, detail: String) {
    let body = json!({ "detail": detail.trim_matches('"') });
    world
        .response
        .replace(Some(CannedResponse::json(status, &body)));
}

#[given("a service answering 200 with an error body")]
fn service_with_error_body(world: &HttpWorld) {
    let body = json!({ "error": "estimate unavailable" });
    world.response.replace(Some(CannedResponse::json(200, &body)));
}

#[given("a service answering 200 with archive bytes")]
fn service_with_archive(world: &HttpWorld) {
    world.response.replace(Some(CannedResponse::bytes(
        "application/vnd.google-earth.kmz",
        KMZ_BYTES,
    )));
}

#[given("an unreachable service")]
fn unreachable_service(world: &HttpWorld) {
    world.unreachable.set(true);
}

// --- When steps ---

#[when("I search for coffee")]
fn search_for_coffee(world: &HttpWorld) {
    let request = query_request();
    let outcome = world.run(async move |backend| Outcome::Places(backend.search(&request).await));
    world.outcome.replace(Some(outcome));
}

#[when("I ask for an estimate")]
fn ask_for_estimate(world: &HttpWorld) {
    let request = estimate_request();
    let outcome =
        world.run(async move |backend| Outcome::Estimate(backend.estimate(&request).await));
    world.outcome.replace(Some(outcome));
}

#[when("I convert the places to kmz")]
fn convert_to_kmz(world: &HttpWorld) {
    let outcome = world.run(async |backend| {
        let places = sample_places();
        let area = bbox();
        let request = KmzRequest::new(&places, &area, "coffee");
        Outcome::Bytes(backend.convert_kmz(&request).await)
    });
    world.outcome.replace(Some(outcome));
}

// --- Then steps ---

#[then("{count} places are returned")]
fn places_returned(world: &HttpWorld, count: usize) {
    let outcome = world.outcome.borrow();
    match outcome.as_ref() {
        Some(Outcome::Places(Ok(places))) => {
            assert_eq!(places.len(), count);
            assert_eq!(places[0].name.label(), "Cafe A");
        }
        other => panic!("expected places, got {other:?}"),
    }
}

#[then("the request was a POST to {path}")]
fn request_was_post(world: &HttpWorld, path: String) {
    let request = world.request.borrow();
    let request = request.as_ref().expect("the server saw a request");
    assert_eq!(request.method, "POST");
    assert_eq!(request.path, path);
}

#[then("the request body carries the corners at the top level")]
fn body_has_corners(world: &HttpWorld) {
    let body = world.request_json();
    assert_eq!(body["lat_sw"], 40.4);
    assert_eq!(body["lng_sw"], -80.0);
    assert_eq!(body["lat_ne"], 40.5);
    assert_eq!(body["lng_ne"], -79.9);
    assert_eq!(body["text_query"], "coffee");
    assert_eq!(body["google_api_key"], "g-key");
    assert_eq!(body["llm_key"], "");
}

#[then("the request body lists formats under format")]
fn body_has_formats(world: &HttpWorld) {
    let body = world.request_json();
    assert_eq!(body["format"], json!(["json", "kmz"]));
    assert!(body.get("formats").is_none());
}

#[then("an HTTP error with status {status} and message {message} is returned")]
fn http_error_returned(world: &HttpWorld, status: u16, message: String) {
    world.with_error(|error| match error {
        TransportError::Http {
            status: actual,
            message: actual_message,
            url,
        } => {
            assert_eq!(*actual, status);
            assert_eq!(actual_message, message.trim_matches('"'));
            assert!(url.ends_with("/search_nearby"), "url was {url}");
        }
        other => panic!("expected an HTTP error, got {other:?}"),
    });
}

#[then("a service error is returned")]
fn service_error_returned(world: &HttpWorld) {
    world.with_error(|error| {
        assert_eq!(
            *error,
            TransportError::Service {
                message: "estimate unavailable".into()
            }
        );
    });
}

#[then("the archive bytes are returned")]
fn archive_bytes_returned(world: &HttpWorld) {
    let outcome = world.outcome.borrow();
    match outcome.as_ref() {
        Some(Outcome::Bytes(Ok(bytes))) => assert_eq!(bytes.as_slice(), KMZ_BYTES),
        other => panic!("expected bytes, got {other:?}"),
    }
}

#[then("the request body carries a closed ring")]
fn body_has_ring(world: &HttpWorld) {
    let body = world.request_json();
    let ring = body["bbox"].as_array().expect("ring array");
    assert_eq!(ring.len(), 5);
    assert_eq!(ring[0], ring[4]);
    assert_eq!(ring[0], json!([-80.0, 40.4]));
    assert_eq!(body["search_term"], "coffee");
    assert_eq!(body["data"].as_array().map(Vec::len), Some(2));
}

#[then("a network error is returned")]
fn network_error_returned(world: &HttpWorld) {
    world.with_error(|error| {
        assert!(
            matches!(error, TransportError::Network { .. }),
            "expected a network error, got {error:?}"
        );
    });
}

macro_rules! register_scenario {
    ($fn_name:ident, $title:literal) => {
        #[scenario(path = "tests/features/http_backend.feature", name = $title)]
        fn $fn_name(world: HttpWorld) {
            let _ = world;
        }
    };
}

register_scenario!(
    search_posts_flattened_query,
    "a search posts the flattened query and decodes places"
);
register_scenario!(failing_search_detail, "a failing search surfaces the detail text");
register_scenario!(
    estimator_error_body,
    "an estimator error body becomes a service error"
);
register_scenario!(archive_raw_bytes, "an archive conversion returns the raw bytes");
register_scenario!(unreachable_service_network, "an unreachable service reports a network error");

#[rstest]
fn silent_service_times_out() {
    let outcome = block_on(async {
        let (listener, addr) = local_listener().await;
        let server = tokio::spawn(serve_silently(listener));
        let backend = backend_for(addr, Some(Duration::from_millis(200)));
        let outcome = backend.estimate(&estimate_request()).await;
        server.abort();
        outcome
    });
    assert!(
        matches!(outcome, Err(TransportError::Timeout { ref url }) if url.ends_with("/estimator")),
        "expected a timeout, got {outcome:?}"
    );
}

#[rstest]
fn undecodable_reply_is_a_parse_error() {
    let response = CannedResponse::bytes("application/json", b"<html>oops</html>");
    let (outcome, _) = block_on(exchange(response, async |backend| {
        backend.search(&query_request()).await
    }));
    assert!(
        matches!(outcome, Err(TransportError::Parse { .. })),
        "expected a parse error, got {outcome:?}"
    );
}
