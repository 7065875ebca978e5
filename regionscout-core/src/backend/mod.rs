//! Collaborator traits for the search and conversion services.
//!
//! The core never speaks HTTP. Hosts supply an implementation of
//! [`PlaceSearch`] and [`ArtifactConverter`]; `regionscout-data` provides one
//! backed by `reqwest`, and [`crate::test_support::StubBackend`] a
//! deterministic one for tests.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::query::{ApiKey, QueryRequest};
use crate::{BoundingBox, PlaceResult};

/// Transport-level errors encountered while calling a collaborator.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[non_exhaustive]
pub enum TransportError {
    /// The service answered with a non-success status.
    #[error("request to {url} failed with status {status}: {message}")]
    Http {
        /// Fully qualified request URL.
        url: String,
        /// HTTP status code.
        status: u16,
        /// The service's `detail` text, or the status reason.
        message: String,
    },
    /// The request could not be delivered.
    #[error("network error contacting {url}: {message}")]
    Network {
        /// Fully qualified request URL.
        url: String,
        /// Transport error description.
        message: String,
    },
    /// The request did not complete in time.
    #[error("request to {url} timed out")]
    Timeout {
        /// Fully qualified request URL.
        url: String,
    },
    /// The service reported a failure in a successful response body.
    #[error("service error: {message}")]
    Service {
        /// Error text reported by the service.
        message: String,
    },
    /// The response body could not be decoded.
    #[error("failed to decode response from {url}: {message}")]
    Parse {
        /// Fully qualified request URL.
        url: String,
        /// Decoder message.
        message: String,
    },
}

/// Body of the estimator call.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EstimateRequest {
    /// Free-text place query.
    pub text_query: String,
    /// Places API key.
    pub google_api_key: ApiKey,
    /// Region to estimate for.
    #[serde(flatten)]
    pub bbox: BoundingBox,
}

/// Pre-flight time and cost estimate.
///
/// Times are seconds and costs dollars. Missing fields default to zero, which
/// is what the estimator returns when nothing matches.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Estimate {
    /// Number of matching places.
    pub places: u64,
    /// Time for the basic search.
    pub basic_time: f64,
    /// Cost of the basic search.
    pub basic_cost: f64,
    /// Additional time for review summaries.
    pub reviews_time: f64,
    /// Additional cost of review summaries.
    pub reviews_cost: f64,
    /// Additional time for photo summaries.
    pub photos_time: f64,
    /// Additional cost of photo summaries.
    pub photos_cost: f64,
    /// Time with every tier enabled.
    pub time_everything: f64,
    /// Cost with every tier enabled.
    pub cost_everything: f64,
}

/// Body of the archive conversion call.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct KmzRequest<'a> {
    /// Places to convert.
    pub data: &'a [PlaceResult],
    /// Closed `[lng, lat]` ring of the search area.
    pub bbox: [[f64; 2]; 5],
    /// Query text, used for naming inside the archive.
    pub search_term: &'a str,
}

impl<'a> KmzRequest<'a> {
    /// Build the request for `places` found inside `bbox`.
    #[must_use]
    pub fn new(places: &'a [PlaceResult], bbox: &BoundingBox, search_term: &'a str) -> Self {
        Self {
            data: places,
            bbox: bbox.polygon_ring(),
            search_term,
        }
    }
}

/// Body of the spreadsheet conversion call.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct ExcelRequest<'a> {
    /// Places to convert.
    pub places: &'a [PlaceResult],
}

/// The primary search collaborator.
#[async_trait(?Send)]
pub trait PlaceSearch {
    /// Run a place search for a validated request.
    async fn search(&self, request: &QueryRequest) -> Result<Vec<PlaceResult>, TransportError>;

    /// Estimate time and cost of a search.
    async fn estimate(&self, request: &EstimateRequest) -> Result<Estimate, TransportError>;
}

/// The format conversion collaborator.
#[async_trait(?Send)]
pub trait ArtifactConverter {
    /// Convert places into a KMZ archive.
    async fn convert_kmz(&self, request: &KmzRequest<'_>) -> Result<Vec<u8>, TransportError>;

    /// Convert places into a spreadsheet.
    async fn convert_excel(&self, request: &ExcelRequest<'_>) -> Result<Vec<u8>, TransportError>;
}

/// Convenience bound for a single service object offering both roles.
pub trait Backend: PlaceSearch + ArtifactConverter {}

impl<T> Backend for T where T: PlaceSearch + ArtifactConverter + ?Sized {}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use serde_json::json;

    #[rstest]
    fn kmz_request_carries_closed_ring() {
        let bbox = BoundingBox {
            lat_sw: 1.0,
            lng_sw: 2.0,
            lat_ne: 3.0,
            lng_ne: 4.0,
        };
        let places = [PlaceResult::new("A", 1.5, 2.5)];
        let value = serde_json::to_value(KmzRequest::new(&places, &bbox, "tea rooms"))
            .expect("serialise");
        assert_eq!(
            value["bbox"],
            json!([[2.0, 1.0], [2.0, 3.0], [4.0, 3.0], [4.0, 1.0], [2.0, 1.0]])
        );
        assert_eq!(value["search_term"], "tea rooms");
        assert_eq!(value["data"][0]["name"]["original_name"], "A");
    }

    #[rstest]
    fn empty_estimate_defaults_to_zero() {
        let estimate: Estimate = serde_json::from_value(json!({})).expect("decode");
        assert_eq!(estimate, Estimate::default());
    }

    #[rstest]
    fn estimate_request_is_flat() {
        let request = EstimateRequest {
            text_query: "museums".into(),
            google_api_key: ApiKey::new("key").expect("non-blank"),
            bbox: BoundingBox {
                lat_sw: 1.0,
                lng_sw: 2.0,
                lat_ne: 3.0,
                lng_ne: 4.0,
            },
        };
        let value = serde_json::to_value(&request).expect("serialise");
        assert_eq!(
            value,
            json!({
                "text_query": "museums",
                "google_api_key": "key",
                "lat_sw": 1.0,
                "lng_sw": 2.0,
                "lat_ne": 3.0,
                "lng_ne": 4.0,
            })
        );
    }
}
