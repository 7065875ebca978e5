//! Deterministic collaborators and archive builders for unit and behaviour
//! tests.

use std::cell::{Cell, RefCell};
use std::io::{Cursor, Write};

use async_trait::async_trait;
use quick_xml::escape::escape;
use serde_json::Value;
use zip::ZipWriter;
use zip::write::SimpleFileOptions;

use crate::backend::{
    ArtifactConverter, Estimate, EstimateRequest, ExcelRequest, KmzRequest, PlaceSearch,
    TransportError,
};
use crate::query::QueryRequest;
use crate::{BoundingBox, PlaceName, PlaceResult};

/// Base URL used in stubbed error messages.
pub const STUB_BASE_URL: &str = "http://stub.invalid";

#[derive(Debug, Clone)]
enum Reply {
    Generated,
    Bytes(Vec<u8>),
    Error(TransportError),
}

/// In-memory backend answering every endpoint from canned data.
///
/// By default the search returns the configured places, the KMZ conversion
/// builds a real archive from the request (like the archive service does)
/// and the spreadsheet conversion returns placeholder bytes.
#[derive(Debug)]
pub struct StubBackend {
    places: Vec<PlaceResult>,
    search_error: Option<TransportError>,
    estimate: Result<Estimate, TransportError>,
    kmz: Reply,
    excel: Reply,
    search_calls: Cell<usize>,
    estimate_calls: Cell<usize>,
    kmz_calls: Cell<usize>,
    excel_calls: Cell<usize>,
    last_kmz_request: RefCell<Option<Value>>,
    last_search_request: RefCell<Option<Value>>,
}

impl Default for StubBackend {
    fn default() -> Self {
        Self::with_places(Vec::new())
    }
}

impl StubBackend {
    /// Backend whose search returns `places`.
    #[must_use]
    pub fn with_places(places: Vec<PlaceResult>) -> Self {
        Self {
            places,
            search_error: None,
            estimate: Ok(Estimate::default()),
            kmz: Reply::Generated,
            excel: Reply::Generated,
            search_calls: Cell::new(0),
            estimate_calls: Cell::new(0),
            kmz_calls: Cell::new(0),
            excel_calls: Cell::new(0),
            last_kmz_request: RefCell::new(None),
            last_search_request: RefCell::new(None),
        }
    }

    /// Make the search fail with `error`.
    #[must_use]
    pub fn failing_search(mut self, error: TransportError) -> Self {
        self.search_error = Some(error);
        self
    }

    /// Make the spreadsheet conversion fail with `error`.
    #[must_use]
    pub fn failing_excel(mut self, error: TransportError) -> Self {
        self.excel = Reply::Error(error);
        self
    }

    /// Make the archive conversion fail with `error`.
    #[must_use]
    pub fn failing_kmz(mut self, error: TransportError) -> Self {
        self.kmz = Reply::Error(error);
        self
    }

    /// Return `bytes` from the archive conversion instead of a built archive.
    #[must_use]
    pub fn with_kmz_bytes(mut self, bytes: Vec<u8>) -> Self {
        self.kmz = Reply::Bytes(bytes);
        self
    }

    /// Answer estimates with `estimate`.
    #[must_use]
    pub fn with_estimate(mut self, estimate: Estimate) -> Self {
        self.estimate = Ok(estimate);
        self
    }

    /// Make the estimator fail with `error`.
    #[must_use]
    pub fn failing_estimate(mut self, error: TransportError) -> Self {
        self.estimate = Err(error);
        self
    }

    /// Number of search calls received.
    #[must_use]
    pub fn search_calls(&self) -> usize {
        self.search_calls.get()
    }

    /// Number of estimate calls received.
    #[must_use]
    pub fn estimate_calls(&self) -> usize {
        self.estimate_calls.get()
    }

    /// Number of archive conversions received.
    #[must_use]
    pub fn kmz_calls(&self) -> usize {
        self.kmz_calls.get()
    }

    /// Number of spreadsheet conversions received.
    #[must_use]
    pub fn excel_calls(&self) -> usize {
        self.excel_calls.get()
    }

    /// Total calls across every endpoint.
    #[must_use]
    pub fn total_calls(&self) -> usize {
        self.search_calls() + self.estimate_calls() + self.kmz_calls() + self.excel_calls()
    }

    /// JSON body of the most recent archive conversion.
    #[must_use]
    pub fn last_kmz_request(&self) -> Option<Value> {
        self.last_kmz_request.borrow().clone()
    }

    /// JSON body of the most recent search.
    #[must_use]
    pub fn last_search_request(&self) -> Option<Value> {
        self.last_search_request.borrow().clone()
    }
}

fn bump(counter: &Cell<usize>) {
    counter.set(counter.get() + 1);
}

#[async_trait(?Send)]
impl PlaceSearch for StubBackend {
    async fn search(&self, request: &QueryRequest) -> Result<Vec<PlaceResult>, TransportError> {
        bump(&self.search_calls);
        *self.last_search_request.borrow_mut() = serde_json::to_value(request).ok();
        match &self.search_error {
            Some(error) => Err(error.clone()),
            None => Ok(self.places.clone()),
        }
    }

    async fn estimate(&self, _request: &EstimateRequest) -> Result<Estimate, TransportError> {
        bump(&self.estimate_calls);
        self.estimate.clone()
    }
}

#[async_trait(?Send)]
impl ArtifactConverter for StubBackend {
    async fn convert_kmz(&self, request: &KmzRequest<'_>) -> Result<Vec<u8>, TransportError> {
        bump(&self.kmz_calls);
        *self.last_kmz_request.borrow_mut() = serde_json::to_value(request).ok();
        match &self.kmz {
            Reply::Generated => Ok(kmz_from_entries(&[(
                "doc.kml",
                kml_for_request(request).as_bytes(),
            )])),
            Reply::Bytes(bytes) => Ok(bytes.clone()),
            Reply::Error(error) => Err(error.clone()),
        }
    }

    async fn convert_excel(&self, request: &ExcelRequest<'_>) -> Result<Vec<u8>, TransportError> {
        bump(&self.excel_calls);
        match &self.excel {
            Reply::Generated => Ok(format!("xlsx:{}", request.places.len()).into_bytes()),
            Reply::Bytes(bytes) => Ok(bytes.clone()),
            Reply::Error(error) => Err(error.clone()),
        }
    }
}

/// An HTTP error as the HTTP backend would report it for `path`.
#[must_use]
pub fn http_error(path: &str, status: u16, message: &str) -> TransportError {
    TransportError::Http {
        url: format!("{STUB_BASE_URL}{path}"),
        status,
        message: message.to_owned(),
    }
}

/// Build a ZIP archive from `(name, bytes)` entries.
///
/// # Panics
///
/// Panics if the in-memory writer fails, which only happens on allocation
/// failure.
#[must_use]
pub fn kmz_from_entries(entries: &[(&str, &[u8])]) -> Vec<u8> {
    let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
    let options = SimpleFileOptions::default();
    for (name, bytes) in entries {
        writer
            .start_file(*name, options)
            .expect("in-memory zip entry should start");
        writer
            .write_all(bytes)
            .expect("in-memory zip entry should accept bytes");
    }
    writer
        .finish()
        .expect("in-memory zip should finish")
        .into_inner()
}

/// KML document laid out like the archive service's output.
///
/// The document carries a `Search Area` polygon followed by one point per
/// place, named `original:translated` with `unavailable` for missing parts.
#[must_use]
pub fn search_area_kml(places: &[PlaceResult], bbox: &BoundingBox, search_term: &str) -> String {
    build_kml(places, bbox.polygon_ring(), search_term)
}

fn kml_for_request(request: &KmzRequest<'_>) -> String {
    build_kml(request.data, request.bbox, request.search_term)
}

fn build_kml(places: &[PlaceResult], ring: [[f64; 2]; 5], search_term: &str) -> String {
    let outline: Vec<String> = ring
        .iter()
        .map(|[lng, lat]| format!("{lng},{lat},0"))
        .collect();
    let mut kml = String::from(
        "<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n\
         <kml xmlns=\"http://www.opengis.net/kml/2.2\"><Document>",
    );
    kml.push_str(&format!(
        "<Placemark><name>Search Area</name><description>Search Term: {}</description>\
         <Polygon><outerBoundaryIs><LinearRing><coordinates>{}</coordinates>\
         </LinearRing></outerBoundaryIs></Polygon></Placemark>",
        escape(search_term),
        outline.join(" ")
    ));
    for place in places {
        let name = match &place.name {
            PlaceName::Localised {
                original_name,
                translated_name,
            } => format!(
                "{original_name}:{}",
                translated_name.as_deref().unwrap_or("unavailable")
            ),
            PlaceName::Plain(name) => format!("{name}:unavailable"),
        };
        let coordinate = |value: &crate::Degrees| match value {
            crate::Degrees::Number(number) => number.to_string(),
            crate::Degrees::Text(text) => text.clone(),
            crate::Degrees::Missing => "unavailable".to_owned(),
        };
        kml.push_str(&format!(
            "<Placemark><name>{}</name><Point><coordinates>{},{}</coordinates></Point></Placemark>",
            escape(name.as_str()),
            escape(coordinate(&place.longitude).as_str()),
            escape(coordinate(&place.latitude).as_str()),
        ));
    }
    kml.push_str("</Document></kml>");
    kml
}
