//! HTTP backend for the search, estimator and conversion services.
//!
//! [`HttpBackend`] implements [`regionscout_core::backend::PlaceSearch`] and
//! [`regionscout_core::backend::ArtifactConverter`] by posting JSON bodies to
//! the service endpoints below a configurable base URL:
//!
//! | Endpoint | Request | Response |
//! |---|---|---|
//! | `POST /search_nearby` | flattened query | list of places |
//! | `POST /estimator` | query, key and corners | estimate or `{}` |
//! | `POST /get_kmz` | `{data, bbox, search_term}` | KMZ bytes |
//! | `POST /get_excel` | `{places}` | XLSX bytes |
//!
//! Non-success statuses are reported with the service's `detail` text.
//!
//! # Example
//!
//! ```no_run
//! use std::time::Duration;
//! use regionscout_data::{HttpBackend, HttpBackendConfig};
//!
//! let config = HttpBackendConfig::new("http://127.0.0.1:8000")
//!     .with_timeout(Duration::from_secs(120))
//!     .with_user_agent("my-app/1.0");
//! let backend = HttpBackend::with_config(config)?;
//! # Ok::<(), regionscout_data::BackendBuildError>(())
//! ```

mod backend;
mod reply;

pub use backend::{
    BackendBuildError, DEFAULT_BASE_URL, DEFAULT_USER_AGENT, Endpoint, HttpBackend,
    HttpBackendConfig,
};
