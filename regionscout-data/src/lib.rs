//! HTTP adapters for the RegionScout backend services.
//!
//! Responsibilities:
//! - Implement the core collaborator traits over HTTP with `reqwest`.
//! - Translate service error bodies into [`regionscout_core::backend::TransportError`].
//!
//! Boundaries:
//! - Do not encode domain rules (live in `regionscout-core`).
//! - Never log request bodies; they carry credentials.
//!
//! Invariants:
//! - No global mutable state.
#![forbid(unsafe_code)]

pub mod http;

pub use http::{BackendBuildError, DEFAULT_BASE_URL, DEFAULT_USER_AGENT, HttpBackend, HttpBackendConfig};
