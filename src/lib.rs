//! Facade crate for RegionScout.
//!
//! This crate re-exports the core domain types and exposes the HTTP backend
//! and the directory download target behind feature flags.

#![forbid(unsafe_code)]

pub use regionscout_core::backend::{
    ArtifactConverter, Backend, Estimate, PlaceSearch, TransportError,
};
pub use regionscout_core::download::{DownloadTarget, ExportArtifact, MemoryDownloads};
pub use regionscout_core::map::{HeadlessMap, MapSurface};
pub use regionscout_core::marker::{MarkerRenderer, RenderReport};
pub use regionscout_core::query::{ExportFormat, QueryForm, Tier};
pub use regionscout_core::selection::RegionSelectionController;
pub use regionscout_core::{
    BoundingBox, Degrees, EstimateError, PlaceName, PlaceResult, SearchOutcome, Session,
    SessionError, SubmitOutcome,
};

#[cfg(feature = "http")]
pub use regionscout_data::{HttpBackend, HttpBackendConfig};

#[cfg(feature = "fs")]
pub use regionscout_fs::DirectoryTarget;
