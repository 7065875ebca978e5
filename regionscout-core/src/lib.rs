//! Core domain for RegionScout: selecting a region on a map, searching for
//! places inside it and exporting the results.
//!
//! Responsibilities:
//! - Keep the single active selection overlay and its undo history.
//! - Validate query forms and guard submissions with request identity.
//! - Render result markers, including from exported KMZ archives.
//! - Fan a result set out to per-format exports.
//!
//! Boundaries:
//! - No HTTP: services are reached through [`backend::PlaceSearch`] and
//!   [`backend::ArtifactConverter`].
//! - No widgets: maps are reached through [`map::OverlaySurface`] and
//!   [`map::MarkerSurface`].
//!
//! Invariants:
//! - Each piece of state has exactly one owning controller.
//! - Credentials pass through requests and are never logged.
#![forbid(unsafe_code)]

pub mod archive;
pub mod backend;
mod bbox;
pub mod download;
pub mod export;
pub mod map;
pub mod marker;
mod place;
pub mod query;
pub mod selection;
pub mod session;
#[doc(hidden)]
pub mod test_support;

pub use bbox::BoundingBox;
pub use place::{Degrees, PlaceName, PlaceResult};
pub use session::{EstimateError, SearchOutcome, Session, SessionError, SubmitOutcome};
