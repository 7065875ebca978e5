//! Capabilities the core needs from a map surface.
//!
//! Providers implement [`OverlaySurface`] for the drawing primitive and
//! [`MarkerSurface`] for point markers. The core depends on nothing else, so
//! any map widget (or the in-memory [`HeadlessMap`]) can host a session.

use geo::Rect;

use crate::marker::{DetailContent, MarkerSpec};
use crate::selection::{OverlayId, WatchId};

mod headless;

pub use headless::HeadlessMap;

/// Identifier of a marker placed on the surface.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct MarkerId(pub u64);

/// Overlay operations used by the selection controller.
///
/// Overlays are created by the surface's own drawing primitive; the core
/// only toggles their visibility and subscribes to their edits.
pub trait OverlaySurface {
    /// Reattach a previously hidden overlay.
    fn show_overlay(&mut self, overlay: OverlayId, geometry: &Rect<f64>);

    /// Detach an overlay from the map while keeping it restorable.
    fn hide_overlay(&mut self, overlay: OverlayId);

    /// Detach and forget an overlay.
    fn remove_overlay(&mut self, overlay: OverlayId);

    /// Subscribe to bounds changes of `overlay`.
    fn watch_bounds(&mut self, overlay: OverlayId) -> WatchId;

    /// Drop a subscription created by [`Self::watch_bounds`].
    fn unwatch(&mut self, watch: WatchId);
}

/// Marker operations used by the marker renderer.
pub trait MarkerSurface {
    /// Place a marker with a click listener attached.
    fn add_marker(&mut self, spec: &MarkerSpec) -> MarkerId;

    /// Remove a marker and detach its click listener.
    fn remove_marker(&mut self, marker: MarkerId);

    /// Show the shared detail popup anchored at `marker`.
    fn open_detail(&mut self, marker: MarkerId, content: &DetailContent);

    /// Hide the shared detail popup.
    fn close_detail(&mut self);

    /// Reframe the view so `bounds` is visible.
    fn fit_bounds(&mut self, bounds: &Rect<f64>);
}

/// A surface offering both capability sets.
pub trait MapSurface: OverlaySurface + MarkerSurface {}

impl<T> MapSurface for T where T: OverlaySurface + MarkerSurface + ?Sized {}
