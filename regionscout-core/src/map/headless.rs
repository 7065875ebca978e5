//! In-memory map surface for headless hosts and tests.

use std::collections::BTreeMap;

use geo::Rect;

use super::{MarkerId, MarkerSurface, OverlaySurface};
use crate::marker::{DetailContent, MarkerSpec};
use crate::selection::{OverlayId, WatchId};

#[derive(Debug, Clone, Copy)]
struct OverlayState {
    geometry: Rect<f64>,
    visible: bool,
}

/// Map surface that records every call instead of drawing.
///
/// Identifiers are issued from monotonically increasing counters and never
/// reused, matching what interactive providers guarantee.
#[derive(Debug, Default)]
pub struct HeadlessMap {
    overlays: BTreeMap<OverlayId, OverlayState>,
    watches: BTreeMap<WatchId, OverlayId>,
    markers: BTreeMap<MarkerId, MarkerSpec>,
    detail: Option<(MarkerId, DetailContent)>,
    viewport: Option<Rect<f64>>,
    next_overlay: u64,
    next_watch: u64,
    next_marker: u64,
}

impl HeadlessMap {
    /// Create an empty surface.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Simulate the drawing primitive completing a rectangle.
    ///
    /// The overlay is visible immediately; pass the returned id to
    /// [`crate::selection::RegionSelectionController::on_draw_complete`].
    pub fn draw_rectangle(&mut self, geometry: Rect<f64>) -> OverlayId {
        self.next_overlay += 1;
        let id = OverlayId(self.next_overlay);
        self.overlays.insert(
            id,
            OverlayState {
                geometry,
                visible: true,
            },
        );
        id
    }

    /// Simulate a drag or resize and return the subscriptions to notify.
    pub fn edit_overlay(&mut self, overlay: OverlayId, geometry: Rect<f64>) -> Vec<WatchId> {
        if let Some(state) = self.overlays.get_mut(&overlay) {
            state.geometry = geometry;
        }
        self.watches_for(overlay)
    }

    /// Live subscriptions registered for `overlay`.
    #[must_use]
    pub fn watches_for(&self, overlay: OverlayId) -> Vec<WatchId> {
        self.watches
            .iter()
            .filter(|(_, target)| **target == overlay)
            .map(|(watch, _)| *watch)
            .collect()
    }

    /// Number of live subscriptions across all overlays.
    #[must_use]
    pub fn live_watch_count(&self) -> usize {
        self.watches.len()
    }

    /// Whether the surface still knows `overlay`.
    #[must_use]
    pub fn contains_overlay(&self, overlay: OverlayId) -> bool {
        self.overlays.contains_key(&overlay)
    }

    /// Whether `overlay` is attached and shown.
    #[must_use]
    pub fn is_visible(&self, overlay: OverlayId) -> bool {
        self.overlays.get(&overlay).is_some_and(|state| state.visible)
    }

    /// Markers currently placed, in creation order.
    pub fn markers(&self) -> impl Iterator<Item = (MarkerId, &MarkerSpec)> + '_ {
        self.markers.iter().map(|(id, spec)| (*id, spec))
    }

    /// Number of markers currently placed.
    #[must_use]
    pub fn marker_count(&self) -> usize {
        self.markers.len()
    }

    /// Content of the open detail popup, if any.
    #[must_use]
    pub fn detail(&self) -> Option<&DetailContent> {
        self.detail.as_ref().map(|(_, content)| content)
    }

    /// Last bounds passed to [`MarkerSurface::fit_bounds`].
    #[must_use]
    pub fn viewport(&self) -> Option<Rect<f64>> {
        self.viewport
    }
}

impl OverlaySurface for HeadlessMap {
    fn show_overlay(&mut self, overlay: OverlayId, geometry: &Rect<f64>) {
        self.overlays.insert(
            overlay,
            OverlayState {
                geometry: *geometry,
                visible: true,
            },
        );
    }

    fn hide_overlay(&mut self, overlay: OverlayId) {
        if let Some(state) = self.overlays.get_mut(&overlay) {
            state.visible = false;
        }
    }

    fn remove_overlay(&mut self, overlay: OverlayId) {
        self.overlays.remove(&overlay);
        self.watches.retain(|_, target| *target != overlay);
    }

    fn watch_bounds(&mut self, overlay: OverlayId) -> WatchId {
        self.next_watch += 1;
        let watch = WatchId(self.next_watch);
        self.watches.insert(watch, overlay);
        watch
    }

    fn unwatch(&mut self, watch: WatchId) {
        self.watches.remove(&watch);
    }
}

impl MarkerSurface for HeadlessMap {
    fn add_marker(&mut self, spec: &MarkerSpec) -> MarkerId {
        self.next_marker += 1;
        let id = MarkerId(self.next_marker);
        self.markers.insert(id, spec.clone());
        id
    }

    fn remove_marker(&mut self, marker: MarkerId) {
        self.markers.remove(&marker);
        if self.detail.as_ref().is_some_and(|(anchor, _)| *anchor == marker) {
            self.detail = None;
        }
    }

    fn open_detail(&mut self, marker: MarkerId, content: &DetailContent) {
        self.detail = Some((marker, content.clone()));
    }

    fn close_detail(&mut self) {
        self.detail = None;
    }

    fn fit_bounds(&mut self, bounds: &Rect<f64>) {
        self.viewport = Some(*bounds);
    }
}
