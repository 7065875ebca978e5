//! Single-overlay selection with undo.

use geo::Rect;
use log::debug;

use super::{Overlay, OverlayHistory, OverlayId, SelectionError, SelectionEvent, WatchId};
use crate::BoundingBox;
use crate::map::OverlaySurface;

#[derive(Debug, Clone, Copy)]
struct ActiveOverlay {
    overlay: Overlay,
    watch: WatchId,
}

/// Owns the active overlay, the undo history and the derived bounding box.
///
/// Every operation takes the map surface explicitly so the controller never
/// holds on to it; the surface only sees show/hide/remove and bounds
/// subscription calls.
///
/// # Examples
/// ```
/// use geo::{Coord, Rect};
/// use regionscout_core::map::HeadlessMap;
/// use regionscout_core::selection::{RegionSelectionController, SelectionEvent};
///
/// let mut map = HeadlessMap::new();
/// let mut selection = RegionSelectionController::new();
/// let rect = Rect::new(Coord { x: -80.0, y: 40.4 }, Coord { x: -79.9, y: 40.5 });
/// let id = map.draw_rectangle(rect);
/// let event = selection.on_draw_complete(&mut map, id, rect).unwrap();
/// assert!(matches!(event, SelectionEvent::Changed(_)));
/// assert_eq!(selection.undo(&mut map), SelectionEvent::Cleared);
/// ```
#[derive(Debug, Default)]
pub struct RegionSelectionController {
    active: Option<ActiveOverlay>,
    history: OverlayHistory,
    bbox: Option<BoundingBox>,
}

impl RegionSelectionController {
    /// Create a controller with nothing selected.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Current bounding box, if a selection is active.
    #[must_use]
    pub fn bbox(&self) -> Option<BoundingBox> {
        self.bbox
    }

    /// The active overlay, if any.
    #[must_use]
    pub fn active(&self) -> Option<&Overlay> {
        self.active.as_ref().map(|active| &active.overlay)
    }

    /// Superseded overlays available to [`Self::undo`].
    #[must_use]
    pub fn history(&self) -> &OverlayHistory {
        &self.history
    }

    /// Install a freshly drawn overlay as the active selection.
    ///
    /// The previous overlay, if any, stops being watched, is hidden and moves
    /// to the history. Degenerate rectangles are accepted.
    ///
    /// # Errors
    ///
    /// Returns [`SelectionError::DuplicateOverlay`] when `id` is already the
    /// active overlay or stored in the history. State is left unchanged.
    pub fn on_draw_complete<S>(
        &mut self,
        surface: &mut S,
        id: OverlayId,
        geometry: Rect<f64>,
    ) -> Result<SelectionEvent, SelectionError>
    where
        S: OverlaySurface + ?Sized,
    {
        let is_active = self.active.is_some_and(|active| active.overlay.id == id);
        if is_active || self.history.contains(id) {
            return Err(SelectionError::DuplicateOverlay(id));
        }

        if let Some(previous) = self.active.take() {
            surface.unwatch(previous.watch);
            surface.hide_overlay(previous.overlay.id);
            debug!("overlay {:?} superseded by {:?}", previous.overlay.id, id);
            self.history.push(previous.overlay)?;
        }

        Ok(self.activate(surface, Overlay { id, geometry }))
    }

    /// Apply an edit reported through a bounds subscription.
    ///
    /// Returns `None` when `watch` is not the live subscription of the active
    /// overlay; such notifications come from superseded overlays and are
    /// ignored.
    pub fn on_bounds_changed(
        &mut self,
        watch: WatchId,
        geometry: Rect<f64>,
    ) -> Option<SelectionEvent> {
        let active = self.active.as_mut().filter(|active| active.watch == watch)?;
        active.overlay.geometry = geometry;
        let bbox = active.overlay.bbox();
        self.bbox = Some(bbox);
        Some(SelectionEvent::Changed(bbox))
    }

    /// Discard the active overlay and restore the previous one.
    ///
    /// With an empty history the selection is cleared. Calling this with
    /// nothing active and nothing to restore is a no-op that reports
    /// [`SelectionEvent::Cleared`].
    pub fn undo<S>(&mut self, surface: &mut S) -> SelectionEvent
    where
        S: OverlaySurface + ?Sized,
    {
        if let Some(current) = self.active.take() {
            surface.unwatch(current.watch);
            surface.remove_overlay(current.overlay.id);
            debug!("overlay {:?} discarded by undo", current.overlay.id);
        }

        match self.history.pop() {
            Some(previous) => {
                surface.show_overlay(previous.id, &previous.geometry);
                self.activate(surface, previous)
            }
            None => {
                self.bbox = None;
                SelectionEvent::Cleared
            }
        }
    }

    fn activate<S>(&mut self, surface: &mut S, overlay: Overlay) -> SelectionEvent
    where
        S: OverlaySurface + ?Sized,
    {
        let watch = surface.watch_bounds(overlay.id);
        let bbox = overlay.bbox();
        self.active = Some(ActiveOverlay { overlay, watch });
        self.bbox = Some(bbox);
        debug!("overlay {:?} active, bbox {bbox:?}", overlay.id);
        SelectionEvent::Changed(bbox)
    }
}
