//! Region selection: the active overlay, its undo history and the bounding
//! box derived from it.
//!
//! The map surface owns drawing. Once a rectangle is complete the host hands
//! its identifier and geometry to [`RegionSelectionController`], which keeps
//! exactly one overlay active, hides superseded ones and tracks them in an
//! [`OverlayHistory`] for undo.

use geo::Rect;
use thiserror::Error;

use crate::BoundingBox;

mod controller;
mod history;

pub use controller::RegionSelectionController;
pub use history::OverlayHistory;

/// Identifier issued by the map surface's drawing primitive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct OverlayId(pub u64);

/// Identifier of a bounds-change subscription on the map surface.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct WatchId(pub u64);

/// An editable rectangle drawn on the map.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Overlay {
    /// Surface-issued identifier.
    pub id: OverlayId,
    /// Current rectangle (`x = lng`, `y = lat`).
    pub geometry: Rect<f64>,
}

impl Overlay {
    /// Bounding box of the overlay's current geometry.
    #[must_use]
    pub fn bbox(&self) -> BoundingBox {
        BoundingBox::from_rect(&self.geometry)
    }
}

/// Notification emitted whenever the selection changes.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SelectionEvent {
    /// A selection is active; the query form should be shown.
    Changed(BoundingBox),
    /// Nothing is selected; the query form should be hidden.
    Cleared,
}

/// Errors raised by [`RegionSelectionController`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum SelectionError {
    /// The surface reported an overlay that is already active or in history.
    #[error("overlay {0:?} is already tracked by the selection")]
    DuplicateOverlay(OverlayId),
}
