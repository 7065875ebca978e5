//! LIFO stack of superseded overlays.

use super::{Overlay, OverlayId, SelectionError};

/// Overlays superseded by newer draws, most recent last.
///
/// An overlay appears at most once. The controller guarantees that the
/// active overlay is never stored here.
#[derive(Debug, Default, Clone)]
pub struct OverlayHistory {
    entries: Vec<Overlay>,
}

impl OverlayHistory {
    /// Create an empty history.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Push a superseded overlay.
    ///
    /// # Errors
    ///
    /// Returns [`SelectionError::DuplicateOverlay`] when the overlay is
    /// already stored.
    pub fn push(&mut self, overlay: Overlay) -> Result<(), SelectionError> {
        if self.contains(overlay.id) {
            return Err(SelectionError::DuplicateOverlay(overlay.id));
        }
        self.entries.push(overlay);
        Ok(())
    }

    /// Remove and return the most recently pushed overlay.
    pub fn pop(&mut self) -> Option<Overlay> {
        self.entries.pop()
    }

    /// Whether an overlay with `id` is stored.
    #[must_use]
    pub fn contains(&self, id: OverlayId) -> bool {
        self.entries.iter().any(|entry| entry.id == id)
    }

    /// Number of stored overlays.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the history is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterate from the most recently superseded overlay to the oldest.
    pub fn iter_latest_first(&self) -> impl Iterator<Item = &Overlay> + '_ {
        self.entries.iter().rev()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use geo::{Coord, Rect};
    use rstest::{fixture, rstest};

    fn overlay(id: u64) -> Overlay {
        let corner = Coord {
            x: id as f64,
            y: id as f64,
        };
        Overlay {
            id: OverlayId(id),
            geometry: Rect::new(corner, corner),
        }
    }

    #[fixture]
    fn history() -> OverlayHistory {
        let mut history = OverlayHistory::new();
        history.push(overlay(1)).expect("first push");
        history.push(overlay(2)).expect("second push");
        history
    }

    #[rstest]
    fn pops_in_reverse_push_order(mut history: OverlayHistory) {
        assert_eq!(history.pop().map(|o| o.id), Some(OverlayId(2)));
        assert_eq!(history.pop().map(|o| o.id), Some(OverlayId(1)));
        assert!(history.pop().is_none());
    }

    #[rstest]
    fn rejects_duplicate_ids(mut history: OverlayHistory) {
        let err = history.push(overlay(1)).expect_err("duplicate should fail");
        assert_eq!(err, SelectionError::DuplicateOverlay(OverlayId(1)));
        assert_eq!(history.len(), 2);
    }

    #[rstest]
    fn iterates_latest_first(history: OverlayHistory) {
        let ids: Vec<_> = history.iter_latest_first().map(|o| o.id.0).collect();
        assert_eq!(ids, vec![2, 1]);
    }
}
