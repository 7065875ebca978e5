#![expect(
    clippy::expect_used,
    reason = "behaviour tests use expect for readable failures"
)]

//! Behavioural tests for region selection and undo.

use std::cell::RefCell;

use geo::{Coord, Rect};
use regionscout_core::BoundingBox;
use regionscout_core::map::HeadlessMap;
use regionscout_core::selection::{
    OverlayId, RegionSelectionController, SelectionEvent, WatchId,
};
use rstest::fixture;
use rstest_bdd_macros::{given, scenario, then, when};

/// World state for selection scenarios.
#[derive(Debug, Default)]
struct SelectionWorld {
    map: RefCell<HeadlessMap>,
    selection: RefCell<RegionSelectionController>,
    drawn: RefCell<Vec<(OverlayId, Rect<f64>)>>,
    watches_at_draw: RefCell<Vec<Vec<WatchId>>>,
    last_event: RefCell<Option<SelectionEvent>>,
}

impl SelectionWorld {
    fn draw_next(&self) {
        let index = self.drawn.borrow().len() as f64;
        let geometry = Rect::new(
            Coord {
                x: index,
                y: index,
            },
            Coord {
                x: index + 0.5,
                y: index + 0.25,
            },
        );
        let id = self.map.borrow_mut().draw_rectangle(geometry);
        let event = self
            .selection
            .borrow_mut()
            .on_draw_complete(&mut *self.map.borrow_mut(), id, geometry)
            .expect("draw accepted");
        self.drawn.borrow_mut().push((id, geometry));
        let watches = self.map.borrow().watches_for(id);
        self.watches_at_draw.borrow_mut().push(watches);
        self.last_event.replace(Some(event));
    }

    fn undo(&self, count: usize) {
        for _ in 0..count {
            let event = self
                .selection
                .borrow_mut()
                .undo(&mut *self.map.borrow_mut());
            self.last_event.replace(Some(event));
        }
    }

    fn drawn_id(&self, index: usize) -> OverlayId {
        self.drawn.borrow().get(index).expect("rectangle drawn").0
    }

    fn active_id(&self) -> Option<OverlayId> {
        self.selection.borrow().active().map(|overlay| overlay.id)
    }
}

#[fixture]
fn world() -> SelectionWorld {
    SelectionWorld::default()
}

#[given("an empty map")]
fn empty_map(world: &SelectionWorld) {
    assert_eq!(world.map.borrow().live_watch_count(), 0);
}

#[when("I draw {count} rectangles")]
fn draw_rectangles(world: &SelectionWorld, count: usize) {
    for _ in 0..count {
        world.draw_next();
    }
}

#[when("I undo once")]
fn undo_once(world: &SelectionWorld) {
    world.undo(1);
}

#[when("I undo {count} times")]
fn undo_times(world: &SelectionWorld, count: usize) {
    world.undo(count);
}

#[when("the first rectangle reports new bounds")]
fn first_reports_bounds(world: &SelectionWorld) {
    let first = world.drawn_id(0);
    let edited = Rect::new(Coord { x: 50.0, y: 50.0 }, Coord { x: 60.0, y: 60.0 });
    let live = world.map.borrow_mut().edit_overlay(first, edited);
    assert!(live.is_empty(), "superseded overlay must not be watched");
    let stale = world.watches_at_draw.borrow()[0].clone();
    assert!(!stale.is_empty());
    for watch in stale {
        let event = world.selection.borrow_mut().on_bounds_changed(watch, edited);
        assert!(event.is_none(), "stale subscription must not apply");
    }
}

#[then("the last rectangle is active")]
fn last_is_active(world: &SelectionWorld) {
    let last = world.drawn.borrow().last().expect("rectangle drawn").0;
    assert_eq!(world.active_id(), Some(last));
}

#[then("the second rectangle is active")]
fn second_is_active(world: &SelectionWorld) {
    assert_eq!(world.active_id(), Some(world.drawn_id(1)));
}

#[then("{count} overlays are in the history")]
fn history_depth(world: &SelectionWorld, count: usize) {
    assert_eq!(world.selection.borrow().history().len(), count);
}

#[then("only the active overlay is visible")]
fn only_active_visible(world: &SelectionWorld) {
    let active = world.active_id().expect("an overlay is active");
    let map = world.map.borrow();
    for (id, _) in world.drawn.borrow().iter() {
        assert_eq!(map.is_visible(*id), *id == active, "visibility of {id:?}");
    }
}

#[then("no overlay is active")]
fn none_active(world: &SelectionWorld) {
    assert!(world.active_id().is_none());
    assert!(world.selection.borrow().history().is_empty());
}

#[then("the selection is cleared")]
fn selection_cleared(world: &SelectionWorld) {
    assert!(world.selection.borrow().bbox().is_none());
    assert_eq!(*world.last_event.borrow(), Some(SelectionEvent::Cleared));
}

#[then("no bounds subscriptions remain")]
fn no_subscriptions(world: &SelectionWorld) {
    assert_eq!(world.map.borrow().live_watch_count(), 0);
}

#[then("the bounding box matches the last rectangle")]
fn bbox_matches_last(world: &SelectionWorld) {
    let (_, geometry) = *world.drawn.borrow().last().expect("rectangle drawn");
    assert_eq!(
        world.selection.borrow().bbox(),
        Some(BoundingBox::from_rect(&geometry))
    );
}

macro_rules! register_scenario {
    ($fn_name:ident, $title:literal) => {
        #[scenario(path = "tests/features/selection.feature", name = $title)]
        fn $fn_name(world: SelectionWorld) {
            let _ = world;
        }
    };
}

register_scenario!(drawing_replaces_active, "drawing replaces the active overlay");
register_scenario!(undo_walks_history, "undo walks back through the history");
register_scenario!(
    undo_clears_selection,
    "undo past the first rectangle clears the selection"
);
register_scenario!(
    superseded_edits_ignored,
    "edits to a superseded overlay are ignored"
);
