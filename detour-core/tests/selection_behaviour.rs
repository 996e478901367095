//! Behavioural tests for [`SelectionManager`].

use std::cell::RefCell;

use detour_core::test_support::attraction;
use detour_core::{Attraction, AttractionId, SelectionManager};
use rstest::fixture;
use rstest_bdd_macros::{given, scenario, then, when};

#[fixture]
fn manager() -> RefCell<SelectionManager> {
    RefCell::new(SelectionManager::new())
}

fn id(raw: &str) -> AttractionId {
    AttractionId::parse(raw).expect("valid id")
}

fn place(raw: &str) -> Attraction {
    attraction(raw, raw, 0.0, 0.0)
}

fn visible_ids(manager: &RefCell<SelectionManager>) -> Vec<String> {
    manager
        .borrow()
        .visible()
        .iter()
        .map(|a| a.id.as_str().to_owned())
        .collect()
}

// --- Given steps ---

#[given("a session showing node/1")]
fn showing_one(#[from(manager)] manager: &RefCell<SelectionManager>) {
    manager.borrow_mut().merge_search_results(vec![place("node/1")]);
}

#[given("node/1 is locked")]
fn one_locked(#[from(manager)] manager: &RefCell<SelectionManager>) {
    manager.borrow_mut().toggle_lock(&id("node/1"));
}

#[given("node/1 is trashed")]
fn one_trashed(#[from(manager)] manager: &RefCell<SelectionManager>) {
    manager.borrow_mut().toggle_trash(&id("node/1"));
}

// --- When steps ---

#[when("a search returns node/2 and node/3")]
fn search_two_three(#[from(manager)] manager: &RefCell<SelectionManager>) {
    manager
        .borrow_mut()
        .merge_search_results(vec![place("node/2"), place("node/3")]);
}

#[when("a search returns node/1 and node/2")]
fn search_one_two(#[from(manager)] manager: &RefCell<SelectionManager>) {
    manager
        .borrow_mut()
        .merge_search_results(vec![place("node/1"), place("node/2")]);
}

#[when("the user trashes node/1")]
fn trash_one(#[from(manager)] manager: &RefCell<SelectionManager>) {
    manager.borrow_mut().toggle_trash(&id("node/1"));
}

#[when("the user locks node/1")]
fn lock_one(#[from(manager)] manager: &RefCell<SelectionManager>) {
    manager.borrow_mut().toggle_lock(&id("node/1"));
}

// --- Then steps ---

#[then("the visible attractions are node/1, node/2, node/3")]
fn visible_one_two_three(#[from(manager)] manager: &RefCell<SelectionManager>) {
    assert_eq!(visible_ids(manager), vec!["node/1", "node/2", "node/3"]);
}

#[then("the visible attractions are node/2")]
fn visible_two(#[from(manager)] manager: &RefCell<SelectionManager>) {
    assert_eq!(visible_ids(manager), vec!["node/2"]);
}

#[then("the visible attractions are empty")]
fn visible_empty(#[from(manager)] manager: &RefCell<SelectionManager>) {
    assert!(visible_ids(manager).is_empty());
}

#[then("node/1 is still locked and selected")]
fn one_still_locked(#[from(manager)] manager: &RefCell<SelectionManager>) {
    let borrowed = manager.borrow();
    let state = borrowed.state();
    assert!(state.is_locked(&id("node/1")));
    assert!(state.is_selected(&id("node/1")));
    state.assert_invariants();
}

#[then("node/1 is neither selected nor locked")]
fn one_released(#[from(manager)] manager: &RefCell<SelectionManager>) {
    let borrowed = manager.borrow();
    let state = borrowed.state();
    assert!(!state.is_locked(&id("node/1")));
    assert!(!state.is_selected(&id("node/1")));
    assert!(state.is_trashed(&id("node/1")));
    state.assert_invariants();
}

// --- Scenario registrations ---

macro_rules! register_scenario {
    ($fn_name:ident, $title:literal) => {
        #[scenario(path = "tests/features/selection.feature", name = $title)]
        fn $fn_name(manager: RefCell<SelectionManager>) {
            let _ = manager;
        }
    };
}

register_scenario!(carrying_locked_forward, "locked attractions are carried into a new search");
register_scenario!(trashing_locked_releases, "trashing a locked attraction releases it");
register_scenario!(trashed_stay_out, "trashed attractions stay out of later searches");
register_scenario!(locking_trashed_is_noop, "locking a trashed attraction has no effect");
