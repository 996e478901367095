//! Selection state carried across repeated searches.
//!
//! [`SelectionState`] is a value: every toggle consumes it and returns the
//! next state, checking the set invariants on the way out. A
//! [`SelectionManager`] owns one state per session together with the list of
//! attractions currently on screen, and reconciles fresh search results
//! against locks and trash.

use std::collections::{BTreeSet, HashSet};
use std::mem;

use log::debug;

use crate::{Attraction, AttractionId};

/// Selected, locked and trashed attraction ids for one session.
///
/// Invariants, checked after every transition:
/// - `locked ⊆ selected`
/// - `trashed ∩ selected = ∅`
/// - `trashed ∩ locked = ∅`
///
/// # Examples
/// ```
/// use detour_core::{AttractionId, SelectionState};
///
/// let id = AttractionId::parse("node/1")?;
/// let state = SelectionState::default().toggle_lock(&id);
/// assert!(state.is_locked(&id) && state.is_selected(&id));
///
/// let state = state.toggle_trash(&id);
/// assert!(state.is_trashed(&id) && !state.is_selected(&id));
/// # Ok::<(), detour_core::AttractionIdError>(())
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SelectionState {
    selected: BTreeSet<AttractionId>,
    locked: BTreeSet<AttractionId>,
    trashed: BTreeSet<AttractionId>,
}

impl SelectionState {
    /// Flip lock membership. Locking selects; unlocking keeps the selection.
    /// Trashed ids cannot be locked.
    #[must_use]
    pub fn toggle_lock(mut self, id: &AttractionId) -> Self {
        if !self.trashed.contains(id) && !self.locked.remove(id) {
            self.locked.insert(id.clone());
            self.selected.insert(id.clone());
        }
        self.checked()
    }

    /// Trash an id, dropping it from the selection and locks, or restore a
    /// trashed id without reinstating its previous selection.
    #[must_use]
    pub fn toggle_trash(mut self, id: &AttractionId) -> Self {
        if !self.trashed.remove(id) {
            self.selected.remove(id);
            self.locked.remove(id);
            self.trashed.insert(id.clone());
        }
        self.checked()
    }

    /// Flip selection. No-op on trashed ids. Deselecting a locked id also
    /// unlocks it.
    #[must_use]
    pub fn toggle_select(mut self, id: &AttractionId) -> Self {
        if !self.trashed.contains(id) {
            if self.selected.remove(id) {
                self.locked.remove(id);
            } else {
                self.selected.insert(id.clone());
            }
        }
        self.checked()
    }

    /// Drop selections that are no longer in `visible`. Locks are kept,
    /// since locked attractions always stay visible.
    #[must_use]
    pub fn retain_selected<'a, I>(mut self, visible: I) -> Self
    where
        I: IntoIterator<Item = &'a AttractionId>,
    {
        let shown: HashSet<&AttractionId> = visible.into_iter().collect();
        let locked = &self.locked;
        self.selected
            .retain(|id| shown.contains(id) || locked.contains(id));
        self.checked()
    }

    /// Whether `id` is selected.
    #[must_use]
    pub fn is_selected(&self, id: &AttractionId) -> bool {
        self.selected.contains(id)
    }

    /// Whether `id` is locked.
    #[must_use]
    pub fn is_locked(&self, id: &AttractionId) -> bool {
        self.locked.contains(id)
    }

    /// Whether `id` is trashed.
    #[must_use]
    pub fn is_trashed(&self, id: &AttractionId) -> bool {
        self.trashed.contains(id)
    }

    /// Selected ids.
    #[must_use]
    pub fn selected(&self) -> &BTreeSet<AttractionId> {
        &self.selected
    }

    /// Locked ids.
    #[must_use]
    pub fn locked(&self) -> &BTreeSet<AttractionId> {
        &self.locked
    }

    /// Trashed ids.
    #[must_use]
    pub fn trashed(&self) -> &BTreeSet<AttractionId> {
        &self.trashed
    }

    /// Check the set invariants.
    ///
    /// # Panics
    ///
    /// Panics when any invariant is broken. Transitions only produce valid
    /// states, so a panic here means a bug in this module.
    pub fn assert_invariants(&self) {
        assert!(
            self.locked.is_subset(&self.selected),
            "selection invariant broken: locked ids {:?} are not selected",
            self.locked.difference(&self.selected).collect::<Vec<_>>()
        );
        assert!(
            self.trashed.is_disjoint(&self.selected),
            "selection invariant broken: trashed ids {:?} are selected",
            self.trashed.intersection(&self.selected).collect::<Vec<_>>()
        );
        assert!(
            self.trashed.is_disjoint(&self.locked),
            "selection invariant broken: trashed ids {:?} are locked",
            self.trashed.intersection(&self.locked).collect::<Vec<_>>()
        );
    }

    fn checked(self) -> Self {
        self.assert_invariants();
        self
    }
}

/// Row handed to trip persistence.
#[derive(Debug, Clone, PartialEq)]
pub struct TripEntry {
    /// Selected attraction.
    pub attraction: Attraction,
    /// Whether the user pinned it.
    pub locked: bool,
    /// Zero-based position in the visible list.
    pub position: usize,
}

/// Session-scoped owner of a [`SelectionState`] and the visible list.
///
/// A manager is single-writer: callers serialise access, typically behind a
/// mutex in [`crate::TripPlanner`].
#[derive(Debug, Clone, Default)]
pub struct SelectionManager {
    state: SelectionState,
    visible: Vec<Attraction>,
}

impl SelectionManager {
    /// Empty session.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Current state.
    #[must_use]
    pub fn state(&self) -> &SelectionState {
        &self.state
    }

    /// Attractions currently shown, locked ones first.
    #[must_use]
    pub fn visible(&self) -> &[Attraction] {
        &self.visible
    }

    /// Trashed ids, suitable for a query's exclusion set.
    #[must_use]
    pub fn trashed_ids(&self) -> BTreeSet<AttractionId> {
        self.state.trashed.clone()
    }

    /// See [`SelectionState::toggle_lock`]. Only visible attractions can be
    /// locked, so every locked id has an [`Attraction`] to carry forward.
    pub fn toggle_lock(&mut self, id: &AttractionId) -> &SelectionState {
        if !self.state.is_locked(id) && !self.visible.iter().any(|a| a.id == *id) {
            debug!("ignoring lock of {id}: not visible");
            return &self.state;
        }
        self.state = mem::take(&mut self.state).toggle_lock(id);
        &self.state
    }

    /// See [`SelectionState::toggle_trash`]. Trashing also hides the id.
    pub fn toggle_trash(&mut self, id: &AttractionId) -> &SelectionState {
        self.state = mem::take(&mut self.state).toggle_trash(id);
        if self.state.is_trashed(id) {
            self.visible.retain(|a| a.id != *id);
        }
        &self.state
    }

    /// See [`SelectionState::toggle_select`].
    pub fn toggle_select(&mut self, id: &AttractionId) -> &SelectionState {
        self.state = mem::take(&mut self.state).toggle_select(id);
        &self.state
    }

    /// Reconcile fresh search results with the session and return the new
    /// visible list.
    ///
    /// The result is every locked attraction, in prior visible order and
    /// refreshed from `candidates` when present, followed by the remaining
    /// candidates in the order returned. Trashed ids never appear and
    /// duplicate candidates are dropped.
    pub fn merge_search_results(&mut self, candidates: Vec<Attraction>) -> &[Attraction] {
        let state = &self.state;
        let mut merged: Vec<Attraction> = Vec::with_capacity(state.locked.len() + candidates.len());
        let mut placed: HashSet<AttractionId> = HashSet::new();

        for prior in &self.visible {
            if state.is_locked(&prior.id) && placed.insert(prior.id.clone()) {
                let fresh = candidates.iter().find(|c| c.id == prior.id);
                merged.push(fresh.unwrap_or(prior).clone());
            }
        }
        for candidate in &candidates {
            if state.is_locked(&candidate.id) && placed.insert(candidate.id.clone()) {
                merged.push(candidate.clone());
            }
        }
        let pinned = merged.len();
        for candidate in candidates {
            if !state.is_trashed(&candidate.id) && placed.insert(candidate.id.clone()) {
                merged.push(candidate);
            }
        }
        debug!(
            "merged {pinned} locked and {} new attractions",
            merged.len() - pinned
        );

        self.state = mem::take(&mut self.state).retain_selected(merged.iter().map(|a| &a.id));
        self.visible = merged;
        &self.visible
    }

    /// Selected visible attractions in visible order.
    #[must_use]
    pub fn selected_attractions(&self) -> Vec<Attraction> {
        self.visible
            .iter()
            .filter(|a| self.state.is_selected(&a.id))
            .cloned()
            .collect()
    }

    /// Selected visible attractions as trip rows.
    #[must_use]
    pub fn trip_entries(&self) -> Vec<TripEntry> {
        self.visible
            .iter()
            .filter(|a| self.state.is_selected(&a.id))
            .enumerate()
            .map(|(position, a)| TripEntry {
                attraction: a.clone(),
                locked: self.state.is_locked(&a.id),
                position,
            })
            .collect()
    }
}
