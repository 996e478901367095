//! One user's trip-planning session.
//!
//! [`TripPlanner`] ties the search, selection, sequencing and normalising
//! steps together and applies the latest-request-wins rule: a search or
//! optimisation that has been overtaken by a newer one of the same kind is
//! cancelled and its answer discarded, leaving the session untouched.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use log::info;

use crate::gate::{RequestGate, Ticket};
use crate::geocode::{Endpoint, Geocoder};
use crate::route::{
    NormalizerConfig, OrderedStop, RouteNormalizer, RouteOptimizer, RouteRequest, RouteSequencer,
    SequenceError, SequencerConfig,
};
use crate::search::{CorridorQuery, CorridorSearchService, SearchError, SearchResult};
use crate::selection::{SelectionManager, SelectionState, TripEntry};
use crate::{Attraction, AttractionId, AttractionStore};

/// Result of a gated operation.
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome<T> {
    /// The operation was the newest of its kind and its result was applied.
    Accepted(T),
    /// A newer operation was issued meanwhile; nothing was applied.
    Superseded,
}

impl<T> Outcome<T> {
    /// The accepted value, if any.
    pub fn accepted(self) -> Option<T> {
        match self {
            Self::Accepted(value) => Some(value),
            Self::Superseded => None,
        }
    }
}

/// Canonical route produced by [`TripPlanner::optimize`].
#[derive(Debug, Clone, PartialEq)]
pub struct PlannedRoute {
    /// Stops in visiting order.
    pub stops: Vec<OrderedStop>,
    /// Set when the order came from the local heuristic.
    pub degraded: bool,
}

/// Tunables for [`TripPlanner`].
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct PlannerConfig {
    /// Sequencing limits and timeouts. The geocoding timeout also bounds
    /// search endpoint resolution.
    pub sequencer: SequencerConfig,
    /// Coordinate matching tolerance.
    pub normalizer: NormalizerConfig,
}

#[derive(Debug, Default)]
struct Session {
    selection: SelectionManager,
    route: Option<PlannedRoute>,
}

/// Search, curate and sequence attractions for a single session.
///
/// Session state is isolated per planner; share a planner only between
/// tasks acting for the same user.
#[derive(Debug)]
pub struct TripPlanner<S, G, R> {
    search: CorridorSearchService<S, Arc<G>>,
    sequencer: RouteSequencer<R, Arc<G>>,
    normalizer: RouteNormalizer,
    session: Mutex<Session>,
    search_gate: RequestGate,
    optimize_gate: RequestGate,
}

impl<S, G, R> TripPlanner<S, G, R>
where
    S: AttractionStore,
    G: Geocoder,
    R: RouteOptimizer,
{
    /// Build a planner with default configuration.
    pub fn new(store: S, geocoder: G, optimizer: R) -> Self {
        Self::with_config(store, geocoder, optimizer, PlannerConfig::default())
    }

    /// Build a planner with explicit configuration.
    pub fn with_config(store: S, geocoder: G, optimizer: R, config: PlannerConfig) -> Self {
        let shared_geocoder = Arc::new(geocoder);
        Self {
            search: CorridorSearchService::new(store, Arc::clone(&shared_geocoder))
                .with_geocode_timeout(config.sequencer.geocode_timeout),
            sequencer: RouteSequencer::with_config(optimizer, shared_geocoder, config.sequencer),
            normalizer: RouteNormalizer::new(config.normalizer),
            session: Mutex::new(Session::default()),
            search_gate: RequestGate::default(),
            optimize_gate: RequestGate::default(),
        }
    }

    /// Search the corridor and merge the answer into the session.
    ///
    /// The session's trashed ids are added to the query's exclusions. On
    /// acceptance the returned candidates are the new visible list.
    pub async fn search(
        &self,
        mut query: CorridorQuery,
    ) -> Result<Outcome<SearchResult>, SearchError> {
        let ticket = self.search_gate.issue();
        query
            .excluded_ids
            .extend(self.session().selection.trashed_ids());

        let outcome = self
            .search
            .search_cancellable(&query, ticket.token())
            .await;

        // Checked under the session lock so a newer answer cannot land first.
        let mut session = self.session();
        if self.superseded(&self.search_gate, &ticket, "search") {
            return Ok(Outcome::Superseded);
        }
        let mut result = outcome?;
        result.candidates = session
            .selection
            .merge_search_results(result.candidates)
            .to_vec();
        Ok(Outcome::Accepted(result))
    }

    /// Sequence the selected visible attractions and store the route.
    pub async fn optimize(
        &self,
        start: Option<Endpoint>,
        end: Option<Endpoint>,
    ) -> Result<Outcome<PlannedRoute>, SequenceError> {
        let ticket = self.optimize_gate.issue();
        let attractions = self.session().selection.selected_attractions();
        let request = RouteRequest {
            start,
            end,
            attraction_ids: attractions.iter().map(|a| a.id.clone()).collect(),
        };

        let outcome = self
            .sequencer
            .sequence_cancellable(&request, &attractions, ticket.token())
            .await;

        let mut session = self.session();
        if self.superseded(&self.optimize_gate, &ticket, "optimisation") {
            return Ok(Outcome::Superseded);
        }
        let sequence = outcome?;
        let route = PlannedRoute {
            stops: self.normalizer.normalize(&sequence, &attractions),
            degraded: sequence.degraded,
        };
        session.route = Some(route.clone());
        Ok(Outcome::Accepted(route))
    }

    /// Lock or unlock an attraction.
    pub fn toggle_lock(&self, id: &AttractionId) -> SelectionState {
        self.session().selection.toggle_lock(id).clone()
    }

    /// Trash or restore an attraction.
    pub fn toggle_trash(&self, id: &AttractionId) -> SelectionState {
        self.session().selection.toggle_trash(id).clone()
    }

    /// Select or deselect an attraction.
    pub fn toggle_select(&self, id: &AttractionId) -> SelectionState {
        self.session().selection.toggle_select(id).clone()
    }

    /// Snapshot of the selection state.
    pub fn selection(&self) -> SelectionState {
        self.session().selection.state().clone()
    }

    /// Snapshot of the visible list.
    pub fn visible(&self) -> Vec<Attraction> {
        self.session().selection.visible().to_vec()
    }

    /// Rows for trip persistence.
    pub fn trip_entries(&self) -> Vec<TripEntry> {
        self.session().selection.trip_entries()
    }

    /// Last accepted route, if any.
    pub fn route(&self) -> Option<PlannedRoute> {
        self.session().route.clone()
    }

    fn superseded(&self, gate: &RequestGate, ticket: &Ticket, what: &str) -> bool {
        let stale = !gate.is_current(ticket);
        if stale {
            info!("discarding superseded {what} #{}", ticket.id());
        }
        stale
    }

    fn session(&self) -> MutexGuard<'_, Session> {
        self.session.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
