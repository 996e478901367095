//! Core domain logic for the Detour trip planner.
//!
//! Responsibilities:
//! - Discover attractions inside a corridor between two endpoints.
//! - Reconcile selected, locked and trashed attractions across searches.
//! - Order a selection between fixed endpoints, degrading to a local
//!   heuristic when the routing provider is unavailable.
//! - Normalise route output into a canonical stop list.
//!
//! Boundaries:
//! - Network services (geocoding, route optimisation) are traits implemented
//!   in `detour-data`; this crate performs no HTTP itself.
//! - No rendering, persistence format design or authentication.
//!
//! Invariants:
//! - Selection state never holds a trashed id in `selected` or `locked`, and
//!   every locked id is selected.
//! - Sequencing is deterministic for identical inputs and provider answers.

mod attraction;
mod corridor;
mod error;
mod gate;
mod geocode;
mod planner;
pub mod route;
mod search;
mod selection;
pub mod store;

#[doc(hidden)]
pub mod test_support;

pub use attraction::{Attraction, AttractionId, AttractionIdError, RatingAggregate, UNCATEGORIZED};
pub use corridor::{Corridor, EARTH_RADIUS_KM, haversine_km};
pub use error::{CapacityError, EndpointRole, ValidationError};
pub use gate::{RequestGate, Ticket};
pub use geocode::{Endpoint, GeocodeError, Geocoder};
pub use planner::{Outcome, PlannedRoute, PlannerConfig, TripPlanner};
pub use route::{
    DEFAULT_MAX_WAYPOINTS, LocalHeuristic, NormalizerConfig, OptimizationProblem, OptimizedRoute,
    OrderedStop, RouteNormalizer, RouteOptimizer, RouteProviderError, RouteRequest,
    RouteSequencer, Sequence, SequenceError, SequencedStop, SequencerConfig, StopKind,
    UnavailableOptimizer,
};
pub use search::{
    CorridorQuery, CorridorSearchService, DEFAULT_GEOCODE_TIMEOUT, SearchError, SearchResult,
};
pub use selection::{SelectionManager, SelectionState, TripEntry};
pub use store::AttractionStore;
#[cfg(feature = "store-sqlite")]
pub use store::{SqliteAttractionStore, SqliteAttractionStoreError};
