//! Facade crate for the Detour trip planner.
//!
//! This crate re-exports the core domain types and, behind the `net`
//! feature, the HTTP-backed geocoding and route optimisation adapters.

#![forbid(unsafe_code)]

pub use detour_core::{
    Attraction, AttractionId, AttractionStore, CorridorQuery, CorridorSearchService, Endpoint,
    EndpointRole, GeocodeError, Geocoder, OptimizationProblem, OptimizedRoute, OrderedStop,
    RouteNormalizer, RouteOptimizer, RouteProviderError, RouteRequest, RouteSequencer,
    SearchError, SearchResult, SelectionManager, SelectionState, Sequence, SequenceError,
    TripPlanner, UnavailableOptimizer,
};

#[cfg(feature = "store-sqlite")]
pub use detour_core::{SqliteAttractionStore, SqliteAttractionStoreError};

#[cfg(feature = "net")]
pub use detour_data::{CachingOptimizer, NominatimGeocoder, OsrmTripOptimizer, RouteCache};
