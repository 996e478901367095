//! Network and persistence adapters for the Detour engine.
//!
//! Responsibilities:
//! - Resolve addresses to coordinates through a Nominatim service.
//! - Order waypoints through the OSRM Trip service.
//! - Cache optimised routes in SQLite and expose a caching decorator for any
//!   [`detour_core::RouteOptimizer`].
//!
//! Boundaries:
//! - Do not encode domain rules (live in `detour-core`).
//! - Keep blocking I/O off async executors; SQLite work runs on the blocking
//!   pool.
//!
//! Invariants:
//! - Every HTTP call is bounded by the configured timeout.
//! - No global mutable state.

pub mod cache;
pub mod geocoding;
mod http;
pub mod routing;

pub use cache::{CachingOptimizer, RouteCache, RouteCacheError, cache_key};
pub use geocoding::{NominatimConfig, NominatimGeocoder};
pub use http::{DEFAULT_USER_AGENT, ProviderBuildError};
pub use routing::{OsrmTripConfig, OsrmTripOptimizer};
