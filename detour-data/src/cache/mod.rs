//! SQLite cache of optimised routes.
//!
//! Entries live in a `route_cache` table keyed by [`cache_key`]. Only
//! successful provider answers are stored; [`CachingOptimizer`] consults the
//! cache before calling the wrapped optimiser.

mod caching;

use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use detour_core::{OptimizationProblem, OptimizedRoute};
use geo::Coord;
use log::warn;
use rusqlite::{Connection, OptionalExtension, params};
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub use caching::CachingOptimizer;

const CREATE_TABLE: &str = "CREATE TABLE IF NOT EXISTS route_cache (
    key TEXT PRIMARY KEY,
    result_json TEXT NOT NULL,
    source TEXT,
    ts INTEGER DEFAULT (strftime('%s','now'))
)";

/// Errors raised by [`RouteCache`].
#[derive(Debug, Error)]
pub enum RouteCacheError {
    /// The cache database could not be opened.
    #[error("failed to open route cache at {path:?}")]
    Open {
        /// Path that failed to open.
        path: PathBuf,
        /// Underlying SQLite error.
        #[source]
        source: rusqlite::Error,
    },
    /// A query against the cache failed.
    #[error(transparent)]
    Database(#[from] rusqlite::Error),
    /// A route could not be encoded for storage.
    #[error("failed to encode cached route: {0}")]
    Encode(#[from] serde_json::Error),
    /// A blocking cache task did not complete.
    #[error("route cache task failed: {0}")]
    Task(String),
}

/// Stored form of an [`OptimizedRoute`]; coordinates are `[lon, lat]`.
#[derive(Debug, Serialize, Deserialize)]
struct CachedRoute {
    waypoint_order: Vec<usize>,
    path: Vec<[f64; 2]>,
}

impl From<&OptimizedRoute> for CachedRoute {
    fn from(route: &OptimizedRoute) -> Self {
        Self {
            waypoint_order: route.waypoint_order.clone(),
            path: route.path.iter().map(|c| [c.x, c.y]).collect(),
        }
    }
}

impl From<CachedRoute> for OptimizedRoute {
    fn from(cached: CachedRoute) -> Self {
        Self {
            waypoint_order: cached.waypoint_order,
            path: cached
                .path
                .into_iter()
                .map(|[x, y]| Coord { x, y })
                .collect(),
        }
    }
}

/// Cache key for `problem`: departure, arrival and waypoints in request
/// order, each as `lat,lon` with seven decimals.
///
/// # Examples
/// ```
/// use detour_core::OptimizationProblem;
/// use detour_data::cache_key;
/// use geo::Coord;
///
/// let problem = OptimizationProblem {
///     origin: Coord { x: -83.0, y: 40.0 },
///     destination: Coord { x: -82.5, y: 40.5 },
///     waypoints: vec![Coord { x: -82.75, y: 40.25 }],
/// };
/// assert_eq!(
///     cache_key(&problem),
///     "opt:dep=40.0000000,-83.0000000:arr=40.5000000,-82.5000000:pts=40.2500000,-82.7500000"
/// );
/// ```
#[must_use]
pub fn cache_key(problem: &OptimizationProblem) -> String {
    let mut key = String::from("opt:dep=");
    push_coord(&mut key, problem.origin);
    key.push_str(":arr=");
    push_coord(&mut key, problem.destination);
    key.push_str(":pts=");
    for (i, waypoint) in problem.waypoints.iter().enumerate() {
        if i > 0 {
            key.push(';');
        }
        push_coord(&mut key, *waypoint);
    }
    key
}

fn push_coord(key: &mut String, coord: Coord<f64>) {
    key.push_str(&format!("{:.7},{:.7}", coord.y, coord.x));
}

/// Handle to the `route_cache` table. Clones share one connection.
#[derive(Debug, Clone)]
pub struct RouteCache {
    connection: Arc<Mutex<Connection>>,
}

impl RouteCache {
    /// Open or create a cache database at `path`.
    ///
    /// # Errors
    ///
    /// Returns an error if the database cannot be opened or the table cannot
    /// be created.
    pub fn open(path: &Path) -> Result<Self, RouteCacheError> {
        let connection = Connection::open(path).map_err(|source| RouteCacheError::Open {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_connection(connection)
    }

    /// Create a cache held entirely in memory.
    ///
    /// # Errors
    ///
    /// Returns an error if SQLite cannot allocate the database.
    pub fn in_memory() -> Result<Self, RouteCacheError> {
        Self::from_connection(Connection::open_in_memory()?)
    }

    fn from_connection(connection: Connection) -> Result<Self, RouteCacheError> {
        connection.execute(CREATE_TABLE, [])?;
        Ok(Self {
            connection: Arc::new(Mutex::new(connection)),
        })
    }

    /// Look up a cached route. Undecodable entries are treated as misses.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails.
    pub fn get(&self, key: &str) -> Result<Option<OptimizedRoute>, RouteCacheError> {
        let json: Option<String> = self
            .connection()
            .query_row(
                "SELECT result_json FROM route_cache WHERE key = ?1",
                [key],
                |row| row.get(0),
            )
            .optional()?;
        Ok(json.and_then(|json| match serde_json::from_str::<CachedRoute>(&json) {
            Ok(cached) => Some(cached.into()),
            Err(err) => {
                warn!("ignoring undecodable cache entry {key}: {err}");
                None
            }
        }))
    }

    /// Store `route` under `key`, replacing any previous entry.
    ///
    /// # Errors
    ///
    /// Returns an error if encoding or the insert fails.
    pub fn set(
        &self,
        key: &str,
        route: &OptimizedRoute,
        source: &str,
    ) -> Result<(), RouteCacheError> {
        let json = serde_json::to_string(&CachedRoute::from(route))?;
        self.connection().execute(
            "INSERT OR REPLACE INTO route_cache (key, result_json, source) VALUES (?1, ?2, ?3)",
            params![key, json, source],
        )?;
        Ok(())
    }

    /// Remove every entry and return how many were removed.
    ///
    /// # Errors
    ///
    /// Returns an error if the delete fails.
    pub fn clear(&self) -> Result<usize, RouteCacheError> {
        Ok(self.connection().execute("DELETE FROM route_cache", [])?)
    }

    /// Number of cached routes.
    ///
    /// # Errors
    ///
    /// Returns an error if the count query fails.
    pub fn len(&self) -> Result<usize, RouteCacheError> {
        let count: i64 =
            self.connection()
                .query_row("SELECT COUNT(1) FROM route_cache", [], |row| row.get(0))?;
        Ok(usize::try_from(count).unwrap_or_default())
    }

    /// Whether the cache holds no routes.
    ///
    /// # Errors
    ///
    /// Returns an error if the count query fails.
    pub fn is_empty(&self) -> Result<bool, RouteCacheError> {
        Ok(self.len()? == 0)
    }

    fn connection(&self) -> MutexGuard<'_, Connection> {
        self.connection
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::{fixture, rstest};

    #[fixture]
    fn cache() -> RouteCache {
        RouteCache::in_memory().expect("in-memory cache")
    }

    fn route() -> OptimizedRoute {
        OptimizedRoute {
            waypoint_order: vec![1, 0],
            path: vec![
                Coord { x: 0.0, y: 0.0 },
                Coord { x: 0.2, y: 0.0 },
                Coord { x: 0.1, y: 0.0 },
                Coord { x: 0.3, y: 0.0 },
            ],
        }
    }

    #[rstest]
    fn stores_and_returns_routes(cache: RouteCache) {
        assert_eq!(cache.get("k").expect("query"), None);
        cache.set("k", &route(), "osrm").expect("insert");
        assert_eq!(cache.get("k").expect("query"), Some(route()));
        assert_eq!(cache.len().expect("count"), 1);
    }

    #[rstest]
    fn set_replaces_existing_entry(cache: RouteCache) {
        cache.set("k", &route(), "osrm").expect("insert");
        let shorter = OptimizedRoute {
            waypoint_order: vec![0],
            path: Vec::new(),
        };
        cache.set("k", &shorter, "osrm").expect("replace");
        assert_eq!(cache.get("k").expect("query"), Some(shorter));
        assert_eq!(cache.len().expect("count"), 1);
    }

    #[rstest]
    fn clear_reports_removed_entries(cache: RouteCache) {
        cache.set("a", &route(), "osrm").expect("insert");
        cache.set("b", &route(), "osrm").expect("insert");
        assert_eq!(cache.clear().expect("clear"), 2);
        assert!(cache.is_empty().expect("count"));
        assert_eq!(cache.clear().expect("clear"), 0);
    }

    #[rstest]
    fn undecodable_entries_are_misses(cache: RouteCache) {
        cache
            .connection()
            .execute(
                "INSERT INTO route_cache (key, result_json, source) VALUES ('bad', '{', 'osrm')",
                [],
            )
            .expect("raw insert");
        assert_eq!(cache.get("bad").expect("query"), None);
    }

    #[rstest]
    fn entries_survive_reopening() {
        let dir = tempfile::tempdir().expect("temp dir");
        let path = dir.path().join("cache.sqlite");
        RouteCache::open(&path)
            .expect("open")
            .set("k", &route(), "osrm")
            .expect("insert");
        let reopened = RouteCache::open(&path).expect("reopen");
        assert_eq!(reopened.get("k").expect("query"), Some(route()));
    }

    #[rstest]
    fn key_lists_waypoints_in_request_order() {
        let problem = OptimizationProblem {
            origin: Coord { x: 1.0, y: 2.0 },
            destination: Coord { x: 3.0, y: 4.0 },
            waypoints: vec![Coord { x: 5.0, y: 6.0 }, Coord { x: 7.0, y: 8.0 }],
        };
        assert_eq!(
            cache_key(&problem),
            "opt:dep=2.0000000,1.0000000:arr=4.0000000,3.0000000\
             :pts=6.0000000,5.0000000;8.0000000,7.0000000"
        );
    }
}
