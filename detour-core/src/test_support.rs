//! In-memory doubles for the store, geocoder and route provider, shared by
//! unit and behaviour tests.

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use geo::{Coord, Intersects, Rect};

use crate::{
    Attraction, AttractionId, AttractionStore, GeocodeError, Geocoder, OptimizationProblem,
    OptimizedRoute, RouteOptimizer, RouteProviderError,
};

/// Build an attraction from a raw id and `lat`/`lon` degrees.
///
/// # Panics
///
/// Panics if `id` is not a valid [`AttractionId`].
#[must_use]
pub fn attraction(id: &str, name: &str, lat: f64, lon: f64) -> Attraction {
    let parsed = AttractionId::parse(id).unwrap_or_else(|err| panic!("test id {id:?}: {err}"));
    Attraction::new(parsed, name, Coord { x: lon, y: lat })
}

/// In-memory `AttractionStore` performing a linear scan.
#[derive(Default, Debug, Clone)]
pub struct MemoryStore {
    attractions: Vec<Attraction>,
}

impl MemoryStore {
    /// Create a store from a collection of attractions, kept in order.
    pub fn with_attractions<I>(attractions: I) -> Self
    where
        I: IntoIterator<Item = Attraction>,
    {
        Self {
            attractions: attractions.into_iter().collect(),
        }
    }
}

impl AttractionStore for MemoryStore {
    fn attractions_in_bbox(
        &self,
        bbox: &Rect<f64>,
    ) -> Box<dyn Iterator<Item = Attraction> + Send + '_> {
        let area = *bbox;
        Box::new(
            self.attractions
                .iter()
                // `Intersects` treats boundary points as inside the rectangle.
                .filter(move |a| area.intersects(&a.location))
                .cloned(),
        )
    }

    fn attractions_by_id(&self, ids: &[AttractionId]) -> Vec<Attraction> {
        ids.iter()
            .filter_map(|id| self.attractions.iter().find(|a| a.id == *id))
            .cloned()
            .collect()
    }
}

/// `Geocoder` answering from a fixed gazetteer.
///
/// Unknown addresses yield [`GeocodeError::NotFound`] unless a blanket error
/// is configured.
#[derive(Default, Debug, Clone)]
pub struct StubGeocoder {
    places: HashMap<String, Coord<f64>>,
    error: Option<GeocodeError>,
    delay: Option<Duration>,
    calls: Arc<AtomicUsize>,
}

impl StubGeocoder {
    /// Register a known place.
    #[must_use]
    pub fn with_place(mut self, address: impl Into<String>, coord: Coord<f64>) -> Self {
        self.places.insert(address.into(), coord);
        self
    }

    /// Fail every lookup with `error`.
    #[must_use]
    pub fn with_error(mut self, error: GeocodeError) -> Self {
        self.error = Some(error);
        self
    }

    /// Sleep before answering.
    #[must_use]
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Number of lookups performed, shared between clones.
    #[must_use]
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Geocoder for StubGeocoder {
    async fn geocode(&self, address: &str) -> Result<Coord<f64>, GeocodeError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        if let Some(error) = &self.error {
            return Err(error.clone());
        }
        self.places
            .get(address)
            .copied()
            .ok_or_else(|| GeocodeError::NotFound {
                address: address.to_owned(),
            })
    }
}

#[derive(Debug, Clone)]
enum StubAnswer {
    Fixed(OptimizedRoute),
    Failing(RouteProviderError),
    Reversing,
}

/// `RouteOptimizer` returning a pre-configured answer.
#[derive(Debug, Clone)]
pub struct StubOptimizer {
    answer: StubAnswer,
    delay: Option<Duration>,
    calls: Arc<AtomicUsize>,
}

impl StubOptimizer {
    fn with_answer(answer: StubAnswer) -> Self {
        Self {
            answer,
            delay: None,
            calls: Arc::default(),
        }
    }

    /// Always return `route`, whatever the problem.
    #[must_use]
    pub fn fixed(route: OptimizedRoute) -> Self {
        Self::with_answer(StubAnswer::Fixed(route))
    }

    /// Always fail with `error`.
    #[must_use]
    pub fn failing(error: RouteProviderError) -> Self {
        Self::with_answer(StubAnswer::Failing(error))
    }

    /// Visit waypoints in reverse input order, echoing their coordinates as
    /// the path.
    #[must_use]
    pub fn reversing() -> Self {
        Self::with_answer(StubAnswer::Reversing)
    }

    /// Sleep before answering.
    #[must_use]
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Number of calls made, shared between clones.
    #[must_use]
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl RouteOptimizer for StubOptimizer {
    async fn optimize(
        &self,
        problem: &OptimizationProblem,
    ) -> Result<OptimizedRoute, RouteProviderError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        match &self.answer {
            StubAnswer::Fixed(route) => Ok(route.clone()),
            StubAnswer::Failing(error) => Err(error.clone()),
            StubAnswer::Reversing => {
                let waypoint_order: Vec<usize> = (0..problem.waypoints.len()).rev().collect();
                let path = std::iter::once(problem.origin)
                    .chain(
                        waypoint_order
                            .iter()
                            .filter_map(|&idx| problem.waypoints.get(idx).copied()),
                    )
                    .chain(std::iter::once(problem.destination))
                    .collect();
                Ok(OptimizedRoute {
                    waypoint_order,
                    path,
                })
            }
        }
    }
}

/// Write `attractions` into a fresh `attractions` table at `path`.
#[cfg(feature = "store-sqlite")]
pub fn write_attractions_database(
    path: &std::path::Path,
    attractions: &[Attraction],
) -> Result<(), rusqlite::Error> {
    let mut connection = rusqlite::Connection::open(path)?;
    connection.execute(
        "CREATE TABLE attractions (
            id TEXT PRIMARY KEY,
            name TEXT,
            lat REAL,
            lon REAL,
            category TEXT,
            website_url TEXT,
            average_rating REAL,
            rating_count INTEGER
        )",
        [],
    )?;
    let tx = connection.transaction()?;
    {
        let mut insert = tx.prepare(
            "INSERT INTO attractions
                (id, name, lat, lon, category, website_url, average_rating, rating_count)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
        )?;
        for a in attractions {
            insert.execute(rusqlite::params![
                a.id.as_str(),
                a.name,
                a.location.y,
                a.location.x,
                a.category,
                a.website_url,
                f64::from(a.rating.average),
                a.rating.count,
            ])?;
        }
    }
    tx.commit()
}
