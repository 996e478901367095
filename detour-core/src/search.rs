//! Corridor search: candidate discovery between two endpoints.
//!
//! A search resolves both endpoints, pre-filters the store by the corridor's
//! bounding box, keeps rows inside the buffer, applies category and
//! exclusion filters and finally caps the result under a total order of
//! `(category, name, id)`.

use std::collections::{BTreeSet, HashSet};
use std::time::Duration;

use geo::Coord;
use log::debug;
use thiserror::Error;
use tokio_util::sync::CancellationToken;

use crate::corridor::check_radius;
use crate::error::{EndpointRole, ValidationError};
use crate::geocode::{Endpoint, GeocodeError, Geocoder, resolve_endpoint};
use crate::{Attraction, AttractionId, AttractionStore, Corridor};

/// Default bound on each geocoding call.
pub const DEFAULT_GEOCODE_TIMEOUT: Duration = Duration::from_secs(10);

/// Parameters of one corridor search.
#[derive(Debug, Clone, PartialEq)]
pub struct CorridorQuery {
    /// Trip start.
    pub start: Endpoint,
    /// Trip end.
    pub end: Endpoint,
    /// Buffer radius around the start-end line, in kilometres.
    pub radius_km: f64,
    /// Maximum number of candidates to return.
    pub limit: i64,
    /// Categories to keep. Empty means no filtering.
    pub categories: BTreeSet<String>,
    /// Ids never returned, typically the session's trashed set.
    pub excluded_ids: BTreeSet<AttractionId>,
}

impl CorridorQuery {
    /// Unfiltered query between two endpoints.
    #[must_use]
    pub fn new(start: Endpoint, end: Endpoint, radius_km: f64, limit: i64) -> Self {
        Self {
            start,
            end,
            radius_km,
            limit,
            categories: BTreeSet::new(),
            excluded_ids: BTreeSet::new(),
        }
    }

    /// Restrict results to the given categories.
    #[must_use]
    pub fn with_categories<I, S>(mut self, categories: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.categories = categories.into_iter().map(Into::into).collect();
        self
    }

    /// Exclude the given ids.
    #[must_use]
    pub fn with_excluded_ids<I>(mut self, ids: I) -> Self
    where
        I: IntoIterator<Item = AttractionId>,
    {
        self.excluded_ids = ids.into_iter().collect();
        self
    }

    /// Check every field that can be checked without a network call and
    /// return the limit as a length.
    fn validate(&self) -> Result<usize, ValidationError> {
        check_radius(self.radius_km)?;
        if self.limit <= 0 {
            return Err(ValidationError::NonPositiveLimit { limit: self.limit });
        }
        check_endpoint(&self.start, EndpointRole::Start)?;
        check_endpoint(&self.end, EndpointRole::End)?;
        Ok(usize::try_from(self.limit).unwrap_or(usize::MAX))
    }
}

fn check_endpoint(endpoint: &Endpoint, role: EndpointRole) -> Result<(), ValidationError> {
    match endpoint {
        Endpoint::Address(address) if address.trim().is_empty() => {
            Err(ValidationError::EmptyEndpoint { role })
        }
        Endpoint::Address(_) => Ok(()),
        Endpoint::Coordinate(c) => Endpoint::from_lat_lon(c.y, c.x, role).map(|_| ()),
    }
}

/// Result of a successful corridor search.
#[derive(Debug, Clone, PartialEq)]
pub struct SearchResult {
    /// Candidates ordered by `(category, name, id)`.
    pub candidates: Vec<Attraction>,
    /// Resolved start coordinate.
    pub start: Coord<f64>,
    /// Resolved end coordinate.
    pub end: Coord<f64>,
    /// Distinct category labels of `candidates`, first-seen order.
    pub unique_categories: Vec<String>,
}

/// Errors returned by [`CorridorSearchService::search`].
#[derive(Debug, Clone, PartialEq, Error)]
pub enum SearchError {
    /// The query was rejected before any network call.
    #[error(transparent)]
    Validation(#[from] ValidationError),
    /// An endpoint could not be resolved.
    #[error("could not resolve {role}: {source}")]
    Geocode {
        /// Endpoint that failed.
        role: EndpointRole,
        /// Geocoder failure.
        #[source]
        source: GeocodeError,
    },
    /// The search was cancelled before it completed.
    #[error("search cancelled")]
    Cancelled,
}

/// Finds attractions inside the corridor between two endpoints.
///
/// The service is stateless; it never touches selection state.
#[derive(Debug)]
pub struct CorridorSearchService<S, G> {
    store: S,
    geocoder: G,
    geocode_timeout: Duration,
}

impl<S, G> CorridorSearchService<S, G>
where
    S: AttractionStore,
    G: Geocoder,
{
    /// Build a service over `store`, resolving addresses with `geocoder`.
    pub fn new(store: S, geocoder: G) -> Self {
        Self {
            store,
            geocoder,
            geocode_timeout: DEFAULT_GEOCODE_TIMEOUT,
        }
    }

    /// Override the per-call geocoding timeout.
    #[must_use]
    pub fn with_geocode_timeout(mut self, timeout: Duration) -> Self {
        self.geocode_timeout = timeout;
        self
    }

    /// Backing store.
    pub fn store(&self) -> &S {
        &self.store
    }

    /// Run a search to completion.
    pub async fn search(&self, query: &CorridorQuery) -> Result<SearchResult, SearchError> {
        self.search_cancellable(query, &CancellationToken::new())
            .await
    }

    /// Run a search that stops early when `cancel` fires.
    ///
    /// Cancellation is only observed while endpoints are being resolved; the
    /// store query itself is local and runs to completion.
    pub async fn search_cancellable(
        &self,
        query: &CorridorQuery,
        cancel: &CancellationToken,
    ) -> Result<SearchResult, SearchError> {
        let limit = query.validate()?;

        let resolve = async {
            tokio::try_join!(
                self.resolve(&query.start, EndpointRole::Start),
                self.resolve(&query.end, EndpointRole::End),
            )
        };
        let (start, end) = tokio::select! {
            biased;
            () = cancel.cancelled() => return Err(SearchError::Cancelled),
            resolved = resolve => resolved?,
        };

        let corridor = Corridor::new(start, end, query.radius_km)?;
        let candidates = self.collect(&corridor, query, limit);
        let unique_categories = unique_categories(&candidates);
        debug!(
            "corridor search returned {} candidates within {} km",
            candidates.len(),
            corridor.radius_km()
        );
        Ok(SearchResult {
            candidates,
            start,
            end,
            unique_categories,
        })
    }

    async fn resolve(
        &self,
        endpoint: &Endpoint,
        role: EndpointRole,
    ) -> Result<Coord<f64>, SearchError> {
        resolve_endpoint(&self.geocoder, endpoint, self.geocode_timeout)
            .await
            .map_err(|source| SearchError::Geocode { role, source })
    }

    fn collect(&self, corridor: &Corridor, query: &CorridorQuery, limit: usize) -> Vec<Attraction> {
        let wanted: HashSet<String> = query
            .categories
            .iter()
            .map(|c| normalise_category(c))
            .filter(|c| !c.is_empty())
            .collect();
        let mut seen = HashSet::new();
        let mut rows: Vec<Attraction> = self
            .store
            .attractions_in_bbox(&corridor.bounding_rect())
            .filter(|a| corridor.contains(a.location))
            .filter(|a| seen.insert(a.id.clone()))
            .filter(|a| {
                wanted.is_empty() || wanted.contains(&normalise_category(a.category_label()))
            })
            .filter(|a| !query.excluded_ids.contains(&a.id))
            .collect();
        rows.sort_by(|a, b| {
            a.category_label()
                .cmp(b.category_label())
                .then_with(|| a.name.cmp(&b.name))
                .then_with(|| a.id.cmp(&b.id))
        });
        rows.truncate(limit);
        rows
    }
}

fn normalise_category(raw: &str) -> String {
    raw.trim().to_lowercase()
}

fn unique_categories(rows: &[Attraction]) -> Vec<String> {
    let mut seen = HashSet::new();
    rows.iter()
        .map(Attraction::category_label)
        .filter(|label| seen.insert(*label))
        .map(str::to_owned)
        .collect()
}
