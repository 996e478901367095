//! Route sequencing: ordering a curated selection between fixed endpoints.
//!
//! [`RouteSequencer`] delegates to a [`RouteOptimizer`] and falls back to the
//! deterministic [`LocalHeuristic`] whenever the provider fails, times out or
//! answers with something that is not a permutation. Fallback results are
//! flagged as degraded.

mod heuristic;
mod normalize;
mod optimizer;

use std::collections::HashSet;
use std::time::{Duration, Instant};

use geo::Coord;
use log::{debug, info, warn};
use thiserror::Error;
use tokio_util::sync::CancellationToken;

pub use heuristic::{LocalHeuristic, TWO_OPT_EPSILON_KM, nearest_neighbour, tour_length_km, two_opt};
pub use normalize::{NormalizerConfig, OrderedStop, RouteNormalizer};
pub use optimizer::{
    OptimizationProblem, OptimizedRoute, RouteOptimizer, RouteProviderError, UnavailableOptimizer,
};

use crate::error::{CapacityError, EndpointRole, ValidationError};
use crate::geocode::{Endpoint, GeocodeError, Geocoder, resolve_endpoint};
use crate::{Attraction, AttractionId};

/// Waypoint cap applied when no other limit is configured.
pub const DEFAULT_MAX_WAYPOINTS: usize = 23;

/// Tunables for [`RouteSequencer`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SequencerConfig {
    /// Largest number of intermediate stops accepted.
    pub max_waypoints: usize,
    /// Bound on each provider call.
    pub provider_timeout: Duration,
    /// Bound on each endpoint geocoding call.
    pub geocode_timeout: Duration,
    /// Apply 2-opt after nearest-neighbour construction in the fallback.
    pub improve_with_two_opt: bool,
    /// Upper bound on accepted 2-opt moves.
    pub two_opt_max_passes: usize,
}

impl Default for SequencerConfig {
    fn default() -> Self {
        Self {
            max_waypoints: DEFAULT_MAX_WAYPOINTS,
            provider_timeout: Duration::from_secs(15),
            geocode_timeout: crate::search::DEFAULT_GEOCODE_TIMEOUT,
            improve_with_two_opt: true,
            two_opt_max_passes: 1000,
        }
    }
}

impl SequencerConfig {
    fn heuristic(&self) -> LocalHeuristic {
        LocalHeuristic {
            improve_with_two_opt: self.improve_with_two_opt,
            max_passes: self.two_opt_max_passes,
        }
    }
}

/// Attractions to order, with optional fixed endpoints.
#[derive(Debug, Clone, PartialEq)]
pub struct RouteRequest {
    /// Fixed first stop. When absent the first resolved attraction is used.
    pub start: Option<Endpoint>,
    /// Fixed last stop. When absent the last resolved attraction is used.
    pub end: Option<Endpoint>,
    /// Attractions to visit. Order only matters for choosing synthetic
    /// endpoints; duplicates are ignored.
    pub attraction_ids: Vec<AttractionId>,
}

impl RouteRequest {
    /// Request without fixed endpoints.
    #[must_use]
    pub fn new(attraction_ids: Vec<AttractionId>) -> Self {
        Self {
            start: None,
            end: None,
            attraction_ids,
        }
    }

    /// Fix the first stop.
    #[must_use]
    pub fn with_start(mut self, start: Endpoint) -> Self {
        self.start = Some(start);
        self
    }

    /// Fix the last stop.
    #[must_use]
    pub fn with_end(mut self, end: Endpoint) -> Self {
        self.end = Some(end);
        self
    }
}

/// What a sequenced stop stands for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StopKind {
    /// Caller-supplied start.
    Departure,
    /// Caller-supplied end.
    Arrival,
    /// A selected attraction.
    Attraction(AttractionId),
}

/// One stop of a [`Sequence`].
#[derive(Debug, Clone, PartialEq)]
pub struct SequencedStop {
    /// Identity of the stop.
    pub kind: StopKind,
    /// Position used when ordering.
    pub location: Coord<f64>,
}

/// Visiting order produced by [`RouteSequencer::sequence`].
#[derive(Debug, Clone, PartialEq)]
pub struct Sequence {
    /// Stops in visiting order, endpoints included.
    pub stops: Vec<SequencedStop>,
    /// Set when the order came from the local heuristic.
    pub degraded: bool,
    /// Provider coordinates for each stop, when the provider supplied them.
    pub path: Option<Vec<Coord<f64>>>,
}

impl Sequence {
    /// Attraction ids in visiting order.
    pub fn attraction_ids(&self) -> impl Iterator<Item = &AttractionId> + '_ {
        self.stops.iter().filter_map(|stop| match &stop.kind {
            StopKind::Attraction(id) => Some(id),
            StopKind::Departure | StopKind::Arrival => None,
        })
    }
}

/// Errors returned by [`RouteSequencer::sequence`].
#[derive(Debug, Clone, PartialEq, Error)]
pub enum SequenceError {
    /// The request cannot be sequenced.
    #[error(transparent)]
    Validation(#[from] ValidationError),
    /// The selection exceeds the waypoint cap.
    #[error(transparent)]
    Capacity(#[from] CapacityError),
    /// A supplied endpoint could not be resolved.
    #[error("could not resolve {role}: {source}")]
    Geocode {
        /// Endpoint that failed.
        role: EndpointRole,
        /// Geocoder failure.
        #[source]
        source: GeocodeError,
    },
    /// Sequencing was cancelled before it completed.
    #[error("sequencing cancelled")]
    Cancelled,
}

/// Orders a selection of attractions between fixed endpoints.
#[derive(Debug)]
pub struct RouteSequencer<R, G> {
    optimizer: R,
    geocoder: G,
    config: SequencerConfig,
}

/// Endpoint of the tour before geocoding.
enum Anchor<'a> {
    Supplied(&'a Endpoint),
    Attraction(&'a Attraction),
}

impl<R, G> RouteSequencer<R, G>
where
    R: RouteOptimizer,
    G: Geocoder,
{
    /// Build a sequencer with the default configuration.
    pub fn new(optimizer: R, geocoder: G) -> Self {
        Self::with_config(optimizer, geocoder, SequencerConfig::default())
    }

    /// Build a sequencer with explicit configuration.
    pub fn with_config(optimizer: R, geocoder: G, config: SequencerConfig) -> Self {
        Self {
            optimizer,
            geocoder,
            config,
        }
    }

    /// Active configuration.
    pub fn config(&self) -> &SequencerConfig {
        &self.config
    }

    /// Order `request` against the known `attractions`.
    pub async fn sequence(
        &self,
        request: &RouteRequest,
        attractions: &[Attraction],
    ) -> Result<Sequence, SequenceError> {
        self.sequence_cancellable(request, attractions, &CancellationToken::new())
            .await
    }

    /// Order `request`, abandoning the work when `cancel` fires.
    ///
    /// Validation and the waypoint cap are checked before any network call.
    pub async fn sequence_cancellable(
        &self,
        request: &RouteRequest,
        attractions: &[Attraction],
        cancel: &CancellationToken,
    ) -> Result<Sequence, SequenceError> {
        let working = working_set(request, attractions);
        if working.len() < 2 {
            return Err(ValidationError::TooFewPoints {
                found: working.len(),
            }
            .into());
        }

        let (first, rest) = match (&request.start, working.split_first()) {
            (Some(start), _) => (Anchor::Supplied(start), working.as_slice()),
            (None, Some((head, tail))) => (Anchor::Attraction(*head), tail),
            (None, None) => {
                return Err(ValidationError::TooFewPoints {
                    found: working.len(),
                }
                .into());
            }
        };
        let (last, middle) = match (&request.end, rest.split_last()) {
            (Some(end), _) => (Anchor::Supplied(end), rest),
            (None, Some((last, middle))) => (Anchor::Attraction(*last), middle),
            (None, None) => {
                return Err(ValidationError::TooFewPoints {
                    found: working.len(),
                }
                .into());
            }
        };
        if middle.len() > self.config.max_waypoints {
            return Err(CapacityError {
                requested: middle.len(),
                max: self.config.max_waypoints,
            }
            .into());
        }

        let resolve = async {
            tokio::try_join!(
                self.resolve(&first, EndpointRole::Start),
                self.resolve(&last, EndpointRole::End),
            )
        };
        let (origin, destination) = tokio::select! {
            biased;
            () = cancel.cancelled() => return Err(SequenceError::Cancelled),
            resolved = resolve => resolved?,
        };

        let problem = OptimizationProblem {
            origin: origin.location,
            destination: destination.location,
            waypoints: middle.iter().map(|a| a.location).collect(),
        };
        let (order, degraded, path) = if middle.is_empty() {
            (Vec::new(), false, None)
        } else {
            match self.consult_provider(&problem, cancel).await? {
                Ok(route) => {
                    let path = (route.path.len() == middle.len() + 2).then_some(route.path);
                    (route.waypoint_order, false, path)
                }
                Err(err) => {
                    warn!("route provider failed, using local heuristic: {err}");
                    (self.fallback(&problem), true, None)
                }
            }
        };

        let mut stops = Vec::with_capacity(order.len() + 2);
        stops.push(origin);
        stops.extend(
            order
                .into_iter()
                .filter_map(|idx| middle.get(idx).copied().map(attraction_stop)),
        );
        stops.push(destination);
        Ok(Sequence {
            stops,
            degraded,
            path,
        })
    }

    async fn resolve(
        &self,
        anchor: &Anchor<'_>,
        role: EndpointRole,
    ) -> Result<SequencedStop, SequenceError> {
        match anchor {
            Anchor::Attraction(attraction) => Ok(attraction_stop(attraction)),
            Anchor::Supplied(endpoint) => {
                let location =
                    resolve_endpoint(&self.geocoder, endpoint, self.config.geocode_timeout)
                        .await
                        .map_err(|source| SequenceError::Geocode { role, source })?;
                let kind = match role {
                    EndpointRole::Start => StopKind::Departure,
                    EndpointRole::End => StopKind::Arrival,
                };
                Ok(SequencedStop { kind, location })
            }
        }
    }

    /// Ask the provider for an order. The outer `Result` only carries
    /// cancellation; provider failures are returned in the inner one.
    async fn consult_provider(
        &self,
        problem: &OptimizationProblem,
        cancel: &CancellationToken,
    ) -> Result<Result<OptimizedRoute, RouteProviderError>, SequenceError> {
        let timeout = self.config.provider_timeout;
        let outcome = tokio::select! {
            biased;
            () = cancel.cancelled() => return Err(SequenceError::Cancelled),
            outcome = tokio::time::timeout(timeout, self.optimizer.optimize(problem)) => outcome,
        };
        let answer = match outcome {
            Ok(answer) => answer,
            Err(_) => Err(RouteProviderError::Timeout {
                timeout_secs: timeout.as_secs(),
            }),
        };
        Ok(answer.and_then(|route| {
            if route.is_permutation_of(problem.waypoints.len()) {
                Ok(route)
            } else {
                Err(RouteProviderError::InvalidPermutation)
            }
        }))
    }

    fn fallback(&self, problem: &OptimizationProblem) -> Vec<usize> {
        let started = Instant::now();
        let order = self.config.heuristic().order(problem);
        info!(
            "local heuristic ordered {} waypoints in {:.3}s",
            problem.waypoints.len(),
            started.elapsed().as_secs_f64()
        );
        order
    }
}

/// Resolve requested ids against `attractions`, dropping duplicates and
/// unknown ids but keeping request order.
fn working_set<'a>(request: &RouteRequest, attractions: &'a [Attraction]) -> Vec<&'a Attraction> {
    let mut seen = HashSet::new();
    let resolved: Vec<_> = request
        .attraction_ids
        .iter()
        .filter(|id| seen.insert(*id))
        .filter_map(|id| attractions.iter().find(|a| a.id == *id))
        .collect();
    let unknown = seen.len() - resolved.len();
    if unknown > 0 {
        debug!("{unknown} requested attractions could not be resolved");
    }
    resolved
}

fn attraction_stop(attraction: &Attraction) -> SequencedStop {
    SequencedStop {
        kind: StopKind::Attraction(attraction.id.clone()),
        location: attraction.location,
    }
}
