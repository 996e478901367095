//! Canonical stop lists for downstream consumers.
//!
//! Stops that carry an attraction id resolve by id; provider geometry, which
//! may be snapped to the road network, only supplies their coordinates.
//! Endpoints and bare provider paths are matched back to the nearest known
//! attraction within a fixed tolerance. A stop that cannot be identified is
//! labelled `Stop N` instead of failing.

use geo::Coord;
use log::debug;
use thiserror::Error;

use super::{Sequence, SequencedStop, StopKind};
use crate::corridor::haversine_km;
use crate::{Attraction, AttractionId};

/// Default snapping tolerance in metres.
pub const DEFAULT_MATCH_TOLERANCE_M: f64 = 50.0;

/// Tunables for [`RouteNormalizer`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NormalizerConfig {
    /// Largest distance, in metres, at which a coordinate still identifies an
    /// attraction.
    pub match_tolerance_m: f64,
}

impl Default for NormalizerConfig {
    fn default() -> Self {
        Self {
            match_tolerance_m: DEFAULT_MATCH_TOLERANCE_M,
        }
    }
}

/// One entry of the canonical route.
#[derive(Debug, Clone, PartialEq)]
pub struct OrderedStop {
    /// Zero-based position in the route.
    pub sequence_index: usize,
    /// Stop position.
    pub location: Coord<f64>,
    /// Display name, or `Stop N` when the stop could not be identified.
    pub name: String,
    /// Matched attraction, if any.
    pub attraction_id: Option<AttractionId>,
}

#[derive(Debug, Error)]
enum IdentityResolutionError {
    #[error("no attraction within {tolerance_m} m of ({lat}, {lon})")]
    NoMatch { tolerance_m: f64, lat: f64, lon: f64 },
    #[error("attraction {id} is not among the known attractions")]
    UnknownId { id: AttractionId },
}

/// Converts sequencer output into [`OrderedStop`]s.
#[derive(Debug, Clone, Copy, Default)]
pub struct RouteNormalizer {
    config: NormalizerConfig,
}

impl RouteNormalizer {
    /// Build a normaliser.
    #[must_use]
    pub const fn new(config: NormalizerConfig) -> Self {
        Self { config }
    }

    /// Produce the canonical stop list for `sequence`.
    ///
    /// A provider path aligned with the stops replaces their coordinates but
    /// never their identities. An unaligned path is matched by coordinate
    /// alone.
    #[must_use]
    pub fn normalize(&self, sequence: &Sequence, attractions: &[Attraction]) -> Vec<OrderedStop> {
        match &sequence.path {
            Some(path) if path.len() == sequence.stops.len() => sequence
                .stops
                .iter()
                .zip(path)
                .enumerate()
                .map(|(index, (stop, &location))| {
                    labelled(index, location, self.resolve(&stop.kind, location, attractions))
                })
                .collect(),
            Some(path) => {
                debug!(
                    "provider path has {} points for {} stops; matching by coordinate",
                    path.len(),
                    sequence.stops.len()
                );
                self.normalize_path(path, attractions)
            }
            None => self.normalize_stops(&sequence.stops, attractions),
        }
    }

    /// Identify each coordinate of a provider path.
    #[must_use]
    pub fn normalize_path(
        &self,
        path: &[Coord<f64>],
        attractions: &[Attraction],
    ) -> Vec<OrderedStop> {
        path.iter()
            .enumerate()
            .map(|(index, &location)| {
                let matched = self.nearest(location, attractions);
                labelled(index, location, matched)
            })
            .collect()
    }

    /// Identify stops that already carry an id, falling back to coordinate
    /// matching for caller-supplied endpoints.
    #[must_use]
    pub fn normalize_stops(
        &self,
        stops: &[SequencedStop],
        attractions: &[Attraction],
    ) -> Vec<OrderedStop> {
        stops
            .iter()
            .enumerate()
            .map(|(index, stop)| {
                let matched = self.resolve(&stop.kind, stop.location, attractions);
                labelled(index, stop.location, matched)
            })
            .collect()
    }

    fn resolve<'a>(
        &self,
        kind: &StopKind,
        location: Coord<f64>,
        attractions: &'a [Attraction],
    ) -> Result<&'a Attraction, IdentityResolutionError> {
        match kind {
            StopKind::Attraction(id) => attractions
                .iter()
                .find(|a| a.id == *id)
                .ok_or_else(|| IdentityResolutionError::UnknownId { id: id.clone() }),
            StopKind::Departure | StopKind::Arrival => self.nearest(location, attractions),
        }
    }

    #[expect(clippy::float_arithmetic, reason = "kilometre to metre conversion")]
    fn nearest<'a>(
        &self,
        location: Coord<f64>,
        attractions: &'a [Attraction],
    ) -> Result<&'a Attraction, IdentityResolutionError> {
        attractions
            .iter()
            .map(|a| (a, haversine_km(location, a.location) * 1000.0))
            .filter(|(_, metres)| *metres <= self.config.match_tolerance_m)
            .min_by(|(_, a), (_, b)| a.total_cmp(b))
            .map(|(a, _)| a)
            .ok_or(IdentityResolutionError::NoMatch {
                tolerance_m: self.config.match_tolerance_m,
                lat: location.y,
                lon: location.x,
            })
    }
}

fn labelled(
    index: usize,
    location: Coord<f64>,
    matched: Result<&Attraction, IdentityResolutionError>,
) -> OrderedStop {
    match matched {
        Ok(attraction) => OrderedStop {
            sequence_index: index,
            location,
            name: attraction.name.clone(),
            attraction_id: Some(attraction.id.clone()),
        },
        Err(err) => {
            debug!("stop {index}: {err}");
            OrderedStop {
                sequence_index: index,
                location,
                name: format!("Stop {}", index + 1),
                attraction_id: None,
            }
        }
    }
}
