//! Errors shared by the corridor search and route sequencing services.

use std::fmt;

use thiserror::Error;

/// Which end of a trip an endpoint describes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EndpointRole {
    /// Departure point.
    Start,
    /// Arrival point.
    End,
}

impl fmt::Display for EndpointRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Start => f.write_str("start"),
            Self::End => f.write_str("end"),
        }
    }
}

/// A request was rejected before any network call was made.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ValidationError {
    /// The corridor radius was zero, negative or not finite.
    #[error("radius_km must be a positive number, got {radius_km}")]
    NonPositiveRadius {
        /// Radius as supplied.
        radius_km: f64,
    },
    /// The result limit was zero or negative.
    #[error("limit must be positive, got {limit}")]
    NonPositiveLimit {
        /// Limit as supplied.
        limit: i64,
    },
    /// An endpoint was blank.
    #[error("{role} must be a non-empty address or coordinate")]
    EmptyEndpoint {
        /// Endpoint that was blank.
        role: EndpointRole,
    },
    /// A literal coordinate lay outside WGS84 bounds.
    #[error("{role} coordinate ({lat}, {lon}) is outside WGS84 bounds")]
    CoordinateOutOfRange {
        /// Endpoint carrying the coordinate.
        role: EndpointRole,
        /// Latitude in degrees.
        lat: f64,
        /// Longitude in degrees.
        lon: f64,
    },
    /// The corridor would wrap across the ±180° meridian, which neither the
    /// planar buffer nor the bounding-box pre-filter models.
    #[error(
        "corridor from longitude {start_lon} to {end_lon} with radius {radius_km} km \
         crosses the antimeridian"
    )]
    CrossesAntimeridian {
        /// Start longitude in degrees.
        start_lon: f64,
        /// End longitude in degrees.
        end_lon: f64,
        /// Buffer radius in kilometres.
        radius_km: f64,
    },
    /// Sequencing needs at least two resolvable points.
    #[error("at least two attractions with coordinates are required, found {found}")]
    TooFewPoints {
        /// Number of attractions that resolved to a coordinate.
        found: usize,
    },
}

/// The selection holds more intermediate stops than the routing provider
/// accepts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("{requested} intermediate stops exceed the maximum of {max}; deselect some attractions")]
pub struct CapacityError {
    /// Number of intermediate stops in the request.
    pub requested: usize,
    /// Configured waypoint cap.
    pub max: usize,
}
