//! Endpoint resolution: turning addresses into coordinates.
//!
//! Endpoints written as a literal `"lat,lon"` pair never reach the network.
//! Anything else is handed to a [`Geocoder`] under a bounded timeout.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use geo::Coord;
use thiserror::Error;

use crate::error::{EndpointRole, ValidationError};

/// Trip start or end as supplied by a caller.
#[derive(Debug, Clone, PartialEq)]
pub enum Endpoint {
    /// Free-form address or place name that needs geocoding.
    Address(String),
    /// Already-resolved WGS84 coordinate (`x = longitude`, `y = latitude`).
    Coordinate(Coord<f64>),
}

impl Endpoint {
    /// Parse user input, recognising literal `"lat,lon"` pairs.
    ///
    /// # Examples
    /// ```
    /// use geo::Coord;
    /// use detour_core::{Endpoint, EndpointRole};
    ///
    /// let literal = Endpoint::parse("51.5, -0.12", EndpointRole::Start)?;
    /// assert_eq!(literal, Endpoint::Coordinate(Coord { x: -0.12, y: 51.5 }));
    ///
    /// let address = Endpoint::parse("Columbus, OH", EndpointRole::End)?;
    /// assert_eq!(address, Endpoint::Address("Columbus, OH".into()));
    /// # Ok::<(), detour_core::ValidationError>(())
    /// ```
    pub fn parse(raw: &str, role: EndpointRole) -> Result<Self, ValidationError> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Err(ValidationError::EmptyEndpoint { role });
        }
        match parse_lat_lon(trimmed) {
            Some((lat, lon)) => Self::from_lat_lon(lat, lon, role),
            None => Ok(Self::Address(trimmed.to_owned())),
        }
    }

    /// Build a coordinate endpoint, rejecting values outside WGS84 bounds.
    pub fn from_lat_lon(lat: f64, lon: f64, role: EndpointRole) -> Result<Self, ValidationError> {
        if !lat.is_finite() || !lon.is_finite() || lat.abs() > 90.0 || lon.abs() > 180.0 {
            return Err(ValidationError::CoordinateOutOfRange { role, lat, lon });
        }
        Ok(Self::Coordinate(Coord { x: lon, y: lat }))
    }
}

fn parse_lat_lon(raw: &str) -> Option<(f64, f64)> {
    let mut parts = raw.split(',').map(str::trim).filter(|p| !p.is_empty());
    let lat = parts.next()?.parse::<f64>().ok()?;
    let lon = parts.next()?.parse::<f64>().ok()?;
    if parts.next().is_some() {
        return None;
    }
    Some((lat, lon))
}

/// Endpoint could not be turned into a coordinate.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GeocodeError {
    /// The geocoding service found no match.
    #[error("no location found for {address:?}")]
    NotFound {
        /// Address that was looked up.
        address: String,
    },
    /// The service did not answer within the configured timeout.
    #[error("geocoding {address:?} timed out after {timeout_secs}s")]
    Timeout {
        /// Address that was looked up.
        address: String,
        /// Timeout applied to the call.
        timeout_secs: u64,
    },
    /// The service answered with an HTTP error status.
    #[error("geocoding service returned HTTP {status} for {url}: {message}")]
    HttpError {
        /// Request URL.
        url: String,
        /// HTTP status code.
        status: u16,
        /// Error detail.
        message: String,
    },
    /// The request never reached the service.
    #[error("network error contacting {url}: {message}")]
    NetworkError {
        /// Request URL.
        url: String,
        /// Error detail.
        message: String,
    },
    /// The response body could not be understood.
    #[error("failed to parse geocoding response: {message}")]
    ParseError {
        /// Error detail.
        message: String,
    },
}

/// Resolve an address into a WGS84 coordinate.
///
/// Implementations perform network I/O and must be cancel-safe: dropping the
/// returned future abandons the lookup without side effects.
#[async_trait]
pub trait Geocoder: Send + Sync {
    /// Look up `address`.
    async fn geocode(&self, address: &str) -> Result<Coord<f64>, GeocodeError>;
}

#[async_trait]
impl<T: Geocoder + ?Sized> Geocoder for Arc<T> {
    async fn geocode(&self, address: &str) -> Result<Coord<f64>, GeocodeError> {
        (**self).geocode(address).await
    }
}

#[async_trait]
impl<T: Geocoder + ?Sized> Geocoder for Box<T> {
    async fn geocode(&self, address: &str) -> Result<Coord<f64>, GeocodeError> {
        (**self).geocode(address).await
    }
}

/// Resolve `endpoint`, bounding any geocoder call by `timeout`.
pub(crate) async fn resolve_endpoint<G>(
    geocoder: &G,
    endpoint: &Endpoint,
    timeout: Duration,
) -> Result<Coord<f64>, GeocodeError>
where
    G: Geocoder + ?Sized,
{
    match endpoint {
        Endpoint::Coordinate(coord) => Ok(*coord),
        Endpoint::Address(address) => {
            match tokio::time::timeout(timeout, geocoder.geocode(address)).await {
                Ok(result) => result,
                Err(_) => Err(GeocodeError::Timeout {
                    address: address.clone(),
                    timeout_secs: timeout.as_secs(),
                }),
            }
        }
    }
}
