//! `RouteOptimizer` backed by OSRM's Trip API.
//!
//! The request lists the origin, every waypoint and the destination as
//! `lon,lat` pairs. OSRM answers with each input coordinate's position in
//! the trip; sorting inputs by that position yields the visiting order.

use std::time::Duration;

use async_trait::async_trait;
use detour_core::{OptimizationProblem, OptimizedRoute, RouteOptimizer, RouteProviderError};
use geo::Coord;
use log::debug;
use reqwest::Client;
use url::Url;

use super::osrm::{TripResponse, TripWaypoint};
use crate::http::{
    DEFAULT_USER_AGENT, ProviderBuildError, build_client, join_path, parse_base_url,
};

/// Local OSRM instance.
pub const DEFAULT_OSRM_URL: &str = "http://localhost:5000";

/// Default request timeout in seconds.
const DEFAULT_TIMEOUT_SECS: u64 = 15;

/// Configuration for [`OsrmTripOptimizer`].
#[derive(Debug, Clone)]
pub struct OsrmTripConfig {
    /// Base URL for the OSRM service (e.g., `"http://localhost:5000"`).
    pub base_url: String,
    /// Routing profile, such as `driving` or `foot`.
    pub profile: String,
    /// Request timeout duration.
    pub timeout: Duration,
    /// User agent string for requests.
    pub user_agent: String,
}

impl Default for OsrmTripConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_OSRM_URL.to_owned(),
            profile: "driving".to_owned(),
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            user_agent: DEFAULT_USER_AGENT.to_owned(),
        }
    }
}

impl OsrmTripConfig {
    /// Create a new configuration with the given base URL.
    #[must_use]
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            ..Default::default()
        }
    }

    /// Set the routing profile.
    #[must_use]
    pub fn with_profile(mut self, profile: impl Into<String>) -> Self {
        self.profile = profile.into();
        self
    }

    /// Set the request timeout.
    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Set the user agent string.
    #[must_use]
    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = user_agent.into();
        self
    }
}

/// Route optimiser using the OSRM Trip API.
#[derive(Debug, Clone)]
pub struct OsrmTripOptimizer {
    client: Client,
    trip_url: Url,
    timeout: Duration,
}

impl OsrmTripOptimizer {
    /// Create a new optimiser with default configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the URL is invalid or the HTTP client fails to
    /// build.
    pub fn new(base_url: impl Into<String>) -> Result<Self, ProviderBuildError> {
        Self::with_config(OsrmTripConfig::new(base_url))
    }

    /// Create a new optimiser with explicit configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the URL is invalid or the HTTP client fails to
    /// build.
    pub fn with_config(config: OsrmTripConfig) -> Result<Self, ProviderBuildError> {
        let base = parse_base_url(&config.base_url)?;
        Ok(Self {
            client: build_client(&config.user_agent, config.timeout)?,
            trip_url: join_path(&base, &["trip", "v1", config.profile.as_str()]),
            timeout: config.timeout,
        })
    }

    /// Build the OSRM Trip API URL for `problem`.
    ///
    /// The URL format is: `{base_url}/trip/v1/{profile}/{coordinates}` where
    /// coordinates are semicolon-separated `lon,lat` pairs.
    fn build_trip_url(&self, problem: &OptimizationProblem) -> Url {
        let coords = std::iter::once(&problem.origin)
            .chain(&problem.waypoints)
            .chain(std::iter::once(&problem.destination))
            .map(|c| format!("{},{}", c.x, c.y))
            .collect::<Vec<_>>()
            .join(";");

        let mut url = join_path(&self.trip_url, &[coords.as_str()]);
        url.query_pairs_mut()
            .append_pair("source", "first")
            .append_pair("destination", "last")
            .append_pair("roundtrip", "false")
            .append_pair("overview", "false");
        url
    }

    /// Convert a reqwest error to a `RouteProviderError`.
    fn convert_reqwest_error(&self, error: &reqwest::Error, url: &Url) -> RouteProviderError {
        if error.is_timeout() {
            return RouteProviderError::Timeout {
                timeout_secs: self.timeout.as_secs(),
            };
        }

        if let Some(status) = error.status() {
            return RouteProviderError::HttpError {
                url: url.to_string(),
                status: status.as_u16(),
                message: error.to_string(),
            };
        }

        RouteProviderError::NetworkError {
            url: url.to_string(),
            message: error.to_string(),
        }
    }
}

/// Convert an OSRM response for `waypoint_count` intermediate stops into an
/// [`OptimizedRoute`].
fn convert_response(
    response: TripResponse,
    waypoint_count: usize,
) -> Result<OptimizedRoute, RouteProviderError> {
    if !response.is_ok() {
        return Err(RouteProviderError::ServiceError {
            code: response.code,
            message: response.message.unwrap_or_default(),
        });
    }

    let waypoints = response
        .waypoints
        .ok_or_else(|| RouteProviderError::ParseError {
            message: "OSRM response missing waypoints array".to_owned(),
        })?;
    let expected = waypoint_count + 2;
    if waypoints.len() != expected {
        return Err(RouteProviderError::ParseError {
            message: format!(
                "expected {expected} waypoints in OSRM response, got {}",
                waypoints.len()
            ),
        });
    }
    if waypoints.iter().any(|w| w.trips_index != 0) {
        return Err(RouteProviderError::ParseError {
            message: "OSRM split the stops across several trips".to_owned(),
        });
    }

    // Input indices in visiting order.
    let mut visiting: Vec<(usize, &TripWaypoint)> = waypoints.iter().enumerate().collect();
    visiting.sort_by_key(|(_, w)| w.waypoint_index);

    let last = expected - 1;
    match (visiting.first(), visiting.last()) {
        (Some((0, _)), Some((end, _))) if *end == last => {}
        _ => return Err(RouteProviderError::InvalidPermutation),
    }

    let waypoint_order = visiting
        .iter()
        .skip(1)
        .take(waypoint_count)
        .map(|(input, _)| input.saturating_sub(1))
        .collect();
    let path = visiting
        .iter()
        .map(|(_, w)| {
            let [x, y] = w.location;
            Coord { x, y }
        })
        .collect();

    Ok(OptimizedRoute {
        waypoint_order,
        path,
    })
}

#[async_trait]
impl RouteOptimizer for OsrmTripOptimizer {
    async fn optimize(
        &self,
        problem: &OptimizationProblem,
    ) -> Result<OptimizedRoute, RouteProviderError> {
        let url = self.build_trip_url(problem);
        debug!(
            "requesting OSRM trip for {} waypoints",
            problem.waypoints.len()
        );

        let response = self
            .client
            .get(url.clone())
            .send()
            .await
            .map_err(|err| self.convert_reqwest_error(&err, &url))?
            .error_for_status()
            .map_err(|err| self.convert_reqwest_error(&err, &url))?;

        let trip: TripResponse =
            response
                .json()
                .await
                .map_err(|err| RouteProviderError::ParseError {
                    message: err.to_string(),
                })?;

        convert_response(trip, problem.waypoints.len())
    }
}
