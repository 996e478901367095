//! External route-optimisation providers.
//!
//! A provider receives a fixed origin and destination plus the intermediate
//! waypoints and answers with a visiting order for the waypoints. Providers
//! perform network I/O and are expected to be cancel-safe.

use std::sync::Arc;

use async_trait::async_trait;
use geo::Coord;
use thiserror::Error;

/// Ordering problem handed to a [`RouteOptimizer`].
#[derive(Debug, Clone, PartialEq)]
pub struct OptimizationProblem {
    /// Fixed first stop.
    pub origin: Coord<f64>,
    /// Fixed last stop.
    pub destination: Coord<f64>,
    /// Intermediate stops to reorder.
    pub waypoints: Vec<Coord<f64>>,
}

/// Provider answer for an [`OptimizationProblem`].
#[derive(Debug, Clone, PartialEq)]
pub struct OptimizedRoute {
    /// Indices into [`OptimizationProblem::waypoints`] in visiting order.
    pub waypoint_order: Vec<usize>,
    /// Coordinates of every stop in visiting order, origin and destination
    /// included, possibly snapped to the road network.
    pub path: Vec<Coord<f64>>,
}

impl OptimizedRoute {
    /// Whether `waypoint_order` is a permutation of `0..waypoints`.
    #[must_use]
    pub fn is_permutation_of(&self, waypoints: usize) -> bool {
        if self.waypoint_order.len() != waypoints {
            return false;
        }
        let mut seen = vec![false; waypoints];
        self.waypoint_order.iter().all(|&idx| {
            seen.get_mut(idx)
                .is_some_and(|slot| !std::mem::replace(slot, true))
        })
    }
}

/// Errors from [`RouteOptimizer::optimize`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RouteProviderError {
    /// No provider is configured, e.g. when running offline.
    #[error("route optimisation provider is unavailable")]
    Unavailable,
    /// The provider did not answer in time.
    #[error("route optimisation timed out after {timeout_secs}s")]
    Timeout {
        /// Timeout applied to the call.
        timeout_secs: u64,
    },
    /// The provider answered with an HTTP error status.
    #[error("route provider returned HTTP {status} for {url}: {message}")]
    HttpError {
        /// Request URL.
        url: String,
        /// HTTP status code.
        status: u16,
        /// Error detail.
        message: String,
    },
    /// The request never reached the provider.
    #[error("network error contacting {url}: {message}")]
    NetworkError {
        /// Request URL.
        url: String,
        /// Error detail.
        message: String,
    },
    /// The provider reported a failure code.
    #[error("route provider error {code}: {message}")]
    ServiceError {
        /// Provider status code.
        code: String,
        /// Provider message.
        message: String,
    },
    /// The response body could not be understood.
    #[error("failed to parse route provider response: {message}")]
    ParseError {
        /// Error detail.
        message: String,
    },
    /// The provider order was not a permutation of the waypoints.
    #[error("route provider returned an invalid waypoint order")]
    InvalidPermutation,
}

/// Compute a visiting order for intermediate stops.
#[async_trait]
pub trait RouteOptimizer: Send + Sync {
    /// Solve `problem`. Implementations need not validate their own output;
    /// callers check it with [`OptimizedRoute::is_permutation_of`].
    async fn optimize(
        &self,
        problem: &OptimizationProblem,
    ) -> Result<OptimizedRoute, RouteProviderError>;
}

#[async_trait]
impl<T: RouteOptimizer + ?Sized> RouteOptimizer for Arc<T> {
    async fn optimize(
        &self,
        problem: &OptimizationProblem,
    ) -> Result<OptimizedRoute, RouteProviderError> {
        (**self).optimize(problem).await
    }
}

#[async_trait]
impl<T: RouteOptimizer + ?Sized> RouteOptimizer for Box<T> {
    async fn optimize(
        &self,
        problem: &OptimizationProblem,
    ) -> Result<OptimizedRoute, RouteProviderError> {
        (**self).optimize(problem).await
    }
}

/// Provider that always reports [`RouteProviderError::Unavailable`], forcing
/// the local heuristic.
#[derive(Debug, Default, Clone, Copy)]
pub struct UnavailableOptimizer;

#[async_trait]
impl RouteOptimizer for UnavailableOptimizer {
    async fn optimize(
        &self,
        _problem: &OptimizationProblem,
    ) -> Result<OptimizedRoute, RouteProviderError> {
        Err(RouteProviderError::Unavailable)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn route(order: Vec<usize>) -> OptimizedRoute {
        OptimizedRoute {
            waypoint_order: order,
            path: Vec::new(),
        }
    }

    #[rstest]
    #[case(vec![], 0, true)]
    #[case(vec![2, 0, 1], 3, true)]
    #[case(vec![0, 0, 1], 3, false)]
    #[case(vec![0, 1], 3, false)]
    #[case(vec![0, 1, 3], 3, false)]
    fn permutation_check(#[case] order: Vec<usize>, #[case] len: usize, #[case] expected: bool) {
        assert_eq!(route(order).is_permutation_of(len), expected);
    }

    #[tokio::test]
    async fn unavailable_optimizer_always_fails() {
        let problem = OptimizationProblem {
            origin: Coord { x: 0.0, y: 0.0 },
            destination: Coord { x: 1.0, y: 1.0 },
            waypoints: vec![Coord { x: 0.5, y: 0.5 }],
        };
        let err = UnavailableOptimizer
            .optimize(&problem)
            .await
            .expect_err("never available");
        assert_eq!(err, RouteProviderError::Unavailable);
    }
}
