//! Read-through caching decorator for route optimisers.

use async_trait::async_trait;
use detour_core::{OptimizationProblem, OptimizedRoute, RouteOptimizer, RouteProviderError};
use log::{debug, warn};

use super::{RouteCache, RouteCacheError, cache_key};

/// Wraps a [`RouteOptimizer`], answering repeated problems from a
/// [`RouteCache`].
///
/// Cache failures are logged and bypassed; they never fail an optimisation.
#[derive(Debug, Clone)]
pub struct CachingOptimizer<R> {
    inner: R,
    cache: RouteCache,
    source: String,
}

impl<R> CachingOptimizer<R> {
    /// Cache answers from `inner`, tagging entries with `source`.
    pub fn new(inner: R, cache: RouteCache, source: impl Into<String>) -> Self {
        Self {
            inner,
            cache,
            source: source.into(),
        }
    }

    /// Underlying cache.
    pub fn cache(&self) -> &RouteCache {
        &self.cache
    }

    async fn lookup(&self, key: &str) -> Result<Option<OptimizedRoute>, RouteCacheError> {
        let cache = self.cache.clone();
        let owned_key = key.to_owned();
        tokio::task::spawn_blocking(move || cache.get(&owned_key))
            .await
            .map_err(|err| RouteCacheError::Task(err.to_string()))?
    }

    async fn store(&self, key: &str, route: &OptimizedRoute) -> Result<(), RouteCacheError> {
        let cache = self.cache.clone();
        let owned_key = key.to_owned();
        let owned_route = route.clone();
        let source = self.source.clone();
        tokio::task::spawn_blocking(move || cache.set(&owned_key, &owned_route, &source))
            .await
            .map_err(|err| RouteCacheError::Task(err.to_string()))?
    }
}

#[async_trait]
impl<R: RouteOptimizer> RouteOptimizer for CachingOptimizer<R> {
    async fn optimize(
        &self,
        problem: &OptimizationProblem,
    ) -> Result<OptimizedRoute, RouteProviderError> {
        let key = cache_key(problem);
        match self.lookup(&key).await {
            Ok(Some(route)) => {
                debug!("route cache hit for {key}");
                return Ok(route);
            }
            Ok(None) => debug!("route cache miss for {key}"),
            Err(err) => warn!("route cache lookup failed: {err}"),
        }

        let route = self.inner.optimize(problem).await?;
        if let Err(err) = self.store(&key, &route).await {
            warn!("failed to cache route: {err}");
        }
        Ok(route)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use detour_core::test_support::StubOptimizer;
    use geo::Coord;
    use rstest::{fixture, rstest};

    #[fixture]
    fn problem() -> OptimizationProblem {
        OptimizationProblem {
            origin: Coord { x: 0.0, y: 0.0 },
            destination: Coord { x: 0.3, y: 0.0 },
            waypoints: vec![Coord { x: 0.1, y: 0.0 }, Coord { x: 0.2, y: 0.0 }],
        }
    }

    fn caching(stub: &StubOptimizer) -> CachingOptimizer<StubOptimizer> {
        let cache = RouteCache::in_memory().expect("in-memory cache");
        CachingOptimizer::new(stub.clone(), cache, "osrm")
    }

    #[rstest]
    #[tokio::test]
    async fn second_request_is_served_from_cache(problem: OptimizationProblem) {
        let stub = StubOptimizer::reversing();
        let optimizer = caching(&stub);

        let first = optimizer.optimize(&problem).await.expect("first");
        let second = optimizer.optimize(&problem).await.expect("second");

        assert_eq!(first, second);
        assert_eq!(stub.calls(), 1);
        assert_eq!(optimizer.cache().len().expect("count"), 1);
    }

    #[rstest]
    #[tokio::test]
    async fn failures_are_not_cached(problem: OptimizationProblem) {
        let stub = StubOptimizer::failing(RouteProviderError::Unavailable);
        let optimizer = caching(&stub);

        for _ in 0..2 {
            let err = optimizer.optimize(&problem).await.expect_err("failure");
            assert_eq!(err, RouteProviderError::Unavailable);
        }
        assert_eq!(stub.calls(), 2);
        assert!(optimizer.cache().is_empty().expect("count"));
    }

    #[rstest]
    #[tokio::test]
    async fn waypoint_order_is_part_of_the_key(problem: OptimizationProblem) {
        let stub = StubOptimizer::reversing();
        let optimizer = caching(&stub);
        let mut swapped = problem.clone();
        swapped.waypoints.reverse();

        optimizer.optimize(&problem).await.expect("first");
        optimizer.optimize(&swapped).await.expect("second");

        assert_eq!(stub.calls(), 2);
    }
}
