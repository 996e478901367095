//! Property-based tests for route sequencing.
//!
//! # Invariants tested
//!
//! - **Permutation:** the fallback order visits every attraction exactly once.
//! - **Determinism:** identical inputs yield identical sequences.
//! - **Improvement:** 2-opt never lengthens a nearest-neighbour tour.

use std::collections::HashSet;

use detour_core::route::{nearest_neighbour, tour_length_km, two_opt};
use detour_core::test_support::{StubGeocoder, StubOptimizer, attraction};
use detour_core::{
    Attraction, OptimizationProblem, RouteProviderError, RouteRequest, RouteSequencer, Sequence,
};
use geo::Coord;
use proptest::prelude::*;

fn coord_strategy() -> impl Strategy<Value = Coord<f64>> {
    (-0.5_f64..0.5, -0.5_f64..0.5).prop_map(|(lat, lon)| Coord { x: lon, y: lat })
}

fn attractions_from(coords: &[Coord<f64>]) -> Vec<Attraction> {
    coords
        .iter()
        .enumerate()
        .map(|(i, c)| attraction(&format!("node/{i}"), &format!("Stop {i}"), c.y, c.x))
        .collect()
}

fn sequence_offline(attractions: &[Attraction]) -> Sequence {
    let request = RouteRequest::new(attractions.iter().map(|a| a.id.clone()).collect());
    let sequencer = RouteSequencer::new(
        StubOptimizer::failing(RouteProviderError::Unavailable),
        StubGeocoder::default(),
    );
    tokio::runtime::Builder::new_current_thread()
        .enable_time()
        .build()
        .expect("runtime builds")
        .block_on(sequencer.sequence(&request, attractions))
        .expect("sequencing succeeds")
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    /// Property: every attraction appears exactly once.
    #[test]
    fn fallback_visits_each_attraction_once(coords in prop::collection::vec(coord_strategy(), 2..12)) {
        let attractions = attractions_from(&coords);
        let sequence = sequence_offline(&attractions);

        prop_assert!(sequence.degraded);
        let ids: Vec<_> = sequence.attraction_ids().collect();
        let unique: HashSet<_> = ids.iter().collect();
        prop_assert_eq!(ids.len(), attractions.len());
        prop_assert_eq!(unique.len(), attractions.len());
        prop_assert_eq!(ids.first().copied(), Some(&attractions[0].id));
        prop_assert_eq!(ids.last().copied(), attractions.last().map(|a| &a.id));
    }

    /// Property: two runs over the same input agree.
    #[test]
    fn sequencing_is_deterministic(coords in prop::collection::vec(coord_strategy(), 2..12)) {
        let attractions = attractions_from(&coords);
        prop_assert_eq!(sequence_offline(&attractions), sequence_offline(&attractions));
    }

    /// Property: 2-opt only accepts improving moves.
    #[test]
    fn two_opt_never_lengthens_the_tour(
        origin in coord_strategy(),
        destination in coord_strategy(),
        waypoints in prop::collection::vec(coord_strategy(), 0..10),
    ) {
        let problem = OptimizationProblem { origin, destination, waypoints };
        let mut order = nearest_neighbour(problem.origin, &problem.waypoints);
        let before = tour_length_km(&problem, &order);
        two_opt(&problem, &mut order, 1000);
        let after = tour_length_km(&problem, &order);
        prop_assert!(after <= before + 1e-9, "{after} > {before}");
    }
}
