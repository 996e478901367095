//! Local ordering heuristic used when no provider answer is available.
//!
//! Nearest-neighbour construction from the origin by great-circle distance,
//! optionally followed by first-improvement 2-opt with both endpoints fixed.
//! Every step is deterministic: ties go to the lower waypoint index and the
//! improvement threshold is a fixed constant.

use geo::Coord;
use log::debug;

use super::optimizer::OptimizationProblem;
use crate::corridor::haversine_km;

/// Smallest tour shortening, in kilometres, that 2-opt accepts.
pub const TWO_OPT_EPSILON_KM: f64 = 1e-6;

/// Deterministic nearest-neighbour plus 2-opt ordering.
///
/// # Examples
/// ```
/// use geo::Coord;
/// use detour_core::{LocalHeuristic, OptimizationProblem};
///
/// let problem = OptimizationProblem {
///     origin: Coord { x: 0.0, y: 0.0 },
///     destination: Coord { x: 3.0, y: 0.0 },
///     waypoints: vec![Coord { x: 2.0, y: 0.0 }, Coord { x: 1.0, y: 0.0 }],
/// };
/// assert_eq!(LocalHeuristic::default().order(&problem), vec![1, 0]);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LocalHeuristic {
    /// Run 2-opt after construction.
    pub improve_with_two_opt: bool,
    /// Upper bound on accepted 2-opt moves.
    pub max_passes: usize,
}

impl Default for LocalHeuristic {
    fn default() -> Self {
        Self {
            improve_with_two_opt: true,
            max_passes: 1000,
        }
    }
}

impl LocalHeuristic {
    /// Order `problem.waypoints`, returning indices in visiting order.
    #[must_use]
    pub fn order(&self, problem: &OptimizationProblem) -> Vec<usize> {
        let mut order = nearest_neighbour(problem.origin, &problem.waypoints);
        if self.improve_with_two_opt {
            two_opt(problem, &mut order, self.max_passes);
        }
        order
    }
}

/// Greedy construction: repeatedly visit the closest unvisited waypoint.
#[must_use]
pub fn nearest_neighbour(origin: Coord<f64>, waypoints: &[Coord<f64>]) -> Vec<usize> {
    let mut remaining: Vec<(usize, Coord<f64>)> = waypoints.iter().copied().enumerate().collect();
    let mut order = Vec::with_capacity(waypoints.len());
    let mut current = origin;
    while let Some(slot) = remaining
        .iter()
        .enumerate()
        .min_by(|(_, (_, a)), (_, (_, b))| {
            haversine_km(current, *a).total_cmp(&haversine_km(current, *b))
        })
        .map(|(slot, _)| slot)
    {
        let (next, location) = remaining.remove(slot);
        order.push(next);
        current = location;
    }
    order
}

/// Improve `order` in place by reversing sub-paths while that shortens the
/// tour `origin -> waypoints[order..] -> destination`.
///
/// An `order` naming an index outside `problem.waypoints` is left untouched.
#[expect(
    clippy::float_arithmetic,
    reason = "2-opt gain is a sum of edge lengths"
)]
pub fn two_opt(problem: &OptimizationProblem, order: &mut [usize], max_passes: usize) {
    let Some(mut tour) = tour_points(problem, order) else {
        debug!("2-opt skipped: order names an unknown waypoint");
        return;
    };
    let len = order.len();
    if len < 2 {
        return;
    }
    let mut passes = 0;
    'search: while passes < max_passes {
        for i in 0..len - 1 {
            for j in i + 2..=len {
                let (Some(&a), Some(&b), Some(&c), Some(&d)) =
                    (tour.get(i), tour.get(i + 1), tour.get(j), tour.get(j + 1))
                else {
                    continue;
                };
                let delta = haversine_km(a, c) + haversine_km(b, d)
                    - haversine_km(a, b)
                    - haversine_km(c, d);
                if delta < -TWO_OPT_EPSILON_KM {
                    if let (Some(indices), Some(points)) =
                        (order.get_mut(i..j), tour.get_mut(i + 1..=j))
                    {
                        indices.reverse();
                        points.reverse();
                    }
                    passes += 1;
                    continue 'search;
                }
            }
        }
        break;
    }
}

/// Coordinates of `origin`, the waypoints in `order`, then `destination`.
/// `None` when `order` names an unknown waypoint.
fn tour_points(problem: &OptimizationProblem, order: &[usize]) -> Option<Vec<Coord<f64>>> {
    let mut tour = Vec::with_capacity(order.len() + 2);
    tour.push(problem.origin);
    for &idx in order {
        tour.push(*problem.waypoints.get(idx)?);
    }
    tour.push(problem.destination);
    Some(tour)
}

/// Great-circle length of the tour through `order`. Indices outside
/// `problem.waypoints` are skipped.
#[must_use]
pub fn tour_length_km(problem: &OptimizationProblem, order: &[usize]) -> f64 {
    let tour: Vec<Coord<f64>> = std::iter::once(problem.origin)
        .chain(order.iter().filter_map(|&idx| problem.waypoints.get(idx).copied()))
        .chain(std::iter::once(problem.destination))
        .collect();
    tour.iter()
        .zip(tour.iter().skip(1))
        .map(|(&from, &to)| haversine_km(from, to))
        .sum()
}
