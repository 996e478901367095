//! Route optimisation through an OSRM routing service.
//!
//! This module provides [`OsrmTripOptimizer`], an implementation of
//! [`detour_core::RouteOptimizer`] that asks the OSRM Trip service for the
//! best visiting order of the intermediate stops, keeping the first and last
//! coordinates fixed.
//!
//! # Example
//!
//! ```no_run
//! use detour_core::{OptimizationProblem, RouteOptimizer};
//! use detour_data::routing::{OsrmTripConfig, OsrmTripOptimizer};
//! use geo::Coord;
//! use std::time::Duration;
//!
//! # async fn demo() -> Result<(), Box<dyn std::error::Error>> {
//! let config = OsrmTripConfig::new("http://localhost:5000")
//!     .with_profile("foot")
//!     .with_timeout(Duration::from_secs(20));
//! let optimizer = OsrmTripOptimizer::with_config(config)?;
//!
//! let problem = OptimizationProblem {
//!     origin: Coord { x: -0.1, y: 51.5 },
//!     destination: Coord { x: -0.2, y: 51.6 },
//!     waypoints: vec![Coord { x: -0.15, y: 51.55 }],
//! };
//! let route = optimizer.optimize(&problem).await?;
//! println!("order: {:?}", route.waypoint_order);
//! # Ok(())
//! # }
//! ```

mod osrm;
mod provider;

pub use provider::{DEFAULT_OSRM_URL, OsrmTripConfig, OsrmTripOptimizer};
