//! Focused unit tests covering the route cache maintenance command.

use super::helpers::{StubBackendBuilder, Workspace};
use super::*;
use detour_core::OptimizedRoute;
use detour_data::RouteCache;
use geo::Coord;
use rstest::rstest;

use crate::cache::{CacheClearArgs, CacheClearConfig, clear_cache};

#[rstest]
fn converting_clear_without_cache_path_errors() {
    let err = CacheClearConfig::try_from(CacheClearArgs::default()).expect_err("missing path");
    match err {
        CliError::MissingArgument { field, env } => {
            assert_eq!(field, ARG_CACHE_DB);
            assert_eq!(env, ENV_CACHE_DB);
        }
        other => panic!("expected MissingArgument, found {other:?}"),
    }
}

#[rstest]
fn clearing_reports_removed_entries() {
    let workspace = Workspace::new();
    let cache_db = workspace.root.join("routes.sqlite");
    let cache = RouteCache::open(cache_db.as_std_path()).expect("open cache");
    let route = OptimizedRoute {
        waypoint_order: vec![0],
        path: vec![Coord { x: 0.0, y: 0.0 }],
    };
    cache.set("a", &route, "osrm").expect("store a");
    cache.set("b", &route, "osrm").expect("store b");

    let config = CacheClearConfig { cache_db };
    let builder = StubBackendBuilder::default();
    let report = clear_cache(&config, &builder).expect("clear");
    assert_eq!(report.cleared, 2);
    assert!(cache.is_empty().expect("count entries"));

    let again = clear_cache(&config, &builder).expect("clear again");
    assert_eq!(again.cleared, 0);
}
