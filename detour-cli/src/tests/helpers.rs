//! Fixtures shared by the CLI unit and behaviour tests.

use super::*;
use camino::{Utf8Path, Utf8PathBuf};
use detour_core::test_support::{
    StubGeocoder, StubOptimizer, attraction, write_attractions_database,
};
use detour_core::{Attraction, AttractionStore, Geocoder, RouteOptimizer};
use geo::Coord;
use std::time::Duration;
use tempfile::TempDir;

use crate::optimize::OptimizeConfig;

pub(super) fn write_utf8(path: &Utf8Path, contents: &[u8]) {
    std::fs::write(path.as_std_path(), contents).expect("write file");
}

/// Attractions on the equator between longitudes 0.0 and 0.1, plus one far
/// to the north.
pub(super) fn sample_attractions() -> Vec<Attraction> {
    vec![
        attraction("node/1", "Lighthouse", 0.0, 0.02).with_category("Landmark"),
        attraction("node/2", "Harbour Museum", 0.0, 0.05).with_category("Museum"),
        attraction("node/3", "Fish Market", 0.0, 0.08),
        attraction("node/4", "Mountain Hut", 1.0, 0.05).with_category("Landmark"),
    ]
}

/// Address the stub geocoder resolves to the eastern end of the corridor.
pub(super) const HARBOUR: &str = "Harbour";

pub(super) fn harbour() -> Coord<f64> {
    Coord { x: 0.1, y: 0.0 }
}

/// Temporary directory holding an attraction database and request files.
#[derive(Debug)]
pub(super) struct Workspace {
    _dir: TempDir,
    pub(super) root: Utf8PathBuf,
    pub(super) attractions_db: Utf8PathBuf,
    pub(super) request_path: Utf8PathBuf,
}

impl Workspace {
    /// A workspace with the sample attraction database written.
    pub(super) fn new() -> Self {
        let workspace = Self::empty();
        workspace.write_attractions();
        workspace
    }

    pub(super) fn empty() -> Self {
        let dir = TempDir::new().expect("tempdir");
        let root = Utf8PathBuf::from_path_buf(dir.path().to_path_buf()).expect("utf-8 workspace");
        Self {
            _dir: dir,
            attractions_db: root.join("data.sqlite"),
            request_path: root.join("request.json"),
            root,
        }
    }

    pub(super) fn write_attractions(&self) {
        write_attractions_database(self.attractions_db.as_std_path(), &sample_attractions())
            .expect("write attractions database");
    }

    pub(super) fn write_request(&self, request: &serde_json::Value) {
        let payload = serde_json::to_vec_pretty(request).expect("serialise request");
        write_utf8(&self.request_path, &payload);
    }
}

/// Opens the real SQLite store but answers network calls from stubs.
#[derive(Debug, Clone)]
pub(super) struct StubBackendBuilder {
    pub(super) geocoder: StubGeocoder,
    pub(super) optimizer: StubOptimizer,
}

impl Default for StubBackendBuilder {
    fn default() -> Self {
        Self {
            geocoder: StubGeocoder::default().with_place(HARBOUR, harbour()),
            optimizer: StubOptimizer::reversing(),
        }
    }
}

impl BackendBuilder for StubBackendBuilder {
    fn store(&self, path: &Utf8Path) -> Result<Box<dyn AttractionStore>, CliError> {
        DefaultBackendBuilder.store(path)
    }

    fn geocoder(&self, _base_url: &str, _timeout: Duration) -> Result<Box<dyn Geocoder>, CliError> {
        Ok(Box::new(self.geocoder.clone()))
    }

    fn optimizer(&self, config: &OptimizeConfig) -> Result<Box<dyn RouteOptimizer>, CliError> {
        if config.offline {
            return DefaultBackendBuilder.optimizer(config);
        }
        Ok(Box::new(self.optimizer.clone()))
    }
}
