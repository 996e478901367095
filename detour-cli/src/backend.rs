//! Construction of the store and network adapters used by the commands.

use std::time::Duration;

use camino::Utf8Path;
use detour_core::{AttractionStore, Geocoder, RouteOptimizer, UnavailableOptimizer};
use detour_data::{
    CachingOptimizer, NominatimConfig, NominatimGeocoder, OsrmTripConfig, OsrmTripOptimizer,
    RouteCache,
};
use log::debug;

use crate::CliError;
use crate::optimize::OptimizeConfig;

/// Cache `source` tag recorded for OSRM answers.
const OSRM_SOURCE: &str = "osrm";

/// Builds the collaborators a command needs.
///
/// Commands receive the builder as a trait object so tests can substitute
/// in-memory doubles for the network services.
pub(crate) trait BackendBuilder {
    fn store(&self, path: &Utf8Path) -> Result<Box<dyn AttractionStore>, CliError>;

    fn geocoder(&self, base_url: &str, timeout: Duration) -> Result<Box<dyn Geocoder>, CliError>;

    fn optimizer(&self, config: &OptimizeConfig) -> Result<Box<dyn RouteOptimizer>, CliError>;

    fn route_cache(&self, path: &Utf8Path) -> Result<RouteCache, CliError> {
        RouteCache::open(path.as_std_path()).map_err(|source| CliError::RouteCache {
            path: path.to_path_buf(),
            source,
        })
    }
}

pub(crate) struct DefaultBackendBuilder;

impl BackendBuilder for DefaultBackendBuilder {
    #[cfg(feature = "store-sqlite")]
    fn store(&self, path: &Utf8Path) -> Result<Box<dyn AttractionStore>, CliError> {
        let store = detour_core::SqliteAttractionStore::open(path.as_std_path()).map_err(
            |source| CliError::OpenAttractionStore {
                path: path.to_path_buf(),
                source,
            },
        )?;
        Ok(Box::new(store))
    }

    #[cfg(not(feature = "store-sqlite"))]
    fn store(&self, _path: &Utf8Path) -> Result<Box<dyn AttractionStore>, CliError> {
        Err(CliError::MissingFeature {
            feature: "store-sqlite",
            action: "opening the attraction database",
        })
    }

    fn geocoder(&self, base_url: &str, timeout: Duration) -> Result<Box<dyn Geocoder>, CliError> {
        let config = NominatimConfig::new(base_url).with_timeout(timeout);
        let geocoder =
            NominatimGeocoder::with_config(config).map_err(|source| CliError::BuildClient {
                service: "Nominatim",
                base_url: base_url.to_owned(),
                source,
            })?;
        Ok(Box::new(geocoder))
    }

    fn optimizer(&self, config: &OptimizeConfig) -> Result<Box<dyn RouteOptimizer>, CliError> {
        if config.offline {
            debug!("offline mode: sequencing with the local heuristic only");
            return Ok(Box::new(UnavailableOptimizer));
        }
        let trip_config =
            OsrmTripConfig::new(config.osrm_base_url.clone()).with_timeout(config.provider_timeout);
        let osrm =
            OsrmTripOptimizer::with_config(trip_config).map_err(|source| CliError::BuildClient {
                service: "OSRM",
                base_url: config.osrm_base_url.clone(),
                source,
            })?;
        match &config.cache_db {
            Some(path) => {
                let cache = self.route_cache(path)?;
                Ok(Box::new(CachingOptimizer::new(osrm, cache, OSRM_SOURCE)))
            }
            None => Ok(Box::new(osrm)),
        }
    }
}
