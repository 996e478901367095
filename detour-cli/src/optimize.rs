//! `detour optimize`: order a selection of attractions into a route.

use std::io::{BufReader, Write};
use std::time::Duration;

use camino::{Utf8Path, Utf8PathBuf};
use clap::Parser;
use detour_core::{
    DEFAULT_GEOCODE_TIMEOUT, DEFAULT_MAX_WAYPOINTS, NormalizerConfig, RouteNormalizer,
    RouteRequest, RouteSequencer, SequencerConfig,
};
use detour_data::geocoding::DEFAULT_NOMINATIM_URL;
use detour_data::routing::DEFAULT_OSRM_URL;
use log::{info, warn};
use ortho_config::{OrthoConfig, SubcmdConfigMerge};
use serde::{Deserialize, Serialize};

use crate::backend::BackendBuilder;
use crate::fs::{open_utf8_file, require_existing};
use crate::wire::{OptimizeRequest, OptimizeResponse, StopRecord};
use crate::{
    ARG_ATTRACTIONS_DB, ARG_CACHE_DB, ARG_GEOCODE_TIMEOUT_SECS, ARG_MAX_WAYPOINTS,
    ARG_NOMINATIM_BASE_URL, ARG_OFFLINE, ARG_OSRM_BASE_URL, ARG_PROVIDER_TIMEOUT_SECS,
    ARG_REQUEST, CliError, DEFAULT_ATTRACTIONS_DB, ENV_OPTIMIZE_REQUEST, positive_secs, runtime,
    write_json,
};

const DEFAULT_PROVIDER_TIMEOUT: Duration = Duration::from_secs(15);

/// CLI arguments for the `optimize` subcommand.
#[derive(Debug, Clone, Parser, Deserialize, Serialize, OrthoConfig, Default)]
#[command(
    long_about = "Order the given attractions between optional departure and \
                 arrival points. The OSRM trip service is asked first; when it \
                 is unreachable or fails, a local nearest-neighbour and 2-opt \
                 heuristic is used and the answer is flagged as degraded.",
    about = "Sequence attractions into a route"
)]
#[ortho_config(prefix = "DETOUR")]
pub(crate) struct OptimizeArgs {
    /// Path to a JSON file containing the optimisation request.
    #[arg(value_name = "path")]
    #[serde(default)]
    pub(crate) request_path: Option<Utf8PathBuf>,
    /// Path to the SQLite attraction database.
    #[arg(long = ARG_ATTRACTIONS_DB, value_name = "path")]
    #[serde(default)]
    pub(crate) attractions_db: Option<Utf8PathBuf>,
    /// Base URL of the Nominatim geocoding service.
    #[arg(long = ARG_NOMINATIM_BASE_URL, value_name = "url")]
    #[serde(default)]
    pub(crate) nominatim_base_url: Option<String>,
    /// Seconds allowed for each geocoding call.
    #[arg(long = ARG_GEOCODE_TIMEOUT_SECS, value_name = "secs")]
    #[serde(default)]
    pub(crate) geocode_timeout_secs: Option<u64>,
    /// Base URL of the OSRM server (e.g. "http://localhost:5000").
    #[arg(long = ARG_OSRM_BASE_URL, value_name = "url")]
    #[serde(default)]
    pub(crate) osrm_base_url: Option<String>,
    /// Seconds allowed for the routing provider call.
    #[arg(long = ARG_PROVIDER_TIMEOUT_SECS, value_name = "secs")]
    #[serde(default)]
    pub(crate) provider_timeout_secs: Option<u64>,
    /// Largest number of intermediate stops sent to the provider.
    #[arg(long = ARG_MAX_WAYPOINTS, value_name = "count")]
    #[serde(default)]
    pub(crate) max_waypoints: Option<usize>,
    /// SQLite file caching provider answers between runs.
    #[arg(long = ARG_CACHE_DB, value_name = "path")]
    #[serde(default)]
    pub(crate) cache_db: Option<Utf8PathBuf>,
    /// Skip the routing provider and use the local heuristic.
    #[arg(
        long = ARG_OFFLINE,
        value_name = "bool",
        num_args = 0..=1,
        default_missing_value = "true"
    )]
    #[serde(default)]
    pub(crate) offline: Option<bool>,
}

impl OptimizeArgs {
    pub(crate) fn into_config(self) -> Result<OptimizeConfig, CliError> {
        let merged = self.load_and_merge().map_err(CliError::Configuration)?;
        OptimizeConfig::try_from(merged)
    }
}

/// Resolved `optimize` command configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct OptimizeConfig {
    pub(crate) request_path: Utf8PathBuf,
    pub(crate) attractions_db: Utf8PathBuf,
    pub(crate) nominatim_base_url: String,
    pub(crate) geocode_timeout: Duration,
    pub(crate) osrm_base_url: String,
    pub(crate) provider_timeout: Duration,
    pub(crate) max_waypoints: usize,
    pub(crate) cache_db: Option<Utf8PathBuf>,
    pub(crate) offline: bool,
}

impl OptimizeConfig {
    pub(crate) fn validate_sources(&self) -> Result<(), CliError> {
        require_existing(&self.request_path, ARG_REQUEST)?;
        require_existing(&self.attractions_db, ARG_ATTRACTIONS_DB)?;
        Ok(())
    }

    fn sequencer_config(&self) -> SequencerConfig {
        SequencerConfig {
            max_waypoints: self.max_waypoints,
            provider_timeout: self.provider_timeout,
            geocode_timeout: self.geocode_timeout,
            ..SequencerConfig::default()
        }
    }
}

impl TryFrom<OptimizeArgs> for OptimizeConfig {
    type Error = CliError;

    fn try_from(args: OptimizeArgs) -> Result<Self, Self::Error> {
        let request_path = args.request_path.ok_or(CliError::MissingArgument {
            field: ARG_REQUEST,
            env: ENV_OPTIMIZE_REQUEST,
        })?;
        let max_waypoints = match args.max_waypoints {
            None => DEFAULT_MAX_WAYPOINTS,
            Some(0) => {
                return Err(CliError::InvalidSetting {
                    field: ARG_MAX_WAYPOINTS,
                    message: "must allow at least one stop".to_owned(),
                });
            }
            Some(max) => max,
        };
        Ok(Self {
            request_path,
            attractions_db: args
                .attractions_db
                .unwrap_or_else(|| Utf8PathBuf::from(DEFAULT_ATTRACTIONS_DB)),
            nominatim_base_url: args
                .nominatim_base_url
                .unwrap_or_else(|| DEFAULT_NOMINATIM_URL.to_owned()),
            geocode_timeout: positive_secs(
                args.geocode_timeout_secs,
                DEFAULT_GEOCODE_TIMEOUT,
                ARG_GEOCODE_TIMEOUT_SECS,
            )?,
            osrm_base_url: args
                .osrm_base_url
                .unwrap_or_else(|| DEFAULT_OSRM_URL.to_owned()),
            provider_timeout: positive_secs(
                args.provider_timeout_secs,
                DEFAULT_PROVIDER_TIMEOUT,
                ARG_PROVIDER_TIMEOUT_SECS,
            )?,
            max_waypoints,
            cache_db: args.cache_db,
            offline: args.offline.unwrap_or(false),
        })
    }
}

pub(crate) fn run_optimize_with(
    args: OptimizeArgs,
    builder: &dyn BackendBuilder,
    writer: &mut dyn Write,
) -> Result<(), CliError> {
    let config = args.into_config()?;
    let response = execute_optimize(&config, builder)?;
    write_json(writer, &response)
}

pub(crate) fn execute_optimize(
    config: &OptimizeConfig,
    builder: &dyn BackendBuilder,
) -> Result<OptimizeResponse, CliError> {
    config.validate_sources()?;
    let path = config.request_path.as_path();
    let request = load_optimize_request(path)?;
    let ids = request.ids(path)?;
    let mut route_request = RouteRequest::new(ids);
    route_request.start = request.departure(path)?;
    route_request.end = request.arrival(path)?;

    let store = builder.store(&config.attractions_db)?;
    let attractions = store.attractions_by_id(&route_request.attraction_ids);
    if attractions.len() < route_request.attraction_ids.len() {
        warn!(
            "{} of {} requested attraction(s) are not in the database",
            route_request.attraction_ids.len() - attractions.len(),
            route_request.attraction_ids.len()
        );
    }

    let geocoder = builder.geocoder(&config.nominatim_base_url, config.geocode_timeout)?;
    let optimizer = builder.optimizer(config)?;
    let sequencer = RouteSequencer::with_config(optimizer, geocoder, config.sequencer_config());
    let sequence = runtime()?.block_on(sequencer.sequence(&route_request, &attractions))?;
    if sequence.degraded {
        info!("route computed locally; provider answer unavailable");
    }

    let stops =
        RouteNormalizer::new(NormalizerConfig::default()).normalize(&sequence, &attractions);
    Ok(OptimizeResponse {
        ordered_stops: stops.iter().map(StopRecord::from).collect(),
        degraded: sequence.degraded,
    })
}

/// Loads a JSON-encoded optimisation request from disk.
pub(crate) fn load_optimize_request(path: &Utf8Path) -> Result<OptimizeRequest, CliError> {
    let file = open_utf8_file(path).map_err(|source| CliError::OpenRequest {
        path: path.to_path_buf(),
        source,
    })?;
    serde_json::from_reader(BufReader::new(file)).map_err(|source| CliError::ParseRequest {
        path: path.to_path_buf(),
        source,
    })
}

#[cfg(test)]
pub(crate) fn config_from_layers_for_test(
    layers: Vec<ortho_config::MergeLayer<'static>>,
) -> Result<OptimizeConfig, CliError> {
    let merged = OptimizeArgs::merge_from_layers(layers).map_err(CliError::from)?;
    OptimizeConfig::try_from(merged)
}
