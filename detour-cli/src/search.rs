//! `detour search`: find attractions inside a corridor.

use std::io::{BufReader, Write};
use std::time::Duration;

use camino::{Utf8Path, Utf8PathBuf};
use clap::Parser;
use detour_core::{CorridorSearchService, DEFAULT_GEOCODE_TIMEOUT};
use detour_data::geocoding::DEFAULT_NOMINATIM_URL;
use log::info;
use ortho_config::{OrthoConfig, SubcmdConfigMerge};
use serde::{Deserialize, Serialize};

use crate::backend::BackendBuilder;
use crate::fs::{open_utf8_file, require_existing};
use crate::wire::{SearchRequest, SearchResponse};
use crate::{
    ARG_ATTRACTIONS_DB, ARG_GEOCODE_TIMEOUT_SECS, ARG_NOMINATIM_BASE_URL, ARG_REQUEST, CliError,
    DEFAULT_ATTRACTIONS_DB, ENV_SEARCH_REQUEST, positive_secs, runtime, write_json,
};

/// CLI arguments for the `search` subcommand.
#[derive(Debug, Clone, Parser, Deserialize, Serialize, OrthoConfig, Default)]
#[command(
    long_about = "Search the corridor between a start and an end point for \
                 attractions. The request is a JSON document naming both \
                 endpoints, the corridor radius in kilometres, a result \
                 limit and optional category and exclusion filters.",
    about = "Find attractions along a corridor"
)]
#[ortho_config(prefix = "DETOUR")]
pub(crate) struct SearchArgs {
    /// Path to a JSON file containing the search request.
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
}

impl SearchArgs {
    pub(crate) fn into_config(self) -> Result<SearchConfig, CliError> {
        let merged = self.load_and_merge().map_err(CliError::Configuration)?;
        SearchConfig::try_from(merged)
    }
}

/// Resolved `search` command configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct SearchConfig {
    pub(crate) request_path: Utf8PathBuf,
    pub(crate) attractions_db: Utf8PathBuf,
    pub(crate) nominatim_base_url: String,
    pub(crate) geocode_timeout: Duration,
}

impl SearchConfig {
    pub(crate) fn validate_sources(&self) -> Result<(), CliError> {
        require_existing(&self.request_path, ARG_REQUEST)?;
        require_existing(&self.attractions_db, ARG_ATTRACTIONS_DB)?;
        Ok(())
    }
}

impl TryFrom<SearchArgs> for SearchConfig {
    type Error = CliError;

    fn try_from(args: SearchArgs) -> Result<Self, Self::Error> {
        let request_path = args.request_path.ok_or(CliError::MissingArgument {
            field: ARG_REQUEST,
            env: ENV_SEARCH_REQUEST,
        })?;
        let geocode_timeout = positive_secs(
            args.geocode_timeout_secs,
            DEFAULT_GEOCODE_TIMEOUT,
            ARG_GEOCODE_TIMEOUT_SECS,
        )?;
        Ok(Self {
            request_path,
            attractions_db: args
                .attractions_db
                .unwrap_or_else(|| Utf8PathBuf::from(DEFAULT_ATTRACTIONS_DB)),
            nominatim_base_url: args
                .nominatim_base_url
                .unwrap_or_else(|| DEFAULT_NOMINATIM_URL.to_owned()),
            geocode_timeout,
        })
    }
}

pub(crate) fn run_search_with(
    args: SearchArgs,
    builder: &dyn BackendBuilder,
    writer: &mut dyn Write,
) -> Result<(), CliError> {
    let config = args.into_config()?;
    let response = execute_search(&config, builder)?;
    write_json(writer, &response)
}

pub(crate) fn execute_search(
    config: &SearchConfig,
    builder: &dyn BackendBuilder,
) -> Result<SearchResponse, CliError> {
    config.validate_sources()?;
    let query = load_search_request(&config.request_path)?.into_query(&config.request_path)?;
    let store = builder.store(&config.attractions_db)?;
    let geocoder = builder.geocoder(&config.nominatim_base_url, config.geocode_timeout)?;
    let service = CorridorSearchService::new(store, geocoder)
        .with_geocode_timeout(config.geocode_timeout);

    let result = runtime()?.block_on(service.search(&query))?;
    info!(
        "search returned {} attraction(s) in {} categories",
        result.candidates.len(),
        result.unique_categories.len()
    );
    Ok(SearchResponse::from(&result))
}

/// Loads a JSON-encoded search request from disk.
pub(crate) fn load_search_request(path: &Utf8Path) -> Result<SearchRequest, CliError> {
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
) -> Result<SearchConfig, CliError> {
    let merged = SearchArgs::merge_from_layers(layers).map_err(CliError::from)?;
    SearchConfig::try_from(merged)
}
