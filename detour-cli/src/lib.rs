//! Command-line interface for the Detour trip planner.
//!
//! Every subcommand reads a JSON request from disk, merges its settings
//! from CLI flags, `DETOUR_*` environment variables and configuration
//! files, and prints a JSON answer on stdout.
#![forbid(unsafe_code)]

use std::io::Write;
use std::time::Duration;

use clap::{Parser, Subcommand};

mod backend;
mod cache;
mod error;
mod fs;
mod optimize;
mod search;
mod wire;

pub use error::CliError;

use backend::{BackendBuilder, DefaultBackendBuilder};
use cache::{CacheArgs, CacheCommand, run_cache_clear_with};
use optimize::{OptimizeArgs, run_optimize_with};
use search::{SearchArgs, run_search_with};

pub(crate) const ARG_REQUEST: &str = "request";
pub(crate) const ARG_ATTRACTIONS_DB: &str = "attractions-db";
pub(crate) const ARG_NOMINATIM_BASE_URL: &str = "nominatim-base-url";
pub(crate) const ARG_GEOCODE_TIMEOUT_SECS: &str = "geocode-timeout-secs";
pub(crate) const ARG_OSRM_BASE_URL: &str = "osrm-base-url";
pub(crate) const ARG_PROVIDER_TIMEOUT_SECS: &str = "provider-timeout-secs";
pub(crate) const ARG_MAX_WAYPOINTS: &str = "max-waypoints";
pub(crate) const ARG_CACHE_DB: &str = "cache-db";
pub(crate) const ARG_OFFLINE: &str = "offline";

pub(crate) const ENV_SEARCH_REQUEST: &str = "DETOUR_CMDS_SEARCH_REQUEST_PATH";
pub(crate) const ENV_OPTIMIZE_REQUEST: &str = "DETOUR_CMDS_OPTIMIZE_REQUEST_PATH";
pub(crate) const ENV_CACHE_DB: &str = "DETOUR_CMDS_CACHE_CLEAR_CACHE_DB";

pub(crate) const DEFAULT_ATTRACTIONS_DB: &str = "data.sqlite";

/// Run the Detour CLI with the current process arguments and environment.
pub fn run() -> Result<(), CliError> {
    let cli = Cli::try_parse().map_err(CliError::ArgumentParsing)?;
    let mut stdout = std::io::stdout().lock();
    dispatch(cli.command, &DefaultBackendBuilder, &mut stdout)
}

fn dispatch(
    command: Command,
    builder: &dyn BackendBuilder,
    writer: &mut dyn Write,
) -> Result<(), CliError> {
    match command {
        Command::Search(args) => run_search_with(args, builder, writer),
        Command::Optimize(args) => run_optimize_with(args, builder, writer),
        Command::Cache(CacheArgs {
            command: CacheCommand::Clear(args),
        }) => run_cache_clear_with(args, builder, writer),
    }
}

#[derive(Debug, Parser)]
#[command(
    name = "detour",
    about = "Find attractions along a corridor and sequence them into a route",
    version
)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Search the corridor between two endpoints for attractions.
    Search(SearchArgs),
    /// Order a selection of attractions between optional endpoints.
    Optimize(OptimizeArgs),
    /// Manage the persistent route cache.
    Cache(CacheArgs),
}

/// Convert an optional whole-second setting into a positive duration.
pub(crate) fn positive_secs(
    value: Option<u64>,
    default: Duration,
    field: &'static str,
) -> Result<Duration, CliError> {
    match value {
        None => Ok(default),
        Some(0) => Err(CliError::InvalidSetting {
            field,
            message: "must be at least one second".to_owned(),
        }),
        Some(secs) => Ok(Duration::from_secs(secs)),
    }
}

/// Build the single-threaded runtime each command drives its futures on.
pub(crate) fn runtime() -> Result<tokio::runtime::Runtime, CliError> {
    tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .map_err(CliError::Runtime)
}

/// Pretty-print `value` as JSON followed by a newline.
pub(crate) fn write_json<T: serde::Serialize>(
    writer: &mut dyn Write,
    value: &T,
) -> Result<(), CliError> {
    let payload = serde_json::to_string_pretty(value).map_err(CliError::SerialiseResponse)?;
    writer
        .write_all(payload.as_bytes())
        .map_err(CliError::WriteOutput)?;
    writer.write_all(b"\n").map_err(CliError::WriteOutput)?;
    Ok(())
}

#[cfg(test)]
mod tests;
