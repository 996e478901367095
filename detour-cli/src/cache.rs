//! `detour cache`: maintenance of the persistent route cache.

use std::io::Write;

use camino::Utf8PathBuf;
use clap::{Args, Parser, Subcommand};
use log::info;
use ortho_config::{OrthoConfig, SubcmdConfigMerge};
use serde::{Deserialize, Serialize};

use crate::backend::BackendBuilder;
use crate::{ARG_CACHE_DB, CliError, ENV_CACHE_DB, write_json};

#[derive(Debug, Args)]
pub(crate) struct CacheArgs {
    #[command(subcommand)]
    pub(crate) command: CacheCommand,
}

#[derive(Debug, Subcommand)]
pub(crate) enum CacheCommand {
    /// Remove every cached route.
    Clear(CacheClearArgs),
}

/// CLI arguments for the `cache clear` subcommand.
#[derive(Debug, Clone, Parser, Deserialize, Serialize, OrthoConfig, Default)]
#[command(about = "Remove every cached route and report how many were dropped")]
#[ortho_config(prefix = "DETOUR")]
pub(crate) struct CacheClearArgs {
    /// SQLite file holding cached provider answers.
    #[arg(long = ARG_CACHE_DB, value_name = "path")]
    #[serde(default)]
    pub(crate) cache_db: Option<Utf8PathBuf>,
}

/// Resolved `cache clear` configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct CacheClearConfig {
    pub(crate) cache_db: Utf8PathBuf,
}

impl TryFrom<CacheClearArgs> for CacheClearConfig {
    type Error = CliError;

    fn try_from(args: CacheClearArgs) -> Result<Self, Self::Error> {
        let cache_db = args.cache_db.ok_or(CliError::MissingArgument {
            field: ARG_CACHE_DB,
            env: ENV_CACHE_DB,
        })?;
        Ok(Self { cache_db })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
pub(crate) struct CacheClearReport {
    pub(crate) cleared: usize,
}

pub(crate) fn run_cache_clear_with(
    args: CacheClearArgs,
    builder: &dyn BackendBuilder,
    writer: &mut dyn Write,
) -> Result<(), CliError> {
    let merged = args.load_and_merge().map_err(CliError::Configuration)?;
    let config = CacheClearConfig::try_from(merged)?;
    let report = clear_cache(&config, builder)?;
    write_json(writer, &report)
}

pub(crate) fn clear_cache(
    config: &CacheClearConfig,
    builder: &dyn BackendBuilder,
) -> Result<CacheClearReport, CliError> {
    let cache = builder.route_cache(&config.cache_db)?;
    let cleared = cache.clear().map_err(|source| CliError::RouteCache {
        path: config.cache_db.clone(),
        source,
    })?;
    info!("cleared {cleared} cached route(s) from {}", config.cache_db);
    Ok(CacheClearReport { cleared })
}
