//! Error types emitted by the Detour CLI.
//!
//! Keep this error type reasonably small, as many CLI helpers return
//! `Result<_, CliError>`.

use std::sync::Arc;

use camino::Utf8PathBuf;
use detour_core::{AttractionIdError, SearchError, SequenceError, ValidationError};
use detour_data::{ProviderBuildError, RouteCacheError};
use thiserror::Error;

/// Errors emitted by the Detour CLI.
#[derive(Debug, Error)]
pub enum CliError {
    /// Provided arguments failed Clap validation.
    #[error(transparent)]
    ArgumentParsing(#[from] clap::Error),
    /// Configuration layering failed (files, env, CLI).
    #[error("failed to load configuration: {0}")]
    Configuration(#[from] Arc<ortho_config::OrthoError>),
    /// A required option is missing after configuration merging.
    #[error("missing {field} (set --{field} or {env})")]
    MissingArgument {
        field: &'static str,
        env: &'static str,
    },
    /// A setting holds a value the command cannot use.
    #[error("invalid {field}: {message}")]
    InvalidSetting {
        field: &'static str,
        message: String,
    },
    /// The requested operation requires a missing compile-time feature.
    #[error("{action} requires the `{feature}` feature to be enabled")]
    MissingFeature {
        feature: &'static str,
        action: &'static str,
    },
    /// A referenced input path does not exist on disk.
    #[error("{field} path {path:?} does not exist")]
    MissingSourceFile {
        field: &'static str,
        path: Utf8PathBuf,
    },
    /// A referenced input path exists but is not a file.
    #[error("{field} path {path:?} exists but is not a file")]
    SourcePathNotFile {
        field: &'static str,
        path: Utf8PathBuf,
    },
    /// A referenced input path could not be inspected due to an IO error.
    #[error("failed to inspect {field} path {path:?}: {source}")]
    InspectSourcePath {
        field: &'static str,
        path: Utf8PathBuf,
        #[source]
        source: std::io::Error,
    },
    /// Opening the request file failed.
    #[error("failed to open request at {path:?}: {source}")]
    OpenRequest {
        path: Utf8PathBuf,
        #[source]
        source: std::io::Error,
    },
    /// Request JSON could not be decoded.
    #[error("failed to parse request JSON at {path:?}: {source}")]
    ParseRequest {
        path: Utf8PathBuf,
        #[source]
        source: serde_json::Error,
    },
    /// A request field failed validation before any work started.
    #[error("request in {path:?} failed validation: {source}")]
    InvalidRequest {
        path: Utf8PathBuf,
        #[source]
        source: ValidationError,
    },
    /// A request referenced a malformed attraction id.
    #[error("request in {path:?} holds a malformed attraction id: {source}")]
    InvalidAttractionId {
        path: Utf8PathBuf,
        #[source]
        source: AttractionIdError,
    },
    /// Opening the attraction store failed.
    #[cfg(feature = "store-sqlite")]
    #[error("failed to open attraction store at {path:?}: {source}")]
    OpenAttractionStore {
        path: Utf8PathBuf,
        #[source]
        source: detour_core::SqliteAttractionStoreError,
    },
    /// Opening or querying the route cache failed.
    #[error("route cache at {path:?} failed: {source}")]
    RouteCache {
        path: Utf8PathBuf,
        #[source]
        source: RouteCacheError,
    },
    /// Constructing a network adapter failed.
    #[error("failed to build {service} client for {base_url:?}: {source}")]
    BuildClient {
        service: &'static str,
        base_url: String,
        #[source]
        source: ProviderBuildError,
    },
    /// Building the async runtime failed.
    #[error("failed to start async runtime: {0}")]
    Runtime(#[source] std::io::Error),
    /// The corridor search failed.
    #[error("search failed: {0}")]
    Search(#[from] SearchError),
    /// Sequencing failed.
    #[error("optimisation failed: {0}")]
    Sequence(#[from] SequenceError),
    /// Serialising the response failed.
    #[error("failed to serialise response: {0}")]
    SerialiseResponse(#[source] serde_json::Error),
    /// Writing the response failed.
    #[error("failed to write output: {0}")]
    WriteOutput(#[source] std::io::Error),
}
