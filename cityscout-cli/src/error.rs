//! Error types emitted by the cityscout CLI.
//!
//! Keep this error type reasonably small, as CLI helpers return
//! `Result<_, CliError>` and the workspace enables `clippy::result_large_err`.

use std::sync::Arc;

use camino::Utf8PathBuf;
use cityscout_data::{LoadCitiesError, PersistCitiesError, SqliteCatalogError};
use cityscout_server::ServerError;
use thiserror::Error;

/// Errors emitted by the cityscout CLI.
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
        /// Flag name without the leading dashes.
        field: &'static str,
        /// Environment variable that can supply the value.
        env: &'static str,
    },
    /// A port variable did not hold a valid port number.
    #[error("{env} must be a port number, got {value:?}: {source}")]
    InvalidPort {
        /// Environment variable that was read.
        env: &'static str,
        /// Value as found.
        value: String,
        /// Source error from integer parsing.
        #[source]
        source: std::num::ParseIntError,
    },
    /// The listen address could not be resolved.
    #[error("failed to resolve listen address {host}:{port}: {source}")]
    ResolveAddress {
        /// Host as configured.
        host: String,
        /// Port as configured.
        port: u16,
        /// Source error from the resolver.
        #[source]
        source: std::io::Error,
    },
    /// The host resolved to no addresses.
    #[error("listen address {host}:{port} resolved to nothing")]
    NoAddress {
        /// Host as configured.
        host: String,
        /// Port as configured.
        port: u16,
    },
    /// The SQLite catalog could not be opened.
    #[error(transparent)]
    OpenCatalog(#[from] SqliteCatalogError),
    /// The async runtime could not be built.
    #[error("failed to start the async runtime: {0}")]
    Runtime(#[source] std::io::Error),
    /// The HTTP server failed to start.
    #[error(transparent)]
    Serve(#[from] ServerError),
    /// Reading the city list failed.
    #[error(transparent)]
    LoadCities(#[from] LoadCitiesError),
    /// Writing the catalog failed.
    #[error("failed to persist cities to {path:?}: {source}")]
    PersistCities {
        /// Database path.
        path: Utf8PathBuf,
        /// Source error from the writer.
        #[source]
        source: PersistCitiesError,
    },
}
