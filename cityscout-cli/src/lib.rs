//! Command-line interface for serving and importing the city catalog.
#![forbid(unsafe_code)]

use std::net::{SocketAddr, ToSocketAddrs};

use camino::Utf8PathBuf;
use cityscout_core::{DistanceOrder, EngineConfig, SlotPolicy, SuggestionEngine};
use cityscout_data::{SqliteCatalog, load_city_file, persist_cities_to_sqlite};
use cityscout_server::{HttpServer, HttpServerConfig, Router};
use clap::{Parser, Subcommand};
use log::{info, warn};
use ortho_config::{OrthoConfig, SubcmdConfigMerge};
use serde::{Deserialize, Serialize};
use tracing_subscriber::EnvFilter;

mod error;

pub use error::CliError;

const ARG_SOURCE: &str = "source";
const ENV_SOURCE: &str = "CITYSCOUT_CMDS_IMPORT_SOURCE";
const DEFAULT_DATABASE: &str = "cities.db";
const DEFAULT_HOST: &str = "0.0.0.0";
const DEFAULT_PORT: u16 = 5000;
const ENV_PORT: &str = "PORT";

/// Run the cityscout CLI with the current process arguments and environment.
///
/// # Errors
///
/// Returns [`CliError`] when arguments or configuration are invalid, or the
/// selected command fails.
pub fn run() -> Result<(), CliError> {
    let cli = Cli::try_parse().map_err(CliError::ArgumentParsing)?;
    init_logging();
    match cli.command {
        Command::Serve(args) => serve(&args.into_config()?),
        Command::Import(args) => {
            import(&args.into_config()?)?;
            Ok(())
        }
    }
}

/// Log to stderr, filtered by `RUST_LOG` and defaulting to `info`.
fn init_logging() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    if let Err(err) = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init()
    {
        warn!("keeping the existing log subscriber: {err}");
    }
}

#[derive(Debug, Parser)]
#[command(
    name = "cityscout",
    about = "Suggest cities from a partial name over HTTP",
    version
)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Serve `/suggestions` from a SQLite catalog.
    Serve(ServeArgs),
    /// Load a JSON city list into a SQLite catalog.
    Import(ImportArgs),
}

/// CLI arguments for the `serve` subcommand.
#[derive(Debug, Clone, Parser, Deserialize, Serialize, OrthoConfig, Default)]
#[command(
    name = "serve",
    about = "Serve city suggestions over HTTP",
    long_about = "Serve city suggestions over HTTP. Settings can come from \
                  CLI flags, configuration files, or environment variables."
)]
#[ortho_config(prefix = "CITYSCOUT")]
struct ServeArgs {
    /// SQLite catalog to read from.
    #[arg(long, value_name = "path")]
    #[serde(default)]
    database: Option<Utf8PathBuf>,
    /// Interface to listen on.
    #[arg(long, value_name = "host")]
    #[serde(default)]
    host: Option<String>,
    /// Port to listen on. Falls back to `PORT`, then 5000.
    #[arg(long, value_name = "port")]
    #[serde(default)]
    port: Option<u16>,
    /// Which end of the distance ordering ranks first: farthest or nearest.
    #[arg(long, value_name = "order")]
    #[serde(default)]
    distance_order: Option<DistanceOrder>,
    /// What happens to displaced candidates: overwrite or cascade.
    #[arg(long, value_name = "policy")]
    #[serde(default)]
    slot_policy: Option<SlotPolicy>,
}

impl ServeArgs {
    fn into_config(self) -> Result<ServeConfig, CliError> {
        let mut merged = self.load_and_merge().map_err(CliError::Configuration)?;
        if merged.port.is_none() {
            merged.port = port_from_env(std::env::var(ENV_PORT).ok().as_deref())?;
        }
        Ok(ServeConfig::from(merged))
    }
}

/// Parse the plain `PORT` variable used by hosting platforms.
fn port_from_env(value: Option<&str>) -> Result<Option<u16>, CliError> {
    value
        .map(|raw| {
            raw.trim()
                .parse::<u16>()
                .map_err(|source| CliError::InvalidPort {
                    env: ENV_PORT,
                    value: raw.to_owned(),
                    source,
                })
        })
        .transpose()
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct ServeConfig {
    database: Utf8PathBuf,
    host: String,
    port: u16,
    engine: EngineConfig,
}

impl From<ServeArgs> for ServeConfig {
    fn from(args: ServeArgs) -> Self {
        Self {
            database: args
                .database
                .unwrap_or_else(|| Utf8PathBuf::from(DEFAULT_DATABASE)),
            host: args.host.unwrap_or_else(|| DEFAULT_HOST.to_owned()),
            port: args.port.unwrap_or(DEFAULT_PORT),
            engine: EngineConfig::new()
                .with_distance_order(args.distance_order.unwrap_or_default())
                .with_slot_policy(args.slot_policy.unwrap_or_default()),
        }
    }
}

impl ServeConfig {
    fn socket_addr(&self) -> Result<SocketAddr, CliError> {
        let mut addrs = (self.host.as_str(), self.port)
            .to_socket_addrs()
            .map_err(|source| CliError::ResolveAddress {
                host: self.host.clone(),
                port: self.port,
                source,
            })?;
        addrs.next().ok_or_else(|| CliError::NoAddress {
            host: self.host.clone(),
            port: self.port,
        })
    }
}

fn serve(config: &ServeConfig) -> Result<(), CliError> {
    let bind_addr = config.socket_addr()?;
    let catalog = SqliteCatalog::open(config.database.as_std_path())?;
    info!(
        "serving {} with {} distance order and {} slot policy",
        config.database, config.engine.distance_order, config.engine.slot_policy
    );
    let router = Router::new(SuggestionEngine::new(catalog).with_config(config.engine));

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .map_err(CliError::Runtime)?;
    runtime.block_on(async move {
        let server = HttpServer::bind(HttpServerConfig::new(bind_addr), router).await?;
        server.run_until(shutdown_signal()).await;
        Ok::<(), CliError>(())
    })
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        warn!("cannot listen for Ctrl-C, serving until killed: {err}");
        std::future::pending::<()>().await;
    }
}

/// CLI arguments for the `import` subcommand.
#[derive(Debug, Clone, Parser, Deserialize, Serialize, OrthoConfig, Default)]
#[command(
    name = "import",
    about = "Import a JSON city list into a SQLite catalog"
)]
#[ortho_config(prefix = "CITYSCOUT")]
struct ImportArgs {
    /// JSON array of `{name, lat, long, population}` objects.
    #[arg(long = ARG_SOURCE, value_name = "path")]
    #[serde(default)]
    source: Option<Utf8PathBuf>,
    /// SQLite catalog to create or update.
    #[arg(long, value_name = "path")]
    #[serde(default)]
    database: Option<Utf8PathBuf>,
}

impl ImportArgs {
    fn into_config(self) -> Result<ImportConfig, CliError> {
        let merged = self.load_and_merge().map_err(CliError::Configuration)?;
        ImportConfig::try_from(merged)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct ImportConfig {
    source: Utf8PathBuf,
    database: Utf8PathBuf,
}

impl TryFrom<ImportArgs> for ImportConfig {
    type Error = CliError;

    fn try_from(args: ImportArgs) -> Result<Self, Self::Error> {
        let source = args.source.ok_or(CliError::MissingArgument {
            field: ARG_SOURCE,
            env: ENV_SOURCE,
        })?;
        Ok(Self {
            source,
            database: args
                .database
                .unwrap_or_else(|| Utf8PathBuf::from(DEFAULT_DATABASE)),
        })
    }
}

fn import(config: &ImportConfig) -> Result<usize, CliError> {
    let cities = load_city_file(&config.source)?;
    let written = persist_cities_to_sqlite(&config.database, &cities).map_err(|source| {
        CliError::PersistCities {
            path: config.database.clone(),
            source,
        }
    })?;
    info!("imported {written} cities from {}", config.source);
    Ok(written)
}

#[cfg(test)]
mod tests;
