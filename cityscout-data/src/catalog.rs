//! SQLite-backed city catalog.

use std::{
    fmt,
    path::{Path, PathBuf},
};

use cityscout_core::{CatalogError, CatalogFields, CatalogReader, CityRecord, FuzzyPattern};
use geo::Coord;
use log::debug;
use regex::Regex;
use rusqlite::{
    Connection, Error as SqliteError, OpenFlags, OptionalExtension, Row,
    functions::FunctionFlags, types::ValueRef,
};
use thiserror::Error;

use crate::schema::{CITIES_TABLE, PROBE_COLUMNS, SELECT_LOCATION_ONLY, SELECT_WITH_POPULATION};

type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Error raised when opening a [`SqliteCatalog`].
#[derive(Debug, Error)]
pub enum SqliteCatalogError {
    /// Opening the SQLite database failed.
    #[error("failed to open SQLite database at {path}: {source}")]
    OpenDatabase {
        /// Location of the SQLite database on disk.
        path: PathBuf,
        /// Source error returned by `rusqlite`.
        #[source]
        source: SqliteError,
    },
    /// The database has no `cities` table.
    #[error("SQLite database at {path} has no cities table")]
    MissingCitiesTable {
        /// Location of the SQLite database on disk.
        path: PathBuf,
    },
    /// The `cities` table lacks a required column.
    #[error("cities table in {path} has an unexpected schema: {source}")]
    Schema {
        /// Location of the SQLite database on disk.
        path: PathBuf,
        /// Source error returned by `rusqlite`.
        #[source]
        source: SqliteError,
    },
}

/// Read-only city catalog stored in SQLite.
///
/// A fresh connection is opened for every fetch, so the catalog is cheap to
/// share between threads and holds no per-request state. Name matching uses a
/// `regexp` SQL function backed by the `regex` crate.
///
/// # Examples
///
/// ```no_run
/// use cityscout_core::{SuggestionEngine, SuggestionRequest};
/// use cityscout_data::SqliteCatalog;
///
/// # fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let catalog = SqliteCatalog::open("cities.db")?;
/// let engine = SuggestionEngine::new(catalog);
/// let suggestions = engine.suggest(&SuggestionRequest::new("mon"))?;
/// assert!(suggestions.len() <= 3);
/// # Ok(())
/// # }
/// ```
pub struct SqliteCatalog {
    path: PathBuf,
}

impl fmt::Debug for SqliteCatalog {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SqliteCatalog")
            .field("path", &self.path)
            .finish_non_exhaustive()
    }
}

impl SqliteCatalog {
    /// Open a catalog and validate its schema.
    ///
    /// # Errors
    ///
    /// Returns [`SqliteCatalogError`] when the file cannot be opened read-only
    /// or does not hold a usable `cities` table.
    pub fn open<P>(location: P) -> Result<Self, SqliteCatalogError>
    where
        P: AsRef<Path>,
    {
        let path = location.as_ref().to_path_buf();
        let connection =
            open_read_only(&path).map_err(|source| SqliteCatalogError::OpenDatabase {
                path: path.clone(),
                source,
            })?;
        ensure_schema(&connection, &path)?;
        Ok(Self { path })
    }

    /// Location of the database file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn connect(&self) -> Result<Connection, CatalogError> {
        let connection = open_read_only(&self.path).map_err(|err| CatalogError::Unavailable {
            message: format!("{}: {err}", self.path.display()),
        })?;
        register_regexp(&connection).map_err(query_error)?;
        Ok(connection)
    }
}

impl CatalogReader for SqliteCatalog {
    fn fetch(
        &self,
        pattern: &FuzzyPattern,
        fields: CatalogFields,
    ) -> Result<Vec<CityRecord>, CatalogError> {
        let connection = self.connect()?;
        let sql = if fields.includes_population() {
            SELECT_WITH_POPULATION
        } else {
            SELECT_LOCATION_ONLY
        };
        let mut statement = connection.prepare(sql).map_err(query_error)?;
        let rows = statement
            .query_map([pattern.as_str()], |row| StoredCity::read(row, fields))
            .map_err(query_error)?;

        let mut cities = Vec::new();
        for row in rows {
            cities.push(row.map_err(query_error)?.into_record()?);
        }
        debug!(
            "{} matched {} cities in {}",
            pattern.as_str(),
            cities.len(),
            self.path.display()
        );
        Ok(cities)
    }
}

fn open_read_only(path: &Path) -> Result<Connection, SqliteError> {
    Connection::open_with_flags(
        path,
        OpenFlags::SQLITE_OPEN_READ_ONLY | OpenFlags::SQLITE_OPEN_NO_MUTEX,
    )
}

fn ensure_schema(connection: &Connection, path: &Path) -> Result<(), SqliteCatalogError> {
    let table: Option<String> = connection
        .query_row(
            "SELECT name FROM sqlite_master WHERE type = 'table' AND name = ?1",
            [CITIES_TABLE],
            |row| row.get(0),
        )
        .optional()
        .map_err(|source| SqliteCatalogError::OpenDatabase {
            path: path.to_path_buf(),
            source,
        })?;
    if table.is_none() {
        return Err(SqliteCatalogError::MissingCitiesTable {
            path: path.to_path_buf(),
        });
    }
    connection
        .prepare(PROBE_COLUMNS)
        .map(drop)
        .map_err(|source| SqliteCatalogError::Schema {
            path: path.to_path_buf(),
            source,
        })
}

/// Register `regexp(pattern, text)`, which SQLite calls for `text REGEXP pattern`.
///
/// The compiled pattern is cached as auxiliary data for the statement, so it
/// is built once per fetch. `NULL` text never matches.
fn register_regexp(connection: &Connection) -> Result<(), SqliteError> {
    connection.create_scalar_function(
        "regexp",
        2,
        FunctionFlags::SQLITE_UTF8 | FunctionFlags::SQLITE_DETERMINISTIC,
        |ctx| {
            let regex: std::sync::Arc<Regex> =
                ctx.get_or_create_aux(0, |value| -> Result<_, BoxError> {
                    Ok(Regex::new(value.as_str()?)?)
                })?;
            let text = match ctx.get_raw(1) {
                ValueRef::Null => return Ok(false),
                value => value
                    .as_str()
                    .map_err(|err| SqliteError::UserFunctionError(err.into()))?,
            };
            Ok(regex.is_match(text))
        },
    )
}

fn query_error(err: SqliteError) -> CatalogError {
    CatalogError::Query {
        message: err.to_string(),
    }
}

/// A row as stored, before range checks.
struct StoredCity {
    name: String,
    lat: f64,
    long: f64,
    population: Option<i64>,
}

impl StoredCity {
    fn read(row: &Row<'_>, fields: CatalogFields) -> Result<Self, SqliteError> {
        let population = if fields.includes_population() {
            row.get(3)?
        } else {
            None
        };
        Ok(Self {
            name: row.get(0)?,
            lat: row.get(1)?,
            long: row.get(2)?,
            population,
        })
    }

    fn into_record(self) -> Result<CityRecord, CatalogError> {
        let invalid = |reason: String| CatalogError::InvalidRecord {
            name: self.name.clone(),
            reason,
        };
        if !(self.lat.is_finite() && self.lat.abs() <= 90.0) {
            return Err(invalid(format!("latitude {} is out of range", self.lat)));
        }
        if !(self.long.is_finite() && self.long.abs() <= 180.0) {
            return Err(invalid(format!("longitude {} is out of range", self.long)));
        }
        let population = self
            .population
            .map(|value| {
                u64::try_from(value).map_err(|_| invalid(format!("population {value} is negative")))
            })
            .transpose()?;

        let record = CityRecord::new(
            self.name,
            Coord {
                x: self.long,
                y: self.lat,
            },
        );
        Ok(match population {
            Some(population) => record.with_population(population),
            None => record,
        })
    }
}
