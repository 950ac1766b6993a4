//! Load city lists from JSON and persist them to SQLite.

use std::{fs::File, io::BufReader};

use camino::{Utf8Path, Utf8PathBuf};
use cap_std::{ambient_authority, fs_utf8};
use cityscout_core::CityRecord;
use geo::Coord;
use log::info;
use rusqlite::{Connection, Error as SqliteError, Transaction};
use serde::Deserialize;
use thiserror::Error;

use crate::schema::{CREATE_CITIES_TABLE, CREATE_NAME_INDEX, INSERT_CITY};

/// Errors raised when reading a city list.
#[derive(Debug, Error)]
pub enum LoadCitiesError {
    /// The file could not be opened.
    #[error("failed to open city list at {path}")]
    Open {
        /// Path of the city list.
        path: Utf8PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },
    /// The file is not a JSON array of city objects.
    #[error("failed to parse city list at {path}")]
    Parse {
        /// Path of the city list.
        path: Utf8PathBuf,
        /// Source error produced by `serde_json`.
        #[source]
        source: serde_json::Error,
    },
    /// A coordinate was not a finite number within range.
    #[error("city {name:?} has invalid {field} {value:?}")]
    InvalidCoordinate {
        /// Name of the offending city.
        name: String,
        /// `lat` or `long`.
        field: &'static str,
        /// Value as written in the file.
        value: String,
    },
}

/// Errors raised when persisting cities to SQLite.
#[derive(Debug, Error)]
pub enum PersistCitiesError {
    /// Failed to create the parent directory for the SQLite database.
    #[error("failed to create parent directory {path:?}")]
    CreateDirectory {
        /// Path of the directory that could not be created.
        path: Utf8PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },
    /// Opening the SQLite database failed.
    #[error("failed to open SQLite database at {path:?}")]
    Open {
        /// Destination database path.
        path: Utf8PathBuf,
        /// Source error returned by `rusqlite`.
        #[source]
        source: SqliteError,
    },
    /// Beginning the transaction failed.
    #[error("failed to begin city import transaction")]
    BeginTransaction {
        /// Source error returned by `rusqlite`.
        #[source]
        source: SqliteError,
    },
    /// Creating the `cities` table or its index failed.
    #[error("failed to create cities table")]
    CreateSchema {
        /// Source error returned by `rusqlite`.
        #[source]
        source: SqliteError,
    },
    /// A population could not be represented as an SQLite integer.
    #[error("population {population} of {name:?} exceeds SQLite i64 range")]
    PopulationOutOfRange {
        /// Name of the offending city.
        name: String,
        /// Population that failed the conversion.
        population: u64,
    },
    /// Preparing the insert statement failed.
    #[error("failed to prepare city insert statement")]
    PrepareInsert {
        /// Source error returned by `rusqlite`.
        #[source]
        source: SqliteError,
    },
    /// Writing a city row failed.
    #[error("failed to persist city {name:?}")]
    PersistRow {
        /// Name of the city being persisted.
        name: String,
        /// Source error returned by `rusqlite`.
        #[source]
        source: SqliteError,
    },
    /// Committing the transaction failed.
    #[error("failed to commit city import transaction")]
    Commit {
        /// Source error returned by `rusqlite`.
        #[source]
        source: SqliteError,
    },
}

/// A coordinate written either as a JSON number or a numeric string.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum RawCoordinate {
    Number(f64),
    Text(String),
}

impl RawCoordinate {
    fn parse(&self, name: &str, field: &'static str, limit: f64) -> Result<f64, LoadCitiesError> {
        let value = match self {
            Self::Number(value) => Some(*value),
            Self::Text(text) => text.trim().parse().ok(),
        };
        value
            .filter(|value: &f64| value.is_finite() && value.abs() <= limit)
            .ok_or_else(|| LoadCitiesError::InvalidCoordinate {
                name: name.to_owned(),
                field,
                value: match self {
                    Self::Number(value) => value.to_string(),
                    Self::Text(text) => text.clone(),
                },
            })
    }
}

#[derive(Debug, Deserialize)]
struct CityEntry {
    name: String,
    lat: RawCoordinate,
    long: RawCoordinate,
    #[serde(default)]
    population: Option<u64>,
}

impl CityEntry {
    fn into_record(self) -> Result<CityRecord, LoadCitiesError> {
        let lat = self.lat.parse(&self.name, "lat", 90.0)?;
        let long = self.long.parse(&self.name, "long", 180.0)?;
        let record = CityRecord::new(self.name, Coord { x: long, y: lat });
        Ok(match self.population {
            Some(population) => record.with_population(population),
            None => record,
        })
    }
}

/// Read a JSON array of `{"name", "lat", "long", "population"}` objects.
///
/// Coordinates may be numbers or numeric strings; `population` is optional.
///
/// # Errors
///
/// Returns [`LoadCitiesError`] when the file cannot be read or parsed, or a
/// coordinate is out of range.
pub fn load_city_file(path: &Utf8Path) -> Result<Vec<CityRecord>, LoadCitiesError> {
    let file = File::open(path.as_std_path()).map_err(|source| LoadCitiesError::Open {
        path: path.to_path_buf(),
        source,
    })?;
    let entries: Vec<CityEntry> = serde_json::from_reader(BufReader::new(file)).map_err(
        |source| LoadCitiesError::Parse {
            path: path.to_path_buf(),
            source,
        },
    )?;
    entries.into_iter().map(CityEntry::into_record).collect()
}

/// Persist cities to a SQLite database on disk.
///
/// The function is idempotent: a city with the same name and coordinates
/// replaces the existing row. Parent directories are created automatically,
/// and the `cities` table and its name index are initialised if missing.
/// Returns the number of rows written.
///
/// # Errors
///
/// Returns [`PersistCitiesError`] when the database cannot be created or a row
/// cannot be written. Nothing is committed on failure.
pub fn persist_cities_to_sqlite(
    path: &Utf8Path,
    cities: &[CityRecord],
) -> Result<usize, PersistCitiesError> {
    ensure_parent_dir(path)?;
    let mut connection =
        Connection::open(path.as_std_path()).map_err(|source| PersistCitiesError::Open {
            path: path.to_path_buf(),
            source,
        })?;

    let transaction = connection
        .transaction()
        .map_err(|source| PersistCitiesError::BeginTransaction { source })?;

    create_schema(&transaction)?;
    persist_rows(&transaction, cities)?;

    transaction
        .commit()
        .map_err(|source| PersistCitiesError::Commit { source })?;
    info!("persisted {} cities to {path}", cities.len());
    Ok(cities.len())
}

fn ensure_parent_dir(path: &Utf8Path) -> Result<(), PersistCitiesError> {
    let Some(parent) = path.parent() else {
        return Ok(());
    };
    if parent.as_str().is_empty() || parent == Utf8Path::new("/") {
        return Ok(());
    }

    let (base, relative) = if parent.is_absolute() {
        ("/", parent.strip_prefix("/").unwrap_or(parent))
    } else {
        (".", parent)
    };
    let create_error = |source| PersistCitiesError::CreateDirectory {
        path: parent.to_path_buf(),
        source,
    };
    fs_utf8::Dir::open_ambient_dir(base, ambient_authority())
        .map_err(create_error)?
        .create_dir_all(relative)
        .map_err(create_error)
}

fn create_schema(transaction: &Transaction<'_>) -> Result<(), PersistCitiesError> {
    transaction
        .execute_batch(&format!("{CREATE_CITIES_TABLE};\n{CREATE_NAME_INDEX};"))
        .map_err(|source| PersistCitiesError::CreateSchema { source })
}

fn persist_rows(
    transaction: &Transaction<'_>,
    cities: &[CityRecord],
) -> Result<(), PersistCitiesError> {
    if cities.is_empty() {
        return Ok(());
    }

    let mut statement = transaction
        .prepare(INSERT_CITY)
        .map_err(|source| PersistCitiesError::PrepareInsert { source })?;

    for city in cities {
        let population = city
            .population
            .map(|population| {
                i64::try_from(population).map_err(|_| PersistCitiesError::PopulationOutOfRange {
                    name: city.name.clone(),
                    population,
                })
            })
            .transpose()?;
        statement
            .execute((&city.name, city.latitude(), city.longitude(), population))
            .map_err(|source| PersistCitiesError::PersistRow {
                name: city.name.clone(),
                source,
            })?;
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::{fixture, rstest};
    use std::fs;
    use tempfile::TempDir;

    #[fixture]
    fn temp_dir() -> TempDir {
        TempDir::new().expect("create temp dir")
    }

    fn utf8_path(dir: &TempDir, relative: &str) -> Utf8PathBuf {
        Utf8PathBuf::from_path_buf(dir.path().join(relative)).expect("utf-8 path")
    }

    fn montreal() -> CityRecord {
        CityRecord::new(
            "Montreal",
            Coord {
                x: -73.58781,
                y: 45.50884,
            },
        )
        .with_population(1_780_000)
    }

    #[rstest]
    fn loads_numbers_and_numeric_strings(temp_dir: TempDir) {
        let path = utf8_path(&temp_dir, "cities.json");
        fs::write(
            path.as_std_path(),
            r#"[
                {"name": "Montreal", "lat": 45.50884, "long": -73.58781, "population": 1780000},
                {"name": "Laval", "lat": "45.56995", "long": "-73.692", "population": 376845},
                {"name": "Dorval", "lat": 45.45008, "long": -73.75}
            ]"#,
        )
        .expect("write city list");

        let cities = load_city_file(&path).expect("load cities");
        assert_eq!(cities.len(), 3);
        assert_eq!(cities.first(), Some(&montreal()));
        assert_eq!(cities.get(1).map(CityRecord::latitude), Some(45.56995));
        assert_eq!(cities.get(2).and_then(|city| city.population), None);
    }

    #[rstest]
    fn rejects_out_of_range_latitude(temp_dir: TempDir) {
        let path = utf8_path(&temp_dir, "cities.json");
        fs::write(
            path.as_std_path(),
            r#"[{"name": "Nowhere", "lat": "91", "long": 0}]"#,
        )
        .expect("write city list");
        let err = load_city_file(&path).expect_err("latitude out of range");
        match err {
            LoadCitiesError::InvalidCoordinate { name, field, .. } => {
                assert_eq!(name, "Nowhere");
                assert_eq!(field, "lat");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[rstest]
    fn reports_parse_errors_with_path(temp_dir: TempDir) {
        let path = utf8_path(&temp_dir, "cities.json");
        fs::write(path.as_std_path(), "{not json").expect("write city list");
        let err = load_city_file(&path).expect_err("invalid json");
        match err {
            LoadCitiesError::Parse { path: reported, .. } => assert_eq!(reported, path),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[rstest]
    fn reports_missing_file(temp_dir: TempDir) {
        let path = utf8_path(&temp_dir, "missing.json");
        let err = load_city_file(&path).expect_err("missing file");
        assert!(matches!(err, LoadCitiesError::Open { .. }));
    }

    #[rstest]
    fn persists_cities(temp_dir: TempDir) {
        let path = utf8_path(&temp_dir, "cities.db");
        let written = persist_cities_to_sqlite(&path, &[montreal()]).expect("persist cities");
        assert_eq!(written, 1);

        let conn = Connection::open(path.as_std_path()).expect("open database");
        let stored: (String, f64, f64, Option<i64>) = conn
            .query_row("SELECT name, lat, long, population FROM cities", [], |row| {
                Ok((row.get(0)?, row.get(1)?, row.get(2)?, row.get(3)?))
            })
            .expect("read row");
        assert_eq!(stored.0, "Montreal");
        assert_eq!(stored.1, 45.50884);
        assert_eq!(stored.2, -73.58781);
        assert_eq!(stored.3, Some(1_780_000));
    }

    #[rstest]
    fn reimport_replaces_rows(temp_dir: TempDir) {
        let path = utf8_path(&temp_dir, "cities.db");
        persist_cities_to_sqlite(&path, &[montreal()]).expect("first import");
        persist_cities_to_sqlite(&path, &[montreal().with_population(1_800_000)])
            .expect("second import");

        let conn = Connection::open(path.as_std_path()).expect("open database");
        let (count, population): (i64, i64) = conn
            .query_row("SELECT COUNT(*), MAX(population) FROM cities", [], |row| {
                Ok((row.get(0)?, row.get(1)?))
            })
            .expect("read summary");
        assert_eq!(count, 1);
        assert_eq!(population, 1_800_000);
    }

    #[rstest]
    fn creates_parent_directory(temp_dir: TempDir) {
        let nested = utf8_path(&temp_dir, "nested/data/cities.db");
        persist_cities_to_sqlite(&nested, &[montreal()]).expect("persist into nested path");
        assert!(nested.exists(), "database should be created at nested path");
    }

    #[rstest]
    fn rejects_population_beyond_i64(temp_dir: TempDir) {
        let path = utf8_path(&temp_dir, "cities.db");
        let city = montreal().with_population(u64::MAX);
        let err = persist_cities_to_sqlite(&path, &[city]).expect_err("population too large");
        assert!(matches!(
            err,
            PersistCitiesError::PopulationOutOfRange { .. }
        ));
    }
}
