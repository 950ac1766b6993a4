//! SQL shared by the catalog reader and the importer.

pub(crate) const CITIES_TABLE: &str = "cities";

pub(crate) const CREATE_CITIES_TABLE: &str = "CREATE TABLE IF NOT EXISTS cities (
    id INTEGER PRIMARY KEY,
    name TEXT NOT NULL,
    lat REAL NOT NULL,
    long REAL NOT NULL,
    population INTEGER,
    UNIQUE (name, lat, long)
)";

pub(crate) const CREATE_NAME_INDEX: &str =
    "CREATE INDEX IF NOT EXISTS cities_name ON cities (name)";

pub(crate) const INSERT_CITY: &str =
    "INSERT OR REPLACE INTO cities (name, lat, long, population) VALUES (?1, ?2, ?3, ?4)";

pub(crate) const SELECT_WITH_POPULATION: &str =
    "SELECT name, lat, long, population FROM cities WHERE name REGEXP ?1";

pub(crate) const SELECT_LOCATION_ONLY: &str =
    "SELECT name, lat, long FROM cities WHERE name REGEXP ?1";

/// Prepared at open time to prove every column the reader needs exists.
pub(crate) const PROBE_COLUMNS: &str = "SELECT name, lat, long, population FROM cities LIMIT 0";
