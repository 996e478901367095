//! SQLite-backed attraction store with an in-memory R\*-tree.
//!
//! The whole `attractions` table is read once at open time. Each row needs an
//! `id` and a position, taken from `lat`/`lon` columns when present and from a
//! `wkt` `POINT (lon lat)` column otherwise. Rows that fail either check are
//! skipped with a warning rather than failing the load.

use std::{
    collections::HashMap,
    fmt,
    path::{Path, PathBuf},
};

use geo::{Coord, Rect};
use log::{debug, warn};
use rstar::{AABB, RTree, primitives::GeomWithData};
use rusqlite::{Connection, OpenFlags, Row, types::Value};
use thiserror::Error;

use crate::{Attraction, AttractionId, RatingAggregate};

use super::AttractionStore;

/// Name of the table the store reads.
pub const ATTRACTIONS_TABLE: &str = "attractions";

type IndexEntry = GeomWithData<[f64; 2], usize>;

/// Error raised when loading persisted attractions.
#[derive(Debug, Error)]
pub enum SqliteAttractionStoreError {
    /// Opening the SQLite database failed.
    #[error("failed to open SQLite database at {path}: {source}")]
    OpenDatabase {
        /// Location of the SQLite database on disk.
        path: PathBuf,
        /// Source error returned by `rusqlite`.
        #[source]
        source: rusqlite::Error,
    },
    /// The table lacks a column every row needs.
    #[error("table {table} has no {column} column")]
    MissingColumn {
        /// Table that was read.
        table: &'static str,
        /// Column that was expected.
        column: &'static str,
    },
    /// Generic SQLite error when reading rows.
    #[error(transparent)]
    Database(#[from] rusqlite::Error),
}

/// Read-only attraction store backed by SQLite rows and an R\*-tree.
pub struct SqliteAttractionStore {
    attractions: Vec<Attraction>,
    index: RTree<IndexEntry>,
    by_id: HashMap<AttractionId, usize>,
}

impl fmt::Debug for SqliteAttractionStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SqliteAttractionStore")
            .field("entries", &self.index.size())
            .finish_non_exhaustive()
    }
}

impl SqliteAttractionStore {
    /// Open the database read-only and index its attractions.
    pub fn open<P: AsRef<Path>>(database_path: P) -> Result<Self, SqliteAttractionStoreError> {
        let path = database_path.as_ref();
        let connection = Connection::open_with_flags(path, OpenFlags::SQLITE_OPEN_READ_ONLY)
            .map_err(|source| SqliteAttractionStoreError::OpenDatabase {
                path: path.to_path_buf(),
                source,
            })?;
        Self::from_connection(&connection)
    }

    /// Index the attractions reachable through an existing connection.
    pub fn from_connection(connection: &Connection) -> Result<Self, SqliteAttractionStoreError> {
        let attractions = load_attractions(connection)?;
        Ok(Self::from_attractions(attractions))
    }

    /// Build a store from already-loaded attractions. Later duplicates of an
    /// id are dropped.
    #[must_use]
    pub fn from_attractions<I>(attractions: I) -> Self
    where
        I: IntoIterator<Item = Attraction>,
    {
        let mut kept = Vec::new();
        let mut by_id = HashMap::new();
        for attraction in attractions {
            if by_id.contains_key(&attraction.id) {
                debug!("dropping duplicate attraction {}", attraction.id);
                continue;
            }
            by_id.insert(attraction.id.clone(), kept.len());
            kept.push(attraction);
        }
        let entries = kept
            .iter()
            .enumerate()
            .map(|(slot, a)| GeomWithData::new([a.location.x, a.location.y], slot))
            .collect();
        Self {
            attractions: kept,
            index: RTree::bulk_load(entries),
            by_id,
        }
    }

    /// Number of indexed attractions.
    #[must_use]
    pub fn len(&self) -> usize {
        self.attractions.len()
    }

    /// Whether the store holds no attractions.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.attractions.is_empty()
    }
}

impl AttractionStore for SqliteAttractionStore {
    fn attractions_in_bbox(
        &self,
        bbox: &Rect<f64>,
    ) -> Box<dyn Iterator<Item = Attraction> + Send + '_> {
        let envelope =
            AABB::from_corners([bbox.min().x, bbox.min().y], [bbox.max().x, bbox.max().y]);
        let mut slots: Vec<usize> = self
            .index
            .locate_in_envelope(&envelope)
            .map(|entry| entry.data)
            .collect();
        slots.sort_unstable();
        Box::new(
            slots
                .into_iter()
                .filter_map(|slot| self.attractions.get(slot).cloned()),
        )
    }

    fn attractions_by_id(&self, ids: &[AttractionId]) -> Vec<Attraction> {
        ids.iter()
            .filter_map(|id| self.by_id.get(id))
            .filter_map(|&slot| self.attractions.get(slot).cloned())
            .collect()
    }
}

/// Column positions resolved from the table header.
struct Columns {
    id: usize,
    name: Option<usize>,
    lat: Option<usize>,
    lon: Option<usize>,
    wkt: Option<usize>,
    category: Option<usize>,
    website_url: Option<usize>,
    average_rating: Option<usize>,
    rating_count: Option<usize>,
}

impl Columns {
    fn resolve(names: &[String]) -> Result<Self, SqliteAttractionStoreError> {
        let find = |wanted: &str| names.iter().position(|n| n.eq_ignore_ascii_case(wanted));
        let id = find("id").ok_or(SqliteAttractionStoreError::MissingColumn {
            table: ATTRACTIONS_TABLE,
            column: "id",
        })?;
        let columns = Self {
            id,
            name: find("name"),
            lat: find("lat"),
            lon: find("lon"),
            wkt: find("wkt"),
            category: find("category"),
            website_url: find("website_url"),
            average_rating: find("average_rating"),
            rating_count: find("rating_count"),
        };
        if columns.wkt.is_none() && (columns.lat.is_none() || columns.lon.is_none()) {
            return Err(SqliteAttractionStoreError::MissingColumn {
                table: ATTRACTIONS_TABLE,
                column: "lat/lon or wkt",
            });
        }
        Ok(columns)
    }
}

fn load_attractions(
    connection: &Connection,
) -> Result<Vec<Attraction>, SqliteAttractionStoreError> {
    let mut statement = connection.prepare(&format!("SELECT * FROM {ATTRACTIONS_TABLE}"))?;
    let names: Vec<String> = statement
        .column_names()
        .into_iter()
        .map(str::to_owned)
        .collect();
    let columns = Columns::resolve(&names)?;
    let mut rows = statement.query([])?;
    let mut attractions = Vec::new();
    let mut skipped = 0_usize;
    while let Some(row) = rows.next()? {
        match attraction_from_row(row, &columns)? {
            Some(attraction) => attractions.push(attraction),
            None => skipped += 1,
        }
    }
    if skipped > 0 {
        warn!("skipped {skipped} attraction rows without a valid id or position");
    }
    debug!("loaded {} attractions", attractions.len());
    Ok(attractions)
}

fn attraction_from_row(
    row: &Row<'_>,
    columns: &Columns,
) -> Result<Option<Attraction>, SqliteAttractionStoreError> {
    let Some(raw_id) = text(row, Some(columns.id))? else {
        return Ok(None);
    };
    let id = match AttractionId::parse(&raw_id) {
        Ok(id) => id,
        Err(err) => {
            warn!("{err}");
            return Ok(None);
        }
    };
    let Some(location) = location(row, columns)? else {
        warn!("attraction {id} has no usable position");
        return Ok(None);
    };
    let name = text(row, columns.name)?.unwrap_or_else(|| id.to_string());
    let mut attraction = Attraction::new(id, name, location).with_rating(RatingAggregate {
        average: real(row, columns.average_rating)?.map_or(0.0, narrow),
        count: integer(row, columns.rating_count)?
            .and_then(|n| u32::try_from(n).ok())
            .unwrap_or(0),
    });
    attraction.category = text(row, columns.category)?;
    attraction.website_url = text(row, columns.website_url)?;
    Ok(Some(attraction))
}

#[expect(
    clippy::cast_possible_truncation,
    reason = "ratings are small values stored as REAL"
)]
fn narrow(value: f64) -> f32 {
    value as f32
}

fn location(row: &Row<'_>, columns: &Columns) -> Result<Option<Coord<f64>>, rusqlite::Error> {
    if let (Some(lat), Some(lon)) = (real(row, columns.lat)?, real(row, columns.lon)?) {
        if valid_position(lat, lon) {
            return Ok(Some(Coord { x: lon, y: lat }));
        }
    }
    Ok(text(row, columns.wkt)?
        .as_deref()
        .and_then(parse_wkt_point)
        .filter(|c| valid_position(c.y, c.x)))
}

fn valid_position(lat: f64, lon: f64) -> bool {
    lat.is_finite() && lon.is_finite() && lat.abs() <= 90.0 && lon.abs() <= 180.0
}

/// Parse `POINT (lon lat)`, case-insensitively and tolerant of spacing.
fn parse_wkt_point(raw: &str) -> Option<Coord<f64>> {
    let trimmed = raw.trim();
    let (tag, rest) = trimmed.split_at_checked(5)?;
    if !tag.eq_ignore_ascii_case("point") {
        return None;
    }
    let inner = rest.trim().strip_prefix('(')?.strip_suffix(')')?;
    let mut parts = inner.split_whitespace();
    let x = parts.next()?.parse().ok()?;
    let y = parts.next()?.parse().ok()?;
    parts.next().is_none().then_some(Coord { x, y })
}

fn value(row: &Row<'_>, column: Option<usize>) -> Result<Value, rusqlite::Error> {
    column.map_or(Ok(Value::Null), |idx| row.get::<_, Value>(idx))
}

fn text(row: &Row<'_>, column: Option<usize>) -> Result<Option<String>, rusqlite::Error> {
    Ok(match value(row, column)? {
        Value::Text(s) if !s.trim().is_empty() => Some(s.trim().to_owned()),
        Value::Integer(n) => Some(n.to_string()),
        _ => None,
    })
}

#[expect(
    clippy::cast_precision_loss,
    reason = "integer coordinates and ratings are well within f64 precision"
)]
fn real(row: &Row<'_>, column: Option<usize>) -> Result<Option<f64>, rusqlite::Error> {
    Ok(match value(row, column)? {
        Value::Real(v) => Some(v),
        Value::Integer(n) => Some(n as f64),
        Value::Text(s) => s.trim().parse().ok(),
        _ => None,
    })
}

fn integer(row: &Row<'_>, column: Option<usize>) -> Result<Option<i64>, rusqlite::Error> {
    Ok(match value(row, column)? {
        Value::Integer(n) => Some(n),
        Value::Text(s) => s.trim().parse().ok(),
        _ => None,
    })
}
