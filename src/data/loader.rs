//! Collision CSV Loader Module
//! Reads a bounded slice of the collision export and normalizes it into the
//! analysis-ready table every downstream view queries.

use polars::prelude::*;
use std::collections::hash_map::Entry;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::info;

/// Default number of rows read from the collision export.
pub const DEFAULT_ROW_LIMIT: usize = 100_000;

/// Canonical name of the merged crash timestamp column.
pub const DATE_TIME: &str = "date/time";

pub const COL_CRASH_DATE: &str = "crash_date";
pub const COL_CRASH_TIME: &str = "crash_time";
pub const COL_LATITUDE: &str = "latitude";
pub const COL_LONGITUDE: &str = "longitude";
pub const COL_INJURED_PERSONS: &str = "injured_persons";
pub const COL_INJURED_PEDESTRIANS: &str = "injured_pedestrians";
pub const COL_INJURED_CYCLISTS: &str = "injured_cyclists";
pub const COL_INJURED_MOTORISTS: &str = "injured_motorists";
pub const COL_STREET: &str = "on_street_name";

/// Columns the raw export must carry (after lowercasing).
const REQUIRED_COLUMNS: [&str; 8] = [
    COL_CRASH_DATE,
    COL_CRASH_TIME,
    COL_LATITUDE,
    COL_LONGITUDE,
    COL_INJURED_PERSONS,
    COL_INJURED_PEDESTRIANS,
    COL_INJURED_CYCLISTS,
    COL_INJURED_MOTORISTS,
];

/// Injury-count columns, normalized to non-null integers during load.
pub(crate) const INJURY_COLUMNS: [&str; 4] = [
    COL_INJURED_PERSONS,
    COL_INJURED_PEDESTRIANS,
    COL_INJURED_CYCLISTS,
    COL_INJURED_MOTORISTS,
];

/// Timestamp formats seen across collision exports, tried in order.
const TIMESTAMP_FORMATS: [&str; 4] = [
    "%m/%d/%Y %H:%M",
    "%m/%d/%Y %H:%M:%S",
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%d %H:%M",
];

#[derive(Error, Debug)]
pub enum LoaderError {
    #[error("CSV resource not found: {}", .0.display())]
    ResourceNotFound(PathBuf),
    #[error("row limit must be positive")]
    InvalidRowLimit,
    #[error("missing required column: {0}")]
    MissingColumn(&'static str),
    #[error("{rows} row(s) with unparseable crash date/time")]
    TimestampParse { rows: usize },
    #[error("failed to load CSV: {0}")]
    Csv(#[from] PolarsError),
}

/// Read at most `limit` rows from the collision CSV at `path` and normalize
/// them:
///
/// 1. merge the raw crash date and time fields into one [`DATE_TIME`]
///    datetime column,
/// 2. drop rows missing latitude or longitude,
/// 3. lowercase every column name,
/// 4. fill absent injury counts with zero.
///
/// Repeat calls with equal arguments yield equal tables.
pub fn load_collisions(path: &Path, limit: usize) -> Result<DataFrame, LoaderError> {
    if limit == 0 {
        return Err(LoaderError::InvalidRowLimit);
    }
    if !path.is_file() {
        return Err(LoaderError::ResourceNotFound(path.to_path_buf()));
    }

    let mut df = LazyCsvReader::new(path)
        .with_n_rows(Some(limit))
        .with_infer_schema_length(Some(10_000))
        .with_ignore_errors(true)
        .finish()?
        .collect()?;

    let lowered: Vec<String> = df
        .get_column_names()
        .iter()
        .map(|name| name.to_lowercase())
        .collect();
    df.set_column_names(lowered)?;

    for required in REQUIRED_COLUMNS {
        if df.column(required).is_err() {
            return Err(LoaderError::MissingColumn(required));
        }
    }

    let raw_rows = df.height();
    let df = df
        .lazy()
        .with_column(coalesce(&timestamp_candidates()).alias(DATE_TIME))
        .drop([COL_CRASH_DATE, COL_CRASH_TIME])
        .with_columns([
            col(COL_LATITUDE).cast(DataType::Float64),
            col(COL_LONGITUDE).cast(DataType::Float64),
        ])
        .filter(
            col(COL_LATITUDE)
                .is_not_null()
                .and(col(COL_LONGITUDE).is_not_null()),
        )
        .with_columns(
            INJURY_COLUMNS
                .iter()
                .map(|name| col(*name).cast(DataType::Int64).fill_null(lit(0)))
                .collect::<Vec<_>>(),
        )
        .collect()?;

    let unparsed = df.column(DATE_TIME)?.null_count();
    if unparsed > 0 {
        return Err(LoaderError::TimestampParse { rows: unparsed });
    }

    info!(
        raw_rows,
        kept_rows = df.height(),
        path = %path.display(),
        "collision CSV loaded"
    );
    Ok(df)
}

/// One strptime attempt per known format over the merged date+time text.
/// `strict: false` turns a miss into a null so the next format can claim it.
fn timestamp_candidates() -> Vec<Expr> {
    let merged = concat_str(
        [
            col(COL_CRASH_DATE).cast(DataType::String),
            col(COL_CRASH_TIME).cast(DataType::String),
        ],
        " ",
        false,
    );

    TIMESTAMP_FORMATS
        .iter()
        .map(|fmt| {
            merged.clone().str().strptime(
                DataType::Datetime(TimeUnit::Milliseconds, None),
                StrptimeOptions {
                    format: Some((*fmt).into()),
                    strict: false,
                    ..Default::default()
                },
                lit("raise"),
            )
        })
        .collect()
}

/// Owns the CSV path and memoizes normalized tables per row bound, so moving
/// the row limit back to a previously used value never re-reads the file.
pub struct CollisionLoader {
    path: PathBuf,
    cache: HashMap<usize, DataFrame>,
}

impl CollisionLoader {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            cache: HashMap::new(),
        }
    }

    /// Load (or fetch from cache) the normalized table for `limit` rows.
    #[allow(dead_code)]
    pub fn load(&mut self, limit: usize) -> Result<&DataFrame, LoaderError> {
        match self.cache.entry(limit) {
            Entry::Occupied(entry) => Ok(entry.into_mut()),
            Entry::Vacant(entry) => {
                let df = load_collisions(&self.path, limit)?;
                Ok(entry.insert(df))
            }
        }
    }

    /// Cached table for `limit`, if one was already loaded.
    pub fn cached(&self, limit: usize) -> Option<&DataFrame> {
        self.cache.get(&limit)
    }

    /// Store a table loaded elsewhere (background thread).
    pub fn store(&mut self, limit: usize, df: DataFrame) {
        self.cache.insert(limit, df);
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    const HEADER: &str = "CRASH_DATE,CRASH_TIME,LATITUDE,LONGITUDE,\
        INJURED_PERSONS,INJURED_PEDESTRIANS,INJURED_CYCLISTS,INJURED_MOTORISTS,ON_STREET_NAME";

    fn write_csv(rows: &[&str]) -> (TempDir, PathBuf) {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("collisions.csv");
        let mut contents = String::from(HEADER);
        for row in rows {
            contents.push('\n');
            contents.push_str(row);
        }
        fs::write(&path, contents).unwrap();
        (dir, path)
    }

    fn sample_rows() -> Vec<&'static str> {
        vec![
            "04/12/2021,14:05,40.7128,-74.0060,2,1,0,1,BROADWAY",
            "04/12/2021,14:45,40.7306,-73.9866,0,0,0,0,HOUSTON STREET",
            "04/13/2021,09:30,,,1,0,1,0,MAIN STREET",
            "04/13/2021,23:59,40.6782,-73.9442,3,0,2,1,FLATBUSH AVENUE",
        ]
    }

    #[test]
    fn rows_without_coordinates_are_dropped() {
        let (_dir, path) = write_csv(&sample_rows());
        let df = load_collisions(&path, 1000).unwrap();

        assert_eq!(df.height(), 3);
        assert_eq!(df.column(COL_LATITUDE).unwrap().null_count(), 0);
        assert_eq!(df.column(COL_LONGITUDE).unwrap().null_count(), 0);
    }

    #[test]
    fn columns_are_lowercased_and_timestamp_is_canonical() {
        let (_dir, path) = write_csv(&sample_rows());
        let df = load_collisions(&path, 1000).unwrap();

        for name in df.get_column_names() {
            assert_eq!(name.as_str(), name.to_lowercase());
        }
        assert!(matches!(
            df.column(DATE_TIME).unwrap().dtype(),
            DataType::Datetime(_, _)
        ));
        assert!(df.column(COL_CRASH_DATE).is_err());
        assert!(df.column(COL_CRASH_TIME).is_err());
    }

    #[test]
    fn loading_is_idempotent() {
        let (_dir, path) = write_csv(&sample_rows());
        let first = load_collisions(&path, 1000).unwrap();
        let second = load_collisions(&path, 1000).unwrap();

        assert!(first.equals_missing(&second));
    }

    #[test]
    fn row_bound_is_honored() {
        let (_dir, path) = write_csv(&sample_rows());
        let df = load_collisions(&path, 1).unwrap();

        assert!(df.height() <= 1);
    }

    #[test]
    fn row_bound_of_one_on_a_coordinate_free_row_yields_empty() {
        let (_dir, path) = write_csv(&["04/13/2021,09:30,,,1,0,1,0,MAIN STREET"]);
        let df = load_collisions(&path, 1).unwrap();

        assert_eq!(df.height(), 0);
    }

    #[test]
    fn zero_row_limit_is_rejected() {
        let (_dir, path) = write_csv(&sample_rows());
        let err = load_collisions(&path, 0).unwrap_err();

        assert!(matches!(err, LoaderError::InvalidRowLimit));
    }

    #[test]
    fn missing_file_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        let err = load_collisions(&dir.path().join("nope.csv"), 10).unwrap_err();

        assert!(matches!(err, LoaderError::ResourceNotFound(_)));
    }

    #[test]
    fn missing_required_column_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("partial.csv");
        fs::write(&path, "CRASH_DATE,LATITUDE,LONGITUDE\n04/12/2021,40.7,-74.0").unwrap();
        let err = load_collisions(&path, 10).unwrap_err();

        assert!(matches!(err, LoaderError::MissingColumn(COL_CRASH_TIME)));
    }

    #[test]
    fn unparseable_timestamps_are_reported() {
        let (_dir, path) = write_csv(&["someday,whenever,40.7128,-74.0060,0,0,0,0,BROADWAY"]);
        let err = load_collisions(&path, 10).unwrap_err();

        assert!(matches!(err, LoaderError::TimestampParse { rows: 1 }));
    }

    #[test]
    fn absent_injury_counts_become_zero() {
        let (_dir, path) = write_csv(&[
            "04/12/2021,14:05,40.7128,-74.0060,,,,,BROADWAY",
            "04/12/2021,15:05,40.7306,-73.9866,2,1,0,1,HOUSTON STREET",
        ]);
        let df = load_collisions(&path, 10).unwrap();

        for name in INJURY_COLUMNS {
            let counts = df.column(name).unwrap();
            assert_eq!(counts.null_count(), 0);
            assert_eq!(counts.i64().unwrap().get(0), Some(0));
        }
    }

    #[test]
    fn iso_timestamps_parse_through_the_fallback_formats() {
        let (_dir, path) = write_csv(&["2021-04-12,14:05:00,40.7128,-74.0060,0,0,0,0,BROADWAY"]);
        let df = load_collisions(&path, 10).unwrap();

        assert_eq!(df.height(), 1);
        assert_eq!(df.column(DATE_TIME).unwrap().null_count(), 0);
    }

    #[test]
    fn loader_cache_is_keyed_by_row_bound() {
        let (_dir, path) = write_csv(&sample_rows());
        let mut loader = CollisionLoader::new(&path);

        let rows_before = loader.load(1000).unwrap().height();
        // Swap the file out from under the loader; the cached table must win.
        fs::write(&path, format!("{HEADER}\n{}", sample_rows()[0])).unwrap();
        let rows_after = loader.load(1000).unwrap().height();

        assert_eq!(rows_before, rows_after);
        assert!(loader.cached(1000).is_some());
        assert!(loader.cached(17).is_none());
    }
}
