//! Data module - collision CSV loading and derived views

mod loader;
mod views;

pub use loader::{
    load_collisions, CollisionLoader, LoaderError, COL_INJURED_PERSONS, COL_LATITUDE,
    COL_LONGITUDE, COL_STREET, DATE_TIME, DEFAULT_ROW_LIMIT,
};
pub use views::{
    coordinate_pairs, filter_by_hour, injury_point_set, map_midpoint, minute_histogram,
    top_streets, InjuryCategory, StreetRank, ViewError, MINUTE_BUCKETS,
};
