//! Derived Views Module
//! Pure, stateless queries over the normalized collision table. Every view
//! builds a new frame or vector; the loaded table is never mutated.

use super::loader::{
    COL_INJURED_CYCLISTS, COL_INJURED_MOTORISTS, COL_INJURED_PEDESTRIANS, COL_INJURED_PERSONS,
    COL_LATITUDE, COL_LONGITUDE, COL_STREET, DATE_TIME,
};
use polars::prelude::*;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Number of minute buckets in the per-hour histogram.
pub const MINUTE_BUCKETS: usize = 60;

#[derive(Error, Debug)]
pub enum ViewError {
    #[error("hour {0} out of range (0-23)")]
    HourOutOfRange(u8),
    #[error("query failed: {0}")]
    Query(#[from] PolarsError),
}

/// Injured-party category selectable in the street ranking.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum InjuryCategory {
    Pedestrians,
    Cyclists,
    Motorists,
}

impl Default for InjuryCategory {
    fn default() -> Self {
        InjuryCategory::Pedestrians
    }
}

impl InjuryCategory {
    pub const ALL: [InjuryCategory; 3] = [
        InjuryCategory::Pedestrians,
        InjuryCategory::Cyclists,
        InjuryCategory::Motorists,
    ];

    /// Column of the normalized table holding this category's count.
    pub fn column(&self) -> &'static str {
        match self {
            InjuryCategory::Pedestrians => COL_INJURED_PEDESTRIANS,
            InjuryCategory::Cyclists => COL_INJURED_CYCLISTS,
            InjuryCategory::Motorists => COL_INJURED_MOTORISTS,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            InjuryCategory::Pedestrians => "Pedestrians",
            InjuryCategory::Cyclists => "Cyclists",
            InjuryCategory::Motorists => "Motorists",
        }
    }
}

/// One entry of the street ranking.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StreetRank {
    pub street: String,
    pub injured: i64,
}

/// Coordinates of rows with at least `threshold` injured persons, as
/// (latitude, longitude) pairs for the point map. Raising the threshold can
/// only shrink the result.
pub fn injury_point_set(df: &DataFrame, threshold: i64) -> Result<Vec<[f64; 2]>, ViewError> {
    let selected = df
        .clone()
        .lazy()
        .filter(col(COL_INJURED_PERSONS).gt_eq(lit(threshold)))
        .select([col(COL_LATITUDE), col(COL_LONGITUDE)])
        .collect()?;

    coordinate_pairs(&selected)
}

/// Extract (latitude, longitude) pairs from a frame carrying both columns.
pub fn coordinate_pairs(df: &DataFrame) -> Result<Vec<[f64; 2]>, ViewError> {
    let lat = df.column(COL_LATITUDE)?.f64()?;
    let lon = df.column(COL_LONGITUDE)?.f64()?;

    Ok(lat
        .into_iter()
        .zip(lon)
        .filter_map(|(lat, lon)| Some([lat?, lon?]))
        .collect())
}

/// Rows whose crash timestamp falls inside the given hour of day.
pub fn filter_by_hour(df: &DataFrame, hour: u8) -> Result<DataFrame, ViewError> {
    if hour > 23 {
        return Err(ViewError::HourOutOfRange(hour));
    }

    let filtered = df
        .clone()
        .lazy()
        .filter(
            col(DATE_TIME)
                .dt()
                .hour()
                .cast(DataType::UInt32)
                .eq(lit(hour as u32)),
        )
        .collect()?;
    Ok(filtered)
}

/// Minute-of-hour histogram over an hour-filtered frame. The bucket sum
/// always equals the frame's row count.
pub fn minute_histogram(df: &DataFrame) -> Result<Vec<u64>, ViewError> {
    let minutes = df
        .clone()
        .lazy()
        .select([col(DATE_TIME)
            .dt()
            .minute()
            .cast(DataType::UInt32)
            .alias("minute")])
        .collect()?;

    let mut buckets = vec![0u64; MINUTE_BUCKETS];
    for minute in minutes.column("minute")?.u32()?.into_iter().flatten() {
        if let Some(bucket) = buckets.get_mut(minute as usize) {
            *bucket += 1;
        }
    }
    Ok(buckets)
}

/// Streets ranked descending by the selected category's injury count,
/// restricted to rows with at least one such injury and a present street
/// name. The sort is stable, so ties keep their original row order.
pub fn top_streets(
    df: &DataFrame,
    category: InjuryCategory,
    n: usize,
) -> Result<Vec<StreetRank>, ViewError> {
    let count_col = category.column();
    let ranked = df
        .clone()
        .lazy()
        .filter(
            col(count_col)
                .gt_eq(lit(1))
                .and(col(COL_STREET).is_not_null()),
        )
        .select([col(COL_STREET), col(count_col)])
        .sort(
            [count_col],
            SortMultipleOptions::default()
                .with_order_descending(true)
                .with_maintain_order(true),
        )
        .limit(n as IdxSize)
        .collect()?;

    let streets = ranked.column(COL_STREET)?.str()?;
    let counts = ranked.column(count_col)?.i64()?;

    Ok(streets
        .into_iter()
        .zip(counts)
        .filter_map(|(street, injured)| {
            Some(StreetRank {
                street: street?.to_string(),
                injured: injured?,
            })
        })
        .collect())
}

/// Mean latitude/longitude of the frame, used to center map views.
/// `None` on an empty frame.
pub fn map_midpoint(df: &DataFrame) -> Result<Option<(f64, f64)>, ViewError> {
    let means = df
        .clone()
        .lazy()
        .select([
            col(COL_LATITUDE).mean().alias("lat"),
            col(COL_LONGITUDE).mean().alias("lon"),
        ])
        .collect()?;

    let lat = means.column("lat")?.f64()?.get(0);
    let lon = means.column("lon")?.f64()?.get(0);
    Ok(lat.zip(lon))
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Frame in post-loader shape: lowercase columns, merged datetime,
    /// non-null coordinates and injury counts.
    fn normalized_frame() -> DataFrame {
        let df = df![
            DATE_TIME => [
                "04/12/2021 14:05",
                "04/12/2021 14:05",
                "04/12/2021 14:30",
                "04/12/2021 09:59",
                "04/13/2021 14:07",
            ],
            COL_LATITUDE => [40.7128, 40.7306, 40.6782, 40.7484, 40.7580],
            COL_LONGITUDE => [-74.0060, -73.9866, -73.9442, -73.9857, -73.9855],
            COL_INJURED_PERSONS => [2i64, 0, 5, 1, 3],
            COL_INJURED_PEDESTRIANS => [1i64, 0, 0, 1, 0],
            COL_INJURED_CYCLISTS => [0i64, 0, 2, 0, 1],
            COL_INJURED_MOTORISTS => [1i64, 0, 3, 0, 2],
            COL_STREET => [
                Some("BROADWAY"),
                Some("HOUSTON STREET"),
                Some("FLATBUSH AVENUE"),
                None,
                Some("5 AVENUE"),
            ],
        ]
        .unwrap();

        df.lazy()
            .with_column(
                col(DATE_TIME)
                    .str()
                    .strptime(
                        DataType::Datetime(TimeUnit::Milliseconds, None),
                        StrptimeOptions {
                            format: Some("%m/%d/%Y %H:%M".into()),
                            ..Default::default()
                        },
                        lit("raise"),
                    )
                    .alias(DATE_TIME),
            )
            .collect()
            .unwrap()
    }

    #[test]
    fn point_set_is_monotone_in_the_threshold() {
        let df = normalized_frame();

        let mut previous = usize::MAX;
        for threshold in 0..=6 {
            let points = injury_point_set(&df, threshold).unwrap();
            assert!(points.len() <= previous);
            previous = points.len();
        }
    }

    #[test]
    fn point_set_honors_the_threshold() {
        let df = normalized_frame();

        assert_eq!(injury_point_set(&df, 0).unwrap().len(), 5);
        assert_eq!(injury_point_set(&df, 2).unwrap().len(), 3);
        assert_eq!(injury_point_set(&df, 6).unwrap().len(), 0);
    }

    #[test]
    fn hour_filter_keeps_only_the_selected_hour() {
        let df = normalized_frame();

        let hour_14 = filter_by_hour(&df, 14).unwrap();
        assert_eq!(hour_14.height(), 4);

        let hour_9 = filter_by_hour(&df, 9).unwrap();
        assert_eq!(hour_9.height(), 1);

        let hour_3 = filter_by_hour(&df, 3).unwrap();
        assert_eq!(hour_3.height(), 0);
    }

    #[test]
    fn out_of_range_hour_is_rejected() {
        let df = normalized_frame();
        let err = filter_by_hour(&df, 24).unwrap_err();

        assert!(matches!(err, ViewError::HourOutOfRange(24)));
    }

    #[test]
    fn minute_histogram_sums_to_the_window_row_count() {
        let df = normalized_frame();
        let windowed = filter_by_hour(&df, 14).unwrap();
        let histogram = minute_histogram(&windowed).unwrap();

        assert_eq!(histogram.len(), MINUTE_BUCKETS);
        assert_eq!(
            histogram.iter().sum::<u64>(),
            windowed.height() as u64
        );
        assert_eq!(histogram[5], 2);
        assert_eq!(histogram[30], 1);
        assert_eq!(histogram[7], 1);
    }

    #[test]
    fn top_streets_ranks_descending_and_excludes_zero_counts() {
        let df = df![
            COL_STREET => ["STREET A", "STREET B", "STREET C", "STREET D"],
            COL_INJURED_CYCLISTS => [3i64, 5, 0, 2],
        ]
        .unwrap();

        let ranked = top_streets(&df, InjuryCategory::Cyclists, 5).unwrap();

        let expected = [("STREET B", 5), ("STREET A", 3), ("STREET D", 2)];
        assert_eq!(ranked.len(), expected.len());
        for (rank, (street, injured)) in ranked.iter().zip(expected) {
            assert_eq!(rank.street, street);
            assert_eq!(rank.injured, injured);
        }
    }

    #[test]
    fn top_streets_breaks_ties_by_row_order() {
        let df = df![
            COL_STREET => ["FIRST", "SECOND", "THIRD"],
            COL_INJURED_PEDESTRIANS => [2i64, 2, 2],
        ]
        .unwrap();

        let ranked = top_streets(&df, InjuryCategory::Pedestrians, 5).unwrap();
        let order: Vec<&str> = ranked.iter().map(|r| r.street.as_str()).collect();

        assert_eq!(order, ["FIRST", "SECOND", "THIRD"]);
    }

    #[test]
    fn top_streets_skips_rows_without_a_street_name() {
        let df = normalized_frame();
        let ranked = top_streets(&df, InjuryCategory::Pedestrians, 5).unwrap();

        // The hour-09 pedestrian injury has no street name and must not rank.
        assert_eq!(ranked.len(), 1);
        assert_eq!(ranked[0].street, "BROADWAY");
    }

    #[test]
    fn top_streets_truncates_to_n() {
        let df = normalized_frame();
        let ranked = top_streets(&df, InjuryCategory::Motorists, 1).unwrap();

        assert_eq!(ranked.len(), 1);
        assert_eq!(ranked[0].street, "FLATBUSH AVENUE");
        assert_eq!(ranked[0].injured, 3);
    }

    #[test]
    fn midpoint_averages_coordinates() {
        let df = df![
            COL_LATITUDE => [40.0, 41.0],
            COL_LONGITUDE => [-74.0, -73.0],
        ]
        .unwrap();

        let (lat, lon) = map_midpoint(&df).unwrap().unwrap();
        assert!((lat - 40.5).abs() < 1e-9);
        assert!((lon - -73.5).abs() < 1e-9);
    }

    #[test]
    fn midpoint_of_empty_frame_is_none() {
        let df = normalized_frame();
        let empty = filter_by_hour(&df, 3).unwrap();

        assert!(map_midpoint(&empty).unwrap().is_none());
    }
}
