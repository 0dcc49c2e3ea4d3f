//! Hexagonal Binning Module
//! Aggregates collision coordinates into pointy-top hexagonal bins for the
//! extruded map. Binning runs as a parallel fold over point chunks.

use rayon::prelude::*;
use std::collections::HashMap;

/// Points per rayon work unit.
const CHUNK_SIZE: usize = 4096;

const SQRT_3: f64 = 1.732_050_807_568_877_2;

/// One aggregated hexagon cell.
#[derive(Debug, Clone, PartialEq)]
pub struct HexBin {
    /// Cell center in the binning plane (x, y).
    pub center: [f64; 2],
    /// Number of points that landed in the cell.
    pub count: u64,
}

/// Bin `points` (given as [x, y]) into pointy-top hexagons of the given
/// circumradius. Every input point lands in exactly one bin, so bin counts
/// always sum to the input length.
pub fn bin_points(points: &[[f64; 2]], radius: f64) -> Vec<HexBin> {
    if points.is_empty() || radius <= 0.0 {
        return Vec::new();
    }

    let counts: HashMap<(i64, i64), u64> = points
        .par_chunks(CHUNK_SIZE)
        .map(|chunk| {
            let mut local: HashMap<(i64, i64), u64> = HashMap::new();
            for point in chunk {
                *local.entry(cell_of(point[0], point[1], radius)).or_default() += 1;
            }
            local
        })
        .reduce(HashMap::new, |mut merged, local| {
            for (cell, count) in local {
                *merged.entry(cell).or_default() += count;
            }
            merged
        });

    counts
        .into_iter()
        .map(|((q, r), count)| HexBin {
            center: cell_center(q, r, radius),
            count,
        })
        .collect()
}

/// Axial cell coordinates of a point (pointy-top orientation).
fn cell_of(x: f64, y: f64, radius: f64) -> (i64, i64) {
    let q = (SQRT_3 / 3.0 * x - y / 3.0) / radius;
    let r = (2.0 / 3.0 * y) / radius;
    axial_round(q, r)
}

/// Cell center back in plane coordinates.
fn cell_center(q: i64, r: i64, radius: f64) -> [f64; 2] {
    let x = radius * SQRT_3 * (q as f64 + r as f64 / 2.0);
    let y = radius * 1.5 * r as f64;
    [x, y]
}

/// Round fractional axial coordinates to the containing cell via cube
/// coordinates, fixing up the axis with the largest rounding error.
fn axial_round(q: f64, r: f64) -> (i64, i64) {
    let s = -q - r;
    let mut rq = q.round();
    let mut rr = r.round();
    let rs = s.round();

    let dq = (rq - q).abs();
    let dr = (rr - r).abs();
    let ds = (rs - s).abs();

    if dq > dr && dq > ds {
        rq = -rr - rs;
    } else if dr > ds {
        rr = -rq - rs;
    }

    (rq as i64, rr as i64)
}

/// Corners of a pointy-top hexagon with the given circumradius, wound
/// counter-clockwise.
pub fn hex_corners(center: [f64; 2], radius: f64) -> [[f64; 2]; 6] {
    let mut corners = [[0.0; 2]; 6];
    for (i, corner) in corners.iter_mut().enumerate() {
        // 30° offset puts corners at the top/bottom (pointy-top).
        let angle = std::f64::consts::FRAC_PI_3 * i as f64 + std::f64::consts::FRAC_PI_6;
        *corner = [
            center[0] + radius * angle.cos(),
            center[1] + radius * angle.sin(),
        ];
    }
    corners
}
