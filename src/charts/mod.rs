//! Charts module - map and chart rendering

mod hexbin;
mod plotter;

pub use hexbin::{bin_points, hex_corners, HexBin};
pub use plotter::{ChartPlotter, MapViewConfig};
