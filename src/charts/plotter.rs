//! Map & Chart Plotter Module
//! Draws the dashboard's maps and charts with egui_plot. Everything here is
//! a thin rendering pass over derived-view output.

use crate::charts::hexbin::{hex_corners, HexBin};
use crate::data::{InjuryCategory, StreetRank};
use egui::{Color32, RichText};
use egui_plot::{Bar, BarChart, Plot, PlotPoints, Points, Polygon};

/// Scatter color for individual collisions.
pub const POINT_COLOR: Color32 = Color32::from_rgb(231, 76, 60);
/// Histogram bar color.
pub const BAR_COLOR: Color32 = Color32::from_rgb(52, 152, 219);
/// Hex ramp endpoints, low count to high count.
const HEX_LOW: Color32 = Color32::from_rgb(26, 188, 156);
const HEX_HIGH: Color32 = Color32::from_rgb(231, 76, 60);

const MAP_HEIGHT: f32 = 360.0;
const CHART_HEIGHT: f32 = 300.0;

/// View configuration for the extruded hex map.
#[derive(Debug, Clone)]
pub struct MapViewConfig {
    /// Map center as (latitude, longitude).
    pub center: (f64, f64),
    /// Web-map style zoom level; higher is closer.
    pub zoom: f64,
    /// Camera pitch in degrees; 0 flattens the extrusion entirely.
    pub pitch_deg: f64,
    /// Multiplier applied to column heights.
    pub elevation_scale: f64,
    /// Hexagon circumradius in meters.
    pub hex_radius_m: f64,
}

impl Default for MapViewConfig {
    fn default() -> Self {
        Self {
            center: (40.73, -73.93),
            zoom: 11.0,
            pitch_deg: 50.0,
            elevation_scale: 4.0,
            hex_radius_m: 100.0,
        }
    }
}

impl MapViewConfig {
    /// Hexagon circumradius in degrees of latitude.
    pub fn hex_radius_deg(&self) -> f64 {
        self.hex_radius_m / 111_320.0
    }

    /// Half the latitude span shown at this zoom level.
    fn half_span_deg(&self) -> f64 {
        180.0 / 2f64.powf(self.zoom)
    }
}

/// Draws the point map, hex map, minute histogram, and street table.
pub struct ChartPlotter;

impl ChartPlotter {
    /// Scatter of collisions as (latitude, longitude) pairs. Axes carry the
    /// raw coordinates; aspect is locked so the city is not smeared.
    pub fn draw_point_map(ui: &mut egui::Ui, points: &[[f64; 2]]) {
        let plot_points: Vec<[f64; 2]> = points.iter().map(|p| [p[1], p[0]]).collect();

        Plot::new("collision_point_map")
            .height(MAP_HEIGHT)
            .data_aspect(1.0)
            .x_axis_label("longitude")
            .y_axis_label("latitude")
            .allow_scroll(false)
            .show(ui, |plot_ui| {
                plot_ui.points(
                    Points::new(PlotPoints::from(plot_points))
                        .radius(1.5)
                        .color(POINT_COLOR)
                        .name("collisions"),
                );
            });
    }

    /// Extruded hex-bin map: each cell gets a footprint hexagon colored by
    /// count and, with a non-zero pitch, a column whose height scales with
    /// `elevation_scale`.
    pub fn draw_hex_map(ui: &mut egui::Ui, bins: &[HexBin], config: &MapViewConfig) {
        let max_count = bins.iter().map(|b| b.count).max().unwrap_or(0).max(1);
        let radius = config.hex_radius_deg();
        let pitch_factor = config.pitch_deg.to_radians().sin();
        let max_height = radius * 8.0 * config.elevation_scale * pitch_factor;

        let (center_lat, center_lon) = config.center;
        let half_span = config.half_span_deg();

        Plot::new("collision_hex_map")
            .height(MAP_HEIGHT)
            .data_aspect(1.0)
            .x_axis_label("longitude")
            .y_axis_label("latitude")
            .allow_scroll(false)
            .include_x(center_lon - half_span)
            .include_x(center_lon + half_span)
            .include_y(center_lat - half_span)
            .include_y(center_lat + half_span)
            .show(ui, |plot_ui| {
                for bin in bins {
                    let t = (bin.count as f64 / max_count as f64).sqrt();
                    let color = lerp_color(HEX_LOW, HEX_HIGH, t);

                    let corners = hex_corners(bin.center, radius).to_vec();
                    plot_ui.polygon(
                        Polygon::new(PlotPoints::from(corners))
                            .fill_color(color.gamma_multiply(0.55))
                            .stroke(egui::Stroke::new(1.0, color)),
                    );

                    let height = max_height * bin.count as f64 / max_count as f64;
                    if height > 0.0 {
                        let [cx, cy] = bin.center;
                        let w = radius * 0.5;
                        let column = vec![
                            [cx - w, cy],
                            [cx + w, cy],
                            [cx + w, cy + height],
                            [cx - w, cy + height],
                        ];
                        plot_ui.polygon(
                            Polygon::new(PlotPoints::from(column))
                                .fill_color(color)
                                .stroke(egui::Stroke::new(0.5, color)),
                        );
                    }
                }
            });
    }

    /// 60-bar minute-of-hour histogram for the selected hour window.
    pub fn draw_minute_histogram(ui: &mut egui::Ui, counts: &[u64], hour: u8) {
        let bars: Vec<Bar> = counts
            .iter()
            .enumerate()
            .map(|(minute, &crashes)| Bar::new(minute as f64, crashes as f64).width(0.8))
            .collect();

        Plot::new(format!("minute_histogram_{hour}"))
            .height(CHART_HEIGHT)
            .x_axis_label("minute")
            .y_axis_label("crashes")
            .allow_scroll(false)
            .include_x(-0.5)
            .include_x(59.5)
            .include_y(0.0)
            .show(ui, |plot_ui| {
                plot_ui.bar_chart(BarChart::new(bars).color(BAR_COLOR).name("crashes"));
            });
    }

    /// Street ranking as a striped two-column grid.
    pub fn draw_street_table(ui: &mut egui::Ui, streets: &[StreetRank], category: InjuryCategory) {
        egui::Frame::none()
            .fill(ui.visuals().widgets.noninteractive.bg_fill)
            .rounding(5.0)
            .inner_margin(8.0)
            .show(ui, |ui| {
                egui::Grid::new(ui.make_persistent_id(format!("streets_{}", category.label())))
                    .striped(true)
                    .min_col_width(80.0)
                    .spacing([24.0, 4.0])
                    .show(ui, |ui| {
                        ui.label(RichText::new("Street").strong().size(12.0));
                        ui.label(
                            RichText::new(format!("Injured {}", category.label()))
                                .strong()
                                .size(12.0),
                        );
                        ui.end_row();

                        for rank in streets {
                            ui.label(RichText::new(&rank.street).size(12.0));
                            ui.label(RichText::new(rank.injured.to_string()).size(12.0));
                            ui.end_row();
                        }
                    });
            });
    }
}

/// Channel-wise interpolation between two colors, `t` in [0, 1].
fn lerp_color(low: Color32, high: Color32, t: f64) -> Color32 {
    let t = t.clamp(0.0, 1.0) as f32;
    let mix = |a: u8, b: u8| (a as f32 + (b as f32 - a as f32) * t).round() as u8;
    Color32::from_rgb(
        mix(low.r(), high.r()),
        mix(low.g(), high.g()),
        mix(low.b(), high.b()),
    )
}
