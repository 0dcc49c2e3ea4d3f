//! Dashboard Widget
//! Central scrollable panel rendering the maps, charts, and tables computed
//! from the current parameter set.

use crate::charts::{ChartPlotter, HexBin, MapViewConfig};
use crate::data::{InjuryCategory, StreetRank};
use egui::{RichText, ScrollArea};

/// First rows of the normalized table, stringified for display.
pub struct RawPreview {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<String>>,
    pub total_rows: usize,
}

/// Everything the dashboard renders for one parameter set.
pub struct DashboardData {
    pub injury_threshold: i64,
    pub points: Vec<[f64; 2]>,
    pub hour: u8,
    pub window_rows: usize,
    pub hex_bins: Vec<HexBin>,
    pub map_config: MapViewConfig,
    pub minute_counts: Vec<u64>,
    pub category: InjuryCategory,
    pub streets: Vec<StreetRank>,
    pub raw: Option<RawPreview>,
}

/// Scrollable dashboard area. Holds the views derived from the last
/// parameter set; the app swaps them out when a parameter changes.
#[derive(Default)]
pub struct Dashboard {
    pub data: Option<DashboardData>,
}

impl Dashboard {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn clear(&mut self) {
        self.data = None;
    }

    /// Draw the dashboard sections
    pub fn show(&mut self, ui: &mut egui::Ui) {
        let Some(data) = &self.data else {
            ui.centered_and_justified(|ui| {
                ui.label(RichText::new("No Data").size(20.0));
            });
            return;
        };

        ScrollArea::vertical()
            .auto_shrink([false, false])
            .show(ui, |ui| {
                ui.add_space(5.0);

                // ===== Point map =====
                ui.label(
                    RichText::new("Where are the most people injured?")
                        .size(18.0)
                        .strong(),
                );
                ui.label(
                    RichText::new(format!(
                        "{} collisions with at least {} injured persons",
                        data.points.len(),
                        data.injury_threshold
                    ))
                    .size(12.0),
                );
                ui.add_space(5.0);
                ChartPlotter::draw_point_map(ui, &data.points);

                ui.add_space(15.0);
                ui.separator();
                ui.add_space(10.0);

                // ===== Hex map =====
                let window_end = (data.hour + 1) % 24;
                ui.label(
                    RichText::new(format!(
                        "Collisions between {}:00 and {}:00",
                        data.hour, window_end
                    ))
                    .size(18.0)
                    .strong(),
                );
                ui.label(
                    RichText::new(format!("{} collisions in this hour", data.window_rows))
                        .size(12.0),
                );
                ui.add_space(5.0);
                ChartPlotter::draw_hex_map(ui, &data.hex_bins, &data.map_config);

                ui.add_space(15.0);

                // ===== Minute histogram =====
                ui.label(
                    RichText::new(format!(
                        "Breakdown by minute between {}:00 and {}:00",
                        data.hour, window_end
                    ))
                    .size(14.0)
                    .strong(),
                );
                ui.add_space(5.0);
                ChartPlotter::draw_minute_histogram(ui, &data.minute_counts, data.hour);

                ui.add_space(15.0);
                ui.separator();
                ui.add_space(10.0);

                // ===== Street ranking =====
                ui.label(
                    RichText::new("Top 5 most dangerous streets by affected type")
                        .size(18.0)
                        .strong(),
                );
                ui.add_space(5.0);
                if data.streets.is_empty() {
                    ui.label(
                        RichText::new(format!(
                            "No streets with injured {}",
                            data.category.label().to_lowercase()
                        ))
                        .size(12.0),
                    );
                } else {
                    ChartPlotter::draw_street_table(ui, &data.streets, data.category);
                }

                // ===== Raw data =====
                if let Some(raw) = &data.raw {
                    ui.add_space(15.0);
                    ui.separator();
                    ui.add_space(10.0);
                    ui.label(RichText::new("Raw Data").size(14.0).strong());
                    ui.label(
                        RichText::new(format!(
                            "showing {} of {} rows",
                            raw.rows.len(),
                            raw.total_rows
                        ))
                        .size(11.0),
                    );
                    ui.add_space(5.0);
                    Self::draw_raw_table(ui, raw);
                }

                ui.add_space(10.0);
            });
    }

    fn draw_raw_table(ui: &mut egui::Ui, raw: &RawPreview) {
        ScrollArea::horizontal().show(ui, |ui| {
            egui::Grid::new("raw_data_table")
                .striped(true)
                .min_col_width(70.0)
                .spacing([12.0, 3.0])
                .show(ui, |ui| {
                    for column in &raw.columns {
                        ui.label(RichText::new(column).strong().size(11.0));
                    }
                    ui.end_row();

                    for row in &raw.rows {
                        for value in row {
                            ui.label(RichText::new(value).size(11.0));
                        }
                        ui.end_row();
                    }
                });
        });
    }
}
