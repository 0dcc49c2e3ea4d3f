//! Control Panel Widget
//! Left side panel with the data source controls and view filters.

use crate::data::{InjuryCategory, DEFAULT_ROW_LIMIT};
use egui::{Color32, ComboBox, RichText};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Upper bound of the injured-persons slider.
pub const MAX_INJURY_THRESHOLD: i64 = 19;

/// User settings driving the dashboard views. Persisted as JSON between
/// sessions.
#[derive(Clone, PartialEq, Serialize, Deserialize)]
pub struct UserSettings {
    pub csv_path: PathBuf,
    pub row_limit: usize,
    pub injury_threshold: i64,
    pub hour: u8,
    pub category: InjuryCategory,
    pub show_raw: bool,
}

impl Default for UserSettings {
    fn default() -> Self {
        Self {
            csv_path: PathBuf::from("resources/motor_vehicle_collisions.csv"),
            row_limit: DEFAULT_ROW_LIMIT,
            injury_threshold: 0,
            hour: 0,
            category: InjuryCategory::default(),
            show_raw: false,
        }
    }
}

/// Left side control panel with file selection and view filters.
pub struct ControlPanel {
    pub settings: UserSettings,
    pub status: String,
    pub loading: bool,
}

impl Default for ControlPanel {
    fn default() -> Self {
        Self {
            settings: UserSettings::default(),
            status: "Ready".to_string(),
            loading: false,
        }
    }
}

impl ControlPanel {
    pub fn new(settings: UserSettings) -> Self {
        Self {
            settings,
            ..Self::default()
        }
    }

    /// Draw the control panel
    pub fn show(&mut self, ui: &mut egui::Ui) -> ControlPanelAction {
        let mut action = ControlPanelAction::None;

        // Title
        ui.vertical_centered(|ui| {
            ui.add_space(5.0);
            ui.label(
                RichText::new("🚗 Crashboard")
                    .size(22.0)
                    .color(Color32::from_rgb(100, 149, 237)),
            );
            ui.label(
                RichText::new("Motor Vehicle Collisions")
                    .size(11.0)
                    .color(Color32::GRAY),
            );
        });
        ui.add_space(10.0);
        ui.separator();
        ui.add_space(5.0);

        // ===== Data Source Section =====
        ui.label(RichText::new("📁 Data Source").size(14.0).strong());
        ui.add_space(5.0);

        egui::Frame::none()
            .fill(ui.visuals().widgets.noninteractive.bg_fill)
            .rounding(5.0)
            .inner_margin(8.0)
            .show(ui, |ui| {
                ui.horizontal(|ui| {
                    let path_text = self
                        .settings
                        .csv_path
                        .file_name()
                        .map(|n| n.to_string_lossy().to_string())
                        .unwrap_or_else(|| "No file selected".to_string());

                    ui.label(RichText::new(&path_text).size(12.0));

                    ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
                        if ui.button("📂 Browse").clicked() {
                            action = ControlPanelAction::BrowseCsv;
                        }
                    });
                });
            });

        ui.add_space(5.0);

        ui.horizontal(|ui| {
            ui.label("Row limit:");
            ui.add(
                egui::DragValue::new(&mut self.settings.row_limit)
                    .range(1..=1_000_000)
                    .speed(1000),
            );
            ui.add_enabled_ui(!self.loading, |ui| {
                if ui.button("⟳ Reload").clicked() {
                    action = ControlPanelAction::ReloadCsv;
                }
            });
        });

        ui.add_space(15.0);
        ui.separator();
        ui.add_space(10.0);

        // ===== Filters Section =====
        ui.label(RichText::new("🔧 Filters").size(14.0).strong());
        ui.add_space(8.0);

        ui.label("Persons injured in vehicle collisions:");
        ui.add(egui::Slider::new(
            &mut self.settings.injury_threshold,
            0..=MAX_INJURY_THRESHOLD,
        ));

        ui.add_space(8.0);

        ui.label("Hour of day:");
        ui.add(egui::Slider::new(&mut self.settings.hour, 0..=23));

        ui.add_space(8.0);

        ui.horizontal(|ui| {
            ui.label("Affected type of people:");
            ComboBox::from_id_salt("injury_category")
                .selected_text(self.settings.category.label())
                .show_ui(ui, |ui| {
                    for category in InjuryCategory::ALL {
                        ui.selectable_value(
                            &mut self.settings.category,
                            category,
                            category.label(),
                        );
                    }
                });
        });

        ui.add_space(8.0);

        ui.checkbox(&mut self.settings.show_raw, "Display Raw Data");

        ui.add_space(15.0);
        ui.separator();
        ui.add_space(10.0);

        // ===== Status Section =====
        ui.horizontal(|ui| {
            if self.loading {
                ui.spinner();
            }
            let status_color = if self.status.contains("Error") {
                Color32::from_rgb(220, 53, 69)
            } else if self.status.contains("Loaded") {
                Color32::from_rgb(40, 167, 69)
            } else {
                Color32::GRAY
            };
            ui.label(RichText::new(&self.status).size(11.0).color(status_color));
        });

        action
    }

    /// Set the status line
    pub fn set_status(&mut self, status: &str) {
        self.status = status.to_string();
    }
}

/// Actions triggered by control panel
#[derive(Debug, Clone, PartialEq)]
pub enum ControlPanelAction {
    None,
    BrowseCsv,
    ReloadCsv,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn settings_round_trip_through_json() {
        let settings = UserSettings {
            csv_path: PathBuf::from("data/collisions.csv"),
            row_limit: 5_000,
            injury_threshold: 7,
            hour: 18,
            category: InjuryCategory::Cyclists,
            show_raw: true,
        };

        let json = serde_json::to_string(&settings).unwrap();
        let restored: UserSettings = serde_json::from_str(&json).unwrap();

        assert!(restored == settings);
    }

    #[test]
    fn default_settings_point_at_the_bundled_resource() {
        let settings = UserSettings::default();

        assert_eq!(settings.row_limit, DEFAULT_ROW_LIMIT);
        assert_eq!(settings.injury_threshold, 0);
        assert!(!settings.show_raw);
        assert!(settings.csv_path.to_string_lossy().ends_with(".csv"));
    }
}
