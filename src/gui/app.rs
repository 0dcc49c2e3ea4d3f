//! Crashboard Main Application
//! Main window wiring the control panel, the loader, and the dashboard.

use crate::charts::{bin_points, MapViewConfig};
use crate::data::{
    self, load_collisions, CollisionLoader, InjuryCategory, StreetRank, ViewError,
};
use crate::gui::{
    ControlPanel, ControlPanelAction, Dashboard, DashboardData, RawPreview, UserSettings,
};
use anyhow::Context as _;
use egui::SidePanel;
use polars::prelude::DataFrame;
use std::sync::mpsc::{channel, Receiver};
use std::thread;
use tracing::{error, info};

const SETTINGS_KEY: &str = "crashboard_settings";
const RAW_PREVIEW_ROWS: usize = 100;
const TOP_STREETS: usize = 5;

/// CSV loading result from background thread
enum LoadResult {
    Complete { limit: usize, df: DataFrame },
    Error(String),
}

/// Parameter set the dashboard views are derived from. Views rebuild only
/// when this changes between frames.
#[derive(Clone, PartialEq)]
struct ViewParams {
    injury_threshold: i64,
    hour: u8,
    category: InjuryCategory,
    show_raw: bool,
}

impl ViewParams {
    fn from_settings(settings: &UserSettings) -> Self {
        Self {
            injury_threshold: settings.injury_threshold,
            hour: settings.hour,
            category: settings.category,
            show_raw: settings.show_raw,
        }
    }
}

/// Main application window.
pub struct CrashboardApp {
    loader: CollisionLoader,
    control_panel: ControlPanel,
    dashboard: Dashboard,

    /// Normalized table the views are computed from.
    frame: Option<DataFrame>,
    /// Parameters the current dashboard data was computed with.
    last_params: Option<ViewParams>,

    // Async CSV loading
    load_rx: Option<Receiver<LoadResult>>,
    is_loading: bool,
}

impl CrashboardApp {
    pub fn new(cc: &eframe::CreationContext<'_>) -> Self {
        let settings = cc
            .storage
            .and_then(|storage| storage.get_string(SETTINGS_KEY))
            .and_then(|json| serde_json::from_str::<UserSettings>(&json).ok())
            .unwrap_or_default();

        let loader = CollisionLoader::new(settings.csv_path.clone());
        let mut app = Self {
            loader,
            control_panel: ControlPanel::new(settings),
            dashboard: Dashboard::new(),
            frame: None,
            last_params: None,
            load_rx: None,
            is_loading: false,
        };

        if app.loader.path().is_file() {
            app.start_load();
        } else {
            app.control_panel
                .set_status("Select a collision CSV to begin");
        }
        app
    }

    /// Kick off a CSV load for the current row limit, on a background thread
    /// unless the loader already has it cached.
    fn start_load(&mut self) {
        if self.is_loading {
            return;
        }

        let limit = self.control_panel.settings.row_limit;
        if limit == 0 {
            self.control_panel.set_status("Error: row limit must be positive");
            return;
        }

        if let Some(df) = self.loader.cached(limit) {
            let df = df.clone();
            self.control_panel
                .set_status(&format!("Loaded {} collisions (cached)", df.height()));
            self.install_frame(df);
            return;
        }

        let path = self.loader.path().to_path_buf();
        self.is_loading = true;
        self.control_panel.loading = true;
        self.control_panel.set_status("Reading CSV file...");

        let (tx, rx) = channel();
        self.load_rx = Some(rx);

        // Load CSV in background thread
        thread::spawn(move || {
            let result = load_collisions(&path, limit)
                .with_context(|| format!("loading {}", path.display()));
            let message = match result {
                Ok(df) => LoadResult::Complete { limit, df },
                Err(e) => LoadResult::Error(format!("{e:#}")),
            };
            let _ = tx.send(message);
        });
    }

    /// Check for CSV loading results
    fn check_load_results(&mut self) {
        let rx = self.load_rx.take();
        if let Some(rx) = rx {
            let mut should_keep_receiver = true;

            while let Ok(result) = rx.try_recv() {
                match result {
                    LoadResult::Complete { limit, df } => {
                        info!(rows = df.height(), limit, "collision table ready");
                        self.loader.store(limit, df.clone());
                        self.control_panel
                            .set_status(&format!("Loaded {} collisions", df.height()));
                        self.install_frame(df);
                        self.is_loading = false;
                        self.control_panel.loading = false;
                        should_keep_receiver = false;
                    }
                    LoadResult::Error(message) => {
                        error!(%message, "collision CSV load failed");
                        self.control_panel
                            .set_status(&format!("Error: {message}"));
                        self.is_loading = false;
                        self.control_panel.loading = false;
                        should_keep_receiver = false;
                    }
                }
            }

            if should_keep_receiver {
                self.load_rx = Some(rx);
            }
        }
    }

    /// Adopt a freshly loaded table and force a view rebuild.
    fn install_frame(&mut self, df: DataFrame) {
        self.frame = Some(df);
        self.last_params = None;
        self.dashboard.clear();
    }

    /// Recompute the dashboard views when an input parameter changed.
    fn rebuild_views(&mut self) {
        let Some(df) = self.frame.clone() else {
            return;
        };
        let params = ViewParams::from_settings(&self.control_panel.settings);
        if self.last_params.as_ref() == Some(&params) {
            return;
        }

        match Self::compute_views(&df, &params) {
            Ok(data) => {
                self.dashboard.data = Some(data);
            }
            Err(e) => {
                error!(error = %e, "view recomputation failed");
                self.control_panel.set_status(&format!("Error: {e}"));
            }
        }
        self.last_params = Some(params);
    }

    /// One synchronous recomputation pass over the normalized table.
    fn compute_views(df: &DataFrame, params: &ViewParams) -> Result<DashboardData, ViewError> {
        let points = data::injury_point_set(df, params.injury_threshold)?;

        let windowed = data::filter_by_hour(df, params.hour)?;
        let window_rows = windowed.height();
        let minute_counts = data::minute_histogram(&windowed)?;

        let mut map_config = MapViewConfig::default();
        if let Some((lat, lon)) = data::map_midpoint(&windowed)? {
            map_config.center = (lat, lon);
        }
        // Hex cells are binned in (longitude, latitude) plot coordinates.
        let window_points: Vec<[f64; 2]> = data::coordinate_pairs(&windowed)?
            .iter()
            .map(|p| [p[1], p[0]])
            .collect();
        let hex_bins = bin_points(&window_points, map_config.hex_radius_deg());

        let streets: Vec<StreetRank> = data::top_streets(df, params.category, TOP_STREETS)?;

        let raw = params.show_raw.then(|| Self::raw_preview(df));

        Ok(DashboardData {
            injury_threshold: params.injury_threshold,
            points,
            hour: params.hour,
            window_rows,
            hex_bins,
            map_config,
            minute_counts,
            category: params.category,
            streets,
            raw,
        })
    }

    /// Stringify the first rows of the table for the raw-data grid.
    fn raw_preview(df: &DataFrame) -> RawPreview {
        let head = df.head(Some(RAW_PREVIEW_ROWS));
        let columns: Vec<String> = head
            .get_column_names()
            .iter()
            .map(|name| name.to_string())
            .collect();

        let mut rows = Vec::with_capacity(head.height());
        for i in 0..head.height() {
            let row: Vec<String> = head
                .get_columns()
                .iter()
                .map(|column| match column.as_materialized_series().get(i) {
                    Ok(value) => value.to_string().trim_matches('"').to_string(),
                    Err(_) => String::new(),
                })
                .collect();
            rows.push(row);
        }

        RawPreview {
            columns,
            rows,
            total_rows: df.height(),
        }
    }

    /// Handle CSV file selection
    fn handle_browse_csv(&mut self) {
        if self.is_loading {
            return;
        }

        if let Some(path) = rfd::FileDialog::new()
            .add_filter("CSV Files", &["csv"])
            .pick_file()
        {
            self.control_panel.settings.csv_path = path.clone();
            self.loader = CollisionLoader::new(path);
            self.frame = None;
            self.dashboard.clear();
            self.start_load();
        }
    }
}

impl eframe::App for CrashboardApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        // Check for background results
        self.check_load_results();

        // Request repaint while loading
        if self.is_loading {
            ctx.request_repaint();
        }

        // Left panel - Control Panel
        SidePanel::left("control_panel")
            .min_width(280.0)
            .max_width(340.0)
            .show(ctx, |ui| {
                egui::ScrollArea::vertical().show(ui, |ui| {
                    let action = self.control_panel.show(ui);

                    match action {
                        ControlPanelAction::BrowseCsv => self.handle_browse_csv(),
                        ControlPanelAction::ReloadCsv => self.start_load(),
                        ControlPanelAction::None => {}
                    }
                });
            });

        // Recompute views after the panel may have changed a parameter
        self.rebuild_views();

        // Central panel - Dashboard
        egui::CentralPanel::default().show(ctx, |ui| {
            self.dashboard.show(ui);
        });
    }

    fn save(&mut self, storage: &mut dyn eframe::Storage) {
        if let Ok(json) = serde_json::to_string(&self.control_panel.settings) {
            storage.set_string(SETTINGS_KEY, json);
        }
    }
}
