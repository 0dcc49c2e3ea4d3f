//! Crashboard - Motor Vehicle Collision CSV Analysis & Interactive Map Dashboard
//!
//! Loads a bounded slice of a collision export, normalizes it, and renders
//! maps, charts, and tables that recompute as the filters change.

mod charts;
mod data;
mod gui;

use eframe::egui;
use gui::CrashboardApp;
use tracing_subscriber::{fmt, EnvFilter};

fn main() -> eframe::Result<()> {
    // init logging
    let env = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    fmt::Subscriber::builder().with_env_filter(env).init();
    tracing::info!("startup");

    // Configure native options
    let options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_inner_size([1400.0, 900.0])
            .with_min_inner_size([1100.0, 700.0])
            .with_title("Crashboard"),
        ..Default::default()
    };

    // Run the application
    eframe::run_native(
        "Crashboard",
        options,
        Box::new(|cc| Ok(Box::new(CrashboardApp::new(cc)))),
    )
}
