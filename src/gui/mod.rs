//! GUI module - User interface components

mod app;
mod control_panel;
mod dashboard;

pub use app::CrashboardApp;
pub use control_panel::{ControlPanel, ControlPanelAction, UserSettings};
pub use dashboard::{Dashboard, DashboardData, RawPreview};
