// src/ui/widgets/mod.rs

use ratatui::style::Color;
use scan_sentinel::core::models::Severity;

pub mod analysis_view;
pub mod disclaimer_popup;
pub mod footer;
pub mod input;
pub mod progress;
pub mod summary;

pub fn severity_color(severity: Severity) -> Color {
    match severity {
        Severity::Critical => Color::Red,
        Severity::High => Color::LightRed,
        Severity::Medium => Color::Yellow,
        Severity::Low => Color::Cyan,
    }
}
