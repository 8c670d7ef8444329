// src/ui/widgets/footer.rs

use crate::app::{App, AppState, ExportStatus};
use ratatui::{
    prelude::*,
    style::{Color, Style, Stylize},
    text::{Line, Span},
    widgets::Paragraph,
};

fn key(label: &str) -> Span<'_> {
    Span::styled(label, Style::new().bold().fg(Color::Yellow))
}

/// Renders the footer widget, which displays available actions.
pub fn render_footer(frame: &mut Frame, app: &App, area: Rect) {
    let spans = match &app.state {
        AppState::Idle => Line::from(vec![
            key("Enter"),
            Span::raw(" scan, "),
            key("Tab"),
            Span::raw(" scan type, "),
            key("↑ ↓"),
            Span::raw(" depth (custom), "),
            key("Esc"),
            Span::raw(" quit"),
        ]),
        AppState::Scanning => Line::from(vec![
            Span::raw("Scanning... "),
            key("[C]"),
            Span::raw("ancel, "),
            key("[Q]"),
            Span::raw("uit"),
        ]),
        AppState::Finished => {
            let mut spans = vec![
                key("[N]"),
                Span::raw("ew Scan, "),
                key("[E]"),
                Span::raw("xport, "),
                key("[V]"),
                Span::raw("iew, "),
                key("[Q]"),
                Span::raw("uit"),
            ];
            match &app.export_status {
                ExportStatus::Idle => {}
                ExportStatus::Success(path) => spans.push(Span::styled(format!("  Saved to {}", path), Style::new().fg(Color::Green))),
                ExportStatus::Error(e) => spans.push(Span::styled(format!("  Export failed: {}", e), Style::new().fg(Color::Red))),
            }
            Line::from(spans)
        }
        AppState::Failed(_) => Line::from(vec![key("[N]"), Span::raw("ew Scan, "), key("[Q]"), Span::raw("uit")]),
    };

    let footer = Paragraph::new(spans).alignment(Alignment::Center);
    frame.render_widget(footer, area);
}
