// src/ui/widgets/input.rs

use crate::app::{App, AppState};
use ratatui::{
    prelude::*,
    widgets::{Block, Borders, Paragraph},
};
use scan_sentinel::core::models::ScanType;

/// Renders the target input box, with the scan settings in its title.
pub fn render_input(frame: &mut Frame, app: &App, area: Rect) {
    let depth = if app.scan_type == ScanType::Custom {
        format!(" | Depth: {}", app.depth)
    } else {
        String::new()
    };
    let title = format!("Targets (comma-separated) | Scan: {}{}", app.scan_type, depth);

    let mut input_block = Block::default().borders(Borders::ALL).title(title);
    if let Some(error) = &app.input_error {
        input_block = input_block
            .border_style(Style::default().fg(Color::Red))
            .title_bottom(Line::from(error.as_str()).red());
    }

    let input_paragraph = Paragraph::new(app.input.as_str())
        .block(input_block)
        .style(Style::default().fg(Color::Yellow));
    frame.render_widget(input_paragraph, area);

    // The cursor is only shown while editing.
    if matches!(app.state, AppState::Idle) && !app.show_disclaimer {
        frame.set_cursor_position((area.x + app.input.chars().count() as u16 + 1, area.y + 1));
    }
}
