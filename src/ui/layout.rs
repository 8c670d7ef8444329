// src/ui/layout.rs

use ratatui::layout::{Constraint, Direction, Layout, Rect};

/// Screen regions, computed once per frame.
pub struct AppLayout {
    pub input: Rect,
    pub progress: Rect,
    pub report: Rect,
    pub summary: Rect,
    pub footer: Rect,
}

/// Input on top, then the progress strip, then report and summary side by side,
/// with a one-line footer at the bottom.
pub fn create_layout(frame_size: Rect) -> AppLayout {
    let main_chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3),
            Constraint::Length(5),
            Constraint::Min(0),
            Constraint::Length(1),
        ])
        .split(frame_size);

    let content_chunks = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(70), Constraint::Percentage(30)])
        .split(main_chunks[2]);

    AppLayout {
        input: main_chunks[0],
        progress: main_chunks[1],
        report: content_chunks[0],
        summary: content_chunks[1],
        footer: main_chunks[3],
    }
}
