// src/ui/widgets/progress.rs

use crate::app::{App, AppState, SPINNER_CHARS};
use ratatui::{
    prelude::*,
    widgets::{Block, Borders, Gauge, Paragraph},
};
use scan_sentinel::core::progress::Stage;
use strum::IntoEnumIterator;

/// Renders the progress gauge and the four stage chips below it.
pub fn render_progress(frame: &mut Frame, app: &App, area: Rect) {
    let block = Block::default().borders(Borders::ALL).title("Scan Progress");
    let inner_area = block.inner(area);
    frame.render_widget(block, area);

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Length(1), Constraint::Length(1), Constraint::Length(1)])
        .split(inner_area);

    let stage = app.stage();
    let gauge_color = match app.state {
        AppState::Failed(_) => Color::Red,
        AppState::Finished => Color::Green,
        _ => Color::Cyan,
    };
    let gauge = Gauge::default()
        .percent(u16::from(app.progress))
        .label(format!("{}% | {}", app.progress, stage))
        .gauge_style(Style::default().fg(gauge_color));
    frame.render_widget(gauge, chunks[0]);

    let chips: Vec<Span> = Stage::iter()
        .flat_map(|s| {
            let style = if s.is_reached(app.progress) {
                Style::default().fg(Color::Black).bg(Color::Cyan).bold()
            } else {
                Style::default().fg(Color::DarkGray)
            };
            [Span::styled(format!(" {} ", s), style), Span::raw("  ")]
        })
        .collect();
    frame.render_widget(Paragraph::new(Line::from(chips)).alignment(Alignment::Center), chunks[1]);

    let detail = match &app.state {
        AppState::Scanning => Line::from(vec![
            Span::styled(format!("{} ", SPINNER_CHARS[app.spinner_frame]), Style::default().fg(Color::Cyan)),
            Span::raw(stage.detail()),
        ]),
        AppState::Finished => Line::from("Scan complete.".green()),
        AppState::Failed(_) => Line::from("Scan failed.".red()),
        AppState::Idle => Line::from("Waiting for targets...".dark_gray()),
    };
    frame.render_widget(Paragraph::new(detail).alignment(Alignment::Center), chunks[2]);
}
