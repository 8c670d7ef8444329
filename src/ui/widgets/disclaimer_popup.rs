// src/ui/widgets/disclaimer_popup.rs

use ratatui::{
    prelude::*,
    text::Line,
    widgets::{Block, Borders, Clear, Paragraph, Wrap},
};

/// Renders the authorization notice shown before the first scan.
pub fn render_disclaimer_popup(frame: &mut Frame, area: Rect) {
    let disclaimer_text = Text::from(vec![
        Line::from("AUTHORIZED USE ONLY".bold().yellow()),
        Line::from(""),
        Line::from("Scan Sentinel predicts the attack patterns a web target is most exposed to and lists the vulnerabilities behind that prediction."),
        Line::from(""),
        Line::from("Only scan systems you own or have explicit, written permission to test. Unauthorized scanning may be a criminal offense."),
        Line::from(""),
        Line::from("Predictions are heuristic unless a scanning backend is configured, and are no substitute for a professional assessment."),
        Line::from(""),
        Line::from("Press ".bold() + "Enter".bold().yellow() + " to acknowledge and continue".bold()),
    ]);

    let block = Block::default()
        .title("Disclaimer")
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Red));

    let popup_area = centered_rect(70, 60, area);

    let popup = Paragraph::new(disclaimer_text)
        .block(block)
        .wrap(Wrap { trim: true })
        .alignment(Alignment::Center);

    // Clear first so the UI underneath does not bleed through.
    frame.render_widget(Clear, popup_area);
    frame.render_widget(popup, popup_area);
}

/// A rectangle of the given percentages, centered in `r`.
fn centered_rect(percent_x: u16, percent_y: u16, r: Rect) -> Rect {
    let popup_layout = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Percentage((100 - percent_y) / 2),
            Constraint::Percentage(percent_y),
            Constraint::Percentage((100 - percent_y) / 2),
        ])
        .split(r);

    Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage((100 - percent_x) / 2),
            Constraint::Percentage(percent_x),
            Constraint::Percentage((100 - percent_x) / 2),
        ])
        .split(popup_layout[1])[1]
}
