// src/ui/widgets/summary.rs

use super::severity_color;
use crate::app::{App, AppState};
use ratatui::{
    prelude::*,
    text::Line,
    widgets::{Block, Borders, Gauge, Paragraph, Wrap},
};
use scan_sentinel::core::models::{AlertLevel, Severity};

/// Renders the summary panel: threat level, alerts, counts per severity and scan details.
///
/// Content is only drawn once a scan has finished.
pub fn render_summary(frame: &mut Frame, app: &App, area: Rect) {
    let summary_container = Block::default().borders(Borders::ALL).title("Summary");
    frame.render_widget(summary_container, area);

    let summary_chunks = Layout::default()
        .direction(Direction::Vertical)
        .margin(1)
        .constraints([
            Constraint::Length(2), // Threat level
            Constraint::Length(1), // Gauge
            Constraint::Length(1), // Spacer
            Constraint::Length(3), // Alerts
            Constraint::Length(1), // Spacer
            Constraint::Length(5), // Counts
            Constraint::Length(1), // Spacer
            Constraint::Min(0),    // Scan details
        ])
        .split(area);

    let Some(result) = app.result.as_ref().filter(|_| matches!(app.state, AppState::Finished)) else {
        return;
    };

    // --- Threat Level ---
    let level_style = match result.threat_level {
        76..=100 => Style::default().fg(Color::Red),
        41..=75 => Style::default().fg(Color::Yellow),
        _ => Style::default().fg(Color::Green),
    };
    let level_text = Text::from(vec![
        Line::from("Threat Level".bold()),
        Line::from(format!("{}/100", result.threat_level)).style(level_style),
    ]);
    frame.render_widget(Paragraph::new(level_text).alignment(Alignment::Center), summary_chunks[0]);

    let gauge = Gauge::default()
        .percent(u16::from(result.threat_level.min(100)))
        .label("")
        .gauge_style(level_style);
    frame.render_widget(gauge, summary_chunks[1]);

    // --- Alerts ---
    let alert_lines: Vec<Line> = result
        .alerts
        .iter()
        .map(|alert| {
            let (icon, color) = match alert.level {
                AlertLevel::Critical => ("✗", Color::Red),
                AlertLevel::Warning => ("!", Color::Yellow),
                AlertLevel::Info => ("✓", Color::Green),
            };
            Line::from(vec![
                Span::styled(format!("{} ", icon), Style::default().fg(color)),
                Span::raw(alert.message.as_str()),
            ])
        })
        .collect();
    frame.render_widget(
        Paragraph::new(alert_lines)
            .wrap(Wrap { trim: true })
            .block(Block::default().title("ALERTS".bold())),
        summary_chunks[3],
    );

    // --- Counts ---
    let counts = [
        (Severity::Critical, app.summary.critical),
        (Severity::High, app.summary.high),
        (Severity::Medium, app.summary.medium),
        (Severity::Low, app.summary.low),
    ];
    let count_lines: Vec<Line> = counts
        .into_iter()
        .map(|(severity, count)| {
            Line::from(vec![
                Span::raw(format!("{}: ", severity)),
                Span::styled(count.to_string(), Style::default().fg(severity_color(severity))),
            ])
        })
        .collect();
    frame.render_widget(
        Paragraph::new(count_lines).block(Block::default().title("VULNERABILITIES".bold())),
        summary_chunks[5],
    );

    // --- Scan Details ---
    let details = vec![
        Line::from(format!("Scan #{}", result.session.generation)),
        Line::from(format!("Type: {}", result.scan_type)),
        Line::from(format!("Source: {}", app.source_name)),
        Line::from(format!("Targets: {}", result.targets.join(", "))),
        Line::from(format!("Completed: {}", result.completed_at.format("%Y-%m-%d %H:%M:%S UTC"))),
    ];
    frame.render_widget(
        Paragraph::new(details)
            .wrap(Wrap { trim: true })
            .block(Block::default().title("SCAN".bold())),
        summary_chunks[7],
    );
}
