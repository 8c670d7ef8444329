// src/ui/widgets/analysis_view.rs

use super::severity_color;
use crate::app::{App, AppState, SPINNER_CHARS, ViewMode};
use ratatui::{
    prelude::*,
    text::Line,
    widgets::{Block, Borders, Cell, List, ListItem, Paragraph, Row, Table, TableState, Wrap},
};
use scan_sentinel::core::models::{ScanResult, Vulnerability};

pub fn render_analysis_view(frame: &mut Frame, app: &mut App, area: Rect) {
    let mode = match app.view_mode {
        ViewMode::List => "list",
        ViewMode::Grid => "grid",
    };
    let main_block = Block::default()
        .borders(Borders::ALL)
        .title(format!("Analysis Report ({} view, navigate with ↑ ↓)", mode));

    let Some(result) = app.result.clone().filter(|_| matches!(app.state, AppState::Finished)) else {
        let content = match &app.state {
            AppState::Scanning => Paragraph::new(Line::from(vec![
                Span::styled(format!("{} ", SPINNER_CHARS[app.spinner_frame]), Style::default().fg(Color::Cyan)),
                Span::raw("Scanning... Please wait."),
            ])),
            AppState::Failed(error) => Paragraph::new(vec![
                Line::from("SCAN FAILED".red().bold()),
                Line::from(""),
                Line::from(error.as_str()),
            ])
            .wrap(Wrap { trim: true }),
            _ => Paragraph::new("Scan results will appear here..."),
        };
        frame.render_widget(content.alignment(Alignment::Center).block(main_block), area);
        return;
    };

    let inner_area = main_block.inner(area);
    frame.render_widget(main_block, area);

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(5),
            Constraint::Length(6),
            Constraint::Min(3),
            Constraint::Length(6),
        ])
        .split(inner_area);

    render_category(frame, &result, chunks[0]);
    render_remediation(frame, &result, chunks[1]);
    match app.view_mode {
        ViewMode::List => render_list(frame, app, &result, chunks[2]),
        ViewMode::Grid => render_grid(frame, app, &result, chunks[2]),
    }

    let detail_block = Block::default().borders(Borders::TOP).title("Details");
    let selected = app
        .vulnerability_list_state
        .selected()
        .and_then(|i| result.vulnerabilities.get(i));
    match selected {
        Some(vulnerability) => render_details(frame, vulnerability, detail_block, chunks[3]),
        None => {
            let p = Paragraph::new("No vulnerabilities to show.")
                .alignment(Alignment::Center)
                .block(detail_block);
            frame.render_widget(p, chunks[3]);
        }
    }
}

fn render_category(frame: &mut Frame, result: &ScanResult, area: Rect) {
    let color = severity_color(result.severity);
    let text = vec![
        Line::from(Span::styled(result.title, Style::default().fg(color).bold())),
        Line::from(vec![
            Span::raw("Severity: "),
            Span::styled(result.severity.to_string().to_uppercase(), Style::default().fg(color)),
        ]),
        Line::from(result.description),
    ];
    frame.render_widget(Paragraph::new(text).wrap(Wrap { trim: true }), area);
}

fn render_remediation(frame: &mut Frame, result: &ScanResult, area: Rect) {
    let mut lines = vec![Line::from("HOW TO FIX:".yellow().bold())];
    lines.extend(
        result
            .remediation
            .iter()
            .map(|step| Line::from(format!("• {}", step))),
    );
    frame.render_widget(Paragraph::new(lines).wrap(Wrap { trim: true }), area);
}

fn render_list(frame: &mut Frame, app: &mut App, result: &ScanResult, area: Rect) {
    let items: Vec<ListItem> = result
        .vulnerabilities
        .iter()
        .map(|v| {
            ListItem::new(Line::from(vec![
                Span::styled(
                    format!("[{}] ", v.severity.to_string().to_uppercase()),
                    Style::default().fg(severity_color(v.severity)),
                ),
                Span::raw(v.name.as_str()),
                Span::styled(format!("  {}", v.affected_endpoint), Style::default().fg(Color::DarkGray)),
            ]))
        })
        .collect();

    let list = List::new(items)
        .block(Block::default().borders(Borders::TOP).title("Vulnerabilities"))
        .highlight_style(Style::new().bg(Color::DarkGray).add_modifier(Modifier::BOLD));
    frame.render_stateful_widget(list, area, &mut app.vulnerability_list_state);
}

fn render_grid(frame: &mut Frame, app: &App, result: &ScanResult, area: Rect) {
    let header = Row::new(["ID", "Name", "Severity", "Endpoint", "CVE", "Fix"])
        .style(Style::default().fg(Color::Yellow).bold());
    let rows: Vec<Row> = result
        .vulnerabilities
        .iter()
        .map(|v| {
            Row::new(vec![
                Cell::from(v.id.as_str()),
                Cell::from(v.name.as_str()),
                Cell::from(v.severity.to_string()).style(Style::default().fg(severity_color(v.severity))),
                Cell::from(v.affected_endpoint.as_str()),
                Cell::from(v.cve.as_deref().unwrap_or("-")),
                Cell::from(if v.fix_available { "yes" } else { "no" }),
            ])
        })
        .collect();
    let widths = [
        Constraint::Length(10),
        Constraint::Percentage(35),
        Constraint::Length(9),
        Constraint::Percentage(25),
        Constraint::Length(14),
        Constraint::Length(4),
    ];

    let table = Table::new(rows, widths)
        .header(header)
        .block(Block::default().borders(Borders::TOP).title("Vulnerabilities"))
        .row_highlight_style(Style::new().bg(Color::DarkGray).add_modifier(Modifier::BOLD));
    let mut state = TableState::default().with_selected(app.vulnerability_list_state.selected());
    frame.render_stateful_widget(table, area, &mut state);
}

fn render_details(frame: &mut Frame, vulnerability: &Vulnerability, block: Block, area: Rect) {
    let fix = if vulnerability.fix_available {
        "Fix available".green()
    } else {
        "No fix available".red()
    };
    let text = vec![
        Line::from(vulnerability.description.as_str()),
        Line::from(vec![Span::raw("Endpoint: "), Span::raw(vulnerability.affected_endpoint.as_str()).cyan()]),
        Line::from(vec![
            Span::raw("CVE: "),
            Span::raw(vulnerability.cve.as_deref().unwrap_or("n/a")),
            Span::raw("  "),
            fix,
        ]),
    ];
    let p = Paragraph::new(text).wrap(Wrap { trim: true }).block(block);
    frame.render_widget(p, area);
}
