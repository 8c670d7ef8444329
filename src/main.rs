// src/main.rs

use color_eyre::Result;
use crossterm::{
    ExecutableCommand,
    event::{self, DisableMouseCapture, EnableMouseCapture, Event, KeyCode, KeyEventKind},
    terminal::{EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode},
};
use ratatui::prelude::*;
use scan_sentinel::config::Settings;
use scan_sentinel::core::orchestrator::ScanOrchestrator;
use scan_sentinel::core::progress::source_from_settings;
use scan_sentinel::core::report;
use scan_sentinel::logging;
use std::io::stdout;
use std::path::Path;
use std::time::Duration;
use tracing::{error, info, warn};

mod app;
mod ui;

use app::{App, AppState, ExportStatus};

#[tokio::main]
async fn main() -> Result<()> {
    color_eyre::install()?;
    let log_path = logging::initialize_logging()?;

    let settings = Settings::load(None)?;
    let source = source_from_settings(&settings)?;
    let orchestrator = ScanOrchestrator::new(source);
    let export_dir = settings
        .export_dir
        .clone()
        .unwrap_or_else(|| logging::get_data_dir().join("reports"));
    info!(
        log = %log_path.display(),
        source = orchestrator.source_name(),
        export_dir = %export_dir.display(),
        "Starting up."
    );

    // --- Setup ---
    stdout().execute(EnterAlternateScreen)?;
    stdout().execute(EnableMouseCapture)?;
    enable_raw_mode()?;
    let mut terminal = Terminal::new(CrosstermBackend::new(stdout()))?;
    terminal.clear()?;

    let mut app = App::new(orchestrator.source_name());
    let outcome = run(&mut terminal, &mut app, &orchestrator, &export_dir);

    // --- Restore Terminal ---
    stdout().execute(LeaveAlternateScreen)?;
    stdout().execute(DisableMouseCapture)?;
    disable_raw_mode()?;
    outcome
}

fn run<B: Backend>(
    terminal: &mut Terminal<B>,
    app: &mut App,
    orchestrator: &ScanOrchestrator,
    export_dir: &Path,
) -> Result<()> {
    while !app.should_quit {
        terminal.draw(|frame| ui::render(app, frame))?;

        if event::poll(Duration::from_millis(100))? {
            handle_events(app, orchestrator, export_dir)?;
        }

        app.drain_events();
        app.on_tick();
    }
    Ok(())
}

fn handle_events(app: &mut App, orchestrator: &ScanOrchestrator, export_dir: &Path) -> Result<()> {
    if let Event::Key(key) = event::read()? {
        if key.kind != KeyEventKind::Press {
            return Ok(());
        }
        if app.show_disclaimer {
            match key.code {
                KeyCode::Enter => app.show_disclaimer = false,
                KeyCode::Esc | KeyCode::Char('q') => app.quit(),
                _ => {}
            }
            return Ok(());
        }
        match app.state {
            AppState::Idle => handle_idle_input(app, key.code, orchestrator),
            AppState::Scanning => handle_scanning_input(app, key.code, orchestrator),
            AppState::Finished => handle_finished_input(app, key.code, export_dir),
            AppState::Failed(_) => match key.code {
                KeyCode::Char('n') => app.reset(),
                KeyCode::Char('q') | KeyCode::Esc => app.quit(),
                _ => {}
            },
        }
    }
    Ok(())
}

/// Editing the target list. Letters go to the input, so quitting is on Esc.
fn handle_idle_input(app: &mut App, key_code: KeyCode, orchestrator: &ScanOrchestrator) {
    match key_code {
        KeyCode::Esc => app.quit(),
        KeyCode::Char(c) => {
            app.input.push(c);
            app.input_error = None;
        }
        KeyCode::Backspace => {
            app.input.pop();
        }
        KeyCode::Tab => app.cycle_scan_type(),
        KeyCode::Up => app.increase_depth(),
        KeyCode::Down => app.decrease_depth(),
        KeyCode::Enter => match orchestrator.start(app.configuration()) {
            Ok((handle, events)) => app.begin_scan(handle, events),
            Err(e) => {
                warn!(error = %e, "Scan not started.");
                app.input_error = Some(e.to_string());
            }
        },
        _ => {}
    }
}

fn handle_scanning_input(app: &mut App, key_code: KeyCode, orchestrator: &ScanOrchestrator) {
    match key_code {
        KeyCode::Char('c') | KeyCode::Esc => {
            if let Some(handle) = app.handle {
                if let Err(e) = orchestrator.cancel(handle) {
                    // The scan finished between the key press and the cancel.
                    warn!(error = %e, "Cancel ignored.");
                }
            }
        }
        KeyCode::Char('q') => app.quit(),
        _ => {}
    }
}

fn handle_finished_input(app: &mut App, key_code: KeyCode, export_dir: &Path) {
    match key_code {
        KeyCode::Char('q') => app.quit(),
        KeyCode::Char('n') => app.reset(),
        KeyCode::Char('e') => export(app, export_dir),
        KeyCode::Char('v') => app.toggle_view(),
        KeyCode::Up => app.select_previous(),
        KeyCode::Down => app.select_next(),
        _ => {}
    }
}

fn export(app: &mut App, export_dir: &Path) {
    let Some(result) = &app.result else {
        return;
    };
    app.export_status = match report::export_json(result, export_dir) {
        Ok(path) => ExportStatus::Success(path.display().to_string()),
        Err(e) => {
            error!(error = %e, "Export failed.");
            ExportStatus::Error(e.to_string())
        }
    };
}
