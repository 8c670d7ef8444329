// src/app.rs

use ratatui::widgets::ListState;
use scan_sentinel::core::models::{ScanConfiguration, ScanResult, ScanType, SessionHandle, Severity};
use scan_sentinel::core::orchestrator::{ScanEventKind, ScanEvents};
use scan_sentinel::core::progress::Stage;
use std::sync::Arc;

pub const SPINNER_CHARS: [char; 10] = ['⠋', '⠙', '⠹', '⠸', '⠼', '⠴', '⠦', '⠧', '⠇', '⠏'];

const DEPTH_STEP: u8 = 10;

pub enum ExportStatus {
    Idle,
    Success(String),
    Error(String),
}

pub enum AppState {
    Idle,
    Scanning,
    Finished,
    Failed(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ViewMode {
    List,
    Grid,
}

#[derive(Debug, Default)]
pub struct ScanSummary {
    pub critical: usize,
    pub high: usize,
    pub medium: usize,
    pub low: usize,
}

pub struct App {
    pub should_quit: bool,
    pub show_disclaimer: bool,
    pub state: AppState,
    pub input: String,
    pub input_error: Option<String>,
    pub scan_type: ScanType,
    pub depth: u8,
    pub source_name: &'static str,
    pub handle: Option<SessionHandle>,
    pub events: Option<ScanEvents>,
    pub progress: u8,
    pub result: Option<Arc<ScanResult>>,
    pub summary: ScanSummary,
    pub view_mode: ViewMode,
    pub vulnerability_list_state: ListState,
    pub spinner_frame: usize,
    pub export_status: ExportStatus,
}

impl App {
    pub fn new(source_name: &'static str) -> Self {
        Self {
            should_quit: false,
            show_disclaimer: true,
            state: AppState::Idle,
            input: String::new(),
            input_error: None,
            scan_type: ScanType::default(),
            depth: ScanConfiguration::DEFAULT_DEPTH,
            source_name,
            handle: None,
            events: None,
            progress: 0,
            result: None,
            summary: ScanSummary::default(),
            view_mode: ViewMode::List,
            vulnerability_list_state: ListState::default(),
            spinner_frame: 0,
            export_status: ExportStatus::Idle,
        }
    }

    /// Builds the scan request from the comma-separated input.
    pub fn configuration(&self) -> ScanConfiguration {
        let targets = self.input.split(',').map(str::trim).filter(|t| !t.is_empty());
        ScanConfiguration::new(targets)
            .with_scan_type(self.scan_type)
            .with_depth(self.depth)
    }

    pub fn stage(&self) -> Stage {
        Stage::for_progress(self.progress)
    }

    pub fn cycle_scan_type(&mut self) {
        self.scan_type = self.scan_type.next();
    }

    /// Depth only matters for custom scans.
    pub fn increase_depth(&mut self) {
        if self.scan_type == ScanType::Custom {
            self.depth = self.depth.saturating_add(DEPTH_STEP).min(ScanConfiguration::MAX_DEPTH);
        }
    }

    pub fn decrease_depth(&mut self) {
        if self.scan_type == ScanType::Custom {
            self.depth = self.depth.saturating_sub(DEPTH_STEP).max(ScanConfiguration::MIN_DEPTH);
        }
    }

    pub fn begin_scan(&mut self, handle: SessionHandle, events: ScanEvents) {
        self.state = AppState::Scanning;
        self.handle = Some(handle);
        self.events = Some(events);
        self.progress = 0;
        self.result = None;
        self.input_error = None;
        self.export_status = ExportStatus::Idle;
    }

    /// Pulls every pending event of the current scan without blocking.
    pub fn drain_events(&mut self) {
        while let Some(kind) = self.events.as_mut().and_then(ScanEvents::try_next) {
            self.apply_event(kind);
        }
    }

    pub fn apply_event(&mut self, kind: ScanEventKind) {
        match kind {
            ScanEventKind::Progress { progress, .. } => self.progress = progress,
            ScanEventKind::Completed(result) => {
                self.progress = 100;
                self.state = AppState::Finished;
                self.result = Some(result);
                self.events = None;
                self.update_summary();
            }
            ScanEventKind::Failed(e) => {
                self.state = AppState::Failed(e.to_string());
                self.events = None;
            }
            ScanEventKind::Cancelled => {
                self.state = AppState::Idle;
                self.progress = 0;
                self.events = None;
                self.handle = None;
            }
        }
    }

    pub fn update_summary(&mut self) {
        let mut summary = ScanSummary::default();
        if let Some(result) = &self.result {
            for vulnerability in &result.vulnerabilities {
                match vulnerability.severity {
                    Severity::Critical => summary.critical += 1,
                    Severity::High => summary.high += 1,
                    Severity::Medium => summary.medium += 1,
                    Severity::Low => summary.low += 1,
                }
            }
            let selected = (!result.vulnerabilities.is_empty()).then_some(0);
            self.vulnerability_list_state.select(selected);
        }
        self.summary = summary;
    }

    fn vulnerability_count(&self) -> usize {
        self.result.as_ref().map_or(0, |r| r.vulnerabilities.len())
    }

    pub fn select_previous(&mut self) {
        if self.vulnerability_count() == 0 {
            return;
        }
        let current = self.vulnerability_list_state.selected().unwrap_or(0);
        self.vulnerability_list_state.select(Some(current.saturating_sub(1)));
    }

    pub fn select_next(&mut self) {
        let count = self.vulnerability_count();
        if count == 0 {
            return;
        }
        let next = self.vulnerability_list_state.selected().map_or(0, |i| (i + 1).min(count - 1));
        self.vulnerability_list_state.select(Some(next));
    }

    pub fn toggle_view(&mut self) {
        self.view_mode = match self.view_mode {
            ViewMode::List => ViewMode::Grid,
            ViewMode::Grid => ViewMode::List,
        };
    }

    pub fn on_tick(&mut self) {
        if matches!(self.state, AppState::Scanning) {
            self.spinner_frame = (self.spinner_frame + 1) % SPINNER_CHARS.len();
        }
    }

    pub fn quit(&mut self) {
        self.should_quit = true;
    }

    /// Back to an empty form; the scan type and depth are kept.
    pub fn reset(&mut self) {
        self.state = AppState::Idle;
        self.input = String::new();
        self.input_error = None;
        self.handle = None;
        self.events = None;
        self.progress = 0;
        self.result = None;
        self.summary = ScanSummary::default();
        self.vulnerability_list_state = ListState::default();
        self.export_status = ExportStatus::Idle;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use scan_sentinel::core::aggregator::aggregate;
    use scan_sentinel::core::knowledge_base::builtin_catalog;
    use scan_sentinel::core::models::{AttackCategory, ScanSession};

    fn finished_result() -> Arc<ScanResult> {
        let session = ScanSession::running(1, Arc::new(ScanConfiguration::new(["https://example.com/form"])));
        Arc::new(aggregate(&session, AttackCategory::Xss, builtin_catalog()))
    }

    #[test]
    fn input_is_split_on_commas() {
        let mut app = App::new("simulated");
        app.input = " example.com, ,https://api.example.com ".to_string();
        assert_eq!(
            app.configuration().targets,
            vec!["example.com".to_string(), "https://api.example.com".to_string()]
        );
    }

    #[test]
    fn depth_only_moves_for_custom_scans() {
        let mut app = App::new("simulated");
        app.increase_depth();
        assert_eq!(app.depth, ScanConfiguration::DEFAULT_DEPTH);

        app.scan_type = ScanType::Custom;
        for _ in 0..20 {
            app.increase_depth();
        }
        assert_eq!(app.depth, ScanConfiguration::MAX_DEPTH);
        for _ in 0..20 {
            app.decrease_depth();
        }
        assert_eq!(app.depth, ScanConfiguration::MIN_DEPTH);
    }

    #[test]
    fn completion_fills_summary_and_selection() {
        let mut app = App::new("simulated");
        app.apply_event(ScanEventKind::Progress { progress: 40, stage: Stage::PortScanning });
        assert_eq!(app.stage(), Stage::PortScanning);

        app.apply_event(ScanEventKind::Completed(finished_result()));
        assert!(matches!(app.state, AppState::Finished));
        assert_eq!(app.progress, 100);
        assert_eq!(app.summary.high, 1);
        assert_eq!(app.summary.medium, 1);
        assert_eq!(app.summary.low, 1);
        assert_eq!(app.vulnerability_list_state.selected(), Some(0));

        app.select_next();
        app.select_next();
        app.select_next();
        assert_eq!(app.vulnerability_list_state.selected(), Some(2));
        app.select_previous();
        assert_eq!(app.vulnerability_list_state.selected(), Some(1));
    }

    #[test]
    fn cancellation_returns_to_the_form() {
        let mut app = App::new("simulated");
        app.state = AppState::Scanning;
        app.progress = 30;
        app.apply_event(ScanEventKind::Cancelled);
        assert!(matches!(app.state, AppState::Idle));
        assert_eq!(app.progress, 0);
    }
}
