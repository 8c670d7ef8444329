// src/core/progress.rs

use crate::config::{ProgressMode, Settings};
use crate::core::backend::{BackendClient, BackendFindings};
use crate::core::error::ScanError;
use crate::core::models::ScanConfiguration;
use async_trait::async_trait;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::sync::Arc;
use std::time::Duration;
use strum::{Display, EnumIter};
use tokio::time::MissedTickBehavior;
use tracing::{debug, info};

// --- Stages ---

/// Display stages, one per quarter of the progress bar.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, EnumIter)]
pub enum Stage {
    #[strum(to_string = "Initializing")]
    Initializing,
    #[strum(to_string = "Port Scanning")]
    PortScanning,
    #[strum(to_string = "Vulnerability Detection")]
    VulnerabilityDetection,
    #[strum(to_string = "Reporting")]
    Reporting,
}

impl Stage {
    /// Pure mapping from progress to stage: 0-24, 25-49, 50-74, 75-100.
    pub fn for_progress(progress: u8) -> Self {
        match progress {
            0..=24 => Stage::Initializing,
            25..=49 => Stage::PortScanning,
            50..=74 => Stage::VulnerabilityDetection,
            _ => Stage::Reporting,
        }
    }

    pub fn index(self) -> u8 {
        self as u8
    }

    pub fn detail(self) -> &'static str {
        match self {
            Stage::Initializing => "Setting up scan environment...",
            Stage::PortScanning => "Detecting open ports and services...",
            Stage::VulnerabilityDetection => "Analyzing vulnerabilities...",
            Stage::Reporting => "Generating report...",
        }
    }

    /// Whether the stage chip should light up; each lights 10 points before its quarter ends.
    pub fn is_reached(self, progress: u8) -> bool {
        u16::from(progress) + 10 >= (u16::from(self.index()) + 1) * 25
    }
}

// --- Sources ---

/// Handed to a progress source to publish intermediate progress values.
#[derive(Clone)]
pub struct ProgressTicker {
    report: Arc<dyn Fn(u8) + Send + Sync>,
}

impl ProgressTicker {
    pub fn new<F>(report: F) -> Self
    where
        F: Fn(u8) + Send + Sync + 'static,
    {
        Self { report: Arc::new(report) }
    }

    pub fn report(&self, progress: u8) {
        (self.report)(progress);
    }
}

/// Drives a scan from start to completion.
///
/// Returning marks 100%: `Ok(None)` completes without findings (heuristic
/// classification), `Ok(Some(_))` hands backend findings to the classifier and
/// `Err(_)` fails the session.
#[async_trait]
pub trait ProgressSource: Send + Sync {
    fn name(&self) -> &'static str;

    async fn run(
        &self,
        config: Arc<ScanConfiguration>,
        ticker: ProgressTicker,
    ) -> Result<Option<BackendFindings>, ScanError>;
}

/// Local progress on a fixed cadence, advancing by a random 1..=max_increment per tick.
#[derive(Debug, Clone)]
pub struct SimulatedProgress {
    interval: Duration,
    max_increment: u8,
    seed: Option<u64>,
}

impl SimulatedProgress {
    pub fn new(interval: Duration, max_increment: u8) -> Self {
        Self {
            interval,
            max_increment: max_increment.max(1),
            seed: None,
        }
    }

    /// Makes the increment sequence reproducible.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }
}

impl Default for SimulatedProgress {
    fn default() -> Self {
        Self::new(Duration::from_millis(800), 10)
    }
}

#[async_trait]
impl ProgressSource for SimulatedProgress {
    fn name(&self) -> &'static str {
        "simulated"
    }

    async fn run(
        &self,
        config: Arc<ScanConfiguration>,
        ticker: ProgressTicker,
    ) -> Result<Option<BackendFindings>, ScanError> {
        info!(targets = config.targets.len(), interval_ms = self.interval.as_millis() as u64, "Starting simulated scan.");
        let mut rng = match self.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };

        let mut interval = tokio::time::interval(self.interval);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
        // The first tick fires immediately.
        interval.tick().await;

        let mut progress: u8 = 0;
        loop {
            interval.tick().await;
            let increment = rng.gen_range(1..=self.max_increment);
            progress = progress.saturating_add(increment).min(100);
            if progress >= 100 {
                debug!("Simulated scan reached 100%.");
                return Ok(None);
            }
            ticker.report(progress);
        }
    }
}

/// Progress from a remote scan: one request, whose response counts as 100%.
#[derive(Debug, Clone)]
pub struct BackendProgress {
    client: BackendClient,
}

impl BackendProgress {
    pub fn new(client: BackendClient) -> Self {
        Self { client }
    }
}

#[async_trait]
impl ProgressSource for BackendProgress {
    fn name(&self) -> &'static str {
        "backend"
    }

    async fn run(
        &self,
        config: Arc<ScanConfiguration>,
        _ticker: ProgressTicker,
    ) -> Result<Option<BackendFindings>, ScanError> {
        info!(url = %self.client.settings().url, targets = config.targets.len(), "Starting backend scan.");
        self.client.fetch_findings(&config).await.map(Some)
    }
}

/// Builds the progress source selected by the settings.
pub fn source_from_settings(settings: &Settings) -> Result<Arc<dyn ProgressSource>, ScanError> {
    Ok(match settings.progress_source {
        ProgressMode::Simulated => Arc::new(SimulatedProgress::new(settings.tick_interval(), settings.max_increment)),
        ProgressMode::Backend => Arc::new(BackendProgress::new(BackendClient::new(settings.backend.clone())?)),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;
    use strum::IntoEnumIterator;

    #[test]
    fn stage_boundaries() {
        assert_eq!(Stage::for_progress(0), Stage::Initializing);
        assert_eq!(Stage::for_progress(24), Stage::Initializing);
        assert_eq!(Stage::for_progress(25), Stage::PortScanning);
        assert_eq!(Stage::for_progress(49), Stage::PortScanning);
        assert_eq!(Stage::for_progress(50), Stage::VulnerabilityDetection);
        assert_eq!(Stage::for_progress(74), Stage::VulnerabilityDetection);
        assert_eq!(Stage::for_progress(75), Stage::Reporting);
        assert_eq!(Stage::for_progress(100), Stage::Reporting);
    }

    #[test]
    fn stage_labels_and_chips() {
        let labels: Vec<String> = Stage::iter().map(|s| s.to_string()).collect();
        assert_eq!(labels, ["Initializing", "Port Scanning", "Vulnerability Detection", "Reporting"]);
        assert!(!Stage::Initializing.is_reached(14));
        assert!(Stage::Initializing.is_reached(15));
        assert!(Stage::Reporting.is_reached(90));
        assert!(!Stage::Reporting.is_reached(89));
    }

    #[tokio::test(start_paused = true)]
    async fn simulated_progress_is_monotonic_and_stops_below_100() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = seen.clone();
        let ticker = ProgressTicker::new(move |p| sink.lock().unwrap().push(p));

        let source = SimulatedProgress::new(Duration::from_millis(800), 10).with_seed(3);
        let outcome = source
            .run(Arc::new(ScanConfiguration::new(["example.com"])), ticker)
            .await
            .unwrap();
        assert!(outcome.is_none());

        let seen = seen.lock().unwrap();
        assert!(!seen.is_empty());
        assert!(seen.windows(2).all(|w| w[0] < w[1]));
        assert!(seen.windows(2).all(|w| w[1] - w[0] <= 10));
        assert!(*seen.last().unwrap() < 100);
        assert!(seen[0] >= 1 && seen[0] <= 10);
    }

    #[tokio::test(start_paused = true)]
    async fn simulated_progress_respects_cadence() {
        let start = tokio::time::Instant::now();
        let source = SimulatedProgress::new(Duration::from_millis(100), 100);
        source
            .run(Arc::new(ScanConfiguration::new(["example.com"])), ProgressTicker::new(|_| {}))
            .await
            .unwrap();
        // A single increment of up to 100 might need a few ticks, never zero.
        assert!(start.elapsed() >= Duration::from_millis(100));
    }

    #[test]
    fn settings_select_the_source() {
        let mut settings = Settings::default();
        assert_eq!(source_from_settings(&settings).unwrap().name(), "simulated");
        settings.progress_source = ProgressMode::Backend;
        assert_eq!(source_from_settings(&settings).unwrap().name(), "backend");
    }
}
