// src/core/orchestrator.rs

use crate::core::aggregator::{aggregate, aggregate_findings};
use crate::core::backend::BackendFindings;
use crate::core::classifier::classify;
use crate::core::error::ScanError;
use crate::core::knowledge_base::builtin_catalog;
use crate::core::models::{
    ScanConfiguration, ScanResult, ScanSession, SessionHandle, SessionState, VulnerabilityCatalog,
};
use crate::core::progress::{ProgressSource, ProgressTicker, Stage};
use crate::core::validation::{target_host, validate};
use chrono::Utc;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tokio::sync::{broadcast, watch};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

const EVENT_CAPACITY: usize = 256;

// --- Events ---

#[derive(Debug, Clone)]
pub enum ScanEventKind {
    Progress { progress: u8, stage: Stage },
    Completed(Arc<ScanResult>),
    Failed(ScanError),
    Cancelled,
}

impl ScanEventKind {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, ScanEventKind::Progress { .. })
    }
}

#[derive(Debug, Clone)]
pub struct ScanEvent {
    pub generation: u64,
    pub kind: ScanEventKind,
}

/// Event stream of a single session; ends after its terminal event.
#[derive(Debug)]
pub struct ScanEvents {
    generation: u64,
    receiver: broadcast::Receiver<ScanEvent>,
    finished: bool,
}

impl ScanEvents {
    fn new(generation: u64, receiver: broadcast::Receiver<ScanEvent>) -> Self {
        Self { generation, receiver, finished: false }
    }

    /// Waits for the next event of this session, `None` once it has ended.
    pub async fn next(&mut self) -> Option<ScanEventKind> {
        while !self.finished {
            match self.receiver.recv().await {
                Ok(event) if event.generation == self.generation => {
                    self.finished = event.kind.is_terminal();
                    return Some(event.kind);
                }
                Ok(_) => continue,
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    warn!(generation = self.generation, skipped, "Event subscriber lagged behind.");
                }
                Err(broadcast::error::RecvError::Closed) => self.finished = true,
            }
        }
        None
    }

    /// Non-blocking variant for render loops.
    pub fn try_next(&mut self) -> Option<ScanEventKind> {
        while !self.finished {
            match self.receiver.try_recv() {
                Ok(event) if event.generation == self.generation => {
                    self.finished = event.kind.is_terminal();
                    return Some(event.kind);
                }
                Ok(_) => continue,
                Err(broadcast::error::TryRecvError::Lagged(_)) => continue,
                Err(broadcast::error::TryRecvError::Empty) => return None,
                Err(broadcast::error::TryRecvError::Closed) => self.finished = true,
            }
        }
        None
    }
}

// --- State machine ---

struct Inner {
    generation: u64,
    session: Option<ScanSession>,
    task: Option<JoinHandle<()>>,
}

struct Shared {
    inner: Mutex<Inner>,
    snapshots: watch::Sender<Option<ScanSession>>,
    events: broadcast::Sender<ScanEvent>,
    catalog: VulnerabilityCatalog,
}

impl Shared {
    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn publish(&self, session: &ScanSession, kind: ScanEventKind) {
        self.snapshots.send_replace(Some(session.clone()));
        // No subscribers is fine.
        let _ = self.events.send(ScanEvent { generation: session.generation, kind });
    }

    /// Applies a progress tick, ignoring ticks from superseded or finished runs.
    fn apply_progress(&self, generation: u64, progress: u8) {
        let mut inner = self.lock();
        let Some(session) = inner.session.as_mut() else {
            return;
        };
        if session.generation != generation || !session.is_running() {
            debug!(generation, current = session.generation, "Discarding stale progress tick.");
            return;
        }
        let progress = progress.min(100);
        if progress <= session.progress {
            return;
        }
        session.progress = progress;
        let stage = Stage::for_progress(progress);
        debug!(generation, progress, stage = %stage, "Scan progress.");
        let snapshot = session.clone();
        self.publish(&snapshot, ScanEventKind::Progress { progress, stage });
    }

    /// Terminal transition of a run. Classification happens under the same lock
    /// as the move to `Complete`, so no snapshot shows `Complete` without a result.
    fn finish(&self, generation: u64, outcome: Result<Option<BackendFindings>, ScanError>) {
        let mut inner = self.lock();
        let Some(session) = inner.session.as_mut() else {
            return;
        };
        if session.generation != generation || !session.is_running() {
            warn!(generation, current = session.generation, "Discarding result of a superseded scan.");
            return;
        }

        let result = outcome.and_then(|findings| {
            let category = classify(&session.configuration, findings.as_ref())?;
            Ok(match &findings {
                Some(findings) => aggregate_findings(session, category, findings),
                None => aggregate(session, category, &self.catalog),
            })
        });

        session.completed_at = Some(Utc::now());
        let kind = match result {
            Ok(result) => {
                let result = Arc::new(result);
                session.state = SessionState::Complete;
                session.progress = 100;
                session.result = Some(result.clone());
                info!(
                    generation,
                    category = %result.category,
                    severity = %result.severity,
                    vulnerabilities = result.vulnerabilities.len(),
                    "Scan complete."
                );
                ScanEventKind::Completed(result)
            }
            Err(e) => {
                session.state = SessionState::Error;
                session.error = Some(e.to_string());
                error!(generation, progress = session.progress, error = %e, "Scan failed.");
                ScanEventKind::Failed(e)
            }
        };
        let snapshot = session.clone();
        inner.task = None;
        self.publish(&snapshot, kind);
    }
}

/// Owns the lifecycle of scan sessions: one running session at a time.
///
/// All transitions go through this type; observers only ever see cloned
/// snapshots. Every `start` bumps the generation so late ticks or responses
/// from an earlier run are recognised and dropped.
pub struct ScanOrchestrator {
    shared: Arc<Shared>,
    source: Arc<dyn ProgressSource>,
}

impl ScanOrchestrator {
    pub fn new(source: Arc<dyn ProgressSource>) -> Self {
        Self::with_catalog(source, builtin_catalog().clone())
    }

    pub fn with_catalog(source: Arc<dyn ProgressSource>, catalog: VulnerabilityCatalog) -> Self {
        if catalog.is_empty() {
            warn!("Vulnerability catalog is empty, simulated scans will list no vulnerabilities.");
        }
        let (snapshots, _) = watch::channel(None);
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        Self {
            shared: Arc::new(Shared {
                inner: Mutex::new(Inner { generation: 0, session: None, task: None }),
                snapshots,
                events,
                catalog,
            }),
            source,
        }
    }

    pub fn source_name(&self) -> &'static str {
        self.source.name()
    }

    /// Starts a new scan. Must be called from within a Tokio runtime.
    ///
    /// Fails with `Validation` for a bad configuration and with `Conflict` while
    /// another scan is running; neither touches the current session.
    pub fn start(&self, config: ScanConfiguration) -> Result<(SessionHandle, ScanEvents), ScanError> {
        validate(&config)?;

        let mut inner = self.shared.lock();
        if let Some(current) = inner.session.as_ref().filter(|s| s.is_running()) {
            warn!(generation = current.generation, "Rejecting start while a scan is running.");
            return Err(ScanError::Conflict { generation: current.generation });
        }

        inner.generation += 1;
        let generation = inner.generation;
        let configuration = Arc::new(config);
        let session = ScanSession::running(generation, configuration.clone());
        let handle = session.handle();

        // Subscribe before the task exists so no event can be missed.
        let events = ScanEvents::new(generation, self.shared.events.subscribe());
        inner.session = Some(session.clone());
        self.shared.snapshots.send_replace(Some(session));

        let ticker = {
            let shared = Arc::clone(&self.shared);
            ProgressTicker::new(move |progress| shared.apply_progress(generation, progress))
        };
        let shared = Arc::clone(&self.shared);
        let source = Arc::clone(&self.source);
        inner.task = Some(tokio::spawn(async move {
            let outcome = source.run(configuration, ticker).await;
            shared.finish(generation, outcome);
        }));

        let hosts: Vec<String> = inner
            .session
            .as_ref()
            .map(|s| s.configuration.targets.iter().filter_map(|t| target_host(t)).collect())
            .unwrap_or_default();
        info!(generation, hosts = ?hosts, source = self.source.name(), "Scan started.");
        Ok((handle, events))
    }

    /// Cancels a running scan: back to `Idle` at 0%, in-flight work dropped.
    pub fn cancel(&self, handle: SessionHandle) -> Result<(), ScanError> {
        let mut guard = self.shared.lock();
        let inner = &mut *guard;
        let session = match inner.session.as_mut() {
            Some(session) if session.generation == handle.generation && session.is_running() => session,
            _ => return Err(ScanError::NotRunning { generation: handle.generation }),
        };

        session.state = SessionState::Idle;
        session.progress = 0;
        session.result = None;
        session.error = None;
        session.completed_at = None;
        if let Some(task) = inner.task.take() {
            task.abort();
        }
        info!(generation = handle.generation, "Scan cancelled.");
        let snapshot = session.clone();
        self.shared.publish(&snapshot, ScanEventKind::Cancelled);
        Ok(())
    }

    /// Latest known state. Handles of superseded runs observe the run that replaced them.
    pub fn get_state(&self, handle: SessionHandle) -> ScanSession {
        self.shared
            .snapshots
            .borrow()
            .clone()
            .unwrap_or_else(|| ScanSession::idle(handle.generation, Arc::new(ScanConfiguration::default())))
    }

    /// The current session, if a scan was ever started.
    pub fn current(&self) -> Option<ScanSession> {
        self.shared.snapshots.borrow().clone()
    }

    /// The result of a completed run, only while that run is still current.
    pub fn result(&self, handle: SessionHandle) -> Option<Arc<ScanResult>> {
        self.current()
            .filter(|s| s.generation == handle.generation)
            .and_then(|s| s.result)
    }

    /// Receiver that changes on every transition.
    pub fn watch(&self) -> watch::Receiver<Option<ScanSession>> {
        self.shared.snapshots.subscribe()
    }
}

impl Drop for ScanOrchestrator {
    fn drop(&mut self) {
        if let Some(task) = self.shared.lock().task.take() {
            task.abort();
        }
    }
}
