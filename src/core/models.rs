// src/core/models.rs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use strum::{Display, EnumString};

// --- Severity & Categories ---

/// Severity of a vulnerability or of a predicted attack category.
///
/// Variants are declared from most to least severe; `rank` is what list views sort on.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Display, EnumString)]
#[serde(rename_all = "lowercase")]
#[strum(ascii_case_insensitive)]
pub enum Severity {
    Critical,
    High,
    Medium,
    Low,
}

impl Severity {
    /// Numeric rank, higher is more severe.
    pub fn rank(self) -> u8 {
        match self {
            Severity::Critical => 3,
            Severity::High => 2,
            Severity::Medium => 1,
            Severity::Low => 0,
        }
    }
}

/// The attack pattern a target is predicted to be exposed to.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Display)]
pub enum AttackCategory {
    #[strum(to_string = "SQL Injection")]
    SqlInjection,
    #[strum(to_string = "Cross-Site Scripting")]
    Xss,
    #[strum(to_string = "Man-in-the-Middle")]
    Mitm,
}

impl AttackCategory {
    pub const ALL: [AttackCategory; 3] = [
        AttackCategory::SqlInjection,
        AttackCategory::Xss,
        AttackCategory::Mitm,
    ];

    /// Parses a classification label as emitted by a scanning backend.
    ///
    /// Matching ignores case and separators, so "SQL_Injection", "sqli" and
    /// "sql-injection" all resolve to the same category.
    pub fn from_label(label: &str) -> Option<Self> {
        let normalized: String = label
            .chars()
            .filter(|c| c.is_ascii_alphanumeric())
            .map(|c| c.to_ascii_lowercase())
            .collect();
        match normalized.as_str() {
            "sql" | "sqli" | "sqlinjection" => Some(AttackCategory::SqlInjection),
            "xss" | "crosssitescripting" => Some(AttackCategory::Xss),
            "mitm" | "maninthemiddle" => Some(AttackCategory::Mitm),
            _ => None,
        }
    }
}

// --- Scan Configuration ---

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq, Display, EnumString)]
#[strum(ascii_case_insensitive)]
pub enum ScanType {
    #[default]
    Quick,
    Full,
    Custom,
}

impl ScanType {
    /// Cycles Quick -> Full -> Custom -> Quick.
    pub fn next(self) -> Self {
        match self {
            ScanType::Quick => ScanType::Full,
            ScanType::Full => ScanType::Custom,
            ScanType::Custom => ScanType::Quick,
        }
    }
}

/// Optional credentials forwarded to an authenticated scan.
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

// The password never reaches logs.
impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// What to scan. Frozen behind an `Arc` once a session starts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScanConfiguration {
    pub targets: Vec<String>,
    pub scan_type: ScanType,
    /// Only meaningful for `ScanType::Custom`.
    pub depth: u8,
    pub credentials: Option<Credentials>,
}

impl Default for ScanConfiguration {
    fn default() -> Self {
        Self {
            targets: Vec::new(),
            scan_type: ScanType::Quick,
            depth: Self::DEFAULT_DEPTH,
            credentials: None,
        }
    }
}

impl ScanConfiguration {
    pub const DEFAULT_DEPTH: u8 = 50;
    pub const MIN_DEPTH: u8 = 10;
    pub const MAX_DEPTH: u8 = 100;

    pub fn new<I, S>(targets: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            targets: targets.into_iter().map(Into::into).collect(),
            ..Self::default()
        }
    }

    pub fn with_scan_type(mut self, scan_type: ScanType) -> Self {
        self.scan_type = scan_type;
        self
    }

    pub fn with_depth(mut self, depth: u8) -> Self {
        self.depth = depth;
        self
    }

    pub fn with_credentials(mut self, username: impl Into<String>, password: impl Into<String>) -> Self {
        self.credentials = Some(Credentials {
            username: username.into(),
            password: password.into(),
        });
        self
    }

    /// The depth that applies to this scan, if any.
    pub fn effective_depth(&self) -> Option<u8> {
        match self.scan_type {
            ScanType::Custom => Some(self.depth),
            _ => None,
        }
    }
}

// --- Vulnerabilities ---

/// A single vulnerability, either from the local catalog or from backend findings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Vulnerability {
    pub id: String,
    pub name: String,
    pub severity: Severity,
    pub description: String,
    pub affected_endpoint: String,
    pub cve: Option<String>,
    pub fix_available: bool,
}

/// A catalog entry: a vulnerability plus the categories it is relevant to.
/// An empty `relevant_to` means the entry applies to every category.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CatalogEntry {
    pub vulnerability: Vulnerability,
    pub relevant_to: Vec<AttackCategory>,
}

impl CatalogEntry {
    pub fn applies_to(&self, category: AttackCategory) -> bool {
        self.relevant_to.is_empty() || self.relevant_to.contains(&category)
    }
}

/// Ordered collection of vulnerabilities the aggregator draws from.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VulnerabilityCatalog {
    entries: Vec<CatalogEntry>,
}

impl VulnerabilityCatalog {
    pub fn new(entries: Vec<CatalogEntry>) -> Self {
        Self { entries }
    }

    /// A catalog without any relevance tags.
    pub fn untagged(vulnerabilities: Vec<Vulnerability>) -> Self {
        Self {
            entries: vulnerabilities
                .into_iter()
                .map(|vulnerability| CatalogEntry { vulnerability, relevant_to: Vec::new() })
                .collect(),
        }
    }

    pub fn entries(&self) -> &[CatalogEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

// --- Alerts ---

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Display)]
#[serde(rename_all = "lowercase")]
pub enum AlertLevel {
    Critical,
    Warning,
    Info,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Alert {
    pub message: String,
    pub level: AlertLevel,
}

impl Alert {
    /// The single summary alert for a threat level on the 0-100 scale.
    pub fn for_threat_level(threat_level: u8) -> Self {
        let (message, level) = if threat_level > 75 {
            ("High threat detected!", AlertLevel::Critical)
        } else if threat_level > 40 {
            ("Moderate threat detected.", AlertLevel::Warning)
        } else {
            ("System appears safe.", AlertLevel::Info)
        };
        Self { message: message.to_string(), level }
    }
}

// --- Sessions ---

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Display)]
pub enum SessionState {
    Idle,
    Running,
    Complete,
    Error,
}

/// Opaque reference to one scan run. The generation increases with every `start`.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub struct SessionHandle {
    pub generation: u64,
}

/// Snapshot of one scan run as owned by the orchestrator.
#[derive(Debug, Clone)]
pub struct ScanSession {
    pub generation: u64,
    pub state: SessionState,
    pub progress: u8,
    pub configuration: Arc<ScanConfiguration>,
    pub started_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
    pub error: Option<String>,
    /// Present exactly when `state == Complete`.
    pub result: Option<Arc<ScanResult>>,
}

impl ScanSession {
    pub fn running(generation: u64, configuration: Arc<ScanConfiguration>) -> Self {
        Self {
            generation,
            state: SessionState::Running,
            progress: 0,
            configuration,
            started_at: Utc::now(),
            completed_at: None,
            error: None,
            result: None,
        }
    }

    pub fn idle(generation: u64, configuration: Arc<ScanConfiguration>) -> Self {
        Self {
            state: SessionState::Idle,
            ..Self::running(generation, configuration)
        }
    }

    pub fn handle(&self) -> SessionHandle {
        SessionHandle { generation: self.generation }
    }

    pub fn is_running(&self) -> bool {
        self.state == SessionState::Running
    }
}

// --- Result ---

/// Final, classified outcome of a completed scan.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct ScanResult {
    pub session: SessionHandle,
    pub targets: Vec<String>,
    pub scan_type: ScanType,
    pub category: AttackCategory,
    pub severity: Severity,
    /// Headline, explanation and fix steps of the predicted category.
    pub title: &'static str,
    pub description: &'static str,
    pub remediation: &'static [&'static str],
    /// Ordered by severity rank, most severe first, ties in catalog order.
    pub vulnerabilities: Vec<Vulnerability>,
    pub threat_level: u8,
    pub alerts: Vec<Alert>,
    pub completed_at: DateTime<Utc>,
}
