// src/core/error.rs

/// Errors surfaced by the scan orchestrator and its collaborators.
///
/// `Validation` and `Conflict` are returned synchronously from `start` before any
/// state changes. `ScanFailed` and `Classification` end a running session in the
/// `Error` state and are delivered as the terminal event of its subscription.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ScanError {
    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Conflict: scan #{generation} is already running")]
    Conflict { generation: u64 },

    #[error("Scan failed: {0}")]
    ScanFailed(String),

    #[error("Classification error: {0}")]
    Classification(String),

    #[error("Scan #{generation} is not running")]
    NotRunning { generation: u64 },
}

impl ScanError {
    pub fn is_validation(&self) -> bool {
        matches!(self, Self::Validation(_))
    }
}
