// src/core/report.rs

use crate::core::models::ScanResult;
use std::path::{Path, PathBuf};
use tracing::info;

#[derive(Debug, thiserror::Error)]
pub enum ReportError {
    #[error("Failed to serialize scan result: {0}")]
    Serialize(#[from] serde_json::Error),

    #[error("Failed to write report to {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// File name of an exported report, `scan-<generation>-<timestamp>.json`.
pub fn report_file_name(result: &ScanResult) -> String {
    format!(
        "scan-{}-{}.json",
        result.session.generation,
        result.completed_at.format("%Y%m%dT%H%M%SZ")
    )
}

/// Writes `result` as pretty JSON into `dir`, creating it if needed.
pub fn export_json(result: &ScanResult, dir: &Path) -> Result<PathBuf, ReportError> {
    let json = serde_json::to_string_pretty(result)?;
    std::fs::create_dir_all(dir).map_err(|source| ReportError::Write {
        path: dir.to_path_buf(),
        source,
    })?;
    let path = dir.join(report_file_name(result));
    std::fs::write(&path, json).map_err(|source| ReportError::Write {
        path: path.clone(),
        source,
    })?;
    info!(path = %path.display(), "Exported scan report.");
    Ok(path)
}
