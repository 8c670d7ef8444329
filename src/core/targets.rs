// src/core/targets.rs

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tokio::sync::RwLock;
use tracing::debug;
use url::Url;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TargetError {
    #[error("Invalid target URL '{0}': a scheme and host are required")]
    InvalidUrl(String),

    #[error("Target '{0}' is already registered")]
    Duplicate(String),

    #[error("Target '{0}' not found")]
    NotFound(String),
}

/// A saved scan target.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredTarget {
    pub id: String,
    pub url: String,
}

/// Saved scan targets, grouped by owner. Scans never read from it directly;
/// callers copy the URLs into a `ScanConfiguration`.
#[async_trait]
pub trait TargetStore: Send + Sync {
    /// Returns the id of the new target.
    async fn add_target(&self, owner: &str, url: &str) -> Result<String, TargetError>;

    /// Targets in insertion order; empty for unknown owners.
    async fn list_targets(&self, owner: &str) -> Vec<StoredTarget>;

    async fn remove_target(&self, owner: &str, id: &str) -> Result<(), TargetError>;
}

#[derive(Debug, Default)]
struct Targets {
    next_id: u64,
    by_owner: HashMap<String, Vec<StoredTarget>>,
}

#[derive(Debug, Default)]
pub struct InMemoryTargetStore {
    targets: RwLock<Targets>,
}

impl InMemoryTargetStore {
    pub fn new() -> Self {
        Self::default()
    }
}

/// Unlike scan input, stored targets must spell out their scheme.
fn normalize(url: &str) -> Result<String, TargetError> {
    let trimmed = url.trim();
    let parsed = Url::parse(trimmed).map_err(|_| TargetError::InvalidUrl(trimmed.to_string()))?;
    if !matches!(parsed.scheme(), "http" | "https") || parsed.host_str().is_none() {
        return Err(TargetError::InvalidUrl(trimmed.to_string()));
    }
    Ok(trimmed.to_string())
}

#[async_trait]
impl TargetStore for InMemoryTargetStore {
    async fn add_target(&self, owner: &str, url: &str) -> Result<String, TargetError> {
        let url = normalize(url)?;
        let mut guard = self.targets.write().await;
        let targets = &mut *guard;
        let owned = targets.by_owner.entry(owner.to_string()).or_default();
        if owned.iter().any(|t| t.url == url) {
            return Err(TargetError::Duplicate(url));
        }
        targets.next_id += 1;
        let id = format!("target-{}", targets.next_id);
        debug!(owner, id = %id, url = %url, "Target added.");
        owned.push(StoredTarget { id: id.clone(), url });
        Ok(id)
    }

    async fn list_targets(&self, owner: &str) -> Vec<StoredTarget> {
        self.targets
            .read()
            .await
            .by_owner
            .get(owner)
            .cloned()
            .unwrap_or_default()
    }

    async fn remove_target(&self, owner: &str, id: &str) -> Result<(), TargetError> {
        let mut targets = self.targets.write().await;
        let owned = targets
            .by_owner
            .get_mut(owner)
            .ok_or_else(|| TargetError::NotFound(id.to_string()))?;
        let position = owned
            .iter()
            .position(|t| t.id == id)
            .ok_or_else(|| TargetError::NotFound(id.to_string()))?;
        owned.remove(position);
        debug!(owner, id, "Target removed.");
        Ok(())
    }
}
