// src/core/validation.rs

use crate::core::error::ScanError;
use crate::core::models::{ScanConfiguration, ScanType};
use once_cell::sync::Lazy;
use regex::Regex;
use tracing::debug;
use url::{Host, Url};

// RFC 1123 hostname: dot-separated labels of alphanumerics and inner hyphens.
static RE_HOSTNAME: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(?i)[a-z0-9]([a-z0-9-]{0,61}[a-z0-9])?(\.[a-z0-9]([a-z0-9-]{0,61}[a-z0-9])?)*\.?$")
        .expect("hostname regex is valid")
});

/// Checks a configuration before any session state is touched.
pub fn validate(config: &ScanConfiguration) -> Result<(), ScanError> {
    if config.targets.is_empty() {
        return Err(ScanError::Validation("at least one target is required".to_string()));
    }

    for (index, target) in config.targets.iter().enumerate() {
        if !is_valid_target(target) {
            debug!(index, target = %target, "Rejecting malformed target.");
            return Err(ScanError::Validation(format!(
                "target #{} ('{}') is not a valid URL or host",
                index + 1,
                target
            )));
        }
    }

    if config.scan_type == ScanType::Custom
        && !(ScanConfiguration::MIN_DEPTH..=ScanConfiguration::MAX_DEPTH).contains(&config.depth)
    {
        return Err(ScanError::Validation(format!(
            "custom scan depth must be between {} and {}, got {}",
            ScanConfiguration::MIN_DEPTH,
            ScanConfiguration::MAX_DEPTH,
            config.depth
        )));
    }

    if let Some(credentials) = &config.credentials {
        if credentials.username.trim().is_empty() {
            return Err(ScanError::Validation("credentials require a username".to_string()));
        }
    }

    Ok(())
}

/// A target is either an http(s) URL or a bare host (optionally with port and path).
pub fn is_valid_target(target: &str) -> bool {
    let trimmed = target.trim();
    if trimmed.is_empty() || trimmed.chars().any(char::is_whitespace) {
        return false;
    }

    let candidate = if trimmed.contains("://") {
        trimmed.to_string()
    } else {
        format!("https://{}", trimmed)
    };

    match Url::parse(&candidate) {
        Ok(url) if matches!(url.scheme(), "http" | "https") => match url.host() {
            Some(Host::Domain(domain)) => RE_HOSTNAME.is_match(domain),
            Some(Host::Ipv4(_)) | Some(Host::Ipv6(_)) => true,
            None => false,
        },
        _ => false,
    }
}

/// Extracts the host part of a target, for display and logging.
pub fn target_host(target: &str) -> Option<String> {
    let trimmed = target.trim();
    let candidate = if trimmed.contains("://") {
        trimmed.to_string()
    } else {
        format!("https://{}", trimmed)
    };
    Url::parse(&candidate)
        .ok()
        .and_then(|url| url.host_str().map(String::from))
}
