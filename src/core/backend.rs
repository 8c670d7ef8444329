// src/core/backend.rs

use crate::config::BackendSettings;
use crate::core::error::ScanError;
use crate::core::models::{Alert, AlertLevel, ScanConfiguration, Severity, Vulnerability};
use reqwest::StatusCode;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use tracing::{debug, error, info, warn};

// --- Findings ---

/// One row of the backend's vulnerability table.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct RawFinding {
    /// Endpoints may come back as strings or as row indices.
    #[serde(default)]
    pub endpoint: Value,
    /// The backend's own label for this row; a category name when it has one.
    #[serde(default)]
    pub vulnerability: String,
    #[serde(default)]
    pub score: i64,
    #[serde(default)]
    pub severity: Option<String>,
    #[serde(default)]
    pub cve: Option<String>,
    #[serde(default)]
    pub fix_available: Option<bool>,
}

impl RawFinding {
    pub fn endpoint_label(&self) -> String {
        match &self.endpoint {
            Value::String(s) => s.clone(),
            Value::Null => "unknown".to_string(),
            other => other.to_string(),
        }
    }

    /// Explicit severity if the backend sent a known one, otherwise bucketed from the score.
    pub fn resolved_severity(&self) -> Severity {
        if let Some(severity) = self.severity.as_deref().and_then(|s| s.parse().ok()) {
            return severity;
        }
        match self.score {
            s if s >= 75 => Severity::Critical,
            s if s >= 50 => Severity::High,
            s if s >= 25 => Severity::Medium,
            _ => Severity::Low,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct NetworkGraph {
    #[serde(default)]
    pub nodes: Vec<Value>,
    #[serde(default)]
    pub edges: Vec<Value>,
}

/// Raw findings returned by the scan endpoint.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct BackendFindings {
    /// Clamped to 0-100 whatever number the backend sends.
    #[serde(deserialize_with = "clamped_threat_level")]
    pub threat_level: u8,
    #[serde(default)]
    pub vulnerabilities: Vec<RawFinding>,
    #[serde(default)]
    pub network: NetworkGraph,
    #[serde(default)]
    pub attack_paths: Vec<Value>,
    #[serde(default, deserialize_with = "lenient_alerts")]
    pub alerts: Vec<Alert>,
    /// Overall attack classification, when the backend provides one.
    #[serde(default)]
    pub classification: Option<String>,
}

fn clamped_threat_level<'de, D>(deserializer: D) -> Result<u8, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = f64::deserialize(deserializer)?;
    Ok(raw.round().clamp(0.0, 100.0) as u8)
}

#[derive(Deserialize)]
struct RawAlert {
    #[serde(default)]
    message: String,
    #[serde(default)]
    level: String,
}

/// Alert levels outside critical/warning/info are mapped, never rejected.
fn alert_level(label: &str) -> AlertLevel {
    match label.trim().to_ascii_lowercase().as_str() {
        "critical" | "high" | "error" | "danger" => AlertLevel::Critical,
        "warning" | "warn" | "medium" | "moderate" => AlertLevel::Warning,
        _ => AlertLevel::Info,
    }
}

fn lenient_alerts<'de, D>(deserializer: D) -> Result<Vec<Alert>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Vec::<RawAlert>::deserialize(deserializer)?;
    Ok(raw
        .into_iter()
        .map(|alert| Alert {
            level: alert_level(&alert.level),
            message: alert.message,
        })
        .collect())
}

impl BackendFindings {
    pub fn to_vulnerabilities(&self) -> Vec<Vulnerability> {
        self.vulnerabilities
            .iter()
            .enumerate()
            .map(|(index, finding)| {
                let endpoint = finding.endpoint_label();
                let name = if finding.vulnerability.is_empty() {
                    "Unclassified finding".to_string()
                } else {
                    finding.vulnerability.clone()
                };
                Vulnerability {
                    id: format!("finding-{}", index + 1),
                    description: format!("{} reported at {} (score {})", name, endpoint, finding.score),
                    name,
                    severity: finding.resolved_severity(),
                    affected_endpoint: endpoint,
                    cve: finding.cve.clone(),
                    fix_available: finding.fix_available.unwrap_or(false),
                }
            })
            .collect()
    }
}

/// Turns an error body into a human-readable message.
pub fn error_message_from_body(body: &str) -> String {
    if let Ok(Value::Object(map)) = serde_json::from_str::<Value>(body) {
        for key in ["detail", "error", "message"] {
            if let Some(Value::String(message)) = map.get(key) {
                if !message.trim().is_empty() {
                    return message.trim().to_string();
                }
            }
        }
    }
    let trimmed = body.trim();
    if trimmed.is_empty() {
        "Unknown error".to_string()
    } else {
        trimmed.chars().take(200).collect()
    }
}

/// Parses a successful response body. A 2xx body carrying an `error` key is still a failure.
pub fn parse_findings(body: &str) -> Result<BackendFindings, ScanError> {
    let value: Value = serde_json::from_str(body)
        .map_err(|e| ScanError::ScanFailed(format!("malformed backend response: {}", e)))?;
    if let Some(Value::String(message)) = value.get("error") {
        return Err(ScanError::ScanFailed(message.clone()));
    }
    serde_json::from_value(value)
        .map_err(|e| ScanError::ScanFailed(format!("unexpected backend response: {}", e)))
}

// --- Client ---

/// Form fields carrying the configuration to the scan endpoint.
pub fn form_fields(config: &ScanConfiguration) -> Vec<(&'static str, String)> {
    let mut fields = Vec::new();
    if let Some(first) = config.targets.first() {
        fields.push(("url", first.clone()));
    }
    if config.targets.len() > 1 {
        fields.push(("targets", config.targets.join(",")));
    }
    fields.push(("scan_type", config.scan_type.to_string()));
    if let Some(depth) = config.effective_depth() {
        fields.push(("depth", depth.to_string()));
    }
    if let Some(credentials) = &config.credentials {
        fields.push(("username", credentials.username.clone()));
        fields.push(("password", credentials.password.clone()));
    }
    fields
}

enum Attempt {
    Done(BackendFindings),
    Retryable(ScanError),
    Fatal(ScanError),
}

#[derive(Debug, Clone)]
pub struct BackendClient {
    client: reqwest::Client,
    settings: BackendSettings,
}

impl BackendClient {
    pub fn new(settings: BackendSettings) -> Result<Self, ScanError> {
        let client = reqwest::Client::builder()
            .user_agent(concat!("ScanSentinel/", env!("CARGO_PKG_VERSION")))
            .timeout(settings.timeout())
            .build()
            .map_err(|e| {
                error!(error = %e, "Failed to build HTTP client for backend scans.");
                ScanError::ScanFailed(format!("failed to build HTTP client: {}", e))
            })?;
        Ok(Self { client, settings })
    }

    pub fn settings(&self) -> &BackendSettings {
        &self.settings
    }

    /// Sends the configuration to the backend, retrying transport errors and 5xx
    /// responses up to `retries` times with exponential backoff.
    pub async fn fetch_findings(&self, config: &ScanConfiguration) -> Result<BackendFindings, ScanError> {
        let fields = form_fields(config);
        let mut attempt = 0;
        loop {
            match self.send_once(&fields).await {
                Attempt::Done(findings) => {
                    info!(
                        threat_level = findings.threat_level,
                        findings = findings.vulnerabilities.len(),
                        "Backend scan finished."
                    );
                    return Ok(findings);
                }
                Attempt::Fatal(e) => return Err(e),
                Attempt::Retryable(e) if attempt < self.settings.retries => {
                    let delay = self.settings.backoff_for(attempt);
                    warn!(attempt = attempt + 1, delay_ms = delay.as_millis() as u64, error = %e, "Backend scan failed, retrying.");
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                Attempt::Retryable(e) => return Err(e),
            }
        }
    }

    async fn send_once(&self, fields: &[(&'static str, String)]) -> Attempt {
        debug!(url = %self.settings.url, "Sending scan request to backend.");
        let response = match self.client.post(&self.settings.url).form(fields).send().await {
            Ok(response) => response,
            Err(e) => {
                error!(url = %self.settings.url, error = %e, "Backend request failed.");
                let message = if e.is_timeout() {
                    format!("backend did not answer within {} ms", self.settings.timeout_ms)
                } else {
                    e.to_string()
                };
                return Attempt::Retryable(ScanError::ScanFailed(message));
            }
        };

        let status = response.status();
        let body = match response.text().await {
            Ok(body) => body,
            Err(e) => return Attempt::Retryable(ScanError::ScanFailed(e.to_string())),
        };

        if !status.is_success() {
            let message = error_message_from_body(&body);
            warn!(status = %status, message = %message, "Backend returned an error status.");
            let err = ScanError::ScanFailed(format!("HTTP {}: {}", status.as_u16(), message));
            return if status.is_server_error() || status == StatusCode::TOO_MANY_REQUESTS {
                Attempt::Retryable(err)
            } else {
                Attempt::Fatal(err)
            };
        }

        match parse_findings(&body) {
            Ok(findings) => Attempt::Done(findings),
            Err(e) => Attempt::Fatal(e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::models::ScanType;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;

    const SAMPLE: &str = r#"{
        "threat_level": 80,
        "vulnerabilities": [
            {"endpoint": "/login", "vulnerability": "sql_injection", "score": 90},
            {"endpoint": 3, "vulnerability": "1", "score": 1}
        ],
        "network": {"nodes": ["/login", "/home"], "edges": [["/login", "/home"]]},
        "attack_paths": [],
        "alerts": [{"message": "High threat detected!", "level": "critical"}]
    }"#;

    /// Reads headers and a content-length body so the socket is drained before replying.
    async fn read_request(socket: &mut tokio::net::TcpStream) {
        let mut data = Vec::new();
        let mut chunk = [0u8; 1024];
        loop {
            let n = socket.read(&mut chunk).await.unwrap_or(0);
            if n == 0 {
                return;
            }
            data.extend_from_slice(&chunk[..n]);
            let text = String::from_utf8_lossy(&data);
            if let Some(header_end) = text.find("\r\n\r\n") {
                let content_length = text[..header_end]
                    .lines()
                    .find_map(|line| {
                        let (name, value) = line.split_once(':')?;
                        name.eq_ignore_ascii_case("content-length")
                            .then(|| value.trim().parse::<usize>().ok())
                            .flatten()
                    })
                    .unwrap_or(0);
                if data.len() >= header_end + 4 + content_length {
                    return;
                }
            }
        }
    }

    /// Serves the given responses in order, one per connection.
    async fn serve(responses: Vec<(u16, &'static str)>) -> (String, Arc<AtomicUsize>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let hits = Arc::new(AtomicUsize::new(0));
        let counter = hits.clone();
        tokio::spawn(async move {
            for (status, body) in responses {
                let (mut socket, _) = listener.accept().await.unwrap();
                read_request(&mut socket).await;
                counter.fetch_add(1, Ordering::SeqCst);
                let reply = format!(
                    "HTTP/1.1 {} X\r\ncontent-type: application/json\r\ncontent-length: {}\r\nconnection: close\r\n\r\n{}",
                    status,
                    body.len(),
                    body
                );
                socket.write_all(reply.as_bytes()).await.unwrap();
                let _ = socket.shutdown().await;
            }
        });
        (format!("http://{}/fullscan", addr), hits)
    }

    fn client_for(url: String, retries: u32) -> BackendClient {
        BackendClient::new(BackendSettings {
            url,
            timeout_ms: 5_000,
            retries,
            backoff_ms: 1,
        })
        .unwrap()
    }

    #[test]
    fn sample_response_parses_into_findings() {
        let findings = parse_findings(SAMPLE).unwrap();
        assert_eq!(findings.threat_level, 80);
        assert_eq!(findings.network.nodes.len(), 2);
        let vulns = findings.to_vulnerabilities();
        assert_eq!(vulns[0].id, "finding-1");
        assert_eq!(vulns[0].severity, Severity::Critical);
        assert_eq!(vulns[1].affected_endpoint, "3");
        assert_eq!(vulns[1].severity, Severity::Low);
    }

    #[test]
    fn out_of_range_threat_levels_are_clamped() {
        let high = parse_findings(r#"{"threat_level": 300, "vulnerabilities": []}"#).unwrap();
        assert_eq!(high.threat_level, 100);
        let negative = parse_findings(r#"{"threat_level": -5}"#).unwrap();
        assert_eq!(negative.threat_level, 0);
        let fractional = parse_findings(r#"{"threat_level": 42.6}"#).unwrap();
        assert_eq!(fractional.threat_level, 43);
    }

    #[test]
    fn unknown_alert_levels_are_mapped() {
        let findings = parse_findings(
            r#"{"threat_level": 10, "alerts": [
                {"message": "a", "level": "high"},
                {"message": "b", "level": "Moderate"},
                {"message": "c", "level": "notice"},
                {"message": "d"}
            ]}"#,
        )
        .unwrap();
        let levels: Vec<_> = findings.alerts.iter().map(|a| a.level).collect();
        assert_eq!(
            levels,
            vec![AlertLevel::Critical, AlertLevel::Warning, AlertLevel::Info, AlertLevel::Info]
        );
        assert_eq!(findings.alerts[0].message, "a");
    }

    #[test]
    fn error_key_in_success_body_is_a_failure() {
        let err = parse_findings(r#"{"error": "Provide either a URL or a file."}"#).unwrap_err();
        assert_eq!(err, ScanError::ScanFailed("Provide either a URL or a file.".to_string()));
    }

    #[test]
    fn error_messages_fall_back_to_unknown() {
        assert_eq!(error_message_from_body(r#"{"detail": "boom"}"#), "boom");
        assert_eq!(error_message_from_body("gateway exploded"), "gateway exploded");
        assert_eq!(error_message_from_body("  "), "Unknown error");
    }

    #[test]
    fn form_carries_the_whole_configuration() {
        let config = ScanConfiguration::new(["https://a.example.com", "b.example.com"])
            .with_scan_type(ScanType::Custom)
            .with_depth(40)
            .with_credentials("admin", "pw");
        let fields = form_fields(&config);
        assert!(fields.contains(&("url", "https://a.example.com".to_string())));
        assert!(fields.contains(&("targets", "https://a.example.com,b.example.com".to_string())));
        assert!(fields.contains(&("scan_type", "Custom".to_string())));
        assert!(fields.contains(&("depth", "40".to_string())));
        assert!(fields.contains(&("username", "admin".to_string())));
    }

    #[tokio::test]
    async fn successful_request_returns_findings() {
        let (url, _) = serve(vec![(200, SAMPLE)]).await;
        let findings = client_for(url, 0)
            .fetch_findings(&ScanConfiguration::new(["example.com"]))
            .await
            .unwrap();
        assert_eq!(findings.vulnerabilities.len(), 2);
    }

    #[tokio::test]
    async fn client_error_is_not_retried() {
        let (url, hits) = serve(vec![(422, r#"{"detail": "bad form"}"#), (200, SAMPLE)]).await;
        let err = client_for(url, 3)
            .fetch_findings(&ScanConfiguration::new(["example.com"]))
            .await
            .unwrap_err();
        assert_eq!(err, ScanError::ScanFailed("HTTP 422: bad form".to_string()));
        assert_eq!(hits.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn server_errors_are_retried_when_configured() {
        let (url, hits) = serve(vec![(503, ""), (200, SAMPLE)]).await;
        let findings = client_for(url, 1)
            .fetch_findings(&ScanConfiguration::new(["example.com"]))
            .await
            .unwrap();
        assert_eq!(findings.threat_level, 80);
        assert_eq!(hits.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn silent_backend_hits_the_deadline() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            read_request(&mut socket).await;
            // Hold the connection open without answering.
            tokio::time::sleep(std::time::Duration::from_secs(10)).await;
            drop(socket);
        });

        let client = BackendClient::new(BackendSettings {
            url: format!("http://{}/fullscan", addr),
            timeout_ms: 50,
            retries: 0,
            backoff_ms: 1,
        })
        .unwrap();
        let err = client
            .fetch_findings(&ScanConfiguration::new(["example.com"]))
            .await
            .unwrap_err();
        assert_eq!(err, ScanError::ScanFailed("backend did not answer within 50 ms".to_string()));
    }

    #[tokio::test]
    async fn closed_port_fails_after_retrying() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let err = client_for(format!("http://{}/fullscan", addr), 1)
            .fetch_findings(&ScanConfiguration::new(["example.com"]))
            .await
            .unwrap_err();
        assert!(matches!(err, ScanError::ScanFailed(_)));
    }

    #[tokio::test]
    async fn dropped_connection_is_retried() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let hits = Arc::new(AtomicUsize::new(0));
        let counter = hits.clone();
        tokio::spawn(async move {
            // First connection is closed without a reply.
            let (mut socket, _) = listener.accept().await.unwrap();
            read_request(&mut socket).await;
            counter.fetch_add(1, Ordering::SeqCst);
            drop(socket);

            let (mut socket, _) = listener.accept().await.unwrap();
            read_request(&mut socket).await;
            counter.fetch_add(1, Ordering::SeqCst);
            let reply = format!(
                "HTTP/1.1 200 OK\r\ncontent-type: application/json\r\ncontent-length: {}\r\nconnection: close\r\n\r\n{}",
                SAMPLE.len(),
                SAMPLE
            );
            socket.write_all(reply.as_bytes()).await.unwrap();
            let _ = socket.shutdown().await;
        });

        let findings = client_for(format!("http://{}/fullscan", addr), 1)
            .fetch_findings(&ScanConfiguration::new(["example.com"]))
            .await
            .unwrap();
        assert_eq!(findings.threat_level, 80);
        assert_eq!(hits.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn no_retry_by_default() {
        let (url, hits) = serve(vec![(500, "")]).await;
        let err = client_for(url, 0)
            .fetch_findings(&ScanConfiguration::new(["example.com"]))
            .await
            .unwrap_err();
        assert_eq!(err, ScanError::ScanFailed("HTTP 500: Unknown error".to_string()));
        assert_eq!(hits.load(Ordering::SeqCst), 1);
    }
}
