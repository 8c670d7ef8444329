// src/core/aggregator.rs

use crate::core::backend::BackendFindings;
use crate::core::knowledge_base;
use crate::core::models::{
    Alert, AttackCategory, ScanResult, ScanSession, Severity, Vulnerability, VulnerabilityCatalog,
};
use chrono::Utc;
use tracing::debug;

/// Picks the catalog entries relevant to `category`, most severe first.
///
/// Tagged entries are kept only when they name the category; untagged entries
/// always apply, so a catalog without tags comes back whole. The sort is
/// stable, so equal severities keep their catalog order. The catalog itself is
/// left untouched.
pub fn select_vulnerabilities(category: AttackCategory, catalog: &VulnerabilityCatalog) -> Vec<Vulnerability> {
    let mut selected: Vec<Vulnerability> = catalog
        .entries()
        .iter()
        .filter(|entry| entry.applies_to(category))
        .map(|entry| entry.vulnerability.clone())
        .collect();
    selected.sort_by_key(|v| std::cmp::Reverse(v.severity.rank()));
    selected
}

/// Threat level on a 0-100 scale derived from the worst finding, plus 5 per extra finding.
pub fn threat_level_for(vulnerabilities: &[Vulnerability]) -> u8 {
    let Some(worst) = vulnerabilities.iter().map(|v| v.severity).max_by_key(|s| s.rank()) else {
        return 0;
    };
    let base: u32 = match worst {
        Severity::Critical => 90,
        Severity::High => 70,
        Severity::Medium => 50,
        Severity::Low => 25,
    };
    let extra = (vulnerabilities.len() as u32 - 1).saturating_mul(5);
    (base + extra).min(100) as u8
}

/// Binds a category decision and its vulnerabilities to the session that produced them.
pub fn aggregate(session: &ScanSession, category: AttackCategory, catalog: &VulnerabilityCatalog) -> ScanResult {
    let vulnerabilities = select_vulnerabilities(category, catalog);
    let threat_level = threat_level_for(&vulnerabilities);
    debug!(
        generation = session.generation,
        category = %category,
        kept = vulnerabilities.len(),
        catalog = catalog.len(),
        "Aggregated scan result."
    );
    let profile = knowledge_base::profile(category);
    ScanResult {
        session: session.handle(),
        targets: session.configuration.targets.clone(),
        scan_type: session.configuration.scan_type,
        category,
        severity: category.severity(),
        title: profile.title,
        description: profile.description,
        remediation: profile.remediation,
        vulnerabilities,
        threat_level,
        alerts: vec![Alert::for_threat_level(threat_level)],
        completed_at: Utc::now(),
    }
}

/// Like `aggregate`, but draws vulnerabilities, threat level and alerts from backend findings.
pub fn aggregate_findings(session: &ScanSession, category: AttackCategory, findings: &BackendFindings) -> ScanResult {
    let catalog = VulnerabilityCatalog::untagged(findings.to_vulnerabilities());
    let mut result = aggregate(session, category, &catalog);
    result.threat_level = findings.threat_level.min(100);
    result.alerts = if findings.alerts.is_empty() {
        vec![Alert::for_threat_level(result.threat_level)]
    } else {
        findings.alerts.clone()
    };
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::backend::RawFinding;
    use crate::core::knowledge_base::builtin_catalog;
    use crate::core::models::{AlertLevel, CatalogEntry, ScanConfiguration};
    use std::sync::Arc;

    fn vuln(id: &str, severity: Severity) -> Vulnerability {
        Vulnerability {
            id: id.to_string(),
            name: id.to_string(),
            severity,
            description: String::new(),
            affected_endpoint: "/".to_string(),
            cve: None,
            fix_available: false,
        }
    }

    fn session() -> ScanSession {
        ScanSession::running(7, Arc::new(ScanConfiguration::new(["https://example.com/login"])))
    }

    #[test]
    fn orders_by_severity_descending() {
        let catalog = VulnerabilityCatalog::untagged(vec![
            vuln("a", Severity::Low),
            vuln("b", Severity::Critical),
            vuln("c", Severity::High),
            vuln("d", Severity::Medium),
        ]);
        let result = aggregate(&session(), AttackCategory::Xss, &catalog);
        let severities: Vec<_> = result.vulnerabilities.iter().map(|v| v.severity).collect();
        assert_eq!(severities, vec![Severity::Critical, Severity::High, Severity::Medium, Severity::Low]);
    }

    #[test]
    fn ties_keep_catalog_order_and_catalog_is_untouched() {
        let catalog = VulnerabilityCatalog::untagged(vec![
            vuln("m1", Severity::Medium),
            vuln("h1", Severity::High),
            vuln("m2", Severity::Medium),
            vuln("h2", Severity::High),
        ]);
        let before = catalog.clone();
        let ids: Vec<_> = select_vulnerabilities(AttackCategory::Mitm, &catalog)
            .into_iter()
            .map(|v| v.id)
            .collect();
        assert_eq!(ids, vec!["h1", "h2", "m1", "m2"]);
        assert_eq!(catalog, before);
    }

    #[test]
    fn tagged_entries_are_filtered_by_category() {
        let catalog = VulnerabilityCatalog::new(vec![
            CatalogEntry { vulnerability: vuln("sql", Severity::Critical), relevant_to: vec![AttackCategory::SqlInjection] },
            CatalogEntry { vulnerability: vuln("any", Severity::Low), relevant_to: vec![] },
            CatalogEntry { vulnerability: vuln("xss", Severity::High), relevant_to: vec![AttackCategory::Xss] },
        ]);
        let ids: Vec<_> = select_vulnerabilities(AttackCategory::Xss, &catalog)
            .into_iter()
            .map(|v| v.id)
            .collect();
        assert_eq!(ids, vec!["xss", "any"]);
    }

    #[test]
    fn builtin_catalog_result_for_sql_injection() {
        let result = aggregate(&session(), AttackCategory::SqlInjection, builtin_catalog());
        let ids: Vec<_> = result.vulnerabilities.iter().map(|v| v.id.as_str()).collect();
        assert_eq!(ids, vec!["vuln-1", "vuln-5"]);
        assert_eq!(result.severity, Severity::Critical);
        assert_eq!(result.title, "SQL Injection Attack Predicted");
        assert_eq!(result.remediation.len(), 4);
        assert_eq!(result.session.generation, 7);
        assert_eq!(result.threat_level, 95);
        assert_eq!(result.alerts[0].level, AlertLevel::Critical);
    }

    #[test]
    fn threat_level_is_zero_without_findings() {
        assert_eq!(threat_level_for(&[]), 0);
        assert_eq!(threat_level_for(&[vuln("x", Severity::High)]), 70);
    }

    #[test]
    fn backend_findings_supply_level_and_alerts() {
        let findings = BackendFindings {
            threat_level: 30,
            vulnerabilities: vec![
                RawFinding { endpoint: "/a".into(), vulnerability: "1".into(), score: 10, ..RawFinding::default() },
                RawFinding { endpoint: "/b".into(), vulnerability: "1".into(), score: 80, ..RawFinding::default() },
            ],
            ..BackendFindings::default()
        };
        let result = aggregate_findings(&session(), AttackCategory::Mitm, &findings);
        assert_eq!(result.threat_level, 30);
        assert_eq!(result.alerts, vec![Alert::for_threat_level(30)]);
        assert_eq!(result.vulnerabilities[0].affected_endpoint, "/b");
        assert_eq!(result.severity, Severity::Medium);
    }
}
