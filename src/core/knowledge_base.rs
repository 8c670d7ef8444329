// src/core/knowledge_base.rs

//! Static knowledge about the attack categories the classifier can predict and the
//! local vulnerability catalog used when no backend findings are available.

use crate::core::models::{AttackCategory, CatalogEntry, Severity, Vulnerability, VulnerabilityCatalog};
use once_cell::sync::Lazy;

/// Everything presentation layers need to explain a predicted attack category.
#[derive(Debug)]
pub struct AttackProfile {
    pub category: AttackCategory,
    /// Headline shown on the result card.
    pub title: &'static str,
    /// Fixed per category, not negotiable by findings.
    pub severity: Severity,
    pub description: &'static str,
    pub remediation: &'static [&'static str],
}

static PROFILES: [AttackProfile; 3] = [
    AttackProfile {
        category: AttackCategory::SqlInjection,
        title: "SQL Injection Attack Predicted",
        severity: Severity::Critical,
        description: "Your application login or data endpoints may be vulnerable to SQL injection. Attackers could access or modify your database.",
        remediation: &[
            "Use parameterized queries or prepared statements for all database access.",
            "Sanitize and validate all user inputs, especially in login and data forms.",
            "Restrict database user permissions as much as possible.",
            "Monitor and log database access for suspicious activity.",
        ],
    },
    AttackProfile {
        category: AttackCategory::Xss,
        title: "Cross-Site Scripting (XSS) Predicted",
        severity: Severity::High,
        description: "User input fields may be vulnerable to XSS, allowing attackers to inject malicious scripts into your site.",
        remediation: &[
            "Sanitize and escape all user-generated content before rendering.",
            "Implement Content Security Policy (CSP) headers to restrict script execution.",
            "Use frameworks that auto-escape output (React, Angular, etc.).",
            "Validate input on both client and server sides.",
        ],
    },
    AttackProfile {
        category: AttackCategory::Mitm,
        title: "Man-in-the-Middle (MITM) Attack Predicted",
        severity: Severity::Medium,
        description: "API endpoints or data flows may be susceptible to interception by a Man-in-the-Middle.",
        remediation: &[
            "Enforce HTTPS for all endpoints and redirect all HTTP traffic to HTTPS.",
            "Use strong TLS configurations and keep certificates up to date.",
            "Validate SSL certificates on both client and server sides.",
            "Educate users about phishing and certificate warnings.",
        ],
    },
];

/// Looks up the profile of a category.
pub fn profile(category: AttackCategory) -> &'static AttackProfile {
    match category {
        AttackCategory::SqlInjection => &PROFILES[0],
        AttackCategory::Xss => &PROFILES[1],
        AttackCategory::Mitm => &PROFILES[2],
    }
}

impl AttackCategory {
    pub fn severity(self) -> Severity {
        profile(self).severity
    }
}

#[allow(clippy::too_many_arguments)]
fn entry(
    id: &str,
    name: &str,
    severity: Severity,
    description: &str,
    affected_endpoint: &str,
    cve: Option<&str>,
    fix_available: bool,
    relevant_to: &[AttackCategory],
) -> CatalogEntry {
    CatalogEntry {
        vulnerability: Vulnerability {
            id: id.to_string(),
            name: name.to_string(),
            severity,
            description: description.to_string(),
            affected_endpoint: affected_endpoint.to_string(),
            cve: cve.map(String::from),
            fix_available,
        },
        relevant_to: relevant_to.to_vec(),
    }
}

static BUILTIN_CATALOG: Lazy<VulnerabilityCatalog> = Lazy::new(|| {
    VulnerabilityCatalog::new(vec![
        entry(
            "vuln-1",
            "SQL Injection in Login Form",
            Severity::Critical,
            "The login form is vulnerable to SQL injection attacks, potentially allowing unauthorized access to the database.",
            "/api/auth/login",
            Some("CVE-2022-1234"),
            true,
            &[AttackCategory::SqlInjection],
        ),
        entry(
            "vuln-2",
            "Cross-Site Scripting (XSS)",
            Severity::High,
            "User input is not properly sanitized before being displayed, allowing potential XSS attacks.",
            "/user/profile",
            Some("CVE-2022-5678"),
            true,
            &[AttackCategory::Xss],
        ),
        entry(
            "vuln-3",
            "Outdated SSL Certificate",
            Severity::Medium,
            "The SSL certificate is using an outdated encryption algorithm.",
            "*.example.com",
            None,
            true,
            &[AttackCategory::Mitm],
        ),
        entry(
            "vuln-4",
            "Insecure Cookie Settings",
            Severity::Medium,
            "Cookies do not have the 'secure' flag set, allowing them to be transmitted over unencrypted connections.",
            "Global",
            None,
            true,
            &[AttackCategory::Mitm, AttackCategory::Xss],
        ),
        entry(
            "vuln-5",
            "Missing Rate Limiting",
            Severity::Low,
            "API does not implement rate limiting, potentially allowing brute force attacks.",
            "/api/endpoints",
            None,
            false,
            &[],
        ),
    ])
});

/// The local catalog used by simulated scans.
pub fn builtin_catalog() -> &'static VulnerabilityCatalog {
    &BUILTIN_CATALOG
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn category_severities_are_fixed() {
        assert_eq!(AttackCategory::SqlInjection.severity(), Severity::Critical);
        assert_eq!(AttackCategory::Xss.severity(), Severity::High);
        assert_eq!(AttackCategory::Mitm.severity(), Severity::Medium);
    }

    #[test]
    fn every_category_has_a_matching_profile_with_remediation() {
        for category in AttackCategory::ALL {
            let p = profile(category);
            assert_eq!(p.category, category);
            assert_eq!(p.remediation.len(), 4);
        }
    }

    #[test]
    fn builtin_catalog_ids_are_unique() {
        let catalog = builtin_catalog();
        let mut ids: Vec<_> = catalog.entries().iter().map(|e| e.vulnerability.id.as_str()).collect();
        ids.sort();
        ids.dedup();
        assert_eq!(ids.len(), catalog.len());
    }
}
