// src/core/classifier.rs

use crate::core::backend::BackendFindings;
use crate::core::error::ScanError;
use crate::core::models::{AttackCategory, ScanConfiguration};
use rand::Rng;
use tracing::{debug, info, warn};

/// Keyword rules checked in order against every target, first match wins.
const HEURISTIC_RULES: &[(&[&str], AttackCategory)] = &[
    (&["login", "auth"], AttackCategory::SqlInjection),
    (&["form", "input"], AttackCategory::Xss),
    (&["api", "data"], AttackCategory::Mitm),
];

/// Decides which attack category the scanned targets are most exposed to.
///
/// Backend findings win whenever they carry a classification; the keyword
/// heuristic only applies when they don't, and a uniformly random category is
/// the last resort when no keyword matches.
pub fn classify(config: &ScanConfiguration, findings: Option<&BackendFindings>) -> Result<AttackCategory, ScanError> {
    classify_with_rng(config, findings, &mut rand::thread_rng())
}

pub fn classify_with_rng<R: Rng>(
    config: &ScanConfiguration,
    findings: Option<&BackendFindings>,
    rng: &mut R,
) -> Result<AttackCategory, ScanError> {
    if let Some(findings) = findings {
        if let Some(category) = from_findings(findings)? {
            info!(category = %category, "Classified from backend findings.");
            return Ok(category);
        }
        debug!("Findings carry no classification, falling back to the target heuristic.");
    }

    if let Some(category) = heuristic(&config.targets) {
        info!(category = %category, "Classified from target keywords.");
        return Ok(category);
    }

    let category = AttackCategory::ALL[rng.gen_range(0..AttackCategory::ALL.len())];
    warn!(category = %category, "No keyword matched, category picked at random.");
    Ok(category)
}

/// The deterministic part of the policy: keyword rules over the targets.
pub fn heuristic(targets: &[String]) -> Option<AttackCategory> {
    let lowered: Vec<String> = targets.iter().map(|t| t.to_lowercase()).collect();
    HEURISTIC_RULES.iter().find_map(|(keywords, category)| {
        lowered
            .iter()
            .any(|target| keywords.iter().any(|keyword| target.contains(keyword)))
            .then_some(*category)
    })
}

/// Reads the category out of backend findings.
///
/// A top-level `classification` is authoritative and must be a known category.
/// Otherwise per-row labels that name a category are tallied, most frequent
/// first, ties going to the label seen first. `Ok(None)` means the findings
/// hold no classification at all.
pub fn from_findings(findings: &BackendFindings) -> Result<Option<AttackCategory>, ScanError> {
    if let Some(label) = findings.classification.as_deref() {
        return AttackCategory::from_label(label)
            .map(Some)
            .ok_or_else(|| ScanError::Classification(format!("unknown attack category '{}'", label)));
    }

    let mut tally: Vec<(AttackCategory, usize)> = Vec::new();
    for finding in &findings.vulnerabilities {
        if let Some(category) = AttackCategory::from_label(&finding.vulnerability) {
            match tally.iter_mut().find(|(c, _)| *c == category) {
                Some((_, count)) => *count += 1,
                None => tally.push((category, 1)),
            }
        }
    }

    // max_by_key keeps the last maximum, so walk the tally in reverse.
    Ok(tally
        .iter()
        .rev()
        .max_by_key(|(_, count)| *count)
        .map(|(category, _)| *category))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::backend::RawFinding;
    use crate::core::models::Severity;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    fn config(targets: &[&str]) -> ScanConfiguration {
        ScanConfiguration::new(targets.iter().copied())
    }

    fn finding(label: &str) -> RawFinding {
        RawFinding {
            vulnerability: label.to_string(),
            ..RawFinding::default()
        }
    }

    #[test]
    fn login_targets_predict_sql_injection() {
        let category = classify(&config(&["https://app.example.com/auth/login"]), None).unwrap();
        assert_eq!(category, AttackCategory::SqlInjection);
        assert_eq!(category.severity(), Severity::Critical);
    }

    #[test]
    fn form_targets_predict_xss() {
        let category = classify(&config(&["https://example.com/contact-form"]), None).unwrap();
        assert_eq!(category, AttackCategory::Xss);
        assert_eq!(category.severity(), Severity::High);
    }

    #[test]
    fn api_targets_predict_mitm() {
        let category = classify(&config(&["https://api.example.com/data"]), None).unwrap();
        assert_eq!(category, AttackCategory::Mitm);
        assert_eq!(category.severity(), Severity::Medium);
    }

    #[test]
    fn rule_order_beats_target_order() {
        let targets = config(&["https://api.example.com", "https://example.com/INPUT", "https://x.com/Auth"]);
        assert_eq!(heuristic(&targets.targets), Some(AttackCategory::SqlInjection));
    }

    #[test]
    fn keywords_do_not_match_across_targets() {
        // "log" + "in" only form "login" when targets are glued together.
        assert_eq!(heuristic(&config(&["https://log.example.com", "in.example.com"]).targets), None);
    }

    #[test]
    fn deterministic_branch_is_idempotent() {
        let cfg = config(&["https://example.com/user-input"]);
        assert_eq!(classify(&cfg, None).unwrap(), classify(&cfg, None).unwrap());
    }

    #[test]
    fn unmatched_targets_fall_back_to_seeded_choice() {
        let cfg = config(&["https://example.com"]);
        let first = classify_with_rng(&cfg, None, &mut StdRng::seed_from_u64(7)).unwrap();
        let second = classify_with_rng(&cfg, None, &mut StdRng::seed_from_u64(7)).unwrap();
        assert_eq!(first, second);
        assert!(AttackCategory::ALL.contains(&first));
    }

    #[test]
    fn random_fallback_reaches_every_category() {
        let cfg = config(&["https://example.com"]);
        let mut rng = StdRng::seed_from_u64(42);
        let seen: Vec<_> = (0..200).map(|_| classify_with_rng(&cfg, None, &mut rng).unwrap()).collect();
        for category in AttackCategory::ALL {
            assert!(seen.contains(&category));
        }
    }

    #[test]
    fn findings_override_the_heuristic() {
        let findings = BackendFindings {
            classification: Some("MITM".to_string()),
            ..BackendFindings::default()
        };
        let category = classify(&config(&["https://example.com/login"]), Some(&findings)).unwrap();
        assert_eq!(category, AttackCategory::Mitm);
    }

    #[test]
    fn row_labels_are_tallied() {
        let findings = BackendFindings {
            vulnerabilities: vec![finding("xss"), finding("sqli"), finding("XSS"), finding("0")],
            ..BackendFindings::default()
        };
        assert_eq!(from_findings(&findings).unwrap(), Some(AttackCategory::Xss));

        let tied = BackendFindings {
            vulnerabilities: vec![finding("mitm"), finding("sqli")],
            ..BackendFindings::default()
        };
        assert_eq!(from_findings(&tied).unwrap(), Some(AttackCategory::Mitm));
    }

    #[test]
    fn findings_without_labels_use_the_heuristic() {
        let findings = BackendFindings {
            vulnerabilities: vec![finding("0"), finding("1")],
            ..BackendFindings::default()
        };
        let category = classify(&config(&["https://example.com/signup-form"]), Some(&findings)).unwrap();
        assert_eq!(category, AttackCategory::Xss);
    }

    #[test]
    fn unknown_top_level_classification_is_an_error() {
        let findings = BackendFindings {
            classification: Some("ddos".to_string()),
            ..BackendFindings::default()
        };
        let err = classify(&config(&["https://example.com/login"]), Some(&findings)).unwrap_err();
        assert!(matches!(err, ScanError::Classification(_)));
    }
}
