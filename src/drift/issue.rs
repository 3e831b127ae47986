//! Drift issue types and the report they are collected into

use crate::models::Severity;
use crate::version::Version;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum DriftIssueType {
    SpecLag,
    MissingLock,
    Staleness,
    UnknownEvent,
    DependencyDivergence,
    InvalidVersion,
}

impl DriftIssueType {
    pub fn as_str(&self) -> &'static str {
        match self {
            DriftIssueType::SpecLag => "spec-lag",
            DriftIssueType::MissingLock => "missing-lock",
            DriftIssueType::Staleness => "staleness",
            DriftIssueType::UnknownEvent => "unknown-event",
            DriftIssueType::DependencyDivergence => "dependency-divergence",
            DriftIssueType::InvalidVersion => "invalid-version",
        }
    }

    /// Follow-up for a batch of high-priority issues of this type
    pub fn action(&self) -> &'static str {
        match self {
            DriftIssueType::SpecLag => "upgrade lagging API contracts, security patches first",
            DriftIssueType::MissingLock => "generate lock files for services that pin contracts",
            DriftIssueType::Staleness => {
                "redeploy or retire services that stopped receiving updates"
            }
            DriftIssueType::UnknownEvent => "register schemas for the unknown events",
            DriftIssueType::DependencyDivergence => {
                "converge external systems on a single major version"
            }
            DriftIssueType::InvalidVersion => "fix malformed versions in the service manifests",
        }
    }
}

impl fmt::Display for DriftIssueType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Where a malformed version string was found
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum VersionField {
    ApiContract,
    ExternalDependency,
}

/// Type-specific facts behind an issue
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "kebab-case")]
pub enum DriftDetail {
    SpecLag {
        pinned: Version,
        latest: Version,
        major_lag: u64,
        minor_lag: u64,
        security_patch_available: bool,
        deprecated: bool,
    },
    MissingLock {
        contract_count: usize,
    },
    Staleness {
        days_old: i64,
    },
    UnknownEvent {
        event: String,
    },
    DependencyDivergence {
        system: String,
        version: String,
        major: u64,
        /// Pins of the same system with a different major, sorted
        other_versions: Vec<String>,
    },
    InvalidVersion {
        field: VersionField,
        raw: String,
        error: String,
    },
}

impl DriftDetail {
    pub fn issue_type(&self) -> DriftIssueType {
        match self {
            DriftDetail::SpecLag { .. } => DriftIssueType::SpecLag,
            DriftDetail::MissingLock { .. } => DriftIssueType::MissingLock,
            DriftDetail::Staleness { .. } => DriftIssueType::Staleness,
            DriftDetail::UnknownEvent { .. } => DriftIssueType::UnknownEvent,
            DriftDetail::DependencyDivergence { .. } => DriftIssueType::DependencyDivergence,
            DriftDetail::InvalidVersion { .. } => DriftIssueType::InvalidVersion,
        }
    }

    fn remediation(&self, subject: &str, severity: Severity) -> String {
        match self {
            DriftDetail::SpecLag {
                latest,
                major_lag,
                security_patch_available,
                deprecated,
                ..
            } => {
                let mut text = if *major_lag > 0 && *security_patch_available {
                    format!("Upgrade {subject} to {latest} now; it includes a security patch.")
                } else if *major_lag > 0 {
                    let plural = if *major_lag == 1 { "" } else { "s" };
                    format!(
                        "{subject} is {major_lag} major version{plural} behind. \
                         Review breaking changes before upgrading to {latest}."
                    )
                } else if severity >= Severity::Moderate {
                    format!("Upgrade {subject} to the latest minor version ({latest}).")
                } else {
                    format!("Minor version lag. Upgrade {subject} to {latest} when convenient.")
                };
                if *deprecated {
                    text.push_str(" The spec is deprecated; plan a migration off it.");
                }
                text
            }
            DriftDetail::MissingLock { .. } => {
                "Generate specs.lock.json to pin exact contract versions.".to_string()
            }
            DriftDetail::Staleness { .. } if severity >= Severity::High => {
                "Service version is very stale. Update it immediately.".to_string()
            }
            DriftDetail::Staleness { .. } => {
                "Service version is stale. Plan an update in the next sprint.".to_string()
            }
            DriftDetail::UnknownEvent { event } => format!(
                "Register a schema for '{event}' or rename it to follow the event naming convention."
            ),
            DriftDetail::DependencyDivergence { system, .. } => {
                format!("Align every service on one major version of {system}.")
            }
            DriftDetail::InvalidVersion { field, .. } => match field {
                VersionField::ApiContract => {
                    "Fix the contract version in the service manifest (expected MAJOR.MINOR.PATCH)."
                        .to_string()
                }
                VersionField::ExternalDependency => {
                    "Fix the dependency version in the service manifest (expected a numeric major)."
                        .to_string()
                }
            },
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DriftIssue {
    pub service_name: String,
    pub issue_type: DriftIssueType,
    pub severity: Severity,
    /// Spec, event, or external system the issue is about; empty for
    /// service-level issues
    pub subject: String,
    pub message: String,
    /// What the owning team should do about it
    pub remediation: String,
    pub detail: DriftDetail,
}

impl DriftIssue {
    /// The issue type and remediation follow from `detail`
    pub(crate) fn new(
        service_name: &str,
        severity: Severity,
        subject: &str,
        message: String,
        detail: DriftDetail,
    ) -> Self {
        Self {
            service_name: service_name.to_string(),
            issue_type: detail.issue_type(),
            severity,
            subject: subject.to_string(),
            message,
            remediation: detail.remediation(subject, severity),
            detail,
        }
    }

    fn sort_key(&self) -> (&str, DriftIssueType, &str, &str) {
        (
            self.service_name.as_str(),
            self.issue_type,
            self.subject.as_str(),
            self.message.as_str(),
        )
    }
}

/// An issue silenced by an active exemption, kept for audit
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SuppressedIssue {
    pub issue: DriftIssue,
    pub expires_at: DateTime<Utc>,
    pub reason: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DriftSummary {
    pub total_issues: usize,
    pub suppressed: usize,
    /// Active critical and high issues
    pub high_priority: usize,
    pub by_severity: BTreeMap<Severity, usize>,
    pub by_type: BTreeMap<DriftIssueType, usize>,
    /// No active critical or high issue anywhere in the catalog
    pub overall_healthy: bool,
}

/// High-priority issues of one type and what to do about them
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Recommendation {
    pub issue_type: DriftIssueType,
    pub count: usize,
    pub action: String,
}

impl Recommendation {
    pub fn describe(&self) -> String {
        format!(
            "{} high-priority {} issues: {}",
            self.count, self.issue_type, self.action
        )
    }
}

/// Drift findings for a whole catalog
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DriftReport {
    /// Active issues, sorted by service, type, then subject
    pub issues: Vec<DriftIssue>,
    pub suppressed: Vec<SuppressedIssue>,
    pub summary: DriftSummary,
    /// One entry per issue type with active critical or high issues
    pub recommendations: Vec<Recommendation>,
}

impl DriftReport {
    pub(crate) fn new(mut issues: Vec<DriftIssue>, mut suppressed: Vec<SuppressedIssue>) -> Self {
        issues.sort_by(|a, b| a.sort_key().cmp(&b.sort_key()));
        suppressed.sort_by(|a, b| a.issue.sort_key().cmp(&b.issue.sort_key()));

        let mut by_severity = BTreeMap::new();
        let mut by_type = BTreeMap::new();
        let mut high_by_type: BTreeMap<DriftIssueType, usize> = BTreeMap::new();
        for issue in &issues {
            *by_severity.entry(issue.severity).or_insert(0) += 1;
            *by_type.entry(issue.issue_type).or_insert(0) += 1;
            if issue.severity >= Severity::High {
                *high_by_type.entry(issue.issue_type).or_insert(0) += 1;
            }
        }
        let high_priority: usize = high_by_type.values().sum();

        let recommendations = high_by_type
            .into_iter()
            .map(|(issue_type, count)| Recommendation {
                issue_type,
                count,
                action: issue_type.action().to_string(),
            })
            .collect();

        let summary = DriftSummary {
            total_issues: issues.len(),
            suppressed: suppressed.len(),
            high_priority,
            by_severity,
            by_type,
            overall_healthy: high_priority == 0,
        };

        Self {
            issues,
            suppressed,
            summary,
            recommendations,
        }
    }

    /// Recommendations as report lines, headed by the high-priority total
    pub fn recommendation_lines(&self) -> Vec<String> {
        if self.summary.high_priority == 0 {
            return if self.issues.is_empty() {
                Vec::new()
            } else {
                vec!["No critical or high drift issues detected".to_string()]
            };
        }
        let mut lines = vec![format!(
            "{} high-priority issues require immediate attention",
            self.summary.high_priority
        )];
        lines.extend(self.recommendations.iter().map(|r| format!("  - {}", r.describe())));
        lines
    }

    /// Active issue count per service; services without issues are absent
    pub fn issue_counts(&self) -> BTreeMap<&str, usize> {
        let mut counts = BTreeMap::new();
        for issue in &self.issues {
            *counts.entry(issue.service_name.as_str()).or_insert(0) += 1;
        }
        counts
    }

    pub fn issues_for<'a>(&'a self, service: &'a str) -> impl Iterator<Item = &'a DriftIssue> {
        self.issues.iter().filter(move |i| i.service_name == service)
    }

    /// Issues ordered most severe first, then by service, type, and subject
    pub fn sorted_by_severity(&self) -> Vec<&DriftIssue> {
        let mut sorted: Vec<&DriftIssue> = self.issues.iter().collect();
        sorted.sort_by(|a, b| {
            b.severity
                .cmp(&a.severity)
                .then_with(|| a.sort_key().cmp(&b.sort_key()))
        });
        sorted
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn issue(service: &str, issue_type: DriftIssueType, severity: Severity) -> DriftIssue {
        DriftIssue {
            service_name: service.to_string(),
            issue_type,
            severity,
            subject: String::new(),
            message: format!("{service} {issue_type}"),
            remediation: String::new(),
            detail: DriftDetail::Staleness { days_old: 0 },
        }
    }

    #[test]
    fn test_report_orders_and_counts() {
        let report = DriftReport::new(
            vec![
                issue("zeta", DriftIssueType::Staleness, Severity::Moderate),
                issue("alpha", DriftIssueType::UnknownEvent, Severity::High),
                issue("alpha", DriftIssueType::MissingLock, Severity::High),
            ],
            Vec::new(),
        );

        let order: Vec<(&str, DriftIssueType)> = report
            .issues
            .iter()
            .map(|i| (i.service_name.as_str(), i.issue_type))
            .collect();
        assert_eq!(
            order,
            vec![
                ("alpha", DriftIssueType::MissingLock),
                ("alpha", DriftIssueType::UnknownEvent),
                ("zeta", DriftIssueType::Staleness),
            ]
        );
        assert_eq!(report.summary.by_severity[&Severity::High], 2);
        assert_eq!(report.summary.by_type[&DriftIssueType::Staleness], 1);
        assert!(!report.summary.overall_healthy);
        assert_eq!(report.issue_counts()["alpha"], 2);
        assert_eq!(report.issues_for("zeta").count(), 1);
    }

    #[test]
    fn test_sorted_by_severity() {
        let report = DriftReport::new(
            vec![
                issue("a", DriftIssueType::Staleness, Severity::Moderate),
                issue("b", DriftIssueType::SpecLag, Severity::Critical),
                issue("a", DriftIssueType::InvalidVersion, Severity::Low),
            ],
            Vec::new(),
        );
        let severities: Vec<Severity> = report
            .sorted_by_severity()
            .iter()
            .map(|i| i.severity)
            .collect();
        assert_eq!(
            severities,
            vec![Severity::Critical, Severity::Moderate, Severity::Low]
        );
    }

    #[test]
    fn test_empty_report_is_healthy() {
        let report = DriftReport::new(Vec::new(), Vec::new());
        assert!(report.summary.overall_healthy);
        assert!(report.issue_counts().is_empty());
    }

    #[test]
    fn test_issue_type_serializes_kebab_case() {
        assert_eq!(
            serde_json::to_string(&DriftIssueType::InvalidVersion).unwrap(),
            "\"invalid-version\""
        );
        assert_eq!(
            serde_json::to_string(&DriftIssueType::DependencyDivergence).unwrap(),
            "\"dependency-divergence\""
        );
        assert_eq!(DriftIssueType::DependencyDivergence.as_str(), "dependency-divergence");
    }

    #[test]
    fn test_new_derives_type_and_remediation_from_detail() {
        let lag = |major_lag: u64, minor_lag: u64, patch: bool, severity: Severity| {
            DriftIssue::new(
                "gateway",
                severity,
                "gateway-core",
                String::new(),
                DriftDetail::SpecLag {
                    pinned: Version::new(1, 0, 0),
                    latest: Version::new(1 + major_lag, minor_lag, 0),
                    major_lag,
                    minor_lag,
                    security_patch_available: patch,
                    deprecated: false,
                },
            )
        };

        let critical = lag(1, 0, true, Severity::Critical);
        assert_eq!(critical.issue_type, DriftIssueType::SpecLag);
        assert!(critical.remediation.contains("security patch"));
        assert!(lag(2, 0, false, Severity::High)
            .remediation
            .contains("2 major versions behind"));
        assert!(lag(0, 3, false, Severity::Moderate)
            .remediation
            .contains("latest minor version (1.3.0)"));
        assert!(lag(0, 1, false, Severity::Low)
            .remediation
            .contains("when convenient"));

        let very_stale = DriftIssue::new(
            "db",
            Severity::High,
            "",
            String::new(),
            DriftDetail::Staleness { days_old: 200 },
        );
        let stale = DriftIssue::new(
            "db",
            Severity::Moderate,
            "",
            String::new(),
            DriftDetail::Staleness { days_old: 100 },
        );
        assert!(very_stale.remediation.contains("immediately"));
        assert!(stale.remediation.contains("next sprint"));

        let divergence = DriftIssue::new(
            "ingest",
            Severity::Moderate,
            "kafka",
            String::new(),
            DriftDetail::DependencyDivergence {
                system: "kafka".to_string(),
                version: "2.8.0".to_string(),
                major: 2,
                other_versions: vec!["3.6.0".to_string()],
            },
        );
        assert_eq!(divergence.issue_type, DriftIssueType::DependencyDivergence);
        assert_eq!(
            divergence.remediation,
            "Align every service on one major version of kafka."
        );
    }

    #[test]
    fn test_recommendations_group_high_priority_by_type() {
        let report = DriftReport::new(
            vec![
                issue("a", DriftIssueType::SpecLag, Severity::Critical),
                issue("b", DriftIssueType::SpecLag, Severity::High),
                issue("a", DriftIssueType::MissingLock, Severity::High),
                issue("c", DriftIssueType::Staleness, Severity::Moderate),
                issue("c", DriftIssueType::InvalidVersion, Severity::Low),
            ],
            Vec::new(),
        );

        assert_eq!(report.summary.high_priority, 3);
        let grouped: Vec<(DriftIssueType, usize)> = report
            .recommendations
            .iter()
            .map(|r| (r.issue_type, r.count))
            .collect();
        assert_eq!(
            grouped,
            vec![(DriftIssueType::SpecLag, 2), (DriftIssueType::MissingLock, 1)]
        );
        assert_eq!(
            report.recommendation_lines(),
            vec![
                "3 high-priority issues require immediate attention".to_string(),
                format!(
                    "  - 2 high-priority spec-lag issues: {}",
                    DriftIssueType::SpecLag.action()
                ),
                format!(
                    "  - 1 high-priority missing-lock issues: {}",
                    DriftIssueType::MissingLock.action()
                ),
            ]
        );
    }

    #[test]
    fn test_only_low_issues_yield_no_recommendations() {
        let report = DriftReport::new(
            vec![issue("a", DriftIssueType::Staleness, Severity::Moderate)],
            Vec::new(),
        );
        assert!(report.recommendations.is_empty());
        assert!(report.summary.overall_healthy);
        assert_eq!(
            report.recommendation_lines(),
            vec!["No critical or high drift issues detected".to_string()]
        );
        assert!(DriftReport::new(Vec::new(), Vec::new())
            .recommendation_lines()
            .is_empty());
    }
}
