//! Quality scorer
//!
//! Pure function of (service, drift issue count, configuration). The drift
//! count is an explicit input so scoring never re-runs drift detection.

use crate::config::{GradeThresholds, QualityConfig, StatusThresholds};
use crate::error::GovernanceResult;
use crate::models::{Maturity, QualityMetrics, Service};
use serde::Serialize;
use std::fmt;
use tracing::debug;

/// Letter grade for a quality score
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub enum Grade {
    A,
    B,
    C,
    D,
    F,
}

impl Grade {
    pub const ALL: [Grade; 5] = [Grade::A, Grade::B, Grade::C, Grade::D, Grade::F];

    /// Bucket a score; lower bounds are inclusive, so 80 is B and 90 is A
    pub fn from_score(score: u32, thresholds: &GradeThresholds) -> Self {
        if score >= thresholds.a {
            Grade::A
        } else if score >= thresholds.b {
            Grade::B
        } else if score >= thresholds.c {
            Grade::C
        } else if score >= thresholds.d {
            Grade::D
        } else {
            Grade::F
        }
    }
}

impl fmt::Display for Grade {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let letter = match self {
            Grade::A => "A",
            Grade::B => "B",
            Grade::C => "C",
            Grade::D => "D",
            Grade::F => "F",
        };
        f.write_str(letter)
    }
}

/// Release-gate status derived from the score
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum QualityStatus {
    Passing,
    Warning,
    Failing,
}

impl QualityStatus {
    pub fn from_score(score: u32, thresholds: &StatusThresholds) -> Self {
        if score >= thresholds.min_score {
            QualityStatus::Passing
        } else if score >= thresholds.fail_under {
            QualityStatus::Warning
        } else {
            QualityStatus::Failing
        }
    }
}

impl fmt::Display for QualityStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            QualityStatus::Passing => write!(f, "passing"),
            QualityStatus::Warning => write!(f, "warning"),
            QualityStatus::Failing => write!(f, "failing"),
        }
    }
}

/// Where the metrics behind a score came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum MetricsSource {
    /// The service declared a quality block
    Measured,
    /// No quality block; the missing-data policy was applied
    Defaulted,
}

/// Every component of a score, for transparency
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct QualityBreakdown {
    pub base: f64,
    pub coverage_points: f64,
    pub security_points: f64,
    pub policy_points: f64,
    pub stability_points: f64,
    pub drift_points: f64,
    /// Sum of the above, before the maturity multiplier and clamping
    pub subtotal: f64,
    pub multiplier: f64,
    pub drift_issue_count: usize,
    pub metrics_source: MetricsSource,
    /// Metrics the score was computed from (defaults included)
    pub metrics: QualityMetrics,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct QualityResult {
    pub service_name: String,
    pub maturity: Maturity,
    pub score: u32,
    pub grade: Grade,
    pub status: QualityStatus,
    pub breakdown: QualityBreakdown,
}

/// Scores services against a quality policy
pub struct QualityScorer<'a> {
    config: &'a QualityConfig,
}

impl<'a> QualityScorer<'a> {
    /// Fails if `config` is missing a maturity entry or has inconsistent
    /// thresholds
    pub fn new(config: &'a QualityConfig) -> GovernanceResult<Self> {
        config.validate()?;
        Ok(Self { config })
    }

    pub fn score(&self, service: &Service, drift_issue_count: usize) -> QualityResult {
        let (metrics, metrics_source) = match &service.quality {
            Some(metrics) => (metrics.clone(), MetricsSource::Measured),
            None => (self.defaulted_metrics(), MetricsSource::Defaulted),
        };

        let cfg = self.config;
        let w = &cfg.weights;

        let coverage_points = self.coverage_points(&metrics, service.maturity);

        let vuln_penalty = f64::from(metrics.critical_vulns) * cfg.security.critical_vuln_penalty
            + f64::from(metrics.high_vulns) * cfg.security.high_vuln_penalty;
        let security_points = (100.0 - vuln_penalty).max(0.0) * w.security;

        let policy_points = if metrics.policy_failures == 0 {
            cfg.policy.full_compliance_bonus * w.policy
        } else {
            -(f64::from(metrics.policy_failures) * cfg.policy.penalty_per_failure * w.policy)
        };

        let stability_points = if metrics.days_since_deploy <= cfg.stability.fresh_days {
            cfg.stability.freshness_bonus * w.stability
        } else if metrics.days_since_deploy > cfg.stability.stale_days {
            -(cfg.stability.staleness_penalty * w.stability)
        } else {
            0.0
        };

        let drift_penalty =
            (drift_issue_count as f64 * cfg.drift.penalty_per_issue).min(cfg.drift.max_penalty);
        let drift_points = -(drift_penalty * w.drift);

        let subtotal = cfg.base_score
            + coverage_points
            + security_points
            + policy_points
            + stability_points
            + drift_points;
        let multiplier = cfg.maturity_multiplier(service.maturity);
        let score = (subtotal * multiplier).round().clamp(0.0, 100.0) as u32;

        let grade = Grade::from_score(score, &cfg.grades);
        let status = QualityStatus::from_score(score, &cfg.status);

        debug!(
            "{}: score {} ({}, {}), subtotal {:.2} x {:.2}",
            service.name, score, grade, status, subtotal, multiplier
        );

        QualityResult {
            service_name: service.name.clone(),
            maturity: service.maturity,
            score,
            grade,
            status,
            breakdown: QualityBreakdown {
                base: cfg.base_score,
                coverage_points,
                security_points,
                policy_points,
                stability_points,
                drift_points,
                subtotal,
                multiplier,
                drift_issue_count,
                metrics_source,
                metrics,
            },
        }
    }

    fn coverage_points(&self, metrics: &QualityMetrics, maturity: Maturity) -> f64 {
        let coverage = if metrics.coverage.is_finite() {
            metrics.coverage.max(0.0)
        } else {
            0.0
        };
        let ratio = (coverage / self.config.coverage_target(maturity)).min(1.0);
        ratio * 100.0 * self.config.weights.coverage
    }

    fn defaulted_metrics(&self) -> QualityMetrics {
        QualityMetrics {
            days_since_deploy: self.config.missing_deploy_days,
            ..QualityMetrics::default()
        }
    }

    /// Generate a human-readable explanation of one result
    pub fn explain(&self, result: &QualityResult) -> String {
        let b = &result.breakdown;
        let mut lines = Vec::new();

        lines.push(format!(
            "# {}: {} ({}, {})\n",
            result.service_name, result.score, result.grade, result.status
        ));
        lines.push(format!(
            "- Base: {:.2}\n- Coverage: {:+.2} ({:.0}% against a {:.0}% target for {})",
            b.base,
            b.coverage_points,
            b.metrics.coverage * 100.0,
            self.config.coverage_target(result.maturity) * 100.0,
            result.maturity
        ));
        lines.push(format!(
            "- Security: {:+.2} ({} critical, {} high)",
            b.security_points, b.metrics.critical_vulns, b.metrics.high_vulns
        ));
        lines.push(format!(
            "- Policy: {:+.2} ({} failures)",
            b.policy_points, b.metrics.policy_failures
        ));
        lines.push(format!(
            "- Stability: {:+.2} ({} days since deploy)",
            b.stability_points, b.metrics.days_since_deploy
        ));
        lines.push(format!(
            "- Drift: {:+.2} ({} open issues)",
            b.drift_points, b.drift_issue_count
        ));
        lines.push(format!(
            "- Subtotal {:.2} x {:.2} ({} multiplier)",
            b.subtotal, b.multiplier, result.maturity
        ));
        if b.metrics_source == MetricsSource::Defaulted {
            lines.push(
                "\nNo quality metrics were declared; missing values were scored with defaults."
                    .to_string(),
            );
        }

        lines.join("\n")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::GovernanceError;
    use crate::models::Domain;

    fn metrics(coverage: f64, days_since_deploy: u32) -> QualityMetrics {
        QualityMetrics {
            coverage,
            lint_pass: true,
            days_since_deploy,
            has_lock_file: true,
            ..QualityMetrics::default()
        }
    }

    fn service(maturity: Maturity, quality: Option<QualityMetrics>) -> Service {
        let s = Service::new("gateway", Domain::Access, maturity);
        match quality {
            Some(q) => s.with_quality(q),
            None => s,
        }
    }

    #[test]
    fn test_healthy_stable_service_clamps_to_100() {
        let config = QualityConfig::default();
        let scorer = QualityScorer::new(&config).unwrap();
        let result = scorer.score(&service(Maturity::Stable, Some(metrics(0.85, 5))), 0);

        assert!((result.breakdown.coverage_points - 25.0).abs() < 1e-9);
        assert!((result.breakdown.security_points - 35.0).abs() < 1e-9);
        assert!((result.breakdown.subtotal - 112.75).abs() < 1e-9);
        assert_eq!(result.score, 100);
        assert_eq!(result.grade, Grade::A);
        assert_eq!(result.status, QualityStatus::Passing);
        assert_eq!(result.breakdown.metrics_source, MetricsSource::Measured);
    }

    #[test]
    fn test_grade_boundaries_are_inclusive() {
        let t = GradeThresholds::default();
        assert_eq!(Grade::from_score(100, &t), Grade::A);
        assert_eq!(Grade::from_score(90, &t), Grade::A);
        assert_eq!(Grade::from_score(89, &t), Grade::B);
        assert_eq!(Grade::from_score(80, &t), Grade::B);
        assert_eq!(Grade::from_score(79, &t), Grade::C);
        assert_eq!(Grade::from_score(60, &t), Grade::D);
        assert_eq!(Grade::from_score(59, &t), Grade::F);
        assert_eq!(Grade::from_score(0, &t), Grade::F);
    }

    #[test]
    fn test_missing_metrics_use_defaults() {
        let config = QualityConfig::default();
        let scorer = QualityScorer::new(&config).unwrap();
        let result = scorer.score(&service(Maturity::Stable, None), 0);

        // 50 + 0 + 35 + 2.25 - 1.0
        assert!((result.breakdown.subtotal - 86.25).abs() < 1e-9);
        assert_eq!(result.score, 86);
        assert_eq!(result.grade, Grade::B);
        assert_eq!(result.breakdown.metrics_source, MetricsSource::Defaulted);
        assert_eq!(result.breakdown.metrics.days_since_deploy, 3650);
        assert!(scorer.explain(&result).contains("No quality metrics"));
    }

    #[test]
    fn test_deprecated_multiplier_fails_gate() {
        let config = QualityConfig::default();
        let scorer = QualityScorer::new(&config).unwrap();
        let result = scorer.score(&service(Maturity::Deprecated, None), 0);

        // 86.25 x 0.6 = 51.75
        assert_eq!(result.score, 52);
        assert_eq!(result.grade, Grade::F);
        assert_eq!(result.status, QualityStatus::Failing);
    }

    #[test]
    fn test_vulnerabilities_floor_security_at_zero() {
        let config = QualityConfig::default();
        let scorer = QualityScorer::new(&config).unwrap();
        let mut m = metrics(0.85, 5);
        m.critical_vulns = 5;
        m.high_vulns = 3;
        let result = scorer.score(&service(Maturity::Stable, Some(m)), 0);

        assert_eq!(result.breakdown.security_points, 0.0);
        // 50 + 25 + 0 + 2.25 + 0.5 = 77.75
        assert_eq!(result.score, 78);
        assert_eq!(result.grade, Grade::C);
    }

    #[test]
    fn test_policy_and_stability_penalties() {
        let config = QualityConfig::default();
        let scorer = QualityScorer::new(&config).unwrap();
        let mut m = metrics(0.4, 45);
        m.policy_failures = 3;
        let result = scorer.score(&service(Maturity::Stable, Some(m)), 0);

        assert!((result.breakdown.policy_points + 2.25).abs() < 1e-9);
        assert!((result.breakdown.stability_points + 1.0).abs() < 1e-9);
        // 50 + 12.5 + 35 - 2.25 - 1.0 = 94.25
        assert_eq!(result.score, 94);
    }

    #[test]
    fn test_stability_middle_band_is_neutral() {
        let config = QualityConfig::default();
        let scorer = QualityScorer::new(&config).unwrap();
        let result = scorer.score(&service(Maturity::Stable, Some(metrics(0.5, 30))), 0);
        assert_eq!(result.breakdown.stability_points, 0.0);
    }

    #[test]
    fn test_drift_penalty_is_capped() {
        let config = QualityConfig::default();
        let scorer = QualityScorer::new(&config).unwrap();
        let s = service(Maturity::Stable, Some(metrics(0.5, 10)));

        let two = scorer.score(&s, 2);
        assert!((two.breakdown.drift_points + 1.5).abs() < 1e-9);

        let many = scorer.score(&s, 40);
        assert!((many.breakdown.drift_points + 3.0).abs() < 1e-9);
        assert!(many.score <= two.score);
    }

    #[test]
    fn test_alternate_policy_is_honored() {
        let mut config = QualityConfig::default();
        config.base_score = 0.0;
        config.status.min_score = 50;
        config.status.fail_under = 40;
        let scorer = QualityScorer::new(&config).unwrap();

        let result = scorer.score(&service(Maturity::Stable, Some(metrics(0.85, 5))), 0);
        // 0 + 25 + 35 + 2.25 + 0.5
        assert_eq!(result.score, 63);
        assert_eq!(result.grade, Grade::D);
        assert_eq!(result.status, QualityStatus::Passing);
    }

    #[test]
    fn test_incomplete_policy_is_rejected() {
        let mut config = QualityConfig::default();
        config.coverage_targets.clear();
        assert!(matches!(
            QualityScorer::new(&config),
            Err(GovernanceError::Config(_))
        ));

        let mut config = QualityConfig::default();
        config.maturity_multipliers.remove(&Maturity::Deprecated);
        let err = QualityScorer::new(&config).err().unwrap();
        assert!(err.to_string().contains("'deprecated'"));
    }
}
