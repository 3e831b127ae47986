//! Catalog-wide rollup of quality results

use crate::config::QualityConfig;
use crate::scoring::quality_scorer::{Grade, MetricsSource, QualityResult, QualityStatus};
use serde::Serialize;
use std::collections::BTreeMap;

/// Failing services named in the insight line before it is truncated
const NAMED_FAILING: usize = 3;

/// Platform health from the average score
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum HealthBand {
    Excellent,
    Good,
    NeedsImprovement,
    Critical,
}

impl HealthBand {
    pub fn from_average(average: f64) -> Self {
        if average >= 85.0 {
            HealthBand::Excellent
        } else if average >= 75.0 {
            HealthBand::Good
        } else if average >= 65.0 {
            HealthBand::NeedsImprovement
        } else {
            HealthBand::Critical
        }
    }

    pub fn describe(&self) -> &'static str {
        match self {
            HealthBand::Excellent => {
                "Platform quality is excellent with strong engineering practices"
            }
            HealthBand::Good => "Platform quality is good with a solid foundation",
            HealthBand::NeedsImprovement => "Platform quality needs improvement in several areas",
            HealthBand::Critical => "Platform quality requires immediate attention",
        }
    }
}

/// Services that need follow-up, grouped by reason. Every list is sorted
/// by name. Coverage, vulnerability and staleness lists only consider
/// measured metrics.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct QualityInsights {
    pub health: HealthBand,
    pub failing: Vec<String>,
    /// Coverage below the target for the service's maturity
    pub low_coverage: Vec<String>,
    pub critical_vulns: Vec<String>,
    /// Last deploy older than the stability staleness threshold
    pub stale: Vec<String>,
    pub with_drift: Vec<String>,
    /// Scored from defaulted metrics
    pub unmeasured: Vec<String>,
}

impl QualityInsights {
    fn from_results(results: &[QualityResult], average: f64, config: &QualityConfig) -> Self {
        let stale_days = config.stability.stale_days;
        Self {
            health: HealthBand::from_average(average),
            failing: sorted_names(results, |r| r.status == QualityStatus::Failing),
            low_coverage: sorted_names(results, |r| {
                is_measured(r) && r.breakdown.metrics.coverage < config.coverage_target(r.maturity)
            }),
            critical_vulns: sorted_names(results, |r| {
                is_measured(r) && r.breakdown.metrics.critical_vulns > 0
            }),
            stale: sorted_names(results, |r| {
                is_measured(r) && r.breakdown.metrics.days_since_deploy > stale_days
            }),
            with_drift: sorted_names(results, |r| r.breakdown.drift_issue_count > 0),
            unmeasured: sorted_names(results, |r| !is_measured(r)),
        }
    }

    /// One line per finding, health first
    pub fn lines(&self) -> Vec<String> {
        let mut lines = vec![self.health.describe().to_string()];

        if !self.failing.is_empty() {
            let named: Vec<&str> = self
                .failing
                .iter()
                .take(NAMED_FAILING)
                .map(String::as_str)
                .collect();
            lines.push(format!(
                "{} services are failing quality standards: {}",
                self.failing.len(),
                named.join(", ")
            ));
        }
        let counted = [
            (&self.low_coverage, "are below their coverage target"),
            (&self.critical_vulns, "have critical vulnerabilities"),
            (&self.stale, "have not been deployed recently"),
            (&self.with_drift, "have drift issues requiring attention"),
            (&self.unmeasured, "declare no quality metrics and were scored with defaults"),
        ];
        for (services, what) in counted {
            if !services.is_empty() {
                lines.push(format!("{} services {}", services.len(), what));
            }
        }
        lines
    }
}

fn is_measured(result: &QualityResult) -> bool {
    result.breakdown.metrics_source == MetricsSource::Measured
}

fn sorted_names(results: &[QualityResult], keep: impl Fn(&QualityResult) -> bool) -> Vec<String> {
    let mut names: Vec<String> = results
        .iter()
        .filter(|r| keep(*r))
        .map(|r| r.service_name.clone())
        .collect();
    names.sort();
    names
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct QualitySummary {
    pub total_services: usize,
    pub average_score: f64,
    pub median_score: f64,
    pub min_score: u32,
    pub max_score: u32,
    /// Services scoring below the passing threshold, sorted by name
    pub below_threshold: Vec<String>,
    /// Every grade is present, with zero counts included
    pub grade_distribution: BTreeMap<Grade, usize>,
    pub insights: QualityInsights,
}

impl QualitySummary {
    /// Summarize `results` against the policy they were scored with.
    ///
    /// An empty input yields zeroed statistics.
    pub fn from_results(results: &[QualityResult], config: &QualityConfig) -> Self {
        let min_score = config.status.min_score;
        let mut grade_distribution: BTreeMap<Grade, usize> =
            Grade::ALL.iter().map(|&g| (g, 0)).collect();
        for result in results {
            *grade_distribution.entry(result.grade).or_default() += 1;
        }

        let mut below_threshold: Vec<String> = results
            .iter()
            .filter(|r| r.score < min_score)
            .map(|r| r.service_name.clone())
            .collect();
        below_threshold.sort();

        let mut scores: Vec<u32> = results.iter().map(|r| r.score).collect();
        scores.sort_unstable();

        let (average_score, median_score) = if scores.is_empty() {
            (0.0, 0.0)
        } else {
            let sum: u64 = scores.iter().map(|&s| u64::from(s)).sum();
            let mid = scores.len() / 2;
            let median = if scores.len() % 2 == 0 {
                f64::from(scores[mid - 1] + scores[mid]) / 2.0
            } else {
                f64::from(scores[mid])
            };
            (sum as f64 / scores.len() as f64, median)
        };

        let insights = QualityInsights::from_results(results, average_score, config);

        Self {
            total_services: results.len(),
            average_score,
            median_score,
            min_score: scores.first().copied().unwrap_or_default(),
            max_score: scores.last().copied().unwrap_or_default(),
            below_threshold,
            grade_distribution,
            insights,
        }
    }
}
