//! Governance analysis engine
//!
//! Runs the three components over one catalog snapshot:
//! graph validation and drift detection side by side, then quality scoring
//! fed with each service's active drift issue count. The engine owns a
//! rayon pool so callers can bound parallelism; output is identical at any
//! worker count.

use crate::catalog::Catalog;
use crate::config::GovernanceConfig;
use crate::drift::{DriftDetector, DriftReport, EventRegistry, SpecRegistry};
use crate::error::GovernanceResult;
use crate::graph::{GraphValidator, ValidationReport};
use crate::scoring::{QualityResult, QualityScorer, QualitySummary};
use chrono::{DateTime, Utc};
use rayon::prelude::*;
use serde::Serialize;
use std::time::Instant;
use tracing::info;

/// Externally supplied lookups for one analysis pass
#[derive(Debug, Clone, Default)]
pub struct AnalysisInputs {
    pub spec_registry: SpecRegistry,
    pub event_registry: EventRegistry,
}

/// Everything one pass produces
#[derive(Debug, Clone, Serialize)]
pub struct GovernanceReport {
    pub generated_at: DateTime<Utc>,
    pub validation: ValidationReport,
    pub drift: DriftReport,
    /// One result per service, in name order
    pub quality: Vec<QualityResult>,
    pub quality_summary: QualitySummary,
}

impl GovernanceReport {
    pub fn quality_for(&self, service: &str) -> Option<&QualityResult> {
        self.quality
            .binary_search_by(|r| r.service_name.as_str().cmp(service))
            .ok()
            .map(|i| &self.quality[i])
    }
}

pub struct GovernanceEngine {
    config: GovernanceConfig,
    pool: rayon::ThreadPool,
    workers: usize,
}

impl GovernanceEngine {
    /// Create an engine, rejecting invalid configuration before any catalog
    /// is processed.
    ///
    /// `config.engine.workers == 0` auto-detects, capped at 16 threads.
    pub fn new(config: GovernanceConfig) -> GovernanceResult<Self> {
        config.validate()?;

        let workers = if config.engine.workers == 0 {
            std::thread::available_parallelism()
                .map(|n| n.get())
                .unwrap_or(4)
                .min(16)
        } else {
            config.engine.workers
        };
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(workers)
            .build()?;

        Ok(Self {
            config,
            pool,
            workers,
        })
    }

    pub fn config(&self) -> &GovernanceConfig {
        &self.config
    }

    pub fn workers(&self) -> usize {
        self.workers
    }

    /// Analyze one catalog snapshot at time `now`
    pub fn analyze(
        &self,
        catalog: &Catalog,
        inputs: &AnalysisInputs,
        now: DateTime<Utc>,
    ) -> GovernanceResult<GovernanceReport> {
        let start = Instant::now();
        info!(
            "Starting governance analysis of {} services on {} workers",
            catalog.len(),
            self.workers
        );

        let validator = GraphValidator::new(&self.config.graph)?;
        let detector = DriftDetector::new(
            &self.config.drift,
            &inputs.spec_registry,
            &inputs.event_registry,
        )?;
        let scorer = QualityScorer::new(&self.config.quality)?;

        let (validation, drift, quality) = self.pool.install(|| {
            let (validation, drift) = rayon::join(
                || validator.validate(catalog),
                || detector.detect(catalog, now),
            );

            let counts = drift.issue_counts();
            let quality: Vec<QualityResult> = catalog
                .services()
                .par_iter()
                .map(|service| {
                    let drift_issues = counts.get(service.name.as_str()).copied().unwrap_or(0);
                    scorer.score(service, drift_issues)
                })
                .collect();

            (validation, drift, quality)
        });

        let quality_summary = QualitySummary::from_results(&quality, &self.config.quality);

        info!(
            "Governance analysis complete in {:?}: graph {}, {} drift issues, average score {:.1}",
            start.elapsed(),
            if validation.ok { "ok" } else { "has violations" },
            drift.summary.total_issues,
            quality_summary.average_score
        );

        Ok(GovernanceReport {
            generated_at: now,
            validation,
            drift,
            quality,
            quality_summary,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::EngineConfig;
    use crate::error::GovernanceError;
    use crate::models::{Domain, Maturity, Service};
    use chrono::TimeZone;

    #[test]
    fn test_engine_default_workers() {
        let engine = GovernanceEngine::new(GovernanceConfig::default()).unwrap();
        assert!(engine.workers() > 0);
        assert!(engine.workers() <= 16);
    }

    #[test]
    fn test_engine_explicit_workers() {
        let config = GovernanceConfig {
            engine: EngineConfig { workers: 3 },
            ..GovernanceConfig::default()
        };
        assert_eq!(GovernanceEngine::new(config).unwrap().workers(), 3);
    }

    #[test]
    fn test_invalid_config_is_rejected_up_front() {
        let mut config = GovernanceConfig::default();
        config.graph.domain_ranks.remove(&Domain::Ml);
        assert!(matches!(
            GovernanceEngine::new(config),
            Err(GovernanceError::Config(_))
        ));
    }

    #[test]
    fn test_drift_counts_feed_scoring() {
        let now = Utc.with_ymd_and_hms(2026, 3, 1, 0, 0, 0).unwrap();
        let catalog = Catalog::new(vec![
            Service::new("fresh", Domain::Shared, Maturity::Stable).with_last_update(now),
            // Epoch update: one high staleness issue
            Service::new("stale", Domain::Shared, Maturity::Stable),
        ])
        .unwrap();

        let engine = GovernanceEngine::new(GovernanceConfig::default()).unwrap();
        let report = engine
            .analyze(&catalog, &AnalysisInputs::default(), now)
            .unwrap();

        assert!(report.validation.ok);
        assert_eq!(report.drift.issues.len(), 1);
        let fresh = report.quality_for("fresh").unwrap();
        let stale = report.quality_for("stale").unwrap();
        assert_eq!(fresh.breakdown.drift_issue_count, 0);
        assert_eq!(stale.breakdown.drift_issue_count, 1);
        // 86.25 vs 86.25 - 0.75
        assert_eq!(fresh.score, 86);
        assert_eq!(stale.score, 86);
        assert!(stale.breakdown.subtotal < fresh.breakdown.subtotal);
        assert_eq!(report.quality_summary.total_services, 2);
        assert_eq!(report.quality_summary.insights.with_drift, vec!["stale"]);
        assert_eq!(report.drift.summary.high_priority, 1);
        assert_eq!(report.drift.recommendations.len(), 1);
    }
}
