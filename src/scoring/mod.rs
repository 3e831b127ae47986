//! Per-service quality scoring
//!
//! Each service gets a 0-100 score built from five weighted signals,
//! scaled by a maturity multiplier.
//!
//! # Scoring Formula
//!
//! ```text
//! coverage  = min(1, coverage / target(maturity)) × 100 × W_coverage
//! security  = max(0, 100 - (critical × 20 + high × 10)) × W_security
//! policy    = failures == 0 ? 15 × W_policy : -(failures × 5 × W_policy)
//! stability = days <= 7 ? 5 × W_stability : (days > 30 ? -10 × W_stability : 0)
//! drift     = -min(drift_issues × 5, 20) × W_drift
//!
//! subtotal  = 50 + coverage + security + policy + stability + drift
//! score     = clamp(round(subtotal × multiplier(maturity)), 0, 100)
//! ```
//!
//! Default weights: coverage 0.25, security 0.35, policy 0.15,
//! stability 0.10, drift 0.15. Every constant above is configurable
//! through [`QualityConfig`](crate::config::QualityConfig).
//!
//! # Grades
//!
//! - A: 90-100
//! - B: 80-89
//! - C: 70-79
//! - D: 60-69
//! - F: below 60
//!
//! # Missing Metrics
//!
//! A service without a quality block is scored as coverage 0, no
//! vulnerabilities, no policy failures and a long-stale deploy. The
//! breakdown records `metrics_source: defaulted` so reports can tell
//! these scores apart from measured ones.

mod quality_scorer;
mod summary;

pub use quality_scorer::{
    Grade, MetricsSource, QualityBreakdown, QualityResult, QualityScorer, QualityStatus,
};
pub use summary::{HealthBand, QualityInsights, QualitySummary};
