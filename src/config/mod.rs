//! Configuration module for the governance engine
//!
//! This module handles:
//! - Layering rules (domain ranks, external whitelist, forbidden edges)
//! - Quality scoring weights, targets, and maturity multipliers
//! - Drift thresholds and exemptions
//! - Engine defaults (worker count)

mod governance_config;

pub use governance_config::{
    load_governance_config, DriftConfig, DriftScoring, EngineConfig, Exemption, ForbiddenEdge,
    GovernanceConfig, GradeThresholds, GraphConfig, PolicyScoring, QualityConfig, QualityWeights,
    SecurityPenalties, StabilityScoring, StatusThresholds,
};
