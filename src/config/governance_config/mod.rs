//! Governance configuration support
//!
//! Loads rules from `governance.toml` or `.governancerc.json` in a config
//! directory. Every table is optional; omitted values fall back to the
//! platform defaults below.
//!
//! # Configuration Format
//!
//! ```toml
//! # governance.toml
//!
//! [graph]
//! allowed_external = ["redis", "postgresql", "kafka"]
//! forbidden_edges = ["access -> data-processing"]
//!
//! [graph.domain_ranks]
//! infrastructure = 1
//! shared = 2
//! access = 3
//! data-processing = 4
//! analytics = 5
//! ml = 6
//! observability = 7
//! security = 8
//!
//! [quality]
//! base_score = 50.0
//! weights = { coverage = 0.25, security = 0.35, policy = 0.15, stability = 0.10, drift = 0.15 }
//!
//! [quality.coverage_targets]
//! experimental = 0.5
//! beta = 0.7
//! stable = 0.8
//! deprecated = 0.6
//!
//! [drift]
//! stale_days = 90
//! very_stale_days = 180
//!
//! [[drift.exemptions]]
//! service = "gateway"
//! spec_name = "gateway-core"
//! expires_at = "2026-12-31T00:00:00Z"
//!
//! [engine]
//! workers = 8
//! ```
//!
//! A missing file means defaults. A file that exists but fails to parse or
//! to validate is a fatal error.

use crate::error::{GovernanceError, GovernanceResult};
use crate::models::{Domain, Maturity};
use chrono::{DateTime, Utc};
use serde::Deserialize;
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::path::Path;
use tracing::debug;

/// Default whitelist of external systems
pub const DEFAULT_ALLOWED_EXTERNAL: &[&str] = &[
    "redis",
    "clickhouse",
    "postgresql",
    "mongodb",
    "elasticsearch",
    "kafka",
    "rabbitmq",
    "nginx",
];

/// Top-level configuration
#[derive(Debug, Clone, Deserialize, Default)]
pub struct GovernanceConfig {
    #[serde(default)]
    pub graph: GraphConfig,

    #[serde(default)]
    pub quality: QualityConfig,

    #[serde(default)]
    pub drift: DriftConfig,

    #[serde(default)]
    pub engine: EngineConfig,
}

/// Layering rules for the dependency graph
#[derive(Debug, Clone, Deserialize)]
pub struct GraphConfig {
    /// Rank per domain; higher ranks may depend on lower ranks
    #[serde(default = "default_domain_ranks")]
    pub domain_ranks: BTreeMap<Domain, u32>,

    /// External systems services may depend on
    #[serde(default = "default_allowed_external")]
    pub allowed_external: BTreeSet<String>,

    /// Domain pairs that may never be connected, regardless of rank
    #[serde(default)]
    pub forbidden_edges: Vec<ForbiddenEdge>,
}

impl Default for GraphConfig {
    fn default() -> Self {
        Self {
            domain_ranks: default_domain_ranks(),
            allowed_external: default_allowed_external(),
            forbidden_edges: Vec::new(),
        }
    }
}

fn default_domain_ranks() -> BTreeMap<Domain, u32> {
    BTreeMap::from([
        (Domain::Infrastructure, 1),
        (Domain::Shared, 2),
        (Domain::Access, 3),
        (Domain::DataProcessing, 4),
        (Domain::Analytics, 5),
        (Domain::Ml, 6),
        (Domain::Observability, 7),
        (Domain::Security, 8),
    ])
}

fn default_allowed_external() -> BTreeSet<String> {
    DEFAULT_ALLOWED_EXTERNAL.iter().map(|s| s.to_string()).collect()
}

impl GraphConfig {
    /// Rank of a domain. Only valid after [`GraphConfig::validate`],
    /// which guarantees every domain has an entry.
    pub fn rank(&self, domain: Domain) -> u32 {
        self.domain_ranks.get(&domain).copied().unwrap_or_default()
    }

    pub fn is_external_allowed(&self, system: &str) -> bool {
        self.allowed_external.contains(system)
    }

    pub fn is_forbidden(&self, from: Domain, to: Domain) -> bool {
        self.forbidden_edges
            .iter()
            .any(|edge| edge.from == from && edge.to == to)
    }
}

/// A forbidden domain pairing, written `"from -> to"`
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Deserialize)]
#[serde(try_from = "String")]
pub struct ForbiddenEdge {
    pub from: Domain,
    pub to: Domain,
}

impl TryFrom<String> for ForbiddenEdge {
    type Error = String;

    fn try_from(raw: String) -> Result<Self, Self::Error> {
        let (from, to) = raw
            .split_once("->")
            .ok_or_else(|| format!("forbidden edge '{raw}' must be written as 'from -> to'"))?;
        Ok(ForbiddenEdge {
            from: from.parse()?,
            to: to.parse()?,
        })
    }
}

impl fmt::Display for ForbiddenEdge {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} -> {}", self.from, self.to)
    }
}

/// Quality scoring configuration
#[derive(Debug, Clone, Deserialize)]
pub struct QualityConfig {
    #[serde(default = "default_base_score")]
    pub base_score: f64,

    #[serde(default)]
    pub weights: QualityWeights,

    /// Coverage fraction that earns full coverage points, per maturity
    #[serde(default = "default_coverage_targets")]
    pub coverage_targets: BTreeMap<Maturity, f64>,

    /// Final score multiplier, per maturity
    #[serde(default = "default_maturity_multipliers")]
    pub maturity_multipliers: BTreeMap<Maturity, f64>,

    #[serde(default)]
    pub security: SecurityPenalties,

    #[serde(default)]
    pub policy: PolicyScoring,

    #[serde(default)]
    pub stability: StabilityScoring,

    #[serde(default)]
    pub drift: DriftScoring,

    #[serde(default)]
    pub grades: GradeThresholds,

    #[serde(default)]
    pub status: StatusThresholds,

    /// Days-since-deploy assumed when a service has no quality block.
    /// Large enough to land in the stale branch.
    #[serde(default = "default_missing_deploy_days")]
    pub missing_deploy_days: u32,
}

impl Default for QualityConfig {
    fn default() -> Self {
        Self {
            base_score: default_base_score(),
            weights: QualityWeights::default(),
            coverage_targets: default_coverage_targets(),
            maturity_multipliers: default_maturity_multipliers(),
            security: SecurityPenalties::default(),
            policy: PolicyScoring::default(),
            stability: StabilityScoring::default(),
            drift: DriftScoring::default(),
            grades: GradeThresholds::default(),
            status: StatusThresholds::default(),
            missing_deploy_days: default_missing_deploy_days(),
        }
    }
}

fn default_base_score() -> f64 {
    50.0
}

fn default_missing_deploy_days() -> u32 {
    3650
}

fn default_coverage_targets() -> BTreeMap<Maturity, f64> {
    BTreeMap::from([
        (Maturity::Experimental, 0.50),
        (Maturity::Beta, 0.70),
        (Maturity::Stable, 0.80),
        (Maturity::Deprecated, 0.60),
    ])
}

fn default_maturity_multipliers() -> BTreeMap<Maturity, f64> {
    BTreeMap::from([
        (Maturity::Experimental, 0.8),
        (Maturity::Beta, 0.9),
        (Maturity::Stable, 1.0),
        (Maturity::Deprecated, 0.6),
    ])
}

impl QualityConfig {
    /// Only valid after [`QualityConfig::validate`].
    pub fn coverage_target(&self, maturity: Maturity) -> f64 {
        self.coverage_targets.get(&maturity).copied().unwrap_or(1.0)
    }

    /// Only valid after [`QualityConfig::validate`].
    pub fn maturity_multiplier(&self, maturity: Maturity) -> f64 {
        self.maturity_multipliers
            .get(&maturity)
            .copied()
            .unwrap_or(1.0)
    }
}

/// Weights applied to each scoring component
#[derive(Debug, Clone, Deserialize)]
pub struct QualityWeights {
    /// Full coverage earns `100 * coverage` points (default: 0.25)
    #[serde(default = "default_coverage_weight")]
    pub coverage: f64,

    #[serde(default = "default_security_weight")]
    pub security: f64,

    #[serde(default = "default_policy_weight")]
    pub policy: f64,

    #[serde(default = "default_stability_weight")]
    pub stability: f64,

    #[serde(default = "default_drift_weight")]
    pub drift: f64,
}

impl Default for QualityWeights {
    fn default() -> Self {
        Self {
            coverage: default_coverage_weight(),
            security: default_security_weight(),
            policy: default_policy_weight(),
            stability: default_stability_weight(),
            drift: default_drift_weight(),
        }
    }
}

fn default_coverage_weight() -> f64 {
    0.25
}
fn default_security_weight() -> f64 {
    0.35
}
fn default_policy_weight() -> f64 {
    0.15
}
fn default_stability_weight() -> f64 {
    0.10
}
fn default_drift_weight() -> f64 {
    0.15
}

impl QualityWeights {
    fn entries(&self) -> [(&'static str, f64); 5] {
        [
            ("coverage", self.coverage),
            ("security", self.security),
            ("policy", self.policy),
            ("stability", self.stability),
            ("drift", self.drift),
        ]
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SecurityPenalties {
    pub critical_vuln_penalty: f64,
    pub high_vuln_penalty: f64,
}

impl Default for SecurityPenalties {
    fn default() -> Self {
        Self {
            critical_vuln_penalty: 20.0,
            high_vuln_penalty: 10.0,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct PolicyScoring {
    pub full_compliance_bonus: f64,
    pub penalty_per_failure: f64,
}

impl Default for PolicyScoring {
    fn default() -> Self {
        Self {
            full_compliance_bonus: 15.0,
            penalty_per_failure: 5.0,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct StabilityScoring {
    /// Deployed within this many days earns the freshness bonus
    pub fresh_days: u32,
    /// Deployed longer ago than this many days takes the staleness penalty
    pub stale_days: u32,
    pub freshness_bonus: f64,
    pub staleness_penalty: f64,
}

impl Default for StabilityScoring {
    fn default() -> Self {
        Self {
            fresh_days: 7,
            stale_days: 30,
            freshness_bonus: 5.0,
            staleness_penalty: 10.0,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct DriftScoring {
    pub penalty_per_issue: f64,
    pub max_penalty: f64,
}

impl Default for DriftScoring {
    fn default() -> Self {
        Self {
            penalty_per_issue: 5.0,
            max_penalty: 20.0,
        }
    }
}

/// Lower bounds (inclusive) for letter grades; anything below `d` is F
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct GradeThresholds {
    pub a: u32,
    pub b: u32,
    pub c: u32,
    pub d: u32,
}

impl Default for GradeThresholds {
    fn default() -> Self {
        Self {
            a: 90,
            b: 80,
            c: 70,
            d: 60,
        }
    }
}

/// Pass/warn/fail thresholds on the final score
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct StatusThresholds {
    pub min_score: u32,
    pub fail_under: u32,
}

impl Default for StatusThresholds {
    fn default() -> Self {
        Self {
            min_score: 70,
            fail_under: 60,
        }
    }
}

/// Drift classification thresholds and exemptions
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct DriftConfig {
    /// Older than this (in whole days) is moderate staleness
    pub stale_days: i64,
    /// Older than this is high staleness
    pub very_stale_days: i64,
    /// Minor lag strictly above this is moderate spec lag
    pub minor_lag_moderate: u64,
    pub exemptions: Vec<Exemption>,
}

impl Default for DriftConfig {
    fn default() -> Self {
        Self {
            stale_days: 90,
            very_stale_days: 180,
            minor_lag_moderate: 2,
            exemptions: Vec::new(),
        }
    }
}

impl DriftConfig {
    /// The exemption covering `(service, spec)` that is still active at `now`
    pub fn active_exemption(
        &self,
        service: &str,
        spec_name: &str,
        now: DateTime<Utc>,
    ) -> Option<&Exemption> {
        self.exemptions
            .iter()
            .filter(|e| e.service == service && e.spec_name == spec_name)
            .find(|e| e.is_active(now))
    }
}

/// Time-bounded waiver of the spec-lag issue for one spec on one service
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Exemption {
    pub service: String,
    pub spec_name: String,
    pub expires_at: DateTime<Utc>,
    #[serde(default)]
    pub reason: Option<String>,
}

impl Exemption {
    pub fn is_active(&self, now: DateTime<Utc>) -> bool {
        now < self.expires_at
    }
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct EngineConfig {
    /// Worker threads for per-service analysis (0 = auto-detect)
    pub workers: usize,
}

impl GovernanceConfig {
    /// Parse a TOML document and validate it
    pub fn from_toml_str(content: &str) -> GovernanceResult<Self> {
        let config: GovernanceConfig = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Parse a JSON document and validate it
    pub fn from_json_str(content: &str) -> GovernanceResult<Self> {
        let config: GovernanceConfig = serde_json::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Check that the configuration is complete and consistent.
    pub fn validate(&self) -> GovernanceResult<()> {
        self.graph.validate()?;
        self.quality.validate()?;
        self.drift.validate()
    }
}

impl GraphConfig {
    /// Every domain must have a rank; [`GraphConfig::rank`] relies on it.
    pub fn validate(&self) -> GovernanceResult<()> {
        for domain in Domain::ALL {
            if !self.domain_ranks.contains_key(&domain) {
                return Err(GovernanceError::config(format!(
                    "graph.domain_ranks is missing an entry for '{domain}'"
                )));
            }
        }
        if self.allowed_external.iter().any(|s| s.trim().is_empty()) {
            return Err(GovernanceError::config(
                "graph.allowed_external contains an empty entry",
            ));
        }
        Ok(())
    }
}

impl QualityConfig {
    /// Every maturity needs a positive coverage target and multiplier, and
    /// all weights, penalties and thresholds must be consistent.
    pub fn validate(&self) -> GovernanceResult<()> {
        if !self.base_score.is_finite() {
            return Err(GovernanceError::config("quality.base_score must be finite"));
        }
        for (name, weight) in self.weights.entries() {
            if !weight.is_finite() || weight < 0.0 {
                return Err(GovernanceError::config(format!(
                    "quality.weights.{name} must be a non-negative number, got {weight}"
                )));
            }
        }
        for maturity in Maturity::ALL {
            match self.coverage_targets.get(&maturity) {
                Some(t) if t.is_finite() && *t > 0.0 => {}
                Some(t) => {
                    return Err(GovernanceError::config(format!(
                        "quality.coverage_targets.{maturity} must be positive, got {t}"
                    )))
                }
                None => {
                    return Err(GovernanceError::config(format!(
                        "quality.coverage_targets is missing an entry for '{maturity}'"
                    )))
                }
            }
            match self.maturity_multipliers.get(&maturity) {
                Some(m) if m.is_finite() && *m > 0.0 => {}
                Some(m) => {
                    return Err(GovernanceError::config(format!(
                        "quality.maturity_multipliers.{maturity} must be positive, got {m}"
                    )))
                }
                None => {
                    return Err(GovernanceError::config(format!(
                        "quality.maturity_multipliers is missing an entry for '{maturity}'"
                    )))
                }
            }
        }

        let non_negative = [
            ("security.critical_vuln_penalty", self.security.critical_vuln_penalty),
            ("security.high_vuln_penalty", self.security.high_vuln_penalty),
            ("policy.full_compliance_bonus", self.policy.full_compliance_bonus),
            ("policy.penalty_per_failure", self.policy.penalty_per_failure),
            ("stability.freshness_bonus", self.stability.freshness_bonus),
            ("stability.staleness_penalty", self.stability.staleness_penalty),
            ("drift.penalty_per_issue", self.drift.penalty_per_issue),
            ("drift.max_penalty", self.drift.max_penalty),
        ];
        for (name, value) in non_negative {
            if !value.is_finite() || value < 0.0 {
                return Err(GovernanceError::config(format!(
                    "quality.{name} must be a non-negative number, got {value}"
                )));
            }
        }

        if self.stability.fresh_days > self.stability.stale_days {
            return Err(GovernanceError::config(format!(
                "quality.stability.fresh_days ({}) exceeds stale_days ({})",
                self.stability.fresh_days, self.stability.stale_days
            )));
        }

        let g = &self.grades;
        if !(g.a <= 100 && g.a > g.b && g.b > g.c && g.c > g.d) {
            return Err(GovernanceError::config(format!(
                "quality.grades must descend strictly within 0..=100 (a={}, b={}, c={}, d={})",
                g.a, g.b, g.c, g.d
            )));
        }
        if self.status.fail_under > self.status.min_score {
            return Err(GovernanceError::config(format!(
                "quality.status.fail_under ({}) exceeds min_score ({})",
                self.status.fail_under, self.status.min_score
            )));
        }
        Ok(())
    }
}

impl DriftConfig {
    pub fn validate(&self) -> GovernanceResult<()> {
        if self.stale_days < 0 || self.stale_days >= self.very_stale_days {
            return Err(GovernanceError::config(format!(
                "drift.stale_days ({}) must be non-negative and below very_stale_days ({})",
                self.stale_days, self.very_stale_days
            )));
        }
        for exemption in &self.exemptions {
            if exemption.service.trim().is_empty() || exemption.spec_name.trim().is_empty() {
                return Err(GovernanceError::config(
                    "drift.exemptions entries need a service and a spec_name",
                ));
            }
        }
        Ok(())
    }
}

/// Load configuration from a directory.
///
/// Searches for configuration files in this order:
/// 1. `governance.toml`
/// 2. `.governancerc.json`
///
/// Returns the validated default configuration if neither file exists.
pub fn load_governance_config(dir: &Path) -> GovernanceResult<GovernanceConfig> {
    let toml_path = dir.join("governance.toml");
    if toml_path.exists() {
        let config = GovernanceConfig::from_toml_str(&read_config(&toml_path)?)?;
        debug!("Loaded governance config from {}", toml_path.display());
        return Ok(config);
    }

    let json_path = dir.join(".governancerc.json");
    if json_path.exists() {
        let config = GovernanceConfig::from_json_str(&read_config(&json_path)?)?;
        debug!("Loaded governance config from {}", json_path.display());
        return Ok(config);
    }

    debug!("No governance config found in {}, using defaults", dir.display());
    let config = GovernanceConfig::default();
    config.validate()?;
    Ok(config)
}

fn read_config(path: &Path) -> GovernanceResult<String> {
    std::fs::read_to_string(path).map_err(|source| GovernanceError::Io {
        path: path.to_path_buf(),
        source,
    })
}
