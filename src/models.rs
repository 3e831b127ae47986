//! Core data models for the platform catalog
//!
//! These types describe one service manifest after schema validation.
//! They carry invariants but no analysis behavior; the graph validator,
//! quality scorer, and drift detector all read them through an immutable
//! [`Catalog`](crate::catalog::Catalog) snapshot.

use crate::version::Version;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

/// Architectural layer a service belongs to.
///
/// The set of layers is closed. Their relative rank is configuration
/// (see [`GraphConfig::domain_ranks`](crate::config::GraphConfig)), so an
/// unrecognized domain string fails at parse time instead of silently
/// falling through a rank lookup.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Domain {
    Infrastructure,
    Shared,
    Access,
    DataProcessing,
    Analytics,
    Ml,
    Observability,
    Security,
}

impl Domain {
    pub const ALL: [Domain; 8] = [
        Domain::Infrastructure,
        Domain::Shared,
        Domain::Access,
        Domain::DataProcessing,
        Domain::Analytics,
        Domain::Ml,
        Domain::Observability,
        Domain::Security,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Domain::Infrastructure => "infrastructure",
            Domain::Shared => "shared",
            Domain::Access => "access",
            Domain::DataProcessing => "data-processing",
            Domain::Analytics => "analytics",
            Domain::Ml => "ml",
            Domain::Observability => "observability",
            Domain::Security => "security",
        }
    }
}

impl fmt::Display for Domain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Domain {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let needle = s.trim();
        Domain::ALL
            .iter()
            .copied()
            .find(|d| d.as_str() == needle)
            .ok_or_else(|| format!("unknown domain '{s}'"))
    }
}

/// Lifecycle stage of a service; scales quality expectations
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Maturity {
    Experimental,
    Beta,
    Stable,
    Deprecated,
}

impl Maturity {
    pub const ALL: [Maturity; 4] = [
        Maturity::Experimental,
        Maturity::Beta,
        Maturity::Stable,
        Maturity::Deprecated,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Maturity::Experimental => "experimental",
            Maturity::Beta => "beta",
            Maturity::Stable => "stable",
            Maturity::Deprecated => "deprecated",
        }
    }
}

impl fmt::Display for Maturity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Maturity {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let needle = s.trim();
        Maturity::ALL
            .iter()
            .copied()
            .find(|m| m.as_str() == needle)
            .ok_or_else(|| format!("unknown maturity '{s}'"))
    }
}

/// Severity levels for drift issues
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default,
)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    #[default]
    Low,
    Moderate,
    High,
    Critical,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Severity::Low => write!(f, "low"),
            Severity::Moderate => write!(f, "moderate"),
            Severity::High => write!(f, "high"),
            Severity::Critical => write!(f, "critical"),
        }
    }
}

/// A pinned API contract, written `spec-name@version` in manifests.
///
/// The pinned version stays a raw string: a malformed pin is a per-contract
/// drift issue, not a reason to reject the whole manifest.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ApiContract {
    pub spec_name: String,
    pub pinned_version: String,
}

impl ApiContract {
    pub fn new(spec_name: impl Into<String>, pinned_version: impl Into<String>) -> Self {
        Self {
            spec_name: spec_name.into(),
            pinned_version: pinned_version.into(),
        }
    }
}

impl TryFrom<String> for ApiContract {
    type Error = String;

    fn try_from(raw: String) -> Result<Self, Self::Error> {
        match raw.split_once('@') {
            Some((name, version)) if !name.trim().is_empty() => {
                Ok(ApiContract::new(name.trim(), version.trim()))
            }
            _ => Err(format!("api contract '{raw}' must be written as name@version")),
        }
    }
}

impl From<ApiContract> for String {
    fn from(contract: ApiContract) -> Self {
        format!("{}@{}", contract.spec_name, contract.pinned_version)
    }
}

/// An external system a service depends on, optionally with a version pin
/// (`kafka` or `kafka@3.5.1`).
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub struct ExternalDependency {
    pub system: String,
    pub version: Option<String>,
}

impl ExternalDependency {
    pub fn new(system: impl Into<String>) -> Self {
        Self {
            system: system.into(),
            version: None,
        }
    }

    pub fn pinned(system: impl Into<String>, version: impl Into<String>) -> Self {
        Self {
            system: system.into(),
            version: Some(version.into()),
        }
    }
}

impl From<String> for ExternalDependency {
    fn from(raw: String) -> Self {
        match raw.split_once('@') {
            Some((system, version)) => ExternalDependency::pinned(system.trim(), version.trim()),
            None => ExternalDependency::new(raw.trim()),
        }
    }
}

impl From<ExternalDependency> for String {
    fn from(dep: ExternalDependency) -> Self {
        match dep.version {
            Some(version) => format!("{}@{}", dep.system, version),
            None => dep.system,
        }
    }
}

impl fmt::Display for ExternalDependency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.version {
            Some(version) => write!(f, "{}@{}", self.system, version),
            None => f.write_str(&self.system),
        }
    }
}

/// Declared dependencies of a service
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Dependencies {
    /// Names of other catalog services
    #[serde(default)]
    pub internal: BTreeSet<String>,
    /// External systems (databases, brokers, ...)
    #[serde(default)]
    pub external: BTreeSet<ExternalDependency>,
}

/// Measured quality signals for a service
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct QualityMetrics {
    /// Test coverage fraction in [0, 1]
    #[serde(default)]
    pub coverage: f64,
    #[serde(default)]
    pub lint_pass: bool,
    #[serde(default)]
    pub critical_vulns: u32,
    #[serde(default)]
    pub high_vulns: u32,
    #[serde(default)]
    pub policy_failures: u32,
    #[serde(default)]
    pub policy_warnings: u32,
    #[serde(default)]
    pub days_since_deploy: u32,
    #[serde(default)]
    pub has_lock_file: bool,
    #[serde(default)]
    pub signed_images: bool,
}

/// One catalog entry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Service {
    pub name: String,
    pub domain: Domain,
    pub maturity: Maturity,
    pub version: Version,
    #[serde(default)]
    pub api_contracts: Vec<ApiContract>,
    #[serde(default)]
    pub events_in: BTreeSet<String>,
    #[serde(default)]
    pub events_out: BTreeSet<String>,
    #[serde(default)]
    pub dependencies: Dependencies,
    #[serde(default)]
    pub quality: Option<QualityMetrics>,
    pub last_update: DateTime<Utc>,
}

impl Service {
    /// Minimal service: version 1.0.0, no contracts, events, dependencies,
    /// or quality block, last updated at the Unix epoch.
    pub fn new(name: impl Into<String>, domain: Domain, maturity: Maturity) -> Self {
        Self {
            name: name.into(),
            domain,
            maturity,
            version: Version::new(1, 0, 0),
            api_contracts: Vec::new(),
            events_in: BTreeSet::new(),
            events_out: BTreeSet::new(),
            dependencies: Dependencies::default(),
            quality: None,
            last_update: DateTime::<Utc>::UNIX_EPOCH,
        }
    }

    pub fn with_version(mut self, version: Version) -> Self {
        self.version = version;
        self
    }

    pub fn with_contract(mut self, spec_name: &str, pinned_version: &str) -> Self {
        self.api_contracts
            .push(ApiContract::new(spec_name, pinned_version));
        self
    }

    pub fn with_internal_dep(mut self, name: &str) -> Self {
        self.dependencies.internal.insert(name.to_string());
        self
    }

    pub fn with_external_dep(mut self, dep: ExternalDependency) -> Self {
        self.dependencies.external.insert(dep);
        self
    }

    pub fn with_event_in(mut self, event: &str) -> Self {
        self.events_in.insert(event.to_string());
        self
    }

    pub fn with_event_out(mut self, event: &str) -> Self {
        self.events_out.insert(event.to_string());
        self
    }

    pub fn with_quality(mut self, quality: QualityMetrics) -> Self {
        self.quality = Some(quality);
        self
    }

    pub fn with_last_update(mut self, last_update: DateTime<Utc>) -> Self {
        self.last_update = last_update;
        self
    }

    /// Whether a lock file was observed; unknown counts as absent
    pub fn has_lock_file(&self) -> bool {
        self.quality.as_ref().is_some_and(|q| q.has_lock_file)
    }

    /// Every event the service consumes or produces, deduplicated and sorted
    pub fn all_events(&self) -> BTreeSet<&str> {
        self.events_in
            .iter()
            .chain(self.events_out.iter())
            .map(String::as_str)
            .collect()
    }
}
