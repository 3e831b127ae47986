//! Governance engine for a platform service catalog
//!
//! Given an immutable [`Catalog`] snapshot, the engine:
//! - validates the internal dependency graph (cycles, layer direction,
//!   forbidden domain pairs, external whitelist)
//! - scores each service's quality from coverage, security, policy,
//!   stability, and drift signals
//! - detects drift against a spec registry and an event registry, with a
//!   remediation per issue and recommendations per issue type
//!
//! The components can also be used on their own; each constructor
//! validates its section of the configuration first.
//!
//! Every component is a pure, read-only function of its inputs and
//! configuration. Results are sorted so identical inputs give identical
//! output at any worker count.
//!
//! ```no_run
//! use catalog_governance::{
//!     load_governance_config, AnalysisInputs, Catalog, GovernanceEngine,
//! };
//! # fn main() -> catalog_governance::GovernanceResult<()> {
//! let config = load_governance_config(std::path::Path::new("."))?;
//! let engine = GovernanceEngine::new(config)?;
//! let catalog = Catalog::new(Vec::new())?;
//! let report = engine.analyze(&catalog, &AnalysisInputs::default(), chrono::Utc::now())?;
//! println!("{}", serde_json::to_string_pretty(&report)?);
//! # Ok(())
//! # }
//! ```

pub mod catalog;
pub mod config;
pub mod drift;
pub mod engine;
pub mod error;
pub mod graph;
pub mod models;
pub mod scoring;
pub mod version;

pub use catalog::Catalog;
pub use config::{load_governance_config, GovernanceConfig};
pub use drift::{DriftIssue, DriftReport, EventRegistry, SpecRegistry, SpecRegistryEntry};
pub use engine::{AnalysisInputs, GovernanceEngine, GovernanceReport};
pub use error::{GovernanceError, GovernanceResult};
pub use graph::{validate, ValidationReport};
pub use models::{Domain, Maturity, QualityMetrics, Service, Severity};
pub use scoring::{Grade, QualityResult, QualityScorer};
pub use version::Version;
