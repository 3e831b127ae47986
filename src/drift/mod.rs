//! Drift detection
//!
//! Compares what each service declares (contract pins, lock files, deploy
//! age, event names, external pins) against the registries and reports the
//! gaps as [`DriftIssue`]s, each with a remediation. Malformed versions
//! become `invalid-version` issues; detection always covers the whole
//! catalog. The report groups critical and high issues by type into
//! [`Recommendation`]s.

mod detector;
mod divergence;
mod issue;
mod registry;

pub use detector::{detect, DriftDetector};
pub use issue::{
    DriftDetail, DriftIssue, DriftIssueType, DriftReport, DriftSummary, Recommendation,
    SuppressedIssue, VersionField,
};
pub use registry::{EventRegistry, SpecRegistry, SpecRegistryEntry};
