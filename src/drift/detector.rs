//! Per-service drift checks
//!
//! Every check runs for every service and they are independent, so one
//! service may collect several issues in a pass. Per-service work shares
//! nothing and runs on the rayon pool; the catalog-wide dependency divergence
//! grouping runs alongside it.

use crate::catalog::Catalog;
use crate::config::DriftConfig;
use crate::drift::divergence;
use crate::drift::issue::{DriftDetail, DriftIssue, DriftReport, SuppressedIssue, VersionField};
use crate::drift::registry::{EventRegistry, SpecRegistry};
use crate::error::GovernanceResult;
use crate::models::{ApiContract, Severity, Service};
use crate::version::Version;
use chrono::{DateTime, Utc};
use rayon::prelude::*;
use tracing::{debug, info, warn};

/// Issues found for one service
#[derive(Debug, Default)]
struct ServiceDrift {
    issues: Vec<DriftIssue>,
    suppressed: Vec<SuppressedIssue>,
}

/// Detects drift between declared service state and the registries
pub struct DriftDetector<'a> {
    config: &'a DriftConfig,
    specs: &'a SpecRegistry,
    events: &'a EventRegistry,
}

impl<'a> DriftDetector<'a> {
    /// Fails if the staleness thresholds or exemptions in `config` are invalid
    pub fn new(
        config: &'a DriftConfig,
        specs: &'a SpecRegistry,
        events: &'a EventRegistry,
    ) -> GovernanceResult<Self> {
        config.validate()?;
        Ok(Self {
            config,
            specs,
            events,
        })
    }

    /// Run every check over the catalog.
    ///
    /// Uses the current rayon pool; callers control parallelism by running
    /// this inside `ThreadPool::install`.
    pub fn detect(&self, catalog: &Catalog, now: DateTime<Utc>) -> DriftReport {
        let (per_service, divergence_issues) = rayon::join(
            || {
                catalog
                    .services()
                    .par_iter()
                    .map(|service| self.check_service(service, now))
                    .collect::<Vec<_>>()
            },
            || divergence::detect(catalog),
        );

        let mut issues = divergence_issues;
        let mut suppressed = Vec::new();
        for drift in per_service {
            issues.extend(drift.issues);
            suppressed.extend(drift.suppressed);
        }

        let report = DriftReport::new(issues, suppressed);
        if report.summary.total_issues > 0 {
            warn!(
                "Drift detected: {} issues across {} services ({} suppressed)",
                report.summary.total_issues,
                report.issue_counts().len(),
                report.summary.suppressed
            );
        } else {
            info!(
                "No drift detected across {} services ({} suppressed)",
                catalog.len(),
                report.summary.suppressed
            );
        }
        for (issue_type, count) in &report.summary.by_type {
            debug!("  {}: {}", issue_type, count);
        }
        report
    }

    fn check_service(&self, service: &Service, now: DateTime<Utc>) -> ServiceDrift {
        let mut drift = ServiceDrift::default();

        for contract in &service.api_contracts {
            self.check_contract(service, contract, now, &mut drift);
        }
        if let Some(issue) = check_lock_file(service) {
            drift.issues.push(issue);
        }
        if let Some(issue) = self.check_staleness(service, now) {
            drift.issues.push(issue);
        }
        drift.issues.extend(self.check_events(service));

        drift
    }

    fn check_contract(
        &self,
        service: &Service,
        contract: &ApiContract,
        now: DateTime<Utc>,
        drift: &mut ServiceDrift,
    ) {
        let pinned = match Version::parse(&contract.pinned_version) {
            Ok(v) => v,
            Err(e) => {
                drift.issues.push(DriftIssue::new(
                    &service.name,
                    Severity::Low,
                    &contract.spec_name,
                    format!(
                        "{} pins {}@{}, which is not a valid version",
                        service.name, contract.spec_name, contract.pinned_version
                    ),
                    DriftDetail::InvalidVersion {
                        field: VersionField::ApiContract,
                        raw: contract.pinned_version.clone(),
                        error: e.to_string(),
                    },
                ));
                return;
            }
        };

        let Some(entry) = self.specs.get(&contract.spec_name) else {
            debug!(
                "{}: spec '{}' is not in the registry, skipping lag check",
                service.name, contract.spec_name
            );
            return;
        };
        if pinned >= entry.latest_version {
            return;
        }

        let lag = pinned.lag_behind(&entry.latest_version);
        let severity = if lag.major > 0 && entry.security_patch_available {
            Severity::Critical
        } else if lag.major > 0 {
            Severity::High
        } else if lag.minor > self.config.minor_lag_moderate {
            Severity::Moderate
        } else {
            Severity::Low
        };

        let mut message = format!(
            "{} pins {}@{} but {} is available",
            service.name, contract.spec_name, pinned, entry.latest_version
        );
        if entry.security_patch_available && lag.major > 0 {
            message.push_str(" (includes a security patch)");
        }
        if entry.deprecated {
            message.push_str(" (spec is deprecated)");
        }

        let issue = DriftIssue::new(
            &service.name,
            severity,
            &contract.spec_name,
            message,
            DriftDetail::SpecLag {
                pinned,
                latest: entry.latest_version,
                major_lag: lag.major,
                minor_lag: lag.minor,
                security_patch_available: entry.security_patch_available,
                deprecated: entry.deprecated,
            },
        );

        match self
            .config
            .active_exemption(&service.name, &contract.spec_name, now)
        {
            Some(exemption) => {
                info!(
                    "Suppressed spec-lag for {} on {} (exempt until {})",
                    contract.spec_name, service.name, exemption.expires_at
                );
                drift.suppressed.push(SuppressedIssue {
                    issue,
                    expires_at: exemption.expires_at,
                    reason: exemption.reason.clone(),
                });
            }
            None => drift.issues.push(issue),
        }
    }

    fn check_staleness(&self, service: &Service, now: DateTime<Utc>) -> Option<DriftIssue> {
        let days_old = (now - service.last_update).num_days();
        let severity = if days_old > self.config.very_stale_days {
            Severity::High
        } else if days_old > self.config.stale_days {
            Severity::Moderate
        } else {
            return None;
        };

        Some(DriftIssue::new(
            &service.name,
            severity,
            "",
            format!("{} was last updated {} days ago", service.name, days_old),
            DriftDetail::Staleness { days_old },
        ))
    }

    fn check_events(&self, service: &Service) -> Vec<DriftIssue> {
        service
            .all_events()
            .into_iter()
            .filter(|event| !self.events.contains(event))
            .map(|event| {
                DriftIssue::new(
                    &service.name,
                    Severity::High,
                    event,
                    format!(
                        "{} uses event '{}', which has no registered schema",
                        service.name, event
                    ),
                    DriftDetail::UnknownEvent {
                        event: event.to_string(),
                    },
                )
            })
            .collect()
    }
}

fn check_lock_file(service: &Service) -> Option<DriftIssue> {
    if service.api_contracts.is_empty() || service.has_lock_file() {
        return None;
    }
    Some(DriftIssue::new(
        &service.name,
        Severity::High,
        "",
        format!(
            "{} pins {} API contracts without a lock file",
            service.name,
            service.api_contracts.len()
        ),
        DriftDetail::MissingLock {
            contract_count: service.api_contracts.len(),
        },
    ))
}

/// Detect drift with the given thresholds and registries
pub fn detect(
    catalog: &Catalog,
    config: &DriftConfig,
    specs: &SpecRegistry,
    events: &EventRegistry,
    now: DateTime<Utc>,
) -> GovernanceResult<DriftReport> {
    Ok(DriftDetector::new(config, specs, events)?.detect(catalog, now))
}
