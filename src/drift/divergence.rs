//! Catalog-wide external dependency version divergence
//!
//! Pins are grouped by external system and major version. A system pinned
//! at two or more majors anywhere in the catalog yields one moderate issue
//! per service pinning it, keyed on that service's lowest pinned major.
//! `other_versions` only lists pins held by other services; a service that
//! pins several majors itself has them named in the message. This is the
//! only drift check that needs every service at once.

use crate::catalog::Catalog;
use crate::drift::issue::{DriftDetail, DriftIssue, VersionField};
use crate::models::Severity;
use crate::version::Version;
use std::collections::{BTreeMap, BTreeSet};
use tracing::debug;

/// One parsed pin: (major, service, raw version)
type Pin<'a> = (u64, &'a str, &'a str);

pub(crate) fn detect(catalog: &Catalog) -> Vec<DriftIssue> {
    let mut issues = Vec::new();
    let mut pins: BTreeMap<&str, BTreeSet<Pin<'_>>> = BTreeMap::new();

    for service in catalog.services() {
        for dep in &service.dependencies.external {
            let Some(raw) = dep.version.as_deref() else {
                continue;
            };
            match Version::parse_major(raw) {
                Ok(major) => {
                    pins.entry(dep.system.as_str())
                        .or_default()
                        .insert((major, service.name.as_str(), raw));
                }
                Err(e) => issues.push(DriftIssue::new(
                    &service.name,
                    Severity::Low,
                    &dep.system,
                    format!(
                        "{} pins external {}@{}, which is not a valid version",
                        service.name, dep.system, raw
                    ),
                    DriftDetail::InvalidVersion {
                        field: VersionField::ExternalDependency,
                        raw: raw.to_string(),
                        error: e.to_string(),
                    },
                )),
            }
        }
    }

    for (system, system_pins) in &pins {
        let majors: BTreeSet<u64> = system_pins.iter().map(|(major, _, _)| *major).collect();
        if majors.len() < 2 {
            continue;
        }
        debug!(
            "External system {} is pinned at {} major versions",
            system,
            majors.len()
        );

        // Per service, in (major, raw) order: the first entry is its lowest pin
        let mut by_service: BTreeMap<&str, Vec<(u64, &str)>> = BTreeMap::new();
        for &(major, service, raw) in system_pins {
            by_service.entry(service).or_default().push((major, raw));
        }

        for (service, own) in by_service {
            let (major, raw) = own[0];
            let other_versions: Vec<String> = system_pins
                .iter()
                .filter(|(m, s, _)| *s != service && *m != major)
                .map(|(_, _, v)| v.to_string())
                .collect::<BTreeSet<_>>()
                .into_iter()
                .collect();

            let own_majors: BTreeSet<u64> = own.iter().map(|(m, _)| *m).collect();
            let mut message = if own_majors.len() > 1 {
                let versions: Vec<&str> = own.iter().map(|(_, v)| *v).collect();
                format!(
                    "{} pins {} at several majors ({})",
                    service,
                    system,
                    versions.join(", ")
                )
            } else {
                format!("{service} pins {system}@{raw}")
            };
            if !other_versions.is_empty() {
                message.push_str(&format!(
                    " while other services use {}",
                    other_versions.join(", ")
                ));
            }

            issues.push(DriftIssue::new(
                service,
                Severity::Moderate,
                system,
                message,
                DriftDetail::DependencyDivergence {
                    system: system.to_string(),
                    version: raw.to_string(),
                    major,
                    other_versions,
                },
            ));
        }
    }

    issues
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::drift::issue::DriftIssueType;
    use crate::models::{Domain, ExternalDependency, Maturity, Service};

    fn pinned(name: &str, system: &str, version: &str) -> Service {
        Service::new(name, Domain::DataProcessing, Maturity::Stable)
            .with_external_dep(ExternalDependency::pinned(system, version))
    }

    #[test]
    fn test_divergent_majors_flag_every_pinning_service() {
        let catalog = Catalog::new(vec![
            pinned("ingest", "kafka", "3.5.1"),
            pinned("enrich", "kafka", "2.8.0"),
            pinned("export", "kafka", "3.6.0"),
            pinned("cache", "redis", "7.2"),
        ])
        .unwrap();

        let issues = detect(&catalog);
        assert_eq!(issues.len(), 3);
        assert!(issues
            .iter()
            .all(|i| i.issue_type == DriftIssueType::DependencyDivergence
                && i.severity == Severity::Moderate
                && i.subject == "kafka"));

        let enrich = issues.iter().find(|i| i.service_name == "enrich").unwrap();
        match &enrich.detail {
            DriftDetail::DependencyDivergence {
                major,
                other_versions,
                ..
            } => {
                assert_eq!(*major, 2);
                assert_eq!(other_versions, &vec!["3.5.1".to_string(), "3.6.0".to_string()]);
            }
            other => panic!("unexpected detail {other:?}"),
        }
    }

    #[test]
    fn test_same_major_is_not_divergent() {
        let catalog = Catalog::new(vec![
            pinned("a", "postgresql", "15.2"),
            pinned("b", "postgresql", "15.4"),
            Service::new("c", Domain::Shared, Maturity::Beta)
                .with_external_dep(ExternalDependency::new("postgresql")),
        ])
        .unwrap();
        assert!(detect(&catalog).is_empty());
    }

    #[test]
    fn test_unparseable_external_pin() {
        let catalog = Catalog::new(vec![pinned("a", "redis", "latest")]).unwrap();
        let issues = detect(&catalog);
        assert_eq!(issues.len(), 1);
        assert_eq!(issues[0].issue_type, DriftIssueType::InvalidVersion);
        assert_eq!(issues[0].severity, Severity::Low);
    }

    fn other_versions(issue: &DriftIssue) -> &[String] {
        match &issue.detail {
            DriftDetail::DependencyDivergence { other_versions, .. } => other_versions,
            other => panic!("unexpected detail {other:?}"),
        }
    }

    #[test]
    fn test_own_pins_are_not_listed_as_other_versions() {
        let catalog = Catalog::new(vec![
            pinned("split", "kafka", "2.8.0")
                .with_external_dep(ExternalDependency::pinned("kafka", "3.5.1")),
            pinned("steady", "kafka", "3.6.0"),
        ])
        .unwrap();

        let issues = detect(&catalog);
        assert_eq!(issues.len(), 2);
        assert_eq!(issues[0].service_name, "split");
        assert_eq!(other_versions(&issues[0]), ["3.6.0".to_string()]);
        assert_eq!(
            issues[0].message,
            "split pins kafka at several majors (2.8.0, 3.5.1) while other services use 3.6.0"
        );
        assert_eq!(issues[1].service_name, "steady");
        assert_eq!(other_versions(&issues[1]), ["2.8.0".to_string()]);
    }

    #[test]
    fn test_service_diverging_from_itself() {
        let catalog = Catalog::new(vec![pinned("split", "kafka", "2.8.0")
            .with_external_dep(ExternalDependency::pinned("kafka", "3.5.1"))])
        .unwrap();

        let issues = detect(&catalog);
        assert_eq!(issues.len(), 1);
        assert!(other_versions(&issues[0]).is_empty());
        assert_eq!(issues[0].message, "split pins kafka at several majors (2.8.0, 3.5.1)");
    }
}
