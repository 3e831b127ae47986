//! Immutable catalog snapshot
//!
//! The catalog is the single source of truth for one analysis pass. Every
//! component takes `&Catalog` explicitly; nothing reads ambient state, so
//! passes can run concurrently and repeat with identical output.
//!
//! Structural sanity is checked once, at construction. A catalog that
//! exists is a catalog every component can trust:
//! - service names are non-empty and unique
//! - dependency, contract, and event identifiers are non-empty

use crate::error::{GovernanceError, GovernanceResult};
use crate::models::Service;
use std::collections::BTreeMap;
use tracing::debug;

#[derive(Debug, Clone)]
pub struct Catalog {
    /// Services sorted by name
    services: Vec<Service>,
    index: BTreeMap<String, usize>,
}

impl Catalog {
    /// Build a snapshot, rejecting structurally invalid input.
    pub fn new(services: Vec<Service>) -> GovernanceResult<Self> {
        let mut seen: BTreeMap<String, usize> = BTreeMap::new();

        for (position, service) in services.iter().enumerate() {
            if service.name.trim().is_empty() {
                return Err(GovernanceError::invalid_catalog(
                    format!("service #{position}"),
                    "service name is empty",
                ));
            }
            if seen.insert(service.name.clone(), position).is_some() {
                return Err(GovernanceError::invalid_catalog(
                    service.name.clone(),
                    "duplicate service name",
                ));
            }
            check_identifiers(service)?;
        }

        let mut services = services;
        services.sort_by(|a, b| a.name.cmp(&b.name));
        let index = services
            .iter()
            .enumerate()
            .map(|(i, s)| (s.name.clone(), i))
            .collect();

        debug!("Catalog snapshot built with {} services", services.len());
        Ok(Self { services, index })
    }

    /// Services in name order
    pub fn services(&self) -> &[Service] {
        &self.services
    }

    pub fn get(&self, name: &str) -> Option<&Service> {
        self.index.get(name).map(|&i| &self.services[i])
    }

    pub fn contains(&self, name: &str) -> bool {
        self.index.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.services.len()
    }

    pub fn is_empty(&self) -> bool {
        self.services.is_empty()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.services.iter().map(|s| s.name.as_str())
    }
}

fn check_identifiers(service: &Service) -> GovernanceResult<()> {
    let empty = |field: &str| -> GovernanceResult<()> {
        Err(GovernanceError::invalid_catalog(
            service.name.clone(),
            format!("empty {field} entry"),
        ))
    };

    if service.dependencies.internal.iter().any(|d| d.trim().is_empty()) {
        return empty("internal dependency");
    }
    if service
        .dependencies
        .external
        .iter()
        .any(|d| d.system.trim().is_empty())
    {
        return empty("external dependency");
    }
    if service
        .api_contracts
        .iter()
        .any(|c| c.spec_name.trim().is_empty())
    {
        return empty("api contract");
    }
    if service
        .events_in
        .iter()
        .chain(service.events_out.iter())
        .any(|e| e.trim().is_empty())
    {
        return empty("event");
    }
    Ok(())
}
