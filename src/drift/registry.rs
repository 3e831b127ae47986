//! Read-only registries consulted by drift detection
//!
//! Both are plain lookups supplied by the caller. Where the data comes from
//! (a static table, a file, a remote registry) is not this crate's concern.

use crate::version::Version;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

/// Registry facts about one API spec
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpecRegistryEntry {
    pub latest_version: Version,
    /// A security fix was released somewhere after older pins
    #[serde(default)]
    pub security_patch_available: bool,
    #[serde(default)]
    pub deprecated: bool,
}

impl SpecRegistryEntry {
    pub fn new(latest_version: Version) -> Self {
        Self {
            latest_version,
            security_patch_available: false,
            deprecated: false,
        }
    }

    pub fn with_security_patch(mut self) -> Self {
        self.security_patch_available = true;
        self
    }

    pub fn deprecated(mut self) -> Self {
        self.deprecated = true;
        self
    }
}

/// Spec name to latest-version lookup
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SpecRegistry {
    specs: BTreeMap<String, SpecRegistryEntry>,
}

impl SpecRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, spec_name: impl Into<String>, entry: SpecRegistryEntry) {
        self.specs.insert(spec_name.into(), entry);
    }

    pub fn with_spec(mut self, spec_name: impl Into<String>, entry: SpecRegistryEntry) -> Self {
        self.insert(spec_name, entry);
        self
    }

    pub fn get(&self, spec_name: &str) -> Option<&SpecRegistryEntry> {
        self.specs.get(spec_name)
    }

    pub fn len(&self) -> usize {
        self.specs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.specs.is_empty()
    }
}

impl<S: Into<String>> FromIterator<(S, SpecRegistryEntry)> for SpecRegistry {
    fn from_iter<I: IntoIterator<Item = (S, SpecRegistryEntry)>>(iter: I) -> Self {
        Self {
            specs: iter.into_iter().map(|(k, v)| (k.into(), v)).collect(),
        }
    }
}

/// Set of known event schema names
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EventRegistry {
    events: BTreeSet<String>,
}

impl EventRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, event: impl Into<String>) {
        self.events.insert(event.into());
    }

    pub fn contains(&self, event: &str) -> bool {
        self.events.contains(event)
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }
}

impl<S: Into<String>> FromIterator<S> for EventRegistry {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        Self {
            events: iter.into_iter().map(Into::into).collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_spec_registry_from_json() {
        let raw = r#"{
            "gateway-core": { "latest_version": "1.3.0" },
            "auth-spec": { "latest_version": "v2", "security_patch_available": true }
        }"#;
        let registry: SpecRegistry = serde_json::from_str(raw).unwrap();
        assert_eq!(registry.len(), 2);
        assert_eq!(
            registry.get("gateway-core").unwrap().latest_version,
            Version::new(1, 3, 0)
        );
        assert!(registry.get("auth-spec").unwrap().security_patch_available);
        assert!(registry.get("missing").is_none());
    }

    #[test]
    fn test_event_registry_lookup() {
        let registry: EventRegistry = ["pricing.updated.v1", "order.created.v2"]
            .into_iter()
            .collect();
        assert!(registry.contains("pricing.updated.v1"));
        assert!(!registry.contains("pricing.updated.v2"));
    }
}
