//! Architectural rule checks over the dependency graph
//!
//! Checks, all run on every pass:
//! - cycles (any length, including self-loops)
//! - directionality: a service may not depend on a higher-ranked layer
//! - forbidden domain pairings from configuration
//! - external dependencies outside the whitelist
//! - unresolved internal references (warnings only)
//!
//! Edge-level problems accumulate in the report; none of them abort the pass.

use crate::catalog::Catalog;
use crate::config::GraphConfig;
use crate::error::GovernanceResult;
use crate::graph::builder::DependencyGraph;
use crate::models::Domain;
use serde::Serialize;
use tracing::{debug, info, warn};

/// A dependency loop, written from the repeated node back to itself
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize)]
pub struct CycleViolation {
    pub path: Vec<String>,
}

impl CycleViolation {
    /// Number of edges in the loop (1 for a self-loop)
    pub fn len(&self) -> usize {
        self.path.len().saturating_sub(1)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn describe(&self) -> String {
        format!("Circular dependency: {}", self.path.join(" -> "))
    }
}

/// A lower layer depending on a higher one
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DirectionalityViolation {
    pub from: String,
    pub to: String,
    pub from_domain: Domain,
    pub to_domain: Domain,
    pub from_rank: u32,
    pub to_rank: u32,
}

impl DirectionalityViolation {
    pub fn describe(&self) -> String {
        format!(
            "Reverse dependency: {} ({}, rank {}) -> {} ({}, rank {})",
            self.from, self.from_domain, self.from_rank, self.to, self.to_domain, self.to_rank
        )
    }
}

/// An edge between a configured forbidden domain pair
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ForbiddenEdgeViolation {
    pub from: String,
    pub to: String,
    pub pattern: String,
}

/// An external system missing from the whitelist
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ExternalDependencyViolation {
    pub service: String,
    pub dependency: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum GraphWarningKind {
    UnresolvedReference,
}

/// Non-fatal graph finding
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GraphWarning {
    pub kind: GraphWarningKind,
    pub service: String,
    pub reference: String,
    pub message: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ValidationSummary {
    pub nodes: usize,
    pub edges: usize,
    pub errors: usize,
    pub warnings: usize,
}

/// Outcome of one validation pass
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ValidationReport {
    /// True when no violation of any kind was found (warnings do not count)
    pub ok: bool,
    pub cycles: Vec<CycleViolation>,
    pub directionality: Vec<DirectionalityViolation>,
    pub forbidden: Vec<ForbiddenEdgeViolation>,
    pub external: Vec<ExternalDependencyViolation>,
    pub warnings: Vec<GraphWarning>,
    /// Dependencies-first order, present only for acyclic graphs
    pub topological_order: Option<Vec<String>>,
    pub summary: ValidationSummary,
}

/// Validates a catalog's dependency graph against layering rules
pub struct GraphValidator<'a> {
    config: &'a GraphConfig,
}

impl<'a> GraphValidator<'a> {
    /// Fails if `config` does not rank every domain
    pub fn new(config: &'a GraphConfig) -> GovernanceResult<Self> {
        config.validate()?;
        Ok(Self { config })
    }

    pub fn validate(&self, catalog: &Catalog) -> ValidationReport {
        let graph = DependencyGraph::project(catalog, self.config);

        let mut cycles: Vec<CycleViolation> = graph
            .find_cycles()
            .into_iter()
            .map(|path| CycleViolation { path })
            .collect();
        cycles.sort();

        let (directionality, forbidden, warnings) = self.check_edges(&graph);
        let external = self.check_external(catalog);

        let topological_order = if cycles.is_empty() {
            graph.topological_order()
        } else {
            None
        };

        let errors = cycles.len() + directionality.len() + forbidden.len() + external.len();
        let summary = ValidationSummary {
            nodes: graph.node_count(),
            edges: graph.edge_count(),
            errors,
            warnings: warnings.len(),
        };

        for cycle in &cycles {
            warn!("{}", cycle.describe());
        }
        if errors == 0 {
            info!(
                "Dependency graph valid: {} nodes, {} edges, {} warnings",
                summary.nodes, summary.edges, summary.warnings
            );
        } else {
            warn!(
                "Dependency graph has {} violations ({} cycles, {} directional, {} forbidden, {} external) and {} warnings",
                errors,
                cycles.len(),
                directionality.len(),
                forbidden.len(),
                external.len(),
                summary.warnings
            );
        }

        ValidationReport {
            ok: errors == 0,
            cycles,
            directionality,
            forbidden,
            external,
            warnings,
            topological_order,
            summary,
        }
    }

    fn check_edges(
        &self,
        graph: &DependencyGraph,
    ) -> (
        Vec<DirectionalityViolation>,
        Vec<ForbiddenEdgeViolation>,
        Vec<GraphWarning>,
    ) {
        let mut directionality = Vec::new();
        let mut forbidden = Vec::new();
        let mut warnings = Vec::new();

        for (from, to, edge) in graph.edges() {
            let (Some(from_domain), Some(to_domain)) = (from.domain, to.domain) else {
                warnings.push(GraphWarning {
                    kind: GraphWarningKind::UnresolvedReference,
                    service: from.name.clone(),
                    reference: to.name.clone(),
                    message: format!(
                        "{} depends on '{}', which is not in the catalog",
                        from.name, to.name
                    ),
                });
                continue;
            };

            let from_rank = edge.from_rank.unwrap_or_else(|| self.config.rank(from_domain));
            let to_rank = edge.to_rank.unwrap_or_else(|| self.config.rank(to_domain));
            if from_rank < to_rank {
                let violation = DirectionalityViolation {
                    from: from.name.clone(),
                    to: to.name.clone(),
                    from_domain,
                    to_domain,
                    from_rank,
                    to_rank,
                };
                debug!("{}", violation.describe());
                directionality.push(violation);
            }

            if self.config.is_forbidden(from_domain, to_domain) {
                forbidden.push(ForbiddenEdgeViolation {
                    from: from.name.clone(),
                    to: to.name.clone(),
                    pattern: format!("{from_domain} -> {to_domain}"),
                });
            }
        }

        (directionality, forbidden, warnings)
    }

    fn check_external(&self, catalog: &Catalog) -> Vec<ExternalDependencyViolation> {
        catalog
            .services()
            .iter()
            .flat_map(|service| {
                service
                    .dependencies
                    .external
                    .iter()
                    .filter(|dep| !self.config.is_external_allowed(&dep.system))
                    .map(|dep| ExternalDependencyViolation {
                        service: service.name.clone(),
                        dependency: dep.system.clone(),
                    })
            })
            .collect()
    }
}

/// Validate a catalog with the given layering rules
pub fn validate(catalog: &Catalog, config: &GraphConfig) -> GovernanceResult<ValidationReport> {
    Ok(GraphValidator::new(config)?.validate(catalog))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ForbiddenEdge;
    use crate::error::GovernanceError;
    use crate::models::{ExternalDependency, Maturity, Service};

    fn svc(name: &str, domain: Domain) -> Service {
        Service::new(name, domain, Maturity::Stable)
    }

    fn run(services: Vec<Service>) -> ValidationReport {
        validate(&Catalog::new(services).unwrap(), &GraphConfig::default()).unwrap()
    }

    #[test]
    fn test_clean_graph_is_ok() {
        let report = run(vec![
            svc("gateway", Domain::Access).with_internal_dep("auth"),
            svc("auth", Domain::Shared),
        ]);
        assert!(report.ok);
        assert_eq!(report.summary.errors, 0);
        assert_eq!(
            report.topological_order,
            Some(vec!["auth".to_string(), "gateway".to_string()])
        );
    }

    #[test]
    fn test_mutual_dependency_cycle() {
        let report = run(vec![
            svc("A", Domain::Shared).with_internal_dep("B"),
            svc("B", Domain::Shared).with_internal_dep("A"),
        ]);
        assert!(!report.ok);
        assert_eq!(report.cycles.len(), 1);
        assert_eq!(report.cycles[0].path, vec!["A", "B", "A"]);
        assert_eq!(report.cycles[0].len(), 2);
        assert!(report.topological_order.is_none());
    }

    #[test]
    fn test_lower_layer_depending_upward() {
        let report = run(vec![
            svc("edge-api", Domain::Access).with_internal_dep("normalizer"),
            svc("normalizer", Domain::DataProcessing),
        ]);
        assert!(!report.ok);
        assert_eq!(report.directionality.len(), 1);
        let v = &report.directionality[0];
        assert_eq!((v.from.as_str(), v.to.as_str()), ("edge-api", "normalizer"));
        assert_eq!((v.from_rank, v.to_rank), (3, 4));
    }

    #[test]
    fn test_same_rank_and_downward_edges_allowed() {
        let report = run(vec![
            svc("a", Domain::Shared).with_internal_dep("b"),
            svc("b", Domain::Shared),
            svc("c", Domain::Ml).with_internal_dep("a"),
        ]);
        assert!(report.directionality.is_empty());
        assert!(report.ok);
    }

    #[test]
    fn test_unknown_external_is_violation() {
        let report = run(vec![svc("a", Domain::Shared)
            .with_external_dep(ExternalDependency::new("redis"))
            .with_external_dep(ExternalDependency::pinned("oracle", "19"))]);
        assert!(!report.ok);
        assert_eq!(
            report.external,
            vec![ExternalDependencyViolation {
                service: "a".to_string(),
                dependency: "oracle".to_string(),
            }]
        );
    }

    #[test]
    fn test_dangling_reference_is_warning_only() {
        let report = run(vec![svc("a", Domain::Access).with_internal_dep("missing")]);
        assert!(report.ok);
        assert_eq!(report.warnings.len(), 1);
        assert_eq!(report.warnings[0].kind, GraphWarningKind::UnresolvedReference);
        assert_eq!(report.warnings[0].reference, "missing");
        assert_eq!(report.summary.nodes, 2);
    }

    #[test]
    fn test_forbidden_domain_pair() {
        let mut config = GraphConfig::default();
        config.forbidden_edges.push(ForbiddenEdge {
            from: Domain::Ml,
            to: Domain::Shared,
        });
        let catalog = Catalog::new(vec![
            svc("model", Domain::Ml).with_internal_dep("utils"),
            svc("utils", Domain::Shared),
        ])
        .unwrap();

        let report = validate(&catalog, &config).unwrap();
        assert!(!report.ok);
        assert!(report.directionality.is_empty());
        assert_eq!(report.forbidden.len(), 1);
        assert_eq!(report.forbidden[0].pattern, "ml -> shared");
    }

    #[test]
    fn test_custom_ranks_change_direction() {
        let mut config = GraphConfig::default();
        config.domain_ranks.insert(Domain::Access, 10);
        let catalog = Catalog::new(vec![
            svc("edge-api", Domain::Access).with_internal_dep("normalizer"),
            svc("normalizer", Domain::DataProcessing),
        ])
        .unwrap();
        assert!(validate(&catalog, &config).unwrap().ok);
    }

    #[test]
    fn test_unranked_domain_is_rejected_not_ranked_zero() {
        let mut config = GraphConfig::default();
        config.domain_ranks.remove(&Domain::Access);
        let catalog = Catalog::new(vec![
            svc("edge", Domain::Access).with_internal_dep("base"),
            svc("base", Domain::Infrastructure),
        ])
        .unwrap();

        assert!(matches!(
            GraphValidator::new(&config),
            Err(GovernanceError::Config(_))
        ));
        let err = validate(&catalog, &config).unwrap_err();
        assert!(err.to_string().contains("'access'"));

        // With the rank restored the same edge is a legal downward dependency
        config.domain_ranks.insert(Domain::Access, 3);
        let report = validate(&catalog, &config).unwrap();
        assert!(report.ok);
        assert!(report.directionality.is_empty());
    }
}
