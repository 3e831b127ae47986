//! Dependency graph projection
//!
//! The graph is rebuilt from the catalog on every validation run and never
//! mutated afterwards. Nodes are added in name order and edges in
//! (from, to) order, so every traversal below is deterministic.

use crate::catalog::Catalog;
use crate::config::GraphConfig;
use crate::error::GovernanceResult;
use crate::models::Domain;
use petgraph::algo::toposort;
use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::visit::EdgeRef;
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};
use tracing::debug;

/// A node in the dependency graph
#[derive(Debug, Clone, Serialize)]
pub struct GraphNode {
    pub name: String,
    /// `None` for names referenced by a dependency but absent from the catalog
    pub domain: Option<Domain>,
}

impl GraphNode {
    pub fn is_declared(&self) -> bool {
        self.domain.is_some()
    }
}

/// An internal dependency edge, annotated with the layer ranks on both ends
#[derive(Debug, Clone, Copy, Serialize)]
pub struct DependencyEdge {
    pub from_rank: Option<u32>,
    pub to_rank: Option<u32>,
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum VisitState {
    Unvisited,
    OnStack,
    Done,
}

struct Frame {
    node: NodeIndex,
    successors: Vec<NodeIndex>,
    next: usize,
}

/// Directed graph of internal service dependencies
#[derive(Debug, Clone)]
pub struct DependencyGraph {
    graph: DiGraph<GraphNode, DependencyEdge>,
    indices: BTreeMap<String, NodeIndex>,
}

impl DependencyGraph {
    /// Project the catalog into a graph.
    ///
    /// Dependencies on names missing from the catalog still produce a node
    /// and an edge; the validator reports them as unresolved references.
    /// Fails if `config` does not rank every domain.
    pub fn build(catalog: &Catalog, config: &GraphConfig) -> GovernanceResult<Self> {
        config.validate()?;
        Ok(Self::project(catalog, config))
    }

    /// [`DependencyGraph::build`] for a config that already passed validation
    pub(crate) fn project(catalog: &Catalog, config: &GraphConfig) -> Self {
        let mut graph = DiGraph::new();
        let mut indices = BTreeMap::new();

        for service in catalog.services() {
            let idx = graph.add_node(GraphNode {
                name: service.name.clone(),
                domain: Some(service.domain),
            });
            indices.insert(service.name.clone(), idx);
        }

        let undeclared: BTreeSet<&str> = catalog
            .services()
            .iter()
            .flat_map(|s| s.dependencies.internal.iter())
            .map(String::as_str)
            .filter(|name| !catalog.contains(name))
            .collect();
        for name in undeclared {
            let idx = graph.add_node(GraphNode {
                name: name.to_string(),
                domain: None,
            });
            indices.insert(name.to_string(), idx);
        }

        for service in catalog.services() {
            let from = indices[&service.name];
            let from_rank = Some(config.rank(service.domain));
            for dep in &service.dependencies.internal {
                let to = indices[dep];
                let to_rank = graph[to].domain.map(|d| config.rank(d));
                graph.add_edge(from, to, DependencyEdge { from_rank, to_rank });
            }
        }

        debug!(
            "Built dependency graph with {} nodes and {} edges",
            graph.node_count(),
            graph.edge_count()
        );

        Self { graph, indices }
    }

    pub fn node_count(&self) -> usize {
        self.graph.node_count()
    }

    pub fn edge_count(&self) -> usize {
        self.graph.edge_count()
    }

    pub fn node(&self, name: &str) -> Option<&GraphNode> {
        self.indices.get(name).map(|&idx| &self.graph[idx])
    }

    /// Nodes in name order
    pub fn nodes(&self) -> impl Iterator<Item = &GraphNode> {
        self.indices.values().map(|&idx| &self.graph[idx])
    }

    /// Edges as `(from, to, edge)` in (from, to) order
    pub fn edges(&self) -> Vec<(&GraphNode, &GraphNode, &DependencyEdge)> {
        let mut edges: Vec<_> = self
            .graph
            .edge_references()
            .map(|e| (&self.graph[e.source()], &self.graph[e.target()], e.weight()))
            .collect();
        edges.sort_by(|a, b| (&a.0.name, &a.1.name).cmp(&(&b.0.name, &b.1.name)));
        edges
    }

    /// Names the given service depends on, sorted
    pub fn dependencies_of(&self, name: &str) -> Vec<&str> {
        match self.indices.get(name) {
            Some(&idx) => self
                .sorted_successors(idx)
                .into_iter()
                .map(|n| self.graph[n].name.as_str())
                .collect(),
            None => Vec::new(),
        }
    }

    fn sorted_successors(&self, idx: NodeIndex) -> Vec<NodeIndex> {
        let mut successors: Vec<NodeIndex> = self.graph.neighbors(idx).collect();
        successors.sort_by(|a, b| self.graph[*a].name.cmp(&self.graph[*b].name));
        successors.dedup();
        successors
    }

    /// Find every cycle reachable by depth-first search.
    ///
    /// Roots and successors are visited in name order. Each back edge to a
    /// node still on the DFS stack yields one cycle, written from the
    /// repeated node back to itself (`[a, b, a]`; a self-loop is `[a, a]`).
    /// The traversal uses an explicit stack, so deep chains cannot overflow
    /// the call stack.
    pub fn find_cycles(&self) -> Vec<Vec<String>> {
        let mut state = vec![VisitState::Unvisited; self.graph.node_count()];
        let mut cycles = Vec::new();

        for &root in self.indices.values() {
            if state[root.index()] != VisitState::Unvisited {
                continue;
            }

            state[root.index()] = VisitState::OnStack;
            let mut stack = vec![Frame {
                node: root,
                successors: self.sorted_successors(root),
                next: 0,
            }];

            while let Some(frame) = stack.last_mut() {
                if frame.next >= frame.successors.len() {
                    state[frame.node.index()] = VisitState::Done;
                    stack.pop();
                    continue;
                }

                let next = frame.successors[frame.next];
                frame.next += 1;

                match state[next.index()] {
                    VisitState::Unvisited => {
                        state[next.index()] = VisitState::OnStack;
                        stack.push(Frame {
                            node: next,
                            successors: self.sorted_successors(next),
                            next: 0,
                        });
                    }
                    VisitState::OnStack => {
                        let start = stack
                            .iter()
                            .position(|f| f.node == next)
                            .unwrap_or_default();
                        let mut cycle: Vec<String> = stack[start..]
                            .iter()
                            .map(|f| self.graph[f.node].name.clone())
                            .collect();
                        cycle.push(self.graph[next].name.clone());
                        cycles.push(cycle);
                    }
                    VisitState::Done => {}
                }
            }
        }

        cycles
    }

    /// Deployment order with dependencies first, or `None` if the graph
    /// has a cycle.
    pub fn topological_order(&self) -> Option<Vec<String>> {
        let mut order: Vec<String> = toposort(&self.graph, None)
            .ok()?
            .into_iter()
            .map(|idx| self.graph[idx].name.clone())
            .collect();
        order.reverse();
        Some(order)
    }
}
