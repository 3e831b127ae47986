//! Dependency graph construction and validation
//!
//! The graph is a pure projection of the catalog: built fresh for each
//! validation run, never updated incrementally.

mod builder;
mod validator;

pub use builder::{DependencyEdge, DependencyGraph, GraphNode};
pub use validator::{
    validate, CycleViolation, DirectionalityViolation, ExternalDependencyViolation,
    ForbiddenEdgeViolation, GraphValidator, GraphWarning, GraphWarningKind, ValidationReport,
    ValidationSummary,
};
