//! Domain models for the workflow DAG document.
//!
//! Source of truth for what a workflow looks like in memory. There is no
//! trigger concept here (webhook/cron dispatch is an out-of-scope external
//! collaborator) — a workflow is always executed directly by id.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A single step in the workflow graph.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NodeDefinition {
    /// Unique identifier within this workflow (referenced by edges).
    pub id: String,
    /// Maps to a registered action in `engine::registry::ActionRegistry`.
    pub node_type: String,
    /// Human-readable label, carried into `NodeRecord::node_label`.
    pub label: String,
    /// Arbitrary configuration passed to the node at execution time, after
    /// variable interpolation.
    pub config: serde_json::Value,
}

/// Directed edge from one node to another.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Edge {
    pub source: String,
    pub target: String,
}

/// A complete workflow definition.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Workflow {
    pub id: Uuid,
    pub name: String,
    pub nodes: Vec<NodeDefinition>,
    pub edges: Vec<Edge>,
    pub created_at: DateTime<Utc>,
}

impl Workflow {
    /// Convenience constructor for testing.
    pub fn new(name: impl Into<String>, nodes: Vec<NodeDefinition>, edges: Vec<Edge>) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            nodes,
            edges,
            created_at: Utc::now(),
        }
    }
}
