//! Engine-level error types.

use thiserror::Error;

/// Errors produced validating a workflow's DAG before it ever runs.
#[derive(Debug, Error)]
pub enum EngineError {
    /// Two or more nodes share the same ID.
    #[error("duplicate node ID: '{0}'")]
    DuplicateNodeId(String),

    /// An edge references a node ID that doesn't exist in the workflow.
    #[error("edge references unknown node '{node_id}' ({side} side)")]
    UnknownNodeReference { node_id: String, side: &'static str },

    /// Topological sort detected a cycle.
    #[error("workflow graph contains a cycle")]
    CycleDetected,

    /// A node's `node_type` has no matching entry in the action registry.
    #[error("node '{node_id}' has unknown node_type '{node_type}'")]
    UnknownNodeType { node_id: String, node_type: String },
}
