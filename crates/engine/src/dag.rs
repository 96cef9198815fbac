//! DAG validation — run this before executing a workflow.
//!
//! Rules enforced:
//! 1. Node IDs must be unique within the workflow.
//! 2. Every edge must reference valid node IDs (both `source` and `target`).
//! 3. The directed graph must be acyclic (topological sort must succeed).
//!
//! Returns a topologically-sorted list of node IDs on success, with ties
//! broken by the node's position in `workflow.nodes` rather than by
//! whatever order a `HashMap` happens to iterate in — two nodes that both
//! become ready at the same step always appear in their authored order.

use std::collections::{HashMap, HashSet};

use crate::{models::Workflow, EngineError};

/// Validate the workflow's DAG and return nodes in topological execution order.
///
/// # Errors
/// - [`EngineError::DuplicateNodeId`] if two nodes share an ID.
/// - [`EngineError::UnknownNodeReference`] if an edge references a missing node.
/// - [`EngineError::CycleDetected`] if the graph is not acyclic.
pub fn validate_dag(workflow: &Workflow) -> Result<Vec<String>, EngineError> {
    let mut seen_ids: HashSet<&str> = HashSet::new();
    for node in &workflow.nodes {
        if !seen_ids.insert(node.id.as_str()) {
            return Err(EngineError::DuplicateNodeId(node.id.clone()));
        }
    }

    let node_set: HashSet<&str> = workflow.nodes.iter().map(|n| n.id.as_str()).collect();

    for edge in &workflow.edges {
        if !node_set.contains(edge.source.as_str()) {
            return Err(EngineError::UnknownNodeReference { node_id: edge.source.clone(), side: "source" });
        }
        if !node_set.contains(edge.target.as_str()) {
            return Err(EngineError::UnknownNodeReference { node_id: edge.target.clone(), side: "target" });
        }
    }

    let mut adjacency: HashMap<&str, Vec<&str>> = HashMap::new();
    let mut in_degree: HashMap<&str, usize> = HashMap::new();
    for node in &workflow.nodes {
        adjacency.entry(node.id.as_str()).or_default();
        in_degree.entry(node.id.as_str()).or_insert(0);
    }
    for edge in &workflow.edges {
        adjacency.entry(edge.source.as_str()).or_default().push(edge.target.as_str());
        *in_degree.entry(edge.target.as_str()).or_insert(0) += 1;
    }

    let mut remaining: HashSet<&str> = node_set.clone();
    let mut sorted: Vec<String> = Vec::with_capacity(workflow.nodes.len());

    while !remaining.is_empty() {
        // Scan in authored order so simultaneous ties resolve deterministically.
        let next = workflow
            .nodes
            .iter()
            .map(|n| n.id.as_str())
            .find(|id| remaining.contains(id) && in_degree[id] == 0);

        let Some(node_id) = next else {
            return Err(EngineError::CycleDetected);
        };

        remaining.remove(node_id);
        sorted.push(node_id.to_owned());

        if let Some(neighbours) = adjacency.get(node_id) {
            for &neighbour in neighbours {
                if let Some(degree) = in_degree.get_mut(neighbour) {
                    *degree -= 1;
                }
            }
        }
    }

    Ok(sorted)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Edge, NodeDefinition};
    use chrono::Utc;
    use uuid::Uuid;

    fn make_node(id: &str) -> NodeDefinition {
        NodeDefinition { id: id.to_string(), node_type: "mock".into(), label: id.to_string(), config: serde_json::Value::Null }
    }

    fn make_workflow(nodes: Vec<NodeDefinition>, edges: Vec<Edge>) -> Workflow {
        Workflow { id: Uuid::new_v4(), name: "test".into(), nodes, edges, created_at: Utc::now() }
    }

    #[test]
    fn valid_linear_dag_returns_sorted_order() {
        let workflow = make_workflow(
            vec![make_node("a"), make_node("b"), make_node("c")],
            vec![
                Edge { source: "a".into(), target: "b".into() },
                Edge { source: "b".into(), target: "c".into() },
            ],
        );

        let sorted = validate_dag(&workflow).expect("should be valid");
        assert_eq!(sorted, vec!["a", "b", "c"]);
    }

    #[test]
    fn valid_diamond_dag() {
        let workflow = make_workflow(
            vec![make_node("a"), make_node("b"), make_node("c"), make_node("d")],
            vec![
                Edge { source: "a".into(), target: "b".into() },
                Edge { source: "a".into(), target: "c".into() },
                Edge { source: "b".into(), target: "d".into() },
                Edge { source: "c".into(), target: "d".into() },
            ],
        );

        let sorted = validate_dag(&workflow).expect("should be valid");
        assert_eq!(sorted.first().unwrap(), "a");
        assert_eq!(sorted.last().unwrap(), "d");
        assert_eq!(sorted.len(), 4);
    }

    #[test]
    fn simultaneous_ties_resolve_in_authored_order_not_alphabetical() {
        // All three are ready at once; alphabetical order would yield
        // a, m, z — the authored order must win instead.
        let workflow = make_workflow(
            vec![make_node("z"), make_node("m"), make_node("a")],
            vec![],
        );
        let sorted = validate_dag(&workflow).expect("should be valid");
        assert_eq!(sorted, vec!["z", "m", "a"]);
    }

    #[test]
    fn node_freed_later_still_yields_to_an_earlier_authored_node() {
        // b depends on a, so b only becomes ready after a runs. c is ready
        // from the start but is authored after b, so it must still wait
        // its turn behind b once b frees up.
        let workflow = make_workflow(
            vec![make_node("a"), make_node("b"), make_node("c")],
            vec![Edge { source: "a".into(), target: "b".into() }],
        );
        let sorted = validate_dag(&workflow).expect("should be valid");
        assert_eq!(sorted, vec!["a", "b", "c"]);
    }

    #[test]
    fn duplicate_node_id_is_rejected() {
        let workflow = make_workflow(vec![make_node("a"), make_node("a")], vec![]);
        assert!(matches!(validate_dag(&workflow), Err(EngineError::DuplicateNodeId(id)) if id == "a"));
    }

    #[test]
    fn edge_referencing_missing_node_is_rejected() {
        let workflow = make_workflow(
            vec![make_node("a")],
            vec![Edge { source: "a".into(), target: "ghost".into() }],
        );
        assert!(matches!(
            validate_dag(&workflow),
            Err(EngineError::UnknownNodeReference { node_id, .. }) if node_id == "ghost"
        ));
    }

    #[test]
    fn cycle_is_detected() {
        let workflow = make_workflow(
            vec![make_node("a"), make_node("b"), make_node("c")],
            vec![
                Edge { source: "a".into(), target: "b".into() },
                Edge { source: "b".into(), target: "c".into() },
                Edge { source: "c".into(), target: "a".into() },
            ],
        );
        assert!(matches!(validate_dag(&workflow), Err(EngineError::CycleDetected)));
    }

    #[test]
    fn single_node_no_edges_is_valid() {
        let workflow = make_workflow(vec![make_node("solo")], vec![]);
        let sorted = validate_dag(&workflow).expect("single node should be valid");
        assert_eq!(sorted, vec!["solo"]);
    }
}
