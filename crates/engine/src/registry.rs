//! Action registry.
//!
//! Write-once-at-init map from `node_type` to its implementation and
//! schema metadata. Built from [`nodes::builtin_actions`] — an explicit
//! call rather than a decorator-style registration, since there's no
//! decorator mechanism in Rust.

use std::collections::HashMap;
use std::sync::Arc;

use nodes::{builtin_actions, ActionSpec, ExecutableNode};
use serde_json::Value;

/// One registered action: its schema plus the implementation to dispatch to.
pub struct ActionDefinition {
    pub name: &'static str,
    pub label: &'static str,
    pub description: &'static str,
    pub category: &'static str,
    pub parameters: Value,
    pub node: Arc<dyn ExecutableNode>,
}

impl From<ActionSpec> for ActionDefinition {
    fn from(spec: ActionSpec) -> Self {
        Self {
            name: spec.name,
            label: spec.label,
            description: spec.description,
            category: spec.category,
            parameters: spec.parameters,
            node: spec.node,
        }
    }
}

pub struct ActionRegistry {
    definitions: HashMap<&'static str, ActionDefinition>,
}

impl ActionRegistry {
    /// Builds a registry seeded with every built-in action.
    pub fn with_builtins() -> Self {
        let mut definitions = HashMap::new();
        for spec in builtin_actions() {
            let def: ActionDefinition = spec.into();
            definitions.insert(def.name, def);
        }
        Self { definitions }
    }

    /// Registers (or overwrites) an action definition. Intended for
    /// process-init-time use only — there is no locking, since the
    /// registry is never mutated once a run is in flight.
    pub fn register(&mut self, definition: ActionDefinition) {
        self.definitions.insert(definition.name, definition);
    }

    pub fn lookup(&self, name: &str) -> Option<&ActionDefinition> {
        self.definitions.get(name)
    }

    /// Every registered action's schema, excluding the internal `base`
    /// category (`start`/`end`), for a client-facing action palette.
    pub fn list_schemas(&self) -> Vec<&ActionDefinition> {
        let mut defs: Vec<&ActionDefinition> = self.definitions.values().filter(|d| d.category != "base").collect();
        defs.sort_by_key(|d| d.name);
        defs
    }
}

impl Default for ActionRegistry {
    fn default() -> Self {
        Self::with_builtins()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builtins_are_all_registered() {
        let registry = ActionRegistry::with_builtins();
        assert!(registry.lookup("navigate").is_some());
        assert!(registry.lookup("click").is_some());
        assert!(registry.lookup("ai_action").is_some());
        assert!(registry.lookup("nonexistent").is_none());
    }

    #[test]
    fn list_schemas_excludes_base_category() {
        let registry = ActionRegistry::with_builtins();
        let schemas = registry.list_schemas();
        assert!(schemas.iter().all(|d| d.category != "base"));
        assert!(schemas.iter().any(|d| d.name == "navigate"));
    }

    #[test]
    fn register_overwrites_existing_entry_by_name() {
        let mut registry = ActionRegistry::with_builtins();
        let original_label = registry.lookup("navigate").unwrap().label;
        assert_eq!(original_label, "Navigate");

        let replacement = registry.lookup("navigate").unwrap();
        let node = replacement.node.clone();
        registry.register(ActionDefinition {
            name: "navigate",
            label: "Navigate (custom)",
            description: "overridden",
            category: "browser",
            parameters: serde_json::json!({}),
            node,
        });

        assert_eq!(registry.lookup("navigate").unwrap().label, "Navigate (custom)");
    }
}
