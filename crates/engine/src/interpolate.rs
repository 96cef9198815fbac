//! Variable interpolation.
//!
//! Single-pass `{{identifier}}` substitution over a `serde_json::Value`
//! tree. Unknown tokens are left verbatim. Substituted text is never
//! re-scanned, so a variable whose own value contains `{{other}}` does not
//! trigger a second round of expansion.

use std::collections::HashMap;
use std::sync::OnceLock;

use regex::Regex;
use serde_json::{Map, Value};

fn pattern() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\{\{(\w+)\}\}").unwrap())
}

/// Recursively interpolates every string in `value`, leaving other JSON
/// types untouched.
pub fn interpolate(value: &Value, variables: &HashMap<String, Value>) -> Value {
    match value {
        Value::String(s) => Value::String(interpolate_str(s, variables)),
        Value::Array(items) => Value::Array(items.iter().map(|v| interpolate(v, variables)).collect()),
        Value::Object(map) => {
            let mut out = Map::with_capacity(map.len());
            for (k, v) in map {
                out.insert(k.clone(), interpolate(v, variables));
            }
            Value::Object(out)
        }
        other => other.clone(),
    }
}

/// Interpolates `{{name}}` tokens in a single string.
pub fn interpolate_str(input: &str, variables: &HashMap<String, Value>) -> String {
    pattern()
        .replace_all(input, |caps: &regex::Captures| match variables.get(&caps[1]) {
            Some(v) => plain_string(v),
            None => caps[0].to_string(),
        })
        .into_owned()
}

fn plain_string(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn vars(pairs: &[(&str, Value)]) -> HashMap<String, Value> {
        pairs.iter().map(|(k, v)| (k.to_string(), v.clone())).collect()
    }

    #[test]
    fn substitutes_known_variable() {
        let vars = vars(&[("name", json!("Ada"))]);
        assert_eq!(interpolate_str("Hello, {{name}}!", &vars), "Hello, Ada!");
    }

    #[test]
    fn unknown_token_is_left_verbatim() {
        let vars = vars(&[]);
        assert_eq!(interpolate_str("Hello, {{name}}!", &vars), "Hello, {{name}}!");
    }

    #[test]
    fn non_string_values_use_their_display_form() {
        let vars = vars(&[("count", json!(3))]);
        assert_eq!(interpolate_str("total: {{count}}", &vars), "total: 3");
    }

    #[test]
    fn recurses_into_nested_structures() {
        let vars = vars(&[("x", json!("value"))]);
        let input = json!({ "a": ["{{x}}", 1], "b": "{{x}}" });
        let out = interpolate(&input, &vars);
        assert_eq!(out, json!({ "a": ["value", 1], "b": "value" }));
    }

    #[test]
    fn substituted_text_is_not_re_expanded() {
        // "other" itself contains a literal `{{x}}` — a second pass over
        // ITS OWN raw value is never performed during a single interpolate.
        let vars = vars(&[("other", json!("{{x}}")), ("x", json!("real"))]);
        assert_eq!(interpolate_str("{{other}}", &vars), "{{x}}");
    }

    #[test]
    fn applying_twice_is_a_no_op_once_already_substituted() {
        let vars = vars(&[("name", json!("Ada"))]);
        let once = interpolate_str("Hello, {{name}}!", &vars);
        let twice = interpolate_str(&once, &vars);
        assert_eq!(once, twice);
    }
}
