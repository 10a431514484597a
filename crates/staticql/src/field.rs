//! Field resolver.
//!
//! Walks a dot-path over a record's tagged value tree, auto-flattening
//! arrays at each step, and stringifies whatever terminals it lands on.
//! Never errors: an absent path simply yields an empty list.

use crate::value::Value;

pub fn resolve_field(root: &Value, dot_path: &str) -> Vec<String> {
    let segments: Vec<&str> = dot_path.split('.').filter(|s| !s.is_empty()).collect();
    let mut frontier = vec![root.clone()];
    for segment in &segments {
        frontier = step(&frontier, segment);
        if frontier.is_empty() {
            return Vec::new();
        }
    }
    frontier
        .into_iter()
        .filter_map(|v| v.to_index_string())
        .collect()
}

fn step(values: &[Value], segment: &str) -> Vec<Value> {
    let mut out = Vec::new();
    for value in values {
        match value {
            Value::Array(items) => {
                for item in items {
                    if let Some(next) = descend(item, segment) {
                        out.push(next);
                    }
                }
            }
            other => {
                if let Some(next) = descend(other, segment) {
                    out.push(next);
                }
            }
        }
    }
    out
}

fn descend(value: &Value, segment: &str) -> Option<Value> {
    match value {
        Value::Object(map) => map.get(segment).cloned().filter(|v| !v.is_null()),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    fn obj(pairs: &[(&str, Value)]) -> Value {
        Value::Object(pairs.iter().map(|(k, v)| (k.to_string(), v.clone())).collect())
    }

    #[test]
    fn resolves_simple_path() {
        let record = obj(&[("name", Value::String("ゴボウ".into()))]);
        assert_eq!(resolve_field(&record, "name"), vec!["ゴボウ".to_string()]);
    }

    #[test]
    fn missing_path_yields_empty() {
        let record = obj(&[("name", Value::String("x".into()))]);
        assert!(resolve_field(&record, "overview").is_empty());
    }

    #[test]
    fn flattens_across_arrays() {
        let tags = Value::Array(vec![
            obj(&[("slug", Value::String("a".into()))]),
            obj(&[("slug", Value::String("b".into()))]),
        ]);
        let record = obj(&[("tags", tags)]);
        assert_eq!(
            resolve_field(&record, "tags.slug"),
            vec!["a".to_string(), "b".to_string()]
        );
    }

    #[test]
    fn nulls_drop_silently() {
        let mut map = BTreeMap::new();
        map.insert("name".to_string(), Value::Null);
        let record = Value::Object(map);
        assert!(resolve_field(&record, "name").is_empty());
    }
}
