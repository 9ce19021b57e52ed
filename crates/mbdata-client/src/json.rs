//! Helpers for the provider's loosely typed JSON

use serde_json::Value;

/// Null, an empty array or an empty object
pub(crate) fn is_empty(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::Array(a) => a.is_empty(),
        Value::Object(o) => o.is_empty(),
        _ => false,
    }
}

/// Render a scalar the way the provider documents it: strings verbatim,
/// numbers and booleans in their JSON form, null as an empty string.
pub(crate) fn as_text(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Iterate array entries up to the first empty one.
///
/// The provider terminates its arrays with an empty element in some
/// responses, so the walk stops at the first null/empty entry after index 0.
/// Entry 0 is always visited.
pub(crate) fn probe_entries(entries: &[Value]) -> impl Iterator<Item = (usize, &Value)> {
    entries
        .iter()
        .enumerate()
        .take_while(|(index, entry)| *index == 0 || !is_empty(entry))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_is_empty() {
        assert!(is_empty(&json!(null)));
        assert!(is_empty(&json!({})));
        assert!(is_empty(&json!([])));
        assert!(!is_empty(&json!("")));
        assert!(!is_empty(&json!(0)));
    }

    #[test]
    fn test_as_text() {
        assert_eq!(as_text(&json!("1")), "1");
        assert_eq!(as_text(&json!(1234)), "1234");
        assert_eq!(as_text(&json!(12.5)), "12.5");
        assert_eq!(as_text(&json!(true)), "true");
        assert_eq!(as_text(&json!(null)), "");
    }

    #[test]
    fn test_probe_stops_at_first_empty_entry() {
        let entries = vec![json!({"a": 1}), json!({"b": 2}), json!({}), json!({"c": 3})];
        let visited: Vec<usize> = probe_entries(&entries).map(|(i, _)| i).collect();
        assert_eq!(visited, vec![0, 1]);
    }

    #[test]
    fn test_probe_always_visits_first_entry() {
        let entries = vec![json!(null), json!({"b": 2})];
        let visited: Vec<usize> = probe_entries(&entries).map(|(i, _)| i).collect();
        assert_eq!(visited, vec![0, 1]);

        let visited: Vec<usize> = probe_entries(&[]).map(|(i, _)| i).collect();
        assert!(visited.is_empty());
    }
}
