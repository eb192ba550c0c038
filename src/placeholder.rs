//! `${name}` placeholder extraction and substitution

use std::sync::OnceLock;

use regex::Regex;
use serde_json::{Map, Value};

fn placeholder_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"\$\{([^}]+)\}").expect("placeholder pattern is valid"))
}

/// Extract placeholder names in order of appearance
///
/// Names may contain spaces. An unterminated `${` is not a placeholder.
/// Duplicates are reported once.
pub fn extract_placeholders(template: &str) -> Vec<String> {
    let mut names: Vec<String> = Vec::new();
    for captures in placeholder_pattern().captures_iter(template) {
        let name = &captures[1];
        if !names.iter().any(|n| n == name) {
            names.push(name.to_string());
        }
    }
    names
}

/// Replace every `${key}` for each supplied key
///
/// Placeholders without a supplied value are left untouched. Non-string
/// values are rendered as JSON text.
pub fn substitute_placeholders(template: &str, values: &Map<String, Value>) -> String {
    placeholder_pattern()
        .replace_all(template, |captures: &regex::Captures<'_>| {
            match values.get(&captures[1]) {
                Some(value) => value_text(value),
                None => captures[0].to_string(),
            }
        })
        .into_owned()
}

/// Textual form of a value for string interpolation
pub(crate) fn value_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_extract_in_order() {
        assert_eq!(
            extract_placeholders("${A}-${B}-${A}"),
            vec!["A".to_string(), "B".to_string()]
        );
    }

    #[test]
    fn test_extract_names_with_spaces() {
        assert_eq!(extract_placeholders("Hi ${First Name}!"), vec!["First Name"]);
    }

    #[test]
    fn test_extract_ignores_unterminated() {
        assert_eq!(extract_placeholders("${Done} and ${open"), vec!["Done"]);
        assert!(extract_placeholders("no placeholders ${").is_empty());
    }

    #[test]
    fn test_extract_pseudo_parameter_names() {
        assert_eq!(
            extract_placeholders("arn:${AWS::Partition}:s3:::${Bucket}"),
            vec!["AWS::Partition", "Bucket"]
        );
    }

    #[test]
    fn test_substitute_supplied_only() {
        let mut values = Map::new();
        values.insert("Name".into(), json!("Bob"));
        assert_eq!(
            substitute_placeholders("${Name} meets ${Other}", &values),
            "Bob meets ${Other}"
        );
    }

    #[test]
    fn test_substitute_every_occurrence_and_non_strings() {
        let mut values = Map::new();
        values.insert("N".into(), json!(3));
        values.insert("On".into(), json!(true));
        assert_eq!(
            substitute_placeholders("${N}/${N} ${On}", &values),
            "3/3 true"
        );
    }
}
