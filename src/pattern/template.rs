//! Template engine for binding substitution.
//!
//! This module provides a small template engine that performs `{{.NAME}}`
//! substitution in strings. It is used for:
//!
//! - Prompt templates (system and user text sent to the model)
//! - Command templates (shell commands run by command steps)
//!
//! # Syntax
//!
//! - `{{.NAME}}` - Substitutes the value of binding `NAME` (surrounding
//!   whitespace inside the braces is allowed: `{{ .NAME }}`)
//! - `{{/* ... */}}` - A comment, renders nothing
//! - A lone `}}` outside an action renders as itself
//!
//! # Missing Bindings
//!
//! A reference to a binding that is not set renders as the empty string. This
//! is what lets a pattern mention `{{.INPUT}}` whether or not anything was
//! piped in. Malformed actions, on the other hand, are always an error.

use regex::Regex;
use std::collections::HashMap;
use std::fmt;
use std::sync::LazyLock;

static IDENTIFIER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*$").expect("identifier regex is valid"));

/// Error type for template rendering failures.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TemplateError {
    /// A `{{` was found without a matching `}}`.
    UnclosedAction {
        /// The byte position of the unmatched `{{`.
        position: usize,
    },
    /// An empty action was found (e.g., `{{}}` or `{{  }}`).
    EmptyAction {
        /// The byte position of the empty action.
        position: usize,
    },
    /// The action is neither a binding reference nor a comment.
    UnsupportedAction {
        /// The trimmed action text.
        action: String,
        /// The byte position of the action.
        position: usize,
    },
}

impl fmt::Display for TemplateError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TemplateError::UnclosedAction { position } => {
                write!(f, "unclosed '{{{{' at position {} in template", position)
            }
            TemplateError::EmptyAction { position } => {
                write!(
                    f,
                    "empty action '{{{{}}}}' at position {} in template",
                    position
                )
            }
            TemplateError::UnsupportedAction { action, position } => {
                write!(
                    f,
                    "unsupported action '{}' at position {} in template (expected {{{{.NAME}}}})",
                    action, position
                )
            }
        }
    }
}

impl std::error::Error for TemplateError {}

/// Returns true if `name` can be referenced from a template as `{{.name}}`.
pub fn is_identifier(name: &str) -> bool {
    IDENTIFIER.is_match(name)
}

/// Render a template string by substituting bindings.
///
/// # Arguments
///
/// * `template` - The template string containing `{{.NAME}}` placeholders
/// * `variables` - A map of binding names to their values
///
/// # Returns
///
/// * `Ok(String)` - The rendered string with all references substituted
/// * `Err(TemplateError)` - If an action is malformed or unsupported
pub fn render_template(
    template: &str,
    variables: &HashMap<String, String>,
) -> Result<String, TemplateError> {
    let mut result = String::with_capacity(template.len());
    let mut rest = template;
    let mut offset = 0;

    while let Some(start) = rest.find("{{") {
        result.push_str(&rest[..start]);
        let position = offset + start;

        let inner = &rest[start + 2..];
        let Some(end) = inner.find("}}") else {
            return Err(TemplateError::UnclosedAction { position });
        };

        render_action(inner[..end].trim(), position, variables, &mut result)?;

        let consumed = start + 2 + end + 2;
        rest = &rest[consumed..];
        offset += consumed;
    }

    result.push_str(rest);
    Ok(result)
}

fn render_action(
    action: &str,
    position: usize,
    variables: &HashMap<String, String>,
    out: &mut String,
) -> Result<(), TemplateError> {
    if action.is_empty() {
        return Err(TemplateError::EmptyAction { position });
    }

    if action.starts_with("/*") && action.ends_with("*/") && action.len() >= 4 {
        return Ok(());
    }

    match action.strip_prefix('.') {
        Some(name) if is_identifier(name) => {
            if let Some(value) = variables.get(name) {
                out.push_str(value);
            }
            Ok(())
        }
        _ => Err(TemplateError::UnsupportedAction {
            action: action.to_string(),
            position,
        }),
    }
}

/// Helper to create a variables map from a list of key-value pairs.
#[cfg(test)]
pub fn vars<I, K, V>(pairs: I) -> HashMap<String, String>
where
    I: IntoIterator<Item = (K, V)>,
    K: Into<String>,
    V: Into<String>,
{
    pairs
        .into_iter()
        .map(|(k, v)| (k.into(), v.into()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_simple_substitution() {
        let vars = vars([("NAME", "Alice"), ("GREETING", "Hello")]);
        let result = render_template("{{.GREETING}}, {{.NAME}}!", &vars).unwrap();
        assert_eq!(result, "Hello, Alice!");
    }

    #[test]
    fn test_no_actions() {
        let vars = HashMap::new();
        let result = render_template("Just plain text", &vars).unwrap();
        assert_eq!(result, "Just plain text");
    }

    #[test]
    fn test_empty_template() {
        let vars = HashMap::new();
        let result = render_template("", &vars).unwrap();
        assert_eq!(result, "");
    }

    #[test]
    fn test_missing_binding_renders_empty() {
        let vars = HashMap::new();
        let result = render_template("before[{{.MISSING}}]after", &vars).unwrap();
        assert_eq!(result, "before[]after");
    }

    #[test]
    fn test_missing_bindings_never_error_for_any_map() {
        let maps = [
            HashMap::new(),
            vars([("INPUT", "x")]),
            vars([("PROMPT", ""), ("OTHER", "y")]),
        ];
        for map in &maps {
            let result = render_template("{{.UNSET_KEY}}", map).unwrap();
            assert_eq!(result, "");
        }
    }

    #[test]
    fn test_whitespace_inside_action() {
        let vars = vars([("NAME", "Alice")]);
        let result = render_template("Hello {{ .NAME }}!", &vars).unwrap();
        assert_eq!(result, "Hello Alice!");
    }

    #[test]
    fn test_comment_renders_nothing() {
        let vars = vars([("X", "value")]);
        let result = render_template("a{{/* note */}}b {{.X}}", &vars).unwrap();
        assert_eq!(result, "ab value");
    }

    #[test]
    fn test_unclosed_action_error() {
        let vars = HashMap::new();
        let err = render_template("Hello {{.NAME", &vars).unwrap_err();
        assert_eq!(err, TemplateError::UnclosedAction { position: 6 });
    }

    #[test]
    fn test_unbalanced_closing_is_unclosed() {
        let vars = HashMap::new();
        let err = render_template("system {{ .MISSING } ", &vars).unwrap_err();
        assert_eq!(err, TemplateError::UnclosedAction { position: 7 });
    }

    #[test]
    fn test_empty_action_error() {
        let vars = HashMap::new();
        let err = render_template("Hello {{ }}", &vars).unwrap_err();
        assert_eq!(err, TemplateError::EmptyAction { position: 6 });
    }

    #[test]
    fn test_control_syntax_is_unsupported() {
        let vars = vars([("X", "1")]);
        let err = render_template("{{ if .X }}yes{{ end }}", &vars).unwrap_err();
        match err {
            TemplateError::UnsupportedAction { action, position } => {
                assert_eq!(action, "if .X");
                assert_eq!(position, 0);
            }
            other => panic!("unexpected error type: {:?}", other),
        }
    }

    #[test]
    fn test_bare_name_without_dot_is_unsupported() {
        let vars = vars([("NAME", "Alice")]);
        let err = render_template("{{NAME}}", &vars).unwrap_err();
        assert!(matches!(err, TemplateError::UnsupportedAction { .. }));
    }

    #[test]
    fn test_invalid_identifier_is_unsupported() {
        let vars = vars([("my-var", "x")]);
        let err = render_template("{{.my-var}}", &vars).unwrap_err();
        assert!(matches!(err, TemplateError::UnsupportedAction { .. }));
    }

    #[test]
    fn test_lone_closing_braces() {
        let vars = HashMap::new();
        let result = render_template("a }} b } c", &vars).unwrap();
        assert_eq!(result, "a }} b } c");
    }

    #[test]
    fn test_single_braces_are_literal() {
        let vars = vars([("X", "v")]);
        let result = render_template("fn main() { {{.X}} }", &vars).unwrap();
        assert_eq!(result, "fn main() { v }");
    }

    #[test]
    fn test_multiple_occurrences() {
        let vars = vars([("X", "X")]);
        let result = render_template("{{.X}}-{{.X}}-{{.X}}", &vars).unwrap();
        assert_eq!(result, "X-X-X");
    }

    #[test]
    fn test_adjacent_references() {
        let vars = vars([("A", "A"), ("B", "B")]);
        let result = render_template("{{.A}}{{.B}}", &vars).unwrap();
        assert_eq!(result, "AB");
    }

    #[test]
    fn test_names_are_case_sensitive() {
        let vars = vars([("input", "lower")]);
        let result = render_template("[{{.INPUT}}][{{.input}}]", &vars).unwrap();
        assert_eq!(result, "[][lower]");
    }

    #[test]
    fn test_braces_in_value_are_not_reparsed() {
        let vars = vars([("CODE", "{{.OTHER}}"), ("OTHER", "nope")]);
        let result = render_template("Code: {{.CODE}}", &vars).unwrap();
        assert_eq!(result, "Code: {{.OTHER}}");
    }

    #[test]
    fn test_unicode_in_template_and_values() {
        let vars = vars([("EMOJI", "🎉"), ("TEXT", "日本語")]);
        let result = render_template("Hello {{.EMOJI}} {{.TEXT}}!", &vars).unwrap();
        assert_eq!(result, "Hello 🎉 日本語!");
    }

    #[test]
    fn test_is_identifier() {
        assert!(is_identifier("INPUT"));
        assert!(is_identifier("_private"));
        assert!(is_identifier("step1_out"));
        assert!(!is_identifier(""));
        assert!(!is_identifier("1abc"));
        assert!(!is_identifier("my-var"));
        assert!(!is_identifier("a b"));
    }

    #[test]
    fn test_error_display() {
        let err = TemplateError::UnclosedAction { position: 5 };
        assert_eq!(err.to_string(), "unclosed '{{' at position 5 in template");

        let err = TemplateError::EmptyAction { position: 3 };
        assert_eq!(err.to_string(), "empty action '{{}}' at position 3 in template");

        let err = TemplateError::UnsupportedAction {
            action: "if .X".to_string(),
            position: 0,
        };
        assert_eq!(
            err.to_string(),
            "unsupported action 'if .X' at position 0 in template (expected {{.NAME}})"
        );
    }
}
