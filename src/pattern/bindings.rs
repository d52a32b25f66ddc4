//! Variable bindings threaded through a pattern run.
//!
//! A [`Bindings`] value is created once per run, seeded with the piped input
//! and the extra prompt, and mutated in place as each step commits its output.

use rand::Rng;
use rand::distr::Alphanumeric;
use std::collections::HashMap;
use std::sync::LazyLock;

/// Binding holding the raw text piped into the process.
pub const INPUT_VAR: &str = "INPUT";

/// Binding holding the positional words joined by a space.
pub const PROMPT_VAR: &str = "PROMPT";

static PIPE_VAR: LazyLock<String> = LazyLock::new(|| {
    let nonce: String = rand::rng()
        .sample_iter(&Alphanumeric)
        .take(16)
        .map(char::from)
        .collect();
    format!("PIPE_{}", nonce)
});

/// Name of the pipe variable for this process.
///
/// The suffix is random so that it cannot collide with an output name chosen
/// in a pattern definition.
pub fn pipe_var() -> &'static str {
    PIPE_VAR.as_str()
}

/// Named string values visible to templates during one pattern run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Bindings {
    values: HashMap<String, String>,
}

impl Bindings {
    /// Seed bindings for a new run.
    ///
    /// `INPUT` and the pipe variable both start as `input`; `PROMPT` starts as
    /// `prompt`. Absent values become empty strings.
    pub fn new(input: Option<&str>, prompt: Option<&str>) -> Self {
        let input = input.unwrap_or_default();
        let mut values = HashMap::new();
        values.insert(INPUT_VAR.to_string(), input.to_string());
        values.insert(pipe_var().to_string(), input.to_string());
        values.insert(
            PROMPT_VAR.to_string(),
            prompt.unwrap_or_default().to_string(),
        );
        Self { values }
    }

    /// Value of `name`, or the empty string when unset.
    pub fn get(&self, name: &str) -> &str {
        self.values.get(name).map(String::as_str).unwrap_or("")
    }

    /// Bind `name` to `value`, replacing any earlier value.
    pub fn set(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.values.insert(name.into(), value.into());
    }

    /// Current value of the pipe variable.
    pub fn pipe(&self) -> &str {
        self.get(pipe_var())
    }

    /// Overwrite the pipe variable.
    pub fn set_pipe(&mut self, value: impl Into<String>) {
        self.set(pipe_var(), value);
    }

    pub fn input(&self) -> &str {
        self.get(INPUT_VAR)
    }

    pub fn prompt(&self) -> &str {
        self.get(PROMPT_VAR)
    }

    /// Raw values, as handed to prompt templates.
    pub fn as_map(&self) -> &HashMap<String, String> {
        &self.values
    }

    /// A parallel map with every value shell-quoted, as handed to command
    /// templates.
    pub fn shell_escaped(&self) -> HashMap<String, String> {
        self.values
            .iter()
            .map(|(k, v)| (k.clone(), shell_quote(v)))
            .collect()
    }
}

/// Quote `value` so that a POSIX shell reads it back as exactly one word.
///
/// The empty string becomes `''`. Values made only of word characters pass
/// through untouched. Anything else (whitespace, quotes, backslashes, `$`,
/// backticks, and other shell metacharacters such as `;` or `|`) is wrapped in
/// single quotes, with each embedded `'` written as `'"'"'`.
pub fn shell_quote(value: &str) -> String {
    if value.is_empty() {
        return "''".to_string();
    }
    if value.chars().all(is_shell_safe) {
        return value.to_string();
    }
    format!("'{}'", value.replace('\'', r#"'"'"'"#))
}

fn is_shell_safe(c: char) -> bool {
    c.is_alphanumeric() || matches!(c, '_' | '-' | '.' | '/' | ',' | ':' | '=' | '@' | '+' | '%')
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::process::Command;

    #[test]
    fn test_new_seeds_reserved_bindings() {
        let bindings = Bindings::new(Some("stdin text"), Some("extra words"));
        assert_eq!(bindings.input(), "stdin text");
        assert_eq!(bindings.pipe(), "stdin text");
        assert_eq!(bindings.prompt(), "extra words");
    }

    #[test]
    fn test_new_without_values_uses_empty_strings() {
        let bindings = Bindings::new(None, None);
        assert_eq!(bindings.as_map().get(INPUT_VAR), Some(&String::new()));
        assert_eq!(bindings.as_map().get(pipe_var()), Some(&String::new()));
        assert_eq!(bindings.as_map().get(PROMPT_VAR), Some(&String::new()));
    }

    #[test]
    fn test_get_missing_is_empty() {
        let bindings = Bindings::new(None, None);
        assert_eq!(bindings.get("NOPE"), "");
    }

    #[test]
    fn test_set_pipe_leaves_input_alone() {
        let mut bindings = Bindings::new(Some("original"), None);
        bindings.set_pipe("step output");
        assert_eq!(bindings.pipe(), "step output");
        assert_eq!(bindings.input(), "original");
    }

    #[test]
    fn test_pipe_var_is_stable_and_prefixed() {
        assert_eq!(pipe_var(), pipe_var());
        assert!(pipe_var().starts_with("PIPE_"));
        assert_eq!(pipe_var().len(), "PIPE_".len() + 16);
        assert!(crate::pattern::template::is_identifier(pipe_var()));
    }

    #[test]
    fn test_shell_escaped_quotes_every_value() {
        let mut bindings = Bindings::new(Some("two words"), None);
        bindings.set("PLAIN", "plain");
        let escaped = bindings.shell_escaped();
        assert_eq!(escaped.get(INPUT_VAR).unwrap(), "'two words'");
        assert_eq!(escaped.get(PROMPT_VAR).unwrap(), "''");
        assert_eq!(escaped.get("PLAIN").unwrap(), "plain");
    }

    #[test]
    fn test_shell_quote_cases() {
        assert_eq!(shell_quote(""), "''");
        assert_eq!(shell_quote("simple"), "simple");
        assert_eq!(shell_quote("a/b-c.d"), "a/b-c.d");
        assert_eq!(shell_quote("hello world"), "'hello world'");
        assert_eq!(shell_quote("it's"), r#"'it'"'"'s'"#);
        assert_eq!(shell_quote("$HOME"), "'$HOME'");
        assert_eq!(shell_quote("`id`"), "'`id`'");
        assert_eq!(shell_quote("a\\b"), "'a\\b'");
        assert_eq!(shell_quote("tab\there"), "'tab\there'");
        assert_eq!(shell_quote("a;b"), "'a;b'");
        assert_eq!(shell_quote("~/notes"), "'~/notes'");
    }

    const TRICKY: &[&str] = &[
        "",
        "plain",
        "hello world",
        "it's",
        "'",
        "''",
        "say \"hi\"",
        "back\\slash",
        "$HOME and ${PATH}",
        "`rm -rf /`",
        "$(echo pwned)",
        "multi\nline\ttext",
        "  leading and trailing  ",
        "mix 'single' \"double\" \\ $ `",
        "a; echo injected",
        "x | y && z",
        "*.rs",
        "#not-a-comment",
        "日本語",
    ];

    #[test]
    fn test_shell_quote_round_trips_through_word_splitting() {
        for value in TRICKY {
            let quoted = shell_quote(value);
            let words = shell_words::split(&quoted).unwrap();
            assert_eq!(words, vec![value.to_string()], "quoted form: {}", quoted);
        }
    }

    #[cfg(unix)]
    #[test]
    fn test_shell_quote_round_trips_through_sh() {
        for value in TRICKY {
            let script = format!("printf '%s' {}", shell_quote(value));
            let output = Command::new("/bin/sh").arg("-c").arg(&script).output().unwrap();
            assert!(output.status.success());
            assert_eq!(String::from_utf8(output.stdout).unwrap(), *value);
        }
    }
}
