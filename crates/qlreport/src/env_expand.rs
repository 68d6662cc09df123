//! Environment variable expansion for `qlreport.toml`.
//!
//! Expansion runs on the raw file text, before TOML parsing:
//!
//! - `${VAR}` is replaced with the value of `VAR` and fails when it is unset.
//! - `${VAR:-default}` falls back to `default` when `VAR` is unset or empty.
//!
//! A `$` not followed by `{` is left alone.
//!
//! ```ignore
//! std::env::set_var("QLREPORT_REF", "main");
//! let text = expand_env_vars("git_ref = \"${QLREPORT_REF:-HEAD}\"")?;
//! assert_eq!(text, "git_ref = \"main\"");
//! ```

use std::borrow::Cow;

use anyhow::{Result, bail};

const OPEN: &str = "${";
const DEFAULT_SEPARATOR: &str = ":-";

/// Expands every `${...}` reference in `text`.
pub fn expand_env_vars(text: &str) -> Result<Cow<'_, str>> {
    if !text.contains(OPEN) {
        return Ok(Cow::Borrowed(text));
    }

    let mut out = String::with_capacity(text.len());
    let mut rest = text;

    while let Some(start) = rest.find(OPEN) {
        out.push_str(&rest[..start]);
        let body_start = start + OPEN.len();

        let Some(len) = closing_brace(&rest[body_start..]) else {
            let preview: String = rest[body_start..].chars().take(20).collect();
            bail!(
                "Unclosed environment variable reference at byte {}: ${{{preview}...",
                text.len() - rest.len() + start
            );
        };

        let reference = &rest[body_start..body_start + len];
        out.push_str(&expand_reference(reference)?);
        rest = &rest[body_start + len + 1..];
    }
    out.push_str(rest);

    Ok(Cow::Owned(out))
}

/// Byte offset of the `}` that closes a reference whose `${` was just consumed.
/// Braces inside a default nest, so `${X:-{a}}` closes at the last brace.
fn closing_brace(body: &str) -> Option<usize> {
    let mut depth = 1usize;
    for (i, c) in body.char_indices() {
        match c {
            '{' => depth += 1,
            '}' => {
                depth -= 1;
                if depth == 0 {
                    return Some(i);
                }
            }
            _ => {}
        }
    }
    None
}

/// Expands the text between `${` and `}`.
fn expand_reference(reference: &str) -> Result<String> {
    let (name, default) = match reference.split_once(DEFAULT_SEPARATOR) {
        Some((name, default)) => (name, Some(default)),
        None => (reference, None),
    };
    validate_var_name(name)?;

    let value = std::env::var(name).ok();
    match (value, default) {
        (Some(v), Some(_)) if !v.is_empty() => Ok(v),
        (_, Some(default)) => Ok(default.to_string()),
        (Some(v), None) => Ok(v),
        (None, None) => bail!(
            "Environment variable '{name}' is not set. Use ${{{name}:-default}} to provide a default."
        ),
    }
}

fn validate_var_name(name: &str) -> Result<()> {
    let mut chars = name.chars();
    let Some(first) = chars.next() else {
        bail!("Empty environment variable name in ${{}}");
    };

    if !(first.is_ascii_alphabetic() || first == '_') {
        bail!("Invalid environment variable name '{name}': must start with a letter or underscore");
    }
    if let Some(bad) = chars.find(|c| !(c.is_ascii_alphanumeric() || *c == '_')) {
        bail!("Invalid environment variable name '{name}': contains invalid character '{bad}'");
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Runs `f` with `vars` set, removing them afterwards.
    fn with_env<R>(vars: &[(&str, &str)], f: impl FnOnce() -> R) -> R {
        for (key, value) in vars {
            std::env::set_var(key, value);
        }
        let result = f();
        for (key, _) in vars {
            std::env::remove_var(key);
        }
        result
    }

    fn without_env<R>(vars: &[&str], f: impl FnOnce() -> R) -> R {
        for var in vars {
            std::env::remove_var(var);
        }
        f()
    }

    #[test]
    fn text_without_references_is_borrowed() {
        let input = "max_chars = 64000";
        let result = expand_env_vars(input).unwrap();
        assert_eq!(result, input);
        assert!(matches!(result, Cow::Borrowed(_)));
    }

    #[test]
    fn expands_set_variable() {
        with_env(&[("QLR_TEST_REF", "release/1.0")], || {
            let result = expand_env_vars("git_ref = \"${QLR_TEST_REF}\"").unwrap();
            assert_eq!(result, "git_ref = \"release/1.0\"");
        });
    }

    #[test]
    fn default_used_when_unset_or_empty() {
        without_env(&["QLR_TEST_UNSET"], || {
            let result = expand_env_vars("pacing_ms = ${QLR_TEST_UNSET:-1000}").unwrap();
            assert_eq!(result, "pacing_ms = 1000");
        });
        with_env(&[("QLR_TEST_EMPTY", "")], || {
            let result = expand_env_vars("git_ref = \"${QLR_TEST_EMPTY:-HEAD}\"").unwrap();
            assert_eq!(result, "git_ref = \"HEAD\"");
        });
    }

    #[test]
    fn default_ignored_when_set() {
        with_env(&[("QLR_TEST_SET", "25")], || {
            let result = expand_env_vars("max_promoted = ${QLR_TEST_SET:-50}").unwrap();
            assert_eq!(result, "max_promoted = 25");
        });
    }

    #[test]
    fn default_may_contain_colons() {
        without_env(&["QLR_TEST_URL"], || {
            let result = expand_env_vars("x = \"${QLR_TEST_URL:-http://localhost:8080}\"").unwrap();
            assert_eq!(result, "x = \"http://localhost:8080\"");
        });
    }

    #[test]
    fn braces_in_default_nest() {
        without_env(&["QLR_TEST_NESTED"], || {
            let result = expand_env_vars("x = \"${QLR_TEST_NESTED:-{a}}\" # }").unwrap();
            assert_eq!(result, "x = \"{a}\" # }");
        });
        let unbalanced = expand_env_vars("x = \"${QLR_TEST_NESTED:-{a}\"").unwrap_err();
        assert!(unbalanced.to_string().contains("Unclosed"));
    }

    #[test]
    fn consecutive_references() {
        with_env(&[("QLR_TEST_A", "a"), ("QLR_TEST_B", "b")], || {
            let result = expand_env_vars("${QLR_TEST_A}${QLR_TEST_B}").unwrap();
            assert_eq!(result, "ab");
        });
    }

    #[test]
    fn missing_required_variable_is_an_error() {
        without_env(&["QLR_TEST_REQUIRED"], || {
            let err = expand_env_vars("x = \"${QLR_TEST_REQUIRED}\"")
                .unwrap_err()
                .to_string();
            assert!(err.contains("QLR_TEST_REQUIRED"));
            assert!(err.contains("not set"));
        });
    }

    #[test]
    fn malformed_references_are_errors() {
        let unclosed = expand_env_vars("x = \"${UNCLOSED").unwrap_err().to_string();
        assert!(unclosed.contains("Unclosed"));

        let empty = expand_env_vars("x = \"${}\"").unwrap_err().to_string();
        assert!(empty.contains("Empty"));

        let digit = expand_env_vars("x = \"${1VAR}\"").unwrap_err().to_string();
        assert!(digit.contains("Invalid"));

        let dash = expand_env_vars("x = \"${VAR-NAME}\"").unwrap_err().to_string();
        assert!(dash.contains("Invalid"));
    }

    #[test]
    fn bare_dollar_is_preserved() {
        let result = expand_env_vars("message = \"costs $5 and $$\"").unwrap();
        assert_eq!(result, "message = \"costs $5 and $$\"");
    }
}
