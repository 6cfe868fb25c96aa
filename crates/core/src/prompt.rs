//! Named prompt templates.
//!
//! Each template is a TOML document with a `system` string and an optional
//! `user` string. The built-in set is compiled into the binary; a configured
//! directory of `<name>.toml` files takes precedence over it.
//!
//! Placeholders are written `{name}`. Literal braces are escaped as `{{` and
//! `}}`. [`PromptLoader::load`] returns the raw text, and
//! [`PromptLoader::format`] substitutes placeholders in every field.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::debug;
use crate::error::PromptError;

const BUILTIN: &[(&str, &str)] = &[
    ("analyst", include_str!("../../../prompts/analyst.toml")),
    ("command_agent", include_str!("../../../prompts/command_agent.toml")),
    ("cli_agent", include_str!("../../../prompts/cli_agent.toml")),
    ("code_debugger", include_str!("../../../prompts/code_debugger.toml")),
    ("code_reviewer", include_str!("../../../prompts/code_reviewer.toml")),
];

/// A loaded prompt template.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PromptTemplate {
    /// System instructions
    pub system: String,

    /// User message body (empty when the caller supplies its own)
    #[serde(default)]
    pub user: String,
}

/// Resolves prompt templates by name.
#[derive(Debug, Clone, Default)]
pub struct PromptLoader {
    dir: Option<PathBuf>,
}

impl PromptLoader {
    /// A loader that only knows the compiled-in templates.
    pub fn builtin() -> Self {
        Self { dir: None }
    }

    /// A loader that checks `dir` first, then the compiled-in templates.
    pub fn with_dir(dir: impl Into<PathBuf>) -> Self {
        Self { dir: Some(dir.into()) }
    }

    pub fn dir(&self) -> Option<&Path> {
        self.dir.as_deref()
    }

    /// Names of the compiled-in templates.
    pub fn builtin_names() -> impl Iterator<Item = &'static str> {
        BUILTIN.iter().map(|(name, _)| *name)
    }

    /// Load a template without substituting placeholders.
    pub fn load(&self, name: &str) -> Result<PromptTemplate, PromptError> {
        let source = self.source(name)?;
        toml::from_str(&source).map_err(|e| PromptError::ParseFailed {
            name: name.to_string(),
            reason: e.to_string(),
        })
    }

    /// Load a template and substitute `vars` into every field.
    pub fn format(&self, name: &str, vars: &[(&str, &str)]) -> Result<PromptTemplate, PromptError> {
        let template = self.load(name)?;
        Ok(PromptTemplate {
            system: render(name, &template.system, vars)?,
            user: render(name, &template.user, vars)?,
        })
    }

    fn source(&self, name: &str) -> Result<String, PromptError> {
        if let Some(dir) = &self.dir {
            let path = dir.join(format!("{name}.toml"));
            if path.is_file() {
                debug!(template = name, path = %path.display(), "Loading prompt override");
                return std::fs::read_to_string(&path).map_err(|e| PromptError::ReadFailed {
                    name: name.to_string(),
                    reason: e.to_string(),
                });
            }
        }

        BUILTIN
            .iter()
            .find(|(builtin, _)| *builtin == name)
            .map(|(_, text)| (*text).to_string())
            .ok_or_else(|| PromptError::NotFound(name.to_string()))
    }
}

/// Substitute `{placeholder}`s in `template`.
///
/// Unused variables are ignored. An unknown placeholder, an unclosed `{` or
/// a lone `}` is an error.
pub fn render(name: &str, template: &str, vars: &[(&str, &str)]) -> Result<String, PromptError> {
    let mut out = String::with_capacity(template.len());
    let mut chars = template.chars().peekable();

    while let Some(c) = chars.next() {
        match c {
            '{' if chars.peek() == Some(&'{') => {
                chars.next();
                out.push('{');
            }
            '{' => {
                let mut key = String::new();
                let mut closed = false;
                for next in chars.by_ref() {
                    if next == '}' {
                        closed = true;
                        break;
                    }
                    key.push(next);
                }
                if !closed {
                    return Err(malformed(name, "unclosed '{'"));
                }
                let key = key.trim();
                if key.is_empty() || !key.chars().all(|ch| ch.is_alphanumeric() || ch == '_') {
                    return Err(malformed(name, &format!("invalid placeholder '{{{key}}}'")));
                }
                let value = vars
                    .iter()
                    .find(|(k, _)| *k == key)
                    .map(|(_, v)| *v)
                    .ok_or_else(|| PromptError::MissingPlaceholder {
                        name: name.to_string(),
                        placeholder: key.to_string(),
                    })?;
                out.push_str(value);
            }
            '}' if chars.peek() == Some(&'}') => {
                chars.next();
                out.push('}');
            }
            '}' => return Err(malformed(name, "single '}' encountered")),
            other => out.push(other),
        }
    }

    Ok(out)
}

fn malformed(name: &str, reason: &str) -> PromptError {
    PromptError::Malformed {
        name: name.to_string(),
        reason: reason.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builtin_templates_parse() {
        let loader = PromptLoader::builtin();
        for name in PromptLoader::builtin_names() {
            let template = loader.load(name).unwrap();
            assert!(!template.system.is_empty(), "{name} has an empty system prompt");
        }
    }

    #[test]
    fn debugger_and_reviewer_format_cleanly() {
        let loader = PromptLoader::builtin();
        let debug = loader
            .format("code_debugger", &[("code", "print(x)"), ("error", "NameError")])
            .unwrap();
        assert!(debug.user.contains("print(x)"));
        assert!(debug.user.contains("NameError"));

        let review = loader
            .format("code_reviewer", &[("code", "print(1)"), ("result", "1")])
            .unwrap();
        assert!(review.user.contains("print(1)"));
    }

    #[test]
    fn render_substitutes_and_unescapes() {
        let out = render("t", "fix {code} -> {{\"ok\": true}}", &[("code", "x = 1")]).unwrap();
        assert_eq!(out, "fix x = 1 -> {\"ok\": true}");
    }

    #[test]
    fn render_missing_placeholder_is_error() {
        let err = render("code_debugger", "{code} failed with {error}", &[("code", "x")]).unwrap_err();
        match err {
            PromptError::MissingPlaceholder { name, placeholder } => {
                assert_eq!(name, "code_debugger");
                assert_eq!(placeholder, "error");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn render_rejects_malformed_braces() {
        assert!(matches!(render("t", "open {code", &[("code", "")]), Err(PromptError::Malformed { .. })));
        assert!(matches!(render("t", "close }", &[]), Err(PromptError::Malformed { .. })));
        assert!(matches!(render("t", "{a b}", &[]), Err(PromptError::Malformed { .. })));
    }

    #[test]
    fn unknown_template_not_found() {
        let err = PromptLoader::builtin().load("nonexistent").unwrap_err();
        assert!(matches!(err, PromptError::NotFound(_)));
    }

    #[test]
    fn directory_overrides_builtin() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("analyst.toml"), "system = \"custom analyst\"\n").unwrap();

        let loader = PromptLoader::with_dir(dir.path());
        assert_eq!(loader.load("analyst").unwrap().system, "custom analyst");
        // Names missing from the directory fall back to the built-ins
        assert!(loader.load("cli_agent").is_ok());
    }

    #[test]
    fn unparseable_override_reports_parse_failure() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("cli_agent.toml"), "system = ").unwrap();
        let err = PromptLoader::with_dir(dir.path()).load("cli_agent").unwrap_err();
        assert!(matches!(err, PromptError::ParseFailed { .. }));
    }
}
