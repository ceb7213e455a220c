//! `{placeholder}` expansion for formula strings.
//!
//! Formula fields refer to layout paths by name (`{opt_lib}`, `{datadir}`),
//! and to dependency layouts as `{dep:field}` (`{gettext:opt_include}`).
//! `{{` and `}}` produce literal braces.

use std::collections::BTreeMap;
use std::path::PathBuf;

use thiserror::Error;

/// Error while expanding a template string.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum TemplateError {
    #[error("unknown placeholder `{{{name}}}` in `{template}`")]
    UnknownPlaceholder { name: String, template: String },

    #[error("unclosed `{{` in `{template}`")]
    Unclosed { template: String },

    #[error("unmatched `}}` in `{template}`")]
    Unmatched { template: String },
}

/// A set of named values available to templates.
#[derive(Debug, Clone, Default)]
pub struct TemplateVars {
    vars: BTreeMap<String, String>,
}

impl TemplateVars {
    pub fn new() -> Self {
        TemplateVars::default()
    }

    /// Set a variable, replacing any previous value.
    pub fn set(&mut self, name: impl Into<String>, value: impl Into<String>) -> &mut Self {
        self.vars.insert(name.into(), value.into());
        self
    }

    /// Builder-style [`set`](Self::set).
    pub fn with(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.set(name, value);
        self
    }

    /// Register every variable of `other` under `scope:` (e.g. `gettext:opt_lib`).
    pub fn set_scoped(&mut self, scope: &str, other: &TemplateVars) -> &mut Self {
        for (name, value) in &other.vars {
            self.vars.insert(format!("{}:{}", scope, name), value.clone());
        }
        self
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.vars.get(name).map(String::as_str)
    }

    /// Expand every placeholder in `template`.
    pub fn expand(&self, template: &str) -> Result<String, TemplateError> {
        let mut out = String::with_capacity(template.len());
        let mut chars = template.chars().peekable();

        while let Some(c) = chars.next() {
            match c {
                '{' if chars.peek() == Some(&'{') => {
                    chars.next();
                    out.push('{');
                }
                '{' => {
                    let mut name = String::new();
                    let mut closed = false;
                    for n in chars.by_ref() {
                        if n == '}' {
                            closed = true;
                            break;
                        }
                        name.push(n);
                    }
                    if !closed {
                        return Err(TemplateError::Unclosed {
                            template: template.to_string(),
                        });
                    }
                    let value = self.vars.get(name.trim()).ok_or_else(|| {
                        TemplateError::UnknownPlaceholder {
                            name: name.clone(),
                            template: template.to_string(),
                        }
                    })?;
                    out.push_str(value);
                }
                '}' if chars.peek() == Some(&'}') => {
                    chars.next();
                    out.push('}');
                }
                '}' => {
                    return Err(TemplateError::Unmatched {
                        template: template.to_string(),
                    })
                }
                other => out.push(other),
            }
        }

        Ok(out)
    }

    /// Expand a template that names a filesystem path.
    pub fn expand_path(&self, template: &str) -> Result<PathBuf, TemplateError> {
        self.expand(template).map(PathBuf::from)
    }

    /// Expand each element of a list.
    pub fn expand_all(&self, templates: &[String]) -> Result<Vec<String>, TemplateError> {
        templates.iter().map(|t| self.expand(t)).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn vars() -> TemplateVars {
        let dep = TemplateVars::new().with("opt_include", "/opt/keg/opt/gettext/include");
        let mut vars = TemplateVars::new()
            .with("opt_lib", "/opt/keg/opt/postgresql@15/lib")
            .with("name", "postgresql@15");
        vars.set_scoped("gettext", &dep);
        vars
    }

    #[test]
    fn test_expand_simple() {
        assert_eq!(
            vars().expand("{opt_lib}/postgresql").unwrap(),
            "/opt/keg/opt/postgresql@15/lib/postgresql"
        );
    }

    #[test]
    fn test_expand_scoped_dependency() {
        assert_eq!(
            vars().expand("-I{gettext:opt_include}").unwrap(),
            "-I/opt/keg/opt/gettext/include"
        );
    }

    #[test]
    fn test_escaped_braces() {
        assert_eq!(vars().expand("{{literal}} {name}").unwrap(), "{literal} postgresql@15");
    }

    #[test]
    fn test_unknown_placeholder() {
        let err = vars().expand("{nope}/x").unwrap_err();
        assert!(matches!(err, TemplateError::UnknownPlaceholder { ref name, .. } if name == "nope"));
    }

    #[test]
    fn test_unbalanced_braces() {
        assert!(matches!(
            vars().expand("{opt_lib").unwrap_err(),
            TemplateError::Unclosed { .. }
        ));
        assert!(matches!(
            vars().expand("lib}").unwrap_err(),
            TemplateError::Unmatched { .. }
        ));
    }
}
