//! Service descriptor for daemons shipped by a formula.
//!
//! This is data handed to an external supervisor; keg renders it but never
//! starts or stops anything itself.

use std::collections::BTreeMap;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::util::template::{TemplateError, TemplateVars};

/// Service stanza as written in a formula (all strings are templates).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ServiceSpec {
    /// Program followed by its arguments
    pub run: Vec<String>,

    #[serde(default)]
    pub environment: BTreeMap<String, String>,

    /// Restart the process whenever it exits
    #[serde(default)]
    pub keep_alive: bool,

    #[serde(default)]
    pub log_path: Option<String>,

    #[serde(default)]
    pub error_log_path: Option<String>,

    #[serde(default)]
    pub working_dir: Option<String>,
}

/// A service with every template expanded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResolvedService {
    /// Supervisor label, `keg.<name>`
    pub label: String,
    pub program: PathBuf,
    pub args: Vec<String>,
    pub environment: BTreeMap<String, String>,
    pub keep_alive: bool,
    pub log_path: Option<PathBuf>,
    pub error_log_path: Option<PathBuf>,
    pub working_dir: Option<PathBuf>,
}

impl ServiceSpec {
    /// Expand templates against a formula's layout.
    pub fn resolve(&self, name: &str, vars: &TemplateVars) -> Result<ResolvedService, ServiceError> {
        let mut run = vars.expand_all(&self.run)?.into_iter();
        let program = run.next().ok_or(ServiceError::EmptyCommand)?;

        let environment = self
            .environment
            .iter()
            .map(|(k, v)| Ok((k.clone(), vars.expand(v)?)))
            .collect::<Result<BTreeMap<_, _>, TemplateError>>()?;

        let path = |p: &Option<String>| p.as_deref().map(|t| vars.expand_path(t)).transpose();

        Ok(ResolvedService {
            label: service_label(name),
            program: PathBuf::from(program),
            args: run.collect(),
            environment,
            keep_alive: self.keep_alive,
            log_path: path(&self.log_path)?,
            error_log_path: path(&self.error_log_path)?,
            working_dir: path(&self.working_dir)?,
        })
    }
}

/// Errors resolving a service stanza.
#[derive(Debug, thiserror::Error)]
pub enum ServiceError {
    #[error("service `run` must name a program")]
    EmptyCommand,

    #[error(transparent)]
    Template(#[from] TemplateError),
}

/// Supervisor label for a formula.
pub fn service_label(name: &str) -> String {
    format!("keg.{}", name)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn vars() -> TemplateVars {
        TemplateVars::new()
            .with("opt_bin", "/opt/keg/opt/postgresql@15/bin")
            .with("datadir", "/opt/keg/var/postgresql@15")
            .with("log_dir", "/opt/keg/var/log")
            .with("name", "postgresql@15")
            .with("root", "/opt/keg")
    }

    #[test]
    fn test_resolve_service() {
        let spec: ServiceSpec = toml::from_str(
            r#"
run = ["{opt_bin}/postgres", "-D", "{datadir}"]
environment = { LC_ALL = "C" }
keep_alive = true
log_path = "{log_dir}/{name}.log"
error_log_path = "{log_dir}/{name}.log"
working_dir = "{root}"
"#,
        )
        .unwrap();

        let svc = spec.resolve("postgresql@15", &vars()).unwrap();
        assert_eq!(svc.label, "keg.postgresql@15");
        assert_eq!(svc.program, PathBuf::from("/opt/keg/opt/postgresql@15/bin/postgres"));
        assert_eq!(svc.args, vec!["-D", "/opt/keg/var/postgresql@15"]);
        assert_eq!(svc.environment.get("LC_ALL").map(String::as_str), Some("C"));
        assert!(svc.keep_alive);
        assert_eq!(
            svc.log_path,
            Some(PathBuf::from("/opt/keg/var/log/postgresql@15.log"))
        );
        assert_eq!(svc.working_dir, Some(PathBuf::from("/opt/keg")));
    }

    #[test]
    fn test_empty_run_is_rejected() {
        let spec: ServiceSpec = toml::from_str("run = []").unwrap();
        assert!(matches!(
            spec.resolve("x", &vars()),
            Err(ServiceError::EmptyCommand)
        ));
    }
}
