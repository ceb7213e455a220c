//! Resolution error types and diagnostics.

use thiserror::Error;

use crate::util::diagnostic::{suggestions, Diagnostic};

/// Error during dependency resolution.
#[derive(Debug, Error)]
pub enum ResolveError {
    #[error("could not find formula `{package}` (required by `{required_by}`)")]
    PackageNotFound { package: String, required_by: String },

    #[error("dependency cycle between {}", .packages.join(", "))]
    CycleDetected { packages: Vec<String> },
}

impl ResolveError {
    /// Convert to a user-friendly diagnostic.
    pub fn to_diagnostic(&self) -> Diagnostic {
        match self {
            ResolveError::PackageNotFound {
                package,
                required_by,
            } => Diagnostic::error(format!("could not find formula `{}`", package))
                .with_context(format!("required by `{}`", required_by))
                .with_context(format!("`{}` is not installed either", package))
                .with_suggestion(suggestions::FORMULA_NOT_FOUND),

            ResolveError::CycleDetected { packages } => {
                Diagnostic::error("cycle detected in dependency graph")
                    .with_context(format!("cycle members: {}", packages.join(", ")))
                    .with_suggestion("Break the cycle by removing or restructuring dependencies")
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_not_found_diagnostic() {
        let err = ResolveError::PackageNotFound {
            package: "krb5".to_string(),
            required_by: "postgresql@15".to_string(),
        };

        let output = err.to_diagnostic().format(false);
        assert!(output.contains("could not find formula `krb5`"));
        assert!(output.contains("required by `postgresql@15`"));
        assert!(output.contains("--formula-dir"));
    }

    #[test]
    fn test_cycle_diagnostic() {
        let err = ResolveError::CycleDetected {
            packages: vec!["a".to_string(), "b".to_string()],
        };

        assert_eq!(err.to_string(), "dependency cycle between a, b");
        assert!(err.to_diagnostic().format(false).contains("cycle members: a, b"));
    }
}
