//! Build error types.

use std::path::PathBuf;

use thiserror::Error;

use crate::util::diagnostic::{suggestions, Diagnostic};
use crate::util::template::TemplateError;

/// Lines of tool output kept in a [`BuildError::StepFailed`].
const OUTPUT_TAIL_LINES: usize = 40;

/// Error while building a formula.
#[derive(Debug, Error)]
pub enum BuildError {
    #[error("dependency `{dependency}` is not installed (no prefix at {})", .path.display())]
    MissingPrefix { dependency: String, path: PathBuf },

    #[error("{step} failed with exit code {}: `{command}`", .code.map_or("<signal>".to_string(), |c| c.to_string()))]
    StepFailed {
        step: String,
        command: String,
        code: Option<i32>,
        log: PathBuf,
        output: String,
    },

    #[error("inreplace failed: `{pattern}` not found in {}", .path.display())]
    Inreplace { path: PathBuf, pattern: String },

    #[error(transparent)]
    Template(#[from] TemplateError),
}

impl BuildError {
    /// Process exit code to report for this error.
    pub fn exit_code(&self) -> i32 {
        match self {
            BuildError::StepFailed { code: Some(code), .. } if *code != 0 => *code,
            _ => 1,
        }
    }

    /// Convert to a user-friendly diagnostic.
    pub fn to_diagnostic(&self) -> Diagnostic {
        match self {
            BuildError::StepFailed { log, output, .. } => {
                let mut diag = Diagnostic::error(self.to_string());
                for line in tail(output, OUTPUT_TAIL_LINES) {
                    diag = diag.with_context(line.to_string());
                }
                diag.with_location(log.clone())
                    .with_suggestion(suggestions::BUILD_FAILED)
            }
            BuildError::MissingPrefix { dependency, .. } => Diagnostic::error(self.to_string())
                .with_suggestion(format!("Install it first: `keg install {}`", dependency)),
            _ => Diagnostic::error(self.to_string()),
        }
    }
}

/// The last `n` lines of `text`.
pub fn tail(text: &str, n: usize) -> impl Iterator<Item = &str> {
    let lines: Vec<&str> = text.lines().collect();
    let skip = lines.len().saturating_sub(n);
    lines.into_iter().skip(skip)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn failed(code: Option<i32>) -> BuildError {
        BuildError::StepFailed {
            step: "configure".to_string(),
            command: "./configure --prefix=/x".to_string(),
            code,
            log: PathBuf::from("/cache/logs/demo/01.configure"),
            output: (1..=50).map(|i| format!("line {}\n", i)).collect(),
        }
    }

    #[test]
    fn test_exit_code() {
        assert_eq!(failed(Some(7)).exit_code(), 7);
        assert_eq!(failed(None).exit_code(), 1);
        let missing = BuildError::MissingPrefix {
            dependency: "zstd".to_string(),
            path: PathBuf::from("/opt/keg/opt/zstd"),
        };
        assert_eq!(missing.exit_code(), 1);
    }

    #[test]
    fn test_diagnostic_keeps_output_tail() {
        let output = failed(Some(2)).to_diagnostic().format(false);
        assert!(output.contains("configure failed with exit code 2"));
        assert!(output.contains("line 50"));
        assert!(output.contains("line 11"));
        assert!(!output.contains("line 10\n"));
        assert!(output.contains("01.configure"));
    }
}
