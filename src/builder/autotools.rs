//! Autotools-style build driver: `./configure`, `make`, inreplace.

use std::path::PathBuf;

use anyhow::{Context, Result};

use crate::builder::env::BuildEnvironment;
use crate::builder::BuildOptions;
use crate::builder::errors::BuildError;
use crate::core::formula::{Formula, Inreplace, MakeStep};
use crate::core::layout::KegLayout;
use crate::core::platform::Platform;
use crate::util::fs::{ensure_dir, write_string};
use crate::util::process::{combined_output, ProcessBuilder};
use crate::util::template::TemplateVars;
use crate::util::{Shell, Status};

/// A finished build step.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StepRecord {
    pub name: String,
    pub command: String,
    pub log: PathBuf,
}

/// Runs a formula's build recipe inside an extracted source tree.
pub struct AutotoolsBuilder<'a> {
    formula: &'a Formula,
    layout: KegLayout,
    platform: Platform,
    vars: TemplateVars,
    env: BuildEnvironment,
    make: PathBuf,
    source_dir: PathBuf,
    log_dir: PathBuf,
    shell: &'a Shell,
    steps: Vec<StepRecord>,
}

impl<'a> AutotoolsBuilder<'a> {
    pub fn new(
        formula: &'a Formula,
        opts: &BuildOptions,
        env: BuildEnvironment,
        make: PathBuf,
        source_dir: PathBuf,
        shell: &'a Shell,
    ) -> Self {
        AutotoolsBuilder {
            layout: formula.layout(&opts.root),
            vars: formula.template_vars(&opts.root, &opts.platform),
            formula,
            platform: opts.platform.clone(),
            env,
            make,
            source_dir,
            log_dir: opts.log_dir.clone(),
            shell,
            steps: Vec::new(),
        }
    }

    /// Run configure, every make step, then inreplaces.
    pub fn build(mut self) -> Result<Vec<StepRecord>> {
        ensure_dir(&self.log_dir)?;
        let formula = self.formula;
        let recipe = &formula.build;

        if let Some(configure) = &recipe.configure {
            let args = configure
                .render(&self.layout, &self.platform, &self.vars)
                .map_err(BuildError::from)?;
            self.shell.status(
                Status::Configuring,
                format!("{} {}", formula.name, formula.pkg_version()),
            );
            let cmd = ProcessBuilder::new(self.source_dir.join("configure"))
                .args(args.iter().map(ToString::to_string));
            self.run_step("configure", cmd)?;
        }

        for step in &recipe.make {
            let cmd = self.make_command(step)?;
            let label = if step.targets.is_empty() {
                formula.name.clone()
            } else {
                format!("{} ({})", formula.name, step.targets.join(" "))
            };
            self.shell.status(Status::Building, label);
            self.run_step("make", cmd)?;
        }

        for inreplace in &recipe.inreplace {
            if inreplace.platform.is_some_and(|os| os != self.platform.os()) {
                continue;
            }
            self.inreplace(inreplace)?;
        }

        Ok(self.steps)
    }

    fn make_command(&self, step: &MakeStep) -> Result<ProcessBuilder> {
        let mut cmd = ProcessBuilder::new(&self.make).args(&step.targets);
        for (name, value) in &step.vars {
            let value = self.vars.expand(value).map_err(BuildError::from)?;
            cmd = cmd.arg(format!("{}={}", name, value));
        }
        Ok(cmd)
    }

    fn run_step(&mut self, name: &str, cmd: ProcessBuilder) -> Result<()> {
        let cmd = self.env.apply(cmd).cwd(&self.source_dir);
        let command = cmd.display_command();
        let log = self
            .log_dir
            .join(format!("{:02}.{}", self.steps.len() + 1, name));

        let output = cmd.exec()?;
        let text = combined_output(&output);
        write_string(&log, &format!("{}\n\n{}", command, text))?;

        if self.shell.is_verbose() {
            eprint!("{}", text);
        }

        if !output.status.success() {
            return Err(BuildError::StepFailed {
                step: name.to_string(),
                command,
                code: output.status.code(),
                log,
                output: text,
            }
            .into());
        }

        tracing::debug!("{} finished, log at {}", name, log.display());
        self.steps.push(StepRecord {
            name: name.to_string(),
            command,
            log,
        });
        Ok(())
    }

    fn inreplace(&self, inreplace: &Inreplace) -> Result<()> {
        let path = self.vars.expand_path(&inreplace.path).map_err(BuildError::from)?;
        let before = self.vars.expand(&inreplace.before).map_err(BuildError::from)?;
        let after = self.vars.expand(&inreplace.after).map_err(BuildError::from)?;

        let contents = std::fs::read_to_string(&path)
            .with_context(|| format!("failed to read {} for inreplace", path.display()))?;
        if !contents.contains(&before) {
            return Err(BuildError::Inreplace {
                path,
                pattern: before,
            }
            .into());
        }

        tracing::info!("inreplace {}", path.display());
        write_string(&path, &contents.replace(&before, &after))
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use crate::core::platform::{Arch, Os};
    use crate::test_support::{parse_formula, SHA_A};
    use crate::util::fs::make_executable;
    use crate::util::shell::{ColorChoice, Verbosity};
    use std::collections::BTreeMap;
    use std::path::Path;
    use tempfile::TempDir;

    fn quiet() -> Shell {
        Shell::new(Verbosity::Quiet, ColorChoice::Never)
    }

    fn script(path: &Path, body: &str) {
        std::fs::write(path, format!("#!/bin/sh\n{}", body)).unwrap();
        make_executable(path).unwrap();
    }

    fn formula(build: &str) -> Formula {
        parse_formula(
            "demo",
            &format!(
                r#"
name = "demo"
version = "1.0"

[source]
url = "https://example.com/demo-1.0.tar.gz"
sha256 = "{SHA_A}"

{build}
"#
            ),
        )
    }

    struct Fixture {
        tmp: TempDir,
        src: PathBuf,
        make: PathBuf,
    }

    fn fixture(configure_body: &str) -> Fixture {
        let tmp = TempDir::new().unwrap();
        let src = tmp.path().join("src");
        std::fs::create_dir_all(&src).unwrap();
        script(&src.join("configure"), configure_body);
        // "make" records its arguments and MAKEFLAGS
        let make = tmp.path().join("fake-make");
        script(&make, "echo \"$MAKEFLAGS $*\" >> make.calls\n");
        Fixture { tmp, src, make }
    }

    fn builder<'a>(f: &Fixture, formula: &'a Formula, shell: &'a Shell) -> AutotoolsBuilder<'a> {
        let opts = BuildOptions {
            root: f.tmp.path().join("root"),
            platform: Platform::new(Os::Linux, Arch::X86_64),
            jobs: 2,
            make: None,
            log_dir: f.tmp.path().join("logs"),
        };
        let env = BuildEnvironment::assemble(formula, &opts.root, &opts.platform, opts.jobs, &BTreeMap::new())
            .unwrap();
        AutotoolsBuilder::new(formula, &opts, env, f.make.clone(), f.src.clone(), shell)
    }

    #[test]
    fn test_configure_then_make_steps() {
        let f = fixture("echo \"$@\" > configure.args\n");
        let formula = formula(
            r#"
[build.configure]
enable = ["nls"]

[[build.make]]
vars = { pkglibdir = "{lib}/demo" }

[[build.make]]
targets = ["install-world"]
"#,
        );
        let shell = quiet();
        let steps = builder(&f, &formula, &shell).build().unwrap();

        let names: Vec<&str> = steps.iter().map(|s| s.name.as_str()).collect();
        assert_eq!(names, vec!["configure", "make", "make"]);
        assert!(steps[0].log.ends_with("01.configure"));
        assert!(steps[2].log.ends_with("03.make"));

        let args = std::fs::read_to_string(f.src.join("configure.args")).unwrap();
        assert!(args.contains("--enable-nls"));
        assert!(args.contains("--prefix="));

        let calls = std::fs::read_to_string(f.src.join("make.calls")).unwrap();
        let calls: Vec<&str> = calls.lines().collect();
        assert!(calls[0].starts_with("-j2 pkglibdir="));
        assert!(calls[0].ends_with("Cellar/demo/1.0/lib/demo"));
        assert_eq!(calls[1], "-j2 install-world");
    }

    #[test]
    fn test_failing_step_surfaces_exit_code() {
        let f = fixture("echo 'checking for readline... no' >&2\nexit 7\n");
        let formula = formula("[build.configure]\n");
        let shell = quiet();
        let err = builder(&f, &formula, &shell).build().unwrap_err();

        match err.downcast_ref::<BuildError>() {
            Some(e @ BuildError::StepFailed { step, output, log, .. }) => {
                assert_eq!(step, "configure");
                assert_eq!(e.exit_code(), 7);
                assert!(output.contains("checking for readline... no"));
                assert!(std::fs::read_to_string(log).unwrap().contains("readline"));
            }
            other => panic!("unexpected error: {:?}", other),
        }
        assert!(!f.src.join("make.calls").exists());
    }

    #[test]
    fn test_inreplace_respects_platform() {
        let f = fixture("");
        let target = f.tmp.path().join("Makefile.global");
        std::fs::write(&target, "LD = /shims/super/ld\n").unwrap();
        let formula = formula(&format!(
            r#"
[[build.inreplace]]
path = "{path}"
before = "/shims/super/ld"
after = "/usr/bin/ld"
platform = "linux"

[[build.inreplace]]
path = "{path}"
before = "never present"
after = "x"
platform = "macos"
"#,
            path = target.display()
        ));
        let shell = quiet();
        builder(&f, &formula, &shell).build().unwrap();
        assert_eq!(std::fs::read_to_string(&target).unwrap(), "LD = /usr/bin/ld\n");
    }

    #[test]
    fn test_inreplace_without_match_fails() {
        let f = fixture("");
        let target = f.tmp.path().join("file");
        std::fs::write(&target, "nothing here\n").unwrap();
        let formula = formula(&format!(
            "[[build.inreplace]]\npath = \"{}\"\nbefore = \"missing\"\nafter = \"x\"\n",
            target.display()
        ));
        let shell = quiet();
        let err = builder(&f, &formula, &shell).build().unwrap_err();
        assert!(matches!(
            err.downcast_ref::<BuildError>(),
            Some(BuildError::Inreplace { .. })
        ));
    }
}
