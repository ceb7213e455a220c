//! Rendering service descriptors for external supervisors.

use std::fmt::Write as _;
use std::path::Path;

use anyhow::{Context, Result};

use crate::core::formula::Formula;
use crate::core::platform::Platform;
use crate::core::service::ResolvedService;

/// Supervisor file format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum ServiceFormat {
    /// launchd property list
    Launchd,
    /// systemd unit
    Systemd,
}

impl ServiceFormat {
    pub fn for_platform(platform: &Platform) -> Self {
        if platform.is_macos() {
            ServiceFormat::Launchd
        } else {
            ServiceFormat::Systemd
        }
    }

    /// Conventional file name for the rendered descriptor.
    pub fn file_name(&self, service: &ResolvedService) -> String {
        match self {
            ServiceFormat::Launchd => format!("{}.plist", service.label),
            ServiceFormat::Systemd => format!("{}.service", service.label),
        }
    }
}

/// Resolve the formula's service stanza against `root`.
pub fn resolve_service(formula: &Formula, root: &Path, platform: &Platform) -> Result<ResolvedService> {
    let spec = formula
        .service
        .as_ref()
        .with_context(|| format!("formula `{}` does not define a service", formula.name))?;
    let vars = formula.template_vars(root, platform);
    spec.resolve(&formula.name, &vars)
        .with_context(|| format!("invalid service for `{}`", formula.name))
}

pub fn render(service: &ResolvedService, format: ServiceFormat) -> String {
    match format {
        ServiceFormat::Launchd => render_launchd(service),
        ServiceFormat::Systemd => render_systemd(service),
    }
}

fn render_launchd(service: &ResolvedService) -> String {
    let mut out = String::new();
    out.push_str("<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n");
    out.push_str("<!DOCTYPE plist PUBLIC \"-//Apple//DTD PLIST 1.0//EN\" \"http://www.apple.com/DTDs/PropertyList-1.0.dtd\">\n");
    out.push_str("<plist version=\"1.0\">\n<dict>\n");

    plist_key(&mut out, "Label", &service.label);

    out.push_str("\t<key>ProgramArguments</key>\n\t<array>\n");
    let program = service.program.display().to_string();
    for arg in std::iter::once(&program).chain(&service.args) {
        let _ = writeln!(out, "\t\t<string>{}</string>", xml_escape(arg));
    }
    out.push_str("\t</array>\n");

    if !service.environment.is_empty() {
        out.push_str("\t<key>EnvironmentVariables</key>\n\t<dict>\n");
        for (key, value) in &service.environment {
            let _ = writeln!(out, "\t\t<key>{}</key>", xml_escape(key));
            let _ = writeln!(out, "\t\t<string>{}</string>", xml_escape(value));
        }
        out.push_str("\t</dict>\n");
    }

    let _ = writeln!(
        out,
        "\t<key>KeepAlive</key>\n\t<{}/>",
        if service.keep_alive { "true" } else { "false" }
    );
    out.push_str("\t<key>RunAtLoad</key>\n\t<true/>\n");

    if let Some(path) = &service.log_path {
        plist_key(&mut out, "StandardOutPath", &path.display().to_string());
    }
    if let Some(path) = &service.error_log_path {
        plist_key(&mut out, "StandardErrorPath", &path.display().to_string());
    }
    if let Some(dir) = &service.working_dir {
        plist_key(&mut out, "WorkingDirectory", &dir.display().to_string());
    }

    out.push_str("</dict>\n</plist>\n");
    out
}

fn plist_key(out: &mut String, key: &str, value: &str) {
    let _ = writeln!(out, "\t<key>{}</key>\n\t<string>{}</string>", key, xml_escape(value));
}

fn xml_escape(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}

fn render_systemd(service: &ResolvedService) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "[Unit]\nDescription={}\n", service.label);
    out.push_str("[Service]\nType=simple\n");

    let mut exec = vec![systemd_quote(&service.program.display().to_string())];
    exec.extend(service.args.iter().map(|a| systemd_quote(a)));
    let _ = writeln!(out, "ExecStart={}", exec.join(" "));
    let _ = writeln!(
        out,
        "Restart={}",
        if service.keep_alive { "always" } else { "no" }
    );

    for (key, value) in &service.environment {
        let _ = writeln!(out, "Environment=\"{}={}\"", key, value.replace('"', "\\\""));
    }
    if let Some(dir) = &service.working_dir {
        let _ = writeln!(out, "WorkingDirectory={}", dir.display());
    }
    if let Some(path) = &service.log_path {
        let _ = writeln!(out, "StandardOutput=append:{}", path.display());
    }
    if let Some(path) = &service.error_log_path {
        let _ = writeln!(out, "StandardError=append:{}", path.display());
    }

    out.push_str("\n[Install]\nWantedBy=default.target\n");
    out
}

fn systemd_quote(arg: &str) -> String {
    if arg.is_empty() || arg.contains(|c: char| c.is_whitespace() || c == '"' || c == '\\') {
        format!("\"{}\"", arg.replace('\\', "\\\\").replace('"', "\\\""))
    } else {
        arg.to_string()
    }
}
