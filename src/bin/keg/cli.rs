//! CLI definitions using clap.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use clap_complete::Shell as CompletionShell;

use keg::ops::ServiceFormat;
use keg::util::shell::ColorChoice;

/// keg - build and install formulas from source
#[derive(Parser)]
#[command(name = "keg")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    #[command(flatten)]
    pub global: GlobalArgs,

    #[command(subcommand)]
    pub command: Commands,
}

/// Flags accepted by every command.
#[derive(Args, Debug, Clone)]
pub struct GlobalArgs {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Only print errors
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    /// When to use colors (auto, always, never)
    #[arg(long, global = true, value_name = "WHEN", default_value = "auto")]
    pub color: ColorChoice,

    /// Installation root (overrides KEG_ROOT and config)
    #[arg(long, global = true, value_name = "DIR")]
    pub root: Option<PathBuf>,

    /// Extra formula directory, searched first (repeatable)
    #[arg(long = "formula-dir", global = true, value_name = "DIR")]
    pub formula_dirs: Vec<PathBuf>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Show information about a formula
    Info(InfoArgs),

    /// Show the install plan of a formula
    Deps(DepsArgs),

    /// Download and verify source archives
    Fetch(FetchArgs),

    /// Build and install a formula and its dependencies
    Install(InstallArgs),

    /// Rerun the post-install actions of an installed formula
    PostInstall(FormulaArgs),

    /// Run the smoke tests of an installed formula
    Test(FormulaArgs),

    /// Render the service descriptor of a formula
    Service(ServiceArgs),

    /// Check upstream for newer versions
    Livecheck(LivecheckArgs),

    /// Generate shell completions
    Completions(CompletionsArgs),
}

#[derive(Args)]
pub struct FormulaArgs {
    /// Formula name or path to a formula file
    pub formula: String,
}

#[derive(Args)]
pub struct InfoArgs {
    /// Formula name or path to a formula file
    pub formula: String,

    /// Print JSON instead of text
    #[arg(long)]
    pub json: bool,
}

#[derive(Args)]
pub struct DepsArgs {
    /// Formula name or path to a formula file
    pub formula: String,

    /// Also list dependencies that are already installed
    #[arg(long)]
    pub installed: bool,
}

#[derive(Args)]
pub struct FetchArgs {
    /// Formula names or paths
    #[arg(required = true)]
    pub formulas: Vec<String>,

    /// Also fetch every dependency that is not installed
    #[arg(long)]
    pub deps: bool,
}

#[derive(Args)]
pub struct InstallArgs {
    /// Formula name or path to a formula file
    pub formula: String,

    /// Reinstall even if already installed
    #[arg(short, long)]
    pub force: bool,

    /// Keep the temporary build directory
    #[arg(long)]
    pub keep_tmp: bool,

    /// Skip post-install actions
    #[arg(long)]
    pub skip_post_install: bool,
}

#[derive(Args)]
pub struct ServiceArgs {
    /// Formula name or path to a formula file
    pub formula: String,

    /// Descriptor format (defaults to launchd on macOS, systemd elsewhere)
    #[arg(long, value_enum)]
    pub format: Option<ServiceFormat>,

    /// Write to this file instead of stdout
    #[arg(short, long, value_name = "PATH")]
    pub output: Option<PathBuf>,
}

#[derive(Args)]
pub struct LivecheckArgs {
    /// Formula names or paths
    #[arg(required = true)]
    pub formulas: Vec<String>,

    /// Print JSON instead of text
    #[arg(long)]
    pub json: bool,
}

#[derive(Args)]
pub struct CompletionsArgs {
    /// Shell to generate completions for
    #[arg(value_enum)]
    pub shell: CompletionShell,
}
