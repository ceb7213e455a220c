//! keg CLI - build and install formulas from source

use anyhow::Result;
use clap::Parser;
use tracing_subscriber::EnvFilter;

mod cli;
mod commands;

use cli::{Cli, Commands};
use keg::builder::BuildError;
use keg::resolver::ResolveError;
use keg::sources::FetchError;
use keg::util::diagnostic::emit;

fn main() {
    let cli = Cli::parse();

    let filter = EnvFilter::try_from_env("KEG_LOG").unwrap_or_else(|_| {
        if cli.global.verbose {
            EnvFilter::new("keg=debug")
        } else if cli.global.quiet {
            EnvFilter::new("keg=error")
        } else {
            EnvFilter::new("keg=info")
        }
    });

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .without_time()
        .with_writer(std::io::stderr)
        .init();

    let color = commands::shell(&cli.global).use_color();
    if let Err(e) = run(cli) {
        std::process::exit(report(&e, color));
    }
}

fn run(cli: Cli) -> Result<()> {
    let global = cli.global;
    match cli.command {
        Commands::Info(args) => commands::info::execute(args, &global),
        Commands::Deps(args) => commands::deps::execute(args, &global),
        Commands::Fetch(args) => commands::fetch::execute(args, &global),
        Commands::Install(args) => commands::install::execute(args, &global),
        Commands::PostInstall(args) => commands::post_install::execute(args, &global),
        Commands::Test(args) => commands::test::execute(args, &global),
        Commands::Service(args) => commands::service::execute(args, &global),
        Commands::Livecheck(args) => commands::livecheck::execute(args, &global),
        Commands::Completions(args) => commands::completions::execute(args),
    }
}

/// Print `err` and return the process exit code.
///
/// A failed build step exits with the tool's own code.
fn report(err: &anyhow::Error, color: bool) -> i32 {
    for cause in err.chain() {
        if let Some(e) = cause.downcast_ref::<BuildError>() {
            emit(&e.to_diagnostic(), color);
            return e.exit_code();
        }
        if let Some(e) = cause.downcast_ref::<ResolveError>() {
            emit(&e.to_diagnostic(), color);
            return 1;
        }
        if let Some(e) = cause.downcast_ref::<FetchError>() {
            emit(&e.to_diagnostic(), color);
            return 1;
        }
    }
    eprintln!("error: {:#}", err);
    1
}
