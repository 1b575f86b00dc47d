// src/main.rs

use anyhow::Result;
use clap::{CommandFactory, Parser};

mod cli;
mod commands;

use cli::{Cli, Commands};
use commands::CookArgs;

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize tracing subscriber for logging
    let default_level = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_level)),
        )
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Some(Commands::Info { formula }) => commands::cmd_info(&formula),

        Some(Commands::Deps {
            formula,
            platform,
            check,
        }) => commands::cmd_deps(&formula, platform.as_deref(), check),

        Some(Commands::Prep {
            source,
            formula,
            dry_run,
        }) => commands::cmd_prep(&source, &formula, dry_run),

        Some(Commands::Cook {
            source,
            archive,
            prefix,
            build_dir,
            config,
            formula,
            jobs,
            timeout,
            skip_deps_check,
            no_verify,
            keep_workdir,
            dry_run,
            report,
        }) => commands::cmd_cook(CookArgs {
            source,
            archive,
            prefix,
            build_dir,
            config,
            formula,
            jobs,
            timeout,
            skip_deps_check,
            no_verify,
            keep_workdir,
            dry_run,
            report,
            verbose: cli.verbose,
        }),

        Some(Commands::Verify {
            prefix,
            formula,
            cxx,
        }) => commands::cmd_verify(&prefix, &formula, cxx.as_deref()),

        Some(Commands::Completions { shell }) => commands::cmd_completions(shell),

        None => {
            // No command given, show help
            Cli::command().print_help()?;
            println!();
            Ok(())
        }
    }
}
