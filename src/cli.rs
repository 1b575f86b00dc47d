// src/cli.rs
//! CLI definitions for the SFML kitchen
//!
//! This module contains all command-line interface definitions using clap.
//! The actual command implementations are in the `commands` module.

use clap::{Args, Parser, Subcommand};
use clap_complete::Shell;

#[derive(Parser)]
#[command(name = "sfml-kitchen")]
#[command(author = "SFML Kitchen Contributors")]
#[command(version)]
#[command(about = "Build, install and smoke-test the SFML multimedia library", long_about = None)]
pub struct Cli {
    /// Enable debug logging (RUST_LOG takes precedence)
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

/// Formula selection shared by every subcommand
#[derive(Args, Debug, Clone, Default)]
pub struct FormulaArgs {
    /// Formula file to use instead of the built-in SFML formula
    #[arg(short, long)]
    pub formula: Option<String>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Show formula metadata
    Info {
        #[command(flatten)]
        formula: FormulaArgs,
    },

    /// Show (and optionally check) the declared dependencies
    Deps {
        #[command(flatten)]
        formula: FormulaArgs,

        /// Platform to declare for: linux, macos, other (default: host)
        #[arg(short, long)]
        platform: Option<String>,

        /// Probe the host for each dependency
        #[arg(long)]
        check: bool,
    },

    /// Prune vendored libraries from an extracted source tree
    Prep {
        /// Source tree root (contains CMakeLists.txt and extlibs/)
        source: String,

        #[command(flatten)]
        formula: FormulaArgs,

        /// Only show what would be removed
        #[arg(long)]
        dry_run: bool,
    },

    /// Build and install from source, then run the smoke test
    Cook {
        /// Extracted source tree
        #[arg(short, long, conflicts_with = "archive", required_unless_present = "archive")]
        source: Option<String>,

        /// Source archive (.tar.gz, .tgz, .tar) to extract into a fresh directory
        #[arg(short, long)]
        archive: Option<String>,

        /// Install prefix
        #[arg(short, long)]
        prefix: Option<String>,

        /// Build output directory (default: a temporary directory)
        #[arg(short, long)]
        build_dir: Option<String>,

        /// Kitchen config file (default: ~/.config/sfml-kitchen/kitchen.toml if present)
        #[arg(short, long)]
        config: Option<String>,

        #[command(flatten)]
        formula: FormulaArgs,

        /// Number of parallel build jobs
        #[arg(short, long)]
        jobs: Option<u32>,

        /// Per-command timeout in seconds
        #[arg(long)]
        timeout: Option<u64>,

        /// Skip the host dependency check
        #[arg(long)]
        skip_deps_check: bool,

        /// Skip the post-install smoke test
        #[arg(long)]
        no_verify: bool,

        /// Keep temporary build and extraction directories
        #[arg(long)]
        keep_workdir: bool,

        /// Show what would run without running it
        #[arg(long)]
        dry_run: bool,

        /// Write a JSON run report to this file
        #[arg(long)]
        report: Option<String>,
    },

    /// Run the smoke test against an existing installation
    Verify {
        /// Install prefix to test
        #[arg(short, long)]
        prefix: String,

        #[command(flatten)]
        formula: FormulaArgs,

        /// C++ compiler (default: $CXX or c++)
        #[arg(long)]
        cxx: Option<String>,
    },

    /// Generate shell completion scripts
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_cook_requires_a_source() {
        assert!(Cli::try_parse_from(["sfml-kitchen", "cook"]).is_err());
        assert!(
            Cli::try_parse_from(["sfml-kitchen", "cook", "--source", "a", "--archive", "b.tar.gz"])
                .is_err()
        );
        assert!(Cli::try_parse_from(["sfml-kitchen", "cook", "--archive", "b.tar.gz"]).is_ok());
    }

    #[test]
    fn test_parse_cook_flags() {
        let cli = Cli::try_parse_from([
            "sfml-kitchen",
            "-v",
            "cook",
            "--source",
            "SFML-3.0.2",
            "--prefix",
            "/opt/sfml",
            "--jobs",
            "8",
            "--no-verify",
            "--dry-run",
        ])
        .unwrap();

        assert!(cli.verbose);
        match cli.command {
            Some(Commands::Cook {
                source,
                prefix,
                jobs,
                no_verify,
                dry_run,
                skip_deps_check,
                ..
            }) => {
                assert_eq!(source.as_deref(), Some("SFML-3.0.2"));
                assert_eq!(prefix.as_deref(), Some("/opt/sfml"));
                assert_eq!(jobs, Some(8));
                assert!(no_verify);
                assert!(dry_run);
                assert!(!skip_deps_check);
            }
            _ => panic!("expected cook"),
        }
    }
}
