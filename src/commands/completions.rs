// src/commands/completions.rs

//! Shell completion generation

use crate::cli::Cli;
use anyhow::Result;
use clap::CommandFactory;
use clap_complete::{generate, Shell};

pub fn cmd_completions(shell: Shell) -> Result<()> {
    let mut cmd = Cli::command();
    generate(shell, &mut cmd, "sfml-kitchen", &mut std::io::stdout());
    Ok(())
}
