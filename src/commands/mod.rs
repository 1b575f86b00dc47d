// src/commands/mod.rs
//! Command handlers for the SFML kitchen CLI

mod completions;
mod cook;
mod deps;
mod info;
mod prep;
mod verify;

pub use completions::cmd_completions;
pub use cook::{cmd_cook, CookArgs};
pub use deps::cmd_deps;
pub use info::cmd_info;
pub use prep::cmd_prep;
pub use verify::cmd_verify;

use crate::cli::FormulaArgs;
use anyhow::{Context, Result};
use sfml_kitchen::{builtin_formula, parse_formula_file, validate_formula, Formula};
use std::path::Path;

/// Load the selected formula and print validation warnings
pub(crate) fn load_formula(args: &FormulaArgs) -> Result<Formula> {
    let formula = match &args.formula {
        Some(path) => parse_formula_file(Path::new(path))
            .with_context(|| format!("Failed to parse formula: {}", path))?,
        None => builtin_formula().context("Built-in formula is invalid")?,
    };

    let warnings = validate_formula(&formula).context("Formula validation failed")?;
    for warning in &warnings {
        println!("Warning: {}", warning);
    }

    Ok(formula)
}
