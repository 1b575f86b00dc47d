// src/commands/prep.rs

//! Prep command - prune vendored libraries from a source tree

use super::load_formula;
use crate::cli::FormulaArgs;
use anyhow::{Context, Result};
use sfml_kitchen::recipe::{plan_source_preparation, prepare_source};
use std::path::Path;

pub fn cmd_prep(source: &str, args: &FormulaArgs, dry_run: bool) -> Result<()> {
    let formula = load_formula(args)?;
    let root = Path::new(source);

    if dry_run {
        let plan = plan_source_preparation(root, &formula.source)
            .with_context(|| format!("Cannot prepare {}", root.display()))?;
        if plan.is_empty() {
            println!("[OK] Nothing to remove; {} is already prepared", root.display());
        } else {
            println!("Would remove {} entr{}:", plan.len(), if plan.len() == 1 { "y" } else { "ies" });
            for path in &plan {
                println!("  - {}", path.display());
            }
        }
        return Ok(());
    }

    let outcome = prepare_source(root, &formula.source)
        .with_context(|| format!("Failed to prepare {}", root.display()))?;

    for path in &outcome.removed {
        println!("Removed {}", path.display());
    }
    println!(
        "\n[COMPLETE] {} now holds only {}",
        root.join(&formula.source.vendor_dir).display(),
        formula.source.keep
    );

    Ok(())
}
