// src/commands/info.rs

//! Info command - show formula metadata

use super::load_formula;
use crate::cli::FormulaArgs;
use anyhow::Result;
use sfml_kitchen::recipe::DependencyRole;

pub fn cmd_info(args: &FormulaArgs) -> Result<()> {
    let formula = load_formula(args)?;
    let pkg = &formula.package;

    println!("{} {}", pkg.name, pkg.version);
    if let Some(desc) = &pkg.desc {
        println!("  {}", desc);
    }
    println!();
    if let Some(homepage) = &pkg.homepage {
        println!("Homepage: {}", homepage);
    }
    if let Some(license) = &pkg.license {
        println!("License:  {}", license);
    }
    println!("Source:   {}", formula.archive_url());
    println!("SHA-256:  {}", pkg.sha256);
    if let Some(head) = &pkg.head {
        println!("HEAD:     {}", head);
    }

    let build = formula
        .dependencies
        .iter()
        .filter(|d| d.role == DependencyRole::Build)
        .count();
    println!(
        "\nDependencies: {} declared ({} build-only)",
        formula.dependencies.len(),
        build
    );

    println!("\nConfigure flags:");
    for arg in &formula.configure.args {
        println!("  {}", arg);
    }

    Ok(())
}
