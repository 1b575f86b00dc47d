// src/commands/deps.rs

//! Deps command - list and probe declared dependencies

use super::load_formula;
use crate::cli::FormulaArgs;
use anyhow::{Context, Result};
use sfml_kitchen::recipe::kitchen::SystemRunner;
use sfml_kitchen::recipe::{check_dependencies, DependencyRole};
use sfml_kitchen::{DependencySet, HostResolver, Platform};

pub fn cmd_deps(args: &FormulaArgs, platform: Option<&str>, check: bool) -> Result<()> {
    let formula = load_formula(args)?;
    let platform = match platform {
        Some(p) => p.parse::<Platform>()?,
        None => Platform::current(),
    };

    let set = DependencySet::for_formula(&formula, platform);
    println!(
        "{} {} on {}: {} dependencies",
        formula.package.name,
        formula.package.version,
        platform,
        set.len()
    );

    for (title, role) in [
        ("Build-only", DependencyRole::Build),
        ("Runtime", DependencyRole::Runtime),
    ] {
        let deps = set.with_role(role);
        if deps.is_empty() {
            continue;
        }
        println!("\n{}:", title);
        for dep in deps {
            if dep.probe_name() != dep.name {
                println!("  {} [{}] (probe: {})", dep.name, dep.platform, dep.probe_name());
            } else {
                println!("  {} [{}]", dep.name, dep.platform);
            }
        }
    }

    if !check {
        return Ok(());
    }

    if platform != Platform::current() {
        anyhow::bail!(
            "Cannot check {} dependencies from a {} host",
            platform,
            Platform::current()
        );
    }

    let runner = SystemRunner::new();
    let resolver = HostResolver::new(&runner);
    let report = check_dependencies(&set, &resolver).context("Dependency check failed")?;

    println!();
    for name in &report.satisfied {
        println!("[OK] {}", name);
    }
    for name in &report.missing {
        println!("[MISSING] {}", name);
    }

    if !report.missing.is_empty() {
        anyhow::bail!("{} of {} dependencies missing", report.missing.len(), set.len());
    }

    println!("\n[COMPLETE] All dependencies satisfied");
    Ok(())
}
