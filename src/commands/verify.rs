// src/commands/verify.rs

//! Verify command - smoke-test an existing installation

use super::load_formula;
use crate::cli::FormulaArgs;
use anyhow::{Context, Result};
use sfml_kitchen::recipe::kitchen::SystemRunner;
use sfml_kitchen::{Kitchen, KitchenConfig};

pub fn cmd_verify(prefix: &str, args: &FormulaArgs, cxx: Option<&str>) -> Result<()> {
    let formula = load_formula(args)?;
    let name = formula.package.name.clone();

    let mut config = KitchenConfig::for_prefix(prefix);
    if let Some(cxx) = cxx {
        config.cxx = cxx.to_string();
    }
    let runner = SystemRunner::new().with_timeout(config.timeout);

    Kitchen::new(formula, config)
        .verify_installation(&runner)
        .with_context(|| format!("Smoke test failed for {} in {}", name, prefix))?;

    println!("[OK] {} in {} passed the smoke test", name, prefix);
    Ok(())
}
