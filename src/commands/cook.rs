// src/commands/cook.rs

//! Cook command - build, install and smoke-test from source

use super::load_formula;
use crate::cli::FormulaArgs;
use anyhow::{Context, Result};
use sfml_kitchen::recipe::kitchen::SystemRunner;
use sfml_kitchen::recipe::DependencyResolver;
use sfml_kitchen::{CookPlan, HostResolver, Kitchen, KitchenConfig, NoopResolver};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::info;

/// Options for `cook`, as given on the command line
#[derive(Debug, Default)]
pub struct CookArgs {
    pub source: Option<String>,
    pub archive: Option<String>,
    pub prefix: Option<String>,
    pub build_dir: Option<String>,
    pub config: Option<String>,
    pub formula: FormulaArgs,
    pub jobs: Option<u32>,
    pub timeout: Option<u64>,
    pub skip_deps_check: bool,
    pub no_verify: bool,
    pub keep_workdir: bool,
    pub dry_run: bool,
    pub report: Option<String>,
    pub verbose: bool,
}

/// Build the kitchen configuration: defaults, then the config file, then flags
fn kitchen_config(args: &CookArgs) -> Result<KitchenConfig> {
    let mut config = match &args.config {
        Some(path) => KitchenConfig::from_file(Path::new(path))
            .with_context(|| format!("Failed to load config: {}", path))?,
        None => match KitchenConfig::default_path().filter(|p| p.is_file()) {
            Some(path) => {
                info!("Using config {}", path.display());
                KitchenConfig::from_file(&path)
                    .with_context(|| format!("Failed to load config: {}", path.display()))?
            }
            None => KitchenConfig::default(),
        },
    };

    if let Some(prefix) = &args.prefix {
        config.prefix = PathBuf::from(prefix);
    }
    if let Some(dir) = &args.build_dir {
        config.build_dir = Some(PathBuf::from(dir));
    }
    if let Some(jobs) = args.jobs {
        config.jobs = jobs;
    }
    if let Some(secs) = args.timeout {
        config.timeout = Duration::from_secs(secs);
    }
    if let Some(report) = &args.report {
        config.report_path = Some(PathBuf::from(report));
    }
    if args.skip_deps_check {
        config.check_dependencies = false;
    }
    if args.no_verify {
        config.verify = false;
    }
    if args.keep_workdir {
        config.keep_workdir = true;
    }
    if args.verbose {
        config.echo_output = true;
    }

    Ok(config)
}

fn print_plan(plan: &CookPlan) {
    println!("Platform: {}", plan.platform);

    println!("\nDependencies ({}):", plan.dependencies.len());
    for dep in &plan.dependencies {
        println!("  {} ({}, {})", dep.name, dep.role, dep.platform);
    }

    match &plan.removals {
        Some(paths) => {
            println!("\nSource preparation would remove {}:", paths.len());
            for path in paths {
                println!("  - {}", path.display());
            }
        }
        None => println!("\nSource preparation: determined after extraction"),
    }

    println!("\nBuild stages:");
    for (i, invocation) in plan.invocations.iter().enumerate() {
        println!("  {}. {}", i + 1, invocation);
    }

    if !plan.verification.is_empty() {
        println!("\nSmoke test:");
        for invocation in &plan.verification {
            println!("  {}", invocation);
        }
    }
}

/// Cook the formula from a source tree or archive
pub fn cmd_cook(args: CookArgs) -> Result<()> {
    let formula = load_formula(&args.formula)?;
    let config = kitchen_config(&args)?;

    println!("Formula: {} version {}", formula.package.name, formula.package.version);

    let name = formula.package.name.clone();
    let prefix = config.prefix.clone();
    let jobs = config.jobs;
    let timeout = config.timeout;
    let echo = config.echo_output;
    let check_dependencies = config.check_dependencies;
    let kitchen = Kitchen::new(formula, config);

    if args.dry_run {
        let plan = kitchen
            .plan(args.source.as_deref().map(Path::new))
            .context("Failed to plan cook")?;
        print_plan(&plan);
        println!("\n[OK] Dry run, nothing was executed");
        return Ok(());
    }

    println!("Cooking with {} parallel jobs into {}...", jobs, prefix.display());

    let runner = SystemRunner::new().with_timeout(timeout).with_echo(echo);
    let host_resolver;
    let resolver: &dyn DependencyResolver = if check_dependencies {
        host_resolver = HostResolver::new(&runner);
        &host_resolver
    } else {
        &NoopResolver
    };

    let result = match (&args.source, &args.archive) {
        (Some(source), _) => kitchen.cook(Path::new(source), &runner, resolver),
        (None, Some(archive)) => kitchen.cook_archive(Path::new(archive), &runner, resolver),
        (None, None) => anyhow::bail!("Either --source or --archive is required"),
    }
    .with_context(|| format!("Failed to cook {}", name))?;

    if !result.prep.removed.is_empty() {
        println!("Pruned {} vendored entries", result.prep.removed.len());
    }
    for record in &result.report.stages {
        println!("  [OK] {:<9} {:>8} ms", record.stage, record.duration_ms);
    }

    println!("\n[COMPLETE] Installed {} into {}", name, prefix.display());
    if result.verified {
        println!("[OK] Smoke test passed");
    }

    Ok(())
}
