// src/recipe/kitchen/mod.rs

//! Kitchen: where the formula gets cooked
//!
//! The Kitchen ties the pieces together for one run:
//! - Resolving the declared dependencies on the host
//! - Pruning vendored libraries from the source tree
//! - Driving the CMake pipeline into the install prefix
//! - Smoke-testing the installed artifacts
//!
//! Every step is gated on the previous one succeeding.

pub mod config;
pub mod pipeline;
pub mod runner;
pub mod verify;

pub use config::{BuildConfiguration, KitchenConfig, KitchenConfigFile};
pub use pipeline::{Pipeline, PipelineReport, PipelineState, Stage, StageRecord};
pub use runner::{CommandOutput, CommandRunner, Invocation, RecordingRunner, SystemRunner};
pub use verify::{SmokeTest, SmokeTestOutcome, VerifyStep};

use crate::error::{Error, Result};
use crate::platform::Platform;
use crate::recipe::deps::{
    resolve_dependencies, Dependency, DependencyResolver, DependencySet, ResolutionReport,
};
use crate::recipe::format::Formula;
use crate::recipe::prep::{extract_archive, plan_source_preparation, prepare_source, PrepOutcome};
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;
use tracing::{debug, info, warn};

/// Result of a successful cook
#[derive(Debug)]
pub struct CookResult {
    /// Dependency check outcome (`None` when the check was disabled)
    pub resolution: Option<ResolutionReport>,
    /// What source preparation removed
    pub prep: PrepOutcome,
    /// Per-stage record of the pipeline
    pub report: PipelineReport,
    /// Whether the smoke test ran (and passed)
    pub verified: bool,
}

/// What a cook would do, without doing it
#[derive(Debug)]
pub struct CookPlan {
    pub platform: Platform,
    pub dependencies: Vec<Dependency>,
    /// Vendored entries that would be removed (`None` if no source tree yet)
    pub removals: Option<Vec<PathBuf>>,
    /// Build tool invocations in order
    pub invocations: Vec<Invocation>,
    /// Compile and run commands of the smoke test (empty if disabled)
    pub verification: Vec<Invocation>,
}

/// The Kitchen: where formulas are cooked
pub struct Kitchen {
    formula: Formula,
    config: KitchenConfig,
    platform: Platform,
}

impl Kitchen {
    /// Create a Kitchen for the host platform
    pub fn new(formula: Formula, config: KitchenConfig) -> Self {
        Self {
            formula,
            config,
            platform: Platform::current(),
        }
    }

    /// Cook as if running on another platform
    pub fn with_platform(mut self, platform: Platform) -> Self {
        self.platform = platform;
        self
    }

    pub fn formula(&self) -> &Formula {
        &self.formula
    }

    pub fn config(&self) -> &KitchenConfig {
        &self.config
    }

    pub fn platform(&self) -> Platform {
        self.platform
    }

    /// The dependency set for this Kitchen's platform
    pub fn dependencies(&self) -> DependencySet {
        DependencySet::for_formula(&self.formula, self.platform)
    }

    /// The smoke test against the configured prefix
    pub fn smoke_test(&self) -> SmokeTest {
        self.smoke_test_for(&self.config)
    }

    fn smoke_test_for(&self, config: &KitchenConfig) -> SmokeTest {
        SmokeTest::new(&self.formula.test, &config.layout())
            .with_compiler(&config.cxx)
            .with_platform(self.platform)
    }

    /// Describe a cook without running anything or touching the tree
    pub fn plan(&self, source_root: Option<&Path>) -> Result<CookPlan> {
        let config = self.config.clone().with_absolute_paths()?;

        let (source_dir, removals) = match source_root {
            Some(root) => {
                let removals = plan_source_preparation(root, &self.formula.source)?;
                (fs::canonicalize(root)?, Some(removals))
            }
            None => {
                let name = format!("{}-{}", self.formula.package.name, self.formula.package.version);
                (std::path::absolute(name)?, None)
            }
        };
        let build_dir = config
            .build_dir
            .clone()
            .unwrap_or_else(|| std::env::temp_dir().join("sfml-build"));

        let runner = RecordingRunner::new();
        let pipeline = Pipeline::new(&runner, &self.formula, &config, &source_dir, &build_dir);

        let verification = if config.verify {
            let smoke = self.smoke_test_for(&config);
            let workdir = Path::new(".");
            vec![smoke.compile_invocation(workdir), smoke.run_invocation(workdir)]
        } else {
            Vec::new()
        };

        Ok(CookPlan {
            platform: self.platform,
            dependencies: self.dependencies().iter().cloned().collect(),
            removals,
            invocations: pipeline.planned_invocations(),
            verification,
        })
    }

    /// Cook an already extracted source tree
    ///
    /// Dependency resolution gates everything else. Source preparation runs
    /// once before the first build tool invocation, and the smoke test only
    /// runs after a successful install.
    pub fn cook(
        &self,
        source_root: &Path,
        runner: &dyn CommandRunner,
        resolver: &dyn DependencyResolver,
    ) -> Result<CookResult> {
        info!(
            "Cooking {} {} for {}",
            self.formula.package.name, self.formula.package.version, self.platform
        );

        // Dependencies first: a missing one stops the run before the tree is touched
        let resolution = if self.config.check_dependencies {
            Some(resolve_dependencies(&self.dependencies(), resolver)?)
        } else {
            warn!("Skipping dependency check");
            None
        };

        // Stages run from inside the source tree and the smoke test from a
        // scratch directory; every path handed to them is absolute
        let config = self.config.clone().with_absolute_paths()?;
        let source_root = fs::canonicalize(source_root).map_err(|e| Error::SourceLayout {
            path: source_root.to_path_buf(),
            reason: format!("cannot resolve source tree: {}", e),
        })?;

        if !source_root.join("CMakeLists.txt").is_file() {
            return Err(Error::SourceLayout {
                path: source_root,
                reason: "no CMakeLists.txt at the source root".to_string(),
            });
        }

        if let Some(dir) = &config.build_dir {
            check_build_dir(dir, &source_root)?;
        }

        let prep = prepare_source(&source_root, &self.formula.source)?;

        let workdir = WorkDir::create(config.build_dir.as_deref(), "sfml-build-")?;
        let (report, result) = self.run_pipeline(&config, &source_root, workdir.path(), runner);
        workdir.release(config.keep_workdir);

        if let Some(path) = &config.report_path {
            match report.write(path) {
                Ok(()) => info!("Wrote run report to {}", path.display()),
                Err(e) => warn!("Could not write run report: {}", e),
            }
        }

        result?;

        info!(
            "Cooked {} {} into {}",
            self.formula.package.name,
            self.formula.package.version,
            config.prefix.display()
        );

        Ok(CookResult {
            resolution,
            prep,
            report,
            verified: config.verify,
        })
    }

    /// Extract a source archive into a fresh directory and cook it
    pub fn cook_archive(
        &self,
        archive: &Path,
        runner: &dyn CommandRunner,
        resolver: &dyn DependencyResolver,
    ) -> Result<CookResult> {
        let workdir = WorkDir::create(None, "sfml-src-")?;
        let result = extract_archive(archive, workdir.path())
            .and_then(|source_root| self.cook(&source_root, runner, resolver));
        workdir.release(self.config.keep_workdir);
        result
    }

    /// Run only the smoke test against the configured prefix
    pub fn verify_installation(&self, runner: &dyn CommandRunner) -> Result<SmokeTestOutcome> {
        let config = self.config.clone().with_absolute_paths()?;
        let layout = config.layout();
        for dir in [&layout.include, &layout.lib] {
            if !dir.is_dir() {
                return Err(Error::NotFound(format!(
                    "{} (is {} installed under {}?)",
                    dir.display(),
                    self.formula.package.name,
                    layout.prefix.display()
                )));
            }
        }

        self.smoke_test_for(&config).run(runner)
    }

    fn run_pipeline(
        &self,
        config: &KitchenConfig,
        source_root: &Path,
        build_dir: &Path,
        runner: &dyn CommandRunner,
    ) -> (PipelineReport, Result<()>) {
        let mut pipeline = Pipeline::new(runner, &self.formula, config, source_root, build_dir);
        let result = self.drive(config, &mut pipeline);
        (pipeline.into_report(), result)
    }

    fn drive(&self, config: &KitchenConfig, pipeline: &mut Pipeline<'_>) -> Result<()> {
        pipeline.run()?;

        if config.verify {
            pipeline.verify(&self.smoke_test_for(config))?;
        } else {
            info!("Smoke test disabled");
        }

        pipeline.finish()
    }
}

/// A caller-chosen build directory must be outside the source tree and empty
///
/// It is never cleared on the caller's behalf: leftovers such as a stale
/// `CMakeCache.txt` would otherwise leak into the configure stage.
fn check_build_dir(dir: &Path, source_root: &Path) -> Result<()> {
    let unusable = |reason: &str| Error::BuildDirectory {
        path: dir.to_path_buf(),
        reason: reason.to_string(),
    };

    if resolve_path(dir).starts_with(source_root) {
        return Err(unusable("it lies inside the source tree"));
    }
    if !dir.exists() {
        return Ok(());
    }
    if !dir.is_dir() {
        return Err(unusable("it is not a directory"));
    }
    if fs::read_dir(dir)?.next().is_some() {
        return Err(unusable("it is not empty; remove it or choose another directory"));
    }

    Ok(())
}

/// Canonical form of `path`, resolving symlinks in its deepest existing ancestor
fn resolve_path(path: &Path) -> PathBuf {
    if let Ok(resolved) = fs::canonicalize(path) {
        return resolved;
    }
    match (path.parent(), path.file_name()) {
        (Some(parent), Some(name)) => resolve_path(parent).join(name),
        _ => path.to_path_buf(),
    }
}

/// A caller-chosen directory, or a temporary one
struct WorkDir {
    path: PathBuf,
    temp: Option<TempDir>,
}

impl WorkDir {
    fn create(fixed: Option<&Path>, prefix: &str) -> Result<Self> {
        match fixed {
            Some(dir) => {
                fs::create_dir_all(dir)?;
                Ok(Self {
                    path: dir.to_path_buf(),
                    temp: None,
                })
            }
            None => {
                let temp = tempfile::Builder::new().prefix(prefix).tempdir().map_err(|e| {
                    Error::IoError(format!("Failed to create work directory: {}", e))
                })?;
                Ok(Self {
                    path: temp.path().to_path_buf(),
                    temp: Some(temp),
                })
            }
        }
    }

    fn path(&self) -> &Path {
        &self.path
    }

    /// Drop the temporary directory, or keep it on disk
    fn release(self, keep: bool) {
        if let Some(temp) = self.temp {
            if keep {
                let kept = temp.keep();
                info!("Kept work directory {}", kept.display());
            } else {
                debug!("Removing work directory {}", self.path.display());
            }
        }
    }
}
