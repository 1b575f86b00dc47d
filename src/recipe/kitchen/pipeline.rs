// src/recipe/kitchen/pipeline.rs

//! Build orchestration
//!
//! Drives CMake through four stages (configure, build, docs, install)
//! followed by the smoke test. Stages run strictly in order, and each one
//! needs a zero exit before the next may start. The first failure moves the
//! pipeline into a terminal `Aborted` state; nothing is retried and no later
//! stage runs.

use super::config::{BuildConfiguration, KitchenConfig};
use super::runner::{CommandRunner, FAILURE_CONTEXT_LINES, Invocation};
use super::verify::SmokeTest;
use crate::error::{Error, ExitCode, Result};
use crate::recipe::format::Formula;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Instant;
use tracing::{info, warn};

/// Pipeline stages in order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, PartialOrd, Ord)]
#[serde(rename_all = "lowercase")]
pub enum Stage {
    /// Generate the build system
    Configure,
    /// Compile the libraries
    Build,
    /// Generate the API documentation
    Docs,
    /// Copy artifacts under the prefix
    Install,
    /// Smoke test against the installed artifacts
    Verify,
}

impl Stage {
    /// Get all stages in order
    pub fn all() -> &'static [Stage] {
        &[
            Self::Configure,
            Self::Build,
            Self::Docs,
            Self::Install,
            Self::Verify,
        ]
    }

    /// The stages that invoke the build tool
    pub fn build_tool_stages() -> &'static [Stage] {
        &[Self::Configure, Self::Build, Self::Docs, Self::Install]
    }

    /// Get the next stage after this one
    pub fn next(&self) -> Option<Stage> {
        match self {
            Self::Configure => Some(Self::Build),
            Self::Build => Some(Self::Docs),
            Self::Docs => Some(Self::Install),
            Self::Install => Some(Self::Verify),
            Self::Verify => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Configure => "configure",
            Self::Build => "build",
            Self::Docs => "docs",
            Self::Install => "install",
            Self::Verify => "verify",
        }
    }

    /// Get a human-readable name for the stage
    pub fn name(&self) -> &'static str {
        match self {
            Self::Configure => "Configure",
            Self::Build => "Build",
            Self::Docs => "Build documentation",
            Self::Install => "Install",
            Self::Verify => "Smoke test",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

/// Where the pipeline is
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "state", rename_all = "lowercase")]
pub enum PipelineState {
    /// Nothing has run yet
    Ready,
    /// `stage` is running, or is the last stage that succeeded
    Running { stage: Stage },
    /// Every requested stage succeeded
    Complete,
    /// `stage` failed; nothing after it ran
    Aborted { stage: Stage, reason: String },
}

impl PipelineState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Complete | Self::Aborted { .. })
    }

    /// The only stage allowed to start from this state
    pub fn next_stage(&self) -> Option<Stage> {
        match self {
            Self::Ready => Some(Stage::Configure),
            Self::Running { stage } => stage.next(),
            Self::Complete | Self::Aborted { .. } => None,
        }
    }
}

impl fmt::Display for PipelineState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Ready => write!(f, "ready"),
            Self::Running { stage } => write!(f, "running ({})", stage),
            Self::Complete => write!(f, "complete"),
            Self::Aborted { stage, reason } => write!(f, "aborted at {}: {}", stage, reason),
        }
    }
}

/// Timing and outcome of one stage
#[derive(Debug, Clone, Serialize)]
pub struct StageRecord {
    pub stage: Stage,
    pub command: String,
    pub started_at: DateTime<Utc>,
    pub duration_ms: u64,
    /// `None` when the process never produced an exit code
    pub exit_code: Option<i32>,
    pub success: bool,
}

/// Everything that happened during one run
#[derive(Debug, Clone, Serialize)]
pub struct PipelineReport {
    pub package: String,
    pub version: String,
    pub prefix: PathBuf,
    pub source_dir: PathBuf,
    pub build_dir: PathBuf,
    pub started_at: DateTime<Utc>,
    pub finished_at: Option<DateTime<Utc>>,
    pub state: PipelineState,
    pub stages: Vec<StageRecord>,
    /// Accumulated command lines and their output
    pub log: String,
}

impl PipelineReport {
    pub fn succeeded(&self) -> bool {
        self.state == PipelineState::Complete
    }

    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string_pretty(self)
            .map_err(|e| Error::IoError(format!("Failed to serialize report: {}", e)))
    }

    /// Write the report as JSON
    pub fn write(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        std::fs::write(path, self.to_json()?).map_err(|e| {
            Error::IoError(format!("Failed to write report {}: {}", path.display(), e))
        })
    }
}

/// The staged build of one formula
pub struct Pipeline<'a> {
    runner: &'a dyn CommandRunner,
    cmake: String,
    jobs: u32,
    source_dir: PathBuf,
    build_dir: PathBuf,
    configuration: BuildConfiguration,
    standard_args: Vec<String>,
    docs_target: String,
    report: PipelineReport,
}

impl<'a> Pipeline<'a> {
    pub fn new(
        runner: &'a dyn CommandRunner,
        formula: &Formula,
        config: &KitchenConfig,
        source_dir: &Path,
        build_dir: &Path,
    ) -> Self {
        // Fixed here, before anything runs
        let configuration = BuildConfiguration::new(formula, &config.prefix);

        Self {
            runner,
            cmake: config.cmake.clone(),
            jobs: config.jobs,
            source_dir: source_dir.to_path_buf(),
            build_dir: build_dir.to_path_buf(),
            configuration,
            standard_args: config.standard_cmake_args(),
            docs_target: formula.docs.target.clone(),
            report: PipelineReport {
                package: formula.package.name.clone(),
                version: formula.package.version.clone(),
                prefix: config.prefix.clone(),
                source_dir: source_dir.to_path_buf(),
                build_dir: build_dir.to_path_buf(),
                started_at: Utc::now(),
                finished_at: None,
                state: PipelineState::Ready,
                stages: Vec::new(),
                log: String::new(),
            },
        }
    }

    pub fn state(&self) -> &PipelineState {
        &self.report.state
    }

    pub fn configuration(&self) -> &BuildConfiguration {
        &self.configuration
    }

    pub fn report(&self) -> &PipelineReport {
        &self.report
    }

    pub fn into_report(self) -> PipelineReport {
        self.report
    }

    /// The build tool command for a stage (`None` for verification)
    pub fn invocation(&self, stage: Stage) -> Option<Invocation> {
        let base = Invocation::new(&self.cmake).current_dir(&self.source_dir);
        let build_dir = self.build_dir.display().to_string();

        let invocation = match stage {
            Stage::Configure => base
                .arg("-S")
                .arg(self.source_dir.display().to_string())
                .arg("-B")
                .arg(build_dir)
                .args(self.configuration.flags().iter().cloned())
                .args(self.standard_args.iter().cloned()),
            Stage::Build => base
                .args(["--build".to_string(), build_dir])
                .env("CMAKE_BUILD_PARALLEL_LEVEL", self.jobs.to_string()),
            Stage::Docs => base
                .args(["--build".to_string(), build_dir])
                .arg(format!("--target={}", self.docs_target))
                .env("CMAKE_BUILD_PARALLEL_LEVEL", self.jobs.to_string()),
            Stage::Install => base.args(["--install".to_string(), build_dir]),
            Stage::Verify => return None,
        };

        Some(invocation)
    }

    /// Every build tool command, in the order they would run
    pub fn planned_invocations(&self) -> Vec<Invocation> {
        Stage::build_tool_stages()
            .iter()
            .filter_map(|stage| self.invocation(*stage))
            .collect()
    }

    /// Run configure, build, docs and install
    pub fn run(&mut self) -> Result<()> {
        for stage in Stage::build_tool_stages() {
            self.run_stage(*stage)?;
        }
        Ok(())
    }

    /// Run a single build tool stage
    ///
    /// Fails with [`Error::InvalidState`] unless `stage` is the next one due.
    pub fn run_stage(&mut self, stage: Stage) -> Result<()> {
        let invocation = self.invocation(stage).ok_or_else(|| {
            Error::InvalidState(format!("{} does not invoke the build tool", stage))
        })?;
        self.begin(stage)?;

        info!("==> {}", stage.name());
        self.log_line(&format!("==> {}", invocation));

        let started_at = Utc::now();
        let timer = Instant::now();
        let result = self.runner.run(&invocation);
        let duration_ms = timer.elapsed().as_millis() as u64;

        match result {
            Ok(output) => {
                self.log_output(&output.combined());
                self.record(stage, &invocation, started_at, duration_ms, output.status, output.success());

                if output.success() {
                    info!("{} stage finished in {} ms", stage, duration_ms);
                    Ok(())
                } else {
                    Err(self.abort(Error::StageFailed {
                        stage,
                        status: output.status,
                        output: output.tail(FAILURE_CONTEXT_LINES),
                    }))
                }
            }
            // Spawn failures and timeouts abort the stage like a bad exit
            Err(err) => {
                self.log_line(&err.to_string());
                self.record(stage, &invocation, started_at, duration_ms, ExitCode::Unknown, false);
                Err(self.abort(Error::StageFailed {
                    stage,
                    status: ExitCode::Unknown,
                    output: err.to_string(),
                }))
            }
        }
    }

    /// Run the smoke test; only allowed right after a successful install
    pub fn verify(&mut self, smoke: &SmokeTest) -> Result<()> {
        self.begin(Stage::Verify)?;
        info!("==> {}", Stage::Verify.name());

        let command = smoke.compile_invocation(Path::new(".")).command_line();
        self.log_line(&format!("==> {}", command));

        let started_at = Utc::now();
        let timer = Instant::now();
        let result = smoke.run(self.runner);
        let duration_ms = timer.elapsed().as_millis() as u64;

        match result {
            Ok(outcome) => {
                self.log_output(&outcome.compile.combined());
                self.log_output(&outcome.run.combined());
                self.push_record(Stage::Verify, command, started_at, duration_ms, outcome.run.status.code(), true);
                Ok(())
            }
            Err(err) => {
                let status = match &err {
                    Error::VerificationFailed { status, .. } => *status,
                    _ => ExitCode::Unknown,
                };
                self.log_line(&err.to_string());
                self.push_record(Stage::Verify, command, started_at, duration_ms, status.code(), false);
                Err(self.abort(err))
            }
        }
    }

    /// Mark the run complete
    ///
    /// Valid after install (verification skipped) or after verification.
    pub fn finish(&mut self) -> Result<()> {
        match self.report.state {
            PipelineState::Running {
                stage: Stage::Install | Stage::Verify,
            } => {
                self.report.state = PipelineState::Complete;
                self.report.finished_at = Some(Utc::now());
                Ok(())
            }
            ref state => Err(Error::InvalidState(format!(
                "cannot complete a pipeline that is {}",
                state
            ))),
        }
    }

    fn begin(&mut self, stage: Stage) -> Result<()> {
        match self.report.state.next_stage() {
            Some(due) if due == stage => {
                self.report.state = PipelineState::Running { stage };
                Ok(())
            }
            _ => Err(Error::InvalidState(format!(
                "cannot start {} while the pipeline is {}",
                stage, self.report.state
            ))),
        }
    }

    fn abort(&mut self, err: Error) -> Error {
        let stage = match (err.stage(), &self.report.state) {
            (Some(stage), _) => stage,
            (None, PipelineState::Running { stage }) => *stage,
            (None, _) => Stage::Configure,
        };
        let reason = err.to_string().lines().next().unwrap_or_default().to_string();

        warn!("Pipeline aborted at {}: {}", stage, reason);
        self.report.state = PipelineState::Aborted { stage, reason };
        self.report.finished_at = Some(Utc::now());
        err
    }

    fn record(
        &mut self,
        stage: Stage,
        invocation: &Invocation,
        started_at: DateTime<Utc>,
        duration_ms: u64,
        status: ExitCode,
        success: bool,
    ) {
        self.push_record(stage, invocation.command_line(), started_at, duration_ms, status.code(), success);
    }

    fn push_record(
        &mut self,
        stage: Stage,
        command: String,
        started_at: DateTime<Utc>,
        duration_ms: u64,
        exit_code: Option<i32>,
        success: bool,
    ) {
        self.report.stages.push(StageRecord {
            stage,
            command,
            started_at,
            duration_ms,
            exit_code,
            success,
        });
    }

    fn log_line(&mut self, line: &str) {
        self.report.log.push_str(line);
        self.report.log.push('\n');
    }

    fn log_output(&mut self, output: &str) {
        if output.is_empty() {
            return;
        }
        self.report.log.push_str(output);
        if !output.ends_with('\n') {
            self.report.log.push('\n');
        }
    }
}
