// src/recipe/kitchen/verify.rs

//! Post-install smoke test
//!
//! Compiles a tiny consumer program against the installed headers, links it
//! against the smallest installed library and runs it. The test only looks
//! at the install prefix, never at the source or build directories, and it
//! works in its own scratch directory.

use super::runner::{CommandOutput, CommandRunner, FAILURE_CONTEXT_LINES, Invocation};
use crate::error::{Error, ExitCode, Result};
use crate::platform::Platform;
use crate::recipe::format::{InstallLayout, TestSection};
use serde::Serialize;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Name of the compiled test executable
const TEST_BINARY: &str = "test";

/// The two sub-steps of verification
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum VerifyStep {
    /// Compile and link the test program
    Compile,
    /// Execute the test program
    Run,
}

impl fmt::Display for VerifyStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Compile => write!(f, "compile"),
            Self::Run => write!(f, "run"),
        }
    }
}

/// Captured output of a passing smoke test
#[derive(Debug, Clone)]
pub struct SmokeTestOutcome {
    pub compile: CommandOutput,
    pub run: CommandOutput,
}

/// A compile-link-run check against an install prefix
#[derive(Debug, Clone)]
pub struct SmokeTest {
    source: String,
    file: String,
    include_dir: PathBuf,
    lib_dir: PathBuf,
    std: String,
    link: String,
    expected_exit: i32,
    cxx: String,
    platform: Platform,
}

impl SmokeTest {
    pub fn new(test: &TestSection, layout: &InstallLayout) -> Self {
        Self {
            source: test.source.clone(),
            file: test.file.clone(),
            include_dir: layout.include.join(&test.include_subdir),
            lib_dir: layout.lib.clone(),
            std: test.std.clone(),
            link: test.link.clone(),
            expected_exit: test.expected_exit,
            cxx: "c++".to_string(),
            platform: Platform::current(),
        }
    }

    /// Use a specific C++ compiler
    pub fn with_compiler(mut self, cxx: impl Into<String>) -> Self {
        self.cxx = cxx.into();
        self
    }

    /// Override the platform (selects the loader search path variable)
    pub fn with_platform(mut self, platform: Platform) -> Self {
        self.platform = platform;
        self
    }

    /// `c++ -I<include> -std=<std> test.cpp -L<lib> -l<link> -o test`
    pub fn compile_invocation(&self, workdir: &Path) -> Invocation {
        Invocation::new(&self.cxx)
            .path_arg("-I", &self.include_dir)
            .arg(format!("-std={}", self.std))
            .arg(&self.file)
            .path_arg("-L", &self.lib_dir)
            .arg(format!("-l{}", self.link))
            .args(["-o", TEST_BINARY])
            .current_dir(workdir)
    }

    /// Runs the compiled program with the install's lib dir on the loader path
    pub fn run_invocation(&self, workdir: &Path) -> Invocation {
        let var = self.platform.library_path_var();
        let mut search_path = self.lib_dir.display().to_string();
        if let Ok(existing) = std::env::var(var) {
            if !existing.is_empty() {
                search_path.push(':');
                search_path.push_str(&existing);
            }
        }

        Invocation::new(workdir.join(TEST_BINARY).display().to_string())
            .current_dir(workdir)
            .env(var, search_path)
    }

    /// Write the snippet to a fresh scratch directory, build it and run it
    pub fn run(&self, runner: &dyn CommandRunner) -> Result<SmokeTestOutcome> {
        let workdir = tempfile::Builder::new()
            .prefix("sfml-smoke-")
            .tempdir()
            .map_err(|e| Error::IoError(format!("Failed to create smoke test directory: {}", e)))?;

        let source_path = workdir.path().join(&self.file);
        fs::write(&source_path, &self.source)?;
        debug!("Wrote smoke test source to {}", source_path.display());

        let compile = self.step(runner, VerifyStep::Compile, &self.compile_invocation(workdir.path()), 0)?;
        let run = self.step(
            runner,
            VerifyStep::Run,
            &self.run_invocation(workdir.path()),
            self.expected_exit,
        )?;

        info!("Smoke test passed");
        Ok(SmokeTestOutcome { compile, run })
    }

    fn step(
        &self,
        runner: &dyn CommandRunner,
        step: VerifyStep,
        invocation: &Invocation,
        expected: i32,
    ) -> Result<CommandOutput> {
        info!("Smoke test {}: {}", step, invocation);

        let output = runner.run(invocation).map_err(|e| Error::VerificationFailed {
            step,
            status: ExitCode::Unknown,
            output: e.to_string(),
        })?;

        if output.status != ExitCode::Code(expected) {
            return Err(Error::VerificationFailed {
                step,
                status: output.status,
                output: output.tail(FAILURE_CONTEXT_LINES),
            });
        }

        Ok(output)
    }
}
