// src/recipe/kitchen/config.rs

//! Configuration types for the Kitchen

use crate::error::{Error, Result};
use crate::recipe::format::{Formula, InstallLayout};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Configuration for the Kitchen
#[derive(Debug, Clone)]
pub struct KitchenConfig {
    /// Install prefix; artifacts land in `<prefix>/include`, `<prefix>/lib`, ...
    pub prefix: PathBuf,
    /// Build output directory (a fresh temporary directory when unset)
    pub build_dir: Option<PathBuf>,
    /// CMake executable
    pub cmake: String,
    /// C++ compiler used by the smoke test
    pub cxx: String,
    /// Value for CMAKE_BUILD_TYPE
    pub build_type: String,
    /// Parallel jobs handed to the build tool
    pub jobs: u32,
    /// Timeout for each sub-process
    pub timeout: Duration,
    /// Keep temporary build and extraction directories after the run
    pub keep_workdir: bool,
    /// Run the smoke test after install
    pub verify: bool,
    /// Resolve dependencies on the host before doing anything
    pub check_dependencies: bool,
    /// Log build tool output at info level
    pub echo_output: bool,
    /// Extra arguments appended to the configure stage
    pub extra_cmake_args: Vec<String>,
    /// Write a JSON run report here when the pipeline ends
    pub report_path: Option<PathBuf>,
}

impl Default for KitchenConfig {
    fn default() -> Self {
        let jobs = std::thread::available_parallelism()
            .map(|p| p.get() as u32)
            .unwrap_or(4);

        Self {
            prefix: PathBuf::from("/usr/local"),
            build_dir: None,
            cmake: "cmake".to_string(),
            cxx: std::env::var("CXX").unwrap_or_else(|_| "c++".to_string()),
            build_type: "Release".to_string(),
            jobs,
            timeout: Duration::from_secs(3600), // 1 hour
            keep_workdir: false,
            verify: true,
            check_dependencies: true,
            echo_output: false,
            extra_cmake_args: Vec::new(),
            report_path: None,
        }
    }
}

impl KitchenConfig {
    /// Create a configuration installing into `prefix`
    pub fn for_prefix(prefix: impl Into<PathBuf>) -> Self {
        Self {
            prefix: prefix.into(),
            ..Self::default()
        }
    }

    /// Load a configuration file on top of the defaults
    pub fn from_file(path: &Path) -> Result<Self> {
        let file = KitchenConfigFile::load(path)?;
        Ok(Self::default().merge(file))
    }

    /// Default location of the user configuration file
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|d| d.join("sfml-kitchen").join("kitchen.toml"))
    }

    /// Overlay values present in a config file
    pub fn merge(mut self, file: KitchenConfigFile) -> Self {
        if let Some(prefix) = file.prefix {
            self.prefix = prefix;
        }
        if file.build_dir.is_some() {
            self.build_dir = file.build_dir;
        }
        if let Some(cmake) = file.cmake {
            self.cmake = cmake;
        }
        if let Some(cxx) = file.cxx {
            self.cxx = cxx;
        }
        if let Some(build_type) = file.build_type {
            self.build_type = build_type;
        }
        if let Some(jobs) = file.jobs {
            self.jobs = jobs;
        }
        if let Some(secs) = file.timeout_secs {
            self.timeout = Duration::from_secs(secs);
        }
        if let Some(keep) = file.keep_workdir {
            self.keep_workdir = keep;
        }
        if let Some(verify) = file.verify {
            self.verify = verify;
        }
        if let Some(check) = file.check_dependencies {
            self.check_dependencies = check;
        }
        if let Some(echo) = file.echo_output {
            self.echo_output = echo;
        }
        self.extra_cmake_args.extend(file.extra_cmake_args);
        if file.report_path.is_some() {
            self.report_path = file.report_path;
        }
        self
    }

    /// Anchor the prefix and build directory to the current directory
    ///
    /// Build tool stages run from inside the source tree and the smoke test
    /// from a scratch directory, so a relative path would name a different
    /// place in each of them.
    pub fn with_absolute_paths(mut self) -> Result<Self> {
        self.prefix = std::path::absolute(&self.prefix)?;
        if let Some(dir) = self.build_dir.take() {
            self.build_dir = Some(std::path::absolute(dir)?);
        }
        Ok(self)
    }

    /// Standard layout under the install prefix
    pub fn layout(&self) -> InstallLayout {
        InstallLayout::new(&self.prefix)
    }

    /// Toolchain and platform defaults for the configure stage
    ///
    /// These are the same on every platform.
    pub fn standard_cmake_args(&self) -> Vec<String> {
        let mut args = vec![
            format!("-DCMAKE_INSTALL_PREFIX={}", self.prefix.display()),
            "-DCMAKE_INSTALL_LIBDIR=lib".to_string(),
            format!("-DCMAKE_BUILD_TYPE={}", self.build_type),
            "-DCMAKE_FIND_FRAMEWORK=LAST".to_string(),
            "-DCMAKE_VERBOSE_MAKEFILE=ON".to_string(),
            "-DBUILD_TESTING=OFF".to_string(),
            "-Wno-dev".to_string(),
        ];
        args.extend(self.extra_cmake_args.iter().cloned());
        args
    }
}

/// On-disk form of [`KitchenConfig`]; every field is optional
#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct KitchenConfigFile {
    pub prefix: Option<PathBuf>,
    pub build_dir: Option<PathBuf>,
    pub cmake: Option<String>,
    pub cxx: Option<String>,
    pub build_type: Option<String>,
    pub jobs: Option<u32>,
    pub timeout_secs: Option<u64>,
    pub keep_workdir: Option<bool>,
    pub verify: Option<bool>,
    pub check_dependencies: Option<bool>,
    pub echo_output: Option<bool>,
    pub extra_cmake_args: Vec<String>,
    pub report_path: Option<PathBuf>,
}

impl KitchenConfigFile {
    pub fn parse(content: &str) -> Result<Self> {
        toml::from_str(content).map_err(|e| Error::ConfigError(format!("Invalid kitchen config: {}", e)))
    }

    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            Error::ConfigError(format!("Failed to read {}: {}", path.display(), e))
        })?;
        Self::parse(&content)
    }
}

/// Recipe flags for the configure stage
///
/// Computed once from the formula and the prefix before any sub-process
/// runs, and never changed afterwards. The flags do not depend on the
/// platform.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildConfiguration {
    flags: Vec<String>,
}

impl BuildConfiguration {
    pub fn new(formula: &Formula, prefix: &Path) -> Self {
        let flags = formula
            .configure
            .args
            .iter()
            .map(|arg| formula.substitute(arg, prefix))
            .collect();

        Self { flags }
    }

    pub fn flags(&self) -> &[String] {
        &self.flags
    }
}
