// src/recipe/deps.rs

//! Dependency declaration and resolution
//!
//! Declaration is a pure function from a platform to a [`DependencySet`]:
//! entries scoped to all platforms are always present, platform-scoped
//! entries only when the platform matches. Resolution (checking that the
//! host can actually satisfy the set) is delegated to a
//! [`DependencyResolver`] so the kitchen stays decoupled from whatever
//! package manager provides the dependencies.

use crate::error::{Error, Result};
use crate::platform::Platform;
use crate::recipe::format::Formula;
use crate::recipe::kitchen::runner::{CommandRunner, Invocation};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use tracing::{debug, info, warn};

/// When a dependency is needed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DependencyRole {
    /// Only needed while building
    Build,
    /// Needed while building and by every consumer at run time
    #[default]
    Runtime,
}

impl fmt::Display for DependencyRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Build => write!(f, "build"),
            Self::Runtime => write!(f, "runtime"),
        }
    }
}

/// Which platforms a dependency applies to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PlatformScope {
    #[default]
    All,
    Linux,
    #[serde(rename = "macos")]
    MacOs,
}

impl PlatformScope {
    pub fn matches(&self, platform: Platform) -> bool {
        match self {
            Self::All => true,
            Self::Linux => platform.is_linux(),
            Self::MacOs => platform == Platform::MacOs,
        }
    }
}

impl fmt::Display for PlatformScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::All => write!(f, "all"),
            Self::Linux => write!(f, "linux"),
            Self::MacOs => write!(f, "macos"),
        }
    }
}

/// A single declared dependency
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Dependency {
    pub name: String,

    #[serde(default)]
    pub role: DependencyRole,

    #[serde(default)]
    pub platform: PlatformScope,

    /// Name to probe the host with, if it differs from `name`
    /// (a pkg-config module for libraries, an executable for tools)
    #[serde(default)]
    pub probe: Option<String>,
}

impl Dependency {
    pub fn probe_name(&self) -> &str {
        self.probe.as_deref().unwrap_or(&self.name)
    }
}

/// Dependencies that apply to one platform, keyed by name
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DependencySet {
    entries: BTreeMap<String, Dependency>,
}

impl DependencySet {
    /// Select the declared dependencies that apply to `platform`
    pub fn declare(declared: &[Dependency], platform: Platform) -> Self {
        let entries = declared
            .iter()
            .filter(|dep| dep.platform.matches(platform))
            .map(|dep| (dep.name.clone(), dep.clone()))
            .collect();

        Self { entries }
    }

    /// Dependency set of a formula on a platform
    pub fn for_formula(formula: &Formula, platform: Platform) -> Self {
        Self::declare(&formula.dependencies, platform)
    }

    pub fn get(&self, name: &str) -> Option<&Dependency> {
        self.entries.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.entries.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Dependency> {
        self.entries.values()
    }

    pub fn names(&self) -> Vec<&str> {
        self.entries.keys().map(|s| s.as_str()).collect()
    }

    /// Entries with the given role
    pub fn with_role(&self, role: DependencyRole) -> Vec<&Dependency> {
        self.iter().filter(|d| d.role == role).collect()
    }

    /// Entries that only exist because of a platform scope
    pub fn platform_scoped(&self) -> Vec<&Dependency> {
        self.iter().filter(|d| d.platform != PlatformScope::All).collect()
    }
}

/// Checks whether the host can satisfy dependencies
///
/// Implementations never install anything; provisioning belongs to the
/// host package manager.
pub trait DependencyResolver {
    /// Return the names of dependencies that are not available
    fn check_missing(&self, deps: &[&Dependency]) -> Result<Vec<String>>;
}

/// A resolver that assumes every dependency is satisfied
///
/// Use this when the environment is known to be provisioned already
/// (e.g., inside a prepared build container).
pub struct NoopResolver;

impl DependencyResolver for NoopResolver {
    fn check_missing(&self, _deps: &[&Dependency]) -> Result<Vec<String>> {
        Ok(Vec::new())
    }
}

/// Probes the running host
///
/// Build-only dependencies are looked up as executables on `PATH`.
/// Runtime dependencies are libraries and are checked with
/// `pkg-config --exists <module>`.
pub struct HostResolver<'a> {
    runner: &'a dyn CommandRunner,
    pkg_config: String,
}

impl<'a> HostResolver<'a> {
    pub fn new(runner: &'a dyn CommandRunner) -> Self {
        let pkg_config = if which::which("pkgconf").is_ok() {
            "pkgconf".to_string()
        } else {
            "pkg-config".to_string()
        };

        Self { runner, pkg_config }
    }

    /// Use a specific pkg-config executable
    pub fn with_pkg_config(mut self, program: impl Into<String>) -> Self {
        self.pkg_config = program.into();
        self
    }

    fn tool_available(&self, dep: &Dependency) -> bool {
        let probe = dep.probe_name();
        if which::which(probe).is_ok() {
            return true;
        }
        // pkgconf and pkg-config are interchangeable
        probe == "pkgconf" && which::which("pkg-config").is_ok()
    }

    fn library_available(&self, dep: &Dependency) -> Result<bool> {
        let invocation = Invocation::new(&self.pkg_config)
            .arg("--exists")
            .arg(dep.probe_name());

        match self.runner.run(&invocation) {
            Ok(output) => Ok(output.success()),
            // No pkg-config at all means nothing can be confirmed
            Err(Error::SpawnFailed { .. }) => Ok(false),
            Err(e) => Err(e),
        }
    }
}

impl DependencyResolver for HostResolver<'_> {
    fn check_missing(&self, deps: &[&Dependency]) -> Result<Vec<String>> {
        let mut missing = Vec::new();

        for dep in deps {
            let available = match dep.role {
                DependencyRole::Build => self.tool_available(dep),
                DependencyRole::Runtime => self.library_available(dep)?,
            };

            debug!(
                "Dependency {} ({}, probe {}): {}",
                dep.name,
                dep.role,
                dep.probe_name(),
                if available { "found" } else { "missing" }
            );

            if !available {
                missing.push(dep.name.clone());
            }
        }

        Ok(missing)
    }
}

/// Outcome of resolving a dependency set
#[derive(Debug, Default, Clone, Serialize)]
pub struct ResolutionReport {
    pub satisfied: Vec<String>,
    pub missing: Vec<String>,
}

/// Check a dependency set against a resolver without failing
pub fn check_dependencies(
    set: &DependencySet,
    resolver: &dyn DependencyResolver,
) -> Result<ResolutionReport> {
    let deps: Vec<&Dependency> = set.iter().collect();
    if deps.is_empty() {
        debug!("No dependencies declared");
        return Ok(ResolutionReport::default());
    }

    info!("Checking dependencies: {}", set.names().join(", "));

    let missing = resolver.check_missing(&deps)?;
    let satisfied = set
        .names()
        .into_iter()
        .filter(|name| !missing.iter().any(|m| m == name))
        .map(|s| s.to_string())
        .collect();

    Ok(ResolutionReport { satisfied, missing })
}

/// Resolve a dependency set, failing if anything is missing
///
/// A missing dependency is a precondition failure: nothing downstream
/// (source preparation, the build pipeline) may start.
pub fn resolve_dependencies(
    set: &DependencySet,
    resolver: &dyn DependencyResolver,
) -> Result<ResolutionReport> {
    let report = check_dependencies(set, resolver)?;

    if !report.missing.is_empty() {
        warn!("Could not resolve dependencies: {}", report.missing.join(", "));
        return Err(Error::UnresolvedDependencies(report.missing));
    }

    info!("All {} dependencies satisfied", report.satisfied.len());
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::recipe::kitchen::runner::RecordingRunner;
    use crate::recipe::parser::builtin_formula;
    use std::collections::HashSet;

    const BASE: &[&str] = &[
        "cmake", "doxygen", "pkgconf", "flac", "freetype", "libogg", "libvorbis",
    ];
    const LINUX_ONLY: &[&str] = &[
        "libx11", "libxcursor", "libxi", "libxrandr", "mesa", "mesa-glu", "openal-soft", "systemd",
    ];

    /// Resolver that reports a fixed set of names as missing
    struct FixedResolver(HashSet<String>);

    impl DependencyResolver for FixedResolver {
        fn check_missing(&self, deps: &[&Dependency]) -> Result<Vec<String>> {
            Ok(deps
                .iter()
                .filter(|d| self.0.contains(&d.name))
                .map(|d| d.name.clone())
                .collect())
        }
    }

    fn names(set: &DependencySet) -> HashSet<String> {
        set.names().into_iter().map(String::from).collect()
    }

    fn expected(groups: &[&[&str]]) -> HashSet<String> {
        groups.iter().flat_map(|g| g.iter().map(|s| s.to_string())).collect()
    }

    #[test]
    fn test_non_linux_gets_base_set_only() {
        let formula = builtin_formula().unwrap();
        for platform in [Platform::MacOs, Platform::Other] {
            let set = DependencySet::for_formula(&formula, platform);
            assert_eq!(names(&set), expected(&[BASE]));
            assert!(set.platform_scoped().is_empty());
        }
    }

    #[test]
    fn test_linux_adds_platform_scoped_entries() {
        let formula = builtin_formula().unwrap();
        let set = DependencySet::for_formula(&formula, Platform::Linux);
        assert_eq!(names(&set), expected(&[BASE, LINUX_ONLY]));
        assert_eq!(set.platform_scoped().len(), LINUX_ONLY.len());
        assert!(set.contains("systemd"));
        assert!(set.contains("openal-soft"));
    }

    #[test]
    fn test_roles() {
        let formula = builtin_formula().unwrap();
        let set = DependencySet::for_formula(&formula, Platform::MacOs);
        let build: Vec<&str> = set
            .with_role(DependencyRole::Build)
            .iter()
            .map(|d| d.name.as_str())
            .collect();
        assert_eq!(build, vec!["cmake", "doxygen", "pkgconf"]);
        assert_eq!(set.get("flac").unwrap().role, DependencyRole::Runtime);
        assert_eq!(set.get("freetype").unwrap().probe_name(), "freetype2");
    }

    #[test]
    fn test_declare_is_pure() {
        let formula = builtin_formula().unwrap();
        let a = DependencySet::for_formula(&formula, Platform::Linux);
        let b = DependencySet::for_formula(&formula, Platform::Linux);
        assert_eq!(a, b);
    }

    #[test]
    fn test_noop_resolver() {
        let formula = builtin_formula().unwrap();
        let set = DependencySet::for_formula(&formula, Platform::Linux);
        let report = resolve_dependencies(&set, &NoopResolver).unwrap();
        assert_eq!(report.satisfied.len(), set.len());
        assert!(report.missing.is_empty());
    }

    #[test]
    fn test_missing_dependency_is_precondition_failure() {
        let formula = builtin_formula().unwrap();
        let set = DependencySet::for_formula(&formula, Platform::Linux);
        let resolver = FixedResolver(["mesa".to_string()].into_iter().collect());

        let err = resolve_dependencies(&set, &resolver).unwrap_err();
        assert_eq!(err.kind(), crate::error::ErrorKind::Precondition);
        assert!(matches!(err, Error::UnresolvedDependencies(ref m) if m == &vec!["mesa".to_string()]));

        let report = check_dependencies(&set, &resolver).unwrap();
        assert_eq!(report.missing, vec!["mesa"]);
        assert_eq!(report.satisfied.len(), set.len() - 1);
    }

    #[test]
    fn test_host_resolver_probes_libraries_with_pkg_config() {
        let runner = RecordingRunner::new().fail_when("vorbis", 1);
        let resolver = HostResolver::new(&runner).with_pkg_config("pkg-config");
        let ogg = Dependency {
            name: "libogg".to_string(),
            role: DependencyRole::Runtime,
            platform: PlatformScope::All,
            probe: Some("ogg".to_string()),
        };
        let vorbis = Dependency {
            name: "libvorbis".to_string(),
            role: DependencyRole::Runtime,
            platform: PlatformScope::All,
            probe: Some("vorbis".to_string()),
        };

        let missing = resolver.check_missing(&[&ogg, &vorbis]).unwrap();
        assert_eq!(missing, vec!["libvorbis"]);

        let calls = runner.invocations();
        assert_eq!(calls.len(), 2);
        assert_eq!(calls[0].program, "pkg-config");
        assert_eq!(calls[0].args, vec!["--exists", "ogg"]);
    }

    #[test]
    fn test_host_resolver_tool_lookup() {
        let runner = RecordingRunner::new();
        let resolver = HostResolver::new(&runner);
        let present = Dependency {
            name: "sh".to_string(),
            role: DependencyRole::Build,
            platform: PlatformScope::All,
            probe: None,
        };
        let absent = Dependency {
            name: "definitely-not-a-real-tool-4f1c".to_string(),
            role: DependencyRole::Build,
            platform: PlatformScope::All,
            probe: None,
        };

        if cfg!(unix) {
            let missing = resolver.check_missing(&[&present, &absent]).unwrap();
            assert_eq!(missing, vec!["definitely-not-a-real-tool-4f1c"]);
        }
        assert!(runner.invocations().is_empty());
    }
}
