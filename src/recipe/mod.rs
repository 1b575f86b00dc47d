// src/recipe/mod.rs

//! Recipe system for building SFML from source
//!
//! A formula describes one library build:
//! - The source archive and its checksum
//! - Build-only and runtime dependencies, some scoped to a platform
//! - Which vendored directories to prune before configuring
//! - Configure flags, the docs target and the post-install smoke test
//!
//! # Culinary Terminology
//!
//! - **Formula**: The build specification
//! - **Kitchen**: Resolves, preps, cooks and tastes
//! - **Prep**: Prune the vendored tree
//! - **Cook**: Run the CMake pipeline into the prefix
//!
//! # Example Formula
//!
//! ```toml
//! [package]
//! name = "sfml"
//! version = "3.0.2"
//! url = "https://github.com/SFML/SFML/archive/refs/tags/%(version)s.tar.gz"
//! sha256 = "0034e05f95509e5d3fb81b1625713e06da7b068f210288ce3fd67106f8f46995"
//!
//! [[dependencies]]
//! name = "mesa"
//! platform = "linux"
//! probe = "gl"
//!
//! [configure]
//! args = ["-DBUILD_SHARED_LIBS=ON", "-DCMAKE_INSTALL_RPATH=%(lib)s"]
//!
//! [test]
//! source = "int main() { return 0; }"
//! include_subdir = "SFML/System"
//! link = "sfml-system"
//! ```

pub mod deps;
mod format;
pub mod kitchen;
pub mod parser;
pub mod prep;

pub use deps::{
    check_dependencies, resolve_dependencies, Dependency, DependencyResolver, DependencyRole,
    DependencySet, HostResolver, NoopResolver, PlatformScope, ResolutionReport,
};
pub use format::{
    ConfigureSection, DocsSection, Formula, InstallLayout, PackageSection, SourceSection,
    TestSection,
};
pub use kitchen::{CookPlan, CookResult, Kitchen, KitchenConfig, PipelineReport, Stage};
pub use parser::{builtin_formula, parse_formula, parse_formula_file, validate_formula};
pub use prep::{extract_archive, plan_source_preparation, prepare_source, PrepOutcome};
