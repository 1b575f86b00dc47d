// src/lib.rs

//! SFML Kitchen
//!
//! Builds and installs the SFML multimedia library from its source archive,
//! then checks that the installation is usable.
//!
//! # Architecture
//!
//! - Formula-driven: the recipe is TOML data, the built-in SFML formula ships with the binary
//! - Dependency gate: declared dependencies are resolved on the host before anything else
//! - Source prep: vendored third-party libraries are pruned so the system copies are used
//! - Staged pipeline: configure, build, docs, install, each gated on the last
//! - Smoke test: compile, link and run a tiny program against the installed prefix

mod error;
pub mod platform;
pub mod recipe;

pub use error::{Error, ErrorKind, ExitCode, Result};
pub use platform::Platform;
pub use recipe::{
    builtin_formula, parse_formula, parse_formula_file, validate_formula, CookPlan, CookResult,
    DependencyResolver, DependencySet, Formula, HostResolver, Kitchen, KitchenConfig,
    NoopResolver, PipelineReport, Stage,
};
