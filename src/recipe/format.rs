// src/recipe/format.rs

//! Formula file format definitions
//!
//! A formula is a TOML file describing how to build one library from its
//! source archive: static package metadata, the dependency declaration,
//! how to prune the vendored tree, the configure flags, the docs target and
//! the smoke test run against the installed result.

use crate::error::{Error, Result};
use crate::recipe::deps::Dependency;
use serde::{Deserialize, Serialize};
use std::path::{Component, Path, PathBuf};

/// A complete formula
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Formula {
    /// Package metadata (static, never drives control flow)
    pub package: PackageSection,

    /// Build-time and runtime dependencies
    #[serde(default)]
    pub dependencies: Vec<Dependency>,

    /// Source tree preparation
    #[serde(default)]
    pub source: SourceSection,

    /// Configure-stage flags
    #[serde(default)]
    pub configure: ConfigureSection,

    /// Documentation target
    #[serde(default)]
    pub docs: DocsSection,

    /// Post-install smoke test
    pub test: TestSection,
}

impl Formula {
    /// Substitute variables in a string
    ///
    /// Replaces `%(name)s` patterns with:
    /// - `name`, `version` from the package section
    /// - `prefix` with the install prefix
    /// - `lib`, `include` with the standard subpaths under the prefix
    pub fn substitute(&self, template: &str, prefix: &Path) -> String {
        let layout = InstallLayout::new(prefix);

        template
            .replace("%(name)s", &self.package.name)
            .replace("%(version)s", &self.package.version)
            .replace("%(prefix)s", &prefix.to_string_lossy())
            .replace("%(lib)s", &layout.lib.to_string_lossy())
            .replace("%(include)s", &layout.include.to_string_lossy())
    }

    /// Get the archive URL with variables substituted
    pub fn archive_url(&self) -> String {
        self.substitute(&self.package.url, Path::new(""))
    }

    /// Get the archive filename from the URL
    pub fn archive_filename(&self) -> String {
        self.archive_url()
            .split('/')
            .next_back()
            .unwrap_or("source.tar.gz")
            .to_string()
    }
}

/// Package metadata section
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PackageSection {
    pub name: String,
    pub version: String,

    /// One-line description
    #[serde(default)]
    pub desc: Option<String>,

    #[serde(default)]
    pub homepage: Option<String>,

    /// Source archive URL (may contain `%(version)s`)
    pub url: String,

    /// Hex SHA-256 of the source archive
    pub sha256: String,

    #[serde(default)]
    pub license: Option<String>,

    /// VCS URL for unreleased builds
    #[serde(default)]
    pub head: Option<String>,
}

/// How to prune vendored third-party material from the source tree
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceSection {
    /// Directory (relative to the source root) holding vendored dependencies
    #[serde(default = "default_vendor_dir")]
    pub vendor_dir: String,

    /// The one child of `vendor_dir` that must survive preparation
    #[serde(default = "default_keep")]
    pub keep: String,
}

impl Default for SourceSection {
    fn default() -> Self {
        Self {
            vendor_dir: default_vendor_dir(),
            keep: default_keep(),
        }
    }
}

impl SourceSection {
    /// Reject paths that could reach outside the source tree
    ///
    /// `vendor_dir` must be relative and made only of plain names.
    /// `keep` must be a single plain name directly under it.
    pub fn check(&self) -> Result<()> {
        let vendor = Path::new(&self.vendor_dir);
        if self.vendor_dir.is_empty()
            || !vendor.components().all(|c| matches!(c, Component::Normal(_)))
        {
            return Err(Error::ParseError(format!(
                "source.vendor_dir must be a relative path without '..': {:?}",
                self.vendor_dir
            )));
        }

        let mut keep = Path::new(&self.keep).components();
        match (keep.next(), keep.next()) {
            (Some(Component::Normal(_)), None) => Ok(()),
            _ => Err(Error::ParseError(format!(
                "source.keep must be a single directory name: {:?}",
                self.keep
            ))),
        }
    }
}

fn default_vendor_dir() -> String {
    "extlibs".to_string()
}

fn default_keep() -> String {
    "headers".to_string()
}

/// Recipe-specific configure flags
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ConfigureSection {
    /// Flags passed to the configure stage, in order
    #[serde(default)]
    pub args: Vec<String>,
}

/// Documentation build target
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DocsSection {
    #[serde(default = "default_docs_target")]
    pub target: String,
}

impl Default for DocsSection {
    fn default() -> Self {
        Self {
            target: default_docs_target(),
        }
    }
}

fn default_docs_target() -> String {
    "doc".to_string()
}

/// Smoke test compiled against the installed artifacts
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TestSection {
    /// Source snippet
    pub source: String,

    /// File name the snippet is written to
    #[serde(default = "default_test_file")]
    pub file: String,

    /// Header subtree under `<prefix>/include` added to the include path
    pub include_subdir: String,

    /// Language standard passed as `-std=`
    #[serde(default = "default_std")]
    pub std: String,

    /// Library linked with `-l` (the smallest independently linkable unit)
    pub link: String,

    #[serde(default)]
    pub expected_exit: i32,
}

fn default_test_file() -> String {
    "test.cpp".to_string()
}

fn default_std() -> String {
    "c++17".to_string()
}

/// Standard subpaths under an install prefix
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstallLayout {
    pub prefix: PathBuf,
    pub include: PathBuf,
    pub lib: PathBuf,
    pub pkgconfig: PathBuf,
}

impl InstallLayout {
    pub fn new(prefix: &Path) -> Self {
        let lib = prefix.join("lib");
        Self {
            prefix: prefix.to_path_buf(),
            include: prefix.join("include"),
            pkgconfig: lib.join("pkgconfig"),
            lib,
        }
    }
}
