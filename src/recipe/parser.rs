// src/recipe/parser.rs

//! Formula file parsing

use crate::error::{Error, Result};
use crate::recipe::format::Formula;
use std::collections::HashSet;
use std::path::Path;

/// The SFML formula shipped with the binary
const BUILTIN_SFML: &str = include_str!("../../recipes/sfml.toml");

/// Parse a formula from a TOML string
pub fn parse_formula(content: &str) -> Result<Formula> {
    toml::from_str(content).map_err(|e| Error::ParseError(format!("Invalid formula: {}", e)))
}

/// Parse a formula from a file
pub fn parse_formula_file(path: &Path) -> Result<Formula> {
    let content = std::fs::read_to_string(path)
        .map_err(|e| Error::IoError(format!("Failed to read formula file: {}", e)))?;

    parse_formula(&content)
}

/// Load the built-in SFML formula
pub fn builtin_formula() -> Result<Formula> {
    parse_formula(BUILTIN_SFML)
}

/// Validate a formula for completeness and correctness
///
/// Hard errors are returned as `Err`; soft issues come back as warnings.
pub fn validate_formula(formula: &Formula) -> Result<Vec<String>> {
    let mut warnings = Vec::new();

    if formula.package.name.is_empty() {
        return Err(Error::ParseError("Formula package name cannot be empty".to_string()));
    }
    if formula.package.version.is_empty() {
        return Err(Error::ParseError("Formula package version cannot be empty".to_string()));
    }

    let sha = &formula.package.sha256;
    if sha.len() != 64 || !sha.chars().all(|c| c.is_ascii_hexdigit()) {
        return Err(Error::ParseError(format!(
            "Invalid sha256: {}. Expected 64 hex characters",
            sha
        )));
    }

    let mut seen = HashSet::new();
    for dep in &formula.dependencies {
        if dep.name.is_empty() {
            return Err(Error::ParseError("Dependency name cannot be empty".to_string()));
        }
        if !seen.insert(dep.name.as_str()) {
            return Err(Error::ParseError(format!(
                "Duplicate dependency: {}",
                dep.name
            )));
        }
    }

    formula.source.check()?;

    if formula.test.link.is_empty() {
        return Err(Error::ParseError("test.link cannot be empty".to_string()));
    }

    if formula.package.license.is_none() {
        warnings.push("Missing package license".to_string());
    }
    if formula.package.homepage.is_none() {
        warnings.push("Missing package homepage".to_string());
    }
    if formula.configure.args.is_empty() {
        warnings.push("No configure arguments specified".to_string());
    }

    Ok(warnings)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::recipe::deps::DependencyRole;

    const MINIMAL: &str = r#"
[package]
name = "demo"
version = "1.0"
url = "https://example.com/demo-%(version)s.tar.gz"
sha256 = "0034e05f95509e5d3fb81b1625713e06da7b068f210288ce3fd67106f8f46995"

[test]
source = "int main() { return 0; }"
include_subdir = "demo"
link = "demo"
"#;

    #[test]
    fn test_builtin_formula_parses() {
        let formula = builtin_formula().unwrap();
        assert_eq!(formula.package.name, "sfml");
        assert_eq!(formula.package.version, "3.0.2");
        assert_eq!(formula.dependencies.len(), 15);
        assert_eq!(formula.source.vendor_dir, "extlibs");
        assert_eq!(formula.source.keep, "headers");
        assert_eq!(formula.docs.target, "doc");
        assert_eq!(formula.test.link, "sfml-system");
        assert_eq!(formula.test.expected_exit, 0);
        assert!(formula.test.source.contains("sf::milliseconds(10)"));
        assert!(validate_formula(&formula).unwrap().is_empty());
    }

    #[test]
    fn test_parse_minimal_formula_defaults() {
        let formula = parse_formula(MINIMAL).unwrap();
        assert!(formula.dependencies.is_empty());
        assert_eq!(formula.source.vendor_dir, "extlibs");
        assert_eq!(formula.source.keep, "headers");
        assert_eq!(formula.docs.target, "doc");
        assert_eq!(formula.test.file, "test.cpp");
        assert_eq!(formula.test.std, "c++17");
    }

    #[test]
    fn test_dependency_role_defaults_to_runtime() {
        let content = format!("{}\n[[dependencies]]\nname = \"zlib\"\n", MINIMAL);
        let formula = parse_formula(&content).unwrap();
        assert_eq!(formula.dependencies[0].role, DependencyRole::Runtime);
    }

    #[test]
    fn test_parse_invalid_formula() {
        assert!(parse_formula("this is not valid toml at all {}").is_err());
    }

    #[test]
    fn test_validate_bad_sha() {
        let content = MINIMAL.replace(
            "0034e05f95509e5d3fb81b1625713e06da7b068f210288ce3fd67106f8f46995",
            "md5:abc",
        );
        let formula = parse_formula(&content).unwrap();
        assert!(validate_formula(&formula).is_err());
    }

    #[test]
    fn test_validate_duplicate_dependency() {
        let content = format!(
            "{}\n[[dependencies]]\nname = \"zlib\"\n\n[[dependencies]]\nname = \"zlib\"\nrole = \"build\"\n",
            MINIMAL
        );
        let formula = parse_formula(&content).unwrap();
        let err = validate_formula(&formula).unwrap_err();
        assert!(err.to_string().contains("Duplicate dependency: zlib"));
    }

    #[test]
    fn test_validate_rejects_escaping_vendor_paths() {
        for (vendor_dir, keep) in [("..", "headers"), ("/usr", "include"), ("extlibs", "headers/glad")] {
            let content = format!(
                "{}\n[source]\nvendor_dir = \"{}\"\nkeep = \"{}\"\n",
                MINIMAL, vendor_dir, keep
            );
            let formula = parse_formula(&content).unwrap();
            let err = validate_formula(&formula).unwrap_err();
            assert!(err.to_string().contains("source."), "{}", err);
        }
    }

    #[test]
    fn test_validate_warnings() {
        let formula = parse_formula(MINIMAL).unwrap();
        let warnings = validate_formula(&formula).unwrap();
        assert!(warnings.iter().any(|w| w.contains("license")));
        assert!(warnings.iter().any(|w| w.contains("homepage")));
        assert!(warnings.iter().any(|w| w.contains("configure")));
    }
}
