// tests/cli.rs

//! Command-line behavior of the `sfml-kitchen` binary.

mod common;

#[cfg(unix)]
use common::{populate_source_tree, FakeToolchain};
use common::{source_tree, vendor_children};
use std::process::Command;

fn kitchen() -> Command {
    let mut cmd = Command::new(env!("CARGO_BIN_EXE_sfml-kitchen"));
    cmd.env("RUST_LOG", "warn");
    cmd
}

fn stdout_of(cmd: &mut Command) -> String {
    let output = cmd.output().unwrap();
    assert!(
        output.status.success(),
        "command failed: {}",
        String::from_utf8_lossy(&output.stderr)
    );
    String::from_utf8(output.stdout).unwrap()
}

#[test]
fn test_info_shows_builtin_formula() {
    let out = stdout_of(kitchen().arg("info"));
    assert!(out.contains("sfml 3.0.2"));
    assert!(out.contains("-DSFML_USE_SYSTEM_DEPS=ON"));
    assert!(out.contains("License:  Zlib"));
}

#[test]
fn test_deps_per_platform() {
    let linux = stdout_of(kitchen().args(["deps", "--platform", "linux"]));
    assert!(linux.contains("15 dependencies"));
    assert!(linux.contains("openal-soft"));

    let macos = stdout_of(kitchen().args(["deps", "--platform", "macos"]));
    assert!(macos.contains("7 dependencies"));
    assert!(!macos.contains("libx11"));
}

#[test]
fn test_unknown_platform_is_rejected() {
    let output = kitchen().args(["deps", "--platform", "amiga"]).output().unwrap();
    assert!(!output.status.success());
}

#[test]
fn test_prep_dry_run_then_prep() {
    let tree = source_tree(&["headers", "libs-osx"]);
    let root = tree.path().display().to_string();

    let plan = stdout_of(kitchen().args(["prep", "--dry-run", &root]));
    assert!(plan.contains("libs-osx"));
    assert_eq!(vendor_children(tree.path()).len(), 2);

    stdout_of(kitchen().args(["prep", &root]));
    assert_eq!(vendor_children(tree.path()), vec!["headers"]);
}

#[test]
fn test_cook_dry_run_runs_nothing() {
    let tree = source_tree(&["headers", "libs-osx"]);
    let root = tree.path().display().to_string();

    let out = stdout_of(kitchen().args([
        "cook",
        "--source",
        &root,
        "--prefix",
        "/opt/sfml",
        "--dry-run",
    ]));

    assert!(out.contains("--target=doc"));
    assert!(out.contains("-lsfml-system"));
    assert!(out.contains("[OK] Dry run"));
    assert_eq!(vendor_children(tree.path()).len(), 2);
}

#[test]
fn test_cook_missing_layout_fails() {
    let tree = source_tree(&["a"]);
    let root = tree.path().display().to_string();

    let output = kitchen()
        .args(["cook", "--source", &root, "--skip-deps-check", "--prefix", "/nonexistent"])
        .output()
        .unwrap();

    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("headers"));
}

#[cfg(unix)]
#[test]
fn test_cook_stage_failure_exits_nonzero() {
    let toolchain = FakeToolchain::failing_stage("build", 2);
    let tree = source_tree(&["headers", "libs-osx"]);
    let work = tempfile::tempdir().unwrap();
    let config = work.path().join("kitchen.toml");
    toolchain.config_file(&config);

    let output = kitchen()
        .args(["cook", "--skip-deps-check", "--source"])
        .arg(tree.path())
        .arg("--prefix")
        .arg(work.path().join("prefix"))
        .arg("--config")
        .arg(&config)
        .output()
        .unwrap();

    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("build stage failed"), "{}", stderr);
    assert!(stderr.contains("exit code 2"), "{}", stderr);
    assert!(stderr.contains("fake cmake: build failed"), "{}", stderr);

    // Docs and install never ran
    assert_eq!(toolchain.calls().len(), 2);
    assert!(!work.path().join("prefix").exists());
}

#[cfg(unix)]
#[test]
fn test_cook_with_relative_paths() {
    let toolchain = FakeToolchain::new();
    let work = tempfile::tempdir().unwrap();
    populate_source_tree(&work.path().join("SFML-3.0.2"), &["headers", "libs-osx"]);
    toolchain.config_file(&work.path().join("kitchen.toml"));

    let out = stdout_of(kitchen().current_dir(work.path()).args([
        "cook",
        "--skip-deps-check",
        "--source",
        "SFML-3.0.2",
        "--prefix",
        "out",
        "--build-dir",
        "build",
        "--config",
        "kitchen.toml",
    ]));

    assert!(out.contains("[COMPLETE]"));
    assert!(out.contains("[OK] Smoke test passed"));
    assert!(work.path().join("out/include/SFML/System/Time.hpp").is_file());
    assert!(work.path().join("build/.prefix").is_file());
    assert!(!work.path().join("SFML-3.0.2/build").exists());
    assert_eq!(
        vendor_children(&work.path().join("SFML-3.0.2")),
        vec!["headers"]
    );
}

#[test]
fn test_verify_missing_prefix_fails() {
    let prefix = tempfile::tempdir().unwrap();
    let output = kitchen()
        .args(["verify", "--prefix", &prefix.path().display().to_string()])
        .output()
        .unwrap();
    assert!(!output.status.success());
}
