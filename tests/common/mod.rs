// tests/common/mod.rs

//! Shared test utilities and helpers for integration tests.

#![allow(dead_code)]

use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

/// Create an extracted-looking SFML source tree.
///
/// `vendored` lists the children created under `extlibs/`.
pub fn source_tree(vendored: &[&str]) -> TempDir {
    let dir = tempfile::tempdir().unwrap();
    populate_source_tree(dir.path(), vendored);
    dir
}

/// Lay out the same source tree at `root`.
pub fn populate_source_tree(root: &Path, vendored: &[&str]) {
    fs::create_dir_all(root).unwrap();
    fs::write(root.join("CMakeLists.txt"), "cmake_minimum_required(VERSION 3.24)\nproject(SFML)\n")
        .unwrap();
    fs::create_dir_all(root.join("include/SFML/System")).unwrap();
    fs::write(root.join("include/SFML/System/Time.hpp"), "#pragma once\n").unwrap();

    for child in vendored {
        let path = root.join("extlibs").join(child);
        fs::create_dir_all(&path).unwrap();
        fs::write(path.join("README"), format!("vendored {}\n", child)).unwrap();
    }
}

/// Names of the entries directly under `extlibs/`, sorted
pub fn vendor_children(root: &Path) -> Vec<String> {
    let mut names: Vec<String> = fs::read_dir(root.join("extlibs"))
        .unwrap()
        .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
        .collect();
    names.sort();
    names
}

/// Stand-in `cmake` and `c++` executables that log their arguments.
#[cfg(unix)]
pub struct FakeToolchain {
    _dir: TempDir,
    pub cmake: PathBuf,
    pub cxx: PathBuf,
    pub log: PathBuf,
}

#[cfg(unix)]
impl FakeToolchain {
    /// Everything succeeds and the smoke test binary exits 0
    pub fn new() -> Self {
        Self::build(None, 0, 0)
    }

    /// The given stage (configure, build, docs, install) exits with `code`
    pub fn failing_stage(stage: &str, code: i32) -> Self {
        Self::build(Some(stage), code, 0)
    }

    /// The compiled smoke test binary exits with `code`
    pub fn failing_smoke_test(code: i32) -> Self {
        Self::build(None, 0, code)
    }

    fn build(fail_stage: Option<&str>, fail_code: i32, run_exit: i32) -> Self {
        let dir = tempfile::tempdir().unwrap();
        let log = dir.path().join("calls.log");
        fs::write(&log, "").unwrap();

        let cmake = dir.path().join("cmake");
        write_script(
            &cmake,
            &CMAKE_SCRIPT
                .replace("@LOG@", &log.display().to_string())
                .replace("@FAIL_STAGE@", fail_stage.unwrap_or("none"))
                .replace("@FAIL_CODE@", &fail_code.to_string()),
        );

        let cxx = dir.path().join("c++");
        write_script(
            &cxx,
            &CXX_SCRIPT
                .replace("@LOG@", &log.display().to_string())
                .replace("@RUN_EXIT@", &run_exit.to_string()),
        );

        Self {
            _dir: dir,
            cmake,
            cxx,
            log,
        }
    }

    /// A kitchen config file pointing at these executables
    pub fn config_file(&self, path: &Path) {
        fs::write(
            path,
            format!(
                "cmake = \"{}\"\ncxx = \"{}\"\njobs = 2\ntimeout_secs = 60\n",
                self.cmake.display(),
                self.cxx.display()
            ),
        )
        .unwrap();
    }

    /// Logged calls, one per line (`cmake ...` / `c++ ...`)
    pub fn calls(&self) -> Vec<String> {
        fs::read_to_string(&self.log)
            .unwrap()
            .lines()
            .map(str::to_string)
            .collect()
    }
}

#[cfg(unix)]
fn write_script(path: &Path, content: &str) {
    use std::os::unix::fs::PermissionsExt;

    fs::write(path, content).unwrap();
    let mut perms = fs::metadata(path).unwrap().permissions();
    perms.set_mode(0o755);
    fs::set_permissions(path, perms).unwrap();
}

/// Fake cmake: records the prefix at configure time and lays out a minimal
/// installation at install time.
const CMAKE_SCRIPT: &str = r#"#!/bin/sh
echo "cmake $*" >> "@LOG@"
stage=unknown
case "$1" in
  -S)
    if [ ! -f "$2/CMakeLists.txt" ]; then
      echo "CMake Error: The source directory \"$2\" does not exist." >&2
      exit 1
    fi
    build="$4"
    mkdir -p "$build"
    for arg in "$@"; do
      case "$arg" in
        -DCMAKE_INSTALL_PREFIX=*) echo "${arg#-DCMAKE_INSTALL_PREFIX=}" > "$build/.prefix" ;;
      esac
    done
    stage=configure
    ;;
  --build)
    if [ "$3" = "--target=doc" ]; then stage=docs; else stage=build; fi
    ;;
  --install)
    stage=install
    ;;
esac
if [ "$stage" = "@FAIL_STAGE@" ]; then
  echo "fake cmake: $stage failed" >&2
  exit @FAIL_CODE@
fi
if [ "$stage" = install ]; then
  prefix=$(cat "$2/.prefix")
  mkdir -p "$prefix/include/SFML/System" "$prefix/lib/pkgconfig" "$prefix/share/doc/SFML"
  echo '#pragma once' > "$prefix/include/SFML/System/Time.hpp"
  : > "$prefix/lib/libsfml-system.so"
  : > "$prefix/lib/pkgconfig/sfml-system.pc"
fi
exit 0
"#;

/// Fake c++: fails like a real compiler when the header is missing, and
/// otherwise writes a test "binary" with a fixed exit code.
const CXX_SCRIPT: &str = r#"#!/bin/sh
echo "c++ $*" >> "@LOG@"
inc="${1#-I}"
if [ ! -f "$inc/Time.hpp" ]; then
  echo "test.cpp:1:10: fatal error: Time.hpp: No such file or directory" >&2
  exit 1
fi
out=""
prev=""
for arg in "$@"; do
  if [ "$prev" = "-o" ]; then out="$arg"; fi
  prev="$arg"
done
printf '#!/bin/sh\nexit @RUN_EXIT@\n' > "$out"
chmod +x "$out"
exit 0
"#;
