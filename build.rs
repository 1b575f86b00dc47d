// build.rs

use clap::{Arg, ArgAction, Command};
use clap_mangen::Man;
use std::env;
use std::fs;
use std::path::PathBuf;

/// Common argument: alternative formula file
fn formula_arg() -> Arg {
    Arg::new("formula")
        .short('f')
        .long("formula")
        .value_name("FILE")
        .help("Formula file to use instead of the built-in SFML formula")
}

fn flag(name: &'static str, help: &'static str) -> Arg {
    Arg::new(name).long(name).action(ArgAction::SetTrue).help(help)
}

fn build_cli() -> Command {
    Command::new("sfml-kitchen")
        .version(env!("CARGO_PKG_VERSION"))
        .author("SFML Kitchen Contributors")
        .about("Build, install and smoke-test the SFML multimedia library")
        .arg(
            Arg::new("verbose")
                .short('v')
                .long("verbose")
                .action(ArgAction::SetTrue)
                .help("Enable debug logging (RUST_LOG takes precedence)"),
        )
        .subcommand(
            Command::new("info")
                .about("Show formula metadata")
                .arg(formula_arg()),
        )
        .subcommand(
            Command::new("deps")
                .about("Show (and optionally check) the declared dependencies")
                .arg(formula_arg())
                .arg(
                    Arg::new("platform")
                        .short('p')
                        .long("platform")
                        .value_parser(["linux", "macos", "other"])
                        .help("Platform to declare for (default: host)"),
                )
                .arg(flag("check", "Probe the host for each dependency")),
        )
        .subcommand(
            Command::new("prep")
                .about("Prune vendored libraries from an extracted source tree")
                .arg(Arg::new("source").required(true).help("Source tree root"))
                .arg(formula_arg())
                .arg(flag("dry-run", "Only show what would be removed")),
        )
        .subcommand(
            Command::new("cook")
                .about("Build and install from source, then run the smoke test")
                .arg(Arg::new("source").short('s').long("source").help("Extracted source tree"))
                .arg(
                    Arg::new("archive")
                        .short('a')
                        .long("archive")
                        .help("Source archive to extract into a fresh directory"),
                )
                .arg(Arg::new("prefix").short('p').long("prefix").help("Install prefix"))
                .arg(
                    Arg::new("build_dir")
                        .short('b')
                        .long("build-dir")
                        .help("Build output directory (default: a temporary directory)"),
                )
                .arg(Arg::new("config").short('c').long("config").help("Kitchen config file"))
                .arg(formula_arg())
                .arg(Arg::new("jobs").short('j').long("jobs").help("Number of parallel build jobs"))
                .arg(Arg::new("timeout").long("timeout").help("Per-command timeout in seconds"))
                .arg(flag("skip-deps-check", "Skip the host dependency check"))
                .arg(flag("no-verify", "Skip the post-install smoke test"))
                .arg(flag("keep-workdir", "Keep temporary build and extraction directories"))
                .arg(flag("dry-run", "Show what would run without running it"))
                .arg(Arg::new("report").long("report").help("Write a JSON run report to this file")),
        )
        .subcommand(
            Command::new("verify")
                .about("Run the smoke test against an existing installation")
                .arg(
                    Arg::new("prefix")
                        .short('p')
                        .long("prefix")
                        .required(true)
                        .help("Install prefix to test"),
                )
                .arg(formula_arg())
                .arg(Arg::new("cxx").long("cxx").help("C++ compiler (default: $CXX or c++)")),
        )
        .subcommand(
            Command::new("completions")
                .about("Generate shell completion scripts")
                .arg(
                    Arg::new("shell")
                        .required(true)
                        .value_parser(["bash", "zsh", "fish", "powershell", "elvish"])
                        .help("Shell type"),
                ),
        )
}

fn main() {
    println!("cargo:rerun-if-changed=build.rs");

    // Create man directory - use CARGO_MANIFEST_DIR which is always set by cargo
    let manifest_dir = match env::var("CARGO_MANIFEST_DIR") {
        Ok(dir) => PathBuf::from(dir),
        Err(e) => {
            println!("cargo:warning=CARGO_MANIFEST_DIR not set: {}", e);
            return;
        }
    };
    let man_dir = manifest_dir.join("man");

    if let Err(e) = fs::create_dir_all(&man_dir) {
        println!("cargo:warning=Failed to create man directory: {}", e);
        return;
    }

    let man = Man::new(build_cli());
    let mut buffer = Vec::new();

    if let Err(e) = man.render(&mut buffer) {
        println!("cargo:warning=Failed to render man page: {}", e);
        return;
    }

    let man_path = man_dir.join("sfml-kitchen.1");
    if let Err(e) = fs::write(&man_path, buffer) {
        println!("cargo:warning=Failed to write man page: {}", e);
    }
}
