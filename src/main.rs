//! Wren interpreter entry point.
//!
//! - With no arguments, starts an interactive REPL against a fresh engine.
//! - `-h`/`--help` prints usage.
//! - `-v`/`--version` prints a build-target + version string.
//!
//! There is no file-execution mode: Wren programs are entered interactively
//! or driven through the library's [`wren::Engine`] API, not loaded from a
//! persisted bytecode format on disk.

use std::env;

use wren::{Engine, EngineConfig};

/// Human-facing runtime version string.
const VERSION: &str = "0.1.0";

fn usage() -> String {
    format!(
        r#"Wren v{0}

Usage:
    wren

With no arguments, starts an interactive REPL.

Options:
    -h, --help
        Show this help message and exit.
    -v, --version
        Show runtime version."#,
        VERSION
    )
}

fn main() {
    let args: Vec<String> = env::args().collect();

    if let Some(flag) = args.get(1) {
        if flag == "-h" || flag == "--help" {
            println!("{}", usage());
            return;
        }
        if flag == "-v" || flag == "--version" {
            println!("wren-build-{}-{}: v{}", env::consts::OS, env::consts::ARCH, VERSION);
            return;
        }
    }

    let mut engine = Engine::new(EngineConfig::default());
    engine.repl();
}
