//! Shared plumbing for the ALaS command-line binaries.
//!
//! The binaries are deliberately thin: they parse arguments, read files,
//! call into `libalas`, and translate errors into exit codes and rendered
//! diagnostics. Everything of substance lives in the library.

use std::path::Path;
use std::process::exit;

use log::LevelFilter;
use simplelog::{ColorChoice, Config, TermLogger, TerminalMode};

/// File suffix of ALaS module documents.
pub const MODULE_SUFFIX: &str = ".alas.json";

/// Configures terminal logging for a binary. `ALAS_LOG=debug` turns on
/// the library's debug traces.
pub fn init_logging() {
    let level = match std::env::var("ALAS_LOG").as_deref() {
        Ok("trace") => LevelFilter::Trace,
        Ok("debug") => LevelFilter::Debug,
        Ok("info") => LevelFilter::Info,
        _ => LevelFilter::Error,
    };
    // A second init (tests spawning binaries in-process) is harmless.
    let _ = TermLogger::init(level, Config::default(), TerminalMode::Mixed, ColorChoice::Auto);
}

/// The module name implied by a document path:
/// `examples/app.alas.json` names the module `app`.
pub fn module_name_from_path(path: &Path) -> String {
    let file_name = path
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_default();
    file_name
        .strip_suffix(MODULE_SUFFIX)
        .unwrap_or(&file_name)
        .to_string()
}

/// Renders a diagnostic to stderr and exits non-zero.
pub fn fail(error: impl miette::Diagnostic + Send + Sync + 'static) -> ! {
    eprintln!("{:?}", miette::Report::new(error));
    exit(1);
}

/// Reads a file, or stdin when the path is `-`.
pub fn read_input(path: &str) -> std::io::Result<String> {
    if path == "-" {
        let mut content = String::new();
        std::io::Read::read_to_string(&mut std::io::stdin(), &mut content)?;
        Ok(content)
    } else {
        std::fs::read_to_string(path)
    }
}
