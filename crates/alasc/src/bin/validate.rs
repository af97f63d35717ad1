//! `alas-validate`: structural and semantic validation of one module
//! document.
//!
//! Reads a module from a file argument (or stdin with `-`), runs the
//! validator, prints `Validation successful!` on success, and renders
//! the violation list to stderr with exit code 1 otherwise.

use std::process::exit;

use alasc::{fail, init_logging, read_input};
use libalas::ast::Module;
use libalas::stdlib::StdlibRegistry;
use libalas::validate::Validator;

fn main() {
    init_logging();

    let args: Vec<String> = std::env::args().collect();
    let input = match args.get(1).map(String::as_str) {
        Some("-h") | Some("--help") => {
            eprintln!("Usage: {} [file.alas.json | -]", args[0]);
            exit(2);
        }
        Some(path) => path.to_string(),
        None => "-".to_string(),
    };

    let content = match read_input(&input) {
        Ok(content) => content,
        Err(error) => {
            eprintln!("cannot read {input}: {error}");
            exit(1);
        }
    };

    let module: Module = match serde_json::from_str(&content) {
        Ok(module) => module,
        Err(error) => {
            eprintln!("{input}: invalid module document: {error}");
            exit(1);
        }
    };

    let registry = StdlibRegistry::new();
    match Validator::new(&registry).validate(&module) {
        Ok(_) => {
            println!("Validation successful!");
        }
        Err(error) => fail(error),
    }
}
