//! `alas-run`: execute a function of a module document.
//!
//! ```text
//! alas-run <module.alas.json> [function]
//! ```
//!
//! Imports resolve from the input file's directory (with `stdlib/` under
//! it as the standard-library root). The function defaults to `main`;
//! its result is printed unless it is void.

use std::path::{Path, PathBuf};
use std::process::exit;

use alasc::{fail, init_logging, module_name_from_path};
use libalas::loader::FileSystemSource;
use libalas::program::Program;
use libalas::value::Value;

fn main() {
    init_logging();

    let args: Vec<String> = std::env::args().collect();
    let Some(file) = args.get(1).map(PathBuf::from) else {
        eprintln!("Usage: {} <module.alas.json> [function]", args[0]);
        exit(2);
    };
    let function = args.get(2).map(String::as_str).unwrap_or("main");

    let root = file
        .parent()
        .map(Path::to_path_buf)
        .unwrap_or_else(|| PathBuf::from("."));
    let entry = module_name_from_path(&file);
    let source = FileSystemSource::new(vec![root]);

    let program = match Program::load(&source, &entry) {
        Ok(program) => program,
        Err(error) => fail(error),
    };
    match program.run(function) {
        Ok(Value::Void) => {}
        Ok(value) => println!("{value}"),
        Err(error) => fail(error),
    }
}
