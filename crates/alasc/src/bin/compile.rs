//! `alas-compile`: lower a module document to LLVM IR text.
//!
//! ```text
//! alas-compile -file app.alas.json -o app.ll [-format ll|bc] [-O 0..3]
//! ```
//!
//! A module without imports compiles on its own with unmangled symbols.
//! A module with imports goes through the multi-module driver: every
//! imported document is loaded from the input file's directory, the
//! entry unit is written to the output path, and each sibling unit is
//! written next to it as `{output}.{module}.ll`. The `bc` format writes
//! the same `.ll` text and points the user at `llvm-as`.

use std::path::{Path, PathBuf};
use std::process::exit;
use std::str::FromStr;

use alasc::{fail, init_logging, module_name_from_path};
use libalas::ast::Module;
use libalas::codegen;
use libalas::loader::FileSystemSource;
use libalas::opt::{self, OptLevel};
use libalas::program::Program;
use libalas::stdlib::StdlibRegistry;
use libalas::validate::Validator;

struct Options {
    file: PathBuf,
    output: PathBuf,
    format: String,
    level: OptLevel,
}

fn parse_args() -> Options {
    let args: Vec<String> = std::env::args().collect();
    let mut file = None;
    let mut output = None;
    let mut format = "ll".to_string();
    let mut level = OptLevel::O0;

    let mut position = 1;
    while position < args.len() {
        match args[position].as_str() {
            "-file" => {
                position += 1;
                file = args.get(position).map(PathBuf::from);
            }
            "-o" => {
                position += 1;
                output = args.get(position).map(PathBuf::from);
            }
            "-format" => {
                position += 1;
                format = args.get(position).cloned().unwrap_or_default();
            }
            "-O" => {
                position += 1;
                let raw = args.get(position).cloned().unwrap_or_default();
                level = OptLevel::from_str(&format!("O{raw}")).unwrap_or_else(|_| usage(&args[0]));
            }
            _ => usage(&args[0]),
        }
        position += 1;
    }

    let (Some(file), Some(output)) = (file, output) else {
        usage(&args[0]);
    };
    if format != "ll" && format != "bc" {
        usage(&args[0]);
    }
    Options {
        file,
        output,
        format,
        level,
    }
}

fn usage(program: &str) -> ! {
    eprintln!("Usage: {program} -file <module.alas.json> -o <out.ll> [-format ll|bc] [-O 0|1|2|3]");
    exit(2);
}

fn write_unit(path: &Path, text: &str) {
    if let Err(error) = std::fs::write(path, text) {
        eprintln!("cannot write {}: {error}", path.display());
        exit(1);
    }
}

fn main() {
    init_logging();
    let options = parse_args();

    let content = match std::fs::read_to_string(&options.file) {
        Ok(content) => content,
        Err(error) => {
            eprintln!("cannot read {}: {error}", options.file.display());
            exit(1);
        }
    };
    let module: Module = match serde_json::from_str(&content) {
        Ok(module) => module,
        Err(error) => {
            eprintln!("{}: invalid module document: {error}", options.file.display());
            exit(1);
        }
    };

    if module.imports.is_empty() {
        let registry = StdlibRegistry::new();
        if let Err(error) = Validator::new(&registry).validate(&module) {
            fail(error);
        }
        let mut unit = match codegen::compile_module(&module, &registry) {
            Ok(unit) => unit,
            Err(error) => fail(error),
        };
        if let Err(error) = opt::optimize(&mut unit, options.level) {
            fail(error);
        }
        write_unit(&options.output, &unit.to_string());
    } else {
        let root = options
            .file
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_else(|| PathBuf::from("."));
        let entry = module_name_from_path(&options.file);
        let source = FileSystemSource::new(vec![root]);
        let program = match Program::load(&source, &entry) {
            Ok(program) => program,
            Err(error) => fail(error),
        };
        let units = match program.compile(options.level) {
            Ok(units) => units,
            Err(error) => fail(error),
        };
        for (name, unit) in &units {
            if name == program.entry_module() {
                write_unit(&options.output, &unit.to_string());
            } else {
                let sibling = options.output.with_extension(format!("{name}.ll"));
                write_unit(&sibling, &unit.to_string());
            }
        }
    }

    if options.format == "bc" {
        println!(
            "IR written as .ll text; run `llvm-as {}` to produce bitcode",
            options.output.display()
        );
    }
}
