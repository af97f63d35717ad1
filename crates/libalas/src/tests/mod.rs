//! Unit tests, one module per subsystem.
//!
//! Test programs are written as the JSON documents the toolchain actually
//! consumes and deserialized through serde, so every test also exercises
//! the document shape of the AST.

mod codegen;
mod interp;
mod opt;
mod value;

use crate::ast::Module;
use crate::program::Program;
use crate::value::Value;

/// Parses a module document from inline JSON.
pub(crate) fn module(document: serde_json::Value) -> Module {
    serde_json::from_value(document).expect("valid module document")
}

/// Links and validates a program from module documents; the first module
/// is the entry module.
pub(crate) fn program(documents: Vec<serde_json::Value>) -> Program {
    Program::from_modules(documents.into_iter().map(module).collect()).expect("valid program")
}

/// Runs `main` of a single-module program.
pub(crate) fn run_main(document: serde_json::Value) -> Value {
    program(vec![document]).run("main").expect("main runs")
}
