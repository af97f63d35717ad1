//! ALaS Core Toolchain Library
//!
//! ALaS ("AI-Language-as-Syntax") is a minimal imperative language whose
//! source form is a structured AST document rather than surface text.
//! This library is the language's core toolchain: it loads module trees,
//! validates them, executes them directly, and lowers them to LLVM-style
//! IR for native compilation.
//!
//! # Overview
//!
//! Two independent execution engines agree on one AST:
//!
//! 1. **Validation**: [`validate`] rejects malformed trees with
//!    path-qualified violations before anything runs
//! 2. **Interpretation**: [`interp`] walks the tree over the runtime
//!    [`value`] model, dispatching built-ins through the [`stdlib`]
//!    registry
//! 3. **Compilation**: [`codegen`] lowers modules to an IR object model
//!    rendered as textual LLVM IR, and [`opt`] applies the selected pass
//!    pipeline over it
//!
//! The [`loader`] links multi-module programs through a pluggable module
//! source, and [`program::Program`] ties the stages together.
//!
//! # Usage
//!
//! ```ignore
//! use libalas::loader::FileSystemSource;
//! use libalas::opt::OptLevel;
//! use libalas::program::Program;
//!
//! let source = FileSystemSource::new(vec!["programs".into()]);
//! let program = Program::load(&source, "main")?;
//! let value = program.run("main")?;
//! let units = program.compile(OptLevel::O2)?;
//! ```
//!
//! # Error Handling
//!
//! Every failure is a value: subsystem error enums built on `thiserror`
//! carry `miette` diagnostics, and [`error::AlasError`] is the umbrella
//! the CLI binaries render. There is no exceptional control flow.

pub mod ast;
pub mod codegen;
pub mod error;
pub mod interp;
pub mod loader;
pub mod opt;
pub mod program;
pub mod stdlib;
pub mod validate;
pub mod value;

#[cfg(test)]
mod tests;

pub use error::{AlasError, RuntimeError};
pub use program::Program;
pub use value::Value;
