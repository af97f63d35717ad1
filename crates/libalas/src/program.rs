//! The program facade: load, validate, run, compile.
//!
//! [`Program`] ties the subsystems together for embedders and the CLI
//! binaries: a module source feeds the loader, every loaded module passes
//! validation, and the result can then be executed through the
//! interpreter or lowered and optimized through the IR backend. Loading
//! and validating happen exactly once; afterwards the program is
//! immutable shared state for any number of runs and compilations.

use indexmap::IndexMap;
use log::debug;

use crate::ast::Module;
use crate::codegen::{self, IrModule};
use crate::error::AlasError;
use crate::interp::Interpreter;
use crate::loader::{LoadedProgram, ModuleLoader, ModuleSource};
use crate::opt::{self, OptLevel};
use crate::stdlib::StdlibRegistry;
use crate::validate::Validator;
use crate::value::Value;

/// A loaded, validated ALaS program.
pub struct Program {
    loaded: LoadedProgram,
    registry: StdlibRegistry,
    entry: String,
}

impl Program {
    /// Loads `entry` and its transitive imports from `source`, then
    /// validates every module. Any load or validation failure aborts the
    /// whole program.
    pub fn load(source: &dyn ModuleSource, entry: &str) -> Result<Self, AlasError> {
        let mut loader = ModuleLoader::new(source);
        loader.load(entry)?;
        let loaded = loader.into_program();
        let entry = loaded
            .canonical(entry)
            .expect("entry module was just loaded")
            .to_string();
        Self::validated(loaded, entry)
    }

    /// Links modules handed over directly (no source involved); the first
    /// module is the entry module.
    pub fn from_modules(modules: Vec<Module>) -> Result<Self, AlasError> {
        let entry = modules
            .first()
            .map(|module| module.name.clone())
            .unwrap_or_default();
        Self::validated(LoadedProgram::from_modules(modules), entry)
    }

    fn validated(loaded: LoadedProgram, entry: String) -> Result<Self, AlasError> {
        let registry = StdlibRegistry::new();
        let validator = Validator::new(&registry);
        for module in loaded.modules() {
            validator.validate(module)?;
        }
        debug!("program ready: {} module(s), entry '{entry}'", loaded.len());
        Ok(Self {
            loaded,
            registry,
            entry,
        })
    }

    /// The canonical name of the entry module.
    pub fn entry_module(&self) -> &str {
        &self.entry
    }

    /// The linked module table.
    pub fn loaded(&self) -> &LoadedProgram {
        &self.loaded
    }

    /// The stdlib registry this program dispatches through.
    pub fn registry(&self) -> &StdlibRegistry {
        &self.registry
    }

    /// Runs a parameterless function of the entry module.
    pub fn run(&self, function: &str) -> Result<Value, AlasError> {
        self.run_with_args(function, Vec::new())
    }

    /// Runs a function of the entry module with arguments.
    pub fn run_with_args(&self, function: &str, args: Vec<Value>) -> Result<Value, AlasError> {
        let interpreter = Interpreter::new(&self.loaded, &self.registry);
        Ok(interpreter.run(&self.entry, function, args)?)
    }

    /// Lowers every module and applies the optimization level, returning
    /// one IR unit per module, keyed by canonical name.
    pub fn compile(&self, level: OptLevel) -> Result<IndexMap<String, IrModule>, AlasError> {
        let mut units = codegen::compile_program(&self.loaded, &self.registry)?;
        for unit in units.values_mut() {
            opt::optimize(unit, level)?;
        }
        Ok(units)
    }
}
