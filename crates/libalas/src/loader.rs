//! Module resolution and program linking.
//!
//! A program is a set of modules reachable from an entry module through its
//! import lists. The loader resolves module names to parsed [`Module`]
//! trees through a pluggable [`ModuleSource`], loads imports depth-first,
//! skips modules it has already seen, and rejects cycles. The result is a
//! [`LoadedProgram`]: the canonical module table plus the alias table that
//! `module_call` expressions resolve against at run and compile time.
//!
//! # Aliases
//!
//! The canonical name of a module is the `name` carried *inside* its
//! document, which may differ from the import name that reached it. The
//! loader maps every import spelling to the canonical name. A name with
//! the `std.` prefix additionally maps its suffix, so an importer of
//! `std.math_helpers` may call through either `std.math_helpers` or
//! `math_helpers`.
//!
//! # Filesystem layout
//!
//! [`FileSystemSource`] probes `{root}/{name}.alas.json` over an ordered
//! list of search roots. For `std.`-prefixed names the prefix is stripped
//! and an implicit stdlib root is prepended to the probe order.

use std::path::{Path, PathBuf};

use indexmap::IndexMap;
use log::debug;
use miette::Diagnostic;

use crate::ast::Module;

/// File extension of ALaS module documents.
pub const MODULE_EXTENSION: &str = "alas.json";

/// Prefix that routes an import through the standard-library search root.
pub const STD_PREFIX: &str = "std.";

/// Failure to assemble a program from module documents.
#[derive(Debug, thiserror::Error, Diagnostic)]
pub enum LoadError {
    #[error("module '{name}' not found (searched: {searched})")]
    #[diagnostic(
        code(alas::load::not_found),
        help("module documents are named '{name}.alas.json' under one of the search roots")
    )]
    NotFound { name: String, searched: String },

    #[error("module '{name}' failed to parse: {message}")]
    #[diagnostic(code(alas::load::parse))]
    Parse { name: String, message: String },

    #[error("cannot read '{path}': {message}")]
    #[diagnostic(code(alas::load::io))]
    Io { path: String, message: String },

    #[error("import cycle: {chain}")]
    #[diagnostic(code(alas::load::cycle), help("module imports must form a DAG"))]
    ImportCycle { chain: String },
}

/// Resolves a module name to a parsed module tree.
///
/// The loader, the validator's cycle check and the tests all consume this
/// seam, so programs can come from disk, memory or anywhere else.
pub trait ModuleSource {
    fn resolve(&self, name: &str) -> Result<Module, LoadError>;
}

/// A [`ModuleSource`] backed by an ordered list of directories.
#[derive(Debug, Clone)]
pub struct FileSystemSource {
    roots: Vec<PathBuf>,
    stdlib_root: PathBuf,
}

impl FileSystemSource {
    /// Creates a source over `roots`, probed in order. The stdlib root
    /// defaults to `stdlib` under the first root (or the current directory
    /// when no roots are given).
    pub fn new(roots: Vec<PathBuf>) -> Self {
        let stdlib_root = roots
            .first()
            .map(|root| root.join("stdlib"))
            .unwrap_or_else(|| PathBuf::from("stdlib"));
        Self { roots, stdlib_root }
    }

    /// Overrides the implicit standard-library search root.
    pub fn with_stdlib_root(mut self, stdlib_root: impl Into<PathBuf>) -> Self {
        self.stdlib_root = stdlib_root.into();
        self
    }

    /// The probe list for `name`: for `std.`-prefixed names the prefix is
    /// stripped and the stdlib root goes first.
    fn candidates(&self, name: &str) -> Vec<PathBuf> {
        let mut candidates = Vec::new();
        let (file_name, stdlib_first) = match name.strip_prefix(STD_PREFIX) {
            Some(stripped) => (stripped, true),
            None => (name, false),
        };
        if stdlib_first {
            candidates.push(self.stdlib_root.join(format!("{file_name}.{MODULE_EXTENSION}")));
        }
        for root in &self.roots {
            candidates.push(root.join(format!("{file_name}.{MODULE_EXTENSION}")));
        }
        candidates
    }

    fn read_module(name: &str, path: &Path) -> Result<Module, LoadError> {
        let content = std::fs::read_to_string(path).map_err(|error| LoadError::Io {
            path: path.display().to_string(),
            message: error.to_string(),
        })?;
        serde_json::from_str(&content).map_err(|error| LoadError::Parse {
            name: name.to_string(),
            message: error.to_string(),
        })
    }
}

impl ModuleSource for FileSystemSource {
    fn resolve(&self, name: &str) -> Result<Module, LoadError> {
        let candidates = self.candidates(name);
        for candidate in &candidates {
            if candidate.is_file() {
                debug!("resolving module '{name}' from {}", candidate.display());
                return Self::read_module(name, candidate);
            }
        }
        Err(LoadError::NotFound {
            name: name.to_string(),
            searched: candidates
                .iter()
                .map(|candidate| candidate.display().to_string())
                .collect::<Vec<_>>()
                .join(", "),
        })
    }
}

/// An in-memory [`ModuleSource`], used by tests and embedders that build
/// module trees programmatically.
#[derive(Debug, Default, Clone)]
pub struct InMemorySource {
    modules: IndexMap<String, Module>,
}

impl InMemorySource {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `module` under its own canonical name.
    pub fn insert(&mut self, module: Module) {
        self.modules.insert(module.name.clone(), module);
    }
}

impl ModuleSource for InMemorySource {
    fn resolve(&self, name: &str) -> Result<Module, LoadError> {
        // The std. suffix rule applies to in-memory lookups as well.
        let stripped = name.strip_prefix(STD_PREFIX).unwrap_or(name);
        self.modules
            .get(name)
            .or_else(|| self.modules.get(stripped))
            .cloned()
            .ok_or_else(|| LoadError::NotFound {
                name: name.to_string(),
                searched: "<memory>".to_string(),
            })
    }
}

/// A fully loaded program: canonical module table plus import aliases.
///
/// Populated once at load time and read-only afterwards; the interpreter
/// and the multi-module code generator both borrow it.
#[derive(Debug, Default, Clone)]
pub struct LoadedProgram {
    modules: IndexMap<String, Module>,
    aliases: IndexMap<String, String>,
}

impl LoadedProgram {
    /// Builds a program directly from module values, linking each module
    /// under its canonical name. Used when no source is involved.
    pub fn from_modules(modules: Vec<Module>) -> Self {
        let mut program = Self::default();
        for module in modules {
            program.insert(module);
        }
        program
    }

    fn insert(&mut self, module: Module) {
        let canonical = module.name.clone();
        self.register_alias(&canonical, &canonical);
        self.modules.insert(canonical, module);
    }

    /// Maps `alias` to `canonical`; `std.`-prefixed aliases also map their
    /// suffix so callers may write either spelling.
    fn register_alias(&mut self, alias: &str, canonical: &str) {
        self.aliases.insert(alias.to_string(), canonical.to_string());
        if let Some(stripped) = alias.strip_prefix(STD_PREFIX) {
            self.aliases.insert(stripped.to_string(), canonical.to_string());
        }
    }

    /// Resolves an import alias to the canonical module name.
    pub fn canonical(&self, alias: &str) -> Option<&str> {
        self.aliases.get(alias).map(String::as_str)
    }

    /// Looks up a module by canonical name.
    pub fn module(&self, canonical: &str) -> Option<&Module> {
        self.modules.get(canonical)
    }

    /// Resolves an alias and returns the module it points at.
    pub fn module_by_alias(&self, alias: &str) -> Option<&Module> {
        self.canonical(alias).and_then(|canonical| self.module(canonical))
    }

    /// All loaded modules in load order.
    pub fn modules(&self) -> impl Iterator<Item = &Module> {
        self.modules.values()
    }

    /// Number of loaded modules.
    pub fn len(&self) -> usize {
        self.modules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.modules.is_empty()
    }
}

/// Recursive module loader over a [`ModuleSource`].
pub struct ModuleLoader<'s> {
    source: &'s dyn ModuleSource,
    program: LoadedProgram,
    loading: Vec<String>,
}

impl<'s> ModuleLoader<'s> {
    pub fn new(source: &'s dyn ModuleSource) -> Self {
        Self {
            source,
            program: LoadedProgram::default(),
            loading: Vec::new(),
        }
    }

    /// Loads `name` and, recursively, everything it imports. Modules
    /// already loaded are skipped; a name re-entered while still being
    /// loaded is a cycle.
    pub fn load(&mut self, name: &str) -> Result<(), LoadError> {
        if let Some(canonical) = self.program.canonical(name) {
            let canonical = canonical.to_string();
            debug!("module '{name}' already loaded as '{canonical}'");
            return Ok(());
        }
        if self.loading.iter().any(|pending| pending == name) {
            let mut chain = self.loading.clone();
            chain.push(name.to_string());
            return Err(LoadError::ImportCycle {
                chain: chain.join(" -> "),
            });
        }

        self.loading.push(name.to_string());
        let module = self.source.resolve(name)?;
        let canonical = module.name.clone();
        debug!("loaded module '{name}' (canonical '{canonical}'), {} import(s)", module.imports.len());

        // Imports load before the module itself registers, so a cycle is
        // caught on the `loading` stack rather than masked by the
        // already-loaded fast path.
        for import in &module.imports {
            self.load(import)?;
        }
        self.loading.pop();
        self.program.register_alias(name, &canonical);
        self.program.insert(module);
        Ok(())
    }

    /// Finishes loading and hands out the linked program.
    pub fn into_program(self) -> LoadedProgram {
        self.program
    }
}
