//! The standard-library registry: built-in functions callable from ALaS
//! programs.
//!
//! The registry is the single source of truth for built-ins across both
//! execution engines. The interpreter dispatches `builtin` expressions and
//! `std.*` module calls through [`StdlibRegistry::call`]; the code
//! generator reads the same entries to declare matching external symbols
//! (`math.sqrt` becomes `@alas_math_sqrt`) with types derived from each
//! entry's [`NativeType`] signature. Any divergence between interpreted
//! and compiled behavior of a built-in is a registry-level bug.
//!
//! The registry is an explicit context object: callers construct it with
//! [`StdlibRegistry::new`] and pass it to the validator, the interpreter
//! and the code generator. Nothing here is a process-wide global.
//!
//! # Namespaces
//!
//! - `math` - numeric functions ([`math`])
//! - `string` - string functions ([`string`])
//! - `collections` - array and map functions ([`collections`])
//! - `type` - dynamic type inspection ([`type_mod`])
//! - `io` - console and file access ([`io`])
//! - `async` - task interface surface, stubbed synchronous ([`async_mod`])

use indexmap::IndexMap;

use crate::error::RuntimeError;
use crate::value::{ArrayRef, MapRef, Value};

pub mod async_mod;
pub mod collections;
pub mod io;
pub mod math;
pub mod string;
pub mod type_mod;

/// A native implementation of a built-in function.
pub type NativeFn = fn(&[Value]) -> Result<Value, RuntimeError>;

/// The type vocabulary of built-in signatures, as seen by the code
/// generator. `Str` and `Any` both lower to an opaque pointer; `Any`
/// additionally tells the interpreter the argument is unconstrained.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NativeType {
    Int,
    Float,
    Bool,
    Str,
    Any,
    Void,
}

/// One registry entry: the qualified name, the typed signature and the
/// native function the interpreter dispatches to.
#[derive(Debug, Clone)]
pub struct BuiltinFunction {
    /// Qualified `ns.fn` name, e.g. `math.sqrt`.
    pub name: &'static str,
    /// Parameter types; the arity is this slice's length.
    pub params: &'static [NativeType],
    /// Return type.
    pub ret: NativeType,
    /// The interpreter-side implementation.
    pub native: NativeFn,
}

impl BuiltinFunction {
    /// Number of arguments the built-in expects.
    pub fn arity(&self) -> usize {
        self.params.len()
    }

    /// The external symbol the code generator declares for this entry:
    /// `math.sqrt` becomes `alas_math_sqrt`. At link time a C-ABI shim
    /// exposes the registry's functions under these names.
    pub fn extern_symbol(&self) -> String {
        format!("alas_{}", self.name.replace('.', "_"))
    }
}

/// Table of built-in functions, keyed by qualified name.
#[derive(Debug, Clone)]
pub struct StdlibRegistry {
    table: IndexMap<&'static str, BuiltinFunction>,
}

impl Default for StdlibRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl StdlibRegistry {
    /// Builds the full registry with every namespace populated.
    pub fn new() -> Self {
        let mut registry = Self { table: IndexMap::new() };
        math::register(&mut registry);
        string::register(&mut registry);
        collections::register(&mut registry);
        type_mod::register(&mut registry);
        io::register(&mut registry);
        async_mod::register(&mut registry);
        registry
    }

    pub(crate) fn add(
        &mut self,
        name: &'static str,
        params: &'static [NativeType],
        ret: NativeType,
        native: NativeFn,
    ) {
        debug_assert!(!self.table.contains_key(name), "duplicate builtin {name}");
        self.table.insert(
            name,
            BuiltinFunction {
                name,
                params,
                ret,
                native,
            },
        );
    }

    /// Looks up an entry by qualified name.
    pub fn get(&self, name: &str) -> Option<&BuiltinFunction> {
        self.table.get(name)
    }

    /// All entries, in registration order.
    pub fn entries(&self) -> impl Iterator<Item = &BuiltinFunction> {
        self.table.values()
    }

    /// Dispatches a call: unknown names and arity mismatches fail before
    /// the native function runs.
    pub fn call(&self, name: &str, args: &[Value]) -> Result<Value, RuntimeError> {
        let builtin = self.get(name).ok_or_else(|| RuntimeError::UnknownFunction {
            name: name.to_string(),
        })?;
        if args.len() != builtin.arity() {
            return Err(RuntimeError::ArityMismatch {
                name: name.to_string(),
                expected: builtin.arity(),
                given: args.len(),
            });
        }
        (builtin.native)(args)
    }
}

// Argument accessors shared by the namespace modules. Each produces an
// `InvalidArgument` error naming the built-in when the value has the
// wrong dynamic type.

pub(crate) fn expect_string<'a>(function: &str, args: &'a [Value], index: usize) -> Result<&'a str, RuntimeError> {
    match &args[index] {
        Value::String(value) => Ok(value),
        other => Err(invalid(function, index, "string", other)),
    }
}

pub(crate) fn expect_int(function: &str, args: &[Value], index: usize) -> Result<i64, RuntimeError> {
    match &args[index] {
        Value::Int(value) => Ok(*value),
        other => Err(invalid(function, index, "int", other)),
    }
}

pub(crate) fn expect_number(function: &str, args: &[Value], index: usize) -> Result<f64, RuntimeError> {
    match &args[index] {
        Value::Int(value) => Ok(*value as f64),
        Value::Float(value) => Ok(*value),
        other => Err(invalid(function, index, "number", other)),
    }
}

pub(crate) fn expect_array<'a>(function: &str, args: &'a [Value], index: usize) -> Result<&'a ArrayRef, RuntimeError> {
    match &args[index] {
        Value::Array(value) => Ok(value),
        other => Err(invalid(function, index, "array", other)),
    }
}

pub(crate) fn expect_map<'a>(function: &str, args: &'a [Value], index: usize) -> Result<&'a MapRef, RuntimeError> {
    match &args[index] {
        Value::Map(value) => Ok(value),
        other => Err(invalid(function, index, "map", other)),
    }
}

fn invalid(function: &str, index: usize, expected: &str, found: &Value) -> RuntimeError {
    RuntimeError::InvalidArgument {
        function: function.to_string(),
        message: format!("argument {index} must be a {expected}, got {}", found.type_name()),
    }
}
