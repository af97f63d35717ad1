//! Lowering of validated module trees to LLVM-style IR.
//!
//! The code generator is the static counterpart of the interpreter: it
//! lowers the same AST, under the same operator and coercion rules, into
//! an [`IrModule`] whose textual rendering is LLVM IR. Declared `int`,
//! `float`, `bool` and `void` map to `i64`, `double`, `i1` and `void`;
//! strings, arrays and maps are opaque `ptr` values whose operations are
//! calls to external runtime symbols (see [`intrinsics`]), and built-ins
//! become externs derived from the stdlib registry entry, keeping the
//! registry the single source of truth for both engines.
//!
//! Unlike the interpreter, every expression must have a type at lowering
//! time. The inference rules: a numeric literal is `i64` iff its value is
//! integral, binary operators promote like the runtime does, a variable
//! takes its declared parameter type or the type of its first assignment
//! (reassignments must agree), and calls take the callee's declared
//! return type.
//!
//! # Modes
//!
//! [`compile_module`] lowers one module with unmangled symbols.
//! [`compile_program`] is the multi-module driver: every exported
//! function is emitted as `{module}__{name}`, a `module_call` lowers to a
//! call of the canonical target's mangled symbol (declared external in
//! the calling unit), and each module becomes an independent IR unit.

mod func;
mod intrinsics;
pub mod ir;

pub use ir::{IrModule, IrType};

use indexmap::IndexMap;
use log::debug;
use miette::Diagnostic;

use crate::ast::Module;
use crate::loader::LoadedProgram;
use crate::stdlib::{NativeType, StdlibRegistry};

use func::FunctionLowering;

/// A lowering failure, anchored to the node path being compiled.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error, Diagnostic)]
pub enum CodegenError {
    #[error("unresolved variable '{name}' at {path}")]
    #[diagnostic(code(alas::codegen::unresolved_variable))]
    UnresolvedVariable { name: String, path: String },

    #[error("unknown function '{name}' at {path}")]
    #[diagnostic(code(alas::codegen::unknown_function))]
    UnknownFunction { name: String, path: String },

    #[error("unknown module '{name}' at {path}")]
    #[diagnostic(
        code(alas::codegen::unknown_module),
        help("cross-module calls compile through the multi-module driver, which links every imported module")
    )]
    UnknownModule { name: String, path: String },

    #[error("function '{name}' is not exported by module '{module}' (at {path})")]
    #[diagnostic(code(alas::codegen::not_exported))]
    NotExported {
        module: String,
        name: String,
        path: String,
    },

    #[error("function '{name}' expects {expected} argument(s), got {given} at {path}")]
    #[diagnostic(code(alas::codegen::arity_mismatch))]
    ArityMismatch {
        name: String,
        expected: usize,
        given: usize,
        path: String,
    },

    #[error("type mismatch at {path}: expected {expected}, found {found}")]
    #[diagnostic(code(alas::codegen::type_mismatch))]
    TypeMismatch {
        expected: String,
        found: String,
        path: String,
    },

    #[error("literal has no static type at {path}")]
    #[diagnostic(code(alas::codegen::unsupported_literal))]
    UnsupportedLiteral { path: String },
}

/// Shared lowering configuration: the module being compiled, the linked
/// program (multi-module mode only) and the stdlib registry.
pub(crate) struct CodegenContext<'a> {
    pub module: &'a Module,
    pub program: Option<&'a LoadedProgram>,
    pub registry: &'a StdlibRegistry,
    /// When set, exported functions use `{module}__{name}` symbols.
    pub mangle_exports: bool,
}

impl CodegenContext<'_> {
    /// The symbol a function of `module` is emitted under.
    pub fn symbol_for(&self, module: &Module, function_name: &str) -> String {
        if self.mangle_exports && module.exports_function(function_name) {
            mangled_symbol(&module.name, function_name)
        } else {
            function_name.to_string()
        }
    }
}

/// The `{module}__{name}` convention for cross-module symbols.
pub fn mangled_symbol(module: &str, function: &str) -> String {
    format!("{module}__{function}")
}

/// Maps a registry signature type onto the IR type vocabulary.
pub(crate) fn native_ir_type(native: NativeType) -> IrType {
    match native {
        NativeType::Int => IrType::I64,
        NativeType::Float => IrType::F64,
        NativeType::Bool => IrType::I1,
        NativeType::Str | NativeType::Any => IrType::Ptr,
        NativeType::Void => IrType::Void,
    }
}

/// Maps a declared ALaS type name onto the IR type vocabulary. Unknown
/// names are user-defined types, which are runtime values: `ptr`.
pub(crate) fn declared_ir_type(name: &str) -> IrType {
    match name {
        "int" => IrType::I64,
        "float" => IrType::F64,
        "bool" => IrType::I1,
        "void" => IrType::Void,
        _ => IrType::Ptr,
    }
}

/// Lowers a single module with unmangled symbols. `module_call`
/// expressions may only target the stdlib in this mode; linking several
/// modules goes through [`compile_program`].
pub fn compile_module(module: &Module, registry: &StdlibRegistry) -> Result<IrModule, CodegenError> {
    let context = CodegenContext {
        module,
        program: None,
        registry,
        mangle_exports: false,
    };
    lower_unit(&context)
}

/// The multi-module driver: lowers every module of a linked program into
/// its own IR unit, wiring cross-module calls through mangled externals.
/// Returns the units keyed by canonical module name.
pub fn compile_program(
    program: &LoadedProgram,
    registry: &StdlibRegistry,
) -> Result<IndexMap<String, IrModule>, CodegenError> {
    let mut units = IndexMap::new();
    for module in program.modules() {
        let context = CodegenContext {
            module,
            program: Some(program),
            registry,
            mangle_exports: true,
        };
        units.insert(module.name.clone(), lower_unit(&context)?);
    }
    Ok(units)
}

fn lower_unit(context: &CodegenContext<'_>) -> Result<IrModule, CodegenError> {
    debug!(
        "lowering module '{}' ({} function(s))",
        context.module.name,
        context.module.functions.len()
    );
    let mut unit = IrModule::new(context.module.name.clone());
    for function in &context.module.functions {
        let lowered = FunctionLowering::new(context, function, &mut unit).lower()?;
        unit.functions.push(lowered);
    }
    Ok(unit)
}
