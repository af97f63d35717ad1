//! Error types shared across the ALaS toolchain.
//!
//! Every subsystem owns its error enum (`ValidationError`, `LoadError`,
//! `CodegenError`, `OptimizerError` live next to their subsystems); this
//! module holds the two types that cut across them:
//!
//! - [`RuntimeError`] - dynamic failures raised while a program runs, by
//!   the interpreter, the value model, or a standard-library function
//! - [`AlasError`] - the umbrella error returned by the program facade and
//!   consumed by the CLI binaries
//!
//! All errors are plain values: the first failure unwinds through `Result`
//! returns to the caller. There is no exceptional control flow and no
//! recovery mid-execution.

use miette::Diagnostic;

use crate::codegen::CodegenError;
use crate::loader::LoadError;
use crate::opt::OptimizerError;
use crate::validate::ValidationError;

/// A dynamic failure raised during program execution.
///
/// The first runtime error terminates the top-level run immediately;
/// environments are released on the way out by normal scope teardown.
#[derive(Debug, Clone, PartialEq, thiserror::Error, Diagnostic)]
pub enum RuntimeError {
    #[error("undefined variable '{name}'")]
    #[diagnostic(
        code(alas::runtime::undefined_variable),
        help("the variable must be a parameter or assigned before this use")
    )]
    UndefinedVariable { name: String },

    #[error("unknown function '{name}'")]
    #[diagnostic(code(alas::runtime::unknown_function))]
    UnknownFunction { name: String },

    #[error("unknown module '{name}'")]
    #[diagnostic(
        code(alas::runtime::unknown_module),
        help("the module must appear in the import list of some loaded module")
    )]
    UnknownModule { name: String },

    #[error("function '{name}' is not exported by module '{module}'")]
    #[diagnostic(code(alas::runtime::not_exported))]
    NotExported { module: String, name: String },

    #[error("function '{name}' expects {expected} argument(s), got {given}")]
    #[diagnostic(code(alas::runtime::arity_mismatch))]
    ArityMismatch {
        name: String,
        expected: usize,
        given: usize,
    },

    #[error("division by zero")]
    #[diagnostic(code(alas::runtime::division_by_zero))]
    DivisionByZero,

    #[error("modulo by zero")]
    #[diagnostic(code(alas::runtime::modulo_by_zero))]
    ModuloByZero,

    #[error("array index {index} out of bounds for length {len}")]
    #[diagnostic(code(alas::runtime::index_out_of_bounds))]
    IndexOutOfBounds { index: i64, len: usize },

    #[error("missing map key '{key}'")]
    #[diagnostic(code(alas::runtime::missing_key))]
    MissingKey { key: String },

    #[error("value of type {kind} is not indexable")]
    #[diagnostic(code(alas::runtime::not_indexable))]
    NotIndexable { kind: &'static str },

    #[error("array index must be an int, got {kind}")]
    #[diagnostic(code(alas::runtime::bad_index))]
    BadIndex { kind: &'static str },

    #[error("operator '{op}' is not supported between {left} and {right}")]
    #[diagnostic(code(alas::runtime::bad_operator))]
    BadOperator {
        op: String,
        left: &'static str,
        right: &'static str,
    },

    #[error("unary operator '{op}' is not supported on {operand}")]
    #[diagnostic(code(alas::runtime::bad_unary_operator))]
    BadUnaryOperator { op: String, operand: &'static str },

    #[error("unsupported literal type")]
    #[diagnostic(code(alas::runtime::unsupported_literal))]
    UnsupportedLiteral,

    #[error("{function}: invalid argument: {message}")]
    #[diagnostic(code(alas::runtime::invalid_argument))]
    InvalidArgument { function: String, message: String },

    #[error("io error: {message}")]
    #[diagnostic(code(alas::runtime::io))]
    Io { message: String },
}

/// Umbrella error for the whole toolchain.
///
/// The program facade and the CLI binaries operate at this level; the
/// subsystem errors convert into it with `?`.
#[derive(Debug, thiserror::Error, Diagnostic)]
pub enum AlasError {
    #[error(transparent)]
    #[diagnostic(transparent)]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Load(#[from] LoadError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Runtime(#[from] RuntimeError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Codegen(#[from] CodegenError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Optimizer(#[from] OptimizerError),
}
