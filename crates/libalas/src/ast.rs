//! Abstract Syntax Tree definitions for the ALaS language.
//!
//! ALaS has no surface grammar: a program *is* its AST, delivered as a
//! structured document of nested tagged objects. This module defines the
//! canonical in-memory model of that document. Every node family is a Rust
//! sum type whose serde representation is internally tagged, so the
//! discriminator field of the document maps one-to-one onto the enum
//! variant and an unknown discriminator fails at deserialization time,
//! before validation even starts.
//!
//! # Node Families
//!
//! - [`Module`] - The top-level unit: imports, exports, functions, types
//! - [`Function`] - A named parameter list, return type and statement body
//! - [`Statement`] - Imperative statements (`assign`, `if`, `while`, ...)
//! - [`Expression`] - Value-producing expressions (`literal`, `binary`, ...)
//! - [`TypeDefinition`] - Named struct/enum shapes, informational only
//!
//! # Immutability
//!
//! AST nodes are constructed once by a loader and never mutated afterwards.
//! The interpreter and the code generator both borrow the tree; neither
//! writes to it.

use serde::{Deserialize, Serialize};
use strum_macros::{Display, EnumDiscriminants};

/// Path of a node inside a module tree, used for diagnostics.
///
/// Rendered in the `functions[2].body[4].cond.left` style so an error can
/// point at the exact node of the source document. Segments are pushed and
/// popped as the validator and the code generator descend the tree.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NodePath {
    segments: Vec<String>,
}

impl NodePath {
    /// Creates an empty path pointing at the module root.
    pub fn root() -> Self {
        Self::default()
    }

    /// Descends into a named field, e.g. `cond` or `left`.
    pub fn field(&self, name: &str) -> Self {
        let mut segments = self.segments.clone();
        segments.push(name.to_string());
        Self { segments }
    }

    /// Descends into an element of a named list, e.g. `body[4]`.
    pub fn index(&self, name: &str, index: usize) -> Self {
        let mut segments = self.segments.clone();
        segments.push(format!("{name}[{index}]"));
        Self { segments }
    }
}

impl std::fmt::Display for NodePath {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.segments.is_empty() {
            return f.write_str("<module>");
        }
        f.write_str(&self.segments.join("."))
    }
}

/// The top-level compilation unit of an ALaS program.
///
/// A module carries a non-empty name (unique within a program), the ordered
/// list of module names it imports, the ordered list of function names it
/// exports, its functions, and its informational type definitions.
///
/// The serde shape accepts the on-disk document directly; the `type`
/// discriminator carried by module documents is tolerated and ignored,
/// since a module is always the document root.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Module {
    /// The module name. Import aliases resolve to this canonical name.
    pub name: String,
    /// Names of modules this module imports, in declaration order.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub imports: Vec<String>,
    /// Names of functions this module exposes to other modules.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub exports: Vec<String>,
    /// The functions of the module, in declaration order.
    #[serde(default)]
    pub functions: Vec<Function>,
    /// Informational type definitions. Runtime values carry their own tags.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub types: Vec<TypeDefinition>,
}

impl Module {
    /// Looks up a function of this module by name.
    pub fn function(&self, name: &str) -> Option<&Function> {
        self.functions.iter().find(|function| function.name == name)
    }

    /// Returns true when `name` is listed in the module's exports.
    pub fn exports_function(&self, name: &str) -> bool {
        self.exports.iter().any(|export| export == name)
    }
}

/// A function definition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Function {
    /// The function name, unique within its module.
    pub name: String,
    /// The ordered parameter list.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub params: Vec<Parameter>,
    /// The declared return type name. Defaults to `void`.
    #[serde(default = "default_void", rename = "returns")]
    pub return_type: String,
    /// The statement body. May be empty.
    #[serde(default)]
    pub body: Vec<Statement>,
}

fn default_void() -> String {
    "void".to_string()
}

impl Function {
    /// Returns true when the declared return type is `void`.
    pub fn returns_void(&self) -> bool {
        self.return_type == "void"
    }
}

/// A single function parameter: a name plus a declared type name.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Parameter {
    /// The parameter name, bound before the body runs.
    pub name: String,
    /// The declared type name (`int`, `float`, `bool`, `string`, ...).
    #[serde(rename = "type")]
    pub type_name: String,
}

/// An imperative statement.
///
/// `while` and `for` are distinct variants of the document format but share
/// their semantics: both are condition-top loops.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, EnumDiscriminants)]
#[strum_discriminants(name(StatementKind), derive(Display))]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Statement {
    /// Binds or rebinds a variable in the enclosing function scope.
    Assign {
        /// The variable name being bound.
        target: String,
        /// The expression whose result is bound.
        value: Expression,
    },
    /// Two-way branch. The `else` block may be empty.
    If {
        cond: Expression,
        then: Vec<Statement>,
        #[serde(default, rename = "else", skip_serializing_if = "Vec::is_empty")]
        otherwise: Vec<Statement>,
    },
    /// Condition-top loop.
    While { cond: Expression, body: Vec<Statement> },
    /// Alias of [`Statement::While`] in the document format.
    For { cond: Expression, body: Vec<Statement> },
    /// Returns from the enclosing function, optionally with a value.
    Return {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        value: Option<Expression>,
    },
    /// Evaluates an expression for its side effects, discarding the result.
    Expr { value: Expression },
}

/// A value-producing expression.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, EnumDiscriminants)]
#[strum_discriminants(name(ExpressionKind), derive(Display))]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Expression {
    /// An embedded primitive: number, string, bool or null.
    Literal { value: LiteralValue },
    /// Lookup of a name in the current environment chain.
    Variable { name: String },
    /// Binary operator application. Operands evaluate left to right.
    Binary {
        op: BinaryOp,
        left: Box<Expression>,
        right: Box<Expression>,
    },
    /// Unary operator application.
    ///
    /// Older documents spell the operand field `right`; both spellings are
    /// accepted on input and canonicalized to `operand` in memory.
    Unary {
        op: UnaryOp,
        #[serde(alias = "right")]
        operand: Box<Expression>,
    },
    /// Call of a function of the current program by bare name.
    Call {
        name: String,
        #[serde(default)]
        args: Vec<Expression>,
    },
    /// Cross-module call. `module` is the import alias as written.
    ModuleCall {
        module: String,
        name: String,
        #[serde(default)]
        args: Vec<Expression>,
    },
    /// Standard-library call. `name` is of the `ns.fn` form.
    Builtin {
        name: String,
        #[serde(default)]
        args: Vec<Expression>,
    },
    /// Array constructor.
    ArrayLit {
        #[serde(default)]
        elements: Vec<Expression>,
    },
    /// Map constructor. Keys are expressions; non-string keys stringify.
    MapLit {
        #[serde(default)]
        pairs: Vec<MapEntry>,
    },
    /// Container element access by computed index or key.
    Index {
        object: Box<Expression>,
        index: Box<Expression>,
    },
    /// Named member access; sugar for [`Expression::Index`] with a string key.
    Field {
        object: Box<Expression>,
        field_name: String,
    },
}

/// One `key: value` pair of a map literal.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MapEntry {
    pub key: Expression,
    pub value: Expression,
}

/// A primitive embedded in a `literal` node.
///
/// Numbers are held as `f64` regardless of how the document spelled them;
/// the runtime coercion rule (integral value means `Int`) decides the tag,
/// so `42`, `42.0` and `4.2e1` all evaluate to the same integer value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum LiteralValue {
    Null,
    Bool(bool),
    Number(f64),
    String(String),
}

/// The closed set of binary operators.
///
/// Modeling the set as an enum makes an out-of-set operator string a
/// deserialization failure rather than a validation finding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display)]
pub enum BinaryOp {
    #[serde(rename = "+")]
    #[strum(serialize = "+")]
    Add,
    #[serde(rename = "-")]
    #[strum(serialize = "-")]
    Sub,
    #[serde(rename = "*")]
    #[strum(serialize = "*")]
    Mul,
    #[serde(rename = "/")]
    #[strum(serialize = "/")]
    Div,
    #[serde(rename = "%")]
    #[strum(serialize = "%")]
    Mod,
    #[serde(rename = "==")]
    #[strum(serialize = "==")]
    Eq,
    #[serde(rename = "!=")]
    #[strum(serialize = "!=")]
    Ne,
    #[serde(rename = "<")]
    #[strum(serialize = "<")]
    Lt,
    #[serde(rename = "<=")]
    #[strum(serialize = "<=")]
    Le,
    #[serde(rename = ">")]
    #[strum(serialize = ">")]
    Gt,
    #[serde(rename = ">=")]
    #[strum(serialize = ">=")]
    Ge,
    #[serde(rename = "&&")]
    #[strum(serialize = "&&")]
    And,
    #[serde(rename = "||")]
    #[strum(serialize = "||")]
    Or,
}

impl BinaryOp {
    /// Returns true for `==`, `!=`, `<`, `<=`, `>`, `>=`.
    pub fn is_comparison(&self) -> bool {
        matches!(
            self,
            BinaryOp::Eq | BinaryOp::Ne | BinaryOp::Lt | BinaryOp::Le | BinaryOp::Gt | BinaryOp::Ge
        )
    }

    /// Returns true for `&&` and `||`.
    pub fn is_logical(&self) -> bool {
        matches!(self, BinaryOp::And | BinaryOp::Or)
    }
}

/// The closed set of unary operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display)]
pub enum UnaryOp {
    /// Boolean negation of the operand's truthiness.
    #[serde(rename = "!")]
    #[strum(serialize = "!")]
    Not,
    /// Arithmetic negation; preserves the Int/Float tag.
    #[serde(rename = "-")]
    #[strum(serialize = "-")]
    Neg,
}

/// A named type definition.
///
/// Type definitions are informational: the validator reads them and richer
/// backends may, but runtime values carry their own dynamic tags and enum
/// values are represented as plain strings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum TypeDefinition {
    Struct {
        name: String,
        #[serde(default)]
        fields: Vec<StructField>,
    },
    Enum {
        name: String,
        #[serde(default)]
        values: Vec<String>,
    },
}

impl TypeDefinition {
    /// The defined type's name.
    pub fn name(&self) -> &str {
        match self {
            TypeDefinition::Struct { name, .. } | TypeDefinition::Enum { name, .. } => name,
        }
    }
}

/// One field of a struct type definition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StructField {
    pub name: String,
    #[serde(rename = "type")]
    pub type_name: String,
}
