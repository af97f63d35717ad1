//! Structural and semantic validation of ALaS module trees.
//!
//! The validator consumes a parsed [`Module`] and reports either success or
//! the full list of violations found, each carrying a path into the tree
//! (`functions[2].body[4].cond.left`). Checks run in a fixed order:
//!
//! 1. **Shape rules** - non-empty module name, unique function names,
//!    distinct imports, exports naming existing functions, assign targets
//!    that are identifiers
//! 2. **Control-flow rules** - every path through a non-void function ends
//!    in a `return`, decided by recursive terminator analysis of `if`
//!    bodies (loops never guarantee termination of a path)
//! 3. **Scope rules** - every `variable` reference names a parameter or the
//!    target of a prior `assign`; the analysis is conservative, so an
//!    assignment anywhere earlier in a syntactic enclosing block counts
//! 4. **Builtin rules** - `builtin` names exist in the stdlib registry
//! 5. **Cycle detection** - with a resolver supplied, the transitive import
//!    closure must not revisit the starting module
//!
//! Schema presence and the closed operator sets are enforced one layer
//! below, by the typed AST itself: a document with a missing field, an
//! unknown discriminator or an out-of-set operator fails deserialization.
//!
//! Validation is total and gates everything downstream: a module that does
//! not validate is neither interpreted nor lowered.

use indexmap::IndexSet;
use miette::Diagnostic;

use crate::ast::{Expression, MapEntry, Module, NodePath, Statement};
use crate::loader::ModuleSource;
use crate::stdlib::StdlibRegistry;

/// One validation finding, anchored to a node path.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error, Diagnostic)]
#[error("{kind} at {path}")]
pub struct Violation {
    /// Path of the offending node inside the module document.
    pub path: String,
    /// What went wrong.
    pub kind: ViolationKind,
}

impl Violation {
    fn new(path: &NodePath, kind: ViolationKind) -> Self {
        Self {
            path: path.to_string(),
            kind,
        }
    }
}

/// The closed set of violation categories the validator can report.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ViolationKind {
    #[error("module name is empty")]
    EmptyModuleName,
    #[error("function name is empty")]
    EmptyFunctionName,
    #[error("duplicate function '{name}'")]
    DuplicateFunction { name: String },
    #[error("duplicate import '{name}'")]
    DuplicateImport { name: String },
    #[error("export '{name}' does not name a function of this module")]
    UnknownExport { name: String },
    #[error("assign target is not an identifier: '{target}'")]
    InvalidAssignTarget { target: String },
    #[error("function '{name}' declares return type '{return_type}' but not every path returns")]
    MissingReturn { name: String, return_type: String },
    #[error("variable '{name}' is used before any assignment")]
    UndefinedVariable { name: String },
    #[error("builtin '{name}' is not registered")]
    UnknownBuiltin { name: String },
    #[error("module imports itself")]
    SelfImport,
    #[error("import cycle: {chain}")]
    ImportCycle { chain: String },
    #[error("import '{name}' cannot be resolved")]
    UnresolvedImport { name: String },
}

/// Validation failure: the collected violations, most specific path first.
#[derive(Debug, Clone, thiserror::Error, Diagnostic)]
#[error("validation of module '{module}' failed with {} violation(s)", .violations.len())]
#[diagnostic(
    code(alas::validate::failed),
    help("fix the listed violations; the module is rejected before execution and compilation")
)]
pub struct ValidationError {
    /// The module that was being validated.
    pub module: String,
    /// Every violation found, in document order.
    #[related]
    pub violations: Vec<Violation>,
}

/// Successful validation. The warning list exists so that re-validating an
/// already-validated tree observably yields success with no warnings.
#[derive(Debug, Clone, Default)]
pub struct ValidationReport {
    pub warnings: Vec<Violation>,
}

/// Validator over a single module tree.
///
/// Holds a reference to the stdlib registry so `builtin` names can be
/// checked against the table both engines dispatch through.
pub struct Validator<'r> {
    registry: &'r StdlibRegistry,
}

impl<'r> Validator<'r> {
    pub fn new(registry: &'r StdlibRegistry) -> Self {
        Self { registry }
    }

    /// Runs all intra-module checks.
    pub fn validate(&self, module: &Module) -> Result<ValidationReport, ValidationError> {
        let mut violations = Vec::new();
        self.check_shape(module, &mut violations);
        self.check_functions(module, &mut violations);
        if violations.is_empty() {
            Ok(ValidationReport::default())
        } else {
            Err(ValidationError {
                module: module.name.clone(),
                violations,
            })
        }
    }

    /// Runs all intra-module checks plus import-cycle detection through the
    /// supplied resolver.
    pub fn validate_with_resolver(
        &self,
        module: &Module,
        resolver: &dyn ModuleSource,
    ) -> Result<ValidationReport, ValidationError> {
        let mut violations = Vec::new();
        self.check_shape(module, &mut violations);
        self.check_functions(module, &mut violations);
        self.check_cycles(module, resolver, &mut violations);
        if violations.is_empty() {
            Ok(ValidationReport::default())
        } else {
            Err(ValidationError {
                module: module.name.clone(),
                violations,
            })
        }
    }

    fn check_shape(&self, module: &Module, violations: &mut Vec<Violation>) {
        let root = NodePath::root();
        if module.name.is_empty() {
            violations.push(Violation::new(&root.field("name"), ViolationKind::EmptyModuleName));
        }

        let mut seen_imports = IndexSet::new();
        for (position, import) in module.imports.iter().enumerate() {
            if import == &module.name {
                violations.push(Violation::new(
                    &root.index("imports", position),
                    ViolationKind::SelfImport,
                ));
            }
            if !seen_imports.insert(import.clone()) {
                violations.push(Violation::new(
                    &root.index("imports", position),
                    ViolationKind::DuplicateImport { name: import.clone() },
                ));
            }
        }

        let mut seen_functions = IndexSet::new();
        for (position, function) in module.functions.iter().enumerate() {
            if function.name.is_empty() {
                violations.push(Violation::new(
                    &root.index("functions", position).field("name"),
                    ViolationKind::EmptyFunctionName,
                ));
            } else if !seen_functions.insert(function.name.clone()) {
                violations.push(Violation::new(
                    &root.index("functions", position),
                    ViolationKind::DuplicateFunction {
                        name: function.name.clone(),
                    },
                ));
            }
        }

        for (position, export) in module.exports.iter().enumerate() {
            if module.function(export).is_none() {
                violations.push(Violation::new(
                    &root.index("exports", position),
                    ViolationKind::UnknownExport { name: export.clone() },
                ));
            }
        }
    }

    fn check_functions(&self, module: &Module, violations: &mut Vec<Violation>) {
        for (position, function) in module.functions.iter().enumerate() {
            let path = NodePath::root().index("functions", position);

            if !function.returns_void() && !returns_on_all_paths(&function.body) {
                violations.push(Violation::new(
                    &path,
                    ViolationKind::MissingReturn {
                        name: function.name.clone(),
                        return_type: function.return_type.clone(),
                    },
                ));
            }

            let mut defined: IndexSet<String> = function
                .params
                .iter()
                .map(|parameter| parameter.name.clone())
                .collect();
            self.check_block(&function.body, &path, "body", &mut defined, violations);
        }
    }

    /// Walks a statement block, threading the set of names assigned so far.
    /// Branch bodies feed the same set: any prior assignment in an
    /// enclosing block counts, which is the conservative reading.
    fn check_block(
        &self,
        block: &[Statement],
        parent: &NodePath,
        list: &str,
        defined: &mut IndexSet<String>,
        violations: &mut Vec<Violation>,
    ) {
        for (position, statement) in block.iter().enumerate() {
            let path = parent.index(list, position);
            match statement {
                Statement::Assign { target, value } => {
                    self.check_expression(value, &path.field("value"), defined, violations);
                    if !is_identifier(target) {
                        violations.push(Violation::new(
                            &path.field("target"),
                            ViolationKind::InvalidAssignTarget {
                                target: target.clone(),
                            },
                        ));
                    } else {
                        defined.insert(target.clone());
                    }
                }
                Statement::If { cond, then, otherwise } => {
                    self.check_expression(cond, &path.field("cond"), defined, violations);
                    self.check_block(then, &path, "then", defined, violations);
                    self.check_block(otherwise, &path, "else", defined, violations);
                }
                Statement::While { cond, body } | Statement::For { cond, body } => {
                    self.check_expression(cond, &path.field("cond"), defined, violations);
                    self.check_block(body, &path, "body", defined, violations);
                }
                Statement::Return { value } => {
                    if let Some(value) = value {
                        self.check_expression(value, &path.field("value"), defined, violations);
                    }
                }
                Statement::Expr { value } => {
                    self.check_expression(value, &path.field("value"), defined, violations);
                }
            }
        }
    }

    fn check_expression(
        &self,
        expression: &Expression,
        path: &NodePath,
        defined: &IndexSet<String>,
        violations: &mut Vec<Violation>,
    ) {
        match expression {
            Expression::Literal { .. } => {}
            Expression::Variable { name } => {
                if !defined.contains(name) {
                    violations.push(Violation::new(
                        path,
                        ViolationKind::UndefinedVariable { name: name.clone() },
                    ));
                }
            }
            Expression::Binary { left, right, .. } => {
                self.check_expression(left, &path.field("left"), defined, violations);
                self.check_expression(right, &path.field("right"), defined, violations);
            }
            Expression::Unary { operand, .. } => {
                self.check_expression(operand, &path.field("operand"), defined, violations);
            }
            Expression::Call { args, .. } | Expression::ModuleCall { args, .. } => {
                for (position, argument) in args.iter().enumerate() {
                    self.check_expression(argument, &path.index("args", position), defined, violations);
                }
            }
            Expression::Builtin { name, args } => {
                if self.registry.get(name).is_none() {
                    violations.push(Violation::new(
                        path,
                        ViolationKind::UnknownBuiltin { name: name.clone() },
                    ));
                }
                for (position, argument) in args.iter().enumerate() {
                    self.check_expression(argument, &path.index("args", position), defined, violations);
                }
            }
            Expression::ArrayLit { elements } => {
                for (position, element) in elements.iter().enumerate() {
                    self.check_expression(element, &path.index("elements", position), defined, violations);
                }
            }
            Expression::MapLit { pairs } => {
                for (position, MapEntry { key, value }) in pairs.iter().enumerate() {
                    self.check_expression(key, &path.index("pairs", position).field("key"), defined, violations);
                    self.check_expression(value, &path.index("pairs", position).field("value"), defined, violations);
                }
            }
            Expression::Index { object, index } => {
                self.check_expression(object, &path.field("object"), defined, violations);
                self.check_expression(index, &path.field("index"), defined, violations);
            }
            Expression::Field { object, .. } => {
                self.check_expression(object, &path.field("object"), defined, violations);
            }
        }
    }

    /// Walks the transitive import closure. Revisiting the starting module
    /// is a cycle; anything unresolvable is reported and skipped.
    fn check_cycles(&self, module: &Module, resolver: &dyn ModuleSource, violations: &mut Vec<Violation>) {
        let root = NodePath::root();
        let mut visited: IndexSet<String> = IndexSet::new();
        let mut pending: Vec<(String, Vec<String>)> = module
            .imports
            .iter()
            .filter(|import| *import != &module.name)
            .map(|import| (import.clone(), vec![module.name.clone()]))
            .collect();

        while let Some((name, trail)) = pending.pop() {
            if name == module.name {
                let mut cycle = trail;
                cycle.push(name);
                violations.push(Violation::new(
                    &root.field("imports"),
                    ViolationKind::ImportCycle {
                        chain: cycle.join(" -> "),
                    },
                ));
                return;
            }
            if !visited.insert(name.clone()) {
                continue;
            }
            let imported = match resolver.resolve(&name) {
                Ok(imported) => imported,
                Err(_) => {
                    violations.push(Violation::new(
                        &root.field("imports"),
                        ViolationKind::UnresolvedImport { name },
                    ));
                    continue;
                }
            };
            let mut trail = trail;
            trail.push(name);
            for import in &imported.imports {
                pending.push((import.clone(), trail.clone()));
            }
        }
    }
}

/// True when every control path through `block` ends in a `return`.
///
/// An `if` with both branches terminating terminates; loops never count
/// because a false condition skips the body entirely.
fn returns_on_all_paths(block: &[Statement]) -> bool {
    for statement in block {
        match statement {
            Statement::Return { .. } => return true,
            Statement::If { then, otherwise, .. } => {
                if !otherwise.is_empty()
                    && returns_on_all_paths(then)
                    && returns_on_all_paths(otherwise)
                {
                    return true;
                }
            }
            _ => {}
        }
    }
    false
}

/// Identifier shape accepted for assign targets: a letter or underscore
/// followed by letters, digits or underscores.
fn is_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(first) if first.is_ascii_alphabetic() || first == '_' => {}
        _ => return false,
    }
    chars.all(|ch| ch.is_ascii_alphanumeric() || ch == '_')
}
