//! The tree-walking interpreter.
//!
//! Evaluation is a recursive descent over the immutable AST. The
//! interpreter borrows a [`LoadedProgram`] (module table, alias table)
//! and a [`StdlibRegistry`]; both are populated at load time and
//! read-only here. Per call, the only state is an [`Environment`] arena
//! that is dropped when the call finishes, releasing the call's container
//! references on every exit path, error included.
//!
//! # Control flow
//!
//! Statement execution produces a [`Flow`]: either fall through to the
//! next statement or unwind with a return value. Errors short-circuit
//! through `Result` and terminate the top-level [`Interpreter::run`]
//! immediately; there is no catch construct in the language.
//!
//! # Dispatch
//!
//! - `call` resolves in the current module first, then across the program
//! - `module_call` tries the stdlib registry when the alias has the
//!   `std.` prefix, then the alias table; the target function must be
//!   exported by the canonical module
//! - `builtin` dispatches straight through the registry
//!
//! Operands evaluate left to right; both operands of a binary operator
//! are evaluated before it applies.

mod env;

pub use env::{Environment, FrameId};

use log::trace;

use crate::ast::{Expression, Function, MapEntry, Module, Statement};
use crate::error::RuntimeError;
use crate::loader::{LoadedProgram, STD_PREFIX};
use crate::stdlib::StdlibRegistry;
use crate::value::Value;

/// Outcome of executing a statement or block.
enum Flow {
    /// Keep executing the enclosing block.
    Continue,
    /// Unwind to the enclosing call with this value.
    Return(Value),
}

/// Executes functions of a loaded program.
pub struct Interpreter<'p> {
    program: &'p LoadedProgram,
    registry: &'p StdlibRegistry,
}

impl<'p> Interpreter<'p> {
    pub fn new(program: &'p LoadedProgram, registry: &'p StdlibRegistry) -> Self {
        Self { program, registry }
    }

    /// Runs `function` of the module known under `module` (an alias or a
    /// canonical name) with `args`. Returns the function's value, or
    /// `Void` for a fall-through void return.
    pub fn run(&self, module: &str, function: &str, args: Vec<Value>) -> Result<Value, RuntimeError> {
        let module = self
            .program
            .module_by_alias(module)
            .ok_or_else(|| RuntimeError::UnknownModule {
                name: module.to_string(),
            })?;
        let function = module
            .function(function)
            .ok_or_else(|| RuntimeError::UnknownFunction {
                name: function.to_string(),
            })?;
        self.call_function(module, function, args)
    }

    /// Calls a function with a fresh root environment. The arity check
    /// happens before any parameter binds, so a mismatched call never
    /// starts executing the body.
    fn call_function(&self, module: &Module, function: &Function, args: Vec<Value>) -> Result<Value, RuntimeError> {
        if args.len() != function.params.len() {
            return Err(RuntimeError::ArityMismatch {
                name: function.name.clone(),
                expected: function.params.len(),
                given: args.len(),
            });
        }
        trace!("calling {}.{}", module.name, function.name);

        let mut environment = Environment::new();
        for (parameter, argument) in function.params.iter().zip(args) {
            environment.assign(FrameId::ROOT, &parameter.name, argument);
        }

        match self.exec_block(module, &function.body, &mut environment, FrameId::ROOT)? {
            Flow::Return(value) => Ok(value),
            Flow::Continue => Ok(Value::Void),
        }
    }

    /// Executes a block, stopping at the first `return` or error.
    fn exec_block(
        &self,
        module: &Module,
        block: &[Statement],
        environment: &mut Environment,
        frame: FrameId,
    ) -> Result<Flow, RuntimeError> {
        for statement in block {
            if let Flow::Return(value) = self.exec_statement(module, statement, environment, frame)? {
                return Ok(Flow::Return(value));
            }
        }
        Ok(Flow::Continue)
    }

    fn exec_statement(
        &self,
        module: &Module,
        statement: &Statement,
        environment: &mut Environment,
        frame: FrameId,
    ) -> Result<Flow, RuntimeError> {
        match statement {
            Statement::Assign { target, value } => {
                let value = self.eval(module, value, environment, frame)?;
                // Rebinding drops the previous value, releasing its
                // container reference if it held one.
                environment.assign(frame, target, value);
                Ok(Flow::Continue)
            }
            Statement::If { cond, then, otherwise } => {
                let cond = self.eval(module, cond, environment, frame)?;
                // Blocks do not open scopes: assignments inside bind in
                // the enclosing function frame.
                if cond.is_truthy() {
                    self.exec_block(module, then, environment, frame)
                } else {
                    self.exec_block(module, otherwise, environment, frame)
                }
            }
            Statement::While { cond, body } | Statement::For { cond, body } => {
                loop {
                    let check = self.eval(module, cond, environment, frame)?;
                    if !check.is_truthy() {
                        break;
                    }
                    if let Flow::Return(value) = self.exec_block(module, body, environment, frame)? {
                        return Ok(Flow::Return(value));
                    }
                }
                Ok(Flow::Continue)
            }
            Statement::Return { value } => {
                let value = match value {
                    Some(value) => self.eval(module, value, environment, frame)?,
                    None => Value::Void,
                };
                Ok(Flow::Return(value))
            }
            Statement::Expr { value } => {
                self.eval(module, value, environment, frame)?;
                Ok(Flow::Continue)
            }
        }
    }

    fn eval(
        &self,
        module: &Module,
        expression: &Expression,
        environment: &mut Environment,
        frame: FrameId,
    ) -> Result<Value, RuntimeError> {
        match expression {
            Expression::Literal { value } => Ok(Value::from_literal(value)),
            Expression::Variable { name } => environment
                .get(frame, name)
                .cloned()
                .ok_or_else(|| RuntimeError::UndefinedVariable { name: name.clone() }),
            Expression::Binary { op, left, right } => {
                let left = self.eval(module, left, environment, frame)?;
                let right = self.eval(module, right, environment, frame)?;
                Value::binary(*op, &left, &right)
            }
            Expression::Unary { op, operand } => {
                let operand = self.eval(module, operand, environment, frame)?;
                Value::unary(*op, &operand)
            }
            Expression::Call { name, args } => {
                let args = self.eval_args(module, args, environment, frame)?;
                let (target_module, function) = self.resolve_call(module, name)?;
                self.call_function(target_module, function, args)
            }
            Expression::ModuleCall { module: alias, name, args } => {
                let args = self.eval_args(module, args, environment, frame)?;
                self.module_call(alias, name, args)
            }
            Expression::Builtin { name, args } => {
                let args = self.eval_args(module, args, environment, frame)?;
                self.registry.call(name, &args)
            }
            Expression::ArrayLit { elements } => {
                let elements = self.eval_args(module, elements, environment, frame)?;
                Ok(Value::array(elements))
            }
            Expression::MapLit { pairs } => {
                let mut map = indexmap::IndexMap::new();
                for MapEntry { key, value } in pairs {
                    // Non-string keys stringify with the printer's rule.
                    let key = self.eval(module, key, environment, frame)?.to_string();
                    let value = self.eval(module, value, environment, frame)?;
                    map.insert(key, value);
                }
                Ok(Value::map(map))
            }
            Expression::Index { object, index } => {
                let object = self.eval(module, object, environment, frame)?;
                let index = self.eval(module, index, environment, frame)?;
                self.index_value(&object, &index)
            }
            Expression::Field { object, field_name } => {
                let object = self.eval(module, object, environment, frame)?;
                self.index_value(&object, &Value::String(field_name.clone()))
            }
        }
    }

    fn eval_args(
        &self,
        module: &Module,
        expressions: &[Expression],
        environment: &mut Environment,
        frame: FrameId,
    ) -> Result<Vec<Value>, RuntimeError> {
        expressions
            .iter()
            .map(|expression| self.eval(module, expression, environment, frame))
            .collect()
    }

    /// Resolves a bare `call` name: the current module wins, then the
    /// first match anywhere in the program in load order.
    fn resolve_call<'m>(&'m self, current: &'m Module, name: &str) -> Result<(&'m Module, &'m Function), RuntimeError> {
        if let Some(function) = current.function(name) {
            return Ok((current, function));
        }
        for module in self.program.modules() {
            if let Some(function) = module.function(name) {
                return Ok((module, function));
            }
        }
        Err(RuntimeError::UnknownFunction {
            name: name.to_string(),
        })
    }

    /// Resolves a `module_call`: stdlib first for `std.` aliases, then the
    /// alias table. The target must be exported by its module.
    fn module_call(&self, alias: &str, name: &str, args: Vec<Value>) -> Result<Value, RuntimeError> {
        if let Some(namespace) = alias.strip_prefix(STD_PREFIX) {
            let qualified = format!("{namespace}.{name}");
            if self.registry.get(&qualified).is_some() {
                return self.registry.call(&qualified, &args);
            }
        }

        let target = self
            .program
            .module_by_alias(alias)
            .ok_or_else(|| RuntimeError::UnknownModule {
                name: alias.to_string(),
            })?;
        if !target.exports_function(name) {
            return Err(RuntimeError::NotExported {
                module: target.name.clone(),
                name: name.to_string(),
            });
        }
        let function = target
            .function(name)
            .ok_or_else(|| RuntimeError::UnknownFunction {
                name: name.to_string(),
            })?;
        self.call_function(target, function, args)
    }

    /// Shared element access for `index` and `field` expressions.
    fn index_value(&self, object: &Value, index: &Value) -> Result<Value, RuntimeError> {
        match object {
            Value::Array(array) => match index {
                Value::Int(position) => Value::index_array(array, *position),
                other => Err(RuntimeError::BadIndex {
                    kind: other.type_name(),
                }),
            },
            // Map keys stringify on access with the same rule used at
            // construction, so any value can address an entry.
            Value::Map(map) => Value::index_map(map, &index.to_string()),
            other => Err(RuntimeError::NotIndexable {
                kind: other.type_name(),
            }),
        }
    }
}
