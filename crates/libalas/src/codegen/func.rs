//! Per-function lowering: statements and expressions to basic blocks.
//!
//! Every distinct local gets one stack slot (`alloca`) in the entry
//! block, parameters included; reads and writes go through `load` and
//! `store`, and the optimizer's promotion pass later turns the slots into
//! SSA registers. Control flow lowers to the fixed label families
//! `then`/`else`/`cont` for branches and `while.cond`/`while.body`/
//! `while.end` for loops, suffixed with a counter past the first use.
//!
//! Lowering runs in two passes over a body: a scan that assigns every
//! variable its type (declared parameter type, or the type of its first
//! assignment, with reassignments required to agree), then the emission
//! pass proper. Values of dynamic shape (strings, containers, anything
//! read back out of a container) travel as boxed `ptr` runtime values and
//! are unboxed on demand when they meet a typed context.

use indexmap::IndexMap;

use crate::ast::{BinaryOp, Expression, Function, LiteralValue, MapEntry, NodePath, Statement, UnaryOp};
use crate::value::Value;

use super::intrinsics;
use super::ir::{
    BasicBlock, FcmpCond, IcmpCond, Instruction, IrBinOp, IrFunction, IrGlobal, IrModule, IrType, Operand, Terminator,
};
use super::{declared_ir_type, native_ir_type, CodegenContext, CodegenError};

pub(super) struct FunctionLowering<'c, 'u> {
    context: &'c CodegenContext<'c>,
    function: &'c Function,
    unit: &'u mut IrModule,
    blocks: Vec<BasicBlock>,
    current: usize,
    temp_counter: usize,
    branch_counter: usize,
    loop_counter: usize,
    /// Variable name to inferred IR type, parameters first.
    locals: IndexMap<String, IrType>,
}

impl<'c, 'u> FunctionLowering<'c, 'u> {
    pub(super) fn new(context: &'c CodegenContext<'c>, function: &'c Function, unit: &'u mut IrModule) -> Self {
        Self {
            context,
            function,
            unit,
            blocks: vec![BasicBlock::new("entry")],
            current: 0,
            temp_counter: 0,
            branch_counter: 0,
            loop_counter: 0,
            locals: IndexMap::new(),
        }
    }

    pub(super) fn lower(mut self) -> Result<IrFunction, CodegenError> {
        let path = self.function_path();
        for parameter in &self.function.params.clone() {
            self.locals
                .insert(parameter.name.clone(), declared_ir_type(&parameter.type_name));
        }
        let body = self.function.body.clone();
        self.scan_block(&body, &path)?;

        // One slot per distinct name, parameters stored on entry.
        for (name, ty) in self.locals.clone() {
            self.emit(Instruction::Alloca {
                dest: self.slot(&name),
                ty,
            });
        }
        for parameter in self.function.params.clone() {
            let ty = self.locals[&parameter.name];
            self.emit(Instruction::Store {
                ty,
                value: Operand::temp(parameter.name.as_str()),
                ptr: self.slot(&parameter.name),
            });
        }

        let body = self.function.body.clone();
        self.lower_block(&body, &path)?;

        let ret = self.return_type();
        if self.blocks[self.current].terminator.is_none() {
            // A void function may fall off the end; any other fall-off is
            // unreachable because validation required returns on every
            // path.
            let terminator = if ret == IrType::Void {
                Terminator::Ret {
                    ty: IrType::Void,
                    value: None,
                }
            } else {
                Terminator::Unreachable
            };
            self.blocks[self.current].terminator = Some(terminator);
        }

        Ok(IrFunction {
            name: self.context.symbol_for(self.context.module, &self.function.name),
            params: self
                .function
                .params
                .iter()
                .map(|parameter| (parameter.name.clone(), declared_ir_type(&parameter.type_name)))
                .collect(),
            ret,
            blocks: self.blocks,
        })
    }

    fn function_path(&self) -> NodePath {
        let position = self
            .context
            .module
            .functions
            .iter()
            .position(|function| function.name == self.function.name)
            .unwrap_or(0);
        NodePath::root().index("functions", position)
    }

    fn return_type(&self) -> IrType {
        declared_ir_type(&self.function.return_type)
    }

    // ---- type scan -------------------------------------------------

    /// Assigns a type to every local ahead of emission. A variable's type
    /// is fixed by its first assignment; later assignments must agree.
    fn scan_block(&mut self, block: &[Statement], parent: &NodePath) -> Result<(), CodegenError> {
        for (position, statement) in block.iter().enumerate() {
            let path = parent.index("body", position);
            match statement {
                Statement::Assign { target, value } => {
                    let ty = self.infer(value, &path.field("value"))?;
                    match self.locals.get(target) {
                        None => {
                            self.locals.insert(target.clone(), ty);
                        }
                        Some(existing) if *existing == ty => {}
                        Some(existing) => {
                            return Err(CodegenError::TypeMismatch {
                                expected: existing.to_string(),
                                found: ty.to_string(),
                                path: path.field("target").to_string(),
                            })
                        }
                    }
                }
                Statement::If { then, otherwise, .. } => {
                    self.scan_block(then, &path)?;
                    self.scan_block(otherwise, &path)?;
                }
                Statement::While { body, .. } | Statement::For { body, .. } => {
                    self.scan_block(body, &path)?;
                }
                Statement::Return { .. } | Statement::Expr { .. } => {}
            }
        }
        Ok(())
    }

    /// The static type of an expression under the current local table.
    fn infer(&self, expression: &Expression, path: &NodePath) -> Result<IrType, CodegenError> {
        match expression {
            Expression::Literal { value } => match value {
                LiteralValue::Number(number) => Ok(match Value::from_number(*number) {
                    Value::Int(_) => IrType::I64,
                    _ => IrType::F64,
                }),
                LiteralValue::Bool(_) => Ok(IrType::I1),
                LiteralValue::String(_) => Ok(IrType::Ptr),
                LiteralValue::Null => Err(CodegenError::UnsupportedLiteral {
                    path: path.to_string(),
                }),
            },
            Expression::Variable { name } => {
                self.locals
                    .get(name)
                    .copied()
                    .ok_or_else(|| CodegenError::UnresolvedVariable {
                        name: name.clone(),
                        path: path.to_string(),
                    })
            }
            Expression::Binary { op, left, right } => {
                if op.is_logical() || op.is_comparison() {
                    // Operand types still need to resolve.
                    self.infer(left, &path.field("left"))?;
                    self.infer(right, &path.field("right"))?;
                    return Ok(IrType::I1);
                }
                let left = self.infer(left, &path.field("left"))?;
                let right = self.infer(right, &path.field("right"))?;
                match op {
                    BinaryOp::Add if left == IrType::Ptr || right == IrType::Ptr => Ok(IrType::Ptr),
                    _ if left == IrType::F64 || right == IrType::F64 => Ok(IrType::F64),
                    _ => Ok(IrType::I64),
                }
            }
            Expression::Unary { op, operand } => match op {
                UnaryOp::Not => {
                    self.infer(operand, &path.field("operand"))?;
                    Ok(IrType::I1)
                }
                UnaryOp::Neg => match self.infer(operand, &path.field("operand"))? {
                    IrType::F64 => Ok(IrType::F64),
                    IrType::I64 | IrType::Ptr => Ok(IrType::I64),
                    other => Err(CodegenError::TypeMismatch {
                        expected: "a numeric operand".to_string(),
                        found: other.to_string(),
                        path: path.field("operand").to_string(),
                    }),
                },
            },
            Expression::Call { name, .. } => {
                let callee = self
                    .context
                    .module
                    .function(name)
                    .ok_or_else(|| CodegenError::UnknownFunction {
                        name: name.clone(),
                        path: path.to_string(),
                    })?;
                Ok(declared_ir_type(&callee.return_type))
            }
            Expression::ModuleCall { module, name, .. } => {
                let (_, _, ret) = self.resolve_module_call(module, name, path)?;
                Ok(ret)
            }
            Expression::Builtin { name, .. } => {
                let builtin = self
                    .context
                    .registry
                    .get(name)
                    .ok_or_else(|| CodegenError::UnknownFunction {
                        name: name.clone(),
                        path: path.to_string(),
                    })?;
                Ok(native_ir_type(builtin.ret))
            }
            Expression::ArrayLit { .. }
            | Expression::MapLit { .. }
            | Expression::Index { .. }
            | Expression::Field { .. } => Ok(IrType::Ptr),
        }
    }

    /// Resolves a `module_call` to `(symbol, param types, return type)`.
    fn resolve_module_call(
        &self,
        alias: &str,
        name: &str,
        path: &NodePath,
    ) -> Result<(String, Vec<IrType>, IrType), CodegenError> {
        if let Some(namespace) = alias.strip_prefix(crate::loader::STD_PREFIX) {
            let qualified = format!("{namespace}.{name}");
            if let Some(builtin) = self.context.registry.get(&qualified) {
                return Ok((
                    builtin.extern_symbol(),
                    builtin.params.iter().map(|ty| native_ir_type(*ty)).collect(),
                    native_ir_type(builtin.ret),
                ));
            }
        }

        let program = self.context.program.ok_or_else(|| CodegenError::UnknownModule {
            name: alias.to_string(),
            path: path.to_string(),
        })?;
        let target = program
            .module_by_alias(alias)
            .ok_or_else(|| CodegenError::UnknownModule {
                name: alias.to_string(),
                path: path.to_string(),
            })?;
        if !target.exports_function(name) {
            return Err(CodegenError::NotExported {
                module: target.name.clone(),
                name: name.to_string(),
                path: path.to_string(),
            });
        }
        let callee = target.function(name).ok_or_else(|| CodegenError::UnknownFunction {
            name: name.to_string(),
            path: path.to_string(),
        })?;
        Ok((
            super::mangled_symbol(&target.name, name),
            callee
                .params
                .iter()
                .map(|parameter| declared_ir_type(&parameter.type_name))
                .collect(),
            declared_ir_type(&callee.return_type),
        ))
    }

    // ---- block plumbing --------------------------------------------

    fn emit(&mut self, instruction: Instruction) {
        self.blocks[self.current].instructions.push(instruction);
    }

    /// Seals the current block unless a `return` already did.
    fn terminate(&mut self, terminator: Terminator) {
        if self.blocks[self.current].terminator.is_none() {
            self.blocks[self.current].terminator = Some(terminator);
        }
    }

    fn start_block(&mut self, label: String) {
        self.blocks.push(BasicBlock::new(label));
        self.current = self.blocks.len() - 1;
    }

    fn fresh_temp(&mut self) -> Operand {
        let temp = Operand::temp(format!("t{}", self.temp_counter));
        self.temp_counter += 1;
        temp
    }

    fn slot(&self, name: &str) -> Operand {
        Operand::temp(format!("{name}.addr"))
    }

    /// `then`/`else`/`cont`, numbered after the first branch.
    fn branch_labels(&mut self) -> (String, String, String) {
        let labels = if self.branch_counter == 0 {
            ("then".to_string(), "else".to_string(), "cont".to_string())
        } else {
            let n = self.branch_counter;
            (format!("then{n}"), format!("else{n}"), format!("cont{n}"))
        };
        self.branch_counter += 1;
        labels
    }

    /// `while.cond`/`while.body`/`while.end`, numbered after the first.
    fn loop_labels(&mut self) -> (String, String, String) {
        let labels = if self.loop_counter == 0 {
            (
                "while.cond".to_string(),
                "while.body".to_string(),
                "while.end".to_string(),
            )
        } else {
            let n = self.loop_counter;
            (
                format!("while.cond{n}"),
                format!("while.body{n}"),
                format!("while.end{n}"),
            )
        };
        self.loop_counter += 1;
        labels
    }

    // ---- statements ------------------------------------------------

    fn lower_block(&mut self, block: &[Statement], parent: &NodePath) -> Result<(), CodegenError> {
        for (position, statement) in block.iter().enumerate() {
            // A `return` seals the block; whatever follows it in the
            // source is unreachable and must not be emitted.
            if self.blocks[self.current].terminator.is_some() {
                break;
            }
            let path = parent.index("body", position);
            self.lower_statement(statement, &path)?;
        }
        Ok(())
    }

    fn lower_statement(&mut self, statement: &Statement, path: &NodePath) -> Result<(), CodegenError> {
        match statement {
            Statement::Assign { target, value } => {
                let want = self.locals[target.as_str()];
                let operand = self.lower_coerced(value, want, &path.field("value"))?;
                self.emit(Instruction::Store {
                    ty: want,
                    value: operand,
                    ptr: self.slot(target),
                });
                Ok(())
            }
            Statement::If { cond, then, otherwise } => {
                let cond = self.lower_truthy(cond, &path.field("cond"))?;
                let (then_label, else_label, cont_label) = self.branch_labels();
                self.terminate(Terminator::CondBr {
                    cond,
                    then_target: then_label.clone(),
                    else_target: else_label.clone(),
                });

                self.start_block(then_label);
                self.lower_block(then, path)?;
                self.terminate(Terminator::Br {
                    target: cont_label.clone(),
                });

                self.start_block(else_label);
                self.lower_block(otherwise, path)?;
                self.terminate(Terminator::Br {
                    target: cont_label.clone(),
                });

                self.start_block(cont_label);
                Ok(())
            }
            Statement::While { cond, body } | Statement::For { cond, body } => {
                let (cond_label, body_label, end_label) = self.loop_labels();
                self.terminate(Terminator::Br {
                    target: cond_label.clone(),
                });

                self.start_block(cond_label.clone());
                let check = self.lower_truthy(cond, &path.field("cond"))?;
                self.terminate(Terminator::CondBr {
                    cond: check,
                    then_target: body_label.clone(),
                    else_target: end_label.clone(),
                });

                self.start_block(body_label);
                self.lower_block(body, path)?;
                self.terminate(Terminator::Br { target: cond_label });

                self.start_block(end_label);
                Ok(())
            }
            Statement::Return { value } => {
                let ret = self.return_type();
                match (value, ret) {
                    (None, IrType::Void) => self.terminate(Terminator::Ret {
                        ty: IrType::Void,
                        value: None,
                    }),
                    (Some(value), IrType::Void) => {
                        // Evaluated for effect; the value is discarded.
                        self.lower_expr(value, &path.field("value"))?;
                        self.terminate(Terminator::Ret {
                            ty: IrType::Void,
                            value: None,
                        });
                    }
                    (None, other) => {
                        return Err(CodegenError::TypeMismatch {
                            expected: other.to_string(),
                            found: "void".to_string(),
                            path: path.to_string(),
                        })
                    }
                    (Some(value), other) => {
                        let operand = self.lower_coerced(value, other, &path.field("value"))?;
                        self.terminate(Terminator::Ret {
                            ty: other,
                            value: Some(operand),
                        });
                    }
                }
                Ok(())
            }
            Statement::Expr { value } => {
                self.lower_expr(value, &path.field("value"))?;
                Ok(())
            }
        }
    }

    // ---- expressions -----------------------------------------------

    fn lower_expr(&mut self, expression: &Expression, path: &NodePath) -> Result<(Operand, IrType), CodegenError> {
        match expression {
            Expression::Literal { value } => self.lower_literal(value, path),
            Expression::Variable { name } => {
                let ty = self
                    .locals
                    .get(name)
                    .copied()
                    .ok_or_else(|| CodegenError::UnresolvedVariable {
                        name: name.clone(),
                        path: path.to_string(),
                    })?;
                let dest = self.fresh_temp();
                self.emit(Instruction::Load {
                    dest: dest.clone(),
                    ty,
                    ptr: self.slot(name),
                });
                Ok((dest, ty))
            }
            Expression::Binary { op, left, right } => self.lower_binary(*op, left, right, path),
            Expression::Unary { op, operand } => self.lower_unary(*op, operand, path),
            Expression::Call { name, args } => self.lower_call(name, args, path),
            Expression::ModuleCall { module, name, args } => {
                let (symbol, params, ret) = self.resolve_module_call(module, name, path)?;
                self.lower_extern_call(&symbol, &params, ret, name, args, path)
            }
            Expression::Builtin { name, args } => {
                let builtin = self
                    .context
                    .registry
                    .get(name)
                    .ok_or_else(|| CodegenError::UnknownFunction {
                        name: name.clone(),
                        path: path.to_string(),
                    })?;
                let symbol = builtin.extern_symbol();
                let params: Vec<IrType> = builtin.params.iter().map(|ty| native_ir_type(*ty)).collect();
                let ret = native_ir_type(builtin.ret);
                self.lower_extern_call(&symbol, &params, ret, name, args, path)
            }
            Expression::ArrayLit { elements } => self.lower_array_lit(elements, path),
            Expression::MapLit { pairs } => self.lower_map_lit(pairs, path),
            Expression::Index { object, index } => {
                let object = self.lower_boxed(object, &path.field("object"))?;
                let index = self.lower_boxed(index, &path.field("index"))?;
                let dest = self.call_intrinsic(
                    intrinsics::VALUE_INDEX,
                    vec![(IrType::Ptr, object), (IrType::Ptr, index)],
                );
                Ok((dest.expect("value_index returns ptr"), IrType::Ptr))
            }
            Expression::Field { object, field_name } => {
                let object = self.lower_boxed(object, &path.field("object"))?;
                let key = self.string_const(field_name);
                let dest = self.call_intrinsic(
                    intrinsics::VALUE_INDEX,
                    vec![(IrType::Ptr, object), (IrType::Ptr, key)],
                );
                Ok((dest.expect("value_index returns ptr"), IrType::Ptr))
            }
        }
    }

    fn lower_literal(&mut self, literal: &LiteralValue, path: &NodePath) -> Result<(Operand, IrType), CodegenError> {
        match literal {
            LiteralValue::Number(number) => match Value::from_number(*number) {
                Value::Int(value) => Ok((Operand::Int(value), IrType::I64)),
                _ => Ok((Operand::Float(*number), IrType::F64)),
            },
            LiteralValue::Bool(value) => Ok((Operand::Bool(*value), IrType::I1)),
            LiteralValue::String(value) => {
                let boxed = self.string_const(value);
                Ok((boxed, IrType::Ptr))
            }
            LiteralValue::Null => Err(CodegenError::UnsupportedLiteral {
                path: path.to_string(),
            }),
        }
    }

    /// Interns a string constant and boxes it into a runtime value.
    fn string_const(&mut self, content: &str) -> Operand {
        let existing = self
            .unit
            .globals
            .iter()
            .find(|global| global.content == content)
            .map(|global| global.name.clone());
        let name = existing.unwrap_or_else(|| {
            let name = format!(".str.{}", self.unit.globals.len());
            self.unit.globals.push(IrGlobal {
                name: name.clone(),
                content: content.to_string(),
            });
            name
        });
        let dest = self.call_intrinsic(intrinsics::STR_CONST, vec![(IrType::Ptr, Operand::Global(name))]);
        dest.expect("str_const returns ptr")
    }

    fn lower_binary(
        &mut self,
        op: BinaryOp,
        left: &Expression,
        right: &Expression,
        path: &NodePath,
    ) -> Result<(Operand, IrType), CodegenError> {
        if op.is_logical() {
            let left = self.lower_truthy(left, &path.field("left"))?;
            let right = self.lower_truthy(right, &path.field("right"))?;
            let dest = self.fresh_temp();
            self.emit(Instruction::BinOp {
                dest: dest.clone(),
                op: if op == BinaryOp::And { IrBinOp::And } else { IrBinOp::Or },
                ty: IrType::I1,
                lhs: left,
                rhs: right,
            });
            return Ok((dest, IrType::I1));
        }

        let (lo, lt) = self.lower_expr(left, &path.field("left"))?;
        let (ro, rt) = self.lower_expr(right, &path.field("right"))?;

        match op {
            BinaryOp::Add if lt == IrType::Ptr || rt == IrType::Ptr => {
                // Either side a runtime value: string concatenation of
                // the rendered operands.
                let lo = self.coerce(lo, lt, IrType::Ptr, &path.field("left"))?;
                let ro = self.coerce(ro, rt, IrType::Ptr, &path.field("right"))?;
                let dest = self.call_intrinsic(
                    intrinsics::STR_CONCAT,
                    vec![(IrType::Ptr, lo), (IrType::Ptr, ro)],
                );
                Ok((dest.expect("str_concat returns ptr"), IrType::Ptr))
            }
            BinaryOp::Add | BinaryOp::Sub | BinaryOp::Mul | BinaryOp::Div | BinaryOp::Mod => {
                let (lo, ro, ty) = self.promote_pair(lo, lt, ro, rt, path)?;
                let opcode = match (op, ty) {
                    (BinaryOp::Add, IrType::F64) => IrBinOp::FAdd,
                    (BinaryOp::Sub, IrType::F64) => IrBinOp::FSub,
                    (BinaryOp::Mul, IrType::F64) => IrBinOp::FMul,
                    (BinaryOp::Div, IrType::F64) => IrBinOp::FDiv,
                    (BinaryOp::Mod, IrType::F64) => IrBinOp::FRem,
                    (BinaryOp::Add, _) => IrBinOp::Add,
                    (BinaryOp::Sub, _) => IrBinOp::Sub,
                    (BinaryOp::Mul, _) => IrBinOp::Mul,
                    (BinaryOp::Div, _) => IrBinOp::SDiv,
                    (BinaryOp::Mod, _) => IrBinOp::SRem,
                    _ => unreachable!("arithmetic operator expected"),
                };
                let dest = self.fresh_temp();
                self.emit(Instruction::BinOp {
                    dest: dest.clone(),
                    op: opcode,
                    ty,
                    lhs: lo,
                    rhs: ro,
                });
                Ok((dest, ty))
            }
            BinaryOp::Eq | BinaryOp::Ne => {
                if lt == IrType::Ptr || rt == IrType::Ptr {
                    let lo = self.coerce(lo, lt, IrType::Ptr, &path.field("left"))?;
                    let ro = self.coerce(ro, rt, IrType::Ptr, &path.field("right"))?;
                    let equal = self
                        .call_intrinsic(intrinsics::VALUE_EQ, vec![(IrType::Ptr, lo), (IrType::Ptr, ro)])
                        .expect("value_eq returns i1");
                    if op == BinaryOp::Eq {
                        return Ok((equal, IrType::I1));
                    }
                    let dest = self.fresh_temp();
                    self.emit(Instruction::BinOp {
                        dest: dest.clone(),
                        op: IrBinOp::Xor,
                        ty: IrType::I1,
                        lhs: equal,
                        rhs: Operand::Bool(true),
                    });
                    return Ok((dest, IrType::I1));
                }
                if lt == IrType::I1 && rt == IrType::I1 {
                    let dest = self.fresh_temp();
                    self.emit(Instruction::ICmp {
                        dest: dest.clone(),
                        cond: if op == BinaryOp::Eq { IcmpCond::Eq } else { IcmpCond::Ne },
                        ty: IrType::I1,
                        lhs: lo,
                        rhs: ro,
                    });
                    return Ok((dest, IrType::I1));
                }
                let (lo, ro, ty) = self.promote_pair(lo, lt, ro, rt, path)?;
                self.lower_comparison(op, lo, ro, ty)
            }
            BinaryOp::Lt | BinaryOp::Le | BinaryOp::Gt | BinaryOp::Ge => {
                if lt == IrType::Ptr && rt == IrType::Ptr {
                    // Lexicographic string ordering through the runtime.
                    let compared = self
                        .call_intrinsic(intrinsics::STR_CMP, vec![(IrType::Ptr, lo), (IrType::Ptr, ro)])
                        .expect("str_cmp returns i64");
                    return self.lower_comparison(op, compared, Operand::Int(0), IrType::I64);
                }
                let (lo, ro, ty) = self.promote_pair(lo, lt, ro, rt, path)?;
                self.lower_comparison(op, lo, ro, ty)
            }
            BinaryOp::And | BinaryOp::Or => unreachable!("logical operators handled above"),
        }
    }

    fn lower_comparison(
        &mut self,
        op: BinaryOp,
        lhs: Operand,
        rhs: Operand,
        ty: IrType,
    ) -> Result<(Operand, IrType), CodegenError> {
        let dest = self.fresh_temp();
        let instruction = if ty == IrType::F64 {
            let cond = match op {
                BinaryOp::Eq => FcmpCond::Oeq,
                BinaryOp::Ne => FcmpCond::One,
                BinaryOp::Lt => FcmpCond::Olt,
                BinaryOp::Le => FcmpCond::Ole,
                BinaryOp::Gt => FcmpCond::Ogt,
                BinaryOp::Ge => FcmpCond::Oge,
                _ => unreachable!("comparison operator expected"),
            };
            Instruction::FCmp {
                dest: dest.clone(),
                cond,
                lhs,
                rhs,
            }
        } else {
            let cond = match op {
                BinaryOp::Eq => IcmpCond::Eq,
                BinaryOp::Ne => IcmpCond::Ne,
                BinaryOp::Lt => IcmpCond::Slt,
                BinaryOp::Le => IcmpCond::Sle,
                BinaryOp::Gt => IcmpCond::Sgt,
                BinaryOp::Ge => IcmpCond::Sge,
                _ => unreachable!("comparison operator expected"),
            };
            Instruction::ICmp {
                dest: dest.clone(),
                cond,
                ty,
                lhs,
                rhs,
            }
        };
        self.emit(instruction);
        Ok((dest, IrType::I1))
    }

    fn lower_unary(
        &mut self,
        op: UnaryOp,
        operand: &Expression,
        path: &NodePath,
    ) -> Result<(Operand, IrType), CodegenError> {
        match op {
            UnaryOp::Not => {
                let truthy = self.lower_truthy(operand, &path.field("operand"))?;
                let dest = self.fresh_temp();
                self.emit(Instruction::BinOp {
                    dest: dest.clone(),
                    op: IrBinOp::Xor,
                    ty: IrType::I1,
                    lhs: truthy,
                    rhs: Operand::Bool(true),
                });
                Ok((dest, IrType::I1))
            }
            UnaryOp::Neg => {
                let (operand_value, ty) = self.lower_expr(operand, &path.field("operand"))?;
                match ty {
                    IrType::F64 => {
                        let dest = self.fresh_temp();
                        self.emit(Instruction::BinOp {
                            dest: dest.clone(),
                            op: IrBinOp::FSub,
                            ty: IrType::F64,
                            lhs: Operand::Float(-0.0),
                            rhs: operand_value,
                        });
                        Ok((dest, IrType::F64))
                    }
                    IrType::I64 | IrType::Ptr => {
                        let value = self.coerce(operand_value, ty, IrType::I64, &path.field("operand"))?;
                        let dest = self.fresh_temp();
                        self.emit(Instruction::BinOp {
                            dest: dest.clone(),
                            op: IrBinOp::Sub,
                            ty: IrType::I64,
                            lhs: Operand::Int(0),
                            rhs: value,
                        });
                        Ok((dest, IrType::I64))
                    }
                    other => Err(CodegenError::TypeMismatch {
                        expected: "a numeric operand".to_string(),
                        found: other.to_string(),
                        path: path.field("operand").to_string(),
                    }),
                }
            }
        }
    }

    fn lower_call(
        &mut self,
        name: &str,
        args: &[Expression],
        path: &NodePath,
    ) -> Result<(Operand, IrType), CodegenError> {
        let callee = self
            .context
            .module
            .function(name)
            .ok_or_else(|| CodegenError::UnknownFunction {
                name: name.to_string(),
                path: path.to_string(),
            })?
            .clone();
        if args.len() != callee.params.len() {
            return Err(CodegenError::ArityMismatch {
                name: name.to_string(),
                expected: callee.params.len(),
                given: args.len(),
                path: path.to_string(),
            });
        }

        let mut lowered = Vec::with_capacity(args.len());
        for (position, (argument, parameter)) in args.iter().zip(&callee.params).enumerate() {
            let want = declared_ir_type(&parameter.type_name);
            let operand = self.lower_coerced(argument, want, &path.index("args", position))?;
            lowered.push((want, operand));
        }

        let ret = declared_ir_type(&callee.return_type);
        let symbol = self.context.symbol_for(self.context.module, name);
        let dest = if ret == IrType::Void { None } else { Some(self.fresh_temp()) };
        self.emit(Instruction::Call {
            dest: dest.clone(),
            ret,
            callee: symbol,
            args: lowered,
            tail: false,
        });
        Ok((dest.unwrap_or(Operand::Int(0)), ret))
    }

    /// Emits a call to a declared external (builtin or cross-module)
    /// symbol, coercing each argument to the declared parameter type.
    fn lower_extern_call(
        &mut self,
        symbol: &str,
        params: &[IrType],
        ret: IrType,
        display_name: &str,
        args: &[Expression],
        path: &NodePath,
    ) -> Result<(Operand, IrType), CodegenError> {
        if args.len() != params.len() {
            return Err(CodegenError::ArityMismatch {
                name: display_name.to_string(),
                expected: params.len(),
                given: args.len(),
                path: path.to_string(),
            });
        }
        let mut lowered = Vec::with_capacity(args.len());
        for (position, (argument, want)) in args.iter().zip(params).enumerate() {
            let operand = self.lower_coerced(argument, *want, &path.index("args", position))?;
            lowered.push((*want, operand));
        }
        self.unit.declare_external(super::ir::IrExternal {
            name: symbol.to_string(),
            params: params.to_vec(),
            ret,
        });
        let dest = if ret == IrType::Void { None } else { Some(self.fresh_temp()) };
        self.emit(Instruction::Call {
            dest: dest.clone(),
            ret,
            callee: symbol.to_string(),
            args: lowered,
            tail: false,
        });
        Ok((dest.unwrap_or(Operand::Int(0)), ret))
    }

    fn lower_array_lit(&mut self, elements: &[Expression], path: &NodePath) -> Result<(Operand, IrType), CodegenError> {
        let array = self
            .call_intrinsic(
                intrinsics::ARRAY_NEW,
                vec![(IrType::I64, Operand::Int(elements.len() as i64))],
            )
            .expect("array_new returns ptr");
        for (position, element) in elements.iter().enumerate() {
            let boxed = self.lower_boxed(element, &path.index("elements", position))?;
            let _ = self.call_intrinsic(
                intrinsics::ARRAY_PUSH,
                vec![(IrType::Ptr, array.clone()), (IrType::Ptr, boxed)],
            );
        }
        Ok((array, IrType::Ptr))
    }

    fn lower_map_lit(&mut self, pairs: &[MapEntry], path: &NodePath) -> Result<(Operand, IrType), CodegenError> {
        let map = self
            .call_intrinsic(intrinsics::MAP_NEW, Vec::new())
            .expect("map_new returns ptr");
        for (position, MapEntry { key, value }) in pairs.iter().enumerate() {
            let entry = path.index("pairs", position);
            // The runtime stringifies non-string keys on insertion.
            let key = self.lower_boxed(key, &entry.field("key"))?;
            let value = self.lower_boxed(value, &entry.field("value"))?;
            let _ = self.call_intrinsic(
                intrinsics::MAP_SET,
                vec![(IrType::Ptr, map.clone()), (IrType::Ptr, key), (IrType::Ptr, value)],
            );
        }
        Ok((map, IrType::Ptr))
    }

    // ---- coercions -------------------------------------------------

    fn lower_coerced(&mut self, expression: &Expression, want: IrType, path: &NodePath) -> Result<Operand, CodegenError> {
        let (operand, ty) = self.lower_expr(expression, path)?;
        self.coerce(operand, ty, want, path)
    }

    /// Lowers an expression into its boxed runtime-value form.
    fn lower_boxed(&mut self, expression: &Expression, path: &NodePath) -> Result<Operand, CodegenError> {
        self.lower_coerced(expression, IrType::Ptr, path)
    }

    /// Lowers an expression into an `i1` truthiness flag.
    fn lower_truthy(&mut self, expression: &Expression, path: &NodePath) -> Result<Operand, CodegenError> {
        let (operand, ty) = self.lower_expr(expression, path)?;
        match ty {
            IrType::I1 => Ok(operand),
            IrType::I64 => {
                let dest = self.fresh_temp();
                self.emit(Instruction::ICmp {
                    dest: dest.clone(),
                    cond: IcmpCond::Ne,
                    ty: IrType::I64,
                    lhs: operand,
                    rhs: Operand::Int(0),
                });
                Ok(dest)
            }
            IrType::F64 => {
                let dest = self.fresh_temp();
                self.emit(Instruction::FCmp {
                    dest: dest.clone(),
                    cond: FcmpCond::One,
                    lhs: operand,
                    rhs: Operand::Float(0.0),
                });
                Ok(dest)
            }
            IrType::Ptr => Ok(self
                .call_intrinsic(intrinsics::VALUE_TRUTHY, vec![(IrType::Ptr, operand)])
                .expect("value_truthy returns i1")),
            IrType::Void => Err(CodegenError::TypeMismatch {
                expected: "a condition value".to_string(),
                found: "void".to_string(),
                path: path.to_string(),
            }),
        }
    }

    /// Bridges between the IR types: integer widening/promotion, boxing
    /// into runtime values and unboxing back out. Demotions (float to
    /// int) are type errors.
    fn coerce(&mut self, operand: Operand, from: IrType, to: IrType, path: &NodePath) -> Result<Operand, CodegenError> {
        use IrType::{F64, I1, I64, Ptr};
        if from == to {
            return Ok(operand);
        }
        let mismatch = |found: IrType, expected: IrType| CodegenError::TypeMismatch {
            expected: expected.to_string(),
            found: found.to_string(),
            path: path.to_string(),
        };
        match (from, to) {
            (I1, I64) => {
                let dest = self.fresh_temp();
                self.emit(Instruction::ZExt {
                    dest: dest.clone(),
                    from: I1,
                    to: I64,
                    value: operand,
                });
                Ok(dest)
            }
            (I64, F64) => {
                let dest = self.fresh_temp();
                self.emit(Instruction::SiToFp {
                    dest: dest.clone(),
                    value: operand,
                });
                Ok(dest)
            }
            (I1, F64) => {
                let widened = self.coerce(operand, I1, I64, path)?;
                self.coerce(widened, I64, F64, path)
            }
            (I64, Ptr) => Ok(self
                .call_intrinsic(intrinsics::BOX_INT, vec![(I64, operand)])
                .expect("box_int returns ptr")),
            (F64, Ptr) => Ok(self
                .call_intrinsic(intrinsics::BOX_FLOAT, vec![(F64, operand)])
                .expect("box_float returns ptr")),
            (I1, Ptr) => Ok(self
                .call_intrinsic(intrinsics::BOX_BOOL, vec![(I1, operand)])
                .expect("box_bool returns ptr")),
            (Ptr, I64) => Ok(self
                .call_intrinsic(intrinsics::VALUE_INT, vec![(Ptr, operand)])
                .expect("value_int returns i64")),
            (Ptr, F64) => Ok(self
                .call_intrinsic(intrinsics::VALUE_FLOAT, vec![(Ptr, operand)])
                .expect("value_float returns double")),
            (Ptr, I1) => Ok(self
                .call_intrinsic(intrinsics::VALUE_TRUTHY, vec![(Ptr, operand)])
                .expect("value_truthy returns i1")),
            (found, expected) => Err(mismatch(found, expected)),
        }
    }

    /// Promotes two numeric operands to a common type: `double` when
    /// either side is, `i64` otherwise. Boxed operands unbox to the
    /// chosen type.
    fn promote_pair(
        &mut self,
        lo: Operand,
        lt: IrType,
        ro: Operand,
        rt: IrType,
        path: &NodePath,
    ) -> Result<(Operand, Operand, IrType), CodegenError> {
        let common = if lt == IrType::F64 || rt == IrType::F64 {
            IrType::F64
        } else {
            IrType::I64
        };
        let lo = self.coerce(lo, lt, common, &path.field("left"))?;
        let ro = self.coerce(ro, rt, common, &path.field("right"))?;
        Ok((lo, ro, common))
    }

    /// Declares a runtime intrinsic and emits a call to it. Returns the
    /// destination register for non-void intrinsics.
    fn call_intrinsic(&mut self, name: &str, args: Vec<(IrType, Operand)>) -> Option<Operand> {
        let external = intrinsics::external(name);
        let ret = external.ret;
        self.unit.declare_external(external);
        let dest = if ret == IrType::Void { None } else { Some(self.fresh_temp()) };
        self.emit(Instruction::Call {
            dest: dest.clone(),
            ret,
            callee: name.to_string(),
            args,
            tail: false,
        });
        dest
    }
}
