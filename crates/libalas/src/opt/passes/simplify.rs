//! Algebraic simplification.
//!
//! Integer and boolean identities that replace an instruction with one of
//! its operands or an immediate: `x + 0`, `x * 1`, `x * 0`, `x / 1`,
//! `x % 1`, and the `i1` identities for `and`/`or`/`xor`. Floating-point
//! identities are deliberately absent; `x + 0.0` is not `x` for `-0.0`,
//! so none of them are sound without fast-math assumptions.

use std::collections::HashMap;

use crate::codegen::ir::{Instruction, IrBinOp, IrModule, Operand};
use crate::opt::{substitute, OptimizerError, Pass};

pub(crate) struct AlgebraicSimplification;

impl Pass for AlgebraicSimplification {
    fn name(&self) -> &'static str {
        "algebraic-simplification"
    }

    fn run(&self, module: &mut IrModule) -> Result<bool, OptimizerError> {
        let mut changed = false;
        for function in &mut module.functions {
            loop {
                let mut replaced: HashMap<String, Operand> = HashMap::new();
                for block in &mut function.blocks {
                    block.instructions.retain(|instruction| {
                        let Instruction::BinOp { dest, op, lhs, rhs, .. } = instruction else {
                            return true;
                        };
                        let Operand::Temp(dest) = dest else {
                            return true;
                        };
                        match simplify(*op, lhs, rhs) {
                            Some(replacement) => {
                                replaced.insert(dest.clone(), replacement);
                                false
                            }
                            None => true,
                        }
                    });
                }
                if replaced.is_empty() {
                    break;
                }
                substitute(function, &replaced);
                changed = true;
            }
        }
        Ok(changed)
    }
}

fn simplify(op: IrBinOp, lhs: &Operand, rhs: &Operand) -> Option<Operand> {
    match op {
        IrBinOp::Add => match (lhs, rhs) {
            (value, Operand::Int(0)) | (Operand::Int(0), value) => Some(value.clone()),
            _ => None,
        },
        IrBinOp::Sub => match rhs {
            Operand::Int(0) => Some(lhs.clone()),
            _ => None,
        },
        IrBinOp::Mul => match (lhs, rhs) {
            (value, Operand::Int(1)) | (Operand::Int(1), value) => Some(value.clone()),
            (_, Operand::Int(0)) | (Operand::Int(0), _) => Some(Operand::Int(0)),
            _ => None,
        },
        IrBinOp::SDiv => match rhs {
            Operand::Int(1) => Some(lhs.clone()),
            _ => None,
        },
        IrBinOp::SRem => match rhs {
            Operand::Int(1) => Some(Operand::Int(0)),
            _ => None,
        },
        IrBinOp::And => match (lhs, rhs) {
            (value, Operand::Bool(true)) | (Operand::Bool(true), value) => Some(value.clone()),
            (_, Operand::Bool(false)) | (Operand::Bool(false), _) => Some(Operand::Bool(false)),
            _ => None,
        },
        IrBinOp::Or => match (lhs, rhs) {
            (value, Operand::Bool(false)) | (Operand::Bool(false), value) => Some(value.clone()),
            (_, Operand::Bool(true)) | (Operand::Bool(true), _) => Some(Operand::Bool(true)),
            _ => None,
        },
        IrBinOp::Xor => match (lhs, rhs) {
            (value, Operand::Bool(false)) | (Operand::Bool(false), value) => Some(value.clone()),
            _ => None,
        },
        _ => None,
    }
}
