//! Constant folding.
//!
//! Pure instructions whose operands are all immediates are computed at
//! compile time; their results substitute into every use, which can make
//! further instructions foldable, so the pass iterates to a fixpoint.
//! A conditional branch on a folded constant becomes an unconditional
//! one. Integer arithmetic wraps, matching the emitted `add`/`sub`/`mul`
//! without overflow flags; division by a constant zero is left alone so
//! the runtime keeps its trap.

use std::collections::HashMap;

use crate::codegen::ir::{FcmpCond, IcmpCond, Instruction, IrBinOp, IrModule, Operand, Terminator};
use crate::opt::{substitute, OptimizerError, Pass};

pub(crate) struct ConstantFolding;

impl Pass for ConstantFolding {
    fn name(&self) -> &'static str {
        "constant-folding"
    }

    fn run(&self, module: &mut IrModule) -> Result<bool, OptimizerError> {
        let mut changed = false;
        for function in &mut module.functions {
            loop {
                let mut folded: HashMap<String, Operand> = HashMap::new();
                for block in &mut function.blocks {
                    block.instructions.retain(|instruction| {
                        match fold_instruction(instruction) {
                            Some((name, constant)) => {
                                folded.insert(name, constant);
                                false
                            }
                            None => true,
                        }
                    });
                }
                if folded.is_empty() {
                    break;
                }
                substitute(function, &folded);
                changed = true;
            }

            // Branches decided at compile time.
            for block in &mut function.blocks {
                if let Some(Terminator::CondBr {
                    cond: Operand::Bool(value),
                    then_target,
                    else_target,
                }) = &block.terminator
                {
                    let target = if *value { then_target.clone() } else { else_target.clone() };
                    block.terminator = Some(Terminator::Br { target });
                    changed = true;
                }
            }
        }
        Ok(changed)
    }
}

/// Folds one instruction to `(dest name, constant)` when possible.
fn fold_instruction(instruction: &Instruction) -> Option<(String, Operand)> {
    if !instruction.is_pure() || !instruction.operands().iter().all(|operand| operand.is_const()) {
        return None;
    }
    let dest = match instruction.dest() {
        Some(Operand::Temp(name)) => name.clone(),
        _ => return None,
    };
    let constant = match instruction {
        Instruction::BinOp { op, lhs, rhs, .. } => fold_binop(*op, lhs, rhs)?,
        Instruction::ICmp { cond, lhs, rhs, .. } => fold_icmp(*cond, lhs, rhs)?,
        Instruction::FCmp { cond, lhs, rhs, .. } => fold_fcmp(*cond, lhs, rhs)?,
        Instruction::SiToFp { value: Operand::Int(value), .. } => Operand::Float(*value as f64),
        Instruction::ZExt { value: Operand::Bool(value), .. } => Operand::Int(i64::from(*value)),
        _ => return None,
    };
    Some((dest, constant))
}

fn fold_binop(op: IrBinOp, lhs: &Operand, rhs: &Operand) -> Option<Operand> {
    match (lhs, rhs) {
        (Operand::Int(l), Operand::Int(r)) => match op {
            IrBinOp::Add => Some(Operand::Int(l.wrapping_add(*r))),
            IrBinOp::Sub => Some(Operand::Int(l.wrapping_sub(*r))),
            IrBinOp::Mul => Some(Operand::Int(l.wrapping_mul(*r))),
            // A zero divisor keeps its runtime behavior.
            IrBinOp::SDiv if *r != 0 => Some(Operand::Int(l.wrapping_div(*r))),
            IrBinOp::SRem if *r != 0 => Some(Operand::Int(l.wrapping_rem(*r))),
            _ => None,
        },
        (Operand::Float(l), Operand::Float(r)) => match op {
            IrBinOp::FAdd => Some(Operand::Float(l + r)),
            IrBinOp::FSub => Some(Operand::Float(l - r)),
            IrBinOp::FMul => Some(Operand::Float(l * r)),
            IrBinOp::FDiv if *r != 0.0 => Some(Operand::Float(l / r)),
            IrBinOp::FRem if *r != 0.0 => Some(Operand::Float(l % r)),
            _ => None,
        },
        (Operand::Bool(l), Operand::Bool(r)) => match op {
            IrBinOp::And => Some(Operand::Bool(*l && *r)),
            IrBinOp::Or => Some(Operand::Bool(*l || *r)),
            IrBinOp::Xor => Some(Operand::Bool(l != r)),
            _ => None,
        },
        _ => None,
    }
}

fn fold_icmp(cond: IcmpCond, lhs: &Operand, rhs: &Operand) -> Option<Operand> {
    let (l, r) = match (lhs, rhs) {
        (Operand::Int(l), Operand::Int(r)) => (*l, *r),
        (Operand::Bool(l), Operand::Bool(r)) => (i64::from(*l), i64::from(*r)),
        _ => return None,
    };
    let result = match cond {
        IcmpCond::Eq => l == r,
        IcmpCond::Ne => l != r,
        IcmpCond::Slt => l < r,
        IcmpCond::Sle => l <= r,
        IcmpCond::Sgt => l > r,
        IcmpCond::Sge => l >= r,
    };
    Some(Operand::Bool(result))
}

fn fold_fcmp(cond: FcmpCond, lhs: &Operand, rhs: &Operand) -> Option<Operand> {
    let (l, r) = match (lhs, rhs) {
        (Operand::Float(l), Operand::Float(r)) => (*l, *r),
        _ => return None,
    };
    let result = match cond {
        FcmpCond::Oeq => l == r,
        FcmpCond::One => l != r && !l.is_nan() && !r.is_nan(),
        FcmpCond::Olt => l < r,
        FcmpCond::Ole => l <= r,
        FcmpCond::Ogt => l > r,
        FcmpCond::Oge => l >= r,
    };
    Some(Operand::Bool(result))
}
