//! Loop-invariant code motion.
//!
//! Loops are recovered from the code generator's block layout: a
//! `while.cond*` header, the contiguous run of blocks up to its
//! `while.end*` exit, and the block just before the header as the
//! preheader. A pure instruction inside the loop whose operands are all
//! defined outside it moves to the preheader. Instructions that can trap
//! (any division or remainder by a non-constant) stay put: the loop body
//! might never execute, and hoisting must not introduce a trap that the
//! program would not have reached.

use std::collections::HashSet;

use crate::codegen::ir::{Instruction, IrBinOp, IrFunction, IrModule, Operand, Terminator};
use crate::opt::{temp_name, OptimizerError, Pass};

pub(crate) struct LoopInvariantCodeMotion;

impl Pass for LoopInvariantCodeMotion {
    fn name(&self) -> &'static str {
        "loop-invariant-code-motion"
    }

    fn run(&self, module: &mut IrModule) -> Result<bool, OptimizerError> {
        let mut changed = false;
        for function in &mut module.functions {
            for header in 0..function.blocks.len() {
                if !function.blocks[header].label.starts_with("while.cond") {
                    continue;
                }
                let Some(region) = loop_region(function, header) else {
                    continue;
                };
                changed |= hoist_region(function, header, region);
            }
        }
        Ok(changed)
    }
}

/// The half-open block range of the loop body, headers included, when the
/// layout matches the generator's shape: the preheader falls through to
/// the header and the exit block follows the region contiguously.
fn loop_region(function: &IrFunction, header: usize) -> Option<std::ops::Range<usize>> {
    let header_block = &function.blocks[header];
    let exit_label = match &header_block.terminator {
        Some(Terminator::CondBr { else_target, .. }) => else_target.clone(),
        _ => return None,
    };
    if header == 0 {
        return None;
    }
    // The preheader must be the unique fall-through into the loop.
    match &function.blocks[header - 1].terminator {
        Some(Terminator::Br { target }) if *target == function.blocks[header].label => {}
        _ => return None,
    }
    let exit = function
        .blocks
        .iter()
        .position(|block| block.label == exit_label)?;
    if exit <= header {
        return None;
    }
    Some(header..exit)
}

fn hoist_region(function: &mut IrFunction, header: usize, region: std::ops::Range<usize>) -> bool {
    let mut defined: HashSet<String> = HashSet::new();
    for block in &function.blocks[region.clone()] {
        for instruction in &block.instructions {
            if let Some(Operand::Temp(name)) = instruction.dest() {
                defined.insert(name.clone());
            }
        }
    }

    let mut changed = false;
    // Hoisting one instruction can make another invariant; repeat until
    // the region is stable.
    loop {
        let mut hoisted: Vec<Instruction> = Vec::new();
        for block in &mut function.blocks[region.clone()] {
            let mut remaining = Vec::with_capacity(block.instructions.len());
            for instruction in block.instructions.drain(..) {
                if is_invariant(&instruction, &defined) {
                    if let Some(Operand::Temp(name)) = instruction.dest() {
                        defined.remove(&name.clone());
                    }
                    hoisted.push(instruction);
                } else {
                    remaining.push(instruction);
                }
            }
            block.instructions = remaining;
        }
        if hoisted.is_empty() {
            break;
        }
        function.blocks[header - 1].instructions.extend(hoisted);
        changed = true;
    }
    changed
}

fn is_invariant(instruction: &Instruction, defined_in_loop: &HashSet<String>) -> bool {
    if !instruction.is_pure() || !can_speculate(instruction) {
        return false;
    }
    instruction
        .operands()
        .iter()
        .all(|operand| !temp_name(operand).is_some_and(|name| defined_in_loop.contains(name)))
}

/// True when executing the instruction on a path the original program
/// might skip cannot trap.
fn can_speculate(instruction: &Instruction) -> bool {
    match instruction {
        Instruction::BinOp { op, rhs, .. } => match op {
            IrBinOp::SDiv | IrBinOp::SRem => matches!(rhs, Operand::Int(value) if *value != 0),
            IrBinOp::FDiv | IrBinOp::FRem => matches!(rhs, Operand::Float(value) if *value != 0.0),
            _ => true,
        },
        _ => true,
    }
}
