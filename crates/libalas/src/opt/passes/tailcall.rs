//! Tail-call marking.
//!
//! A call whose result immediately returns (or a void call immediately
//! followed by `ret void`) is marked `tail`, letting the downstream LLVM
//! toolchain reuse the caller's frame. The transformation is a pure
//! annotation; nothing moves.

use crate::codegen::ir::{Instruction, IrModule, Operand, Terminator};
use crate::opt::{OptimizerError, Pass};

pub(crate) struct TailCallMarking;

impl Pass for TailCallMarking {
    fn name(&self) -> &'static str {
        "tail-call-marking"
    }

    fn run(&self, module: &mut IrModule) -> Result<bool, OptimizerError> {
        let mut changed = false;
        for function in &mut module.functions {
            for block in &mut function.blocks {
                let returned = match &block.terminator {
                    Some(Terminator::Ret { value, .. }) => value.clone(),
                    _ => continue,
                };
                let Some(Instruction::Call { dest, tail, .. }) = block.instructions.last_mut() else {
                    continue;
                };
                if *tail {
                    continue;
                }
                let is_tail = match (&returned, dest.as_ref()) {
                    (Some(Operand::Temp(ret_name)), Some(Operand::Temp(dest_name))) => ret_name == dest_name,
                    (None, None) => true,
                    _ => false,
                };
                if is_tail {
                    *tail = true;
                    changed = true;
                }
            }
        }
        Ok(changed)
    }
}
