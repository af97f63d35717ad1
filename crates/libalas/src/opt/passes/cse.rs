//! Common-subexpression elimination.
//!
//! Within each block, a pure instruction computing the same value key as
//! an earlier one is deleted and its uses redirected to the earlier
//! result. Substitutions apply as the scan goes, so chains of identical
//! subexpressions collapse in one pass.

use std::collections::HashMap;

use crate::codegen::ir::{IrModule, Operand};
use crate::opt::{resolve, substitute, OptimizerError, Pass};

pub(crate) struct CommonSubexpressionElimination;

impl Pass for CommonSubexpressionElimination {
    fn name(&self) -> &'static str {
        "common-subexpression-elimination"
    }

    fn run(&self, module: &mut IrModule) -> Result<bool, OptimizerError> {
        let mut changed = false;
        for function in &mut module.functions {
            let mut replaced: HashMap<String, Operand> = HashMap::new();
            for block in &mut function.blocks {
                let mut seen: HashMap<String, Operand> = HashMap::new();
                block.instructions.retain_mut(|instruction| {
                    for operand in instruction.operands_mut() {
                        *operand = resolve(&replaced, operand);
                    }
                    let Some(key) = instruction.value_key() else {
                        return true;
                    };
                    let Some(Operand::Temp(dest)) = instruction.dest().cloned() else {
                        return true;
                    };
                    match seen.get(&key) {
                        Some(existing) => {
                            replaced.insert(dest, existing.clone());
                            false
                        }
                        None => {
                            seen.insert(key, Operand::Temp(dest));
                            true
                        }
                    }
                });
            }
            if !replaced.is_empty() {
                substitute(function, &replaced);
                changed = true;
            }
        }
        Ok(changed)
    }
}
