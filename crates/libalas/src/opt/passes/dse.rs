//! Dead-store elimination.
//!
//! Two shapes of dead store go away:
//!
//! 1. Stores to a non-escaping slot that is never loaded anywhere in the
//!    function; the slot's `alloca` goes with them.
//! 2. A store to a non-escaping slot that the same block overwrites
//!    before any load of that slot.
//!
//! Calls between two stores do not keep the earlier one alive: a
//! non-escaping slot is invisible to callees by definition.

use std::collections::HashMap;

use crate::codegen::ir::{Instruction, IrModule};
use crate::opt::{temp_name, OptimizerError, Pass};

use super::analyze_slots;

pub(crate) struct DeadStoreElimination;

impl Pass for DeadStoreElimination {
    fn name(&self) -> &'static str {
        "dead-store-elimination"
    }

    fn run(&self, module: &mut IrModule) -> Result<bool, OptimizerError> {
        let mut changed = false;
        for function in &mut module.functions {
            let slots = analyze_slots(function);

            // Slots nothing ever reads: drop the alloca and every store.
            let dead: Vec<&str> = slots
                .iter()
                .filter(|(_, info)| !info.escapes && info.loads == 0)
                .map(|(name, _)| name.as_str())
                .collect();
            for block in &mut function.blocks {
                let before = block.instructions.len();
                block.instructions.retain(|instruction| match instruction {
                    Instruction::Alloca { dest, .. } => {
                        !temp_name(dest).is_some_and(|name| dead.contains(&name))
                    }
                    Instruction::Store { ptr, .. } => {
                        !temp_name(ptr).is_some_and(|name| dead.contains(&name))
                    }
                    _ => true,
                });
                changed |= block.instructions.len() != before;
            }

            // Block-local overwrites: an earlier store with no load of
            // the slot before the next store is dead.
            for block in &mut function.blocks {
                let mut pending: HashMap<String, usize> = HashMap::new();
                let mut remove: Vec<usize> = Vec::new();
                for (position, instruction) in block.instructions.iter().enumerate() {
                    match instruction {
                        Instruction::Store { ptr, .. } => {
                            if let Some(name) = temp_name(ptr) {
                                let trackable = slots.get(name).is_some_and(|info| !info.escapes);
                                if trackable {
                                    if let Some(previous) = pending.insert(name.to_string(), position) {
                                        remove.push(previous);
                                    }
                                } else {
                                    pending.remove(name);
                                }
                            }
                        }
                        Instruction::Load { ptr, .. } => {
                            if let Some(name) = temp_name(ptr) {
                                pending.remove(name);
                            }
                        }
                        _ => {}
                    }
                }
                if !remove.is_empty() {
                    remove.sort_unstable();
                    for position in remove.iter().rev() {
                        block.instructions.remove(*position);
                    }
                    changed = true;
                }
            }
        }
        Ok(changed)
    }
}
