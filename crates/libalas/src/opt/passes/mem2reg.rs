//! Promotion of stack slots to SSA registers.
//!
//! The classic mem2reg restricted to single-block functions, where no phi
//! nodes are needed: inside one block every load observes exactly the
//! last store, so loads substitute to the stored operand and the slot's
//! `alloca` and stores disappear. Multi-block functions keep their slots;
//! correctness over completeness.

use std::collections::HashMap;

use crate::codegen::ir::{Instruction, IrModule, Operand};
use crate::opt::{resolve, substitute, temp_name, OptimizerError, Pass};

use super::analyze_slots;

pub(crate) struct PromoteSlots;

impl Pass for PromoteSlots {
    fn name(&self) -> &'static str {
        "promote-slots"
    }

    fn run(&self, module: &mut IrModule) -> Result<bool, OptimizerError> {
        let mut changed = false;
        for function in &mut module.functions {
            if function.blocks.len() != 1 {
                continue;
            }
            let slots = analyze_slots(function);
            let promotable: Vec<&str> = slots
                .iter()
                .filter(|(_, info)| !info.escapes)
                .map(|(name, _)| name.as_str())
                .collect();
            if promotable.is_empty() {
                continue;
            }

            // Forward stored values to loads in program order. A load
            // with no store before it would be reading indeterminate
            // memory; the code generator never emits that, and such a
            // slot is simply left unpromoted.
            let block = &mut function.blocks[0];
            let mut current: HashMap<String, Operand> = HashMap::new();
            let mut replaced: HashMap<String, Operand> = HashMap::new();
            let mut keep: Vec<bool> = Vec::with_capacity(block.instructions.len());
            let mut unpromotable: Vec<String> = Vec::new();

            for instruction in &block.instructions {
                match instruction {
                    Instruction::Alloca { dest, .. } => {
                        let promote = temp_name(dest).is_some_and(|name| promotable.contains(&name));
                        keep.push(!promote);
                    }
                    Instruction::Store { value, ptr, .. } => {
                        match temp_name(ptr).filter(|name| promotable.contains(name)) {
                            Some(name) => {
                                current.insert(name.to_string(), resolve(&replaced, value));
                                keep.push(false);
                            }
                            None => keep.push(true),
                        }
                    }
                    Instruction::Load { dest, ptr, .. } => {
                        match temp_name(ptr).filter(|name| promotable.contains(name)) {
                            Some(name) => match current.get(name) {
                                Some(value) => {
                                    if let Some(dest) = temp_name(dest) {
                                        replaced.insert(dest.to_string(), value.clone());
                                    }
                                    keep.push(false);
                                }
                                None => {
                                    unpromotable.push(name.to_string());
                                    keep.push(true);
                                }
                            },
                            None => keep.push(true),
                        }
                    }
                    _ => keep.push(true),
                }
            }

            if !unpromotable.is_empty() {
                // Rare and conservative: give up on the whole function
                // rather than partially rewrite around the odd slot.
                continue;
            }

            let mut position = 0;
            block.instructions.retain(|_| {
                let kept = keep[position];
                position += 1;
                kept
            });
            substitute(function, &replaced);
            changed = true;
        }
        Ok(changed)
    }
}
