//! Leaf-function inlining.
//!
//! A callee qualifies only when it is a single-block function whose body
//! is entirely pure instructions ending in a `ret`, the shape the earlier
//! promotion pass produces for small arithmetic helpers. Such a callee
//! contains no calls, so it cannot be recursive; functions with several
//! blocks never qualify. Call sites are rewritten by splicing the
//! callee's renamed instructions in place of the call; the callee's own
//! definition always remains in the module, so no symbol disappears.

use std::collections::HashMap;

use indexmap::IndexMap;

use crate::codegen::ir::{Instruction, IrFunction, IrModule, Operand, Terminator};
use crate::opt::{substitute, temp_name, OptimizerError, Pass};

pub(crate) struct InlineLeafFunctions;

/// The cloneable body of an inlining candidate.
struct Candidate {
    params: Vec<String>,
    instructions: Vec<Instruction>,
    ret_value: Option<Operand>,
}

impl Pass for InlineLeafFunctions {
    fn name(&self) -> &'static str {
        "inline-leaf-functions"
    }

    fn run(&self, module: &mut IrModule) -> Result<bool, OptimizerError> {
        let candidates: IndexMap<String, Candidate> = module
            .functions
            .iter()
            .filter_map(|function| Some((function.name.clone(), candidate(function)?)))
            .collect();
        if candidates.is_empty() {
            return Ok(false);
        }

        let mut changed = false;
        for function in &mut module.functions {
            let mut counter = 0usize;
            let mut replaced: HashMap<String, Operand> = HashMap::new();
            for block in &mut function.blocks {
                let mut rewritten = Vec::with_capacity(block.instructions.len());
                for instruction in block.instructions.drain(..) {
                    let site = match &instruction {
                        Instruction::Call { dest, callee, args, .. } => candidates
                            .get(callee)
                            .filter(|candidate| candidate.params.len() == args.len())
                            .map(|candidate| (dest.clone(), args.clone(), candidate)),
                        _ => None,
                    };
                    let Some((dest, args, candidate)) = site else {
                        rewritten.push(instruction);
                        continue;
                    };

                    // Rename the callee's registers into a fresh suffix
                    // and substitute arguments for parameters.
                    let mut renames: HashMap<String, Operand> = HashMap::new();
                    for (param, (_, operand)) in candidate.params.iter().zip(&args) {
                        renames.insert(param.clone(), operand.clone());
                    }
                    for spliced in &candidate.instructions {
                        let mut spliced = spliced.clone();
                        if let Some(Operand::Temp(name)) = spliced.dest().cloned() {
                            let fresh = format!("inl{counter}.{name}");
                            renames.insert(name, Operand::temp(fresh));
                        }
                        if let Some(dest) = spliced_dest_mut(&mut spliced) {
                            if let Some(name) = temp_name(dest).map(str::to_string) {
                                *dest = renames[&name].clone();
                            }
                        }
                        for operand in spliced.operands_mut() {
                            if let Some(replacement) = temp_name(operand).and_then(|name| renames.get(name)) {
                                *operand = replacement.clone();
                            }
                        }
                        rewritten.push(spliced);
                    }
                    counter += 1;

                    if let (Some(Operand::Temp(dest)), Some(ret_value)) = (&dest, &candidate.ret_value) {
                        let mut result = ret_value.clone();
                        if let Some(replacement) = temp_name(&result).and_then(|name| renames.get(name)) {
                            result = replacement.clone();
                        }
                        replaced.insert(dest.clone(), result);
                    }
                    changed = true;
                }
                block.instructions = rewritten;
            }
            substitute(function, &replaced);
        }
        Ok(changed)
    }
}

/// Extracts the inlinable body, or `None` when the function does not
/// qualify.
fn candidate(function: &IrFunction) -> Option<Candidate> {
    if function.blocks.len() != 1 {
        return None;
    }
    let block = &function.blocks[0];
    if !block.instructions.iter().all(Instruction::is_pure) {
        return None;
    }
    let ret_value = match &block.terminator {
        Some(Terminator::Ret { value, .. }) => value.clone(),
        _ => return None,
    };
    Some(Candidate {
        params: function.params.iter().map(|(name, _)| name.clone()).collect(),
        instructions: block.instructions.clone(),
        ret_value,
    })
}

fn spliced_dest_mut(instruction: &mut Instruction) -> Option<&mut Operand> {
    match instruction {
        Instruction::Alloca { dest, .. }
        | Instruction::Load { dest, .. }
        | Instruction::BinOp { dest, .. }
        | Instruction::ICmp { dest, .. }
        | Instruction::FCmp { dest, .. }
        | Instruction::SiToFp { dest, .. }
        | Instruction::ZExt { dest, .. } => Some(dest),
        Instruction::Call { dest, .. } => dest.as_mut(),
        Instruction::Store { .. } => None,
    }
}
