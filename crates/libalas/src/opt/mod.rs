//! The optimization driver: a configurable pass pipeline over generated
//! IR modules.
//!
//! Each pass is an in-place transformation implementing [`Pass`]; the
//! driver composes them in the order mandated by the level:
//!
//! - **O0** - no passes
//! - **O1** - dead-store elimination, unreachable-block removal, constant
//!   folding
//! - **O2** - O1 plus stack-slot promotion, common-subexpression
//!   elimination, algebraic simplification
//! - **O3** - O2 plus leaf-function inlining, loop-invariant code motion,
//!   tail-call marking
//!
//! Every pass preserves observable semantics: a trapping operation is
//! never speculated, no function definition is ever removed (inlining
//! rewrites call sites only), and conservative preconditions make a pass
//! skip rather than guess. Recursive functions and functions with more
//! than one basic block are never inlined.

mod passes;

use std::collections::HashMap;

use log::debug;
use miette::Diagnostic;
use strum_macros::{Display, EnumString};

use crate::codegen::ir::{IrFunction, IrModule, Operand};

use passes::{
    AlgebraicSimplification, CommonSubexpressionElimination, ConstantFolding, DeadStoreElimination,
    InlineLeafFunctions, LoopInvariantCodeMotion, PromoteSlots, TailCallMarking, UnreachableBlockRemoval,
};

/// The optimization level selecting the pass pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default, Display, EnumString)]
pub enum OptLevel {
    #[default]
    O0,
    O1,
    O2,
    O3,
}

/// A pass precondition violation. These indicate malformed IR and cannot
/// occur for modules produced by the code generator from validated input.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error, Diagnostic)]
pub enum OptimizerError {
    #[error("function '{function}' has no entry block")]
    #[diagnostic(code(alas::opt::missing_entry))]
    MissingEntry { function: String },
}

/// One semantics-preserving IR-to-IR transformation.
pub(crate) trait Pass {
    fn name(&self) -> &'static str;

    /// Transforms `module` in place; returns whether anything changed.
    fn run(&self, module: &mut IrModule) -> Result<bool, OptimizerError>;
}

/// The mandated pipeline for `level`.
fn pipeline(level: OptLevel) -> Vec<Box<dyn Pass>> {
    let mut passes: Vec<Box<dyn Pass>> = Vec::new();
    if level >= OptLevel::O1 {
        passes.push(Box::new(DeadStoreElimination));
        passes.push(Box::new(UnreachableBlockRemoval));
        passes.push(Box::new(ConstantFolding));
    }
    if level >= OptLevel::O2 {
        passes.push(Box::new(PromoteSlots));
        passes.push(Box::new(CommonSubexpressionElimination));
        passes.push(Box::new(AlgebraicSimplification));
    }
    if level >= OptLevel::O3 {
        passes.push(Box::new(InlineLeafFunctions));
        passes.push(Box::new(LoopInvariantCodeMotion));
        passes.push(Box::new(TailCallMarking));
    }
    passes
}

/// Applies the pipeline selected by `level` to `module`, in place.
pub fn optimize(module: &mut IrModule, level: OptLevel) -> Result<(), OptimizerError> {
    for pass in pipeline(level) {
        let changed = pass.run(module)?;
        debug!(
            "pass {} on module '{}': {}",
            pass.name(),
            module.name,
            if changed { "changed" } else { "no change" }
        );
    }
    Ok(())
}

// ---- shared pass machinery -----------------------------------------

/// The name of a virtual register, when `operand` is one.
pub(crate) fn temp_name(operand: &Operand) -> Option<&str> {
    match operand {
        Operand::Temp(name) => Some(name),
        _ => None,
    }
}

/// Follows a substitution map to its fixpoint for one operand.
pub(crate) fn resolve(map: &HashMap<String, Operand>, operand: &Operand) -> Operand {
    let mut current = operand.clone();
    while let Some(name) = temp_name(&current) {
        match map.get(name) {
            Some(next) => current = next.clone(),
            None => break,
        }
    }
    current
}

/// Rewrites every operand of `function` through the substitution map,
/// terminators included.
pub(crate) fn substitute(function: &mut IrFunction, map: &HashMap<String, Operand>) {
    if map.is_empty() {
        return;
    }
    for block in &mut function.blocks {
        for instruction in &mut block.instructions {
            for operand in instruction.operands_mut() {
                *operand = resolve(map, operand);
            }
        }
        if let Some(terminator) = &mut block.terminator {
            for operand in terminator.operands_mut() {
                *operand = resolve(map, operand);
            }
        }
    }
}
