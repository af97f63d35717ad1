//! The individual optimization passes.
//!
//! Passes share the slot analysis below: a *slot* is a register defined
//! by an `alloca`, and it *escapes* when its address is observable by
//! anything other than direct loads and stores (a call argument, a stored
//! value, a terminator operand). Only non-escaping slots may be reasoned
//! about locally.

mod cse;
mod dse;
mod fold;
mod inline;
mod licm;
mod mem2reg;
mod simplify;
mod tailcall;
mod unreachable;

pub(super) use cse::CommonSubexpressionElimination;
pub(super) use dse::DeadStoreElimination;
pub(super) use fold::ConstantFolding;
pub(super) use inline::InlineLeafFunctions;
pub(super) use licm::LoopInvariantCodeMotion;
pub(super) use mem2reg::PromoteSlots;
pub(super) use simplify::AlgebraicSimplification;
pub(super) use tailcall::TailCallMarking;
pub(super) use unreachable::UnreachableBlockRemoval;

use indexmap::IndexMap;

use crate::codegen::ir::{Instruction, IrFunction};

use super::temp_name;

/// What the function does with one stack slot.
#[derive(Debug, Default, Clone, Copy)]
pub(crate) struct SlotInfo {
    /// Number of loads through the slot.
    pub loads: usize,
    /// True when the slot's address leaves the load/store pattern.
    pub escapes: bool,
}

/// Collects every `alloca`-defined slot of `function` with its usage.
pub(crate) fn analyze_slots(function: &IrFunction) -> IndexMap<String, SlotInfo> {
    let mut slots: IndexMap<String, SlotInfo> = IndexMap::new();
    for block in &function.blocks {
        for instruction in &block.instructions {
            if let Instruction::Alloca { dest, .. } = instruction {
                if let Some(name) = temp_name(dest) {
                    slots.entry(name.to_string()).or_default();
                }
            }
        }
    }

    for block in &function.blocks {
        for instruction in &block.instructions {
            match instruction {
                Instruction::Alloca { .. } => {}
                Instruction::Load { ptr, .. } => {
                    if let Some(info) = temp_name(ptr).and_then(|name| slots.get_mut(name)) {
                        info.loads += 1;
                    }
                }
                Instruction::Store { value, .. } => {
                    // The stored *value* escaping matters; the pointer
                    // operand is the direct-store pattern itself.
                    if let Some(info) = temp_name(value).and_then(|name| slots.get_mut(name)) {
                        info.escapes = true;
                    }
                }
                other => {
                    for operand in other.operands() {
                        if let Some(info) = temp_name(operand).and_then(|name| slots.get_mut(name)) {
                            info.escapes = true;
                        }
                    }
                }
            }
        }
        if let Some(terminator) = &block.terminator {
            for operand in terminator.operands() {
                if let Some(info) = temp_name(operand).and_then(|name| slots.get_mut(name)) {
                    info.escapes = true;
                }
            }
        }
    }
    slots
}
