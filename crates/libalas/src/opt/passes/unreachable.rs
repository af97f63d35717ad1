//! Unreachable-block removal.
//!
//! Keeps exactly the blocks reachable from the entry block by following
//! terminator edges. Blocks orphaned by both branches of an `if`
//! returning, or by constant-folded conditions, disappear here.

use std::collections::HashSet;

use crate::codegen::ir::IrModule;
use crate::opt::{OptimizerError, Pass};

pub(crate) struct UnreachableBlockRemoval;

impl Pass for UnreachableBlockRemoval {
    fn name(&self) -> &'static str {
        "unreachable-block-removal"
    }

    fn run(&self, module: &mut IrModule) -> Result<bool, OptimizerError> {
        let mut changed = false;
        for function in &mut module.functions {
            let entry = function
                .blocks
                .first()
                .map(|block| block.label.clone())
                .ok_or_else(|| OptimizerError::MissingEntry {
                    function: function.name.clone(),
                })?;

            let mut reachable: HashSet<String> = HashSet::new();
            let mut worklist = vec![entry];
            while let Some(label) = worklist.pop() {
                if !reachable.insert(label.clone()) {
                    continue;
                }
                if let Some(block) = function.block(&label) {
                    if let Some(terminator) = &block.terminator {
                        for target in terminator.targets() {
                            worklist.push(target.to_string());
                        }
                    }
                }
            }

            let before = function.blocks.len();
            function.blocks.retain(|block| reachable.contains(&block.label));
            changed |= function.blocks.len() != before;
        }
        Ok(changed)
    }
}
