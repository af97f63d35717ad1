//! Tests for the optimization driver and its passes.

use pretty_assertions::assert_eq;
use rstest::rstest;
use serde_json::json;

use crate::codegen;
use crate::codegen::ir::{
    BasicBlock, IcmpCond, Instruction, IrBinOp, IrFunction, IrModule, IrType, Operand, Terminator,
};
use crate::opt::{optimize, OptLevel};
use crate::stdlib::StdlibRegistry;

use super::module;

fn lowered(document: serde_json::Value) -> IrModule {
    let registry = StdlibRegistry::new();
    codegen::compile_module(&module(document), &registry).expect("module lowers")
}

fn optimized_text(document: serde_json::Value, level: OptLevel) -> String {
    let mut unit = lowered(document);
    optimize(&mut unit, level).expect("passes run");
    unit.to_string()
}

fn dead_store_module() -> serde_json::Value {
    json!({
        "name": "app",
        "functions": [{
            "name": "main",
            "returns": "int",
            "body": [
                {"type": "assign", "target": "unused", "value": {"type": "literal", "value": 999}},
                {"type": "return", "value": {"type": "literal", "value": 42}},
            ],
        }],
    })
}

fn factorial_module() -> serde_json::Value {
    json!({
        "name": "app",
        "functions": [
            {
                "name": "factorial",
                "params": [{"name": "n", "type": "int"}],
                "returns": "int",
                "body": [{
                    "type": "if",
                    "cond": {"type": "binary", "op": "<=",
                             "left": {"type": "variable", "name": "n"},
                             "right": {"type": "literal", "value": 1}},
                    "then": [{"type": "return", "value": {"type": "literal", "value": 1}}],
                    "else": [{"type": "return", "value": {
                        "type": "binary", "op": "*",
                        "left": {"type": "variable", "name": "n"},
                        "right": {"type": "call", "name": "factorial", "args": [{
                            "type": "binary", "op": "-",
                            "left": {"type": "variable", "name": "n"},
                            "right": {"type": "literal", "value": 1}}]}}}],
                }],
            },
            {
                "name": "main",
                "returns": "int",
                "body": [{"type": "return", "value": {
                    "type": "call", "name": "factorial",
                    "args": [{"type": "literal", "value": 5}],
                }}],
            },
        ],
    })
}

#[test]
fn o0_applies_no_passes() {
    let mut unit = lowered(dead_store_module());
    let before = unit.to_string();
    optimize(&mut unit, OptLevel::O0).expect("no passes run");
    assert_eq!(before, unit.to_string());
    assert!(before.contains("999"));
}

#[test]
fn dead_stores_disappear_at_o1() {
    let text = optimized_text(dead_store_module(), OptLevel::O1);
    assert!(!text.contains("999"), "dead literal survived:\n{text}");
    assert!(text.contains("ret i64 42"));
}

#[test]
fn constants_fold_at_o1() {
    let text = optimized_text(
        json!({
            "name": "app",
            "functions": [{
                "name": "main",
                "returns": "int",
                "body": [{"type": "return", "value": {
                    "type": "binary", "op": "+",
                    "left": {"type": "binary", "op": "*",
                             "left": {"type": "literal", "value": 10},
                             "right": {"type": "literal", "value": 5}},
                    "right": {"type": "literal", "value": 3},
                }}],
            }],
        }),
        OptLevel::O1,
    );
    assert!(text.contains("ret i64 53"));
    assert!(!text.contains("mul"));
}

#[test]
fn division_by_constant_zero_is_not_folded() {
    let text = optimized_text(
        json!({
            "name": "app",
            "functions": [{
                "name": "main",
                "returns": "int",
                "body": [
                    {"type": "assign", "target": "q", "value": {"type": "binary", "op": "/",
                        "left": {"type": "literal", "value": 1},
                        "right": {"type": "literal", "value": 0}}},
                    {"type": "return", "value": {"type": "variable", "name": "q"}},
                ],
            }],
        }),
        OptLevel::O1,
    );
    // The trap stays in the program.
    assert!(text.contains("sdiv i64 1, 0"));
}

#[test]
fn blocks_orphaned_by_returning_branches_are_removed() {
    let document = json!({
        "name": "app",
        "functions": [{
            "name": "main",
            "returns": "int",
            "body": [{
                "type": "if",
                "cond": {"type": "literal", "value": true},
                "then": [{"type": "return", "value": {"type": "literal", "value": 1}}],
                "else": [{"type": "return", "value": {"type": "literal", "value": 2}}],
            }],
        }],
    });
    let before = lowered(document.clone()).to_string();
    assert!(before.contains("cont:"));
    let text = optimized_text(document, OptLevel::O1);
    assert!(!text.contains("cont:"));
}

#[test]
fn single_block_functions_promote_their_slots_at_o2() {
    let text = optimized_text(
        json!({
            "name": "app",
            "functions": [{
                "name": "double",
                "params": [{"name": "n", "type": "int"}],
                "returns": "int",
                "body": [{"type": "return", "value": {"type": "binary", "op": "*",
                    "left": {"type": "variable", "name": "n"},
                    "right": {"type": "literal", "value": 2}}}],
            }],
        }),
        OptLevel::O2,
    );
    assert!(!text.contains("alloca"), "slot survived promotion:\n{text}");
    assert!(!text.contains("load"));
    assert!(text.contains("mul i64 %n, 2"));
}

#[test]
fn common_subexpressions_collapse_at_o2() {
    let text = optimized_text(
        json!({
            "name": "app",
            "functions": [{
                "name": "square_sum",
                "params": [{"name": "a", "type": "int"}, {"name": "b", "type": "int"}],
                "returns": "int",
                "body": [{"type": "return", "value": {"type": "binary", "op": "*",
                    "left": {"type": "binary", "op": "+",
                             "left": {"type": "variable", "name": "a"},
                             "right": {"type": "variable", "name": "b"}},
                    "right": {"type": "binary", "op": "+",
                              "left": {"type": "variable", "name": "a"},
                              "right": {"type": "variable", "name": "b"}}}}],
            }],
        }),
        OptLevel::O2,
    );
    let occurrences = text.matches("add i64 %a, %b").count();
    assert_eq!(occurrences, 1, "duplicate subexpression survived:\n{text}");
}

#[test]
fn algebraic_identities_simplify_at_o2() {
    let text = optimized_text(
        json!({
            "name": "app",
            "functions": [{
                "name": "id",
                "params": [{"name": "x", "type": "int"}],
                "returns": "int",
                "body": [{"type": "return", "value": {"type": "binary", "op": "+",
                    "left": {"type": "variable", "name": "x"},
                    "right": {"type": "literal", "value": 0}}}],
            }],
        }),
        OptLevel::O2,
    );
    assert!(!text.contains("add"), "x + 0 survived:\n{text}");
    assert!(text.contains("ret i64 %x"));
}

#[test]
fn leaf_functions_inline_at_o3() {
    let text = optimized_text(
        json!({
            "name": "app",
            "functions": [
                {"name": "helper",
                 "params": [{"name": "n", "type": "int"}],
                 "returns": "int",
                 "body": [{"type": "return", "value": {"type": "binary", "op": "*",
                     "left": {"type": "variable", "name": "n"},
                     "right": {"type": "literal", "value": 2}}}]},
                {"name": "main",
                 "returns": "int",
                 "body": [{"type": "return", "value": {"type": "call", "name": "helper",
                     "args": [{"type": "literal", "value": 21}]}}]},
            ],
        }),
        OptLevel::O3,
    );
    assert!(!text.contains("call i64 @helper"), "call site survived:\n{text}");
    // The callee's definition (and symbol) remains.
    assert!(text.contains("define i64 @helper(i64 %n)"));
    assert!(text.contains("mul i64 21, 2"));
}

#[test]
fn recursive_functions_are_never_inlined() {
    let text = optimized_text(factorial_module(), OptLevel::O3);
    assert!(text.contains("call i64 @factorial"));
}

#[test]
fn returned_calls_are_marked_tail_at_o3() {
    let text = optimized_text(factorial_module(), OptLevel::O3);
    assert!(text.contains("tail call i64 @factorial(i64 5)"));
}

#[test]
fn loop_invariant_instructions_hoist_to_the_preheader() {
    // Built by hand: codegen-produced loops keep their locals in stack
    // slots, so the interesting hoist (a pure computation over values
    // defined outside the loop) is clearest on promoted IR.
    let mut unit = IrModule::new("hand");
    let mut entry = BasicBlock::new("entry");
    entry.terminator = Some(Terminator::Br {
        target: "while.cond".to_string(),
    });
    let mut cond = BasicBlock::new("while.cond");
    cond.instructions.push(Instruction::ICmp {
        dest: Operand::temp("c"),
        cond: IcmpCond::Slt,
        ty: IrType::I64,
        lhs: Operand::temp("n"),
        rhs: Operand::Int(10),
    });
    cond.terminator = Some(Terminator::CondBr {
        cond: Operand::temp("c"),
        then_target: "while.body".to_string(),
        else_target: "while.end".to_string(),
    });
    let mut body = BasicBlock::new("while.body");
    body.instructions.push(Instruction::BinOp {
        dest: Operand::temp("inv"),
        op: IrBinOp::Add,
        ty: IrType::I64,
        lhs: Operand::temp("n"),
        rhs: Operand::Int(1),
    });
    body.terminator = Some(Terminator::Br {
        target: "while.cond".to_string(),
    });
    let mut end = BasicBlock::new("while.end");
    end.terminator = Some(Terminator::Ret {
        ty: IrType::I64,
        value: Some(Operand::Int(0)),
    });
    unit.functions.push(IrFunction {
        name: "loopy".to_string(),
        params: vec![("n".to_string(), IrType::I64)],
        ret: IrType::I64,
        blocks: vec![entry, cond, body, end],
    });

    optimize(&mut unit, OptLevel::O3).expect("passes run");
    let function = unit.function("loopy").unwrap();
    let entry = function.block("entry").unwrap();
    assert!(
        entry
            .instructions
            .iter()
            .any(|instruction| matches!(instruction, Instruction::BinOp { op: IrBinOp::Add, .. })),
        "invariant add was not hoisted"
    );
    let body = function.block("while.body").unwrap();
    assert!(body.instructions.is_empty());
}

#[rstest]
#[case(OptLevel::O0)]
#[case(OptLevel::O1)]
#[case(OptLevel::O2)]
#[case(OptLevel::O3)]
fn symbols_survive_every_level(#[case] level: OptLevel) {
    let mut unit = lowered(factorial_module());
    optimize(&mut unit, level).expect("passes run");
    assert!(unit.function("main").is_some());
    assert!(unit.function("factorial").is_some());
}

#[test]
fn levels_parse_from_strings() {
    assert_eq!("O2".parse::<OptLevel>().unwrap(), OptLevel::O2);
    assert!("O9".parse::<OptLevel>().is_err());
    assert_eq!(OptLevel::O3.to_string(), "O3");
}
