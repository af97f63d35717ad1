//! Tests for IR lowering.

use serde_json::json;

use crate::codegen::{self, CodegenError};
use crate::loader::LoadedProgram;
use crate::stdlib::StdlibRegistry;

use super::module;

fn lower(document: serde_json::Value) -> String {
    let registry = StdlibRegistry::new();
    codegen::compile_module(&module(document), &registry)
        .expect("module lowers")
        .to_string()
}

fn lower_err(document: serde_json::Value) -> CodegenError {
    let registry = StdlibRegistry::new();
    codegen::compile_module(&module(document), &registry).expect_err("lowering fails")
}

#[test]
fn arithmetic_lowers_to_i64_instructions() {
    let text = lower(json!({
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
    }));
    assert!(text.contains("define i64 @main()"));
    assert!(text.contains("mul i64 10, 5"));
    assert!(text.contains("ret i64"));
}

#[test]
fn division_and_modulo_are_signed() {
    let text = lower(json!({
        "name": "app",
        "functions": [{
            "name": "main",
            "returns": "int",
            "body": [
                {"type": "assign", "target": "q", "value": {"type": "binary", "op": "/",
                    "left": {"type": "literal", "value": 7}, "right": {"type": "literal", "value": 2}}},
                {"type": "assign", "target": "r", "value": {"type": "binary", "op": "%",
                    "left": {"type": "literal", "value": 7}, "right": {"type": "literal", "value": 2}}},
                {"type": "return", "value": {"type": "binary", "op": "+",
                    "left": {"type": "variable", "name": "q"},
                    "right": {"type": "variable", "name": "r"}}},
            ],
        }],
    }));
    assert!(text.contains("sdiv i64 7, 2"));
    assert!(text.contains("srem i64 7, 2"));
}

#[test]
fn parameters_get_stack_slots() {
    let text = lower(json!({
        "name": "app",
        "functions": [{
            "name": "double",
            "params": [{"name": "n", "type": "int"}],
            "returns": "int",
            "body": [{"type": "return", "value": {"type": "binary", "op": "*",
                "left": {"type": "variable", "name": "n"},
                "right": {"type": "literal", "value": 2}}}],
        }],
    }));
    assert!(text.contains("define i64 @double(i64 %n)"));
    assert!(text.contains("%n.addr = alloca i64"));
    assert!(text.contains("store i64 %n, ptr %n.addr"));
    assert!(text.contains("load i64, ptr %n.addr"));
}

#[test]
fn branches_use_then_else_cont_labels() {
    let text = lower(json!({
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
    }));
    assert!(text.contains("br i1 true, label %then, label %else"));
    assert!(text.contains("then:"));
    assert!(text.contains("else:"));
    assert!(text.contains("cont:"));
}

#[test]
fn loops_use_while_labels_and_signed_compares() {
    let text = lower(json!({
        "name": "app",
        "functions": [{
            "name": "main",
            "returns": "int",
            "body": [
                {"type": "assign", "target": "i", "value": {"type": "literal", "value": 0}},
                {"type": "while",
                 "cond": {"type": "binary", "op": "<=",
                          "left": {"type": "variable", "name": "i"},
                          "right": {"type": "literal", "value": 10}},
                 "body": [{"type": "assign", "target": "i", "value": {"type": "binary", "op": "+",
                     "left": {"type": "variable", "name": "i"},
                     "right": {"type": "literal", "value": 1}}}]},
                {"type": "return", "value": {"type": "variable", "name": "i"}},
            ],
        }],
    }));
    assert!(text.contains("while.cond:"));
    assert!(text.contains("while.body:"));
    assert!(text.contains("while.end:"));
    assert!(text.contains("icmp sle i64"));
    assert!(text.contains("br label %while.cond"));
}

#[test]
fn float_mixing_promotes_through_sitofp() {
    let text = lower(json!({
        "name": "app",
        "functions": [{
            "name": "main",
            "returns": "float",
            "body": [{"type": "return", "value": {"type": "binary", "op": "+",
                "left": {"type": "literal", "value": 1},
                "right": {"type": "literal", "value": 2.5}}}],
        }],
    }));
    assert!(text.contains("sitofp i64 1 to double"));
    assert!(text.contains("fadd double"));
    assert!(text.contains("ret double"));
}

#[test]
fn string_literals_become_interned_globals() {
    let text = lower(json!({
        "name": "app",
        "functions": [{
            "name": "main",
            "returns": "string",
            "body": [{"type": "return", "value": {"type": "literal", "value": "hi"}}],
        }],
    }));
    assert!(text.contains("@.str.0 = private unnamed_addr constant [3 x i8] c\"hi\\00\""));
    assert!(text.contains("call ptr @alas_str_const(ptr @.str.0)"));
    assert!(text.contains("ret ptr"));
}

#[test]
fn builtins_declare_registry_externs() {
    let text = lower(json!({
        "name": "app",
        "functions": [{
            "name": "main",
            "returns": "float",
            "body": [{"type": "return", "value": {"type": "builtin", "name": "math.sqrt",
                "args": [{"type": "literal", "value": 16}]}}],
        }],
    }));
    assert!(text.contains("declare double @alas_math_sqrt(double)"));
    assert!(text.contains("call double @alas_math_sqrt(double"));
}

#[test]
fn tag_preserving_builtins_call_through_boxed_values() {
    // math.abs keeps the Int tag of its input in the interpreter, so its
    // compiled form must go through the boxed runtime representation
    // rather than forcing the argument to double.
    let text = lower(json!({
        "name": "app",
        "functions": [{
            "name": "main",
            "returns": "int",
            "body": [{"type": "return", "value": {"type": "builtin", "name": "math.abs",
                "args": [{"type": "literal", "value": -4}]}}],
        }],
    }));
    assert!(text.contains("declare ptr @alas_math_abs(ptr)"));
    assert!(text.contains("call ptr @alas_box_int(i64 -4)"));
    assert!(text.contains("call ptr @alas_math_abs(ptr"));
    // The boxed result unboxes to satisfy the declared int return.
    assert!(text.contains("call i64 @alas_value_int(ptr"));
    assert!(!text.contains("sitofp"));
}

#[test]
fn containers_lower_to_runtime_calls() {
    let text = lower(json!({
        "name": "app",
        "functions": [{
            "name": "main",
            "returns": "int",
            "body": [
                {"type": "assign", "target": "arr", "value": {"type": "array_lit", "elements": [
                    {"type": "literal", "value": 100},
                    {"type": "literal", "value": 200},
                ]}},
                {"type": "return", "value": {"type": "index",
                    "object": {"type": "variable", "name": "arr"},
                    "index": {"type": "literal", "value": 1}}},
            ],
        }],
    }));
    assert!(text.contains("call ptr @alas_array_new(i64 2)"));
    assert!(text.contains("call void @alas_array_push(ptr"));
    assert!(text.contains("call ptr @alas_value_index(ptr"));
    // The boxed element unboxes to satisfy the declared int return.
    assert!(text.contains("call i64 @alas_value_int(ptr"));
}

#[test]
fn multi_module_calls_mangle_and_declare() {
    let program = LoadedProgram::from_modules(vec![
        module(json!({
            "name": "app",
            "imports": ["math_utils"],
            "functions": [{
                "name": "main",
                "returns": "int",
                "body": [{"type": "return", "value": {
                    "type": "module_call", "module": "math_utils", "name": "multiply",
                    "args": [
                        {"type": "module_call", "module": "math_utils", "name": "add",
                         "args": [{"type": "literal", "value": 10}, {"type": "literal", "value": 5}]},
                        {"type": "literal", "value": 2},
                    ],
                }}],
            }],
        })),
        module(json!({
            "name": "math_utils",
            "exports": ["add", "multiply"],
            "functions": [
                {"name": "add",
                 "params": [{"name": "a", "type": "int"}, {"name": "b", "type": "int"}],
                 "returns": "int",
                 "body": [{"type": "return", "value": {"type": "binary", "op": "+",
                     "left": {"type": "variable", "name": "a"},
                     "right": {"type": "variable", "name": "b"}}}]},
                {"name": "multiply",
                 "params": [{"name": "a", "type": "int"}, {"name": "b", "type": "int"}],
                 "returns": "int",
                 "body": [{"type": "return", "value": {"type": "binary", "op": "*",
                     "left": {"type": "variable", "name": "a"},
                     "right": {"type": "variable", "name": "b"}}}]},
            ],
        })),
    ]);
    let registry = StdlibRegistry::new();
    let units = codegen::compile_program(&program, &registry).expect("program lowers");

    let app = units["app"].to_string();
    assert!(app.contains("call i64 @math_utils__add(i64 10, i64 5)"));
    assert!(app.contains("call i64 @math_utils__multiply(i64"));
    assert!(app.contains("declare i64 @math_utils__add(i64, i64)"));

    let math_utils = units["math_utils"].to_string();
    assert!(math_utils.contains("define i64 @math_utils__add(i64 %a, i64 %b)"));
    assert!(math_utils.contains("define i64 @math_utils__multiply(i64 %a, i64 %b)"));
}

#[test]
fn inconsistent_reassignment_is_a_codegen_error() {
    let error = lower_err(json!({
        "name": "app",
        "functions": [{
            "name": "main",
            "returns": "int",
            "body": [
                {"type": "assign", "target": "x", "value": {"type": "literal", "value": 1}},
                {"type": "assign", "target": "x", "value": {"type": "literal", "value": 0.5}},
                {"type": "return", "value": {"type": "literal", "value": 0}},
            ],
        }],
    }));
    match error {
        CodegenError::TypeMismatch { expected, found, path } => {
            assert_eq!(expected, "i64");
            assert_eq!(found, "double");
            assert!(path.contains("body[1]"));
        }
        other => panic!("expected a type mismatch, got {other:?}"),
    }
}

#[test]
fn unresolved_names_carry_node_paths() {
    let error = lower_err(json!({
        "name": "app",
        "functions": [{
            "name": "main",
            "returns": "int",
            "body": [{"type": "return", "value": {"type": "variable", "name": "ghost"}}],
        }],
    }));
    assert!(matches!(
        &error,
        CodegenError::UnresolvedVariable { name, path }
            if name == "ghost" && path.contains("functions[0].body[0]")
    ));

    let error = lower_err(json!({
        "name": "app",
        "functions": [{
            "name": "main",
            "returns": "int",
            "body": [{"type": "return", "value": {"type": "call", "name": "nope", "args": []}}],
        }],
    }));
    assert!(matches!(error, CodegenError::UnknownFunction { name, .. } if name == "nope"));
}

#[test]
fn arity_is_checked_at_lowering() {
    let error = lower_err(json!({
        "name": "app",
        "functions": [
            {"name": "id",
             "params": [{"name": "n", "type": "int"}],
             "returns": "int",
             "body": [{"type": "return", "value": {"type": "variable", "name": "n"}}]},
            {"name": "main",
             "returns": "int",
             "body": [{"type": "return", "value": {"type": "call", "name": "id", "args": []}}]},
        ],
    }));
    assert!(matches!(
        error,
        CodegenError::ArityMismatch { expected: 1, given: 0, .. }
    ));
}

#[test]
fn void_functions_fall_off_with_ret_void() {
    let text = lower(json!({
        "name": "app",
        "functions": [{"name": "noop", "body": []}],
    }));
    assert!(text.contains("define void @noop()"));
    assert!(text.contains("ret void"));
}

#[test]
fn non_std_module_calls_require_the_multi_module_driver() {
    let error = lower_err(json!({
        "name": "app",
        "functions": [{
            "name": "main",
            "returns": "int",
            "body": [{"type": "return", "value": {
                "type": "module_call", "module": "elsewhere", "name": "f", "args": [],
            }}],
        }],
    }));
    assert!(matches!(error, CodegenError::UnknownModule { name, .. } if name == "elsewhere"));
}
