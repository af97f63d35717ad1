//! Tests for the tree-walking interpreter.

use std::rc::Rc;

use pretty_assertions::assert_eq;
use serde_json::json;

use crate::error::{AlasError, RuntimeError};
use crate::interp::{Environment, FrameId};
use crate::value::Value;

use super::{program, run_main};

#[test]
fn arithmetic_expression_evaluates() {
    // main() -> (10 * 5) + 3
    let value = run_main(json!({
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
    assert_eq!(value, Value::Int(53));
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
                            "right": {"type": "literal", "value": 1},
                        }]},
                    }}],
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
fn recursion_computes_factorial() {
    assert_eq!(run_main(factorial_module()), Value::Int(120));
}

#[test]
fn double_recursion_computes_fibonacci() {
    let value = run_main(json!({
        "name": "app",
        "functions": [
            {
                "name": "fib",
                "params": [{"name": "n", "type": "int"}],
                "returns": "int",
                "body": [{
                    "type": "if",
                    "cond": {"type": "binary", "op": "<",
                             "left": {"type": "variable", "name": "n"},
                             "right": {"type": "literal", "value": 2}},
                    "then": [{"type": "return", "value": {"type": "variable", "name": "n"}}],
                    "else": [{"type": "return", "value": {
                        "type": "binary", "op": "+",
                        "left": {"type": "call", "name": "fib", "args": [{
                            "type": "binary", "op": "-",
                            "left": {"type": "variable", "name": "n"},
                            "right": {"type": "literal", "value": 1}}]},
                        "right": {"type": "call", "name": "fib", "args": [{
                            "type": "binary", "op": "-",
                            "left": {"type": "variable", "name": "n"},
                            "right": {"type": "literal", "value": 2}}]},
                    }}],
                }],
            },
            {
                "name": "main",
                "returns": "int",
                "body": [{"type": "return", "value": {
                    "type": "call", "name": "fib",
                    "args": [{"type": "literal", "value": 10}],
                }}],
            },
        ],
    }));
    assert_eq!(value, Value::Int(55));
}

#[test]
fn while_loop_sums_to_n() {
    // sum = 0; i = 1; while i <= 10 { sum = sum + i; i = i + 1 }; return sum
    let value = run_main(json!({
        "name": "app",
        "functions": [{
            "name": "main",
            "returns": "int",
            "body": [
                {"type": "assign", "target": "sum", "value": {"type": "literal", "value": 0}},
                {"type": "assign", "target": "i", "value": {"type": "literal", "value": 1}},
                {"type": "while",
                 "cond": {"type": "binary", "op": "<=",
                          "left": {"type": "variable", "name": "i"},
                          "right": {"type": "literal", "value": 10}},
                 "body": [
                    {"type": "assign", "target": "sum", "value": {
                        "type": "binary", "op": "+",
                        "left": {"type": "variable", "name": "sum"},
                        "right": {"type": "variable", "name": "i"}}},
                    {"type": "assign", "target": "i", "value": {
                        "type": "binary", "op": "+",
                        "left": {"type": "variable", "name": "i"},
                        "right": {"type": "literal", "value": 1}}},
                 ]},
                {"type": "return", "value": {"type": "variable", "name": "sum"}},
            ],
        }],
    }));
    assert_eq!(value, Value::Int(55));
}

#[test]
fn for_behaves_like_while() {
    let value = run_main(json!({
        "name": "app",
        "functions": [{
            "name": "main",
            "returns": "int",
            "body": [
                {"type": "assign", "target": "i", "value": {"type": "literal", "value": 0}},
                {"type": "for",
                 "cond": {"type": "binary", "op": "<",
                          "left": {"type": "variable", "name": "i"},
                          "right": {"type": "literal", "value": 3}},
                 "body": [{"type": "assign", "target": "i", "value": {
                     "type": "binary", "op": "+",
                     "left": {"type": "variable", "name": "i"},
                     "right": {"type": "literal", "value": 1}}}]},
                {"type": "return", "value": {"type": "variable", "name": "i"}},
            ],
        }],
    }));
    assert_eq!(value, Value::Int(3));
}

#[test]
fn array_literal_indexes() {
    let value = run_main(json!({
        "name": "app",
        "functions": [{
            "name": "main",
            "returns": "int",
            "body": [
                {"type": "assign", "target": "arr", "value": {"type": "array_lit", "elements": [
                    {"type": "literal", "value": 100},
                    {"type": "literal", "value": 200},
                    {"type": "literal", "value": 300},
                ]}},
                {"type": "return", "value": {"type": "index",
                    "object": {"type": "variable", "name": "arr"},
                    "index": {"type": "literal", "value": 2}}},
            ],
        }],
    }));
    assert_eq!(value, Value::Int(300));
}

#[test]
fn map_literal_field_access() {
    let value = run_main(json!({
        "name": "app",
        "functions": [{
            "name": "main",
            "returns": "string",
            "body": [
                {"type": "assign", "target": "person", "value": {"type": "map_lit", "pairs": [
                    {"key": {"type": "literal", "value": "firstName"},
                     "value": {"type": "literal", "value": "John"}},
                    {"key": {"type": "literal", "value": "lastName"},
                     "value": {"type": "literal", "value": "Doe"}},
                    {"key": {"type": "literal", "value": "age"},
                     "value": {"type": "literal", "value": 30}},
                ]}},
                {"type": "return", "value": {"type": "field",
                    "object": {"type": "variable", "name": "person"},
                    "field_name": "firstName"}},
            ],
        }],
    }));
    assert_eq!(value, Value::String("John".to_string()));
}

#[test]
fn map_keys_stringify_on_construction_and_access() {
    let value = run_main(json!({
        "name": "app",
        "functions": [{
            "name": "main",
            "returns": "string",
            "body": [
                {"type": "assign", "target": "m", "value": {"type": "map_lit", "pairs": [
                    {"key": {"type": "literal", "value": 12},
                     "value": {"type": "literal", "value": "twelve"}},
                ]}},
                {"type": "return", "value": {"type": "index",
                    "object": {"type": "variable", "name": "m"},
                    "index": {"type": "literal", "value": 12}}},
            ],
        }],
    }));
    assert_eq!(value, Value::String("twelve".to_string()));
}

#[test]
fn arity_mismatch_fails_before_the_body_runs() {
    let result = program(vec![factorial_module()]).run_with_args("factorial", Vec::new());
    match result {
        Err(AlasError::Runtime(RuntimeError::ArityMismatch { expected, given, .. })) => {
            assert_eq!((expected, given), (1, 0));
        }
        other => panic!("expected arity mismatch, got {other:?}"),
    }
}

#[test]
fn index_out_of_bounds_and_missing_key_fail() {
    let result = program(vec![json!({
        "name": "app",
        "functions": [{
            "name": "main",
            "returns": "int",
            "body": [{"type": "return", "value": {"type": "index",
                "object": {"type": "array_lit", "elements": [{"type": "literal", "value": 1}]},
                "index": {"type": "literal", "value": 5}}}],
        }],
    })])
    .run("main");
    assert!(matches!(
        result,
        Err(AlasError::Runtime(RuntimeError::IndexOutOfBounds { index: 5, len: 1 }))
    ));

    let result = program(vec![json!({
        "name": "app",
        "functions": [{
            "name": "main",
            "returns": "int",
            "body": [{"type": "return", "value": {"type": "field",
                "object": {"type": "map_lit", "pairs": []},
                "field_name": "ghost"}}],
        }],
    })])
    .run("main");
    assert!(matches!(
        result,
        Err(AlasError::Runtime(RuntimeError::MissingKey { .. }))
    ));
}

#[test]
fn division_by_zero_halts_execution() {
    let result = program(vec![json!({
        "name": "app",
        "functions": [{
            "name": "main",
            "returns": "int",
            "body": [{"type": "return", "value": {"type": "binary", "op": "/",
                "left": {"type": "literal", "value": 1},
                "right": {"type": "literal", "value": 0}}}],
        }],
    })])
    .run("main");
    assert!(matches!(
        result,
        Err(AlasError::Runtime(RuntimeError::DivisionByZero))
    ));
}

#[test]
fn cross_module_calls_resolve_through_the_alias_table() {
    let value = program(vec![
        json!({
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
        }),
        json!({
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
        }),
    ])
    .run("main");
    assert_eq!(value.unwrap(), Value::Int(30));
}

#[test]
fn unexported_functions_are_not_callable_across_modules() {
    let result = program(vec![
        json!({
            "name": "app",
            "imports": ["secrets"],
            "functions": [{
                "name": "main",
                "returns": "int",
                "body": [{"type": "return", "value": {
                    "type": "module_call", "module": "secrets", "name": "hidden", "args": [],
                }}],
            }],
        }),
        json!({
            "name": "secrets",
            "functions": [{
                "name": "hidden",
                "returns": "int",
                "body": [{"type": "return", "value": {"type": "literal", "value": 1}}],
            }],
        }),
    ])
    .run("main");
    assert!(matches!(
        result,
        Err(AlasError::Runtime(RuntimeError::NotExported { .. }))
    ));
}

#[test]
fn std_module_calls_dispatch_through_the_registry() {
    let value = run_main(json!({
        "name": "app",
        "functions": [{
            "name": "main",
            "returns": "float",
            "body": [{"type": "return", "value": {
                "type": "module_call", "module": "std.math", "name": "sqrt",
                "args": [{"type": "literal", "value": 16}],
            }}],
        }],
    }));
    assert_eq!(value, Value::Float(4.0));
}

#[test]
fn builtin_expressions_dispatch_directly() {
    let value = run_main(json!({
        "name": "app",
        "functions": [{
            "name": "main",
            "returns": "string",
            "body": [{"type": "return", "value": {
                "type": "builtin", "name": "string.toUpper",
                "args": [{"type": "literal", "value": "alas"}],
            }}],
        }],
    }));
    assert_eq!(value, Value::String("ALAS".to_string()));
}

#[test]
fn callees_do_not_see_caller_locals() {
    // `peek` references a name only the caller assigns; the validator
    // rejects the module before anything runs, because every call gets a
    // fresh root environment and could never resolve it either.
    let result = crate::program::Program::from_modules(vec![super::module(json!({
        "name": "app",
        "functions": [
            {"name": "peek",
             "returns": "int",
             "body": [{"type": "return", "value": {"type": "variable", "name": "hidden"}}]},
            {"name": "main",
             "returns": "int",
             "body": [
                {"type": "assign", "target": "hidden", "value": {"type": "literal", "value": 1}},
                {"type": "return", "value": {"type": "call", "name": "peek", "args": []}},
             ]},
        ],
    }))]);
    assert!(matches!(result, Err(AlasError::Validation(_))));
}

#[test]
fn rebinding_releases_the_previous_container() {
    let mut environment = Environment::new();
    let array = Value::array(Vec::new());
    let handle = match &array {
        Value::Array(rc) => Rc::clone(rc),
        _ => unreachable!(),
    };

    environment.assign(FrameId::ROOT, "x", array);
    assert_eq!(Rc::strong_count(&handle), 2);

    environment.assign(FrameId::ROOT, "x", Value::Int(1));
    assert_eq!(Rc::strong_count(&handle), 1);
}

#[test]
fn environment_teardown_releases_all_bindings() {
    let array = Value::array(Vec::new());
    let handle = match &array {
        Value::Array(rc) => Rc::clone(rc),
        _ => unreachable!(),
    };

    {
        let mut environment = Environment::new();
        environment.assign(FrameId::ROOT, "x", array.clone());
        environment.assign(FrameId::ROOT, "y", array);
        assert_eq!(Rc::strong_count(&handle), 3);
    }
    assert_eq!(Rc::strong_count(&handle), 1);
}

#[test]
fn child_frames_fall_through_to_parents() {
    let mut environment = Environment::new();
    environment.assign(FrameId::ROOT, "outer", Value::Int(1));
    let child = environment.push_child(FrameId::ROOT);
    assert_eq!(environment.get(child, "outer"), Some(&Value::Int(1)));

    // Rebinding through the child updates the enclosing frame.
    environment.assign(child, "outer", Value::Int(2));
    assert_eq!(environment.get(FrameId::ROOT, "outer"), Some(&Value::Int(2)));
    assert_eq!(environment.binding_count(child), 0);
}

#[test]
fn runs_are_deterministic() {
    let linked = program(vec![factorial_module()]);
    let first = linked.run("main").unwrap();
    let second = linked.run("main").unwrap();
    assert_eq!(first, second);
}
