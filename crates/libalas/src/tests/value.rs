//! Tests for the runtime value model.

use indexmap::IndexMap;
use pretty_assertions::assert_eq;
use rstest::rstest;

use crate::ast::{BinaryOp, UnaryOp};
use crate::error::RuntimeError;
use crate::value::Value;

#[rstest]
#[case(42.0, Value::Int(42))]
#[case(-3.0, Value::Int(-3))]
#[case(0.0, Value::Int(0))]
#[case(42.0e0, Value::Int(42))]
#[case(2.5, Value::Float(2.5))]
#[case(-0.125, Value::Float(-0.125))]
fn numeric_literal_coercion(#[case] raw: f64, #[case] expected: Value) {
    assert_eq!(Value::from_number(raw), expected);
}

#[rstest]
#[case(Value::Int(1), true)]
#[case(Value::Int(0), false)]
#[case(Value::Float(0.5), true)]
#[case(Value::Float(0.0), false)]
#[case(Value::Bool(true), true)]
#[case(Value::Bool(false), false)]
#[case(Value::String("x".to_string()), true)]
#[case(Value::String(String::new()), false)]
#[case(Value::array(vec![Value::Int(1)]), true)]
#[case(Value::array(Vec::new()), false)]
#[case(Value::map(IndexMap::new()), false)]
#[case(Value::Void, false)]
fn truthiness(#[case] value: Value, #[case] expected: bool) {
    assert_eq!(value.is_truthy(), expected);
}

#[test]
fn addition_promotes_and_concatenates() {
    assert_eq!(
        Value::binary(BinaryOp::Add, &Value::Int(2), &Value::Int(3)).unwrap(),
        Value::Int(5)
    );
    assert_eq!(
        Value::binary(BinaryOp::Add, &Value::Int(2), &Value::Float(0.5)).unwrap(),
        Value::Float(2.5)
    );
    assert_eq!(
        Value::binary(
            BinaryOp::Add,
            &Value::String("n = ".to_string()),
            &Value::Int(7)
        )
        .unwrap(),
        Value::String("n = 7".to_string())
    );
}

#[test]
fn integer_division_stays_integer() {
    assert_eq!(
        Value::binary(BinaryOp::Div, &Value::Int(7), &Value::Int(2)).unwrap(),
        Value::Int(3)
    );
    assert_eq!(
        Value::binary(BinaryOp::Div, &Value::Float(7.0), &Value::Int(2)).unwrap(),
        Value::Float(3.5)
    );
}

#[test]
fn division_by_zero_fails_with_by_zero_message() {
    let error = Value::binary(BinaryOp::Div, &Value::Int(1), &Value::Int(0)).unwrap_err();
    assert_eq!(error, RuntimeError::DivisionByZero);
    assert!(error.to_string().contains("by zero"));

    let error = Value::binary(BinaryOp::Mod, &Value::Int(1), &Value::Int(0)).unwrap_err();
    assert_eq!(error, RuntimeError::ModuloByZero);
    assert!(error.to_string().contains("by zero"));

    let error = Value::binary(BinaryOp::Div, &Value::Float(1.0), &Value::Float(0.0)).unwrap_err();
    assert_eq!(error, RuntimeError::DivisionByZero);
}

#[test]
fn comparisons_are_lexicographic_for_strings() {
    let apple = Value::String("apple".to_string());
    let pear = Value::String("pear".to_string());
    assert_eq!(Value::binary(BinaryOp::Lt, &apple, &pear).unwrap(), Value::Bool(true));
    assert_eq!(Value::binary(BinaryOp::Ge, &apple, &pear).unwrap(), Value::Bool(false));
}

#[test]
fn comparing_string_and_number_is_a_bad_operator() {
    let error = Value::binary(BinaryOp::Lt, &Value::String("a".to_string()), &Value::Int(1)).unwrap_err();
    assert!(matches!(error, RuntimeError::BadOperator { .. }));
}

#[test]
fn logical_operators_combine_truthiness() {
    assert_eq!(
        Value::binary(BinaryOp::And, &Value::Int(1), &Value::String(String::new())).unwrap(),
        Value::Bool(false)
    );
    assert_eq!(
        Value::binary(BinaryOp::Or, &Value::Int(0), &Value::Float(0.5)).unwrap(),
        Value::Bool(true)
    );
}

#[test]
fn unary_negation_preserves_tag() {
    assert_eq!(Value::unary(UnaryOp::Neg, &Value::Int(5)).unwrap(), Value::Int(-5));
    assert_eq!(Value::unary(UnaryOp::Neg, &Value::Float(2.5)).unwrap(), Value::Float(-2.5));
    assert_eq!(Value::unary(UnaryOp::Not, &Value::Int(0)).unwrap(), Value::Bool(true));
}

#[test]
fn structural_equality_is_deep_and_tag_strict() {
    let left = Value::array(vec![Value::Int(1), Value::String("two".to_string())]);
    let right = Value::array(vec![Value::Int(1), Value::String("two".to_string())]);
    assert_eq!(left, right);

    // Different tags never compare equal, even for equal magnitudes.
    assert_ne!(Value::Int(1), Value::Float(1.0));

    let mut pairs = IndexMap::new();
    pairs.insert("k".to_string(), Value::Int(1));
    let mut same = IndexMap::new();
    same.insert("k".to_string(), Value::Int(1));
    assert_eq!(Value::map(pairs), Value::map(same));
}

#[test]
fn aliased_containers_share_identity() {
    let original = Value::array(vec![Value::Int(1)]);
    let alias = original.clone();
    if let Value::Array(array) = &original {
        array.borrow_mut().push(Value::Int(2));
    }
    if let Value::Array(array) = &alias {
        assert_eq!(array.borrow().len(), 2);
    } else {
        panic!("alias lost its tag");
    }
}

#[test]
fn rendering_matches_the_printer_rules() {
    assert_eq!(Value::Int(42).to_string(), "42");
    assert_eq!(Value::Float(2.5).to_string(), "2.5");
    assert_eq!(Value::String("raw".to_string()).to_string(), "raw");
    assert_eq!(Value::Void.to_string(), "void");
    assert_eq!(
        Value::array(vec![Value::Int(1), Value::Int(2)]).to_string(),
        "[1, 2]"
    );
    let mut pairs = IndexMap::new();
    pairs.insert("a".to_string(), Value::Int(1));
    assert_eq!(Value::map(pairs).to_string(), "{a: 1}");
}

#[test]
fn index_helpers_check_bounds_and_keys() {
    let array = match Value::array(vec![Value::Int(10)]) {
        Value::Array(array) => array,
        _ => unreachable!(),
    };
    assert_eq!(Value::index_array(&array, 0).unwrap(), Value::Int(10));
    assert!(matches!(
        Value::index_array(&array, 1).unwrap_err(),
        RuntimeError::IndexOutOfBounds { index: 1, len: 1 }
    ));
    assert!(matches!(
        Value::index_array(&array, -1).unwrap_err(),
        RuntimeError::IndexOutOfBounds { .. }
    ));

    let map = match Value::map(IndexMap::new()) {
        Value::Map(map) => map,
        _ => unreachable!(),
    };
    assert!(matches!(
        Value::index_map(&map, "missing").unwrap_err(),
        RuntimeError::MissingKey { .. }
    ));
}
