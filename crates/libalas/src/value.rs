//! Runtime value model for the ALaS interpreter and standard library.
//!
//! Values are a tagged sum of primitives and reference-counted containers.
//! Primitives (`Int`, `Float`, `Bool`, `String`, `Void`) are value-typed:
//! cloning copies them. Arrays and maps are shared by `Rc` strong count so
//! several variables can alias the same container; rebinding a variable or
//! tearing down a call's environment drops the binding, which decrements
//! the count. Program constructs cannot build reference cycles (containers
//! hold values, never environments), so plain strong counts suffice, and
//! execution is single-threaded, so no atomics are involved.
//!
//! The operator semantics implemented here are the single source of truth
//! for *both* execution engines: the code generator lowers the same rules
//! (integer arithmetic on `i64`, promotion to `double` when either side is
//! a float, string concatenation through the runtime) so that a program
//! computes the same value interpreted or compiled.

use std::cell::RefCell;
use std::rc::Rc;

use indexmap::IndexMap;
use strum_macros::{Display, EnumDiscriminants, IntoStaticStr};

use crate::ast::{BinaryOp, LiteralValue, UnaryOp};
use crate::error::RuntimeError;

/// Shared, interiorly mutable array storage.
pub type ArrayRef = Rc<RefCell<Vec<Value>>>;

/// Shared, interiorly mutable map storage. Keys are always strings;
/// insertion order is preserved and observable through `collections.keys`.
pub type MapRef = Rc<RefCell<IndexMap<String, Value>>>;

/// A runtime value.
#[derive(Debug, Clone, EnumDiscriminants)]
#[strum_discriminants(name(ValueKind))]
#[strum_discriminants(derive(Display, IntoStaticStr))]
#[strum_discriminants(strum(serialize_all = "lowercase"))]
pub enum Value {
    Int(i64),
    Float(f64),
    Bool(bool),
    String(String),
    Array(ArrayRef),
    Map(MapRef),
    Void,
}

impl Value {
    /// Allocates a fresh array container holding `elements`.
    pub fn array(elements: Vec<Value>) -> Self {
        Value::Array(Rc::new(RefCell::new(elements)))
    }

    /// Allocates a fresh map container holding `pairs`.
    pub fn map(pairs: IndexMap<String, Value>) -> Self {
        Value::Map(Rc::new(RefCell::new(pairs)))
    }

    /// Applies the numeric coercion rule: a number becomes an `Int` iff its
    /// value equals its truncation, otherwise a `Float`. `42`, `42.0` and
    /// `4.2e1` therefore all produce the same integer value.
    pub fn from_number(value: f64) -> Self {
        if value.is_finite() && value == value.trunc() && value >= i64::MIN as f64 && value <= i64::MAX as f64 {
            Value::Int(value as i64)
        } else {
            Value::Float(value)
        }
    }

    /// Converts an embedded AST literal into a runtime value. `null` maps
    /// onto `Void`, the absence-of-value tag.
    pub fn from_literal(literal: &LiteralValue) -> Self {
        match literal {
            LiteralValue::Null => Value::Void,
            LiteralValue::Bool(value) => Value::Bool(*value),
            LiteralValue::Number(value) => Value::from_number(*value),
            LiteralValue::String(value) => Value::String(value.clone()),
        }
    }

    /// The dynamic type name: `int`, `float`, `bool`, `string`, `array`,
    /// `map` or `void`. This is what the `type.typeOf` builtin returns.
    pub fn type_name(&self) -> &'static str {
        ValueKind::from(self).into()
    }

    /// The truthiness coercion used by conditions and the logical
    /// operators: non-zero numbers, non-empty strings and containers and
    /// `true` are truthy; `Void` is falsy.
    pub fn is_truthy(&self) -> bool {
        match self {
            Value::Int(value) => *value != 0,
            Value::Float(value) => *value != 0.0,
            Value::Bool(value) => *value,
            Value::String(value) => !value.is_empty(),
            Value::Array(array) => !array.borrow().is_empty(),
            Value::Map(map) => !map.borrow().is_empty(),
            Value::Void => false,
        }
    }

    /// Reads the value as `f64` for promoted arithmetic.
    fn as_float(&self) -> Option<f64> {
        match self {
            Value::Int(value) => Some(*value as f64),
            Value::Float(value) => Some(*value),
            _ => None,
        }
    }

    /// Applies a binary operator. Both operands have already been
    /// evaluated, left first; this only combines them.
    pub fn binary(op: BinaryOp, left: &Value, right: &Value) -> Result<Value, RuntimeError> {
        let bad = || RuntimeError::BadOperator {
            op: op.to_string(),
            left: left.type_name(),
            right: right.type_name(),
        };
        match op {
            BinaryOp::Add => match (left, right) {
                (Value::String(_), _) | (_, Value::String(_)) => {
                    Ok(Value::String(format!("{left}{right}")))
                }
                (Value::Float(_), _) | (_, Value::Float(_)) => {
                    let (l, r) = (left.as_float().ok_or_else(bad)?, right.as_float().ok_or_else(bad)?);
                    Ok(Value::Float(l + r))
                }
                (Value::Int(l), Value::Int(r)) => Ok(Value::Int(l.wrapping_add(*r))),
                _ => Err(bad()),
            },
            BinaryOp::Sub | BinaryOp::Mul | BinaryOp::Div | BinaryOp::Mod => {
                Value::arithmetic(op, left, right, bad)
            }
            BinaryOp::Eq => Ok(Value::Bool(left == right)),
            BinaryOp::Ne => Ok(Value::Bool(left != right)),
            BinaryOp::Lt | BinaryOp::Le | BinaryOp::Gt | BinaryOp::Ge => {
                Value::compare(op, left, right, bad)
            }
            BinaryOp::And => Ok(Value::Bool(left.is_truthy() && right.is_truthy())),
            BinaryOp::Or => Ok(Value::Bool(left.is_truthy() || right.is_truthy())),
        }
    }

    /// `-`, `*`, `/`, `%` with Float promotion. Division and modulo check
    /// the right operand for zero before computing.
    fn arithmetic(
        op: BinaryOp,
        left: &Value,
        right: &Value,
        bad: impl Fn() -> RuntimeError,
    ) -> Result<Value, RuntimeError> {
        if let (Value::Int(l), Value::Int(r)) = (left, right) {
            return match op {
                BinaryOp::Sub => Ok(Value::Int(l.wrapping_sub(*r))),
                BinaryOp::Mul => Ok(Value::Int(l.wrapping_mul(*r))),
                BinaryOp::Div => {
                    if *r == 0 {
                        Err(RuntimeError::DivisionByZero)
                    } else {
                        Ok(Value::Int(l.wrapping_div(*r)))
                    }
                }
                BinaryOp::Mod => {
                    if *r == 0 {
                        Err(RuntimeError::ModuloByZero)
                    } else {
                        Ok(Value::Int(l.wrapping_rem(*r)))
                    }
                }
                _ => unreachable!("arithmetic called with non-arithmetic operator"),
            };
        }
        let (l, r) = match (left.as_float(), right.as_float()) {
            (Some(l), Some(r)) => (l, r),
            _ => return Err(bad()),
        };
        match op {
            BinaryOp::Sub => Ok(Value::Float(l - r)),
            BinaryOp::Mul => Ok(Value::Float(l * r)),
            BinaryOp::Div => {
                if r == 0.0 {
                    Err(RuntimeError::DivisionByZero)
                } else {
                    Ok(Value::Float(l / r))
                }
            }
            BinaryOp::Mod => {
                if r == 0.0 {
                    Err(RuntimeError::ModuloByZero)
                } else {
                    Ok(Value::Float(l % r))
                }
            }
            _ => unreachable!("arithmetic called with non-arithmetic operator"),
        }
    }

    /// `<`, `<=`, `>`, `>=`: strings compare lexicographically, numbers
    /// with Float promotion. Anything else is a bad-operator error.
    fn compare(
        op: BinaryOp,
        left: &Value,
        right: &Value,
        bad: impl Fn() -> RuntimeError,
    ) -> Result<Value, RuntimeError> {
        let ordering = match (left, right) {
            (Value::String(l), Value::String(r)) => l.cmp(r),
            _ => {
                let (l, r) = match (left.as_float(), right.as_float()) {
                    (Some(l), Some(r)) => (l, r),
                    _ => return Err(bad()),
                };
                match l.partial_cmp(&r) {
                    Some(ordering) => ordering,
                    // NaN compares false against everything.
                    None => return Ok(Value::Bool(false)),
                }
            }
        };
        let result = match op {
            BinaryOp::Lt => ordering.is_lt(),
            BinaryOp::Le => ordering.is_le(),
            BinaryOp::Gt => ordering.is_gt(),
            BinaryOp::Ge => ordering.is_ge(),
            _ => unreachable!("compare called with non-comparison operator"),
        };
        Ok(Value::Bool(result))
    }

    /// Applies a unary operator.
    pub fn unary(op: UnaryOp, operand: &Value) -> Result<Value, RuntimeError> {
        match (op, operand) {
            (UnaryOp::Not, _) => Ok(Value::Bool(!operand.is_truthy())),
            (UnaryOp::Neg, Value::Int(value)) => Ok(Value::Int(value.wrapping_neg())),
            (UnaryOp::Neg, Value::Float(value)) => Ok(Value::Float(-value)),
            (UnaryOp::Neg, _) => Err(RuntimeError::BadUnaryOperator {
                op: op.to_string(),
                operand: operand.type_name(),
            }),
        }
    }

    /// Reads an array element, range-checked against `[0, len)`.
    pub fn index_array(array: &ArrayRef, index: i64) -> Result<Value, RuntimeError> {
        let array = array.borrow();
        if index < 0 || index as usize >= array.len() {
            return Err(RuntimeError::IndexOutOfBounds {
                index,
                len: array.len(),
            });
        }
        Ok(array[index as usize].clone())
    }

    /// Reads a map entry; a missing key is a runtime error.
    pub fn index_map(map: &MapRef, key: &str) -> Result<Value, RuntimeError> {
        map.borrow()
            .get(key)
            .cloned()
            .ok_or_else(|| RuntimeError::MissingKey { key: key.to_string() })
    }
}

/// Structural equality: identical tags and deeply equal payloads.
/// Values of different tags always compare unequal.
impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Int(l), Value::Int(r)) => l == r,
            (Value::Float(l), Value::Float(r)) => l == r,
            (Value::Bool(l), Value::Bool(r)) => l == r,
            (Value::String(l), Value::String(r)) => l == r,
            (Value::Array(l), Value::Array(r)) => *l.borrow() == *r.borrow(),
            (Value::Map(l), Value::Map(r)) => *l.borrow() == *r.borrow(),
            (Value::Void, Value::Void) => true,
            _ => false,
        }
    }
}

/// The canonical rendering, shared by `io.print`, string concatenation and
/// map-key stringification so all three agree.
impl std::fmt::Display for Value {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Value::Int(value) => write!(f, "{value}"),
            Value::Float(value) => write!(f, "{value}"),
            Value::Bool(value) => write!(f, "{value}"),
            Value::String(value) => f.write_str(value),
            Value::Array(array) => {
                f.write_str("[")?;
                for (position, element) in array.borrow().iter().enumerate() {
                    if position > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{element}")?;
                }
                f.write_str("]")
            }
            Value::Map(map) => {
                f.write_str("{")?;
                for (position, (key, value)) in map.borrow().iter().enumerate() {
                    if position > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{key}: {value}")?;
                }
                f.write_str("}")
            }
            Value::Void => f.write_str("void"),
        }
    }
}
