//! The `math` namespace: numeric built-ins.
//!
//! `abs`, `min` and `max` preserve the Int/Float tag of their inputs;
//! `sqrt`, `pow`, `floor` and `ceil` always compute in floating point.

use crate::error::RuntimeError;
use crate::value::Value;

use super::{expect_number, NativeType, StdlibRegistry};

pub(super) fn register(registry: &mut StdlibRegistry) {
    // Tag-preserving functions are declared on boxed values so compiled
    // calls keep the same Int-in, Int-out behavior the interpreter has.
    registry.add("math.abs", &[NativeType::Any], NativeType::Any, abs);
    registry.add("math.sqrt", &[NativeType::Float], NativeType::Float, sqrt);
    registry.add(
        "math.pow",
        &[NativeType::Float, NativeType::Float],
        NativeType::Float,
        pow,
    );
    registry.add("math.floor", &[NativeType::Float], NativeType::Float, floor);
    registry.add("math.ceil", &[NativeType::Float], NativeType::Float, ceil);
    registry.add(
        "math.min",
        &[NativeType::Any, NativeType::Any],
        NativeType::Any,
        min,
    );
    registry.add(
        "math.max",
        &[NativeType::Any, NativeType::Any],
        NativeType::Any,
        max,
    );
}

fn abs(args: &[Value]) -> Result<Value, RuntimeError> {
    match &args[0] {
        Value::Int(value) => Ok(Value::Int(value.wrapping_abs())),
        Value::Float(value) => Ok(Value::Float(value.abs())),
        other => Err(RuntimeError::InvalidArgument {
            function: "math.abs".to_string(),
            message: format!("argument 0 must be a number, got {}", other.type_name()),
        }),
    }
}

fn sqrt(args: &[Value]) -> Result<Value, RuntimeError> {
    let value = expect_number("math.sqrt", args, 0)?;
    if value < 0.0 {
        return Err(RuntimeError::InvalidArgument {
            function: "math.sqrt".to_string(),
            message: "argument 0 must not be negative".to_string(),
        });
    }
    Ok(Value::Float(value.sqrt()))
}

fn pow(args: &[Value]) -> Result<Value, RuntimeError> {
    let base = expect_number("math.pow", args, 0)?;
    let exponent = expect_number("math.pow", args, 1)?;
    Ok(Value::Float(base.powf(exponent)))
}

fn floor(args: &[Value]) -> Result<Value, RuntimeError> {
    let value = expect_number("math.floor", args, 0)?;
    Ok(Value::Float(value.floor()))
}

fn ceil(args: &[Value]) -> Result<Value, RuntimeError> {
    let value = expect_number("math.ceil", args, 0)?;
    Ok(Value::Float(value.ceil()))
}

fn min(args: &[Value]) -> Result<Value, RuntimeError> {
    pick("math.min", args, |left, right| left <= right)
}

fn max(args: &[Value]) -> Result<Value, RuntimeError> {
    pick("math.max", args, |left, right| left >= right)
}

/// Returns whichever operand wins the comparison, keeping its tag.
fn pick(function: &str, args: &[Value], wins: fn(f64, f64) -> bool) -> Result<Value, RuntimeError> {
    let left = expect_number(function, args, 0)?;
    let right = expect_number(function, args, 1)?;
    if wins(left, right) {
        Ok(args[0].clone())
    } else {
        Ok(args[1].clone())
    }
}
