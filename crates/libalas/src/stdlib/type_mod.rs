//! The `type` namespace: dynamic type inspection.
//!
//! `typeOf` is the only reflective capability the language has; the
//! predicates are sugar over it.

use crate::error::RuntimeError;
use crate::value::Value;

use super::{NativeType, StdlibRegistry};

pub(super) fn register(registry: &mut StdlibRegistry) {
    registry.add("type.typeOf", &[NativeType::Any], NativeType::Str, type_of);
    registry.add("type.isInt", &[NativeType::Any], NativeType::Bool, is_int);
    registry.add("type.isFloat", &[NativeType::Any], NativeType::Bool, is_float);
    registry.add("type.isString", &[NativeType::Any], NativeType::Bool, is_string);
    registry.add("type.isBool", &[NativeType::Any], NativeType::Bool, is_bool);
    registry.add("type.isArray", &[NativeType::Any], NativeType::Bool, is_array);
    registry.add("type.isMap", &[NativeType::Any], NativeType::Bool, is_map);
    registry.add("type.toString", &[NativeType::Any], NativeType::Str, to_string);
}

fn type_of(args: &[Value]) -> Result<Value, RuntimeError> {
    Ok(Value::String(args[0].type_name().to_string()))
}

fn is_int(args: &[Value]) -> Result<Value, RuntimeError> {
    Ok(Value::Bool(matches!(args[0], Value::Int(_))))
}

fn is_float(args: &[Value]) -> Result<Value, RuntimeError> {
    Ok(Value::Bool(matches!(args[0], Value::Float(_))))
}

fn is_string(args: &[Value]) -> Result<Value, RuntimeError> {
    Ok(Value::Bool(matches!(args[0], Value::String(_))))
}

fn is_bool(args: &[Value]) -> Result<Value, RuntimeError> {
    Ok(Value::Bool(matches!(args[0], Value::Bool(_))))
}

fn is_array(args: &[Value]) -> Result<Value, RuntimeError> {
    Ok(Value::Bool(matches!(args[0], Value::Array(_))))
}

fn is_map(args: &[Value]) -> Result<Value, RuntimeError> {
    Ok(Value::Bool(matches!(args[0], Value::Map(_))))
}

/// Renders with the same rule `io.print` uses.
fn to_string(args: &[Value]) -> Result<Value, RuntimeError> {
    Ok(Value::String(args[0].to_string()))
}
